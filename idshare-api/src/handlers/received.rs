//! Receiver side: incoming requests, transitions and links

use crate::error::ApiResult;
use crate::extract::{Auth, Payload};
use crate::state::AppState;
use crate::types::{ReceivedRequestView, RequestView};
use axum::{
    extract::{Path, State},
    Json,
};
use idshare_core::core_disclosure::allow_list::RECEIVED_REQUEST_VARIANT_UPDATE;
use idshare_core::core_disclosure::{
    DisclosureLinker, LinkUpdate, RequestId, RequestLifecycle, RequestVariantDetail, RequestVariantId,
    RequestVariantSummary,
};

/// GET /requests/received
pub async fn list(State(state): State<AppState>, auth: Auth) -> ApiResult<Json<Vec<RequestView>>> {
    let requests = state
        .blocking(move |s| Ok(s.manager.list_received_requests(&auth.principal)?))
        .await?;
    Ok(Json(requests.iter().map(RequestView::received).collect()))
}

/// GET /requests/received/:id
pub async fn get(
    State(state): State<AppState>,
    auth: Auth,
    Path(id): Path<RequestId>,
) -> ApiResult<Json<ReceivedRequestView>> {
    let received = state
        .blocking(move |s| Ok(s.manager.get_received_request(&auth.principal, id)?))
        .await?;
    Ok(Json(received.into()))
}

/// POST /requests/received/:id/accept
pub async fn accept(
    State(state): State<AppState>,
    auth: Auth,
    Path(id): Path<RequestId>,
) -> ApiResult<Json<RequestView>> {
    let request = state
        .blocking(move |s| Ok(s.manager.accept_request(&auth.principal, id)?))
        .await?;
    Ok(Json(RequestView::received(&request)))
}

/// POST /requests/received/:id/deny
pub async fn deny(
    State(state): State<AppState>,
    auth: Auth,
    Path(id): Path<RequestId>,
) -> ApiResult<Json<RequestView>> {
    let request = state
        .blocking(move |s| Ok(s.manager.deny_request(&auth.principal, id)?))
        .await?;
    Ok(Json(RequestView::received(&request)))
}

/// GET /requests/received/:id/variants
pub async fn list_variants(
    State(state): State<AppState>,
    auth: Auth,
    Path(request_id): Path<RequestId>,
) -> ApiResult<Json<Vec<RequestVariantSummary>>> {
    let variants = state
        .blocking(move |s| Ok(s.manager.list_received_request_variants(&auth.principal, request_id)?))
        .await?;
    Ok(Json(variants))
}

/// GET /requests/received/:id/variants/:vid
pub async fn get_variant(
    State(state): State<AppState>,
    auth: Auth,
    Path((request_id, id)): Path<(RequestId, RequestVariantId)>,
) -> ApiResult<Json<RequestVariantDetail>> {
    let detail = state
        .blocking(move |s| Ok(s.manager.get_received_request_variant(&auth.principal, request_id, id)?))
        .await?;
    Ok(Json(detail))
}

/// PATCH /requests/received/:id/variants/:vid
///
/// Only `linked_profile_variant_id` is read from the body; `null` unlinks.
pub async fn update_variant(
    State(state): State<AppState>,
    auth: Auth,
    Path((request_id, id)): Path<(RequestId, RequestVariantId)>,
    payload: Payload,
) -> ApiResult<Json<RequestVariantDetail>> {
    let detail = state
        .blocking(move |s| {
            s.manager.get_received_request_variant(&auth.principal, request_id, id)?;
            let update: LinkUpdate = payload.filter(&RECEIVED_REQUEST_VARIANT_UPDATE)?;
            Ok(s.manager
                .update_received_request_variant(&auth.principal, request_id, id, update)?)
        })
        .await?;
    Ok(Json(detail))
}
