//! Sender side: outgoing requests and their request variants

use crate::error::ApiResult;
use crate::extract::{Auth, Payload};
use crate::state::AppState;
use crate::types::RequestView;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use idshare_core::core_disclosure::allow_list::{
    REQUEST_CREATE, REQUEST_VARIANT_CREATE, SENT_REQUEST_UPDATE, SENT_REQUEST_VARIANT_UPDATE,
};
use idshare_core::core_disclosure::{
    DisclosureLinker, RequestDraft, RequestId, RequestLifecycle, RequestPatch, RequestVariantDetail,
    RequestVariantDraft, RequestVariantId, RequestVariantPatch, RequestVariantSummary,
};

/// GET /requests/sent
pub async fn list(State(state): State<AppState>, auth: Auth) -> ApiResult<Json<Vec<RequestView>>> {
    let requests = state
        .blocking(move |s| Ok(s.manager.list_sent_requests(&auth.principal)?))
        .await?;
    Ok(Json(requests.iter().map(RequestView::sent).collect()))
}

/// POST /requests/sent
pub async fn create(
    State(state): State<AppState>,
    auth: Auth,
    payload: Payload,
) -> ApiResult<(StatusCode, Json<RequestView>)> {
    let draft: RequestDraft = payload.parse(&auth.principal, &REQUEST_CREATE)?;
    let request = state
        .blocking(move |s| Ok(s.manager.create_request(&auth.principal, draft)?))
        .await?;
    Ok((StatusCode::CREATED, Json(RequestView::sent(&request))))
}

/// GET /requests/sent/:id
pub async fn get(
    State(state): State<AppState>,
    auth: Auth,
    Path(id): Path<RequestId>,
) -> ApiResult<Json<RequestView>> {
    let request = state
        .blocking(move |s| Ok(s.manager.get_sent_request(&auth.principal, id)?))
        .await?;
    Ok(Json(RequestView::sent(&request)))
}

/// PATCH /requests/sent/:id
pub async fn update(
    State(state): State<AppState>,
    auth: Auth,
    Path(id): Path<RequestId>,
    payload: Payload,
) -> ApiResult<Json<RequestView>> {
    let request = state
        .blocking(move |s| {
            s.manager.get_sent_request(&auth.principal, id)?;
            let patch: RequestPatch = payload.filter(&SENT_REQUEST_UPDATE)?;
            Ok(s.manager.update_sent_request(&auth.principal, id, patch)?)
        })
        .await?;
    Ok(Json(RequestView::sent(&request)))
}

/// DELETE /requests/sent/:id
pub async fn delete(
    State(state): State<AppState>,
    auth: Auth,
    Path(id): Path<RequestId>,
) -> ApiResult<StatusCode> {
    state
        .blocking(move |s| Ok(s.manager.delete_sent_request(&auth.principal, id)?))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /requests/sent/:id/variants
pub async fn list_variants(
    State(state): State<AppState>,
    auth: Auth,
    Path(request_id): Path<RequestId>,
) -> ApiResult<Json<Vec<RequestVariantSummary>>> {
    let variants = state
        .blocking(move |s| Ok(s.manager.list_sent_request_variants(&auth.principal, request_id)?))
        .await?;
    Ok(Json(variants))
}

/// POST /requests/sent/:id/variants
pub async fn create_variant(
    State(state): State<AppState>,
    auth: Auth,
    Path(request_id): Path<RequestId>,
    payload: Payload,
) -> ApiResult<(StatusCode, Json<RequestVariantSummary>)> {
    let variant = state
        .blocking(move |s| {
            s.manager.get_sent_request(&auth.principal, request_id)?;
            let draft: RequestVariantDraft = payload.filter(&REQUEST_VARIANT_CREATE)?;
            Ok(s.manager.create_request_variant(&auth.principal, request_id, draft)?)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(variant)))
}

/// GET /requests/sent/:id/variants/:vid
pub async fn get_variant(
    State(state): State<AppState>,
    auth: Auth,
    Path((request_id, id)): Path<(RequestId, RequestVariantId)>,
) -> ApiResult<Json<RequestVariantDetail>> {
    let detail = state
        .blocking(move |s| Ok(s.manager.get_sent_request_variant(&auth.principal, request_id, id)?))
        .await?;
    Ok(Json(detail))
}

/// PATCH /requests/sent/:id/variants/:vid
pub async fn update_variant(
    State(state): State<AppState>,
    auth: Auth,
    Path((request_id, id)): Path<(RequestId, RequestVariantId)>,
    payload: Payload,
) -> ApiResult<Json<RequestVariantDetail>> {
    let detail = state
        .blocking(move |s| {
            s.manager.get_sent_request_variant(&auth.principal, request_id, id)?;
            let patch: RequestVariantPatch = payload.filter(&SENT_REQUEST_VARIANT_UPDATE)?;
            Ok(s.manager
                .update_sent_request_variant(&auth.principal, request_id, id, patch)?)
        })
        .await?;
    Ok(Json(detail))
}

/// DELETE /requests/sent/:id/variants/:vid
pub async fn delete_variant(
    State(state): State<AppState>,
    auth: Auth,
    Path((request_id, id)): Path<(RequestId, RequestVariantId)>,
) -> ApiResult<StatusCode> {
    state
        .blocking(move |s| Ok(s.manager.delete_sent_request_variant(&auth.principal, request_id, id)?))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
