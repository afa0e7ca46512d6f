//! Owner-scoped profile identity variants

use crate::error::ApiResult;
use crate::extract::{Auth, Payload};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use idshare_core::core_disclosure::allow_list::{PROFILE_VARIANT_CREATE, PROFILE_VARIANT_UPDATE};
use idshare_core::core_disclosure::{
    IdentityStore, ProfileIdentityVariant, ProfileVariantDraft, ProfileVariantId, ProfileVariantPatch,
};

/// GET /profile/identity-variants
pub async fn list(State(state): State<AppState>, auth: Auth) -> ApiResult<Json<Vec<ProfileIdentityVariant>>> {
    let variants = state
        .blocking(move |s| Ok(s.manager.list_profile_variants(&auth.principal)?))
        .await?;
    Ok(Json(variants))
}

/// POST /profile/identity-variants
pub async fn create(
    State(state): State<AppState>,
    auth: Auth,
    payload: Payload,
) -> ApiResult<(StatusCode, Json<ProfileIdentityVariant>)> {
    let draft: ProfileVariantDraft = payload.parse(&auth.principal, &PROFILE_VARIANT_CREATE)?;
    let variant = state
        .blocking(move |s| Ok(s.manager.create_profile_variant(&auth.principal, draft)?))
        .await?;
    Ok((StatusCode::CREATED, Json(variant)))
}

/// GET /profile/identity-variants/:id
pub async fn get(
    State(state): State<AppState>,
    auth: Auth,
    Path(id): Path<ProfileVariantId>,
) -> ApiResult<Json<ProfileIdentityVariant>> {
    let variant = state
        .blocking(move |s| Ok(s.manager.get_profile_variant(&auth.principal, id)?))
        .await?;
    Ok(Json(variant))
}

/// PATCH /profile/identity-variants/:id
pub async fn update(
    State(state): State<AppState>,
    auth: Auth,
    Path(id): Path<ProfileVariantId>,
    payload: Payload,
) -> ApiResult<Json<ProfileIdentityVariant>> {
    let variant = state
        .blocking(move |s| {
            s.manager.get_profile_variant(&auth.principal, id)?;
            let patch: ProfileVariantPatch = payload.filter(&PROFILE_VARIANT_UPDATE)?;
            Ok(s.manager.update_profile_variant(&auth.principal, id, patch)?)
        })
        .await?;
    Ok(Json(variant))
}

/// DELETE /profile/identity-variants/:id
pub async fn delete(
    State(state): State<AppState>,
    auth: Auth,
    Path(id): Path<ProfileVariantId>,
) -> ApiResult<StatusCode> {
    state
        .blocking(move |s| Ok(s.manager.delete_profile_variant(&auth.principal, id)?))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
