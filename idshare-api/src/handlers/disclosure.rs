use crate::error::ApiResult;
use crate::extract::Auth;
use crate::state::AppState;
use crate::types::DisclosureView;
use axum::{
    extract::{Path, State},
    Json,
};
use idshare_core::core_disclosure::{DisclosureLinker, RequestVariantId};

/// GET /disclosures/:vid
pub async fn get(
    State(state): State<AppState>,
    auth: Auth,
    Path(id): Path<RequestVariantId>,
) -> ApiResult<Json<DisclosureView>> {
    let disclosed_value = state
        .blocking(move |s| Ok(s.manager.read_disclosed_value(&auth.principal, id)?))
        .await?;
    Ok(Json(DisclosureView { id, disclosed_value }))
}
