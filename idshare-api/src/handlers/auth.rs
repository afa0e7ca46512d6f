use crate::error::ApiResult;
use crate::extract::{Auth, Payload};
use crate::state::AppState;
use crate::types::{AccountResponse, Credentials, LoginResponse};
use axum::{extract::State, http::StatusCode, Json};

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    payload: Payload,
) -> ApiResult<(StatusCode, Json<AccountResponse>)> {
    let credentials: Credentials = payload.into_typed()?;
    let account = state
        .blocking(move |s| s.auth.register(&credentials.username, &credentials.password))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AccountResponse {
            id: account.id,
            username: account.username,
        }),
    ))
}

/// POST /auth/login
pub async fn login(State(state): State<AppState>, payload: Payload) -> ApiResult<Json<LoginResponse>> {
    let credentials: Credentials = payload.into_typed()?;
    let account = state
        .blocking(move |s| s.auth.login(&credentials.username, &credentials.password))
        .await?;

    let token = state.sessions.create_session(&account).await;
    tracing::info!(user = %account.id, "Logged in");

    Ok(Json(LoginResponse {
        token,
        username: account.username,
    }))
}

/// POST /auth/logout
pub async fn logout(State(state): State<AppState>, auth: Auth) -> ApiResult<StatusCode> {
    auth.principal.require()?;
    if let Some(token) = auth.token {
        state.sessions.remove_session(&token).await;
    }
    Ok(StatusCode::NO_CONTENT)
}
