//! Request extractors: the calling principal and the JSON payload

use crate::error::ApiResult;
use crate::state::AppState;
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts},
    Json,
};
use idshare_core::core_disclosure::allow_list::NON_FIELD_ERRORS;
use idshare_core::core_disclosure::{AllowList, DisclosureError, Principal};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::convert::Infallible;

/// The caller behind the request.
///
/// Never rejects: a missing, unknown or expired token becomes
/// [`Principal::Anonymous`], and the core refuses it as unauthenticated.
pub struct Auth {
    pub principal: Principal,
    pub token: Option<String>,
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

#[async_trait]
impl FromRequestParts<AppState> for Auth {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts);
        let principal = match &token {
            Some(token) => state.sessions.resolve(token).await,
            None => Principal::Anonymous,
        };
        Ok(Auth { principal, token })
    }
}

/// A JSON body, kept unparsed until the caller is authenticated
pub struct Payload(Result<Value, String>);

impl Payload {
    /// Authenticate, then filter through `allow_list` and parse
    pub fn parse<T: DeserializeOwned>(self, principal: &Principal, allow_list: &AllowList) -> ApiResult<T> {
        principal.require()?;
        self.filter(allow_list)
    }

    /// Filter through `allow_list` and parse.
    ///
    /// Handlers addressing an existing resource call this only after the
    /// caller has been resolved against it, so a stranger gets 404 whatever
    /// the body holds.
    pub fn filter<T: DeserializeOwned>(self, allow_list: &AllowList) -> ApiResult<T> {
        let value = self
            .0
            .map_err(|message| DisclosureError::invalid(NON_FIELD_ERRORS, message))?;
        Ok(allow_list.parse(value)?)
    }

    /// Parse without an allow-list, for unauthenticated endpoints
    pub fn into_typed<T: DeserializeOwned>(self) -> ApiResult<T> {
        let value = self
            .0
            .map_err(|message| DisclosureError::invalid(NON_FIELD_ERRORS, message))?;
        serde_json::from_value(value)
            .map_err(|e| DisclosureError::invalid(NON_FIELD_ERRORS, e.to_string()).into())
    }
}

#[async_trait]
impl<S> FromRequest<S> for Payload
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Json::<Value>::from_request(req, state)
            .await
            .map(|Json(value)| value)
            .map_err(|rejection| rejection.body_text());
        Ok(Payload(body))
    }
}
