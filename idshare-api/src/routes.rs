//! API routes definition

use crate::handlers::{self, auth, disclosure, profile, received, sent};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

/// Build the API router with all endpoints
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Accounts
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        // Profile identity variants
        .route("/profile/identity-variants", get(profile::list).post(profile::create))
        .route(
            "/profile/identity-variants/:id",
            get(profile::get).patch(profile::update).delete(profile::delete),
        )
        // Sender
        .route("/requests/sent", get(sent::list).post(sent::create))
        .route(
            "/requests/sent/:id",
            get(sent::get).patch(sent::update).delete(sent::delete),
        )
        .route(
            "/requests/sent/:id/variants",
            get(sent::list_variants).post(sent::create_variant),
        )
        .route(
            "/requests/sent/:id/variants/:vid",
            get(sent::get_variant)
                .patch(sent::update_variant)
                .delete(sent::delete_variant),
        )
        // Receiver
        .route("/requests/received", get(received::list))
        .route("/requests/received/:id", get(received::get))
        .route("/requests/received/:id/accept", post(received::accept))
        .route("/requests/received/:id/deny", post(received::deny))
        .route("/requests/received/:id/variants", get(received::list_variants))
        .route(
            "/requests/received/:id/variants/:vid",
            get(received::get_variant).patch(received::update_variant),
        )
        // Either party
        .route("/disclosures/:vid", get(disclosure::get))
        .with_state(state)
}
