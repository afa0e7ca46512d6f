//! idshare HTTP API
//!
//! JSON endpoints over the disclosure core, with password login and bearer
//! session tokens.

pub mod auth;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod routes;
pub mod session;
pub mod state;
pub mod types;

pub use error::{ApiError, ApiResult};
pub use routes::build_router;
pub use state::AppState;
