//! idshare core library
//!
//! Identity-variant disclosure between users: the domain model, the access
//! guard, SQLite persistence, and the ambient configuration, logging and
//! metrics layers.

pub mod config;
pub mod core_disclosure;
pub mod logging;
pub mod metrics;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{Config, ConfigError};
pub use core_disclosure::{DisclosureError, DisclosureManager, DisclosureResult, Principal};
pub use logging::{init_logging, init_logging_with_config, LogConfig, LogLevel};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let _ = LogLevel::Info;
        let _ = Config::default();
        assert!(!Principal::Anonymous.is_authenticated());
    }
}
