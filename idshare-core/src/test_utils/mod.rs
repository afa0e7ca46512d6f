//! Test utilities and helpers for idshare
//!
//! Fixtures for building a populated disclosure world and assertions over
//! `DisclosureError` variants. Available to other crates through the
//! `test-utils` feature.

pub mod assertions;
pub mod fixtures;

pub use assertions::*;
pub use fixtures::*;
