//! Webtop Core: domain models, identity, repository and gateway traits
//! shared by every other webtop crate.
//!
//! Nothing in this crate performs I/O. Storage lives in `webtop-db`, the
//! container platform client in `webtop-gateway`.

pub mod error;
pub mod gateway;
pub mod identity;
pub mod models;
pub mod repository;

pub use error::{WebtopError, WebtopResult};
pub use identity::{CallerIdentity, Role};
