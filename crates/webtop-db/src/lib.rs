//! Webtop Database: SurrealDB connection management, schema migrations
//! and repository implementations.
//!
//! This crate provides:
//! - Opening the store from a `DATABASE_URL` ([`DbManager`], [`DbConfig`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - Idempotent seed data ([`seed_initial_data`])
//! - Error types ([`DbError`])
//! - Implementations of the `webtop-core` repository traits
//!   ([`repository`])

mod connection;
mod error;
pub mod repository;
mod schema;
mod seed;

pub use connection::{DbConfig, DbCredentials, DbManager, StoreEngine};
pub use error::DbError;
pub use schema::run_migrations;
pub use seed::{SeedOptions, seed_initial_data};
