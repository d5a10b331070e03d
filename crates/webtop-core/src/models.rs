//! Domain models for webtop.
//!
//! These are the core types shared across all crates.

pub mod application;
pub mod session;
pub mod setting;
pub mod user;
