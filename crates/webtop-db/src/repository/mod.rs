//! SurrealDB repository implementations.

mod application;
mod session;
mod settings;
mod user;

pub use application::SurrealApplicationRepository;
pub use session::SurrealSessionRepository;
pub use settings::SurrealSettingsRepository;
pub use user::SurrealUserRepository;
