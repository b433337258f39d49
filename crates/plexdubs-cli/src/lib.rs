//! Webhook server that keeps a Plex collection of freshly dubbed anime

pub mod error;
pub mod server;

pub use error::{ApiError, ApiResult};
pub use server::{build_router, AppState};
