//! # Roamcast Gateway
//! HTTP surface: the externally-driven poll endpoint, manual generation,
//! schedule introspection, comment ingestion, and the Telegram webhook with
//! its admin-command dispatcher.

pub mod commands;
pub mod routes;
pub mod server;

pub use server::{build_router, start, AppState};
