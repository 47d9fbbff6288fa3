//! pgdb-operator: HTTP hook and process wiring around the tenant controller.

pub mod config;
pub mod error;
pub mod handlers;
pub mod hook;
pub mod observability;
pub mod server;
pub mod state;

pub use config::AppConfig;
pub use error::ApiError;
pub use hook::{HookStore, SyncRequest, SyncResponse};
pub use server::{OperatorServer, ServerBuilder, build_app};
pub use state::{AppState, ReadinessProbe};
