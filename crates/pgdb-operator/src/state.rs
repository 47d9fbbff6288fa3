use std::sync::Arc;

use async_trait::async_trait;
use pgdb_core::{CredentialGenerator, DatabaseStateReconciler, SecretPersistPolicy};
use pgdb_postgres::PostgresServer;

/// Backs the readiness endpoint.
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    async fn check(&self) -> Result<(), String>;
}

#[async_trait]
impl ReadinessProbe for PostgresServer {
    async fn check(&self) -> Result<(), String> {
        self.ping().await.map_err(|e| e.to_string())
    }
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub database: Arc<dyn DatabaseStateReconciler>,
    pub credentials: Arc<dyn CredentialGenerator>,
    pub readiness: Arc<dyn ReadinessProbe>,
    pub persist_policy: SecretPersistPolicy,
}

impl AppState {
    /// State backed by a single PostgreSQL server for both tenant state and readiness.
    pub fn postgres(
        server: Arc<PostgresServer>,
        credentials: Arc<dyn CredentialGenerator>,
        persist_policy: SecretPersistPolicy,
    ) -> Self {
        Self {
            database: server.clone(),
            credentials,
            readiness: server,
            persist_policy,
        }
    }
}
