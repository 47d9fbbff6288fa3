//! Capability interface over the SQL server that hosts tenants.
//!
//! The control loop only depends on [`DatabaseStateReconciler`]; each
//! relational engine provides one adapter implementing it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TenantStateError;

/// Where the administrative connection points.
///
/// Carries no credentials; the admin user and password stay inside the
/// backend's own configuration. Read once at startup and never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub host: String,
    pub port: u16,
    pub database: String,
}

/// What happened to the role during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleAction {
    Created,
    PasswordUpdated,
}

/// Mutations performed by one tenant-state reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantReport {
    pub database_created: bool,
    pub role: RoleAction,
    pub grant_issued: bool,
}

impl TenantReport {
    /// Number of objects created (database, role, grant).
    #[must_use]
    pub fn creates(&self) -> usize {
        usize::from(self.database_created)
            + usize::from(self.role == RoleAction::Created)
            + usize::from(self.grant_issued)
    }
}

/// Idempotent convergence of a database, a role and a grant.
///
/// Every mutating operation checks for existence first, so calling any of
/// them again after a partial failure is safe. Implementations add no locking
/// of their own.
#[async_trait]
pub trait DatabaseStateReconciler: Send + Sync {
    /// The administrative connection, used for the tenant's host and port.
    fn connection_config(&self) -> &ConnectionInfo;

    /// Creates `name` unless it exists. Returns `true` if it was created.
    async fn ensure_database(&self, name: &str) -> Result<bool, TenantStateError>;

    /// Creates `name` with `password`, or resets the password of an existing role.
    async fn ensure_role(&self, name: &str, password: &str)
    -> Result<RoleAction, TenantStateError>;

    /// Grants all privileges on `database` to `role` unless already granted.
    /// Returns `true` if a grant was issued.
    async fn ensure_grant(&self, role: &str, database: &str) -> Result<bool, TenantStateError>;

    /// Runs database, role and grant in that order, stopping at the first error.
    ///
    /// No rollback is attempted: the existence checks absorb partial progress
    /// on the next invocation.
    async fn reconcile_tenant_state(
        &self,
        role: &str,
        database: &str,
        password: &str,
    ) -> Result<TenantReport, TenantStateError> {
        let database_created = self.ensure_database(database).await?;
        let role_action = self.ensure_role(role, password).await?;
        let grant_issued = self.ensure_grant(role, database).await?;
        Ok(TenantReport {
            database_created,
            role: role_action,
            grant_issued,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_creates() {
        let first = TenantReport {
            database_created: true,
            role: RoleAction::Created,
            grant_issued: true,
        };
        assert_eq!(first.creates(), 3);

        let again = TenantReport {
            database_created: false,
            role: RoleAction::PasswordUpdated,
            grant_issued: false,
        };
        assert_eq!(again.creates(), 0);
    }

    #[test]
    fn test_connection_info_carries_no_credentials() {
        let info = ConnectionInfo {
            host: "localhost".into(),
            port: 5432,
            database: "postgres".into(),
        };
        let json = serde_json::to_value(&info).unwrap();
        let mut keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["database", "host", "port"]);
    }
}
