//! PostgreSQL implementation of [`DatabaseStateReconciler`].
//!
//! Every DDL statement is preceded by a catalog lookup. Lookups bind the raw
//! name as a parameter; DDL, which cannot take parameters, embeds names only
//! in their sanitized, double-quoted form.

use async_trait::async_trait;
use sqlx_core::query_scalar::query_scalar;
use sqlx_core::raw_sql::raw_sql;
use sqlx_postgres::PgPool;
use tracing::{debug, info, instrument};

use pgdb_core::{
    ConnectionInfo, DatabaseStateReconciler, RoleAction, SafeIdentifier, TenantReport,
    TenantStateError, TenantStep, quote_literal, sanitize,
};

use crate::config::PostgresConfig;
use crate::error::{Result, tenant_error};
use crate::pool::{create_pool, test_connection};

/// Tenant-state reconciler backed by a PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PostgresServer {
    pool: PgPool,
    connection: ConnectionInfo,
}

impl PostgresServer {
    /// Creates a server handle from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn connect(config: &PostgresConfig) -> Result<Self> {
        let connection = config.connection_info()?;
        let pool = create_pool(config)?;
        Ok(Self::from_pool(pool, connection))
    }

    /// Creates a server handle from an existing pool.
    #[must_use]
    pub fn from_pool(pool: PgPool, connection: ConnectionInfo) -> Self {
        Self { pool, connection }
    }

    /// Returns a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Round-trips a trivial query.
    ///
    /// # Errors
    ///
    /// Returns an error if the server is unreachable.
    pub async fn ping(&self) -> Result<()> {
        test_connection(&self.pool).await
    }

    /// Checks `pg_database` for `name`.
    pub async fn database_exists(&self, name: &str) -> std::result::Result<bool, sqlx_core::Error> {
        query_scalar("SELECT EXISTS (SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(name)
            .fetch_one(&self.pool)
            .await
    }

    /// Checks `pg_roles` for `name`.
    pub async fn role_exists(&self, name: &str) -> std::result::Result<bool, sqlx_core::Error> {
        query_scalar("SELECT EXISTS (SELECT 1 FROM pg_roles WHERE rolname = $1)")
            .bind(name)
            .fetch_one(&self.pool)
            .await
    }

    /// Reports whether `role` holds the grant on `database`.
    ///
    /// `CREATE` is only obtained through an explicit grant or ownership, so
    /// it stands in for the full `ALL PRIVILEGES` set.
    pub async fn role_has_privileges(
        &self,
        role: &str,
        database: &str,
    ) -> std::result::Result<bool, sqlx_core::Error> {
        query_scalar("SELECT has_database_privilege($1::name, $2::text, 'CREATE')")
            .bind(role)
            .bind(database)
            .fetch_one(&self.pool)
            .await
    }

    async fn execute(&self, step: TenantStep, statement: &str) -> std::result::Result<(), TenantStateError> {
        raw_sql(statement)
            .execute(&self.pool)
            .await
            .map_err(|e| tenant_error(step, &e))?;
        Ok(())
    }
}

/// `CREATE USER` or `ALTER USER` with only the password clause, so an
/// existing role keeps its other attributes.
fn user_statement(verb: &str, role: &SafeIdentifier, password_literal: &str) -> String {
    format!(
        "{verb} USER {} WITH ENCRYPTED PASSWORD {password_literal}",
        role.quoted()
    )
}

fn sanitized(step: TenantStep, name: &str) -> std::result::Result<SafeIdentifier, TenantStateError> {
    sanitize(name).map_err(|e| TenantStateError::invalid_identifier(step, &e))
}

#[async_trait]
impl DatabaseStateReconciler for PostgresServer {
    fn connection_config(&self) -> &ConnectionInfo {
        &self.connection
    }

    #[instrument(skip(self))]
    async fn ensure_database(&self, name: &str) -> std::result::Result<bool, TenantStateError> {
        let database = sanitized(TenantStep::Database, name)?;

        let exists = self
            .database_exists(database.as_str())
            .await
            .map_err(|e| tenant_error(TenantStep::Database, &e))?;
        if exists {
            debug!("Database already exists");
            return Ok(false);
        }

        self.execute(
            TenantStep::Database,
            &format!("CREATE DATABASE {}", database.quoted()),
        )
        .await?;
        info!("Created database");
        Ok(true)
    }

    #[instrument(skip(self, password))]
    async fn ensure_role(
        &self,
        name: &str,
        password: &str,
    ) -> std::result::Result<RoleAction, TenantStateError> {
        let role = sanitized(TenantStep::Role, name)?;
        let password = quote_literal(password)
            .map_err(|e| TenantStateError::invalid_identifier(TenantStep::Role, &e))?;

        let exists = self
            .role_exists(role.as_str())
            .await
            .map_err(|e| tenant_error(TenantStep::Role, &e))?;

        if exists {
            self.execute(TenantStep::Role, &user_statement("ALTER", &role, &password))
                .await?;
            info!("Updated role password");
            Ok(RoleAction::PasswordUpdated)
        } else {
            self.execute(TenantStep::Role, &user_statement("CREATE", &role, &password))
                .await?;
            info!("Created role");
            Ok(RoleAction::Created)
        }
    }

    #[instrument(skip(self))]
    async fn ensure_grant(&self, role: &str, database: &str) -> std::result::Result<bool, TenantStateError> {
        let role = sanitized(TenantStep::Grant, role)?;
        let database = sanitized(TenantStep::Grant, database)?;

        let granted = self
            .role_has_privileges(role.as_str(), database.as_str())
            .await
            .map_err(|e| tenant_error(TenantStep::Grant, &e))?;
        if granted {
            debug!("Privileges already granted");
            return Ok(false);
        }

        self.execute(
            TenantStep::Grant,
            &format!(
                "GRANT ALL PRIVILEGES ON DATABASE {} TO {}",
                database.quoted(),
                role.quoted()
            ),
        )
        .await?;
        info!("Granted privileges");
        Ok(true)
    }

    /// Validates both names before any statement, then runs the three steps.
    async fn reconcile_tenant_state(
        &self,
        role: &str,
        database: &str,
        password: &str,
    ) -> std::result::Result<TenantReport, TenantStateError> {
        sanitized(TenantStep::Database, database)?;
        sanitized(TenantStep::Role, role)?;
        quote_literal(password)
            .map_err(|e| TenantStateError::invalid_identifier(TenantStep::Role, &e))?;

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
    fn test_user_statements_only_set_the_password() {
        let role = sanitize("db_test@host1").unwrap();
        let literal = quote_literal("it's").unwrap();

        assert_eq!(
            user_statement("CREATE", &role, &literal),
            r#"CREATE USER "db_test@host1" WITH ENCRYPTED PASSWORD 'it''s'"#
        );
        let alter = user_statement("ALTER", &role, &literal);
        assert!(alter.starts_with(r#"ALTER USER "db_test@host1" WITH ENCRYPTED PASSWORD"#));
        assert!(!alter.contains("LOGIN"));
    }
}
