//! Reconcile control loop for `PostgresDatabase` descriptors.
//!
//! One invocation runs fetch → generate → assemble → reconcile tenant state →
//! persist secret, strictly in that order. The scheduler that calls
//! [`PostgresDatabaseController::reconcile`] is expected to serialize
//! invocations per descriptor key and to re-drive failed invocations; the
//! controller itself holds no locks and spawns nothing.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::credentials::CredentialGenerator;
use crate::error::{ReconcileError, Result};
use crate::resources::{ObjectKey, PostgresDatabase, Secret};
use crate::secret::{build_connection_config, build_secret};
use crate::store::DynResourceStore;
use crate::tenant::{DatabaseStateReconciler, TenantReport};

/// How the secret artifact is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretPersistPolicy {
    /// Create only; an existing secret fails the invocation with a conflict.
    #[default]
    Create,
    /// Create, or replace a secret already owned by the same descriptor.
    CreateOrReplace,
}

/// How the secret was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretAction {
    Created,
    Replaced,
}

/// Successful result of one reconcile invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The descriptor no longer exists; cleanup is left to the store.
    Deleted,
    /// The tenant was converged and its secret persisted.
    Provisioned {
        secret: ObjectKey,
        tenant: TenantReport,
        action: SecretAction,
    },
}

/// Drives descriptors toward their provisioned state.
#[derive(Clone)]
pub struct PostgresDatabaseController {
    store: DynResourceStore,
    database: Arc<dyn DatabaseStateReconciler>,
    credentials: Arc<dyn CredentialGenerator>,
    persist_policy: SecretPersistPolicy,
}

impl PostgresDatabaseController {
    #[must_use]
    pub fn new(
        store: DynResourceStore,
        database: Arc<dyn DatabaseStateReconciler>,
        credentials: Arc<dyn CredentialGenerator>,
    ) -> Self {
        Self {
            store,
            database,
            credentials,
            persist_policy: SecretPersistPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_persist_policy(mut self, policy: SecretPersistPolicy) -> Self {
        self.persist_policy = policy;
        self
    }

    #[must_use]
    pub fn persist_policy(&self) -> SecretPersistPolicy {
        self.persist_policy
    }

    #[must_use]
    pub fn database(&self) -> &Arc<dyn DatabaseStateReconciler> {
        &self.database
    }

    /// Runs one reconcile invocation for the descriptor at `key`.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error; see
    /// [`ReconcileError::is_retryable`] for scheduling.
    #[instrument(skip_all, fields(descriptor = %key))]
    pub async fn reconcile(&self, key: &ObjectKey) -> Result<ReconcileOutcome> {
        let result = self.run(key).await;
        match &result {
            Ok(ReconcileOutcome::Deleted) => {
                debug!("Descriptor not found, nothing to do");
            }
            Ok(ReconcileOutcome::Provisioned {
                secret,
                tenant,
                action,
            }) => {
                info!(
                    secret = %secret,
                    database_created = tenant.database_created,
                    role = ?tenant.role,
                    grant_issued = tenant.grant_issued,
                    secret_action = ?action,
                    "PostgresDatabase reconciled"
                );
            }
            Err(err) => {
                warn!(
                    error = %err,
                    kind = %err.kind(),
                    retryable = err.is_retryable(),
                    "PostgresDatabase reconcile failed"
                );
            }
        }
        result
    }

    async fn run(&self, key: &ObjectKey) -> Result<ReconcileOutcome> {
        // 1. Fetch
        let Some(descriptor) = self.fetch(key).await? else {
            return Ok(ReconcileOutcome::Deleted);
        };

        // 2. Generate
        let password = self.credentials.generate()?;

        // 3. Assemble
        let admin = self.database.connection_config();
        let tenant_config = build_connection_config(&password, &descriptor.spec, admin);
        let secret = build_secret(&descriptor, &tenant_config)?;

        // 4. Reconcile tenant state
        let tenant = self
            .database
            .reconcile_tenant_state(
                &tenant_config.user,
                &tenant_config.database,
                &tenant_config.password,
            )
            .await?;

        // 5. Persist secret
        let action = self.persist(&descriptor, &secret).await?;

        Ok(ReconcileOutcome::Provisioned {
            secret: secret.key(),
            tenant,
            action,
        })
    }

    async fn fetch(&self, key: &ObjectKey) -> Result<Option<PostgresDatabase>> {
        match self.store.get_descriptor(key).await {
            Ok(descriptor) => Ok(descriptor),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn persist(&self, descriptor: &PostgresDatabase, secret: &Secret) -> Result<SecretAction> {
        let err = match self.store.create_secret(secret).await {
            Ok(_) => return Ok(SecretAction::Created),
            Err(err) => err,
        };
        if !err.is_already_exists() || self.persist_policy == SecretPersistPolicy::Create {
            return Err(err.into());
        }

        // Only take over a secret that this descriptor already owns.
        let key = secret.key();
        let owned = match (self.store.get_secret(&key).await?, descriptor.metadata.uid.as_deref()) {
            (Some(existing), Some(uid)) => existing.metadata.is_owned_by(uid),
            _ => false,
        };
        if !owned {
            return Err(ReconcileError::Conflict {
                namespace: key.namespace,
                name: key.name,
            });
        }

        self.store.replace_secret(secret).await?;
        Ok(SecretAction::Replaced)
    }
}
