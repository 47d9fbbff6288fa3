//! In-memory resource store.
//!
//! Used by tests and local runs. Deleting a descriptor garbage-collects the
//! secrets it owns, mirroring what the cluster store does for owner
//! references.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreError;
use crate::resources::{ObjectKey, PostgresDatabase, SECRET_KIND, Secret};
use crate::store::ResourceStore;

/// Concurrent in-memory store for descriptors and secrets.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    descriptors: DashMap<ObjectKey, PostgresDatabase>,
    secrets: DashMap<ObjectKey, Secret>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or updates a descriptor.
    ///
    /// A new descriptor gets a fresh uid; an update keeps the stored one.
    pub fn apply_descriptor(&self, mut descriptor: PostgresDatabase) -> PostgresDatabase {
        let key = descriptor.key();
        match self.descriptors.entry(key) {
            Entry::Occupied(mut existing) => {
                descriptor.metadata.uid = existing.get().metadata.uid.clone();
                existing.insert(descriptor.clone());
            }
            Entry::Vacant(slot) => {
                if descriptor.metadata.uid.is_none() {
                    descriptor.metadata.uid = Some(Uuid::new_v4().to_string());
                }
                slot.insert(descriptor.clone());
            }
        }
        descriptor
    }

    /// Deletes a descriptor and every secret that names it as owner.
    pub fn delete_descriptor(&self, key: &ObjectKey) -> Option<PostgresDatabase> {
        let (_, descriptor) = self.descriptors.remove(key)?;
        if let Some(uid) = descriptor.metadata.uid.as_deref() {
            self.secrets.retain(|secret_key, secret| {
                let owned = secret_key.namespace == key.namespace && secret.metadata.is_owned_by(uid);
                if owned {
                    debug!(secret = %secret_key, owner = %key, "Collecting owned secret");
                }
                !owned
            });
        }
        Some(descriptor)
    }

    /// Returns all secrets in `namespace`, ordered by name.
    #[must_use]
    pub fn secrets_in(&self, namespace: &str) -> Vec<Secret> {
        let mut secrets: Vec<Secret> = self
            .secrets
            .iter()
            .filter(|entry| entry.key().namespace == namespace)
            .map(|entry| entry.value().clone())
            .collect();
        secrets.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
        secrets
    }
}

#[async_trait]
impl ResourceStore for InMemoryStore {
    async fn get_descriptor(
        &self,
        key: &ObjectKey,
    ) -> Result<Option<PostgresDatabase>, StoreError> {
        Ok(self.descriptors.get(key).map(|d| d.value().clone()))
    }

    async fn get_secret(&self, key: &ObjectKey) -> Result<Option<Secret>, StoreError> {
        Ok(self.secrets.get(key).map(|s| s.value().clone()))
    }

    async fn create_secret(&self, secret: &Secret) -> Result<Secret, StoreError> {
        let key = secret.key();
        match self.secrets.entry(key) {
            Entry::Occupied(existing) => Err(StoreError::already_exists(
                SECRET_KIND,
                &existing.key().namespace,
                &existing.key().name,
            )),
            Entry::Vacant(slot) => {
                let mut stored = secret.clone();
                stored.metadata.uid = Some(Uuid::new_v4().to_string());
                slot.insert(stored.clone());
                Ok(stored)
            }
        }
    }

    async fn replace_secret(&self, secret: &Secret) -> Result<Secret, StoreError> {
        let key = secret.key();
        match self.secrets.get_mut(&key) {
            Some(mut existing) => {
                let mut stored = secret.clone();
                stored.metadata.uid = existing.metadata.uid.clone();
                *existing = stored.clone();
                Ok(stored)
            }
            None => Err(StoreError::not_found(SECRET_KIND, key.namespace, key.name)),
        }
    }
}
