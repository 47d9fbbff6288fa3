//! Request-scoped resource store for the sync hook.
//!
//! An external controller framework posts the descriptor together with the
//! secrets it currently observes. [`HookStore`] serves reads from that body
//! and records writes, which become the desired children in the response.

use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::DashMap;
use pgdb_core::resources::SECRET_KIND;
use pgdb_core::{ObjectKey, PostgresDatabase, ResourceStore, Secret, StoreError};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Body of `POST /sync`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRequest {
    pub parent: PostgresDatabase,
    #[serde(default)]
    pub children: ObservedChildren,
}

/// Observed children, keyed by name under the `Secret.v1` group.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservedChildren {
    #[serde(rename = "Secret.v1", default)]
    pub secrets: BTreeMap<String, Secret>,
}

/// Response of `POST /sync`: the complete set of desired children.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResponse {
    pub children: Vec<Secret>,
}

pub struct HookStore {
    parent: PostgresDatabase,
    observed: BTreeMap<String, Secret>,
    written: DashMap<String, Secret>,
}

impl HookStore {
    pub fn new(request: SyncRequest) -> Self {
        let namespace = request.parent.metadata.namespace.clone();
        let observed = request
            .children
            .secrets
            .into_iter()
            .map(|(name, mut secret)| {
                // Children of a namespaced parent live in its namespace.
                if secret.metadata.namespace.is_empty() {
                    secret.metadata.namespace = namespace.clone();
                }
                (name, secret)
            })
            .collect();
        Self {
            parent: request.parent,
            observed,
            written: DashMap::new(),
        }
    }

    pub fn parent_key(&self) -> ObjectKey {
        self.parent.key()
    }

    /// Observed secrets overlaid with the ones written during this request,
    /// ordered by name.
    pub fn children(&self) -> Vec<Secret> {
        let mut merged = self.observed.clone();
        for entry in self.written.iter() {
            merged.insert(entry.key().clone(), entry.value().clone());
        }
        merged.into_values().collect()
    }

    fn in_scope(&self, key: &ObjectKey) -> bool {
        key.namespace == self.parent.metadata.namespace
    }

    fn lookup(&self, name: &str) -> Option<Secret> {
        self.written
            .get(name)
            .map(|s| s.value().clone())
            .or_else(|| self.observed.get(name).cloned())
    }
}

#[async_trait]
impl ResourceStore for HookStore {
    async fn get_descriptor(
        &self,
        key: &ObjectKey,
    ) -> Result<Option<PostgresDatabase>, StoreError> {
        Ok((*key == self.parent.key()).then(|| self.parent.clone()))
    }

    async fn get_secret(&self, key: &ObjectKey) -> Result<Option<Secret>, StoreError> {
        if !self.in_scope(key) {
            return Ok(None);
        }
        Ok(self.lookup(&key.name))
    }

    async fn create_secret(&self, secret: &Secret) -> Result<Secret, StoreError> {
        let key = secret.key();
        if !self.in_scope(&key) {
            return Err(StoreError::internal(format!(
                "secret {key} is outside the parent namespace"
            )));
        }
        if self.lookup(&key.name).is_some() {
            return Err(StoreError::already_exists(SECRET_KIND, key.namespace, key.name));
        }
        debug!(secret = %key, "Recording secret creation");
        self.written.insert(key.name, secret.clone());
        Ok(secret.clone())
    }

    async fn replace_secret(&self, secret: &Secret) -> Result<Secret, StoreError> {
        let key = secret.key();
        let Some(existing) = self.in_scope(&key).then(|| self.lookup(&key.name)).flatten() else {
            return Err(StoreError::not_found(SECRET_KIND, key.namespace, key.name));
        };
        let mut replaced = secret.clone();
        replaced.metadata.uid = existing.metadata.uid;
        debug!(secret = %key, "Recording secret replacement");
        self.written.insert(key.name, replaced.clone());
        Ok(replaced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(children: serde_json::Value) -> SyncRequest {
        serde_json::from_value(json!({
            "parent": {
                "apiVersion": "db.pgdb.dev/v1beta1",
                "kind": "PostgresDatabase",
                "metadata": { "name": "orders", "namespace": "team-a", "uid": "uid-1" },
                "spec": { "databaseName": "orders", "secretName": "orders-creds" }
            },
            "children": children
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_parent_is_the_only_descriptor() {
        let store = HookStore::new(request(json!({})));
        let parent = store.get_descriptor(&store.parent_key()).await.unwrap();
        assert_eq!(parent.unwrap().spec.secret_name, "orders-creds");
        assert!(
            store
                .get_descriptor(&ObjectKey::new("team-b", "orders"))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_observed_children_conflict_on_create() {
        let store = HookStore::new(request(json!({
            "Secret.v1": {
                "orders-creds": { "metadata": { "name": "orders-creds" }, "data": {} }
            }
        })));
        let key = ObjectKey::new("team-a", "orders-creds");
        let observed = store.get_secret(&key).await.unwrap().unwrap();
        assert_eq!(observed.metadata.namespace, "team-a");

        let err = store.create_secret(&observed).await.unwrap_err();
        assert!(err.is_already_exists());

        let mut updated = observed.clone();
        updated.data.insert("PGUSER".into(), "b3JkZXJz".into());
        store.replace_secret(&updated).await.unwrap();

        let children = store.children();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].data["PGUSER"], "b3JkZXJz");
    }

    #[tokio::test]
    async fn test_created_secrets_are_reported() {
        let store = HookStore::new(request(json!({})));
        let secret = Secret::opaque(pgdb_core::ObjectMeta::new("team-a", "orders-creds"));

        assert!(store.replace_secret(&secret).await.unwrap_err().is_not_found());
        store.create_secret(&secret).await.unwrap();
        assert_eq!(store.children(), vec![secret]);
    }
}
