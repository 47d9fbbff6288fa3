//! Resource store abstraction.
//!
//! The store owns descriptors and secrets. Garbage collection of objects
//! whose owner reference points at a deleted descriptor is the store's
//! responsibility; nothing here deletes secrets.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::resources::{ObjectKey, PostgresDatabase, Secret};

/// Namespaced access to descriptors and secrets.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Fetches a descriptor. Returns `None` if it does not exist.
    async fn get_descriptor(&self, key: &ObjectKey)
    -> Result<Option<PostgresDatabase>, StoreError>;

    /// Fetches a secret. Returns `None` if it does not exist.
    async fn get_secret(&self, key: &ObjectKey) -> Result<Option<Secret>, StoreError>;

    /// Creates a secret.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] if a secret with the same key exists.
    async fn create_secret(&self, secret: &Secret) -> Result<Secret, StoreError>;

    /// Replaces an existing secret.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the secret does not exist.
    async fn replace_secret(&self, secret: &Secret) -> Result<Secret, StoreError>;
}

/// Type alias for a shareable store.
pub type DynResourceStore = Arc<dyn ResourceStore>;
