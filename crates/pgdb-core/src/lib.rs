//! Desired-state reconciliation for PostgreSQL tenants.
//!
//! A `PostgresDatabase` descriptor declares a database, a login role derived
//! from it, and the name of a secret that should receive the role's
//! credentials. This crate contains everything that does not depend on a
//! concrete SQL engine or resource store:
//!
//! - [`resources`]: descriptor and secret types in the store's wire format
//! - [`store`]: the [`ResourceStore`] trait, with an in-memory implementation in [`memory`]
//! - [`identifier`]: quoting of identifiers and literals for DDL
//! - [`credentials`]: random password generation
//! - [`secret`]: building connection strings and secret artifacts
//! - [`tenant`]: the [`DatabaseStateReconciler`] capability implemented per backend
//! - [`controller`]: the reconcile control loop
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pgdb_core::prelude::*;
//!
//! # async fn example(server: Arc<dyn DatabaseStateReconciler>) -> Result<(), ReconcileError> {
//! let store = Arc::new(InMemoryStore::new());
//! let controller = PostgresDatabaseController::new(
//!     store.clone(),
//!     server,
//!     Arc::new(PasswordGenerator::default()),
//! );
//! let outcome = controller.reconcile(&ObjectKey::new("team-a", "orders")).await?;
//! # Ok(())
//! # }
//! ```

pub mod controller;
pub mod credentials;
pub mod error;
pub mod identifier;
pub mod memory;
pub mod resources;
pub mod secret;
pub mod store;
pub mod tenant;

pub use controller::{
    PostgresDatabaseController, ReconcileOutcome, SecretAction, SecretPersistPolicy,
};
pub use credentials::{CredentialGenerator, PasswordGenerator, PasswordPolicy};
pub use error::{
    CredentialError, EncodingError, ErrorKind, IdentifierError, ReconcileError, StoreError,
    TenantErrorKind, TenantStateError, TenantStep,
};
pub use identifier::{SafeIdentifier, quote_literal, sanitize};
pub use memory::InMemoryStore;
pub use resources::{ObjectKey, ObjectMeta, OwnerReference, PostgresDatabase, PostgresDatabaseSpec, Secret};
pub use store::{DynResourceStore, ResourceStore};
pub use tenant::{ConnectionInfo, DatabaseStateReconciler, RoleAction, TenantReport};

/// Prelude module for convenient imports.
///
/// ```ignore
/// use pgdb_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::controller::{PostgresDatabaseController, ReconcileOutcome, SecretPersistPolicy};
    pub use crate::credentials::{CredentialGenerator, PasswordGenerator, PasswordPolicy};
    pub use crate::error::{ReconcileError, StoreError, TenantStateError};
    pub use crate::memory::InMemoryStore;
    pub use crate::resources::{ObjectKey, PostgresDatabase, Secret};
    pub use crate::store::{DynResourceStore, ResourceStore};
    pub use crate::tenant::{ConnectionInfo, DatabaseStateReconciler};
}
