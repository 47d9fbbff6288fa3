//! Resource model shared with the resource store.
//!
//! Field names follow the store's camelCase wire format so descriptors and
//! secrets round-trip through JSON unchanged.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// API group of the `PostgresDatabase` descriptor.
pub const API_GROUP: &str = "db.pgdb.dev";

/// `apiVersion` of the `PostgresDatabase` descriptor.
pub const API_VERSION: &str = "db.pgdb.dev/v1beta1";

/// Kind of the descriptor.
pub const POSTGRES_DATABASE_KIND: &str = "PostgresDatabase";

/// Kind of the secret artifact.
pub const SECRET_KIND: &str = "Secret";

/// Type of the secret artifact.
pub const SECRET_TYPE_OPAQUE: &str = "Opaque";

/// Namespaced name of a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Lifecycle link from a dependent object to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_owner_deletion: Option<bool>,
}

/// Object metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    /// Assigned by the store on creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
}

impl ObjectMeta {
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(&self.namespace, &self.name)
    }

    /// Returns `true` if any owner reference points at `uid`.
    #[must_use]
    pub fn is_owned_by(&self, uid: &str) -> bool {
        self.owner_references.iter().any(|r| r.uid == uid)
    }
}

/// Desired tenant as declared by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostgresDatabaseSpec {
    /// Name of the database to provision.
    pub database_name: String,
    /// Appended verbatim to `database_name` to form the role name.
    #[serde(default)]
    pub user_name_post_fix: String,
    /// Name of the secret that receives the credentials.
    pub secret_name: String,
}

impl PostgresDatabaseSpec {
    /// Role name: `database_name` immediately followed by `user_name_post_fix`.
    #[must_use]
    pub fn role_name(&self) -> String {
        format!("{}{}", self.database_name, self.user_name_post_fix)
    }
}

/// The `PostgresDatabase` descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostgresDatabase {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: PostgresDatabaseSpec,
}

fn default_api_version() -> String {
    API_VERSION.into()
}
fn default_kind() -> String {
    POSTGRES_DATABASE_KIND.into()
}

impl PostgresDatabase {
    #[must_use]
    pub fn new(metadata: ObjectMeta, spec: PostgresDatabaseSpec) -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            metadata,
            spec,
        }
    }

    #[must_use]
    pub fn key(&self) -> ObjectKey {
        self.metadata.key()
    }

    /// Controller owner reference pointing at this descriptor.
    ///
    /// Returns `None` until the store has assigned a uid.
    #[must_use]
    pub fn controller_owner_ref(&self) -> Option<OwnerReference> {
        let uid = self.metadata.uid.clone()?;
        Some(OwnerReference {
            api_version: self.api_version.clone(),
            kind: self.kind.clone(),
            name: self.metadata.name.clone(),
            uid,
            controller: Some(true),
            block_owner_deletion: Some(true),
        })
    }
}

/// Opaque key/value secret; `data` values are base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Secret {
    #[serde(default = "default_secret_api_version")]
    pub api_version: String,
    #[serde(default = "default_secret_kind")]
    pub kind: String,
    pub metadata: ObjectMeta,
    #[serde(rename = "type", default = "default_secret_type")]
    pub type_: String,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

fn default_secret_api_version() -> String {
    "v1".into()
}
fn default_secret_kind() -> String {
    SECRET_KIND.into()
}
fn default_secret_type() -> String {
    SECRET_TYPE_OPAQUE.into()
}

impl Secret {
    /// Creates an empty opaque secret.
    #[must_use]
    pub fn opaque(metadata: ObjectMeta) -> Self {
        Self {
            api_version: default_secret_api_version(),
            kind: default_secret_kind(),
            metadata,
            type_: default_secret_type(),
            data: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn key(&self) -> ObjectKey {
        self.metadata.key()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_descriptor_from_json() {
        let descriptor: PostgresDatabase = serde_json::from_value(json!({
            "apiVersion": "db.pgdb.dev/v1beta1",
            "kind": "PostgresDatabase",
            "metadata": {"name": "db", "namespace": "team-a", "uid": "1234"},
            "spec": {
                "databaseName": "db_test",
                "userNamePostFix": "@host1",
                "secretName": "secret-test"
            }
        }))
        .unwrap();

        assert_eq!(descriptor.key(), ObjectKey::new("team-a", "db"));
        assert_eq!(descriptor.spec.role_name(), "db_test@host1");
    }

    #[test]
    fn test_missing_postfix_defaults_to_empty() {
        let spec: PostgresDatabaseSpec = serde_json::from_value(json!({
            "databaseName": "orders",
            "secretName": "orders-creds"
        }))
        .unwrap();
        assert_eq!(spec.role_name(), "orders");
    }

    #[test]
    fn test_controller_owner_ref_requires_uid() {
        let mut descriptor = PostgresDatabase::new(
            ObjectMeta::new("ns", "db"),
            PostgresDatabaseSpec {
                database_name: "db".into(),
                user_name_post_fix: String::new(),
                secret_name: "s".into(),
            },
        );
        assert!(descriptor.controller_owner_ref().is_none());

        descriptor.metadata.uid = Some("uid-1".into());
        let owner = descriptor.controller_owner_ref().unwrap();
        assert_eq!(owner.api_version, API_VERSION);
        assert_eq!(owner.kind, POSTGRES_DATABASE_KIND);
        assert_eq!(owner.name, "db");
        assert_eq!(owner.uid, "uid-1");
        assert_eq!(owner.controller, Some(true));
        assert_eq!(owner.block_owner_deletion, Some(true));
    }

    #[test]
    fn test_secret_wire_format() {
        let secret = Secret::opaque(ObjectMeta::new("ns", "creds"));
        let value = serde_json::to_value(&secret).unwrap();
        assert_eq!(value["apiVersion"], "v1");
        assert_eq!(value["kind"], "Secret");
        assert_eq!(value["type"], "Opaque");
        assert!(value["metadata"].get("ownerReferences").is_none());
    }
}
