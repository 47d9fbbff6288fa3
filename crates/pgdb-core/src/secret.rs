//! Mapping of a provisioned tenant onto its secret artifact.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};

use crate::error::{EncodingError, ReconcileError};
use crate::resources::{ObjectMeta, PostgresDatabase, PostgresDatabaseSpec, Secret};
use crate::tenant::ConnectionInfo;

pub const PGHOST: &str = "PGHOST";
pub const PGPORT: &str = "PGPORT";
pub const PGUSER: &str = "PGUSER";
pub const PGPASSWORD: &str = "PGPASSWORD";
pub const PGDATABASE: &str = "PGDATABASE";
pub const PG_CONNECTION_STRING: &str = "PG_CONNECTION_STRING";

/// Connection parameters handed to the tenant.
#[derive(Clone, PartialEq, Eq)]
pub struct TenantConnectionConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl std::fmt::Debug for TenantConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"****")
            .field("database", &self.database)
            .finish()
    }
}

/// Builds the tenant's connection parameters.
///
/// Host and port come from the administrative connection; the user is
/// `database_name + user_name_post_fix` with no separator.
#[must_use]
pub fn build_connection_config(
    password: &str,
    spec: &PostgresDatabaseSpec,
    admin: &ConnectionInfo,
) -> TenantConnectionConfig {
    TenantConnectionConfig {
        host: admin.host.clone(),
        port: admin.port,
        user: spec.role_name(),
        password: password.to_string(),
        database: spec.database_name.clone(),
    }
}

/// Renders a libpq key/value connection string.
#[must_use]
pub fn build_connection_string(config: &TenantConnectionConfig) -> String {
    let port = config.port.to_string();
    [
        ("host", config.host.as_str()),
        ("port", port.as_str()),
        ("user", config.user.as_str()),
        ("password", config.password.as_str()),
        ("dbname", config.database.as_str()),
    ]
    .iter()
    .map(|(key, value)| format!("{key}={}", quote_conninfo_value(value)))
    .collect::<Vec<_>>()
    .join(" ")
}

/// Quotes a conninfo value when libpq would otherwise misparse it.
fn quote_conninfo_value(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || c == '\'' || c == '\\');
    if !needs_quotes {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        if ch == '\'' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('\'');
    out
}

/// Encodes arbitrary bytes for a text-only key/value store.
#[must_use]
pub fn encode_field(value: &[u8]) -> String {
    BASE64.encode(value)
}

/// Reverses [`encode_field`].
///
/// # Errors
///
/// Returns [`EncodingError::Base64`] on malformed input.
pub fn decode_field(encoded: &str) -> Result<Vec<u8>, EncodingError> {
    Ok(BASE64.decode(encoded)?)
}

/// Decodes a field that is expected to hold UTF-8 text.
///
/// # Errors
///
/// Returns [`EncodingError`] on malformed base64 or non-UTF-8 content.
pub fn decode_field_str(encoded: &str) -> Result<String, EncodingError> {
    let bytes = decode_field(encoded)?;
    String::from_utf8(bytes).map_err(|e| EncodingError::Utf8(e.to_string()))
}

/// Builds the secret artifact for `descriptor`, owned by the descriptor.
///
/// # Errors
///
/// Returns [`ReconcileError::InvalidDescriptor`] if the descriptor has no uid
/// to reference.
pub fn build_secret(
    descriptor: &PostgresDatabase,
    config: &TenantConnectionConfig,
) -> Result<Secret, ReconcileError> {
    let owner = descriptor.controller_owner_ref().ok_or_else(|| {
        ReconcileError::invalid_descriptor(format!(
            "{} has no uid; cannot set owner reference",
            descriptor.key()
        ))
    })?;

    let mut metadata = ObjectMeta::new(
        &descriptor.metadata.namespace,
        &descriptor.spec.secret_name,
    );
    metadata.owner_references = vec![owner];

    let mut secret = Secret::opaque(metadata);
    let port = config.port.to_string();
    let connection_string = build_connection_string(config);
    for (key, value) in [
        (PGHOST, config.host.as_str()),
        (PGPORT, port.as_str()),
        (PGUSER, config.user.as_str()),
        (PGPASSWORD, config.password.as_str()),
        (PGDATABASE, config.database.as_str()),
        (PG_CONNECTION_STRING, connection_string.as_str()),
    ] {
        secret
            .data
            .insert(key.to_string(), encode_field(value.as_bytes()));
    }

    Ok(secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> ConnectionInfo {
        ConnectionInfo {
            host: "pg.internal".into(),
            port: 5433,
            database: "postgres".into(),
        }
    }

    fn spec() -> PostgresDatabaseSpec {
        PostgresDatabaseSpec {
            database_name: "db_test".into(),
            user_name_post_fix: "@host1".into(),
            secret_name: "secret-test".into(),
        }
    }

    #[test]
    fn test_build_connection_config() {
        let config = build_connection_config("s3cret", &spec(), &admin());
        assert_eq!(config.host, "pg.internal");
        assert_eq!(config.port, 5433);
        assert_eq!(config.user, "db_test@host1");
        assert_eq!(config.password, "s3cret");
        assert_eq!(config.database, "db_test");
        assert!(!format!("{config:?}").contains("s3cret"));
    }

    #[test]
    fn test_connection_string_contains_password() {
        let config = build_connection_config("s3cret", &spec(), &admin());
        assert_eq!(
            build_connection_string(&config),
            "host=pg.internal port=5433 user=db_test@host1 password=s3cret dbname=db_test"
        );
    }

    #[test]
    fn test_connection_string_quoting() {
        let mut config = build_connection_config("it's a \\ pass", &spec(), &admin());
        config.database = String::new();
        let conn = build_connection_string(&config);
        assert!(conn.contains("password='it\\'s a \\\\ pass'"), "{conn}");
        assert!(conn.ends_with("dbname=''"), "{conn}");
    }

    #[test]
    fn test_field_round_trip() {
        let samples: [&[u8]; 5] = [
            b"",
            b"plain",
            "pässwörd-ü€".as_bytes(),
            &[0, 159, 146, 150, 255],
            b"~!@#$%^&*()_+`-={}|[]\\:\"<>?,./",
        ];
        for sample in samples {
            assert_eq!(decode_field(&encode_field(sample)).unwrap(), sample);
        }
        assert_eq!(encode_field(b"db_test@host1"), "ZGJfdGVzdEBob3N0MQ==");
    }

    #[test]
    fn test_decode_rejects_malformed_input() {
        assert!(matches!(
            decode_field("not base64!"),
            Err(EncodingError::Base64(_))
        ));
        let invalid_utf8 = encode_field(&[0xff, 0xfe]);
        assert!(matches!(
            decode_field_str(&invalid_utf8),
            Err(EncodingError::Utf8(_))
        ));
    }

    #[test]
    fn test_build_secret() {
        let mut metadata = ObjectMeta::new("team-a", "db");
        metadata.uid = Some("uid-1".into());
        let descriptor = PostgresDatabase::new(metadata, spec());
        let config = build_connection_config("s3cret", &descriptor.spec, &admin());

        let secret = build_secret(&descriptor, &config).unwrap();
        assert_eq!(secret.metadata.namespace, "team-a");
        assert_eq!(secret.metadata.name, "secret-test");
        assert_eq!(secret.type_, "Opaque");
        assert_eq!(secret.metadata.owner_references.len(), 1);
        assert_eq!(secret.metadata.owner_references[0].uid, "uid-1");

        let field = |key: &str| decode_field_str(&secret.data[key]).unwrap();
        assert_eq!(field(PGHOST), "pg.internal");
        assert_eq!(field(PGPORT), "5433");
        assert_eq!(field(PGUSER), "db_test@host1");
        assert_eq!(field(PGPASSWORD), "s3cret");
        assert_eq!(field(PGDATABASE), "db_test");
        assert_eq!(field(PG_CONNECTION_STRING), build_connection_string(&config));
    }

    #[test]
    fn test_build_secret_without_uid_fails() {
        let descriptor = PostgresDatabase::new(ObjectMeta::new("ns", "db"), spec());
        let config = build_connection_config("x", &descriptor.spec, &admin());
        assert!(matches!(
            build_secret(&descriptor, &config),
            Err(ReconcileError::InvalidDescriptor { .. })
        ));
    }
}
