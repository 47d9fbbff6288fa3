//! Error types for the reconciliation subsystem.
//!
//! Every layer returns its own typed error. [`ReconcileError`] unifies them for
//! the control loop and classifies each failure into an [`ErrorKind`] that the
//! external scheduler uses to decide between retrying and giving up.

use std::fmt;

/// A name that cannot be safely interpolated into a SQL statement.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid identifier {name:?}: {reason}")]
pub struct IdentifierError {
    /// The rejected raw value (redacted for literals).
    pub name: String,
    /// Why the value was rejected.
    pub reason: &'static str,
}

impl IdentifierError {
    #[must_use]
    pub fn new(name: impl Into<String>, reason: &'static str) -> Self {
        Self {
            name: name.into(),
            reason,
        }
    }
}

/// Errors raised while generating a credential.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    /// The operating system entropy source could not be read.
    #[error("Entropy source unavailable: {0}")]
    Entropy(String),

    /// The configured policy cannot be satisfied.
    #[error("Invalid password policy: {0}")]
    Policy(String),
}

/// Malformed encoded secret field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    #[error("Invalid base64 field: {0}")]
    Base64(String),

    #[error("Decoded field is not valid UTF-8: {0}")]
    Utf8(String),
}

impl From<base64::DecodeError> for EncodingError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Base64(err.to_string())
    }
}

/// Errors returned by a [`ResourceStore`](crate::store::ResourceStore).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The addressed object does not exist.
    #[error("{kind} not found: {namespace}/{name}")]
    NotFound {
        kind: String,
        namespace: String,
        name: String,
    },

    /// An object with the same name already exists.
    #[error("{kind} already exists: {namespace}/{name}")]
    AlreadyExists {
        kind: String,
        namespace: String,
        name: String,
    },

    /// The store could not be reached.
    #[error("Store connection error: {message}")]
    Connection { message: String },

    /// Any other store-side failure.
    #[error("Store error: {message}")]
    Internal { message: String },
}

impl StoreError {
    #[must_use]
    pub fn not_found(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::NotFound {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    #[must_use]
    pub fn already_exists(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::AlreadyExists {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is an already exists error.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}

/// The step of tenant-state reconciliation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TenantStep {
    Database,
    Role,
    Grant,
}

impl fmt::Display for TenantStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database => write!(f, "ensure database"),
            Self::Role => write!(f, "ensure role"),
            Self::Grant => write!(f, "ensure grant"),
        }
    }
}

/// Classification of a SQL server failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TenantErrorKind {
    /// A name failed sanitization; nothing was sent to the server.
    InvalidIdentifier,
    /// The server denied the statement.
    Permission,
    /// A racing reconcile created the object first.
    Duplicate,
    /// Connectivity, timeout or resource exhaustion.
    Transient,
    /// Any other server error, surfaced verbatim.
    Server,
}

impl fmt::Display for TenantErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidIdentifier => write!(f, "invalid identifier"),
            Self::Permission => write!(f, "permission denied"),
            Self::Duplicate => write!(f, "duplicate object"),
            Self::Transient => write!(f, "transient"),
            Self::Server => write!(f, "server error"),
        }
    }
}

/// A failed tenant-state operation, tagged with the step that failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{step} failed ({kind}): {message}")]
pub struct TenantStateError {
    pub step: TenantStep,
    pub kind: TenantErrorKind,
    pub message: String,
}

impl TenantStateError {
    #[must_use]
    pub fn new(step: TenantStep, kind: TenantErrorKind, message: impl Into<String>) -> Self {
        Self {
            step,
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_identifier(step: TenantStep, err: &IdentifierError) -> Self {
        Self::new(step, TenantErrorKind::InvalidIdentifier, err.to_string())
    }
}

/// Errors surfaced by one reconcile invocation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    /// Reading or writing the resource store failed.
    #[error("Resource store error: {0}")]
    Store(StoreError),

    /// No credential could be generated.
    #[error("Credential generation failed: {0}")]
    Generation(#[from] CredentialError),

    /// Converging the SQL server failed.
    #[error("Tenant state reconciliation failed: {0}")]
    TenantState(#[from] TenantStateError),

    /// The secret artifact already exists and the policy only creates.
    #[error("Secret {namespace}/{name} already exists")]
    Conflict { namespace: String, name: String },

    /// A secret field could not be encoded or decoded.
    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// The descriptor lacks data required to reconcile it.
    #[error("Invalid descriptor: {message}")]
    InvalidDescriptor { message: String },
}

impl From<StoreError> for ReconcileError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists {
                namespace, name, ..
            } => Self::Conflict { namespace, name },
            other => Self::Store(other),
        }
    }
}

impl ReconcileError {
    #[must_use]
    pub fn invalid_descriptor(message: impl Into<String>) -> Self {
        Self::InvalidDescriptor {
            message: message.into(),
        }
    }

    /// Returns the error kind for scheduling and logging purposes.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Store(_) => ErrorKind::Transient,
            Self::Generation(_) => ErrorKind::Generation,
            Self::TenantState(err) => match err.kind {
                TenantErrorKind::InvalidIdentifier => ErrorKind::InvalidIdentifier,
                TenantErrorKind::Permission => ErrorKind::Permission,
                TenantErrorKind::Duplicate
                | TenantErrorKind::Transient
                | TenantErrorKind::Server => ErrorKind::Transient,
            },
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Encoding(_) => ErrorKind::Encoding,
            Self::InvalidDescriptor { .. } => ErrorKind::InvalidDescriptor,
        }
    }

    /// Whether the scheduler should re-drive the invocation with backoff.
    ///
    /// Terminal kinds need an operator or a descriptor change to resolve.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

/// Kinds of reconcile failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Transient,
    Generation,
    InvalidIdentifier,
    Conflict,
    Permission,
    Encoding,
    InvalidDescriptor,
}

impl ErrorKind {
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Transient | Self::Generation)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => write!(f, "transient"),
            Self::Generation => write!(f, "generation"),
            Self::InvalidIdentifier => write!(f, "invalid_identifier"),
            Self::Conflict => write!(f, "conflict"),
            Self::Permission => write!(f, "permission"),
            Self::Encoding => write!(f, "encoding"),
            Self::InvalidDescriptor => write!(f, "invalid_descriptor"),
        }
    }
}

/// Result type alias for reconcile operations.
pub type Result<T> = std::result::Result<T, ReconcileError>;
