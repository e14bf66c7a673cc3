//! Error types for the property codec, form encoder and task coordinator.

use std::sync::Arc;

use thiserror::Error;

/// Flat classification of every error this crate produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// W001: Scalar does not match any known encoding
    UnrecognizedToken,
    /// W002: Value has no wire representation
    UnknownVariant,
    /// W003: Token-list entry violates its grammar
    MalformedEntry,
    /// W004: Required property absent
    MissingProperty,
    /// W005: Property present but rejected
    InvalidProperty,
    /// W006: Remote task ended in failure
    RemoteTask,
    /// W007: Status check could not reach the remote side
    Transport,
    /// W008: Poller stopped without reporting
    PollerLost,
    /// W009: Waiting was cancelled before the task finished
    Cancelled,
}

impl ErrorKind {
    /// Returns the error code string (e.g., "W001").
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::UnrecognizedToken => "W001",
            ErrorKind::UnknownVariant => "W002",
            ErrorKind::MalformedEntry => "W003",
            ErrorKind::MissingProperty => "W004",
            ErrorKind::InvalidProperty => "W005",
            ErrorKind::RemoteTask => "W006",
            ErrorKind::Transport => "W007",
            ErrorKind::PollerLost => "W008",
            ErrorKind::Cancelled => "W009",
        }
    }
}

/// Error converting between a wire scalar or token list and a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("[W001] unrecognized {expected} token {raw:?}")]
    UnrecognizedToken {
        /// Property the token belonged to, once known.
        field: Option<&'static str>,
        expected: &'static str,
        raw: String,
    },

    #[error("[W002] {type_name} value has no wire representation")]
    UnknownVariant { type_name: &'static str },

    #[error("[W003] malformed entry {raw:?} at position {position}: {reason}")]
    MalformedEntry {
        raw: String,
        position: usize,
        reason: &'static str,
    },

    #[error("[W002] unset value would read back as the default {default:?}")]
    UnsetOverDefault { default: &'static str },

    #[error("[W003] {field} length {len} exceeds maximum {max}")]
    LengthExceedsLimit {
        field: &'static str,
        len: usize,
        max: usize,
    },
}

impl CodecError {
    /// Shorthand for an unrecognized token with no field attached yet.
    pub fn unrecognized(expected: &'static str, raw: impl Into<String>) -> Self {
        CodecError::UnrecognizedToken {
            field: None,
            expected,
            raw: raw.into(),
        }
    }

    /// Attaches the property name to an unrecognized token error.
    pub fn with_field(self, name: &'static str) -> Self {
        match self {
            CodecError::UnrecognizedToken { expected, raw, .. } => CodecError::UnrecognizedToken {
                field: Some(name),
                expected,
                raw,
            },
            other => other,
        }
    }

    /// Returns the classification for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CodecError::UnrecognizedToken { .. } => ErrorKind::UnrecognizedToken,
            CodecError::UnknownVariant { .. } | CodecError::UnsetOverDefault { .. } => {
                ErrorKind::UnknownVariant
            }
            CodecError::MalformedEntry { .. } | CodecError::LengthExceedsLimit { .. } => {
                ErrorKind::MalformedEntry
            }
        }
    }
}

/// Why a present property value was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("fractional number for an integer property")]
    NotIntegral,

    #[error("number out of range for {expected}")]
    OutOfRange { expected: &'static str },

    #[error("boolean must be 0 or 1")]
    NotBoolean,

    #[error("rejected by validator")]
    FailedValidation,

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Entry(Box<PropertyError>),
}

/// Error extracting a typed value from a wire map or token list.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropertyError {
    #[error("[W004] missing required property {name}")]
    MissingProperty { name: &'static str },

    #[error("[W005] invalid value {value} for property {name}: {reason}")]
    InvalidProperty {
        name: &'static str,
        /// The raw wire value, rendered for diagnosis.
        value: String,
        #[source]
        reason: Rejection,
    },
}

impl PropertyError {
    /// Returns the name of the offending property.
    pub fn name(&self) -> &'static str {
        match self {
            PropertyError::MissingProperty { name } | PropertyError::InvalidProperty { name, .. } => {
                name
            }
        }
    }

    /// Returns the classification for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PropertyError::MissingProperty { .. } => ErrorKind::MissingProperty,
            PropertyError::InvalidProperty { .. } => ErrorKind::InvalidProperty,
        }
    }
}

/// Error building a request form from a typed value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("[W002] cannot encode property {name}: {source}")]
    Marshal {
        name: &'static str,
        #[source]
        source: CodecError,
    },
}

impl EncodeError {
    /// Returns the classification for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EncodeError::Marshal { source, .. } => source.kind(),
        }
    }
}

/// Failure reported by the caller-supplied status check.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
    #[source]
    source: Option<Arc<dyn std::error::Error + Send + Sync + 'static>>,
}

impl TransportError {
    /// Creates a transport error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a transport error wrapping an underlying cause.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Arc::new(source)),
        }
    }

    /// Returns the message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Terminal error of a waited-on remote task.
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    #[error("[W006] task {upid} failed: {exit_status}")]
    Remote { upid: String, exit_status: String },

    #[error("[W007] status check failed: {0}")]
    Transport(#[from] TransportError),

    #[error("[W008] poller for task {upid} stopped without reporting")]
    PollerLost { upid: String },

    #[error("[W009] polling task {upid} was cancelled")]
    Cancelled { upid: String },
}

impl TaskError {
    /// Returns the classification for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TaskError::Remote { .. } => ErrorKind::RemoteTask,
            TaskError::Transport(_) => ErrorKind::Transport,
            TaskError::PollerLost { .. } => ErrorKind::PollerLost,
            TaskError::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }
}
