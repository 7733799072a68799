//! Error types for the fbads bridge
//!
//! Every failure that leaves this crate is an [`Error`]: one exception kind
//! parameterized by a closed [`ErrorCode`], the component that produced it,
//! a human message, an optional wrapped cause and the creation time.
//!
//! Failures reported by native capability implementations are the separate
//! [`NativeError`] type. They are converted into [`Error`] at the boundary
//! (see [`crate::utils::with_error_handling`]).

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Shared, type-erased cause attached to an [`Error`]
pub type Cause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Name reported in serialized error records
pub const EXCEPTION_NAME: &str = "FacebookAdsException";

/// Stable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// A native capability group could not be resolved
    ModuleNotFound,
    /// Placement identifier was empty, blank or missing
    InvalidPlacementId,
    /// Ad inventory could not be loaded
    AdLoadFailed,
    /// An ad could not be displayed
    AdDisplayFailed,
    /// A resolved native capability failed
    NativeError,
    /// The user or platform denied a permission
    PermissionDenied,
    /// Configuration was rejected
    InvalidConfig,
    /// A native operation did not complete in time
    Timeout,
    /// Anything else
    Unknown,
}

impl ErrorCode {
    /// Wire representation of the code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ModuleNotFound => "MODULE_NOT_FOUND",
            ErrorCode::InvalidPlacementId => "INVALID_PLACEMENT_ID",
            ErrorCode::AdLoadFailed => "AD_LOAD_FAILED",
            ErrorCode::AdDisplayFailed => "AD_DISPLAY_FAILED",
            ErrorCode::NativeError => "NATIVE_ERROR",
            ErrorCode::PermissionDenied => "PERMISSION_DENIED",
            ErrorCode::InvalidConfig => "INVALID_CONFIG",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Core error type for the bridge
#[derive(Debug, Clone)]
pub struct Error {
    code: ErrorCode,
    native_module: String,
    message: String,
    cause: Option<Cause>,
    timestamp: DateTime<Utc>,
}

impl Error {
    /// Create an error with no cause attached
    pub fn new(
        code: ErrorCode,
        native_module: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            native_module: native_module.into(),
            message: message.into(),
            cause: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach the underlying cause
    pub fn with_cause<E>(self, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.with_shared_cause(Arc::new(cause))
    }

    /// Attach an already shared cause
    pub fn with_shared_cause(mut self, cause: Cause) -> Self {
        self.cause = Some(cause);
        self
    }

    /// Create an invalid placement id error
    pub fn invalid_placement(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidPlacementId, "placement-validation", msg)
    }

    /// Create a "module not found" error naming the missing capability
    pub fn module_not_found(module: &str) -> Self {
        Self::new(
            ErrorCode::ModuleNotFound,
            module,
            format!(
                "[FacebookAds] Native module \"{}\" not found. \
                 Make sure the library is properly linked and the native code is compiled.",
                module
            ),
        )
    }

    /// Create a native failure error
    pub fn native(native_module: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NativeError, native_module, msg)
    }

    /// Create an ad load failure
    pub fn ad_load_failed(native_module: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::AdLoadFailed, native_module, msg)
    }

    /// Create a configuration error
    pub fn invalid_config(native_module: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfig, native_module, msg)
    }

    /// Create a timeout error
    pub fn timeout(native_module: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Timeout, native_module, msg)
    }

    /// Create an error of unknown origin
    pub fn unknown(native_module: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unknown, native_module, msg)
    }

    /// Stable error code
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Component that raised the error
    pub fn native_module(&self) -> &str {
        &self.native_module
    }

    /// Human readable message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Wrapped cause, if any
    pub fn cause(&self) -> Option<&Cause> {
        self.cause.as_ref()
    }

    /// Creation time
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Serialize into a plain record
    pub fn to_record(&self) -> ErrorRecord {
        ErrorRecord {
            name: EXCEPTION_NAME.to_string(),
            message: self.message.clone(),
            code: self.code,
            native_module: self.native_module.clone(),
            timestamp: self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.native_module, self.message)
    }
}

// Written by hand: the cause is shared behind an `Arc`, and `source()` must
// expose the error inside it so callers can downcast to the concrete type.
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

impl PartialEq for Error {
    /// Two errors are equal when they carry the same code, origin and message.
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
            && self.native_module == other.native_module
            && self.message == other.message
    }
}

impl Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_record().serialize(serializer)
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::unknown("anyhow", err.to_string())
    }
}

/// Plain serialized form of an [`Error`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    /// Always [`EXCEPTION_NAME`]
    pub name: String,
    /// Human readable message
    pub message: String,
    /// Stable error code
    pub code: ErrorCode,
    /// Component that raised the error
    pub native_module: String,
    /// RFC 3339 creation time
    pub timestamp: String,
}

/// Failure reported by a native capability implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct NativeError {
    message: String,
}

impl NativeError {
    /// Create a native failure with the given message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Native failure message
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result type returned by native capability implementations
pub type NativeResult<T> = std::result::Result<T, NativeError>;
