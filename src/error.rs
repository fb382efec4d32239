//! Error types and handling for the GCDM client
//!
//! Every failure in the fetch pipeline is fatal and propagates to the caller
//! unchanged; the variants here only classify it for reporting and exit codes.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for GCDM client operations
pub type Result<T> = std::result::Result<T, GcdmError>;

/// Error types for GCDM client operations
#[derive(Error, Debug)]
pub enum GcdmError {
    // ═══════════════════════════════════════════════════════════════
    // Network & RPC Errors
    // ═══════════════════════════════════════════════════════════════
    /// Failed to connect to the GCDM server
    #[error("Failed to connect to {server}: {reason}")]
    Connection { server: String, reason: String },

    /// Server address could not be parsed as an endpoint URI
    #[error("Invalid server address '{server}': {reason}")]
    InvalidEndpoint { server: String, reason: String },

    /// RPC call failed with a gRPC status
    #[error("{call} failed: {code:?} - {message}")]
    Rpc {
        call: &'static str,
        code: tonic::Code,
        message: String,
    },

    /// Server answered but reported an error inside the response message
    #[error("Server error for {location}: {message} (code {code})")]
    Remote {
        location: String,
        code: i32,
        message: String,
    },

    /// The data stream closed without yielding a single chunk
    #[error("No data returned for variable '{variable_spec}' in {location}")]
    NoData {
        location: String,
        variable_spec: String,
    },

    /// Timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),

    // ═══════════════════════════════════════════════════════════════
    // Decode Errors
    // ═══════════════════════════════════════════════════════════════
    /// Header response carried no header
    #[error("Header response for {location} is missing the file header")]
    MissingHeader { location: String },

    /// Requested variable is not declared in the header
    #[error("Variable '{name}' not found in file header")]
    UnknownVariable { name: String },

    /// Data type that this client cannot materialize
    #[error("Unsupported data type: {0}")]
    UnsupportedType(String),

    /// Number of values does not match the declared shape
    #[error("Shape mismatch for {what}: expected {expected} values, got {actual}")]
    ShapeMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    /// Chunks do not tile the requested section
    #[error("Incomplete or overlapping data: {0}")]
    IncompleteData(String),

    /// Generic decode failure
    #[error("Decode failed: {0}")]
    Decode(String),

    // ═══════════════════════════════════════════════════════════════
    // Configuration & File Errors
    // ═══════════════════════════════════════════════════════════════
    /// Failed to read configuration file
    #[error("Failed to read config from {path}: {reason}")]
    ConfigRead { path: PathBuf, reason: String },

    /// Failed to write configuration file
    #[error("Failed to write config to {path}: {reason}")]
    ConfigWrite { path: PathBuf, reason: String },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// File operation failed
    #[error("File operation failed: {path}: {reason}")]
    FileError { path: PathBuf, reason: String },

    /// Failed to serialize data
    #[error("Serialization failed: {0}")]
    SerializationError(String),

    // ═══════════════════════════════════════════════════════════════
    // Validation & Input Errors
    // ═══════════════════════════════════════════════════════════════
    /// Invalid input argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GcdmError {
    /// Get the exit code for this error
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidArgument(_) | Self::InvalidEndpoint { .. } => 2,
            Self::Connection { .. } => 4,
            Self::Rpc { .. } | Self::Remote { .. } => 5,
            Self::NoData { .. } => 6,
            Self::MissingHeader { .. }
            | Self::UnknownVariable { .. }
            | Self::UnsupportedType(_)
            | Self::ShapeMismatch { .. }
            | Self::IncompleteData(_)
            | Self::Decode(_) => 7,
            Self::Timeout(_) => 124,
            _ => 1,
        }
    }

    /// Build an RPC error from a gRPC status, tagging the call it came from
    #[must_use]
    pub fn rpc(call: &'static str, status: &tonic::Status) -> Self {
        if status.code() == tonic::Code::DeadlineExceeded {
            return Self::Timeout(format!("{call}: {}", status.message()));
        }
        Self::Rpc {
            call,
            code: status.code(),
            message: status.message().to_string(),
        }
    }
}

impl From<std::io::Error> for GcdmError {
    fn from(err: std::io::Error) -> Self {
        Self::FileError {
            path: PathBuf::from("<unknown>"),
            reason: err.to_string(),
        }
    }
}
