//! Unified error types for the PageLens coordinator.
//!
//! Module-specific errors convert into the main [`PageLensError`] type so
//! the router and gateway can hold a single error channel.

// ============================================================================
// Main Error Type
// ============================================================================

/// The main error type for PageLens operations.
#[derive(Debug, thiserror::Error)]
pub enum PageLensError {
    /// Worker endpoint error.
    #[error("worker: {0}")]
    Worker(#[from] WorkerError),

    /// Message bus error.
    #[error("bus: {0}")]
    Bus(#[from] BusError),

    /// Configuration error.
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    /// IO error.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic internal error.
    #[error("{0}")]
    Internal(String),
}

impl PageLensError {
    /// Create a config error from a string.
    #[inline]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(ConfigError::Invalid(msg.into()))
    }

    /// Create an internal error.
    #[inline]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias for PageLens operations.
pub type Result<T> = std::result::Result<T, PageLensError>;

// ============================================================================
// Worker Errors
// ============================================================================

/// Error type for remote worker invocations.
///
/// The worker client never recovers: every failure propagates to the
/// caller, who decides whether to degrade, retry, or surface it.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// The endpoint could not be reached (connect, DNS, timeout).
    #[error("failed to reach {worker} worker: {message}")]
    Transport {
        /// Wire name of the capability.
        worker: &'static str,
        /// Underlying transport failure.
        message: String,
    },

    /// The endpoint was reached but returned a non-success status.
    #[error("{worker} worker failed: {status} - {body}")]
    Remote {
        /// Wire name of the capability.
        worker: &'static str,
        /// HTTP status code.
        status: u16,
        /// Response body text, if any.
        body: String,
    },

    /// The user-supplied query was blank; rejected before any network I/O.
    #[error("empty query")]
    EmptyQuery,

    /// The response body was not the expected JSON shape.
    #[error("{worker} worker returned invalid JSON: {message}")]
    InvalidResponse {
        /// Wire name of the capability.
        worker: &'static str,
        /// Decode failure detail.
        message: String,
    },
}

impl WorkerError {
    /// Create a transport error.
    #[inline]
    pub fn transport(worker: &'static str, msg: impl Into<String>) -> Self {
        Self::Transport {
            worker,
            message: msg.into(),
        }
    }

    /// Create a remote-status error.
    #[inline]
    pub fn remote(worker: &'static str, status: u16, body: impl Into<String>) -> Self {
        Self::Remote {
            worker,
            status,
            body: body.into(),
        }
    }
}

/// Result type for worker invocations.
pub type WorkerResult<T> = std::result::Result<T, WorkerError>;

// ============================================================================
// Message Bus Errors
// ============================================================================

/// Error type for message bus operations.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// Failed to enqueue an inbound message.
    #[error("inbound channel closed")]
    InboundClosed,

    /// The direct-response channel was dropped by the caller.
    #[error("responder dropped")]
    ResponderDropped,
}

/// Result type for message bus operations.
pub type BusResult<T> = std::result::Result<T, BusError>;

// ============================================================================
// Configuration Errors
// ============================================================================

/// Error type for configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("parse: {0}")]
    Parse(#[from] serde_json::Error),

    /// Invalid value.
    #[error("invalid: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Create an invalid value error.
    #[inline]
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversions() {
        let worker_err = WorkerError::EmptyQuery;
        let err: PageLensError = worker_err.into();
        assert!(matches!(err, PageLensError::Worker(_)));

        let bus_err = BusError::InboundClosed;
        let err: PageLensError = bus_err.into();
        assert!(matches!(err, PageLensError::Bus(_)));
    }

    #[test]
    fn test_remote_error_display() {
        let err = WorkerError::remote("analyzer", 502, "bad gateway");
        assert_eq!(err.to_string(), "analyzer worker failed: 502 - bad gateway");
    }

    #[test]
    fn test_transport_error_display() {
        let err = WorkerError::transport("search", "connection refused");
        assert_eq!(
            err.to_string(),
            "failed to reach search worker: connection refused"
        );
    }
}
