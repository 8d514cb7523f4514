/// Error types for the sensor transport and the poller
use thiserror::Error;

use crate::models::Parameter;

/// Failure reported by a transport implementation.
///
/// `Link` errors are the flaky radio kind and are worth retrying,
/// `Rejected` errors will fail the same way again (bad address,
/// unknown characteristic, invalid arguments).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("link error: {0}")]
    Link(String),

    #[error("rejected by transport: {0}")]
    Rejected(String),
}

impl TransportError {
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Link(_))
    }
}

/// Error type for everything the poller can surface to its caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PollerError {
    #[error("{operation} failed after {attempts} attempt(s): {source}")]
    LinkFailure {
        operation: &'static str,
        attempts: u32,
        source: TransportError,
    },

    #[error("received invalid data from the sensor")]
    InvalidSensorData,

    #[error("malformed {payload} payload: {reason}")]
    MalformedPayload {
        payload: &'static str,
        reason: String,
    },

    #[error("unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("no cached value for {0}")]
    MissingValue(Parameter),
}
