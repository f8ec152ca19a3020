//! Errors surfaced by the scheduler client and its collaborators.

use thiserror::Error;

/// Errors returned by scheduler collaborators and the client facade.
///
/// Collaborator errors pass through the facade untouched. The only variant
/// the facade itself produces is [`ClientError::RetryExhausted`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// A collaborator could not be constructed.
    #[error("failed to construct {service} client: {message}")]
    Construction {
        service: &'static str,
        message: String,
    },

    /// The scheduler did not answer in time.
    #[error("timed out waiting for the scheduler: {0}")]
    Timeout(String),

    /// The scheduler could not be reached.
    #[error("scheduler unavailable: {0}")]
    Unavailable(String),

    /// No host satisfied the request.
    #[error("no valid host was found: {0}")]
    NoValidHost(String),

    /// The request was rejected as malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Any other collaborator failure.
    #[error("{service} service error: {message}")]
    Service {
        service: &'static str,
        message: String,
    },

    /// A retried operation kept failing with retryable errors.
    #[error("{operation} failed after {attempts} attempts")]
    RetryExhausted {
        operation: &'static str,
        attempts: u32,
        #[source]
        last: Box<ClientError>,
    },
}

impl ClientError {
    pub fn construction(service: &'static str, message: impl Into<String>) -> Self {
        Self::Construction {
            service,
            message: message.into(),
        }
    }

    pub fn service(service: &'static str, message: impl Into<String>) -> Self {
        Self::Service {
            service,
            message: message.into(),
        }
    }

    /// Default retry classification: timeouts and unreachable services are
    /// transient, everything else is final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Timeout(_) | ClientError::Unavailable(_))
    }

    /// The error from the final attempt, looking through `RetryExhausted`.
    pub fn root(&self) -> &ClientError {
        match self {
            ClientError::RetryExhausted { last, .. } => last.root(),
            other => other,
        }
    }
}
