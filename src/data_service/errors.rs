//! Data service errors

use thiserror::Error;

/// Result type for data service calls
pub type DataResult<T> = Result<T, DataServiceError>;

/// Failure reported by, or while talking to, the external data service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataServiceError {
    /// The data service answered with an error descriptor
    #[error("{message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// The request never produced a response
    #[error("Data service unreachable: {0}")]
    Transport(String),

    /// The response could not be decoded
    #[error("Unexpected data service response: {0}")]
    Decode(String),

    /// The client could not be constructed
    #[error("Data service configuration error: {0}")]
    Config(String),
}

impl DataServiceError {
    pub fn api(status: u16, code: Option<String>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            code,
            message: message.into(),
        }
    }

    /// True when the data service itself reported the error
    pub fn is_api(&self) -> bool {
        matches!(self, Self::Api { .. })
    }

    /// Message string carried by the error
    pub fn message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_message_is_verbatim() {
        let err = DataServiceError::api(400, Some("P0001".into()), "invalid patient");
        assert!(err.is_api());
        assert_eq!(err.message(), "invalid patient");
        assert_eq!(err.to_string(), "invalid patient");
    }

    #[test]
    fn test_transport_error_is_not_api() {
        let err = DataServiceError::Transport("connection refused".into());
        assert!(!err.is_api());
        assert!(err.message().contains("connection refused"));
    }
}
