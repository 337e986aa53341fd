use thiserror::Error;

/// Errors surfaced by the browser client. `connect` never returns one of
/// these; it reports failure through its boolean result instead.
#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Not connected to Weaviate")]
    NotConnected,
    #[error("HTTP {status}: {reason}")]
    Http {
        status: u16,
        reason: String,
    },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// First message of a GraphQL `errors` list, verbatim.
    #[error("{0}")]
    Query(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid collection or property name: '{0}'")]
    InvalidName(String),
}

pub type Result<T> = std::result::Result<T, BrowserError>;

impl BrowserError {
    pub(crate) fn from_status(status: reqwest::StatusCode) -> Self {
        BrowserError::Http {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown Status").to_string(),
        }
    }

    /// HTTP status code, when the failure came from a non-success response.
    pub fn status(&self) -> Option<u16> {
        match self {
            BrowserError::Http { status, .. } => Some(*status),
            BrowserError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_describes_status() {
        let err = BrowserError::from_status(reqwest::StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "HTTP 404: Not Found");
        assert!(err.is_not_found());
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn query_error_is_the_server_message() {
        let err = BrowserError::Query("field not found".to_string());
        assert_eq!(err.to_string(), "field not found");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn forbidden_counts_as_unauthorized() {
        let err = BrowserError::from_status(reqwest::StatusCode::FORBIDDEN);
        assert!(err.is_unauthorized());
        assert_eq!(err.status(), Some(403));
    }
}
