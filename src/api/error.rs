use reqwest::StatusCode;
use thiserror::Error;

/// Failure modes of an API call.
///
/// Every request resolves to exactly one of: parsed data, an application
/// error carrying the server's HTTP status, or a transport error where no
/// status was obtained at all.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The server responded outside 2xx. The message is the `error` field
    /// of the response body when parseable, a generic fallback otherwise.
    #[error("{message}")]
    Api { message: String, status: StatusCode },

    /// No HTTP response was obtained (connection failure, timeout, or an
    /// unreadable body).
    #[error("Network error. Please try again.")]
    Network(#[source] reqwest::Error),
}

impl ApiError {
    /// HTTP status of the failure, with `0` as the transport-error sentinel.
    pub fn status(&self) -> u16 {
        match self {
            ApiError::Api { status, .. } => status.as_u16(),
            ApiError::Network(_) => 0,
        }
    }

    /// Whether this failure should trigger the reactive refresh path
    /// rather than being surfaced as a plain error.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            ApiError::Api {
                status: StatusCode::UNAUTHORIZED,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_sentinel_and_classification() {
        let err = ApiError::Api {
            message: "invalid email or password".to_string(),
            status: StatusCode::UNAUTHORIZED,
        };
        assert_eq!(err.status(), 401);
        assert!(err.is_unauthorized());
        assert_eq!(err.to_string(), "invalid email or password");

        let err = ApiError::Api {
            message: "Request failed with status 500".to_string(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
        };
        assert_eq!(err.status(), 500);
        assert!(!err.is_unauthorized());
    }
}
