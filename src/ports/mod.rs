pub mod destination;
pub mod source;

use reqwest::StatusCode;

/// Transport level failure talking to a remote music service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Failed to send http request: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("Failed to parse response: {0}")]
    Decode(String),
    #[error("Invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Failed to refresh access token: {0}")]
    Refresh(String),
}

impl ApiError {
    /// Whether sending the same request again could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Request(error) => error.is_timeout() || error.is_connect(),
            ApiError::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            ApiError::Decode(_) | ApiError::InvalidUrl(_) | ApiError::Refresh(_) => false,
        }
    }

    /// A conditional write lost against a newer version of the resource.
    pub fn is_precondition_failed(&self) -> bool {
        matches!(
            self,
            ApiError::Status {
                status: StatusCode::PRECONDITION_FAILED,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_statuses() {
        let rate_limited = ApiError::Status {
            status: StatusCode::TOO_MANY_REQUESTS,
            body: String::new(),
        };
        let unavailable = ApiError::Status {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: String::new(),
        };
        let unauthorized = ApiError::Status {
            status: StatusCode::UNAUTHORIZED,
            body: "expired token".into(),
        };

        assert!(rate_limited.is_transient());
        assert!(unavailable.is_transient());
        assert!(!unauthorized.is_transient());
        assert!(!ApiError::Decode("bad json".into()).is_transient());
        assert!(!ApiError::Refresh("revoked".into()).is_transient());
    }

    #[test]
    fn test_precondition_failed() {
        let stale = ApiError::Status {
            status: StatusCode::PRECONDITION_FAILED,
            body: String::new(),
        };

        assert!(stale.is_precondition_failed());
        assert!(!stale.is_transient());
    }
}
