use std::sync::Mutex;

use tokio::io::{AsyncBufReadExt, BufReader};

/// Failure to obtain an authenticated session for either service. Always fatal to the run.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing credentials: {0}")]
    MissingCredentials(&'static str),
    #[error("Failed to send http request: {0}")]
    FailedToSendRequest(#[from] reqwest::Error),
    #[error("Authorization rejected: {reason}")]
    Rejected { reason: String },
    #[error("Authorization expired before it was completed")]
    Expired,
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Invalid redirect URL: {0}")]
    InvalidRedirect(String),
    #[error("State in redirect URL does not match the request")]
    StateMismatch,
    #[error("Failed to parse response: {0}")]
    FailedToParseResponse(String),
    #[error("Failed to read input: {0}")]
    Input(#[from] std::io::Error),
}

/// Prints a prompt and reads one trimmed line from stdin.
pub async fn prompt_line(message: &str) -> Result<String, AuthError> {
    println!("{}", message);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let line = lines.next_line().await?.ok_or_else(|| {
        AuthError::Input(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "stdin closed",
        ))
    })?;
    Ok(line.trim().to_string())
}

/// Obtains a new access token once the current one is rejected.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self) -> Result<String, AuthError>;
}

/// Bearer token shared by every request to one service, renewed in place when it expires.
pub struct BearerAuth {
    token: Mutex<String>,
    refreshing: tokio::sync::Mutex<()>,
    refresher: Option<Box<dyn TokenRefresher>>,
}

impl BearerAuth {
    pub fn new(token: String) -> Self {
        Self {
            token: Mutex::new(token),
            refreshing: tokio::sync::Mutex::new(()),
            refresher: None,
        }
    }

    pub fn with_refresher(mut self, refresher: impl TokenRefresher + 'static) -> Self {
        self.refresher = Some(Box::new(refresher));
        self
    }

    pub fn token(&self) -> String {
        self.token
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Replace `stale` with a fresh token. `None` when there is no way to refresh.
    ///
    /// If another request already renewed the token, that one is returned without refreshing again.
    pub async fn renew(&self, stale: &str) -> Result<Option<String>, AuthError> {
        let _refreshing = self.refreshing.lock().await;
        let current = self.token();
        if current != stale {
            return Ok(Some(current));
        }
        let Some(refresher) = &self.refresher else {
            return Ok(None);
        };

        let fresh = refresher.refresh().await?;
        log::info!("Access token renewed");
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = fresh.clone();
        Ok(Some(fresh))
    }
}
