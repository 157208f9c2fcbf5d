use std::num::NonZeroU32;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use governor::{
    Quota, RateLimiter, clock::DefaultClock, state::InMemoryState, state::direct::NotKeyed,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::auth::BearerAuth;
use crate::ports::ApiError;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// How requests to one service are paced and retried.
#[derive(Debug, Clone, Copy)]
pub struct RequestPolicy {
    pub requests_per_second: NonZeroU32,
    /// Extra attempts for transient failures (429, 5xx, timeouts).
    pub max_retries: usize,
    pub min_backoff: Duration,
}

impl Default for RequestPolicy {
    fn default() -> Self {
        Self {
            requests_per_second: NonZeroU32::new(5).unwrap_or(NonZeroU32::MIN),
            max_retries: 3,
            min_backoff: Duration::from_millis(500),
        }
    }
}

/// Whether a request may be sent again after a transient failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Reads and writes that are harmless to repeat.
    Retry,
    /// Writes that would be duplicated if a lost response was retried.
    Once,
}

/// Sends requests to a single service through a rate limiter, retrying transient failures.
pub struct HttpSender {
    client: Client,
    limiter: DirectRateLimiter,
    policy: RequestPolicy,
}

impl HttpSender {
    pub fn new(client: Client, policy: RequestPolicy) -> Self {
        Self {
            client,
            limiter: RateLimiter::direct(Quota::per_second(policy.requests_per_second)),
            policy,
        }
    }

    /// Backoff used for transient failures, for callers that retry a whole sequence of requests.
    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.policy.min_backoff)
            .with_max_times(self.policy.max_retries)
    }

    /// Sends the request produced by `build`. Non-success statuses become [`ApiError::Status`].
    ///
    /// `build` is called again for every retry.
    pub async fn send<F>(&self, build: F) -> Result<Response, ApiError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        (|| self.attempt(&build))
            .retry(self.backoff())
            .when(ApiError::is_transient)
            .notify(|error, delay| {
                log::warn!("Retrying request in {:?} after error: {}", delay, error)
            })
            .await
    }

    /// Sends the request exactly once, whatever the outcome.
    pub async fn send_once<F>(&self, build: F) -> Result<Response, ApiError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        self.attempt(&build).await
    }

    /// Sends with the current bearer token. On a 401 the token is renewed once and the request resent.
    pub async fn send_authorized<F>(
        &self,
        auth: &BearerAuth,
        delivery: Delivery,
        build: F,
    ) -> Result<Response, ApiError>
    where
        F: Fn(&Client, &str) -> RequestBuilder,
    {
        let token = auth.token();
        match self
            .deliver(delivery, |client| build(client, &token))
            .await
        {
            Err(ApiError::Status {
                status: StatusCode::UNAUTHORIZED,
                body,
            }) => {
                let fresh = auth
                    .renew(&token)
                    .await
                    .map_err(|error| ApiError::Refresh(error.to_string()))?;
                let Some(fresh) = fresh else {
                    return Err(ApiError::Status {
                        status: StatusCode::UNAUTHORIZED,
                        body,
                    });
                };
                log::debug!("Resending request with renewed access token");
                self.deliver(delivery, |client| build(client, &fresh))
                    .await
            }
            result => result,
        }
    }

    async fn deliver<F>(&self, delivery: Delivery, build: F) -> Result<Response, ApiError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        match delivery {
            Delivery::Retry => self.send(build).await,
            Delivery::Once => self.send_once(build).await,
        }
    }

    async fn attempt<F>(&self, build: &F) -> Result<Response, ApiError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        self.limiter.until_ready().await;
        let response = build(&self.client)
            .timeout(Duration::from_secs(10))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or("Failed to get error text".to_string());
        Err(ApiError::Status { status, body })
    }
}

/// Decodes a JSON response body.
pub async fn json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    response
        .json::<T>()
        .await
        .map_err(|error| ApiError::Decode(error.to_string()))
}
