use std::sync::Mutex;
use std::time::{Duration, Instant};

use reqwest::Client;
use url::Url;

use crate::auth::{AuthError, TokenRefresher};
use crate::tidal_rs::types::{
    TidalDeviceAuthorization, TidalOAuthError, TidalRefreshResponse, TidalSession,
    TidalTokenResponse,
};

pub const TIDAL_AUTH_URL: &str = "https://auth.tidal.com/v1/";

const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";
const TIDAL_SCOPE: &str = "r_usr w_usr w_sub";
/// Added to the poll interval each time the server answers `slow_down`.
const SLOW_DOWN_STEP: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct TidalCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Result of a single token poll during the device flow.
#[derive(Debug)]
pub enum PollOutcome {
    Pending,
    /// Still pending, and polls must be spaced further apart.
    SlowDown,
    Authorized(TidalTokenResponse),
}

/// Create a device authorization (used for login via device code flow)
///
/// The user finishes the login in a browser using the returned verification link.
pub async fn start_device_authorization(
    client: &Client,
    auth_url: &Url,
    credentials: &TidalCredentials,
) -> Result<TidalDeviceAuthorization, AuthError> {
    let response = client
        .post(auth_url.join("oauth2/device_authorization")?)
        .form(&[
            ("client_id", credentials.client_id.as_str()),
            ("scope", TIDAL_SCOPE),
        ])
        .timeout(Duration::from_secs(10))
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(AuthError::Rejected {
            reason: response
                .text()
                .await
                .unwrap_or("Failed to get error text".to_string()),
        });
    }

    response
        .json::<TidalDeviceAuthorization>()
        .await
        .map_err(|error| AuthError::FailedToParseResponse(error.to_string()))
}

/// Ask once whether the device code has been claimed.
///
/// `authorization_pending` and `slow_down` both mean the user has not finished yet.
pub async fn poll_token(
    client: &Client,
    auth_url: &Url,
    credentials: &TidalCredentials,
    device_code: &str,
) -> Result<PollOutcome, AuthError> {
    let response = client
        .post(auth_url.join("oauth2/token")?)
        .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
        .form(&[
            ("client_id", credentials.client_id.as_str()),
            ("device_code", device_code),
            ("grant_type", DEVICE_CODE_GRANT),
            ("scope", TIDAL_SCOPE),
        ])
        .timeout(Duration::from_secs(10))
        .send()
        .await?;

    if response.status().is_success() {
        let token = response
            .json::<TidalTokenResponse>()
            .await
            .map_err(|error| AuthError::FailedToParseResponse(error.to_string()))?;
        return Ok(PollOutcome::Authorized(token));
    }

    let body = response
        .text()
        .await
        .unwrap_or("Failed to get error text".to_string());
    match serde_json::from_str::<TidalOAuthError>(&body) {
        Ok(error) => match error.error.as_str() {
            "authorization_pending" => Ok(PollOutcome::Pending),
            "slow_down" => Ok(PollOutcome::SlowDown),
            "expired_token" => Err(AuthError::Expired),
            _ => Err(AuthError::Rejected {
                reason: error.error_description.unwrap_or(error.error),
            }),
        },
        Err(_) => Err(AuthError::Rejected { reason: body }),
    }
}

fn next_interval(interval: Duration, outcome: &PollOutcome) -> Duration {
    match outcome {
        PollOutcome::SlowDown => interval + SLOW_DOWN_STEP,
        _ => interval,
    }
}

fn verification_link(device: &TidalDeviceAuthorization) -> String {
    let link = device
        .verification_uri_complete
        .as_deref()
        .unwrap_or(&device.verification_uri);
    if link.starts_with("http://") || link.starts_with("https://") {
        link.to_string()
    } else {
        format!("https://{}", link)
    }
}

/// Runs the device login: print the link, then poll until the user approves, denies, or the code expires.
pub async fn authenticate(
    client: &Client,
    auth_url: &Url,
    credentials: &TidalCredentials,
) -> Result<TidalSession, AuthError> {
    let device = start_device_authorization(client, auth_url, credentials).await?;
    println!(
        "Visit {} to log in to Tidal (code {}), the link expires in {}",
        verification_link(&device),
        device.user_code,
        humantime::format_duration(Duration::from_secs(device.expires_in))
    );

    let deadline = Instant::now() + Duration::from_secs(device.expires_in);
    let mut interval = Duration::from_secs(device.interval);
    loop {
        tokio::time::sleep(interval).await;
        let outcome = poll_token(client, auth_url, credentials, &device.device_code).await?;
        if let PollOutcome::Authorized(token) = outcome {
            return Ok(token.into());
        }
        if Instant::now() >= deadline {
            return Err(AuthError::Expired);
        }
        interval = next_interval(interval, &outcome);
        log::debug!(
            "Tidal authorization still pending, next poll in {}",
            humantime::format_duration(interval)
        );
    }
}

/// Trade a refresh token for a new access token.
pub async fn refresh_access_token(
    client: &Client,
    auth_url: &Url,
    credentials: &TidalCredentials,
    refresh_token: &str,
) -> Result<TidalRefreshResponse, AuthError> {
    let response = client
        .post(auth_url.join("oauth2/token")?)
        .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
        .form(&[
            ("client_id", credentials.client_id.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
            ("scope", TIDAL_SCOPE),
        ])
        .timeout(Duration::from_secs(10))
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(AuthError::Rejected {
            reason: response
                .text()
                .await
                .unwrap_or("Failed to get error text".to_string()),
        });
    }

    response
        .json::<TidalRefreshResponse>()
        .await
        .map_err(|error| AuthError::FailedToParseResponse(error.to_string()))
}

pub struct TidalTokenRefresher {
    client: Client,
    auth_url: Url,
    credentials: TidalCredentials,
    refresh_token: Mutex<String>,
}

impl TidalTokenRefresher {
    pub fn new(
        client: Client,
        auth_url: Url,
        credentials: TidalCredentials,
        refresh_token: String,
    ) -> Self {
        Self {
            client,
            auth_url,
            credentials,
            refresh_token: Mutex::new(refresh_token),
        }
    }
}

#[async_trait::async_trait]
impl TokenRefresher for TidalTokenRefresher {
    async fn refresh(&self) -> Result<String, AuthError> {
        let refresh_token = self
            .refresh_token
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let token =
            refresh_access_token(&self.client, &self.auth_url, &self.credentials, &refresh_token)
                .await?;
        if let Some(rotated) = token.refresh_token {
            *self.refresh_token.lock().unwrap_or_else(|e| e.into_inner()) = rotated;
        }
        Ok(token.access_token)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn credentials() -> TidalCredentials {
        TidalCredentials {
            client_id: "tidal-id".into(),
            client_secret: "tidal-secret".into(),
        }
    }

    async fn mount_device_authorization(server: &MockServer, expires_in: u64) {
        Mock::given(method("POST"))
            .and(path("/v1/oauth2/device_authorization"))
            .and(body_string_contains("client_id=tidal-id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "deviceCode": "device-123",
                "userCode": "ABCDE",
                "verificationUri": "link.tidal.com",
                "verificationUriComplete": "link.tidal.com/ABCDE",
                "expiresIn": expires_in,
                "interval": 0
            })))
            .mount(server)
            .await;
    }

    fn auth_url(server: &MockServer) -> Url {
        Url::parse(&format!("{}/v1/", server.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_device_flow_waits_for_approval() {
        let server = MockServer::start().await;
        mount_device_authorization(&server, 300).await;
        Mock::given(method("POST"))
            .and(path("/v1/oauth2/token"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error": "authorization_pending"})),
            )
            .up_to_n_times(2)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/oauth2/token"))
            .and(body_string_contains("device_code=device-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "tidal-token",
                "refresh_token": "refresh",
                "expires_in": 604800,
                "user": {"userId": 42, "countryCode": "DE", "username": "listener"}
            })))
            .mount(&server)
            .await;

        let session = authenticate(&Client::new(), &auth_url(&server), &credentials())
            .await
            .unwrap();

        assert_eq!(session.access_token, "tidal-token");
        assert_eq!(session.refresh_token.as_deref(), Some("refresh"));
        assert_eq!(session.user_id, 42);
        assert_eq!(session.country_code, "DE");
        assert_eq!(session.username.as_deref(), Some("listener"));
    }

    #[tokio::test]
    async fn test_device_flow_denied() {
        let server = MockServer::start().await;
        mount_device_authorization(&server, 300).await;
        Mock::given(method("POST"))
            .and(path("/v1/oauth2/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "access_denied",
                "error_description": "User denied the request"
            })))
            .mount(&server)
            .await;

        let result = authenticate(&Client::new(), &auth_url(&server), &credentials()).await;

        match result {
            Err(AuthError::Rejected { reason }) => assert_eq!(reason, "User denied the request"),
            other => panic!("Expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_device_flow_expires() {
        let server = MockServer::start().await;
        mount_device_authorization(&server, 0).await;
        Mock::given(method("POST"))
            .and(path("/v1/oauth2/token"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error": "authorization_pending"})),
            )
            .mount(&server)
            .await;

        let result = authenticate(&Client::new(), &auth_url(&server), &credentials()).await;

        assert!(matches!(result, Err(AuthError::Expired)));
    }

    #[tokio::test]
    async fn test_slow_down_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/oauth2/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "slow_down"})))
            .mount(&server)
            .await;

        let outcome = poll_token(&Client::new(), &auth_url(&server), &credentials(), "device-123")
            .await
            .unwrap();

        assert!(matches!(outcome, PollOutcome::SlowDown));
    }

    #[test]
    fn test_slow_down_widens_interval() {
        let interval = Duration::from_secs(2);

        assert_eq!(
            next_interval(interval, &PollOutcome::SlowDown),
            Duration::from_secs(7)
        );
        assert_eq!(next_interval(interval, &PollOutcome::Pending), interval);
    }

    #[tokio::test]
    async fn test_refresh_access_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/oauth2/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "renewed",
                "expires_in": 604800,
                "user_id": 42
            })))
            .expect(1)
            .mount(&server)
            .await;

        let refresher = TidalTokenRefresher::new(
            Client::new(),
            auth_url(&server),
            credentials(),
            "refresh".into(),
        );

        assert_eq!(refresher.refresh().await.unwrap(), "renewed");
    }

    #[test]
    fn test_verification_link_gets_scheme() {
        let device = TidalDeviceAuthorization {
            device_code: "d".into(),
            user_code: "u".into(),
            verification_uri: "link.tidal.com".into(),
            verification_uri_complete: None,
            expires_in: 300,
            interval: 2,
        };
        assert_eq!(verification_link(&device), "https://link.tidal.com");
    }
}
