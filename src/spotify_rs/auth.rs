use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use rand::Rng;
use reqwest::Client;
use sha2::{Digest, Sha256};
use url::Url;

use crate::auth::{AuthError, TokenRefresher, prompt_line};
use crate::spotify_rs::types::SpotifyTokenResponse;

pub const SPOTIFY_ACCOUNTS_URL: &str = "https://accounts.spotify.com/";

pub const SPOTIFY_SCOPES: [&str; 3] = [
    "user-library-read",
    "playlist-read-private",
    "playlist-read-collaborative",
];

#[derive(Debug, Clone)]
pub struct SpotifyCredentials {
    pub client_id: String,
    /// Optional for PKCE, sent as basic auth when present.
    pub client_secret: Option<String>,
    pub redirect_uri: String,
}

/// PKCE OAuth session data
#[derive(Debug, Clone)]
pub struct OAuthSession {
    pub code_verifier: String,
    pub state: String,
    pub auth_url: Url,
}

/// Generate a cryptographically secure random string for PKCE
fn generate_random_string(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            const CHARSET: &[u8] =
                b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";
            CHARSET[rng.random_range(0..CHARSET.len())] as char
        })
        .collect()
}

/// Generate PKCE code verifier (43-128 characters)
fn generate_code_verifier() -> String {
    generate_random_string(128)
}

/// Generate PKCE code challenge from verifier using S256 method
fn generate_code_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    let hash = hasher.finalize();
    URL_SAFE_NO_PAD.encode(hash)
}

/// Generate a random state parameter for CSRF protection
fn generate_state() -> String {
    generate_random_string(16)
}

/// Initiate Spotify OAuth flow with PKCE
/// Returns the authorization URL together with the verifier and state needed to finish it.
pub fn initiate_oauth(
    accounts_url: &Url,
    credentials: &SpotifyCredentials,
) -> Result<OAuthSession, AuthError> {
    let code_verifier = generate_code_verifier();
    let state = generate_state();

    let mut auth_url = accounts_url.join("authorize")?;
    auth_url
        .query_pairs_mut()
        .append_pair("client_id", &credentials.client_id)
        .append_pair("response_type", "code")
        .append_pair("redirect_uri", &credentials.redirect_uri)
        .append_pair("state", &state)
        .append_pair("scope", &SPOTIFY_SCOPES.join(" "))
        .append_pair("code_challenge_method", "S256")
        .append_pair("code_challenge", &generate_code_challenge(&code_verifier));

    Ok(OAuthSession {
        code_verifier,
        state,
        auth_url,
    })
}

/// Extract the authorization code from the URL Spotify redirected the browser to.
pub fn code_from_redirect(redirect: &str, expected_state: &str) -> Result<String, AuthError> {
    let url = Url::parse(redirect).map_err(|e| AuthError::InvalidRedirect(e.to_string()))?;
    let params: HashMap<_, _> = url.query_pairs().into_owned().collect();

    if let Some(error) = params.get("error") {
        return Err(AuthError::Rejected {
            reason: error.clone(),
        });
    }
    if params.get("state").map(String::as_str) != Some(expected_state) {
        return Err(AuthError::StateMismatch);
    }
    params
        .get("code")
        .cloned()
        .ok_or_else(|| AuthError::InvalidRedirect("no code parameter".to_string()))
}

/// Exchange authorization code for access token
/// https://developer.spotify.com/documentation/web-api/tutorials/code-pkce-flow
pub async fn exchange_code_for_token(
    client: &Client,
    accounts_url: &Url,
    credentials: &SpotifyCredentials,
    code: &str,
    code_verifier: &str,
) -> Result<SpotifyTokenResponse, AuthError> {
    let mut params = HashMap::new();
    params.insert("grant_type", "authorization_code");
    params.insert("code", code);
    params.insert("redirect_uri", credentials.redirect_uri.as_str());
    params.insert("client_id", credentials.client_id.as_str());
    params.insert("code_verifier", code_verifier);

    request_token(client, accounts_url, credentials, &params).await
}

/// Trade a refresh token for a new access token.
/// https://developer.spotify.com/documentation/web-api/tutorials/refreshing-tokens
pub async fn refresh_access_token(
    client: &Client,
    accounts_url: &Url,
    credentials: &SpotifyCredentials,
    refresh_token: &str,
) -> Result<SpotifyTokenResponse, AuthError> {
    let mut params = HashMap::new();
    params.insert("grant_type", "refresh_token");
    params.insert("refresh_token", refresh_token);
    params.insert("client_id", credentials.client_id.as_str());

    request_token(client, accounts_url, credentials, &params).await
}

async fn request_token(
    client: &Client,
    accounts_url: &Url,
    credentials: &SpotifyCredentials,
    params: &HashMap<&str, &str>,
) -> Result<SpotifyTokenResponse, AuthError> {
    let token_url = accounts_url.join("api/token")?;

    let mut request = client
        .post(token_url)
        // This automatically serializes to x-www-form-urlencoded and sets the header (as required by spotify)
        .form(params)
        .timeout(Duration::from_secs(10));
    if let Some(secret) = &credentials.client_secret {
        request = request.header(
            "Authorization",
            format!(
                "Basic {}",
                STANDARD.encode(format!("{}:{}", credentials.client_id, secret))
            ),
        );
    }

    let response = request.send().await?;
    if !response.status().is_success() {
        return Err(AuthError::Rejected {
            reason: response
                .text()
                .await
                .unwrap_or("Failed to get error text".to_string()),
        });
    }

    response
        .json::<SpotifyTokenResponse>()
        .await
        .map_err(|error| AuthError::FailedToParseResponse(error.to_string()))
}

/// Renews the Spotify access token, keeping whichever refresh token Spotify hands back last.
pub struct SpotifyTokenRefresher {
    client: Client,
    accounts_url: Url,
    credentials: SpotifyCredentials,
    refresh_token: Mutex<String>,
}

impl SpotifyTokenRefresher {
    pub fn new(
        client: Client,
        accounts_url: Url,
        credentials: SpotifyCredentials,
        refresh_token: String,
    ) -> Self {
        Self {
            client,
            accounts_url,
            credentials,
            refresh_token: Mutex::new(refresh_token),
        }
    }

    fn current_refresh_token(&self) -> String {
        self.refresh_token
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait::async_trait]
impl TokenRefresher for SpotifyTokenRefresher {
    async fn refresh(&self) -> Result<String, AuthError> {
        let token = refresh_access_token(
            &self.client,
            &self.accounts_url,
            &self.credentials,
            &self.current_refresh_token(),
        )
        .await?;
        if let Some(rotated) = token.refresh_token {
            *self.refresh_token.lock().unwrap_or_else(|e| e.into_inner()) = rotated;
        }
        log::debug!("Spotify token refreshed, valid for {}s", token.expires_in);
        Ok(token.access_token)
    }
}

/// Runs the interactive login: print the authorize URL, read back the redirect URL, exchange the code.
pub async fn authenticate(
    client: &Client,
    accounts_url: &Url,
    credentials: &SpotifyCredentials,
) -> Result<SpotifyTokenResponse, AuthError> {
    let session = initiate_oauth(accounts_url, credentials)?;
    println!("Spotify redirect URI {}", credentials.redirect_uri);
    println!("Open this URL in your browser and log in:\n\n{}\n", session.auth_url);

    let redirect = prompt_line("Paste the URL you were redirected to:").await?;
    let code = code_from_redirect(&redirect, &session.state)?;
    let token =
        exchange_code_for_token(client, accounts_url, credentials, &code, &session.code_verifier)
            .await?;
    log::debug!("Spotify token valid for {}s", token.expires_in);

    Ok(token)
}
