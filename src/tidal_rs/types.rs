use serde::Deserialize;

/// Response of `/oauth2/device_authorization`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TidalDeviceAuthorization {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    #[serde(default)]
    pub verification_uri_complete: Option<String>,
    /// Seconds until `device_code` stops being accepted.
    pub expires_in: u64,
    /// Seconds to wait between token polls.
    pub interval: u64,
}

/// Successful response of `/oauth2/token`.
#[derive(Debug, Clone, Deserialize)]
pub struct TidalTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: TidalUser,
}

/// Response of `/oauth2/token` for the `refresh_token` grant.
#[derive(Debug, Clone, Deserialize)]
pub struct TidalRefreshResponse {
    pub access_token: String,
    /// Only present when Tidal rotates the refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TidalUser {
    pub user_id: u64,
    pub country_code: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// OAuth error body, e.g. `{"error": "authorization_pending"}`.
#[derive(Debug, Clone, Deserialize)]
pub struct TidalOAuthError {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Playlist object of the v1 API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TidalPlaylist {
    pub uuid: String,
    pub title: String,
    #[serde(default)]
    pub number_of_tracks: u32,
}

/// JSON:API document returned by the catalog search (`/tracks?filter[isrc]=`).
#[derive(Debug, Clone, Deserialize)]
pub struct TidalTrackDocument {
    #[serde(default)]
    pub data: Vec<TidalResource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TidalResource {
    pub id: String,
}

/// An authenticated Tidal user.
#[derive(Debug, Clone)]
pub struct TidalSession {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub user_id: u64,
    pub country_code: String,
    pub username: Option<String>,
}

impl From<TidalTokenResponse> for TidalSession {
    fn from(token: TidalTokenResponse) -> Self {
        TidalSession {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            user_id: token.user.user_id,
            country_code: token.user.country_code,
            username: token.user.username,
        }
    }
}
