use backon::Retryable;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use url::Url;

use crate::auth::{BearerAuth, TokenRefresher};
use crate::http::{Delivery, HttpSender, json};
use crate::ports::ApiError;
use crate::ports::destination::{DestinationClient, PlaylistHandle, TrackMatch};
use crate::tidal_rs::types::{TidalPlaylist, TidalSession, TidalTrackDocument};

pub const TIDAL_API_URL: &str = "https://api.tidal.com/v1/";
pub const TIDAL_OPENAPI_URL: &str = "https://openapi.tidal.com/v2/";

/// Tidal API client for the writes a migration needs.
pub struct TidalClient {
    session: TidalSession,
    auth: BearerAuth,
    api_url: Url,
    openapi_url: Url,
    sender: HttpSender,
}

impl TidalClient {
    pub fn new(session: TidalSession, api_url: Url, openapi_url: Url, sender: HttpSender) -> Self {
        Self {
            auth: BearerAuth::new(session.access_token.clone()),
            session,
            api_url,
            openapi_url,
            sender,
        }
    }

    /// Renew the access token through `refresher` when Tidal rejects it as expired.
    pub fn with_refresher(mut self, refresher: impl TokenRefresher + 'static) -> Self {
        self.auth = self.auth.with_refresher(refresher);
        self
    }

    async fn send<F>(&self, delivery: Delivery, build: F) -> Result<Response, ApiError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        self.sender
            .send_authorized(&self.auth, delivery, |client, token| {
                build(client).bearer_auth(token)
            })
            .await
    }

    pub fn username(&self) -> String {
        self.session
            .username
            .clone()
            .unwrap_or_else(|| self.session.user_id.to_string())
    }

    fn api_endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let mut url = self.api_url.join(path)?;
        url.query_pairs_mut()
            .append_pair("countryCode", &self.session.country_code);
        Ok(url)
    }

    /// Look up the catalog track id for an ISRC. `None` when the catalog has no match.
    pub async fn find_track_id(&self, isrc: &str) -> Result<Option<String>, ApiError> {
        let mut url = self.openapi_url.join("tracks")?;
        url.query_pairs_mut()
            .append_pair("countryCode", &self.session.country_code)
            .append_pair("filter[isrc]", &isrc.to_uppercase());

        let result = self
            .send(Delivery::Retry, |client| {
                client
                    .get(url.clone())
                    .header("Accept", "application/vnd.api+json")
            })
            .await;

        match result {
            Ok(response) => {
                let document: TidalTrackDocument = json(response).await?;
                Ok(document.data.into_iter().next().map(|track| track.id))
            }
            Err(ApiError::Status {
                status: StatusCode::NOT_FOUND,
                ..
            }) => Ok(None),
            Err(error) => Err(error),
        }
    }

    /// Current ETag and track count of a playlist, both needed to append to it.
    async fn playlist_state(&self, playlist_id: &str) -> Result<(String, u32), ApiError> {
        let url = self.api_endpoint(&format!("playlists/{}", playlist_id))?;
        let response = self
            .send(Delivery::Retry, |client| client.get(url.clone()))
            .await?;

        let etag = response
            .headers()
            .get("ETag")
            .and_then(|value| value.to_str().ok())
            .map(String::from)
            .ok_or_else(|| ApiError::Decode(format!("Playlist {} has no ETag", playlist_id)))?;
        let playlist: TidalPlaylist = json(response).await?;
        Ok((etag, playlist.number_of_tracks))
    }

    /// One append at the current end of the playlist, sent at most once.
    async fn append_item(&self, playlist_id: &str, track_id: &str) -> Result<(), ApiError> {
        let (etag, number_of_tracks) = self.playlist_state(playlist_id).await?;
        let url = self.api_endpoint(&format!("playlists/{}/items", playlist_id))?;
        let to_index = number_of_tracks.to_string();
        self.send(Delivery::Once, |client| {
            client
                .post(url.clone())
                .header("If-None-Match", &etag)
                .form(&[
                    ("trackIds", track_id),
                    ("onArtifactNotFound", "FAIL"),
                    ("onDupes", "SKIP"),
                    ("toIndex", to_index.as_str()),
                ])
        })
        .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl DestinationClient for TidalClient {
    async fn create_playlist(
        &self,
        name: &str,
        description: &str,
    ) -> Result<PlaylistHandle, ApiError> {
        let url = self.api_endpoint(&format!("users/{}/playlists", self.session.user_id))?;
        // A lost response to a retried create would leave a duplicate playlist behind
        let response = self
            .send(Delivery::Once, |client| {
                client
                    .post(url.clone())
                    .form(&[("title", name), ("description", description)])
            })
            .await?;

        let playlist: TidalPlaylist = json(response).await?;
        log::debug!("Created Tidal playlist '{}' ({})", playlist.title, playlist.uuid);
        Ok(PlaylistHandle {
            id: playlist.uuid,
            name: playlist.title,
        })
    }

    async fn add_track_to_playlist(
        &self,
        playlist: &PlaylistHandle,
        isrc: &str,
    ) -> Result<TrackMatch, ApiError> {
        let Some(track_id) = self.find_track_id(isrc).await? else {
            return Ok(TrackMatch::NotFound);
        };

        // Each attempt re-reads the ETag and end index. A stale ETag (412) means an earlier
        // attempt may have landed, and onDupes=SKIP keeps the next one from adding it twice.
        (|| self.append_item(&playlist.id, &track_id))
            .retry(self.sender.backoff())
            .when(|error| error.is_transient() || error.is_precondition_failed())
            .notify(|error, delay| {
                log::warn!(
                    "Retrying append to playlist {} in {:?} after error: {}",
                    playlist.id,
                    delay,
                    error
                )
            })
            .await?;

        Ok(TrackMatch::Added)
    }

    async fn add_track_to_favorites(&self, isrc: &str) -> Result<TrackMatch, ApiError> {
        let Some(track_id) = self.find_track_id(isrc).await? else {
            return Ok(TrackMatch::NotFound);
        };

        let url = self.api_endpoint(&format!("users/{}/favorites/tracks", self.session.user_id))?;
        self.send(Delivery::Retry, |client| {
            client.post(url.clone()).form(&[
                ("trackIds", track_id.as_str()),
                ("onArtifactNotFound", "FAIL"),
            ])
        })
        .await?;

        Ok(TrackMatch::Added)
    }
}
