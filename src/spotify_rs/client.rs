use url::Url;

use crate::auth::{BearerAuth, TokenRefresher};
use crate::http::{Delivery, HttpSender, json};
use crate::model::{Playlist, Track};
use crate::paginator::Page;
use crate::ports::ApiError;
use crate::ports::source::SourceApi;
use crate::spotify_rs::types::{
    SpotifyPaging, SpotifyPlaylist, SpotifyPlaylistItem, SpotifySavedTrack, SpotifyUser,
};

pub const SPOTIFY_API_URL: &str = "https://api.spotify.com/v1/";

/// Spotify Web API client
pub struct SpotifyClient {
    auth: BearerAuth,
    base_url: Url,
    sender: HttpSender,
}

impl SpotifyClient {
    pub fn new(access_token: String, base_url: Url, sender: HttpSender) -> Self {
        Self {
            auth: BearerAuth::new(access_token),
            base_url,
            sender,
        }
    }

    /// Renew the access token through `refresher` when Spotify rejects it as expired.
    pub fn with_refresher(mut self, refresher: impl TokenRefresher + 'static) -> Self {
        self.auth = self.auth.with_refresher(refresher);
        self
    }

    async fn get(&self, url: Url) -> Result<reqwest::Response, ApiError> {
        self.sender
            .send_authorized(&self.auth, Delivery::Retry, |client, token| {
                client.get(url.clone()).bearer_auth(token)
            })
            .await
    }

    /// Get the current user's profile
    pub async fn get_current_user(&self) -> Result<SpotifyUser, ApiError> {
        let url = self.base_url.join("me")?;
        json(self.get(url).await?).await
    }

    async fn get_page<T>(
        &self,
        path: &str,
        offset: u32,
        limit: u32,
    ) -> Result<SpotifyPaging<T>, ApiError>
    where
        T: serde::de::DeserializeOwned,
    {
        let mut url = self.base_url.join(path)?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string())
            .append_pair("offset", &offset.to_string());

        json(self.get(url).await?).await
    }
}

#[async_trait::async_trait]
impl SourceApi for SpotifyClient {
    async fn playlists_page(&self, offset: u32, limit: u32) -> Result<Page<Playlist>, ApiError> {
        let paging: SpotifyPaging<SpotifyPlaylist> =
            self.get_page("me/playlists", offset, limit).await?;
        Ok(paging.into_page(|playlist| Some(Playlist::from(playlist))))
    }

    async fn playlist_tracks_page(
        &self,
        playlist_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<Track>, ApiError> {
        let path = format!("playlists/{}/tracks", urlencoding::encode(playlist_id));
        let paging: SpotifyPaging<SpotifyPlaylistItem> =
            self.get_page(&path, offset, limit).await?;
        Ok(paging.into_page(|item| match item.track {
            Some(track) => Some(Track::from(track)),
            None => {
                log::debug!("Skipping unavailable item in playlist {}", playlist_id);
                None
            }
        }))
    }

    async fn liked_tracks_page(&self, offset: u32, limit: u32) -> Result<Page<Track>, ApiError> {
        let paging: SpotifyPaging<SpotifySavedTrack> =
            self.get_page("me/tracks", offset, limit).await?;
        Ok(paging.into_page(|saved| Some(Track::from(saved.track))))
    }
}
