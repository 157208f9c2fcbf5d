use serde::{Deserialize, Serialize};

use crate::model::{Playlist, Track};
use crate::paginator::Page;

/// Spotify OAuth token response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyTokenResponse {
    pub access_token: String,
    pub expires_in: u64,
    /// Absent on a refresh response when Spotify keeps the old refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Spotify user profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyUser {
    pub id: String,
    pub display_name: Option<String>,
}

/// Offset based paging object used by every Spotify list endpoint.
///
/// `next` is the URL of the next page, absent on the last page.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyPaging<T> {
    pub items: Vec<T>,
    pub total: u32,
    pub next: Option<String>,
}

impl<T> SpotifyPaging<T> {
    pub fn into_page<U>(self, f: impl FnMut(T) -> Option<U>) -> Page<U> {
        Page {
            items: self.items.into_iter().filter_map(f).collect(),
            total: self.total,
            has_next: self.next.is_some(),
        }
    }
}

/// Spotify playlist from API
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyPlaylist {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub tracks: SpotifyPlaylistTracks,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyPlaylistTracks {
    pub total: u32,
}

impl From<SpotifyPlaylist> for Playlist {
    fn from(playlist: SpotifyPlaylist) -> Self {
        Playlist {
            id: playlist.id,
            name: playlist.name,
            description: playlist.description.filter(|d| !d.is_empty()),
            total_tracks: playlist.tracks.total,
        }
    }
}

/// Spotify track from API.
///
/// Playlist items can also be podcast episodes, which have no artists or external ids.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTrack {
    pub name: String,
    #[serde(default)]
    pub artists: Vec<SpotifyArtist>,
    /// Missing or null for local files and some episodes.
    #[serde(default)]
    pub external_ids: Option<SpotifyExternalIds>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyExternalIds {
    #[serde(default)]
    pub isrc: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyArtist {
    pub name: String,
}

impl From<SpotifyTrack> for Track {
    fn from(track: SpotifyTrack) -> Self {
        let artist = track
            .artists
            .into_iter()
            .next()
            .map(|artist| artist.name)
            .unwrap_or_else(|| "Unknown Artist".to_string());
        let isrc = track.external_ids.and_then(|ids| ids.isrc);
        Track::new(isrc, track.name, artist)
    }
}

/// Item of `/playlists/{id}/tracks`. `track` is null for removed or local-only items.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyPlaylistItem {
    pub track: Option<SpotifyTrack>,
}

/// Item of `/me/tracks`.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifySavedTrack {
    pub track: SpotifyTrack,
}
