use crate::model::{LoadedPlaylist, Playlist, Track};
use crate::paginator::{FetchError, PAGE_SIZE, fetch_all};
use crate::ports::source::SourceApi;

/// Whole-collection read access to the source library, built on page level [`SourceApi`] calls.
pub struct SourceClient<A: SourceApi> {
    api: A,
    page_size: u32,
}

impl<A: SourceApi> SourceClient<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            page_size: PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Playlist metadata only, tracks are loaded later with [`Self::load_playlist`].
    pub async fn list_playlists(&self) -> Result<Vec<Playlist>, FetchError> {
        let playlists = fetch_all(self.page_size, |offset, limit| {
            self.api.playlists_page(offset, limit)
        })
        .await?;
        log::info!("Found {} source playlists", playlists.len());
        Ok(playlists)
    }

    /// Tracks of a playlist in the source's order.
    pub async fn list_playlist_tracks(&self, playlist_id: &str) -> Result<Vec<Track>, FetchError> {
        let tracks = fetch_all(self.page_size, |offset, limit| {
            self.api.playlist_tracks_page(playlist_id, offset, limit)
        })
        .await?;
        log::debug!("Playlist {} has {} tracks", playlist_id, tracks.len());
        Ok(tracks)
    }

    /// Liked tracks, oldest first.
    ///
    /// The source lists the most recently liked track first. The list is reversed so the
    /// earliest like is added first and the destination ends up in the same chronology.
    pub async fn list_liked_tracks(&self) -> Result<Vec<Track>, FetchError> {
        let mut tracks = fetch_all(self.page_size, |offset, limit| {
            self.api.liked_tracks_page(offset, limit)
        })
        .await?;
        tracks.reverse();
        log::info!("Found {} liked tracks", tracks.len());
        Ok(tracks)
    }

    pub async fn load_playlist(&self, playlist: Playlist) -> Result<LoadedPlaylist, FetchError> {
        let tracks = self.list_playlist_tracks(&playlist.id).await?;
        Ok(LoadedPlaylist { playlist, tracks })
    }
}
