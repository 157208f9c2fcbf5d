use crate::model::{Playlist, Track};
use crate::paginator::Page;
use crate::ports::ApiError;

/// Port trait wrapping the page level read access to the source library.
///
/// Implementations live in `spotify_rs::client` (production) or test mocks.
/// Whole-collection reads are built on top of this by [`crate::source::SourceClient`].
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SourceApi: Send + Sync {
    async fn playlists_page(&self, offset: u32, limit: u32) -> Result<Page<Playlist>, ApiError>;

    async fn playlist_tracks_page(
        &self,
        playlist_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<Track>, ApiError>;

    /// Saved tracks in the source's native order (most recently liked first).
    async fn liked_tracks_page(&self, offset: u32, limit: u32) -> Result<Page<Track>, ApiError>;
}
