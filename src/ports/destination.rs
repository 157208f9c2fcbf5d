use crate::ports::ApiError;

/// A playlist created on the destination service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistHandle {
    pub id: String,
    pub name: String,
}

/// Result of asking the destination to add a track by ISRC.
///
/// A missing catalog match is a normal outcome, transport problems are reported
/// through [`ApiError`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackMatch {
    Added,
    NotFound,
}

/// Port trait wrapping the write access to the destination library.
///
/// Implementations live in `tidal_rs::client` (production) or test mocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait DestinationClient: Send + Sync {
    /// Always creates a new playlist, even when the source playlist is empty.
    /// A missing description is passed as an empty string.
    async fn create_playlist(
        &self,
        name: &str,
        description: &str,
    ) -> Result<PlaylistHandle, ApiError>;

    async fn add_track_to_playlist(
        &self,
        playlist: &PlaylistHandle,
        isrc: &str,
    ) -> Result<TrackMatch, ApiError>;

    async fn add_track_to_favorites(&self, isrc: &str) -> Result<TrackMatch, ApiError>;
}
