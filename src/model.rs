/// A track as read from the source library.
///
/// The ISRC is the only key used to find the same recording on the destination.
/// Tracks without one are reported as unmatched and never sent to the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub isrc: Option<String>,
    pub title: String,
    pub artist: String,
}

impl Track {
    pub fn new(isrc: Option<String>, title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            // An empty identifier is as useless as a missing one
            isrc: isrc.filter(|isrc| !isrc.trim().is_empty()),
            title: title.into(),
            artist: artist.into(),
        }
    }

    pub fn isrc(&self) -> Option<&str> {
        self.isrc.as_deref()
    }

    /// Human readable label used in reports, e.g. `"Song" by Artist`.
    pub fn describe(&self) -> String {
        match self.isrc() {
            Some(isrc) => format!("\"{}\" by {} (ISRC {})", self.title, self.artist, isrc),
            None => format!("\"{}\" by {} (no ISRC)", self.title, self.artist),
        }
    }
}

/// Playlist metadata without its tracks.
///
/// Tracks are only fetched once a migration job for the playlist runs, see
/// [`crate::source::SourceClient::load_playlist`] which turns this into a [`LoadedPlaylist`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Only used for labels and progress sizing.
    pub total_tracks: u32,
}

impl Playlist {
    pub fn label(&self) -> String {
        format!("{} ({} Tracks)", self.name, self.total_tracks)
    }
}

/// A playlist whose tracks have been fetched, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedPlaylist {
    pub playlist: Playlist,
    pub tracks: Vec<Track>,
}

/// One unit of migration work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationJob {
    Playlist(Playlist),
    /// Liked tracks, oldest first.
    LikedTracks(Vec<Track>),
}

impl MigrationJob {
    pub fn label(&self) -> String {
        match self {
            MigrationJob::Playlist(playlist) => format!("Playlist '{}'", playlist.name),
            MigrationJob::LikedTracks(_) => "Liked Tracks".to_string(),
        }
    }

    /// Number of units, if known before the job runs.
    pub fn expected_units(&self) -> u64 {
        match self {
            MigrationJob::Playlist(playlist) => playlist.total_tracks as u64,
            MigrationJob::LikedTracks(tracks) => tracks.len() as u64,
        }
    }
}
