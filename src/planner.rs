use crate::model::{MigrationJob, Playlist};
use crate::paginator::FetchError;
use crate::ports::source::SourceApi;
use crate::source::SourceClient;

/// What the user chose to migrate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Chosen playlists, in the order they should be migrated.
    pub playlists: Vec<Playlist>,
    pub liked_tracks: bool,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.playlists.is_empty() && !self.liked_tracks
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("Failed to read liked tracks: {0}")]
    LikedTracks(#[source] FetchError),
}

pub struct MigrationPlanner<'a, A: SourceApi> {
    source: &'a SourceClient<A>,
}

impl<'a, A: SourceApi> MigrationPlanner<'a, A> {
    pub fn new(source: &'a SourceClient<A>) -> Self {
        Self { source }
    }

    /// Turns a selection into jobs: one per playlist, then one for liked tracks.
    ///
    /// Playlist tracks are not fetched here, that happens when the job runs. Liked tracks
    /// are fetched right away. Any fetch failure aborts planning without a partial plan.
    pub async fn plan(&self, selection: &Selection) -> Result<Vec<MigrationJob>, PlanError> {
        let mut jobs: Vec<MigrationJob> = selection
            .playlists
            .iter()
            .cloned()
            .map(MigrationJob::Playlist)
            .collect();

        if selection.liked_tracks {
            let liked = self
                .source
                .list_liked_tracks()
                .await
                .map_err(PlanError::LikedTracks)?;
            jobs.push(MigrationJob::LikedTracks(liked));
        }

        log::info!("Planned {} migration jobs", jobs.len());
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::*;
    use crate::model::Track;
    use crate::paginator::Page;
    use crate::ports::ApiError;
    use crate::ports::source::MockSourceApi;

    fn playlist(id: &str) -> Playlist {
        Playlist {
            id: id.into(),
            name: format!("Playlist {}", id),
            description: None,
            total_tracks: 3,
        }
    }

    #[tokio::test]
    async fn test_empty_selection_plans_nothing() {
        let api = MockSourceApi::new();
        let source = SourceClient::new(api);

        let jobs = MigrationPlanner::new(&source)
            .plan(&Selection::default())
            .await
            .unwrap();

        assert!(jobs.is_empty());
    }

    #[tokio::test]
    async fn test_playlists_are_not_fetched_at_plan_time() {
        let mut api = MockSourceApi::new();
        api.expect_playlist_tracks_page().never();
        api.expect_liked_tracks_page().never();
        let source = SourceClient::new(api);

        let selection = Selection {
            playlists: vec![playlist("p1"), playlist("p2")],
            liked_tracks: false,
        };
        let jobs = MigrationPlanner::new(&source).plan(&selection).await.unwrap();

        assert_eq!(
            jobs,
            vec![
                MigrationJob::Playlist(playlist("p1")),
                MigrationJob::Playlist(playlist("p2")),
            ]
        );
    }

    #[tokio::test]
    async fn test_liked_tracks_job_comes_last_and_is_loaded() {
        let mut api = MockSourceApi::new();
        api.expect_liked_tracks_page().times(1).returning(|_, _| {
            Ok(Page {
                items: vec![
                    Track::new(Some("L2".into()), "Two", "Artist"),
                    Track::new(Some("L1".into()), "One", "Artist"),
                ],
                total: 2,
                has_next: false,
            })
        });
        let source = SourceClient::new(api);

        let selection = Selection {
            playlists: vec![playlist("p1")],
            liked_tracks: true,
        };
        let jobs = MigrationPlanner::new(&source).plan(&selection).await.unwrap();

        assert_eq!(jobs.len(), 2);
        match &jobs[1] {
            MigrationJob::LikedTracks(tracks) => {
                assert_eq!(tracks[0].isrc(), Some("L1"));
                assert_eq!(tracks[1].isrc(), Some("L2"));
            }
            other => panic!("Expected liked tracks job, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_liked_tracks_failure_aborts_plan() {
        let mut api = MockSourceApi::new();
        api.expect_liked_tracks_page().returning(|_, _| {
            Err(ApiError::Status {
                status: StatusCode::UNAUTHORIZED,
                body: "token expired".into(),
            })
        });
        let source = SourceClient::new(api);

        let selection = Selection {
            playlists: vec![playlist("p1")],
            liked_tracks: true,
        };
        let result = MigrationPlanner::new(&source).plan(&selection).await;

        assert!(matches!(result, Err(PlanError::LikedTracks(_))));
    }
}
