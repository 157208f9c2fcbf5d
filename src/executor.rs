use std::time::Instant;

use futures::StreamExt;
use futures::stream;

use crate::model::{MigrationJob, Playlist, Track};
use crate::ports::ApiError;
use crate::ports::destination::{DestinationClient, PlaylistHandle, TrackMatch};
use crate::ports::source::SourceApi;
use crate::progress::{MigrationEvent, MigrationObserver};
use crate::report::{JobReport, JobState, RunSummary, UnitOutcome};
use crate::source::SourceClient;

/// Runs migration jobs against the destination.
///
/// Failures are contained at the narrowest scope: a broken write fails one unit, a broken
/// playlist creation or track fetch fails one job. The run itself always completes.
pub struct MigrationExecutor<'a, A: SourceApi, D: DestinationClient> {
    source: &'a SourceClient<A>,
    destination: &'a D,
    observer: &'a dyn MigrationObserver,
    concurrency: usize,
}

impl<'a, A: SourceApi, D: DestinationClient> MigrationExecutor<'a, A, D> {
    pub fn new(
        source: &'a SourceClient<A>,
        destination: &'a D,
        observer: &'a dyn MigrationObserver,
    ) -> Self {
        Self {
            source,
            destination,
            observer,
            concurrency: 1,
        }
    }

    /// Number of jobs allowed to run at the same time. Units inside a job stay sequential.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Runs every job once. Reports come back in planned order regardless of completion order.
    pub async fn run(&self, jobs: Vec<MigrationJob>) -> RunSummary {
        let started = Instant::now();
        let mut summary = RunSummary::started();
        self.observer
            .on_event(&MigrationEvent::RunStarted { jobs: jobs.len() });

        let reports: Vec<JobReport> = stream::iter(jobs.into_iter().enumerate())
            .map(|(index, job)| self.run_job(index, job))
            .buffered(self.concurrency)
            .collect()
            .await;

        summary.finish(reports, started.elapsed());
        self.observer.on_event(&MigrationEvent::RunCompleted);
        summary
    }

    async fn run_job(&self, index: usize, job: MigrationJob) -> JobReport {
        let mut report = JobReport::new(job.label());
        report.state = JobState::Running;
        self.observer.on_event(&MigrationEvent::JobStarted {
            job: index,
            label: report.label.clone(),
            units: job.expected_units(),
        });

        match job {
            MigrationJob::Playlist(playlist) => {
                self.migrate_playlist(index, playlist, &mut report).await
            }
            MigrationJob::LikedTracks(tracks) => {
                self.migrate_liked_tracks(index, &tracks, &mut report).await
            }
        }

        report.state = JobState::Completed;
        self.observer.on_event(&MigrationEvent::JobCompleted {
            job: index,
            report: report.clone(),
        });
        report
    }

    async fn migrate_playlist(&self, index: usize, playlist: Playlist, report: &mut JobReport) {
        log::info!("Creating playlist: {}", playlist.name);
        let description = playlist.description.as_deref().unwrap_or("");
        let handle = match self
            .destination
            .create_playlist(&playlist.name, description)
            .await
        {
            Ok(handle) => handle,
            Err(error) => {
                report.abort(format!("Failed to create playlist: {}", error));
                return;
            }
        };

        let loaded = match self.source.load_playlist(playlist).await {
            Ok(loaded) => loaded,
            Err(error) => {
                report.abort(format!("Failed to read playlist tracks: {}", error));
                return;
            }
        };
        self.observer.on_event(&MigrationEvent::PlaylistLoaded {
            job: index,
            units: loaded.tracks.len() as u64,
        });

        for track in &loaded.tracks {
            let outcome = match track.isrc() {
                Some(isrc) => {
                    unit_outcome(self.destination.add_track_to_playlist(&handle, isrc).await)
                }
                None => UnitOutcome::NotFound,
            };
            self.record(index, report, track, outcome);
        }
        log_handle(&handle, report);
    }

    async fn migrate_liked_tracks(
        &self,
        index: usize,
        tracks: &[Track],
        report: &mut JobReport,
    ) {
        for track in tracks {
            let outcome = match track.isrc() {
                Some(isrc) => unit_outcome(self.destination.add_track_to_favorites(isrc).await),
                None => UnitOutcome::NotFound,
            };
            self.record(index, report, track, outcome);
        }
    }

    fn record(&self, index: usize, report: &mut JobReport, track: &Track, outcome: UnitOutcome) {
        let item = track.describe();
        self.observer.on_event(&MigrationEvent::UnitAttempted {
            job: index,
            item: item.clone(),
            outcome: outcome.clone(),
        });
        report.record(item, outcome);
    }
}

fn unit_outcome(result: Result<TrackMatch, ApiError>) -> UnitOutcome {
    match result {
        Ok(TrackMatch::Added) => UnitOutcome::Success,
        Ok(TrackMatch::NotFound) => UnitOutcome::NotFound,
        Err(error) => UnitOutcome::Failed(error.to_string()),
    }
}

fn log_handle(handle: &PlaylistHandle, report: &JobReport) {
    log::debug!(
        "Destination playlist {} ({}) received {} of {} tracks",
        handle.name,
        handle.id,
        report.success,
        report.attempted()
    );
}
