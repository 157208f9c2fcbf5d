use std::collections::HashMap;
use std::sync::Mutex;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::report::{JobReport, UnitOutcome};

/// Progress notifications emitted by the executor.
///
/// `job` is the index of the job in the planned order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationEvent {
    RunStarted {
        jobs: usize,
    },
    JobStarted {
        job: usize,
        label: String,
        units: u64,
    },
    /// Playlist tracks were fetched; `units` is the real count.
    PlaylistLoaded {
        job: usize,
        units: u64,
    },
    UnitAttempted {
        job: usize,
        item: String,
        outcome: UnitOutcome,
    },
    JobCompleted {
        job: usize,
        report: JobReport,
    },
    RunCompleted,
}

/// Receives progress events. Purely observational.
pub trait MigrationObserver: Send + Sync {
    fn on_event(&self, event: &MigrationEvent);
}

/// Writes events to the log.
pub struct LogObserver;

impl MigrationObserver for LogObserver {
    fn on_event(&self, event: &MigrationEvent) {
        match event {
            MigrationEvent::RunStarted { jobs } => log::info!("Starting migration of {} jobs", jobs),
            MigrationEvent::JobStarted { job, label, units } => {
                log::info!("Job {}: migrating {} (~{} tracks)", job, label, units)
            }
            MigrationEvent::PlaylistLoaded { job, units } => {
                log::debug!("Job {}: loaded {} playlist tracks", job, units)
            }
            MigrationEvent::UnitAttempted { job, item, outcome } => match outcome {
                UnitOutcome::Success => log::debug!("Job {}: added {}", job, item),
                UnitOutcome::NotFound => log::warn!("Job {}: couldn't find {}", job, item),
                UnitOutcome::Failed(cause) => {
                    log::error!("Job {}: error at track {}: {}", job, item, cause)
                }
            },
            MigrationEvent::JobCompleted { job, report } => {
                if let Some(cause) = &report.job_failure {
                    log::error!("Job {}: {} failed: {}", job, report.label, cause);
                } else {
                    log::info!(
                        "Job {}: {} done ({} added, {} not found, {} failed)",
                        job,
                        report.label,
                        report.success,
                        report.not_found_count(),
                        report.failed_count()
                    );
                }
            }
            MigrationEvent::RunCompleted => log::info!("Migration done"),
        }
    }
}

/// One terminal progress bar per running job.
pub struct ProgressBarObserver {
    multi: MultiProgress,
    bars: Mutex<HashMap<usize, ProgressBar>>,
}

impl ProgressBarObserver {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} tracks")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ")
    }

    fn with_bar(&self, job: usize, f: impl FnOnce(&ProgressBar)) {
        // A poisoned lock only means another bar update panicked, drawing can go on.
        let bars = self.bars.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(bar) = bars.get(&job) {
            f(bar);
        }
    }
}

impl Default for ProgressBarObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationObserver for ProgressBarObserver {
    fn on_event(&self, event: &MigrationEvent) {
        match event {
            MigrationEvent::JobStarted { job, label, units } => {
                let bar = self.multi.add(ProgressBar::new(*units));
                bar.set_style(Self::style());
                bar.set_message(label.clone());
                self.bars
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .insert(*job, bar);
            }
            MigrationEvent::PlaylistLoaded { job, units } => {
                self.with_bar(*job, |bar| bar.set_length(*units))
            }
            MigrationEvent::UnitAttempted { job, item, outcome } => {
                self.with_bar(*job, |bar| {
                    match outcome {
                        UnitOutcome::Success => {}
                        UnitOutcome::NotFound => bar.println(format!("Couldn't find {}", item)),
                        UnitOutcome::Failed(cause) => {
                            bar.println(format!("Error at track {}: {}", item, cause))
                        }
                    }
                    bar.inc(1);
                });
            }
            MigrationEvent::JobCompleted { job, report } => {
                let bar = self
                    .bars
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .remove(job);
                if let Some(bar) = bar {
                    match &report.job_failure {
                        Some(cause) => {
                            bar.abandon_with_message(format!("{}: {}", report.label, cause))
                        }
                        None => bar.finish_with_message(report.label.clone()),
                    }
                }
            }
            MigrationEvent::RunStarted { .. } | MigrationEvent::RunCompleted => {}
        }
    }
}

/// Forwards every event to each inner observer, in order.
pub struct FanoutObserver {
    observers: Vec<Box<dyn MigrationObserver>>,
}

impl FanoutObserver {
    pub fn new(observers: Vec<Box<dyn MigrationObserver>>) -> Self {
        Self { observers }
    }
}

impl MigrationObserver for FanoutObserver {
    fn on_event(&self, event: &MigrationEvent) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }
}

#[cfg(test)]
pub mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Keeps every event it receives, for assertions.
    #[derive(Default, Clone)]
    pub struct RecordingObserver {
        pub events: Arc<Mutex<Vec<MigrationEvent>>>,
    }

    impl RecordingObserver {
        pub fn events(&self) -> Vec<MigrationEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl MigrationObserver for RecordingObserver {
        fn on_event(&self, event: &MigrationEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    #[test]
    fn test_fanout_forwards_to_all() {
        let first = RecordingObserver::default();
        let second = RecordingObserver::default();
        let fanout = FanoutObserver::new(vec![Box::new(first.clone()), Box::new(second.clone())]);

        fanout.on_event(&MigrationEvent::RunStarted { jobs: 2 });
        fanout.on_event(&MigrationEvent::RunCompleted);

        assert_eq!(first.events().len(), 2);
        assert_eq!(second.events(), first.events());
    }

    #[test]
    fn test_progress_bar_ignores_unknown_jobs() {
        let observer = ProgressBarObserver::new();
        observer.on_event(&MigrationEvent::UnitAttempted {
            job: 7,
            item: "track".into(),
            outcome: UnitOutcome::Success,
        });
        observer.on_event(&MigrationEvent::JobCompleted {
            job: 7,
            report: JobReport::new("Liked Tracks"),
        });
    }
}
