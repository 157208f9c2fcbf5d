use std::fmt;
use std::time::Duration;

/// Result of one write attempt against the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    Success,
    /// The destination has no match for the track (or the track has no ISRC).
    NotFound,
    /// The request itself broke.
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    /// Every unit was attempted once, or the job was aborted before its units.
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedItem {
    pub item: String,
    pub cause: String,
}

/// Outcome of a single migration job.
///
/// Lists keep the order in which units were attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub label: String,
    pub state: JobState,
    /// Set when the job could not start its units (playlist creation or track fetch failed).
    pub job_failure: Option<String>,
    pub success: usize,
    pub not_found: Vec<String>,
    pub failed: Vec<FailedItem>,
}

impl JobReport {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            state: JobState::Pending,
            job_failure: None,
            success: 0,
            not_found: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn record(&mut self, item: String, outcome: UnitOutcome) {
        match outcome {
            UnitOutcome::Success => self.success += 1,
            UnitOutcome::NotFound => self.not_found.push(item),
            UnitOutcome::Failed(cause) => self.failed.push(FailedItem { item, cause }),
        }
    }

    pub fn abort(&mut self, cause: String) {
        self.job_failure = Some(cause);
    }

    pub fn not_found_count(&self) -> usize {
        self.not_found.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn attempted(&self) -> usize {
        self.success + self.not_found_count() + self.failed_count()
    }
}

impl fmt::Display for JobReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: {} added, {} not found, {} failed",
            self.label,
            self.success,
            self.not_found_count(),
            self.failed_count()
        )?;
        if let Some(cause) = &self.job_failure {
            writeln!(f, "  job failed: {}", cause)?;
        }
        for item in &self.not_found {
            writeln!(f, "  not found: {}", item)?;
        }
        for failed in &self.failed {
            writeln!(f, "  failed: {} ({})", failed.item, failed.cause)?;
        }
        Ok(())
    }
}

/// Reports of a whole run, in the order the jobs were planned.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub state: RunState,
    pub reports: Vec<JobReport>,
    pub elapsed: Duration,
}

impl RunSummary {
    /// A run that has started but has no finished jobs yet.
    pub fn started() -> Self {
        Self {
            state: RunState::Running,
            reports: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Every job reached `Completed`.
    pub fn finish(&mut self, reports: Vec<JobReport>, elapsed: Duration) {
        self.reports = reports;
        self.elapsed = elapsed;
        self.state = RunState::Done;
    }

    pub fn has_failures(&self) -> bool {
        self.reports
            .iter()
            .any(|report| report.job_failure.is_some() || !report.failed.is_empty())
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            RunState::Running => "in progress",
            RunState::Done => "done",
        };
        writeln!(
            f,
            "Migration summary, {} ({} jobs in {})",
            state,
            self.reports.len(),
            humantime::format_duration(Duration::from_secs(self.elapsed.as_secs()))
        )?;
        for report in &self.reports {
            write!(f, "{}", report)?;
        }
        Ok(())
    }
}
