//! Per-scenario measurements and the run summary.

use crate::orchestrator::Phase;
use std::time::Duration;

/// Error messages kept per scenario for the report
const MAX_ERROR_SAMPLES: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatencySummary {
    pub min: Duration,
    pub avg: Duration,
    pub p50: Duration,
    pub p90: Duration,
    pub p99: Duration,
    pub max: Duration,
}

impl LatencySummary {
    /// Nearest-rank percentiles; sorts `samples` in place
    pub fn from_samples(samples: &mut [Duration]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        samples.sort_unstable();
        let n = samples.len();
        let rank = |p: f64| {
            let index = ((p / 100.0) * n as f64).ceil() as usize;
            samples[index.clamp(1, n) - 1]
        };
        let total: Duration = samples.iter().sum();
        Self {
            min: samples[0],
            avg: total / n as u32,
            p50: rank(50.0),
            p90: rank(90.0),
            p99: rank(99.0),
            max: samples[n - 1],
        }
    }
}

/// Samples collected by one virtual user
#[derive(Debug, Default)]
pub struct Recorder {
    latencies: Vec<Duration>,
    errors: u64,
    dropped: u64,
    error_samples: Vec<String>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success(&mut self, latency: Duration) {
        self.latencies.push(latency);
    }

    pub fn failure(&mut self, latency: Duration, error: &impl std::fmt::Display) {
        self.latencies.push(latency);
        self.errors += 1;
        if self.error_samples.len() < MAX_ERROR_SAMPLES {
            self.error_samples.push(error.to_string());
        }
    }

    pub fn dropped(&mut self, count: u64) {
        self.dropped += count;
    }

    pub fn iterations(&self) -> u64 {
        self.latencies.len() as u64
    }

    pub fn merge(&mut self, other: Recorder) {
        self.latencies.extend(other.latencies);
        self.errors += other.errors;
        self.dropped += other.dropped;
        let room = MAX_ERROR_SAMPLES.saturating_sub(self.error_samples.len());
        self.error_samples.extend(other.error_samples.into_iter().take(room));
    }
}

/// Outcome of one steady-state scenario
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioReport {
    pub scenario: String,
    pub workload: String,
    pub executor: String,
    pub exporter: String,
    pub iterations: u64,
    pub errors: u64,
    /// Arrivals that found no free virtual user
    pub dropped: u64,
    pub duration: Duration,
    pub latency: LatencySummary,
    pub error_samples: Vec<String>,
}

impl ScenarioReport {
    pub fn new(
        scenario: impl Into<String>,
        workload: impl Into<String>,
        executor: impl Into<String>,
        exporter: impl Into<String>,
        mut recorder: Recorder,
        duration: Duration,
    ) -> Self {
        Self {
            scenario: scenario.into(),
            workload: workload.into(),
            executor: executor.into(),
            exporter: exporter.into(),
            iterations: recorder.iterations(),
            errors: recorder.errors,
            dropped: recorder.dropped,
            duration,
            latency: LatencySummary::from_samples(&mut recorder.latencies),
            error_samples: recorder.error_samples,
        }
    }

    /// Iterations per second over the wall duration
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.iterations as f64 / secs
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PhaseStatus {
    Completed,
    /// Error swallowed by a best-effort phase
    Degraded(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhaseOutcome {
    pub phase: Phase,
    pub status: PhaseStatus,
    pub duration: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub load: String,
    pub table: String,
    pub rows: u64,
    pub duration: Duration,
}

/// Everything a run produced, in phase order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub run_id: String,
    pub phases: Vec<PhaseOutcome>,
    pub loads: Vec<LoadReport>,
    pub scenarios: Vec<ScenarioReport>,
}

impl RunReport {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            ..Default::default()
        }
    }

    pub fn phase(&self, phase: Phase) -> Option<&PhaseOutcome> {
        self.phases.iter().find(|p| p.phase == phase)
    }

    pub fn scenario(&self, name: &str) -> Option<&ScenarioReport> {
        self.scenarios.iter().find(|s| s.scenario == name)
    }

    pub fn total_iterations(&self) -> u64 {
        self.scenarios.iter().map(|s| s.iterations).sum()
    }

    pub fn total_errors(&self) -> u64 {
        self.scenarios.iter().map(|s| s.errors).sum()
    }
}
