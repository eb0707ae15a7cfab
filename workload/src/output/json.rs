use super::{status_label, OutputFormat};
use crate::metrics::{LatencySummary, PhaseStatus, RunReport, ScenarioReport};
use serde::Serialize;
use std::io::{self, Write};

/// JSON output for machine consumption
pub struct JsonOutput {
    writer: Box<dyn Write>,
    scenarios: Vec<JsonScenario>,
    summary: Option<JsonSummary>,
    written: bool,
}

impl JsonOutput {
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self {
            writer,
            scenarios: Vec::new(),
            summary: None,
            written: false,
        }
    }
}

#[derive(Serialize)]
struct JsonLatency {
    min_us: u128,
    avg_us: u128,
    p50_us: u128,
    p90_us: u128,
    p99_us: u128,
    max_us: u128,
}

impl From<&LatencySummary> for JsonLatency {
    fn from(l: &LatencySummary) -> Self {
        Self {
            min_us: l.min.as_micros(),
            avg_us: l.avg.as_micros(),
            p50_us: l.p50.as_micros(),
            p90_us: l.p90.as_micros(),
            p99_us: l.p99.as_micros(),
            max_us: l.max.as_micros(),
        }
    }
}

#[derive(Serialize)]
struct JsonScenario {
    name: String,
    workload: String,
    executor: String,
    iterations: u64,
    errors: u64,
    dropped: u64,
    duration_ms: u128,
    throughput: f64,
    latency: JsonLatency,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    error_samples: Vec<String>,
}

#[derive(Serialize)]
struct JsonPhase {
    phase: String,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    duration_ms: u128,
}

#[derive(Serialize)]
struct JsonLoad {
    name: String,
    table: String,
    rows: u64,
    duration_ms: u128,
}

#[derive(Serialize)]
struct JsonSummary {
    run_id: String,
    phases: Vec<JsonPhase>,
    loads: Vec<JsonLoad>,
    iterations: u64,
    errors: u64,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    scenarios: &'a [JsonScenario],
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<&'a JsonSummary>,
}

impl OutputFormat for JsonOutput {
    fn write_scenario(&mut self, report: &ScenarioReport) -> io::Result<()> {
        self.scenarios.push(JsonScenario {
            name: report.scenario.clone(),
            workload: report.workload.clone(),
            executor: report.executor.clone(),
            iterations: report.iterations,
            errors: report.errors,
            dropped: report.dropped,
            duration_ms: report.duration.as_millis(),
            throughput: report.throughput(),
            latency: JsonLatency::from(&report.latency),
            error_samples: report.error_samples.clone(),
        });
        Ok(())
    }

    fn write_summary(&mut self, report: &RunReport) -> io::Result<()> {
        let phases = report
            .phases
            .iter()
            .map(|p| JsonPhase {
                phase: p.phase.to_string(),
                status: status_label(&p.status),
                reason: match &p.status {
                    PhaseStatus::Completed => None,
                    PhaseStatus::Degraded(reason) | PhaseStatus::Failed(reason) => Some(reason.clone()),
                },
                duration_ms: p.duration.as_millis(),
            })
            .collect();
        let loads = report
            .loads
            .iter()
            .map(|l| JsonLoad {
                name: l.load.clone(),
                table: l.table.clone(),
                rows: l.rows,
                duration_ms: l.duration.as_millis(),
            })
            .collect();
        self.summary = Some(JsonSummary {
            run_id: report.run_id.clone(),
            phases,
            loads,
            iterations: report.total_iterations(),
            errors: report.total_errors(),
        });
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        // JSON output is done all at once
        if self.written {
            return Ok(());
        }
        let report = JsonReport {
            scenarios: &self.scenarios,
            summary: self.summary.as_ref(),
        };
        let json = serde_json::to_string_pretty(&report).map_err(io::Error::other)?;
        writeln!(self.writer, "{json}")?;
        self.written = true;
        self.writer.flush()
    }
}
