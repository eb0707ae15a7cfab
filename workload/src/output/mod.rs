pub mod json;
pub mod pretty;

use crate::config::{ExporterConfig, DEFAULT_EXPORTER};
use crate::metrics::{PhaseStatus, RunReport, ScenarioReport};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{self, Write};

/// Output format trait
pub trait OutputFormat {
    /// Write results for a single scenario as soon as it finishes
    fn write_scenario(&mut self, report: &ScenarioReport) -> io::Result<()>;

    /// Write the final summary
    fn write_summary(&mut self, report: &RunReport) -> io::Result<()>;

    /// Flush any buffered output
    fn flush(&mut self) -> io::Result<()>;
}

/// Available output formats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Format::Pretty),
            "json" => Ok(Format::Json),
            _ => Err(format!("unknown output format: {}", s)),
        }
    }
}

/// Create an output formatter writing to stdout
pub fn create_output(format: Format) -> Box<dyn OutputFormat> {
    create_output_to(format, Box::new(io::stdout()))
}

pub fn create_output_to(format: Format, writer: Box<dyn Write>) -> Box<dyn OutputFormat> {
    match format {
        Format::Pretty => Box::new(pretty::PrettyOutput::new(writer)),
        Format::Json => Box::new(json::JsonOutput::new(writer)),
    }
}

/// Helper to get the status label for display
pub fn status_label(status: &PhaseStatus) -> &'static str {
    match status {
        PhaseStatus::Completed => "OK",
        PhaseStatus::Degraded(_) => "WARN",
        PhaseStatus::Failed(_) => "FAIL",
    }
}

/// Send every scenario to the exporter its step named; the run summary
/// goes to the default exporter.
pub fn export(report: &RunReport, exporters: &BTreeMap<String, ExporterConfig>) -> io::Result<()> {
    let fallback = ExporterConfig::default();
    let mut names: Vec<&str> = report.scenarios.iter().map(|s| s.exporter.as_str()).collect();
    names.push(DEFAULT_EXPORTER);
    names.sort_unstable();
    names.dedup();

    for name in names {
        let config = exporters.get(name).unwrap_or(&fallback);
        let writer: Box<dyn Write> = match &config.path {
            Some(path) => Box::new(io::BufWriter::new(std::fs::File::create(path)?)),
            None => Box::new(io::stdout()),
        };
        let mut output = create_output_to(config.format, writer);
        for scenario in report.scenarios.iter().filter(|s| s.exporter == name) {
            output.write_scenario(scenario)?;
        }
        if name == DEFAULT_EXPORTER {
            output.write_summary(report)?;
        }
        output.flush()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{PhaseOutcome, Recorder};
    use crate::orchestrator::Phase;
    use std::time::Duration;

    fn report() -> RunReport {
        let mut recorder = Recorder::new();
        recorder.success(Duration::from_millis(2));
        recorder.failure(Duration::from_millis(4), &"deadlock detected");
        let mut report = RunReport::new("test");
        report.phases.push(PhaseOutcome {
            phase: Phase::SteadyState,
            status: PhaseStatus::Completed,
            duration: Duration::from_secs(1),
        });
        report.scenarios.push(ScenarioReport::new(
            "new_order",
            "workload",
            "constant_vus",
            "file",
            recorder,
            Duration::from_secs(1),
        ));
        report
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("JSON".parse::<Format>().unwrap(), Format::Json);
        assert!("xml".parse::<Format>().is_err());
    }

    #[test]
    fn test_export_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenarios.json");
        let exporters = BTreeMap::from([
            (
                "file".to_string(),
                ExporterConfig {
                    format: Format::Json,
                    path: Some(path.clone()),
                },
            ),
            (
                DEFAULT_EXPORTER.to_string(),
                ExporterConfig {
                    format: Format::Json,
                    path: Some(dir.path().join("summary.json")),
                },
            ),
        ]);
        export(&report(), &exporters).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["scenarios"][0]["name"], "new_order");
        assert_eq!(written["scenarios"][0]["iterations"], 2);
        assert_eq!(written["scenarios"][0]["errors"], 1);

        let summary: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("summary.json")).unwrap()).unwrap();
        assert_eq!(summary["summary"]["run_id"], "test");
        assert_eq!(summary["summary"]["phases"][0]["phase"], "steady_state");
    }
}
