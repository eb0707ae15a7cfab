use super::{status_label, OutputFormat};
use crate::metrics::{PhaseStatus, RunReport, ScenarioReport};
use colored::Colorize;
use std::io::{self, Write};

/// Pretty human-readable output
pub struct PrettyOutput {
    writer: Box<dyn Write>,
}

impl PrettyOutput {
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }

    fn status_colored(&self, status: &PhaseStatus) -> colored::ColoredString {
        let label = status_label(status);
        match status {
            PhaseStatus::Completed => label.green(),
            PhaseStatus::Degraded(_) => label.yellow(),
            PhaseStatus::Failed(_) => label.red().bold(),
        }
    }
}

impl OutputFormat for PrettyOutput {
    fn write_scenario(&mut self, report: &ScenarioReport) -> io::Result<()> {
        let l = &report.latency;
        writeln!(
            self.writer,
            "{} {} ({}, {})",
            "scenario".bold(),
            report.scenario.bold(),
            report.workload,
            report.executor.dimmed()
        )?;
        writeln!(
            self.writer,
            "  iterations {:<10} errors {:<8} dropped {:<8} {:.1} it/s over {:.2?}",
            report.iterations,
            report.errors,
            report.dropped,
            report.throughput(),
            report.duration
        )?;
        writeln!(
            self.writer,
            "  latency    min {:.2?}  avg {:.2?}  p50 {:.2?}  p90 {:.2?}  p99 {:.2?}  max {:.2?}",
            l.min, l.avg, l.p50, l.p90, l.p99, l.max
        )?;
        for sample in &report.error_samples {
            writeln!(self.writer, "  {} {}", "error".red(), sample)?;
        }
        Ok(())
    }

    fn write_summary(&mut self, report: &RunReport) -> io::Result<()> {
        writeln!(self.writer)?;
        writeln!(self.writer, "{} {}", "run".bold(), report.run_id.bold())?;
        for phase in &report.phases {
            let line = format!("  [{}] {:<14} ({:.2?})", self.status_colored(&phase.status), phase.phase.to_string(), phase.duration);
            match &phase.status {
                PhaseStatus::Completed => writeln!(self.writer, "{line}")?,
                PhaseStatus::Degraded(reason) | PhaseStatus::Failed(reason) => {
                    writeln!(self.writer, "{line} {}", reason.dimmed())?
                }
            }
        }
        for load in &report.loads {
            writeln!(
                self.writer,
                "  load {:<20} {:>10} rows into {} ({:.2?})",
                load.load, load.rows, load.table, load.duration
            )?;
        }
        writeln!(
            self.writer,
            "  {} iterations, {} errors",
            report.total_iterations(),
            report.total_errors()
        )
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
