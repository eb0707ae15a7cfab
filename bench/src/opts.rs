use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use stroppy_workload::config::parse_duration;

/// Run database benchmarks described by workload descriptors and SQL scripts
#[derive(Parser, Debug)]
#[command(name = "stroppy-bench", author, version, about, long_about = None)]
pub struct Opts {
    /// Log filter, overrides RUST_LOG (e.g. `debug` or `stroppy_workload=trace`)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a built-in benchmark or a config file against the dry-run driver
    Run(RunOpts),

    /// Parse a SQL script and print its sections, statements and hints
    Inspect {
        /// Annotated SQL script
        script: PathBuf,
    },

    /// List the built-in benchmarks
    List,
}

#[derive(clap::Args, Debug)]
pub struct RunOpts {
    /// json5 run configuration
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Built-in benchmark, defaults to the one named in the config
    #[arg(short, long)]
    pub benchmark: Option<String>,

    /// Scale factor, overrides SCALE_FACTOR and the config
    #[arg(short, long)]
    pub scale_factor: Option<u64>,

    /// Duration of time-bound scenarios, e.g. `30s` or `5m`
    #[arg(short, long, value_parser = duration)]
    pub duration: Option<Duration>,

    /// Simulated latency of every dry-run driver call in microseconds
    #[arg(long, default_value_t = 0)]
    pub dry_run_latency_us: u64,

    /// Seed for every generator
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print the JSON schema of the config file and exit
    #[arg(long)]
    pub print_schema: bool,
}

fn duration(value: &str) -> Result<Duration, String> {
    parse_duration(value).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Opts::command().debug_assert();
    }

    #[test]
    fn test_run_flags() {
        let opts = Opts::try_parse_from([
            "stroppy-bench",
            "run",
            "--benchmark",
            "tpcb",
            "--duration",
            "1m30s",
            "--scale-factor",
            "2",
        ])
        .unwrap();
        let Command::Run(run) = opts.command else {
            panic!("expected run");
        };
        assert_eq!(run.duration, Some(Duration::from_secs(90)));
        assert_eq!(run.scale_factor, Some(2));
        assert_eq!(run.benchmark.as_deref(), Some("tpcb"));
        assert!(Opts::try_parse_from(["stroppy-bench", "run", "--duration", "soon"]).is_err());
    }
}
