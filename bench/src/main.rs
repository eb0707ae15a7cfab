mod opts;

use anyhow::{bail, Context};
use clap::Parser;
use opts::{Command, Opts, RunOpts};
use std::sync::Arc;
use std::time::Duration;
use strum::IntoEnumIterator;
use stroppy_workload::benchmarks::BuiltinBenchmark;
use stroppy_workload::config::{DriverKind, EnvOverrides, RunConfig};
use stroppy_workload::driver::DryRunDriver;
use stroppy_workload::orchestrator::{Orchestrator, RunPlan};
use stroppy_workload::output;
use stroppy_workload::sql::{self, extract_inline_hints};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();

    let filter = match &opts.log_level {
        Some(level) => EnvFilter::try_new(level).with_context(|| format!("invalid log level `{level}`"))?,
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "stroppy_bench=info,stroppy_workload=info".into()),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    match opts.command {
        Command::Run(run_opts) => run(run_opts).await,
        Command::Inspect { script } => inspect(&script),
        Command::List => {
            for benchmark in BuiltinBenchmark::iter() {
                println!("{:<8} {}", benchmark.to_string(), benchmark.description());
            }
            Ok(())
        }
    }
}

async fn run(opts: RunOpts) -> anyhow::Result<()> {
    if opts.print_schema {
        println!("{}", serde_json::to_string_pretty(&RunConfig::json_schema())?);
        return Ok(());
    }

    let env = EnvOverrides::from_env().context("failed to read environment overrides")?;
    let mut config = match (&opts.config, &opts.benchmark) {
        (Some(path), _) => {
            RunConfig::parse(path).with_context(|| format!("failed to load config {}", path.display()))?
        }
        (None, Some(name)) => benchmark(name)?.default_config(1),
        (None, None) => bail!("either --config or --benchmark is required"),
    };
    if let Some(name) = &opts.benchmark {
        config.benchmark.name = name.clone();
    }
    config.apply(&env);
    config.apply(&EnvOverrides {
        driver_url: None,
        scale_factor: opts.scale_factor,
        duration: opts.duration,
    });
    if let Some(seed) = opts.seed {
        config.seed = seed;
    }
    config.check().context("invalid run configuration")?;

    let builtin = benchmark(&config.benchmark.name)?;
    let tree = builtin
        .build(&config)
        .with_context(|| format!("failed to build {builtin} descriptors"))?;
    let plan = RunPlan::from_config(&config)?;

    if config.driver.kind != DriverKind::DryRun {
        bail!(
            "driver `{}` is not available in this build, only `dry_run` is",
            config.driver.kind
        );
    }
    let driver = Arc::new(
        DryRunDriver::new(config.driver.tunables()?)
            .with_latency(Duration::from_micros(opts.dry_run_latency_us)),
    );

    info!(
        benchmark = %builtin,
        scale = config.benchmark.scale_factor,
        run_id = %config.run_id,
        "starting"
    );
    let report = Orchestrator::new(driver, tree, plan)?.run().await?;
    output::export(&report, &config.exporters).context("failed to write the report")?;
    Ok(())
}

fn benchmark(name: &str) -> anyhow::Result<BuiltinBenchmark> {
    name.parse().map_err(|_| {
        let known: Vec<_> = BuiltinBenchmark::iter().map(|b| b.to_string()).collect();
        anyhow::anyhow!("unknown benchmark `{name}`, expected one of: {}", known.join(", "))
    })
}

fn inspect(path: &std::path::Path) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let script = sql::parse(&text).with_context(|| format!("failed to parse {}", path.display()))?;
    for (section, statements) in script.sections() {
        println!("[{section}]");
        for statement in statements {
            println!(
                "  {} ({}, line {})",
                statement.name, statement.kind, statement.line
            );
            if !statement.params.is_empty() {
                println!("    params: {}", statement.params.join(", "));
            }
            for hint in extract_inline_hints(&statement.sql)? {
                let bang = if hint.unique { " unique" } else { "" };
                println!(
                    "    hint: {} {}..{}{bang} -> {}",
                    hint.param,
                    hint.min.as_deref().unwrap_or("_"),
                    hint.max,
                    hint.derived_name()
                );
            }
        }
    }
    Ok(())
}
