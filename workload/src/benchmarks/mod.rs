//! Built-in benchmarks.
//!
//! Each one is a descriptor tree plus the SQL script it binds against,
//! and a default run configuration that mirrors the usual way of running it.

pub mod tpcb;
pub mod tpcc;

use crate::config::{
    BenchmarkConfig, DbValue, ExecutorConfig, RunConfig, StepConfig, StepPhase,
};
use crate::error::ConfigurationError;
use crate::model::DescriptorTree;
use crate::sql::{bind_and_derive, BindOptions};
use std::collections::BTreeMap;
use std::time::Duration;
use strum::{Display, EnumIter, EnumString, VariantNames};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, VariantNames)]
#[strum(ascii_case_insensitive, serialize_all = "snake_case")]
pub enum BuiltinBenchmark {
    Tpcc,
    Tpcb,
}

impl BuiltinBenchmark {
    pub fn description(self) -> &'static str {
        match self {
            BuiltinBenchmark::Tpcc => "TPC-C, scale factor is the warehouse count",
            BuiltinBenchmark::Tpcb => "pgbench-style TPC-B, scale factor is the branch count",
        }
    }

    pub fn script(self) -> &'static str {
        match self {
            BuiltinBenchmark::Tpcc => tpcc::SCRIPT,
            BuiltinBenchmark::Tpcb => tpcb::SCRIPT,
        }
    }

    /// Unbound descriptors sized for `scale`
    pub fn descriptors(self, scale: u64) -> DescriptorTree {
        let scale = i64::try_from(scale).unwrap_or(i64::MAX);
        match self {
            BuiltinBenchmark::Tpcc => tpcc::descriptors(scale),
            BuiltinBenchmark::Tpcb => tpcb::descriptors(scale),
        }
    }

    /// Descriptors bound against the built-in script, with the config's
    /// scale factor and unit count overrides applied
    pub fn build(self, config: &RunConfig) -> Result<DescriptorTree, ConfigurationError> {
        let options = BindOptions {
            unit_counts: config.unit_counts.clone(),
            ..BindOptions::default()
        };
        let tree = bind_and_derive(
            &self.descriptors(config.benchmark.scale_factor),
            self.script(),
            &options,
        )?;
        debug!(
            benchmark = %self,
            scale = config.benchmark.scale_factor,
            workloads = tree.workloads.len(),
            loads = tree.loads.len(),
            "built descriptors"
        );
        Ok(tree)
    }

    /// Cleanup, schema, load and the standard steady-state mix
    pub fn default_config(self, scale: u64) -> RunConfig {
        let mut config = RunConfig {
            run_id: self.to_string(),
            benchmark: BenchmarkConfig {
                name: self.to_string(),
                scale_factor: scale,
            },
            ..RunConfig::default()
        };
        config.driver.db_specific = default_db_specific();
        config.steps = vec![
            StepConfig::new("cleanup", StepPhase::Cleanup).workload("cleanup"),
            StepConfig::new("create_schema", StepPhase::CreateSchema).workload("create_schema"),
            StepConfig::new("load_data", StepPhase::LoadData),
        ];

        let (mix, duration): (&[(&str, &str, u32)], _) = match self {
            BuiltinBenchmark::Tpcc => (&tpcc::MIX, Duration::from_secs(5 * 60)),
            BuiltinBenchmark::Tpcb => (&[("update_and_log", "update_and_log", tpcb::VUS)], Duration::from_secs(1)),
        };
        for &(scenario, unit, vus) in mix {
            config
                .executors
                .insert(scenario.to_string(), ExecutorConfig::ConstantVus { vus, duration });
            config.steps.push(
                StepConfig::new(scenario, StepPhase::Workload)
                    .workload("workload")
                    .unit(unit)
                    .executor(scenario),
            );
        }
        config
    }
}

/// Connection settings both built-ins ship with
fn default_db_specific() -> BTreeMap<String, DbValue> {
    BTreeMap::from([
        ("trace_log_level".to_string(), DbValue::String("error".into())),
        ("max_conn_lifetime".to_string(), DbValue::String("5m".into())),
        ("max_conn_idle_time".to_string(), DbValue::String("2m".into())),
        ("max_conns".to_string(), DbValue::Int(1)),
        ("min_conns".to_string(), DbValue::Int(1)),
        ("min_idle_conns".to_string(), DbValue::Int(1)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::RunPlan;
    use strum::IntoEnumIterator;

    #[test]
    fn test_names() {
        assert_eq!("TPCC".parse::<BuiltinBenchmark>().unwrap(), BuiltinBenchmark::Tpcc);
        assert_eq!(BuiltinBenchmark::VARIANTS, ["tpcc", "tpcb"]);
        assert!("tpch".parse::<BuiltinBenchmark>().is_err());
    }

    #[test]
    fn test_default_configs_plan_against_their_trees() {
        for benchmark in BuiltinBenchmark::iter() {
            let config = benchmark.default_config(1);
            config.check().unwrap();
            let tree = benchmark.build(&config).unwrap();
            let plan = RunPlan::from_config(&config).unwrap();
            plan.check(&tree).unwrap();
            assert!(plan.load_data);
        }
    }

    #[test]
    fn test_tpcc_mix() {
        let config = BuiltinBenchmark::Tpcc.default_config(2);
        let vus: Vec<_> = tpcc::MIX
            .iter()
            .map(|(scenario, _, _)| match &config.executors[*scenario] {
                ExecutorConfig::ConstantVus { vus, duration } => {
                    assert_eq!(*duration, Duration::from_secs(300));
                    *vus
                }
                other => panic!("unexpected executor {other:?}"),
            })
            .collect();
        assert_eq!(vus, [44, 43, 4, 4, 4]);
        let tunables = config.driver.tunables().unwrap();
        assert_eq!(tunables.max_conn_lifetime, Some(Duration::from_secs(300)));
        assert_eq!(tunables.trace_log_level.as_deref(), Some("error"));
    }

    #[test]
    fn test_unit_count_override() {
        let mut config = BuiltinBenchmark::Tpcc.default_config(1);
        config
            .unit_counts
            .entry("workload".into())
            .or_default()
            .insert("stock_level".into(), 9);
        let tree = BuiltinBenchmark::Tpcc.build(&config).unwrap();
        assert_eq!(tree.find_unit("workload", "stock_level").unwrap().count, 9);
    }
}
