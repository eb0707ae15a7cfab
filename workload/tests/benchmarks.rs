use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use stroppy_workload::benchmarks::BuiltinBenchmark;
use stroppy_workload::config::{EnvOverrides, ExecutorConfig, RunConfig};
use stroppy_workload::driver::{DryRunDriver, RecordingDriver};
use stroppy_workload::orchestrator::{execute_load, plan_load, Orchestrator, Phase, RunPlan};
use stroppy_workload::Value;

#[tokio::test]
async fn test_tpcc_districts_follow_warehouse_order() {
    let overrides = EnvOverrides::from_vars([("WAREHOUSES", "2")]).unwrap();
    let mut config = BuiltinBenchmark::Tpcc.default_config(1);
    config.apply(&overrides);
    assert_eq!(config.benchmark.scale_factor, 2);

    let tree = BuiltinBenchmark::Tpcc.build(&config).unwrap();
    let mut plan = plan_load(tree.get_load("load_district").unwrap(), config.seed).unwrap();
    let w = plan.columns().iter().position(|c| c == "d_w_id").unwrap();
    let d = plan.columns().iter().position(|c| c == "d_id").unwrap();

    let driver = RecordingDriver::new();
    assert_eq!(execute_load(&driver, &mut plan).await.unwrap(), 20);
    let keys: Vec<_> = driver
        .inserted_rows("district")
        .iter()
        .map(|row| (row[w].clone(), row[d].clone()))
        .collect();
    let expected: Vec<_> = (1..=2)
        .flat_map(|w| (1..=10).map(move |d| (Value::Int(w), Value::Int(d))))
        .collect();
    assert_eq!(keys, expected);
}

#[test]
fn test_scale_factor_wins_over_warehouses() {
    let overrides = EnvOverrides::from_vars([("WAREHOUSES", "2"), ("SCALE_FACTOR", "3")]).unwrap();
    let mut config = BuiltinBenchmark::Tpcc.default_config(1);
    config.apply(&overrides);
    let tree = BuiltinBenchmark::Tpcc.build(&config).unwrap();
    let plan = plan_load(tree.get_load("load_warehouse").unwrap(), 0).unwrap();
    assert_eq!(plan.count, 3);
}

#[test]
fn test_duration_override_reaches_every_scenario() {
    let overrides = EnvOverrides::from_vars([("DURATION", "30s")]).unwrap();
    let mut config = BuiltinBenchmark::Tpcc.default_config(1);
    config.apply(&overrides);
    let plan = RunPlan::from_config(&config).unwrap();
    assert_eq!(plan.scenarios.len(), 5);
    for scenario in &plan.scenarios {
        assert!(matches!(
            scenario.executor,
            ExecutorConfig::ConstantVus { duration, .. } if duration == Duration::from_secs(30)
        ));
    }
}

#[tokio::test]
async fn test_tpcb_from_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(
        br#"{
            run_id: "tpcb-smoke",
            seed: 11,
            benchmark: { name: "tpcb", scale_factor: 1 },
            executors: {
                burst: { type: "shared_iterations", vus: 4, iterations: 40 },
            },
            steps: [
                { name: "cleanup", phase: "cleanup", workload: "cleanup" },
                { name: "schema", phase: "create_schema", workload: "create_schema" },
                { name: "load", phase: "load_data" },
                { name: "burst", phase: "workload", workload: "workload", executor: "burst" },
            ],
        }"#,
    )
    .unwrap();

    let config = RunConfig::parse(file.path()).unwrap();
    let tree = BuiltinBenchmark::Tpcb.build(&config).unwrap();
    let plan = RunPlan::from_config(&config).unwrap();
    let driver = Arc::new(DryRunDriver::new(config.driver.tunables().unwrap()));
    let report = Orchestrator::new(driver.clone(), tree, plan)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.run_id, "tpcb-smoke");
    let loaded: Vec<_> = report.loads.iter().map(|l| (l.table.as_str(), l.rows)).collect();
    assert_eq!(
        loaded,
        [
            ("pgbench_branches", 1),
            ("pgbench_tellers", 10),
            ("pgbench_accounts", 100_000),
        ]
    );
    let burst = report.scenario("burst").unwrap();
    assert_eq!(burst.iterations, 40);
    assert_eq!(burst.errors, 0);
    assert_eq!(report.phases.len(), Phase::ALL.len());

    let stats = driver.stats();
    assert_eq!(stats.transactions, 40);
    assert_eq!(stats.rows, 100_011);
    // four drops, four creates and five statements per transaction
    assert_eq!(stats.queries, 8 + 40 * 5);
}
