//! Workload core for database benchmarks.
//!
//! A benchmark is a [`model::DescriptorTree`] of named, parameterized
//! operations. [`sql::bind_and_derive`] fills it from an annotated SQL
//! script, [`generation`] produces the parameter values, and the
//! [`orchestrator::Orchestrator`] drives cleanup, schema creation, bulk
//! load, steady-state traffic and teardown against a [`driver::Driver`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use stroppy_workload::benchmarks::BuiltinBenchmark;
//! use stroppy_workload::driver::DryRunDriver;
//! use stroppy_workload::orchestrator::{Orchestrator, RunPlan};
//!
//! # async fn run() -> stroppy_workload::Result<()> {
//! let config = BuiltinBenchmark::Tpcb.default_config(1);
//! let tree = BuiltinBenchmark::Tpcb.build(&config)?;
//! let plan = RunPlan::from_config(&config)?;
//! let driver = Arc::new(DryRunDriver::new(config.driver.tunables()?));
//! let report = Orchestrator::new(driver, tree, plan)?.run().await?;
//! println!("{} iterations", report.total_iterations());
//! # Ok(())
//! # }
//! ```

pub mod benchmarks;
pub mod config;
pub mod driver;
pub mod error;
pub mod generation;
pub mod metrics;
pub mod model;
pub mod orchestrator;
pub mod output;
pub mod runtime;
pub mod sql;
pub mod value;

pub use error::{Error, Result};
pub use value::Value;
