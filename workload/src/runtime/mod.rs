//! Virtual-user runtime for steady-state traffic.
//!
//! A [`Scenario`] binds a workload (or one of its units) to an executor.
//! Every virtual user is a tokio task owning its own [`PreparedUnit`]s, so
//! generator state is never shared between workers. Scenarios stop starting
//! iterations once their time budget is spent; iterations already running
//! finish normally.

mod cycle;
mod prepared;

pub use cycle::UnitCycle;
pub use prepared::{BoundUnit, PreparedUnit};

use crate::config::{ExecutorConfig, Stage, DEFAULT_EXPORTER};
use crate::driver::Driver;
use crate::error::{ConfigurationError, Error, LifecycleError};
use crate::generation::derive_seed;
use crate::metrics::{Recorder, ScenarioReport};
use crate::model::DescriptorTree;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// How often an idle ramping VU checks whether it became active
const RAMP_POLL: Duration = Duration::from_millis(10);

/// Steady-state traffic definition
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub name: String,
    pub workload: String,
    /// Run only this unit instead of cycling through the workload
    pub unit: Option<String>,
    pub executor: ExecutorConfig,
    pub exporter: String,
}

impl Scenario {
    pub fn new(name: impl Into<String>, workload: impl Into<String>, executor: ExecutorConfig) -> Self {
        Self {
            name: name.into(),
            workload: workload.into(),
            unit: None,
            executor,
            exporter: DEFAULT_EXPORTER.to_string(),
        }
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn exporter(mut self, exporter: impl Into<String>) -> Self {
        self.exporter = exporter.into();
        self
    }
}

/// One worker of a scenario
struct VirtualUser<D: ?Sized> {
    driver: Arc<D>,
    units: Vec<PreparedUnit>,
    cycle: UnitCycle,
    recorder: Recorder,
}

impl<D: Driver + ?Sized> VirtualUser<D> {
    fn new(driver: Arc<D>, tree: &DescriptorTree, scenario: &Scenario, seed: u64) -> Result<Self, ConfigurationError> {
        let workload = tree.require_workload(&scenario.workload)?;
        let units = workload
            .units()
            .map(|unit| PreparedUnit::new(unit, seed))
            .collect::<Result<Vec<_>, _>>()?;
        let cycle = match &scenario.unit {
            Some(name) => {
                let index = units
                    .iter()
                    .position(|u| u.name() == name)
                    .ok_or_else(|| ConfigurationError::not_found("unit", format!("{}/{name}", scenario.workload)))?;
                UnitCycle::pinned(index, units.len())
            }
            None => UnitCycle::new(&units.iter().map(PreparedUnit::count).collect::<Vec<_>>()),
        };
        Ok(Self {
            driver,
            units,
            cycle,
            recorder: Recorder::new(),
        })
    }

    async fn run_unit(&mut self, index: usize) {
        let started = Instant::now();
        let result = self.units[index].execute(self.driver.as_ref()).await;
        let latency = started.elapsed();
        match result {
            Ok(()) => self.recorder.success(latency),
            Err(e) => {
                debug!(error = %e, "iteration failed");
                self.recorder.failure(latency, &e);
            }
        }
    }

    /// One iteration; `false` when there is nothing to run
    async fn iterate(&mut self) -> bool {
        match self.cycle.next_index() {
            Some(index) => {
                self.run_unit(index).await;
                tokio::task::yield_now().await;
                true
            }
            None => false,
        }
    }

    /// Every unit `count` times, in declaration order
    async fn single_pass(&mut self) {
        for index in 0..self.units.len() {
            for _ in 0..self.units[index].count() {
                self.run_unit(index).await;
            }
        }
    }
}

fn expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}

/// Target VU count `elapsed` into a ramp, interpolated linearly within each stage
pub fn ramp_target(start_vus: u32, stages: &[Stage], elapsed: Duration) -> Option<u32> {
    let mut from = start_vus as f64;
    let mut offset = Duration::ZERO;
    for stage in stages {
        let end = offset + stage.duration;
        if elapsed < end {
            let progress = if stage.duration.is_zero() {
                1.0
            } else {
                (elapsed - offset).as_secs_f64() / stage.duration.as_secs_f64()
            };
            let target = from + (stage.target as f64 - from) * progress;
            return Some(target.round() as u32);
        }
        from = stage.target as f64;
        offset = end;
    }
    None
}

/// Run one scenario to completion
pub async fn run_scenario<D>(
    driver: Arc<D>,
    tree: Arc<DescriptorTree>,
    scenario: Scenario,
    seed: u64,
) -> Result<ScenarioReport, Error>
where
    D: Driver + ?Sized + 'static,
{
    let scenario_seed = derive_seed(seed, &scenario.name);
    let vu = |index: u32| {
        VirtualUser::new(
            driver.clone(),
            &tree,
            &scenario,
            derive_seed(scenario_seed, &format!("vu{index}")),
        )
    };
    info!(
        scenario = %scenario.name,
        workload = %scenario.workload,
        executor = scenario.executor.label(),
        "starting scenario"
    );
    let started = Instant::now();
    let mut dropped = 0;

    let recorders = match scenario.executor.clone() {
        ExecutorConfig::SinglePass => {
            let mut user = vu(0)?;
            user.single_pass().await;
            vec![user.recorder]
        }
        ExecutorConfig::SharedIterations {
            vus,
            iterations,
            max_duration,
        } => {
            let deadline = max_duration.map(|d| started + d);
            let remaining = Arc::new(AtomicU64::new(iterations));
            let workers = (0..vus)
                .map(|i| {
                    let mut user = vu(i)?;
                    let remaining = remaining.clone();
                    Ok(async move {
                        while !expired(deadline)
                            && remaining
                                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
                                .is_ok()
                        {
                            if !user.iterate().await {
                                break;
                            }
                        }
                        user.recorder
                    })
                })
                .collect::<Result<Vec<_>, ConfigurationError>>()?;
            join_all(&scenario.name, workers).await?
        }
        ExecutorConfig::PerVuIterations {
            vus,
            iterations,
            max_duration,
        } => {
            let deadline = max_duration.map(|d| started + d);
            let workers = (0..vus)
                .map(|i| {
                    let mut user = vu(i)?;
                    Ok(async move {
                        for _ in 0..iterations {
                            if expired(deadline) || !user.iterate().await {
                                break;
                            }
                        }
                        user.recorder
                    })
                })
                .collect::<Result<Vec<_>, ConfigurationError>>()?;
            join_all(&scenario.name, workers).await?
        }
        ExecutorConfig::ConstantVus { vus, duration } => {
            let deadline = Some(started + duration);
            let workers = (0..vus)
                .map(|i| {
                    let mut user = vu(i)?;
                    Ok(async move {
                        while !expired(deadline) && user.iterate().await {}
                        user.recorder
                    })
                })
                .collect::<Result<Vec<_>, ConfigurationError>>()?;
            join_all(&scenario.name, workers).await?
        }
        ExecutorConfig::RampingVus { start_vus, stages } => {
            let max_vus = stages.iter().map(|s| s.target).chain([start_vus]).max().unwrap_or(0);
            let stages = Arc::new(stages);
            let workers = (0..max_vus)
                .map(|i| {
                    let mut user = vu(i)?;
                    let stages = stages.clone();
                    Ok(async move {
                        while let Some(target) = ramp_target(start_vus, &stages, started.elapsed()) {
                            if i < target {
                                if !user.iterate().await {
                                    break;
                                }
                            } else {
                                tokio::time::sleep(RAMP_POLL).await;
                            }
                        }
                        user.recorder
                    })
                })
                .collect::<Result<Vec<_>, ConfigurationError>>()?;
            join_all(&scenario.name, workers).await?
        }
        ExecutorConfig::ConstantArrivalRate {
            rate,
            time_unit,
            duration,
            pre_allocated_vus,
            max_vus,
        } => {
            let period = time_unit
                .checked_div(rate)
                .filter(|period| !period.is_zero())
                .ok_or_else(|| {
                    ConfigurationError::Invalid(format!(
                        "scenario `{}` asks for {rate} arrivals per {time_unit:?}",
                        scenario.name
                    ))
                })?;
            let deadline = started + duration;
            let vus = max_vus.unwrap_or(pre_allocated_vus).max(pre_allocated_vus);
            let (tx, rx) = mpsc::channel::<()>(vus as usize);
            let rx = Arc::new(tokio::sync::Mutex::new(rx));
            let workers = (0..vus)
                .map(|i| {
                    let mut user = vu(i)?;
                    let rx = rx.clone();
                    Ok(async move {
                        loop {
                            let next = rx.lock().await.recv().await;
                            // arrivals still queued at the deadline are not started
                            if next.is_none() || Instant::now() >= deadline || !user.iterate().await {
                                break;
                            }
                        }
                        user.recorder
                    })
                })
                .collect::<Result<Vec<_>, ConfigurationError>>()?;

            let ticker = async move {
                let mut dropped = 0u64;
                let mut interval = tokio::time::interval(period);
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    let tick = interval.tick().await;
                    if tick >= deadline {
                        break;
                    }
                    if tx.try_send(()).is_err() {
                        dropped += 1;
                    }
                }
                dropped
            };
            let (recorders, ticker_dropped) = tokio::join!(join_all(&scenario.name, workers), ticker);
            if ticker_dropped > 0 {
                warn!(scenario = %scenario.name, dropped = ticker_dropped, "not enough virtual users for the arrival rate");
            }
            dropped = ticker_dropped;
            recorders?
        }
    };

    let mut merged = Recorder::new();
    for recorder in recorders {
        merged.merge(recorder);
    }
    merged.dropped(dropped);
    let report = ScenarioReport::new(
        scenario.name.clone(),
        scenario.workload.clone(),
        scenario.executor.label(),
        scenario.exporter.clone(),
        merged,
        started.elapsed(),
    );
    info!(
        scenario = %scenario.name,
        iterations = report.iterations,
        errors = report.errors,
        "scenario finished"
    );
    Ok(report)
}

async fn join_all<F>(scenario: &str, workers: Vec<F>) -> Result<Vec<Recorder>, Error>
where
    F: Future<Output = Recorder> + Send + 'static,
{
    let mut set = JoinSet::new();
    for worker in workers {
        set.spawn(worker);
    }
    let mut recorders = Vec::new();
    while let Some(result) = set.join_next().await {
        match result {
            Ok(recorder) => recorders.push(recorder),
            Err(e) => {
                warn!("Virtual user panicked: {}", e);
                return Err(LifecycleError::Worker {
                    scenario: scenario.to_string(),
                    message: e.to_string(),
                }
                .into());
            }
        }
    }
    Ok(recorders)
}
