//! Benchmark lifecycle.
//!
//! ```text
//! INIT -> CLEANUP -> CREATE_SCHEMA -> LOAD_DATA -> STEADY_STATE -> TEARDOWN -> DONE
//! ```
//!
//! Cleanup, notification and teardown failures are logged and the run goes
//! on. Schema and load failures are fatal and traffic never starts.
//! Steady-state failures are counted per iteration.

mod load;
mod plan;

pub use load::{execute_load, plan_load, LoadPlan};
pub use plan::RunPlan;

use crate::driver::{Driver, StepStatus};
use crate::error::{Error, LifecycleError, Result};
use crate::metrics::{LoadReport, PhaseOutcome, PhaseStatus, RunReport};
use crate::model::DescriptorTree;
use crate::runtime::{run_scenario, PreparedUnit};
use std::sync::Arc;
use std::time::Instant;
use strum::{Display, EnumString};
use tokio::task::JoinSet;
use tracing::{debug, info, info_span, warn, Instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    Cleanup,
    CreateSchema,
    LoadData,
    SteadyState,
    Teardown,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::Cleanup,
        Phase::CreateSchema,
        Phase::LoadData,
        Phase::SteadyState,
        Phase::Teardown,
    ];

    pub fn next(self) -> Option<Phase> {
        let index = Phase::ALL.iter().position(|p| *p == self)?;
        Phase::ALL.get(index + 1).copied()
    }

    /// Step name reported through [`Driver::notify_step`]
    pub fn step_name(self) -> Option<&'static str> {
        match self {
            Phase::CreateSchema => Some("create_schema"),
            Phase::LoadData => Some("load_data"),
            Phase::SteadyState => Some("workload"),
            Phase::Cleanup | Phase::Teardown => None,
        }
    }
}

/// Progress of one run through the phase list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BenchmarkRun {
    /// `None` before the first phase
    current: Option<Phase>,
    done: bool,
    /// Last status sent for the current step
    status: Option<StepStatus>,
}

impl BenchmarkRun {
    pub fn current(&self) -> Option<Phase> {
        self.current
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn status(&self) -> Option<StepStatus> {
        self.status
    }

    pub fn next_phase(&self) -> Option<Phase> {
        if self.done {
            return None;
        }
        match self.current {
            None => Some(Phase::Cleanup),
            Some(phase) => phase.next(),
        }
    }

    /// Move to `phase`, which must directly follow the current one
    pub fn advance(&mut self, phase: Phase) -> Result<(), LifecycleError> {
        if self.next_phase() != Some(phase) {
            return Err(LifecycleError::OutOfOrder {
                phase: phase.to_string(),
                current: self.current.map_or_else(|| "init".to_string(), |p| p.to_string()),
            });
        }
        self.current = Some(phase);
        self.status = None;
        Ok(())
    }

    fn finish(&mut self) {
        self.done = true;
    }
}

/// Drives a bound descriptor tree through every phase against one driver
pub struct Orchestrator<D: Driver + ?Sized + 'static> {
    driver: Arc<D>,
    tree: Arc<DescriptorTree>,
    plan: RunPlan,
    run: BenchmarkRun,
    report: RunReport,
}

impl<D: Driver + ?Sized + 'static> Orchestrator<D> {
    /// Validates the plan against the tree, including every unit the
    /// scenarios will prepare, before anything touches the driver.
    pub fn new(driver: Arc<D>, tree: DescriptorTree, plan: RunPlan) -> Result<Self> {
        tree.validate()?;
        plan.check(&tree)?;
        for name in plan.cleanup.iter().chain(&plan.schema) {
            for unit in tree.require_workload(name)?.units() {
                PreparedUnit::new(unit, plan.seed)?;
            }
        }
        for scenario in &plan.scenarios {
            for unit in tree.require_workload(&scenario.workload)?.units() {
                PreparedUnit::new(unit, plan.seed)?;
            }
        }
        let report = RunReport::new(plan.run_id.clone());
        Ok(Self {
            driver,
            tree: Arc::new(tree),
            plan,
            run: BenchmarkRun::default(),
            report,
        })
    }

    pub fn run_state(&self) -> &BenchmarkRun {
        &self.run
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    pub fn tree(&self) -> &Arc<DescriptorTree> {
        &self.tree
    }

    /// Run the next phase. Returns the phase that ran, or `None` once done.
    pub async fn step(&mut self) -> Result<Option<Phase>> {
        let Some(phase) = self.run.next_phase() else {
            return Ok(None);
        };
        self.run.advance(phase)?;
        let started = Instant::now();
        let span = info_span!("phase", name = %phase);
        let outcome = match phase {
            Phase::Cleanup => Ok(self.cleanup().instrument(span).await),
            Phase::CreateSchema => self.create_schema().instrument(span).await.map(|_| PhaseStatus::Completed),
            Phase::LoadData => self.load_data().instrument(span).await.map(|_| PhaseStatus::Completed),
            Phase::SteadyState => self.steady_state().instrument(span).await.map(|_| PhaseStatus::Completed),
            Phase::Teardown => Ok(self.teardown().instrument(span).await),
        };
        let status = match &outcome {
            Ok(status) => status.clone(),
            Err(e) => PhaseStatus::Failed(e.to_string()),
        };
        self.report.phases.push(PhaseOutcome {
            phase,
            status,
            duration: started.elapsed(),
        });
        if phase == Phase::Teardown {
            self.run.finish();
        }
        outcome.map(|_| Some(phase))
    }

    /// Run every remaining phase. A fatal error still runs teardown before
    /// it is returned.
    pub async fn run(mut self) -> Result<RunReport> {
        info!(run_id = %self.plan.run_id, driver = self.driver.name(), "starting run");
        loop {
            match self.step().await {
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(e) => {
                    if !self.run.is_done() {
                        let status = self.teardown().await;
                        debug!(?status, "teardown after failure");
                        self.run.finish();
                    }
                    return Err(e);
                }
            }
        }
        info!(
            run_id = %self.plan.run_id,
            iterations = self.report.total_iterations(),
            errors = self.report.total_errors(),
            "run finished"
        );
        Ok(self.report)
    }

    async fn notify(&mut self, phase: Phase, status: StepStatus) {
        let Some(step) = phase.step_name() else {
            return;
        };
        self.run.status = Some(status);
        if let Err(e) = self.driver.notify_step(step, status).await {
            warn!(step, %status, error = %e, "step notification failed");
        }
    }

    async fn cleanup(&mut self) -> PhaseStatus {
        let mut failures = Vec::new();
        for name in &self.plan.cleanup {
            let Some(workload) = self.tree.get_workload(name) else {
                continue;
            };
            for unit in workload.units() {
                let result = match PreparedUnit::new(unit, self.plan.seed) {
                    Ok(mut prepared) => {
                        let mut result = Ok(());
                        for _ in 0..unit.count {
                            result = prepared.execute(self.driver.as_ref()).await.map_err(Error::from);
                            if result.is_err() {
                                break;
                            }
                        }
                        result
                    }
                    Err(e) => Err(e.into()),
                };
                if let Err(e) = result {
                    warn!(workload = %name, unit = unit.name(), error = %e, "cleanup failed, continuing");
                    failures.push(e.to_string());
                }
            }
        }
        if failures.is_empty() {
            PhaseStatus::Completed
        } else {
            PhaseStatus::Degraded(failures.join("; "))
        }
    }

    async fn create_schema(&mut self) -> Result<()> {
        self.notify(Phase::CreateSchema, StepStatus::Running).await;
        let tree = self.tree.clone();
        for name in &self.plan.schema {
            let workload = tree.require_workload(name)?;
            for unit in workload.units() {
                let mut prepared = PreparedUnit::new(unit, self.plan.seed)?;
                for _ in 0..unit.count {
                    prepared.execute(self.driver.as_ref()).await.map_err(|e| LifecycleError::Schema {
                        step: name.clone(),
                        unit: e.unit,
                        source: e.source,
                    })?;
                }
                debug!(workload = %name, unit = unit.name(), "schema unit done");
            }
        }
        self.notify(Phase::CreateSchema, StepStatus::Completed).await;
        Ok(())
    }

    async fn load_data(&mut self) -> Result<()> {
        if !self.plan.load_data {
            return Ok(());
        }
        self.notify(Phase::LoadData, StepStatus::Running).await;
        let tree = self.tree.clone();
        // plan every load up front so a bad row count fails before any insert
        let mut plans = tree
            .loads
            .iter()
            .map(|load| plan_load(load, self.plan.seed))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for plan in &mut plans {
            let started = Instant::now();
            let rows = execute_load(self.driver.as_ref(), plan).await?;
            self.report.loads.push(LoadReport {
                load: plan.name.clone(),
                table: plan.table.clone(),
                rows,
                duration: started.elapsed(),
            });
        }
        self.notify(Phase::LoadData, StepStatus::Completed).await;
        Ok(())
    }

    async fn steady_state(&mut self) -> Result<()> {
        self.notify(Phase::SteadyState, StepStatus::Running).await;
        let mut set = JoinSet::new();
        for (index, scenario) in self.plan.scenarios.iter().cloned().enumerate() {
            let driver = self.driver.clone();
            let tree = self.tree.clone();
            let seed = self.plan.seed;
            set.spawn(async move { (index, run_scenario(driver, tree, scenario, seed).await) });
        }
        let mut reports = Vec::with_capacity(self.plan.scenarios.len());
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, Ok(report))) => reports.push((index, report)),
                Ok((_, Err(e))) => return Err(e),
                Err(e) => {
                    return Err(LifecycleError::Worker {
                        scenario: "steady_state".into(),
                        message: e.to_string(),
                    }
                    .into())
                }
            }
        }
        reports.sort_by_key(|(index, _)| *index);
        self.report
            .scenarios
            .extend(reports.into_iter().map(|(_, report)| report));
        self.notify(Phase::SteadyState, StepStatus::Completed).await;
        Ok(())
    }

    async fn teardown(&mut self) -> PhaseStatus {
        match self.driver.teardown().await {
            Ok(()) => PhaseStatus::Completed,
            Err(e) => {
                warn!(error = %e, "teardown failed");
                PhaseStatus::Degraded(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order() {
        assert_eq!(Phase::Cleanup.next(), Some(Phase::CreateSchema));
        assert_eq!(Phase::SteadyState.next(), Some(Phase::Teardown));
        assert_eq!(Phase::Teardown.next(), None);
        assert_eq!(Phase::LoadData.to_string(), "load_data");
    }

    #[test]
    fn test_run_rejects_skipping() {
        let mut run = BenchmarkRun::default();
        assert_eq!(run.next_phase(), Some(Phase::Cleanup));
        let err = run.advance(Phase::LoadData).unwrap_err();
        assert_eq!(err.to_string(), "phase load_data cannot run after init");
        run.advance(Phase::Cleanup).unwrap();
        run.advance(Phase::CreateSchema).unwrap();
        assert_eq!(run.current(), Some(Phase::CreateSchema));
    }
}
