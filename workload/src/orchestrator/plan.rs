use crate::config::{RunConfig, StepPhase, DEFAULT_EXPORTER};
use crate::error::ConfigurationError;
use crate::model::DescriptorTree;
use crate::runtime::Scenario;

/// Which workloads run in which phase of a run
#[derive(Debug, Clone, PartialEq)]
pub struct RunPlan {
    pub run_id: String,
    pub seed: u64,
    /// Best-effort workloads run before the schema is created
    pub cleanup: Vec<String>,
    pub schema: Vec<String>,
    pub load_data: bool,
    pub scenarios: Vec<Scenario>,
}

impl RunPlan {
    pub fn new(run_id: impl Into<String>, seed: u64) -> Self {
        Self {
            run_id: run_id.into(),
            seed,
            cleanup: Vec::new(),
            schema: Vec::new(),
            load_data: false,
            scenarios: Vec::new(),
        }
    }

    pub fn cleanup(mut self, workload: impl Into<String>) -> Self {
        self.cleanup.push(workload.into());
        self
    }

    pub fn schema(mut self, workload: impl Into<String>) -> Self {
        self.schema.push(workload.into());
        self
    }

    pub fn load_data(mut self) -> Self {
        self.load_data = true;
        self
    }

    pub fn scenario(mut self, scenario: Scenario) -> Self {
        self.scenarios.push(scenario);
        self
    }

    /// Translate the ordered steps of a config file
    pub fn from_config(config: &RunConfig) -> Result<Self, ConfigurationError> {
        config.check()?;
        let mut plan = Self::new(config.run_id.clone(), config.seed);
        for step in &config.steps {
            let workload = || {
                step.workload
                    .clone()
                    .ok_or_else(|| ConfigurationError::Invalid(format!("step `{}` needs a workload", step.name)))
            };
            match step.phase {
                StepPhase::Cleanup => plan.cleanup.push(workload()?),
                StepPhase::CreateSchema => plan.schema.push(workload()?),
                StepPhase::LoadData => plan.load_data = true,
                StepPhase::Workload => {
                    let executor = step
                        .executor
                        .as_deref()
                        .and_then(|name| config.executors.get(name))
                        .ok_or_else(|| ConfigurationError::not_found("executor", step.executor.clone().unwrap_or_default()))?;
                    let mut scenario = Scenario::new(step.name.clone(), workload()?, executor.clone())
                        .exporter(step.exporter.as_deref().unwrap_or(DEFAULT_EXPORTER));
                    scenario.unit = step.unit.clone();
                    plan.scenarios.push(scenario);
                }
            }
        }
        Ok(plan)
    }

    /// Every referenced workload and pinned unit must exist in `tree`
    pub fn check(&self, tree: &DescriptorTree) -> Result<(), ConfigurationError> {
        for workload in self.cleanup.iter().chain(&self.schema) {
            tree.require_workload(workload)?;
        }
        for scenario in &self.scenarios {
            tree.require_workload(&scenario.workload)?;
            if let Some(unit) = &scenario.unit {
                tree.find_unit(&scenario.workload, unit)?;
            }
        }
        if self.load_data && tree.loads.is_empty() {
            return Err(ConfigurationError::Invalid(
                "a load_data step is configured but the benchmark has no loads".into(),
            ));
        }
        Ok(())
    }
}
