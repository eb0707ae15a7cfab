use super::{InsertDescriptor, Query, Unit, UnitKind, WorkloadDescriptor};
use crate::error::ConfigurationError;
use std::collections::HashSet;

/// Every workload and table load of one benchmark
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescriptorTree {
    pub workloads: Vec<WorkloadDescriptor>,
    pub loads: Vec<InsertDescriptor>,
}

impl DescriptorTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn workload(mut self, workload: WorkloadDescriptor) -> Self {
        self.workloads.push(workload);
        self
    }

    pub fn load(mut self, load: InsertDescriptor) -> Self {
        self.loads.push(load);
        self
    }

    pub fn get_workload(&self, name: &str) -> Option<&WorkloadDescriptor> {
        self.workloads.iter().find(|w| w.name == name)
    }

    pub fn require_workload(&self, name: &str) -> Result<&WorkloadDescriptor, ConfigurationError> {
        self.get_workload(name)
            .ok_or_else(|| ConfigurationError::not_found("workload", name))
    }

    pub fn get_load(&self, name: &str) -> Option<&InsertDescriptor> {
        self.loads.iter().find(|l| l.name == name)
    }

    pub fn lookup_unit(&self, workload: &str, kind: UnitKind, unit: &str) -> Result<&Unit, ConfigurationError> {
        self.require_workload(workload)?
            .units
            .iter()
            .find(|u| u.kind() == kind && u.name() == unit)
            .ok_or_else(|| ConfigurationError::not_found("unit", format!("{workload}/{kind}/{unit}")))
    }

    pub(crate) fn lookup_unit_mut(
        &mut self,
        workload: &str,
        kind: UnitKind,
        unit: &str,
    ) -> Result<&mut Unit, ConfigurationError> {
        self.workloads
            .iter_mut()
            .find(|w| w.name == workload)
            .ok_or_else(|| ConfigurationError::not_found("workload", workload))?
            .units
            .iter_mut()
            .find(|u| u.kind() == kind && u.name() == unit)
            .ok_or_else(|| ConfigurationError::not_found("unit", format!("{workload}/{kind}/{unit}")))
    }

    /// Find a query inside a unit, either the unit itself or one of its transaction queries
    pub fn lookup_query(&self, workload: &str, unit: &str, query: &str) -> Result<&Query, ConfigurationError> {
        self.require_workload(workload)?
            .units
            .iter()
            .filter(|u| u.name() == unit)
            .flat_map(|u| u.descriptor.queries())
            .find(|q| q.name == query)
            .ok_or_else(|| ConfigurationError::not_found("query", format!("{workload}/{unit}/{query}")))
    }

    /// Any unit by name, regardless of kind
    pub fn find_unit(&self, workload: &str, unit: &str) -> Result<&Unit, ConfigurationError> {
        self.require_workload(workload)?
            .units
            .iter()
            .find(|u| u.name() == unit)
            .ok_or_else(|| ConfigurationError::not_found("unit", format!("{workload}/{unit}")))
    }

    /// Reject duplicate names that would make lookups ambiguous
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let mut workloads = HashSet::new();
        for workload in &self.workloads {
            if !workloads.insert(workload.name.as_str()) {
                return Err(ConfigurationError::malformed(format!(
                    "workload `{}` is declared twice",
                    workload.name
                )));
            }
            let mut units = HashSet::new();
            for unit in &workload.units {
                if !units.insert(unit.name()) {
                    return Err(ConfigurationError::malformed(format!(
                        "unit `{}` is declared twice in workload `{}`",
                        unit.name(),
                        workload.name
                    )));
                }
            }
        }
        let mut loads = HashSet::new();
        for load in &self.loads {
            if !loads.insert(load.name.as_str()) {
                return Err(ConfigurationError::malformed(format!(
                    "load `{}` is declared twice",
                    load.name
                )));
            }
        }
        Ok(())
    }
}
