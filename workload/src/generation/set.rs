use super::{GenerationRule, GroupGenerator, ParamGenerator};
use crate::error::{ConfigurationError, GenerationError};
use crate::model::{Group, Param};
use crate::value::Value;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy)]
enum Slot {
    Param(usize),
    Group { group: usize, member: usize },
}

/// How many rows a unique source can produce before failing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capacity {
    pub source: String,
    pub domain: u64,
    /// Innermost range size, for groups
    pub innermost: Option<u64>,
    pub unique: bool,
}

/// Generators for every column of one query, transaction or table load.
///
/// Columns are the plain params in declaration order followed by the members
/// of each group. Each call to [`GeneratorSet::next_row`] advances every
/// param once and every group by one tuple.
#[derive(Debug, Clone)]
pub struct GeneratorSet {
    columns: Vec<String>,
    slots: Vec<Slot>,
    params: Vec<ParamGenerator>,
    groups: Vec<GroupGenerator>,
}

impl GeneratorSet {
    pub fn new(params: &[Param], groups: &[Group], seed: u64) -> Result<Self, ConfigurationError> {
        let mut columns = Vec::new();
        let mut slots = Vec::new();
        let mut seen = HashSet::new();
        let mut claim = |name: &str| {
            if seen.insert(name.to_string()) {
                Ok(())
            } else {
                Err(ConfigurationError::malformed(format!(
                    "parameter `{name}` is declared twice"
                )))
            }
        };

        let mut param_generators = Vec::with_capacity(params.len());
        for param in params {
            param.rule.validate(&param.name)?;
            claim(&param.name)?;
            slots.push(Slot::Param(param_generators.len()));
            columns.push(param.name.clone());
            param_generators.push(ParamGenerator::new(&param.name, &param.rule, seed));
        }

        let mut group_generators = Vec::with_capacity(groups.len());
        for group in groups {
            let members: Vec<_> = group
                .params
                .iter()
                .map(|p| -> Result<(String, GenerationRule), ConfigurationError> {
                    p.rule.validate(&p.name)?;
                    claim(&p.name)?;
                    Ok((p.name.clone(), p.rule.clone()))
                })
                .collect::<Result<_, _>>()?;
            let index = group_generators.len();
            for (member, (name, _)) in members.iter().enumerate() {
                slots.push(Slot::Group {
                    group: index,
                    member,
                });
                columns.push(name.clone());
            }
            group_generators.push(GroupGenerator::new(&group.name, &members)?);
        }

        Ok(Self {
            columns,
            slots,
            params: param_generators,
            groups: group_generators,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn groups(&self) -> &[GroupGenerator] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Position of a column in the rows produced by this set
    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Finite sources promising uniqueness
    pub fn capacities(&self) -> Vec<Capacity> {
        let params = self.params.iter().filter_map(|p| {
            p.generator().unique_capacity().map(|domain| Capacity {
                source: p.name().to_string(),
                domain,
                innermost: None,
                unique: true,
            })
        });
        let groups = self.groups.iter().map(|g| Capacity {
            source: g.name().to_string(),
            domain: g.span(),
            innermost: Some(g.innermost_size()),
            unique: g.is_unique(),
        });
        params.chain(groups).collect()
    }

    pub fn next_row(&mut self) -> Result<Vec<Value>, GenerationError> {
        let tuples = self
            .groups
            .iter_mut()
            .map(GroupGenerator::next_tuple)
            .collect::<Result<Vec<_>, _>>()?;
        let mut params = Vec::with_capacity(self.params.len());
        for generator in &mut self.params {
            params.push(generator.next_value()?);
        }

        let row = self
            .slots
            .iter()
            .map(|slot| match *slot {
                Slot::Param(i) => params[i].clone(),
                Slot::Group { group, member } => tuples[group][member].clone(),
            })
            .collect();
        Ok(row)
    }
}
