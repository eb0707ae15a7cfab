use super::{Enumeration, GenerationRule};
use crate::error::{ConfigurationError, GenerationError};
use crate::value::Value;

/// Walks the Cartesian product of its members' domains.
///
/// Members are ordered outermost first: the first member changes slowest and
/// the last one fastest, like nested loops. After `span()` tuples the walk
/// starts over, unless the group is unique, in which case it fails.
#[derive(Debug, Clone)]
pub struct GroupGenerator {
    name: String,
    members: Vec<(String, Enumeration)>,
    counters: Vec<u64>,
    span: u64,
    unique: bool,
    wrapped: bool,
}

impl GroupGenerator {
    pub fn new(name: &str, members: &[(String, GenerationRule)]) -> Result<Self, ConfigurationError> {
        if members.is_empty() {
            return Err(ConfigurationError::malformed(format!(
                "group `{name}` has no members"
            )));
        }
        let mut domains = Vec::with_capacity(members.len());
        let mut span: u64 = 1;
        for (param, rule) in members {
            let domain = Enumeration::of(rule).ok_or_else(|| ConfigurationError::NotEnumerable {
                group: name.to_string(),
                param: param.clone(),
            })?;
            span = span.checked_mul(domain.size()).ok_or_else(|| {
                ConfigurationError::malformed(format!("group `{name}` span overflows u64"))
            })?;
            domains.push((param.clone(), domain));
        }
        Ok(Self {
            name: name.to_string(),
            counters: vec![0; domains.len()],
            members: domains,
            span,
            unique: members.iter().any(|(_, rule)| rule.unique),
            wrapped: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn member_names(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|(name, _)| name.as_str())
    }

    /// Number of distinct tuples, the product of member range sizes
    pub fn span(&self) -> u64 {
        self.span
    }

    /// Range size of the fastest-changing member
    pub fn innermost_size(&self) -> u64 {
        self.members.last().map_or(1, |(_, d)| d.size())
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn next_tuple(&mut self) -> Result<Vec<Value>, GenerationError> {
        if self.wrapped {
            if self.unique {
                return Err(GenerationError::InsufficientDomain {
                    generator: self.name.clone(),
                    domain: self.span,
                });
            }
            self.wrapped = false;
        }

        let tuple = self
            .members
            .iter()
            .zip(&self.counters)
            .map(|((_, domain), &index)| domain.value_at(index))
            .collect();

        // odometer increment, innermost first
        let mut carry = true;
        for (counter, (_, domain)) in self.counters.iter_mut().zip(&self.members).rev() {
            *counter += 1;
            if *counter < domain.size() {
                carry = false;
                break;
            }
            *counter = 0;
        }
        self.wrapped = carry;

        Ok(tuple)
    }
}
