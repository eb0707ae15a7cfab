//! Workload descriptor model.
//!
//! A [`DescriptorTree`] is built once, bound against SQL by
//! [`crate::sql::bind_and_derive`], and then shared read-only by every
//! phase of a run.

mod tree;

pub use tree::DescriptorTree;

use crate::generation::GenerationRule;
use strum::{Display, EnumString};

/// Named generated value referenced by SQL placeholders
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub rule: GenerationRule,
}

impl Param {
    pub fn new(name: impl Into<String>, rule: GenerationRule) -> Self {
        Self {
            name: name.into(),
            rule,
        }
    }
}

/// Params whose generators advance together, outermost first
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub name: String,
    pub params: Vec<Param>,
}

impl Group {
    pub fn new(name: impl Into<String>, params: Vec<Param>) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub name: String,
    /// Empty until bound from a script
    pub sql: String,
    pub params: Vec<Param>,
    pub groups: Vec<Group>,
}

impl Query {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql: String::new(),
            params: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = sql.into();
        self
    }

    pub fn param(mut self, name: impl Into<String>, rule: GenerationRule) -> Self {
        self.params.push(Param::new(name, rule));
        self
    }

    pub fn group(mut self, group: Group) -> Self {
        self.groups.push(group);
        self
    }

    /// Whether `name` is produced by this query's own generators
    pub fn declares(&self, name: &str) -> bool {
        declares(&self.params, &self.groups, name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(ascii_case_insensitive, serialize_all = "snake_case")]
pub enum IsolationLevel {
    /// Use whatever the driver defaults to
    #[default]
    Unspecified,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub name: String,
    pub isolation: IsolationLevel,
    pub queries: Vec<Query>,
    /// Sampled once per execution and visible to every query
    pub params: Vec<Param>,
    pub groups: Vec<Group>,
}

impl Transaction {
    pub fn new(name: impl Into<String>, isolation: IsolationLevel) -> Self {
        Self {
            name: name.into(),
            isolation,
            queries: Vec::new(),
            params: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn query(mut self, query: Query) -> Self {
        self.queries.push(query);
        self
    }

    pub fn param(mut self, name: impl Into<String>, rule: GenerationRule) -> Self {
        self.params.push(Param::new(name, rule));
        self
    }

    pub fn group(mut self, group: Group) -> Self {
        self.groups.push(group);
        self
    }

    pub fn declares(&self, name: &str) -> bool {
        declares(&self.params, &self.groups, name)
    }
}

fn declares(params: &[Param], groups: &[Group], name: &str) -> bool {
    params.iter().any(|p| p.name == name)
        || groups
            .iter()
            .any(|g| g.params.iter().any(|p| p.name == name))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive, serialize_all = "snake_case")]
pub enum UnitKind {
    Query,
    Transaction,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutableDescriptor {
    Query(Query),
    Transaction(Transaction),
}

impl ExecutableDescriptor {
    pub fn name(&self) -> &str {
        match self {
            ExecutableDescriptor::Query(q) => &q.name,
            ExecutableDescriptor::Transaction(t) => &t.name,
        }
    }

    pub fn kind(&self) -> UnitKind {
        match self {
            ExecutableDescriptor::Query(_) => UnitKind::Query,
            ExecutableDescriptor::Transaction(_) => UnitKind::Transaction,
        }
    }

    /// Every query, in execution order
    pub fn queries(&self) -> impl Iterator<Item = &Query> {
        let queries: &[Query] = match self {
            ExecutableDescriptor::Query(q) => std::slice::from_ref(q),
            ExecutableDescriptor::Transaction(t) => &t.queries,
        };
        queries.iter()
    }

    pub(crate) fn queries_mut(&mut self) -> impl Iterator<Item = &mut Query> {
        let queries: &mut [Query] = match self {
            ExecutableDescriptor::Query(q) => std::slice::from_mut(q),
            ExecutableDescriptor::Transaction(t) => &mut t.queries,
        };
        queries.iter_mut()
    }
}

/// One executable item with its repetition count
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub count: u64,
    pub descriptor: ExecutableDescriptor,
}

impl Unit {
    pub fn query(count: u64, query: Query) -> Self {
        Self {
            count,
            descriptor: ExecutableDescriptor::Query(query),
        }
    }

    pub fn transaction(count: u64, transaction: Transaction) -> Self {
        Self {
            count,
            descriptor: ExecutableDescriptor::Transaction(transaction),
        }
    }

    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn kind(&self) -> UnitKind {
        self.descriptor.kind()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadDescriptor {
    pub name: String,
    pub units: Vec<Unit>,
}

impl WorkloadDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            units: Vec::new(),
        }
    }

    pub fn unit(mut self, unit: Unit) -> Self {
        self.units.push(unit);
        self
    }

    /// Units in declaration order, which is also execution order
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter()
    }
}

/// Bulk insertion path; chosen explicitly, never detected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive, serialize_all = "snake_case")]
pub enum InsertMethod {
    /// One parameterized `INSERT` per row
    PlainQuery,
    /// Driver bulk path such as `COPY FROM`
    CopyFrom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowCount {
    Fixed(u64),
    /// As many rows as the unique group can produce
    GroupSpan,
}

/// Table load consumed by the data-load phase
#[derive(Debug, Clone, PartialEq)]
pub struct InsertDescriptor {
    pub name: String,
    pub table: String,
    pub method: InsertMethod,
    pub params: Vec<Param>,
    pub groups: Vec<Group>,
    pub rows: RowCount,
    /// Fill columns without an explicit param from the table's DDL
    pub derive_from_ddl: bool,
}

impl InsertDescriptor {
    pub fn new(name: impl Into<String>, table: impl Into<String>, method: InsertMethod, rows: RowCount) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            method,
            params: Vec::new(),
            groups: Vec::new(),
            rows,
            derive_from_ddl: false,
        }
    }

    pub fn param(mut self, name: impl Into<String>, rule: GenerationRule) -> Self {
        self.params.push(Param::new(name, rule));
        self
    }

    pub fn group(mut self, group: Group) -> Self {
        self.groups.push(group);
        self
    }

    pub fn derive_from_ddl(mut self) -> Self {
        self.derive_from_ddl = true;
        self
    }

    pub fn declares(&self, name: &str) -> bool {
        declares(&self.params, &self.groups, name)
    }
}
