//! Driver contract between the orchestrator and a database client.

pub mod dry_run;
pub mod recording;

pub use dry_run::DryRunDriver;
pub use recording::{DriverCall, RecordingDriver};

use crate::error::DriverError;
use crate::generation::GeneratorSet;
use crate::model::{InsertMethod, IsolationLevel};
use crate::value::Value;
use async_trait::async_trait;
use strum::Display;

/// A statement ready to execute: positional SQL and one value per position
#[derive(Debug, Clone, PartialEq)]
pub struct BoundQuery {
    pub name: String,
    /// SQL with `$1..$n` placeholders
    pub sql: String,
    pub args: Vec<Value>,
}

/// Queries that must run atomically under one isolation level
#[derive(Debug, Clone, PartialEq)]
pub struct BoundTransaction {
    pub name: String,
    pub isolation: IsolationLevel,
    pub queries: Vec<BoundQuery>,
}

/// Bulk insert of `count` generated rows into `table`
#[derive(Debug)]
pub struct InsertRequest<'a> {
    pub name: &'a str,
    pub table: &'a str,
    pub method: InsertMethod,
    pub count: u64,
    /// Column order matches [`GeneratorSet::columns`]
    pub rows: &'a mut GeneratorSet,
}

impl InsertRequest<'_> {
    pub fn columns(&self) -> &[String] {
        self.rows.columns()
    }

    /// `INSERT` statement for the plain-query path
    pub fn plain_insert_sql(&self) -> String {
        let columns = self.rows.columns();
        let positions: Vec<String> = (1..=columns.len()).map(|i| format!("${i}")).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            columns.join(", "),
            positions.join(", ")
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    Running,
    Completed,
}

/// Database client used by every phase of a run
#[async_trait]
pub trait Driver: Send + Sync {
    /// Name used in logs and reports
    fn name(&self) -> &str;

    async fn run_query(&self, query: &BoundQuery) -> Result<(), DriverError>;

    /// Run every query in one transaction; a failure rolls the whole unit back
    async fn run_transaction(&self, transaction: &BoundTransaction) -> Result<(), DriverError>;

    /// Stream generated rows; returns the number of rows inserted
    async fn insert_values(&self, request: InsertRequest<'_>) -> Result<u64, DriverError>;

    /// Phase transition signal for drivers that track steps
    async fn notify_step(&self, _step: &str, _status: StepStatus) -> Result<(), DriverError> {
        Ok(())
    }

    async fn teardown(&self) -> Result<(), DriverError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::GenerationRule;
    use crate::model::Param;

    #[test]
    fn test_plain_insert_sql() {
        let mut set = GeneratorSet::new(
            &[
                Param::new("a", GenerationRule::int_const(1)),
                Param::new("b", GenerationRule::string_const("x")),
            ],
            &[],
            7,
        )
        .unwrap();
        let request = InsertRequest {
            name: "load_t",
            table: "t",
            method: InsertMethod::PlainQuery,
            count: 1,
            rows: &mut set,
        };
        assert_eq!(request.plain_insert_sql(), "INSERT INTO t (a, b) VALUES ($1, $2)");
        assert_eq!(StepStatus::Running.to_string(), "RUNNING");
    }
}
