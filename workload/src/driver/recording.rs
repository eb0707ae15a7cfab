use super::{BoundQuery, BoundTransaction, Driver, InsertRequest, StepStatus};
use crate::error::DriverError;
use crate::model::InsertMethod;
use crate::value::Value;
use async_trait::async_trait;
use parking_lot::Mutex;

/// One call observed by [`RecordingDriver`]
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
    Query(BoundQuery),
    Transaction(BoundTransaction),
    Insert {
        name: String,
        table: String,
        method: InsertMethod,
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    },
    Notify {
        step: String,
        status: StepStatus,
    },
    Teardown,
}

#[derive(Debug, Default)]
struct Failures {
    /// Statements containing any of these fail
    sql: Vec<String>,
    notify: bool,
    teardown: bool,
    /// Stop inserting after this many rows
    insert_limit: Option<u64>,
}

/// Driver that keeps every call in memory, with optional injected failures
#[derive(Debug, Default)]
pub struct RecordingDriver {
    calls: Mutex<Vec<DriverCall>>,
    failures: Mutex<Failures>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every statement whose SQL contains `fragment`
    pub fn fail_sql(self, fragment: impl Into<String>) -> Self {
        self.failures.lock().sql.push(fragment.into());
        self
    }

    pub fn fail_notify(self) -> Self {
        self.failures.lock().notify = true;
        self
    }

    pub fn fail_teardown(self) -> Self {
        self.failures.lock().teardown = true;
        self
    }

    /// Report fewer rows than requested once `limit` rows went in
    pub fn limit_inserts(self, limit: u64) -> Self {
        self.failures.lock().insert_limit = Some(limit);
        self
    }

    pub fn calls(&self) -> Vec<DriverCall> {
        self.calls.lock().clone()
    }

    pub fn queries(&self) -> Vec<BoundQuery> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                DriverCall::Query(q) => Some(q.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn transactions(&self) -> Vec<BoundTransaction> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                DriverCall::Transaction(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    /// Rows inserted into `table`, in insertion order
    pub fn inserted_rows(&self, table: &str) -> Vec<Vec<Value>> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                DriverCall::Insert { table: t, rows, .. } if t == table => Some(rows.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn notifications(&self) -> Vec<(String, StepStatus)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                DriverCall::Notify { step, status } => Some((step.clone(), *status)),
                _ => None,
            })
            .collect()
    }

    fn check_sql(&self, sql: &str) -> Result<(), DriverError> {
        let failures = self.failures.lock();
        match failures.sql.iter().find(|f| sql.contains(f.as_str())) {
            Some(fragment) => Err(DriverError::Execute(format!("injected failure on `{fragment}`"))),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Driver for RecordingDriver {
    fn name(&self) -> &str {
        "recording"
    }

    async fn run_query(&self, query: &BoundQuery) -> Result<(), DriverError> {
        self.calls.lock().push(DriverCall::Query(query.clone()));
        self.check_sql(&query.sql)
    }

    async fn run_transaction(&self, transaction: &BoundTransaction) -> Result<(), DriverError> {
        self.calls
            .lock()
            .push(DriverCall::Transaction(transaction.clone()));
        transaction
            .queries
            .iter()
            .try_for_each(|q| self.check_sql(&q.sql))
    }

    async fn insert_values(&self, request: InsertRequest<'_>) -> Result<u64, DriverError> {
        let limit = self.failures.lock().insert_limit;
        let count = limit.map_or(request.count, |l| l.min(request.count));
        let mut rows = Vec::with_capacity(count as usize);
        for _ in 0..count {
            rows.push(request.rows.next_row()?);
        }
        self.calls.lock().push(DriverCall::Insert {
            name: request.name.to_string(),
            table: request.table.to_string(),
            method: request.method,
            columns: request.columns().to_vec(),
            rows,
        });
        Ok(count)
    }

    async fn notify_step(&self, step: &str, status: StepStatus) -> Result<(), DriverError> {
        self.calls.lock().push(DriverCall::Notify {
            step: step.to_string(),
            status,
        });
        if self.failures.lock().notify {
            return Err(DriverError::NotAvailable("notification endpoint".into()));
        }
        Ok(())
    }

    async fn teardown(&self) -> Result<(), DriverError> {
        self.calls.lock().push(DriverCall::Teardown);
        if self.failures.lock().teardown {
            return Err(DriverError::Execute("injected teardown failure".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_and_injects() {
        let driver = RecordingDriver::new().fail_sql("DROP");
        let ok = BoundQuery {
            name: "select".into(),
            sql: "SELECT 1".into(),
            args: vec![],
        };
        let bad = BoundQuery {
            name: "drop".into(),
            sql: "DROP TABLE t".into(),
            args: vec![],
        };
        driver.run_query(&ok).await.unwrap();
        assert!(driver.run_query(&bad).await.is_err());
        driver.notify_step("workload", StepStatus::Running).await.unwrap();

        assert_eq!(driver.queries(), [ok, bad]);
        assert_eq!(
            driver.notifications(),
            [("workload".to_string(), StepStatus::Running)]
        );
    }
}
