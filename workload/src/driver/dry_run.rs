use super::{BoundQuery, BoundTransaction, Driver, InsertRequest, StepStatus};
use crate::config::DriverTunables;
use crate::error::DriverError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, trace};

/// Counters kept by [`DryRunDriver`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DryRunStats {
    pub queries: u64,
    pub transactions: u64,
    pub rows: u64,
}

/// Driver that logs every call and discards it.
///
/// An optional per-call latency makes executor timing visible without a
/// database.
#[derive(Debug, Default)]
pub struct DryRunDriver {
    latency: Option<Duration>,
    tunables: DriverTunables,
    queries: AtomicU64,
    transactions: AtomicU64,
    rows: AtomicU64,
}

impl DryRunDriver {
    pub fn new(tunables: DriverTunables) -> Self {
        Self {
            tunables,
            ..Default::default()
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = (!latency.is_zero()).then_some(latency);
        self
    }

    pub fn tunables(&self) -> &DriverTunables {
        &self.tunables
    }

    pub fn stats(&self) -> DryRunStats {
        DryRunStats {
            queries: self.queries.load(Ordering::Relaxed),
            transactions: self.transactions.load(Ordering::Relaxed),
            rows: self.rows.load(Ordering::Relaxed),
        }
    }

    async fn pause(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl Driver for DryRunDriver {
    fn name(&self) -> &str {
        "dry_run"
    }

    async fn run_query(&self, query: &BoundQuery) -> Result<(), DriverError> {
        trace!(query = %query.name, sql = %query.sql, args = ?query.args, "run query");
        self.pause().await;
        self.queries.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn run_transaction(&self, transaction: &BoundTransaction) -> Result<(), DriverError> {
        trace!(
            transaction = %transaction.name,
            isolation = %transaction.isolation,
            queries = transaction.queries.len(),
            "run transaction"
        );
        self.pause().await;
        self.transactions.fetch_add(1, Ordering::Relaxed);
        self.queries
            .fetch_add(transaction.queries.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    async fn insert_values(&self, request: InsertRequest<'_>) -> Result<u64, DriverError> {
        debug!(
            load = request.name,
            table = request.table,
            method = %request.method,
            rows = request.count,
            "insert values"
        );
        for _ in 0..request.count {
            request.rows.next_row()?;
        }
        self.pause().await;
        self.rows.fetch_add(request.count, Ordering::Relaxed);
        Ok(request.count)
    }

    async fn notify_step(&self, step: &str, status: StepStatus) -> Result<(), DriverError> {
        info!(step, %status, "step");
        Ok(())
    }

    async fn teardown(&self) -> Result<(), DriverError> {
        let stats = self.stats();
        info!(
            queries = stats.queries,
            transactions = stats.transactions,
            rows = stats.rows,
            "dry run finished"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{GenerationRule, GeneratorSet};
    use crate::model::{InsertMethod, Param};

    #[tokio::test]
    async fn test_counts_calls_and_drains_rows() {
        let driver = DryRunDriver::new(DriverTunables::default());
        let query = BoundQuery {
            name: "q".into(),
            sql: "SELECT 1".into(),
            args: vec![],
        };
        driver.run_query(&query).await.unwrap();

        let mut rows = GeneratorSet::new(&[Param::new("id", GenerationRule::sequential(1, 3).no_wrap())], &[], 1).unwrap();
        let inserted = driver
            .insert_values(InsertRequest {
                name: "load",
                table: "t",
                method: InsertMethod::CopyFrom,
                count: 3,
                rows: &mut rows,
            })
            .await
            .unwrap();
        assert_eq!(inserted, 3);
        assert_eq!(driver.stats(), DryRunStats { queries: 1, transactions: 0, rows: 3 });

        // the sequence is used up, so a fourth row fails
        let err = driver
            .insert_values(InsertRequest {
                name: "load",
                table: "t",
                method: InsertMethod::CopyFrom,
                count: 1,
                rows: &mut rows,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::Generation(_)));
    }
}
