use crate::driver::{BoundQuery, BoundTransaction, Driver};
use crate::error::{ConfigurationError, DriverError, ExecutionError, GenerationError};
use crate::generation::{derive_seed, GeneratorSet};
use crate::model::{ExecutableDescriptor, IsolationLevel, Query, Unit, UnitKind};
use crate::sql::to_positional;
use crate::value::Value;

/// Where the value for one positional argument comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    /// Column of the query's own row
    Local(usize),
    /// Column of the transaction row shared by every query
    Outer(usize),
}

#[derive(Debug, Clone)]
struct PreparedQuery {
    name: String,
    sql: String,
    sources: Vec<Source>,
    rows: GeneratorSet,
}

impl PreparedQuery {
    fn new(
        query: &Query,
        outer: Option<&GeneratorSet>,
        seed: u64,
    ) -> Result<Self, ConfigurationError> {
        let rows = GeneratorSet::new(&query.params, &query.groups, seed)?;
        let (sql, names) = to_positional(&query.sql);
        let sources = names
            .into_iter()
            .map(|name| {
                rows.position(&name)
                    .map(Source::Local)
                    .or_else(|| outer.and_then(|o| o.position(&name)).map(Source::Outer))
                    .ok_or_else(|| ConfigurationError::UnknownPlaceholder {
                        query: query.name.clone(),
                        placeholder: name,
                    })
            })
            .collect::<Result<_, _>>()?;
        Ok(Self {
            name: query.name.clone(),
            sql,
            sources,
            rows,
        })
    }

    fn bind(&mut self, outer: &[Value]) -> Result<BoundQuery, GenerationError> {
        let row = if self.rows.is_empty() {
            Vec::new()
        } else {
            self.rows.next_row()?
        };
        let args = self
            .sources
            .iter()
            .map(|source| match *source {
                Source::Local(i) => row[i].clone(),
                Source::Outer(i) => outer[i].clone(),
            })
            .collect();
        Ok(BoundQuery {
            name: self.name.clone(),
            sql: self.sql.clone(),
            args,
        })
    }
}

#[derive(Debug, Clone)]
enum Body {
    Query(PreparedQuery),
    Transaction {
        isolation: IsolationLevel,
        outer: GeneratorSet,
        queries: Vec<PreparedQuery>,
    },
}

/// A unit with its own generators, ready to be bound and executed repeatedly
#[derive(Debug, Clone)]
pub struct PreparedUnit {
    name: String,
    count: u64,
    body: Body,
}

/// Values sampled for one execution of a unit
#[derive(Debug, Clone, PartialEq)]
pub enum BoundUnit {
    Query(BoundQuery),
    Transaction(BoundTransaction),
}

impl PreparedUnit {
    /// Generators are seeded from `seed` and the unit and query names
    pub fn new(unit: &Unit, seed: u64) -> Result<Self, ConfigurationError> {
        let name = unit.name().to_string();
        let unit_seed = derive_seed(seed, &name);
        let body = match &unit.descriptor {
            ExecutableDescriptor::Query(query) => Body::Query(PreparedQuery::new(query, None, unit_seed)?),
            ExecutableDescriptor::Transaction(tx) => {
                let outer = GeneratorSet::new(&tx.params, &tx.groups, unit_seed)?;
                let queries = tx
                    .queries
                    .iter()
                    .map(|q| PreparedQuery::new(q, Some(&outer), derive_seed(unit_seed, &q.name)))
                    .collect::<Result<_, _>>()?;
                Body::Transaction {
                    isolation: tx.isolation,
                    outer,
                    queries,
                }
            }
        };
        Ok(Self {
            name,
            count: unit.count,
            body,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn kind(&self) -> UnitKind {
        match self.body {
            Body::Query(_) => UnitKind::Query,
            Body::Transaction { .. } => UnitKind::Transaction,
        }
    }

    /// Sample fresh values. Transaction params are drawn once and shared
    /// by all of its queries.
    pub fn bind(&mut self) -> Result<BoundUnit, GenerationError> {
        match &mut self.body {
            Body::Query(query) => query.bind(&[]).map(BoundUnit::Query),
            Body::Transaction {
                isolation,
                outer,
                queries,
            } => {
                let shared = if outer.is_empty() {
                    Vec::new()
                } else {
                    outer.next_row()?
                };
                let queries = queries
                    .iter_mut()
                    .map(|q| q.bind(&shared))
                    .collect::<Result<_, _>>()?;
                Ok(BoundUnit::Transaction(BoundTransaction {
                    name: self.name.clone(),
                    isolation: *isolation,
                    queries,
                }))
            }
        }
    }

    /// Bind and dispatch once; a transaction is a single driver call
    pub async fn execute<D: Driver + ?Sized>(&mut self, driver: &D) -> Result<(), ExecutionError> {
        let bound = self.bind().map_err(|e| ExecutionError {
            unit: self.name.clone(),
            source: DriverError::Generation(e),
        })?;
        let result = match &bound {
            BoundUnit::Query(query) => driver.run_query(query).await,
            BoundUnit::Transaction(tx) => driver.run_transaction(tx).await,
        };
        result.map_err(|source| ExecutionError {
            unit: self.name.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::RecordingDriver;
    use crate::generation::GenerationRule;
    use crate::model::{Group, Param, Transaction};

    #[test]
    fn test_query_binding() {
        let unit = Unit::query(
            1,
            Query::new("pay")
                .sql("UPDATE a SET b = b - :amount WHERE id = ${id} AND other = :id")
                .param("id", GenerationRule::int_const(7))
                .param("amount", GenerationRule::int_const(5)),
        );
        let mut prepared = PreparedUnit::new(&unit, 1).unwrap();
        let BoundUnit::Query(query) = prepared.bind().unwrap() else {
            panic!("expected a query");
        };
        assert_eq!(query.sql, "UPDATE a SET b = b - $1 WHERE id = $2 AND other = $2");
        assert_eq!(query.args, [Value::Int(5), Value::Int(7)]);
    }

    #[test]
    fn test_transaction_params_are_shared() {
        let unit = Unit::transaction(
            1,
            Transaction::new("order", IsolationLevel::Serializable)
                .group(Group::new(
                    "key",
                    vec![Param::new("w_id", GenerationRule::sequential(1, 100))],
                ))
                .query(Query::new("a").sql("SELECT :w_id"))
                .query(
                    Query::new("b")
                        .sql("SELECT :w_id, :n")
                        .param("n", GenerationRule::sequential(10, 20)),
                ),
        );
        let mut prepared = PreparedUnit::new(&unit, 1).unwrap();
        for expected in 1..=3 {
            let BoundUnit::Transaction(tx) = prepared.bind().unwrap() else {
                panic!("expected a transaction");
            };
            assert_eq!(tx.isolation, IsolationLevel::Serializable);
            assert_eq!(tx.queries[0].args, [Value::Int(expected)]);
            assert_eq!(tx.queries[1].args, [Value::Int(expected), Value::Int(expected + 9)]);
        }
    }

    #[test]
    fn test_unknown_placeholder() {
        let unit = Unit::query(1, Query::new("q").sql("SELECT :missing"));
        assert!(matches!(
            PreparedUnit::new(&unit, 1),
            Err(ConfigurationError::UnknownPlaceholder { .. })
        ));
    }

    #[tokio::test]
    async fn test_execute_maps_driver_errors() {
        let driver = RecordingDriver::new().fail_sql("boom");
        let unit = Unit::query(1, Query::new("q").sql("SELECT boom"));
        let mut prepared = PreparedUnit::new(&unit, 1).unwrap();
        let err = prepared.execute(&driver).await.unwrap_err();
        assert_eq!(err.unit, "q");
        assert!(matches!(err.source, DriverError::Execute(_)));
    }
}
