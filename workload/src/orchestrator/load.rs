use crate::driver::{Driver, InsertRequest};
use crate::error::{ConfigurationError, DriverError, LifecycleError};
use crate::generation::{derive_seed, GeneratorSet};
use crate::model::{InsertDescriptor, InsertMethod, RowCount};
use tracing::{info, warn};

/// A table load with its row count decided and generators built
#[derive(Debug)]
pub struct LoadPlan {
    pub name: String,
    pub table: String,
    pub method: InsertMethod,
    pub count: u64,
    rows: GeneratorSet,
}

impl LoadPlan {
    pub fn columns(&self) -> &[String] {
        self.rows.columns()
    }
}

/// Decide the row count and check it against every unique source.
///
/// A count above a unique domain is rejected here, before any row is
/// streamed. A count below a unique group's span truncates the walk in
/// nesting order; a non-unique group simply starts over.
pub fn plan_load(load: &InsertDescriptor, seed: u64) -> Result<LoadPlan, ConfigurationError> {
    if load.params.is_empty() && load.groups.is_empty() {
        return Err(ConfigurationError::Invalid(format!(
            "load `{}` has no columns",
            load.name
        )));
    }
    let rows = GeneratorSet::new(&load.params, &load.groups, derive_seed(seed, &load.name))?;
    let capacities = rows.capacities();

    let count = match load.rows {
        RowCount::Fixed(n) => n,
        RowCount::GroupSpan => capacities
            .iter()
            .find(|c| c.unique && c.innermost.is_some())
            .map(|c| c.domain)
            .ok_or_else(|| {
                ConfigurationError::Invalid(format!(
                    "load `{}` takes its row count from a unique group but has none",
                    load.name
                ))
            })?,
    };

    for capacity in &capacities {
        match capacity.innermost {
            _ if capacity.unique && count > capacity.domain => {
                return Err(ConfigurationError::RowCountExceedsDomain {
                    load: load.name.clone(),
                    source_name: capacity.source.clone(),
                    requested: count,
                    domain: capacity.domain,
                });
            }
            Some(innermost) if capacity.unique && count < capacity.domain && count % innermost != 0 => {
                warn!(
                    load = %load.name,
                    group = %capacity.source,
                    rows = count,
                    innermost,
                    "row count stops in the middle of the innermost range"
                );
            }
            Some(_) if !capacity.unique && count % capacity.domain != 0 => {
                warn!(
                    load = %load.name,
                    group = %capacity.source,
                    rows = count,
                    span = capacity.domain,
                    "row count is not a multiple of the group span, the last cycle is partial"
                );
            }
            _ => {}
        }
    }
    if count == 0 {
        warn!(load = %load.name, "load inserts no rows");
    }

    Ok(LoadPlan {
        name: load.name.clone(),
        table: load.table.clone(),
        method: load.method,
        count,
        rows,
    })
}

/// Stream the planned rows through the driver
pub async fn execute_load<D: Driver + ?Sized>(driver: &D, plan: &mut LoadPlan) -> Result<u64, LifecycleError> {
    info!(
        load = %plan.name,
        table = %plan.table,
        method = %plan.method,
        rows = plan.count,
        "loading"
    );
    let request = InsertRequest {
        name: &plan.name,
        table: &plan.table,
        method: plan.method,
        count: plan.count,
        rows: &mut plan.rows,
    };
    let inserted = driver.insert_values(request).await.map_err(|e| match e {
        DriverError::Generation(source) => LifecycleError::Generation {
            step: plan.name.clone(),
            source,
        },
        source => LifecycleError::Load {
            load: plan.name.clone(),
            source,
        },
    })?;
    if inserted != plan.count {
        return Err(LifecycleError::ShortLoad {
            load: plan.name.clone(),
            expected: plan.count,
            inserted,
        });
    }
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::RecordingDriver;
    use crate::generation::GenerationRule;
    use crate::model::{Group, Param};
    use crate::value::Value;

    fn districts(warehouses: i64, rows: RowCount) -> InsertDescriptor {
        InsertDescriptor::new("load_district", "district", InsertMethod::CopyFrom, rows)
            .group(Group::new(
                "district_pk",
                vec![
                    Param::new("d_w_id", GenerationRule::int_range(1, warehouses).unique()),
                    Param::new("d_id", GenerationRule::int_range(1, 10).unique()),
                ],
            ))
            .param("d_name", GenerationRule::string(6, 10))
    }

    #[test]
    fn test_group_span_count() {
        let plan = plan_load(&districts(2, RowCount::GroupSpan), 1).unwrap();
        assert_eq!(plan.count, 20);
        assert_eq!(plan.columns(), ["d_name", "d_w_id", "d_id"]);
    }

    #[test]
    fn test_count_above_domain_is_rejected() {
        let err = plan_load(&districts(2, RowCount::Fixed(21)), 1).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::RowCountExceedsDomain { requested: 21, domain: 20, .. }
        ));
    }

    #[test]
    fn test_smaller_count_truncates() {
        assert_eq!(plan_load(&districts(2, RowCount::Fixed(15)), 1).unwrap().count, 15);
    }

    #[test]
    fn test_group_span_needs_unique_group() {
        let load = InsertDescriptor::new("l", "t", InsertMethod::PlainQuery, RowCount::GroupSpan)
            .param("a", GenerationRule::int_range(1, 5));
        assert!(plan_load(&load, 1).is_err());
        let empty = InsertDescriptor::new("l", "t", InsertMethod::PlainQuery, RowCount::Fixed(1));
        assert!(plan_load(&empty, 1).is_err());
    }

    #[tokio::test]
    async fn test_execute_streams_rows() {
        let driver = RecordingDriver::new();
        let mut plan = plan_load(&districts(2, RowCount::GroupSpan), 1).unwrap();
        assert_eq!(execute_load(&driver, &mut plan).await.unwrap(), 20);
        let rows = driver.inserted_rows("district");
        assert_eq!(rows.len(), 20);
        assert_eq!(rows[0][1..], [Value::Int(1), Value::Int(1)]);
        assert_eq!(rows[10][1..], [Value::Int(2), Value::Int(1)]);
    }

    #[tokio::test]
    async fn test_short_load() {
        let driver = RecordingDriver::new().limit_inserts(5);
        let mut plan = plan_load(&districts(1, RowCount::GroupSpan), 1).unwrap();
        let err = execute_load(&driver, &mut plan).await.unwrap_err();
        assert!(matches!(err, LifecycleError::ShortLoad { expected: 10, inserted: 5, .. }));
    }

    #[tokio::test]
    async fn test_derived_varchar_key_loads_past_alphabet() {
        let table = crate::sql::ddl::find_table("CREATE TABLE item (code VARCHAR(20) PRIMARY KEY)", "item").unwrap();
        let rule = crate::sql::ddl::rule_for_column(&table.columns[0]).unwrap();
        assert!(rule.unique);
        let load = InsertDescriptor::new("load_item", "item", InsertMethod::CopyFrom, RowCount::Fixed(500))
            .param("code", rule);

        let driver = RecordingDriver::new();
        let mut plan = plan_load(&load, 1).unwrap();
        assert_eq!(execute_load(&driver, &mut plan).await.unwrap(), 500);
        let codes: std::collections::HashSet<_> = driver
            .inserted_rows("item")
            .into_iter()
            .map(|row| row[0].to_string())
            .collect();
        assert_eq!(codes.len(), 500);
    }
}
