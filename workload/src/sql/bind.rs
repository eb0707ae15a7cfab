use super::{ddl, hints, placeholders, script, ParsedScript};
use crate::error::ConfigurationError;
use crate::model::{DescriptorTree, ExecutableDescriptor, Param, Query, UnitKind};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Inputs for the initialization pass besides the script itself
#[derive(Debug, Clone)]
pub struct BindOptions {
    /// Workload whose statements hold the `CREATE TABLE`s
    pub schema_workload: String,
    /// workload -> unit -> repetition count
    pub unit_counts: BTreeMap<String, BTreeMap<String, u64>>,
}

impl Default for BindOptions {
    fn default() -> Self {
        Self {
            schema_workload: "create_schema".to_string(),
            unit_counts: BTreeMap::new(),
        }
    }
}

/// Fill every empty query SQL with the statement of the same name.
///
/// The section named after the workload is searched first, then every
/// section in script order. Queries that already carry SQL are left alone,
/// so binding twice yields the same tree.
pub fn bind_sql(tree: &DescriptorTree, parsed: &ParsedScript) -> Result<DescriptorTree, ConfigurationError> {
    let mut bound = tree.clone();
    for workload in &mut bound.workloads {
        for unit in &mut workload.units {
            for query in unit.descriptor.queries_mut() {
                if !query.sql.trim().is_empty() {
                    continue;
                }
                let statement = parsed
                    .find(&workload.name, &query.name)
                    .or_else(|| parsed.find_any(&query.name))
                    .ok_or_else(|| ConfigurationError::UnresolvedReference {
                        workload: workload.name.clone(),
                        query: query.name.clone(),
                    })?;
                debug!(workload = %workload.name, query = %query.name, line = statement.line, "bound SQL");
                query.sql = statement.sql.clone();
            }
        }
    }
    Ok(bound)
}

/// One param per column of `table`, derived from its `CREATE TABLE` in `schema_workload`.
///
/// Inline hints written inside the DDL text, for example in a trailing
/// comment `-- ${c_id{1:3000}}`, override the type-based default.
pub fn derive_params_from_ddl(
    tree: &DescriptorTree,
    schema_workload: &str,
    table: &str,
) -> Result<Vec<Param>, ConfigurationError> {
    let workload = tree.require_workload(schema_workload)?;
    let (definition, sql) = workload
        .units()
        .flat_map(|u| u.descriptor.queries())
        .find_map(|q| ddl::find_table(&q.sql, table).map(|t| (t, q.sql.as_str())))
        .ok_or_else(|| ConfigurationError::not_found("table", format!("{schema_workload}/{table}")))?;

    let inline = hints::extract_inline_hints(sql)?;
    let mut params = Vec::with_capacity(definition.columns.len());
    for column in &definition.columns {
        let Some(mut rule) = ddl::rule_for_column(column) else {
            continue;
        };
        if let Some(hint) = inline.iter().find(|h| h.param == column.name) {
            rule = hint.apply(&rule)?;
        }
        params.push(Param::new(column.name.clone(), rule));
    }
    Ok(params)
}

/// Replace hint markers with derived params in every query of the tree
pub fn apply_inline_hints(tree: &DescriptorTree) -> Result<DescriptorTree, ConfigurationError> {
    let mut out = tree.clone();
    for workload in &mut out.workloads {
        for unit in &mut workload.units {
            match &mut unit.descriptor {
                ExecutableDescriptor::Query(query) => apply_query_hints(query, None)?,
                ExecutableDescriptor::Transaction(tx) => {
                    let mut outer = std::mem::take(&mut tx.params);
                    for query in &mut tx.queries {
                        apply_query_hints(query, Some(&mut outer))?;
                    }
                    tx.params = outer;
                }
            }
        }
    }
    Ok(out)
}

fn apply_query_hints(query: &mut Query, mut outer: Option<&mut Vec<Param>>) -> Result<(), ConfigurationError> {
    // hints inside DDL belong to the derived load params
    if !ddl::create_tables(&query.sql).is_empty() {
        return Ok(());
    }
    let found = hints::extract_inline_hints(&query.sql)?;
    if found.is_empty() {
        return Ok(());
    }
    for hint in &found {
        let derived = hint.derived_name();
        if query.declares(&derived) || outer.as_deref().is_some_and(|o| o.iter().any(|p| p.name == derived)) {
            continue;
        }
        if let Some(base) = query.params.iter().find(|p| p.name == hint.param) {
            let rule = hint.apply(&base.rule)?;
            query.params.push(Param::new(derived, rule));
        } else if let Some(outer) = outer.as_deref_mut() {
            let base = outer
                .iter()
                .find(|p| p.name == hint.param)
                .ok_or_else(|| ConfigurationError::UnknownPlaceholder {
                    query: query.name.clone(),
                    placeholder: hint.param.clone(),
                })?;
            let rule = hint.apply(&base.rule)?;
            outer.push(Param::new(derived, rule));
        } else {
            return Err(ConfigurationError::UnknownPlaceholder {
                query: query.name.clone(),
                placeholder: hint.param.clone(),
            });
        }
    }
    query.sql = hints::rewrite_hints(&query.sql, &found);
    Ok(())
}

/// Every placeholder must be produced by the query or its transaction
pub fn check_placeholders(tree: &DescriptorTree) -> Result<(), ConfigurationError> {
    for workload in &tree.workloads {
        for unit in &workload.units {
            for query in unit.descriptor.queries() {
                for name in placeholders::names(&query.sql) {
                    let outer = match &unit.descriptor {
                        ExecutableDescriptor::Transaction(tx) => tx.declares(&name),
                        ExecutableDescriptor::Query(_) => false,
                    };
                    if !query.declares(&name) && !outer {
                        return Err(ConfigurationError::UnknownPlaceholder {
                            query: query.name.clone(),
                            placeholder: name,
                        });
                    }
                }
            }
        }
    }
    Ok(())
}

/// Fill load params from the DDL for loads that ask for it.
///
/// Explicit params and group members win over derived ones. The result
/// follows the table's column order, with explicit params that are not
/// columns appended at the end.
fn derive_load_params(tree: &DescriptorTree, schema_workload: &str) -> Result<DescriptorTree, ConfigurationError> {
    let mut out = tree.clone();
    for load in out.loads.iter_mut().filter(|l| l.derive_from_ddl) {
        let derived = derive_params_from_ddl(tree, schema_workload, &load.table)?;
        let mut explicit = std::mem::take(&mut load.params);
        let mut params = Vec::with_capacity(derived.len());
        for column in derived {
            if let Some(at) = explicit.iter().position(|p| p.name == column.name) {
                params.push(explicit.remove(at));
            } else if !load.groups.iter().any(|g| g.params.iter().any(|p| p.name == column.name)) {
                params.push(column);
            }
        }
        params.extend(explicit);
        load.params = params;
    }
    Ok(out)
}

fn apply_unit_counts(
    tree: &mut DescriptorTree,
    counts: &BTreeMap<String, BTreeMap<String, u64>>,
) -> Result<(), ConfigurationError> {
    for (workload, units) in counts {
        for (unit, count) in units {
            let kind = tree.find_unit(workload, unit)?.kind();
            tree.lookup_unit_mut(workload, kind, unit)?.count = *count;
        }
    }
    Ok(())
}

/// Second half of descriptor construction: bind SQL, derive params, apply
/// hints and count overrides. Returns a new tree.
pub fn bind_and_derive(
    tree: &DescriptorTree,
    script_text: &str,
    options: &BindOptions,
) -> Result<DescriptorTree, ConfigurationError> {
    tree.validate()?;
    let parsed = script::parse(script_text)?;
    let bound = bind_sql(tree, &parsed)?;
    let derived = if bound.loads.iter().any(|l| l.derive_from_ddl) {
        derive_load_params(&bound, &options.schema_workload)?
    } else {
        bound
    };
    let mut hinted = apply_inline_hints(&derived)?;
    apply_unit_counts(&mut hinted, &options.unit_counts)?;
    check_placeholders(&hinted)?;

    for workload in &hinted.workloads {
        for unit in workload.units.iter().filter(|u| u.count == 0) {
            warn!(workload = %workload.name, unit = %unit.name(), "unit has a zero count and will never run");
        }
    }
    Ok(hinted)
}

/// Kind of the unit with this name, for callers that only know names
pub fn unit_kind(tree: &DescriptorTree, workload: &str, unit: &str) -> Result<UnitKind, ConfigurationError> {
    Ok(tree.find_unit(workload, unit)?.kind())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{GenerationRule, RuleKind};
    use crate::model::{
        Group, InsertDescriptor, InsertMethod, IsolationLevel, RowCount, Transaction, Unit,
        WorkloadDescriptor,
    };

    const SCRIPT: &str = "
--+ create_schema
--= create_t
CREATE TABLE t(id INT, name VARCHAR(20), created_at TIMESTAMP);
--= create_u
CREATE TABLE u(
    k INT PRIMARY KEY,
    score INT, -- ${score{0:10}}
    label TEXT
);
--+ workload
--= read
SELECT * FROM t WHERE id = ${id{1:50}};
--= write
UPDATE t SET name = :name WHERE id = ${id};
--+ other
--= read
SELECT 'other section';
--= fallback
SELECT 1;
";

    fn tree() -> DescriptorTree {
        DescriptorTree::new()
            .workload(
                WorkloadDescriptor::new("create_schema")
                    .unit(Unit::query(1, Query::new("create_t")))
                    .unit(Unit::query(1, Query::new("create_u"))),
            )
            .workload(
                WorkloadDescriptor::new("workload")
                    .unit(Unit::query(
                        5,
                        Query::new("read").param("id", GenerationRule::int_range(1, 1000)),
                    ))
                    .unit(Unit::transaction(
                        2,
                        Transaction::new("tx", IsolationLevel::Unspecified)
                            .param("id", GenerationRule::int_range(1, 1000))
                            .query(Query::new("write").param("name", GenerationRule::string(1, 20)))
                            .query(Query::new("fallback")),
                    )),
            )
    }

    #[test]
    fn test_bind_fills_every_query() {
        let parsed = script::parse(SCRIPT).unwrap();
        let bound = bind_sql(&tree(), &parsed).unwrap();
        let read = bound.lookup_query("workload", "read", "read").unwrap();
        // the workload's own section wins over `other`
        assert_eq!(read.sql, "SELECT * FROM t WHERE id = ${id{1:50}};");
        let fallback = bound.lookup_query("workload", "tx", "fallback").unwrap();
        assert_eq!(fallback.sql, "SELECT 1;");
    }

    #[test]
    fn test_bind_is_idempotent() {
        let parsed = script::parse(SCRIPT).unwrap();
        let once = bind_sql(&tree(), &parsed).unwrap();
        let twice = bind_sql(&once, &parsed).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_bind_unresolved() {
        let parsed = script::parse("--+ workload\n--= read\nSELECT 1;").unwrap();
        let err = bind_sql(&tree(), &parsed).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::UnresolvedReference { ref query, .. } if query == "create_t"
        ));
    }

    #[test]
    fn test_derive_params_from_ddl() {
        let parsed = script::parse(SCRIPT).unwrap();
        let bound = bind_sql(&tree(), &parsed).unwrap();
        let params = derive_params_from_ddl(&bound, "create_schema", "t").unwrap();
        let names: Vec<_> = params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["id", "name", "created_at"]);
        assert_eq!(params[0].rule.kind, RuleKind::IntRange { min: 1, max: i32::MAX as i64 });
        assert!(matches!(
            params[1].rule.kind,
            RuleKind::StringRange { max_len: 20, .. }
        ));
        assert_eq!(params[2].rule.kind, RuleKind::DateTimeNow);
    }

    #[test]
    fn test_ddl_hint_overrides_default() {
        let parsed = script::parse(SCRIPT).unwrap();
        let bound = bind_sql(&tree(), &parsed).unwrap();
        let params = derive_params_from_ddl(&bound, "create_schema", "u").unwrap();
        assert_eq!(params[1].name, "score");
        assert_eq!(params[1].rule.kind, RuleKind::IntRange { min: 0, max: 10 });
        assert!(derive_params_from_ddl(&bound, "create_schema", "missing").is_err());
    }

    #[test]
    fn test_inline_hints_create_derived_params() {
        let parsed = script::parse(SCRIPT).unwrap();
        let bound = bind_sql(&tree(), &parsed).unwrap();
        let hinted = apply_inline_hints(&bound).unwrap();
        let read = hinted.lookup_query("workload", "read", "read").unwrap();
        assert_eq!(read.sql, "SELECT * FROM t WHERE id = ${id__1_50};");
        let derived = read.params.iter().find(|p| p.name == "id__1_50").unwrap();
        assert_eq!(derived.rule.kind, RuleKind::IntRange { min: 1, max: 50 });

        // applying again changes nothing
        assert_eq!(apply_inline_hints(&hinted).unwrap(), hinted);
    }

    #[test]
    fn test_hint_on_transaction_param() {
        let tree = DescriptorTree::new().workload(WorkloadDescriptor::new("w").unit(Unit::transaction(
            1,
            Transaction::new("tx", IsolationLevel::ReadCommitted)
                .param("w_id", GenerationRule::int_range(1, 100))
                .query(Query::new("q").sql("SELECT ${w_id{1:5}}")),
        )));
        let hinted = apply_inline_hints(&tree).unwrap();
        let unit = hinted.lookup_unit("w", UnitKind::Transaction, "tx").unwrap();
        let ExecutableDescriptor::Transaction(tx) = &unit.descriptor else {
            panic!("expected a transaction");
        };
        assert!(tx.params.iter().any(|p| p.name == "w_id__1_5"));
        assert_eq!(tx.queries[0].sql, "SELECT ${w_id__1_5}");
        check_placeholders(&hinted).unwrap();
    }

    #[test]
    fn test_unknown_placeholder() {
        let tree = DescriptorTree::new().workload(
            WorkloadDescriptor::new("w").unit(Unit::query(1, Query::new("q").sql("SELECT :nope"))),
        );
        assert!(matches!(
            check_placeholders(&tree),
            Err(ConfigurationError::UnknownPlaceholder { .. })
        ));
    }

    #[test]
    fn test_bind_and_derive_loads_and_counts() {
        let tree = tree().load(
            InsertDescriptor::new("load_u", "u", InsertMethod::CopyFrom, RowCount::Fixed(10))
                .param("label", GenerationRule::string_const("x"))
                .group(Group::new(
                    "pk",
                    vec![Param::new("k", GenerationRule::int_range(1, 10).unique())],
                ))
                .derive_from_ddl(),
        );
        let mut options = BindOptions::default();
        options
            .unit_counts
            .entry("workload".into())
            .or_default()
            .insert("tx".into(), 7);

        let out = bind_and_derive(&tree, SCRIPT, &options).unwrap();
        let load = out.get_load("load_u").unwrap();
        let names: Vec<_> = load.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["score", "label"]);
        assert_eq!(load.params[1].rule, GenerationRule::string_const("x"));
        assert_eq!(out.find_unit("workload", "tx").unwrap().count, 7);
        assert_eq!(unit_kind(&out, "workload", "tx").unwrap(), UnitKind::Transaction);
    }
}
