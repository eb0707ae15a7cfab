//! pgbench-style TPC-B: one `update_and_log` transaction against
//! branches, tellers and accounts.

use crate::generation::GenerationRule;
use crate::model::{
    DescriptorTree, Group, InsertDescriptor, InsertMethod, IsolationLevel, Param, Query, RowCount,
    Transaction, Unit, WorkloadDescriptor,
};

pub const SCRIPT: &str = include_str!("tpcb.sql");

pub const TELLERS_PER_BRANCH: i64 = 10;
pub const ACCOUNTS_PER_BRANCH: i64 = 100_000;

/// Virtual users of the default scenario
pub const VUS: u32 = 10;

/// Descriptors for `scale` branches, SQL still unbound
pub fn descriptors(scale: i64) -> DescriptorTree {
    let branches = scale.max(1);
    let tellers = branches * TELLERS_PER_BRANCH;
    let accounts = branches * ACCOUNTS_PER_BRANCH;
    let pk = |name: &str, max: i64| {
        Group::new(
            format!("{name}_pk"),
            vec![Param::new(name, GenerationRule::int_range(1, max).unique())],
        )
    };
    let load = |name: &str, table: &str| {
        InsertDescriptor::new(name, table, InsertMethod::CopyFrom, RowCount::GroupSpan).derive_from_ddl()
    };

    let update_and_log = Transaction::new("update_and_log", IsolationLevel::Unspecified)
        .param("aid", GenerationRule::int_range(1, accounts))
        .param("tid", GenerationRule::int_range(1, tellers))
        .param("bid", GenerationRule::int_range(1, branches))
        .param("delta", GenerationRule::int_range(-5000, 5000))
        .query(Query::new("update_account"))
        .query(Query::new("select_balance"))
        .query(Query::new("update_teller"))
        .query(Query::new("update_branch"))
        .query(Query::new("insert_history"));

    DescriptorTree::new()
        .workload(
            ["drop_history", "drop_accounts", "drop_tellers", "drop_branches"]
                .into_iter()
                .fold(WorkloadDescriptor::new("cleanup"), |w, name| w.unit(Unit::query(1, Query::new(name)))),
        )
        .workload(
            ["create_branches", "create_tellers", "create_accounts", "create_history"]
                .into_iter()
                .fold(WorkloadDescriptor::new("create_schema"), |w, name| {
                    w.unit(Unit::query(1, Query::new(name)))
                }),
        )
        .workload(WorkloadDescriptor::new("workload").unit(Unit::transaction(1, update_and_log)))
        .load(load("load_branches", "pgbench_branches").group(pk("bid", branches)))
        .load(
            load("load_tellers", "pgbench_tellers")
                .group(pk("tid", tellers))
                .param("bid", GenerationRule::int_range(1, branches)),
        )
        .load(
            load("load_accounts", "pgbench_accounts")
                .group(pk("aid", accounts))
                .param("bid", GenerationRule::int_range(1, branches)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::RuleKind;
    use crate::model::{ExecutableDescriptor, UnitKind};
    use crate::sql::{bind_and_derive, BindOptions};

    #[test]
    fn test_balances_come_from_ddl_hints() {
        let tree = bind_and_derive(&descriptors(1), SCRIPT, &BindOptions::default()).unwrap();
        let tellers = tree.get_load("load_tellers").unwrap();
        let names: Vec<_> = tellers.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["bid", "tbalance", "filler"]);
        assert_eq!(tellers.params[1].rule.kind, RuleKind::IntRange { min: 0, max: 0 });
        assert_eq!(
            tellers.params[2].rule.kind,
            RuleKind::StringRange { min_len: 84, max_len: 84, alphabet: None }
        );
    }

    #[test]
    fn test_transaction_shape() {
        let tree = bind_and_derive(&descriptors(3), SCRIPT, &BindOptions::default()).unwrap();
        let unit = tree.lookup_unit("workload", UnitKind::Transaction, "update_and_log").unwrap();
        let ExecutableDescriptor::Transaction(tx) = &unit.descriptor else {
            panic!("expected a transaction");
        };
        assert_eq!(tx.isolation, IsolationLevel::Unspecified);
        assert_eq!(tx.queries.len(), 5);
        assert!(tx.queries[0].sql.starts_with("UPDATE pgbench_accounts"));
        let aid = tx.params.iter().find(|p| p.name == "aid").unwrap();
        assert_eq!(aid.rule.kind, RuleKind::IntRange { min: 1, max: 300_000 });
    }
}
