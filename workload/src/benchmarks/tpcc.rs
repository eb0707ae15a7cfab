//! TPC-C: warehouses, districts, customers, items and stock, driven by the
//! five standard transactions in a 44/43/4/4/4 mix.

use crate::generation::{Alphabet, GenerationRule};
use crate::model::{
    DescriptorTree, Group, InsertDescriptor, InsertMethod, IsolationLevel, Param, Query, RowCount,
    Transaction, Unit, WorkloadDescriptor,
};

pub const SCRIPT: &str = include_str!("tpcc.sql");

pub const DISTRICTS_PER_WAREHOUSE: i64 = 10;
pub const CUSTOMERS_PER_DISTRICT: i64 = 3000;
pub const ITEMS: i64 = 100_000;

/// Steady-state scenarios: (scenario, unit, virtual users)
pub const MIX: [(&str, &str, u32); 5] = [
    ("new_order", "new_order", 44),
    ("payments", "payment", 43),
    ("order_status", "order_status", 4),
    ("delivery", "delivery", 4),
    ("stock_level", "stock_level", 4),
];

const CLEANUP: [&str; 9] = [
    "drop_order_line",
    "drop_new_order",
    "drop_orders",
    "drop_history",
    "drop_stock",
    "drop_item",
    "drop_customer",
    "drop_district",
    "drop_warehouse",
];

const SCHEMA: [&str; 9] = [
    "create_warehouse",
    "create_district",
    "create_customer",
    "create_history",
    "create_new_order",
    "create_orders",
    "create_order_line",
    "create_item",
    "create_stock",
];

fn key(name: &str, max: i64) -> Param {
    Param::new(name, GenerationRule::int_range(1, max).unique())
}

fn queries<'a>(names: &'a [&'a str]) -> impl Iterator<Item = Query> + 'a {
    names.iter().map(|name| Query::new(*name))
}

/// Descriptors for `warehouses` warehouses, SQL still unbound
pub fn descriptors(warehouses: i64) -> DescriptorTree {
    let warehouses = warehouses.max(1);

    let cleanup = queries(&CLEANUP).fold(WorkloadDescriptor::new("cleanup"), |w, q| w.unit(Unit::query(1, q)));
    let schema = queries(&SCHEMA).fold(WorkloadDescriptor::new("create_schema"), |w, q| w.unit(Unit::query(1, q)));

    DescriptorTree::new()
        .workload(cleanup)
        .workload(schema)
        .workload(workload(warehouses))
        .load(
            InsertDescriptor::new("load_item", "item", InsertMethod::CopyFrom, RowCount::GroupSpan)
                .group(Group::new("item_pk", vec![key("i_id", ITEMS)]))
                .derive_from_ddl(),
        )
        .load(
            InsertDescriptor::new("load_warehouse", "warehouse", InsertMethod::CopyFrom, RowCount::GroupSpan)
                .group(Group::new("warehouse_pk", vec![key("w_id", warehouses)]))
                .param("w_state", GenerationRule::string(2, 2).with_alphabet(Alphabet::en_upper()))
                .param("w_zip", GenerationRule::string_const("123456789"))
                .param("w_ytd", GenerationRule::float_const(300_000.0))
                .derive_from_ddl(),
        )
        .load(
            InsertDescriptor::new("load_district", "district", InsertMethod::CopyFrom, RowCount::GroupSpan)
                .group(Group::new(
                    "district_pk",
                    vec![key("d_w_id", warehouses), key("d_id", DISTRICTS_PER_WAREHOUSE)],
                ))
                .param("d_state", GenerationRule::string(2, 2).with_alphabet(Alphabet::en_upper()))
                .param("d_zip", GenerationRule::string_const("123456789"))
                .param("d_ytd", GenerationRule::float_const(30_000.0))
                .param("d_next_o_id", GenerationRule::int_const(CUSTOMERS_PER_DISTRICT + 1))
                .derive_from_ddl(),
        )
        .load(
            InsertDescriptor::new("load_customer", "customer", InsertMethod::CopyFrom, RowCount::GroupSpan)
                .group(Group::new(
                    "customer_pk",
                    vec![
                        key("c_w_id", warehouses),
                        key("c_d_id", DISTRICTS_PER_WAREHOUSE),
                        key("c_id", CUSTOMERS_PER_DISTRICT),
                    ],
                ))
                .param("c_middle", GenerationRule::string_const("OE"))
                .param("c_state", GenerationRule::string(2, 2).with_alphabet(Alphabet::en_upper()))
                .param("c_zip", GenerationRule::string_const("123456789"))
                .param("c_phone", GenerationRule::string(16, 16).with_alphabet(Alphabet::num()))
                .param("c_credit", GenerationRule::string_const("GC"))
                .param("c_credit_lim", GenerationRule::float_const(50_000.0))
                .param("c_discount", GenerationRule::float_range(0.0, 0.5))
                .param("c_balance", GenerationRule::float_const(-10.0))
                .param("c_ytd_payment", GenerationRule::float_const(10.0))
                .param("c_payment_cnt", GenerationRule::int_const(1))
                .param("c_delivery_cnt", GenerationRule::int_const(0))
                .derive_from_ddl(),
        )
        .load(
            InsertDescriptor::new("load_stock", "stock", InsertMethod::CopyFrom, RowCount::GroupSpan)
                .group(Group::new("stock_pk", vec![key("s_w_id", warehouses), key("s_i_id", ITEMS)]))
                .param("s_ytd", GenerationRule::int_const(0))
                .param("s_order_cnt", GenerationRule::int_const(0))
                .param("s_remote_cnt", GenerationRule::int_const(0))
                .derive_from_ddl(),
        )
}

fn workload(warehouses: i64) -> WorkloadDescriptor {
    let w_id = || GenerationRule::int_range(1, warehouses);
    let d_id = || GenerationRule::int_range(1, DISTRICTS_PER_WAREHOUSE);
    let c_id = || GenerationRule::int_range(1, CUSTOMERS_PER_DISTRICT);

    let new_order = Transaction::new("new_order", IsolationLevel::ReadCommitted)
        .param("w_id", w_id())
        .param("d_id", d_id())
        .param("c_id", c_id())
        .param("i_id", GenerationRule::int_range(1, ITEMS))
        .param("ol_quantity", GenerationRule::int_range(1, 10))
        .param("ol_cnt", GenerationRule::int_range(5, 15))
        .query(Query::new("no_get_customer"))
        .query(Query::new("no_get_warehouse"))
        .query(Query::new("no_next_order_id"))
        .query(Query::new("no_insert_order"))
        .query(Query::new("no_insert_new_order"))
        .query(Query::new("no_update_stock"))
        .query(Query::new("no_insert_order_line"));

    let payment = Transaction::new("payment", IsolationLevel::ReadCommitted)
        .param("w_id", w_id())
        .param("d_id", d_id())
        .param("c_w_id", w_id())
        .param("c_d_id", d_id())
        .param("c_id", c_id())
        .param("h_amount", GenerationRule::float_range(1.0, 5000.0))
        .query(Query::new("pay_update_warehouse"))
        .query(Query::new("pay_update_district"))
        .query(Query::new("pay_update_customer"))
        .query(Query::new("pay_insert_history").param("h_data", GenerationRule::string(12, 24)));

    let order_status = Transaction::new("order_status", IsolationLevel::RepeatableRead)
        .param("w_id", w_id())
        .param("d_id", d_id())
        .param("c_id", c_id())
        .query(Query::new("os_get_customer"))
        .query(Query::new("os_get_last_order"))
        .query(Query::new("os_get_order_lines"));

    let delivery = Transaction::new("delivery", IsolationLevel::ReadCommitted)
        .param("w_id", w_id())
        .param("d_id", d_id())
        .param("carrier_id", GenerationRule::int_range(1, 10))
        .query(Query::new("dl_update_order"))
        .query(Query::new("dl_update_order_lines"))
        .query(Query::new("dl_delete_new_order"));

    let stock_level = Query::new("stock_level")
        .param("w_id", w_id())
        .param("d_id", d_id())
        .param("threshold", GenerationRule::int_range(1, 100));

    WorkloadDescriptor::new("workload")
        .unit(Unit::transaction(44, new_order))
        .unit(Unit::transaction(43, payment))
        .unit(Unit::transaction(4, order_status))
        .unit(Unit::transaction(4, delivery))
        .unit(Unit::query(4, stock_level))
}
