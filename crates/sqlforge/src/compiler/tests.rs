use super::*;
use crate::builder::{QueryBuild, QueryBuilder};
use crate::record;

fn built(qb: &QueryBuilder) -> BuiltQuery {
    qb.to_sql().unwrap()
}

// ==================== SELECT ====================

#[test]
fn select_with_where_order_limit() {
    let mut qb = QueryBuilder::new();
    qb.table("users")
        .select(["id", "name"])
        .and_where("age", Op::Gt, 18)
        .order_by("name")
        .limit(10);

    let q = built(&qb);
    assert_eq!(
        q.sql,
        "SELECT id, name FROM users WHERE age > ? ORDER BY name ASC LIMIT 10"
    );
    assert_eq!(q.params, [Value::Int(18)]);
}

#[test]
fn select_star_by_default() {
    let qb = QueryBuilder::for_table("users");
    let q = built(&qb);
    assert_eq!(q.sql, "SELECT * FROM users");
    assert!(q.params.is_empty());
}

#[test]
fn first_condition_ignores_its_combinator() {
    let mut qb = QueryBuilder::for_table("users");
    qb.or_where("status", Op::Eq, "active")
        .and_where("age", Op::Gte, 21)
        .or_where("role", Op::Eq, "admin");

    let q = built(&qb);
    assert_eq!(
        q.sql,
        "SELECT * FROM users WHERE status = ? AND age >= ? OR role = ?"
    );
    assert_eq!(
        q.params,
        [Value::from("active"), Value::Int(21), Value::from("admin")]
    );
}

#[test]
fn full_clause_order() {
    let mut qb = QueryBuilder::for_table("users");
    qb.select(["users.id", "COUNT(orders.id) AS order_count"])
        .join("orders", "users.id", Op::Eq, "orders.user_id")
        .left_join("profiles", "users.id", Op::Eq, "profiles.user_id")
        .and_where("users.active", Op::Eq, true)
        .group_by(["users.id"])
        .having("COUNT(orders.id)", Op::Gt, 2)
        .order_by_desc("order_count")
        .limit(20)
        .offset(40);

    let q = built(&qb);
    assert_eq!(
        q.sql,
        "SELECT users.id, COUNT(orders.id) AS order_count FROM users \
         INNER JOIN orders ON users.id = orders.user_id \
         LEFT JOIN profiles ON users.id = profiles.user_id \
         WHERE users.active = ? GROUP BY users.id HAVING COUNT(orders.id) > ? \
         ORDER BY order_count DESC LIMIT 20 OFFSET 40"
    );
    assert_eq!(q.params, [Value::Bool(true), Value::Int(2)]);
}

#[test]
fn join_requires_comparison_operator() {
    for op in [Op::IsNull, Op::IsNotNull, Op::In, Op::NotIn, Op::Between] {
        let mut qb = QueryBuilder::for_table("users");
        qb.select_all().join("orders", "users.id", op, "orders.user_id");
        assert!(qb.to_sql().unwrap_err().is_validation(), "{op} accepted in join");
    }

    let mut qb = QueryBuilder::for_table("users");
    qb.select_all()
        .join("orders", "users.id", Op::Eq, "orders.user_id")
        .left_join("t", "users.id", Op::Between, "t.x");
    assert!(qb.to_sql().unwrap_err().is_validation());

    let mut qb = QueryBuilder::for_table("users");
    qb.select_all().right_join("t", "users.name", Op::Like, "t.pattern");
    assert_eq!(
        built(&qb).sql,
        "SELECT * FROM users RIGHT JOIN t ON users.name LIKE t.pattern"
    );
}

#[test]
fn only_last_order_by_is_rendered() {
    let mut qb = QueryBuilder::for_table("users");
    qb.order_by("name").order_by_desc("created_at");
    assert_eq!(
        built(&qb).sql,
        "SELECT * FROM users ORDER BY created_at DESC"
    );
}

#[test]
fn offset_without_limit() {
    let mut qb = QueryBuilder::for_table("users");
    qb.offset(5);
    assert_eq!(built(&qb).sql, "SELECT * FROM users OFFSET 5");
}

#[test]
fn null_checks_render_without_params() {
    let mut qb = QueryBuilder::for_table("users");
    qb.where_null("deleted_at").where_not_null("email");

    let q = built(&qb);
    assert_eq!(
        q.sql,
        "SELECT * FROM users WHERE deleted_at IS NULL AND email IS NOT NULL"
    );
    assert!(q.params.is_empty());
}

#[test]
fn in_list_expands_placeholders() {
    let mut qb = QueryBuilder::for_table("users");
    qb.and_where("id", Op::In, Value::list([1, 2, 3]))
        .and_where("role", Op::NotIn, vec![Value::from("guest")]);

    let q = built(&qb);
    assert_eq!(
        q.sql,
        "SELECT * FROM users WHERE id IN (?, ?, ?) AND role NOT IN (?)"
    );
    assert_eq!(
        q.params,
        [
            Value::Int(1),
            Value::Int(2),
            Value::Int(3),
            Value::from("guest")
        ]
    );
}

#[test]
fn in_with_scalar_and_empty_list() {
    let mut qb = QueryBuilder::for_table("users");
    qb.and_where("id", Op::In, 7)
        .and_where("id", Op::NotIn, Value::List(Vec::new()));

    let q = built(&qb);
    assert_eq!(
        q.sql,
        "SELECT * FROM users WHERE id IN (?) AND id NOT IN (NULL)"
    );
    assert_eq!(q.params, [Value::Int(7)]);
}

#[test]
fn between_takes_two_bounds() {
    let mut qb = QueryBuilder::for_table("orders");
    qb.and_where("total", Op::Between, Value::list([10, 100]));

    let q = built(&qb);
    assert_eq!(q.sql, "SELECT * FROM orders WHERE total BETWEEN ? AND ?");
    assert_eq!(q.params, [Value::Int(10), Value::Int(100)]);

    let mut qb = QueryBuilder::for_table("orders");
    qb.and_where("total", Op::Between, 10);
    assert!(qb.to_sql().unwrap_err().is_validation());

    let mut qb = QueryBuilder::for_table("orders");
    qb.and_where("total", Op::Between, Value::list([1, 2, 3]));
    assert!(qb.to_sql().unwrap_err().is_validation());
}

#[test]
fn list_value_with_scalar_operator_is_rejected() {
    let mut qb = QueryBuilder::for_table("users");
    qb.and_where("id", Op::Eq, Value::list([1, 2]));
    assert!(qb.to_sql().unwrap_err().is_validation());
}

#[test]
fn missing_table_is_rejected() {
    let qb = QueryBuilder::new();
    assert!(qb.to_sql().unwrap_err().is_validation());

    let qb = QueryBuilder::for_table("   ");
    assert!(qb.to_sql().unwrap_err().is_validation());
}

#[test]
fn binary_operator_without_value_is_rejected() {
    let mut state = QueryState::for_table("users");
    if let Statement::Select(s) = &mut state.statement {
        s.conditions.push(Condition {
            column: "age".into(),
            op: Op::Gt,
            value: None,
            combinator: Default::default(),
        });
    }
    assert!(compile(&state).unwrap_err().is_validation());
}

// ==================== INSERT ====================

#[test]
fn insert_single_record() {
    let mut qb = QueryBuilder::new();
    qb.table("users").insert(record! { "name" => "A", "age" => 1 });

    let q = built(&qb);
    assert_eq!(q.sql, "INSERT INTO users (name, age) VALUES (?, ?)");
    assert_eq!(q.params, [Value::from("A"), Value::Int(1)]);
}

#[test]
fn insert_many_renders_one_group_per_record() {
    let mut qb = QueryBuilder::for_table("users");
    qb.insert_many(vec![
        record! { "name" => "A", "age" => 1 },
        record! { "name" => "B", "age" => 2 },
        record! { "name" => "C", "age" => 3 },
    ])
    .unwrap();

    let q = built(&qb);
    assert_eq!(
        q.sql,
        "INSERT INTO users (name, age) VALUES (?, ?), (?, ?), (?, ?)"
    );
    assert_eq!(q.params.len(), 6);
    assert_eq!(q.params[4], Value::from("C"));
}

#[test]
fn insert_with_null_value() {
    let mut qb = QueryBuilder::for_table("users");
    qb.insert(record! { "name" => "A", "email" => None::<String> });

    let q = built(&qb);
    assert_eq!(q.sql, "INSERT INTO users (name, email) VALUES (?, ?)");
    assert_eq!(q.params, [Value::from("A"), Value::Null]);
}

#[test]
fn empty_insert_is_rejected() {
    let mut qb = QueryBuilder::for_table("users");
    qb.insert(record! {});
    assert!(qb.to_sql().unwrap_err().is_validation());
}

#[test]
fn ragged_insert_state_is_rejected() {
    let state = QueryState {
        table: "users".into(),
        statement: Statement::Insert(InsertState {
            columns: vec!["a".into(), "b".into()],
            values: vec![Value::Int(1), Value::Int(2), Value::Int(3)],
        }),
    };
    assert!(compile(&state).unwrap_err().is_validation());
}

// ==================== UPDATE ====================

#[test]
fn update_with_where() {
    let mut qb = QueryBuilder::new();
    qb.table("users")
        .update(record! { "name" => "B" })
        .and_where("id", Op::Eq, 5);

    let q = built(&qb);
    assert_eq!(q.sql, "UPDATE users SET name = ? WHERE id = ?");
    assert_eq!(q.params, [Value::from("B"), Value::Int(5)]);
}

#[test]
fn update_binds_set_values_before_where_values() {
    let mut qb = QueryBuilder::for_table("users");
    qb.update(record! { "name" => "John Smith", "age" => 26 })
        .and_where("id", Op::Eq, 1)
        .or_where("email", Op::Like, "%@old.example");

    let q = built(&qb);
    assert_eq!(
        q.sql,
        "UPDATE users SET name = ?, age = ? WHERE id = ? OR email LIKE ?"
    );
    assert_eq!(
        q.params,
        [
            Value::from("John Smith"),
            Value::Int(26),
            Value::Int(1),
            Value::from("%@old.example")
        ]
    );
}

#[test]
fn update_without_where_touches_all_rows() {
    let mut qb = QueryBuilder::for_table("users");
    qb.update(record! { "active" => false });
    assert_eq!(built(&qb).sql, "UPDATE users SET active = ?");
}

#[test]
fn empty_update_is_rejected() {
    let mut qb = QueryBuilder::for_table("users");
    qb.update(record! {}).and_where("id", Op::Eq, 1);
    assert!(qb.to_sql().unwrap_err().is_validation());
}

// ==================== DELETE ====================

#[test]
fn delete_with_where() {
    let mut qb = QueryBuilder::new();
    qb.table("users").delete().and_where("id", Op::Eq, 5);

    let q = built(&qb);
    assert_eq!(q.sql, "DELETE FROM users WHERE id = ?");
    assert_eq!(q.params, [Value::Int(5)]);
}

#[test]
fn delete_without_where() {
    let mut qb = QueryBuilder::for_table("sessions");
    qb.delete();
    assert_eq!(built(&qb).sql, "DELETE FROM sessions");
}

// ==================== Placeholders ====================

#[test]
fn dollar_placeholders_are_numbered_in_bind_order() {
    let mut qb = QueryBuilder::for_table("users");
    qb.update(record! { "name" => "B", "age" => 30 })
        .and_where("id", Op::In, Value::list([1, 2]));

    let q = qb.build_with(Placeholder::Dollar).unwrap();
    assert_eq!(
        q.sql,
        "UPDATE users SET name = $1, age = $2 WHERE id IN ($3, $4)"
    );
    assert_eq!(q.params.len(), 4);
}

#[test]
fn dollar_placeholders_in_multi_row_insert() {
    let mut qb = QueryBuilder::for_table("users");
    qb.insert_many(vec![
        record! { "name" => "A", "age" => 1 },
        record! { "name" => "B", "age" => 2 },
    ])
    .unwrap();

    let q = qb.build_with(Placeholder::Dollar).unwrap();
    assert_eq!(
        q.sql,
        "INSERT INTO users (name, age) VALUES ($1, $2), ($3, $4)"
    );
}

#[test]
fn placeholder_count_matches_params() {
    let mut qb = QueryBuilder::for_table("t");
    qb.and_where("a", Op::Eq, 1)
        .and_where("b", Op::In, Value::list(["x", "y"]))
        .and_where("c", Op::Between, Value::list([1.5, 2.5]))
        .where_null("d")
        .having("COUNT(*)", Op::Gt, 0);

    let q = built(&qb);
    assert_eq!(q.sql.matches('?').count(), q.params.len());
}

#[test]
fn compile_does_not_mutate_state() {
    let mut qb = QueryBuilder::for_table("users");
    qb.and_where("id", Op::Eq, 1);
    let before = qb.get_state();
    let first = built(&qb);
    let second = built(&qb);
    assert_eq!(first, second);
    assert_eq!(qb.get_state(), before);
}
