use zorm::{
    Clause, DeleteStatement, InsertStatement, InsertVerb, IntoCondition, QueryBuilder,
    SelectStatement, UpdateStatement, Value, WhereConnector, op, render_sql,
};
use std::collections::BTreeMap;

fn main() -> zorm::Result<()> {
    println!("=== zorm - Statement Building Examples ===\n");

    // WHERE clauses are assembled once and handed to any statement
    let mut filter = Clause::new();
    filter.push(WhereConnector::And, ("age", op::GT, 18).into_condition()?)?;
    filter.push(WhereConnector::And, ("status", "active").into_condition()?)?;
    filter.push(WhereConnector::Or, ("uid", "in", vec![1, 2, 3]).into_condition()?)?;

    let select_query = SelectStatement::new("userinfo")
        .columns(vec!["uid".into(), "username".into()])
        .with_where(filter.clone())
        .order_by(vec!["uid DESC".into()])
        .limit(Some(10))
        .offset(Some(5));

    println!("1. SELECT:");
    println!("   SQL: {}", select_query.to_sql()?);
    println!("   Parameters: {:?}\n", select_query.parameters());

    // INSERT from a map
    let mut user = BTreeMap::new();
    user.insert("username", Value::from("ann"));
    user.insert("departname", Value::from("ops"));

    let insert_query = InsertStatement::new(InsertVerb::Insert, "userinfo", user)?;
    println!("2. INSERT:");
    println!("   SQL: {}", insert_query.to_sql()?);
    println!("   Parameters: {:?}\n", insert_query.parameters());

    // UPDATE: SET arguments come before WHERE arguments
    let update_query = UpdateStatement::new("userinfo", ("username", "bob"))?.with_where(filter.clone());
    println!("3. UPDATE:");
    println!("   SQL: {}", update_query.to_sql()?);
    println!("   Parameters: {:?}\n", update_query.parameters());

    // DELETE with a row cap
    let delete_query = DeleteStatement::new("userinfo")
        .with_where(filter)
        .limit(Some(1));
    println!("4. DELETE:");
    println!("   SQL: {}", delete_query.to_sql()?);
    println!(
        "   Inlined: {}\n",
        render_sql(&delete_query.to_sql()?, delete_query.parameters())
    );

    // Unknown operators are rejected rather than written into the SQL
    match ("age", "; DROP TABLE userinfo", 1).into_condition() {
        Ok(_) => println!("5. unexpected: operator accepted"),
        Err(e) => println!("5. Rejected operator: {e}"),
    }

    Ok(())
}
