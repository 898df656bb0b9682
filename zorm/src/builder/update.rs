//! UPDATE statement builder

use super::common::{Clause, QueryBuilder};
use crate::record::Record;
use crate::{Error, Result, Value};
use std::collections::{BTreeMap, HashMap};

/// Trait for types that can be converted to UPDATE data
pub trait IntoUpdateData {
    fn into_update_data(self) -> Result<Vec<(String, Value)>>;
}

// Every mapped field, zero values included
impl<R: Record> IntoUpdateData for &R {
    fn into_update_data(self) -> Result<Vec<(String, Value)>> {
        Ok(R::descriptor()
            .fields()
            .iter()
            .map(|field| (field.column.clone(), self.field_value(field.index)))
            .collect())
    }
}

// Key order follows the map's own iteration order
impl<K, V> IntoUpdateData for HashMap<K, V>
where
    K: Into<String>,
    V: Into<Value>,
{
    fn into_update_data(self) -> Result<Vec<(String, Value)>> {
        Ok(self.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K, V> IntoUpdateData for BTreeMap<K, V>
where
    K: Into<String>,
    V: Into<Value>,
{
    fn into_update_data(self) -> Result<Vec<(String, Value)>> {
        Ok(self.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<T> IntoUpdateData for (&str, T)
where
    T: Into<Value>,
{
    fn into_update_data(self) -> Result<Vec<(String, Value)>> {
        Ok(vec![(self.0.to_string(), self.1.into())])
    }
}

/// A complete UPDATE statement
#[derive(Debug, Clone)]
pub struct UpdateStatement {
    table_name: String,
    set_columns: Vec<String>,
    where_clause: Clause,
    parameters: Vec<Value>,
}

impl UpdateStatement {
    /// Build `UPDATE table SET ...`; fails if `data` yields no assignments
    ///
    /// # Examples
    /// ```
    /// use zorm::{QueryBuilder, UpdateStatement, Value};
    /// use std::collections::BTreeMap;
    ///
    /// let mut updates = BTreeMap::new();
    /// updates.insert("name", Value::from("Jane"));
    /// updates.insert("age", Value::from(25));
    ///
    /// let query = UpdateStatement::new("users", updates).unwrap();
    /// assert_eq!(query.to_sql().unwrap(), "UPDATE users SET age=?, name=?");
    /// ```
    pub fn new<T>(table: &str, data: T) -> Result<Self>
    where
        T: IntoUpdateData,
    {
        let assignments = data.into_update_data()?;
        if assignments.is_empty() {
            return Err(Error::unsupported_input("UPDATE requires at least one column"));
        }
        let (set_columns, parameters) = assignments.into_iter().unzip();
        Ok(Self {
            table_name: table.to_string(),
            set_columns,
            where_clause: Clause::new(),
            parameters,
        })
    }

    /// Attach a WHERE clause. Its arguments follow the SET arguments.
    pub fn with_where(mut self, clause: Clause) -> Self {
        self.parameters.truncate(self.set_columns.len());
        self.parameters.extend(clause.args().iter().cloned());
        self.where_clause = clause;
        self
    }
}

impl QueryBuilder for UpdateStatement {
    fn to_sql(&self) -> Result<String> {
        if self.table_name.is_empty() {
            return Err(Error::invalid_query("no table selected"));
        }

        let mut sql = String::new();

        sql.push_str("UPDATE ");
        sql.push_str(&self.table_name);

        sql.push_str(" SET ");
        let set_parts: Vec<String> = self
            .set_columns
            .iter()
            .map(|column| format!("{column}=?"))
            .collect();
        sql.push_str(&set_parts.join(", "));

        if !self.where_clause.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(self.where_clause.text());
        }

        Ok(sql)
    }

    fn parameters(&self) -> &[Value] {
        &self.parameters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::common::{IntoCondition, WhereConnector};

    fn clause(conditions: Vec<(WhereConnector, crate::builder::Condition)>) -> Clause {
        let mut clause = Clause::new();
        for (connector, condition) in conditions {
            clause.push(connector, condition).unwrap();
        }
        clause
    }

    #[test]
    fn test_set_arguments_precede_where_arguments() {
        let filter = clause(vec![(
            WhereConnector::And,
            ("uid", 4).into_condition().unwrap(),
        )]);
        let query = UpdateStatement::new("userinfo", ("username", "x"))
            .unwrap()
            .with_where(filter);

        assert_eq!(
            query.to_sql().unwrap(),
            "UPDATE userinfo SET username=? WHERE uid=?"
        );
        assert_eq!(query.parameters(), &[Value::from("x"), Value::I32(4)]);
    }

    #[test]
    fn test_update_without_where() {
        let mut data = HashMap::new();
        data.insert("status".to_string(), Value::from("active"));

        let query = UpdateStatement::new("users", data).unwrap();
        assert_eq!(query.to_sql().unwrap(), "UPDATE users SET status=?");
        assert_eq!(query.parameters().len(), 1);
    }

    #[test]
    fn test_replacing_where_keeps_set_arguments() {
        let first = clause(vec![(WhereConnector::And, ("a", 1).into_condition().unwrap())]);
        let second = clause(vec![
            (WhereConnector::And, ("b", 2).into_condition().unwrap()),
            (WhereConnector::Or, ("c", 3).into_condition().unwrap()),
        ]);
        let query = UpdateStatement::new("t", ("x", 0))
            .unwrap()
            .with_where(first)
            .with_where(second);

        assert_eq!(query.to_sql().unwrap(), "UPDATE t SET x=? WHERE b=? OR c=?");
        assert_eq!(
            query.parameters(),
            &[Value::I32(0), Value::I32(2), Value::I32(3)]
        );
    }

    #[test]
    fn test_empty_update_fails() {
        let result = UpdateStatement::new("users", BTreeMap::<String, Value>::new());
        assert!(matches!(result, Err(Error::UnsupportedInputKind { .. })));
    }
}
