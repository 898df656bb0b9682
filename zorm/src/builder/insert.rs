//! INSERT / REPLACE statement builder

use super::common::QueryBuilder;
use crate::record::Record;
use crate::{Error, Result, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Leading keyword of a row-writing statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertVerb {
    Insert,
    Replace,
}

impl fmt::Display for InsertVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsertVerb::Insert => write!(f, "INSERT"),
            InsertVerb::Replace => write!(f, "REPLACE"),
        }
    }
}

/// Column list plus one value tuple per row
#[derive(Debug, Clone, PartialEq)]
pub struct InsertData {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// Trait for types that can be converted to INSERT data.
///
/// Batches take their column list from the first element. Records in one
/// batch are expected to share a shape; map rows are aligned to the first
/// map's keys, with missing keys bound as NULL and extra keys ignored.
pub trait IntoInsertData {
    fn into_insert_data(self) -> Result<InsertData>;
}

fn record_row<R: Record>(record: &R) -> Vec<Value> {
    R::descriptor()
        .insertable()
        .map(|field| record.field_value(field.index))
        .collect()
}

fn record_data<'a, R, I>(records: I) -> Result<InsertData>
where
    R: Record + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let columns: Vec<String> = R::descriptor()
        .insertable()
        .map(|field| field.column.clone())
        .collect();
    if columns.is_empty() {
        return Err(Error::unsupported_input(
            "record has no insertable fields",
        ));
    }

    let rows: Vec<Vec<Value>> = records.into_iter().map(record_row).collect();
    if rows.is_empty() {
        return Err(Error::unsupported_input("nothing to insert"));
    }
    Ok(InsertData { columns, rows })
}

fn map_data<I, K, V>(maps: I) -> Result<InsertData>
where
    I: IntoIterator,
    I::Item: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    let mut maps = maps.into_iter().map(|map| {
        map.into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect::<Vec<(String, Value)>>()
    });

    let Some(first) = maps.next() else {
        return Err(Error::unsupported_input("nothing to insert"));
    };
    if first.is_empty() {
        return Err(Error::unsupported_input("insert map has no columns"));
    }

    let (columns, first_row): (Vec<String>, Vec<Value>) = first.into_iter().unzip();
    let mut rows = vec![first_row];
    for map in maps {
        let mut lookup: HashMap<String, Value> = map.into_iter().collect();
        rows.push(
            columns
                .iter()
                .map(|column| lookup.remove(column).unwrap_or(Value::Null))
                .collect(),
        );
    }
    Ok(InsertData { columns, rows })
}

impl<R: Record> IntoInsertData for &R {
    fn into_insert_data(self) -> Result<InsertData> {
        record_data(std::iter::once(self))
    }
}

impl<R: Record> IntoInsertData for &[R] {
    fn into_insert_data(self) -> Result<InsertData> {
        record_data(self)
    }
}

impl<R: Record, const N: usize> IntoInsertData for &[R; N] {
    fn into_insert_data(self) -> Result<InsertData> {
        record_data(self)
    }
}

impl<R: Record> IntoInsertData for &Vec<R> {
    fn into_insert_data(self) -> Result<InsertData> {
        record_data(self)
    }
}

impl<R: Record> IntoInsertData for Vec<R> {
    fn into_insert_data(self) -> Result<InsertData> {
        record_data(&self)
    }
}

impl<K, V> IntoInsertData for HashMap<K, V>
where
    K: Into<String>,
    V: Into<Value>,
{
    fn into_insert_data(self) -> Result<InsertData> {
        map_data(std::iter::once(self))
    }
}

impl<K, V> IntoInsertData for BTreeMap<K, V>
where
    K: Into<String>,
    V: Into<Value>,
{
    fn into_insert_data(self) -> Result<InsertData> {
        map_data(std::iter::once(self))
    }
}

impl<K, V> IntoInsertData for Vec<HashMap<K, V>>
where
    K: Into<String>,
    V: Into<Value>,
{
    fn into_insert_data(self) -> Result<InsertData> {
        map_data(self)
    }
}

impl<K, V> IntoInsertData for Vec<BTreeMap<K, V>>
where
    K: Into<String>,
    V: Into<Value>,
{
    fn into_insert_data(self) -> Result<InsertData> {
        map_data(self)
    }
}

/// A complete INSERT or REPLACE statement
#[derive(Debug, Clone)]
pub struct InsertStatement {
    verb: InsertVerb,
    table_name: String,
    columns: Vec<String>,
    row_widths: Vec<usize>,
    parameters: Vec<Value>,
}

impl InsertStatement {
    pub fn new<T>(verb: InsertVerb, table: &str, data: T) -> Result<Self>
    where
        T: IntoInsertData,
    {
        let InsertData { columns, rows } = data.into_insert_data()?;
        let row_widths = rows.iter().map(Vec::len).collect();
        Ok(Self {
            verb,
            table_name: table.to_string(),
            columns,
            row_widths,
            parameters: rows.into_iter().flatten().collect(),
        })
    }

    pub fn row_count(&self) -> usize {
        self.row_widths.len()
    }
}

impl QueryBuilder for InsertStatement {
    fn to_sql(&self) -> Result<String> {
        if self.table_name.is_empty() {
            return Err(Error::invalid_query("no table selected"));
        }
        if self.columns.is_empty() || self.row_widths.is_empty() {
            return Err(Error::invalid_query(
                "INSERT requires columns and values",
            ));
        }

        let mut sql = String::new();

        sql.push_str(&self.verb.to_string());
        sql.push_str(" INTO ");
        sql.push_str(&self.table_name);

        let columns: Vec<String> = self.columns.iter().map(|c| format!("`{c}`")).collect();
        sql.push_str(" (");
        sql.push_str(&columns.join(", "));
        sql.push(')');

        sql.push_str(" VALUES ");
        let value_groups: Vec<String> = self
            .row_widths
            .iter()
            .map(|width| format!("({})", vec!["?"; *width].join(", ")))
            .collect();
        sql.push_str(&value_groups.join(", "));

        Ok(sql)
    }

    fn parameters(&self) -> &[Value] {
        &self.parameters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::common::placeholder_count;
    use crate::record::{FieldDef, FieldKind, RecordDescriptor};
    use crate::coerce::ConversionError;
    use crate::record::SqlField;
    use std::sync::OnceLock;

    #[derive(Debug, Default, Clone)]
    struct Account {
        id: i64,
        name: String,
        active: bool,
    }

    impl Record for Account {
        fn descriptor() -> &'static RecordDescriptor {
            static DESCRIPTOR: OnceLock<RecordDescriptor> = OnceLock::new();
            DESCRIPTOR.get_or_init(|| {
                RecordDescriptor::resolve(&[
                    FieldDef::new("id", Some("id,auto_increment"), FieldKind::Int),
                    FieldDef::new("name", None, FieldKind::Text),
                    FieldDef::new("active", Some("is_active"), FieldKind::Bool),
                ])
            })
        }

        fn field_value(&self, index: usize) -> Value {
            match index {
                0 => self.id.to_value(),
                1 => self.name.to_value(),
                2 => self.active.to_value(),
                _ => Value::Null,
            }
        }

        fn set_field(&mut self, index: usize, value: Value) -> std::result::Result<(), ConversionError> {
            match index {
                0 => self.id = SqlField::from_value(value)?,
                1 => self.name = SqlField::from_value(value)?,
                2 => self.active = SqlField::from_value(value)?,
                _ => {}
            }
            Ok(())
        }
    }

    fn account(name: &str) -> Account {
        Account {
            id: 99,
            name: name.to_string(),
            active: true,
        }
    }

    #[test]
    fn test_single_record_skips_auto_increment() {
        let query = InsertStatement::new(InsertVerb::Insert, "accounts", &account("ann")).unwrap();
        assert_eq!(
            query.to_sql().unwrap(),
            "INSERT INTO accounts (`name`, `is_active`) VALUES (?, ?)"
        );
        assert_eq!(query.parameters(), &[Value::from("ann"), Value::Bool(true)]);
    }

    #[test]
    fn test_batch_shares_one_column_list() {
        let batch = vec![account("a"), account("b"), account("c")];
        let query = InsertStatement::new(InsertVerb::Replace, "accounts", &batch).unwrap();
        let sql = query.to_sql().unwrap();
        assert_eq!(
            sql,
            "REPLACE INTO accounts (`name`, `is_active`) VALUES (?, ?), (?, ?), (?, ?)"
        );
        assert_eq!(query.row_count(), 3);
        assert_eq!(query.parameters().len(), 3 * 2);
        assert_eq!(placeholder_count(&sql), query.parameters().len());
        assert_eq!(query.parameters()[2], Value::from("b"));
    }

    #[test]
    fn test_insert_map() {
        let mut data = BTreeMap::new();
        data.insert("name", Value::from("John"));
        data.insert("age", Value::from(30));

        let query = InsertStatement::new(InsertVerb::Insert, "users", data).unwrap();
        assert_eq!(
            query.to_sql().unwrap(),
            "INSERT INTO users (`age`, `name`) VALUES (?, ?)"
        );
        assert_eq!(query.parameters(), &[Value::I32(30), Value::from("John")]);
    }

    #[test]
    fn test_insert_many_maps_aligns_to_first() {
        let mut data1 = HashMap::new();
        data1.insert("name".to_string(), Value::from("John"));
        data1.insert("age".to_string(), Value::from(30));

        let mut data2 = HashMap::new();
        data2.insert("age".to_string(), Value::from(25));
        data2.insert("name".to_string(), Value::from("Jane"));

        let query = InsertStatement::new(InsertVerb::Insert, "users", vec![data1, data2]).unwrap();
        let sql = query.to_sql().unwrap();
        assert!(sql.contains("VALUES (?, ?), (?, ?)"));

        let params = query.parameters();
        let name_first = sql.contains("(`name`, `age`)");
        let (name_at, age_at) = if name_first { (0, 1) } else { (1, 0) };
        assert_eq!(params[2 + name_at], Value::from("Jane"));
        assert_eq!(params[2 + age_at], Value::I32(25));
    }

    #[test]
    fn test_insert_empty_data_fails() {
        let result = InsertStatement::new(InsertVerb::Insert, "users", Vec::<Account>::new());
        assert!(matches!(result, Err(Error::UnsupportedInputKind { .. })));

        let result = InsertStatement::new(InsertVerb::Insert, "users", HashMap::<String, Value>::new());
        assert!(matches!(result, Err(Error::UnsupportedInputKind { .. })));
    }

    #[test]
    fn test_insert_requires_table() {
        let query = InsertStatement::new(InsertVerb::Insert, "", &account("x")).unwrap();
        assert!(query.to_sql().is_err());
    }
}
