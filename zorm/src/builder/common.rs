//! Common types and traits shared across all statement builders

use crate::record::Record;
use crate::{Error, IntoOperator, Operator, Result, Value};

/// Core trait for all statement builders
pub trait QueryBuilder {
    /// Generate the SQL text
    fn to_sql(&self) -> Result<String>;

    /// Bind parameters, in placeholder order
    fn parameters(&self) -> &[Value];
}

/// How predicate fragments are joined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhereConnector {
    And,
    Or,
}

impl WhereConnector {
    fn joiner(self) -> &'static str {
        match self {
            WhereConnector::And => " AND ",
            WhereConnector::Or => " OR ",
        }
    }
}

/// One predicate call, before it is rendered into clause text
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `col=?` for each pair, joined with the call's connector
    Fields(Vec<(String, Value)>),
    /// `col=?`
    Eq(String, Value),
    /// `col <op> ?`, `col IN (?,..)` or `col IS NULL`
    Compare(String, Operator, Value),
}

/// Trait for values that can be used as a WHERE / HAVING predicate
pub trait IntoCondition {
    fn into_condition(self) -> Result<Condition>;
}

// Sparse filter: every mapped field whose value is not zero/empty
impl<R: Record> IntoCondition for &R {
    fn into_condition(self) -> Result<Condition> {
        let pairs = R::descriptor()
            .fields()
            .iter()
            .filter_map(|field| {
                let value = self.field_value(field.index);
                (!value.is_zero()).then(|| (field.column.clone(), value))
            })
            .collect();
        Ok(Condition::Fields(pairs))
    }
}

// Shorthand equality: where_(("age", 18))
impl<T> IntoCondition for (&str, T)
where
    T: Into<Value>,
{
    fn into_condition(self) -> Result<Condition> {
        Ok(Condition::Eq(self.0.to_string(), self.1.into()))
    }
}

// Explicit operators: where_(("age", op::GT, 18)) or where_(("age", ">", 18))
impl<T, O> IntoCondition for (&str, O, T)
where
    T: Into<Value>,
    O: IntoOperator,
{
    fn into_condition(self) -> Result<Condition> {
        Ok(Condition::Compare(
            self.0.to_string(),
            self.1.into_operator()?,
            self.2.into(),
        ))
    }
}

// Arguments assembled at runtime: [column, value] or [column, operator, value]
impl IntoCondition for Vec<Value> {
    fn into_condition(self) -> Result<Condition> {
        let len = self.len();
        let mut args = self.into_iter();
        match (args.next(), args.next(), args.next(), len) {
            (Some(Value::String(column)), Some(value), None, 2) => Ok(Condition::Eq(column, value)),
            (Some(Value::String(column)), Some(Value::String(op)), Some(value), 3) => Ok(
                Condition::Compare(column, Operator::parse(&op)?, value),
            ),
            (_, _, _, 2 | 3) => Err(Error::invalid_argument_shape(
                "column and operator arguments must be text",
            )),
            _ => Err(Error::invalid_argument_shape(format!(
                "expected 2 or 3 predicate arguments, got {len}"
            ))),
        }
    }
}

/// Accumulated predicate text with its parallel argument list.
///
/// Every `?` in [`Clause::text`] has exactly one entry in [`Clause::args`], in
/// the same left-to-right order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Clause {
    text: String,
    args: Vec<Value>,
}

impl Clause {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a predicate, joined to earlier ones with `connector`.
    ///
    /// The first predicate gets no leading connector. A record condition with
    /// no set fields contributes nothing.
    ///
    /// Column names and custom operators are written into the SQL verbatim and
    /// must come from the program, never from end-user input.
    pub fn push(&mut self, connector: WhereConnector, condition: Condition) -> Result<()> {
        let mut args = Vec::new();
        let fragment = match condition {
            Condition::Fields(pairs) => pairs
                .into_iter()
                .map(|(column, value)| {
                    args.push(value);
                    format!("{column}=?")
                })
                .collect::<Vec<_>>()
                .join(connector.joiner()),
            Condition::Eq(column, value) => {
                args.push(value);
                format!("{column}=?")
            }
            Condition::Compare(column, operator, value) => {
                render_comparison(&column, &operator, value, &mut args)?
            }
        };

        if fragment.is_empty() {
            return Ok(());
        }
        if !self.text.is_empty() {
            self.text.push_str(connector.joiner());
        }
        self.text.push_str(&fragment);
        self.args.extend(args);
        Ok(())
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

fn render_comparison(
    column: &str,
    operator: &Operator,
    value: Value,
    args: &mut Vec<Value>,
) -> Result<String> {
    if operator.is_list() {
        let items = match value {
            Value::Array(items) => items,
            other => {
                return Err(Error::invalid_operand_type(format!(
                    "{operator} requires a list of values, got {}",
                    other.type_name()
                )));
            }
        };
        if items.is_empty() {
            return Err(Error::invalid_operand_type(format!(
                "{operator} requires at least one value"
            )));
        }
        let placeholders = vec!["?"; items.len()].join(",");
        args.extend(items);
        return Ok(format!("{column} {operator} ({placeholders})"));
    }

    if operator.is_nullary() {
        return Ok(format!("{column} {operator}"));
    }

    if let Value::Array(_) = value {
        return Err(Error::invalid_operand_type(format!(
            "a list operand needs IN or NOT IN, not {operator}"
        )));
    }

    args.push(value);
    if operator.is_keyword() {
        Ok(format!("{column} {operator} ?"))
    } else {
        Ok(format!("{column}{operator}?"))
    }
}

/// Aggregation function types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl std::fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregateFunction::Count => write!(f, "COUNT"),
            AggregateFunction::Sum => write!(f, "SUM"),
            AggregateFunction::Avg => write!(f, "AVG"),
            AggregateFunction::Min => write!(f, "MIN"),
            AggregateFunction::Max => write!(f, "MAX"),
        }
    }
}

/// Sort direction for ORDER BY clauses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl std::fmt::Display for SortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "ASC"),
            SortDirection::Desc => write!(f, "DESC"),
        }
    }
}

/// Trait to convert various types into column lists
pub trait IntoColumns {
    fn into_columns(self) -> Vec<String>;
}

impl IntoColumns for &str {
    fn into_columns(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoColumns for String {
    fn into_columns(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoColumns for Vec<String> {
    fn into_columns(self) -> Vec<String> {
        self
    }
}

impl IntoColumns for Vec<&str> {
    fn into_columns(self) -> Vec<String> {
        self.into_iter().map(|s| s.to_string()).collect()
    }
}

impl<const N: usize> IntoColumns for [&str; N] {
    fn into_columns(self) -> Vec<String> {
        self.iter().map(|s| s.to_string()).collect()
    }
}

impl IntoColumns for (&str, &str) {
    fn into_columns(self) -> Vec<String> {
        vec![self.0.to_string(), self.1.to_string()]
    }
}

impl IntoColumns for (&str, &str, &str) {
    fn into_columns(self) -> Vec<String> {
        vec![self.0.to_string(), self.1.to_string(), self.2.to_string()]
    }
}

impl IntoColumns for (&str, &str, &str, &str) {
    fn into_columns(self) -> Vec<String> {
        vec![
            self.0.to_string(),
            self.1.to_string(),
            self.2.to_string(),
            self.3.to_string(),
        ]
    }
}

/// Substitute each `?` with a literal rendering of the matching parameter.
///
/// For logs and `get_last_sql` only: the result is not injection-safe and is
/// never executed. Placeholders beyond the parameter list are left as `?`.
pub fn render_sql(sql: &str, params: &[Value]) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut params = params.iter();
    for (ch, placeholder) in scan_placeholders(sql) {
        match placeholder.then(|| params.next()).flatten() {
            Some(value) => out.push_str(&value.to_sql_literal()),
            None => out.push(ch),
        }
    }
    out
}

/// Number of `?` placeholders in `sql`, ignoring any inside quoted text
pub fn placeholder_count(sql: &str) -> usize {
    scan_placeholders(sql).filter(|(_, placeholder)| *placeholder).count()
}

// Pairs each char with whether it is a bind placeholder. A `?` inside '...',
// "..." or `...` is literal text.
fn scan_placeholders(sql: &str) -> impl Iterator<Item = (char, bool)> + '_ {
    sql.chars().scan(None, |quote: &mut Option<char>, ch| {
        let placeholder = match *quote {
            Some(open) => {
                if ch == open {
                    *quote = None;
                }
                false
            }
            None => {
                if matches!(ch, '\'' | '"' | '`') {
                    *quote = Some(ch);
                }
                ch == '?'
            }
        };
        Some((ch, placeholder))
    })
}
