//! Record metadata: how a struct's fields map onto table columns.
//!
//! A record type describes its fields once through [`FieldDef`]s (normally
//! generated by `#[derive(Record)]`), and [`RecordDescriptor::resolve`] turns
//! that declaration into the ordered column mapping used by every statement.
//!
//! Tag syntax is a comma-separated directive string: the first segment names
//! the column (falls back to the field name when empty), and an
//! `auto_increment` marker anywhere in the tag (case-insensitive) keeps the
//! field out of INSERT / REPLACE column lists.

use crate::Value;
use crate::coerce::ConversionError;

/// Declared primitive kind of a record field, driving value coercion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Int,
    UInt,
    F32,
    F64,
    Bool,
    Text,
    Bytes,
    /// Field the engine never reads or writes (non-exported fields)
    Opaque,
}

/// Raw field declaration, in struct order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub tag: Option<&'static str>,
    pub kind: FieldKind,
    pub exported: bool,
}

impl FieldDef {
    /// An exported field
    pub const fn new(name: &'static str, tag: Option<&'static str>, kind: FieldKind) -> Self {
        Self {
            name,
            tag,
            kind,
            exported: true,
        }
    }

    /// A field that is not visible outside its type and never mapped
    pub const fn hidden(name: &'static str) -> Self {
        Self {
            name,
            tag: None,
            kind: FieldKind::Opaque,
            exported: false,
        }
    }
}

/// A resolved field: one exported struct field bound to one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Position of the field in the struct declaration (hidden fields included)
    pub index: usize,
    pub name: &'static str,
    pub column: String,
    pub kind: FieldKind,
    pub auto_increment: bool,
}

/// Ordered column mapping of a record type
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordDescriptor {
    fields: Vec<FieldDescriptor>,
}

impl RecordDescriptor {
    /// Resolve raw declarations into the column mapping.
    ///
    /// Deterministic and side-effect free; callers are free to cache the result.
    pub fn resolve(defs: &[FieldDef]) -> Self {
        let fields = defs
            .iter()
            .enumerate()
            .filter(|(_, def)| def.exported)
            .map(|(index, def)| {
                let (column, auto_increment) = parse_tag(def.name, def.tag);
                FieldDescriptor {
                    index,
                    name: def.name,
                    column,
                    kind: def.kind,
                    auto_increment,
                }
            })
            .collect();

        Self { fields }
    }

    /// All mapped fields in declaration order
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Fields that take part in INSERT / REPLACE
    pub fn insertable(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| !f.auto_increment)
    }

    /// First field bound to `column`
    pub fn by_column(&self, column: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.column == column)
    }

    pub fn columns(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.column.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn parse_tag(field_name: &str, tag: Option<&str>) -> (String, bool) {
    let Some(tag) = tag else {
        return (field_name.to_string(), false);
    };

    let auto_increment = tag.to_ascii_lowercase().contains("auto_increment");
    let first = tag.split(',').next().unwrap_or_default().trim();
    let column = if first.is_empty() {
        field_name.to_string()
    } else {
        first.to_string()
    };

    (column, auto_increment)
}

/// A struct whose fields map onto table columns.
///
/// Usually derived:
///
/// ```
/// use zorm::Record;
///
/// #[derive(Debug, Default, Record)]
/// struct User {
///     #[sql = "uid,auto_increment"]
///     pub uid: i64,
///     #[sql = "username"]
///     pub username: String,
///     pub departname: String,
///     cache_hits: u32,
/// }
///
/// let columns = User::descriptor().columns();
/// assert_eq!(columns, vec!["uid", "username", "departname"]);
/// ```
///
/// `Default` is how a fresh destination record is allocated when scanning rows.
pub trait Record: Default + Send {
    /// Column mapping for this type
    fn descriptor() -> &'static RecordDescriptor;

    /// Current value of the field at declaration `index`
    fn field_value(&self, index: usize) -> Value;

    /// Store `value` into the field at declaration `index`
    fn set_field(&mut self, index: usize, value: Value) -> Result<(), ConversionError>;
}

/// A Rust type that can live in a record field
pub trait SqlField: Sized {
    const KIND: FieldKind;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self, ConversionError>;
}

macro_rules! signed_field {
    ($($ty:ty),*) => {$(
        impl SqlField for $ty {
            const KIND: FieldKind = FieldKind::Int;

            fn to_value(&self) -> Value {
                Value::from(*self)
            }

            fn from_value(value: Value) -> Result<Self, ConversionError> {
                let converted = match value {
                    Value::Null => return Ok(0),
                    Value::I32(v) => <$ty>::try_from(v).ok(),
                    Value::I64(v) => <$ty>::try_from(v).ok(),
                    Value::U64(v) => <$ty>::try_from(v).ok(),
                    Value::Bool(b) => Some(<$ty>::from(b)),
                    other => return Err(ConversionError::mismatch(stringify!($ty), &other)),
                };
                converted.ok_or_else(|| ConversionError::out_of_range(stringify!($ty)))
            }
        }
    )*};
}

macro_rules! unsigned_field {
    ($($ty:ty),*) => {$(
        impl SqlField for $ty {
            const KIND: FieldKind = FieldKind::UInt;

            fn to_value(&self) -> Value {
                Value::from(*self)
            }

            fn from_value(value: Value) -> Result<Self, ConversionError> {
                let converted = match value {
                    Value::Null => return Ok(0),
                    Value::I32(v) => <$ty>::try_from(v).ok(),
                    Value::I64(v) => <$ty>::try_from(v).ok(),
                    Value::U64(v) => <$ty>::try_from(v).ok(),
                    Value::Bool(b) => Some(<$ty>::from(b)),
                    other => return Err(ConversionError::mismatch(stringify!($ty), &other)),
                };
                converted.ok_or_else(|| ConversionError::out_of_range(stringify!($ty)))
            }
        }
    )*};
}

signed_field!(i8, i16, i32, i64, isize);
unsigned_field!(u8, u16, u32, u64, usize);

impl SqlField for f32 {
    const KIND: FieldKind = FieldKind::F32;

    fn to_value(&self) -> Value {
        Value::F32(*self)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(0.0),
            Value::F32(v) => Ok(v),
            Value::F64(v) => Ok(v as f32),
            Value::I32(v) => Ok(v as f32),
            Value::I64(v) => Ok(v as f32),
            other => Err(ConversionError::mismatch("f32", &other)),
        }
    }
}

impl SqlField for f64 {
    const KIND: FieldKind = FieldKind::F64;

    fn to_value(&self) -> Value {
        Value::F64(*self)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(0.0),
            Value::F64(v) => Ok(v),
            Value::F32(v) => Ok(v.into()),
            Value::I32(v) => Ok(v.into()),
            Value::I64(v) => Ok(v as f64),
            other => Err(ConversionError::mismatch("f64", &other)),
        }
    }
}

impl SqlField for bool {
    const KIND: FieldKind = FieldKind::Bool;

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(false),
            Value::Bool(b) => Ok(b),
            Value::I32(v) => Ok(v != 0),
            Value::I64(v) => Ok(v != 0),
            Value::U64(v) => Ok(v != 0),
            other => Err(ConversionError::mismatch("bool", &other)),
        }
    }
}

impl SqlField for String {
    const KIND: FieldKind = FieldKind::Text;

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(String::new()),
            Value::String(s) => Ok(s),
            Value::Bytes(b) => Ok(String::from_utf8_lossy(&b).into_owned()),
            other => Err(ConversionError::mismatch("String", &other)),
        }
    }
}

impl SqlField for Vec<u8> {
    const KIND: FieldKind = FieldKind::Bytes;

    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Bytes(b) => Ok(b),
            Value::String(s) => Ok(s.into_bytes()),
            other => Err(ConversionError::mismatch("Vec<u8>", &other)),
        }
    }
}

impl<T: SqlField> SqlField for Option<T> {
    const KIND: FieldKind = T::KIND;

    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_defs() -> Vec<FieldDef> {
        vec![
            FieldDef::new("Uid", Some("uid, auto_increment"), FieldKind::Int),
            FieldDef::new("Username", Some(" username "), FieldKind::Text),
            FieldDef::hidden("password"),
            FieldDef::new("Departname", None, FieldKind::Text),
            FieldDef::new("Status", Some(",omitempty"), FieldKind::Int),
        ]
    }

    #[test]
    fn test_resolve_keeps_declaration_order_and_skips_hidden() {
        let descriptor = RecordDescriptor::resolve(&user_defs());
        assert_eq!(
            descriptor.columns(),
            vec!["uid", "username", "Departname", "Status"]
        );
        let indexes: Vec<usize> = descriptor.fields().iter().map(|f| f.index).collect();
        assert_eq!(indexes, vec![0, 1, 3, 4]);
    }

    #[test]
    fn test_column_defaults_to_field_name() {
        let descriptor = RecordDescriptor::resolve(&user_defs());
        assert_eq!(descriptor.fields()[2].column, "Departname");
        // empty name segment falls back too
        assert_eq!(descriptor.fields()[3].column, "Status");
    }

    #[test]
    fn test_auto_increment_is_case_insensitive_substring() {
        let defs = [
            FieldDef::new("Id", Some("id,AUTO_INCREMENT"), FieldKind::Int),
            FieldDef::new("Seq", Some("seq,primary_auto_increment_key"), FieldKind::Int),
            FieldDef::new("Name", Some("name"), FieldKind::Text),
        ];
        let descriptor = RecordDescriptor::resolve(&defs);
        let insertable: Vec<&str> = descriptor.insertable().map(|f| f.column.as_str()).collect();
        assert_eq!(insertable, vec!["name"]);
        assert_eq!(descriptor.len(), 3);
    }

    #[test]
    fn test_by_column_finds_first_match() {
        let defs = [
            FieldDef::new("A", Some("dup"), FieldKind::Int),
            FieldDef::new("B", Some("dup"), FieldKind::Text),
        ];
        let descriptor = RecordDescriptor::resolve(&defs);
        assert_eq!(descriptor.by_column("dup").map(|f| f.name), Some("A"));
        assert!(descriptor.by_column("missing").is_none());
    }

    #[test]
    fn test_resolve_is_deterministic() {
        assert_eq!(
            RecordDescriptor::resolve(&user_defs()),
            RecordDescriptor::resolve(&user_defs())
        );
    }

    #[test]
    fn test_integer_fields_check_range() {
        assert_eq!(i8::from_value(Value::I64(-12)).unwrap(), -12);
        assert!(i8::from_value(Value::I64(300)).is_err());
        assert!(u16::from_value(Value::I64(-1)).is_err());
        assert_eq!(u64::from_value(Value::U64(u64::MAX)).unwrap(), u64::MAX);
        assert_eq!(i32::from_value(Value::Null).unwrap(), 0);
    }

    #[test]
    fn test_option_fields() {
        assert_eq!(Option::<String>::from_value(Value::Null).unwrap(), None);
        assert_eq!(
            Option::<i64>::from_value(Value::I64(5)).unwrap(),
            Some(5)
        );
        assert_eq!(Some(3i32).to_value(), Value::I32(3));
        assert_eq!(None::<i32>.to_value(), Value::Null);
        assert_eq!(<Option<f32> as SqlField>::KIND, FieldKind::F32);
    }

    #[test]
    fn test_text_rejects_numbers() {
        let err = String::from_value(Value::I64(1)).unwrap_err();
        assert!(err.to_string().contains("String"));
    }
}
