//! Conversion of raw textual cells into typed field values

use crate::Value;
use crate::record::FieldKind;
use std::fmt;
use thiserror::Error;

/// Why a cell or value could not be stored in a field
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ConversionError {
    message: String,
}

impl ConversionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub(crate) fn mismatch(expected: &str, found: &Value) -> Self {
        Self::new(format!("expected {expected}, found {}", found.type_name()))
    }

    pub(crate) fn out_of_range(target: &str) -> Self {
        Self::new(format!("value out of range for {target}"))
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Parse a raw cell into a value of `kind`. A missing cell (SQL NULL) becomes `Value::Null`.
pub fn coerce(cell: Option<&str>, kind: FieldKind) -> Result<Value, ConversionError> {
    let Some(raw) = cell else {
        return Ok(Value::Null);
    };

    match kind {
        FieldKind::Int => raw
            .trim()
            .parse::<i64>()
            .map(Value::I64)
            .map_err(|e| parse_failure(raw, "integer", e)),
        FieldKind::UInt => raw
            .trim()
            .parse::<u64>()
            .map(Value::U64)
            .map_err(|e| parse_failure(raw, "unsigned integer", e)),
        FieldKind::F32 => raw
            .trim()
            .parse::<f32>()
            .map(Value::F32)
            .map_err(|e| parse_failure(raw, "float32", e)),
        FieldKind::F64 => raw
            .trim()
            .parse::<f64>()
            .map(Value::F64)
            .map_err(|e| parse_failure(raw, "float64", e)),
        FieldKind::Bool => parse_bool(raw.trim())
            .map(Value::Bool)
            .ok_or_else(|| ConversionError::new(format!("cannot parse {raw:?} as boolean"))),
        FieldKind::Text => Ok(Value::String(raw.to_string())),
        FieldKind::Bytes => Ok(Value::Bytes(raw.as_bytes().to_vec())),
        FieldKind::Opaque => Err(ConversionError::new("field is not mapped")),
    }
}

fn parse_failure(raw: &str, target: &str, err: impl fmt::Display) -> ConversionError {
    ConversionError::new(format!("cannot parse {raw:?} as {target}: {err}"))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}
