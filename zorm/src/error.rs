//! Error types for zorm

use thiserror::Error;

/// The main error type for zorm operations
#[derive(Error, Debug)]
pub enum Error {
    /// Error reported by the sqlx driver
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A connection failure annotated with the engine call site that issued it
    #[error("File: {file}:{line}, {source}")]
    Driver {
        file: &'static str,
        line: u32,
        #[source]
        source: Box<Error>,
    },

    /// Wrong number or type of arguments passed to a builder call
    #[error("Invalid argument shape: {message}")]
    InvalidArgumentShape { message: String },

    /// An operand that does not fit its operator (e.g. IN with a scalar)
    #[error("Invalid operand type: {message}")]
    InvalidOperandType { message: String },

    /// An operator outside the accepted set
    #[error("Unsupported operator '{operator}'")]
    InvalidOperator { operator: String },

    /// Insert/update input that maps to no supported statement shape
    #[error("Unsupported input kind: {message}")]
    UnsupportedInputKind { message: String },

    /// A scanned cell that cannot be stored in its destination field
    #[error("Cannot coerce column '{column}' into field '{field}': {message}")]
    TypeCoercion {
        column: String,
        field: String,
        message: String,
    },

    /// `select_one` / `find_one` matched no rows
    #[error("No rows returned")]
    NotFound,

    /// Invalid query configuration
    #[error("Invalid query: {message}")]
    InvalidQuery { message: String },

    /// Invalid or missing connection configuration
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Convenience Result type for zorm operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new invalid argument shape error
    pub fn invalid_argument_shape(message: impl Into<String>) -> Self {
        Self::InvalidArgumentShape {
            message: message.into(),
        }
    }

    /// Create a new invalid operand type error
    pub fn invalid_operand_type(message: impl Into<String>) -> Self {
        Self::InvalidOperandType {
            message: message.into(),
        }
    }

    /// Create a new unsupported input kind error
    pub fn unsupported_input(message: impl Into<String>) -> Self {
        Self::UnsupportedInputKind {
            message: message.into(),
        }
    }

    /// Create a new type coercion error
    pub fn type_coercion(
        column: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::TypeCoercion {
            column: column.into(),
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new invalid query error
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Wrap a connection failure with the location of the caller
    #[track_caller]
    pub fn driver(source: Error) -> Self {
        let location = std::panic::Location::caller();
        Self::Driver {
            file: location.file(),
            line: location.line(),
            source: Box::new(source),
        }
    }

    /// A copy of a pending builder error, returned again by each terminal call.
    ///
    /// Builder errors only carry text. Anything else is reported through its
    /// message as an invalid query.
    pub(crate) fn replay(&self) -> Self {
        match self {
            Self::InvalidArgumentShape { message } => Self::invalid_argument_shape(message.clone()),
            Self::InvalidOperandType { message } => Self::invalid_operand_type(message.clone()),
            Self::InvalidOperator { operator } => Self::InvalidOperator {
                operator: operator.clone(),
            },
            Self::UnsupportedInputKind { message } => Self::unsupported_input(message.clone()),
            Self::InvalidQuery { message } => Self::invalid_query(message.clone()),
            other => Self::invalid_query(other.to_string()),
        }
    }

    /// Whether this error (or the driver error it wraps) is `NotFound`
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound => true,
            Self::Driver { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}
