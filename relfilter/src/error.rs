use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, RelfilterError>;

/// Errors raised while building stores, parsing filters or evaluating queries.
///
/// Every error is terminal for the call that produced it. Queries borrow the
/// store immutably, so a failed query never leaves partial state behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelfilterError {
    // Filter errors
    #[error("schema mismatch: entity '{entity}' has no field or relation '{field}'")]
    SchemaMismatch { entity: String, field: String },

    #[error("unknown operator '{operator}'")]
    UnknownOperator { operator: String },

    #[error("invalid filter shape: {message}")]
    InvalidFilterShape { message: String },

    #[error("type mismatch on '{entity}.{field}': expected {expected}, got {actual}")]
    TypeMismatch {
        entity: String,
        field: String,
        expected: String,
        actual: String,
    },

    #[error("filter nesting exceeds the configured maximum depth of {max_depth}")]
    FilterTooDeep { max_depth: usize },

    #[error("unknown entity '{entity}'")]
    UnknownEntity { entity: String },

    // Store errors
    #[error("missing value for non-nullable field '{entity}.{field}'")]
    MissingField { entity: String, field: String },

    #[error("duplicate primary key {key} for entity '{entity}'")]
    DuplicateKey { entity: String, key: String },

    #[error("unique constraint violated on '{entity}.{field}' by value {value}")]
    UniqueViolation {
        entity: String,
        field: String,
        value: String,
    },

    #[error("'{entity}.{relation}' references missing {target} row {key}")]
    DanglingReference {
        entity: String,
        relation: String,
        target: String,
        key: String,
    },

    #[error("autoincrement sequence of '{entity}.{field}' is exhausted")]
    SequenceExhausted { entity: String, field: String },
}

/// Discriminant of [`RelfilterError`], convenient for matching in tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    SchemaMismatch,
    UnknownOperator,
    InvalidFilterShape,
    TypeMismatch,
    FilterTooDeep,
    UnknownEntity,
    MissingField,
    DuplicateKey,
    UniqueViolation,
    DanglingReference,
    SequenceExhausted,
}

impl RelfilterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SchemaMismatch { .. } => ErrorKind::SchemaMismatch,
            Self::UnknownOperator { .. } => ErrorKind::UnknownOperator,
            Self::InvalidFilterShape { .. } => ErrorKind::InvalidFilterShape,
            Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Self::FilterTooDeep { .. } => ErrorKind::FilterTooDeep,
            Self::UnknownEntity { .. } => ErrorKind::UnknownEntity,
            Self::MissingField { .. } => ErrorKind::MissingField,
            Self::DuplicateKey { .. } => ErrorKind::DuplicateKey,
            Self::UniqueViolation { .. } => ErrorKind::UniqueViolation,
            Self::DanglingReference { .. } => ErrorKind::DanglingReference,
            Self::SequenceExhausted { .. } => ErrorKind::SequenceExhausted,
        }
    }

    /// Create a schema mismatch error
    pub fn schema_mismatch(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            entity: entity.into(),
            field: field.into(),
        }
    }

    /// Create an unknown operator error
    pub fn unknown_operator(operator: impl Into<String>) -> Self {
        Self::UnknownOperator {
            operator: operator.into(),
        }
    }

    /// Create an invalid filter shape error
    pub fn invalid_filter_shape(message: impl Into<String>) -> Self {
        Self::InvalidFilterShape {
            message: message.into(),
        }
    }

    /// Create a type mismatch error
    pub fn type_mismatch(
        entity: impl Into<String>,
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            entity: entity.into(),
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn unknown_entity(entity: impl Into<String>) -> Self {
        Self::UnknownEntity {
            entity: entity.into(),
        }
    }

    pub fn missing_field(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            entity: entity.into(),
            field: field.into(),
        }
    }

    pub fn sequence_exhausted(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self::SequenceExhausted {
            entity: entity.into(),
            field: field.into(),
        }
    }

    /// Whether the error came from a malformed filter rather than from store setup
    pub fn is_filter_error(&self) -> bool {
        matches!(
            self,
            Self::SchemaMismatch { .. }
                | Self::UnknownOperator { .. }
                | Self::InvalidFilterShape { .. }
                | Self::TypeMismatch { .. }
                | Self::FilterTooDeep { .. }
                | Self::UnknownEntity { .. }
        )
    }
}
