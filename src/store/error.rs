//! Errors reported by the strict (`try_*`) store API.
//!
//! The primary operations never fail: a contract violation there reads as an
//! absent value or a no-op write. These errors surface the same violations
//! to callers that want to handle them.

use super::FieldName;

/// A field access that violated the store's record layout.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The record has no field with this name.
    #[error("unknown field `{field}`")]
    UnknownField { field: FieldName },

    /// The field exists but holds a different value type.
    #[error("field `{field}` holds `{found}`, not `{expected}`")]
    TypeMismatch {
        field: FieldName,
        expected: &'static str,
        found: &'static str,
    },
}

impl StoreError {
    /// The field the failed access targeted.
    pub fn field(&self) -> &FieldName {
        match self {
            Self::UnknownField { field } | Self::TypeMismatch { field, .. } => field,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
