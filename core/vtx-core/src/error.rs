//! Error types for the view rewriting engine.
//!
//! All public APIs return `VtxResult<T>`: no panics in library code.

use thiserror::Error;

/// Unified error type for all translation operations.
#[derive(Debug, Error)]
pub enum VtxError {
    /// View attribute count differs from its body's projected column count
    #[error("arity mismatch in view '{view}': {detail}")]
    ArityMismatch { view: String, detail: String },

    /// A write targets a view column whose defining expression has no unique inverse
    #[error("attribute '{attribute}' of '{view}' is not updatable: its definition is not invertible")]
    NotInvertible { view: String, attribute: String },

    /// Required privilege missing on a class
    #[error("authorization failure: {privilege} privilege on '{class}' is required")]
    AuthorizationDenied { privilege: String, class: String },

    /// A view is transitively defined in terms of itself
    #[error("cyclic view definition detected at '{class}'")]
    CyclicViewDefinition { class: String },

    /// Internal consistency failure (join term or path resolution)
    #[error("structural mismatch: {0}")]
    StructuralMismatch(String),

    /// Write through a view that has no legal update form
    #[error("'{class}' is not updatable")]
    NotUpdatable { class: String },

    /// UPDATE translated into nothing
    #[error("update translates to an empty statement")]
    UpdateEmpty,

    /// INSERT translated into nothing
    #[error("insert translates to an empty statement")]
    InsertEmpty,

    /// DELETE translated into nothing
    #[error("delete translates to an empty statement")]
    DeleteEmpty,

    /// Row violates a carried WITH CHECK OPTION predicate
    #[error("check option violation on view '{view}'")]
    CheckOptionViolation { view: String },

    /// Requested class does not exist
    #[error("class '{0}' not found")]
    ClassNotFound(String),

    /// Requested attribute does not exist
    #[error("attribute '{attribute}' not found in '{class}'")]
    AttributeNotFound { class: String, attribute: String },

    /// SQL parsing error
    #[error("SQL parse error: {message}\nSQL: {sql}")]
    SqlParse { message: String, sql: String },

    /// Unsupported SQL feature
    #[error("SQL feature not supported: {feature}\nHint: {hint}")]
    SqlNotSupported { feature: String, hint: String },

    /// Expression evaluation error
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Standard I/O error
    #[error("io error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

/// Result type alias for all translation operations.
pub type VtxResult<T> = Result<T, VtxError>;

impl VtxError {
    /// 내부 일관성 오류 생성 헬퍼
    pub(crate) fn structural(message: impl Into<String>) -> Self {
        VtxError::StructuralMismatch(message.into())
    }
}

// From 구현들
impl From<serde_json::Error> for VtxError {
    fn from(err: serde_json::Error) -> Self {
        VtxError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_arity_mismatch() {
        let err = VtxError::ArityMismatch {
            view: "v_emp".to_string(),
            detail: "query spec has more columns than attributes".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "arity mismatch in view 'v_emp': query spec has more columns than attributes"
        );
    }

    #[test]
    fn error_display_authorization() {
        let err = VtxError::AuthorizationDenied {
            privilege: "UPDATE".to_string(),
            class: "emp".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "authorization failure: UPDATE privilege on 'emp' is required"
        );
    }

    #[test]
    fn error_display_cycle() {
        let err = VtxError::CyclicViewDefinition {
            class: "va".to_string(),
        };
        assert_eq!(err.to_string(), "cyclic view definition detected at 'va'");
    }

    #[test]
    fn vtx_result_err() {
        let result: VtxResult<i32> = Err(VtxError::UpdateEmpty);
        assert!(result.is_err());
    }

    #[test]
    fn error_display_sql_parse() {
        let err = VtxError::SqlParse {
            message: "unexpected token".to_string(),
            sql: "SELECT * FORM emp".to_string(),
        };
        assert!(err.to_string().contains("unexpected token"));
        assert!(err.to_string().contains("SELECT * FORM emp"));
    }

    #[test]
    fn error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: VtxError = json_err.into();
        assert!(matches!(err, VtxError::Serialization(_)));
    }

    #[test]
    fn error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: VtxError = io.into();
        assert!(err.to_string().starts_with("io error"));
    }
}
