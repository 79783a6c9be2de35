//! Error types for formbase.

use thiserror::Error;

use crate::envelope::QueryErrorEntry;
use crate::schema::FieldKind;

/// The main error type for formbase operations.
#[derive(Debug, Error)]
pub enum FormbaseError {
    /// Failed to parse a field spec string.
    #[error("Parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    /// The record description could not be turned into a schema.
    #[error("Schema error: {0}")]
    Schema(String),

    /// A submitted value does not parse as its declared kind (strict mode only).
    #[error("Cannot coerce '{value}' to {kind} for field '{key}'")]
    Coercion {
        key: String,
        kind: FieldKind,
        value: String,
    },

    /// Collection name that cannot be placed in a statement.
    #[error("Invalid identifier: '{0}'")]
    InvalidIdentifier(String),

    /// No document key was supplied.
    #[error("Missing document key (field '{0}')")]
    MissingKey(String),

    /// Document serialization failed.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The query service answered with a non-2xx status.
    ///
    /// `errors` holds the entries of the response envelope when the body is
    /// one, and is empty otherwise.
    #[error("HTTP {}: {}", .status, http_detail(.body, .errors))]
    Http {
        status: u16,
        body: String,
        errors: Vec<QueryErrorEntry>,
    },

    /// The response body was not a result envelope.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The query service reported a failed status.
    #[error("Query failed with status '{}': {}", .status, format_errors(.errors))]
    Query {
        status: String,
        errors: Vec<QueryErrorEntry>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FormbaseError {
    /// Create a parse error at the given position.
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }

    /// Create a coercion error.
    pub fn coercion(key: impl Into<String>, kind: FieldKind, value: impl Into<String>) -> Self {
        Self::Coercion {
            key: key.into(),
            kind,
            value: value.into(),
        }
    }
}

fn format_errors(errors: &[QueryErrorEntry]) -> String {
    if errors.is_empty() {
        return "no error details".to_string();
    }
    errors
        .iter()
        .map(|e| format!("[{}] {}", e.code, e.msg))
        .collect::<Vec<_>>()
        .join("; ")
}

fn http_detail(body: &str, errors: &[QueryErrorEntry]) -> String {
    if errors.is_empty() {
        body.to_string()
    } else {
        format_errors(errors)
    }
}

/// Result type alias for formbase operations.
pub type FormbaseResult<T> = Result<T, FormbaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FormbaseError::parse(5, "unexpected character");
        assert_eq!(
            err.to_string(),
            "Parse error at position 5: unexpected character"
        );
    }

    #[test]
    fn test_query_error_display() {
        let err = FormbaseError::Query {
            status: "errors".to_string(),
            errors: vec![QueryErrorEntry {
                code: 12009,
                msg: "Duplicate Key: u::1".to_string(),
            }],
        };
        assert_eq!(
            err.to_string(),
            "Query failed with status 'errors': [12009] Duplicate Key: u::1"
        );
    }

    #[test]
    fn test_http_error_display() {
        let raw = FormbaseError::Http {
            status: 503,
            body: "service unavailable".to_string(),
            errors: Vec::new(),
        };
        assert_eq!(raw.to_string(), "HTTP 503: service unavailable");

        let structured = FormbaseError::Http {
            status: 400,
            body: "{}".to_string(),
            errors: vec![QueryErrorEntry {
                code: 3000,
                msg: "syntax error - at order".to_string(),
            }],
        };
        assert_eq!(structured.to_string(), "HTTP 400: [3000] syntax error - at order");
    }

    #[test]
    fn test_coercion_error_display() {
        let err = FormbaseError::coercion("age", FieldKind::Int, "abc");
        assert_eq!(err.to_string(), "Cannot coerce 'abc' to int for field 'age'");
    }
}
