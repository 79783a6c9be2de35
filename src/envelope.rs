//! Query service response envelope.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{FormbaseError, FormbaseResult};

/// Status reported by a successful request.
pub const STATUS_SUCCESS: &str = "success";

/// An entry of the envelope's `errors` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryErrorEntry {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub msg: String,
}

/// Execution metrics reported with every response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metrics {
    pub elapsed_time: String,
    pub execution_time: String,
    pub result_count: u64,
    pub result_size: u64,
    pub error_count: u64,
}

/// Response body of the query service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultEnvelope {
    #[serde(rename = "requestID")]
    pub request_id: String,
    pub results: Vec<Value>,
    pub errors: Vec<QueryErrorEntry>,
    pub status: String,
    pub metrics: Metrics,
}

impl ResultEnvelope {
    /// Decode a response body.
    pub fn from_json(body: &str) -> FormbaseResult<Self> {
        serde_json::from_str(body)
            .map_err(|e| FormbaseError::Decode(format!("invalid result envelope: {}", e)))
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS && self.errors.is_empty()
    }

    /// Turn a failed status into [`FormbaseError::Query`].
    pub fn into_success(self) -> FormbaseResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(FormbaseError::Query {
                status: self.status,
                errors: self.errors,
            })
        }
    }

    /// Every result row as a JSON object.
    pub fn rows(&self) -> FormbaseResult<Vec<Map<String, Value>>> {
        self.results
            .iter()
            .enumerate()
            .map(|(i, row)| {
                row.as_object()
                    .cloned()
                    .ok_or_else(|| FormbaseError::Decode(format!("result row {} is not an object", i)))
            })
            .collect()
    }

    /// Rows unwrapped from the collection key they are nested under.
    ///
    /// `SELECT * FROM users` and `RETURNING *` wrap each document as
    /// `{"users": {...}}`. An empty `collection` returns the rows unchanged.
    pub fn collection_rows(&self, collection: &str) -> FormbaseResult<Vec<Map<String, Value>>> {
        if collection.is_empty() {
            return self.rows();
        }
        self.rows()?
            .into_iter()
            .enumerate()
            .map(|(i, mut row)| match row.remove(collection) {
                Some(Value::Object(doc)) => Ok(doc),
                Some(_) => Err(FormbaseError::Decode(format!(
                    "result row {}: '{}' is not an object",
                    i, collection
                ))),
                None => Err(FormbaseError::Decode(format!(
                    "result row {} has no '{}' key",
                    i, collection
                ))),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SUCCESS: &str = r#"{
        "requestID": "5c1f9e2a",
        "signature": {"*": "*"},
        "results": [{"users": {"name": "Al", "age": 42}}],
        "status": "success",
        "metrics": {"elapsedTime": "4.2ms", "executionTime": "4.1ms", "resultCount": 1, "resultSize": 38, "mutationCount": 1}
    }"#;

    #[test]
    fn test_decode_success() {
        let env = ResultEnvelope::from_json(SUCCESS).unwrap();
        assert_eq!(env.request_id, "5c1f9e2a");
        assert!(env.is_success());
        assert_eq!(env.metrics.result_count, 1);
        assert_eq!(env.metrics.elapsed_time, "4.2ms");
        assert_eq!(env.metrics.error_count, 0);
    }

    #[test]
    fn test_rows_and_collection_rows() {
        let env = ResultEnvelope::from_json(SUCCESS).unwrap();
        let rows = env.rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].contains_key("users"));

        let docs = env.collection_rows("users").unwrap();
        assert_eq!(docs[0].get("name"), Some(&json!("Al")));

        assert_eq!(env.collection_rows("").unwrap(), rows);
    }

    #[test]
    fn test_collection_rows_missing_key() {
        let env = ResultEnvelope::from_json(SUCCESS).unwrap();
        let err = env.collection_rows("orders").unwrap_err();
        assert_eq!(err.to_string(), "Decode error: result row 0 has no 'orders' key");
    }

    #[test]
    fn test_scalar_rows_rejected() {
        let env = ResultEnvelope {
            results: vec![json!(1)],
            status: STATUS_SUCCESS.to_string(),
            ..Default::default()
        };
        assert!(matches!(env.rows(), Err(FormbaseError::Decode(_))));
    }

    #[test]
    fn test_failed_status() {
        let body = r#"{
            "requestID": "r2",
            "errors": [{"code": 12009, "msg": "DML Error, possible causes include CAS mismatch"}],
            "status": "errors",
            "metrics": {"errorCount": 1}
        }"#;
        let env = ResultEnvelope::from_json(body).unwrap();
        assert!(!env.is_success());
        match env.into_success() {
            Err(FormbaseError::Query { status, errors }) => {
                assert_eq!(status, "errors");
                assert_eq!(errors[0].code, 12009);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_body() {
        let err = ResultEnvelope::from_json("<html>502 Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, FormbaseError::Decode(_)));
    }
}
