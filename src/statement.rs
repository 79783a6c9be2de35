//! N1QL statement rendering.
//!
//! Renders documents into INSERT/UPSERT statements against a collection and
//! wraps statements in the JSON envelope posted to the query service.

use std::borrow::Cow;
use std::fmt;

use serde::Serialize;

use crate::coerce::ProjectedRecord;
use crate::error::{FormbaseError, FormbaseResult};

/// Trait for rendering a value into statement text.
pub trait ToStatement {
    fn to_statement(&self) -> FormbaseResult<String>;
}

/// Write verb of a key/value mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// Fails if the key already exists.
    Insert,
    /// Creates or replaces.
    Upsert,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationKind::Insert => f.write_str("INSERT"),
            MutationKind::Upsert => f.write_str("UPSERT"),
        }
    }
}

/// A document write against one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub kind: MutationKind,
    pub collection: String,
    pub key: String,
    /// Serialized JSON document, inserted verbatim.
    pub document: String,
}

impl Mutation {
    pub fn new(
        kind: MutationKind,
        collection: impl Into<String>,
        key: impl Into<String>,
        document: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            collection: collection.into(),
            key: key.into(),
            document: document.into(),
        }
    }

    pub fn insert(collection: impl Into<String>, key: impl Into<String>, document: impl Into<String>) -> Self {
        Self::new(MutationKind::Insert, collection, key, document)
    }

    pub fn upsert(collection: impl Into<String>, key: impl Into<String>, document: impl Into<String>) -> Self {
        Self::new(MutationKind::Upsert, collection, key, document)
    }

    /// Mutation writing a projected record's document.
    pub fn from_record(
        kind: MutationKind,
        collection: impl Into<String>,
        key: impl Into<String>,
        record: &ProjectedRecord,
    ) -> FormbaseResult<Self> {
        Ok(Self::new(kind, collection, key, record.to_json()?))
    }
}

impl ToStatement for Mutation {
    fn to_statement(&self) -> FormbaseResult<String> {
        let collection = quote_collection(&self.collection)?;
        let key = key_literal(&self.key)?;
        Ok(format!(
            "{} INTO {} (KEY, VALUE) VALUES ({}, {}) RETURNING *",
            self.kind, collection, key, self.document
        ))
    }
}

/// Render an INSERT statement.
///
/// ```
/// use formbase::statement::build_insert_statement;
///
/// let sql = build_insert_statement("users", "u::1", r#"{"name":"Al"}"#).unwrap();
/// assert_eq!(sql, r#"INSERT INTO users (KEY, VALUE) VALUES ("u::1", {"name":"Al"}) RETURNING *"#);
/// ```
pub fn build_insert_statement(collection: &str, key: &str, document: &str) -> FormbaseResult<String> {
    Mutation::insert(collection, key, document).to_statement()
}

/// Render an UPSERT statement.
pub fn build_upsert_statement(collection: &str, key: &str, document: &str) -> FormbaseResult<String> {
    Mutation::upsert(collection, key, document).to_statement()
}

/// N1QL reserved words that must be back-quoted when used as a keyspace.
pub const RESERVED_WORDS: &[&str] = &[
    "advise", "all", "alter", "analyze", "and", "any", "array", "as", "asc", "at",
    "begin", "binary", "boolean", "break", "bucket", "build", "by", "call", "case",
    "cast", "cluster", "collate", "collection", "commit", "committed", "connect",
    "continue", "correlated", "cover", "create", "current", "database", "dataset",
    "datastore", "declare", "decrement", "delete", "derived", "desc", "describe",
    "distinct", "do", "drop", "each", "element", "else", "end", "every", "except",
    "exclude", "execute", "exists", "explain", "false", "fetch", "filter", "first",
    "flatten", "flatten_keys", "flush", "following", "for", "force", "from", "fts",
    "function", "golang", "grant", "group", "groups", "gsi", "hash", "having", "if",
    "ignore", "ilike", "in", "include", "increment", "index", "infer", "inline",
    "inner", "insert", "intersect", "into", "is", "isolation", "javascript", "join",
    "key", "keys", "keyspace", "known", "language", "last", "lateral", "left", "let",
    "letting", "level", "like", "limit", "lsm", "map", "mapping", "matched",
    "materialized", "merge", "minus", "missing", "namespace", "nest", "nl", "no",
    "not", "nth_value", "null", "nulls", "number", "object", "offset", "on",
    "option", "options", "or", "order", "others", "outer", "over", "parse",
    "partition", "password", "path", "pool", "preceding", "prepare", "primary",
    "private", "privilege", "probe", "procedure", "public", "range", "raw", "realm",
    "reduce", "rename", "respect", "return", "returning", "revoke", "right", "role",
    "rollback", "row", "rows", "satisfies", "savepoint", "schema", "scope",
    "select", "self", "semi", "set", "show", "some", "start", "statistics",
    "string", "system", "then", "ties", "to", "tran", "transaction", "trigger",
    "true", "truncate", "unbounded", "under", "union", "unique", "unknown",
    "unnest", "unset", "update", "upsert", "use", "user", "using", "validate",
    "value", "valued", "values", "via", "view", "when", "where", "while", "window",
    "with", "within", "work", "xor",
];

/// Validate a collection name for use as a keyspace.
///
/// Plain identifiers are used as-is unless they are reserved words. Reserved
/// words and names that also contain `-`, `.` or `%` (legal in bucket names)
/// are back-quoted. An already back-quoted name is accepted if it has no inner
/// back-quote.
pub fn quote_collection(name: &str) -> FormbaseResult<Cow<'_, str>> {
    let invalid = || FormbaseError::InvalidIdentifier(name.to_string());

    if let Some(inner) = name.strip_prefix('`').and_then(|n| n.strip_suffix('`')) {
        if inner.is_empty() || inner.contains('`') {
            return Err(invalid());
        }
        return Ok(Cow::Borrowed(name));
    }

    let mut chars = name.chars();
    let first = chars.next().ok_or_else(invalid)?;
    let plain = (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain && !RESERVED_WORDS.contains(&name.to_lowercase().as_str()) {
        return Ok(Cow::Borrowed(name));
    }

    if name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '%'))
    {
        return Ok(Cow::Owned(format!("`{}`", name)));
    }

    Err(invalid())
}

/// Render a document key as a double-quoted string literal.
pub fn key_literal(key: &str) -> FormbaseResult<String> {
    if key.is_empty() {
        return Err(FormbaseError::MissingKey("document key".to_string()));
    }
    Ok(serde_json::to_string(key)?)
}

/// Request body of the query service.
#[derive(Debug, Clone, Serialize)]
pub struct StatementEnvelope<'a> {
    pub statement: &'a str,
    #[serde(skip_serializing_if = "is_false")]
    pub pretty: bool,
}

impl<'a> StatementEnvelope<'a> {
    pub fn new(statement: &'a str) -> Self {
        Self {
            statement,
            pretty: false,
        }
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn to_json(&self) -> FormbaseResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coerce::CoercionMode;
    use crate::form::FormValues;
    use crate::schema::Schema;

    #[test]
    fn test_insert() {
        let sql = build_insert_statement("users", "u::1", r#"{"name":"Al"}"#).unwrap();
        assert_eq!(
            sql,
            r#"INSERT INTO users (KEY, VALUE) VALUES ("u::1", {"name":"Al"}) RETURNING *"#
        );
    }

    #[test]
    fn test_upsert() {
        let sql = build_upsert_statement("users", "u::1", r#"{"name":"Al"}"#).unwrap();
        assert_eq!(
            sql,
            r#"UPSERT INTO users (KEY, VALUE) VALUES ("u::1", {"name":"Al"}) RETURNING *"#
        );
    }

    #[test]
    fn test_key_is_escaped() {
        let sql = build_insert_statement("users", r#"a"b\c"#, "{}").unwrap();
        assert_eq!(
            sql,
            r#"INSERT INTO users (KEY, VALUE) VALUES ("a\"b\\c", {}) RETURNING *"#
        );
    }

    #[test]
    fn test_empty_key_rejected() {
        let err = build_upsert_statement("users", "", "{}").unwrap_err();
        assert!(matches!(err, FormbaseError::MissingKey(_)));
    }

    #[test]
    fn test_collection_quoting() {
        assert_eq!(quote_collection("users").unwrap(), "users");
        assert_eq!(quote_collection("_tmp2").unwrap(), "_tmp2");
        assert_eq!(quote_collection("travel-sample").unwrap(), "`travel-sample`");
        assert_eq!(quote_collection("2024.logs").unwrap(), "`2024.logs`");
        assert_eq!(quote_collection("`master_erp`").unwrap(), "`master_erp`");
    }

    #[test]
    fn test_reserved_collection_quoted() {
        assert_eq!(quote_collection("order").unwrap(), "`order`");
        assert_eq!(quote_collection("User").unwrap(), "`User`");
        assert_eq!(quote_collection("system").unwrap(), "`system`");
        assert_eq!(quote_collection("orders").unwrap(), "orders");
        assert_eq!(
            build_insert_statement("value", "k", "{}").unwrap(),
            r#"INSERT INTO `value` (KEY, VALUE) VALUES ("k", {}) RETURNING *"#
        );
    }

    #[test]
    fn test_collection_rejected() {
        for name in ["", "users; DELETE FROM x", "a b", "``", "`a`b`", "users)"] {
            assert!(
                matches!(quote_collection(name), Err(FormbaseError::InvalidIdentifier(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_mutation_from_record() {
        let schema = Schema::from_specs(["name", "age:int"]).unwrap();
        let form = FormValues::new().with("name", "Al").with("age", "42");
        let record = ProjectedRecord::from_form(&schema, &form, CoercionMode::Lenient).unwrap();
        let mutation = Mutation::from_record(MutationKind::Upsert, "travel-sample", "u::1", &record).unwrap();
        assert_eq!(
            mutation.to_statement().unwrap(),
            r#"UPSERT INTO `travel-sample` (KEY, VALUE) VALUES ("u::1", {"name":"Al","age":42}) RETURNING *"#
        );
    }

    #[test]
    fn test_envelope() {
        let stmt = r#"SELECT * FROM users WHERE name = "Al""#;
        assert_eq!(
            StatementEnvelope::new(stmt).to_json().unwrap(),
            r#"{"statement":"SELECT * FROM users WHERE name = \"Al\""}"#
        );
        assert_eq!(
            StatementEnvelope::new("SELECT 1").pretty(true).to_json().unwrap(),
            r#"{"statement":"SELECT 1","pretty":true}"#
        );
    }
}
