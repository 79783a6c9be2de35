//! Type coercion of projected form values.
//!
//! Turns the raw strings pulled from a form into typed values, yielding a
//! [`ProjectedRecord`] that renders to document JSON and deserializes into
//! typed records.

use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::{Map, Number};

use crate::error::{FormbaseError, FormbaseResult};
use crate::form::FormValues;
use crate::omission::omission_set;
use crate::projector::{RawField, RawValue, project};
use crate::schema::{FieldDescriptor, FieldKind, Schema};

/// Typed value of a projected field.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Int64(i64),
    Float64(f64),
    StringList(Vec<String>),
    String(String),
}

impl Value {
    /// Zero value of a kind.
    pub fn zero(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Int => Value::Int(0),
            FieldKind::Int64 => Value::Int64(0),
            FieldKind::Float64 => Value::Float64(0.0),
            FieldKind::StringList => Value::StringList(Vec::new()),
            FieldKind::String => Value::String(String::new()),
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Value::Int(_) => FieldKind::Int,
            Value::Int64(_) => FieldKind::Int64,
            Value::Float64(_) => FieldKind::Float64,
            Value::StringList(_) => FieldKind::StringList,
            Value::String(_) => FieldKind::String,
        }
    }

    /// Convert to a JSON value. Non-finite floats become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Int(n) => serde_json::Value::from(*n),
            Value::Int64(n) => serde_json::Value::from(*n),
            Value::Float64(n) => Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::StringList(values) => serde_json::Value::from(values.clone()),
            Value::String(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// What to do with text that does not parse as its declared number kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoercionMode {
    /// Substitute zero and log a warning.
    #[default]
    Lenient,
    /// Fail with [`FormbaseError::Coercion`].
    Strict,
}

/// A field of a projected record.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedEntry {
    pub descriptor: FieldDescriptor,
    pub value: Value,
    /// Left out of the document (omittable and submitted empty).
    pub omitted: bool,
}

impl ProjectedEntry {
    pub fn key(&self) -> &str {
        &self.descriptor.key
    }
}

/// Typed projection of a form, one entry per schema field in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedRecord {
    entries: Vec<ProjectedEntry>,
}

impl ProjectedRecord {
    /// Run the whole projection: omission policy, projection and coercion.
    pub fn from_form(schema: &Schema, form: &FormValues, mode: CoercionMode) -> FormbaseResult<Self> {
        let omissions = omission_set(schema, form);
        coerce(project(schema, form, &omissions), mode)
    }

    pub fn entries(&self) -> &[ProjectedEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ProjectedEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|e| e.key() == key).map(|e| &e.value)
    }

    /// The stored document: every entry that is not omitted, in schema order.
    pub fn to_document(&self) -> Map<String, serde_json::Value> {
        self.entries
            .iter()
            .filter(|e| !e.omitted)
            .map(|e| (e.descriptor.key.clone(), e.value.to_json()))
            .collect()
    }

    /// Canonical document text.
    pub fn to_json(&self) -> FormbaseResult<String> {
        Ok(serde_json::to_string(&self.to_document())?)
    }

    /// Deserialize the document into a new record.
    pub fn populate<T: DeserializeOwned>(&self) -> FormbaseResult<T> {
        Ok(serde_json::from_value(serde_json::Value::Object(self.to_document()))?)
    }

    /// Populate a record the caller already owns.
    ///
    /// The document is laid over `target`'s current fields, so fields missing
    /// from the document (omitted ones) keep their prior values. `target` is
    /// left untouched on failure.
    pub fn populate_into<T: Serialize + DeserializeOwned>(&self, target: &mut T) -> FormbaseResult<()> {
        let document = self.to_document();
        let merged = match serde_json::to_value(&*target)? {
            serde_json::Value::Object(mut fields) => {
                fields.extend(document);
                fields
            }
            _ => document,
        };
        *target = serde_json::from_value(serde_json::Value::Object(merged))?;
        Ok(())
    }
}

impl<'a> IntoIterator for &'a ProjectedRecord {
    type Item = &'a ProjectedEntry;
    type IntoIter = std::slice::Iter<'a, ProjectedEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Coerce projected raw fields to their declared kinds.
pub fn coerce(fields: Vec<RawField<'_>>, mode: CoercionMode) -> FormbaseResult<ProjectedRecord> {
    let entries = fields
        .into_iter()
        .map(|field| {
            let value = if field.omitted {
                Value::zero(field.descriptor.kind)
            } else {
                coerce_value(field.descriptor, field.raw, mode)?
            };
            Ok(ProjectedEntry {
                descriptor: field.descriptor.clone(),
                value,
                omitted: field.omitted,
            })
        })
        .collect::<FormbaseResult<Vec<_>>>()?;
    Ok(ProjectedRecord { entries })
}

/// Coerce one raw value to the kind its descriptor declares.
pub fn coerce_value(descriptor: &FieldDescriptor, raw: RawValue, mode: CoercionMode) -> FormbaseResult<Value> {
    let value = match descriptor.kind {
        FieldKind::Int => Value::Int(parse_number(descriptor, raw.as_scalar(), mode, |s| s.parse().ok())?),
        FieldKind::Int64 => Value::Int64(parse_number(descriptor, raw.as_scalar(), mode, |s| s.parse().ok())?),
        FieldKind::Float64 => Value::Float64(parse_number(descriptor, raw.as_scalar(), mode, |s| {
            s.parse::<f64>().ok().filter(|n| n.is_finite())
        })?),
        FieldKind::StringList => match raw {
            RawValue::List(values) => Value::StringList(values),
            RawValue::Scalar(s) if s.is_empty() => Value::StringList(Vec::new()),
            RawValue::Scalar(s) => Value::StringList(vec![s]),
        },
        FieldKind::String => match raw {
            RawValue::Scalar(s) => Value::String(s),
            list @ RawValue::List(_) => Value::String(list.as_scalar().to_string()),
        },
    };
    Ok(value)
}

fn parse_number<N: Default>(
    descriptor: &FieldDescriptor,
    text: &str,
    mode: CoercionMode,
    parse: impl FnOnce(&str) -> Option<N>,
) -> FormbaseResult<N> {
    if let Some(n) = parse(text) {
        return Ok(n);
    }
    match mode {
        CoercionMode::Strict => Err(FormbaseError::coercion(&descriptor.key, descriptor.kind, text)),
        CoercionMode::Lenient => {
            tracing::warn!(
                "Field '{}': '{}' is not a valid {}, using 0",
                descriptor.key,
                text,
                descriptor.kind
            );
            Ok(N::default())
        }
    }
}
