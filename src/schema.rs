//! Record schemas.
//!
//! A [`Schema`] is the ordered list of fields a form is projected onto. It is
//! declared statically by a [`FormRecord`] type, built from a plain list of
//! names, or parsed from field-spec strings such as `"age:int,omitempty"`.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{FormbaseError, FormbaseResult};
use crate::parser;

/// The type a submitted value is coerced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FieldKind {
    /// 32-bit signed integer.
    ///
    /// Text outside the `i32` range is malformed, so `3000000000` coerces to
    /// `0` in lenient mode. Declare such fields as [`FieldKind::Int64`].
    Int,
    /// 64-bit signed integer.
    Int64,
    /// 64-bit float.
    Float64,
    /// Every submitted value for the key, in submission order.
    StringList,
    /// First submitted value, verbatim.
    #[default]
    String,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Int => "int",
            FieldKind::Int64 => "int64",
            FieldKind::Float64 => "float64",
            FieldKind::StringList => "list",
            FieldKind::String => "string",
        };
        f.write_str(name)
    }
}

/// A single field of a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Key used both in the submitted form and in the stored document.
    pub key: String,
    pub kind: FieldKind,
    /// Drop the field from the document when its submitted value is empty.
    pub omittable: bool,
}

impl FieldDescriptor {
    pub fn new(key: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            key: key.into(),
            kind,
            omittable: false,
        }
    }

    pub fn string(key: impl Into<String>) -> Self {
        Self::new(key, FieldKind::String)
    }

    pub fn int(key: impl Into<String>) -> Self {
        Self::new(key, FieldKind::Int)
    }

    pub fn int64(key: impl Into<String>) -> Self {
        Self::new(key, FieldKind::Int64)
    }

    pub fn float64(key: impl Into<String>) -> Self {
        Self::new(key, FieldKind::Float64)
    }

    pub fn list(key: impl Into<String>) -> Self {
        Self::new(key, FieldKind::StringList)
    }

    /// Mark the field as omit-if-empty.
    pub fn omit_empty(mut self) -> Self {
        self.omittable = true;
        self
    }
}

/// Ordered, non-empty set of uniquely keyed fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<FieldDescriptor>,
}

impl Schema {
    /// Build a schema, rejecting empty schemas and empty or duplicate keys.
    pub fn new(fields: Vec<FieldDescriptor>) -> FormbaseResult<Self> {
        if fields.is_empty() {
            return Err(FormbaseError::Schema(
                "a schema needs at least one field".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            if field.key.is_empty() {
                return Err(FormbaseError::Schema("field key must not be empty".to_string()));
            }
            if !seen.insert(field.key.as_str()) {
                return Err(FormbaseError::Schema(format!(
                    "duplicate field key '{}'",
                    field.key
                )));
            }
        }

        Ok(Self { fields })
    }

    /// Schema of a typed record.
    pub fn of<T: FormRecord>() -> Self {
        T::schema()
    }

    /// Schema from a plain list of names: every field is a non-omittable string.
    pub fn from_names<I, S>(names: I) -> FormbaseResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(FieldDescriptor::string).collect())
    }

    /// Schema from field-spec strings (`key[:kind][,omitempty]`).
    pub fn from_specs<I, S>(specs: I) -> FormbaseResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let fields = specs
            .into_iter()
            .map(|spec| parser::parse_field(spec.as_ref()))
            .collect::<FormbaseResult<Vec<_>>>()?;
        Self::new(fields)
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.key.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldDescriptor> {
        self.fields.iter()
    }
}

impl<'a> IntoIterator for &'a Schema {
    type Item = &'a FieldDescriptor;
    type IntoIter = std::slice::Iter<'a, FieldDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// A typed record that can be populated from a form.
///
/// The schema must list the record's serialized keys in declaration order and
/// mark as omittable exactly the fields serde skips when empty, so that the
/// projected document deserializes back into the record.
///
/// ```
/// use formbase::schema::{FieldDescriptor, FormRecord, Schema};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize, Default)]
/// struct User {
///     aid: String,
///     age: i32,
///     #[serde(default, skip_serializing_if = "String::is_empty")]
///     nick: String,
/// }
///
/// impl FormRecord for User {
///     fn schema() -> Schema {
///         Schema::new(vec![
///             FieldDescriptor::string("aid"),
///             FieldDescriptor::int("age"),
///             FieldDescriptor::string("nick").omit_empty(),
///         ])
///         .expect("static schema")
///     }
/// }
///
/// assert_eq!(Schema::of::<User>().len(), 3);
/// ```
pub trait FormRecord: Serialize + DeserializeOwned {
    fn schema() -> Schema;
}
