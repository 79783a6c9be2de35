//! Projection of form values onto a schema.

use crate::form::FormValues;
use crate::omission::OmissionSet;
use crate::schema::{FieldDescriptor, FieldKind, Schema};

/// Untyped value taken from the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    Scalar(String),
    List(Vec<String>),
}

impl RawValue {
    /// Text of a scalar, or the first element of a list.
    pub fn as_scalar(&self) -> &str {
        match self {
            RawValue::Scalar(s) => s,
            RawValue::List(values) => values.first().map(String::as_str).unwrap_or(""),
        }
    }
}

/// A schema field paired with the raw value submitted for it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawField<'s> {
    pub descriptor: &'s FieldDescriptor,
    pub raw: RawValue,
    pub omitted: bool,
}

/// Walk the schema in declaration order and pull each field's value from the form.
///
/// Omitted fields project to an explicit empty scalar and keep their place, so
/// the output always has one entry per schema field.
pub fn project<'s>(schema: &'s Schema, form: &FormValues, omissions: &OmissionSet) -> Vec<RawField<'s>> {
    schema
        .iter()
        .map(|descriptor| {
            let omitted = omissions.contains(&descriptor.key);
            let raw = if omitted {
                RawValue::Scalar(String::new())
            } else if descriptor.kind == FieldKind::StringList {
                RawValue::List(form.get_all(&descriptor.key).to_vec())
            } else {
                RawValue::Scalar(form.get(&descriptor.key).to_string())
            };
            RawField {
                descriptor,
                raw,
                omitted,
            }
        })
        .collect()
}
