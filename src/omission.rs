//! Omit-if-empty policy.

use std::collections::HashSet;

use crate::form::FormValues;
use crate::schema::Schema;

/// Keys of omittable fields whose submitted value is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OmissionSet {
    keys: HashSet<String>,
}

impl OmissionSet {
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }
}

/// Compute which fields are left out of the document.
///
/// A field is omitted iff it is marked omittable and the first value submitted
/// for it is empty (an absent key counts as empty). Fields that are not
/// omittable are never omitted, however empty.
pub fn omission_set(schema: &Schema, form: &FormValues) -> OmissionSet {
    let keys = schema
        .iter()
        .filter(|field| field.omittable && form.get(&field.key).is_empty())
        .map(|field| field.key.clone())
        .collect();
    OmissionSet { keys }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDescriptor;

    fn schema() -> Schema {
        Schema::new(vec![
            FieldDescriptor::string("aid"),
            FieldDescriptor::string("name"),
            FieldDescriptor::string("nick").omit_empty(),
            FieldDescriptor::int("age").omit_empty(),
            FieldDescriptor::list("tags").omit_empty(),
        ])
        .unwrap()
    }

    #[test]
    fn test_required_empty_field_not_omitted() {
        let form = FormValues::new().with("aid", "u1").with("name", "");
        let set = omission_set(&schema(), &form);
        assert!(!set.contains("name"));
        assert!(!set.contains("aid"));
    }

    #[test]
    fn test_omittable_empty_and_absent_fields_omitted() {
        let form = FormValues::new().with("aid", "u1").with("nick", "");
        let set = omission_set(&schema(), &form);
        assert!(set.contains("nick"));
        assert!(set.contains("age"));
        assert!(set.contains("tags"));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_omittable_with_value_kept() {
        let form = FormValues::new()
            .with("nick", "al")
            .with("age", "0")
            .with("tags", "x");
        let set = omission_set(&schema(), &form);
        assert!(set.is_empty());
    }

    #[test]
    fn test_list_judged_by_first_value() {
        let form = FormValues::new().with("tags", "").with("tags", "b");
        let set = omission_set(&schema(), &form);
        assert!(set.contains("tags"));
    }
}
