// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Annotation Usages
//!
//! An [`AnnotationUsage`] is one occurrence of an annotation on a class or
//! member: its name and its explicitly given attribute values. Attributes
//! that were not written are simply absent; the accessors let callers supply
//! the annotation's default.
//!
//! Class-valued and enum-valued attributes are carried as strings (the class
//! name, the enum constant). An empty string means "not specified", matching
//! the convention of annotation attribute defaults.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Value of an annotation attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<AttributeValue>),
    Annotation(AnnotationUsage),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Str(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Str(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<AnnotationUsage> for AttributeValue {
    fn from(value: AnnotationUsage) -> Self {
        AttributeValue::Annotation(value)
    }
}

impl From<Vec<AnnotationUsage>> for AttributeValue {
    fn from(values: Vec<AnnotationUsage>) -> Self {
        AttributeValue::List(values.into_iter().map(AttributeValue::Annotation).collect())
    }
}

impl From<Vec<&str>> for AttributeValue {
    fn from(values: Vec<&str>) -> Self {
        AttributeValue::List(values.into_iter().map(AttributeValue::from).collect())
    }
}

/// One annotation applied to a class or member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationUsage {
    pub name: String,
    #[serde(default)]
    pub attributes: IndexMap<String, AttributeValue>,
}

impl AnnotationUsage {
    /// Create an annotation usage without attributes
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: IndexMap::new(),
        }
    }

    /// Add an attribute value
    ///
    /// # Examples
    ///
    /// ```
    /// use ormbind_source::AnnotationUsage;
    ///
    /// let column = AnnotationUsage::new("Column")
    ///     .with("name", "ORDER_ID")
    ///     .with("nullable", false);
    /// assert_eq!(column.string("name"), Some("ORDER_ID"));
    /// assert!(!column.bool_or("nullable", true));
    /// ```
    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Whether the attribute was written at all
    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    /// String attribute; empty strings count as absent
    pub fn string(&self, key: &str) -> Option<&str> {
        match self.attributes.get(key) {
            Some(AttributeValue::Str(value)) if !value.is_empty() => Some(value.as_str()),
            _ => None,
        }
    }

    /// String attribute, or the empty string
    pub fn string_or_empty(&self, key: &str) -> &str {
        self.string(key).unwrap_or("")
    }

    /// Boolean attribute with the annotation's default
    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        match self.attributes.get(key) {
            Some(AttributeValue::Bool(value)) => *value,
            Some(AttributeValue::Str(value)) => match value.as_str() {
                "true" => true,
                "false" => false,
                _ => default,
            },
            _ => default,
        }
    }

    /// Integer attribute
    pub fn int(&self, key: &str) -> Option<i64> {
        match self.attributes.get(key) {
            Some(AttributeValue::Int(value)) => Some(*value),
            Some(AttributeValue::Str(value)) => value.parse().ok(),
            _ => None,
        }
    }

    /// Nested annotation attribute
    pub fn nested(&self, key: &str) -> Option<&AnnotationUsage> {
        match self.attributes.get(key) {
            Some(AttributeValue::Annotation(value)) => Some(value),
            Some(AttributeValue::List(values)) if values.len() == 1 => match &values[0] {
                AttributeValue::Annotation(value) => Some(value),
                _ => None,
            },
            _ => None,
        }
    }

    /// List of nested annotations; a single annotation counts as a list of one
    pub fn nested_list(&self, key: &str) -> Vec<&AnnotationUsage> {
        match self.attributes.get(key) {
            Some(AttributeValue::Annotation(value)) => vec![value],
            Some(AttributeValue::List(values)) => values
                .iter()
                .filter_map(|value| match value {
                    AttributeValue::Annotation(annotation) => Some(annotation),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// List of strings; a single string counts as a list of one
    pub fn string_list(&self, key: &str) -> Vec<&str> {
        match self.attributes.get(key) {
            Some(AttributeValue::Str(value)) if !value.is_empty() => vec![value.as_str()],
            Some(AttributeValue::List(values)) => values
                .iter()
                .filter_map(|value| match value {
                    AttributeValue::Str(text) if !text.is_empty() => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Class-valued attribute; `void` (the annotation default) counts as absent
    pub fn class_ref(&self, key: &str) -> Option<&str> {
        self.string(key)
            .filter(|name| !matches!(*name, "void" | "java.lang.Void" | "void.class"))
    }

    /// Enum-valued attribute as its constant name, with the annotation's
    /// default
    pub fn enum_value<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        let value = self.string(key).unwrap_or(default);
        value.rsplit('.').next().unwrap_or(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_string_is_absent() {
        let usage = AnnotationUsage::new("Table").with("name", "");
        assert!(usage.has_attribute("name"));
        assert_eq!(usage.string("name"), None);
        assert_eq!(usage.string_or_empty("name"), "");
    }

    #[test]
    fn test_nested_list_accepts_single_value() {
        let single = AnnotationUsage::new("JoinColumns")
            .with("value", AnnotationUsage::new("JoinColumn").with("name", "A"));
        assert_eq!(single.nested_list("value").len(), 1);

        let many = AnnotationUsage::new("JoinColumns").with(
            "value",
            vec![
                AnnotationUsage::new("JoinColumn").with("name", "A"),
                AnnotationUsage::new("JoinColumn").with("name", "B"),
            ],
        );
        let names: Vec<_> = many
            .nested_list("value")
            .iter()
            .filter_map(|jc| jc.string("name"))
            .collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_class_ref_ignores_void() {
        let usage = AnnotationUsage::new("ManyToOne").with("targetEntity", "void");
        assert_eq!(usage.class_ref("targetEntity"), None);
        let usage = AnnotationUsage::new("ManyToOne").with("targetEntity", "com.acme.Customer");
        assert_eq!(usage.class_ref("targetEntity"), Some("com.acme.Customer"));
    }

    #[test]
    fn test_enum_value_strips_qualifier() {
        let usage = AnnotationUsage::new("Inheritance").with("strategy", "InheritanceType.JOINED");
        assert_eq!(usage.enum_value("strategy", "SINGLE_TABLE"), "JOINED");
        let usage = AnnotationUsage::new("Inheritance");
        assert_eq!(usage.enum_value("strategy", "SINGLE_TABLE"), "SINGLE_TABLE");
    }

    #[test]
    fn test_int_and_bool_from_strings() {
        let usage = AnnotationUsage::new("Column")
            .with("length", "40")
            .with("unique", "true");
        assert_eq!(usage.int("length"), Some(40));
        assert!(usage.bool_or("unique", false));
    }

    #[test]
    fn test_untagged_deserialization() {
        let yaml = r#"
name: JoinColumn
attributes:
  name: CUSTOMER_ID
  nullable: false
  length: 12
  foreignKey:
    name: ForeignKey
    attributes:
      name: FK_CUSTOMER
"#;
        let usage: AnnotationUsage = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(usage.string("name"), Some("CUSTOMER_ID"));
        assert!(!usage.bool_or("nullable", true));
        assert_eq!(usage.int("length"), Some(12));
        assert_eq!(
            usage.nested("foreignKey").and_then(|fk| fk.string("name")),
            Some("FK_CUSTOMER")
        );
    }
}
