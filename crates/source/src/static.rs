// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Static Annotation Source
//!
//! An in-memory [`AnnotationSource`] built programmatically or loaded from a
//! YAML or JSON document.
//!
//! ## Document format
//!
//! ```yaml
//! classes:
//!   - name: com.acme.Order
//!     annotations:
//!       - name: Entity
//!       - name: Table
//!         attributes: { name: ORDERS }
//!     members:
//!       - name: id
//!         type_name: long
//!         annotations: [{ name: Id }]
//! ```

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::debug;

use crate::details::ClassDetails;
use crate::error::{SourceError, SourceResult};
use crate::r#trait::AnnotationSource;

#[derive(Debug, Deserialize)]
struct SourceDocument {
    #[serde(default)]
    classes: Vec<ClassDetails>,
}

/// Annotation source over class descriptions held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticAnnotationSource {
    classes: IndexMap<String, ClassDetails>,
}

impl StaticAnnotationSource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a class, replacing any previous description with the same name
    pub fn with_class(mut self, class: ClassDetails) -> Self {
        self.classes.insert(class.name.clone(), class);
        self
    }

    /// Add a class
    ///
    /// # Errors
    ///
    /// Returns `SourceError::DuplicateClass` if the class is already known.
    pub fn add_class(&mut self, class: ClassDetails) -> SourceResult<()> {
        if self.classes.contains_key(&class.name) {
            return Err(SourceError::DuplicateClass(class.name));
        }
        self.classes.insert(class.name.clone(), class);
        Ok(())
    }

    /// Load a source from a YAML document
    ///
    /// # Errors
    ///
    /// Returns `SourceError::Deserialization` if the document is malformed and
    /// `SourceError::DuplicateClass` if a class is declared twice.
    pub fn from_yaml_str(yaml: &str) -> SourceResult<Self> {
        let document: SourceDocument = serde_yaml::from_str(yaml)?;
        Self::from_document(document)
    }

    /// Load a source from a JSON document
    ///
    /// # Errors
    ///
    /// Same as [`StaticAnnotationSource::from_yaml_str`].
    pub fn from_json_str(json: &str) -> SourceResult<Self> {
        let document: SourceDocument = serde_json::from_str(json)?;
        Self::from_document(document)
    }

    fn from_document(document: SourceDocument) -> SourceResult<Self> {
        let mut source = Self::new();
        for class in document.classes {
            source.add_class(class)?;
        }
        debug!(classes = source.classes.len(), "Loaded static annotation source");
        Ok(source)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl AnnotationSource for StaticAnnotationSource {
    fn class_details(&self, name: &str) -> Option<&ClassDetails> {
        self.classes.get(name)
    }

    fn class_names(&self) -> Vec<String> {
        self.classes
            .values()
            .filter(|class| !class.is_annotation)
            .map(|class| class.name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::details::Annotated;
    use crate::names;

    #[test]
    fn test_duplicate_class_rejected() {
        let mut source = StaticAnnotationSource::new();
        source.add_class(ClassDetails::new("com.acme.Order")).unwrap();
        let result = source.add_class(ClassDetails::new("com.acme.Order"));
        match result {
            Err(SourceError::DuplicateClass(name)) => assert_eq!(name, "com.acme.Order"),
            _ => panic!("Expected DuplicateClass error, got {:?}", result),
        }
    }

    #[test]
    fn test_annotation_types_are_not_listed() {
        let source = StaticAnnotationSource::new()
            .with_class(ClassDetails::new("com.acme.Audited").annotation_type())
            .with_class(ClassDetails::new("com.acme.Order"));
        assert_eq!(source.class_names(), vec!["com.acme.Order".to_string()]);
        assert!(source.annotation_type("com.acme.Audited").is_some());
        assert!(source.annotation_type("com.acme.Order").is_none());
    }

    #[test]
    fn test_from_json() {
        let json = r#"{"classes":[{"name":"com.acme.Order","annotations":[{"name":"Entity"}]}]}"#;
        let source = StaticAnnotationSource::from_json_str(json).unwrap();
        let order = source.resolve_class("com.acme.Order").unwrap();
        assert!(order.has_annotation(names::ENTITY));
    }

    #[test]
    fn test_malformed_yaml() {
        let result = StaticAnnotationSource::from_yaml_str("classes: [ { annotations: 3 } ]");
        assert!(matches!(result, Err(SourceError::Deserialization(_))));
    }
}
