// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Class and Member Details
//!
//! The view of a domain class the binder works from: its name, superclass,
//! annotations and annotated members. Annotation types are described by the
//! same structure with `is_annotation` set; their annotations are the
//! meta-annotations of the type.

use serde::{Deserialize, Serialize};

use crate::annotation::AnnotationUsage;

/// Read access to the annotations of a class or member
pub trait Annotated {
    fn annotations(&self) -> &[AnnotationUsage];

    /// Does annotation `name` exist
    fn has_annotation(&self, name: &str) -> bool {
        self.annotations().iter().any(|a| a.name == name)
    }

    /// Get annotation `name`
    fn annotation(&self, name: &str) -> Option<&AnnotationUsage> {
        self.annotations().iter().find(|a| a.name == name)
    }

    /// All usages of a repeatable annotation
    ///
    /// Collects direct usages of `single` followed by the `value` entries of
    /// the `container` annotation, which is how repeated annotations appear.
    fn repeated_annotations(&self, single: &str, container: &str) -> Vec<&AnnotationUsage> {
        let mut found: Vec<&AnnotationUsage> = self
            .annotations()
            .iter()
            .filter(|a| a.name == single)
            .collect();
        for wrapper in self.annotations().iter().filter(|a| a.name == container) {
            found.extend(wrapper.nested_list("value"));
        }
        found
    }
}

/// Kind of a class member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    #[default]
    Field,
    /// Accessor method exposing a property
    Getter,
    /// Any other method, e.g. a lifecycle callback
    Method,
}

/// A field or method of a class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberDetails {
    /// Attribute name (for getters, the property name)
    pub name: String,
    #[serde(default)]
    pub kind: MemberKind,
    /// Declared type, e.g. `long`, `java.lang.String` or `java.util.Set`
    #[serde(default)]
    pub type_name: String,
    /// Element type of a collection-typed member
    #[serde(default)]
    pub element_type: Option<String>,
    #[serde(default)]
    pub annotations: Vec<AnnotationUsage>,
}

impl MemberDetails {
    pub fn field(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Field,
            type_name: type_name.into(),
            element_type: None,
            annotations: Vec::new(),
        }
    }

    pub fn method(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Method,
            type_name: "void".to_string(),
            element_type: None,
            annotations: Vec::new(),
        }
    }

    pub fn with_kind(mut self, kind: MemberKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_element_type(mut self, element_type: impl Into<String>) -> Self {
        self.element_type = Some(element_type.into());
        self
    }

    pub fn with_annotation(mut self, annotation: AnnotationUsage) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Whether the declared type is a Java primitive, which cannot be null
    pub fn is_primitive(&self) -> bool {
        matches!(
            self.type_name.as_str(),
            "boolean" | "byte" | "short" | "int" | "long" | "float" | "double" | "char"
        )
    }

    /// Whether the declared type is a collection type
    pub fn is_collection(&self) -> bool {
        let raw = self.type_name.split('<').next().unwrap_or(&self.type_name);
        matches!(
            simple_name(raw),
            "Collection" | "List" | "Set" | "SortedSet" | "Map" | "SortedMap" | "Bag"
        )
    }

    /// Element type of a collection: the explicit `element_type`, else the
    /// (last) generic argument of `type_name`
    pub fn collection_element_type(&self) -> Option<&str> {
        if let Some(element_type) = &self.element_type {
            return Some(element_type);
        }
        let start = self.type_name.find('<')?;
        let end = self.type_name.rfind('>')?;
        let inner = self.type_name.get(start + 1..end)?;
        Some(inner.rsplit(',').next().unwrap_or(inner).trim())
    }
}

impl Annotated for MemberDetails {
    fn annotations(&self) -> &[AnnotationUsage] {
        &self.annotations
    }
}

/// A class known to the annotation source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDetails {
    /// Fully qualified class name
    pub name: String,
    #[serde(default)]
    pub superclass: Option<String>,
    #[serde(default)]
    pub is_abstract: bool,
    /// Annotation types carry meta-annotations
    #[serde(default)]
    pub is_annotation: bool,
    #[serde(default)]
    pub annotations: Vec<AnnotationUsage>,
    #[serde(default)]
    pub members: Vec<MemberDetails>,
}

impl ClassDetails {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            superclass: None,
            is_abstract: false,
            is_annotation: false,
            annotations: Vec::new(),
            members: Vec::new(),
        }
    }

    pub fn with_superclass(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    pub fn with_abstract(mut self, is_abstract: bool) -> Self {
        self.is_abstract = is_abstract;
        self
    }

    pub fn with_annotation(mut self, annotation: AnnotationUsage) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn with_member(mut self, member: MemberDetails) -> Self {
        self.members.push(member);
        self
    }

    /// Mark this class as an annotation type
    pub fn annotation_type(mut self) -> Self {
        self.is_annotation = true;
        self
    }

    /// Class name without its package
    pub fn simple_name(&self) -> &str {
        simple_name(&self.name)
    }

    pub fn member(&self, name: &str) -> Option<&MemberDetails> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Fields and getters, in declaration order
    pub fn attributes(&self) -> impl Iterator<Item = &MemberDetails> {
        self.members
            .iter()
            .filter(|m| m.kind != MemberKind::Method)
    }

    /// Plain methods, in declaration order
    pub fn methods(&self) -> impl Iterator<Item = &MemberDetails> {
        self.members
            .iter()
            .filter(|m| m.kind == MemberKind::Method)
    }
}

impl Annotated for ClassDetails {
    fn annotations(&self) -> &[AnnotationUsage] {
        &self.annotations
    }
}

/// Strip the package from a qualified class name
pub fn simple_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}
