// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # AnnotationSource trait
//!
//! This module defines the capability the binder reads declarative metadata
//! through. Implementations may read compiled classes, parse sources or, as
//! [`StaticAnnotationSource`](crate::StaticAnnotationSource) does, serve
//! descriptions held in memory.

use crate::details::{Annotated, ClassDetails};
use crate::error::{SourceError, SourceResult};

/// Source of class and annotation metadata
///
/// # Examples
///
/// ```
/// use ormbind_source::{names, Annotated, AnnotationSource, AnnotationUsage, ClassDetails, StaticAnnotationSource};
///
/// let source = StaticAnnotationSource::new()
///     .with_class(ClassDetails::new("com.acme.Order").with_annotation(AnnotationUsage::new(names::ENTITY)));
///
/// let order = source.resolve_class("com.acme.Order").unwrap();
/// assert!(order.has_annotation(names::ENTITY));
/// ```
pub trait AnnotationSource {
    /// Details of a class, if the source knows it
    fn class_details(&self, name: &str) -> Option<&ClassDetails>;

    /// Names of all classes known to the source, in declaration order
    fn class_names(&self) -> Vec<String>;

    /// Resolve a class-valued attribute to its class details
    ///
    /// # Errors
    ///
    /// Returns `SourceError::ClassNotFound` if the class is unknown.
    fn resolve_class(&self, name: &str) -> SourceResult<&ClassDetails> {
        self.class_details(name)
            .ok_or_else(|| SourceError::ClassNotFound(name.to_string()))
    }

    /// Details of an annotation type, used to read meta-annotations
    fn annotation_type(&self, name: &str) -> Option<&ClassDetails> {
        self.class_details(name).filter(|class| class.is_annotation)
    }

    /// Whether `name` denotes a class annotated with `annotation`
    fn class_has_annotation(&self, name: &str, annotation: &str) -> bool {
        self.class_details(name)
            .is_some_and(|class| class.has_annotation(annotation))
    }
}
