// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # ormbind - Annotation Source
//!
//! This crate provides the annotation-reading abstraction the binder consumes.
//! It defines the `AnnotationSource` trait and the types used to describe:
//!
//! - **Classes**: name, superclass, annotations and members
//! - **Members**: fields, getters and methods with their annotations
//! - **Annotations**: named attribute values, nested annotations and lists
//!
//! ## Architecture
//!
//! The binder never inspects annotation syntax. It asks the source whether an
//! annotation exists, reads typed attribute values through
//! [`AnnotationUsage`] accessors and resolves class-valued attributes through
//! [`AnnotationSource::resolve_class`].
//!
//! ## Usage
//!
//! ```
//! use ormbind_source::{AnnotationSource, StaticAnnotationSource};
//!
//! let source = StaticAnnotationSource::from_yaml_str(r#"
//! classes:
//!   - name: com.acme.Order
//!     annotations:
//!       - name: Entity
//! "#).unwrap();
//! assert_eq!(source.class_names(), vec!["com.acme.Order".to_string()]);
//! ```

pub mod annotation;
pub mod details;
pub mod error;
pub mod names;
pub mod r#static;
pub mod r#trait;

// Re-exports
pub use annotation::{AnnotationUsage, AttributeValue};
pub use details::{Annotated, ClassDetails, MemberDetails, MemberKind, simple_name};
pub use error::{SourceError, SourceResult};
pub use r#static::StaticAnnotationSource;
pub use r#trait::AnnotationSource;
