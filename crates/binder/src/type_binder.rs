// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Type Binder Extensions
//!
//! An annotation type meta-annotated with `@TypeBinderType(binder = X)` asks
//! the binder registered under `X` to adjust every entity carrying that
//! annotation. Binders run last, after the entity is registered.

use indexmap::IndexMap;
use ormbind_model::PersistentClass;
use ormbind_source::{AnnotationUsage, AttributeValue, ClassDetails};

use crate::error::BindResult;

/// Custom binding logic attached to an annotation type
pub trait TypeBinder {
    /// Adjust `entity`, bound from `class`, for one usage of the annotation
    fn bind(
        &self,
        annotation: &AnnotationUsage,
        class: &ClassDetails,
        entity: &mut PersistentClass,
    ) -> BindResult<()>;
}

/// Copies the scalar attributes of the annotation into the entity's meta
/// attributes as `<annotation>.<attribute>`
#[derive(Debug, Clone, Copy, Default)]
pub struct MetaAttributeBinder;

impl TypeBinder for MetaAttributeBinder {
    fn bind(
        &self,
        annotation: &AnnotationUsage,
        _class: &ClassDetails,
        entity: &mut PersistentClass,
    ) -> BindResult<()> {
        let prefix = annotation
            .name
            .rsplit('.')
            .next()
            .unwrap_or(&annotation.name);
        for (key, value) in &annotation.attributes {
            let text = match value {
                AttributeValue::Str(text) => text.clone(),
                AttributeValue::Bool(flag) => flag.to_string(),
                AttributeValue::Int(number) => number.to_string(),
                AttributeValue::List(_) | AttributeValue::Annotation(_) => continue,
            };
            entity
                .meta_attributes
                .insert(format!("{}.{}", prefix, key), text);
        }
        Ok(())
    }
}

/// Type binders by binder name
#[derive(Default)]
pub struct TypeBinderRegistry {
    binders: IndexMap<String, Box<dyn TypeBinder>>,
}

impl TypeBinderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a binder, replacing any binder of the same name
    pub fn register(&mut self, name: impl Into<String>, binder: Box<dyn TypeBinder>) {
        self.binders.insert(name.into(), binder);
    }

    pub fn get(&self, name: &str) -> Option<&dyn TypeBinder> {
        self.binders.get(name).map(|binder| binder.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.binders.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.binders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.binders.is_empty()
    }
}

impl std::fmt::Debug for TypeBinderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeBinderRegistry")
            .field("binders", &self.binders.keys().collect::<Vec<_>>())
            .finish()
    }
}
