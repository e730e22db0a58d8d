// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Lifecycle Callbacks
//!
//! Callback methods are collected per [`CallbackType`] in invocation order:
//!
//! 1. `@EntityListeners` classes, superclass listeners first, cut off by
//!    `@ExcludeSuperclassListeners`
//! 2. methods of the entity hierarchy, topmost class first
//!
//! A method overridden lower in the hierarchy is only invoked once, from the
//! overriding class.

use std::collections::HashSet;

use ormbind_model::{CallbackDefinition, CallbackType};
use ormbind_source::{names, Annotated, ClassDetails};
use tracing::debug;

use crate::context::BindingContext;
use crate::error::{BindResult, MappingError};

/// Resolve every lifecycle callback of an entity class
pub fn resolve_callbacks(ctx: &BindingContext<'_>, class: &ClassDetails) -> BindResult<Vec<CallbackDefinition>> {
    let listeners = listener_classes(ctx, class)?;
    let mut callbacks = Vec::new();
    for callback_type in CallbackType::ALL {
        for listener in &listeners {
            callbacks.extend(hierarchy_callbacks(ctx, listener, callback_type, true)?);
        }
        callbacks.extend(hierarchy_callbacks(ctx, class, callback_type, false)?);
    }
    if !callbacks.is_empty() {
        debug!(class = %class.name, count = callbacks.len(), "Resolved lifecycle callbacks");
    }
    Ok(callbacks)
}

/// Listener classes in invocation order
fn listener_classes<'a>(ctx: &BindingContext<'a>, class: &'a ClassDetails) -> BindResult<Vec<&'a ClassDetails>> {
    // collected bottom-up, each level prepended
    let mut levels: Vec<Vec<&'a ClassDetails>> = Vec::new();
    let mut current = Some(class);
    while let Some(details) = current {
        if let Some(usage) = details.annotation(names::ENTITY_LISTENERS) {
            let mut level = Vec::new();
            for name in usage.string_list("value") {
                level.push(ctx.class(name, &details.name)?);
            }
            levels.push(level);
        }
        if details.has_annotation(names::EXCLUDE_SUPERCLASS_LISTENERS) {
            break;
        }
        current = details
            .superclass
            .as_deref()
            .and_then(|name| ctx.source.class_details(name));
    }
    Ok(levels.into_iter().rev().flatten().collect())
}

/// Callbacks of one type declared by `class` and its superclasses, topmost
/// first
///
/// For the entity hierarchy only entities and mapped superclasses count;
/// a listener's superclasses are always searched.
fn hierarchy_callbacks(
    ctx: &BindingContext<'_>,
    class: &ClassDetails,
    callback_type: CallbackType,
    listener: bool,
) -> BindResult<Vec<CallbackDefinition>> {
    let mut found = Vec::new();
    let mut overridden: HashSet<&str> = HashSet::new();
    let mut current = Some(class);
    while let Some(details) = current {
        let mapped = listener
            || details.has_annotation(names::ENTITY)
            || details.has_annotation(names::MAPPED_SUPERCLASS);
        if mapped {
            if let Some(method) = declared_callback(details, callback_type)? {
                if overridden.insert(method) {
                    found.push(CallbackDefinition {
                        callback_type,
                        class_name: details.name.clone(),
                        method_name: method.to_string(),
                        listener,
                    });
                }
            }
        }
        // an override hides the inherited method whether or not it is annotated
        overridden.extend(details.methods().map(|m| m.name.as_str()));
        current = details
            .superclass
            .as_deref()
            .and_then(|name| ctx.source.class_details(name));
    }
    found.reverse();
    Ok(found)
}

/// The single method of `class` annotated for `callback_type`
fn declared_callback(class: &ClassDetails, callback_type: CallbackType) -> BindResult<Option<&str>> {
    let annotation = callback_type.annotation_name();
    let mut methods = class.methods().filter(|m| m.has_annotation(annotation));
    let first = methods.next();
    if methods.next().is_some() {
        return Err(MappingError::DuplicateCallback {
            class: class.name.clone(),
            callback: annotation.to_string(),
        });
    }
    Ok(first.map(|m| m.name.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BinderConfig;
    use crate::type_binder::TypeBinderRegistry;
    use ormbind_naming::{IdentityPhysicalNaming, JpaCompliantNamingStrategy};
    use ormbind_source::{AnnotationSource, AnnotationUsage, MemberDetails, StaticAnnotationSource};

    fn callback(method: &str, callback_type: CallbackType) -> MemberDetails {
        MemberDetails::method(method).with_annotation(AnnotationUsage::new(callback_type.annotation_name()))
    }

    fn resolve(source: &StaticAnnotationSource, class: &str) -> BindResult<Vec<CallbackDefinition>> {
        let config = BinderConfig::default();
        let binders = TypeBinderRegistry::new();
        let ctx = BindingContext::new(source, &JpaCompliantNamingStrategy, &IdentityPhysicalNaming, &config, &binders);
        let details = source.class_details(class).unwrap();
        resolve_callbacks(&ctx, details)
    }

    fn describe(callbacks: &[CallbackDefinition]) -> Vec<String> {
        callbacks
            .iter()
            .map(|c| format!("{:?} {}.{}", c.callback_type, c.class_name, c.method_name))
            .collect()
    }

    #[test]
    fn test_listeners_run_before_entity_methods() {
        let source = StaticAnnotationSource::new()
            .with_class(ClassDetails::new("AuditListener").with_member(callback("stamp", CallbackType::PrePersist)))
            .with_class(
                ClassDetails::new("Base")
                    .with_annotation(AnnotationUsage::new(names::MAPPED_SUPERCLASS))
                    .with_member(callback("initBase", CallbackType::PrePersist)),
            )
            .with_class(
                ClassDetails::new("Order")
                    .with_superclass("Base")
                    .with_annotation(AnnotationUsage::new(names::ENTITY))
                    .with_annotation(AnnotationUsage::new(names::ENTITY_LISTENERS).with("value", "AuditListener"))
                    .with_member(callback("validate", CallbackType::PrePersist))
                    .with_member(callback("loaded", CallbackType::PostLoad)),
            );

        let callbacks = resolve(&source, "Order").unwrap();
        assert_eq!(
            describe(&callbacks),
            vec![
                "PrePersist AuditListener.stamp",
                "PrePersist Base.initBase",
                "PrePersist Order.validate",
                "PostLoad Order.loaded",
            ]
        );
        assert!(callbacks[0].listener);
        assert!(!callbacks[1].listener);
    }

    #[test]
    fn test_override_replaces_inherited_callback() {
        let source = StaticAnnotationSource::new()
            .with_class(
                ClassDetails::new("Base")
                    .with_annotation(AnnotationUsage::new(names::ENTITY))
                    .with_member(callback("touch", CallbackType::PreUpdate)),
            )
            .with_class(
                ClassDetails::new("Order")
                    .with_superclass("Base")
                    .with_annotation(AnnotationUsage::new(names::ENTITY))
                    .with_member(MemberDetails::method("touch")),
            );

        let callbacks = resolve(&source, "Order").unwrap();
        assert!(callbacks.is_empty(), "{:?}", describe(&callbacks));
    }

    #[test]
    fn test_exclude_superclass_listeners() {
        let source = StaticAnnotationSource::new()
            .with_class(ClassDetails::new("BaseListener").with_member(callback("a", CallbackType::PostPersist)))
            .with_class(ClassDetails::new("OrderListener").with_member(callback("b", CallbackType::PostPersist)))
            .with_class(
                ClassDetails::new("Base")
                    .with_annotation(AnnotationUsage::new(names::ENTITY))
                    .with_annotation(AnnotationUsage::new(names::ENTITY_LISTENERS).with("value", "BaseListener")),
            )
            .with_class(
                ClassDetails::new("Order")
                    .with_superclass("Base")
                    .with_annotation(AnnotationUsage::new(names::ENTITY))
                    .with_annotation(AnnotationUsage::new(names::EXCLUDE_SUPERCLASS_LISTENERS))
                    .with_annotation(AnnotationUsage::new(names::ENTITY_LISTENERS).with("value", "OrderListener")),
            );

        let callbacks = resolve(&source, "Order").unwrap();
        assert_eq!(describe(&callbacks), vec!["PostPersist OrderListener.b"]);
        let callbacks = resolve(&source, "Base").unwrap();
        assert_eq!(describe(&callbacks), vec!["PostPersist BaseListener.a"]);
    }

    #[test]
    fn test_duplicate_callback() {
        let source = StaticAnnotationSource::new().with_class(
            ClassDetails::new("Order")
                .with_annotation(AnnotationUsage::new(names::ENTITY))
                .with_member(callback("first", CallbackType::PreRemove))
                .with_member(callback("second", CallbackType::PreRemove)),
        );

        let result = resolve(&source, "Order");
        match result {
            Err(MappingError::DuplicateCallback { class, callback }) => {
                assert_eq!(class, "Order");
                assert_eq!(callback, "PreRemove");
            }
            _ => panic!("Expected DuplicateCallback error, got {:?}", result),
        }
    }

    #[test]
    fn test_unknown_listener_class() {
        let source = StaticAnnotationSource::new().with_class(
            ClassDetails::new("Order")
                .with_annotation(AnnotationUsage::new(names::ENTITY))
                .with_annotation(AnnotationUsage::new(names::ENTITY_LISTENERS).with("value", vec!["Missing"])),
        );

        let result = resolve(&source, "Order");
        match result {
            Err(MappingError::UnknownClass { class, referenced_by }) => {
                assert_eq!(class, "Missing");
                assert_eq!(referenced_by, "Order");
            }
            _ => panic!("Expected UnknownClass error, got {:?}", result),
        }
    }
}
