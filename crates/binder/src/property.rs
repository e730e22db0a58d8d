// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Property Binding
//!
//! Dispatches one persistent attribute to the binder of its kind:
//!
//! | Attribute                               | Bound as                 |
//! |-----------------------------------------|--------------------------|
//! | `@OneToMany`, `@ManyToMany`             | collection               |
//! | `@ManyToOne`, `@OneToOne`               | to-one association       |
//! | `@Embedded`, `@EmbeddedId`, embeddable  | component                |
//! | anything else                           | basic value              |

use ormbind_model::{Component, PersistentClass, Property, Value};
use ormbind_naming::AttributePath;
use ormbind_source::{names, Annotated, MemberDetails};
use tracing::debug;

use crate::association;
use crate::collector::MetadataCollector;
use crate::column::{
    basic_type_name, bind_basic_value, collect_attribute_overrides, AnnotatedColumns,
    AttributeOverrides, ColumnRole,
};
use crate::context::BindingContext;
use crate::error::{BindResult, MappingError};

const ASSOCIATIONS: [&str; 4] = [
    names::MANY_TO_ONE,
    names::ONE_TO_ONE,
    names::ONE_TO_MANY,
    names::MANY_TO_MANY,
];

/// Where an attribute is bound
#[derive(Debug, Clone)]
pub struct PropertySite<'p> {
    pub member: &'p MemberDetails,
    pub declaring_class: &'p str,
    /// Path from the entity, or from the identifier for identifier parts
    pub path: AttributePath,
    pub overrides: &'p AttributeOverrides,
    /// Part of an identifier
    pub key: bool,
}

impl PropertySite<'_> {
    fn property_name(&self) -> &str {
        &self.member.name
    }
}

/// Bind one attribute of `entity`
///
/// Columns are added to the collector's tables; the returned property is not
/// attached to the entity.
pub fn bind_property(
    ctx: &BindingContext<'_>,
    collector: &mut MetadataCollector,
    entity: &PersistentClass,
    site: &PropertySite<'_>,
) -> BindResult<Property> {
    let member = site.member;
    let declared: Vec<&str> = ASSOCIATIONS
        .iter()
        .copied()
        .filter(|name| member.has_annotation(name))
        .collect();
    if let [first, second, ..] = declared.as_slice() {
        return Err(MappingError::ConflictingAnnotations {
            class: site.declaring_class.to_string(),
            first: first.to_string(),
            second: second.to_string(),
        });
    }

    let property = match declared.first().copied() {
        Some(names::ONE_TO_MANY) | Some(names::MANY_TO_MANY) => {
            if site.key {
                return Err(misuse(entity, site, declared[0], "a collection cannot be an identifier"));
            }
            association::bind_collection_property(ctx, collector, entity, site)?
        }
        Some(_) => association::bind_to_one_property(ctx, collector, entity, site)?,
        None if is_component(ctx, member) => {
            let component = bind_component(ctx, collector, entity, site)?;
            Property::new(site.property_name(), Value::Component(component))
                .with_declaring_class(site.declaring_class)
        }
        None if member.is_collection() => {
            return Err(misuse(
                entity,
                site,
                names::ONE_TO_MANY,
                "collection attributes need an association mapping",
            ));
        }
        None => bind_basic_property(ctx, collector, entity, site)?,
    };
    Ok(apply_common(property, site))
}

fn misuse(entity: &PersistentClass, site: &PropertySite<'_>, annotation: &str, reason: &str) -> MappingError {
    MappingError::PropertyMisuse {
        entity: entity.entity_name.clone(),
        property: site.path.full_path(),
        annotation: annotation.to_string(),
        reason: reason.to_string(),
    }
}

fn is_component(ctx: &BindingContext<'_>, member: &MemberDetails) -> bool {
    member.has_annotation(names::EMBEDDED)
        || member.has_annotation(names::EMBEDDED_ID)
        || ctx
            .source
            .class_has_annotation(&member.type_name, names::EMBEDDABLE)
}

/// Flags shared by every kind of attribute
fn apply_common(mut property: Property, site: &PropertySite<'_>) -> Property {
    if let Some(natural_id) = site.member.annotation(names::NATURAL_ID) {
        property.natural_id = true;
        if !natural_id.bool_or("mutable", false) {
            property.updateable = false;
        }
    }
    if let Some(lock) = site.member.annotation(names::OPTIMISTIC_LOCK) {
        property.optimistic_locked = !lock.bool_or("excluded", false);
    }
    if site.key {
        property.optional = false;
    }
    property
}

fn bind_basic_property(
    ctx: &BindingContext<'_>,
    collector: &mut MetadataCollector,
    entity: &PersistentClass,
    site: &PropertySite<'_>,
) -> BindResult<Property> {
    let member = site.member;
    let mut columns = AnnotatedColumns::from_member(
        ctx,
        &entity.entity_name,
        member,
        &site.path,
        site.overrides,
        ColumnRole::Basic,
    )?;
    if site.key {
        if columns.is_formula() {
            return Err(misuse(entity, site, names::FORMULA, "an identifier cannot be a formula"));
        }
        columns.force_not_null();
    }

    let type_name = basic_type_name(collector, &member.type_name);
    let (value, join) = bind_basic_value(ctx, collector, entity, &columns, &type_name)?;
    let mut property =
        Property::new(site.property_name(), Value::Basic(value)).with_declaring_class(site.declaring_class);
    property.join = join;
    if columns.is_formula() {
        property.insertable = false;
        property.updateable = false;
    } else {
        property.insertable = columns.columns.iter().any(|c| c.insertable);
        property.updateable = columns.columns.iter().any(|c| c.updatable);
    }
    if let Some(basic) = member.annotation(names::BASIC) {
        property.lazy = basic.enum_value("fetch", "EAGER") == "LAZY";
        property.optional = basic.bool_or("optional", true);
    }
    if member.is_primitive() {
        property.optional = false;
    }
    Ok(property)
}

/// Bind an embedded component
///
/// Parts of an `@EmbeddedId` are addressed relative to the identifier.
/// Overrides from enclosing components win over those declared on the
/// embedding attribute.
pub fn bind_component(
    ctx: &BindingContext<'_>,
    collector: &mut MetadataCollector,
    entity: &PersistentClass,
    site: &PropertySite<'_>,
) -> BindResult<Component> {
    let embeddable = ctx.class(&site.member.type_name, &entity.entity_name)?;
    let base = if site.member.has_annotation(names::EMBEDDED_ID) {
        AttributePath::parse("")
    } else {
        site.path.clone()
    };

    let mut overrides = collect_attribute_overrides(site.member, Some(&base));
    for (path, usage) in site.overrides {
        overrides.insert(path.clone(), usage.clone());
    }

    let mut component = Component::new(
        format!("{}.{}", entity.entity_name, site.path.full_path()),
        entity.table,
    );
    component.class_name = Some(embeddable.name.clone());
    component.embedded = true;
    component.key = site.key;

    // attributes of mapped superclasses of the embeddable come first
    let mut chain = vec![embeddable];
    let mut current = embeddable.superclass.as_deref();
    while let Some(name) = current {
        match ctx.source.class_details(name) {
            Some(details) if details.has_annotation(names::MAPPED_SUPERCLASS) => {
                chain.push(details);
                current = details.superclass.as_deref();
            }
            _ => break,
        }
    }

    for class in chain.into_iter().rev() {
        for member in class.attributes() {
            if member.has_annotation(names::TRANSIENT) || component.property(&member.name).is_some() {
                continue;
            }
            let child = PropertySite {
                member,
                declaring_class: &class.name,
                path: base.append(&member.name),
                overrides: &overrides,
                key: site.key,
            };
            let property = bind_property(ctx, collector, entity, &child)?;
            component.properties.push(property);
        }
    }

    debug!(
        role = %component.role,
        class = %embeddable.name,
        properties = component.properties.len(),
        "Bound component"
    );
    Ok(component)
}
