// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Identifier Binding
//!
//! Binds the identifier of a root entity in one of four shapes:
//!
//! | Declaration                         | Identifier value                         |
//! |-------------------------------------|------------------------------------------|
//! | one basic `@Id`                     | basic value with a generator             |
//! | `@EmbeddedId`                       | component of the embeddable type         |
//! | several `@Id`, or a to-one `@Id`    | non-aggregated component of the entity   |
//! | `@IdClass` plus matching `@Id`s     | component typed by the id class, plus a  |
//! |                                     | synthetic mapper property                |
//!
//! Subclasses inherit the identifier and must not declare one.

use ormbind_model::{
    Component, Identifier, IdentifierGenerator, IdentifierGeneratorDefinition, PersistentClass,
    Property, Value,
};
use ormbind_naming::AttributePath;
use ormbind_source::{names, Annotated, ClassDetails};
use tracing::debug;

use crate::collector::MetadataCollector;
use crate::column::{
    basic_type_name, bind_basic_value, collect_attribute_overrides, AnnotatedColumns,
    AttributeOverrides, ColumnRole,
};
use crate::context::BindingContext;
use crate::error::{BindResult, MappingError, Resolution};
use crate::inheritance::{InheritanceState, InheritanceStrategy, PropertyData};
use crate::property::{bind_component, bind_property, PropertySite};
use crate::registrations::{self, DEFAULT_GENERATOR_TABLE};
use crate::second_pass::SecondPass;
use crate::session::BootSession;

/// Name of the synthetic property exposing an `@IdClass` view of the
/// identifier
pub const IDENTIFIER_MAPPER_PROPERTY: &str = "_identifierMapper";

/// Bind the identifier of `entity`
///
/// Does nothing for subclasses beyond checking that they declare no
/// identifier of their own.
///
/// # Errors
///
/// - [`MappingError::MissingIdentifier`] for a root without identifier
/// - [`MappingError::IdClassMismatch`] when `@Id` attributes and the id
///   class attributes differ
/// - [`MappingError::AnnotationMisuse`] for an identifier on a subclass or a
///   misplaced `@EmbeddedId`
pub fn bind_identifier(
    ctx: &BindingContext<'_>,
    collector: &mut MetadataCollector,
    entity: &mut PersistentClass,
    class: &ClassDetails,
    state: &InheritanceState,
    strategy: &InheritanceStrategy,
) -> BindResult<()> {
    let elements = state.elements(ctx)?;
    let ids: Vec<&PropertyData> = elements.id_properties().collect();

    if !strategy.is_root() {
        return match ids.first() {
            Some(id) => Err(MappingError::AnnotationMisuse {
                class: class.name.clone(),
                annotation: names::ID.to_string(),
                reason: format!(
                    "'{}' redeclares the identifier inherited from '{}'",
                    id.name,
                    strategy.super_entity().unwrap_or_default()
                ),
            }),
            None => Ok(()),
        };
    }

    let overrides = collect_attribute_overrides(class, None);
    let embedded_ids = ids
        .iter()
        .filter(|p| p.member.has_annotation(names::EMBEDDED_ID))
        .count();

    if let Some(id_class) = id_class_name(ctx, class, state)? {
        if embedded_ids > 0 {
            return Err(MappingError::ConflictingAnnotations {
                class: class.name.clone(),
                first: names::ID_CLASS.to_string(),
                second: names::EMBEDDED_ID.to_string(),
            });
        }
        return bind_id_class(ctx, collector, entity, &id_class, &ids, &overrides);
    }

    if embedded_ids > 0 && ids.len() > 1 {
        return Err(MappingError::AnnotationMisuse {
            class: class.name.clone(),
            annotation: names::EMBEDDED_ID.to_string(),
            reason: "an embedded identifier must be the only identifier attribute".to_string(),
        });
    }

    match ids.as_slice() {
        [] => Err(MappingError::MissingIdentifier {
            entity: entity.entity_name.clone(),
        }),
        [single] if single.member.has_annotation(names::EMBEDDED_ID) => {
            bind_embedded_id(ctx, collector, entity, single, &overrides)
        }
        [single] if !is_to_one(single) => bind_simple_id(ctx, collector, entity, single, &overrides),
        _ => {
            let component = bind_non_aggregated_id(ctx, collector, entity, &ids, &overrides, None)?;
            entity.identifier = Some(Value::Component(component));
            entity.identifier_property = None;
            entity.embedded_identifier = true;
            debug!(entity = %entity.entity_name, parts = ids.len(), "Bound non-aggregated identifier");
            Ok(())
        }
    }
}

fn is_to_one(data: &PropertyData) -> bool {
    data.member.has_annotation(names::MANY_TO_ONE) || data.member.has_annotation(names::ONE_TO_ONE)
}

/// `@IdClass` of the entity, else of its nearest mapped superclass
fn id_class_name(
    ctx: &BindingContext<'_>,
    class: &ClassDetails,
    state: &InheritanceState,
) -> BindResult<Option<String>> {
    if let Some(usage) = class.annotation(names::ID_CLASS) {
        return Ok(usage.class_ref("value").map(str::to_string));
    }
    for name in state.mapped_superclasses.iter().rev() {
        let mapped = ctx.class(name, &class.name)?;
        if let Some(usage) = mapped.annotation(names::ID_CLASS) {
            return Ok(usage.class_ref("value").map(str::to_string));
        }
    }
    Ok(None)
}

fn bind_simple_id(
    ctx: &BindingContext<'_>,
    collector: &mut MetadataCollector,
    entity: &mut PersistentClass,
    data: &PropertyData,
    overrides: &AttributeOverrides,
) -> BindResult<()> {
    let path = AttributePath::parse(&data.name);
    let mut columns = AnnotatedColumns::from_member(
        ctx,
        &entity.entity_name,
        &data.member,
        &path,
        overrides,
        ColumnRole::Identifier,
    )?;
    if columns.is_formula() {
        return Err(MappingError::PropertyMisuse {
            entity: entity.entity_name.clone(),
            property: data.name.clone(),
            annotation: names::FORMULA.to_string(),
            reason: "an identifier cannot be a formula".to_string(),
        });
    }
    columns.force_not_null();

    let type_name = basic_type_name(collector, &data.member.type_name);
    let (mut value, join) = bind_basic_value(ctx, collector, entity, &columns, &type_name)?;
    if join.is_some() {
        return Err(MappingError::PropertyMisuse {
            entity: entity.entity_name.clone(),
            property: data.name.clone(),
            annotation: names::COLUMN.to_string(),
            reason: "identifier columns must live in the primary table".to_string(),
        });
    }
    value.generator = Some(bind_generator(ctx, collector, entity, data, &type_name)?);

    debug!(
        entity = %entity.entity_name,
        property = %data.name,
        generator = ?value.generator,
        "Bound simple identifier"
    );
    entity.identifier = Some(Value::Basic(value));
    entity.identifier_property = Some(data.name.clone());
    entity.embedded_identifier = false;
    Ok(())
}

fn bind_embedded_id(
    ctx: &BindingContext<'_>,
    collector: &mut MetadataCollector,
    entity: &mut PersistentClass,
    data: &PropertyData,
    overrides: &AttributeOverrides,
) -> BindResult<()> {
    let site = PropertySite {
        member: &data.member,
        declaring_class: &data.declaring_class,
        path: AttributePath::parse(&data.name),
        overrides,
        key: true,
    };
    let mut component = bind_component(ctx, collector, entity, &site)?;
    component.key = true;
    if component.properties.is_empty() {
        return Err(MappingError::PropertyMisuse {
            entity: entity.entity_name.clone(),
            property: data.name.clone(),
            annotation: names::EMBEDDED_ID.to_string(),
            reason: "the embedded identifier type has no attributes".to_string(),
        });
    }
    debug!(entity = %entity.entity_name, property = %data.name, "Bound embedded identifier");
    entity.identifier = Some(Value::Component(component));
    entity.identifier_property = Some(data.name.clone());
    entity.embedded_identifier = false;
    Ok(())
}

/// Component of the `@Id` attributes declared directly on the entity
fn bind_non_aggregated_id(
    ctx: &BindingContext<'_>,
    collector: &mut MetadataCollector,
    entity: &PersistentClass,
    ids: &[&PropertyData],
    overrides: &AttributeOverrides,
    id_class: Option<&str>,
) -> BindResult<Component> {
    let mut component = Component::new(format!("{}.id", entity.entity_name), entity.table);
    component.class_name = id_class.map(str::to_string);
    component.key = true;
    component.embedded = true;

    for data in ids {
        let site = PropertySite {
            member: &data.member,
            declaring_class: &data.declaring_class,
            path: AttributePath::parse(&data.name),
            overrides,
            key: true,
        };
        let mut property = bind_property(ctx, collector, entity, &site)?;
        if let Value::Basic(value) = &mut property.value {
            let type_name = value.type_name.clone().unwrap_or_default();
            value.generator = Some(bind_generator(ctx, collector, entity, data, &type_name)?);
        }
        component.properties.push(property);
    }
    Ok(component)
}

fn bind_id_class(
    ctx: &BindingContext<'_>,
    collector: &mut MetadataCollector,
    entity: &mut PersistentClass,
    id_class_name: &str,
    ids: &[&PropertyData],
    overrides: &AttributeOverrides,
) -> BindResult<()> {
    let id_class = ctx.class(id_class_name, &entity.entity_name)?;
    let class_attributes: Vec<&str> = id_class
        .attributes()
        .filter(|m| !m.has_annotation(names::TRANSIENT))
        .map(|m| m.name.as_str())
        .collect();
    let missing_in_id_class: Vec<String> = ids
        .iter()
        .filter(|p| !class_attributes.contains(&p.name.as_str()))
        .map(|p| p.name.clone())
        .collect();
    let missing_in_entity: Vec<String> = class_attributes
        .iter()
        .filter(|name| !ids.iter().any(|p| p.name == **name))
        .map(|name| name.to_string())
        .collect();
    if !missing_in_id_class.is_empty() || !missing_in_entity.is_empty() {
        return Err(MappingError::IdClassMismatch {
            entity: entity.entity_name.clone(),
            id_class: id_class.name.clone(),
            missing_in_id_class,
            missing_in_entity,
        });
    }
    if ids.is_empty() {
        return Err(MappingError::MissingIdentifier {
            entity: entity.entity_name.clone(),
        });
    }

    let component =
        bind_non_aggregated_id(ctx, collector, entity, ids, overrides, Some(&id_class.name))?;
    let mut mapper = component.clone();
    mapper.role = format!("{}.{}", entity.entity_name, IDENTIFIER_MAPPER_PROPERTY);

    let mut synthetic =
        Property::new(IDENTIFIER_MAPPER_PROPERTY, Value::Component(mapper.clone())).read_only();
    synthetic.synthetic = true;
    entity.properties.retain(|p| p.name != IDENTIFIER_MAPPER_PROPERTY);
    entity.properties.push(synthetic);
    entity.identifier_mapper = Some(mapper);
    entity.identifier = Some(Value::Component(component));
    entity.identifier_property = None;
    entity.embedded_identifier = true;
    debug!(entity = %entity.entity_name, id_class = %id_class.name, "Bound @IdClass identifier");
    Ok(())
}

/// Generator of an identifier attribute
///
/// Generators declared on the attribute itself are registered first. A
/// generator name that is not registered yet is resolved by a second pass.
fn bind_generator(
    ctx: &BindingContext<'_>,
    collector: &mut MetadataCollector,
    entity: &PersistentClass,
    data: &PropertyData,
    type_name: &str,
) -> BindResult<IdentifierGenerator> {
    let Some(generated) = data.member.annotation(names::GENERATED_VALUE) else {
        return Ok(IdentifierGenerator::Assigned);
    };
    registrations::register_generators(collector, &data.member, &data.declaring_class)?;

    if let Some(name) = generated.string("generator") {
        return Ok(match collector.identifier_generator(name) {
            Some(definition) => generator_from_definition(ctx, definition),
            None => {
                debug!(entity = %entity.entity_name, generator = name, "Generator not registered yet");
                collector.add_second_pass(SecondPass::IdGenerator {
                    entity: entity.entity_name.clone(),
                    property: data.name.clone(),
                    generator: name.to_string(),
                });
                IdentifierGenerator::Named {
                    name: name.to_string(),
                    strategy: String::new(),
                }
            }
        });
    }

    let strategy = generated.enum_value("strategy", "AUTO").to_ascii_uppercase();
    match strategy.as_str() {
        "AUTO" if is_uuid(type_name) => Ok(IdentifierGenerator::Uuid),
        "AUTO" | "SEQUENCE" => Ok(IdentifierGenerator::Sequence {
            name: default_sequence_name(ctx, entity),
        }),
        "TABLE" => Ok(IdentifierGenerator::Table {
            name: DEFAULT_GENERATOR_TABLE.to_string(),
        }),
        "IDENTITY" => Ok(IdentifierGenerator::Identity),
        "UUID" => Ok(IdentifierGenerator::Uuid),
        other => Err(MappingError::AnnotationMisuse {
            class: data.declaring_class.clone(),
            annotation: names::GENERATED_VALUE.to_string(),
            reason: format!("unknown generation strategy '{}'", other),
        }),
    }
}

fn is_uuid(type_name: &str) -> bool {
    type_name.eq_ignore_ascii_case("uuid") || type_name == "java.util.UUID"
}

/// `<entity>_SEQ`, after physical naming
fn default_sequence_name(ctx: &BindingContext<'_>, entity: &PersistentClass) -> String {
    let logical = Identifier::unquoted(format!("{}_SEQ", entity.jpa_entity_name));
    ctx.physical_sequence_name(&logical).text().to_string()
}

fn generator_from_definition(
    ctx: &BindingContext<'_>,
    definition: &IdentifierGeneratorDefinition,
) -> IdentifierGenerator {
    let parameter = |key: &str| {
        definition
            .parameters
            .get(key)
            .cloned()
            .unwrap_or_else(|| definition.name.clone())
    };
    match definition.strategy.as_str() {
        "sequence" => {
            let logical = Identifier::unquoted(parameter("sequence_name"));
            IdentifierGenerator::Sequence {
                name: ctx.physical_sequence_name(&logical).text().to_string(),
            }
        }
        "table" => IdentifierGenerator::Table {
            name: parameter("table"),
        },
        "identity" => IdentifierGenerator::Identity,
        "uuid" | "uuid2" => IdentifierGenerator::Uuid,
        "assigned" => IdentifierGenerator::Assigned,
        strategy => IdentifierGenerator::Named {
            name: definition.name.clone(),
            strategy: strategy.to_string(),
        },
    }
}

/// Second pass: attach a generator registered after its entity was bound
pub fn resolve_id_generator(
    session: &mut BootSession<'_>,
    entity: &str,
    property: &str,
    generator: &str,
) -> Resolution<()> {
    let ctx = session.context();
    let Some(definition) = session.collector.identifier_generator(generator) else {
        return Resolution::Fatal(MappingError::UnknownGenerator {
            entity: entity.to_string(),
            property: property.to_string(),
            generator: generator.to_string(),
        });
    };
    let resolved = generator_from_definition(&ctx, definition);

    let Some(owner) = session.collector.entity_mut(entity) else {
        return Resolution::Fatal(MappingError::AssertionFailure {
            class: entity.to_string(),
            message: "generator queued before its entity was registered".to_string(),
        });
    };
    let target = match owner.identifier.as_mut() {
        Some(Value::Basic(value)) => Some(value),
        Some(Value::Component(component)) => component
            .properties
            .iter_mut()
            .find(|p| p.name == property)
            .and_then(|p| match &mut p.value {
                Value::Basic(value) => Some(value),
                _ => None,
            }),
        _ => None,
    };
    match target {
        Some(value) => {
            value.generator = Some(resolved);
            Resolution::Resolved(())
        }
        None => Resolution::Fatal(MappingError::AssertionFailure {
            class: entity.to_string(),
            message: format!("'{}' is not a basic identifier attribute", property),
        }),
    }
}
