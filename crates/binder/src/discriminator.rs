// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Discriminators
//!
//! The discriminator column (or formula) lives on the hierarchy root; every
//! entity of the hierarchy gets a discriminator value.
//!
//! | Strategy | Column bound when |
//! |----------|-------------------|
//! | SINGLE_TABLE | the root has subclasses, or declares a discriminator |
//! | JOINED | declared and not ignored by configuration, or implicit discriminators are enabled |
//! | TABLE_PER_CLASS | never |
//!
//! Default values: the JPA entity name, or its Java `String.hashCode()` for
//! integer discriminators. Character discriminators need an explicit value.

use ormbind_model::{
    Column, Discriminator, DiscriminatorType, PersistentClass, Selectable, SimpleValue,
};
use ormbind_naming::{EntityNaming, ImplicitDiscriminatorColumnNameSource};
use ormbind_source::{names, Annotated, ClassDetails};
use tracing::{debug, warn};

use crate::collector::MetadataCollector;
use crate::column::add_column;
use crate::context::BindingContext;
use crate::error::{BindResult, MappingError, Resolution};
use crate::inheritance::{HierarchyPosition, InheritanceStrategy};
use crate::second_pass::SecondPass;
use crate::session::BootSession;

/// Length of a string discriminator column without explicit length
pub const DEFAULT_DISCRIMINATOR_LENGTH: u32 = 31;

/// Discriminator value meaning "rows whose discriminator is null"
pub const NULL_DISCRIMINATOR: &str = "null";

fn declares_discriminator(class: &ClassDetails) -> bool {
    class.has_annotation(names::DISCRIMINATOR_COLUMN) || class.has_annotation(names::DISCRIMINATOR_FORMULA)
}

/// Bind the discriminator column of `entity` if its strategy calls for one
///
/// A subclass declaring a discriminator is an error under SINGLE_TABLE and
/// ignored with a warning under JOINED.
pub fn bind_discriminator_column(
    ctx: &BindingContext<'_>,
    collector: &mut MetadataCollector,
    entity: &mut PersistentClass,
    class: &ClassDetails,
    strategy: &InheritanceStrategy,
) -> BindResult<()> {
    let declared = declares_discriminator(class);
    let wanted = match strategy {
        InheritanceStrategy::SingleTable(HierarchyPosition::Root { has_subclasses }) => {
            *has_subclasses || declared
        }
        InheritanceStrategy::SingleTable(HierarchyPosition::Subclass { .. }) => {
            if declared {
                return Err(MappingError::NonRootDiscriminator {
                    entity: entity.entity_name.clone(),
                    annotation: if class.has_annotation(names::DISCRIMINATOR_COLUMN) {
                        names::DISCRIMINATOR_COLUMN.to_string()
                    } else {
                        names::DISCRIMINATOR_FORMULA.to_string()
                    },
                });
            }
            false
        }
        InheritanceStrategy::Joined(HierarchyPosition::Root { .. }) => {
            if declared {
                !ctx.config.ignore_explicit_discriminators_for_joined
            } else {
                ctx.config.implicit_discriminators_for_joined
            }
        }
        InheritanceStrategy::Joined(HierarchyPosition::Subclass { .. }) => {
            if declared {
                warn!(
                    entity = %entity.entity_name,
                    "Discriminator declared on a JOINED subclass is ignored; declare it on the root"
                );
            }
            false
        }
        InheritanceStrategy::NoInheritance => declared,
        InheritanceStrategy::TablePerClass(_) => false,
    };
    if !wanted {
        return Ok(());
    }

    let discriminator = build_discriminator(ctx, collector, entity, class)?;
    debug!(
        entity = %entity.entity_name,
        discriminator_type = ?discriminator.discriminator_type,
        "Bound discriminator"
    );
    entity.discriminator = Some(discriminator);
    collector.add_second_pass(SecondPass::NullableDiscriminator {
        root: entity.entity_name.clone(),
    });
    Ok(())
}

fn build_discriminator(
    ctx: &BindingContext<'_>,
    collector: &mut MetadataCollector,
    entity: &PersistentClass,
    class: &ClassDetails,
) -> BindResult<Discriminator> {
    let parse_type = |text: &str, annotation: &str| {
        DiscriminatorType::parse(text).ok_or_else(|| MappingError::AnnotationMisuse {
            class: class.name.clone(),
            annotation: annotation.to_string(),
            reason: format!("unknown discriminator type '{}'", text),
        })
    };
    let mut value = SimpleValue::new(entity.table);

    let discriminator_type = if let Some(formula) = class.annotation(names::DISCRIMINATOR_FORMULA) {
        let sql = formula.string("value").ok_or_else(|| MappingError::AnnotationMisuse {
            class: class.name.clone(),
            annotation: names::DISCRIMINATOR_FORMULA.to_string(),
            reason: "formula is empty".to_string(),
        })?;
        value.selectables.push(Selectable::Formula(sql.to_string()));
        parse_type(
            formula.enum_value("discriminatorType", "STRING"),
            names::DISCRIMINATOR_FORMULA,
        )?
    } else {
        let column = class.annotation(names::DISCRIMINATOR_COLUMN);
        let discriminator_type = match column {
            Some(c) => parse_type(c.enum_value("discriminatorType", "STRING"), names::DISCRIMINATOR_COLUMN)?,
            None => DiscriminatorType::String,
        };
        let logical = match column.and_then(|c| c.string("name")).and_then(|n| ctx.identifier(n)) {
            Some(name) => name,
            None => ctx.implicit_identifier(ctx.implicit_naming.determine_discriminator_column_name(
                &ImplicitDiscriminatorColumnNameSource {
                    entity_naming: EntityNaming::new(
                        &entity.entity_name,
                        &entity.class_name,
                        &entity.jpa_entity_name,
                    ),
                },
            )),
        };
        let mut physical = Column::new(ctx.physical_column_name(&logical))
            .with_logical_name(logical)
            .with_type_name(discriminator_type.type_name())
            .with_nullable(false);
        physical.length = column
            .and_then(|c| c.int("length"))
            .and_then(|l| u32::try_from(l).ok())
            .or((discriminator_type == DiscriminatorType::String).then_some(DEFAULT_DISCRIMINATOR_LENGTH));
        physical.sql_type = column.and_then(|c| c.string("columnDefinition")).map(str::to_string);
        value.selectables.push(Selectable::Column(physical.name.clone()));
        add_column(collector, entity.table, physical);
        discriminator_type
    };
    value.type_name = Some(discriminator_type.type_name().to_string());

    let options = class.annotation(names::DISCRIMINATOR_OPTIONS);
    Ok(Discriminator {
        value,
        discriminator_type,
        force: options.is_some_and(|o| o.bool_or("force", false)),
        insertable: options.is_none_or(|o| o.bool_or("insert", true)),
    })
}

/// Java `String.hashCode()` of `text`
pub fn java_string_hash(text: &str) -> i32 {
    text.encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

/// Set the discriminator value of `entity`
///
/// `discriminator_type` is the type of the hierarchy's discriminator, or
/// `None` when the hierarchy has none.
pub fn bind_discriminator_value(
    entity: &mut PersistentClass,
    class: &ClassDetails,
    discriminator_type: Option<DiscriminatorType>,
) -> BindResult<()> {
    let explicit = class
        .annotation(names::DISCRIMINATOR_VALUE)
        .and_then(|v| v.string("value"))
        .map(str::to_string);
    let value = match (explicit, discriminator_type) {
        (Some(value), _) => value,
        (None, Some(DiscriminatorType::Char)) => {
            return Err(MappingError::MissingDiscriminatorValue {
                entity: entity.entity_name.clone(),
            });
        }
        (None, Some(DiscriminatorType::Integer)) => java_string_hash(&entity.jpa_entity_name).to_string(),
        (None, _) => entity.jpa_entity_name.clone(),
    };
    debug!(entity = %entity.entity_name, value = %value, "Bound discriminator value");
    entity.discriminator_value = Some(value);
    Ok(())
}

/// Make the discriminator column nullable when an entity of the hierarchy
/// uses the `null` discriminator value
pub fn apply_null_discriminator_value(session: &mut BootSession<'_>, root: &str) -> Resolution<()> {
    let collector = &session.collector;
    let Some(root_entity) = collector.entity(root) else {
        return Resolution::Fatal(MappingError::AssertionFailure {
            class: root.to_string(),
            message: "discriminator pass queued before the root was registered".to_string(),
        });
    };
    let Some(discriminator) = &root_entity.discriminator else {
        return Resolution::Resolved(());
    };
    let uses_null = collector
        .entities()
        .filter(|e| {
            collector
                .root_entity(&e.entity_name)
                .is_some_and(|r| r.entity_name == root_entity.entity_name)
        })
        .any(|e| e.discriminator_value.as_deref() == Some(NULL_DISCRIMINATOR));
    if !uses_null {
        return Resolution::Resolved(());
    }

    let table = discriminator.value.table;
    let columns: Vec<_> = discriminator
        .value
        .selectables
        .iter()
        .filter_map(Selectable::as_column)
        .cloned()
        .collect();
    let table = session.collector.table_mut(table);
    for name in &columns {
        if let Some(column) = table.column_mut(name) {
            column.nullable = true;
        }
    }
    debug!(root, "Discriminator column made nullable for null value");
    Resolution::Resolved(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BinderConfig;
    use crate::type_binder::TypeBinderRegistry;
    use ormbind_model::{Identifier, PersistentClassKind, QualifiedTableName};
    use ormbind_naming::{IdentityPhysicalNaming, JpaCompliantNamingStrategy};
    use ormbind_source::{AnnotationUsage, StaticAnnotationSource};

    fn animal(collector: &mut MetadataCollector) -> PersistentClass {
        let logical = Identifier::unquoted("Animal");
        let (table, _) = collector.add_table(QualifiedTableName::new(None, None, logical.clone()), logical);
        PersistentClass::new("com.zoo.Animal", "Animal", PersistentClassKind::Root, table)
    }

    #[test]
    fn test_java_string_hash() {
        assert_eq!(java_string_hash("Cat"), 67510);
        assert_eq!(java_string_hash(""), 0);
        // wraps like a Java int
        assert_eq!(java_string_hash("polygenelubricants"), i32::MIN);
    }

    #[test]
    fn test_discriminator_value_rules() {
        let mut collector = MetadataCollector::new();
        let mut entity = animal(&mut collector);
        let plain = ClassDetails::new("com.zoo.Animal");

        bind_discriminator_value(&mut entity, &plain, Some(DiscriminatorType::String)).unwrap();
        assert_eq!(entity.discriminator_value.as_deref(), Some("Animal"));

        let result = bind_discriminator_value(&mut entity, &plain, Some(DiscriminatorType::Char));
        match result {
            Err(MappingError::MissingDiscriminatorValue { entity }) => assert_eq!(entity, "com.zoo.Animal"),
            _ => panic!("Expected MissingDiscriminatorValue error, got {:?}", result),
        }

        let explicit = ClassDetails::new("com.zoo.Animal")
            .with_annotation(AnnotationUsage::new(names::DISCRIMINATOR_VALUE).with("value", "A"));
        bind_discriminator_value(&mut entity, &explicit, Some(DiscriminatorType::Char)).unwrap();
        assert_eq!(entity.discriminator_value.as_deref(), Some("A"));

        entity.jpa_entity_name = "Cat".to_string();
        bind_discriminator_value(&mut entity, &plain, Some(DiscriminatorType::Integer)).unwrap();
        assert_eq!(entity.discriminator_value.as_deref(), Some("67510"));
    }

    #[test]
    fn test_single_table_root_without_subclasses_has_no_column() {
        let source = StaticAnnotationSource::new();
        let config = BinderConfig::default();
        let binders = TypeBinderRegistry::new();
        let ctx = BindingContext::new(&source, &JpaCompliantNamingStrategy, &IdentityPhysicalNaming, &config, &binders);
        let mut collector = MetadataCollector::new();
        let mut entity = animal(&mut collector);
        let class = ClassDetails::new("com.zoo.Animal");

        let lonely = InheritanceStrategy::SingleTable(HierarchyPosition::Root { has_subclasses: false });
        bind_discriminator_column(&ctx, &mut collector, &mut entity, &class, &lonely).unwrap();
        assert!(entity.discriminator.is_none());
        assert!(collector.second_passes().is_empty());

        let parent = InheritanceStrategy::SingleTable(HierarchyPosition::Root { has_subclasses: true });
        bind_discriminator_column(&ctx, &mut collector, &mut entity, &class, &parent).unwrap();
        let discriminator = entity.discriminator.as_ref().unwrap();
        assert_eq!(discriminator.discriminator_type, DiscriminatorType::String);
        let column = collector
            .table(entity.table)
            .column(&Identifier::unquoted("DTYPE"))
            .unwrap();
        assert_eq!(column.length, Some(DEFAULT_DISCRIMINATOR_LENGTH));
        assert!(!column.nullable);
        assert_eq!(collector.second_passes().len(), 1);
    }

    #[test]
    fn test_non_root_single_table_discriminator_rejected() {
        let source = StaticAnnotationSource::new();
        let config = BinderConfig::default();
        let binders = TypeBinderRegistry::new();
        let ctx = BindingContext::new(&source, &JpaCompliantNamingStrategy, &IdentityPhysicalNaming, &config, &binders);
        let mut collector = MetadataCollector::new();
        let mut entity = animal(&mut collector);
        let class = ClassDetails::new("com.zoo.Dog")
            .with_annotation(AnnotationUsage::new(names::DISCRIMINATOR_COLUMN).with("name", "KIND"));
        let strategy = InheritanceStrategy::SingleTable(HierarchyPosition::Subclass {
            super_entity: "com.zoo.Animal".to_string(),
        });
        let result = bind_discriminator_column(&ctx, &mut collector, &mut entity, &class, &strategy);
        match result {
            Err(MappingError::NonRootDiscriminator { annotation, .. }) => {
                assert_eq!(annotation, names::DISCRIMINATOR_COLUMN)
            }
            _ => panic!("Expected NonRootDiscriminator error, got {:?}", result),
        }

        // JOINED subclasses only warn
        let joined = InheritanceStrategy::Joined(HierarchyPosition::Subclass {
            super_entity: "com.zoo.Animal".to_string(),
        });
        bind_discriminator_column(&ctx, &mut collector, &mut entity, &class, &joined).unwrap();
        assert!(entity.discriminator.is_none());
    }

    #[test]
    fn test_integer_discriminator_column() {
        let source = StaticAnnotationSource::new();
        let config = BinderConfig::default();
        let binders = TypeBinderRegistry::new();
        let ctx = BindingContext::new(&source, &JpaCompliantNamingStrategy, &IdentityPhysicalNaming, &config, &binders);
        let mut collector = MetadataCollector::new();
        let mut entity = animal(&mut collector);
        let class = ClassDetails::new("com.zoo.Animal").with_annotation(
            AnnotationUsage::new(names::DISCRIMINATOR_COLUMN)
                .with("name", "KIND")
                .with("discriminatorType", "INTEGER"),
        );
        let strategy = InheritanceStrategy::Joined(HierarchyPosition::Root { has_subclasses: true });
        bind_discriminator_column(&ctx, &mut collector, &mut entity, &class, &strategy).unwrap();
        let column = collector
            .table(entity.table)
            .column(&Identifier::unquoted("KIND"))
            .unwrap();
        assert_eq!(column.length, None);
        assert_eq!(column.type_name.as_deref(), Some(DiscriminatorType::Integer.type_name()));
    }
}
