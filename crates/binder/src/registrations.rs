// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Hierarchy-wide Registrations
//!
//! Definitions any mapped class may declare that apply to the whole boot.
//! They are registered for every class before the first entity is bound, so
//! a generator, type registration or filter definition can be used by an
//! entity bound earlier than the class declaring it.
//!
//! | Annotation | Registered as |
//! |------------|---------------|
//! | `@SequenceGenerator`, `@TableGenerator`, `@GenericGenerator` | identifier generator |
//! | `@NamedQuery`, `@NamedNativeQuery` | named query |
//! | `@FilterDef` | filter definition |
//! | `@FetchProfile` | fetch profile, verified by a final second pass |
//! | `@TypeRegistration` | basic type of a Java type |
//! | `@Imported` | import name |

use indexmap::IndexMap;
use ormbind_model::{
    FetchOverride, FetchProfile, FilterDefinition, IdentifierGeneratorDefinition, NamedQueryDefinition,
    TypeRegistration,
};
use ormbind_source::{names, simple_name, Annotated, AnnotationUsage, ClassDetails};
use tracing::debug;

use crate::collector::MetadataCollector;
use crate::error::{BindResult, MappingError, Resolution};
use crate::second_pass::SecondPass;
use crate::session::BootSession;

/// Table used by table generators that do not name one
pub const DEFAULT_GENERATOR_TABLE: &str = "hibernate_sequences";
/// Allocation size of sequence and table generators
pub const DEFAULT_ALLOCATION_SIZE: i64 = 50;

const FETCH_MODES: [&str; 3] = ["JOIN", "SELECT", "SUBSELECT"];

fn misuse(class: &str, annotation: &str, reason: impl Into<String>) -> MappingError {
    MappingError::AnnotationMisuse {
        class: class.to_string(),
        annotation: annotation.to_string(),
        reason: reason.into(),
    }
}

fn required<'u>(usage: &'u AnnotationUsage, key: &str, class: &str) -> BindResult<&'u str> {
    usage
        .string(key)
        .ok_or_else(|| misuse(class, &usage.name, format!("'{}' is required", key)))
}

/// Register every definition `class` declares
pub fn register_class_definitions(collector: &mut MetadataCollector, class: &ClassDetails) -> BindResult<()> {
    register_generators(collector, class, &class.name)?;
    register_named_queries(collector, class)?;
    register_filter_definitions(collector, class)?;
    register_fetch_profiles(collector, class)?;
    register_type_registrations(collector, class)?;
    register_import(collector, class)?;
    Ok(())
}

/// Register the identifier generators declared on a class or member
pub fn register_generators(
    collector: &mut MetadataCollector,
    annotated: &impl Annotated,
    declaring_class: &str,
) -> BindResult<()> {
    for usage in annotated.repeated_annotations(names::SEQUENCE_GENERATOR, names::SEQUENCE_GENERATORS) {
        collector.add_identifier_generator(sequence_generator(usage, declaring_class)?)?;
    }
    for usage in annotated.repeated_annotations(names::TABLE_GENERATOR, names::TABLE_GENERATORS) {
        collector.add_identifier_generator(table_generator(usage, declaring_class)?)?;
    }
    for usage in annotated.repeated_annotations(names::GENERIC_GENERATOR, names::GENERIC_GENERATORS) {
        collector.add_identifier_generator(generic_generator(usage, declaring_class)?)?;
    }
    Ok(())
}

fn sequence_generator(usage: &AnnotationUsage, class: &str) -> BindResult<IdentifierGeneratorDefinition> {
    let name = required(usage, "name", class)?;
    let mut definition = IdentifierGeneratorDefinition::new(name, "sequence", class)
        .with_parameter("sequence_name", usage.string("sequenceName").unwrap_or(name))
        .with_parameter("initial_value", usage.int("initialValue").unwrap_or(1).to_string())
        .with_parameter(
            "increment_size",
            usage
                .int("allocationSize")
                .unwrap_or(DEFAULT_ALLOCATION_SIZE)
                .to_string(),
        );
    for key in ["schema", "catalog"] {
        if let Some(value) = usage.string(key) {
            definition = definition.with_parameter(key, value);
        }
    }
    Ok(definition)
}

fn table_generator(usage: &AnnotationUsage, class: &str) -> BindResult<IdentifierGeneratorDefinition> {
    let name = required(usage, "name", class)?;
    let mut definition = IdentifierGeneratorDefinition::new(name, "table", class)
        .with_parameter("table", usage.string("table").unwrap_or(DEFAULT_GENERATOR_TABLE))
        .with_parameter(
            "primary_key_column",
            usage.string("pkColumnName").unwrap_or("sequence_name"),
        )
        .with_parameter("value_column", usage.string("valueColumnName").unwrap_or("next_val"))
        .with_parameter("segment_value", usage.string("pkColumnValue").unwrap_or("default"))
        .with_parameter("initial_value", usage.int("initialValue").unwrap_or(0).to_string())
        .with_parameter(
            "increment_size",
            usage
                .int("allocationSize")
                .unwrap_or(DEFAULT_ALLOCATION_SIZE)
                .to_string(),
        );
    for key in ["schema", "catalog"] {
        if let Some(value) = usage.string(key) {
            definition = definition.with_parameter(key, value);
        }
    }
    Ok(definition)
}

fn generic_generator(usage: &AnnotationUsage, class: &str) -> BindResult<IdentifierGeneratorDefinition> {
    let name = required(usage, "name", class)?;
    let strategy = usage
        .string("strategy")
        .or_else(|| usage.class_ref("type"))
        .ok_or_else(|| misuse(class, names::GENERIC_GENERATOR, "either 'strategy' or 'type' is required"))?;
    let mut definition = IdentifierGeneratorDefinition::new(name, strategy, class);
    for parameter in usage.nested_list("parameters") {
        let key = required(parameter, "name", class)?;
        definition = definition.with_parameter(key, parameter.string_or_empty("value"));
    }
    Ok(definition)
}

fn register_named_queries(collector: &mut MetadataCollector, class: &ClassDetails) -> BindResult<()> {
    let jpql = class.repeated_annotations(names::NAMED_QUERY, names::NAMED_QUERIES);
    let native = class.repeated_annotations(names::NAMED_NATIVE_QUERY, names::NAMED_NATIVE_QUERIES);
    let tagged = jpql
        .into_iter()
        .map(|usage| (usage, false))
        .chain(native.into_iter().map(|usage| (usage, true)));
    for (usage, is_native) in tagged {
        let query = NamedQueryDefinition {
            name: required(usage, "name", &class.name)?.to_string(),
            query: required(usage, "query", &class.name)?.to_string(),
            native: is_native,
            result_class: usage.class_ref("resultClass").map(str::to_string),
            declaring_class: class.name.clone(),
        };
        debug!(query = %query.name, native = is_native, "Registered named query");
        collector.add_named_query(query)?;
    }
    Ok(())
}

fn register_filter_definitions(collector: &mut MetadataCollector, class: &ClassDetails) -> BindResult<()> {
    for usage in class.repeated_annotations(names::FILTER_DEF, names::FILTER_DEFS) {
        let mut parameters = IndexMap::new();
        for parameter in usage.nested_list("parameters") {
            parameters.insert(
                required(parameter, "name", &class.name)?.to_string(),
                parameter.string("type").unwrap_or("string").to_string(),
            );
        }
        let definition = FilterDefinition {
            name: required(usage, "name", &class.name)?.to_string(),
            default_condition: usage.string("defaultCondition").map(str::to_string),
            parameters,
        };
        collector.add_filter_definition(definition, &class.name)?;
    }
    Ok(())
}

fn register_fetch_profiles(collector: &mut MetadataCollector, class: &ClassDetails) -> BindResult<()> {
    for usage in class.repeated_annotations(names::FETCH_PROFILE, names::FETCH_PROFILES) {
        let name = required(usage, "name", &class.name)?.to_string();
        let mut overrides = Vec::new();
        for fetch in usage.nested_list("fetchOverrides") {
            let mode = fetch.enum_value("mode", "JOIN").to_ascii_uppercase();
            if !FETCH_MODES.contains(&mode.as_str()) {
                return Err(misuse(
                    &class.name,
                    names::FETCH_PROFILE,
                    format!("unknown fetch mode '{}' in profile '{}'", mode, name),
                ));
            }
            let entity = fetch
                .class_ref("entity")
                .ok_or_else(|| misuse(&class.name, names::FETCH_PROFILE, "a fetch override needs an entity"))?;
            overrides.push(FetchOverride {
                entity: entity.to_string(),
                association: required(fetch, "association", &class.name)?.to_string(),
                mode,
            });
        }
        collector.add_fetch_profile(
            FetchProfile {
                name: name.clone(),
                overrides,
            },
            &class.name,
        )?;
        collector.add_second_pass(SecondPass::FetchProfile { name });
    }
    Ok(())
}

fn register_type_registrations(collector: &mut MetadataCollector, class: &ClassDetails) -> BindResult<()> {
    for usage in class.repeated_annotations(names::TYPE_REGISTRATION, names::TYPE_REGISTRATIONS) {
        let java_type = usage
            .class_ref("basicClass")
            .ok_or_else(|| misuse(&class.name, names::TYPE_REGISTRATION, "'basicClass' is required"))?;
        let type_name = usage
            .class_ref("userType")
            .ok_or_else(|| misuse(&class.name, names::TYPE_REGISTRATION, "'userType' is required"))?;
        collector.add_type_registration(
            TypeRegistration {
                java_type: java_type.to_string(),
                type_name: type_name.to_string(),
            },
            &class.name,
        )?;
    }
    Ok(())
}

fn register_import(collector: &mut MetadataCollector, class: &ClassDetails) -> BindResult<()> {
    if let Some(imported) = class.annotation(names::IMPORTED) {
        let name = imported
            .string("rename")
            .unwrap_or_else(|| simple_name(&class.name));
        debug!(class = %class.name, import = name, "Registered import");
        collector.add_import(name, class.name.clone())?;
    }
    Ok(())
}

/// Check that every override of a fetch profile names a bound association
pub fn verify_fetch_profile(session: &mut BootSession<'_>, name: &str) -> Resolution<()> {
    let collector = &session.collector;
    let Some(profile) = collector.fetch_profile(name) else {
        return Resolution::Fatal(MappingError::AssertionFailure {
            class: name.to_string(),
            message: "fetch profile verified before it was registered".to_string(),
        });
    };
    for fetch in &profile.overrides {
        if !has_association(collector, &fetch.entity, &fetch.association) {
            return Resolution::Fatal(MappingError::UnknownFetchProfileTarget {
                profile: profile.name.clone(),
                entity: fetch.entity.clone(),
                association: fetch.association.clone(),
            });
        }
    }
    debug!(profile = name, overrides = profile.overrides.len(), "Verified fetch profile");
    Resolution::Resolved(())
}

/// Whether `entity` or one of its super entities maps `association`
fn has_association(collector: &MetadataCollector, entity: &str, association: &str) -> bool {
    let mut current = collector.entity(entity);
    while let Some(pc) = current {
        if pc.property_by_path(association).is_some() {
            return true;
        }
        current = pc.superclass.as_deref().and_then(|s| collector.entity(s));
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BinderConfig;
    use crate::context::BindingContext;
    use crate::type_binder::TypeBinderRegistry;
    use ormbind_model::{PersistentClass, PersistentClassKind, Property, TableId, ToOne, ToOneKind, Value};
    use ormbind_naming::{IdentityPhysicalNaming, JpaCompliantNamingStrategy};
    use ormbind_source::StaticAnnotationSource;

    #[test]
    fn test_sequence_generator_defaults() {
        let class = ClassDetails::new("com.acme.Order").with_annotation(
            AnnotationUsage::new(names::SEQUENCE_GENERATOR)
                .with("name", "order_seq")
                .with("allocationSize", 10i64),
        );
        let mut collector = MetadataCollector::new();
        register_class_definitions(&mut collector, &class).unwrap();

        let generator = collector.identifier_generator("order_seq").unwrap();
        assert_eq!(generator.strategy, "sequence");
        assert_eq!(generator.parameters["sequence_name"], "order_seq");
        assert_eq!(generator.parameters["initial_value"], "1");
        assert_eq!(generator.parameters["increment_size"], "10");
    }

    #[test]
    fn test_table_and_generic_generators() {
        let class = ClassDetails::new("com.acme.Ids")
            .with_annotation(AnnotationUsage::new(names::TABLE_GENERATOR).with("name", "ids"))
            .with_annotation(
                AnnotationUsage::new(names::GENERIC_GENERATOR)
                    .with("name", "hilo")
                    .with("strategy", "enhanced-sequence")
                    .with(
                        "parameters",
                        vec![AnnotationUsage::new("Parameter")
                            .with("name", "optimizer")
                            .with("value", "pooled")],
                    ),
            );
        let mut collector = MetadataCollector::new();
        register_generators(&mut collector, &class, &class.name).unwrap();

        let table = collector.identifier_generator("ids").unwrap();
        assert_eq!(table.parameters["table"], DEFAULT_GENERATOR_TABLE);
        let generic = collector.identifier_generator("hilo").unwrap();
        assert_eq!(generic.strategy, "enhanced-sequence");
        assert_eq!(generic.parameters["optimizer"], "pooled");
    }

    #[test]
    fn test_generator_without_name_is_rejected() {
        let class = ClassDetails::new("com.acme.Order")
            .with_annotation(AnnotationUsage::new(names::SEQUENCE_GENERATOR).with("sequenceName", "SEQ"));
        let mut collector = MetadataCollector::new();
        let result = register_class_definitions(&mut collector, &class);
        match result {
            Err(MappingError::AnnotationMisuse { annotation, .. }) => {
                assert_eq!(annotation, names::SEQUENCE_GENERATOR)
            }
            _ => panic!("Expected AnnotationMisuse error, got {:?}", result),
        }
    }

    #[test]
    fn test_duplicate_query_names_are_fatal() {
        let query = || {
            AnnotationUsage::new(names::NAMED_QUERY)
                .with("name", "Order.all")
                .with("query", "from Order")
        };
        let mut collector = MetadataCollector::new();
        register_class_definitions(&mut collector, &ClassDetails::new("A").with_annotation(query())).unwrap();
        let result = register_class_definitions(&mut collector, &ClassDetails::new("B").with_annotation(query()));
        match result {
            Err(MappingError::DuplicateQuery { first, second, .. }) => {
                assert_eq!(first, "A");
                assert_eq!(second, "B");
            }
            _ => panic!("Expected DuplicateQuery error, got {:?}", result),
        }
    }

    #[test]
    fn test_filter_definition_and_type_registration() {
        let class = ClassDetails::new("com.acme.Order")
            .with_annotation(
                AnnotationUsage::new(names::FILTER_DEF)
                    .with("name", "tenant")
                    .with("defaultCondition", "tenant_id = :tenant")
                    .with(
                        "parameters",
                        vec![AnnotationUsage::new("ParamDef")
                            .with("name", "tenant")
                            .with("type", "long")],
                    ),
            )
            .with_annotation(
                AnnotationUsage::new(names::TYPE_REGISTRATION)
                    .with("basicClass", "com.acme.Money")
                    .with("userType", "money"),
            )
            .with_annotation(AnnotationUsage::new(names::IMPORTED).with("rename", "OrderView"));
        let mut collector = MetadataCollector::new();
        register_class_definitions(&mut collector, &class).unwrap();

        let filter = collector.filter_definition("tenant").unwrap();
        assert_eq!(filter.parameters["tenant"], "long");
        assert_eq!(collector.registered_type("com.acme.Money"), Some("money"));
        assert_eq!(collector.import("OrderView"), Some("com.acme.Order"));
    }

    #[test]
    fn test_fetch_profile_is_verified_after_binding() {
        let class = ClassDetails::new("com.acme.Order").with_annotation(
            AnnotationUsage::new(names::FETCH_PROFILE).with("name", "with-customer").with(
                "fetchOverrides",
                vec![AnnotationUsage::new("FetchOverride")
                    .with("entity", "com.acme.Order")
                    .with("association", "customer")],
            ),
        );
        let source = StaticAnnotationSource::new();
        let config = BinderConfig::default();
        let binders = TypeBinderRegistry::new();
        let ctx = BindingContext::new(
            &source,
            &JpaCompliantNamingStrategy,
            &IdentityPhysicalNaming,
            &config,
            &binders,
        );
        let mut session = BootSession::new(ctx);
        register_class_definitions(&mut session.collector, &class).unwrap();
        assert_eq!(session.collector.second_passes().len(), 1);

        let order = PersistentClass::new("com.acme.Order", "Order", PersistentClassKind::Root, TableId(0));
        session.collector.add_entity_binding(order).unwrap();
        let result = verify_fetch_profile(&mut session, "with-customer");
        match result {
            Resolution::Fatal(MappingError::UnknownFetchProfileTarget { association, .. }) => {
                assert_eq!(association, "customer")
            }
            _ => panic!("Expected UnknownFetchProfileTarget error, got {:?}", result),
        }

        session
            .collector
            .entity_mut("com.acme.Order")
            .unwrap()
            .properties
            .push(Property::new(
                "customer",
                Value::ToOne(ToOne::new(ToOneKind::ManyToOne, TableId(0), "com.acme.Customer")),
            ));
        assert!(verify_fetch_profile(&mut session, "with-customer").is_resolved());
    }

    #[test]
    fn test_unknown_fetch_mode() {
        let class = ClassDetails::new("com.acme.Order").with_annotation(
            AnnotationUsage::new(names::FETCH_PROFILE).with("name", "p").with(
                "fetchOverrides",
                vec![AnnotationUsage::new("FetchOverride")
                    .with("entity", "com.acme.Order")
                    .with("association", "lines")
                    .with("mode", "FetchMode.EAGERLY")],
            ),
        );
        let mut collector = MetadataCollector::new();
        assert!(register_class_definitions(&mut collector, &class).is_err());
    }
}
