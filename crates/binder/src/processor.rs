// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Annotation Processing Entry Point
//!
//! [`MetadataBuilder`] drives one boot:
//!
//! ```text
//! requested classes → complete with superclasses → order supertypes first
//!     → inheritance states → definitions of every class → embeddables
//!     → entity binder per entity → second-pass drain → Metadata
//! ```
//!
//! ## Usage
//!
//! ```
//! use ormbind_binder::MetadataBuilder;
//! use ormbind_source::{names, AnnotationUsage, ClassDetails, MemberDetails, StaticAnnotationSource};
//!
//! let source = StaticAnnotationSource::new().with_class(
//!     ClassDetails::new("com.acme.Order")
//!         .with_annotation(AnnotationUsage::new(names::ENTITY))
//!         .with_member(MemberDetails::field("id", "long").with_annotation(AnnotationUsage::new(names::ID))),
//! );
//!
//! let metadata = MetadataBuilder::new(&source).build().unwrap();
//! assert!(metadata.entity("com.acme.Order").is_some());
//! ```

use indexmap::IndexSet;
use ormbind_model::Metadata;
use ormbind_naming::{ImplicitNamingStrategy, PhysicalNamingStrategy};
use ormbind_source::{names, Annotated, AnnotationSource, ClassDetails};
use tracing::{debug, info, instrument};

use crate::config::BinderConfig;
use crate::context::BindingContext;
use crate::entity::bind_entity;
use crate::error::{BindResult, MappingError};
use crate::inheritance::build_inheritance_states;
use crate::registrations::register_class_definitions;
use crate::second_pass::drain;
use crate::session::BootSession;
use crate::type_binder::{TypeBinder, TypeBinderRegistry};

/// Builds [`Metadata`] from the annotated classes of a source
pub struct MetadataBuilder<'s> {
    source: &'s dyn AnnotationSource,
    config: BinderConfig,
    implicit_naming: Option<Box<dyn ImplicitNamingStrategy>>,
    physical_naming: Option<Box<dyn PhysicalNamingStrategy>>,
    type_binders: TypeBinderRegistry,
    /// `None` binds every class of the source
    classes: Option<Vec<String>>,
}

impl<'s> MetadataBuilder<'s> {
    pub fn new(source: &'s dyn AnnotationSource) -> Self {
        Self {
            source,
            config: BinderConfig::default(),
            implicit_naming: None,
            physical_naming: None,
            type_binders: TypeBinderRegistry::new(),
            classes: None,
        }
    }

    pub fn with_config(mut self, config: BinderConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `strategy` instead of the one named by the configuration
    pub fn with_implicit_naming_strategy(mut self, strategy: impl ImplicitNamingStrategy + 'static) -> Self {
        self.implicit_naming = Some(Box::new(strategy));
        self
    }

    /// Use `strategy` instead of the one named by the configuration
    pub fn with_physical_naming_strategy(mut self, strategy: impl PhysicalNamingStrategy + 'static) -> Self {
        self.physical_naming = Some(Box::new(strategy));
        self
    }

    /// Register the binder `@TypeBinderType(binder = name)` refers to
    pub fn with_type_binder(mut self, name: impl Into<String>, binder: impl TypeBinder + 'static) -> Self {
        self.type_binders.register(name, Box::new(binder));
        self
    }

    /// Bind only these classes and their superclasses
    pub fn with_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.classes = Some(classes.into_iter().map(Into::into).collect());
        self
    }

    /// Run the boot
    ///
    /// # Errors
    ///
    /// The first fatal [`MappingError`], including a deferral no second pass
    /// could resolve.
    #[instrument(skip_all)]
    pub fn build(self) -> BindResult<Metadata> {
        self.config
            .validate()
            .map_err(|e| MappingError::Config(e.to_string()))?;

        let implicit_naming = self
            .implicit_naming
            .unwrap_or_else(|| self.config.implicit_naming.strategy());
        let physical_naming = self
            .physical_naming
            .unwrap_or_else(|| self.config.physical_naming.strategy());
        let ctx = BindingContext::new(
            self.source,
            implicit_naming.as_ref(),
            physical_naming.as_ref(),
            &self.config,
            &self.type_binders,
        );

        let requested = match self.classes {
            Some(classes) => classes,
            None => self.source.class_names(),
        };
        let classes = ordered_classes(self.source, &requested)?;
        info!(
            requested = requested.len(),
            classes = classes.len(),
            dialect = ?self.config.dialect,
            "Binding annotated classes"
        );

        let states = build_inheritance_states(&ctx, &classes)?;
        let mut session = BootSession::new(ctx);
        for class in &classes {
            register_class_definitions(&mut session.collector, class)?;
        }
        for class in classes.iter().filter(|c| c.has_annotation(names::EMBEDDABLE)) {
            session.collector.add_embeddable(&class.name);
        }

        let mut entities = 0;
        for class in classes.iter().filter(|c| c.has_annotation(names::ENTITY)) {
            bind_entity(&mut session, class, &states)?;
            entities += 1;
        }
        debug!(
            entities,
            second_passes = session.collector.second_passes().len(),
            "First pass complete"
        );

        drain(&mut session)?;
        let metadata = session.into_metadata();
        info!(
            entities = metadata.entities.len(),
            tables = metadata.tables.len(),
            collections = metadata.collections.len(),
            "Built mapping metadata"
        );
        Ok(metadata)
    }
}

/// Requested classes plus the superclasses the source knows, each class after
/// its superclass
///
/// A superclass missing from the source (e.g. `java.lang.Object`) ends the
/// chain.
///
/// # Errors
///
/// A requested class the source does not know.
pub fn ordered_classes<'s>(
    source: &'s dyn AnnotationSource,
    requested: &[String],
) -> BindResult<Vec<&'s ClassDetails>> {
    let mut ordered: IndexSet<&str> = IndexSet::new();
    for name in requested {
        let class = source.resolve_class(name)?;
        let mut chain = vec![class];
        let mut current = class;
        while let Some(superclass) = current.superclass.as_deref().and_then(|s| source.class_details(s)) {
            if ordered.contains(superclass.name.as_str()) || chain.iter().any(|c| c.name == superclass.name) {
                break;
            }
            chain.push(superclass);
            current = superclass;
        }
        for class in chain.into_iter().rev() {
            ordered.insert(class.name.as_str());
        }
    }
    Ok(ordered
        .into_iter()
        .filter_map(|name| source.class_details(name))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ormbind_model::Identifier;
    use ormbind_naming::SnakeCasePhysicalNaming;
    use ormbind_source::{AnnotationUsage, MemberDetails, SourceError, StaticAnnotationSource};

    fn entity(name: &str) -> ClassDetails {
        ClassDetails::new(name).with_annotation(AnnotationUsage::new(names::ENTITY))
    }

    fn id_field() -> MemberDetails {
        MemberDetails::field("id", "long").with_annotation(AnnotationUsage::new(names::ID))
    }

    #[test]
    fn test_ordered_classes_puts_superclasses_first() {
        let source = StaticAnnotationSource::new()
            .with_class(entity("Cat").with_superclass("Animal"))
            .with_class(entity("Dog").with_superclass("Animal"))
            .with_class(entity("Animal").with_superclass("java.lang.Object").with_member(id_field()));

        let classes = ordered_classes(&source, &["Cat".to_string(), "Dog".to_string()]).unwrap();
        let names: Vec<&str> = classes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Animal", "Cat", "Dog"]);
    }

    #[test]
    fn test_unknown_requested_class() {
        let source = StaticAnnotationSource::new();
        let result = MetadataBuilder::new(&source).with_classes(["Missing"]).build();
        match result {
            Err(MappingError::Source(SourceError::ClassNotFound(name))) => assert_eq!(name, "Missing"),
            _ => panic!("Expected ClassNotFound error, got {:?}", result.map(|_| ())),
        }
    }

    #[test]
    fn test_build_binds_requested_hierarchy() {
        let source = StaticAnnotationSource::new()
            .with_class(
                entity("com.acme.LineItem")
                    .with_member(id_field())
                    .with_member(MemberDetails::field("unitPrice", "java.math.BigDecimal")),
            )
            .with_class(entity("com.acme.Unrelated").with_member(id_field()));

        let metadata = MetadataBuilder::new(&source)
            .with_classes(["com.acme.LineItem"])
            .with_physical_naming_strategy(SnakeCasePhysicalNaming)
            .build()
            .unwrap();

        assert_eq!(metadata.entities.len(), 1);
        let table = metadata.entity_table("com.acme.LineItem").unwrap();
        assert_eq!(table.name.table, Identifier::unquoted("line_item"));
        assert!(table.has_column(&Identifier::unquoted("unit_price")));
    }

    #[test]
    fn test_embeddables_are_recorded() {
        let source = StaticAnnotationSource::new()
            .with_class(
                ClassDetails::new("Address")
                    .with_annotation(AnnotationUsage::new(names::EMBEDDABLE))
                    .with_member(MemberDetails::field("city", "String")),
            )
            .with_class(
                entity("Customer")
                    .with_member(id_field())
                    .with_member(MemberDetails::field("address", "Address").with_annotation(AnnotationUsage::new(names::EMBEDDED))),
            );

        let metadata = MetadataBuilder::new(&source).build().unwrap();
        assert_eq!(metadata.embeddables, vec!["Address".to_string()]);
        let table = metadata.entity_table("Customer").unwrap();
        assert!(table.has_column(&Identifier::unquoted("city")));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let source = StaticAnnotationSource::new();
        let config = BinderConfig::default().with_default_schema("");
        let result = MetadataBuilder::new(&source).with_config(config).build();
        match result {
            Err(MappingError::Config(_)) => {}
            _ => panic!("Expected Config error, got {:?}", result.map(|_| ())),
        }
    }
}
