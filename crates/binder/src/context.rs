// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Read-only capabilities shared by every binding step

use ormbind_model::{Dialect, Identifier};
use ormbind_naming::{ImplicitNamingStrategy, PhysicalNamingStrategy};
use ormbind_source::{AnnotationSource, ClassDetails};

use crate::config::BinderConfig;
use crate::error::{BindResult, MappingError};
use crate::type_binder::TypeBinderRegistry;

/// Capabilities consumed while binding
///
/// The context only borrows collaborators that live for the whole boot, so
/// it is `Copy` and can be taken out of the session before the session is
/// mutated.
#[derive(Clone, Copy)]
pub struct BindingContext<'a> {
    pub source: &'a dyn AnnotationSource,
    pub implicit_naming: &'a dyn ImplicitNamingStrategy,
    pub physical_naming: &'a dyn PhysicalNamingStrategy,
    pub config: &'a BinderConfig,
    pub type_binders: &'a TypeBinderRegistry,
}

impl<'a> BindingContext<'a> {
    pub fn new(
        source: &'a dyn AnnotationSource,
        implicit_naming: &'a dyn ImplicitNamingStrategy,
        physical_naming: &'a dyn PhysicalNamingStrategy,
        config: &'a BinderConfig,
        type_binders: &'a TypeBinderRegistry,
    ) -> Self {
        Self {
            source,
            implicit_naming,
            physical_naming,
            config,
            type_binders,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.config.dialect
    }

    /// Details of a class referenced by `referenced_by`
    pub fn class(&self, name: &str, referenced_by: &str) -> BindResult<&'a ClassDetails> {
        self.source
            .class_details(name)
            .ok_or_else(|| MappingError::UnknownClass {
                class: name.to_string(),
                referenced_by: referenced_by.to_string(),
            })
    }

    /// Identifier for a name written in the mapping; `None` for blank names
    pub fn identifier(&self, text: &str) -> Option<Identifier> {
        Identifier::parse_with_quoting(text, self.config.globally_quoted_identifiers)
    }

    /// Apply global quoting to a name derived by a naming strategy
    pub fn implicit_identifier(&self, identifier: Identifier) -> Identifier {
        if self.config.globally_quoted_identifiers {
            identifier.into_quoted()
        } else {
            identifier
        }
    }

    pub fn physical_table_name(&self, logical: &Identifier) -> Identifier {
        self.physical_naming
            .to_physical_table_name(logical, self.dialect())
    }

    pub fn physical_column_name(&self, logical: &Identifier) -> Identifier {
        self.physical_naming
            .to_physical_column_name(logical, self.dialect())
    }

    pub fn physical_schema_name(&self, logical: &Identifier) -> Identifier {
        self.physical_naming
            .to_physical_schema_name(logical, self.dialect())
    }

    pub fn physical_catalog_name(&self, logical: &Identifier) -> Identifier {
        self.physical_naming
            .to_physical_catalog_name(logical, self.dialect())
    }

    pub fn physical_sequence_name(&self, logical: &Identifier) -> Identifier {
        self.physical_naming
            .to_physical_sequence_name(logical, self.dialect())
    }
}

impl std::fmt::Debug for BindingContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingContext")
            .field("config", self.config)
            .field("type_binders", self.type_binders)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ormbind_naming::{JpaCompliantNamingStrategy, SnakeCasePhysicalNaming};
    use ormbind_source::StaticAnnotationSource;

    #[test]
    fn test_global_quoting() {
        let source = StaticAnnotationSource::new();
        let config = BinderConfig::default().with_globally_quoted_identifiers(true);
        let binders = TypeBinderRegistry::new();
        let ctx = BindingContext::new(
            &source,
            &JpaCompliantNamingStrategy,
            &SnakeCasePhysicalNaming,
            &config,
            &binders,
        );

        let id = ctx.identifier("OrderLine").unwrap();
        assert!(id.is_quoted());
        assert!(ctx.identifier("").is_none());
        assert!(ctx.implicit_identifier(Identifier::unquoted("x")).is_quoted());
        // quoted names keep their case under snake case naming
        assert_eq!(ctx.physical_table_name(&id).text(), "OrderLine");
    }

    #[test]
    fn test_unknown_class() {
        let source = StaticAnnotationSource::new();
        let config = BinderConfig::default();
        let binders = TypeBinderRegistry::new();
        let ctx = BindingContext::new(
            &source,
            &JpaCompliantNamingStrategy,
            &SnakeCasePhysicalNaming,
            &config,
            &binders,
        );
        let result = ctx.class("com.acme.Missing", "com.acme.Order.customer");
        match result {
            Err(MappingError::UnknownClass { class, .. }) => assert_eq!(class, "com.acme.Missing"),
            _ => panic!("Expected UnknownClass error, got {:?}", result.map(|c| &c.name)),
        }
        assert_eq!(
            ctx.physical_column_name(&Identifier::unquoted("orderId")).text(),
            "order_id"
        );
    }
}
