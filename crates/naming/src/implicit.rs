// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Implicit Naming
//!
//! Logical names for tables and columns the mapping does not name.
//!
//! Every rule is expressed through two hooks,
//! [`ImplicitNamingStrategy::transform_entity_name`] and
//! [`ImplicitNamingStrategy::transform_attribute_path`], so a strategy usually
//! overrides one hook rather than individual rules.
//!
//! | Name | JPA-compliant rule |
//! |------|--------------------|
//! | primary table | entity name |
//! | basic column | attribute name |
//! | join column | `{attribute}_{referenced column}`, or `{entity}_{referenced column}` without an attribute |
//! | primary key join column | referenced primary key column |
//! | join table | `{owning table}_{non-owning table}` |
//! | discriminator column | `DTYPE` |

use ormbind_model::Identifier;

use crate::source::{
    AttributePath, EntityNaming, ImplicitBasicColumnNameSource,
    ImplicitDiscriminatorColumnNameSource, ImplicitEntityNameSource,
    ImplicitIdentifierColumnNameSource, ImplicitJoinColumnNameSource, ImplicitJoinTableNameSource,
    ImplicitPrimaryKeyJoinColumnNameSource, JoinColumnNature,
};

/// Default discriminator column name
pub const DEFAULT_DISCRIMINATOR_COLUMN: &str = "DTYPE";

/// Derives logical names that the mapping leaves implicit
pub trait ImplicitNamingStrategy {
    /// Name used for an entity in derived names
    fn transform_entity_name(&self, naming: &EntityNaming) -> String {
        if naming.jpa_entity_name.is_empty() {
            unqualify(&naming.entity_name).to_string()
        } else {
            naming.jpa_entity_name.clone()
        }
    }

    /// Name used for an attribute in derived names
    fn transform_attribute_path(&self, path: &AttributePath) -> String {
        path.property().to_string()
    }

    fn determine_primary_table_name(&self, source: &ImplicitEntityNameSource) -> Identifier {
        Identifier::unquoted(self.transform_entity_name(&source.entity_naming))
    }

    fn determine_basic_column_name(&self, source: &ImplicitBasicColumnNameSource) -> Identifier {
        Identifier::unquoted(self.transform_attribute_path(&source.attribute_path))
    }

    fn determine_identifier_column_name(
        &self,
        source: &ImplicitIdentifierColumnNameSource,
    ) -> Identifier {
        Identifier::unquoted(self.transform_attribute_path(&source.identifier_attribute_path))
    }

    /// Join column of an association
    fn determine_join_column_name(&self, source: &ImplicitJoinColumnNameSource) -> Identifier {
        let prefix = match (&source.attribute_path, source.nature) {
            (Some(path), JoinColumnNature::Entity | JoinColumnNature::EntityCollection) => {
                self.transform_attribute_path(path)
            }
            _ => self.transform_entity_name(&source.entity_naming),
        };
        Identifier::unquoted(format!(
            "{}_{}",
            prefix,
            source.referenced_column_name.text()
        ))
    }

    /// Join column from a subclass or secondary table to its primary table
    fn determine_primary_key_join_column_name(
        &self,
        source: &ImplicitPrimaryKeyJoinColumnNameSource,
    ) -> Identifier {
        source.referenced_primary_key_column_name.clone()
    }

    fn determine_join_table_name(&self, source: &ImplicitJoinTableNameSource) -> Identifier {
        Identifier::unquoted(format!(
            "{}_{}",
            source.owning_physical_table_name.text(),
            source.non_owning_physical_table_name.text()
        ))
    }

    fn determine_discriminator_column_name(
        &self,
        _source: &ImplicitDiscriminatorColumnNameSource,
    ) -> Identifier {
        Identifier::unquoted(DEFAULT_DISCRIMINATOR_COLUMN)
    }
}

fn unqualify(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// Naming rules of the JPA specification
#[derive(Debug, Clone, Copy, Default)]
pub struct JpaCompliantNamingStrategy;

impl ImplicitNamingStrategy for JpaCompliantNamingStrategy {}

/// JPA rules, but attribute-derived names use the whole attribute path so
/// columns of repeated embeddables do not clash (`home_city`, `work_city`)
#[derive(Debug, Clone, Copy, Default)]
pub struct ComponentPathNamingStrategy;

impl ImplicitNamingStrategy for ComponentPathNamingStrategy {
    fn transform_attribute_path(&self, path: &AttributePath) -> String {
        path.segments().join("_")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer() -> EntityNaming {
        EntityNaming::new("com.acme.Customer", "com.acme.Customer", "Customer")
    }

    fn join_source(attribute: Option<&str>, column: Identifier) -> ImplicitJoinColumnNameSource {
        ImplicitJoinColumnNameSource {
            nature: JoinColumnNature::Entity,
            entity_naming: customer(),
            attribute_path: attribute.map(AttributePath::parse),
            referenced_table_name: Identifier::unquoted("Customer"),
            referenced_column_name: column,
        }
    }

    #[test]
    fn test_join_column_uses_attribute_name() {
        let name = JpaCompliantNamingStrategy
            .determine_join_column_name(&join_source(Some("buyer"), Identifier::unquoted("ID")));
        assert_eq!(name, Identifier::unquoted("buyer_ID"));
    }

    #[test]
    fn test_join_column_falls_back_to_entity_name() {
        let name = JpaCompliantNamingStrategy
            .determine_join_column_name(&join_source(None, Identifier::unquoted("ID")));
        assert_eq!(name, Identifier::unquoted("Customer_ID"));
    }

    #[test]
    fn test_element_collection_uses_entity_name() {
        let mut source = join_source(Some("tags"), Identifier::unquoted("ID"));
        source.nature = JoinColumnNature::ElementCollection;
        let name = JpaCompliantNamingStrategy.determine_join_column_name(&source);
        assert_eq!(name.text(), "Customer_ID");
    }

    #[test]
    fn test_entity_name_without_jpa_name() {
        let naming = EntityNaming::new("com.acme.Customer", "com.acme.Customer", "");
        let name = JpaCompliantNamingStrategy.determine_primary_table_name(
            &ImplicitEntityNameSource {
                entity_naming: naming,
            },
        );
        assert_eq!(name.text(), "Customer");
    }

    #[test]
    fn test_component_path_strategy() {
        let source = ImplicitBasicColumnNameSource {
            attribute_path: AttributePath::parse("home.city"),
        };
        assert_eq!(
            ComponentPathNamingStrategy.determine_basic_column_name(&source).text(),
            "home_city"
        );
        assert_eq!(
            JpaCompliantNamingStrategy.determine_basic_column_name(&source).text(),
            "city"
        );
    }

    #[test]
    fn test_primary_key_join_column_reuses_referenced_name() {
        let source = ImplicitPrimaryKeyJoinColumnNameSource {
            referenced_table_name: Identifier::unquoted("Animal"),
            referenced_primary_key_column_name: Identifier::quoted("Id"),
        };
        assert_eq!(
            JpaCompliantNamingStrategy.determine_primary_key_join_column_name(&source),
            Identifier::quoted("Id")
        );
    }

    #[test]
    fn test_discriminator_default() {
        let source = ImplicitDiscriminatorColumnNameSource {
            entity_naming: customer(),
        };
        assert_eq!(
            JpaCompliantNamingStrategy
                .determine_discriminator_column_name(&source)
                .text(),
            "DTYPE"
        );
    }
}
