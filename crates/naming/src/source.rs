// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Name Sources
//!
//! Structured descriptions of what an implicit name is being derived for.
//! The binder fills these in; naming strategies only read them.

use ormbind_model::Identifier;

/// Names of an entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityNaming {
    pub entity_name: String,
    pub class_name: String,
    /// Short name used in queries; may be empty
    pub jpa_entity_name: String,
}

impl EntityNaming {
    pub fn new(
        entity_name: impl Into<String>,
        class_name: impl Into<String>,
        jpa_entity_name: impl Into<String>,
    ) -> Self {
        Self {
            entity_name: entity_name.into(),
            class_name: class_name.into(),
            jpa_entity_name: jpa_entity_name.into(),
        }
    }
}

/// Dotted path of an attribute from its entity, e.g. `address.city`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributePath {
    segments: Vec<String>,
}

impl AttributePath {
    /// Parse a dotted path
    ///
    /// # Examples
    ///
    /// ```
    /// use ormbind_naming::AttributePath;
    ///
    /// let path = AttributePath::parse("address.city");
    /// assert_eq!(path.property(), "city");
    /// assert_eq!(path.full_path(), "address.city");
    /// ```
    pub fn parse(path: &str) -> Self {
        Self {
            segments: path
                .split('.')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Last segment
    pub fn property(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    pub fn full_path(&self) -> String {
        self.segments.join(".")
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn append(&self, property: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(property.to_string());
        Self { segments }
    }
}

/// What a join column joins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinColumnNature {
    /// To-one association
    Entity,
    /// Key or element column of an entity collection
    EntityCollection,
    /// Key column of an element collection
    ElementCollection,
}

/// Source of an implicit `@JoinColumn` name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplicitJoinColumnNameSource {
    pub nature: JoinColumnNature,
    /// Entity whose naming is used when there is no attribute path
    pub entity_naming: EntityNaming,
    /// Attribute of the referencing side, if any
    pub attribute_path: Option<AttributePath>,
    pub referenced_table_name: Identifier,
    pub referenced_column_name: Identifier,
}

/// Source of an implicit `@PrimaryKeyJoinColumn` name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplicitPrimaryKeyJoinColumnNameSource {
    pub referenced_table_name: Identifier,
    pub referenced_primary_key_column_name: Identifier,
}

/// Source of an implicit primary table name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplicitEntityNameSource {
    pub entity_naming: EntityNaming,
}

/// Source of an implicit basic column name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplicitBasicColumnNameSource {
    pub attribute_path: AttributePath,
}

/// Source of an implicit join table name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplicitJoinTableNameSource {
    pub owning_physical_table_name: Identifier,
    pub owning_entity_naming: EntityNaming,
    pub non_owning_physical_table_name: Identifier,
    pub non_owning_entity_naming: EntityNaming,
    pub association_owning_attribute_path: AttributePath,
}

/// Source of an implicit discriminator column name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplicitDiscriminatorColumnNameSource {
    pub entity_naming: EntityNaming,
}

/// Source of an implicit identifier column name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplicitIdentifierColumnNameSource {
    pub entity_naming: EntityNaming,
    pub identifier_attribute_path: AttributePath,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_path_append() {
        let path = AttributePath::parse("address").append("city");
        assert_eq!(path.full_path(), "address.city");
        assert_eq!(path.segments().len(), 2);
    }

    #[test]
    fn test_empty_attribute_path() {
        let path = AttributePath::parse("");
        assert_eq!(path.property(), "");
        assert!(path.segments().is_empty());
    }
}
