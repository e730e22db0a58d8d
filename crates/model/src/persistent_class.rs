// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Persistent Classes
//!
//! One [`PersistentClass`] is produced per entity. Its [`PersistentClassKind`]
//! records where it sits in its inheritance hierarchy, which decides the
//! tables its rows live in:
//!
//! | Kind | Table |
//! |------|-------|
//! | `Root` | its own |
//! | `SingleTableSubclass` | the root's |
//! | `JoinedSubclass` | its own, joined to the super table by a key |
//! | `UnionSubclass` | its own, repeating the super table's columns |

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::relational::TableId;
use crate::value::{Component, DependantValue, Property, SimpleValue, Value};

/// Inheritance strategy of a hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InheritanceType {
    SingleTable,
    Joined,
    TablePerClass,
}

impl InheritanceType {
    /// Parse the `strategy` attribute of `@Inheritance`
    pub fn parse(text: &str) -> Option<Self> {
        match text.to_ascii_uppercase().as_str() {
            "SINGLE_TABLE" => Some(Self::SingleTable),
            "JOINED" => Some(Self::Joined),
            "TABLE_PER_CLASS" => Some(Self::TablePerClass),
            _ => None,
        }
    }
}

impl std::fmt::Display for InheritanceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            InheritanceType::SingleTable => "SINGLE_TABLE",
            InheritanceType::Joined => "JOINED",
            InheritanceType::TablePerClass => "TABLE_PER_CLASS",
        };
        f.write_str(name)
    }
}

/// Position of a persistent class in its hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PersistentClassKind {
    Root,
    SingleTableSubclass,
    JoinedSubclass { key: Option<DependantValue> },
    UnionSubclass,
}

/// Type of the discriminator column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscriminatorType {
    #[default]
    String,
    Char,
    Integer,
}

impl DiscriminatorType {
    pub fn parse(text: &str) -> Option<Self> {
        match text.to_ascii_uppercase().as_str() {
            "STRING" => Some(Self::String),
            "CHAR" => Some(Self::Char),
            "INTEGER" => Some(Self::Integer),
            _ => None,
        }
    }

    /// Basic type name of the discriminator value
    pub fn type_name(&self) -> &'static str {
        match self {
            DiscriminatorType::String => "string",
            DiscriminatorType::Char => "character",
            DiscriminatorType::Integer => "integer",
        }
    }
}

/// Discriminator column or formula of a hierarchy root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discriminator {
    pub value: SimpleValue,
    pub discriminator_type: DiscriminatorType,
    /// Always restrict queries by discriminator value
    pub force: bool,
    /// Whether the discriminator is written on insert
    pub insertable: bool,
}

/// Cache concurrency strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CacheConcurrency {
    ReadOnly,
    NonstrictReadWrite,
    ReadWrite,
    Transactional,
}

impl CacheConcurrency {
    pub fn parse(text: &str) -> Option<Self> {
        match text.to_ascii_uppercase().as_str() {
            "READ_ONLY" => Some(Self::ReadOnly),
            "NONSTRICT_READ_WRITE" => Some(Self::NonstrictReadWrite),
            "READ_WRITE" => Some(Self::ReadWrite),
            "TRANSACTIONAL" => Some(Self::Transactional),
            _ => None,
        }
    }
}

/// Second-level cache settings of an entity hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CacheSettings {
    pub enabled: bool,
    pub concurrency: Option<CacheConcurrency>,
    pub region: Option<String>,
    pub include_lazy: bool,
}

/// Optimistic locking style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptimisticLockStyle {
    None,
    #[default]
    Version,
    Dirty,
    All,
}

impl OptimisticLockStyle {
    pub fn parse(text: &str) -> Option<Self> {
        match text.to_ascii_uppercase().as_str() {
            "NONE" => Some(Self::None),
            "VERSION" => Some(Self::Version),
            "DIRTY" => Some(Self::Dirty),
            "ALL" => Some(Self::All),
            _ => None,
        }
    }
}

/// Whether the entity takes part in queries against its supertypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolymorphismType {
    #[default]
    Implicit,
    Explicit,
}

/// Result check applied to custom DML
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecuteCheck {
    None,
    #[default]
    Count,
    Param,
}

impl ExecuteCheck {
    pub fn parse(text: &str) -> Option<Self> {
        match text.to_ascii_uppercase().as_str() {
            "NONE" => Some(Self::None),
            "COUNT" | "ROW_COUNT" => Some(Self::Count),
            "PARAM" => Some(Self::Param),
            _ => None,
        }
    }
}

/// A custom DML statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomSql {
    pub sql: String,
    pub callable: bool,
    pub check: ExecuteCheck,
}

/// Custom DML for one table
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CustomSqlSet {
    pub insert: Option<CustomSql>,
    pub update: Option<CustomSql>,
    pub delete: Option<CustomSql>,
    pub delete_all: Option<CustomSql>,
}

/// How instances are loaded when the default select is replaced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Loader {
    NamedQuery(String),
    Sql(String),
}

/// A filter enabled for an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfiguration {
    pub name: String,
    pub condition: String,
    pub deduce_alias_injection_points: bool,
}

/// Lifecycle events an entity can observe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallbackType {
    PrePersist,
    PostPersist,
    PreRemove,
    PostRemove,
    PreUpdate,
    PostUpdate,
    PostLoad,
}

impl CallbackType {
    pub const ALL: [CallbackType; 7] = [
        CallbackType::PrePersist,
        CallbackType::PostPersist,
        CallbackType::PreRemove,
        CallbackType::PostRemove,
        CallbackType::PreUpdate,
        CallbackType::PostUpdate,
        CallbackType::PostLoad,
    ];

    /// Name of the annotation marking a callback method
    pub fn annotation_name(&self) -> &'static str {
        match self {
            CallbackType::PrePersist => "PrePersist",
            CallbackType::PostPersist => "PostPersist",
            CallbackType::PreRemove => "PreRemove",
            CallbackType::PostRemove => "PostRemove",
            CallbackType::PreUpdate => "PreUpdate",
            CallbackType::PostUpdate => "PostUpdate",
            CallbackType::PostLoad => "PostLoad",
        }
    }
}

/// A callback method, on the entity or on a listener class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackDefinition {
    pub callback_type: CallbackType,
    pub class_name: String,
    pub method_name: String,
    /// Declared on an entity listener rather than on the entity hierarchy
    pub listener: bool,
}

/// Where a join came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinOrigin {
    /// `@SecondaryTable` on the entity
    SecondaryTable,
    /// `@JoinTable` on a to-one association
    JoinTable,
}

/// A secondary table of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    pub table: TableId,
    /// Columns of `table` referencing the entity's primary key
    pub key: Option<DependantValue>,
    /// The entity never writes this table
    pub inverse: bool,
    /// A row exists only when one of the join's properties is non-null
    pub optional: bool,
    pub sequential_select: bool,
    pub custom_sql: CustomSqlSet,
    pub origin: JoinOrigin,
    pub foreign_key_name: Option<String>,
    pub foreign_key_constraint: bool,
}

impl Join {
    pub fn new(table: TableId, origin: JoinOrigin) -> Self {
        Self {
            table,
            key: None,
            inverse: false,
            optional: origin == JoinOrigin::JoinTable,
            sequential_select: false,
            custom_sql: CustomSqlSet::default(),
            origin,
            foreign_key_name: None,
            foreign_key_constraint: true,
        }
    }
}

/// Mapping of one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistentClass {
    /// Unique name of the entity (the class name)
    pub entity_name: String,
    /// Short name used in queries
    pub jpa_entity_name: String,
    pub class_name: String,
    pub kind: PersistentClassKind,
    pub inheritance_type: Option<InheritanceType>,
    pub superclass: Option<String>,
    pub subclasses: Vec<String>,
    /// Table holding the entity's own properties
    pub table: TableId,
    pub is_abstract: bool,
    pub joins: Vec<Join>,
    pub properties: Vec<Property>,
    pub identifier: Option<Value>,
    pub identifier_property: Option<String>,
    /// Identifier properties are properties of the entity itself
    pub embedded_identifier: bool,
    /// Synthetic component mirroring the `@IdClass` properties
    pub identifier_mapper: Option<Component>,
    pub version_property: Option<String>,
    pub discriminator: Option<Discriminator>,
    pub discriminator_value: Option<String>,
    pub cache: CacheSettings,
    pub natural_id_cache_region: Option<String>,
    pub lazy: bool,
    pub proxy_interface: Option<String>,
    pub mutable: bool,
    pub dynamic_insert: bool,
    pub dynamic_update: bool,
    pub select_before_update: bool,
    pub batch_size: Option<u32>,
    pub where_clause: Option<String>,
    pub row_id: Option<String>,
    pub optimistic_lock: OptimisticLockStyle,
    pub polymorphism: PolymorphismType,
    pub custom_sql: CustomSqlSet,
    pub loader: Option<Loader>,
    pub subselect: Option<String>,
    pub synchronized_tables: Vec<String>,
    pub filters: Vec<FilterConfiguration>,
    pub callbacks: Vec<CallbackDefinition>,
    /// Free-form attributes contributed by type binders
    pub meta_attributes: IndexMap<String, String>,
}

impl PersistentClass {
    pub fn new(
        entity_name: impl Into<String>,
        jpa_entity_name: impl Into<String>,
        kind: PersistentClassKind,
        table: TableId,
    ) -> Self {
        let entity_name = entity_name.into();
        Self {
            class_name: entity_name.clone(),
            entity_name,
            jpa_entity_name: jpa_entity_name.into(),
            kind,
            inheritance_type: None,
            superclass: None,
            subclasses: Vec::new(),
            table,
            is_abstract: false,
            joins: Vec::new(),
            properties: Vec::new(),
            identifier: None,
            identifier_property: None,
            embedded_identifier: false,
            identifier_mapper: None,
            version_property: None,
            discriminator: None,
            discriminator_value: None,
            cache: CacheSettings::default(),
            natural_id_cache_region: None,
            lazy: true,
            proxy_interface: None,
            mutable: true,
            dynamic_insert: false,
            dynamic_update: false,
            select_before_update: false,
            batch_size: None,
            where_clause: None,
            row_id: None,
            optimistic_lock: OptimisticLockStyle::Version,
            polymorphism: PolymorphismType::Implicit,
            custom_sql: CustomSqlSet::default(),
            loader: None,
            subselect: None,
            synchronized_tables: Vec::new(),
            filters: Vec::new(),
            callbacks: Vec::new(),
            meta_attributes: IndexMap::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self.kind, PersistentClassKind::Root)
    }

    pub fn is_joined_subclass(&self) -> bool {
        matches!(self.kind, PersistentClassKind::JoinedSubclass { .. })
    }

    /// Key of a joined subclass
    pub fn joined_key(&self) -> Option<&DependantValue> {
        match &self.kind {
            PersistentClassKind::JoinedSubclass { key } => key.as_ref(),
            _ => None,
        }
    }

    /// Declared property by name, including the identifier property
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn property_mut(&mut self, name: &str) -> Option<&mut Property> {
        self.properties.iter_mut().find(|p| p.name == name)
    }

    /// Resolve a dotted property path through components
    ///
    /// Identifier components are searched too, so `id.customer` finds the
    /// `customer` part of a composite identifier.
    pub fn property_by_path(&self, path: &str) -> Option<&Property> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self
            .property(first)
            .or_else(|| self.identifier_part(first))?;
        for segment in segments {
            current = current.value.as_component()?.property(segment)?;
        }
        Some(current)
    }

    /// Mutable variant of [`PersistentClass::property_by_path`]
    pub fn property_by_path_mut(&mut self, path: &str) -> Option<&mut Property> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let in_properties = self.properties.iter().any(|p| p.name == first);
        let mut current = if in_properties {
            self.properties.iter_mut().find(|p| p.name == first)?
        } else {
            match self.identifier.as_mut()? {
                Value::Component(component) => {
                    component.properties.iter_mut().find(|p| p.name == first)?
                }
                _ => return None,
            }
        };
        for segment in segments {
            current = match &mut current.value {
                Value::Component(component) => {
                    component.properties.iter_mut().find(|p| p.name == segment)?
                }
                _ => return None,
            };
        }
        Some(current)
    }

    /// Part of a composite identifier by name
    pub fn identifier_part(&self, name: &str) -> Option<&Property> {
        match self.identifier.as_ref()? {
            Value::Component(component) => component.property(name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::Identifier;
    use crate::relational::Selectable;

    fn column_value(name: &str) -> Value {
        let mut value = SimpleValue::new(TableId(0));
        value
            .selectables
            .push(Selectable::Column(Identifier::unquoted(name)));
        Value::Basic(value)
    }

    #[test]
    fn test_inheritance_type_parse() {
        assert_eq!(InheritanceType::parse("joined"), Some(InheritanceType::Joined));
        assert_eq!(InheritanceType::parse("UNION"), None);
        assert_eq!(InheritanceType::TablePerClass.to_string(), "TABLE_PER_CLASS");
    }

    #[test]
    fn test_property_by_path_through_components() {
        let mut pc = PersistentClass::new("com.acme.Order", "Order", PersistentClassKind::Root, TableId(0));
        let mut address = Component::new("com.acme.Order.address", TableId(0));
        address.properties.push(Property::new("city", column_value("CITY")));
        pc.properties
            .push(Property::new("address", Value::Component(address)));

        assert!(pc.property_by_path("address.city").is_some());
        assert!(pc.property_by_path("address.zip").is_none());

        pc.property_by_path_mut("address.city").unwrap().updateable = false;
        assert!(!pc.property_by_path("address.city").unwrap().updateable);
    }

    #[test]
    fn test_identifier_parts_are_searched() {
        let mut pc = PersistentClass::new("com.acme.Line", "Line", PersistentClassKind::Root, TableId(0));
        let mut id = Component::new("com.acme.Line.id", TableId(0));
        id.properties.push(Property::new("lineNo", column_value("LINE_NO")));
        pc.identifier = Some(Value::Component(id));

        assert!(pc.property_by_path("lineNo").is_some());
        assert!(pc.property_by_path_mut("lineNo").is_some());
    }

    #[test]
    fn test_discriminator_type_names() {
        assert_eq!(DiscriminatorType::Char.type_name(), "character");
        assert_eq!(DiscriminatorType::Integer.type_name(), "integer");
        assert_eq!(DiscriminatorType::default(), DiscriminatorType::String);
    }
}
