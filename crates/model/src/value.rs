// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Values and Properties
//!
//! A [`Property`] is one attribute of a mapped class; its [`Value`] says how
//! the attribute is stored: as columns of a table, as a reference to another
//! entity, as an embedded component or as a collection.

use serde::{Deserialize, Serialize};

use crate::identifier::Identifier;
use crate::relational::{OnDeleteAction, Selectable, TableId};

/// Strategy used to produce identifier values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentifierGenerator {
    /// Values are supplied by the application
    Assigned,
    Identity,
    Sequence { name: String },
    Table { name: String },
    Uuid,
    /// A generator registered under a name by a generator annotation
    Named { name: String, strategy: String },
}

/// Columns (or formulas) of a single table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleValue {
    pub table: TableId,
    pub selectables: Vec<Selectable>,
    pub type_name: Option<String>,
    pub generator: Option<IdentifierGenerator>,
}

impl SimpleValue {
    pub fn new(table: TableId) -> Self {
        Self {
            table,
            selectables: Vec::new(),
            type_name: None,
            generator: None,
        }
    }

    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Column names, formulas skipped
    pub fn column_names(&self) -> Vec<Identifier> {
        self.selectables
            .iter()
            .filter_map(Selectable::as_column)
            .cloned()
            .collect()
    }
}

/// Flavour of a to-one association
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToOneKind {
    ManyToOne,
    OneToOne,
}

/// Reference to another entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToOne {
    pub kind: ToOneKind,
    /// Table holding the foreign key columns
    pub table: TableId,
    /// Foreign key columns; empty for the inverse side of a one-to-one
    pub selectables: Vec<Selectable>,
    pub referenced_entity: String,
    /// Property of the referenced entity matched by the foreign key when it
    /// does not reference the primary key
    pub referenced_property: Option<String>,
    /// Set on the inverse side of a bidirectional one-to-one
    pub mapped_by: Option<String>,
    pub constrained: bool,
    pub lazy: bool,
    pub unique: bool,
    pub on_delete: OnDeleteAction,
    pub foreign_key_name: Option<String>,
}

impl ToOne {
    pub fn new(kind: ToOneKind, table: TableId, referenced_entity: impl Into<String>) -> Self {
        Self {
            kind,
            table,
            selectables: Vec::new(),
            referenced_entity: referenced_entity.into(),
            referenced_property: None,
            mapped_by: None,
            constrained: false,
            lazy: kind == ToOneKind::ManyToOne,
            unique: kind == ToOneKind::OneToOne,
            on_delete: OnDeleteAction::NoAction,
            foreign_key_name: None,
        }
    }
}

/// Embedded component: a group of properties stored in the owner's table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Class of the component; `None` for synthetic components
    pub class_name: Option<String>,
    /// `<entity>.<path>` of the component
    pub role: String,
    pub table: TableId,
    pub properties: Vec<Property>,
    /// Properties of an embedded component are also properties of the owner
    pub embedded: bool,
    /// Part of an identifier
    pub key: bool,
}

impl Component {
    pub fn new(role: impl Into<String>, table: TableId) -> Self {
        Self {
            class_name: None,
            role: role.into(),
            table,
            properties: Vec::new(),
            embedded: false,
            key: false,
        }
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn property_names(&self) -> Vec<&str> {
        self.properties.iter().map(|p| p.name.as_str()).collect()
    }
}

/// Key columns of a table that depend on another table's key: joined
/// subclass keys, secondary table keys and collection keys
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependantValue {
    pub table: TableId,
    pub columns: Vec<Identifier>,
    pub on_delete: OnDeleteAction,
    pub nullable: bool,
    pub updateable: bool,
}

impl DependantValue {
    pub fn new(table: TableId) -> Self {
        Self {
            table,
            columns: Vec::new(),
            on_delete: OnDeleteAction::NoAction,
            nullable: false,
            updateable: true,
        }
    }
}

/// How a property is stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Basic(SimpleValue),
    ToOne(ToOne),
    Component(Component),
    /// The collection is registered separately under this role
    Collection { role: String },
}

impl Value {
    /// Table holding the value's columns, `None` for collections
    pub fn table(&self) -> Option<TableId> {
        match self {
            Value::Basic(value) => Some(value.table),
            Value::ToOne(value) => Some(value.table),
            Value::Component(component) => Some(component.table),
            Value::Collection { .. } => None,
        }
    }

    /// Selectables in declaration order; components are flattened
    pub fn selectables(&self) -> Vec<Selectable> {
        match self {
            Value::Basic(value) => value.selectables.clone(),
            Value::ToOne(value) => value.selectables.clone(),
            Value::Component(component) => component
                .properties
                .iter()
                .flat_map(|p| p.value.selectables())
                .collect(),
            Value::Collection { .. } => Vec::new(),
        }
    }

    /// Column names, skipping formulas
    pub fn column_names(&self) -> Vec<Identifier> {
        self.selectables()
            .into_iter()
            .filter_map(|s| match s {
                Selectable::Column(name) => Some(name),
                Selectable::Formula(_) => None,
            })
            .collect()
    }

    pub fn has_formula(&self) -> bool {
        self.selectables().iter().any(Selectable::is_formula)
    }

    pub fn column_span(&self) -> usize {
        self.selectables().len()
    }

    pub fn as_to_one(&self) -> Option<&ToOne> {
        match self {
            Value::ToOne(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_component(&self) -> Option<&Component> {
        match self {
            Value::Component(component) => Some(component),
            _ => None,
        }
    }
}

/// An attribute of a mapped class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub value: Value,
    pub insertable: bool,
    pub updateable: bool,
    pub optional: bool,
    pub lazy: bool,
    pub optimistic_locked: bool,
    pub natural_id: bool,
    /// Generated by the binder rather than declared by the class
    pub synthetic: bool,
    /// Index into the owner's joins when the property lives in a secondary table
    pub join: Option<usize>,
    pub declaring_class: Option<String>,
}

impl Property {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
            insertable: true,
            updateable: true,
            optional: true,
            lazy: false,
            optimistic_locked: true,
            natural_id: false,
            synthetic: false,
            join: None,
            declaring_class: None,
        }
    }

    pub fn with_declaring_class(mut self, class_name: impl Into<String>) -> Self {
        self.declaring_class = Some(class_name.into());
        self
    }

    /// Property values that can never be written through this property
    pub fn read_only(mut self) -> Self {
        self.insertable = false;
        self.updateable = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(column: &str) -> Value {
        let mut value = SimpleValue::new(TableId(0));
        value
            .selectables
            .push(Selectable::Column(Identifier::unquoted(column)));
        Value::Basic(value)
    }

    #[test]
    fn test_component_flattens_selectables() {
        let mut component = Component::new("Order.address", TableId(0));
        component.properties.push(Property::new("street", basic("STREET")));
        component.properties.push(Property::new("city", basic("CITY")));
        let value = Value::Component(component);

        assert_eq!(value.column_span(), 2);
        assert_eq!(
            value.column_names(),
            vec![Identifier::unquoted("STREET"), Identifier::unquoted("CITY")]
        );
    }

    #[test]
    fn test_formula_detection() {
        let mut value = SimpleValue::new(TableId(0));
        value
            .selectables
            .push(Selectable::Formula("price * qty".to_string()));
        let value = Value::Basic(value);
        assert!(value.has_formula());
        assert!(value.column_names().is_empty());
    }

    #[test]
    fn test_to_one_defaults() {
        let many = ToOne::new(ToOneKind::ManyToOne, TableId(0), "Customer");
        assert!(many.lazy);
        assert!(!many.unique);
        let one = ToOne::new(ToOneKind::OneToOne, TableId(0), "Passport");
        assert!(one.unique);
    }
}
