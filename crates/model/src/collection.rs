// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Entity-valued collections (`@OneToMany`, `@ManyToMany`).

use serde::{Deserialize, Serialize};

use crate::identifier::Identifier;
use crate::relational::TableId;
use crate::value::DependantValue;

/// Semantics of the collection type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionKind {
    Bag,
    Set,
    List,
    Map,
}

impl CollectionKind {
    /// Derive the kind from the declared member type
    pub fn from_type_name(type_name: &str) -> Self {
        let raw = type_name.split('<').next().unwrap_or(type_name);
        let simple = raw.rsplit('.').next().unwrap_or(raw);
        match simple {
            "Set" | "SortedSet" | "HashSet" | "TreeSet" => CollectionKind::Set,
            "Map" | "SortedMap" | "HashMap" | "TreeMap" => CollectionKind::Map,
            _ => CollectionKind::Bag,
        }
    }
}

/// Elements of a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CollectionElement {
    /// Rows of the element entity's table carry the key
    OneToMany { entity: String },
    /// A join table links owner and element
    ManyToMany {
        entity: String,
        columns: Vec<Identifier>,
    },
}

impl CollectionElement {
    pub fn entity(&self) -> &str {
        match self {
            CollectionElement::OneToMany { entity } => entity,
            CollectionElement::ManyToMany { entity, .. } => entity,
        }
    }
}

/// A collection-valued property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    /// `<owner entity>.<property path>`
    pub role: String,
    pub owner_entity: String,
    pub kind: CollectionKind,
    pub element: CollectionElement,
    /// Table holding the key; `None` until resolved by a second pass
    pub collection_table: Option<TableId>,
    /// Columns of the collection table referencing the owner
    pub key: Option<DependantValue>,
    pub inverse: bool,
    pub mapped_by: Option<String>,
    pub lazy: bool,
    pub order_by: Option<String>,
    pub where_clause: Option<String>,
    pub batch_size: Option<u32>,
}

impl Collection {
    pub fn new(
        role: impl Into<String>,
        owner_entity: impl Into<String>,
        kind: CollectionKind,
        element: CollectionElement,
    ) -> Self {
        Self {
            role: role.into(),
            owner_entity: owner_entity.into(),
            kind,
            element,
            collection_table: None,
            key: None,
            inverse: false,
            mapped_by: None,
            lazy: true,
            order_by: None,
            where_clause: None,
            batch_size: None,
        }
    }

    pub fn is_one_to_many(&self) -> bool {
        matches!(self.element, CollectionElement::OneToMany { .. })
    }

    /// Whether key and element columns have been bound
    pub fn is_resolved(&self) -> bool {
        self.collection_table.is_some() && self.key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_type_name() {
        assert_eq!(CollectionKind::from_type_name("java.util.Set"), CollectionKind::Set);
        assert_eq!(CollectionKind::from_type_name("List<OrderLine>"), CollectionKind::Bag);
        assert_eq!(
            CollectionKind::from_type_name("java.util.Set<com.acme.Tag>"),
            CollectionKind::Set
        );
        assert_eq!(CollectionKind::from_type_name("Map"), CollectionKind::Map);
    }

    #[test]
    fn test_new_collection_is_unresolved() {
        let collection = Collection::new(
            "Order.lines",
            "Order",
            CollectionKind::Bag,
            CollectionElement::OneToMany {
                entity: "OrderLine".to_string(),
            },
        );
        assert!(collection.is_one_to_many());
        assert!(!collection.is_resolved());
        assert_eq!(collection.element.entity(), "OrderLine");
    }
}
