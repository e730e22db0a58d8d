// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Bound Metadata
//!
//! The immutable result of a boot: every table, entity binding, collection
//! and named definition, in the order they were bound.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::collection::Collection;
use crate::definitions::{
    FetchProfile, FilterDefinition, IdentifierGeneratorDefinition, MappedSuperclass,
    NamedQueryDefinition, TypeRegistration,
};
use crate::identifier::Identifier;
use crate::persistent_class::PersistentClass;
use crate::relational::{Table, TableId};

/// Resolved mapping graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub tables: Vec<Table>,
    pub entities: IndexMap<String, PersistentClass>,
    pub collections: IndexMap<String, Collection>,
    pub mapped_superclasses: IndexMap<String, MappedSuperclass>,
    pub embeddables: Vec<String>,
    pub generators: IndexMap<String, IdentifierGeneratorDefinition>,
    pub named_queries: IndexMap<String, NamedQueryDefinition>,
    pub filter_definitions: IndexMap<String, FilterDefinition>,
    pub fetch_profiles: IndexMap<String, FetchProfile>,
    pub type_registrations: IndexMap<String, TypeRegistration>,
    /// Import name (short entity name or `@Imported` rename) to entity name
    pub imports: IndexMap<String, String>,
}

impl Metadata {
    pub fn table(&self, id: TableId) -> Option<&Table> {
        self.tables.get(id.0)
    }

    /// Find an entity by entity name or by any imported name
    ///
    /// # Examples
    ///
    /// ```
    /// use ormbind_model::Metadata;
    ///
    /// let metadata = Metadata::default();
    /// assert!(metadata.entity("Order").is_none());
    /// ```
    pub fn entity(&self, name: &str) -> Option<&PersistentClass> {
        self.entities.get(name).or_else(|| {
            self.imports
                .get(name)
                .and_then(|entity_name| self.entities.get(entity_name))
        })
    }

    /// Primary table of an entity
    pub fn entity_table(&self, name: &str) -> Option<&Table> {
        self.entity(name).and_then(|pc| self.table(pc.table))
    }

    /// Find a table by logical or physical name
    pub fn table_named(&self, name: &str) -> Option<&Table> {
        let id = Identifier::parse(name)?;
        self.tables
            .iter()
            .find(|t| t.logical_name.matches(&id) || t.name.table.matches(&id))
    }

    pub fn collection(&self, role: &str) -> Option<&Collection> {
        self.collections.get(role)
    }

    /// Root entity of the hierarchy containing `name`
    pub fn root_entity(&self, name: &str) -> Option<&PersistentClass> {
        let mut current = self.entity(name)?;
        while let Some(superclass) = &current.superclass {
            current = self.entities.get(superclass)?;
        }
        Some(current)
    }

    /// Serialize the whole graph, e.g. for snapshot comparisons
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
