// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Mapping-specific test helpers and custom assertions

use ormbind_model::{ForeignKey, Identifier, Metadata, PersistentClass, Table};

/// Custom assertion helpers for bound metadata
pub struct MappingAssertions;

impl MappingAssertions {
    /// Entity binding by name, panicking with the bound names when missing
    pub fn entity<'m>(metadata: &'m Metadata, name: &str) -> &'m PersistentClass {
        match metadata.entity(name) {
            Some(entity) => entity,
            None => panic!(
                "Expected entity '{}', bound entities: {:?}",
                name,
                metadata.entities.keys().collect::<Vec<_>>()
            ),
        }
    }

    /// Primary table of an entity
    pub fn entity_table<'m>(metadata: &'m Metadata, name: &str) -> &'m Table {
        let entity = Self::entity(metadata, name);
        match metadata.table(entity.table) {
            Some(table) => table,
            None => panic!("Entity '{}' points at a table that does not exist", name),
        }
    }

    /// Assert that a table has exactly these columns, in order
    pub fn assert_columns(table: &Table, expected: &[&str]) {
        let actual: Vec<&str> = table.columns().iter().map(|c| c.name.text()).collect();
        assert_eq!(actual, expected, "Column mismatch in table '{}'", table.name);
    }

    /// Assert that a table has a column
    pub fn assert_has_column(table: &Table, name: &str) {
        assert!(
            table.has_column(&Identifier::unquoted(name)),
            "Expected column '{}' in table '{}', found {:?}",
            name,
            table.name,
            table.columns().iter().map(|c| c.name.text()).collect::<Vec<_>>()
        );
    }

    /// Assert that a table does not have a column
    pub fn assert_no_column(table: &Table, name: &str) {
        assert!(
            !table.has_column(&Identifier::unquoted(name)),
            "Did not expect column '{}' in table '{}'",
            name,
            table.name
        );
    }

    /// Assert the primary key columns of a table
    pub fn assert_primary_key(table: &Table, expected: &[&str]) {
        let actual: Vec<&str> = table.primary_key_columns().iter().map(|c| c.text()).collect();
        assert_eq!(actual, expected, "Primary key mismatch in table '{}'", table.name);
    }

    /// The foreign key of `table` made of exactly `columns`
    pub fn foreign_key<'t>(table: &'t Table, columns: &[&str]) -> &'t ForeignKey {
        let found = table.foreign_keys.iter().find(|fk| {
            fk.columns.len() == columns.len()
                && fk.columns.iter().zip(columns).all(|(c, expected)| c.matches_text(expected))
        });
        match found {
            Some(fk) => fk,
            None => panic!(
                "Expected foreign key {:?} in table '{}', found {:?}",
                columns,
                table.name,
                table
                    .foreign_keys
                    .iter()
                    .map(|fk| fk.columns.iter().map(Identifier::text).collect::<Vec<_>>())
                    .collect::<Vec<_>>()
            ),
        }
    }

    /// Assert that an entity's hierarchy has no discriminator
    pub fn assert_no_discriminator(metadata: &Metadata, entity: &str) {
        let root = metadata
            .root_entity(entity)
            .unwrap_or_else(|| Self::entity(metadata, entity));
        assert!(
            root.discriminator.is_none(),
            "Expected no discriminator for '{}', found {:?}",
            entity,
            root.discriminator
        );
    }

    /// Assert the discriminator column of an entity's hierarchy
    pub fn assert_discriminator_column(metadata: &Metadata, entity: &str, column: &str) {
        let root = metadata
            .root_entity(entity)
            .unwrap_or_else(|| Self::entity(metadata, entity));
        match &root.discriminator {
            Some(discriminator) => {
                let columns: Vec<Identifier> = discriminator.value.column_names();
                assert_eq!(
                    columns,
                    vec![Identifier::unquoted(column)],
                    "Discriminator column mismatch for '{}'",
                    entity
                );
            }
            None => panic!("Expected discriminator column '{}' for '{}'", column, entity),
        }
    }
}
