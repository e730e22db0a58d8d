// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Metadata Collector
//!
//! The mutable store every binding step writes to: the table arena, entity
//! bindings, table cross-references, named definitions and the second-pass
//! queue. It is owned by the [`BootSession`](crate::session::BootSession) and
//! turned into an immutable [`Metadata`] when the boot ends.

use std::collections::HashMap;

use indexmap::IndexMap;
use ormbind_model::{
    Collection, Column, FetchProfile, FilterDefinition, Identifier, IdentifierGeneratorDefinition,
    MappedSuperclass, Metadata, NamedQueryDefinition, PersistentClass, PersistentClassKind,
    QualifiedTableName, Table, TableId, TypeRegistration, Value,
};
use tracing::debug;

use crate::error::{BindResult, MappingError, Resolution};
use crate::second_pass::{SecondPass, SecondPassQueue};

/// Tables an entity's rows live in
///
/// Single-table subclasses point at the root's table and name their super
/// entity, so lookups of tables they do not declare fall through to it.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityTableXref {
    pub primary_table_logical_name: Identifier,
    pub primary_table: TableId,
    pub super_entity: Option<String>,
    /// Canonical logical name to table
    pub secondary_tables: IndexMap<String, TableId>,
}

impl EntityTableXref {
    pub fn new(
        primary_table_logical_name: Identifier,
        primary_table: TableId,
        super_entity: Option<String>,
    ) -> Self {
        Self {
            primary_table_logical_name,
            primary_table,
            super_entity,
            secondary_tables: IndexMap::new(),
        }
    }

    pub fn add_secondary_table(&mut self, logical_name: &Identifier, table: TableId) {
        self.secondary_tables
            .insert(logical_name.canonical_name(), table);
    }
}

/// Key columns of an entity as found in its table
#[derive(Debug, Clone, PartialEq)]
pub struct KeyColumns {
    pub table: TableId,
    pub columns: Vec<Column>,
}

/// Shared mutable store of a boot
#[derive(Debug, Default)]
pub struct MetadataCollector {
    tables: Vec<Table>,
    table_keys: HashMap<String, TableId>,
    entities: IndexMap<String, PersistentClass>,
    xrefs: IndexMap<String, EntityTableXref>,
    imports: IndexMap<String, String>,
    collections: IndexMap<String, Collection>,
    mapped_superclasses: IndexMap<String, MappedSuperclass>,
    embeddables: Vec<String>,
    generators: IndexMap<String, IdentifierGeneratorDefinition>,
    named_queries: IndexMap<String, NamedQueryDefinition>,
    filter_definitions: IndexMap<String, FilterDefinition>,
    fetch_profiles: IndexMap<String, FetchProfile>,
    type_registrations: IndexMap<String, TypeRegistration>,
    second_passes: SecondPassQueue,
}

impl MetadataCollector {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- tables ----

    /// Register a table, or return the table already registered under the
    /// same qualified name
    ///
    /// # Returns
    ///
    /// The table id and whether the table was created by this call.
    pub fn add_table(&mut self, name: QualifiedTableName, logical_name: Identifier) -> (TableId, bool) {
        let key = name.canonical_key();
        if let Some(id) = self.table_keys.get(&key) {
            return (*id, false);
        }
        let id = TableId(self.tables.len());
        debug!(table = %name, id = id.0, "Created table");
        self.tables.push(Table::new(id, name, logical_name));
        self.table_keys.insert(key, id);
        (id, true)
    }

    /// Register a table that must not be shared, such as the table of a
    /// subselect entity
    pub fn add_private_table(&mut self, name: QualifiedTableName, logical_name: Identifier) -> TableId {
        let id = TableId(self.tables.len());
        debug!(table = %name, id = id.0, "Created private table");
        self.tables.push(Table::new(id, name, logical_name));
        id
    }

    /// Table by id
    ///
    /// Ids are only handed out by this collector, so every id is valid.
    pub fn table(&self, id: TableId) -> &Table {
        &self.tables[id.0]
    }

    pub fn table_mut(&mut self, id: TableId) -> &mut Table {
        &mut self.tables[id.0]
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn find_table(&self, name: &QualifiedTableName) -> Option<TableId> {
        self.table_keys.get(&name.canonical_key()).copied()
    }

    /// Column by physical name, including columns a denormalized table
    /// repeats from its included table
    pub fn find_column(&self, table: TableId, name: &Identifier) -> Option<&Column> {
        let mut current = Some(table);
        while let Some(id) = current {
            let table = self.table(id);
            if let Some(column) = table.column(name) {
                return Some(column);
            }
            current = table.included_table;
        }
        None
    }

    /// Column by logical or physical name, including included tables
    pub fn find_column_by_any_name(&self, table: TableId, name: &Identifier) -> Option<&Column> {
        let mut current = Some(table);
        while let Some(id) = current {
            let table = self.table(id);
            if let Some(column) = table
                .column_by_logical_name(name)
                .or_else(|| table.column(name))
            {
                return Some(column);
            }
            current = table.included_table;
        }
        None
    }

    // ---- entities ----

    pub fn add_entity_binding(&mut self, entity: PersistentClass) -> BindResult<()> {
        if self.entities.contains_key(&entity.entity_name) {
            return Err(MappingError::DuplicateEntity(entity.entity_name));
        }
        if let Some(superclass) = &entity.superclass {
            if let Some(parent) = self.entities.get_mut(superclass) {
                parent.subclasses.push(entity.entity_name.clone());
            }
        }
        debug!(entity = %entity.entity_name, "Registered entity binding");
        self.entities.insert(entity.entity_name.clone(), entity);
        Ok(())
    }

    /// Entity binding by entity name or import name
    pub fn entity(&self, name: &str) -> Option<&PersistentClass> {
        self.entities.get(name).or_else(|| {
            self.imports
                .get(name)
                .and_then(|entity_name| self.entities.get(entity_name))
        })
    }

    pub fn entity_mut(&mut self, name: &str) -> Option<&mut PersistentClass> {
        let entity_name = if self.entities.contains_key(name) {
            name.to_string()
        } else {
            self.imports.get(name)?.clone()
        };
        self.entities.get_mut(&entity_name)
    }

    pub fn has_entity(&self, name: &str) -> bool {
        self.entity(name).is_some()
    }

    pub fn entities(&self) -> impl Iterator<Item = &PersistentClass> {
        self.entities.values()
    }

    /// Root of the hierarchy containing `name`
    pub fn root_entity(&self, name: &str) -> Option<&PersistentClass> {
        let mut current = self.entity(name)?;
        while let Some(superclass) = &current.superclass {
            current = self.entities.get(superclass)?;
        }
        Some(current)
    }

    /// Key columns other tables reference when they point at `entity`
    ///
    /// Deferred while the entity, its identifier columns or its joined key
    /// columns are not bound yet.
    pub fn entity_key_columns(&self, entity: &str) -> Resolution<KeyColumns> {
        let Some(pc) = self.entity(entity) else {
            return Resolution::deferred(entity, format!("entity '{}'", entity), "entity is not bound yet");
        };
        let table = self.table(pc.table);
        let names: Vec<Identifier> = if !table.primary_key_columns().is_empty() {
            table.primary_key_columns().to_vec()
        } else {
            match &pc.kind {
                PersistentClassKind::JoinedSubclass { key } => match key {
                    Some(key) if !key.columns.is_empty() => key.columns.clone(),
                    _ => {
                        return Resolution::deferred(
                            entity,
                            format!("key of joined subclass '{}'", entity),
                            "key columns are bound by a foreign key second pass",
                        );
                    }
                },
                PersistentClassKind::SingleTableSubclass => {
                    return match &pc.superclass {
                        Some(superclass) => self.entity_key_columns(superclass),
                        None => Resolution::Fatal(MappingError::AssertionFailure {
                            class: entity.to_string(),
                            message: "single table subclass without superclass".to_string(),
                        }),
                    };
                }
                PersistentClassKind::Root | PersistentClassKind::UnionSubclass => {
                    let Some(root) = self.root_entity(entity) else {
                        return Resolution::deferred(entity, "hierarchy root", "root is not bound yet");
                    };
                    match &root.identifier {
                        Some(identifier) if is_complete(identifier) => identifier.column_names(),
                        _ => {
                            return Resolution::deferred(
                                entity,
                                format!("identifier of '{}'", root.entity_name),
                                "identifier columns are not bound yet",
                            );
                        }
                    }
                }
            }
        };

        let mut columns = Vec::with_capacity(names.len());
        for name in &names {
            match self.find_column(pc.table, name) {
                Some(column) => columns.push(column.clone()),
                None => {
                    return Resolution::deferred(
                        entity,
                        format!("column '{}' of '{}'", name, entity),
                        "key column is not bound yet",
                    );
                }
            }
        }
        Resolution::Resolved(KeyColumns {
            table: pc.table,
            columns,
        })
    }

    // ---- table cross references ----

    pub fn add_entity_table_xref(&mut self, entity: impl Into<String>, xref: EntityTableXref) {
        self.xrefs.insert(entity.into(), xref);
    }

    pub fn entity_table_xref(&self, entity: &str) -> Option<&EntityTableXref> {
        self.xrefs.get(entity)
    }

    pub fn entity_table_xref_mut(&mut self, entity: &str) -> Option<&mut EntityTableXref> {
        self.xrefs.get_mut(entity)
    }

    /// Table an entity maps under `logical_name`, or its primary table when
    /// no name is given; walks up to super entities
    pub fn resolve_table(&self, entity: &str, logical_name: Option<&Identifier>) -> Option<TableId> {
        let mut current = self.xrefs.get(entity);
        while let Some(xref) = current {
            match logical_name {
                None => return Some(xref.primary_table),
                Some(name) => {
                    if xref.primary_table_logical_name.matches(name) {
                        return Some(xref.primary_table);
                    }
                    if let Some(id) = xref.secondary_tables.get(&name.canonical_name()) {
                        return Some(*id);
                    }
                }
            }
            current = xref
                .super_entity
                .as_ref()
                .and_then(|super_entity| self.xrefs.get(super_entity));
        }
        None
    }

    /// Logical name of an entity's primary table
    pub fn logical_table_name(&self, entity: &str) -> Option<&Identifier> {
        self.xrefs
            .get(entity)
            .map(|xref| &xref.primary_table_logical_name)
    }

    // ---- imports ----

    /// Register `name` as an import name of `entity`
    pub fn add_import(&mut self, name: impl Into<String>, entity: impl Into<String>) -> BindResult<()> {
        let name = name.into();
        let entity = entity.into();
        if let Some(existing) = self.imports.get(&name) {
            if *existing != entity {
                return Err(MappingError::DuplicateImport {
                    name,
                    existing: existing.clone(),
                    entity,
                });
            }
            return Ok(());
        }
        self.imports.insert(name, entity);
        Ok(())
    }

    pub fn import(&self, name: &str) -> Option<&str> {
        self.imports.get(name).map(String::as_str)
    }

    // ---- collections ----

    pub fn add_collection(&mut self, collection: Collection) -> BindResult<()> {
        if self.collections.contains_key(&collection.role) {
            return Err(MappingError::AssertionFailure {
                class: collection.owner_entity.clone(),
                message: format!("collection role '{}' bound twice", collection.role),
            });
        }
        self.collections.insert(collection.role.clone(), collection);
        Ok(())
    }

    pub fn collection(&self, role: &str) -> Option<&Collection> {
        self.collections.get(role)
    }

    pub fn collection_mut(&mut self, role: &str) -> Option<&mut Collection> {
        self.collections.get_mut(role)
    }

    // ---- mapped superclasses and embeddables ----

    pub fn add_mapped_superclass(&mut self, mapped_superclass: MappedSuperclass) {
        self.mapped_superclasses
            .insert(mapped_superclass.class_name.clone(), mapped_superclass);
    }

    pub fn mapped_superclass(&self, class_name: &str) -> Option<&MappedSuperclass> {
        self.mapped_superclasses.get(class_name)
    }

    pub fn add_embeddable(&mut self, class_name: impl Into<String>) {
        let class_name = class_name.into();
        if !self.embeddables.contains(&class_name) {
            self.embeddables.push(class_name);
        }
    }

    // ---- named definitions ----

    pub fn add_identifier_generator(&mut self, definition: IdentifierGeneratorDefinition) -> BindResult<()> {
        if let Some(existing) = self.generators.get(&definition.name) {
            if *existing == definition {
                return Ok(());
            }
            return Err(MappingError::DuplicateGenerator {
                name: definition.name,
                first: existing.declaring_class.clone(),
                second: definition.declaring_class,
            });
        }
        debug!(generator = %definition.name, strategy = %definition.strategy, "Registered identifier generator");
        self.generators.insert(definition.name.clone(), definition);
        Ok(())
    }

    pub fn identifier_generator(&self, name: &str) -> Option<&IdentifierGeneratorDefinition> {
        self.generators.get(name)
    }

    pub fn add_named_query(&mut self, query: NamedQueryDefinition) -> BindResult<()> {
        if let Some(existing) = self.named_queries.get(&query.name) {
            return Err(MappingError::DuplicateQuery {
                name: query.name,
                first: existing.declaring_class.clone(),
                second: query.declaring_class,
            });
        }
        self.named_queries.insert(query.name.clone(), query);
        Ok(())
    }

    pub fn add_filter_definition(&mut self, definition: FilterDefinition, class: &str) -> BindResult<()> {
        if self.filter_definitions.contains_key(&definition.name) {
            return Err(MappingError::DuplicateDefinition {
                annotation: "FilterDef".to_string(),
                name: definition.name,
                class: class.to_string(),
            });
        }
        self.filter_definitions
            .insert(definition.name.clone(), definition);
        Ok(())
    }

    pub fn filter_definition(&self, name: &str) -> Option<&FilterDefinition> {
        self.filter_definitions.get(name)
    }

    pub fn add_fetch_profile(&mut self, profile: FetchProfile, class: &str) -> BindResult<()> {
        if self.fetch_profiles.contains_key(&profile.name) {
            return Err(MappingError::DuplicateDefinition {
                annotation: "FetchProfile".to_string(),
                name: profile.name,
                class: class.to_string(),
            });
        }
        self.fetch_profiles.insert(profile.name.clone(), profile);
        Ok(())
    }

    pub fn fetch_profile(&self, name: &str) -> Option<&FetchProfile> {
        self.fetch_profiles.get(name)
    }

    pub fn add_type_registration(&mut self, registration: TypeRegistration, class: &str) -> BindResult<()> {
        if let Some(existing) = self.type_registrations.get(&registration.java_type) {
            if *existing == registration {
                return Ok(());
            }
            return Err(MappingError::DuplicateDefinition {
                annotation: "TypeRegistration".to_string(),
                name: registration.java_type,
                class: class.to_string(),
            });
        }
        self.type_registrations
            .insert(registration.java_type.clone(), registration);
        Ok(())
    }

    /// Basic type registered for a Java type
    pub fn registered_type(&self, java_type: &str) -> Option<&str> {
        self.type_registrations
            .get(java_type)
            .map(|r| r.type_name.as_str())
    }

    // ---- second passes ----

    pub fn add_second_pass(&mut self, pass: SecondPass) {
        debug!(phase = ?pass.phase(), pass = %pass.describe(), "Queued second pass");
        self.second_passes.push(pass);
    }

    pub fn second_passes(&self) -> &SecondPassQueue {
        &self.second_passes
    }

    pub fn second_passes_mut(&mut self) -> &mut SecondPassQueue {
        &mut self.second_passes
    }

    /// Freeze the collected state
    ///
    /// Denormalized tables receive the columns, primary key and foreign keys
    /// of the tables they include. Included tables always have lower ids, so
    /// one pass in id order sees every included table already complete.
    pub fn into_metadata(mut self) -> Metadata {
        for index in 0..self.tables.len() {
            let Some(included) = self.tables[index].included_table else {
                continue;
            };
            let (columns, primary_key, foreign_keys) = {
                let source = &self.tables[included.0];
                (
                    source.columns().to_vec(),
                    source.primary_key.clone(),
                    source.foreign_keys.clone(),
                )
            };
            let table = &mut self.tables[index];
            table.include_columns(&columns);
            if table.primary_key.is_none() {
                table.primary_key = primary_key;
            }
            for foreign_key in foreign_keys {
                table.add_foreign_key(foreign_key);
            }
        }

        Metadata {
            tables: self.tables,
            entities: self.entities,
            collections: self.collections,
            mapped_superclasses: self.mapped_superclasses,
            embeddables: self.embeddables,
            generators: self.generators,
            named_queries: self.named_queries,
            filter_definitions: self.filter_definitions,
            fetch_profiles: self.fetch_profiles,
            type_registrations: self.type_registrations,
            imports: self.imports,
        }
    }
}

/// Whether every part of an identifier has its columns
fn is_complete(value: &Value) -> bool {
    match value {
        Value::Basic(simple) => !simple.selectables.is_empty(),
        Value::ToOne(to_one) => !to_one.selectables.is_empty(),
        Value::Component(component) => component
            .properties
            .iter()
            .all(|property| is_complete(&property.value)),
        Value::Collection { .. } => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ormbind_model::{PrimaryKey, Property, Selectable, SimpleValue};

    fn table_name(name: &str) -> QualifiedTableName {
        QualifiedTableName::new(None, None, Identifier::unquoted(name))
    }

    fn root_with_id(collector: &mut MetadataCollector, name: &str) -> TableId {
        let (table, _) = collector.add_table(table_name(name), Identifier::unquoted(name));
        collector
            .table_mut(table)
            .add_column(Column::new(Identifier::unquoted("id")));
        let mut pc = PersistentClass::new(name, name, PersistentClassKind::Root, table);
        let mut value = SimpleValue::new(table);
        value
            .selectables
            .push(Selectable::Column(Identifier::unquoted("id")));
        pc.identifier = Some(Value::Basic(value));
        collector.add_entity_binding(pc).unwrap();
        table
    }

    #[test]
    fn test_add_table_reuses_same_name() {
        let mut collector = MetadataCollector::new();
        let (first, created) = collector.add_table(table_name("ORDERS"), Identifier::unquoted("ORDERS"));
        assert!(created);
        let (second, created) = collector.add_table(table_name("orders"), Identifier::unquoted("orders"));
        assert!(!created);
        assert_eq!(first, second);

        let private = collector.add_private_table(table_name("ORDERS"), Identifier::unquoted("ORDERS"));
        assert_ne!(private, first);
    }

    #[test]
    fn test_entity_key_columns_from_identifier() {
        let mut collector = MetadataCollector::new();
        let table = root_with_id(&mut collector, "Customer");
        match collector.entity_key_columns("Customer") {
            Resolution::Resolved(key) => {
                assert_eq!(key.table, table);
                assert_eq!(key.columns[0].name.text(), "id");
            }
            other => panic!("Expected resolved key, got {:?}", other),
        }
    }

    #[test]
    fn test_entity_key_columns_deferred_for_unknown_entity() {
        let collector = MetadataCollector::new();
        assert!(collector.entity_key_columns("Customer").is_deferred());
    }

    #[test]
    fn test_entity_key_columns_prefers_primary_key() {
        let mut collector = MetadataCollector::new();
        let table = root_with_id(&mut collector, "Customer");
        collector
            .table_mut(table)
            .add_column(Column::new(Identifier::unquoted("code")));
        collector.table_mut(table).primary_key = Some(PrimaryKey {
            name: None,
            columns: vec![Identifier::unquoted("code")],
        });
        match collector.entity_key_columns("Customer") {
            Resolution::Resolved(key) => assert_eq!(key.columns[0].name.text(), "code"),
            other => panic!("Expected resolved key, got {:?}", other),
        }
    }

    #[test]
    fn test_incomplete_identifier_is_deferred() {
        let mut collector = MetadataCollector::new();
        let (table, _) = collector.add_table(table_name("Line"), Identifier::unquoted("Line"));
        let mut pc = PersistentClass::new("Line", "Line", PersistentClassKind::Root, table);
        let mut id = ormbind_model::Component::new("Line.id", table);
        id.properties.push(Property::new(
            "order",
            Value::ToOne(ormbind_model::ToOne::new(
                ormbind_model::ToOneKind::ManyToOne,
                table,
                "Order",
            )),
        ));
        pc.identifier = Some(Value::Component(id));
        collector.add_entity_binding(pc).unwrap();
        assert!(collector.entity_key_columns("Line").is_deferred());
    }

    #[test]
    fn test_resolve_table_walks_super_entity() {
        let mut collector = MetadataCollector::new();
        let (root, _) = collector.add_table(table_name("Animal"), Identifier::unquoted("Animal"));
        let (extra, _) = collector.add_table(table_name("AnimalExtra"), Identifier::unquoted("AnimalExtra"));
        let mut xref = EntityTableXref::new(Identifier::unquoted("Animal"), root, None);
        xref.add_secondary_table(&Identifier::unquoted("AnimalExtra"), extra);
        collector.add_entity_table_xref("Animal", xref);
        collector.add_entity_table_xref(
            "Cat",
            EntityTableXref::new(Identifier::unquoted("Animal"), root, Some("Animal".to_string())),
        );

        assert_eq!(collector.resolve_table("Cat", None), Some(root));
        assert_eq!(
            collector.resolve_table("Cat", Some(&Identifier::unquoted("animalextra"))),
            Some(extra)
        );
        assert_eq!(collector.resolve_table("Cat", Some(&Identifier::unquoted("Other"))), None);
    }

    #[test]
    fn test_duplicate_import_rejected() {
        let mut collector = MetadataCollector::new();
        collector.add_import("Order", "com.acme.Order").unwrap();
        collector.add_import("Order", "com.acme.Order").unwrap();
        let result = collector.add_import("Order", "com.other.Order");
        match result {
            Err(MappingError::DuplicateImport { existing, entity, .. }) => {
                assert_eq!(existing, "com.acme.Order");
                assert_eq!(entity, "com.other.Order");
            }
            _ => panic!("Expected DuplicateImport error, got {:?}", result),
        }
    }

    #[test]
    fn test_subclasses_recorded_on_registration() {
        let mut collector = MetadataCollector::new();
        let table = root_with_id(&mut collector, "Animal");
        let mut cat = PersistentClass::new("Cat", "Cat", PersistentClassKind::SingleTableSubclass, table);
        cat.superclass = Some("Animal".to_string());
        collector.add_entity_binding(cat).unwrap();
        assert_eq!(collector.entity("Animal").unwrap().subclasses, vec!["Cat"]);
        assert_eq!(collector.root_entity("Cat").unwrap().entity_name, "Animal");
        match collector.entity_key_columns("Cat") {
            Resolution::Resolved(key) => assert_eq!(key.table, table),
            other => panic!("Expected resolved key, got {:?}", other),
        }
    }

    #[test]
    fn test_into_metadata_materializes_union_tables() {
        let mut collector = MetadataCollector::new();
        let root = root_with_id(&mut collector, "Vehicle");
        collector.table_mut(root).primary_key = Some(PrimaryKey {
            name: None,
            columns: vec![Identifier::unquoted("id")],
        });
        let (car, _) = collector.add_table(table_name("Car"), Identifier::unquoted("Car"));
        collector.table_mut(car).included_table = Some(root);
        collector
            .table_mut(car)
            .add_column(Column::new(Identifier::unquoted("doors")));
        assert!(collector.find_column(car, &Identifier::unquoted("id")).is_some());

        let metadata = collector.into_metadata();
        let car = metadata.table(car).unwrap();
        let names: Vec<&str> = car.columns().iter().map(|c| c.name.text()).collect();
        assert_eq!(names, vec!["id", "doors"]);
        assert_eq!(car.primary_key_columns()[0].text(), "id");
    }
}
