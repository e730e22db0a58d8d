// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Foreign Keys
//!
//! Second pass that links join columns to the key they reference and
//! creates the foreign key constraint. Three shapes exist:
//!
//! - a to-one property whose columns live in the owner's table
//! - the key of a joined subclass, referencing the super table
//! - a to-one mapped through a join table, which links both sides
//!
//! Every handler resolves all lookups first and mutates last, so a deferred
//! run leaves the collector untouched.

use ormbind_model::{
    DependantValue, ForeignKey, Identifier, PersistentClassKind, PrimaryKey, Selectable, TableId,
    ToOneKind, Value,
};
use ormbind_naming::{AttributePath, EntityNaming};
use tracing::debug;

use crate::collector::MetadataCollector;
use crate::column::add_column;
use crate::error::{MappingError, Resolution};
use crate::identifier::IDENTIFIER_MAPPER_PROPERTY;
use crate::join_column::{
    link_join_columns, AnnotatedJoinColumns, LinkNaming, LinkedJoinColumns, ReferencedColumnsType,
};
use crate::session::BootSession;
use crate::try_resolve;

/// A foreign key waiting for its referenced key
#[derive(Debug, Clone, PartialEq)]
pub struct PendingForeignKey {
    /// Entity owning the referencing columns
    pub entity: String,
    pub target: ForeignKeyTarget,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForeignKeyTarget {
    ToOneProperty {
        property: String,
        join_columns: AnnotatedJoinColumns,
        referenced_entity: String,
    },
    JoinedSubclassKey {
        join_columns: AnnotatedJoinColumns,
    },
    JoinTableToOne {
        property: String,
        /// Index of the join table among the entity's joins
        join_index: usize,
        key_columns: AnnotatedJoinColumns,
        join_columns: AnnotatedJoinColumns,
        referenced_entity: String,
    },
}

impl PendingForeignKey {
    pub fn describe(&self) -> String {
        match &self.target {
            ForeignKeyTarget::ToOneProperty {
                property,
                referenced_entity,
                ..
            } => format!("foreign key {}.{} -> {}", self.entity, property, referenced_entity),
            ForeignKeyTarget::JoinedSubclassKey { .. } => {
                format!("joined subclass key of {}", self.entity)
            }
            ForeignKeyTarget::JoinTableToOne {
                property,
                referenced_entity,
                ..
            } => format!(
                "join table foreign keys {}.{} -> {}",
                self.entity, property, referenced_entity
            ),
        }
    }
}

/// Run a pending foreign key
pub fn bind_foreign_key(session: &mut BootSession<'_>, pending: &PendingForeignKey) -> Resolution<()> {
    match &pending.target {
        ForeignKeyTarget::ToOneProperty {
            property,
            join_columns,
            referenced_entity,
        } => bind_to_one(session, &pending.entity, property, join_columns, referenced_entity),
        ForeignKeyTarget::JoinedSubclassKey { join_columns } => {
            bind_joined_subclass_key(session, &pending.entity, join_columns)
        }
        ForeignKeyTarget::JoinTableToOne {
            property,
            join_index,
            key_columns,
            join_columns,
            referenced_entity,
        } => bind_join_table_to_one(
            session,
            &pending.entity,
            property,
            *join_index,
            key_columns,
            join_columns,
            referenced_entity,
        ),
    }
}

fn assertion<T>(entity: &str, message: impl Into<String>) -> Resolution<T> {
    Resolution::Fatal(MappingError::AssertionFailure {
        class: entity.to_string(),
        message: message.into(),
    })
}

fn entity_naming(collector: &MetadataCollector, entity: &str) -> Option<EntityNaming> {
    collector
        .entity(entity)
        .map(|pc| EntityNaming::new(&pc.entity_name, &pc.class_name, &pc.jpa_entity_name))
}

/// Foreign key for linked columns, `None` when no constraint is wanted
pub(crate) fn foreign_key_for(
    join_columns: &AnnotatedJoinColumns,
    columns: Vec<Identifier>,
    linked_table: TableId,
    referenced_entity: &str,
    referenced_columns: Vec<Identifier>,
) -> Option<ForeignKey> {
    if !join_columns.foreign_key.constraint || columns.is_empty() {
        return None;
    }
    Some(ForeignKey {
        name: join_columns.foreign_key.name.clone(),
        columns,
        referenced_table: linked_table,
        referenced_entity: Some(referenced_entity.to_string()),
        referenced_columns,
        on_delete: join_columns.on_delete,
        constraint: true,
    })
}

pub(crate) fn referenced_columns_of(linked: &LinkedJoinColumns) -> Vec<Identifier> {
    match linked.reference {
        ReferencedColumnsType::NonPrimaryKey => linked.referenced_columns.clone(),
        _ => Vec::new(),
    }
}

/// Resolved shape of a to-one property
struct ToOneLink {
    table: TableId,
    selectables: Vec<Selectable>,
    new_columns: Vec<ormbind_model::Column>,
    foreign_key: Option<ForeignKey>,
    referenced_property: Option<String>,
    maps_id: bool,
}

fn bind_to_one(
    session: &mut BootSession<'_>,
    entity: &str,
    property: &str,
    join_columns: &AnnotatedJoinColumns,
    referenced_entity: &str,
) -> Resolution<()> {
    let ctx = session.context();
    let collector = &session.collector;
    let Some(owner) = collector.entity(entity) else {
        return assertion(entity, "foreign key queued before its entity was registered");
    };
    let Some(to_one) = owner.property_by_path(property).and_then(|p| p.value.as_to_one()) else {
        return assertion(entity, format!("'{}' is not a to-one property", property));
    };
    if !to_one.selectables.is_empty() {
        return Resolution::Resolved(());
    }
    let is_one_to_one = to_one.kind == ToOneKind::OneToOne;
    let table = to_one.table;

    let link = match &join_columns.maps_id {
        Some(maps_id) => {
            // the association shares the owner's identifier columns
            let id_columns = if maps_id.is_empty() {
                owner
                    .identifier
                    .as_ref()
                    .map(Value::column_names)
                    .unwrap_or_default()
            } else {
                owner
                    .identifier_part(maps_id)
                    .map(|p| p.value.column_names())
                    .unwrap_or_default()
            };
            if id_columns.is_empty() {
                return Resolution::deferred(
                    entity,
                    format!("identifier columns of '{}'", entity),
                    "@MapsId needs the identifier to be bound",
                );
            }
            let key = try_resolve!(collector.entity_key_columns(referenced_entity));
            if key.columns.len() != id_columns.len() {
                return Resolution::Fatal(MappingError::JoinColumnCountMismatch {
                    entity: entity.to_string(),
                    property: property.to_string(),
                    target: referenced_entity.to_string(),
                    declared: id_columns.len(),
                    expected: key.columns.len(),
                });
            }
            ToOneLink {
                table,
                selectables: id_columns.iter().cloned().map(Selectable::Column).collect(),
                new_columns: Vec::new(),
                foreign_key: foreign_key_for(join_columns, id_columns, key.table, referenced_entity, Vec::new()),
                referenced_property: None,
                maps_id: true,
            }
        }
        None => {
            let Some(naming) = entity_naming(collector, entity) else {
                return assertion(entity, "entity vanished while binding a foreign key");
            };
            let path = AttributePath::parse(property);
            let linked = try_resolve!(link_join_columns(
                &ctx,
                collector,
                join_columns,
                referenced_entity,
                &LinkNaming::Owner {
                    owner: &naming,
                    attribute_path: Some(&path),
                },
            ));
            let mut new_columns = linked.columns.clone();
            if is_one_to_one {
                for column in &mut new_columns {
                    column.unique = true;
                }
            }
            ToOneLink {
                table,
                selectables: linked.selectables.clone(),
                foreign_key: foreign_key_for(
                    join_columns,
                    linked.column_names(),
                    linked.referenced_table,
                    referenced_entity,
                    referenced_columns_of(&linked),
                ),
                new_columns,
                referenced_property: linked.referenced_property.clone(),
                maps_id: false,
            }
        }
    };

    // mutation starts here
    for column in link.new_columns {
        add_column(&mut session.collector, link.table, column);
    }
    if let Some(foreign_key) = link.foreign_key {
        session.collector.table_mut(link.table).add_foreign_key(foreign_key);
    }
    let Some(owner) = session.collector.entity_mut(entity) else {
        return assertion(entity, "entity vanished while binding a foreign key");
    };
    let apply = |value: &mut Value| {
        if let Value::ToOne(to_one) = value {
            to_one.selectables = link.selectables.clone();
            to_one.referenced_property = link.referenced_property.clone();
            to_one.on_delete = join_columns.on_delete;
            to_one.foreign_key_name = join_columns.foreign_key.name.clone();
        }
    };
    if let Some(target) = owner.property_by_path_mut(property) {
        apply(&mut target.value);
        if link.maps_id {
            target.insertable = false;
            target.updateable = false;
        }
    }
    // copies of an id part held by the @IdClass mapper
    if let Some(part) = owner
        .identifier_mapper
        .as_mut()
        .and_then(|mapper| mapper.properties.iter_mut().find(|p| p.name == property))
    {
        apply(&mut part.value);
    }
    let synthetic = owner
        .property_mut(IDENTIFIER_MAPPER_PROPERTY)
        .and_then(|p| match &mut p.value {
            Value::Component(mapper) => mapper.properties.iter_mut().find(|p| p.name == property),
            _ => None,
        });
    if let Some(part) = synthetic {
        apply(&mut part.value);
    }

    debug!(entity, property, target = referenced_entity, "Bound to-one foreign key");
    Resolution::Resolved(())
}

fn bind_joined_subclass_key(
    session: &mut BootSession<'_>,
    entity: &str,
    join_columns: &AnnotatedJoinColumns,
) -> Resolution<()> {
    let ctx = session.context();
    let collector = &session.collector;
    let Some(subclass) = collector.entity(entity) else {
        return assertion(entity, "joined subclass key queued before its entity was registered");
    };
    if subclass.joined_key().is_some_and(|key| !key.columns.is_empty()) {
        return Resolution::Resolved(());
    }
    let Some(super_entity) = subclass.superclass.clone() else {
        return assertion(entity, "joined subclass without superclass");
    };
    let table = subclass.table;
    let linked = try_resolve!(link_join_columns(
        &ctx,
        collector,
        join_columns,
        &super_entity,
        &LinkNaming::IntraHierarchy,
    ));

    let foreign_key = foreign_key_for(
        join_columns,
        linked.column_names(),
        linked.referenced_table,
        &super_entity,
        referenced_columns_of(&linked),
    );
    let mut key = DependantValue::new(table);
    key.on_delete = join_columns.on_delete;
    key.nullable = false;
    key.updateable = false;
    for mut column in linked.columns {
        column.nullable = false;
        key.columns.push(column.name.clone());
        add_column(&mut session.collector, table, column);
    }
    if let Some(foreign_key) = foreign_key {
        session.collector.table_mut(table).add_foreign_key(foreign_key);
    }
    if let Some(subclass) = session.collector.entity_mut(entity) {
        subclass.kind = PersistentClassKind::JoinedSubclass { key: Some(key) };
    }
    debug!(entity, super_entity = %super_entity, "Bound joined subclass key");
    Resolution::Resolved(())
}

fn bind_join_table_to_one(
    session: &mut BootSession<'_>,
    entity: &str,
    property: &str,
    join_index: usize,
    key_columns: &AnnotatedJoinColumns,
    join_columns: &AnnotatedJoinColumns,
    referenced_entity: &str,
) -> Resolution<()> {
    let ctx = session.context();
    let collector = &session.collector;
    let Some(owner) = collector.entity(entity) else {
        return assertion(entity, "join table queued before its entity was registered");
    };
    let Some(join) = owner.joins.get(join_index) else {
        return assertion(entity, format!("no join at index {}", join_index));
    };
    if join.key.is_some() {
        return Resolution::Resolved(());
    }
    let join_table = join.table;
    let Some(naming) = entity_naming(collector, entity) else {
        return assertion(entity, "entity vanished while binding a join table");
    };

    let owner_key = try_resolve!(link_join_columns(
        &ctx,
        collector,
        key_columns,
        entity,
        &LinkNaming::Owner {
            owner: &naming,
            attribute_path: None,
        },
    ));
    let path = AttributePath::parse(property);
    let element = try_resolve!(link_join_columns(
        &ctx,
        collector,
        join_columns,
        referenced_entity,
        &LinkNaming::Owner {
            owner: &naming,
            attribute_path: Some(&path),
        },
    ));

    let key_names = owner_key.column_names();
    let owner_fk = foreign_key_for(
        key_columns,
        key_names.clone(),
        owner_key.referenced_table,
        entity,
        referenced_columns_of(&owner_key),
    );
    let element_fk = foreign_key_for(
        join_columns,
        element.column_names(),
        element.referenced_table,
        referenced_entity,
        referenced_columns_of(&element),
    );

    for mut column in owner_key.columns {
        column.nullable = false;
        add_column(&mut session.collector, join_table, column);
    }
    for column in element.columns {
        add_column(&mut session.collector, join_table, column);
    }
    let table = session.collector.table_mut(join_table);
    if table.primary_key.is_none() {
        table.primary_key = Some(PrimaryKey {
            name: None,
            columns: key_names.clone(),
        });
    }
    for foreign_key in [owner_fk, element_fk].into_iter().flatten() {
        table.add_foreign_key(foreign_key);
    }

    let Some(owner) = session.collector.entity_mut(entity) else {
        return assertion(entity, "entity vanished while binding a join table");
    };
    if let Some(join) = owner.joins.get_mut(join_index) {
        let mut key = DependantValue::new(join_table);
        key.columns = key_names;
        key.nullable = false;
        key.on_delete = key_columns.on_delete;
        join.key = Some(key);
    }
    if let Some(Value::ToOne(to_one)) = owner.property_by_path_mut(property).map(|p| &mut p.value) {
        to_one.table = join_table;
        to_one.selectables = element.selectables;
        to_one.referenced_property = element.referenced_property;
        to_one.foreign_key_name = join_columns.foreign_key.name.clone();
    }
    debug!(entity, property, target = referenced_entity, "Bound to-one join table");
    Resolution::Resolved(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BinderConfig;
    use crate::context::BindingContext;
    use crate::type_binder::TypeBinderRegistry;
    use ormbind_model::{Column, PersistentClass, Property, QualifiedTableName, SimpleValue, ToOne};
    use ormbind_naming::{JoinColumnNature, JpaCompliantNamingStrategy, SnakeCasePhysicalNaming};
    use ormbind_source::StaticAnnotationSource;

    fn add_entity(collector: &mut MetadataCollector, name: &str, kind: PersistentClassKind) -> TableId {
        let logical = Identifier::unquoted(name);
        let (table, _) = collector.add_table(QualifiedTableName::new(None, None, logical.clone()), logical);
        let mut pc = PersistentClass::new(name, name, kind, table);
        if pc.is_root() {
            collector
                .table_mut(table)
                .add_column(Column::new(Identifier::unquoted("id")).with_type_name("long"));
            let mut id = SimpleValue::new(table).with_type_name("long");
            id.selectables.push(Selectable::Column(Identifier::unquoted("id")));
            pc.identifier = Some(Value::Basic(id));
        }
        collector.add_entity_binding(pc).unwrap();
        table
    }

    #[test]
    fn test_many_to_one_creates_column_and_foreign_key() {
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
        let mut session = BootSession::new(ctx);
        let order_table = add_entity(&mut session.collector, "Order", PersistentClassKind::Root);
        let customer_table = add_entity(&mut session.collector, "Customer", PersistentClassKind::Root);
        session.collector.entity_mut("Order").unwrap().properties.push(Property::new(
            "customer",
            Value::ToOne(ToOne::new(ToOneKind::ManyToOne, order_table, "Customer")),
        ));

        let pending = PendingForeignKey {
            entity: "Order".to_string(),
            target: ForeignKeyTarget::ToOneProperty {
                property: "customer".to_string(),
                join_columns: AnnotatedJoinColumns::new("Order", JoinColumnNature::Entity)
                    .with_property("customer"),
                referenced_entity: "Customer".to_string(),
            },
        };
        assert!(bind_foreign_key(&mut session, &pending).is_resolved());
        // a second run is a no-op
        assert!(bind_foreign_key(&mut session, &pending).is_resolved());

        let table = session.collector.table(order_table);
        assert!(table.has_column(&Identifier::unquoted("customer_id")));
        assert_eq!(table.foreign_keys.len(), 1);
        assert_eq!(table.foreign_keys[0].referenced_table, customer_table);
        let to_one = session
            .collector
            .entity("Order")
            .unwrap()
            .property("customer")
            .unwrap()
            .value
            .as_to_one()
            .unwrap();
        assert_eq!(to_one.selectables.len(), 1);
    }

    #[test]
    fn test_joined_subclass_key_waits_for_super() {
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
        let mut session = BootSession::new(ctx);
        let logical = Identifier::unquoted("Cat");
        let (cat_table, _) = session
            .collector
            .add_table(QualifiedTableName::new(None, None, logical.clone()), logical);
        let mut cat = PersistentClass::new("Cat", "Cat", PersistentClassKind::JoinedSubclass { key: None }, cat_table);
        cat.superclass = Some("Animal".to_string());
        session.collector.add_entity_binding(cat).unwrap();

        let pending = PendingForeignKey {
            entity: "Cat".to_string(),
            target: ForeignKeyTarget::JoinedSubclassKey {
                join_columns: AnnotatedJoinColumns::new("Cat", JoinColumnNature::Entity),
            },
        };
        assert!(bind_foreign_key(&mut session, &pending).is_deferred());
        assert!(session.collector.table(cat_table).columns().is_empty());

        let animal_table = add_entity(&mut session.collector, "Animal", PersistentClassKind::Root);
        assert!(bind_foreign_key(&mut session, &pending).is_resolved());
        let cat = session.collector.entity("Cat").unwrap();
        let key = cat.joined_key().unwrap();
        assert_eq!(key.columns, vec![Identifier::unquoted("id")]);
        let table = session.collector.table(cat_table);
        assert!(!table.column(&Identifier::unquoted("id")).unwrap().nullable);
        assert_eq!(table.foreign_keys[0].referenced_table, animal_table);
    }

    #[test]
    fn test_describe() {
        let pending = PendingForeignKey {
            entity: "Order".to_string(),
            target: ForeignKeyTarget::ToOneProperty {
                property: "customer".to_string(),
                join_columns: AnnotatedJoinColumns::new("Order", JoinColumnNature::Entity),
                referenced_entity: "Customer".to_string(),
            },
        };
        assert_eq!(pending.describe(), "foreign key Order.customer -> Customer");
    }
}
