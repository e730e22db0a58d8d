// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Associations
//!
//! First-pass binding of to-one and collection attributes, plus the second
//! passes that finish them once the other side is bound.
//!
//! ## To-one
//!
//! The property is created without columns. A [`SecondPass::ForeignKey`]
//! links its join columns, or, with `@JoinTable`, a
//! [`SecondPass::ImplicitJoinTable`] first creates the join table. The
//! inverse side of a `@OneToOne(mappedBy)` has no columns and is checked by
//! [`SecondPass::InverseOneToOne`].
//!
//! ## Collections
//!
//! | Mapping                                   | Key columns                        |
//! |-------------------------------------------|------------------------------------|
//! | `@OneToMany(mappedBy)`                    | copied from the owning to-one      |
//! | `@OneToMany` + `@JoinColumn`              | added to the element table         |
//! | `@ManyToMany(mappedBy)`                   | owning join table, sides swapped   |
//! | anything else                             | join table                         |

use ormbind_model::{
    Collection, CollectionElement, CollectionKind, DependantValue, Identifier, Join, JoinOrigin,
    PersistentClass, PrimaryKey, Property, ToOne, ToOneKind, UniqueKey, Value,
};
use ormbind_naming::{AttributePath, EntityNaming, ImplicitJoinTableNameSource, JoinColumnNature};
use ormbind_source::{names, Annotated, AnnotationUsage};
use tracing::debug;

use crate::collector::MetadataCollector;
use crate::column::{add_column, find_join};
use crate::context::BindingContext;
use crate::error::{BindResult, MappingError, Resolution};
use crate::foreign_key::{foreign_key_for, referenced_columns_of, ForeignKeyTarget, PendingForeignKey};
use crate::join_column::{
    build_default_column_name, link_join_columns, AnnotatedJoinColumns, DefaultNameSource, LinkNaming,
};
use crate::property::PropertySite;
use crate::second_pass::SecondPass;
use crate::session::BootSession;
use crate::table::{bind_table, TableSpec};
use crate::{try_bind, try_resolve};

/// A to-one `@JoinTable` waiting for the target's table name
#[derive(Debug, Clone, PartialEq)]
pub struct PendingJoinTable {
    pub entity: String,
    pub property: String,
    pub referenced_entity: String,
    pub spec: TableSpec,
    pub key_columns: AnnotatedJoinColumns,
    pub join_columns: AnnotatedJoinColumns,
    pub optional: bool,
}

/// A collection waiting for its key and element columns
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCollection {
    pub role: String,
    pub entity: String,
    pub property: String,
    pub target: String,
    /// Declared `@JoinTable`
    pub join_table: Option<TableSpec>,
    /// Join table columns referencing the owner
    pub key_columns: AnnotatedJoinColumns,
    /// Join table columns referencing the element
    pub element_columns: AnnotatedJoinColumns,
    /// `@JoinColumn`s of a unidirectional one-to-many; carries `mappedBy`
    /// on the inverse side
    pub join_columns: AnnotatedJoinColumns,
}

fn misuse(entity: &PersistentClass, property: &str, annotation: &str, reason: &str) -> MappingError {
    MappingError::PropertyMisuse {
        entity: entity.entity_name.clone(),
        property: property.to_string(),
        annotation: annotation.to_string(),
        reason: reason.to_string(),
    }
}

fn assertion<T>(entity: &str, message: impl Into<String>) -> Resolution<T> {
    Resolution::Fatal(MappingError::AssertionFailure {
        class: entity.to_string(),
        message: message.into(),
    })
}

fn mapped_by_error(pending_entity: &str, property: &str, target: &str, mapped_by: &str, reason: &str) -> MappingError {
    MappingError::MappedByResolution {
        entity: pending_entity.to_string(),
        property: property.to_string(),
        target: target.to_string(),
        mapped_by: mapped_by.to_string(),
        reason: reason.to_string(),
    }
}

/// Resolve the target entity class of an association
fn target_entity(
    ctx: &BindingContext<'_>,
    entity: &PersistentClass,
    property: &str,
    annotation: &str,
    declared: Option<&str>,
) -> BindResult<String> {
    let Some(name) = declared else {
        return Err(misuse(entity, property, annotation, "the target entity cannot be determined"));
    };
    let target = ctx.class(name, &entity.entity_name)?;
    if !target.has_annotation(names::ENTITY) {
        return Err(MappingError::UnknownReferencedEntity {
            entity: entity.entity_name.clone(),
            property: property.to_string(),
            target: target.name.clone(),
        });
    }
    Ok(target.name.clone())
}

fn entity_naming(entity: &PersistentClass) -> EntityNaming {
    EntityNaming::new(&entity.entity_name, &entity.class_name, &entity.jpa_entity_name)
}

/// Property of `entity` or of one of its super entities
fn find_inherited_property<'c>(collector: &'c MetadataCollector, entity: &str, path: &str) -> Option<&'c Property> {
    let mut current = collector.entity(entity);
    while let Some(pc) = current {
        if let Some(property) = pc.property_by_path(path) {
            return Some(property);
        }
        current = pc.superclass.as_deref().and_then(|name| collector.entity(name));
    }
    None
}

/// Whether `candidate` is `entity` or one of its super entities
fn is_same_or_super(collector: &MetadataCollector, entity: &str, candidate: &str) -> bool {
    let mut current = Some(entity);
    while let Some(name) = current {
        if name == candidate {
            return true;
        }
        current = collector.entity(name).and_then(|pc| pc.superclass.as_deref());
    }
    false
}

/// Name of a join table left implicit: `<owner table>_<target table>`
fn implicit_join_table_name(
    ctx: &BindingContext<'_>,
    collector: &MetadataCollector,
    owner: &PersistentClass,
    target: &PersistentClass,
    property: &str,
) -> Identifier {
    let name = ctx
        .implicit_naming
        .determine_join_table_name(&ImplicitJoinTableNameSource {
            owning_physical_table_name: collector.table(owner.table).name.table.clone(),
            owning_entity_naming: entity_naming(owner),
            non_owning_physical_table_name: collector.table(target.table).name.table.clone(),
            non_owning_entity_naming: entity_naming(target),
            association_owning_attribute_path: AttributePath::parse(property),
        });
    ctx.implicit_identifier(name)
}

// ---- to-one ----

/// Bind a `@ManyToOne` or `@OneToOne` attribute
pub fn bind_to_one_property(
    ctx: &BindingContext<'_>,
    collector: &mut MetadataCollector,
    entity: &PersistentClass,
    site: &PropertySite<'_>,
) -> BindResult<Property> {
    let member = site.member;
    let path = site.path.full_path();
    let (kind, usage) = match member.annotation(names::MANY_TO_ONE) {
        Some(usage) => (ToOneKind::ManyToOne, usage),
        None => match member.annotation(names::ONE_TO_ONE) {
            Some(usage) => (ToOneKind::OneToOne, usage),
            None => return Err(misuse(entity, &path, names::MANY_TO_ONE, "not a to-one association")),
        },
    };
    let target = target_entity(
        ctx,
        entity,
        &path,
        &usage.name,
        usage.class_ref("targetEntity").or(Some(member.type_name.as_str())),
    )?;
    let optional = usage.bool_or("optional", true) && !site.key;
    let join_table = member.annotation(names::JOIN_TABLE);
    let join_columns = AnnotatedJoinColumns::for_association(
        ctx,
        &entity.entity_name,
        member,
        &site.path,
        JoinColumnNature::Entity,
    )?;

    if kind == ToOneKind::OneToOne {
        if let Some(mapped_by) = join_columns.mapped_by.as_deref() {
            if join_table.is_some() || !join_columns.is_implicit() {
                return Err(misuse(
                    entity,
                    &path,
                    names::JOIN_COLUMN,
                    "the inverse side of an association cannot declare join columns",
                ));
            }
            return Ok(bind_inverse_one_to_one(collector, entity, site, usage, &target, mapped_by));
        }
    }

    let mut property;
    if let Some(join_table) = join_table {
        if !join_columns.is_implicit() {
            return Err(misuse(
                entity,
                &path,
                names::JOIN_TABLE,
                "an association maps to join columns or to a join table, not both",
            ));
        }
        let to_one = to_one_value(ToOne::new(kind, entity.table, &target), usage);
        property = Property::new(&member.name, Value::ToOne(to_one));
        collector.add_second_pass(SecondPass::ImplicitJoinTable(PendingJoinTable {
            entity: entity.entity_name.clone(),
            property: path.clone(),
            referenced_entity: target.clone(),
            spec: TableSpec::from_annotation(ctx, Some(join_table)),
            key_columns: AnnotatedJoinColumns::for_join_table(ctx, &entity.entity_name, &path, Some(join_table), false, false),
            join_columns: AnnotatedJoinColumns::for_join_table(ctx, &entity.entity_name, &path, Some(join_table), true, false),
            optional,
        }));
    } else {
        let (table, join) = match join_columns.secondary_table() {
            Some(name) => {
                let index = find_join(collector, entity, name).ok_or_else(|| {
                    MappingError::UnknownSecondaryTable {
                        entity: entity.entity_name.clone(),
                        table: name.to_string(),
                    }
                })?;
                (entity.joins[index].table, Some(index))
            }
            None => (entity.table, None),
        };
        let mut to_one = to_one_value(ToOne::new(kind, table, &target), usage);
        to_one.constrained = kind == ToOneKind::OneToOne && (!optional || join_columns.maps_id.is_some());
        property = Property::new(&member.name, Value::ToOne(to_one));
        property.join = join;
        if !join_columns.is_implicit() && !join_columns.has_formula() {
            property.insertable = join_columns.columns.iter().any(|c| c.insertable);
            property.updateable = join_columns.columns.iter().any(|c| c.updatable);
        } else if join_columns.has_formula() {
            property = property.read_only();
        }
        collector.add_second_pass(SecondPass::ForeignKey(PendingForeignKey {
            entity: entity.entity_name.clone(),
            target: ForeignKeyTarget::ToOneProperty {
                property: path.clone(),
                join_columns,
                referenced_entity: target.clone(),
            },
        }));
    }
    property.optional = optional;

    debug!(entity = %entity.entity_name, property = %path, target = %target, ?kind, "Bound to-one");
    Ok(property.with_declaring_class(site.declaring_class))
}

/// Apply an explicit `fetch`; the default is left to the model
fn to_one_value(mut to_one: ToOne, usage: &AnnotationUsage) -> ToOne {
    if usage.has_attribute("fetch") {
        to_one.lazy = usage.enum_value("fetch", "EAGER") == "LAZY";
    }
    to_one
}

fn bind_inverse_one_to_one(
    collector: &mut MetadataCollector,
    entity: &PersistentClass,
    site: &PropertySite<'_>,
    usage: &AnnotationUsage,
    target: &str,
    mapped_by: &str,
) -> Property {
    let path = site.path.full_path();
    let mut to_one = to_one_value(ToOne::new(ToOneKind::OneToOne, entity.table, target), usage);
    to_one.mapped_by = Some(mapped_by.to_string());
    collector.add_second_pass(SecondPass::InverseOneToOne {
        entity: entity.entity_name.clone(),
        property: path,
        target: target.to_string(),
        mapped_by: mapped_by.to_string(),
    });
    Property::new(&site.member.name, Value::ToOne(to_one))
        .read_only()
        .with_declaring_class(site.declaring_class)
}

/// Second pass: create the join table of a to-one association
pub fn bind_implicit_join_table(session: &mut BootSession<'_>, pending: &PendingJoinTable) -> Resolution<()> {
    let ctx = session.context();
    let collector = &session.collector;
    let Some(owner) = collector.entity(&pending.entity) else {
        return assertion(&pending.entity, "join table queued before its entity was registered");
    };
    let Some(property) = owner.property_by_path(&pending.property) else {
        return assertion(&pending.entity, format!("no property '{}'", pending.property));
    };
    if property.join.is_some() {
        return Resolution::Resolved(());
    }
    let logical = match &pending.spec.name {
        Some(name) => name.clone(),
        None => {
            let Some(target) = collector.entity(&pending.referenced_entity) else {
                return Resolution::deferred(
                    &pending.entity,
                    format!("entity '{}'", pending.referenced_entity),
                    "the implicit join table name needs the target table",
                );
            };
            implicit_join_table_name(&ctx, collector, owner, target, &pending.property)
        }
    };

    // mutation starts here
    let table = bind_table(&ctx, &mut session.collector, &pending.spec, &logical);
    let Some(owner) = session.collector.entity_mut(&pending.entity) else {
        return assertion(&pending.entity, "entity vanished while binding a join table");
    };
    let mut join = Join::new(table, JoinOrigin::JoinTable);
    join.optional = pending.optional;
    owner.joins.push(join);
    let join_index = owner.joins.len() - 1;
    if let Some(property) = owner.property_by_path_mut(&pending.property) {
        property.join = Some(join_index);
    }
    session.collector.add_second_pass(SecondPass::ForeignKey(PendingForeignKey {
        entity: pending.entity.clone(),
        target: ForeignKeyTarget::JoinTableToOne {
            property: pending.property.clone(),
            join_index,
            key_columns: pending.key_columns.clone(),
            join_columns: pending.join_columns.clone(),
            referenced_entity: pending.referenced_entity.clone(),
        },
    }));
    debug!(entity = %pending.entity, property = %pending.property, table = %logical, "Created to-one join table");
    Resolution::Resolved(())
}

/// Second pass: check the owning side of a `@OneToOne(mappedBy)`
pub fn verify_inverse_one_to_one(
    session: &mut BootSession<'_>,
    entity: &str,
    property: &str,
    target: &str,
    mapped_by: &str,
) -> Resolution<()> {
    let collector = &session.collector;
    if collector.entity(target).is_none() {
        return Resolution::deferred(entity, format!("entity '{}'", target), "target is not bound yet");
    }
    let fail = |reason: &str| Resolution::Fatal(mapped_by_error(entity, property, target, mapped_by, reason));
    let Some(owning) = find_inherited_property(collector, target, mapped_by) else {
        return fail("the target has no such property");
    };
    let Some(owning) = owning.value.as_to_one() else {
        return fail("the owning property is not a to-one association");
    };
    if owning.mapped_by.is_some() {
        return fail("both sides declare mappedBy");
    }
    if !is_same_or_super(collector, entity, &owning.referenced_entity) {
        return fail(&format!("the owning property references '{}'", owning.referenced_entity));
    }

    let Some(owner) = session.collector.entity_mut(entity) else {
        return assertion(entity, "inverse one-to-one queued before its entity was registered");
    };
    if let Some(Value::ToOne(to_one)) = owner.property_by_path_mut(property).map(|p| &mut p.value) {
        to_one.referenced_property = Some(mapped_by.to_string());
    }
    Resolution::Resolved(())
}

// ---- collections ----

/// Bind a `@OneToMany` or `@ManyToMany` attribute
///
/// Registers the collection under `<entity>.<path>`; its columns are bound
/// by a [`SecondPass::Association`].
pub fn bind_collection_property(
    ctx: &BindingContext<'_>,
    collector: &mut MetadataCollector,
    entity: &PersistentClass,
    site: &PropertySite<'_>,
) -> BindResult<Property> {
    let member = site.member;
    let path = site.path.full_path();
    let (many_to_many, usage) = match member.annotation(names::MANY_TO_MANY) {
        Some(usage) => (true, usage),
        None => match member.annotation(names::ONE_TO_MANY) {
            Some(usage) => (false, usage),
            None => return Err(misuse(entity, &path, names::ONE_TO_MANY, "not a collection association")),
        },
    };
    let target = target_entity(
        ctx,
        entity,
        &path,
        &usage.name,
        usage
            .class_ref("targetEntity")
            .or_else(|| member.collection_element_type()),
    )?;

    let join_table = member.annotation(names::JOIN_TABLE);
    let join_columns = AnnotatedJoinColumns::for_association(
        ctx,
        &entity.entity_name,
        member,
        &site.path,
        JoinColumnNature::EntityCollection,
    )?;
    let mapped_by = join_columns.mapped_by.clone();
    let owns_many_to_many = many_to_many && mapped_by.is_none();
    if join_columns.has_mapped_by() && (join_table.is_some() || !join_columns.is_implicit()) {
        return Err(misuse(
            entity,
            &path,
            if join_table.is_some() { names::JOIN_TABLE } else { names::JOIN_COLUMN },
            "the inverse side of an association cannot declare join columns or a join table",
        ));
    }
    if join_table.is_some() && !join_columns.is_implicit() {
        return Err(misuse(
            entity,
            &path,
            names::JOIN_TABLE,
            "an association maps to join columns or to a join table, not both",
        ));
    }
    if many_to_many && !join_columns.is_implicit() {
        return Err(misuse(
            entity,
            &path,
            names::JOIN_COLUMN,
            "a many-to-many association maps through a join table",
        ));
    }

    let role = format!("{}.{}", entity.entity_name, path);
    let element = if many_to_many {
        CollectionElement::ManyToMany {
            entity: target.clone(),
            columns: Vec::new(),
        }
    } else {
        CollectionElement::OneToMany { entity: target.clone() }
    };
    let mut collection = Collection::new(
        &role,
        &entity.entity_name,
        CollectionKind::from_type_name(&member.type_name),
        element,
    );
    collection.inverse = mapped_by.is_some();
    collection.mapped_by = mapped_by.clone();
    collection.lazy = usage.enum_value("fetch", "LAZY") != "EAGER";
    // an empty @OrderBy orders by the element's identifier
    collection.order_by = member
        .annotation(names::ORDER_BY)
        .map(|order| order.string_or_empty("value").to_string());
    collection.where_clause = member
        .annotation(names::SQL_RESTRICTION)
        .and_then(|r| r.string("value"))
        .or_else(|| member.annotation(names::WHERE).and_then(|w| w.string("clause")))
        .map(str::to_string);
    collection.batch_size = member
        .annotation(names::BATCH_SIZE)
        .and_then(|b| b.int("size"))
        .and_then(|size| u32::try_from(size).ok());
    collector.add_collection(collection)?;

    collector.add_second_pass(SecondPass::Association(PendingCollection {
        role: role.clone(),
        entity: entity.entity_name.clone(),
        property: path.clone(),
        target,
        join_table: join_table.map(|jt| TableSpec::from_annotation(ctx, Some(jt))),
        key_columns: AnnotatedJoinColumns::for_join_table(ctx, &entity.entity_name, &path, join_table, false, owns_many_to_many),
        element_columns: AnnotatedJoinColumns::for_join_table(ctx, &entity.entity_name, &path, join_table, true, owns_many_to_many),
        join_columns,
    }));
    debug!(role = %role, many_to_many, "Registered collection");

    let mut property = Property::new(&member.name, Value::Collection { role });
    property.lazy = true;
    Ok(property.with_declaring_class(site.declaring_class))
}

/// Second pass: bind key and element columns of a collection
pub fn bind_collection(session: &mut BootSession<'_>, pending: &PendingCollection) -> Resolution<()> {
    let Some(collection) = session.collector.collection(&pending.role) else {
        return assertion(&pending.entity, format!("collection '{}' is not registered", pending.role));
    };
    if collection.is_resolved() {
        return Resolution::Resolved(());
    }
    let one_to_many = collection.is_one_to_many();
    let kind = collection.kind;

    match &pending.join_columns.mapped_by {
        Some(mapped_by) if one_to_many => bind_one_to_many_inverse(session, pending, mapped_by),
        Some(mapped_by) => bind_many_to_many_inverse(session, pending, mapped_by),
        None if one_to_many && pending.join_table.is_none() && !pending.join_columns.is_implicit() => {
            bind_one_to_many_join_columns(session, pending)
        }
        None => bind_collection_table(session, pending, kind),
    }
}

fn bind_one_to_many_inverse(session: &mut BootSession<'_>, pending: &PendingCollection, mapped_by: &str) -> Resolution<()> {
    let ctx = session.context();
    let collector = &session.collector;
    if collector.entity(&pending.target).is_none() {
        return Resolution::deferred(
            &pending.entity,
            format!("entity '{}'", pending.target),
            "element entity is not bound yet",
        );
    }
    let fail = |reason: &str| {
        Resolution::Fatal(mapped_by_error(&pending.entity, &pending.property, &pending.target, mapped_by, reason))
    };
    let Some(owning) = find_inherited_property(collector, &pending.target, mapped_by) else {
        return fail("the element entity has no such property");
    };
    let Some(to_one) = owning.value.as_to_one() else {
        return fail("the owning property is not a to-one association");
    };
    if !is_same_or_super(collector, &pending.entity, &to_one.referenced_entity) {
        return fail(&format!("the owning property references '{}'", to_one.referenced_entity));
    }
    if to_one.selectables.is_empty() {
        return Resolution::deferred(
            &pending.entity,
            format!("columns of '{}.{}'", pending.target, mapped_by),
            "the owning side is bound by a foreign key second pass",
        );
    }
    let column = try_bind!(build_default_column_name(
        &ctx,
        &DefaultNameSource::MappedBy {
            entity: &pending.entity,
            property: &pending.property,
            target: &pending.target,
            mapped_by,
            owning_selectables: &to_one.selectables,
        },
    ));
    let table = to_one.table;
    let mut key = DependantValue::new(table);
    key.columns = vec![column];
    key.nullable = owning.optional;
    key.on_delete = pending.join_columns.on_delete;

    let Some(collection) = session.collector.collection_mut(&pending.role) else {
        return assertion(&pending.entity, "collection vanished");
    };
    collection.collection_table = Some(table);
    collection.key = Some(key);
    debug!(role = %pending.role, mapped_by, "Bound inverse one-to-many");
    Resolution::Resolved(())
}

fn bind_many_to_many_inverse(session: &mut BootSession<'_>, pending: &PendingCollection, mapped_by: &str) -> Resolution<()> {
    let collector = &session.collector;
    let fail = |reason: &str| {
        Resolution::Fatal(mapped_by_error(&pending.entity, &pending.property, &pending.target, mapped_by, reason))
    };

    // the owning collection may be declared by a super entity of the target
    let mut owning = None;
    let mut current = collector.entity(&pending.target);
    if current.is_none() {
        return Resolution::deferred(
            &pending.entity,
            format!("entity '{}'", pending.target),
            "element entity is not bound yet",
        );
    }
    while let Some(pc) = current {
        if let Some(found) = collector.collection(&format!("{}.{}", pc.entity_name, mapped_by)) {
            owning = Some(found);
            break;
        }
        current = pc.superclass.as_deref().and_then(|name| collector.entity(name));
    }
    let Some(owning) = owning else {
        return fail("the element entity has no such collection");
    };
    if owning.mapped_by.is_some() {
        return fail("both sides declare mappedBy");
    }
    let CollectionElement::ManyToMany { columns: element_columns, .. } = &owning.element else {
        return fail("the owning property is not a many-to-many association");
    };
    let (Some(table), Some(owning_key)) = (owning.collection_table, owning.key.as_ref()) else {
        return Resolution::deferred(
            &pending.entity,
            format!("collection '{}'", owning.role),
            "the owning join table is not bound yet",
        );
    };
    let mut key = DependantValue::new(table);
    key.columns = element_columns.clone();
    key.nullable = false;
    let element_columns = owning_key.columns.clone();

    let Some(collection) = session.collector.collection_mut(&pending.role) else {
        return assertion(&pending.entity, "collection vanished");
    };
    collection.collection_table = Some(table);
    collection.key = Some(key);
    collection.element = CollectionElement::ManyToMany {
        entity: pending.target.clone(),
        columns: element_columns,
    };
    debug!(role = %pending.role, mapped_by, "Bound inverse many-to-many");
    Resolution::Resolved(())
}

fn bind_one_to_many_join_columns(session: &mut BootSession<'_>, pending: &PendingCollection) -> Resolution<()> {
    let ctx = session.context();
    let collector = &session.collector;
    let Some(owner) = collector.entity(&pending.entity) else {
        return assertion(&pending.entity, "collection queued before its entity was registered");
    };
    let Some(target) = collector.entity(&pending.target) else {
        return Resolution::deferred(
            &pending.entity,
            format!("entity '{}'", pending.target),
            "element entity is not bound yet",
        );
    };
    let target_table = target.table;
    let naming = entity_naming(owner);
    let path = AttributePath::parse(&pending.property);
    let linked = try_resolve!(link_join_columns(
        &ctx,
        collector,
        &pending.join_columns,
        &pending.entity,
        &LinkNaming::Owner {
            owner: &naming,
            attribute_path: Some(&path),
        },
    ));
    let column_names = linked.column_names();
    let foreign_key = foreign_key_for(
        &pending.join_columns,
        column_names.clone(),
        linked.referenced_table,
        &pending.entity,
        referenced_columns_of(&linked),
    );

    // mutation starts here
    for column in linked.columns {
        add_column(&mut session.collector, target_table, column);
    }
    if let Some(foreign_key) = foreign_key {
        session.collector.table_mut(target_table).add_foreign_key(foreign_key);
    }
    let mut key = DependantValue::new(target_table);
    key.columns = column_names;
    key.nullable = pending.join_columns.nullable();
    key.on_delete = pending.join_columns.on_delete;
    let Some(collection) = session.collector.collection_mut(&pending.role) else {
        return assertion(&pending.entity, "collection vanished");
    };
    collection.collection_table = Some(target_table);
    collection.key = Some(key);
    debug!(role = %pending.role, "Bound one-to-many join columns");
    Resolution::Resolved(())
}

fn bind_collection_table(
    session: &mut BootSession<'_>,
    pending: &PendingCollection,
    kind: CollectionKind,
) -> Resolution<()> {
    let ctx = session.context();
    let collector = &session.collector;
    let Some(owner) = collector.entity(&pending.entity) else {
        return assertion(&pending.entity, "collection queued before its entity was registered");
    };
    let Some(target) = collector.entity(&pending.target) else {
        return Resolution::deferred(
            &pending.entity,
            format!("entity '{}'", pending.target),
            "element entity is not bound yet",
        );
    };
    let spec = pending.join_table.clone().unwrap_or_default();
    let logical = match &spec.name {
        Some(name) => name.clone(),
        None => implicit_join_table_name(&ctx, collector, owner, target, &pending.property),
    };
    let naming = entity_naming(owner);
    let path = AttributePath::parse(&pending.property);
    let key = try_resolve!(link_join_columns(
        &ctx,
        collector,
        &pending.key_columns,
        &pending.entity,
        &LinkNaming::Owner {
            owner: &naming,
            attribute_path: None,
        },
    ));
    let element = try_resolve!(link_join_columns(
        &ctx,
        collector,
        &pending.element_columns,
        &pending.target,
        &LinkNaming::Owner {
            owner: &naming,
            attribute_path: Some(&path),
        },
    ));
    let key_names = key.column_names();
    let element_names = element.column_names();
    let owner_fk = foreign_key_for(
        &pending.key_columns,
        key_names.clone(),
        key.referenced_table,
        &pending.entity,
        referenced_columns_of(&key),
    );
    let element_fk = foreign_key_for(
        &pending.element_columns,
        element_names.clone(),
        element.referenced_table,
        &pending.target,
        referenced_columns_of(&element),
    );

    // mutation starts here
    let table = bind_table(&ctx, &mut session.collector, &spec, &logical);
    for mut column in key.columns.into_iter().chain(element.columns) {
        column.nullable = false;
        add_column(&mut session.collector, table, column);
    }
    let join_table = session.collector.table_mut(table);
    for foreign_key in [owner_fk, element_fk].into_iter().flatten() {
        join_table.add_foreign_key(foreign_key);
    }
    // each element belongs to at most one owner
    if pending.element_columns.many_to_many_owner_entity.is_none()
        && !join_table.unique_keys.iter().any(|uk| uk.columns == element_names)
    {
        join_table.unique_keys.push(UniqueKey {
            name: None,
            columns: element_names.clone(),
        });
    }
    if kind == CollectionKind::Set && join_table.primary_key.is_none() {
        join_table.primary_key = Some(PrimaryKey {
            name: None,
            columns: key_names.iter().chain(element_names.iter()).cloned().collect(),
        });
    }

    let mut collection_key = DependantValue::new(table);
    collection_key.columns = key_names;
    collection_key.nullable = false;
    collection_key.on_delete = pending.key_columns.on_delete;
    let Some(collection) = session.collector.collection_mut(&pending.role) else {
        return assertion(&pending.entity, "collection vanished");
    };
    collection.collection_table = Some(table);
    collection.key = Some(collection_key);
    if let CollectionElement::ManyToMany { columns, .. } = &mut collection.element {
        *columns = element_names;
    }
    debug!(role = %pending.role, table = %logical, "Bound collection table");
    Resolution::Resolved(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::AttributeOverrides;
    use crate::config::BinderConfig;
    use crate::second_pass::drain;
    use crate::type_binder::TypeBinderRegistry;
    use ormbind_model::{Column, PersistentClassKind, QualifiedTableName, Selectable, SimpleValue, TableId};
    use ormbind_naming::{IdentityPhysicalNaming, JpaCompliantNamingStrategy};
    use ormbind_source::{ClassDetails, MemberDetails, StaticAnnotationSource};

    fn source() -> StaticAnnotationSource {
        let entity = |name: &str| ClassDetails::new(name).with_annotation(AnnotationUsage::new(names::ENTITY));
        StaticAnnotationSource::new()
            .with_class(entity("Order"))
            .with_class(entity("OrderLine"))
            .with_class(entity("Tag"))
            .with_class(entity("Person"))
            .with_class(entity("Passport"))
            .with_class(ClassDetails::new("Money"))
    }

    fn add_entity(collector: &mut MetadataCollector, name: &str) -> TableId {
        let logical = Identifier::unquoted(name);
        let (table, _) = collector.add_table(QualifiedTableName::new(None, None, logical.clone()), logical);
        collector
            .table_mut(table)
            .add_column(Column::new(Identifier::unquoted("id")).with_type_name("long"));
        let mut pc = PersistentClass::new(name, name, PersistentClassKind::Root, table);
        let mut id = SimpleValue::new(table).with_type_name("long");
        id.selectables.push(Selectable::Column(Identifier::unquoted("id")));
        pc.identifier = Some(Value::Basic(id));
        collector.add_entity_binding(pc).unwrap();
        table
    }

    /// Bind `member` as a property of `entity` and attach it
    fn bind_member(session: &mut BootSession<'_>, entity: &str, member: &MemberDetails) -> BindResult<()> {
        let ctx = session.context();
        let owner = session.collector.entity(entity).unwrap().clone();
        let overrides = AttributeOverrides::new();
        let site = PropertySite {
            member,
            declaring_class: entity,
            path: AttributePath::parse(&member.name),
            overrides: &overrides,
            key: false,
        };
        let property = crate::property::bind_property(&ctx, &mut session.collector, &owner, &site)?;
        session.collector.entity_mut(entity).unwrap().properties.push(property);
        Ok(())
    }

    fn many_to_one(name: &str, target: &str) -> MemberDetails {
        MemberDetails::field(name, target).with_annotation(AnnotationUsage::new(names::MANY_TO_ONE))
    }

    #[test]
    fn test_one_to_many_mapped_by_copies_owning_column() {
        let source = source();
        let config = BinderConfig::default();
        let binders = TypeBinderRegistry::new();
        let ctx = BindingContext::new(&source, &JpaCompliantNamingStrategy, &IdentityPhysicalNaming, &config, &binders);
        let mut session = BootSession::new(ctx);
        add_entity(&mut session.collector, "Order");
        let line_table = add_entity(&mut session.collector, "OrderLine");

        let lines = MemberDetails::field("lines", "java.util.List<OrderLine>")
            .with_annotation(AnnotationUsage::new(names::ONE_TO_MANY).with("mappedBy", "order"));
        bind_member(&mut session, "Order", &lines).unwrap();
        let order = many_to_one("order", "Order")
            .with_annotation(AnnotationUsage::new(names::JOIN_COLUMN).with("name", "ORDER_ID"));
        bind_member(&mut session, "OrderLine", &order).unwrap();

        drain(&mut session).unwrap();
        let collection = session.collector.collection("Order.lines").unwrap();
        assert!(collection.inverse);
        assert_eq!(collection.collection_table, Some(line_table));
        assert_eq!(
            collection.key.as_ref().unwrap().columns,
            vec![Identifier::unquoted("ORDER_ID")]
        );
    }

    #[test]
    fn test_unidirectional_one_to_many_uses_join_table() {
        let source = source();
        let config = BinderConfig::default();
        let binders = TypeBinderRegistry::new();
        let ctx = BindingContext::new(&source, &JpaCompliantNamingStrategy, &IdentityPhysicalNaming, &config, &binders);
        let mut session = BootSession::new(ctx);
        add_entity(&mut session.collector, "Order");
        add_entity(&mut session.collector, "OrderLine");

        let lines = MemberDetails::field("lines", "java.util.Set<OrderLine>")
            .with_annotation(AnnotationUsage::new(names::ONE_TO_MANY));
        bind_member(&mut session, "Order", &lines).unwrap();
        drain(&mut session).unwrap();

        let collection = session.collector.collection("Order.lines").unwrap();
        let table = session.collector.table(collection.collection_table.unwrap());
        assert_eq!(table.name.table.text(), "Order_OrderLine");
        assert!(table.has_column(&Identifier::unquoted("Order_id")));
        assert!(table.has_column(&Identifier::unquoted("lines_id")));
        assert_eq!(table.foreign_keys.len(), 2);
        assert_eq!(table.unique_keys[0].columns, vec![Identifier::unquoted("lines_id")]);
        // a set is keyed by owner and element
        assert_eq!(table.primary_key.as_ref().unwrap().columns.len(), 2);
    }

    #[test]
    fn test_one_to_many_join_column_lands_in_element_table() {
        let source = source();
        let config = BinderConfig::default();
        let binders = TypeBinderRegistry::new();
        let ctx = BindingContext::new(&source, &JpaCompliantNamingStrategy, &IdentityPhysicalNaming, &config, &binders);
        let mut session = BootSession::new(ctx);
        add_entity(&mut session.collector, "Order");
        let line_table = add_entity(&mut session.collector, "OrderLine");

        let lines = MemberDetails::field("lines", "java.util.List<OrderLine>")
            .with_annotation(AnnotationUsage::new(names::ONE_TO_MANY))
            .with_annotation(AnnotationUsage::new(names::JOIN_COLUMN).with("name", "order_fk"));
        bind_member(&mut session, "Order", &lines).unwrap();
        drain(&mut session).unwrap();

        let collection = session.collector.collection("Order.lines").unwrap();
        assert_eq!(collection.collection_table, Some(line_table));
        let table = session.collector.table(line_table);
        assert!(table.has_column(&Identifier::unquoted("order_fk")));
        assert_eq!(table.foreign_keys[0].referenced_entity.as_deref(), Some("Order"));
    }

    #[test]
    fn test_inverse_many_to_many_swaps_sides() {
        let source = source();
        let config = BinderConfig::default();
        let binders = TypeBinderRegistry::new();
        let ctx = BindingContext::new(&source, &JpaCompliantNamingStrategy, &IdentityPhysicalNaming, &config, &binders);
        let mut session = BootSession::new(ctx);
        add_entity(&mut session.collector, "Order");
        add_entity(&mut session.collector, "Tag");

        // the inverse side is queued first and waits for the owner
        let orders = MemberDetails::field("orders", "java.util.Set<Order>")
            .with_annotation(AnnotationUsage::new(names::MANY_TO_MANY).with("mappedBy", "tags"));
        bind_member(&mut session, "Tag", &orders).unwrap();
        let tags = MemberDetails::field("tags", "java.util.Set<Tag>")
            .with_annotation(AnnotationUsage::new(names::MANY_TO_MANY))
            .with_annotation(AnnotationUsage::new(names::JOIN_TABLE).with("name", "order_tags"));
        bind_member(&mut session, "Order", &tags).unwrap();
        drain(&mut session).unwrap();

        let owning = session.collector.collection("Order.tags").unwrap();
        let inverse = session.collector.collection("Tag.orders").unwrap();
        assert_eq!(owning.collection_table, inverse.collection_table);
        let CollectionElement::ManyToMany { columns, .. } = &inverse.element else {
            panic!("Expected many-to-many element, got {:?}", inverse.element);
        };
        assert_eq!(columns, &owning.key.as_ref().unwrap().columns);
        assert_eq!(
            inverse.key.as_ref().unwrap().columns,
            vec![Identifier::unquoted("tags_id")]
        );
    }

    #[test]
    fn test_mapped_by_with_join_column_is_rejected() {
        let source = source();
        let config = BinderConfig::default();
        let binders = TypeBinderRegistry::new();
        let ctx = BindingContext::new(&source, &JpaCompliantNamingStrategy, &IdentityPhysicalNaming, &config, &binders);
        let mut session = BootSession::new(ctx);
        add_entity(&mut session.collector, "Order");
        add_entity(&mut session.collector, "OrderLine");

        let lines = MemberDetails::field("lines", "java.util.List<OrderLine>")
            .with_annotation(AnnotationUsage::new(names::ONE_TO_MANY).with("mappedBy", "order"))
            .with_annotation(AnnotationUsage::new(names::JOIN_COLUMN).with("name", "ORDER_ID"));
        let result = bind_member(&mut session, "Order", &lines);
        match result {
            Err(MappingError::PropertyMisuse { annotation, .. }) => assert_eq!(annotation, names::JOIN_COLUMN),
            _ => panic!("Expected PropertyMisuse error, got {:?}", result),
        }
    }

    #[test]
    fn test_pending_collection_records_association_sides() {
        let source = source();
        let config = BinderConfig::default();
        let binders = TypeBinderRegistry::new();
        let ctx = BindingContext::new(&source, &JpaCompliantNamingStrategy, &IdentityPhysicalNaming, &config, &binders);
        let mut session = BootSession::new(ctx);
        add_entity(&mut session.collector, "Order");
        add_entity(&mut session.collector, "OrderLine");
        add_entity(&mut session.collector, "Tag");

        let lines = MemberDetails::field("lines", "java.util.List<OrderLine>")
            .with_annotation(AnnotationUsage::new(names::ONE_TO_MANY).with("mappedBy", "order"));
        let tags = MemberDetails::field("tags", "java.util.Set<Tag>")
            .with_annotation(AnnotationUsage::new(names::MANY_TO_MANY));
        bind_member(&mut session, "Order", &lines).unwrap();
        bind_member(&mut session, "Order", &tags).unwrap();

        let pending: Vec<&PendingCollection> = session
            .collector
            .second_passes()
            .iter()
            .filter_map(|pass| match pass {
                SecondPass::Association(pending) => Some(pending),
                _ => None,
            })
            .collect();
        assert_eq!(pending.len(), 2);

        let lines = pending.iter().find(|p| p.property == "lines").unwrap();
        assert!(lines.join_columns.has_mapped_by());
        assert_eq!(lines.join_columns.mapped_by.as_deref(), Some("order"));
        assert!(lines.element_columns.many_to_many_owner_entity.is_none());

        let tags = pending.iter().find(|p| p.property == "tags").unwrap();
        assert!(!tags.join_columns.has_mapped_by());
        assert_eq!(tags.key_columns.many_to_many_owner_entity.as_deref(), Some("Order"));
        assert_eq!(tags.element_columns.many_to_many_owner_entity.as_deref(), Some("Order"));
    }

    #[test]
    fn test_to_one_target_must_be_an_entity() {
        let source = source();
        let config = BinderConfig::default();
        let binders = TypeBinderRegistry::new();
        let ctx = BindingContext::new(&source, &JpaCompliantNamingStrategy, &IdentityPhysicalNaming, &config, &binders);
        let mut session = BootSession::new(ctx);
        add_entity(&mut session.collector, "Order");

        let result = bind_member(&mut session, "Order", &many_to_one("price", "Money"));
        match result {
            Err(MappingError::UnknownReferencedEntity { target, .. }) => assert_eq!(target, "Money"),
            _ => panic!("Expected UnknownReferencedEntity error, got {:?}", result),
        }
        let result = bind_member(&mut session, "Order", &many_to_one("buyer", "Customer"));
        match result {
            Err(MappingError::UnknownClass { class, .. }) => assert_eq!(class, "Customer"),
            _ => panic!("Expected UnknownClass error, got {:?}", result),
        }
    }

    #[test]
    fn test_to_one_join_table_is_created_by_second_pass() {
        let source = source();
        let config = BinderConfig::default();
        let binders = TypeBinderRegistry::new();
        let ctx = BindingContext::new(&source, &JpaCompliantNamingStrategy, &IdentityPhysicalNaming, &config, &binders);
        let mut session = BootSession::new(ctx);
        add_entity(&mut session.collector, "OrderLine");
        add_entity(&mut session.collector, "Order");

        let order = many_to_one("order", "Order").with_annotation(AnnotationUsage::new(names::JOIN_TABLE));
        bind_member(&mut session, "OrderLine", &order).unwrap();
        drain(&mut session).unwrap();

        let line = session.collector.entity("OrderLine").unwrap();
        assert_eq!(line.joins.len(), 1);
        assert_eq!(line.property("order").unwrap().join, Some(0));
        let join_table = session.collector.table(line.joins[0].table);
        assert_eq!(join_table.name.table.text(), "OrderLine_Order");
        assert!(join_table.has_column(&Identifier::unquoted("order_id")));
        assert!(line.joins[0].key.is_some());
    }

    #[test]
    fn test_inverse_one_to_one_is_verified() {
        let source = source();
        let config = BinderConfig::default();
        let binders = TypeBinderRegistry::new();
        let ctx = BindingContext::new(&source, &JpaCompliantNamingStrategy, &IdentityPhysicalNaming, &config, &binders);
        let mut session = BootSession::new(ctx);
        add_entity(&mut session.collector, "Person");
        add_entity(&mut session.collector, "Passport");

        let passport = MemberDetails::field("passport", "Passport")
            .with_annotation(AnnotationUsage::new(names::ONE_TO_ONE).with("mappedBy", "holder"));
        bind_member(&mut session, "Person", &passport).unwrap();
        let holder = MemberDetails::field("holder", "Person")
            .with_annotation(AnnotationUsage::new(names::ONE_TO_ONE));
        bind_member(&mut session, "Passport", &holder).unwrap();
        drain(&mut session).unwrap();

        let person = session.collector.entity("Person").unwrap();
        let to_one = person.property("passport").unwrap().value.as_to_one().unwrap();
        assert_eq!(to_one.referenced_property.as_deref(), Some("holder"));
        assert!(to_one.selectables.is_empty());

        let owner = session.collector.entity("Passport").unwrap();
        let column = session
            .collector
            .table(owner.table)
            .column(&Identifier::unquoted("holder_id"))
            .unwrap();
        assert!(column.unique);
    }

    #[test]
    fn test_inverse_one_to_one_with_wrong_mapped_by() {
        let source = source();
        let config = BinderConfig::default();
        let binders = TypeBinderRegistry::new();
        let ctx = BindingContext::new(&source, &JpaCompliantNamingStrategy, &IdentityPhysicalNaming, &config, &binders);
        let mut session = BootSession::new(ctx);
        add_entity(&mut session.collector, "Person");
        add_entity(&mut session.collector, "Passport");

        let passport = MemberDetails::field("passport", "Passport")
            .with_annotation(AnnotationUsage::new(names::ONE_TO_ONE).with("mappedBy", "owner"));
        bind_member(&mut session, "Person", &passport).unwrap();
        let result = drain(&mut session);
        match result {
            Err(MappingError::MappedByResolution { mapped_by, .. }) => assert_eq!(mapped_by, "owner"),
            _ => panic!("Expected MappedByResolution error, got {:?}", result),
        }
    }
}
