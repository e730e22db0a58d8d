// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Tables and Joins
//!
//! Resolves `@Table`, `@SecondaryTable` and `@JoinTable` declarations into
//! [`Table`](ormbind_model::Table)s of the collector, and binds the row
//! ownership of secondary tables.
//!
//! ## Secondary tables
//!
//! A secondary table is created during the first pass, together with its
//! [`Join`]. Its options and its key are completed by two second passes that
//! run in a fixed order:
//!
//! 1. `SecondaryTableFromAnnotation` applies `@SecondaryRow` and
//!    `@TableOptions` (inverse, optional, fetch)
//! 2. `SecondaryTable` links the `pkJoinColumns` to the entity's key and
//!    creates the key columns, primary key and foreign key
//!
//! Primary keys are created by the `CreateKey` pass, between the two.

use ormbind_model::{
    CheckConstraint, ForeignKey, Identifier, Index, Join, JoinOrigin, PersistentClass,
    PersistentClassKind, PrimaryKey, QualifiedTableName, TableId, UniqueKey,
};
use ormbind_source::{names, Annotated, AnnotationUsage, ClassDetails};
use tracing::debug;

use crate::collector::MetadataCollector;
use crate::column::{add_column, find_join};
use crate::context::BindingContext;
use crate::error::{BindResult, MappingError, Resolution};
use crate::join_column::{link_join_columns, AnnotatedJoinColumns, LinkNaming};
use crate::session::BootSession;
use crate::{try_bind, try_resolve};

/// `@UniqueConstraint` as declared
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueConstraintSpec {
    pub name: Option<String>,
    /// Logical column names
    pub columns: Vec<String>,
}

/// Naming and constraints of a table declaration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSpec {
    pub name: Option<Identifier>,
    pub schema: Option<Identifier>,
    pub catalog: Option<Identifier>,
    pub unique_constraints: Vec<UniqueConstraintSpec>,
    pub indexes: Vec<Index>,
}

impl TableSpec {
    /// Read `@Table`, `@SecondaryTable` or `@JoinTable`
    pub fn from_annotation(ctx: &BindingContext<'_>, table: Option<&AnnotationUsage>) -> Self {
        let Some(table) = table else {
            return Self::default();
        };
        Self {
            name: table.string("name").and_then(|name| ctx.identifier(name)),
            schema: table.string("schema").and_then(|name| ctx.identifier(name)),
            catalog: table.string("catalog").and_then(|name| ctx.identifier(name)),
            unique_constraints: table
                .nested_list("uniqueConstraints")
                .into_iter()
                .map(|uc| UniqueConstraintSpec {
                    name: uc.string("name").map(str::to_string),
                    columns: uc.string_list("columnNames").into_iter().map(str::to_string).collect(),
                })
                .collect(),
            indexes: table.nested_list("indexes").into_iter().map(index_from_annotation).collect(),
        }
    }

    pub fn with_name(mut self, name: Identifier) -> Self {
        self.name = Some(name);
        self
    }
}

/// `@Index(name, columnList, unique)`
pub fn index_from_annotation(index: &AnnotationUsage) -> Index {
    Index {
        name: index.string("name").map(str::to_string),
        columns: index
            .string_or_empty("columnList")
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect(),
        unique: index.bool_or("unique", false),
    }
}

/// Qualified physical name for a logical table name
///
/// Schema and catalog fall back to the configured defaults.
pub fn qualified_name(ctx: &BindingContext<'_>, spec: &TableSpec, logical: &Identifier) -> QualifiedTableName {
    let schema = spec
        .schema
        .clone()
        .or_else(|| ctx.config.default_schema.as_deref().and_then(|s| ctx.identifier(s)))
        .map(|s| ctx.physical_schema_name(&s));
    let catalog = spec
        .catalog
        .clone()
        .or_else(|| ctx.config.default_catalog.as_deref().and_then(|c| ctx.identifier(c)))
        .map(|c| ctx.physical_catalog_name(&c));
    QualifiedTableName::new(catalog, schema, ctx.physical_table_name(logical))
}

/// Create or reuse the table named `logical`
///
/// Unique constraints and indexes of `spec` are added to the table; their
/// column names go through physical naming.
pub fn bind_table(
    ctx: &BindingContext<'_>,
    collector: &mut MetadataCollector,
    spec: &TableSpec,
    logical: &Identifier,
) -> TableId {
    let name = qualified_name(ctx, spec, logical);
    let (id, created) = collector.add_table(name, logical.clone());
    let table = collector.table_mut(id);
    for constraint in &spec.unique_constraints {
        let columns: Vec<Identifier> = constraint
            .columns
            .iter()
            .filter_map(|c| ctx.identifier(c))
            .map(|c| ctx.physical_column_name(&c))
            .collect();
        if !table.unique_keys.iter().any(|uk| uk.columns == columns) {
            table.unique_keys.push(UniqueKey {
                name: constraint.name.clone(),
                columns,
            });
        }
    }
    for index in &spec.indexes {
        if !table.indexes.contains(index) {
            table.indexes.push(index.clone());
        }
    }
    debug!(table = %table.name, created, "Bound table");
    id
}

/// Add `@Check` constraints of an annotated element to a table
pub fn bind_checks(collector: &mut MetadataCollector, table: TableId, annotated: &impl Annotated) {
    for check in annotated.annotations().iter().filter(|a| a.name == names::CHECK) {
        let Some(constraint) = check.string("constraints") else {
            continue;
        };
        collector.table_mut(table).checks.push(CheckConstraint {
            name: check.string("name").map(str::to_string),
            constraint: constraint.to_string(),
        });
    }
}

/// Create the tables and joins of `@SecondaryTable(s)`
pub fn bind_secondary_tables(
    ctx: &BindingContext<'_>,
    collector: &mut MetadataCollector,
    entity: &mut PersistentClass,
    class: &ClassDetails,
) -> BindResult<()> {
    for secondary in class.repeated_annotations(names::SECONDARY_TABLE, names::SECONDARY_TABLES) {
        let spec = TableSpec::from_annotation(ctx, Some(secondary));
        let Some(logical) = spec.name.clone() else {
            return Err(MappingError::AnnotationMisuse {
                class: class.name.clone(),
                annotation: names::SECONDARY_TABLE.to_string(),
                reason: "a secondary table needs a name".to_string(),
            });
        };
        let table = bind_table(ctx, collector, &spec, &logical);
        let mut join = Join::new(table, JoinOrigin::SecondaryTable);
        if let Some(fk) = secondary.nested("foreignKey") {
            join.foreign_key_name = fk.string("name").map(str::to_string);
            join.foreign_key_constraint = fk.enum_value("value", "CONSTRAINT") != "NO_CONSTRAINT";
        }
        entity.joins.push(join);
        if let Some(xref) = collector.entity_table_xref_mut(&entity.entity_name) {
            xref.add_secondary_table(&logical, table);
        }
        debug!(entity = %entity.entity_name, table = %logical, "Bound secondary table");
    }
    Ok(())
}

/// Whether `name` is the primary table of `entity`
fn is_primary_table(collector: &MetadataCollector, entity: &PersistentClass, name: &Identifier) -> bool {
    let table = collector.table(entity.table);
    table.logical_name.matches(name) || table.name.table.matches(name)
}

/// Apply `@TableOptions` comment, check constraint and indexes
///
/// Runs during the first pass: the named table must already be the
/// entity's primary table or one of its secondary tables.
pub fn apply_complementary_tables(
    ctx: &BindingContext<'_>,
    collector: &mut MetadataCollector,
    entity: &PersistentClass,
    class: &ClassDetails,
) -> BindResult<()> {
    for options in class.repeated_annotations(names::TABLE_OPTIONS, names::TABLE_OPTIONS_LIST) {
        let applies_to = options.string_or_empty("appliesTo");
        let Some(name) = ctx.identifier(applies_to) else {
            return Err(MappingError::AnnotationMisuse {
                class: class.name.clone(),
                annotation: names::TABLE_OPTIONS.to_string(),
                reason: "appliesTo is required".to_string(),
            });
        };
        let table = if is_primary_table(collector, entity, &name) {
            entity.table
        } else {
            match find_join(collector, entity, &name) {
                Some(index) => entity.joins[index].table,
                None => {
                    return Err(MappingError::UnknownComplementaryTable {
                        entity: entity.entity_name.clone(),
                        annotation: names::TABLE_OPTIONS.to_string(),
                        table: applies_to.to_string(),
                    });
                }
            }
        };
        let target = collector.table_mut(table);
        if let Some(comment) = options.string("comment") {
            target.comment = Some(comment.to_string());
        }
        if let Some(check) = options.string("checkConstraint") {
            target.checks.push(CheckConstraint {
                name: None,
                constraint: check.to_string(),
            });
        }
        for index in options.nested_list("indexes") {
            target.indexes.push(index_from_annotation(index));
        }
        debug!(entity = %entity.entity_name, table = applies_to, "Applied complementary table options");
    }
    Ok(())
}

fn assertion<T>(entity: &str, message: impl Into<String>) -> Resolution<T> {
    Resolution::Fatal(MappingError::AssertionFailure {
        class: entity.to_string(),
        message: message.into(),
    })
}

/// Ownership options of one join
#[derive(Debug, Default)]
struct JoinOptions {
    inverse: Option<bool>,
    optional: Option<bool>,
    sequential_select: Option<bool>,
}

/// Apply `@SecondaryRow` and `@TableOptions` to the entity's secondary tables
pub fn apply_secondary_table_options(session: &mut BootSession<'_>, entity: &str) -> Resolution<()> {
    let ctx = session.context();
    let collector = &session.collector;
    let Some(pc) = collector.entity(entity) else {
        return assertion(entity, "secondary table options queued before the entity was registered");
    };
    let class = try_bind!(ctx.class(&pc.class_name, entity));

    let secondary_joins: Vec<usize> = pc
        .joins
        .iter()
        .enumerate()
        .filter(|(_, join)| join.origin == JoinOrigin::SecondaryTable)
        .map(|(index, _)| index)
        .collect();
    let mut plan: Vec<(usize, JoinOptions)> = Vec::new();

    for row in class.repeated_annotations(names::SECONDARY_ROW, names::SECONDARY_ROWS) {
        let index = match row.string("table").and_then(|t| ctx.identifier(t)) {
            Some(name) => match find_join(collector, pc, &name) {
                Some(index) => index,
                None => {
                    return Resolution::Fatal(MappingError::UnknownSecondaryTable {
                        entity: entity.to_string(),
                        table: name.to_string(),
                    });
                }
            },
            None => match secondary_joins.as_slice() {
                [only] => *only,
                _ => {
                    return Resolution::Fatal(MappingError::AnnotationMisuse {
                        class: pc.class_name.clone(),
                        annotation: names::SECONDARY_ROW.to_string(),
                        reason: "table is required when the entity has several secondary tables"
                            .to_string(),
                    });
                }
            },
        };
        plan.push((
            index,
            JoinOptions {
                inverse: Some(!row.bool_or("owned", true)),
                optional: Some(row.bool_or("optional", true)),
                sequential_select: None,
            },
        ));
    }

    for options in class.repeated_annotations(names::TABLE_OPTIONS, names::TABLE_OPTIONS_LIST) {
        let Some(name) = ctx.identifier(options.string_or_empty("appliesTo")) else {
            continue;
        };
        if is_primary_table(collector, pc, &name) {
            continue;
        }
        let Some(index) = find_join(collector, pc, &name) else {
            return Resolution::Fatal(MappingError::UnknownSecondaryTable {
                entity: entity.to_string(),
                table: name.to_string(),
            });
        };
        plan.push((
            index,
            JoinOptions {
                inverse: options.has_attribute("inverse").then(|| options.bool_or("inverse", false)),
                optional: options.has_attribute("optional").then(|| options.bool_or("optional", true)),
                sequential_select: Some(options.enum_value("fetch", "JOIN") == "SELECT"),
            },
        ));
    }

    let Some(pc) = session.collector.entity_mut(entity) else {
        return assertion(entity, "entity vanished while applying secondary table options");
    };
    for (index, options) in plan {
        let join = &mut pc.joins[index];
        if let Some(inverse) = options.inverse {
            join.inverse = inverse;
        }
        if let Some(optional) = options.optional {
            join.optional = optional;
        }
        if let Some(sequential) = options.sequential_select {
            join.sequential_select = sequential;
        }
    }
    Resolution::Resolved(())
}

/// Create the primary key of the entity's own table
///
/// No-op for single table subclasses and for tables that already have one.
pub fn create_primary_key(session: &mut BootSession<'_>, entity: &str) -> Resolution<()> {
    let collector = &session.collector;
    let Some(pc) = collector.entity(entity) else {
        return assertion(entity, "primary key queued before the entity was registered");
    };
    let table = pc.table;
    if collector.table(table).primary_key.is_some() {
        return Resolution::Resolved(());
    }
    let columns = match &pc.kind {
        PersistentClassKind::SingleTableSubclass => return Resolution::Resolved(()),
        PersistentClassKind::JoinedSubclass { key } => match key {
            Some(key) if !key.columns.is_empty() => key.columns.clone(),
            _ => {
                return Resolution::deferred(
                    entity,
                    format!("key of joined subclass '{}'", entity),
                    "key columns are not bound yet",
                );
            }
        },
        PersistentClassKind::Root | PersistentClassKind::UnionSubclass => {
            let Some(root) = collector.root_entity(entity) else {
                return assertion(entity, "hierarchy root is not registered");
            };
            let columns = root
                .identifier
                .as_ref()
                .map(|id| id.column_names())
                .unwrap_or_default();
            if columns.is_empty() {
                return Resolution::deferred(
                    entity,
                    format!("identifier of '{}'", root.entity_name),
                    "identifier columns are not bound yet",
                );
            }
            columns
        }
    };

    let table = session.collector.table_mut(table);
    for name in &columns {
        if let Some(column) = table.column_mut(name) {
            column.nullable = false;
        }
    }
    debug!(entity, table = %table.name, columns = columns.len(), "Created primary key");
    table.primary_key = Some(PrimaryKey { name: None, columns });
    Resolution::Resolved(())
}

/// Link the `pkJoinColumns` of every `@SecondaryTable` to the entity key
pub fn bind_secondary_table_keys(session: &mut BootSession<'_>, entity: &str) -> Resolution<()> {
    let ctx = session.context();
    let collector = &session.collector;
    let Some(pc) = collector.entity(entity) else {
        return assertion(entity, "secondary table keys queued before the entity was registered");
    };
    let class = try_bind!(ctx.class(&pc.class_name, entity));

    let mut plan = Vec::new();
    for secondary in class.repeated_annotations(names::SECONDARY_TABLE, names::SECONDARY_TABLES) {
        let Some(name) = secondary.string("name").and_then(|n| ctx.identifier(n)) else {
            continue;
        };
        let Some(index) = find_join(collector, pc, &name) else {
            return Resolution::Fatal(MappingError::UnknownSecondaryTable {
                entity: entity.to_string(),
                table: name.to_string(),
            });
        };
        if pc.joins[index].key.is_some() {
            continue;
        }
        let join_columns = AnnotatedJoinColumns::for_primary_key_join(
            &ctx,
            entity,
            &secondary.nested_list("pkJoinColumns"),
            secondary.nested("foreignKey"),
        );
        let linked = try_resolve!(link_join_columns(
            &ctx,
            collector,
            &join_columns,
            entity,
            &LinkNaming::IntraHierarchy,
        ));
        plan.push((index, pc.joins[index].table, join_columns, linked));
    }

    for (index, join_table, join_columns, linked) in plan {
        let names = linked.column_names();
        for mut column in linked.columns {
            column.nullable = false;
            add_column(&mut session.collector, join_table, column);
        }
        let table = session.collector.table_mut(join_table);
        if table.primary_key.is_none() {
            table.primary_key = Some(PrimaryKey {
                name: None,
                columns: names.clone(),
            });
        }
        if join_columns.foreign_key.constraint {
            table.add_foreign_key(ForeignKey {
                name: join_columns.foreign_key.name.clone(),
                columns: names.clone(),
                referenced_table: linked.referenced_table,
                referenced_entity: Some(entity.to_string()),
                referenced_columns: Vec::new(),
                on_delete: join_columns.on_delete,
                constraint: true,
            });
        }
        if let Some(pc) = session.collector.entity_mut(entity) {
            let join = &mut pc.joins[index];
            let mut key = ormbind_model::DependantValue::new(join_table);
            key.columns = names;
            key.nullable = false;
            join.key = Some(key);
            join.foreign_key_name = join_columns.foreign_key.name.clone();
            join.foreign_key_constraint = join_columns.foreign_key.constraint;
        }
        debug!(entity, join = index, "Bound secondary table key");
    }
    Resolution::Resolved(())
}
