// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Join Column Resolution
//!
//! Join columns link a table to the key of another table: to-one foreign
//! keys, collection keys, join tables, joined subclass keys and secondary
//! table keys. The explicit annotations are read into
//! [`AnnotatedJoinColumns`] during the first pass; linking them to the
//! referenced key happens in a second pass, because the referenced entity
//! may not be bound yet.
//!
//! ## Implicit names
//!
//! A join column without a name gets one from the implicit naming strategy,
//! depending on which side declares it:
//!
//! | Side | Name |
//! |------|------|
//! | Mapped-by | the single column of the owning property |
//! | Owner | `<attribute>_<referenced column>` (or entity name prefix) |
//! | Intra-hierarchy | the referenced primary key column |
//!
//! A generated name is quoted when the referenced column or the referenced
//! table was quoted.

use ormbind_model::{Column, Identifier, OnDeleteAction, Selectable, TableId};
use ormbind_naming::{
    AttributePath, EntityNaming, ImplicitJoinColumnNameSource, ImplicitPrimaryKeyJoinColumnNameSource,
    JoinColumnNature,
};
use ormbind_source::{names, Annotated, AnnotationUsage, MemberDetails};
use tracing::debug;

use crate::collector::{KeyColumns, MetadataCollector};
use crate::context::BindingContext;
use crate::error::{BindResult, MappingError, Resolution};
use crate::{try_bind, try_resolve};

/// `@ForeignKey` of a join
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeySpec {
    pub name: Option<String>,
    /// `false` for `ConstraintMode.NO_CONSTRAINT`
    pub constraint: bool,
}

impl Default for ForeignKeySpec {
    fn default() -> Self {
        Self {
            name: None,
            constraint: true,
        }
    }
}

impl ForeignKeySpec {
    pub fn from_annotation(foreign_key: Option<&AnnotationUsage>) -> Self {
        match foreign_key {
            Some(fk) => Self {
                name: fk.string("name").map(str::to_string),
                constraint: fk.enum_value("value", "CONSTRAINT") != "NO_CONSTRAINT",
            },
            None => Self::default(),
        }
    }
}

/// One join column or join formula as declared
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedJoinColumn {
    pub explicit_name: Option<Identifier>,
    pub referenced_column: Option<Identifier>,
    pub formula: Option<String>,
    pub nullable: bool,
    pub unique: bool,
    pub insertable: bool,
    pub updatable: bool,
    pub column_definition: Option<String>,
    pub secondary_table: Option<Identifier>,
}

impl AnnotatedJoinColumn {
    /// Read `@JoinColumn` or `@PrimaryKeyJoinColumn`
    pub fn from_annotation(ctx: &BindingContext<'_>, column: &AnnotationUsage) -> Self {
        Self {
            explicit_name: column.string("name").and_then(|name| ctx.identifier(name)),
            referenced_column: column
                .string("referencedColumnName")
                .and_then(|name| ctx.identifier(name)),
            formula: None,
            nullable: column.bool_or("nullable", true),
            unique: column.bool_or("unique", false),
            insertable: column.bool_or("insertable", true),
            updatable: column.bool_or("updatable", true),
            column_definition: column.string("columnDefinition").map(str::to_string),
            secondary_table: column.string("table").and_then(|name| ctx.identifier(name)),
        }
    }

    /// Read `@JoinFormula`
    pub fn from_formula(ctx: &BindingContext<'_>, formula: &AnnotationUsage) -> Self {
        Self {
            explicit_name: None,
            referenced_column: formula
                .string("referencedColumnName")
                .and_then(|name| ctx.identifier(name)),
            formula: formula.string("value").map(str::to_string),
            nullable: true,
            unique: false,
            insertable: false,
            updatable: false,
            column_definition: None,
            secondary_table: None,
        }
    }

    pub fn is_formula(&self) -> bool {
        self.formula.is_some()
    }
}

/// Join columns of one association, key or join table side
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedJoinColumns {
    /// Declared columns; empty when every column is implicit
    pub columns: Vec<AnnotatedJoinColumn>,
    /// Attribute path of the referencing property
    pub property_name: Option<String>,
    pub owner_entity: String,
    /// Set on the non-owning side of a bidirectional association
    pub mapped_by: Option<String>,
    /// `@MapsId` value; `Some("")` maps the whole identifier
    pub maps_id: Option<String>,
    /// Owner of a many-to-many association whose join table these columns
    /// belong to
    pub many_to_many_owner_entity: Option<String>,
    pub nature: JoinColumnNature,
    pub foreign_key: ForeignKeySpec,
    pub on_delete: OnDeleteAction,
}

impl AnnotatedJoinColumns {
    pub fn new(owner_entity: impl Into<String>, nature: JoinColumnNature) -> Self {
        Self {
            columns: Vec::new(),
            property_name: None,
            owner_entity: owner_entity.into(),
            mapped_by: None,
            maps_id: None,
            many_to_many_owner_entity: None,
            nature,
            foreign_key: ForeignKeySpec::default(),
            on_delete: OnDeleteAction::NoAction,
        }
    }

    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.property_name = Some(property.into());
        self
    }

    /// Read the join columns of an association member
    ///
    /// Supports `@JoinColumn(s)`, `@JoinColumnOrFormula(s)`, `@JoinFormula`,
    /// `@ForeignKey` (nested in the join column annotations), `@OnDelete` and
    /// `@MapsId`.
    pub fn for_association(
        ctx: &BindingContext<'_>,
        owner_entity: &str,
        member: &MemberDetails,
        path: &AttributePath,
        nature: JoinColumnNature,
    ) -> BindResult<Self> {
        let mut join_columns = Self::new(owner_entity, nature).with_property(path.full_path());
        let mut foreign_key = None;

        for column in member.repeated_annotations(names::JOIN_COLUMN, names::JOIN_COLUMNS) {
            join_columns
                .columns
                .push(AnnotatedJoinColumn::from_annotation(ctx, column));
            foreign_key = foreign_key.or(column.nested("foreignKey"));
        }
        if let Some(container) = member.annotation(names::JOIN_COLUMNS) {
            foreign_key = container.nested("foreignKey").or(foreign_key);
        }
        for usage in member.repeated_annotations(names::JOIN_COLUMN_OR_FORMULA, names::JOIN_COLUMNS_OR_FORMULAS) {
            if let Some(column) = usage.nested("column").filter(|c| c.has_attribute("name")) {
                join_columns
                    .columns
                    .push(AnnotatedJoinColumn::from_annotation(ctx, column));
            } else if let Some(formula) = usage.nested("formula") {
                join_columns
                    .columns
                    .push(AnnotatedJoinColumn::from_formula(ctx, formula));
            }
        }
        if let Some(formula) = member.annotation(names::JOIN_FORMULA) {
            join_columns
                .columns
                .push(AnnotatedJoinColumn::from_formula(ctx, formula));
        }

        join_columns.foreign_key = ForeignKeySpec::from_annotation(foreign_key);
        join_columns.on_delete = on_delete_action(member, owner_entity)?;
        join_columns.maps_id = member
            .annotation(names::MAPS_ID)
            .map(|m| m.string_or_empty("value").to_string());
        join_columns.mapped_by = [names::ONE_TO_ONE, names::ONE_TO_MANY, names::MANY_TO_MANY]
            .into_iter()
            .filter_map(|name| member.annotation(name))
            .find_map(|usage| usage.string("mappedBy"))
            .map(str::to_string);
        Ok(join_columns)
    }

    /// Read `@PrimaryKeyJoinColumn` annotations of a joined subclass or a
    /// secondary table
    pub fn for_primary_key_join(
        ctx: &BindingContext<'_>,
        owner_entity: &str,
        columns: &[&AnnotationUsage],
        foreign_key: Option<&AnnotationUsage>,
    ) -> Self {
        let mut join_columns = Self::new(owner_entity, JoinColumnNature::Entity);
        join_columns.columns = columns
            .iter()
            .map(|c| AnnotatedJoinColumn::from_annotation(ctx, c))
            .collect();
        let nested_fk = columns.iter().find_map(|c| c.nested("foreignKey"));
        join_columns.foreign_key = ForeignKeySpec::from_annotation(foreign_key.or(nested_fk));
        join_columns
    }

    /// Read one side of a `@JoinTable`
    ///
    /// `inverse` selects `inverseJoinColumns` and `inverseForeignKey`;
    /// `many_to_many` records `owner_entity` as the owner of the association.
    pub fn for_join_table(
        ctx: &BindingContext<'_>,
        owner_entity: &str,
        property: &str,
        join_table: Option<&AnnotationUsage>,
        inverse: bool,
        many_to_many: bool,
    ) -> Self {
        let (columns_key, fk_key) = if inverse {
            ("inverseJoinColumns", "inverseForeignKey")
        } else {
            ("joinColumns", "foreignKey")
        };
        let mut join_columns =
            Self::new(owner_entity, JoinColumnNature::EntityCollection).with_property(property);
        if many_to_many {
            join_columns.many_to_many_owner_entity = Some(owner_entity.to_string());
        }
        if let Some(join_table) = join_table {
            join_columns.columns = join_table
                .nested_list(columns_key)
                .into_iter()
                .map(|c| AnnotatedJoinColumn::from_annotation(ctx, c))
                .collect();
            join_columns.foreign_key = ForeignKeySpec::from_annotation(join_table.nested(fk_key));
        }
        join_columns
    }

    /// Non-owning side of a bidirectional association
    pub fn has_mapped_by(&self) -> bool {
        self.mapped_by.is_some()
    }

    pub fn is_implicit(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn has_formula(&self) -> bool {
        self.columns.iter().any(AnnotatedJoinColumn::is_formula)
    }

    /// Secondary table named by the join columns, if any
    pub fn secondary_table(&self) -> Option<&Identifier> {
        self.columns.iter().find_map(|c| c.secondary_table.as_ref())
    }

    /// Whether every declared column is nullable
    pub fn nullable(&self) -> bool {
        self.columns.iter().all(|c| c.nullable)
    }

    fn describe_property(&self) -> String {
        self.property_name.clone().unwrap_or_default()
    }
}

/// `@OnDelete` of a member
pub fn on_delete_action(annotated: &impl Annotated, owner: &str) -> BindResult<OnDeleteAction> {
    match annotated.annotation(names::ON_DELETE) {
        Some(on_delete) => {
            let action = on_delete.enum_value("action", "NO_ACTION");
            OnDeleteAction::parse(action).ok_or_else(|| MappingError::AnnotationMisuse {
                class: owner.to_string(),
                annotation: names::ON_DELETE.to_string(),
                reason: format!("unknown action '{}'", action),
            })
        }
        None => Ok(OnDeleteAction::NoAction),
    }
}

/// Input of the implicit join column name, by side
#[derive(Debug, Clone)]
pub enum DefaultNameSource<'s> {
    /// Inverse side: borrow the column of the owning property
    MappedBy {
        entity: &'s str,
        property: &'s str,
        target: &'s str,
        mapped_by: &'s str,
        owning_selectables: &'s [Selectable],
    },
    /// Owning side of an association
    Owner {
        owner: &'s EntityNaming,
        attribute_path: Option<&'s AttributePath>,
        nature: JoinColumnNature,
        referenced_table: &'s Identifier,
        referenced_column: &'s Identifier,
    },
    /// Primary key join inside a hierarchy or to a secondary table
    IntraHierarchy {
        referenced_table: &'s Identifier,
        referenced_column: &'s Identifier,
    },
}

/// Logical name of an implicit join column
pub fn build_default_column_name(
    ctx: &BindingContext<'_>,
    source: &DefaultNameSource<'_>,
) -> BindResult<Identifier> {
    match source {
        DefaultNameSource::MappedBy {
            entity,
            property,
            target,
            mapped_by,
            owning_selectables,
        } => {
            let error = |reason: &str| MappingError::MappedByResolution {
                entity: entity.to_string(),
                property: property.to_string(),
                target: target.to_string(),
                mapped_by: mapped_by.to_string(),
                reason: reason.to_string(),
            };
            match owning_selectables {
                [] => Err(error("the owning property maps to no column")),
                [Selectable::Formula(_)] => Err(error("the owning property maps to a formula")),
                [Selectable::Column(column)] => Ok(column.clone()),
                _ => Err(error("the owning property maps to more than one column")),
            }
        }
        DefaultNameSource::Owner {
            owner,
            attribute_path,
            nature,
            referenced_table,
            referenced_column,
        } => {
            let name = ctx
                .implicit_naming
                .determine_join_column_name(&ImplicitJoinColumnNameSource {
                    nature: *nature,
                    entity_naming: (*owner).clone(),
                    attribute_path: attribute_path.cloned(),
                    referenced_table_name: (*referenced_table).clone(),
                    referenced_column_name: (*referenced_column).clone(),
                });
            let name = if referenced_column.is_quoted() || referenced_table.is_quoted() {
                name.into_quoted()
            } else {
                name
            };
            Ok(ctx.implicit_identifier(name))
        }
        DefaultNameSource::IntraHierarchy {
            referenced_table,
            referenced_column,
        } => {
            let name = ctx.implicit_naming.determine_primary_key_join_column_name(
                &ImplicitPrimaryKeyJoinColumnNameSource {
                    referenced_table_name: (*referenced_table).clone(),
                    referenced_primary_key_column_name: (*referenced_column).clone(),
                },
            );
            let name = if !name.is_quoted()
                && (referenced_column.is_quoted() || referenced_table.is_quoted())
            {
                name.into_quoted()
            } else {
                name
            };
            Ok(ctx.implicit_identifier(name))
        }
    }
}

/// What the join columns reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferencedColumnsType {
    /// No `referencedColumnName` given: the primary key, by position
    ImplicitPrimaryKey,
    /// Referenced names are exactly the primary key columns
    ExplicitPrimaryKey,
    /// Some other unique columns of the referenced table
    NonPrimaryKey,
}

/// Classify the join columns against the key of `key`'s entity
pub fn referenced_columns_type(
    join_columns: &AnnotatedJoinColumns,
    key: &KeyColumns,
) -> BindResult<ReferencedColumnsType> {
    let explicit = join_columns
        .columns
        .iter()
        .filter(|c| c.referenced_column.is_some())
        .count();
    if explicit == 0 {
        return Ok(ReferencedColumnsType::ImplicitPrimaryKey);
    }
    if explicit != join_columns.columns.len() {
        return Err(MappingError::PropertyMisuse {
            entity: join_columns.owner_entity.clone(),
            property: join_columns.describe_property(),
            annotation: names::JOIN_COLUMN.to_string(),
            reason: "either every join column or none must give referencedColumnName".to_string(),
        });
    }
    let all_key_columns = explicit == key.columns.len()
        && join_columns.columns.iter().all(|jc| {
            jc.referenced_column
                .as_ref()
                .is_some_and(|name| key.columns.iter().any(|c| names_column(c, name)))
        });
    Ok(if all_key_columns {
        ReferencedColumnsType::ExplicitPrimaryKey
    } else {
        ReferencedColumnsType::NonPrimaryKey
    })
}

fn names_column(column: &Column, name: &Identifier) -> bool {
    column.name.matches(name) || column.logical_name.matches(name)
}

/// How implicit names are derived when linking
#[derive(Debug, Clone)]
pub enum LinkNaming<'s> {
    Owner {
        owner: &'s EntityNaming,
        attribute_path: Option<&'s AttributePath>,
    },
    IntraHierarchy,
}

/// Join columns linked to the referenced key
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedJoinColumns {
    pub reference: ReferencedColumnsType,
    pub referenced_entity: String,
    pub referenced_table: TableId,
    /// Referenced columns, one per linked column (formulas excluded)
    pub referenced_columns: Vec<Identifier>,
    /// Columns to create in the referencing table
    pub columns: Vec<Column>,
    /// Columns and formulas in declaration order
    pub selectables: Vec<Selectable>,
    /// Property of the referenced entity matched by a non primary key join
    pub referenced_property: Option<String>,
}

impl LinkedJoinColumns {
    pub fn column_names(&self) -> Vec<Identifier> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// Link `join_columns` to the key of `target`
///
/// Read-only: the caller adds the returned columns. Deferred while the
/// target or its key columns are not bound.
pub fn link_join_columns(
    ctx: &BindingContext<'_>,
    collector: &MetadataCollector,
    join_columns: &AnnotatedJoinColumns,
    target: &str,
    naming: &LinkNaming<'_>,
) -> Resolution<LinkedJoinColumns> {
    let Some(target_entity) = collector.entity(target) else {
        return Resolution::deferred(
            &join_columns.owner_entity,
            format!("entity '{}'", target),
            "referenced entity is not bound yet",
        );
    };
    let target_name = target_entity.entity_name.clone();
    let key = try_resolve!(collector.entity_key_columns(&target_name));
    let reference = try_bind!(referenced_columns_type(join_columns, &key));
    let key_table_name = &collector.table(key.table).logical_name;
    // intra-hierarchy keys are named after the hierarchy root's table
    let referenced_table_name = match naming {
        LinkNaming::IntraHierarchy => collector
            .root_entity(&target_name)
            .map(|root| &collector.table(root.table).logical_name)
            .unwrap_or(key_table_name),
        LinkNaming::Owner { .. } => key_table_name,
    }
    .clone();

    let mut referenced_table = key.table;
    let mut referenced_property = None;
    // (declared column, referenced column) in link order
    let pairs: Vec<(Option<&AnnotatedJoinColumn>, Column)> = match reference {
        ReferencedColumnsType::ImplicitPrimaryKey => {
            if join_columns.is_implicit() {
                key.columns.iter().map(|c| (None, c.clone())).collect()
            } else if join_columns.columns.len() != key.columns.len() {
                return Resolution::Fatal(MappingError::JoinColumnCountMismatch {
                    entity: join_columns.owner_entity.clone(),
                    property: join_columns.describe_property(),
                    target: target_name,
                    declared: join_columns.columns.len(),
                    expected: key.columns.len(),
                });
            } else {
                join_columns
                    .columns
                    .iter()
                    .zip(key.columns.iter())
                    .map(|(jc, c)| (Some(jc), c.clone()))
                    .collect()
            }
        }
        // key column order, so the foreign key lines up with the primary key
        ReferencedColumnsType::ExplicitPrimaryKey => key
            .columns
            .iter()
            .filter_map(|referenced| {
                join_columns
                    .columns
                    .iter()
                    .find(|jc| {
                        jc.referenced_column
                            .as_ref()
                            .is_some_and(|name| names_column(referenced, name))
                    })
                    .map(|jc| (Some(jc), referenced.clone()))
            })
            .collect(),
        ReferencedColumnsType::NonPrimaryKey => {
            let mut tables = vec![target_entity.table];
            tables.extend(target_entity.joins.iter().map(|j| j.table));
            let mut pairs = Vec::with_capacity(join_columns.columns.len());
            for jc in &join_columns.columns {
                let Some(name) = jc.referenced_column.as_ref() else {
                    continue;
                };
                let found = tables.iter().find_map(|t| {
                    collector
                        .find_column_by_any_name(*t, name)
                        .map(|c| (*t, c.clone()))
                });
                match found {
                    Some((table, column)) => {
                        referenced_table = table;
                        pairs.push((Some(jc), column));
                    }
                    None => {
                        return Resolution::deferred(
                            &join_columns.owner_entity,
                            format!("column '{}' of '{}'", name, target_name),
                            "referenced column is not bound yet",
                        );
                    }
                }
            }
            let referenced: Vec<&Identifier> = pairs.iter().map(|(_, c)| &c.name).collect();
            referenced_property = target_entity
                .properties
                .iter()
                .find(|p| {
                    let columns = p.value.column_names();
                    !columns.is_empty()
                        && columns.len() == referenced.len()
                        && columns.iter().all(|c| referenced.iter().any(|r| r.matches(c)))
                })
                .map(|p| p.name.clone());
            pairs
        }
    };

    let mut linked = LinkedJoinColumns {
        reference,
        referenced_entity: target_name.clone(),
        referenced_table,
        referenced_columns: Vec::with_capacity(pairs.len()),
        columns: Vec::with_capacity(pairs.len()),
        selectables: Vec::with_capacity(pairs.len()),
        referenced_property,
    };

    for (index, (declared, referenced)) in pairs.into_iter().enumerate() {
        if let Some(formula) = declared.and_then(|jc| jc.formula.as_ref()) {
            linked.selectables.push(Selectable::Formula(formula.clone()));
            continue;
        }
        let mut logical = match declared.and_then(|jc| jc.explicit_name.clone()) {
            Some(name) => name,
            None => {
                let source = match naming {
                    LinkNaming::Owner {
                        owner,
                        attribute_path,
                    } => DefaultNameSource::Owner {
                        owner,
                        attribute_path: *attribute_path,
                        nature: join_columns.nature,
                        referenced_table: &referenced_table_name,
                        referenced_column: &referenced.logical_name,
                    },
                    LinkNaming::IntraHierarchy => DefaultNameSource::IntraHierarchy {
                        referenced_table: &referenced_table_name,
                        referenced_column: &referenced.logical_name,
                    },
                };
                try_bind!(build_default_column_name(ctx, &source))
            }
        };
        if linked.columns.iter().any(|c| c.logical_name.matches(&logical)) {
            logical = Identifier::new(format!("{}_{}", logical.text(), index), logical.is_quoted());
        }

        let mut column = Column::new(ctx.physical_column_name(&logical))
            .with_logical_name(logical)
            .with_type_of(&referenced)
            .with_nullable(declared.is_none_or(|jc| jc.nullable))
            .with_unique(declared.is_some_and(|jc| jc.unique));
        column.sql_type = declared
            .and_then(|jc| jc.column_definition.clone())
            .or(column.sql_type);
        linked.selectables.push(Selectable::Column(column.name.clone()));
        linked.referenced_columns.push(referenced.name.clone());
        linked.columns.push(column);
    }

    debug!(
        owner = %join_columns.owner_entity,
        target = %linked.referenced_entity,
        reference = ?linked.reference,
        columns = linked.columns.len(),
        "Linked join columns"
    );
    Resolution::Resolved(linked)
}
