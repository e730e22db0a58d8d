// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Column Resolution
//!
//! Turns the column annotations of one attribute (`@Column`, `@Columns`,
//! `@Formula`, `@AttributeOverride`) into [`AnnotatedColumns`], then into
//! physical columns of the owner's primary or secondary table.
//!
//! ## Defaults
//!
//! - Without a column annotation one implicit column is named by the
//!   implicit naming strategy from the attribute path
//! - Primitive types, identifiers and `@Basic(optional = false)` are not null
//! - String columns default to a length of 255
//! - A property maps to columns or to a single formula, never both

use indexmap::IndexMap;
use ormbind_model::{Column, Identifier, PersistentClass, Selectable, SimpleValue, TableId};
use ormbind_naming::{
    AttributePath, EntityNaming, ImplicitBasicColumnNameSource, ImplicitIdentifierColumnNameSource,
};
use ormbind_source::{names, Annotated, AnnotationUsage, MemberDetails};
use tracing::debug;

use crate::collector::MetadataCollector;
use crate::context::BindingContext;
use crate::error::{BindResult, MappingError};

/// Default length of string columns
pub const DEFAULT_STRING_LENGTH: u32 = 255;

/// `@Column` annotations overriding attributes, keyed by attribute path
pub type AttributeOverrides = IndexMap<String, AnnotationUsage>;

/// One column or formula of an attribute, before physical naming
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedColumn {
    /// Logical name as written in the mapping
    pub explicit_name: Option<Identifier>,
    pub formula: Option<String>,
    pub nullable: bool,
    pub unique: bool,
    pub insertable: bool,
    pub updatable: bool,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub column_definition: Option<String>,
    pub comment: Option<String>,
    /// Secondary table holding the column
    pub secondary_table: Option<Identifier>,
}

impl AnnotatedColumn {
    fn implicit() -> Self {
        Self {
            explicit_name: None,
            formula: None,
            nullable: true,
            unique: false,
            insertable: true,
            updatable: true,
            length: None,
            precision: None,
            scale: None,
            column_definition: None,
            comment: None,
            secondary_table: None,
        }
    }

    fn formula(sql: &str) -> Self {
        Self {
            formula: Some(sql.to_string()),
            insertable: false,
            updatable: false,
            ..Self::implicit()
        }
    }

    fn from_annotation(ctx: &BindingContext<'_>, column: &AnnotationUsage) -> Self {
        Self {
            explicit_name: column.string("name").and_then(|name| ctx.identifier(name)),
            formula: None,
            nullable: column.bool_or("nullable", true),
            unique: column.bool_or("unique", false),
            insertable: column.bool_or("insertable", true),
            updatable: column.bool_or("updatable", true),
            length: column.int("length").and_then(|v| u32::try_from(v).ok()),
            precision: column
                .int("precision")
                .and_then(|v| u32::try_from(v).ok())
                .filter(|v| *v > 0),
            scale: column
                .int("scale")
                .and_then(|v| u32::try_from(v).ok())
                .filter(|v| *v > 0),
            column_definition: column.string("columnDefinition").map(str::to_string),
            comment: column.string("comment").map(str::to_string),
            secondary_table: column.string("table").and_then(|name| ctx.identifier(name)),
        }
    }

    pub fn is_formula(&self) -> bool {
        self.formula.is_some()
    }
}

/// Whether implicit names come from the basic or the identifier rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    Basic,
    Identifier,
}

/// Columns of one attribute
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedColumns {
    pub property_path: AttributePath,
    pub role: ColumnRole,
    pub columns: Vec<AnnotatedColumn>,
}

impl AnnotatedColumns {
    /// Read the column annotations of `member`, bound at `path`
    ///
    /// An override registered for the full path replaces the member's own
    /// `@Column`.
    pub fn from_member(
        ctx: &BindingContext<'_>,
        entity: &str,
        member: &MemberDetails,
        path: &AttributePath,
        overrides: &AttributeOverrides,
        role: ColumnRole,
    ) -> BindResult<Self> {
        let formula = member.annotation(names::FORMULA);
        let override_column = overrides
            .get(&path.full_path())
            .and_then(|o| o.nested("column"));
        let column_annotations: Vec<&AnnotationUsage> = match override_column {
            Some(column) => vec![column],
            None => {
                let mut found: Vec<&AnnotationUsage> =
                    member.annotation(names::COLUMN).into_iter().collect();
                if let Some(columns) = member.annotation(names::COLUMNS) {
                    found.extend(columns.nested_list("columns"));
                }
                found
            }
        };

        if let Some(formula) = formula {
            if !column_annotations.is_empty() {
                return Err(MappingError::PropertyMisuse {
                    entity: entity.to_string(),
                    property: path.full_path(),
                    annotation: names::FORMULA.to_string(),
                    reason: "a property maps to columns or to a formula, not both".to_string(),
                });
            }
            let sql = formula.string("value").ok_or_else(|| MappingError::PropertyMisuse {
                entity: entity.to_string(),
                property: path.full_path(),
                annotation: names::FORMULA.to_string(),
                reason: "formula is empty".to_string(),
            })?;
            return Ok(Self {
                property_path: path.clone(),
                role,
                columns: vec![AnnotatedColumn::formula(sql)],
            });
        }

        let mut columns: Vec<AnnotatedColumn> = if column_annotations.is_empty() {
            vec![AnnotatedColumn::implicit()]
        } else {
            column_annotations
                .into_iter()
                .map(|c| AnnotatedColumn::from_annotation(ctx, c))
                .collect()
        };

        let optional = member
            .annotation(names::BASIC)
            .is_none_or(|basic| basic.bool_or("optional", true));
        let not_null = role == ColumnRole::Identifier
            || member.is_primitive()
            || !optional
            || member.has_annotation(names::VERSION);
        let is_string = matches!(
            member.type_name.as_str(),
            "String" | "java.lang.String"
        );
        for column in &mut columns {
            if not_null {
                column.nullable = false;
            }
            if is_string && column.length.is_none() {
                column.length = Some(DEFAULT_STRING_LENGTH);
            }
        }

        Ok(Self {
            property_path: path.clone(),
            role,
            columns,
        })
    }

    pub fn is_formula(&self) -> bool {
        self.columns.iter().any(AnnotatedColumn::is_formula)
    }

    /// Secondary table named by the columns, if any
    pub fn secondary_table(&self) -> Option<&Identifier> {
        self.columns.iter().find_map(|c| c.secondary_table.as_ref())
    }

    /// Make every column not null
    pub fn force_not_null(&mut self) {
        for column in &mut self.columns {
            column.nullable = false;
        }
    }
}

/// Index of the join holding `table_name` among the entity's joins
pub fn find_join(
    collector: &MetadataCollector,
    entity: &PersistentClass,
    table_name: &Identifier,
) -> Option<usize> {
    entity.joins.iter().position(|join| {
        let table = collector.table(join.table);
        table.logical_name.matches(table_name) || table.name.table.matches(table_name)
    })
}

/// Create the physical columns of a basic attribute
///
/// # Returns
///
/// The bound value and, when the columns live in a secondary table, the
/// index of its join.
pub fn bind_basic_value(
    ctx: &BindingContext<'_>,
    collector: &mut MetadataCollector,
    entity: &PersistentClass,
    columns: &AnnotatedColumns,
    type_name: &str,
) -> BindResult<(SimpleValue, Option<usize>)> {
    let (table, join) = match columns.secondary_table() {
        Some(name) => {
            let index =
                find_join(collector, entity, name).ok_or_else(|| MappingError::UnknownSecondaryTable {
                    entity: entity.entity_name.clone(),
                    table: name.to_string(),
                })?;
            (entity.joins[index].table, Some(index))
        }
        None => (entity.table, None),
    };

    let mut value = SimpleValue::new(table).with_type_name(type_name);
    for annotated in &columns.columns {
        if let Some(formula) = &annotated.formula {
            value.selectables.push(Selectable::Formula(formula.clone()));
            continue;
        }
        let logical = match &annotated.explicit_name {
            Some(name) => name.clone(),
            None => implicit_column_name(ctx, entity, columns),
        };
        let column = make_column(ctx, &logical, annotated, type_name);
        let name = column.name.clone();
        add_column(collector, table, column);
        value.selectables.push(Selectable::Column(name));
    }
    Ok((value, join))
}

/// Logical name of an implicit column
fn implicit_column_name(
    ctx: &BindingContext<'_>,
    entity: &PersistentClass,
    columns: &AnnotatedColumns,
) -> Identifier {
    let name = match columns.role {
        ColumnRole::Basic => ctx
            .implicit_naming
            .determine_basic_column_name(&ImplicitBasicColumnNameSource {
                attribute_path: columns.property_path.clone(),
            }),
        ColumnRole::Identifier => ctx.implicit_naming.determine_identifier_column_name(
            &ImplicitIdentifierColumnNameSource {
                entity_naming: EntityNaming::new(
                    &entity.entity_name,
                    &entity.class_name,
                    &entity.jpa_entity_name,
                ),
                identifier_attribute_path: columns.property_path.clone(),
            },
        ),
    };
    ctx.implicit_identifier(name)
}

/// Physical column for a logical name
pub fn make_column(
    ctx: &BindingContext<'_>,
    logical: &Identifier,
    annotated: &AnnotatedColumn,
    type_name: &str,
) -> Column {
    let mut column = Column::new(ctx.physical_column_name(logical))
        .with_logical_name(logical.clone())
        .with_type_name(type_name)
        .with_nullable(annotated.nullable)
        .with_unique(annotated.unique);
    column.length = annotated.length;
    column.precision = annotated.precision;
    column.scale = annotated.scale;
    column.sql_type = annotated.column_definition.clone();
    column.comment = annotated.comment.clone();
    column
}

/// Add a column unless the table already has one of that name
///
/// Sibling entities of a single table hierarchy may map the same column.
pub fn add_column(collector: &mut MetadataCollector, table: TableId, column: Column) {
    let table = collector.table_mut(table);
    if !table.add_column(column) {
        debug!(table = %table.name, "Column already mapped, reusing it");
    }
}

/// `@AttributeOverride(s)` of an annotated element, keyed below `prefix`
pub fn collect_attribute_overrides(annotated: &impl Annotated, prefix: Option<&AttributePath>) -> AttributeOverrides {
    let mut overrides = AttributeOverrides::new();
    for usage in annotated.repeated_annotations(names::ATTRIBUTE_OVERRIDE, names::ATTRIBUTE_OVERRIDES) {
        let Some(name) = usage.string("name") else {
            continue;
        };
        let key = match prefix {
            Some(prefix) => prefix.append(name).full_path(),
            None => AttributePath::parse(name).full_path(),
        };
        overrides.insert(key, usage.clone());
    }
    overrides
}

/// Basic type name of a Java type
///
/// Registered types win over the built-in mapping; unknown types keep their
/// Java name.
pub fn basic_type_name(collector: &MetadataCollector, java_type: &str) -> String {
    if let Some(registered) = collector.registered_type(java_type) {
        return registered.to_string();
    }
    let simple = java_type.rsplit('.').next().unwrap_or(java_type);
    let name = match simple {
        "String" => "string",
        "long" | "Long" => "long",
        "int" | "Integer" => "integer",
        "short" | "Short" => "short",
        "byte" | "Byte" => "byte",
        "char" | "Character" => "character",
        "boolean" | "Boolean" => "boolean",
        "double" | "Double" => "double",
        "float" | "Float" => "float",
        "BigDecimal" => "big_decimal",
        "BigInteger" => "big_integer",
        "UUID" => "uuid",
        "LocalDate" | "Date" => "date",
        "LocalDateTime" | "Instant" | "OffsetDateTime" | "ZonedDateTime" | "Timestamp" => {
            "timestamp"
        }
        "LocalTime" | "Time" => "time",
        "byte[]" | "Byte[]" => "binary",
        _ => return java_type.to_string(),
    };
    name.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BinderConfig;
    use crate::type_binder::TypeBinderRegistry;
    use ormbind_model::{PersistentClassKind, QualifiedTableName, TypeRegistration};
    use ormbind_naming::{JpaCompliantNamingStrategy, SnakeCasePhysicalNaming};
    use ormbind_source::StaticAnnotationSource;

    struct Fixture {
        source: StaticAnnotationSource,
        config: BinderConfig,
        binders: TypeBinderRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                source: StaticAnnotationSource::new(),
                config: BinderConfig::default(),
                binders: TypeBinderRegistry::new(),
            }
        }

        fn ctx(&self) -> BindingContext<'_> {
            BindingContext::new(
                &self.source,
                &JpaCompliantNamingStrategy,
                &SnakeCasePhysicalNaming,
                &self.config,
                &self.binders,
            )
        }
    }

    fn order(collector: &mut MetadataCollector) -> PersistentClass {
        let (table, _) = collector.add_table(
            QualifiedTableName::new(None, None, Identifier::unquoted("orders")),
            Identifier::unquoted("Order"),
        );
        PersistentClass::new("com.acme.Order", "Order", PersistentClassKind::Root, table)
    }

    #[test]
    fn test_implicit_column_uses_attribute_name() {
        let fixture = Fixture::new();
        let ctx = fixture.ctx();
        let mut collector = MetadataCollector::new();
        let entity = order(&mut collector);
        let member = MemberDetails::field("createdAt", "java.time.LocalDateTime");
        let columns = AnnotatedColumns::from_member(
            &ctx,
            &entity.entity_name,
            &member,
            &AttributePath::parse("createdAt"),
            &AttributeOverrides::new(),
            ColumnRole::Basic,
        )
        .unwrap();

        let type_name = basic_type_name(&collector, &member.type_name);
        let (value, join) = bind_basic_value(&ctx, &mut collector, &entity, &columns, &type_name).unwrap();
        assert!(join.is_none());
        assert_eq!(value.type_name.as_deref(), Some("timestamp"));
        let column = collector
            .table(entity.table)
            .column(&Identifier::unquoted("created_at"))
            .unwrap();
        assert_eq!(column.logical_name.text(), "createdAt");
        assert!(column.nullable);
    }

    #[test]
    fn test_primitive_and_string_defaults() {
        let fixture = Fixture::new();
        let ctx = fixture.ctx();
        let overrides = AttributeOverrides::new();
        let qty = AnnotatedColumns::from_member(
            &ctx,
            "Order",
            &MemberDetails::field("quantity", "int"),
            &AttributePath::parse("quantity"),
            &overrides,
            ColumnRole::Basic,
        )
        .unwrap();
        assert!(!qty.columns[0].nullable);

        let name = AnnotatedColumns::from_member(
            &ctx,
            "Order",
            &MemberDetails::field("name", "java.lang.String").with_annotation(
                AnnotationUsage::new(names::BASIC).with("optional", false),
            ),
            &AttributePath::parse("name"),
            &overrides,
            ColumnRole::Basic,
        )
        .unwrap();
        assert!(!name.columns[0].nullable);
        assert_eq!(name.columns[0].length, Some(DEFAULT_STRING_LENGTH));
    }

    #[test]
    fn test_column_and_formula_conflict() {
        let fixture = Fixture::new();
        let member = MemberDetails::field("total", "java.math.BigDecimal")
            .with_annotation(AnnotationUsage::new(names::COLUMN).with("name", "TOTAL"))
            .with_annotation(AnnotationUsage::new(names::FORMULA).with("value", "price * qty"));
        let result = AnnotatedColumns::from_member(
            &fixture.ctx(),
            "com.acme.Order",
            &member,
            &AttributePath::parse("total"),
            &AttributeOverrides::new(),
            ColumnRole::Basic,
        );
        match result {
            Err(MappingError::PropertyMisuse { property, annotation, .. }) => {
                assert_eq!(property, "total");
                assert_eq!(annotation, names::FORMULA);
            }
            _ => panic!("Expected PropertyMisuse error, got {:?}", result),
        }
    }

    #[test]
    fn test_override_replaces_member_column() {
        let fixture = Fixture::new();
        let holder = ormbind_source::ClassDetails::new("com.acme.Order").with_annotation(
            AnnotationUsage::new(names::ATTRIBUTE_OVERRIDE)
                .with("name", "city")
                .with("column", AnnotationUsage::new(names::COLUMN).with("name", "SHIP_CITY")),
        );
        let overrides = collect_attribute_overrides(&holder, Some(&AttributePath::parse("address")));
        assert!(overrides.contains_key("address.city"));

        let member = MemberDetails::field("city", "java.lang.String")
            .with_annotation(AnnotationUsage::new(names::COLUMN).with("name", "CITY"));
        let columns = AnnotatedColumns::from_member(
            &fixture.ctx(),
            "com.acme.Order",
            &member,
            &AttributePath::parse("address.city"),
            &overrides,
            ColumnRole::Basic,
        )
        .unwrap();
        assert_eq!(
            columns.columns[0].explicit_name.as_ref().map(Identifier::text),
            Some("SHIP_CITY")
        );
    }

    #[test]
    fn test_unknown_secondary_table() {
        let fixture = Fixture::new();
        let ctx = fixture.ctx();
        let mut collector = MetadataCollector::new();
        let entity = order(&mut collector);
        let member = MemberDetails::field("note", "java.lang.String")
            .with_annotation(AnnotationUsage::new(names::COLUMN).with("table", "ORDER_EXTRA"));
        let columns = AnnotatedColumns::from_member(
            &ctx,
            &entity.entity_name,
            &member,
            &AttributePath::parse("note"),
            &AttributeOverrides::new(),
            ColumnRole::Basic,
        )
        .unwrap();
        let result = bind_basic_value(&ctx, &mut collector, &entity, &columns, "string");
        match result {
            Err(MappingError::UnknownSecondaryTable { table, .. }) => assert_eq!(table, "ORDER_EXTRA"),
            _ => panic!("Expected UnknownSecondaryTable error, got {:?}", result),
        }
    }

    #[test]
    fn test_registered_type_wins() {
        let mut collector = MetadataCollector::new();
        assert_eq!(basic_type_name(&collector, "java.util.UUID"), "uuid");
        collector
            .add_type_registration(
                TypeRegistration {
                    java_type: "java.util.UUID".to_string(),
                    type_name: "uuid-char".to_string(),
                },
                "com.acme.Types",
            )
            .unwrap();
        assert_eq!(basic_type_name(&collector, "java.util.UUID"), "uuid-char");
        assert_eq!(basic_type_name(&collector, "com.acme.Money"), "com.acme.Money");
    }
}
