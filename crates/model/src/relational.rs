// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Relational Model
//!
//! Tables, columns and keys as the binder creates them.
//!
//! Tables live in an arena owned by the metadata collector and are addressed
//! by [`TableId`]. A column is registered under both its logical name (the
//! name written in, or implied by, the annotations) and its physical name
//! (the logical name after the physical naming strategy ran).

use serde::{Deserialize, Serialize};

use crate::identifier::Identifier;

/// Index of a table in the metadata table arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableId(pub usize);

/// Catalog, schema and table name of a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualifiedTableName {
    pub catalog: Option<Identifier>,
    pub schema: Option<Identifier>,
    pub table: Identifier,
}

impl QualifiedTableName {
    pub fn new(catalog: Option<Identifier>, schema: Option<Identifier>, table: Identifier) -> Self {
        Self {
            catalog,
            schema,
            table,
        }
    }

    /// Key under which the table is registered; two tables with the same key
    /// are the same table
    pub fn canonical_key(&self) -> String {
        let mut parts = Vec::with_capacity(3);
        if let Some(catalog) = &self.catalog {
            parts.push(catalog.canonical_name());
        }
        if let Some(schema) = &self.schema {
            parts.push(schema.canonical_name());
        }
        parts.push(self.table.canonical_name());
        parts.join(".")
    }
}

impl std::fmt::Display for QualifiedTableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(catalog) = &self.catalog {
            write!(f, "{}.", catalog)?;
        }
        if let Some(schema) = &self.schema {
            write!(f, "{}.", schema)?;
        }
        write!(f, "{}", self.table)
    }
}

/// A physical column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Physical name
    pub name: Identifier,
    /// Name as written in (or implied by) the mapping
    pub logical_name: Identifier,
    /// Basic type name, e.g. `string` or `long`
    pub type_name: Option<String>,
    /// Explicit column definition fragment
    pub sql_type: Option<String>,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub nullable: bool,
    pub unique: bool,
    pub check: Option<String>,
    pub default_value: Option<String>,
    pub comment: Option<String>,
}

impl Column {
    /// Create a nullable column whose logical and physical names agree
    pub fn new(name: Identifier) -> Self {
        Self {
            logical_name: name.clone(),
            name,
            type_name: None,
            sql_type: None,
            length: None,
            precision: None,
            scale: None,
            nullable: true,
            unique: false,
            check: None,
            default_value: None,
            comment: None,
        }
    }

    pub fn with_logical_name(mut self, logical_name: Identifier) -> Self {
        self.logical_name = logical_name;
        self
    }

    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Copy the type information of `other`, used for foreign key columns
    pub fn with_type_of(mut self, other: &Column) -> Self {
        self.type_name = other.type_name.clone();
        self.sql_type = other.sql_type.clone();
        self.length = other.length;
        self.precision = other.precision;
        self.scale = other.scale;
        self
    }
}

/// Something a value can select: a column of its table or a SQL formula
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selectable {
    Column(Identifier),
    Formula(String),
}

impl Selectable {
    pub fn as_column(&self) -> Option<&Identifier> {
        match self {
            Selectable::Column(name) => Some(name),
            Selectable::Formula(_) => None,
        }
    }

    pub fn is_formula(&self) -> bool {
        matches!(self, Selectable::Formula(_))
    }
}

/// Primary key of a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKey {
    pub name: Option<String>,
    pub columns: Vec<Identifier>,
}

/// Action taken by the database when a referenced row is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OnDeleteAction {
    #[default]
    NoAction,
    Cascade,
    SetNull,
    SetDefault,
    Restrict,
}

impl OnDeleteAction {
    /// Parse the `action` attribute of `@OnDelete`
    pub fn parse(text: &str) -> Option<Self> {
        match text.to_ascii_uppercase().as_str() {
            "NO_ACTION" => Some(Self::NoAction),
            "CASCADE" => Some(Self::Cascade),
            "SET_NULL" => Some(Self::SetNull),
            "SET_DEFAULT" => Some(Self::SetDefault),
            "RESTRICT" => Some(Self::Restrict),
            _ => None,
        }
    }
}

/// Foreign key constraint owned by the referencing table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: Option<String>,
    pub columns: Vec<Identifier>,
    pub referenced_table: TableId,
    pub referenced_entity: Option<String>,
    /// Empty when the key references the primary key of `referenced_table`
    pub referenced_columns: Vec<Identifier>,
    pub on_delete: OnDeleteAction,
    /// `false` when the mapping asked for no physical constraint
    pub constraint: bool,
}

impl ForeignKey {
    pub fn references_primary_key(&self) -> bool {
        self.referenced_columns.is_empty()
    }
}

/// Unique constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueKey {
    pub name: Option<String>,
    pub columns: Vec<Identifier>,
}

/// Index declared on a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: Option<String>,
    /// Column list entries, possibly with `asc`/`desc` suffixes
    pub columns: Vec<String>,
    pub unique: bool,
}

/// Check constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckConstraint {
    pub name: Option<String>,
    pub constraint: String,
}

/// A table of the mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub id: TableId,
    /// Physical, qualified name
    pub name: QualifiedTableName,
    /// Name as written in (or implied by) the mapping
    pub logical_name: Identifier,
    /// SQL text for entities mapped to a query instead of a table
    pub subselect: Option<String>,
    /// Abstract union roots have no rows of their own
    pub is_abstract: bool,
    /// For union subclass tables: the super table whose columns are repeated here
    pub included_table: Option<TableId>,
    columns: Vec<Column>,
    pub primary_key: Option<PrimaryKey>,
    pub foreign_keys: Vec<ForeignKey>,
    pub unique_keys: Vec<UniqueKey>,
    pub indexes: Vec<Index>,
    pub checks: Vec<CheckConstraint>,
    pub comment: Option<String>,
}

impl Table {
    pub fn new(id: TableId, name: QualifiedTableName, logical_name: Identifier) -> Self {
        Self {
            id,
            name,
            logical_name,
            subselect: None,
            is_abstract: false,
            included_table: None,
            columns: Vec::new(),
            primary_key: None,
            foreign_keys: Vec::new(),
            unique_keys: Vec::new(),
            indexes: Vec::new(),
            checks: Vec::new(),
            comment: None,
        }
    }

    /// Whether rows of this table exist in the database
    pub fn is_physical(&self) -> bool {
        self.subselect.is_none() && !self.is_abstract
    }

    /// Add a column, or return the existing column with the same physical name
    ///
    /// # Returns
    ///
    /// `true` when the column was added, `false` when it already existed.
    pub fn add_column(&mut self, column: Column) -> bool {
        if self.column(&column.name).is_some() {
            return false;
        }
        self.columns.push(column);
        true
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Put `columns` in front of this table's own columns, skipping names
    /// the table already has
    pub fn include_columns(&mut self, columns: &[Column]) {
        let mut merged: Vec<Column> = columns
            .iter()
            .filter(|c| !self.has_column(&c.name))
            .cloned()
            .collect();
        merged.append(&mut self.columns);
        self.columns = merged;
    }

    /// Look up a column by physical name
    pub fn column(&self, name: &Identifier) -> Option<&Column> {
        self.columns.iter().find(|c| c.name.matches(name))
    }

    pub fn column_mut(&mut self, name: &Identifier) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name.matches(name))
    }

    /// Look up a column by logical name
    pub fn column_by_logical_name(&self, logical_name: &Identifier) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.logical_name.matches(logical_name))
    }

    pub fn has_column(&self, name: &Identifier) -> bool {
        self.column(name).is_some()
    }

    /// Add a foreign key unless an equivalent one exists
    pub fn add_foreign_key(&mut self, foreign_key: ForeignKey) {
        let exists = self.foreign_keys.iter().any(|fk| {
            fk.referenced_table == foreign_key.referenced_table
                && fk.columns.len() == foreign_key.columns.len()
                && fk
                    .columns
                    .iter()
                    .zip(&foreign_key.columns)
                    .all(|(a, b)| a.matches(b))
        });
        if !exists {
            self.foreign_keys.push(foreign_key);
        }
    }

    /// Primary key column names, empty when no key has been created
    pub fn primary_key_columns(&self) -> &[Identifier] {
        self.primary_key
            .as_ref()
            .map(|pk| pk.columns.as_slice())
            .unwrap_or(&[])
    }
}
