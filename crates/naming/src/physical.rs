// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Physical Naming
//!
//! Maps logical identifiers to the identifiers used in the database. Quoted
//! identifiers are never rewritten: quoting asks for the name exactly as
//! written.

use ormbind_model::{Dialect, Identifier};

/// Maps logical names to physical names for a dialect
pub trait PhysicalNamingStrategy {
    fn to_physical_catalog_name(&self, name: &Identifier, dialect: Dialect) -> Identifier {
        self.to_physical_name(name, dialect)
    }

    fn to_physical_schema_name(&self, name: &Identifier, dialect: Dialect) -> Identifier {
        self.to_physical_name(name, dialect)
    }

    fn to_physical_table_name(&self, name: &Identifier, dialect: Dialect) -> Identifier {
        self.to_physical_name(name, dialect)
    }

    fn to_physical_sequence_name(&self, name: &Identifier, dialect: Dialect) -> Identifier {
        self.to_physical_name(name, dialect)
    }

    fn to_physical_column_name(&self, name: &Identifier, dialect: Dialect) -> Identifier {
        self.to_physical_name(name, dialect)
    }

    /// Shared rule of the per-kind methods
    fn to_physical_name(&self, name: &Identifier, _dialect: Dialect) -> Identifier {
        name.clone()
    }
}

/// Physical names equal logical names
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityPhysicalNaming;

impl PhysicalNamingStrategy for IdentityPhysicalNaming {}

/// Camel case logical names become lower snake case
///
/// # Examples
///
/// ```
/// use ormbind_model::{Dialect, Identifier};
/// use ormbind_naming::{PhysicalNamingStrategy, SnakeCasePhysicalNaming};
///
/// let physical = SnakeCasePhysicalNaming
///     .to_physical_table_name(&Identifier::unquoted("OrderLine"), Dialect::PostgreSQL);
/// assert_eq!(physical.text(), "order_line");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SnakeCasePhysicalNaming;

impl PhysicalNamingStrategy for SnakeCasePhysicalNaming {
    fn to_physical_name(&self, name: &Identifier, _dialect: Dialect) -> Identifier {
        if name.is_quoted() {
            return name.clone();
        }
        Identifier::unquoted(to_snake_case(name.text()))
    }
}

/// Insert `_` at camel case word boundaries and lower-case the result
pub fn to_snake_case(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if boundary && prev != '_' {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }
    out
}
