// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Dialect Support
//!
//! The binder never generates SQL, but physical identifiers still depend on
//! the target database: how a quoted name is rendered, how unquoted names are
//! folded and how long a name may be.
//!
//! ## Dialect Families
//!
//! - **MySQL Family**: MySQL, TiDB and MariaDB
//!   - Back-tick quoted identifiers, unquoted names keep their case
//! - **PostgreSQL Family**: PostgreSQL and CockroachDB
//!   - Double-quoted identifiers, unquoted names fold to lower case

use serde::{Deserialize, Serialize};

/// Supported SQL dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum Dialect {
    /// MySQL (5.7, 8.0)
    MySQL,
    /// PostgreSQL (12, 14, 15+)
    #[default]
    PostgreSQL,
    /// TiDB (5.0, 6.0, 7.0, 8.0)
    TiDB,
    /// MariaDB (10.x, 11.x)
    MariaDB,
    /// CockroachDB (21.x, 22.x, 23.x)
    CockroachDB,
}

impl Dialect {
    /// Returns the family this dialect belongs to
    pub fn family(&self) -> DialectFamily {
        match self {
            Dialect::MySQL | Dialect::TiDB | Dialect::MariaDB => DialectFamily::MySQL,
            Dialect::PostgreSQL | Dialect::CockroachDB => DialectFamily::PostgreSQL,
        }
    }

    /// Opening quote character for delimited identifiers
    pub fn open_quote(&self) -> char {
        match self.family() {
            DialectFamily::MySQL => '`',
            DialectFamily::PostgreSQL => '"',
        }
    }

    /// Closing quote character for delimited identifiers
    pub fn close_quote(&self) -> char {
        self.open_quote()
    }

    /// Wrap `text` in this dialect's identifier quotes
    ///
    /// # Examples
    ///
    /// ```
    /// use ormbind_model::Dialect;
    ///
    /// assert_eq!(Dialect::MySQL.quote("order"), "`order`");
    /// assert_eq!(Dialect::PostgreSQL.quote("order"), "\"order\"");
    /// ```
    pub fn quote(&self, text: &str) -> String {
        format!("{}{}{}", self.open_quote(), text, self.close_quote())
    }

    /// Fold an unquoted identifier the way the database stores it
    pub fn fold_unquoted(&self, text: &str) -> String {
        match self.family() {
            DialectFamily::MySQL => text.to_string(),
            DialectFamily::PostgreSQL => text.to_lowercase(),
        }
    }

    /// Maximum identifier length accepted by the database
    pub fn max_identifier_length(&self) -> usize {
        match self.family() {
            DialectFamily::MySQL => 64,
            DialectFamily::PostgreSQL => 63,
        }
    }
}

/// Dialect family groupings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DialectFamily {
    MySQL,
    PostgreSQL,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_family() {
        assert_eq!(Dialect::TiDB.family(), DialectFamily::MySQL);
        assert_eq!(Dialect::MariaDB.family(), DialectFamily::MySQL);
        assert_eq!(Dialect::CockroachDB.family(), DialectFamily::PostgreSQL);
    }

    #[test]
    fn test_quote_characters() {
        assert_eq!(Dialect::MariaDB.quote("user"), "`user`");
        assert_eq!(Dialect::CockroachDB.quote("user"), "\"user\"");
    }

    #[test]
    fn test_fold_unquoted() {
        assert_eq!(Dialect::PostgreSQL.fold_unquoted("OrderLine"), "orderline");
        assert_eq!(Dialect::MySQL.fold_unquoted("OrderLine"), "OrderLine");
    }

    #[test]
    fn test_dialect_deserializes_lowercase() {
        let dialect: Dialect = serde_json::from_str("\"mysql\"").unwrap();
        assert_eq!(dialect, Dialect::MySQL);
        assert_eq!(Dialect::default(), Dialect::PostgreSQL);
    }
}
