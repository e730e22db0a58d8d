// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Identifiers
//!
//! Logical and physical names of tables and columns.
//!
//! An [`Identifier`] remembers whether it was written quoted. Quoted
//! identifiers compare exactly, unquoted ones compare case-insensitively,
//! which is what [`Identifier::matches`] and [`Identifier::canonical_name`]
//! implement. Annotation text can request quoting with either back-ticks or
//! double quotes: `` `Order` `` and `"Order"` both parse to a quoted `Order`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;

/// A possibly quoted SQL identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    text: String,
    #[serde(default)]
    quoted: bool,
}

impl Identifier {
    /// Create an identifier with explicit quoting
    pub fn new(text: impl Into<String>, quoted: bool) -> Self {
        Self {
            text: text.into(),
            quoted,
        }
    }

    /// Create an unquoted identifier
    pub fn unquoted(text: impl Into<String>) -> Self {
        Self::new(text, false)
    }

    /// Create a quoted identifier
    pub fn quoted(text: impl Into<String>) -> Self {
        Self::new(text, true)
    }

    /// Parse annotation text into an identifier
    ///
    /// Leading and trailing whitespace is ignored. Text wrapped in back-ticks
    /// or double quotes becomes a quoted identifier.
    ///
    /// # Returns
    ///
    /// `None` when the text is empty, which annotations use to mean
    /// "not specified".
    ///
    /// # Examples
    ///
    /// ```
    /// use ormbind_model::Identifier;
    ///
    /// let id = Identifier::parse("`Order`").unwrap();
    /// assert!(id.is_quoted());
    /// assert_eq!(id.text(), "Order");
    /// assert!(Identifier::parse("  ").is_none());
    /// ```
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        if is_quoted(trimmed) {
            Some(Self::quoted(&trimmed[1..trimmed.len() - 1]))
        } else {
            Some(Self::unquoted(trimmed))
        }
    }

    /// Parse, forcing the result to be quoted when `force_quote` is set
    pub fn parse_with_quoting(text: &str, force_quote: bool) -> Option<Self> {
        Self::parse(text).map(|id| if force_quote { id.into_quoted() } else { id })
    }

    /// The identifier text, without quotes
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the identifier was written quoted
    pub fn is_quoted(&self) -> bool {
        self.quoted
    }

    /// Turn this identifier into a quoted one
    pub fn into_quoted(self) -> Self {
        Self {
            text: self.text,
            quoted: true,
        }
    }

    /// Key used for lookups: exact text when quoted, lower case otherwise
    pub fn canonical_name(&self) -> String {
        if self.quoted {
            self.text.clone()
        } else {
            self.text.to_lowercase()
        }
    }

    /// Whether two identifiers denote the same database object
    pub fn matches(&self, other: &Identifier) -> bool {
        self.canonical_name() == other.canonical_name()
    }

    /// Whether this identifier denotes the object named by raw annotation text
    pub fn matches_text(&self, text: &str) -> bool {
        Identifier::parse(text).is_some_and(|other| self.matches(&other))
    }

    /// Render with back-ticks when quoted, the dialect-neutral form
    pub fn render(&self) -> String {
        if self.quoted {
            format!("`{}`", self.text)
        } else {
            self.text.clone()
        }
    }

    /// Render as the given dialect expects it in SQL text
    pub fn render_for(&self, dialect: Dialect) -> String {
        if self.quoted {
            dialect.quote(&self.text)
        } else {
            dialect.fold_unquoted(&self.text)
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Whether raw text is wrapped in back-ticks or double quotes
pub fn is_quoted(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() >= 2
        && ((bytes[0] == b'`' && bytes[bytes.len() - 1] == b'`')
            || (bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"'))
}

/// Strip one level of identifier quoting from raw text
pub fn unquote(text: &str) -> &str {
    if is_quoted(text) {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quoting_styles() {
        let backtick = Identifier::parse("`Order`").unwrap();
        let double = Identifier::parse("\"Order\"").unwrap();
        assert_eq!(backtick, double);
        assert!(backtick.is_quoted());

        let plain = Identifier::parse("ORDERS").unwrap();
        assert!(!plain.is_quoted());
        assert_eq!(plain.text(), "ORDERS");
    }

    #[test]
    fn test_parse_empty_is_none() {
        assert!(Identifier::parse("").is_none());
        assert!(Identifier::parse("   ").is_none());
    }

    #[test]
    fn test_single_quote_char_is_not_quoting() {
        let id = Identifier::parse("`").unwrap();
        assert!(!id.is_quoted());
    }

    #[test]
    fn test_matches_is_case_insensitive_unless_quoted() {
        let upper = Identifier::unquoted("ORDER_ID");
        let lower = Identifier::unquoted("order_id");
        assert!(upper.matches(&lower));

        let quoted = Identifier::quoted("Order_Id");
        assert!(!quoted.matches(&Identifier::quoted("order_id")));
        assert!(!quoted.matches(&Identifier::unquoted("Order_Id")));
    }

    #[test]
    fn test_render_for_dialect() {
        let id = Identifier::quoted("Order");
        assert_eq!(id.render_for(Dialect::MySQL), "`Order`");
        assert_eq!(id.render_for(Dialect::PostgreSQL), "\"Order\"");
        assert_eq!(
            Identifier::unquoted("Order").render_for(Dialect::PostgreSQL),
            "order"
        );
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("`a`"), "a");
        assert_eq!(unquote("a"), "a");
    }
}
