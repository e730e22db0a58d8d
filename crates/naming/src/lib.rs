// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # ormbind - Naming Strategies
//!
//! Pluggable naming capabilities consumed by the binder:
//!
//! - [`ImplicitNamingStrategy`]: logical names for tables and columns the
//!   mapping leaves unnamed, derived from structured name sources
//! - [`PhysicalNamingStrategy`]: logical to physical identifiers for a
//!   [`Dialect`](ormbind_model::Dialect)
//!
//! Strategies can also be chosen by name from configuration through
//! [`ImplicitNamingKind`] and [`PhysicalNamingKind`].

pub mod implicit;
pub mod physical;
pub mod source;

use serde::{Deserialize, Serialize};

pub use implicit::{
    ComponentPathNamingStrategy, DEFAULT_DISCRIMINATOR_COLUMN, ImplicitNamingStrategy,
    JpaCompliantNamingStrategy,
};
pub use physical::{
    IdentityPhysicalNaming, PhysicalNamingStrategy, SnakeCasePhysicalNaming, to_snake_case,
};
pub use source::{
    AttributePath, EntityNaming, ImplicitBasicColumnNameSource,
    ImplicitDiscriminatorColumnNameSource, ImplicitEntityNameSource,
    ImplicitIdentifierColumnNameSource, ImplicitJoinColumnNameSource, ImplicitJoinTableNameSource,
    ImplicitPrimaryKeyJoinColumnNameSource, JoinColumnNature,
};

/// Built-in implicit naming strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImplicitNamingKind {
    #[default]
    JpaCompliant,
    ComponentPath,
}

impl ImplicitNamingKind {
    pub fn strategy(&self) -> Box<dyn ImplicitNamingStrategy> {
        match self {
            ImplicitNamingKind::JpaCompliant => Box::new(JpaCompliantNamingStrategy),
            ImplicitNamingKind::ComponentPath => Box::new(ComponentPathNamingStrategy),
        }
    }
}

/// Built-in physical naming strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhysicalNamingKind {
    #[default]
    Identity,
    SnakeCase,
}

impl PhysicalNamingKind {
    pub fn strategy(&self) -> Box<dyn PhysicalNamingStrategy> {
        match self {
            PhysicalNamingKind::Identity => Box::new(IdentityPhysicalNaming),
            PhysicalNamingKind::SnakeCase => Box::new(SnakeCasePhysicalNaming),
        }
    }
}
