// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Named, hierarchy-wide definitions registered before entities are bound.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Generator declared by `@SequenceGenerator`, `@TableGenerator` or
/// `@GenericGenerator`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierGeneratorDefinition {
    pub name: String,
    /// `sequence`, `table` or a custom strategy name
    pub strategy: String,
    pub parameters: IndexMap<String, String>,
    pub declaring_class: String,
}

impl IdentifierGeneratorDefinition {
    pub fn new(
        name: impl Into<String>,
        strategy: impl Into<String>,
        declaring_class: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            strategy: strategy.into(),
            parameters: IndexMap::new(),
            declaring_class: declaring_class.into(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

/// `@NamedQuery` or `@NamedNativeQuery`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedQueryDefinition {
    pub name: String,
    pub query: String,
    pub native: bool,
    pub result_class: Option<String>,
    pub declaring_class: String,
}

/// `@FilterDef`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterDefinition {
    pub name: String,
    pub default_condition: Option<String>,
    /// Parameter name to type name
    pub parameters: IndexMap<String, String>,
}

/// Fetch style override of one association in a fetch profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchOverride {
    pub entity: String,
    pub association: String,
    pub mode: String,
}

/// `@FetchProfile`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchProfile {
    pub name: String,
    pub overrides: Vec<FetchOverride>,
}

/// `@TypeRegistration`: a basic type used for every attribute of a Java type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRegistration {
    pub java_type: String,
    pub type_name: String,
}

/// A `@MappedSuperclass` and the properties it declares
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedSuperclass {
    pub class_name: String,
    /// Nearest entity above it, if any
    pub super_entity: Option<String>,
    pub declared_properties: Vec<String>,
}
