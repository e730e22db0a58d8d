// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # ormbind - Mapping Model
//!
//! This crate provides the relational mapping model produced by binding
//! persistence annotations. The model is designed to:
//! - Describe tables, columns and keys independently of any SQL dialect
//! - Record how each entity, property and collection maps onto those tables
//! - Serialize to JSON for inspection and snapshot tests

pub mod collection;
pub mod definitions;
pub mod dialect;
pub mod identifier;
pub mod metadata;
pub mod persistent_class;
pub mod relational;
pub mod value;

// Re-export commonly used types
pub use collection::{Collection, CollectionElement, CollectionKind};
pub use definitions::{
    FetchOverride, FetchProfile, FilterDefinition, IdentifierGeneratorDefinition,
    MappedSuperclass, NamedQueryDefinition, TypeRegistration,
};
pub use dialect::{Dialect, DialectFamily};
pub use identifier::Identifier;
pub use metadata::Metadata;
pub use persistent_class::{
    CacheConcurrency, CacheSettings, CallbackDefinition, CallbackType, CustomSql, CustomSqlSet,
    Discriminator, DiscriminatorType, ExecuteCheck, FilterConfiguration, InheritanceType, Join,
    JoinOrigin, Loader, OptimisticLockStyle, PersistentClass, PersistentClassKind,
    PolymorphismType,
};
pub use relational::{
    CheckConstraint, Column, ForeignKey, Index, OnDeleteAction, PrimaryKey, QualifiedTableName,
    Selectable, Table, TableId, UniqueKey,
};
pub use value::{
    Component, DependantValue, IdentifierGenerator, Property, SimpleValue, ToOne, ToOneKind, Value,
};
