// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # ormbind - Annotation Binder
//!
//! This crate turns persistence annotations on domain classes into the
//! relational mapping model of [`ormbind_model`].
//!
//! ## Overview
//!
//! Binding runs in two passes over a single [`BootSession`]:
//! - **First pass**: every entity is bound by [`bind_entity`], superclasses
//!   before subclasses. Tables, identifiers, discriminators and properties are
//!   created as far as the entities bound so far allow.
//! - **Second pass**: work that needs another entity (foreign keys, join
//!   tables, inverse associations, keys of secondary tables) is queued as
//!   [`SecondPass`] data and run by [`drain`] once every entity exists.
//!
//! ```text
//! AnnotationSource → InheritanceStates → EntityBinder (per class)
//!                                      → SecondPassQueue → Metadata
//! ```
//!
//! ## Resolution Outcomes
//!
//! Functions that may need an entity not bound yet return [`Resolution`]:
//!
//! | Outcome | Meaning |
//! |---------|---------|
//! | `Resolved(T)` | done |
//! | `Deferred(Deferral)` | a dependency is missing, retry later |
//! | `Fatal(MappingError)` | annotation misuse, stop the boot |
//!
//! A deferral that outlives the second-pass drain becomes
//! [`MappingError::Unresolved`].
//!
//! ## Usage
//!
//! ```
//! use ormbind_binder::{BinderConfig, MetadataBuilder};
//! use ormbind_model::Dialect;
//! use ormbind_source::StaticAnnotationSource;
//!
//! let source = StaticAnnotationSource::from_yaml_str(
//!     r#"
//! classes:
//!   - name: com.acme.Customer
//!     annotations:
//!       - name: Entity
//!     members:
//!       - name: id
//!         type_name: long
//!         annotations:
//!           - name: Id
//! "#,
//! )
//! .unwrap();
//!
//! let metadata = MetadataBuilder::new(&source)
//!     .with_config(BinderConfig::new(Dialect::PostgreSQL))
//!     .build()
//!     .unwrap();
//! assert_eq!(metadata.entity_table("com.acme.Customer").unwrap().primary_key_columns().len(), 1);
//! ```

pub mod association;
pub mod callbacks;
pub mod collector;
pub mod column;
pub mod config;
pub mod context;
pub mod discriminator;
pub mod entity;
pub mod error;
pub mod foreign_key;
pub mod identifier;
pub mod inheritance;
pub mod join_column;
pub mod processor;
pub mod property;
pub mod registrations;
pub mod second_pass;
pub mod session;
pub mod table;
pub mod type_binder;

// Re-export commonly used types
pub use collector::{EntityTableXref, KeyColumns, MetadataCollector};
pub use config::{BinderConfig, ConfigError, SharedCacheMode};
pub use context::BindingContext;
pub use entity::{EntityBindingState, bind_entity};
pub use error::{BindResult, Deferral, MappingError, Resolution};
pub use inheritance::{
    ClassCategory, HierarchyPosition, InheritanceState, InheritanceStates, InheritanceStrategy,
    build_inheritance_states,
};
pub use processor::{MetadataBuilder, ordered_classes};
pub use second_pass::{SecondPass, SecondPassPhase, SecondPassQueue, drain};
pub use session::BootSession;
pub use type_binder::{MetaAttributeBinder, TypeBinder, TypeBinderRegistry};
