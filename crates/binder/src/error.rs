// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Error Handling
//!
//! Binding can fail in two ways:
//!
//! - **Fatal**: the annotations are contradictory or incomplete. Boot aborts
//!   with a [`MappingError`] naming the class, property and annotation.
//! - **Deferred**: something the binding depends on (usually another entity's
//!   table or key) is not bound yet. The work is kept as a second pass and
//!   retried later; see [`Resolution`].
//!
//! A deferral that can never be satisfied ends as [`MappingError::Unresolved`].

use ormbind_source::SourceError;
use serde::Serialize;

/// Result type alias for binding operations
pub type BindResult<T> = Result<T, MappingError>;

/// Errors raised while binding annotations to the mapping model
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq, Serialize)]
pub enum MappingError {
    /// Two annotations that exclude each other were both given
    #[error("Class '{class}' cannot be annotated with both @{first} and @{second}")]
    ConflictingAnnotations {
        class: String,
        first: String,
        second: String,
    },

    /// An annotation is used where it is not allowed
    #[error("Invalid use of @{annotation} on '{class}': {reason}")]
    AnnotationMisuse {
        class: String,
        annotation: String,
        reason: String,
    },

    /// An annotation is used on a property where it is not allowed
    #[error("Invalid use of @{annotation} on property '{entity}.{property}': {reason}")]
    PropertyMisuse {
        entity: String,
        property: String,
        annotation: String,
        reason: String,
    },

    /// A class referenced by a mapping is not known to the annotation source
    #[error("Class '{class}' referenced by '{referenced_by}' is not known")]
    UnknownClass {
        class: String,
        referenced_by: String,
    },

    #[error("Entity '{0}' is bound more than once")]
    DuplicateEntity(String),

    /// An import name already maps to another entity
    #[error("Import name '{name}' maps to both '{existing}' and '{entity}'")]
    DuplicateImport {
        name: String,
        existing: String,
        entity: String,
    },

    /// A single-table subclass names a table other than the root's
    #[error(
        "Entity '{entity}' is a SINGLE_TABLE subclass and cannot declare table '{declared}': its rows live in '{root_table}'"
    )]
    InheritanceTableMismatch {
        entity: String,
        declared: String,
        root_table: String,
    },

    /// A character discriminator needs an explicit value
    #[error(
        "Entity '{entity}' has a character discriminator and must declare @DiscriminatorValue"
    )]
    MissingDiscriminatorValue { entity: String },

    /// Only the root of a SINGLE_TABLE hierarchy may declare the discriminator
    #[error(
        "Entity '{entity}' declares @{annotation} but is not the root of its SINGLE_TABLE hierarchy"
    )]
    NonRootDiscriminator { entity: String, annotation: String },

    /// `@Id` properties and `@IdClass` properties differ
    #[error(
        "Entity '{entity}' with @IdClass({id_class}): properties missing in the id class: {missing_in_id_class:?}, properties missing in the entity: {missing_in_entity:?}"
    )]
    IdClassMismatch {
        entity: String,
        id_class: String,
        missing_in_id_class: Vec<String>,
        missing_in_entity: Vec<String>,
    },

    #[error("Entity '{entity}' has no identifier: annotate a property with @Id or @EmbeddedId")]
    MissingIdentifier { entity: String },

    /// `@TableOptions(appliesTo)` names a table the entity does not map to
    #[error("@{annotation} on '{entity}' applies to unknown table '{table}'")]
    UnknownComplementaryTable {
        entity: String,
        annotation: String,
        table: String,
    },

    /// A property or custom SQL names a secondary table that was not declared
    #[error("'{entity}' references secondary table '{table}' which it does not declare")]
    UnknownSecondaryTable { entity: String, table: String },

    #[error("Property '{entity}.{property}' uses unknown identifier generator '{generator}'")]
    UnknownGenerator {
        entity: String,
        property: String,
        generator: String,
    },

    #[error("Identifier generator '{name}' is declared by both '{first}' and '{second}'")]
    DuplicateGenerator {
        name: String,
        first: String,
        second: String,
    },

    #[error("Named query '{name}' is declared by both '{first}' and '{second}'")]
    DuplicateQuery {
        name: String,
        first: String,
        second: String,
    },

    #[error("Duplicate @{annotation} named '{name}' declared by '{class}'")]
    DuplicateDefinition {
        annotation: String,
        name: String,
        class: String,
    },

    /// `@Filter` without a condition, and no `@FilterDef` default
    #[error(
        "@Filter '{filter}' on '{entity}' has no condition and no @FilterDef default condition"
    )]
    FilterWithoutCondition { entity: String, filter: String },

    /// `mappedBy` names a property that cannot own the association
    #[error("Property '{entity}.{property}' is mapped by '{target}.{mapped_by}': {reason}")]
    MappedByResolution {
        entity: String,
        property: String,
        target: String,
        mapped_by: String,
        reason: String,
    },

    /// Explicit join columns do not match the referenced key
    #[error(
        "Property '{entity}.{property}' declares {declared} join columns but '{target}' has {expected} key columns"
    )]
    JoinColumnCountMismatch {
        entity: String,
        property: String,
        target: String,
        declared: usize,
        expected: usize,
    },

    /// An association targets a class that is not an entity
    #[error("Property '{entity}.{property}' targets '{target}' which is not an entity")]
    UnknownReferencedEntity {
        entity: String,
        property: String,
        target: String,
    },

    /// A type binder annotation names a binder nobody registered
    #[error("@{annotation} on '{class}' requires type binder '{binder}' which is not registered")]
    UnknownTypeBinder {
        class: String,
        annotation: String,
        binder: String,
    },

    /// Two callbacks of one kind on one class
    #[error("Class '{class}' declares more than one @{callback} method")]
    DuplicateCallback { class: String, callback: String },

    /// A fetch profile override names an unknown entity or association
    #[error("Fetch profile '{profile}' refers to unknown association '{entity}.{association}'")]
    UnknownFetchProfileTarget {
        profile: String,
        entity: String,
        association: String,
    },

    /// A deferred binding whose dependency never became available
    #[error("Unable to resolve '{entity}': {dependency} is not available ({reason})")]
    Unresolved {
        entity: String,
        dependency: String,
        reason: String,
    },

    /// Binding was driven in an impossible order; this is a caller bug
    #[error("Assertion failure while binding '{class}': {message}")]
    AssertionFailure { class: String, message: String },

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Invalid binder configuration: {0}")]
    Config(String),
}

impl MappingError {
    /// Whether the failure came from a dependency that was never bound,
    /// rather than from the annotations themselves
    pub fn is_recoverable(&self) -> bool {
        matches!(self, MappingError::Unresolved { .. })
    }
}

/// A dependency that is not bound yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deferral {
    /// Entity whose binding waits
    pub entity: String,
    /// What it waits for, e.g. `table of 'Customer'`
    pub dependency: String,
    pub reason: String,
}

impl Deferral {
    pub fn new(
        entity: impl Into<String>,
        dependency: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            entity: entity.into(),
            dependency: dependency.into(),
            reason: reason.into(),
        }
    }

    /// The fatal form, used once no more progress can be made
    pub fn into_error(self) -> MappingError {
        MappingError::Unresolved {
            entity: self.entity,
            dependency: self.dependency,
            reason: self.reason,
        }
    }
}

/// Outcome of a resolution step
///
/// Represents the three possible states after attempting to resolve
/// something that may depend on bindings not made yet.
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<T> {
    Resolved(T),
    /// Retry once more of the mapping graph is bound
    Deferred(Deferral),
    Fatal(MappingError),
}

impl<T> Resolution<T> {
    pub fn deferred(
        entity: impl Into<String>,
        dependency: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Resolution::Deferred(Deferral::new(entity, dependency, reason))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resolution<U> {
        match self {
            Resolution::Resolved(value) => Resolution::Resolved(f(value)),
            Resolution::Deferred(deferral) => Resolution::Deferred(deferral),
            Resolution::Fatal(error) => Resolution::Fatal(error),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Resolution::Deferred(_))
    }

    /// Treat a deferral as fatal
    pub fn into_result(self) -> BindResult<T> {
        match self {
            Resolution::Resolved(value) => Ok(value),
            Resolution::Deferred(deferral) => Err(deferral.into_error()),
            Resolution::Fatal(error) => Err(error),
        }
    }
}

impl<T> From<BindResult<T>> for Resolution<T> {
    fn from(result: BindResult<T>) -> Self {
        match result {
            Ok(value) => Resolution::Resolved(value),
            Err(error) => Resolution::Fatal(error),
        }
    }
}

/// Unwrap a [`Resolution`], returning early with the deferral or error
#[macro_export]
macro_rules! try_resolve {
    ($expr:expr) => {
        match $expr {
            $crate::error::Resolution::Resolved(value) => value,
            $crate::error::Resolution::Deferred(deferral) => {
                return $crate::error::Resolution::Deferred(deferral);
            }
            $crate::error::Resolution::Fatal(error) => {
                return $crate::error::Resolution::Fatal(error);
            }
        }
    };
}

/// Unwrap a [`BindResult`] inside a function returning [`Resolution`]
#[macro_export]
macro_rules! try_bind {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(error) => return $crate::error::Resolution::Fatal(error),
        }
    };
}
