// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Error types for annotation source operations
//!
//! This module defines the error types used throughout the source layer.

use serde::Serialize;
use thiserror::Error;

/// Result type alias for annotation source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Errors that can occur while reading annotation metadata
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
pub enum SourceError {
    /// Requested class is not known to the source
    #[error("Class '{0}' not found in annotation source")]
    ClassNotFound(String),

    /// An attribute holds a value of the wrong kind
    #[error("Attribute '{attribute}' of '@{annotation}' must be {expected}")]
    InvalidAttribute {
        annotation: String,
        attribute: String,
        expected: String,
    },

    /// The same class was declared twice
    #[error("Class '{0}' declared more than once")]
    DuplicateClass(String),

    /// Failed to deserialize a source document
    #[error("Failed to read annotation source: {0}")]
    Deserialization(String),
}

impl From<serde_yaml::Error> for SourceError {
    fn from(err: serde_yaml::Error) -> Self {
        SourceError::Deserialization(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Deserialization(err.to_string())
    }
}
