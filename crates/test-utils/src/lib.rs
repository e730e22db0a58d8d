// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Testing utilities for ormbind
//!
//! This crate provides common testing components including:
//! - Annotated class fixtures (order domain, inheritance hierarchies, id classes)
//! - Mapping assertions over the bound model
//! - Tracing output for tests

pub mod assertions;
pub mod fixtures;

// Re-exports for convenience
pub use assertions::MappingAssertions;
pub use fixtures::MappingFixtures;

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Route `tracing` output to the test harness, filtered by `RUST_LOG`
///
/// Safe to call from every test; only the first call installs a subscriber.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
