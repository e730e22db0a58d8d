// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Binder Configuration
//!
//! Settings that change how annotations are interpreted.
//!
//! ## Configuration Structure
//!
//! - SQL dialect used to derive physical identifiers
//! - Default catalog and schema for tables that do not name one
//! - Identifier quoting and naming strategies
//! - Discriminator defaults for JOINED hierarchies
//! - Second-level cache defaults
//! - Second-pass retry policy
//!
//! ## Example
//!
//! ```
//! use ormbind_binder::BinderConfig;
//!
//! let settings = serde_json::json!({
//!     "ormbind": { "dialect": "mysql", "defaultSchema": "sales" }
//! });
//! let config = BinderConfig::from_settings(&settings).unwrap();
//! assert_eq!(config.default_schema.as_deref(), Some("sales"));
//! assert!(config.retry_deferred_second_passes);
//! ```

use ormbind_model::{CacheConcurrency, Dialect};
use ormbind_naming::{ImplicitNamingKind, PhysicalNamingKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MappingError;

/// Key of the binder settings inside a settings payload
pub const SETTINGS_KEY: &str = "ormbind";

/// Which entities use the second-level cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SharedCacheMode {
    /// Every entity
    All,
    /// No entity
    None,
    /// Entities annotated `@Cacheable` or `@Cacheable(true)`
    #[default]
    EnableSelective,
    /// Every entity not annotated `@Cacheable(false)`
    DisableSelective,
}

/// Binder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BinderConfig {
    pub dialect: Dialect,
    pub default_catalog: Option<String>,
    pub default_schema: Option<String>,
    /// Quote every identifier derived from the mapping
    pub globally_quoted_identifiers: bool,
    /// Create a discriminator for JOINED hierarchies without
    /// `@DiscriminatorColumn`
    pub implicit_discriminators_for_joined: bool,
    /// Ignore `@DiscriminatorColumn` in JOINED hierarchies
    pub ignore_explicit_discriminators_for_joined: bool,
    pub shared_cache_mode: SharedCacheMode,
    /// Concurrency used when `@Cache` does not give one
    pub default_cache_concurrency: Option<CacheConcurrency>,
    /// Retry deferred second passes while progress is made; when `false`
    /// the first deferral is fatal
    pub retry_deferred_second_passes: bool,
    pub implicit_naming: ImplicitNamingKind,
    pub physical_naming: PhysicalNamingKind,
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            default_catalog: None,
            default_schema: None,
            globally_quoted_identifiers: false,
            implicit_discriminators_for_joined: false,
            ignore_explicit_discriminators_for_joined: false,
            shared_cache_mode: SharedCacheMode::default(),
            default_cache_concurrency: None,
            retry_deferred_second_passes: true,
            implicit_naming: ImplicitNamingKind::default(),
            physical_naming: PhysicalNamingKind::default(),
        }
    }
}

impl BinderConfig {
    /// Create a configuration for a dialect with all other settings defaulted
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Default::default()
        }
    }

    pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
        self.default_schema = Some(schema.into());
        self
    }

    pub fn with_default_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.default_catalog = Some(catalog.into());
        self
    }

    pub fn with_globally_quoted_identifiers(mut self, quoted: bool) -> Self {
        self.globally_quoted_identifiers = quoted;
        self
    }

    pub fn with_implicit_discriminators_for_joined(mut self, enabled: bool) -> Self {
        self.implicit_discriminators_for_joined = enabled;
        self
    }

    pub fn with_ignore_explicit_discriminators_for_joined(mut self, ignore: bool) -> Self {
        self.ignore_explicit_discriminators_for_joined = ignore;
        self
    }

    pub fn with_shared_cache_mode(mut self, mode: SharedCacheMode) -> Self {
        self.shared_cache_mode = mode;
        self
    }

    pub fn with_default_cache_concurrency(mut self, concurrency: CacheConcurrency) -> Self {
        self.default_cache_concurrency = Some(concurrency);
        self
    }

    pub fn with_retry_deferred_second_passes(mut self, retry: bool) -> Self {
        self.retry_deferred_second_passes = retry;
        self
    }

    pub fn with_implicit_naming(mut self, kind: ImplicitNamingKind) -> Self {
        self.implicit_naming = kind;
        self
    }

    pub fn with_physical_naming(mut self, kind: PhysicalNamingKind) -> Self {
        self.physical_naming = kind;
        self
    }

    /// Validate the configuration
    ///
    /// Checks that:
    /// - Default catalog and schema names are not blank
    /// - Default names fit the dialect's identifier length
    /// - Caching every entity has a default concurrency strategy
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (setting, value) in [
            ("defaultCatalog", &self.default_catalog),
            ("defaultSchema", &self.default_schema),
        ] {
            if let Some(name) = value {
                if name.trim().is_empty() {
                    return Err(ConfigError::BlankName {
                        setting: setting.to_string(),
                    });
                }
                let limit = self.dialect.max_identifier_length();
                if name.len() > limit {
                    return Err(ConfigError::NameTooLong {
                        setting: setting.to_string(),
                        name: name.clone(),
                        limit,
                    });
                }
            }
        }

        if self.shared_cache_mode == SharedCacheMode::All
            && self.default_cache_concurrency.is_none()
        {
            return Err(ConfigError::MissingCacheConcurrency);
        }

        Ok(())
    }

    /// Parse the binder settings from a settings payload
    ///
    /// Expected shape:
    /// {
    ///   "ormbind": {
    ///     "dialect": "mysql" | "postgresql" | ...,
    ///     "defaultSchema": "...",
    ///     "retryDeferredSecondPasses": true
    ///   }
    /// }
    ///
    /// A payload without the `ormbind` key yields the defaults.
    pub fn from_settings(settings: &Value) -> Result<Self, ConfigError> {
        let config = match settings.get(SETTINGS_KEY) {
            Some(section) => serde_json::from_value::<Self>(section.clone())
                .map_err(|err| ConfigError::Parse(err.to_string()))?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse the binder settings from a YAML document holding the fields
    /// at top level
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Setting '{setting}' must not be blank")]
    BlankName { setting: String },

    #[error("Setting '{setting}' value '{name}' exceeds the dialect limit of {limit} characters")]
    NameTooLong {
        setting: String,
        name: String,
        limit: usize,
    },

    /// `ALL` cache mode without a default concurrency
    #[error("sharedCacheMode ALL requires defaultCacheConcurrency")]
    MissingCacheConcurrency,

    #[error("Failed to parse binder settings: {0}")]
    Parse(String),
}

impl From<ConfigError> for MappingError {
    fn from(err: ConfigError) -> Self {
        MappingError::Config(err.to_string())
    }
}
