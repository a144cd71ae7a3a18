pub mod source;
pub mod tracing;

use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

pub use source::{ConfigSource, DotenvFile, Layered, ProcessEnv};

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable '{0}' is required but not set")]
    MissingEnvVar(String),

    #[error("Failed to parse environment variable '{key}': {details}")]
    ParseError { key: String, details: String },

    #[error("Failed to read override file '{path}': {details}")]
    OverrideFile { path: String, details: String },
}

/// Application environment (dev = local terminal, prod = log aggregation)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn from_source(source: &dyn ConfigSource) -> Self {
        let app_env = source.get_or("APP_ENV", "development");

        if app_env.eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// Trait for configuration that can be loaded from environment variables
///
/// Implementors read from a [`ConfigSource`] so the binary can layer an
/// override file under the process environment before anything is built.
pub trait FromEnv: Sized {
    fn from_source(source: &dyn ConfigSource) -> Result<Self, ConfigError>;
}

/// Parse a value from `source`, falling back to `default` when the key is unset or blank
pub fn parse_or<T>(source: &dyn ConfigSource, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match source.non_empty(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::ParseError {
            key: key.to_string(),
            details: e.to_string(),
        }),
        None => Ok(default),
    }
}
