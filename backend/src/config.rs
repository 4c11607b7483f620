//! Runtime configuration.
//!
//! Values come from the environment (a `.env` file is loaded first if
//! present). Command-line flags override them.

use std::env;
use std::str::FromStr;

use crate::api::logs::log_warning;
use crate::transform::row::DEFAULT_MAX_ITEM_INDEX;

/// Default HTTP port for `qsflat serve`.
pub const DEFAULT_PORT: u16 = 3000;

/// Default output file name.
pub const DEFAULT_OUTPUT_NAME: &str = "parsed_output.csv";

/// Maximum upload size accepted by the HTTP API (50 MB).
pub const MAX_UPLOAD_SIZE: usize = 50 * 1024 * 1024;

/// Environment variable names.
pub const ENV_MAX_ITEM_INDEX: &str = "QSFLAT_MAX_ITEM_INDEX";
pub const ENV_PORT: &str = "QSFLAT_PORT";
pub const ENV_OUTPUT_NAME: &str = "QSFLAT_OUTPUT_NAME";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Highest item index accepted in a row before the row is skipped
    pub max_item_index: usize,
    /// Port for the HTTP server
    pub port: u16,
    /// Output file name when none is given
    pub output_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_item_index: DEFAULT_MAX_ITEM_INDEX,
            port: DEFAULT_PORT,
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
        }
    }
}

impl Config {
    /// Load `.env` (if any) and read the configuration from the environment.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    /// Unparseable values are reported and replaced by defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            max_item_index: parse_or(&lookup, ENV_MAX_ITEM_INDEX, defaults.max_item_index),
            port: parse_or(&lookup, ENV_PORT, defaults.port),
            output_name: lookup(ENV_OUTPUT_NAME)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.output_name),
        }
    }
}

fn parse_or<T: FromStr + std::fmt::Display>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log_warning(format!("Ignoring {}={:?}, using {}", key, raw, default));
            default
        }),
    }
}
