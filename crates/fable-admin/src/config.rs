//! Server configuration.
//!
//! Defaults suit a local authoring session. Two environment variables
//! override them:
//!
//! - `FABLE_STORIES_ROOT`: directory holding one subdirectory per character.
//! - `FABLE_BIND`: socket address to listen on, e.g. `0.0.0.0:8080`.

use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;

use fable_graph::layout::LayoutConfig;

/// Environment variable overriding [`AdminConfig::stories_root`].
pub const STORIES_ROOT_VAR: &str = "FABLE_STORIES_ROOT";
/// Environment variable overriding [`AdminConfig::bind_addr`].
pub const BIND_VAR: &str = "FABLE_BIND";

/// Errors produced while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {var} value '{value}': {source}")]
    InvalidBindAddr {
        var: &'static str,
        value: String,
        #[source]
        source: AddrParseError,
    },
}

/// Configuration for the admin server.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub stories_root: PathBuf,
    pub bind_addr: SocketAddr,
    pub layout: LayoutConfig,
}

impl Default for AdminConfig {
    /// `public/stories` served on `127.0.0.1:5174` with the default grid.
    fn default() -> Self {
        Self {
            stories_root: PathBuf::from("public/stories"),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5174)),
            layout: LayoutConfig::default(),
        }
    }
}

impl AdminConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overridden by `lookup`, which maps a variable name to its value.
    ///
    /// Empty values are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let get = |var| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(root) = get(STORIES_ROOT_VAR) {
            config.stories_root = PathBuf::from(root);
        }
        if let Some(bind) = get(BIND_VAR) {
            config.bind_addr = bind
                .trim()
                .parse()
                .map_err(|source| ConfigError::InvalidBindAddr {
                    var: BIND_VAR,
                    value: bind.clone(),
                    source,
                })?;
        }
        Ok(config)
    }
}
