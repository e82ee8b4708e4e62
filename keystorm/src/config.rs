//! This module controls configuration parsing from the end user, providing a
//! convenience mechanism for the rest of the program. Crashes are most likely
//! to originate from this code, intentionally.
//!
//! Every field has a default, so running without a configuration file floods
//! `127.0.0.1:2104` with the built-in key space every ten seconds.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Environment variable holding configuration contents. Takes priority over
/// any configuration file.
pub const CONFIG_ENV_VAR: &str = "KEYSTORM_CONFIG";

/// Errors produced by [`Config`]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Error for a serde [`serde_yaml`].
    #[error("Failed to deserialize yaml: {0}")]
    SerdeYaml(#[from] serde_yaml::Error),
    /// Error reading config file
    #[error("Failed to read config file {path:?}: {source}")]
    ReadFile {
        /// File path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: Box<io::Error>,
    },
    /// The key space configuration is invalid
    #[error("Invalid key space configuration: {0}")]
    Payload(#[from] keystorm_payload::Error),
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    2104
}

fn default_delay_seconds() -> u64 {
    10
}

/// Main configuration struct for this program
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// The carbon relay host
    #[serde(default = "default_host")]
    pub host: String,
    /// The carbon relay plaintext port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Seconds to sleep between cycles
    #[serde(default = "default_delay_seconds")]
    pub delay_seconds: u64,
    /// The seed for random operations, drawn from the OS when absent
    #[serde(default)]
    pub seed: Option<[u8; 32]>,
    /// The generated key space
    #[serde(default)]
    pub key_space: keystorm_payload::graphite::Config,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            delay_seconds: default_delay_seconds(),
            seed: None,
            key_space: keystorm_payload::graphite::Config::default(),
        }
    }
}

impl Config {
    /// Load the configuration. Contents come from [`CONFIG_ENV_VAR`] if set,
    /// else from `path` if given, else the defaults apply.
    ///
    /// # Errors
    ///
    /// Function will error if the file cannot be read, the contents do not
    /// parse or the key space is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let contents = if let Ok(contents) = env::var(CONFIG_ENV_VAR) {
            debug!("Using config from env var '{CONFIG_ENV_VAR}'");
            contents
        } else if let Some(path) = path {
            debug!("Attempting to open configuration file at: {}", path.display());
            fs::read_to_string(path).map_err(|source| Error::ReadFile {
                path: path.to_path_buf(),
                source: Box::new(source),
            })?
        } else {
            debug!("No configuration supplied, using defaults");
            return Ok(Self::default());
        };
        Self::parse(&contents)
    }

    /// Parse and validate configuration contents.
    ///
    /// # Errors
    ///
    /// Function will error if the contents do not parse or the key space is
    /// invalid.
    pub fn parse(contents: &str) -> Result<Self, Error> {
        let config: Self = serde_yaml::from_str(contents)?;
        config.key_space.valid()?;
        Ok(config)
    }

    /// Override `delay_seconds` from the positional command-line argument.
    ///
    /// Only a plain run of ASCII digits is accepted. Anything else leaves the
    /// delay untouched and returns `false`.
    pub fn override_delay(&mut self, arg: &str) -> bool {
        if arg.is_empty() || !arg.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        match arg.parse() {
            Ok(delay) => {
                self.delay_seconds = delay;
                true
            }
            Err(_) => false,
        }
    }
}
