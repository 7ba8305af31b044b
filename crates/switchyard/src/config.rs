//! Persisted alias configuration.
//!
//! The config file is YAML:
//!
//! ```yaml
//! aliases:
//!   inc:
//!     target: math.add
//!     args: [1]
//!     description: add one
//! ```
//!
//! A missing (or empty) file is an empty config. Aliases may target other
//! aliases; [`Config::install`] resolves them in dependency order.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use switchyard_dispatch::{Registry, RegistryError};
use thiserror::Error;
use tracing::debug;

use crate::alias::AliasHandler;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "SWITCHYARD_CONFIG";

/// Config file used when neither `--config` nor the environment names one.
pub const DEFAULT_CONFIG_FILE: &str = "switchyard.yaml";

/// Errors from loading, saving or installing a config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to write config {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize config")]
    Serialize(#[source] serde_yaml::Error),

    #[error("alias '{alias}' targets unknown name '{target}'")]
    UnresolvedAlias { alias: String, target: String },

    #[error("alias '{alias}' is part of a cycle through '{target}'")]
    AliasCycle { alias: String, target: String },

    #[error("alias '{alias}' presets more arguments than '{target}' accepts")]
    TooManyPresetArgs { alias: String, target: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// One persisted alias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasSpec {
    /// Name the alias forwards to.
    pub target: String,

    /// Leading arguments passed before the caller's own.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AliasSpec {
    pub fn new(target: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            target: target.into(),
            args,
            description: None,
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// The whole config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub aliases: BTreeMap<String, AliasSpec>,
}

/// Returns the path used when no config path is given.
pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILE)
}

impl Config {
    /// Loads the config at `path`; a missing file yields an empty config.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Writes the config to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self).map_err(ConfigError::Serialize)?;
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(path, yaml).map_err(write_err)?;
        debug!(path = %path.display(), aliases = self.aliases.len(), "saved config");
        Ok(())
    }

    /// Names of the aliases whose target is `name`.
    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        self.aliases
            .iter()
            .filter(|(_, spec)| spec.target == name)
            .map(|(alias, _)| alias.as_str())
            .collect()
    }

    /// Registers every alias into `registry`.
    ///
    /// An alias is registered once its target is; aliases that can never be
    /// resolved fail the whole install.
    pub fn install(&self, registry: &mut Registry) -> Result<(), ConfigError> {
        let mut pending: Vec<(&String, &AliasSpec)> = self.aliases.iter().collect();

        while !pending.is_empty() {
            let before = pending.len();
            let mut waiting = Vec::new();

            for (alias, spec) in pending {
                match registry.get(&spec.target) {
                    Ok(inner) => {
                        let handler = AliasHandler::new(
                            spec.target.clone(),
                            inner,
                            spec.args.clone(),
                            spec.description.clone(),
                        );
                        if !handler.is_satisfiable() {
                            return Err(ConfigError::TooManyPresetArgs {
                                alias: alias.clone(),
                                target: spec.target.clone(),
                            });
                        }
                        registry.register(alias, handler)?;
                    }
                    Err(_) if self.aliases.contains_key(&spec.target) => {
                        waiting.push((alias, spec));
                    }
                    Err(_) => {
                        return Err(ConfigError::UnresolvedAlias {
                            alias: alias.clone(),
                            target: spec.target.clone(),
                        })
                    }
                }
            }

            if waiting.len() == before {
                if let Some((alias, spec)) = waiting.first() {
                    return Err(ConfigError::AliasCycle {
                        alias: alias.to_string(),
                        target: spec.target.clone(),
                    });
                }
            }
            pending = waiting;
        }

        Ok(())
    }
}
