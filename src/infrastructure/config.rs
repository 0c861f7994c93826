//! Configuration management
//!
//! Settings come from an optional YAML file, then `DROVER_*` environment
//! variables override individual keys.

use super::container::ContainerRuntime;
use crate::executor::Repo;
use crate::pipeline::{CompileOptions, EscalationWhitelist, MountSpec};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "DROVER_";

/// Errors raised while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Read {
        /// Path of the file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid YAML for this schema
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// An override has a value that cannot be used
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Rejected value.
        value: String,
    },
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level
    pub log_level: String,
    /// Container runtime used by `run`
    pub runtime: ContainerRuntime,
    /// Force a fresh pull of plugin images
    pub pull: bool,
    /// Inject `DEBUG=true` into plugin steps
    pub debug: bool,
    /// Publish plugins allowed to run privileged
    pub escalate: EscalationWhitelist,
    /// Mounts added to every step
    pub mounts: Vec<MountSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            runtime: ContainerRuntime::Docker,
            pull: false,
            debug: false,
            escalate: EscalationWhitelist::default(),
            mounts: Vec::new(),
        }
    }
}

impl Config {
    /// Parses a YAML document; missing keys keep their defaults
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Reads a YAML config file
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Self::from_yaml(&yaml)
    }

    /// Applies `DROVER_*` overrides from the process environment
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for unusable values.
    pub fn with_env(self) -> Result<Self, ConfigError> {
        self.with_vars(std::env::vars())
    }

    /// Applies `DROVER_*` overrides from `vars`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for unusable values.
    pub fn with_vars<I>(mut self, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match name {
                "LOG_LEVEL" => self.log_level = value,
                "RUNTIME" => {
                    self.runtime = value
                        .parse()
                        .map_err(|()| invalid(&key, &value))?;
                }
                "PULL" => self.pull = parse_bool(&key, &value)?,
                "DEBUG" => self.debug = parse_bool(&key, &value)?,
                "ESCALATE" => {
                    self.escalate = value
                        .split(',')
                        .map(str::trim)
                        .filter(|image| !image.is_empty())
                        .collect();
                }
                _ => tracing::debug!(key = %key, "ignoring unknown override"),
            }
        }
        Ok(self)
    }

    /// Builds compile options for a job of `repo`
    #[must_use]
    pub fn compile_options(&self, repo: &Repo) -> CompileOptions {
        CompileOptions {
            pull: self.pull,
            debug: self.debug,
            trusted: repo.trusted,
            cache_dir: repo.full_name.clone(),
            mounts: self.mounts.clone(),
            whitelist: self.escalate.clone(),
        }
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.runtime, ContainerRuntime::Docker);
        assert!(!config.pull);
        assert_eq!(config.escalate, EscalationWhitelist::default());
    }

    #[test]
    fn test_config_from_yaml() {
        let config = Config::from_yaml(
            r"
log_level: debug
runtime: podman
pull: true
escalate:
  - plugins/drone-docker
  - acme/kaniko
mounts:
  - from: drone_workspace
    to: /drone
",
        )
        .unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.runtime, ContainerRuntime::Podman);
        assert!(config.pull);
        assert!(!config.debug);
        assert!(config.escalate.permits("acme/kaniko:latest"));
        assert!(!config.escalate.permits("plugins/drone-gcr"));
        assert_eq!(config.mounts, vec![MountSpec::new("drone_workspace", "/drone")]);
    }

    #[test]
    fn test_config_empty_yaml_is_default() {
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
    }

    #[test]
    fn test_config_rejects_bad_yaml() {
        let err = Config::from_yaml("pull: [not, a, bool]").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_config_load_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("drover.yml");
        std::fs::write(&path, "debug: true\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert!(config.debug);
    }

    #[test]
    fn test_config_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/drover.yml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/drover.yml"));
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::default()
            .with_vars(vars(&[
                ("DROVER_LOG_LEVEL", "trace"),
                ("DROVER_RUNTIME", "podman"),
                ("DROVER_PULL", "1"),
                ("DROVER_DEBUG", "true"),
                ("DROVER_ESCALATE", "acme/kaniko, plugins/drone-docker,"),
                ("PATH", "/usr/bin"),
            ]))
            .unwrap();

        assert_eq!(config.log_level, "trace");
        assert_eq!(config.runtime, ContainerRuntime::Podman);
        assert!(config.pull);
        assert!(config.debug);
        assert_eq!(
            config.escalate.iter().collect::<Vec<_>>(),
            vec!["acme/kaniko", "plugins/drone-docker"]
        );
    }

    #[test]
    fn test_env_override_rejects_bad_values() {
        let err = Config::default()
            .with_vars(vars(&[("DROVER_PULL", "sometimes")]))
            .unwrap_err();
        assert!(err.to_string().contains("DROVER_PULL"));

        let err = Config::default()
            .with_vars(vars(&[("DROVER_RUNTIME", "lxc")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_compile_options_follow_repo() {
        let mut repo = Repo::new("octocat", "hello-world");
        repo.trusted = true;

        let options = Config::default().compile_options(&repo);
        assert!(options.trusted);
        assert_eq!(options.cache_dir, "octocat/hello-world");
        assert_eq!(options.whitelist, EscalationWhitelist::default());
    }
}
