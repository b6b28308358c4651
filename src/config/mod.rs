//! Generator Configuration
//!
//! Provides functionality for:
//! - Default generator settings
//! - Loading settings from a YAML file
//! - Settings validation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{GenError, Result};

pub const CONFIG_FILE_NAME: &str = "fisco-k8s.yml";

/// Kubernetes container image pull policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum ImagePullPolicy {
    #[default]
    #[value(name = "IfNotPresent")]
    IfNotPresent,
    #[value(name = "Always")]
    Always,
}

impl ImagePullPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImagePullPolicy::IfNotPresent => "IfNotPresent",
            ImagePullPolicy::Always => "Always",
        }
    }
}

impl fmt::Display for ImagePullPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Output root; manifests land in `<work_dir>/<chain_name>/<node>`
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
    /// Prefix for every generated resource name
    #[serde(default = "default_chain_name")]
    pub chain_name: String,
    /// Node image tag
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub image_pull_policy: ImagePullPolicy,
    #[serde(default = "default_storage_class")]
    pub storage_class: String,
    /// Directory holding the `node<N>` folders written by the chain builder
    #[serde(default = "default_nodes_dir")]
    pub nodes_dir: PathBuf,
    #[serde(default = "default_image_repository")]
    pub image_repository: String,
    /// Size requested by each node's data volume claim
    #[serde(default = "default_storage_size")]
    pub storage_size: String,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log filter used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Directory for JSON log files
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            chain_name: default_chain_name(),
            version: default_version(),
            image_pull_policy: ImagePullPolicy::default(),
            storage_class: default_storage_class(),
            nodes_dir: default_nodes_dir(),
            image_repository: default_image_repository(),
            storage_size: default_storage_size(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: None,
        }
    }
}

fn default_work_dir() -> PathBuf { PathBuf::from(".") }
fn default_chain_name() -> String { "test-chain".to_string() }
fn default_version() -> String { "v3.5.0".to_string() }
fn default_storage_class() -> String { "local-path".to_string() }
fn default_nodes_dir() -> PathBuf { PathBuf::from("fisco/nodes/127.0.0.1") }
fn default_image_repository() -> String { "fiscoorg/fiscobcos".to_string() }
fn default_storage_size() -> String { "10Gi".to_string() }
fn default_log_level() -> String { "info".to_string() }

impl GeneratorConfig {
    /// Load settings.
    ///
    /// An explicit path must exist. Without one, `./fisco-k8s.yml` and then
    /// `<config dir>/fisco-k8s/config.yml` are tried before falling back to
    /// defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_file(path);
        }

        let candidates = [
            Some(PathBuf::from(CONFIG_FILE_NAME)),
            dirs::config_dir().map(|p| p.join("fisco-k8s").join("config.yml")),
        ];

        for path in candidates.iter().flatten() {
            if path.is_file() {
                return Self::load_from_file(path);
            }
        }

        debug!("No settings file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        debug!("Loading settings from {}", path.display());
        let contents = fs::read_to_string(path).map_err(|e| GenError::io(path, e))?;

        serde_yaml::from_str(&contents).map_err(|e| {
            GenError::config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.chain_name.is_empty() {
            return Err(GenError::config("chain name must not be empty"));
        }
        let valid_chars = self
            .chain_name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        let alnum_edges = self
            .chain_name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric())
            && self
                .chain_name
                .chars()
                .last()
                .is_some_and(|c| c.is_ascii_alphanumeric());
        if !valid_chars || !alnum_edges {
            return Err(GenError::config(format!(
                "chain name '{}' must consist of lowercase alphanumerics or '-' and start and end with an alphanumeric",
                self.chain_name
            )));
        }
        if self.version.trim().is_empty() {
            return Err(GenError::config("image version must not be empty"));
        }
        if self.storage_class.trim().is_empty() {
            return Err(GenError::config("storage class must not be empty"));
        }
        if self.storage_size.trim().is_empty() {
            return Err(GenError::config("storage size must not be empty"));
        }
        Ok(())
    }

    /// `<repository>:<version>`
    pub fn image(&self) -> String {
        format!("{}:{}", self.image_repository, self.version)
    }

    pub fn chain_output_dir(&self) -> PathBuf {
        self.work_dir.join(&self.chain_name)
    }
}
