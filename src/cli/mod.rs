//! Command-line interface
//!
//! Flag names follow the original generator script (`--work_dir`,
//! `--storage_calss`, ...) so existing deployment scripts keep working.
//! Every setting is optional here; unset flags leave the settings file or
//! built-in default in place.

use clap::Parser;
use std::path::PathBuf;

use crate::config::{GeneratorConfig, ImagePullPolicy};

#[derive(Parser, Debug, Default)]
#[command(name = "fisco-k8s", author, about, long_about = None)]
#[command(disable_version_flag = true)]
pub struct Cli {
    /// The output directory of yaml files [default: .]
    #[arg(long = "work_dir")]
    pub work_dir: Option<PathBuf>,

    /// The name of chain [default: test-chain]
    #[arg(long = "chain_name")]
    pub chain_name: Option<String>,

    /// Image version tag [default: v3.5.0]
    #[arg(long = "version")]
    pub version: Option<String>,

    /// Image pull policy [default: IfNotPresent]
    #[arg(long = "image_pull_policy", value_enum)]
    pub image_pull_policy: Option<ImagePullPolicy>,

    /// Storage class name of K8s [default: local-path]
    #[arg(long = "storage_calss", visible_alias = "storage_class")]
    pub storage_class: Option<String>,

    /// Directory containing the node<N> folders [default: fisco/nodes/127.0.0.1]
    #[arg(long = "nodes_dir")]
    pub nodes_dir: Option<PathBuf>,

    /// YAML settings file
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Keep processing remaining nodes after one fails
    #[arg(long = "keep_going")]
    pub keep_going: bool,

    /// Log filter used when RUST_LOG is unset [default: info]
    #[arg(long = "log_level")]
    pub log_level: Option<String>,

    /// Also write JSON logs to daily files in this directory
    #[arg(long = "log_dir")]
    pub log_dir: Option<PathBuf>,
}

impl Cli {
    /// Overlay the flags that were given on top of `config`.
    pub fn apply(&self, mut config: GeneratorConfig) -> GeneratorConfig {
        if let Some(work_dir) = &self.work_dir {
            config.work_dir = work_dir.clone();
        }
        if let Some(chain_name) = &self.chain_name {
            config.chain_name = chain_name.clone();
        }
        if let Some(version) = &self.version {
            config.version = version.clone();
        }
        if let Some(policy) = self.image_pull_policy {
            config.image_pull_policy = policy;
        }
        if let Some(storage_class) = &self.storage_class {
            config.storage_class = storage_class.clone();
        }
        if let Some(nodes_dir) = &self.nodes_dir {
            config.nodes_dir = nodes_dir.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(dir) = &self.log_dir {
            config.logging.dir = Some(dir.clone());
        }
        config
    }
}
