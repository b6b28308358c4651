//! Manifest generation
//!
//! Turns the `node<N>` directories written by the chain builder into a
//! cluster-ready tree:
//!
//! ```text
//! <work_dir>/<chain_name>/<node>/conf/{config.ini, config.genesis, nodes.json, ...}
//! <work_dir>/<chain_name>/<node>/{node-configs.yaml, node-svc.yaml, node-sts.yaml}
//! ```
//!
//! Every run regenerates the whole tree. Existing files are overwritten and
//! nothing is cleaned up beforehand.

pub mod discovery;
pub mod rewrite;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info, info_span, warn};

use crate::config::GeneratorConfig;
use crate::error::{GenError, Result};
use crate::ini::IniDocument;
use crate::manifest::node::{config_map_name, node_service, node_stateful_set, NodeManifests};
use crate::manifest::{config_map_from_dir, to_yaml};

pub use discovery::{discover_nodes, parse_node_index, NodeDir};

pub const CONFIG_MAP_FILE: &str = "node-configs.yaml";
pub const SERVICE_FILE: &str = "node-svc.yaml";
pub const STATEFUL_SET_FILE: &str = "node-sts.yaml";

/// What to do with the remaining nodes once one fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    #[default]
    Abort,
    KeepGoing,
}

/// Output locations and manifests of one processed node
#[derive(Debug, Clone)]
pub struct GeneratedNode {
    pub name: String,
    pub index: usize,
    pub output_dir: PathBuf,
    pub manifests: NodeManifests,
}

#[derive(Debug, Default)]
pub struct GenerationReport {
    pub generated: Vec<GeneratedNode>,
    pub failed: Vec<GenError>,
}

impl GenerationReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct Generator {
    config: GeneratorConfig,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Process every node under the configured nodes directory.
    ///
    /// With [`FailurePolicy::Abort`] the first node error is returned. With
    /// [`FailurePolicy::KeepGoing`] node errors are collected in the report;
    /// only a failure to list the nodes directory is returned directly.
    pub fn run(&self, policy: FailurePolicy) -> Result<GenerationReport> {
        let nodes = discover_nodes(&self.config.nodes_dir)?;
        if nodes.is_empty() {
            warn!("No node directories found in {}", self.config.nodes_dir.display());
        }

        let mut report = GenerationReport::default();
        for node in &nodes {
            match self.process_node(node) {
                Ok(generated) => report.generated.push(generated),
                Err(e) => {
                    let e = e.in_node(&node.name);
                    match policy {
                        FailurePolicy::Abort => return Err(e),
                        FailurePolicy::KeepGoing => {
                            error!("{}", e);
                            report.failed.push(e);
                        }
                    }
                }
            }
        }

        info!(
            "Done! {} node(s) generated, {} failed",
            report.generated.len(),
            report.failed.len()
        );
        Ok(report)
    }

    pub fn node_output_dir(&self, node_name: &str) -> PathBuf {
        self.config.chain_output_dir().join(node_name)
    }

    pub fn process_node(&self, node: &NodeDir) -> Result<GeneratedNode> {
        let _span = info_span!("node", name = %node.name).entered();
        info!("processing node: {} node_id {} ...", node.path.display(), node.index);

        let output_dir = self.node_output_dir(&node.name);
        let conf_dir = output_dir.join("conf");
        fs::create_dir_all(&conf_dir).map_err(|e| GenError::io(&conf_dir, e))?;

        info!("modify config.ini ...");
        let ini_path = node.config_ini();
        let mut ini = IniDocument::load(&ini_path)?;
        rewrite::rewrite_config_ini(&mut ini, &ini_path)?;
        ini.write(&conf_dir.join("config.ini"))?;

        info!("copy config.genesis ...");
        copy_file(&node.config_genesis(), &conf_dir)?;

        info!("modify nodes.json ...");
        let nodes_path = node.nodes_json();
        let peers = rewrite::load_json(&nodes_path)?;
        let peers = rewrite::rewrite_nodes_json(&nodes_path, peers, &self.config.chain_name, node.index)?;
        write_file(&conf_dir.join("nodes.json"), &rewrite::nodes_json_to_string(&peers)?)?;

        info!("copy conf/*");
        copy_dir_files(&node.conf_dir(), &conf_dir)?;

        info!("create configmap from all confs ...");
        let config_map_path = output_dir.join(CONFIG_MAP_FILE);
        remove_if_exists(&config_map_path)?;
        let config_map = config_map_from_dir(&config_map_name(&node.name), &conf_dir)?;
        write_file(&config_map_path, &to_yaml(&config_map)?)?;

        let service = node_service(&self.config.chain_name, &node.name);
        write_file(&output_dir.join(SERVICE_FILE), &to_yaml(&service)?)?;

        let stateful_set = node_stateful_set(&self.config, &node.name);
        write_file(&output_dir.join(STATEFUL_SET_FILE), &to_yaml(&stateful_set)?)?;

        Ok(GeneratedNode {
            name: node.name.clone(),
            index: node.index,
            output_dir,
            manifests: NodeManifests {
                config_map,
                service,
                stateful_set,
            },
        })
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).map_err(|e| GenError::io(path, e))
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(GenError::io(path, e)),
        _ => Ok(()),
    }
}

fn copy_file(src: &Path, dest_dir: &Path) -> Result<()> {
    let name = src
        .file_name()
        .ok_or_else(|| GenError::parse(src, "path has no file name"))?;
    fs::copy(src, dest_dir.join(name)).map_err(|e| GenError::io(src, e))?;
    Ok(())
}

/// Copy the regular files directly under `src` into `dest`. Subdirectories
/// are not descended into.
fn copy_dir_files(src: &Path, dest: &Path) -> Result<()> {
    let entries = fs::read_dir(src).map_err(|e| GenError::io(src, e))?;
    for entry in entries {
        let path = entry.map_err(|e| GenError::io(src, e))?.path();
        if path.is_file() {
            copy_file(&path, dest)?;
        } else {
            warn!("skipping non-regular file {}", path.display());
        }
    }
    Ok(())
}
