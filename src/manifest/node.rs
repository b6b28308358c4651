use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::debug;

use super::{
    ConfigMap, ConfigMapVolumeSource, Container, ContainerPort, LabelSelector, ObjectMeta,
    PersistentVolumeClaim, PersistentVolumeClaimSpec, PodSpec, PodTemplateMeta, PodTemplateSpec,
    Service, ServicePort, ServiceSpec, StatefulSet, StatefulSetSpec, Volume, VolumeMount,
    VolumeResourceRequirements, CHAIN_NAME_LABEL, CHAIN_NODE_LABEL,
};
use crate::config::GeneratorConfig;
use crate::error::{GenError, Result};

pub const P2P_PORT: u16 = 30300;
pub const RPC_PORT: u16 = 20200;

/// Where the node ConfigMap is mounted inside the container
pub const CONFIG_MOUNT_PATH: &str = "/etc/fisco";
/// Where the per-pod data volume is mounted inside the container
pub const DATA_MOUNT_PATH: &str = "/data";

const CONTAINER_NAME: &str = "bcos";
const DATA_VOLUME: &str = "datadir";
const CONFIG_VOLUME: &str = "node-configs";

/// The three documents written for every node.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeManifests {
    pub config_map: ConfigMap,
    pub service: Service,
    pub stateful_set: StatefulSet,
}

/// `<chain_name>-<node_name>`, shared by the Service and StatefulSet.
pub fn resource_name(chain_name: &str, node_name: &str) -> String {
    format!("{}-{}", chain_name, node_name)
}

pub fn config_map_name(node_name: &str) -> String {
    format!("{}-configs", node_name)
}

fn selector_labels(chain_name: &str, node_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (CHAIN_NAME_LABEL.to_string(), chain_name.to_string()),
        (CHAIN_NODE_LABEL.to_string(), node_name.to_string()),
    ])
}

pub fn node_service(chain_name: &str, node_name: &str) -> Service {
    Service {
        api_version: "v1".to_string(),
        kind: "Service".to_string(),
        metadata: ObjectMeta::named(resource_name(chain_name, node_name)),
        spec: ServiceSpec {
            type_: "ClusterIP".to_string(),
            ports: vec![
                ServicePort {
                    port: P2P_PORT,
                    target_port: P2P_PORT,
                    name: "p2p".to_string(),
                },
                ServicePort {
                    port: RPC_PORT,
                    target_port: RPC_PORT,
                    name: "rpc".to_string(),
                },
            ],
            selector: selector_labels(chain_name, node_name),
        },
    }
}

pub fn node_stateful_set(config: &GeneratorConfig, node_name: &str) -> StatefulSet {
    let labels = selector_labels(&config.chain_name, node_name);

    let container = Container {
        name: CONTAINER_NAME.to_string(),
        image: config.image(),
        image_pull_policy: config.image_pull_policy.to_string(),
        args: vec![
            "-c".to_string(),
            format!("{}/config.ini", CONFIG_MOUNT_PATH),
            "-g".to_string(),
            format!("{}/config.genesis", CONFIG_MOUNT_PATH),
        ],
        ports: vec![
            ContainerPort {
                container_port: P2P_PORT,
                name: "p2p".to_string(),
            },
            ContainerPort {
                container_port: RPC_PORT,
                name: "rpc".to_string(),
            },
        ],
        volume_mounts: vec![
            VolumeMount {
                mount_path: DATA_MOUNT_PATH.to_string(),
                name: DATA_VOLUME.to_string(),
            },
            VolumeMount {
                mount_path: CONFIG_MOUNT_PATH.to_string(),
                name: CONFIG_VOLUME.to_string(),
            },
        ],
    };

    let data_claim = PersistentVolumeClaim {
        api_version: "v1".to_string(),
        kind: "PersistentVolumeClaim".to_string(),
        metadata: ObjectMeta::named(DATA_VOLUME),
        spec: PersistentVolumeClaimSpec {
            access_modes: vec!["ReadWriteOnce".to_string()],
            resources: VolumeResourceRequirements {
                requests: BTreeMap::from([("storage".to_string(), config.storage_size.clone())]),
            },
            storage_class_name: config.storage_class.clone(),
        },
    };

    StatefulSet {
        api_version: "apps/v1".to_string(),
        kind: "StatefulSet".to_string(),
        metadata: ObjectMeta::named(resource_name(&config.chain_name, node_name)),
        spec: StatefulSetSpec {
            replicas: 1,
            selector: LabelSelector {
                match_labels: labels.clone(),
            },
            template: PodTemplateSpec {
                metadata: PodTemplateMeta { labels },
                spec: PodSpec {
                    containers: vec![container],
                    volumes: vec![Volume {
                        config_map: Some(ConfigMapVolumeSource {
                            name: config_map_name(node_name),
                        }),
                        name: CONFIG_VOLUME.to_string(),
                    }],
                },
            },
            volume_claim_templates: vec![data_claim],
        },
    }
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= 253
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Build a ConfigMap holding every regular file directly under `dir`.
///
/// Keys are file names. UTF-8 files go to `data`, anything else is base64
/// encoded into `binaryData`. Subdirectories are skipped.
pub fn config_map_from_dir(name: &str, dir: &Path) -> Result<ConfigMap> {
    let mut entries = fs::read_dir(dir)
        .map_err(|e| GenError::io(dir, e))?
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| GenError::io(dir, e))?;
    entries.sort_by_key(|entry| entry.file_name());

    let mut config_map = ConfigMap {
        api_version: "v1".to_string(),
        kind: "ConfigMap".to_string(),
        metadata: ObjectMeta::named(name),
        data: BTreeMap::new(),
        binary_data: BTreeMap::new(),
    };

    for entry in entries {
        let path = entry.path();
        let metadata = fs::metadata(&path).map_err(|e| GenError::io(&path, e))?;
        if !metadata.is_file() {
            debug!("Skipping {} (not a regular file)", path.display());
            continue;
        }

        let key = entry
            .file_name()
            .into_string()
            .map_err(|_| GenError::parse(&path, "file name is not valid UTF-8"))?;
        if !is_valid_key(&key) {
            return Err(GenError::parse(&path, format!("'{}' is not a valid ConfigMap key", key)));
        }

        let bytes = fs::read(&path).map_err(|e| GenError::io(&path, e))?;
        match String::from_utf8(bytes) {
            Ok(text) => {
                config_map.data.insert(key, text);
            }
            Err(e) => {
                config_map
                    .binary_data
                    .insert(key, STANDARD.encode(e.into_bytes()));
            }
        }
    }

    Ok(config_map)
}
