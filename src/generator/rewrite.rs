//! In-cluster rewrites of a node's local configuration

use std::fmt::Display;
use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{GenError, Result};
use crate::ini::IniDocument;
use crate::manifest::node::{CONFIG_MOUNT_PATH, DATA_MOUNT_PATH, P2P_PORT, RPC_PORT};

/// `(section, key, value)` triples forced into every node's config.ini.
pub fn cluster_overrides() -> Vec<(&'static str, &'static str, String)> {
    vec![
        ("p2p", "listen_port", P2P_PORT.to_string()),
        ("rpc", "listen_port", RPC_PORT.to_string()),
        ("p2p", "nodes_path", format!("{}/", CONFIG_MOUNT_PATH)),
        ("cert", "ca_path", format!("{}/", CONFIG_MOUNT_PATH)),
        ("security", "private_key_path", format!("{}/node.pem", CONFIG_MOUNT_PATH)),
        ("storage", "data_path", DATA_MOUNT_PATH.to_string()),
        ("log", "log_path", format!("{}/log", DATA_MOUNT_PATH)),
    ]
}

/// Apply [`cluster_overrides`] to a parsed config.ini read from `path`.
pub fn rewrite_config_ini(doc: &mut IniDocument, path: &Path) -> Result<()> {
    for (section, key, value) in cluster_overrides() {
        let old = doc
            .replace(section, key, &value)
            .ok_or_else(|| GenError::MissingKey {
                path: path.to_path_buf(),
                section: section.to_string(),
                key: key.to_string(),
            })?;
        info!("[{}].{} now is {}, change to {}", section, key, old, value);
    }
    Ok(())
}

/// In-cluster address of the node with the given ordinal.
pub fn peer_address(chain_name: &str, index: usize) -> String {
    format!("{}-node{}:{}", chain_name, index, P2P_PORT)
}

/// Map every peer to its in-cluster address and drop the node's own entry.
///
/// The position of an entry in the list is its node ordinal, so the original
/// addresses are only logged. Fails when `own_index` is not a position in
/// `peers`.
pub fn rewrite_peers<T: Display>(
    path: &Path,
    peers: &[T],
    chain_name: &str,
    own_index: usize,
) -> Result<Vec<String>> {
    if own_index >= peers.len() {
        return Err(GenError::PeerIndex {
            path: path.to_path_buf(),
            index: own_index,
            len: peers.len(),
        });
    }

    Ok(peers
        .iter()
        .enumerate()
        .filter_map(|(i, old)| {
            debug!("old node {} address {}", i, old);
            (i != own_index).then(|| peer_address(chain_name, i))
        })
        .collect())
}

fn rewrite_peer_array(path: &Path, peers: &mut Value, chain_name: &str, own_index: usize) -> Result<()> {
    let list = peers
        .as_array()
        .ok_or_else(|| GenError::parse(path, "peer list is not an array"))?;
    let rewritten = rewrite_peers(path, list.as_slice(), chain_name, own_index)?;
    *peers = Value::from(rewritten);
    Ok(())
}

/// Rewrite a parsed nodes.json.
///
/// The peer list is the `nodes` array of the top-level object; other keys are
/// kept as they are. A bare top-level array is treated as the peer list itself.
pub fn rewrite_nodes_json(path: &Path, mut doc: Value, chain_name: &str, own_index: usize) -> Result<Value> {
    if doc.is_array() {
        rewrite_peer_array(path, &mut doc, chain_name, own_index)?;
        return Ok(doc);
    }

    let peers = doc
        .as_object_mut()
        .ok_or_else(|| GenError::parse(path, "expected an object or array"))?
        .get_mut("nodes")
        .ok_or_else(|| GenError::parse(path, "missing \"nodes\" array"))?;
    rewrite_peer_array(path, peers, chain_name, own_index)?;
    Ok(doc)
}

pub fn load_json(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path).map_err(|e| GenError::io(path, e))?;
    serde_json::from_str(&text).map_err(|e| GenError::parse(path, e.to_string()))
}

/// Single-line JSON with a space after every `,` and `:`.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }
}

/// Render a rewritten nodes.json the way the chain tooling writes it:
/// one line, `", "` and `": "` separators, no trailing newline.
pub fn nodes_json_to_string(doc: &Value) -> Result<String> {
    let mut out = Vec::new();
    doc.serialize(&mut Serializer::with_formatter(&mut out, SpacedFormatter))?;
    String::from_utf8(out).map_err(|e| GenError::Config(format!("nodes.json is not UTF-8: {}", e)))
}
