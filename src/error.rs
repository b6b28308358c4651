use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenError {
    /// An expected input file or directory does not exist
    #[error("Not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Parse error in {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Missing [{section}].{key} in {}", path.display())]
    MissingKey {
        path: PathBuf,
        section: String,
        key: String,
    },

    /// The node's own ordinal does not address an entry of its peer list
    #[error("Node index {index} out of range for peer list of length {len} in {}", path.display())]
    PeerIndex {
        path: PathBuf,
        index: usize,
        len: usize,
    },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{node}: {source}")]
    Node {
        node: String,
        #[source]
        source: Box<GenError>,
    },
}

pub type Result<T> = std::result::Result<T, GenError>;

impl GenError {
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        GenError::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        GenError::Config(msg.into())
    }

    /// Wrap an `io::Error`, turning `NotFound` into the dedicated variant.
    pub fn io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            GenError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            GenError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    pub fn in_node(self, node: impl Into<String>) -> Self {
        GenError::Node {
            node: node.into(),
            source: Box::new(self),
        }
    }

    /// The underlying error, looking through node context.
    pub fn root(&self) -> &GenError {
        match self {
            GenError::Node { source, .. } => source.root(),
            other => other,
        }
    }
}
