// Copyright (c) 2026 agrisys
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/agrisys/agrinode-rs

//! Node registry - in-memory store loaded once from the inventory file

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use super::model::Node;

/// Errors raised while loading the node inventory. These are the only fatal
/// errors in the system - the process must not start without its registry.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read node inventory at {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse node inventory at {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("duplicate node id '{0}' in inventory")]
    DuplicateId(String),
}

/// In-memory store of all nodes, keyed by node id
///
/// Built once at startup; the id set is fixed for the process lifetime.
/// Iteration order is stable (sorted by id).
#[derive(Debug)]
pub struct NodeRegistry {
    nodes: BTreeMap<String, Node>,
}

impl NodeRegistry {
    /// Load the registry from a JSON inventory file (an array of node records).
    ///
    /// Records missing `devices` get the default watering/humidity pair;
    /// missing `controls` default to an empty map. Duplicate ids are rejected.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path).map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let records: Vec<Node> = serde_json::from_str(&content).map_err(|source| {
            StoreError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })?;

        let registry = Self::from_nodes(records)?;
        info!("Loaded {} nodes from {:?}", registry.len(), path);
        Ok(registry)
    }

    /// Build a registry from already-parsed node records.
    pub fn from_nodes(records: Vec<Node>) -> Result<Self, StoreError> {
        let mut nodes = BTreeMap::new();
        for mut node in records {
            node.ensure_default_devices();
            let id = node.id.clone();
            if nodes.insert(id.clone(), node).is_some() {
                return Err(StoreError::DuplicateId(id));
            }
        }
        Ok(Self { nodes })
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.values_mut()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
