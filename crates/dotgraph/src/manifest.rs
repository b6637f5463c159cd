use crate::{Attributes, DotGraph, DotGraphError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEdge {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label: String,
}

/// JSON description of a graph and its style layers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphManifest {
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<String>,
    #[serde(default)]
    pub edges: Vec<ManifestEdge>,
    #[serde(default)]
    pub graph_options: Attributes,
    #[serde(default)]
    pub node_options: Attributes,
    #[serde(default)]
    pub edge_options: Attributes,
    #[serde(default)]
    pub node_patterns: BTreeMap<String, Attributes>,
    #[serde(default)]
    pub edge_patterns: BTreeMap<String, Attributes>,
}

impl GraphManifest {
    pub fn from_json(source: &str) -> Result<Self, DotGraphError> {
        serde_json::from_str(source).map_err(|error| {
            DotGraphError::Manifest(format!("failed deserializing manifest: {error}"))
        })
    }

    pub fn load_from_path(path: &Path) -> Result<Self, DotGraphError> {
        let bytes = fs::read(path).map_err(|error| {
            DotGraphError::Manifest(format!(
                "failed reading manifest file '{}': {}",
                path.display(),
                error
            ))
        })?;
        serde_json::from_slice(&bytes).map_err(|error| {
            DotGraphError::Manifest(format!(
                "failed deserializing manifest file '{}': {}",
                path.display(),
                error
            ))
        })
    }

    /// Builds the graph. Nodes are registered before edges; an invalid
    /// pattern aborts the build.
    pub fn to_graph(&self) -> Result<DotGraph, DotGraphError> {
        let mut graph = DotGraph::new(self.name.clone());

        for node in &self.nodes {
            graph.add_node(node);
        }
        for edge in &self.edges {
            graph.add_directed_edge(&edge.from, &edge.to, &edge.label);
        }

        graph.set_graph_options(self.graph_options.clone());
        graph.set_node_graph_options(self.node_options.clone());
        graph.set_edge_graph_options(self.edge_options.clone());

        for (pattern, attrs) in &self.node_patterns {
            graph.add_node_graph_pattern_options(pattern, attrs.clone())?;
        }
        for (pattern, attrs) in &self.edge_patterns {
            graph.add_edge_graph_pattern_options(pattern, attrs.clone())?;
        }

        Ok(graph)
    }
}
