use crate::{DotGraphError, PatternRules};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Canonical key of the empty identifier.
pub const EMPTY_KEY: &str = "\"\"";

/// String attribute map used for every style layer. Names keep the case they
/// were given; they are lowercased only when serialized.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes {
    values: BTreeMap<String, String>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn merge(&mut self, other: &Attributes) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Attributes::new();
        for (key, value) in iter {
            attrs.set(key, value);
        }
        attrs
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Attributes {
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub to: String,
    pub description: String,
}

/// Directed graph keyed by canonical node keys.
///
/// Every node that was added explicitly or used as an edge source owns an
/// outgoing edge bucket. A node that only ever appears as a destination has no
/// bucket of its own. Mutation goes through `&mut self`; callers sharing a
/// graph across threads must serialize access themselves.
#[derive(Clone, Debug)]
pub struct DotGraph {
    pub(crate) name: String,
    pub(crate) edges: BTreeMap<String, Vec<Edge>>,
    pub(crate) graph_options: Attributes,
    pub(crate) node_options: Attributes,
    pub(crate) edge_options: Attributes,
    pub(crate) node_patterns: PatternRules,
    pub(crate) edge_patterns: PatternRules,
}

impl DotGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            edges: BTreeMap::new(),
            graph_options: Attributes::new(),
            node_options: Attributes::new(),
            edge_options: Attributes::new(),
            node_patterns: PatternRules::default(),
            edge_patterns: PatternRules::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers a node even if it never takes part in an edge.
    pub fn add_node(&mut self, name: &str) {
        self.edges.entry(canonical_key(name)).or_default();
    }

    /// Adds `from -> to`. A second edge between the same pair is ignored and
    /// the first description is kept.
    pub fn add_directed_edge(&mut self, from: &str, to: &str, description: &str) {
        let from = canonical_key(from);
        let to = canonical_key(to);

        let outgoing = self.edges.entry(from).or_default();
        if outgoing.iter().any(|edge| edge.to == to) {
            return;
        }

        outgoing.push(Edge {
            to,
            description: description.to_string(),
        });
    }

    pub fn set_graph_options(&mut self, options: Attributes) {
        self.graph_options.merge(&options);
    }

    pub fn set_node_graph_options(&mut self, options: Attributes) {
        self.node_options.merge(&options);
    }

    pub fn set_edge_graph_options(&mut self, options: Attributes) {
        self.edge_options.merge(&options);
    }

    /// Styles every node whose canonical (quoted) key matches `pattern`.
    pub fn add_node_graph_pattern_options(
        &mut self,
        pattern: &str,
        options: Attributes,
    ) -> Result<(), DotGraphError> {
        self.node_patterns.insert(pattern, options)?;
        debug!(pattern, target_kind = "node", "registered pattern rule");
        Ok(())
    }

    /// Styles every edge whose destination key matches `pattern`. The source
    /// key is never tested.
    pub fn add_edge_graph_pattern_options(
        &mut self,
        pattern: &str,
        options: Attributes,
    ) -> Result<(), DotGraphError> {
        self.edge_patterns.insert(pattern, options)?;
        debug!(pattern, target_kind = "edge", "registered pattern rule");
        Ok(())
    }

    pub fn graph_options(&self) -> &Attributes {
        &self.graph_options
    }

    pub fn node_graph_options(&self) -> &Attributes {
        &self.node_options
    }

    pub fn edge_graph_options(&self) -> &Attributes {
        &self.edge_options
    }

    pub fn node_patterns(&self) -> &PatternRules {
        &self.node_patterns
    }

    pub fn edge_patterns(&self) -> &PatternRules {
        &self.edge_patterns
    }

    /// Direct destinations of `name`, in the order the edges were added.
    pub fn dependencies(&self, name: &str) -> Vec<String> {
        self.edges
            .get(&canonical_key(name))
            .map(|outgoing| outgoing.iter().map(|edge| edge.to.clone()).collect())
            .unwrap_or_default()
    }

    /// Sources with an edge into `name`, each listed once.
    pub fn dependents(&self, name: &str) -> Vec<String> {
        let key = canonical_key(name);
        self.edges
            .iter()
            .filter(|(_, outgoing)| outgoing.iter().any(|edge| edge.to == key))
            .map(|(from, _)| from.clone())
            .collect()
    }

    pub fn contains_node(&self, name: &str) -> bool {
        self.edges.contains_key(&canonical_key(name))
    }

    pub fn outgoing_edges(&self, name: &str) -> Option<&[Edge]> {
        self.edges.get(&canonical_key(name)).map(Vec::as_slice)
    }

    pub fn node_keys(&self) -> impl Iterator<Item = &str> {
        self.edges.keys().map(String::as_str)
    }

    /// Number of nodes that own an edge bucket.
    pub fn node_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }
}

/// Normalizes an external node name into its quoted canonical key.
///
/// Surrounding whitespace and one trailing `/` are removed before quoting.
/// Input that already is a quoted key comes back unchanged, so applying the
/// function twice gives the same result as applying it once.
pub fn canonical_key(name: &str) -> String {
    let trimmed = name.trim();
    if is_quoted_key(trimmed) {
        return trimmed.to_string();
    }

    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    let mut key = String::with_capacity(trimmed.len() + 2);
    key.push('"');
    for ch in trimmed.chars() {
        if ch == '"' || ch == '\\' {
            key.push('\\');
        }
        key.push(ch);
    }
    key.push('"');
    key
}

fn is_quoted_key(value: &str) -> bool {
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        return false;
    };

    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                if chars.next().is_none() {
                    return false;
                }
            }
            '"' => return false,
            _ => {}
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_key_trims_and_strips_trailing_slash_expected_quoted() {
        assert_eq!(canonical_key("  github.com/pkg/ "), "\"github.com/pkg\"");
        assert_eq!(canonical_key("nodeA"), "\"nodeA\"");
        assert_eq!(canonical_key(""), EMPTY_KEY);
        assert_eq!(canonical_key("/"), EMPTY_KEY);
    }

    #[test]
    fn canonical_key_only_one_trailing_slash_removed_expected_inner_slash_kept() {
        assert_eq!(canonical_key("a//"), "\"a/\"");
    }

    #[test]
    fn canonical_key_applied_twice_expected_same_key() {
        let inputs = [
            "",
            " ",
            "/",
            "\"",
            "\"\"",
            "nodeA",
            "nodeA/",
            " spaced name / ",
            "with \"quotes\"",
            "back\\slash\\",
            "\"already quoted\"",
            "\"broken\"quote\"",
        ];
        for input in inputs {
            let once = canonical_key(input);
            assert_eq!(canonical_key(&once), once, "input {input:?}");
        }
    }

    #[test]
    fn canonical_key_embedded_quote_expected_escaped() {
        assert_eq!(canonical_key("a\"b"), "\"a\\\"b\"");
    }

    #[test]
    fn add_node_twice_expected_single_bucket() {
        let mut graph = DotGraph::new("g");
        graph.add_node("nodeA");
        graph.add_node(" nodeA/");

        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.outgoing_edges("nodeA").map(<[Edge]>::len), Some(0));
    }

    #[test]
    fn add_directed_edge_duplicate_expected_first_description_kept() {
        let mut graph = DotGraph::new("g");
        graph.add_directed_edge("a", "b", "first");
        graph.add_directed_edge("a", "b/", "second");

        let edges = graph.outgoing_edges("a").expect("bucket should exist");
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].description, "first");
    }

    #[test]
    fn add_directed_edge_pure_destination_expected_no_bucket() {
        let mut graph = DotGraph::new("g");
        graph.add_directed_edge("a", "b", "");

        assert!(graph.contains_node("a"));
        assert!(!graph.contains_node("b"));
        assert_eq!(graph.dependents("b"), vec!["\"a\"".to_string()]);
    }

    #[test]
    fn set_graph_options_repeated_expected_accumulated_with_overwrite() {
        let mut graph = DotGraph::new("g");
        graph.set_graph_options(Attributes::from([("bgcolor", "#333333"), ("rankdir", "LR")]));
        graph.set_graph_options(Attributes::from([("bgcolor", "#ffffff")]));

        assert_eq!(graph.graph_options().get("bgcolor"), Some("#ffffff"));
        assert_eq!(graph.graph_options().get("rankdir"), Some("LR"));
    }

    #[test]
    fn add_node_pattern_invalid_regex_expected_error_and_no_rule() {
        let mut graph = DotGraph::new("g");
        let error = graph
            .add_node_graph_pattern_options("node(", Attributes::from([("color", "red")]))
            .expect_err("pattern must be rejected");

        assert!(matches!(
            error,
            DotGraphError::InvalidPattern { ref pattern, .. } if pattern == "node("
        ));
        assert!(graph.node_patterns().is_empty());
    }

    #[test]
    fn dependencies_unknown_node_expected_empty() {
        let graph = DotGraph::new("g");
        assert!(graph.dependencies("missing").is_empty());
        assert!(graph.dependents("missing").is_empty());
    }

    #[test]
    fn dependencies_insertion_order_expected_preserved() {
        let mut graph = DotGraph::new("g");
        graph.add_directed_edge("a", "z", "");
        graph.add_directed_edge("a", "m", "");
        graph.add_directed_edge("a", "b", "");

        assert_eq!(graph.dependencies("a"), vec!["\"z\"", "\"m\"", "\"b\""]);
        assert_eq!(graph.edge_count(), 3);
    }
}
