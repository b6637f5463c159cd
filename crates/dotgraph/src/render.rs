use crate::{
    DotGraph, EMPTY_KEY, Edge, resolve_edge_attributes, resolve_global_attributes,
    resolve_node_attributes,
};
use std::fmt;
use tracing::debug;

impl DotGraph {
    /// Serializes the graph to DOT text.
    ///
    /// Source nodes are written in key order, each followed by its outgoing
    /// edges in insertion order. Destinations that never appear as a source
    /// get no line of their own.
    pub fn render(&self) -> String {
        let content = self.to_string();
        debug!(
            graph = %self.name,
            nodes = self.node_count(),
            edges = self.edge_count(),
            bytes = content.len(),
            "rendered dot text"
        );
        content
    }

    fn statement_lines(&self) -> Vec<String> {
        let mut lines = self.global_attribute_lines();

        for (from, outgoing) in &self.edges {
            let node_style = resolve_node_attributes(&self.node_patterns, from);
            lines.push(format!("{from}{node_style}"));

            for edge in outgoing {
                if from == EMPTY_KEY && edge.to == EMPTY_KEY {
                    continue;
                }
                lines.push(format!("{from}->{}{}", edge.to, self.edge_style(edge)));
            }
        }

        lines
    }

    fn global_attribute_lines(&self) -> Vec<String> {
        [
            ("graph", &self.graph_options),
            ("node", &self.node_options),
            ("edge", &self.edge_options),
        ]
        .into_iter()
        .filter(|(_, attrs)| !attrs.is_empty())
        .map(|(kind, attrs)| format!("{kind} {}", resolve_global_attributes(attrs)))
        .collect()
    }

    fn edge_style(&self, edge: &Edge) -> String {
        resolve_edge_attributes(&self.edge_patterns, &edge.to, &edge.description).to_string()
    }
}

impl fmt::Display for DotGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "digraph {} {{", graph_id(&self.name))?;
        for line in self.statement_lines() {
            writeln!(f, "{line}")?;
        }
        f.write_str("}")
    }
}

/// Plain identifiers and numerals are written as-is, anything else is quoted.
fn graph_id(name: &str) -> String {
    if is_plain_id(name) || is_numeral(name) {
        return name.to_string();
    }

    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push('"');
    for ch in name.chars() {
        if ch == '"' || ch == '\\' {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}

const KEYWORDS: [&str; 6] = ["node", "edge", "graph", "digraph", "subgraph", "strict"];

fn is_plain_id(value: &str) -> bool {
    if KEYWORDS.iter().any(|keyword| keyword.eq_ignore_ascii_case(value)) {
        return false;
    }

    let mut chars = value.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

fn is_numeral(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    !digits.is_empty()
        && digits.chars().all(|ch| ch.is_ascii_digit() || ch == '.')
        && digits.chars().filter(|ch| *ch == '.').count() <= 1
        && digits != "."
}
