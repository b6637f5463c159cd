use crate::{Attributes, DotGraphError};
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;

/// A compiled pattern paired with the attributes applied to every key it
/// matches. Matching is an unanchored search over the quoted canonical key.
#[derive(Clone, Debug)]
pub struct PatternRule {
    pattern: String,
    regex: Regex,
    attrs: Attributes,
}

impl PatternRule {
    pub fn new(pattern: impl Into<String>, attrs: Attributes) -> Result<Self, DotGraphError> {
        let pattern = pattern.into();
        let regex = Regex::new(&pattern).map_err(|source| DotGraphError::InvalidPattern {
            pattern: pattern.clone(),
            source,
        })?;
        Ok(Self {
            pattern,
            regex,
            attrs,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }
}

/// Pattern rules keyed by their source pattern. Iteration follows the
/// lexicographic order of the pattern strings.
#[derive(Clone, Debug, Default)]
pub struct PatternRules {
    rules: BTreeMap<String, PatternRule>,
}

impl PatternRules {
    /// Registers `pattern`, replacing the attributes of an existing rule with
    /// the same pattern. An invalid pattern leaves the collection unchanged.
    pub fn insert(&mut self, pattern: &str, attrs: Attributes) -> Result<(), DotGraphError> {
        let rule = PatternRule::new(pattern, attrs)?;
        self.rules.insert(pattern.to_string(), rule);
        Ok(())
    }

    pub fn get(&self, pattern: &str) -> Option<&PatternRule> {
        self.rules.get(pattern)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PatternRule> {
        self.rules.values()
    }

    pub fn matching<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a PatternRule> + 'a {
        self.rules.values().filter(move |rule| rule.matches(key))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Resolved, ordered attribute list for a single DOT statement.
///
/// Names are lowercased on insertion. Pushing a name that is already present
/// replaces its value but keeps its original position.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AttributeList {
    entries: Vec<(String, String)>,
}

impl AttributeList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &str, value: &str) {
        let name = name.to_lowercase();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, existing_value)) => *existing_value = value.to_string(),
            None => self.entries.push((name, value.to_string())),
        }
    }

    pub fn extend_from(&mut self, attrs: &Attributes) {
        for (name, value) in attrs.iter() {
            self.push(name, value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for AttributeList {
    /// Writes `[name="value" ...]`, or nothing for an empty list.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            return Ok(());
        }

        f.write_str("[")?;
        for (index, (name, value)) in self.entries.iter().enumerate() {
            if index > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{name}=\"{}\"", escape_value(value))?;
        }
        f.write_str("]")
    }
}

pub fn resolve_global_attributes(attrs: &Attributes) -> AttributeList {
    let mut list = AttributeList::new();
    list.extend_from(attrs);
    list
}

pub fn resolve_node_attributes(rules: &PatternRules, node_key: &str) -> AttributeList {
    let mut list = AttributeList::new();
    for rule in rules.matching(node_key) {
        list.extend_from(rule.attrs());
    }
    list
}

/// The label comes first; edge rules are tested against `to_key` only.
pub fn resolve_edge_attributes(
    rules: &PatternRules,
    to_key: &str,
    description: &str,
) -> AttributeList {
    let mut list = AttributeList::new();
    if !description.is_empty() {
        list.push("label", description);
    }
    for rule in rules.matching(to_key) {
        list.extend_from(rule.attrs());
    }
    list
}

/// Escapes bare double quotes. Existing backslash escapes such as `\n` are
/// left intact.
fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                escaped.push('\\');
                match chars.next() {
                    Some(next) => escaped.push(next),
                    None => escaped.push('\\'),
                }
            }
            '"' => escaped.push_str("\\\""),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_list_display_lowercases_names_expected_bracketed() {
        let mut list = AttributeList::new();
        list.push("Color", "red");
        list.push("penWidth", "2");

        assert_eq!(list.to_string(), r#"[color="red" penwidth="2"]"#);
    }

    #[test]
    fn attribute_list_empty_expected_no_brackets() {
        assert_eq!(AttributeList::new().to_string(), "");
    }

    #[test]
    fn attribute_list_same_name_expected_last_value_wins_in_place() {
        let mut list = AttributeList::new();
        list.push("label", "first");
        list.push("color", "red");
        list.push("LABEL", "second");

        assert_eq!(list.to_string(), r#"[label="second" color="red"]"#);
    }

    #[test]
    fn attribute_list_value_quotes_expected_escaped() {
        let mut list = AttributeList::new();
        list.push("label", r#"say "hi"\n"#);

        assert_eq!(list.to_string(), r#"[label="say \"hi\"\n"]"#);
    }

    #[test]
    fn pattern_rules_insert_same_pattern_expected_replaced() {
        let mut rules = PatternRules::default();
        rules
            .insert("^\"a", Attributes::from([("color", "red")]))
            .expect("pattern should compile");
        rules
            .insert("^\"a", Attributes::from([("shape", "box")]))
            .expect("pattern should compile");

        assert_eq!(rules.len(), 1);
        let rule = rules.get("^\"a").expect("rule should exist");
        assert_eq!(rule.attrs().get("shape"), Some("box"));
        assert_eq!(rule.attrs().get("color"), None);
    }

    #[test]
    fn pattern_rule_matches_quoted_key_expected_quotes_visible() {
        let rule =
            PatternRule::new("^\"nodeA\"$", Attributes::new()).expect("pattern should compile");

        assert!(rule.matches("\"nodeA\""));
        assert!(!rule.matches("nodeA"));
    }

    #[test]
    fn resolve_node_attributes_overlapping_rules_expected_sorted_pattern_order() {
        let mut rules = PatternRules::default();
        rules
            .insert("b", Attributes::from([("color", "blue")]))
            .expect("pattern should compile");
        rules
            .insert("a", Attributes::from([("color", "amber"), ("shape", "box")]))
            .expect("pattern should compile");

        let list = resolve_node_attributes(&rules, "\"ab\"");
        assert_eq!(list.get("color"), Some("blue"));
        assert_eq!(list.get("shape"), Some("box"));
    }

    #[test]
    fn resolve_edge_attributes_label_expected_first() {
        let mut rules = PatternRules::default();
        rules
            .insert("B", Attributes::from([("color", "red")]))
            .expect("pattern should compile");

        let list = resolve_edge_attributes(&rules, "\"nodeB\"", "fancy");
        assert_eq!(list.to_string(), r#"[label="fancy" color="red"]"#);
    }

    #[test]
    fn resolve_edge_attributes_no_label_no_match_expected_empty() {
        let rules = PatternRules::default();
        assert!(resolve_edge_attributes(&rules, "\"nodeB\"", "").is_empty());
    }
}
