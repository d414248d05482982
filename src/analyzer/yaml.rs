//! Scalars in YAML documents.
//!
//! `serde_yaml` does not expose source positions, so a scalar's line is
//! recovered by searching for its mapping key (or, for sequence items, the
//! first line of its text) after the previous hit.

use serde::Deserialize;
use serde_yaml::Value;

use super::{SourceNode, line_of};
use crate::query::HostNode;

struct ScalarCollector<'s> {
    source: &'s str,
    cursor: usize,
    nodes: Vec<SourceNode>,
}

impl ScalarCollector<'_> {
    fn walk(&mut self, key: Option<&str>, value: &Value, in_sequence: bool) {
        match value {
            Value::Mapping(mapping) => {
                for (k, v) in mapping {
                    let child_key = scalar_key(k);
                    if matches!(v, Value::Mapping(_) | Value::Sequence(_)) {
                        // Move past the parent key so nested hits stay in order.
                        if let Some(k) = &child_key {
                            self.locate(&format!("{}:", k));
                        }
                    }
                    self.walk(child_key.as_deref(), v, false);
                }
            }
            Value::Sequence(items) => {
                for item in items {
                    self.walk(key, item, true);
                }
            }
            Value::Tagged(tagged) => self.walk(key, &tagged.value, in_sequence),
            scalar => {
                let text = scalar.as_str().map(str::to_string);
                let needle = match (in_sequence, key, &text) {
                    (false, Some(k), _) => Some(format!("{}:", k)),
                    (_, _, Some(t)) => t.lines().next().map(str::to_string),
                    _ => None,
                };
                let line = needle.and_then(|n| self.locate(&n));
                self.nodes.push(SourceNode {
                    node: HostNode::document_scalar(key.map(str::to_string), text),
                    line,
                    range: None,
                });
            }
        }
    }

    /// Line of the first `needle` at or after the cursor.
    fn locate(&mut self, needle: &str) -> Option<usize> {
        if needle.trim().is_empty() {
            return None;
        }
        let found = self.cursor + self.source[self.cursor..].find(needle)?;
        self.cursor = found + needle.len();
        Some(line_of(self.source, found))
    }
}

fn scalar_key(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Every scalar of every document in `source`.
///
/// Non-string scalars are kept as nodes without text.
pub fn document_scalars(source: &str) -> Result<Vec<SourceNode>, serde_yaml::Error> {
    let mut collector = ScalarCollector {
        source,
        cursor: 0,
        nodes: Vec::new(),
    };
    for document in serde_yaml::Deserializer::from_str(source) {
        let value = Value::deserialize(document)?;
        collector.walk(None, &value, false);
    }
    Ok(collector.nodes)
}
