//! Lazy, cycle-safe evaluation of values that reference other keys.
//!
//! Every expansion-capable entry becomes a node holding its materialized
//! text and the keys it references. Evaluation is a depth-first walk: a node
//! is marked [`NodeState::InProgress`] while its references are evaluated and
//! [`NodeState::Resolved`] afterwards, so each node is computed once. Reaching
//! a node that is still in progress means the walk closed a cycle; the cycle
//! is cut there by substituting the recursion sentinel.

use regex::{Captures, Regex};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, error, warn};

use crate::config::TokenPair;

/// Text substituted for a reference that would recurse into `key`.
pub fn recursion_sentinel(key: &str) -> String {
    format!("Error: Recursion detected for key `{key}`!")
}

#[derive(Debug)]
struct ValueNode {
    text: String,
    references: Vec<String>,
    sensitive: bool,
    log_template: String,
}

/// Final value of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedValue {
    pub value: String,
    /// Whether secret material flowed into the value
    pub sensitive: bool,
    /// Log-safe stand-in used when the value is sensitive
    pub log_template: String,
}

#[derive(Debug, Clone)]
enum NodeState {
    InProgress,
    Resolved(ResolvedValue),
}

/// Reference graph over materialized entry values.
#[derive(Debug)]
pub struct ReferenceGraph {
    tokens: TokenPair,
    pattern: Regex,
    nodes: BTreeMap<String, ValueNode>,
}

impl ReferenceGraph {
    pub fn new(tokens: TokenPair) -> anyhow::Result<Self> {
        let pattern = tokens.reference_pattern()?;
        Ok(Self {
            tokens,
            pattern,
            nodes: BTreeMap::new(),
        })
    }

    /// Add the node `key` with its materialized `text`.
    ///
    /// `log_template` is what logs show instead of the value when secret
    /// material is involved.
    pub fn insert(&mut self, key: String, text: String, sensitive: bool, log_template: String) {
        let mut references: Vec<String> = Vec::new();
        for captures in self.pattern.captures_iter(&text) {
            if let Some(reference) = captures.name("ref") {
                let reference = reference.as_str();
                if !references.iter().any(|r| r == reference) {
                    references.push(reference.to_string());
                }
            }
        }

        if references.is_empty() {
            debug!("Registering key {} => {}", key, log_template);
        } else {
            debug!(
                "Registering key {} => {} with dependencies {}",
                key,
                log_template,
                references.join(",")
            );
        }

        self.nodes.insert(
            key,
            ValueNode {
                text,
                references,
                sensitive,
                log_template,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Evaluate every node.
    pub fn resolve_all(&self) -> BTreeMap<String, ResolvedValue> {
        let mut evaluation = Evaluation {
            graph: self,
            states: HashMap::with_capacity(self.nodes.len()),
        };

        self.nodes
            .iter()
            .map(|(key, node)| (key.clone(), evaluation.evaluate(key, node)))
            .collect()
    }
}

struct Evaluation<'g> {
    graph: &'g ReferenceGraph,
    states: HashMap<&'g str, NodeState>,
}

impl<'g> Evaluation<'g> {
    fn evaluate(&mut self, key: &'g str, node: &'g ValueNode) -> ResolvedValue {
        match self.states.get(key) {
            Some(NodeState::Resolved(resolved)) => return resolved.clone(),
            Some(NodeState::InProgress) => {
                warn!("Recursion detected for key {}", key);
                return ResolvedValue {
                    value: recursion_sentinel(key),
                    sensitive: false,
                    log_template: recursion_sentinel(key),
                };
            }
            None => {}
        }

        if node.references.is_empty() {
            let resolved = ResolvedValue {
                value: node.text.clone(),
                sensitive: node.sensitive,
                log_template: node.log_template.clone(),
            };
            self.states.insert(key, NodeState::Resolved(resolved.clone()));
            return resolved;
        }

        self.states.insert(key, NodeState::InProgress);

        let mut sensitive = node.sensitive;
        let mut lookups: HashMap<&'g str, String> = HashMap::with_capacity(node.references.len());
        for reference in &node.references {
            match self.graph.nodes.get_key_value(reference.as_str()) {
                Some((ref_key, ref_node)) => {
                    let resolved = self.evaluate(ref_key, ref_node);
                    sensitive |= resolved.sensitive;
                    lookups.insert(reference.as_str(), resolved.value);
                }
                None if reference.contains('|') => {
                    debug!(
                        "Key {} contains function expression {}, left for output evaluation",
                        key,
                        self.graph.tokens.wrap(reference)
                    );
                }
                None => {
                    error!(
                        "Key {} references {} which is not defined, leaving it unresolved",
                        key,
                        self.graph.tokens.wrap(reference)
                    );
                }
            }
        }

        let value = self
            .graph
            .pattern
            .replace_all(&node.text, |captures: &Captures<'_>| {
                let whole = captures.get(0).map_or("", |m| m.as_str());
                captures
                    .name("ref")
                    .and_then(|m| lookups.get(m.as_str()))
                    .map_or_else(|| whole.to_string(), Clone::clone)
            })
            .into_owned();

        let resolved = ResolvedValue {
            value,
            sensitive,
            log_template: node.log_template.clone(),
        };
        self.states.insert(key, NodeState::Resolved(resolved.clone()));
        resolved
    }
}
