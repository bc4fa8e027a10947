use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use log::{debug, warn};
use regex::Regex;

use crate::dialogue::node::{ConditionDelta, Node, NodeId, NodeKind, RawNode};
use crate::error::ContentError;

pub const START: &str = "Start";
pub const END: &str = "End";
const CHECK: &str = "Check";
const PASS: &str = "Pass";
const FAIL: &str = "Fail";

static ENTRY_VARIANT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Start(\d+)$").expect("entry variant pattern"));

/// All nodes of one interactable's dialogue, resolved once at load time and
/// never mutated afterwards.
#[derive(Debug, Clone)]
pub struct DialogueGraph {
    /// Interactable name; also the scene flag that `condition` nodes write.
    name: String,
    nodes: Vec<Node>,
    index: HashMap<String, NodeId>,
    start: NodeId,
    /// `StartN` entry nodes keyed by N.
    variants: BTreeMap<i32, NodeId>,
}

impl DialogueGraph {
    /// Read a dialogue file. The interactable is named after the file stem.
    pub fn load(path: &Path) -> Result<Self> {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .with_context(|| format!("dialogue file has no usable name: {}", path.display()))?;
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read dialogue file {}", path.display()))?;
        Self::from_json(name, &text).with_context(|| format!("in dialogue file {}", path.display()))
    }

    pub fn from_json(name: &str, json: &str) -> Result<Self> {
        let raw: Vec<RawNode> =
            serde_json::from_str(json).context("dialogue is not a JSON array of nodes")?;
        Ok(Self::from_raw(name, raw)?)
    }

    pub fn from_raw(name: &str, mut raw: Vec<RawNode>) -> Result<Self, ContentError> {
        let mut index = HashMap::with_capacity(raw.len() + 1);
        let mut variants = BTreeMap::new();
        for (i, node) in raw.iter().enumerate() {
            if index.insert(node.title.clone(), NodeId(i)).is_some() {
                return Err(ContentError::DuplicateTitle(node.title.clone()));
            }
            if let Some(n) = entry_variant(&node.title) {
                variants.insert(n, NodeId(i));
            }
        }

        if !index.contains_key(START) {
            if variants.is_empty() {
                return Err(ContentError::MissingStart);
            }
            // Variants alone are enough: give the cursor somewhere to rest.
            index.insert(START.to_string(), NodeId(raw.len()));
            raw.push(RawNode {
                title: START.to_string(),
                body: None,
                key: None,
                check_skill: None,
                difficulty_class: None,
                reason: None,
                health: None,
                experience: None,
                condition: None,
            });
        }
        let start = index[START];

        let nodes = raw
            .into_iter()
            .map(|node| resolve(name, node, &index, !variants.is_empty()))
            .collect::<Result<Vec<_>, _>>()?;

        let graph = Self {
            name: name.to_string(),
            nodes,
            index,
            start,
            variants,
        };
        debug!(
            "Loaded dialogue '{}': {} nodes, {} entry variants",
            graph.name,
            graph.nodes.len(),
            graph.variants.len()
        );
        Ok(graph)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn find(&self, title: &str) -> Option<NodeId> {
        self.index.get(title).copied()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// The `Start` node sessions rest on while inactive.
    pub fn start(&self) -> NodeId {
        self.start
    }

    pub fn has_variants(&self) -> bool {
        !self.variants.is_empty()
    }

    /// Node a session enters when activated with the given condition value.
    pub fn entry_for(&self, condition: i32) -> Result<NodeId, ContentError> {
        if self.variants.is_empty() {
            return Ok(self.start);
        }
        self.variants
            .get(&condition)
            .copied()
            .ok_or(ContentError::MissingEntry(condition))
    }
}

fn entry_variant(title: &str) -> Option<i32> {
    ENTRY_VARIANT
        .captures(title)
        .and_then(|cap| cap.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn lookup(index: &HashMap<String, NodeId>, title: &str) -> Option<NodeId> {
    index.get(title).copied()
}

fn resolve(
    graph_name: &str,
    raw: RawNode,
    index: &HashMap<String, NodeId>,
    has_variants: bool,
) -> Result<Node, ContentError> {
    let kind = if raw.title == END {
        if raw.key.is_some() {
            warn!("'{graph_name}': options on the End node are ignored");
        }
        NodeKind::End
    } else if raw.title.contains(CHECK) {
        let (Some(skill), Some(difficulty_class)) = (raw.check_skill.clone(), raw.difficulty_class)
        else {
            return Err(ContentError::IncompleteCheck(raw.title));
        };
        let outcome = |word: &str| {
            let title = raw.title.replace(CHECK, word);
            lookup(index, &title).ok_or_else(|| ContentError::MissingOutcome {
                check: raw.title.clone(),
                missing: title,
            })
        };
        NodeKind::Check {
            skill,
            difficulty_class,
            pass: outcome(PASS)?,
            fail: outcome(FAIL)?,
        }
    } else if raw.title == START && has_variants {
        NodeKind::Entry
    } else if let Some(keys) = &raw.key {
        let mut options = BTreeMap::new();
        for (key, target) in keys {
            let mut chars = key.chars();
            let (Some(c), None) = (chars.next(), chars.next()) else {
                return Err(ContentError::InvalidKey {
                    node: raw.title.clone(),
                    key: key.clone(),
                });
            };
            let id = lookup(index, target).ok_or_else(|| ContentError::UnknownTarget {
                from: raw.title.clone(),
                key: c,
                target: target.clone(),
            })?;
            options.insert(c, id);
        }
        NodeKind::Option(options)
    } else {
        NodeKind::Dialogue
    };

    Ok(Node {
        condition: raw.condition.map(|value| ConditionDelta {
            name: graph_name.to_string(),
            value,
        }),
        title: raw.title,
        body: raw.body,
        kind,
        reason_delta: raw.reason,
        health_delta: raw.health,
        experience_gain: raw.experience,
    })
}
