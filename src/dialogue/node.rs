use std::collections::BTreeMap;

use serde::Deserialize;

/// A node exactly as it is written in a dialogue file.
#[derive(Debug, Clone, Deserialize)]
pub struct RawNode {
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    /// Single-character input -> title of the next node.
    #[serde(default)]
    pub key: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub check_skill: Option<String>,
    #[serde(default)]
    pub difficulty_class: Option<i32>,
    #[serde(default)]
    pub reason: Option<i32>,
    #[serde(default)]
    pub health: Option<i32>,
    #[serde(default)]
    pub experience: Option<i32>,
    /// New value for the scene flag named after the dialogue file.
    #[serde(default)]
    pub condition: Option<i32>,
}

/// Index of a node inside its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a node does once it becomes current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The plain `Start` node of a graph with numbered `StartN` variants;
    /// never shown, only redirects.
    Entry,
    /// Text with nothing to choose. Sessions sit here until something
    /// outside the dialogue (a scene transition) moves them on.
    Dialogue,
    /// Text followed by a keyed choice.
    Option(BTreeMap<char, NodeId>),
    /// Resolved immediately on entry.
    Check {
        skill: String,
        difficulty_class: i32,
        pass: NodeId,
        fail: NodeId,
    },
    /// Reaching this ends the session.
    End,
}

/// Flag write carried by a node: `conditions[name] = value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionDelta {
    pub name: String,
    pub value: i32,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub title: String,
    pub body: Option<String>,
    pub kind: NodeKind,
    /// Applied to the player when the node is left through an option.
    pub reason_delta: Option<i32>,
    pub health_delta: Option<i32>,
    pub experience_gain: Option<i32>,
    /// Applied to the owning scene when the node becomes current.
    pub condition: Option<ConditionDelta>,
}

impl Node {
    pub fn is_end(&self) -> bool {
        matches!(self.kind, NodeKind::End)
    }

    pub fn is_check(&self) -> bool {
        matches!(self.kind, NodeKind::Check { .. })
    }

    pub fn options(&self) -> Option<&BTreeMap<char, NodeId>> {
        match &self.kind {
            NodeKind::Option(options) => Some(options),
            _ => None,
        }
    }
}
