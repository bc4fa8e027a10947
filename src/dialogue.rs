//! Branching dialogue: authored node graphs and the sessions that walk them.

pub mod graph;
pub mod node;
pub mod session;

pub use graph::{DialogueGraph, END, START};
pub use node::{ConditionDelta, Node, NodeId, NodeKind, RawNode};
pub use session::{DialogueIntent, DialogueSession, TextReveal, Turn};
