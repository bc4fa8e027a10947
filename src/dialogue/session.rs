use std::rc::Rc;
use std::time::{Duration, Instant};

use log::{debug, trace};

use crate::check::{self, CheckOutcome, Dice};
use crate::condition::ConditionStore;
use crate::dialogue::graph::DialogueGraph;
use crate::dialogue::node::{Node, NodeId, NodeKind};
use crate::error::ContentError;
use crate::player::PlayerStats;

/// How the presentation layer should animate the dialogue box this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogueIntent {
    Entering,
    Looping,
    Exiting,
}

/// Everything a session may read or change while it advances. Handed in per
/// call by the scene that owns the session.
pub struct Turn<'a> {
    pub player: &'a mut dyn PlayerStats,
    pub conditions: &'a mut ConditionStore,
    pub dice: &'a mut dyn Dice,
    pub now: Instant,
}

// ---------------------------------------------------------------------------
// Text reveal
// ---------------------------------------------------------------------------

/// Character-by-character reveal of a node body, polled with the current
/// time every frame.
#[derive(Debug, Clone, Copy)]
pub struct TextReveal {
    started: Instant,
    total_chars: usize,
    per_char: Duration,
}

impl TextReveal {
    pub fn new(text: &str, per_char: Duration, now: Instant) -> Self {
        Self {
            started: now,
            total_chars: text.chars().count(),
            per_char,
        }
    }

    pub fn visible_chars(&self, now: Instant) -> usize {
        if self.per_char.is_zero() {
            return self.total_chars;
        }
        let elapsed = now.saturating_duration_since(self.started);
        let shown = elapsed.as_nanos() / self.per_char.as_nanos();
        usize::try_from(shown).map_or(self.total_chars, |n| n.min(self.total_chars))
    }

    pub fn is_complete(&self, now: Instant) -> bool {
        self.visible_chars(now) >= self.total_chars
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Runtime cursor over one interactable's dialogue graph.
#[derive(Debug, Clone)]
pub struct DialogueSession {
    graph: Rc<DialogueGraph>,
    current: NodeId,
    active: bool,
    ended: bool,
    intent: Option<DialogueIntent>,
    reveal_per_char: Duration,
    reveal: Option<TextReveal>,
    last_check: Option<CheckOutcome>,
    last_error: Option<ContentError>,
}

impl DialogueSession {
    pub fn new(graph: Rc<DialogueGraph>, reveal_per_char: Duration) -> Self {
        let current = graph.start();
        Self {
            graph,
            current,
            active: false,
            ended: false,
            intent: None,
            reveal_per_char,
            reveal: None,
            last_check: None,
            last_error: None,
        }
    }

    pub fn name(&self) -> &str {
        self.graph.name()
    }

    pub fn graph(&self) -> &DialogueGraph {
        &self.graph
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn current_node(&self) -> &Node {
        self.graph.node(self.current)
    }

    pub fn current_title(&self) -> &str {
        &self.current_node().title
    }

    pub fn intent(&self) -> Option<DialogueIntent> {
        self.intent
    }

    pub fn last_check(&self) -> Option<&CheckOutcome> {
        self.last_check.as_ref()
    }

    /// The most recent authoring problem hit while advancing, if any.
    pub fn last_error(&self) -> Option<&ContentError> {
        self.last_error.as_ref()
    }

    /// Body of the current node, if it has one.
    pub fn body(&self) -> Option<&str> {
        self.current_node().body.as_deref()
    }

    /// The part of the body revealed so far.
    pub fn visible_text(&self, now: Instant) -> &str {
        let Some(body) = self.body() else {
            return "";
        };
        let shown = self.reveal.map_or(usize::MAX, |r| r.visible_chars(now));
        match body.char_indices().nth(shown) {
            Some((end, _)) => &body[..end],
            None => body,
        }
    }

    pub fn reveal_complete(&self, now: Instant) -> bool {
        self.reveal.map_or(true, |r| r.is_complete(now))
    }

    /// Start talking. `condition` picks the `StartN` variant when the graph
    /// has several. Does nothing if the session is already running or its
    /// end has not been acknowledged yet.
    ///
    /// A condition with no matching variant leaves the session inactive at
    /// `Start` and records the error.
    pub fn activate(&mut self, condition: i32, turn: &mut Turn<'_>) -> Result<bool, ContentError> {
        if self.active || self.ended {
            return Ok(false);
        }
        let entry = match self.graph.entry_for(condition) {
            Ok(entry) => entry,
            Err(err) => {
                self.last_error = Some(err.clone());
                return Err(err);
            }
        };

        self.active = true;
        self.intent = Some(DialogueIntent::Entering);
        self.last_check = None;
        self.current = self.graph.start();
        debug!("'{}' activated (condition={condition})", self.name());
        self.enter(entry, turn);
        Ok(true)
    }

    /// Feed one key press. Returns whether it moved the session.
    ///
    /// Keys are ignored while the current body is still being revealed, and
    /// keys that match no option are ignored outright.
    pub fn handle_key(&mut self, key: char, turn: &mut Turn<'_>) -> bool {
        if !self.active {
            return false;
        }
        let Some(options) = self.current_node().options() else {
            return false;
        };
        if !self.reveal_complete(turn.now) {
            trace!("'{}': key '{key}' dropped during reveal", self.name());
            return false;
        }
        let Some(&target) = options.get(&key) else {
            return false;
        };

        let leaving = self.graph.node(self.current);
        if let Some(delta) = leaving.reason_delta {
            turn.player.adjust_reason(delta);
        }
        if let Some(delta) = leaving.health_delta {
            turn.player.adjust_health(delta);
        }
        if let Some(gain) = leaving.experience_gain {
            turn.player.raise_experience(gain);
        }
        debug!(
            "'{}': {} -[{key}]-> {}",
            self.name(),
            leaving.title,
            self.graph.node(target).title
        );
        self.enter(target, turn);
        true
    }

    fn enter(&mut self, id: NodeId, turn: &mut Turn<'_>) {
        let graph = Rc::clone(&self.graph);
        let mut id = id;
        loop {
            self.current = id;
            let node = graph.node(id);
            if let Some(delta) = &node.condition {
                if turn.conditions.set(&delta.name, delta.value) {
                    debug!("Condition {} = {}", delta.name, delta.value);
                }
            }
            match &node.kind {
                NodeKind::Check {
                    skill,
                    difficulty_class,
                    pass,
                    fail,
                } => {
                    let value = turn.player.skill(skill);
                    let outcome = check::resolve(skill.clone(), value, *difficulty_class, turn.dice);
                    id = if outcome.passed { *pass } else { *fail };
                    self.last_check = Some(outcome);
                }
                NodeKind::End => {
                    self.reveal = None;
                    self.finish();
                    return;
                }
                _ => {
                    self.reveal = node
                        .body
                        .as_deref()
                        .map(|body| TextReveal::new(body, self.reveal_per_char, turn.now));
                    return;
                }
            }
        }
    }

    fn finish(&mut self) {
        self.active = false;
        self.ended = true;
        self.intent = Some(DialogueIntent::Exiting);
        debug!("'{}' ended", self.name());
    }

    /// Called once per frame after the presentation layer has seen the
    /// intent: an entering box becomes a looping one.
    pub fn settle_intent(&mut self) {
        if self.intent == Some(DialogueIntent::Entering) {
            self.intent = Some(DialogueIntent::Looping);
        }
    }

    /// The controller has seen the session end; rewind to `Start` so it can
    /// be activated again.
    pub fn acknowledge_end(&mut self) -> bool {
        if !self.ended {
            return false;
        }
        self.ended = false;
        self.intent = None;
        self.reveal = None;
        self.current = self.graph.start();
        true
    }

    /// Stop immediately, wherever the cursor is, and rewind to `Start`.
    /// The session still reads as ended until acknowledged.
    pub fn interrupt(&mut self) {
        if self.active {
            debug!("'{}' interrupted at {}", self.name(), self.current_title());
            self.finish();
        }
        self.reveal = None;
        self.current = self.graph.start();
    }
}
