//! Reactive quest rules evaluated once per tick over every scene's flags and
//! the player's inventory.
//!
//! Rules are data: a guard over flags and held items, and a list of actions.
//! They run in declaration order, so a pickup rule listed before a trade
//! rule can feed it within the same tick. A rule stays quiet once it has
//! fired only because its guard tests something its own actions change
//! (e.g. "lacks books" before giving books). A rule whose items would not
//! fit in the inventory is held back untouched until there is room.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, info};
use serde::Deserialize;

use crate::condition::{ConditionStore, NEUTRAL};
use crate::error::ContentError;
use crate::inventory::{Inventory, Item};

/// Access to the condition stores of every scene, by scene id.
pub trait ConditionLookup {
    fn store(&self, scene: &str) -> Option<&ConditionStore>;
    fn store_mut(&mut self, scene: &str) -> Option<&mut ConditionStore>;
}

impl ConditionLookup for BTreeMap<String, ConditionStore> {
    fn store(&self, scene: &str) -> Option<&ConditionStore> {
        self.get(scene)
    }

    fn store_mut(&mut self, scene: &str) -> Option<&mut ConditionStore> {
        self.get_mut(scene)
    }
}

/// What the rules see and change during one tick.
pub struct QuestState<'a> {
    pub conditions: &'a mut dyn ConditionLookup,
    pub inventory: &'a mut Inventory,
}

impl QuestState<'_> {
    pub fn condition(&self, scene: &str, flag: &str) -> i32 {
        self.conditions
            .store(scene)
            .map_or(NEUTRAL, |store| store.get(flag))
    }
}

// ---------------------------------------------------------------------------
// Rule language
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Is(i32),
    AtLeast(i32),
    Below(i32),
}

impl Comparison {
    fn holds(&self, value: i32) -> bool {
        match *self {
            Comparison::Is(expected) => value == expected,
            Comparison::AtLeast(min) => value >= min,
            Comparison::Below(max) => value < max,
        }
    }
}

/// `{"scene": .., "flag": .., "is" | "at_least" | "below": n}`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FlagTest {
    pub scene: String,
    pub flag: String,
    #[serde(flatten)]
    pub comparison: Comparison,
}

/// `{"scene": .., "flag": .., "value": n}`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FlagWrite {
    pub scene: String,
    pub flag: String,
    pub value: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Guard {
    Flag(FlagTest),
    Has(Item),
    Lacks(Item),
    All(Vec<Guard>),
    Any(Vec<Guard>),
    Not(Box<Guard>),
}

impl Guard {
    pub fn holds(&self, state: &QuestState<'_>) -> bool {
        match self {
            Guard::Flag(test) => test.comparison.holds(state.condition(&test.scene, &test.flag)),
            Guard::Has(item) => state.inventory.has(item),
            Guard::Lacks(item) => !state.inventory.has(item),
            Guard::All(guards) => guards.iter().all(|g| g.holds(state)),
            Guard::Any(guards) => guards.iter().any(|g| g.holds(state)),
            Guard::Not(guard) => !guard.holds(state),
        }
    }

    fn flags<'g>(&'g self, out: &mut Vec<(&'g str, &'g str)>) {
        match self {
            Guard::Flag(test) => out.push((test.scene.as_str(), test.flag.as_str())),
            Guard::All(guards) | Guard::Any(guards) => {
                guards.iter().for_each(|g| g.flags(out));
            }
            Guard::Not(guard) => guard.flags(out),
            Guard::Has(_) | Guard::Lacks(_) => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Give(Item),
    Take(Item),
    Set(FlagWrite),
    ClearInventory,
}

impl Action {
    fn apply(&self, rule: &str, state: &mut QuestState<'_>) {
        match self {
            Action::Give(item) => {
                if !state.inventory.add(item.clone()) {
                    debug!("Rule '{rule}': {item} already held");
                }
            }
            Action::Take(item) => {
                if !state.inventory.remove(item) {
                    debug!("Rule '{rule}': {item} was not held");
                }
            }
            Action::Set(write) => {
                let landed = state
                    .conditions
                    .store_mut(&write.scene)
                    .is_some_and(|store| store.set(&write.flag, write.value));
                if !landed {
                    debug!("Rule '{rule}': {}.{} is not declared", write.scene, write.flag);
                }
            }
            Action::ClearInventory => state.inventory.clear(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QuestRule {
    pub name: String,
    pub when: Guard,
    pub then: Vec<Action>,
}

impl QuestRule {
    pub fn new(name: impl Into<String>, when: Guard, then: Vec<Action>) -> Self {
        Self {
            name: name.into(),
            when,
            then,
        }
    }

    /// Whether every item this rule gives would fit, replaying its inventory
    /// actions in order on a copy.
    pub fn fits(&self, inventory: &Inventory) -> bool {
        let mut scratch = inventory.clone();
        self.then.iter().all(|action| match action {
            Action::Give(item) => scratch.has(item) || scratch.add(item.clone()),
            Action::Take(item) => {
                scratch.remove(item);
                true
            }
            Action::ClearInventory => {
                scratch.clear();
                true
            }
            Action::Set(_) => true,
        })
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
struct QuestFile {
    #[serde(default)]
    rules: Vec<QuestRule>,
    #[serde(default)]
    finale: Option<Guard>,
}

/// The ordered rule list plus the one-way finale latch.
#[derive(Debug, Clone, Default)]
pub struct QuestBook {
    rules: Vec<QuestRule>,
    /// Once this holds, regular rules stop and the inventory is emptied for
    /// good.
    finale: Option<Guard>,
    finished: bool,
}

impl QuestBook {
    pub fn new(rules: Vec<QuestRule>) -> Self {
        Self {
            rules,
            finale: None,
            finished: false,
        }
    }

    pub fn with_finale(mut self, finale: Guard) -> Self {
        self.finale = Some(finale);
        self
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read quest file {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("in quest file {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let file: QuestFile = serde_json::from_str(json).context("malformed quest rules")?;
        Ok(Self {
            rules: file.rules,
            finale: file.finale,
            finished: false,
        })
    }

    pub fn rules(&self) -> &[QuestRule] {
        &self.rules
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Every flag a rule reads or writes must be declared by its scene.
    pub fn validate(&self, conditions: &dyn ConditionLookup) -> Result<(), ContentError> {
        let finale_flags = self.finale.iter().map(|g| ("finale", g));
        let rule_guards = self.rules.iter().map(|r| (r.name.as_str(), &r.when));

        let mut refs: Vec<(&str, (&str, &str))> = Vec::new();
        for (name, guard) in rule_guards.chain(finale_flags) {
            let mut flags = Vec::new();
            guard.flags(&mut flags);
            refs.extend(flags.into_iter().map(|f| (name, f)));
        }
        for rule in &self.rules {
            for action in &rule.then {
                if let Action::Set(write) = action {
                    refs.push((rule.name.as_str(), (write.scene.as_str(), write.flag.as_str())));
                }
            }
        }

        for (rule, (scene, flag)) in refs {
            let declared = conditions
                .store(scene)
                .is_some_and(|store| store.contains(flag));
            if !declared {
                return Err(ContentError::UnknownCondition {
                    rule: rule.to_string(),
                    scene: scene.to_string(),
                    flag: flag.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Evaluate every rule once, in order, against fresh state. Returns the
    /// names of the rules that fired.
    pub fn tick(&mut self, state: &mut QuestState<'_>) -> Vec<&str> {
        if !self.finished && self.finale.as_ref().is_some_and(|g| g.holds(state)) {
            info!("Finale reached: quest rules retired, inventory cleared");
            self.finished = true;
        }
        if self.finished {
            state.inventory.clear();
            return Vec::new();
        }

        let mut fired = Vec::new();
        for rule in &self.rules {
            if !rule.when.holds(state) {
                continue;
            }
            if !rule.fits(state.inventory) {
                debug!("Quest rule '{}' held back: inventory full", rule.name);
                continue;
            }
            info!("Quest rule '{}' fired", rule.name);
            for action in &rule.then {
                action.apply(&rule.name, state);
            }
            fired.push(rule.name.as_str());
        }
        fired
    }
}
