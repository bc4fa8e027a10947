//! Skill checks: a d20 roll plus the player's attribute against a
//! difficulty class.

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of d20 rolls. Swapped for [`FixedDice`] in tests.
pub trait Dice {
    /// A uniformly distributed integer in `1..=20`.
    fn d20(&mut self) -> i32;
}

/// Dice backed by any `rand` generator.
pub struct RandomDice<R: Rng = StdRng> {
    rng: R,
}

impl<R: Rng> RandomDice<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandomDice<StdRng> {
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Dice for RandomDice<R> {
    fn d20(&mut self) -> i32 {
        self.rng.gen_range(1..=20)
    }
}

/// Replays a fixed sequence of rolls, cycling when exhausted.
#[derive(Debug, Clone)]
pub struct FixedDice {
    rolls: Vec<i32>,
    next: usize,
}

impl FixedDice {
    pub fn new(roll: i32) -> Self {
        Self::sequence(vec![roll])
    }

    pub fn sequence(rolls: Vec<i32>) -> Self {
        assert!(!rolls.is_empty(), "FixedDice needs at least one roll");
        Self { rolls, next: 0 }
    }
}

impl Dice for FixedDice {
    fn d20(&mut self) -> i32 {
        let roll = self.rolls[self.next % self.rolls.len()];
        self.next += 1;
        roll
    }
}

/// Result of one resolved check, kept for the presentation layer's
/// roll/pass/fail animation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub skill: String,
    pub roll: i32,
    pub modifier: i32,
    pub difficulty_class: i32,
    pub passed: bool,
}

impl CheckOutcome {
    pub fn total(&self) -> i32 {
        self.roll.saturating_add(self.modifier)
    }
}

/// Roll once and compare `roll + skill_value` against `difficulty_class`.
/// Negative skill values are used as-is.
pub fn roll_check(skill_value: i32, difficulty_class: i32, dice: &mut dyn Dice) -> bool {
    resolve(String::new(), skill_value, difficulty_class, dice).passed
}

pub(crate) fn resolve(
    skill: String,
    skill_value: i32,
    difficulty_class: i32,
    dice: &mut dyn Dice,
) -> CheckOutcome {
    let roll = dice.d20();
    let passed = roll.saturating_add(skill_value) >= difficulty_class;
    debug!(
        "Rolled {roll} for {skill} check: {roll} + {skill_value} vs DC {difficulty_class} -> {}",
        if passed { "pass" } else { "fail" }
    );
    CheckOutcome {
        skill,
        roll,
        modifier: skill_value,
        difficulty_class,
        passed,
    }
}
