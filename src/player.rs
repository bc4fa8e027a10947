//! The protagonist: skills, health/reason pools and the inventory.

use log::{debug, info};

use crate::inventory::Inventory;

/// Skill names in the order the character sheet lists them.
pub const SKILLS: [&str; 4] = ["eloquence", "clairvoyance", "forbearance", "resonance"];

/// What a dialogue session is allowed to see and change on the player.
pub trait PlayerStats {
    /// Current value of a skill. Unknown skills read as 0.
    fn skill(&self, name: &str) -> i32;
    fn adjust_reason(&mut self, delta: i32);
    fn adjust_health(&mut self, delta: i32);
    fn raise_experience(&mut self, amount: i32);
}

/// Which pool ran dry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depletion {
    Health,
    Reason,
}

#[derive(Debug, Clone)]
pub struct Player {
    pub eloquence: i32,
    pub clairvoyance: i32,
    pub forbearance: i32,
    pub resonance: i32,
    pub experience: i32,
    pub health: i32,
    pub reason: i32,
    pub inventory: Inventory,
}

impl Default for Player {
    fn default() -> Self {
        Self::new(Inventory::default())
    }
}

impl Player {
    pub fn new(inventory: Inventory) -> Self {
        Self {
            eloquence: 0,
            clairvoyance: 0,
            forbearance: 0,
            resonance: 0,
            experience: 0,
            health: 4,
            reason: 2,
            inventory,
        }
    }

    pub fn skills(&self) -> [(&'static str, i32); 4] {
        [
            ("eloquence", self.eloquence),
            ("clairvoyance", self.clairvoyance),
            ("forbearance", self.forbearance),
            ("resonance", self.resonance),
        ]
    }

    /// `Some` once health or reason has dropped to zero.
    pub fn depletion(&self) -> Option<Depletion> {
        if self.health <= 0 {
            Some(Depletion::Health)
        } else if self.reason <= 0 {
            Some(Depletion::Reason)
        } else {
            None
        }
    }
}

impl PlayerStats for Player {
    fn skill(&self, name: &str) -> i32 {
        match name.to_ascii_lowercase().as_str() {
            "eloquence" => self.eloquence,
            "clairvoyance" => self.clairvoyance,
            "forbearance" => self.forbearance,
            "resonance" => self.resonance,
            _ => 0,
        }
    }

    fn adjust_reason(&mut self, delta: i32) {
        self.reason = self.reason.saturating_add(delta);
        debug!("Reason {delta:+} -> {}", self.reason);
    }

    fn adjust_health(&mut self, delta: i32) {
        self.health = self.health.saturating_add(delta);
        debug!("Health {delta:+} -> {}", self.health);
    }

    fn raise_experience(&mut self, amount: i32) {
        self.experience = self.experience.saturating_add(amount);
        debug!("Experience {amount:+} -> {}", self.experience);
    }
}

// ---------------------------------------------------------------------------
// Character creation
// ---------------------------------------------------------------------------

/// Point-buy skill allocation done before the first scene.
#[derive(Debug, Clone)]
pub struct CharacterSheet {
    skills: [i32; 4],
    points: i32,
}

impl CharacterSheet {
    pub fn new(points: i32) -> Self {
        Self {
            skills: [0; 4],
            points,
        }
    }

    pub fn points_left(&self) -> i32 {
        self.points
    }

    pub fn get(&self, skill: usize) -> Option<i32> {
        self.skills.get(skill).copied()
    }

    /// Spend one point on a skill. Returns `false` when out of points.
    pub fn increase(&mut self, skill: usize) -> bool {
        match self.skills.get_mut(skill) {
            Some(value) if self.points > 0 => {
                *value += 1;
                self.points -= 1;
                true
            }
            _ => false,
        }
    }

    /// Refund one point from a skill. Skills never drop below zero here.
    pub fn decrease(&mut self, skill: usize) -> bool {
        match self.skills.get_mut(skill) {
            Some(value) if *value > 0 => {
                *value -= 1;
                self.points += 1;
                true
            }
            _ => false,
        }
    }

    /// Build the player. Unspent points are forfeited.
    pub fn finish(self, inventory: Inventory) -> Player {
        let [eloquence, clairvoyance, forbearance, resonance] = self.skills;
        info!(
            "Character created: eloquence={eloquence} clairvoyance={clairvoyance} \
             forbearance={forbearance} resonance={resonance} (unspent={})",
            self.points
        );
        Player {
            eloquence,
            clairvoyance,
            forbearance,
            resonance,
            ..Player::new(inventory)
        }
    }
}
