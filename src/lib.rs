//! A branching dialogue and quest engine for small narrative games.
//!
//! Scenes own interactables, each backed by a dialogue graph loaded from
//! JSON. Dialogue can roll d20 skill checks, hurt the player and write
//! per-scene condition flags. A declarative quest book reacts to those flags
//! and the player's inventory every frame, and reserved dialogue titles move
//! the player between scenes.

pub mod check;
pub mod condition;
pub mod config;
pub mod dialogue;
pub mod error;
pub mod game;
pub mod inventory;
pub mod player;
pub mod quest;
pub mod scene;
pub mod transition;

pub use config::EngineConfig;
pub use error::ContentError;
pub use game::{FrameInput, FrameOutcome, Game};
