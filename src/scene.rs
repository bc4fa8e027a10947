//! A scene: the interactables in one place, each with its dialogue session,
//! and the scene's own condition flags.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::{error, info, warn};
use serde::Deserialize;

use crate::check::Dice;
use crate::condition::ConditionStore;
use crate::dialogue::{DialogueGraph, DialogueIntent, DialogueSession, Turn};
use crate::player::PlayerStats;
use crate::quest::ConditionLookup;
use crate::transition::SceneRouter;

pub const MANIFEST: &str = "scene.json";

/// `scene.json`: the flags a scene declares and which interactables can
/// take the player elsewhere.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SceneManifest {
    #[serde(default)]
    pub conditions: BTreeMap<String, i32>,
    #[serde(default)]
    pub portals: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Scene {
    id: String,
    /// In declaration order; the first one in range wins an interaction.
    sessions: Vec<DialogueSession>,
    conditions: ConditionStore,
    portals: BTreeSet<String>,
}

impl Scene {
    pub fn new(
        id: impl Into<String>,
        manifest: SceneManifest,
        graphs: Vec<DialogueGraph>,
        reveal_per_char: Duration,
    ) -> Self {
        let id = id.into();
        let sessions = graphs
            .into_iter()
            .map(|graph| DialogueSession::new(Rc::new(graph), reveal_per_char))
            .collect::<Vec<_>>();
        for portal in &manifest.portals {
            if !sessions.iter().any(|s| s.name() == portal) {
                warn!("Scene '{id}': portal '{portal}' has no dialogue");
            }
        }
        Self {
            id,
            sessions,
            conditions: manifest.conditions.into_iter().collect(),
            portals: manifest.portals.into_iter().collect(),
        }
    }

    /// Read a scene directory: `scene.json` plus one `<interactable>.json`
    /// dialogue per interactable, declared in file-name order.
    pub fn load(dir: &Path, reveal_per_char: Duration) -> Result<Self> {
        let id = dir
            .file_name()
            .and_then(|s| s.to_str())
            .with_context(|| format!("scene directory has no usable name: {}", dir.display()))?;

        let manifest_path = dir.join(MANIFEST);
        let manifest: SceneManifest = if manifest_path.exists() {
            let text = fs::read_to_string(&manifest_path)
                .with_context(|| format!("failed to read {}", manifest_path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("malformed manifest {}", manifest_path.display()))?
        } else {
            SceneManifest::default()
        };

        let mut files = fs::read_dir(dir)
            .with_context(|| format!("failed to list scene directory {}", dir.display()))?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()
            .with_context(|| format!("failed to list scene directory {}", dir.display()))?;
        files.retain(|path| {
            path.extension().is_some_and(|ext| ext == "json")
                && path.file_name().is_some_and(|name| name != MANIFEST)
        });
        files.sort();

        let graphs = files
            .iter()
            .map(|path| DialogueGraph::load(path))
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Loaded scene '{id}': {} interactables, {} flags",
            graphs.len(),
            manifest.conditions.len()
        );
        Ok(Self::new(id, manifest, graphs, reveal_per_char))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn conditions(&self) -> &ConditionStore {
        &self.conditions
    }

    pub fn conditions_mut(&mut self) -> &mut ConditionStore {
        &mut self.conditions
    }

    pub fn is_portal(&self, name: &str) -> bool {
        self.portals.contains(name)
    }

    pub fn interactables(&self) -> impl Iterator<Item = &str> {
        self.sessions.iter().map(DialogueSession::name)
    }

    pub fn session(&self, name: &str) -> Option<&DialogueSession> {
        self.sessions.iter().find(|s| s.name() == name)
    }

    fn session_index(&self, name: &str) -> Option<usize> {
        self.sessions.iter().position(|s| s.name() == name)
    }

    pub fn active_session(&self) -> Option<&DialogueSession> {
        self.sessions.iter().find(|s| s.is_active())
    }

    /// Whether a dialogue box should be drawn for this scene at all.
    pub fn in_dialogue(&self) -> bool {
        self.active_session().is_some()
    }

    /// Sessions the presentation layer should draw, with their box
    /// animation.
    pub fn visible_sessions(&self) -> impl Iterator<Item = (&DialogueSession, DialogueIntent)> {
        self.sessions
            .iter()
            .filter_map(|s| s.intent().map(|intent| (s, intent)))
    }

    /// Start talking to `name`. Refused while any session in this scene is
    /// active, so only one conversation runs at a time.
    pub fn interact(
        &mut self,
        name: &str,
        player: &mut dyn PlayerStats,
        dice: &mut dyn Dice,
        now: Instant,
    ) -> bool {
        if let Some(busy) = self.active_session() {
            warn!(
                "Scene '{}': cannot talk to '{name}' while '{}' is active",
                self.id,
                busy.name()
            );
            return false;
        }
        let Some(index) = self.session_index(name) else {
            return false;
        };

        let condition = self.conditions.get(name);
        let Self {
            sessions,
            conditions,
            id,
            ..
        } = self;
        let session = &mut sessions[index];
        let mut turn = Turn {
            player,
            conditions,
            dice,
            now,
        };
        match session.activate(condition, &mut turn) {
            Ok(started) => {
                if started {
                    info!("Scene '{id}': talking to '{name}'");
                }
                started
            }
            Err(err) => {
                error!("Scene '{id}', dialogue '{name}': {err}");
                false
            }
        }
    }

    /// Forward a key press to the active session.
    pub fn handle_key(
        &mut self,
        key: char,
        player: &mut dyn PlayerStats,
        dice: &mut dyn Dice,
        now: Instant,
    ) -> bool {
        let Self {
            sessions,
            conditions,
            ..
        } = self;
        let Some(session) = sessions.iter_mut().find(|s| s.is_active()) else {
            return false;
        };
        let mut turn = Turn {
            player,
            conditions,
            dice,
            now,
        };
        session.handle_key(key, &mut turn)
    }

    /// Consume a reserved title reached by `name`'s session.
    pub fn change_of_scene(&mut self, name: &str, router: &SceneRouter) -> Option<String> {
        let index = self.session_index(name)?;
        router.change_of_scene(&mut self.sessions[index])
    }

    /// Check every portal whose session is running.
    pub fn poll_portals(&mut self, router: &SceneRouter) -> Option<String> {
        let portals: Vec<String> = self
            .sessions
            .iter()
            .filter(|s| s.is_active() && self.portals.contains(s.name()))
            .map(|s| s.name().to_string())
            .collect();
        portals
            .iter()
            .find_map(|name| self.change_of_scene(name, router))
    }

    /// Rewind sessions whose end the presentation layer has already seen.
    pub fn acknowledge_ended(&mut self) {
        for session in &mut self.sessions {
            session.acknowledge_end();
        }
    }

    pub fn settle_intents(&mut self) {
        for session in &mut self.sessions {
            session.settle_intent();
        }
    }

    /// The player is leaving: stop whatever conversation is running.
    pub fn interrupt_all(&mut self) {
        for session in self.sessions.iter_mut().filter(|s| s.is_active()) {
            session.interrupt();
        }
    }
}

impl ConditionLookup for BTreeMap<String, Scene> {
    fn store(&self, scene: &str) -> Option<&ConditionStore> {
        self.get(scene).map(Scene::conditions)
    }

    fn store_mut(&mut self, scene: &str) -> Option<&mut ConditionStore> {
        self.get_mut(scene).map(Scene::conditions_mut)
    }
}
