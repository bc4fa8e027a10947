use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use log::{debug, error, info, warn};

use crate::check::{Dice, RandomDice};
use crate::config::EngineConfig;
use crate::inventory::Inventory;
use crate::player::{Depletion, Player};
use crate::quest::{QuestBook, QuestState};
use crate::scene::Scene;
use crate::transition::{SceneRouter, ENDING};

pub const QUESTS_FILE: &str = "quests.json";
pub const ROUTES_FILE: &str = "routes.json";

// ---------------------------------------------------------------------------
// Frame I/O
// ---------------------------------------------------------------------------

/// What the presentation layer observed since the last frame.
#[derive(Debug, Clone, Default)]
pub struct FrameInput {
    /// At most one key press per frame.
    pub key: Option<char>,
    /// Interactables the player is standing next to, in any order.
    pub in_range: Vec<String>,
}

impl FrameInput {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn key(key: char) -> Self {
        Self {
            key: Some(key),
            in_range: Vec::new(),
        }
    }

    pub fn near<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.in_range.extend(names.into_iter().map(Into::into));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    Continue,
    SceneChanged(String),
    /// A dialogue reached the closing title.
    Ending,
    GameOver(Depletion),
}

// ---------------------------------------------------------------------------
// Game
// ---------------------------------------------------------------------------

/// The whole playthrough: every scene built once, the player, the quest
/// book and the router.
pub struct Game {
    config: EngineConfig,
    scenes: BTreeMap<String, Scene>,
    current: String,
    player: Player,
    quests: QuestBook,
    router: SceneRouter,
    dice: Box<dyn Dice>,
    over: Option<FrameOutcome>,
}

impl Game {
    pub fn new(
        config: EngineConfig,
        scenes: impl IntoIterator<Item = Scene>,
        player: Player,
        quests: QuestBook,
        router: SceneRouter,
        dice: Box<dyn Dice>,
    ) -> Result<Self> {
        let scenes: BTreeMap<String, Scene> = scenes
            .into_iter()
            .map(|scene| (scene.id().to_string(), scene))
            .collect();
        if !scenes.contains_key(&config.start_scene) {
            bail!("start scene '{}' does not exist", config.start_scene);
        }
        quests
            .validate(&scenes)
            .context("quest rules refer to content that does not exist")?;

        let current = config.start_scene.clone();
        Ok(Self {
            config,
            scenes,
            current,
            player,
            quests,
            router,
            dice,
            over: None,
        })
    }

    /// Build every scene under `config.content_dir`, plus the optional quest
    /// book and route table at its root.
    pub fn load(config: EngineConfig, player: Player) -> Result<Self> {
        let root = config.content_dir.clone();
        let scenes = load_scenes(&root, &config)?;

        let quests_path = root.join(QUESTS_FILE);
        let quests = if quests_path.exists() {
            QuestBook::load(&quests_path)?
        } else {
            debug!("No {QUESTS_FILE} in {}", root.display());
            QuestBook::default()
        };

        let routes_path = root.join(ROUTES_FILE);
        let router = if routes_path.exists() {
            SceneRouter::load(&routes_path)?
        } else {
            SceneRouter::default()
        };

        let dice: Box<dyn Dice> = match config.seed {
            Some(seed) => Box::new(RandomDice::seeded(seed)),
            None => Box::new(RandomDice::from_entropy()),
        };

        info!(
            "Loaded {} scenes and {} quest rules from {}",
            scenes.len(),
            quests.rules().len(),
            root.display()
        );
        Self::new(config, scenes, player, quests, router, dice)
    }

    /// Replace the dice, e.g. with fixed rolls.
    pub fn with_dice(mut self, dice: Box<dyn Dice>) -> Self {
        self.dice = dice;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut Player {
        &mut self.player
    }

    pub fn quests(&self) -> &QuestBook {
        &self.quests
    }

    pub fn scene(&self, id: &str) -> Option<&Scene> {
        self.scenes.get(id)
    }

    pub fn scene_ids(&self) -> impl Iterator<Item = &str> {
        self.scenes.keys().map(String::as_str)
    }

    pub fn current_scene_id(&self) -> &str {
        &self.current
    }

    pub fn current_scene(&self) -> &Scene {
        &self.scenes[&self.current]
    }

    fn current_scene_mut(&mut self) -> &mut Scene {
        let current = &self.current;
        self.scenes
            .get_mut(current)
            .unwrap_or_else(|| unreachable!("current scene '{current}' is always loaded"))
    }

    /// `Ending` or `GameOver` once the playthrough is finished.
    pub fn outcome(&self) -> Option<&FrameOutcome> {
        self.over.as_ref()
    }

    /// Advance one frame.
    pub fn frame(&mut self, input: &FrameInput, now: Instant) -> FrameOutcome {
        if let Some(over) = &self.over {
            return over.clone();
        }

        {
            let scene = self.current_scene_mut();
            scene.acknowledge_ended();
            scene.settle_intents();
        }

        if let Some(key) = input.key {
            self.press(key, &input.in_range, now);
        }

        let fired = self.quests.tick(&mut QuestState {
            conditions: &mut self.scenes,
            inventory: &mut self.player.inventory,
        });
        if !fired.is_empty() {
            debug!("Quest rules fired this frame: {fired:?}");
        }

        let router = &self.router;
        let destination = self
            .scenes
            .get_mut(&self.current)
            .and_then(|scene| scene.poll_portals(router));
        if let Some(destination) = destination {
            if destination == ENDING {
                info!("The story has ended");
                return self.finish(FrameOutcome::Ending);
            }
            if self.enter_scene(&destination) {
                return FrameOutcome::SceneChanged(destination);
            }
        }

        if let Some(cause) = self.player.depletion() {
            warn!("Player depleted: {cause:?}");
            return self.finish(FrameOutcome::GameOver(cause));
        }
        FrameOutcome::Continue
    }

    fn press(&mut self, key: char, in_range: &[String], now: Instant) {
        let interact = key == self.config.interact_key;
        let Self {
            scenes,
            current,
            player,
            dice,
            ..
        } = self;
        let Some(scene) = scenes.get_mut(current.as_str()) else {
            return;
        };

        if interact && !scene.in_dialogue() {
            let target = scene
                .interactables()
                .find(|name| in_range.iter().any(|r| r == name))
                .map(str::to_string);
            match target {
                Some(name) => {
                    scene.interact(&name, player, dice.as_mut(), now);
                }
                None => debug!("Nothing to talk to in range"),
            }
            return;
        }
        scene.handle_key(key, player, dice.as_mut(), now);
    }

    /// Move the player to another scene. Whatever conversation is running in
    /// the scene being left is cut short.
    pub fn enter_scene(&mut self, id: &str) -> bool {
        if !self.scenes.contains_key(id) {
            error!("No scene '{id}' to enter; staying in '{}'", self.current);
            return false;
        }
        self.current_scene_mut().interrupt_all();
        info!("Scene change: {} -> {id}", self.current);
        self.current = id.to_string();
        for (name, value) in self.current_scene().conditions().iter() {
            debug!("  {id}.{name} = {value}");
        }
        true
    }

    fn finish(&mut self, outcome: FrameOutcome) -> FrameOutcome {
        self.current_scene_mut().interrupt_all();
        self.over = Some(outcome.clone());
        outcome
    }
}

/// Every sub-directory of `root` is one scene, named after the directory.
fn load_scenes(root: &Path, config: &EngineConfig) -> Result<Vec<Scene>> {
    let mut dirs = fs::read_dir(root)
        .with_context(|| format!("failed to open content directory {}", root.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("failed to list content directory {}", root.display()))?;
    dirs.retain(|path| path.is_dir());
    dirs.sort();

    dirs.iter()
        .map(|dir| Scene::load(dir, config.reveal_per_char()))
        .collect()
}

/// A fresh player with the configured inventory size and no skill points.
pub fn default_player(config: &EngineConfig) -> Player {
    Player::new(Inventory::new(config.inventory_capacity))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::check::FixedDice;
    use crate::dialogue::{DialogueGraph, DialogueIntent};
    use crate::inventory::Item;
    use crate::quest::{Action, Comparison, FlagTest, FlagWrite, Guard, QuestRule};
    use crate::scene::SceneManifest;

    const DOOR_101: &str = r#"[
        {"title": "Start", "body": "Your door.", "key": {"1": "GoToCorridor", "2": "End"}},
        {"title": "GoToCorridor", "body": "You step out."},
        {"title": "End"}
    ]"#;

    const DOOR_CORRIDOR: &str = r#"[
        {"title": "Start", "body": "Room 101.", "key": {"1": "GoToRoom", "2": "End"}},
        {"title": "GoToRoom", "body": "You go back in."},
        {"title": "End"}
    ]"#;

    const BOOKSHELF: &str = r#"[
        {"title": "Start"},
        {"title": "Start1", "body": "Shelves.", "key": {"1": "BookCheck", "2": "End"}},
        {"title": "Start2", "body": "Empty shelves.", "key": {"1": "End"}},
        {"title": "BookCheck", "check_skill": "clairvoyance", "difficulty_class": 10},
        {"title": "BookPass", "body": "A stack of books.", "key": {"1": "End"}, "condition": 3},
        {"title": "BookFail", "body": "Nothing.", "key": {"1": "End"}, "reason": -2},
        {"title": "End"}
    ]"#;

    const STAGE: &str = r#"[
        {"title": "Start", "body": "A microphone.", "key": {"1": "NEWSUN"}},
        {"title": "NEWSUN", "body": "Lights."},
        {"title": "End"}
    ]"#;

    fn scene(id: &str, flags: &[(&str, i32)], portals: &[&str], dialogues: &[(&str, &str)]) -> Scene {
        let manifest = SceneManifest {
            conditions: flags.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            portals: portals.iter().map(|p| p.to_string()).collect(),
        };
        let graphs = dialogues
            .iter()
            .map(|(name, json)| DialogueGraph::from_json(name, json).unwrap())
            .collect();
        Scene::new(id, manifest, graphs, Duration::ZERO)
    }

    fn hotel(roll: i32) -> Game {
        let scenes = vec![
            scene("room_101", &[("door", 1)], &["door", "stage"], &[("door", DOOR_101), ("stage", STAGE)]),
            scene(
                "floor_1",
                &[("door", 1), ("bookshelf", 1)],
                &["door"],
                &[("bookshelf", BOOKSHELF), ("door", DOOR_CORRIDOR)],
            ),
        ];
        let quests = QuestBook::new(vec![QuestRule::new(
            "pickup_books",
            Guard::Flag(FlagTest {
                scene: "floor_1".into(),
                flag: "bookshelf".into(),
                comparison: Comparison::Is(3),
            }),
            vec![
                Action::Give(Item::new("books")),
                Action::Set(FlagWrite {
                    scene: "floor_1".into(),
                    flag: "bookshelf".into(),
                    value: 2,
                }),
            ],
        )]);
        Game::new(
            EngineConfig::default(),
            scenes,
            Player::default(),
            quests,
            SceneRouter::default(),
            Box::new(FixedDice::new(roll)),
        )
        .unwrap()
    }

    fn talk(game: &mut Game, name: &str, now: Instant) -> FrameOutcome {
        game.frame(&FrameInput::key('z').near([name]), now)
    }

    #[test]
    fn test_interact_key_activates_in_range() {
        let mut game = hotel(10);
        let now = Instant::now();
        assert_eq!(game.frame(&FrameInput::key('z'), now), FrameOutcome::Continue);
        assert!(!game.current_scene().in_dialogue());

        talk(&mut game, "door", now);
        let door = game.current_scene().active_session().unwrap();
        assert_eq!(door.name(), "door");
        assert_eq!(door.intent(), Some(DialogueIntent::Entering));

        game.frame(&FrameInput::idle(), now);
        let door = game.current_scene().active_session().unwrap();
        assert_eq!(door.intent(), Some(DialogueIntent::Looping));
    }

    #[test]
    fn test_first_declared_interactable_wins() {
        let mut game = hotel(10);
        let now = Instant::now();
        game.frame(&FrameInput::key('z').near(["stage", "door"]), now);
        assert_eq!(game.current_scene().active_session().unwrap().name(), "door");
    }

    #[test]
    fn test_door_leads_to_corridor_and_back() {
        let mut game = hotel(10);
        let now = Instant::now();
        talk(&mut game, "door", now);
        assert_eq!(
            game.frame(&FrameInput::key('1'), now),
            FrameOutcome::SceneChanged("floor_1".into())
        );
        assert_eq!(game.current_scene_id(), "floor_1");

        let left_behind = game.scene("room_101").unwrap().session("door").unwrap();
        assert!(left_behind.is_ended());
        assert_eq!(left_behind.current_title(), "Start");

        talk(&mut game, "door", now);
        assert_eq!(
            game.frame(&FrameInput::key('1'), now),
            FrameOutcome::SceneChanged("room_101".into())
        );

        // The room's door was acknowledged on re-entry and can be used again.
        game.frame(&FrameInput::idle(), now);
        talk(&mut game, "door", now);
        assert!(game.current_scene().in_dialogue());
    }

    #[test]
    fn test_check_and_quest_rule_in_same_frame() {
        let mut game = hotel(15);
        let now = Instant::now();
        game.enter_scene("floor_1");
        talk(&mut game, "bookshelf", now);
        game.frame(&FrameInput::key('1'), now);

        let floor = game.current_scene();
        assert_eq!(floor.active_session().unwrap().current_title(), "BookPass");
        assert_eq!(floor.conditions().get("bookshelf"), 2);
        assert!(game.player().inventory.has(&Item::new("books")));

        for _ in 0..100 {
            game.frame(&FrameInput::idle(), now);
        }
        assert_eq!(game.player().inventory.len(), 1);
    }

    #[test]
    fn test_failed_check_can_deplete_reason() {
        let mut game = hotel(1);
        let now = Instant::now();
        game.enter_scene("floor_1");
        talk(&mut game, "bookshelf", now);
        game.frame(&FrameInput::key('1'), now);
        assert_eq!(
            game.frame(&FrameInput::key('1'), now),
            FrameOutcome::GameOver(Depletion::Reason)
        );
        assert_eq!(
            game.frame(&FrameInput::idle(), now),
            FrameOutcome::GameOver(Depletion::Reason)
        );
    }

    #[test]
    fn test_enter_scene_interrupts_active_dialogue() {
        let mut game = hotel(10);
        let now = Instant::now();
        talk(&mut game, "door", now);
        assert!(game.enter_scene("floor_1"));
        let door = game.scene("room_101").unwrap().session("door").unwrap();
        assert!(!door.is_active());
        assert!(door.is_ended());
    }

    #[test]
    fn test_unknown_scene_is_refused() {
        let mut game = hotel(10);
        assert!(!game.enter_scene("attic"));
        assert_eq!(game.current_scene_id(), "room_101");
    }

    #[test]
    fn test_ending_route_finishes_game() {
        let mut game = hotel(10);
        let now = Instant::now();
        talk(&mut game, "stage", now);
        assert_eq!(game.frame(&FrameInput::key('1'), now), FrameOutcome::Ending);
        assert_eq!(game.outcome(), Some(&FrameOutcome::Ending));
        assert_eq!(game.frame(&FrameInput::idle(), now), FrameOutcome::Ending);
    }

    #[test]
    fn test_missing_start_scene() {
        let config = EngineConfig {
            start_scene: "lobby".into(),
            ..EngineConfig::default()
        };
        let result = Game::new(
            config,
            vec![scene("room_101", &[], &[], &[])],
            Player::default(),
            QuestBook::default(),
            SceneRouter::default(),
            Box::new(FixedDice::new(10)),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_load_content_directory() {
        let dir = tempfile::tempdir().unwrap();
        let room = dir.path().join("room_101");
        fs::create_dir(&room).unwrap();
        fs::write(room.join("scene.json"), r#"{"conditions": {"door": 1}, "portals": ["door"]}"#).unwrap();
        fs::write(room.join("door.json"), DOOR_101).unwrap();
        fs::write(dir.path().join(ROUTES_FILE), r#"{"GoToCorridor": "room_101"}"#).unwrap();
        fs::write(
            dir.path().join(QUESTS_FILE),
            r#"{"rules": [{"name": "noop", "when": {"flag": {"scene": "room_101", "flag": "door", "is": 9}}, "then": []}]}"#,
        )
        .unwrap();

        let config = EngineConfig {
            content_dir: dir.path().to_path_buf(),
            seed: Some(7),
            ..EngineConfig::default()
        };
        let player = default_player(&config);
        let game = Game::load(config, player).unwrap();
        assert_eq!(game.scene_ids().collect::<Vec<_>>(), ["room_101"]);
        assert_eq!(game.quests().rules().len(), 1);
        assert_eq!(game.player().inventory.capacity(), 4);
    }

    #[test]
    fn test_load_rejects_quest_on_undeclared_flag() {
        let dir = tempfile::tempdir().unwrap();
        let room = dir.path().join("room_101");
        fs::create_dir(&room).unwrap();
        fs::write(room.join("door.json"), DOOR_101).unwrap();
        fs::write(
            dir.path().join(QUESTS_FILE),
            r#"{"rules": [], "finale": {"flag": {"scene": "room_101", "flag": "door", "at_least": 3}}}"#,
        )
        .unwrap();
        let config = EngineConfig {
            content_dir: dir.path().to_path_buf(),
            ..EngineConfig::default()
        };
        let err = Game::load(config, Player::default()).err().unwrap();
        assert!(format!("{err:#}").contains("door"));
    }
}
