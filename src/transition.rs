use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use crate::dialogue::DialogueSession;

/// Destination that finishes the playthrough instead of loading a scene.
pub const ENDING: &str = "ending";

/// Maps reserved dialogue titles to the scene they lead to.
#[derive(Debug, Clone)]
pub struct SceneRouter {
    routes: HashMap<String, String>,
}

impl Default for SceneRouter {
    fn default() -> Self {
        Self::new([
            ("GoToRoom", "room_101"),
            ("GoToCorridor", "floor_1"),
            ("Upstairs", "floor_1"),
            ("Downstairs", "floor_0"),
            ("EnterElevator", "underground"),
            ("NEWSUN", ENDING),
        ])
    }
}

impl SceneRouter {
    pub fn new<T, S>(routes: impl IntoIterator<Item = (T, S)>) -> Self
    where
        T: Into<String>,
        S: Into<String>,
    {
        Self {
            routes: routes
                .into_iter()
                .map(|(title, scene)| (title.into(), scene.into()))
                .collect(),
        }
    }

    /// Read a `{"Title": "scene_id"}` object.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read routes {}", path.display()))?;
        let routes: HashMap<String, String> = serde_json::from_str(&text)
            .with_context(|| format!("routes {} are not a title -> scene object", path.display()))?;
        Ok(Self { routes })
    }

    pub fn destination(&self, title: &str) -> Option<&str> {
        self.routes.get(title).map(String::as_str)
    }

    /// If the session sits on a reserved title, consume it: stop the
    /// session, rewind it to `Start` and return where to go.
    pub fn change_of_scene(&self, session: &mut DialogueSession) -> Option<String> {
        let destination = self.destination(session.current_title())?.to_string();
        info!(
            "'{}' reached {} -> scene {destination}",
            session.name(),
            session.current_title()
        );
        session.interrupt();
        Some(destination)
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;
    use std::time::{Duration, Instant};

    use super::*;
    use crate::check::FixedDice;
    use crate::condition::ConditionStore;
    use crate::dialogue::{DialogueGraph, Turn};
    use crate::player::Player;

    fn door() -> DialogueSession {
        let graph = DialogueGraph::from_json(
            "door",
            r#"[
                {"title": "Start", "body": "The door.", "key": {"1": "GoToRoom", "2": "End"}},
                {"title": "GoToRoom", "body": "You go in."},
                {"title": "End"}
            ]"#,
        )
        .unwrap();
        DialogueSession::new(Rc::new(graph), Duration::ZERO)
    }

    #[test]
    fn test_reserved_title_changes_scene() {
        let router = SceneRouter::default();
        let mut session = door();
        let mut player = Player::default();
        let mut conditions = ConditionStore::new();
        let mut dice = FixedDice::new(10);
        let mut turn = Turn {
            player: &mut player,
            conditions: &mut conditions,
            dice: &mut dice,
            now: Instant::now(),
        };

        session.activate(1, &mut turn).unwrap();
        assert_eq!(router.change_of_scene(&mut session), None);
        assert!(session.is_active());

        session.handle_key('1', &mut turn);
        assert_eq!(session.current_title(), "GoToRoom");
        assert_eq!(router.change_of_scene(&mut session).as_deref(), Some("room_101"));
        assert!(session.is_ended());
        assert!(!session.is_active());
        assert_eq!(session.current_title(), "Start");

        // Consumed: asking again leads nowhere.
        assert_eq!(router.change_of_scene(&mut session), None);
    }

    #[test]
    fn test_default_routes() {
        let router = SceneRouter::default();
        assert_eq!(router.destination("EnterElevator"), Some("underground"));
        assert_eq!(router.destination("NEWSUN"), Some(ENDING));
        assert_eq!(router.destination("Start"), None);
    }

    #[test]
    fn test_load_routes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routes.json");
        fs::write(&path, r#"{"Outside": "street"}"#).unwrap();
        let router = SceneRouter::load(&path).unwrap();
        assert_eq!(router.destination("Outside"), Some("street"));
        assert_eq!(router.destination("GoToRoom"), None);
    }
}
