use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Engine settings. Everything has a sensible default; the binary overrides
/// a few from the command line.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory holding one sub-directory per scene.
    pub content_dir: PathBuf,
    /// Scene the player wakes up in.
    pub start_scene: String,
    /// Time to reveal one character of dialogue text (lower is faster).
    pub reveal_ms_per_char: u64,
    pub inventory_capacity: usize,
    /// Key that starts a conversation with whatever is in range.
    pub interact_key: char,
    /// Points to distribute at character creation.
    pub character_points: i32,
    /// Fixed dice seed; `None` rolls from entropy.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from("content"),
            start_scene: "room_101".into(),
            reveal_ms_per_char: 10,
            inventory_capacity: 4,
            interact_key: 'z',
            character_points: 8,
            seed: None,
        }
    }
}

impl EngineConfig {
    /// `<content-dir> [seed] [reveal_ms_per_char]`, program name excluded.
    pub fn from_args(args: &[String]) -> Result<Self> {
        let mut config = Self::default();
        if let Some(dir) = args.first() {
            config.content_dir = PathBuf::from(dir);
        }
        if let Some(seed) = args.get(1) {
            config.seed = Some(
                seed.parse()
                    .with_context(|| format!("seed must be an unsigned integer, got '{seed}'"))?,
            );
        }
        if let Some(rate) = args.get(2) {
            config.reveal_ms_per_char = rate
                .parse()
                .with_context(|| format!("reveal rate must be milliseconds, got '{rate}'"))?;
        }
        Ok(config)
    }

    pub fn reveal_per_char(&self) -> Duration {
        Duration::from_millis(self.reveal_ms_per_char)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_args(&[]).unwrap();
        assert_eq!(config.content_dir, PathBuf::from("content"));
        assert_eq!(config.inventory_capacity, 4);
        assert_eq!(config.interact_key, 'z');
        assert_eq!(config.seed, None);
        assert_eq!(config.reveal_per_char(), Duration::from_millis(10));
    }

    #[test]
    fn test_positional_overrides() {
        let config = EngineConfig::from_args(&args(&["story", "42", "0"])).unwrap();
        assert_eq!(config.content_dir, PathBuf::from("story"));
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.reveal_ms_per_char, 0);
    }

    #[test]
    fn test_bad_seed() {
        let err = EngineConfig::from_args(&args(&["story", "lucky"])).unwrap_err();
        assert!(err.to_string().contains("lucky"));
    }
}
