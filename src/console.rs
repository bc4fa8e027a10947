use std::io::{self, Write};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use log::info;

use newsun::check::CheckOutcome;
use newsun::dialogue::{DialogueIntent, DialogueSession};
use newsun::game::default_player;
use newsun::inventory::Inventory;
use newsun::player::{CharacterSheet, Depletion, Player, SKILLS};
use newsun::{EngineConfig, FrameInput, FrameOutcome, Game};

// ---------------------------------------------------------------------------
// Character creation
// ---------------------------------------------------------------------------

fn read_line() -> Result<String> {
    print!("> ");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn show_sheet(sheet: &CharacterSheet) {
    println!("\n  Points left: {}", sheet.points_left());
    for (i, skill) in SKILLS.iter().enumerate() {
        println!("  [{}] {skill:<13} {}", i + 1, sheet.get(i).unwrap_or(0));
    }
    println!("  +N / -N to spend or refund a point, 'done' to begin.");
}

fn create_character(config: &EngineConfig) -> Result<Player> {
    let mut sheet = CharacterSheet::new(config.character_points);
    loop {
        show_sheet(&sheet);
        let input = read_line()?;
        if input.eq_ignore_ascii_case("done") {
            return Ok(sheet.finish(Inventory::new(config.inventory_capacity)));
        }
        if input.eq_ignore_ascii_case("skip") {
            return Ok(default_player(config));
        }

        let mut chars = input.chars();
        let sign = chars.next();
        let slot = chars
            .as_str()
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1));
        let changed = match (sign, slot) {
            (Some('+'), Some(slot)) => sheet.increase(slot),
            (Some('-'), Some(slot)) => sheet.decrease(slot),
            _ => {
                println!("  (Try +1, -2 or done.)");
                continue;
            }
        };
        if !changed {
            println!("  (Can't do that.)");
        }
    }
}

// ---------------------------------------------------------------------------
// Dialogue display
// ---------------------------------------------------------------------------

/// Print a node body at the configured reveal speed.
fn reveal(session: &DialogueSession) -> Result<()> {
    let mut shown = 0;
    loop {
        let now = Instant::now();
        let text = session.visible_text(now);
        let chars = text.chars().count();
        if chars > shown {
            print!("{}", text.chars().skip(shown).collect::<String>());
            io::stdout().flush()?;
            shown = chars;
        }
        if session.reveal_complete(now) {
            break;
        }
        thread::sleep(Duration::from_millis(5));
    }
    println!();
    Ok(())
}

fn show_check(check: &CheckOutcome) {
    println!(
        "\n  [{} check: rolled {} {:+} = {} vs DC {} -> {}]",
        check.skill,
        check.roll,
        check.modifier,
        check.total(),
        check.difficulty_class,
        if check.passed { "PASS" } else { "FAIL" }
    );
}

fn show_node(session: &DialogueSession) -> Result<()> {
    print!("\n[{}]: ", session.name());
    reveal(session)?;
    if let Some(options) = session.current_node().options() {
        for (key, target) in options {
            println!("  [{key}] {}", session.graph().node(*target).title);
        }
    }
    Ok(())
}

fn show_scene(game: &Game) {
    let scene = game.current_scene();
    println!("\n--- {} ---", scene.id());
    let names: Vec<&str> = scene.interactables().collect();
    println!("  You can talk to: {}", names.join(", "));
}

fn show_status(player: &Player) {
    println!(
        "  Health {}  Reason {}  Experience {}",
        player.health, player.reason, player.experience
    );
    let items: Vec<String> = player.inventory.items().iter().map(ToString::to_string).collect();
    if items.is_empty() {
        println!("  Inventory: (empty)");
    } else {
        println!(
            "  Inventory: {} ({}/{})",
            items.join(", "),
            player.inventory.len(),
            player.inventory.capacity()
        );
    }
}

// ---------------------------------------------------------------------------
// Game over screen
// ---------------------------------------------------------------------------

enum RoundOutcome {
    Finished(FrameOutcome),
    Quit,
}

fn show_game_over(outcome: &RoundOutcome) {
    println!("\n========================================");
    println!("             GAME OVER");
    println!("========================================");

    match outcome {
        RoundOutcome::Finished(FrameOutcome::Ending) => {
            println!("  The sun rises on a new day.");
        }
        RoundOutcome::Finished(FrameOutcome::GameOver(Depletion::Health)) => {
            println!("  Your body gave out.");
        }
        RoundOutcome::Finished(FrameOutcome::GameOver(Depletion::Reason)) => {
            println!("  Your mind gave out.");
        }
        RoundOutcome::Finished(_) | RoundOutcome::Quit => {
            println!("  You walked away from the hotel.");
        }
    }

    println!("========================================\n");
    println!("  [r] Restart    [q] Quit\n");
}

/// Read the player's post-game choice. Returns `true` to restart, `false` to quit.
fn prompt_restart() -> Result<bool> {
    loop {
        match read_line()?.to_lowercase().as_str() {
            "r" => return Ok(true),
            "q" => return Ok(false),
            _ => println!("  Press [r] to restart or [q] to quit."),
        }
    }
}

// ---------------------------------------------------------------------------
// Single round
// ---------------------------------------------------------------------------

fn play_round(config: &EngineConfig) -> Result<RoundOutcome> {
    let player = create_character(config)?;
    let mut game = Game::load(config.clone(), player)?;
    let interact = config.interact_key;

    show_scene(&game);
    let mut shown: Option<(String, String)> = None;

    loop {
        let input = read_line()?;
        let frame_input = match input.as_str() {
            "" | "look" => {
                show_scene(&game);
                continue;
            }
            "inv" | "status" => {
                show_status(game.player());
                continue;
            }
            "quit" | "exit" => return Ok(RoundOutcome::Quit),
            _ => {
                if let Some(name) = input.strip_prefix("talk ") {
                    FrameInput::key(interact).near([name.trim()])
                } else {
                    let mut chars = input.chars();
                    match (chars.next(), chars.next()) {
                        (Some(key), None) => FrameInput::key(key),
                        _ => {
                            println!("(talk <name>, a single option key, look, inv or quit.)");
                            continue;
                        }
                    }
                }
            }
        };

        let check_before = game
            .current_scene()
            .active_session()
            .and_then(|s| s.last_check().cloned());
        let outcome = game.frame(&frame_input, Instant::now());

        match outcome {
            FrameOutcome::Continue => {}
            FrameOutcome::SceneChanged(_) => {
                shown = None;
                show_scene(&game);
                continue;
            }
            FrameOutcome::Ending | FrameOutcome::GameOver(_) => {
                info!("Round finished: {outcome:?}");
                return Ok(RoundOutcome::Finished(outcome));
            }
        }

        let scene = game.current_scene();
        match scene.active_session() {
            Some(session) => {
                let here = (session.name().to_string(), session.current_title().to_string());
                if shown.as_ref() == Some(&here) {
                    continue;
                }
                if let Some(check) = session.last_check() {
                    if check_before.as_ref() != Some(check) {
                        show_check(check);
                    }
                }
                show_node(session)?;
                shown = Some(here);
            }
            None => {
                let exiting = scene
                    .visible_sessions()
                    .any(|(_, intent)| intent == DialogueIntent::Exiting);
                if exiting && shown.take().is_some() {
                    println!("\n(The conversation ends.)");
                    show_status(game.player());
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry point: runs games in a loop until the player quits
// ---------------------------------------------------------------------------

pub fn run(config: EngineConfig) -> Result<()> {
    loop {
        println!("\n========================================");
        println!("              NEW SUN");
        println!("========================================");
        println!("Spend your points, then explore the hotel.");
        println!("Type 'talk <name>' to start a conversation.\n");

        let outcome = play_round(&config)?;
        show_game_over(&outcome);

        if !prompt_restart()? {
            println!("Thanks for playing!");
            break;
        }

        info!("Player chose to restart");
    }

    Ok(())
}
