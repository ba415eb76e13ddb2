//! progression-runner: headless runner for the bandcard progression engine.
//!
//! Usage:
//!   progression-runner --seed 12345 --users 20 --days 90 --db run.db
//!   progression-runner --ipc-mode --db run.db --data-dir ./data
//!
//! In IPC mode every stdin line is one `ProgressCommand` JSON object and
//! every stdout line is `{"ok": ...}` or `{"error": "..."}`.

use anyhow::Result;
use bandcard_core::{
    career_progression::ReleaseRequest,
    clock::EngineClock,
    command::ProgressCommand,
    config::EngineConfig,
    engine::{ProgressionEngine, TEST_EPOCH},
    store::ProgressStore,
    tier_economy::SubscriptionTier,
    types::from_epoch,
};
use chrono::Duration;
use std::env;
use std::io::{self, BufRead, Write};
use std::path::Path;

const DEMO_GENRES: [&str; 6] = ["House", "Techno", "Rock", "Jazz", "Hip Hop", "Folk"];

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let users = parse_arg(&args, "--users", 20usize);
    let days = parse_arg(&args, "--days", 90u64);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let manual_clock = args.iter().any(|a| a == "--manual-clock");
    let db = args
        .windows(2)
        .find(|w| w[0] == "--db")
        .map(|w| w[1].as_str())
        .unwrap_or(":memory:");
    let data_dir = args
        .windows(2)
        .find(|w| w[0] == "--data-dir")
        .map(|w| w[1].as_str())
        .unwrap_or("./data");

    if !ipc_mode {
        println!("bandcard — progression-runner");
        println!("  seed:      {seed}");
        println!("  users:     {users}");
        println!("  days:      {days}");
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        println!();
    }

    let config = if Path::new(data_dir).join("engine_config.json").exists() {
        EngineConfig::load(data_dir)?
    } else {
        log::warn!("no engine_config.json under {data_dir}, using built-in defaults");
        EngineConfig::default()
    };

    let store = if db == ":memory:" {
        ProgressStore::in_memory()?
    } else {
        ProgressStore::open(db)?
    };
    store.migrate()?;

    // The demo always runs on a manual clock so a seed replays exactly.
    let clock = if manual_clock || !ipc_mode {
        EngineClock::manual(from_epoch(TEST_EPOCH))
    } else {
        EngineClock::system()
    };
    let mut engine = ProgressionEngine::build(store, config, seed, clock);

    if ipc_mode {
        run_ipc_loop(&mut engine)?;
    } else {
        run_demo(&mut engine, users, days)?;
        print_summary(&engine, days)?;
    }

    Ok(())
}

fn run_ipc_loop(engine: &mut ProgressionEngine) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<ProgressCommand>(&buffer) {
            Ok(cmd) => match cmd.execute(engine) {
                Ok(value) => serde_json::json!({ "ok": value }),
                Err(e) => {
                    log::warn!("command failed: {e}");
                    serde_json::json!({ "error": e.to_string() })
                }
            },
            Err(e) => serde_json::json!({ "error": e.to_string() }),
        };
        writeln!(stdout, "{reply}")?;
        stdout.flush()?;
    }
    Ok(())
}

/// Register `users` artists, then play `days` days of releases and batches.
fn run_demo(engine: &mut ProgressionEngine, users: usize, days: u64) -> Result<()> {
    let mut cards = Vec::with_capacity(users);
    for i in 0..users {
        let user_id = format!("user-{i:03}");
        engine.register_user(&user_id, &format!("Artist {i}"))?;
        let tier = SubscriptionTier::ALL[i % SubscriptionTier::ALL.len()];
        engine.apply_subscription_tier(&user_id, tier.as_str())?;
        let genre = DEMO_GENRES[i % DEMO_GENRES.len()];
        let card = engine.register_card(&user_id, None, &format!("The {genre} Collective {i}"), genre)?;
        cards.push((user_id, card.card_id, genre));
    }

    for day in 0..days {
        for (i, (user_id, card_id, genre)) in cards.iter().enumerate() {
            // Every user releases once a week, staggered across the week.
            if (day + i as u64) % 7 != 0 {
                continue;
            }
            let quality = ((i as u64 * 37 + day * 11) % 100) as f64 / 100.0;
            let detected = if day % 3 == 0 { DEMO_GENRES[(i + 1) % DEMO_GENRES.len()] } else { *genre };
            engine.release_new_music(&ReleaseRequest {
                user_id: user_id.clone(),
                card_id: card_id.clone(),
                title: format!("Track {day}"),
                detected_genre: detected.to_string(),
                music_quality: quality,
            })?;
        }
        engine.run_batch()?;
        engine.advance_clock(Duration::days(1))?;
    }
    Ok(())
}

fn print_summary(engine: &ProgressionEngine, days: u64) -> Result<()> {
    let store = engine.store();
    println!("=== RUN SUMMARY ===");
    println!("  seed:           {}", engine.seed());
    println!("  days run:       {days}");
    println!("  final time:     {}", engine.now());
    println!("  users:          {}", store.user_count()?);
    println!("  releases:       {}", store.event_count("release_scored")?);
    println!("  growth ticks:   {}", store.event_count("daily_growth_applied")?);
    println!("  achievements:   {}", store.event_count("achievement_awarded")?);
    println!("  renewals:       {}", store.event_count("credits_renewed")?);

    println!();
    println!("=== TOP 10 ===");
    let board = engine.leaderboard(10)?;
    if board.is_empty() {
        println!("  (No ranked artists yet)");
    }
    for entry in board {
        println!(
            "  #{:<3} {:<12} fame {:>3}  fans {:>7}  streams {:>9}  score {:>12.1}",
            entry.position, entry.display_name, entry.fame, entry.fanbase, entry.total_streams,
            entry.score
        );
    }
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
