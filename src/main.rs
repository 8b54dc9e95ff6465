//! Spellgrid Game Server
//!
//! Authoritative combat server for Spellgrid. Runs a deterministic
//! simulation whose per-tick state hashes can be compared across
//! replays and mirrored hosts.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::RwLock;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use spellgrid::{
    game::{
        catalog::AttackCatalog,
        combatant::PlayerId,
        events::CombatEventData,
        grid::TileGrid,
        state::MatchState,
        tick::{tick, CastIntent, IntentFrame, MoveDir, TickConfig},
    },
    runtime::{spawn_match, MatchSession, SessionConfig},
    AttackId, Vec2, TICK_RATE, VERSION,
};

/// Offline demo length (90 seconds at 30Hz).
const DEMO_DURATION_TICKS: u64 = 2700;

/// Hosted demo length (10 seconds of wall-clock time).
const HOSTED_DURATION_TICKS: u64 = 300;

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Spellgrid Server v{}", VERSION);
    info!("Tick Rate: {} Hz", TICK_RATE);

    demo_match();
    demo_hosted_match().await?;

    Ok(())
}

/// Scripted intent for player `i` at tick `t`, used by both the live
/// run and the determinism replay.
fn scripted_intent(t: u64, i: usize) -> IntentFrame {
    let dirs = [MoveDir::Right, MoveDir::Down, MoveDir::Left, MoveDir::Up];
    let movement = Some(dirs[((t / 30) as usize + i) % 4]);

    let cast = (t % 45 == (i as u64 * 11) % 45).then(|| {
        let attacks = [1u16, 3, 7, 8, 12, 18];
        CastIntent {
            attack: AttackId(attacks[(i + t as usize / 45) % attacks.len()]),
            aim: match i % 4 {
                0 => Vec2::RIGHT,
                1 => Vec2::DOWN,
                2 => -Vec2::RIGHT,
                _ => -Vec2::DOWN,
            },
            charge: ((t * 13) % 101) as u8,
        }
    });

    IntentFrame { movement, cast }
}

/// Offline demo: full-speed simulation plus a determinism replay.
fn demo_match() {
    info!("=== Starting Demo Match ===");

    let match_id = [1u8; 16];
    let rng_seed = 12345u64;
    let catalog = AttackCatalog::builtin();
    let config = TickConfig::default();

    let player_ids: Vec<PlayerId> = (0..4).map(|i| PlayerId::new([i; 16])).collect();

    let run = |label: &str| -> [u8; 32] {
        let mut state = MatchState::new(match_id, rng_seed, TileGrid::open(32, 32));
        for id in &player_ids {
            let spawn = state.add_combatant(*id).expect("spawn cell available");
            info!(
                "[{label}] player {} spawned at ({}, {})",
                hex::encode(&id.as_bytes()[..4]),
                spawn.x,
                spawn.y
            );
        }

        let mut intents: BTreeMap<PlayerId, IntentFrame> = BTreeMap::new();
        let mut total_events = 0usize;

        for t in 0..DEMO_DURATION_TICKS {
            for (i, id) in player_ids.iter().enumerate() {
                intents.insert(*id, scripted_intent(t, i));
            }

            let result = tick(&mut state, &intents, &catalog, &config);
            total_events += result.events.len();

            for event in &result.events {
                match &event.data {
                    CombatEventData::CombatantDied { victim, killer } => {
                        info!(
                            "[{label}] player {} eliminated by {}",
                            hex::encode(&victim.as_bytes()[..4]),
                            killer
                                .map(|k| hex::encode(&k.as_bytes()[..4]))
                                .unwrap_or_else(|| "nobody".into())
                        );
                    }
                    CombatEventData::MatchEnded { duration_ticks } => {
                        info!("[{label}] match ended after {duration_ticks} ticks");
                    }
                    _ => {}
                }
            }

            if t % 600 == 0 {
                info!(
                    "[{label}] tick {}: {} alive, {} projectiles, {} events so far",
                    t,
                    state.alive_count(),
                    state.projectiles.len(),
                    total_events
                );
            }

            if result.match_over {
                break;
            }
        }

        let hash = state.compute_hash();
        info!("[{label}] final state hash: {}", hex::encode(hash));
        hash
    };

    let first = run("live");

    info!("=== Verifying Determinism ===");
    let replay = run("replay");

    if first == replay {
        info!("DETERMINISM VERIFIED: hashes match");
    } else {
        info!("DETERMINISM FAILURE: hashes differ");
    }
}

/// Hosted demo: the same simulation driven by the real-time runner.
async fn demo_hosted_match() -> Result<()> {
    info!("=== Starting Hosted Match ===");

    let catalog = Arc::new(AttackCatalog::builtin());
    let config = SessionConfig {
        match_duration_ticks: HOSTED_DURATION_TICKS,
        ..SessionConfig::default()
    };

    let mut session = MatchSession::new(uuid::Uuid::new_v4().into_bytes(), config, catalog);
    let players: Vec<PlayerId> = (0..2).map(|_| PlayerId::random()).collect();
    for id in &players {
        session.add_player(*id)?;
        session.set_player_ready(id, true);
    }
    session.start_match()?;

    let session = Arc::new(RwLock::new(session));
    let handle = spawn_match(Arc::clone(&session));

    // Feed a simple chase script while the match runs.
    let intents = handle.intents.clone();
    let script_players = players.clone();
    tokio::spawn(async move {
        for t in 0.. {
            for (i, id) in script_players.iter().enumerate() {
                if intents.send((*id, scripted_intent(t, i))).await.is_err() {
                    return;
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    });

    let outcome = handle.task.await?;
    if let Some(outcome) = outcome {
        info!(
            "hosted match complete at tick {} (winner: {})",
            outcome.end_tick,
            outcome
                .winner
                .map(|w| hex::encode(&w.as_bytes()[..4]))
                .unwrap_or_else(|| "draw".into())
        );
    }

    Ok(())
}
