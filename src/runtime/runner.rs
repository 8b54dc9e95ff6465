//! Match Runner
//!
//! Drives one session's simulation at the fixed tick rate on its own
//! tokio task. Intents flow in through an mpsc channel and are drained
//! under the same lock as the tick itself; per-tick updates fan out on
//! a broadcast channel. A slow consumer lags the broadcast, never the
//! simulation.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::core::hash::StateHash;
use crate::game::combatant::PlayerId;
use crate::game::events::CombatEvent;
use crate::game::tick::IntentFrame;
use crate::runtime::session::{MatchOutcome, MatchSession, SessionState};
use crate::TICK_RATE;

/// Ticks between state-hash checkpoint log lines (10s at 30Hz).
const HASH_LOG_INTERVAL_TICKS: u64 = 300;

/// Broadcast capacity; laggy subscribers drop old updates.
const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// Intent intake capacity.
const INTENT_CHANNEL_CAPACITY: usize = 1024;

/// One tick's outcome, fanned out to subscribers.
#[derive(Clone, Debug)]
pub struct TickUpdate {
    /// The simulated tick
    pub tick: u64,
    /// Events produced this tick, in deterministic order
    pub events: Vec<CombatEvent>,
    /// Post-tick state hash
    pub state_hash: StateHash,
}

/// Handle to a running match task.
pub struct RunnerHandle {
    /// Intent intake; frames are applied at the next tick boundary
    pub intents: mpsc::Sender<(PlayerId, IntentFrame)>,
    update_tx: broadcast::Sender<TickUpdate>,
    /// Completes with the match outcome once the match ends
    pub task: JoinHandle<Option<MatchOutcome>>,
}

impl RunnerHandle {
    /// Subscribe to per-tick updates.
    pub fn subscribe(&self) -> broadcast::Receiver<TickUpdate> {
        self.update_tx.subscribe()
    }
}

/// Spawn the tick loop for a started session.
///
/// The loop exits when the session leaves the playing state; the task
/// resolves with the finalized outcome.
pub fn spawn_match(session: Arc<RwLock<MatchSession>>) -> RunnerHandle {
    let (intent_tx, intent_rx) = mpsc::channel(INTENT_CHANNEL_CAPACITY);
    let (update_tx, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);

    let loop_update_tx = update_tx.clone();
    let task = tokio::spawn(async move { run_loop(session, intent_rx, loop_update_tx).await });

    RunnerHandle {
        intents: intent_tx,
        update_tx,
        task,
    }
}

async fn run_loop(
    session: Arc<RwLock<MatchSession>>,
    mut intent_rx: mpsc::Receiver<(PlayerId, IntentFrame)>,
    update_tx: broadcast::Sender<TickUpdate>,
) -> Option<MatchOutcome> {
    let match_id = session.read().await.id;

    let tick_duration = Duration::from_micros(1_000_000 / TICK_RATE as u64);
    let mut ticker = interval(tick_duration);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let result = {
            let mut s = session.write().await;
            if s.state != SessionState::Playing {
                break;
            }

            // Drain everything that arrived since the last tick; the
            // latest frame per player wins.
            while let Ok((player_id, frame)) = intent_rx.try_recv() {
                if let Err(err) = s.submit_intent(&player_id, frame) {
                    debug!(
                        player_id = %hex::encode(player_id.as_bytes()),
                        %err,
                        "intent dropped"
                    );
                }
            }

            match s.run_tick() {
                Some(result) => result,
                None => break,
            }
        };

        if result.tick % HASH_LOG_INTERVAL_TICKS == 0 {
            info!(
                match_id = %hex::encode(match_id),
                tick = result.tick,
                state_hash = %hex::encode(result.state_hash),
                "state checkpoint"
            );
        }

        let match_over = result.match_over;
        let _ = update_tx.send(TickUpdate {
            tick: result.tick,
            events: result.events,
            state_hash: result.state_hash,
        });

        if match_over {
            break;
        }
    }

    let outcome = session.write().await.finalize();
    if let Some(outcome) = &outcome {
        info!(
            match_id = %hex::encode(outcome.match_id),
            end_tick = outcome.end_tick,
            winner = outcome.winner.map(|w| hex::encode(w.as_bytes())),
            "match complete"
        );
    }
    outcome
}
