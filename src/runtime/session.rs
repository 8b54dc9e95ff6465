//! Match Session Management
//!
//! Owns the lifecycle of one match from lobby to completion and feeds
//! the deterministic simulation. Intents arrive asynchronously and are
//! held per player; the tick loop drains the latest frame for every
//! player at tick start, so a laggy client simply repeats its previous
//! intent instead of stalling the match.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

use crate::core::hash::StateHash;
use crate::core::rng::derive_match_seed;
use crate::game::catalog::AttackCatalog;
use crate::game::combatant::PlayerId;
use crate::game::grid::TileGrid;
use crate::game::state::MatchState;
use crate::game::tick::{tick, IntentFrame, TickConfig, TickResult};

/// Unique session identifier.
pub type SessionId = [u8; 16];

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for players to ready up
    Lobby,
    /// Match in progress
    Playing,
    /// Match ended, results available
    Ended,
    /// Session closed
    Closed,
}

/// Configuration for a match session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum players in match
    pub max_players: usize,
    /// Minimum players to start
    pub min_players: usize,
    /// Arena width in cells
    pub grid_width: u32,
    /// Arena height in cells
    pub grid_height: u32,
    /// Hard match duration cap, in ticks
    pub match_duration_ticks: u64,
    /// Simulation parameters
    pub tick: TickConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_players: 8,
            min_players: 2,
            grid_width: 32,
            grid_height: 32,
            match_duration_ticks: 5400, // 3 minutes @ 30Hz
            tick: TickConfig::default(),
        }
    }
}

/// A player seated in a session.
#[derive(Debug)]
struct SessionPlayer {
    ready: bool,
    /// Latest intent; movement repeats until replaced, the cast half
    /// is consumed by the next tick drain
    last_intent: IntentFrame,
}

/// Final standings once a match ends.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    /// Match identifier
    pub match_id: SessionId,
    /// Tick the match ended on
    pub end_tick: u64,
    /// Last combatant standing, if any
    pub winner: Option<PlayerId>,
    /// Hash of the final state
    pub final_state_hash: StateHash,
}

/// Session errors.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// Session is full
    #[error("session is full")]
    SessionFull,
    /// Player already in session
    #[error("already in session")]
    AlreadyInSession,
    /// Match already started
    #[error("match in progress")]
    MatchInProgress,
    /// Match is not running
    #[error("match not in progress")]
    MatchNotInProgress,
    /// Operation invalid in the current state
    #[error("invalid session state")]
    InvalidState,
    /// Not enough ready players
    #[error("players not ready")]
    PlayersNotReady,
    /// Player not found
    #[error("player not found")]
    PlayerNotFound,
}

/// A match session.
pub struct MatchSession {
    /// Unique session identifier
    pub id: SessionId,
    /// Current lifecycle state
    pub state: SessionState,
    /// Session configuration
    pub config: SessionConfig,
    catalog: Arc<AttackCatalog>,
    players: BTreeMap<PlayerId, SessionPlayer>,
    game_state: Option<MatchState>,
}

impl MatchSession {
    /// Create a new session in the lobby state.
    pub fn new(id: SessionId, config: SessionConfig, catalog: Arc<AttackCatalog>) -> Self {
        Self {
            id,
            state: SessionState::Lobby,
            config,
            catalog,
            players: BTreeMap::new(),
            game_state: None,
        }
    }

    /// Seat a player in the lobby.
    pub fn add_player(&mut self, player_id: PlayerId) -> Result<(), SessionError> {
        if self.state != SessionState::Lobby {
            return Err(SessionError::MatchInProgress);
        }
        if self.players.len() >= self.config.max_players {
            return Err(SessionError::SessionFull);
        }
        if self.players.contains_key(&player_id) {
            return Err(SessionError::AlreadyInSession);
        }

        self.players.insert(
            player_id,
            SessionPlayer {
                ready: false,
                last_intent: IntentFrame::default(),
            },
        );
        Ok(())
    }

    /// Remove a player. Mid-match this forfeits their combatant.
    pub fn remove_player(&mut self, player_id: &PlayerId) -> bool {
        if self.players.remove(player_id).is_none() {
            return false;
        }
        if let Some(state) = self.game_state.as_mut() {
            if let Some(c) = state.combatants.get_mut(player_id) {
                if c.alive {
                    c.alive = false;
                    c.eliminated_tick = Some(state.tick);
                }
            }
        }
        if self.state == SessionState::Lobby && self.players.is_empty() {
            self.state = SessionState::Closed;
        }
        true
    }

    /// Mark a player ready.
    pub fn set_player_ready(&mut self, player_id: &PlayerId, ready: bool) -> bool {
        match self.players.get_mut(player_id) {
            Some(p) => {
                p.ready = ready;
                true
            }
            None => false,
        }
    }

    /// Whether the match can start.
    pub fn all_players_ready(&self) -> bool {
        self.players.len() >= self.config.min_players
            && self.players.values().all(|p| p.ready)
    }

    /// Seated player count.
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Start the match: derive the seed from the roster, build the
    /// arena, and spawn every combatant.
    pub fn start_match(&mut self) -> Result<u64, SessionError> {
        if self.state != SessionState::Lobby {
            return Err(SessionError::InvalidState);
        }
        if !self.all_players_ready() {
            return Err(SessionError::PlayersNotReady);
        }

        let player_ids: Vec<[u8; 16]> = self.players.keys().map(|id| *id.as_bytes()).collect();
        let rng_seed = derive_match_seed(&self.id, &player_ids);

        let grid = TileGrid::open(self.config.grid_width, self.config.grid_height);
        let mut game_state = MatchState::new(self.id, rng_seed, grid);
        for player_id in self.players.keys() {
            game_state
                .add_combatant(*player_id)
                .map_err(|_| SessionError::InvalidState)?;
        }

        info!(
            match_id = %hex::encode(self.id),
            players = self.players.len(),
            rng_seed,
            "match started"
        );

        self.game_state = Some(game_state);
        self.state = SessionState::Playing;
        Ok(rng_seed)
    }

    /// Record a player's latest intent. It takes effect at the next
    /// tick and repeats until replaced.
    pub fn submit_intent(
        &mut self,
        player_id: &PlayerId,
        intent: IntentFrame,
    ) -> Result<(), SessionError> {
        if self.state != SessionState::Playing {
            return Err(SessionError::MatchNotInProgress);
        }
        match self.players.get_mut(player_id) {
            Some(p) => {
                p.last_intent = intent;
                Ok(())
            }
            None => Err(SessionError::PlayerNotFound),
        }
    }

    /// Run one simulation tick, draining the held intents.
    pub fn run_tick(&mut self) -> Option<TickResult> {
        if self.state != SessionState::Playing {
            return None;
        }
        let duration_cap = self.config.match_duration_ticks;
        let state = self.game_state.as_mut()?;

        // Held movement repeats until replaced; a cast fires once and
        // is consumed here, so one packet cannot cast every tick.
        let mut intents = BTreeMap::new();
        for (&player_id, player) in &mut self.players {
            intents.insert(
                player_id,
                IntentFrame {
                    movement: player.last_intent.movement,
                    cast: player.last_intent.cast.take(),
                },
            );
        }

        let mut result = tick(state, &intents, &self.catalog, &self.config.tick);

        if !state.ended && state.tick >= duration_cap {
            state.end_match();
            // The flush lands inside this tick's result, match-end
            // event included.
            result.events.extend(state.take_events());
            result.state_hash = state.compute_hash();
            result.match_over = true;
        }
        if state.ended {
            self.state = SessionState::Ended;
        }

        Some(result)
    }

    /// Finalize the ended match and close the session.
    pub fn finalize(&mut self) -> Option<MatchOutcome> {
        if self.state != SessionState::Ended {
            return None;
        }
        let state = self.game_state.as_ref()?;

        let winner = {
            let mut alive = state.combatants.values().filter(|c| c.alive);
            match (alive.next(), alive.next()) {
                (Some(c), None) => Some(c.id),
                _ => None,
            }
        };

        self.state = SessionState::Closed;
        Some(MatchOutcome {
            match_id: self.id,
            end_tick: state.tick,
            winner,
            final_state_hash: state.compute_hash(),
        })
    }

    /// Hash of the current simulation state, if a match is running.
    pub fn state_hash(&self) -> Option<StateHash> {
        self.game_state.as_ref().map(|s| s.compute_hash())
    }

    /// Read access to the live match state.
    pub fn game_state(&self) -> Option<&MatchState> {
        self.game_state.as_ref()
    }
}

// =============================================================================
// SESSION MANAGER
// =============================================================================

/// Tracks all active sessions on this server.
pub struct SessionManager {
    catalog: Arc<AttackCatalog>,
    sessions: RwLock<BTreeMap<SessionId, Arc<RwLock<MatchSession>>>>,
}

impl SessionManager {
    /// Create a manager sharing one attack catalog across matches.
    pub fn new(catalog: Arc<AttackCatalog>) -> Self {
        Self {
            catalog,
            sessions: RwLock::new(BTreeMap::new()),
        }
    }

    /// Create a new session.
    pub async fn create_session(&self, config: SessionConfig) -> SessionId {
        let id = uuid::Uuid::new_v4().into_bytes();
        let session = MatchSession::new(id, config, Arc::clone(&self.catalog));

        let mut sessions = self.sessions.write().await;
        sessions.insert(id, Arc::new(RwLock::new(session)));
        id
    }

    /// Get a session by id.
    pub async fn get_session(&self, id: &SessionId) -> Option<Arc<RwLock<MatchSession>>> {
        let sessions = self.sessions.read().await;
        sessions.get(id).cloned()
    }

    /// Remove a session.
    pub async fn remove_session(&self, id: &SessionId) {
        let mut sessions = self.sessions.write().await;
        sessions.remove(id);
    }

    /// Active session count.
    pub async fn session_count(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions.len()
    }

    /// Drop closed sessions.
    pub async fn cleanup(&self) {
        let mut sessions = self.sessions.write().await;
        let mut to_remove = Vec::new();
        for (id, session) in sessions.iter() {
            if session.read().await.state == SessionState::Closed {
                to_remove.push(*id);
            }
        }
        for id in to_remove {
            sessions.remove(&id);
        }
    }
}
