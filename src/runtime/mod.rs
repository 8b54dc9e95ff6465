//! Match hosting: session lifecycle and the fixed-rate tick driver.
//! Everything here is timing and plumbing; the simulation itself stays
//! deterministic inside `game/`.

pub mod runner;
pub mod session;

pub use runner::{spawn_match, RunnerHandle, TickUpdate};
pub use session::{
    MatchOutcome, MatchSession, SessionConfig, SessionError, SessionId, SessionManager,
    SessionState,
};
