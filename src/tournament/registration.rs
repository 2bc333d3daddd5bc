//! Registration outcomes and capacity rules.
//!
//! The functions here decide; `Database` applies the decision inside a
//! single transaction.

use crate::tournament::model::Status;
use thiserror::Error;

/// Why a tournament operation did not go through.
#[derive(Debug, Error)]
pub enum TournamentError {
    #[error("already registered for this tournament")]
    AlreadyRegistered,

    #[error("tournament is not open for registration")]
    TournamentNotOpen,

    #[error("no player with that game id")]
    PlayerNotFound,

    #[error("tournament not found")]
    TournamentNotFound,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

/// A successful registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registered {
    /// Registrations after this one was added.
    pub count: u32,
    pub capacity: u32,
    /// This registration moved the tournament to `FULL`.
    pub filled: bool,
}

/// Only open tournaments accept new players.
pub fn admit(status: Status) -> Result<(), TournamentError> {
    match status {
        Status::Open => Ok(()),
        Status::Full | Status::Deleted => Err(TournamentError::TournamentNotOpen),
    }
}

/// Status once `count` players are registered against `capacity`.
pub fn status_after_join(count: u32, capacity: u32) -> Status {
    if count >= capacity { Status::Full } else { Status::Open }
}

/// Status after a player left. A full tournament with a free slot reopens.
pub fn status_after_leave(current: Status, count: u32, capacity: u32) -> Status {
    match current {
        Status::Full if count < capacity => Status::Open,
        other => other,
    }
}
