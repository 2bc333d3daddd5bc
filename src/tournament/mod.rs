//! Tournaments, players and the registration rules that tie them together.

pub mod database;
pub mod model;
pub mod registration;

pub use database::Database;
pub use model::{GameIdentity, Mode, NewTournament, Room, RosterEntry, Tournament, User};
pub use registration::{Registered, TournamentError};

#[cfg(test)]
mod tests;
