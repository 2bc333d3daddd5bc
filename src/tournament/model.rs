//! Records stored for users, tournaments and registrations.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use std::fmt;
use std::str::FromStr;

/// Game mode. Stored as a short code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    BattleRoyale,
    ClashSquad,
}

impl Mode {
    pub fn code(self) -> &'static str {
        match self {
            Mode::BattleRoyale => "BR",
            Mode::ClashSquad => "CS",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "BR" => Some(Mode::BattleRoyale),
            "CS" => Some(Mode::ClashSquad),
            _ => None,
        }
    }

    /// Player slots used when the admin does not give an explicit capacity.
    pub fn default_capacity(self) -> u32 {
        match self {
            Mode::BattleRoyale => 50,
            Mode::ClashSquad => 8,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::BattleRoyale => f.write_str("Battle Royale"),
            Mode::ClashSquad => f.write_str("Clash Squad"),
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    /// Accepts the code or the display name, case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "br" | "battleroyale" => Ok(Mode::BattleRoyale),
            "cs" | "clashsquad" | "squad" => Ok(Mode::ClashSquad),
            _ => Err(format!("unknown mode '{}' (use BR or CS)", s.trim())),
        }
    }
}

/// Tournament lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Open,
    Full,
    Deleted,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Open => "OPEN",
            Status::Full => "FULL",
            Status::Deleted => "DELETED",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "OPEN" => Some(Status::Open),
            "FULL" => Some(Status::Full),
            "DELETED" => Some(Status::Deleted),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromSql for Mode {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let code = value.as_str()?;
        Mode::from_code(code).ok_or_else(|| FromSqlError::Other(format!("unknown mode code '{code}'").into()))
    }
}

impl ToSql for Mode {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.code()))
    }
}

impl FromSql for Status {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let code = value.as_str()?;
        Status::from_code(code).ok_or_else(|| FromSqlError::Other(format!("unknown status '{code}'").into()))
    }
}

impl ToSql for Status {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

/// A chat user known to the bot.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub telegram_id: i64,
    /// In-game display name.
    pub game_name: Option<String>,
    /// External game account id, used by admins to kick players.
    pub game_id: Option<String>,
    pub is_admin: bool,
    pub first_seen: String,
}

/// In-game identity supplied during registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameIdentity {
    pub game_name: String,
    pub game_id: String,
}

/// Match room credentials, shared with players before the start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tournament {
    pub id: i64,
    pub mode: Mode,
    /// Free-form schedule text, shown as entered.
    pub date_time: String,
    pub fee: u32,
    pub capacity: u32,
    pub status: Status,
    pub room: Option<Room>,
    pub created_at: String,
}

impl Tournament {
    pub fn is_free(&self) -> bool {
        self.fee == 0
    }
}

/// Fields an admin supplies when creating a tournament.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTournament {
    pub mode: Mode,
    pub date_time: String,
    pub fee: u32,
    pub capacity: u32,
}

impl NewTournament {
    /// A tournament with the mode's default capacity.
    pub fn with_default_capacity(mode: Mode, date_time: impl Into<String>, fee: u32) -> Self {
        Self {
            mode,
            date_time: date_time.into(),
            fee,
            capacity: mode.default_capacity(),
        }
    }
}

/// A registrant as listed on a tournament roster.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
    pub telegram_id: i64,
    pub game_name: Option<String>,
    pub game_id: Option<String>,
    pub registered_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parses_codes_and_names() {
        assert_eq!("BR".parse::<Mode>(), Ok(Mode::BattleRoyale));
        assert_eq!("battle royale".parse::<Mode>(), Ok(Mode::BattleRoyale));
        assert_eq!("Clash-Squad".parse::<Mode>(), Ok(Mode::ClashSquad));
        assert_eq!(" cs ".parse::<Mode>(), Ok(Mode::ClashSquad));
        assert!("deathmatch".parse::<Mode>().is_err());
    }

    #[test]
    fn test_default_capacities() {
        assert_eq!(Mode::BattleRoyale.default_capacity(), 50);
        assert_eq!(Mode::ClashSquad.default_capacity(), 8);
    }

    #[test]
    fn test_status_codes() {
        for status in [Status::Open, Status::Full, Status::Deleted] {
            assert_eq!(Status::from_code(status.as_str()), Some(status));
        }
        assert_eq!(Status::from_code("open"), None);
    }
}
