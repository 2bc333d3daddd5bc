//! Argument parsing for admin commands and callback buttons.

use crate::tournament::{Mode, NewTournament, Room, TournamentError};

/// Inline button payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    Register(i64),
    Unregister(i64),
}

impl Callback {
    pub fn data(self) -> String {
        match self {
            Callback::Register(id) => format!("reg:{id}"),
            Callback::Unregister(id) => format!("unreg:{id}"),
        }
    }

    pub fn parse(data: &str) -> Option<Self> {
        let (kind, id) = data.split_once(':')?;
        let id = id.parse().ok()?;
        match kind {
            "reg" => Some(Callback::Register(id)),
            "unreg" => Some(Callback::Unregister(id)),
            _ => None,
        }
    }
}

fn invalid(msg: impl Into<String>) -> TournamentError {
    TournamentError::InvalidInput(msg.into())
}

pub fn tournament_id(arg: &str) -> Result<i64, TournamentError> {
    let arg = arg.trim();
    if arg.is_empty() {
        return Err(invalid("a tournament ID is required"));
    }
    arg.parse::<i64>()
        .map_err(|_| invalid(format!("'{arg}' is not a tournament ID")))
}

/// `<mode> | <date and time> | <fee> [| <capacity>]`
pub fn new_tournament(args: &str) -> Result<NewTournament, TournamentError> {
    let parts: Vec<&str> = args.split('|').map(str::trim).collect();
    if !(3..=4).contains(&parts.len()) {
        return Err(invalid("expected <mode> | <date and time> | <fee> [| <capacity>]"));
    }

    let mode: Mode = parts[0].parse().map_err(invalid)?;

    let date_time = parts[1];
    if date_time.is_empty() {
        return Err(invalid("date and time must not be empty"));
    }

    let fee = parts[2]
        .parse::<u32>()
        .map_err(|_| invalid(format!("fee must be a non-negative whole number, got '{}'", parts[2])))?;

    let mut new = NewTournament::with_default_capacity(mode, date_time, fee);
    if let Some(raw) = parts.get(3) {
        new.capacity = raw
            .parse::<u32>()
            .map_err(|_| invalid(format!("capacity must be a whole number, got '{raw}'")))?;
        if new.capacity == 0 {
            return Err(invalid("capacity must be at least 1"));
        }
    }
    Ok(new)
}

/// `<id> <room id> <password>`
pub fn room(args: &str) -> Result<(i64, Room), TournamentError> {
    let mut words = args.split_whitespace();
    let (Some(id), Some(room_id), Some(password), None) = (words.next(), words.next(), words.next(), words.next())
    else {
        return Err(invalid("expected <tournament id> <room id> <password>"));
    };
    Ok((tournament_id(id)?, Room { id: room_id.to_string(), password: password.to_string() }))
}

/// `<id> <game id>`
pub fn kick(args: &str) -> Result<(i64, String), TournamentError> {
    let mut words = args.split_whitespace();
    let (Some(id), Some(game_id), None) = (words.next(), words.next(), words.next()) else {
        return Err(invalid("expected <tournament id> <game id>"));
    };
    Ok((tournament_id(id)?, game_id.to_string()))
}
