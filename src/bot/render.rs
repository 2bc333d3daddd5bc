//! User-facing texts (HTML parse mode).

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use teloxide::utils::command::BotCommands;
use teloxide::utils::html::escape;

use crate::bot::commands::{AdminCommand, Command};
use crate::bot::dialogue::{Rejection, MAX_ANSWER_CHARS};
use crate::bot::fanout::Tally;
use crate::bot::parse::Callback;
use crate::tournament::{GameIdentity, Registered, RosterEntry, Room, Tournament, TournamentError, User};

pub fn welcome(first_name: &str) -> String {
    format!(
        "🔥 Welcome, {}! 🔥\n\n\
         I manage sign-ups for our tournaments.\n\n\
         Use /register to join a tournament.\n\
         Use /myinfo to see your details.\n\
         Use /help to see all commands.",
        escape(first_name)
    )
}

pub fn help(is_admin: bool) -> String {
    let mut text = escape(&Command::descriptions().to_string());
    if is_admin {
        text.push_str("\n\n");
        text.push_str(&escape(&AdminCommand::descriptions().to_string()));
    }
    text
}

pub fn admin_panel() -> String {
    escape(&AdminCommand::descriptions().to_string())
}

pub const NOT_AUTHORIZED: &str = "You are not authorized to use this command.";
pub const CANCELLED: &str = "Operation cancelled.";
pub const NOTHING_TO_CANCEL: &str = "There is nothing to cancel.";
pub const NO_OPEN_TOURNAMENTS: &str = "Sorry, there are no open tournaments right now. Check back later!";
pub const CHOOSE_TOURNAMENT: &str = "Please choose a tournament to register for:";
pub const NO_DIALOGUE: &str = "Use /register to join a tournament or /help to see all commands.";
pub const SOMETHING_WENT_WRONG: &str = "Something went wrong. Please try again later.";

fn fee_text(t: &Tournament) -> String {
    if t.is_free() { "Free".to_string() } else { format!("Fee: {}", t.fee) }
}

/// Short one-line label, used on buttons.
pub fn label(t: &Tournament) -> String {
    format!("{} - {} ({})", t.mode, t.date_time, fee_text(t))
}

pub fn tournament_keyboard(tournaments: &[Tournament]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(tournaments.iter().map(|t| {
        vec![InlineKeyboardButton::callback(label(t), Callback::Register(t.id).data())]
    }))
}

pub fn cancel_keyboard(tournaments: &[Tournament]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(tournaments.iter().map(|t| {
        vec![InlineKeyboardButton::callback(format!("❌ Leave #{}", t.id), Callback::Unregister(t.id).data())]
    }))
}

pub fn ask_game_name(t: &Tournament) -> String {
    format!(
        "Great! You picked <b>{}</b>.\n\nNow, please send me your <b>in-game name</b>.",
        escape(&label(t))
    )
}

pub fn ask_game_id(game_name: &str) -> String {
    format!(
        "Got it, {}. Now, please send me your <b>in-game ID</b>.",
        escape(game_name)
    )
}

pub fn rejection(rejection: Rejection) -> String {
    match rejection {
        Rejection::Empty => "Please send a non-empty answer.".to_string(),
        Rejection::MultiLine => "Please keep it on a single line.".to_string(),
        Rejection::Command => "That looks like a command. Send your answer as plain text, or /cancel.".to_string(),
        Rejection::TooLong => format!("That is too long, please use at most {MAX_ANSWER_CHARS} characters."),
        Rejection::UseKeyboard => "Please tap one of the tournaments above, or /cancel.".to_string(),
    }
}

pub fn registered(t: &Tournament, identity: &GameIdentity, registered: &Registered) -> String {
    let fee_message = if t.is_free() {
        "This is a free tournament.".to_string()
    } else {
        format!(
            "Please pay the registration fee of <b>{}</b> to confirm your slot. Contact the admin for payment details.",
            t.fee
        )
    };
    format!(
        "✅ <b>Registration Successful!</b>\n\n\
         <b>Tournament:</b> {} on {}\n\
         <b>Your Name:</b> {}\n\
         <b>Your ID:</b> {}\n\
         <b>Slot:</b> {}/{}\n\n\
         {}\n\n\
         You will receive the Room ID and Password before the match starts.",
        t.mode,
        escape(&t.date_time),
        escape(&identity.game_name),
        escape(&identity.game_id),
        registered.count,
        registered.capacity,
        fee_message
    )
}

/// Text for a refused operation.
pub fn error(err: &TournamentError) -> String {
    match err {
        TournamentError::AlreadyRegistered => "You are already registered for this tournament.".to_string(),
        TournamentError::TournamentNotOpen => "Sorry, this tournament is no longer open for registration.".to_string(),
        TournamentError::PlayerNotFound => "No player with that game ID was found.".to_string(),
        TournamentError::TournamentNotFound => "Tournament with that ID not found.".to_string(),
        TournamentError::InvalidInput(msg) => format!("Invalid input: {}", escape(msg)),
        TournamentError::Storage(_) => SOMETHING_WENT_WRONG.to_string(),
    }
}

pub fn my_info(user: Option<&User>) -> String {
    match user.and_then(|u| Some((u.game_name.as_deref()?, u.game_id.as_deref().unwrap_or("-")))) {
        Some((name, id)) => format!(
            "<b>Your Information:</b>\n👤 In-game Name: {}\n🔢 In-game ID: {}",
            escape(name),
            escape(id)
        ),
        None => "You haven't set your in-game info yet. Please /register for a tournament to set it.".to_string(),
    }
}

pub fn my_tournaments(tournaments: &[Tournament]) -> String {
    if tournaments.is_empty() {
        return "You are not registered for any tournament.".to_string();
    }
    let mut text = String::from("<b>Your tournaments:</b>\n\n");
    for t in tournaments {
        text.push_str(&format!("<b>#{}</b> {} on {} [{}]\n", t.id, t.mode, escape(&t.date_time), t.status));
    }
    text
}

pub fn left(tournament_id: i64, removed: bool) -> String {
    if removed {
        format!("You have left tournament #{tournament_id}.")
    } else {
        format!("You are not registered for tournament #{tournament_id}.")
    }
}

pub fn overview(listing: &[(Tournament, u32)]) -> String {
    if listing.is_empty() {
        return "No tournaments found.".to_string();
    }
    let mut text = String::from("<b>Tournaments:</b>\n\n");
    for (t, count) in listing {
        text.push_str(&format!(
            "<b>ID: {}</b> | {} | {}\n  - Date: {}\n  - Fee: {}\n  - Registered: {}/{}\n  - Room: {}\n\n",
            t.id,
            t.mode,
            t.status,
            escape(&t.date_time),
            t.fee,
            count,
            t.capacity,
            if t.room.is_some() { "set" } else { "not set" }
        ));
    }
    text
}

pub fn created(t: &Tournament) -> String {
    format!(
        "✅ Tournament #{} created: {} on {} ({}, {} slots).",
        t.id,
        t.mode,
        escape(&t.date_time),
        fee_text(t),
        t.capacity
    )
}

pub fn roster(t: &Tournament, entries: &[RosterEntry]) -> String {
    if entries.is_empty() {
        return format!("No one has registered for Tournament ID {} yet.", t.id);
    }
    let mut text = format!(
        "<b>Registrations for Tournament ID {}:</b>\n({} on {}, {}/{})\n\n",
        t.id,
        t.mode,
        escape(&t.date_time),
        entries.len(),
        t.capacity
    );
    for (i, entry) in entries.iter().enumerate() {
        text.push_str(&format!(
            "{}. {} (ID: {})\n",
            i + 1,
            escape(entry.game_name.as_deref().unwrap_or("?")),
            escape(entry.game_id.as_deref().unwrap_or("?"))
        ));
    }
    text
}

pub fn broadcast(message: &str) -> String {
    format!("📢 <b>Admin Broadcast</b>\n\n{}", escape(message))
}

pub fn room(t: &Tournament, room: &Room) -> String {
    format!(
        "🎮 <b>Room details for {} on {}</b>\n\n<b>Room ID:</b> <code>{}</code>\n<b>Password:</b> <code>{}</code>\n\nGood luck!",
        t.mode,
        escape(&t.date_time),
        escape(&room.id),
        escape(&room.password)
    )
}

pub fn room_saved(tournament_id: i64) -> String {
    format!("🔑 Room saved for tournament #{tournament_id}. Use /sendroom {tournament_id} to send it to the players.")
}

pub fn room_missing(tournament_id: i64) -> String {
    format!("No room set for tournament #{tournament_id}. Use /setroom first.")
}

pub fn tally(what: &str, tally: &Tally) -> String {
    format!("{} sent to {}/{} users.", what, tally.sent, tally.total())
}

pub fn kicked(game_id: &str, tournament_id: i64, removed: bool) -> String {
    if removed {
        format!("User with ID {} was kicked from tournament #{}.", escape(game_id), tournament_id)
    } else {
        format!("User with ID {} is not registered for tournament #{}.", escape(game_id), tournament_id)
    }
}

pub fn deleted(tournament_id: i64, removed: bool) -> String {
    if removed {
        format!("🗑️ Tournament #{tournament_id} and its registrations were deleted.")
    } else {
        format!("Tournament #{tournament_id} does not exist.")
    }
}
