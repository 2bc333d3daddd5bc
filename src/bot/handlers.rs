//! Update handlers wired into the teloxide dispatcher.
//!
//! Endpoints only talk to Telegram. What to answer is decided by the
//! `*_reply` functions, which work on `BotState` alone.

use std::sync::Arc;
use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, ParseMode};
use tracing::{info, warn};

use crate::bot::commands::{AdminCommand, Command};
use crate::bot::dialogue::{Dialogue, Sessions, Transition};
use crate::bot::fanout::{fan_out, Deliver};
use crate::bot::parse::{self, Callback};
use crate::bot::render;
use crate::bot::telegram::TelegramClient;
use crate::tournament::registration::admit;
use crate::tournament::{Database, Tournament, TournamentError};

/// Shared state handed to every handler.
pub struct BotState<D = TelegramClient> {
    pub db: Database,
    pub sessions: Sessions,
    /// Used for broadcasts and room delivery.
    pub outbox: D,
    /// Pause between messages during broadcasts.
    pub broadcast_delay: Duration,
}

impl<D: Deliver> BotState<D> {
    pub fn new(db: Database, outbox: D, broadcast_delay: Duration) -> Self {
        Self {
            db,
            sessions: Sessions::new(),
            outbox,
            broadcast_delay,
        }
    }

    fn is_admin(&self, user_id: i64) -> bool {
        self.db.is_admin(user_id).unwrap_or_else(|e| {
            warn!("Admin lookup failed for {}: {}", user_id, e);
            false
        })
    }

    fn remember(&self, user_id: i64) {
        if let Err(e) = self.db.ensure_user(user_id) {
            warn!("Failed to record user {}: {}", user_id, e);
        }
    }
}

/// HTML text to send back, optionally with an inline keyboard.
#[derive(Debug, Clone)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<InlineKeyboardMarkup>,
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Self { text, keyboard: None }
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        text.to_string().into()
    }
}

/// Render a finished operation, logging storage failures.
fn finish(result: Result<String, TournamentError>) -> String {
    match result {
        Ok(text) => text,
        Err(e) => {
            if let TournamentError::Storage(ref source) = e {
                warn!("Database error: {}", source);
            }
            render::error(&e)
        }
    }
}

async fn send(bot: &Bot, chat_id: ChatId, reply: impl Into<Reply>) -> ResponseResult<()> {
    let reply = reply.into();
    let mut request = bot.send_message(chat_id, reply.text).parse_mode(ParseMode::Html);
    if let Some(keyboard) = reply.keyboard {
        request = request.reply_markup(keyboard);
    }
    request.await?;
    Ok(())
}

// ==================== ENDPOINTS ====================

pub async fn handle_command(bot: Bot, msg: Message, cmd: Command, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(ref user) = msg.from else {
        return Ok(());
    };
    let reply = command_reply(&state, user.id.0 as i64, &user.first_name, cmd).await;
    send(&bot, msg.chat.id, reply).await
}

pub async fn handle_admin_command(
    bot: Bot,
    msg: Message,
    cmd: AdminCommand,
    state: Arc<BotState>,
) -> ResponseResult<()> {
    let Some(ref user) = msg.from else {
        return Ok(());
    };
    let text = admin_reply(&state, user.id.0 as i64, cmd).await;
    send(&bot, msg.chat.id, text).await
}

/// Free-text messages drive the registration dialogue.
pub async fn handle_text(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let (Some(user), Some(text)) = (msg.from.as_ref(), msg.text()) else {
        return Ok(());
    };
    let reply = text_reply(&state, user.id.0 as i64, text).await;
    send(&bot, msg.chat.id, reply).await
}

/// Inline button presses: picking a tournament or leaving one.
pub async fn handle_callback(bot: Bot, q: CallbackQuery, state: Arc<BotState>) -> ResponseResult<()> {
    let user_id = q.from.id.0 as i64;

    // An expired query must not cost the user their action.
    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        warn!("Could not answer callback query from {}: {}", user_id, e);
    }

    let Some(callback) = q.data.as_deref().and_then(Callback::parse) else {
        warn!("Unknown callback data from {}: {:?}", user_id, q.data);
        return Ok(());
    };
    let text = callback_reply(&state, user_id, callback).await;
    send(&bot, ChatId(user_id), text).await
}

// ==================== REPLIES ====================

pub async fn command_reply<D: Deliver>(state: &BotState<D>, user_id: i64, first_name: &str, cmd: Command) -> Reply {
    state.remember(user_id);

    match cmd {
        Command::Start => render::welcome(first_name).into(),
        Command::Help => render::help(state.is_admin(user_id)).into(),
        Command::MyInfo => finish(
            state
                .db
                .get_user(user_id)
                .map(|u| render::my_info(u.as_ref()))
                .map_err(TournamentError::from),
        )
        .into(),
        Command::Register => match state.db.open_tournaments() {
            Ok(open) if open.is_empty() => render::NO_OPEN_TOURNAMENTS.into(),
            Ok(open) => {
                state.sessions.put(user_id, Dialogue::ChoosingTournament).await;
                Reply {
                    text: render::CHOOSE_TOURNAMENT.to_string(),
                    keyboard: Some(render::tournament_keyboard(&open)),
                }
            }
            Err(e) => finish(Err(e.into())).into(),
        },
        Command::MyTournaments => match state.db.tournaments_for_user(user_id) {
            Ok(joined) => Reply {
                text: render::my_tournaments(&joined),
                keyboard: (!joined.is_empty()).then(|| render::cancel_keyboard(&joined)),
            },
            Err(e) => finish(Err(e.into())).into(),
        },
        Command::Unregister(arg) => finish(
            parse::tournament_id(&arg).and_then(|id| Ok(render::left(id, state.db.unregister(id, user_id)?))),
        )
        .into(),
        Command::Cancel => {
            if state.sessions.cancel(user_id).await {
                render::CANCELLED.into()
            } else {
                render::NOTHING_TO_CANCEL.into()
            }
        }
    }
}

pub async fn admin_reply<D: Deliver>(state: &BotState<D>, user_id: i64, cmd: AdminCommand) -> String {
    if !state.is_admin(user_id) {
        info!("Admin command {:?} refused for {}", cmd, user_id);
        return render::NOT_AUTHORIZED.to_string();
    }

    match cmd {
        AdminCommand::Admin => render::admin_panel(),
        AdminCommand::Tournaments => finish(overview(&state.db)),
        AdminCommand::AddTournament(args) => finish(
            parse::new_tournament(&args).and_then(|new| Ok(render::created(&state.db.add_tournament(&new)?))),
        ),
        AdminCommand::Registrations(arg) => finish(parse::tournament_id(&arg).and_then(|id| {
            let tournament = state.db.get_tournament(id)?.ok_or(TournamentError::TournamentNotFound)?;
            Ok(render::roster(&tournament, &state.db.registrations_for(id)?))
        })),
        AdminCommand::Broadcast(message) => {
            let message = message.trim();
            if message.is_empty() {
                return finish(Err(TournamentError::InvalidInput("usage: /broadcast <text>".to_string())));
            }
            match state.db.all_user_ids() {
                Ok(recipients) => {
                    info!("📢 Broadcast by {} to {} users", user_id, recipients.len());
                    let tally = fan_out(&state.outbox, &recipients, &render::broadcast(message), state.broadcast_delay).await;
                    render::tally("Broadcast", &tally)
                }
                Err(e) => finish(Err(e.into())),
            }
        }
        AdminCommand::SetRoom(args) => finish(parse::room(&args).and_then(|(id, room)| {
            state.db.set_room(id, &room)?;
            Ok(render::room_saved(id))
        })),
        AdminCommand::SendRoom(arg) => send_room(state, &arg).await,
        AdminCommand::Kick(args) => finish(
            parse::kick(&args)
                .and_then(|(id, game_id)| Ok(render::kicked(&game_id, id, state.db.kick(id, &game_id)?))),
        ),
        AdminCommand::DeleteTournament(arg) => finish(
            parse::tournament_id(&arg).and_then(|id| Ok(render::deleted(id, state.db.delete_tournament(id)?))),
        ),
    }
}

fn overview(db: &Database) -> Result<String, TournamentError> {
    let listing = db
        .tournaments()?
        .into_iter()
        .map(|t| -> Result<(Tournament, u32), TournamentError> {
            let count = db.count_registrations(t.id)?;
            Ok((t, count))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(render::overview(&listing))
}

/// Deliver room credentials to every registrant of the tournament.
async fn send_room<D: Deliver>(state: &BotState<D>, arg: &str) -> String {
    let prepared = parse::tournament_id(arg).and_then(|id| {
        let tournament = state.db.get_tournament(id)?.ok_or(TournamentError::TournamentNotFound)?;
        let recipients: Vec<i64> = state.db.registrations_for(id)?.into_iter().map(|r| r.telegram_id).collect();
        Ok((tournament, recipients))
    });

    match prepared {
        Ok((tournament, recipients)) => match tournament.room {
            Some(ref room) => {
                info!("🔑 Sending room for tournament {} to {} players", tournament.id, recipients.len());
                let text = render::room(&tournament, room);
                let tally = fan_out(&state.outbox, &recipients, &text, state.broadcast_delay).await;
                render::tally("Room details", &tally)
            }
            None => render::room_missing(tournament.id),
        },
        Err(e) => finish(Err(e)),
    }
}

pub async fn text_reply<D: Deliver>(state: &BotState<D>, user_id: i64, text: &str) -> String {
    let Some(dialogue) = state.sessions.take(user_id).await else {
        return render::NO_DIALOGUE.to_string();
    };

    match dialogue.answer(text) {
        Transition::Next(next) => {
            let prompt = match &next {
                Dialogue::AwaitingGameId { game_name, .. } => render::ask_game_id(game_name),
                _ => render::NO_DIALOGUE.to_string(),
            };
            state.sessions.put(user_id, next).await;
            prompt
        }
        Transition::Retry(same, rejection) => {
            state.sessions.put(user_id, same).await;
            render::rejection(rejection)
        }
        Transition::Complete { tournament_id, identity } => finish(
            state
                .db
                .register_player(tournament_id, user_id, &identity)
                .and_then(|registered| {
                    let tournament = state
                        .db
                        .get_tournament(tournament_id)?
                        .ok_or(TournamentError::TournamentNotFound)?;
                    Ok(render::registered(&tournament, &identity, &registered))
                }),
        ),
    }
}

pub async fn callback_reply<D: Deliver>(state: &BotState<D>, user_id: i64, callback: Callback) -> String {
    state.remember(user_id);

    match callback {
        Callback::Register(tournament_id) => {
            let picked = state
                .db
                .get_tournament(tournament_id)
                .map_err(TournamentError::from)
                .and_then(|t| t.ok_or(TournamentError::TournamentNotFound))
                .and_then(|t| admit(t.status).map(|()| t));
            match picked {
                Ok(tournament) => {
                    state.sessions.put(user_id, Dialogue::chose(tournament_id)).await;
                    render::ask_game_name(&tournament)
                }
                Err(e) => {
                    state.sessions.cancel(user_id).await;
                    finish(Err(e))
                }
            }
        }
        Callback::Unregister(tournament_id) => finish(
            state
                .db
                .unregister(tournament_id, user_id)
                .map(|removed| render::left(tournament_id, removed)),
        ),
    }
}
