//! Per-user registration dialogue.
//!
//! Each user has at most one dialogue in flight. The state says what the
//! bot is waiting for; free-text answers move it forward.

use crate::tournament::GameIdentity;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Longest accepted answer, in characters.
pub const MAX_ANSWER_CHARS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dialogue {
    /// Tournament keyboard was shown, waiting for a button press.
    ChoosingTournament,
    AwaitingGameName { tournament_id: i64 },
    AwaitingGameId { tournament_id: i64, game_name: String },
}

/// Why an answer was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Empty,
    TooLong,
    MultiLine,
    /// Looks like a slash command the bot does not know.
    Command,
    /// Text was sent while a button press was expected.
    UseKeyboard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Ask the next question.
    Next(Dialogue),
    /// Same question again.
    Retry(Dialogue, Rejection),
    /// All answers collected.
    Complete { tournament_id: i64, identity: GameIdentity },
}

fn validate(text: &str) -> Result<String, Rejection> {
    let text = text.trim();
    if text.is_empty() {
        Err(Rejection::Empty)
    } else if text.starts_with('/') {
        Err(Rejection::Command)
    } else if text.contains('\n') {
        Err(Rejection::MultiLine)
    } else if text.chars().count() > MAX_ANSWER_CHARS {
        Err(Rejection::TooLong)
    } else {
        Ok(text.to_string())
    }
}

impl Dialogue {
    /// The player picked a tournament.
    pub fn chose(tournament_id: i64) -> Self {
        Dialogue::AwaitingGameName { tournament_id }
    }

    /// Feed a free-text answer.
    pub fn answer(self, text: &str) -> Transition {
        match self {
            Dialogue::ChoosingTournament => Transition::Retry(Dialogue::ChoosingTournament, Rejection::UseKeyboard),
            Dialogue::AwaitingGameName { tournament_id } => match validate(text) {
                Ok(game_name) => Transition::Next(Dialogue::AwaitingGameId { tournament_id, game_name }),
                Err(rejection) => Transition::Retry(Dialogue::AwaitingGameName { tournament_id }, rejection),
            },
            Dialogue::AwaitingGameId { tournament_id, game_name } => match validate(text) {
                Ok(game_id) => Transition::Complete {
                    tournament_id,
                    identity: GameIdentity { game_name, game_id },
                },
                Err(rejection) => {
                    Transition::Retry(Dialogue::AwaitingGameId { tournament_id, game_name }, rejection)
                }
            },
        }
    }
}

/// Dialogues keyed by Telegram user id.
#[derive(Default)]
pub struct Sessions {
    inner: Mutex<HashMap<i64, Dialogue>>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start or replace the user's dialogue.
    pub async fn put(&self, user_id: i64, dialogue: Dialogue) {
        self.inner.lock().await.insert(user_id, dialogue);
    }

    /// Remove and return the user's dialogue.
    pub async fn take(&self, user_id: i64) -> Option<Dialogue> {
        self.inner.lock().await.remove(&user_id)
    }

    /// Drop the user's dialogue. Returns whether one was active.
    pub async fn cancel(&self, user_id: i64) -> bool {
        self.take(user_id).await.is_some()
    }

    #[cfg(test)]
    pub async fn get(&self, user_id: i64) -> Option<Dialogue> {
        self.inner.lock().await.get(&user_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_registration_flow() {
        let dialogue = Dialogue::chose(3);
        let Transition::Next(dialogue) = dialogue.answer("  SniperKing ") else {
            panic!("expected next step");
        };
        assert_eq!(
            dialogue,
            Dialogue::AwaitingGameId { tournament_id: 3, game_name: "SniperKing".to_string() }
        );

        let done = dialogue.answer("123456789");
        assert_eq!(
            done,
            Transition::Complete {
                tournament_id: 3,
                identity: GameIdentity {
                    game_name: "SniperKing".to_string(),
                    game_id: "123456789".to_string(),
                },
            }
        );
    }

    #[test]
    fn test_rejects_bad_answers() {
        let asking_name = Dialogue::chose(1);
        assert_eq!(
            asking_name.clone().answer("   "),
            Transition::Retry(asking_name.clone(), Rejection::Empty)
        );
        assert_eq!(
            asking_name.clone().answer("two\nlines"),
            Transition::Retry(asking_name.clone(), Rejection::MultiLine)
        );
        let long = "x".repeat(MAX_ANSWER_CHARS + 1);
        assert_eq!(
            asking_name.clone().answer(&long),
            Transition::Retry(asking_name, Rejection::TooLong)
        );
    }

    #[test]
    fn test_unknown_command_is_not_an_answer() {
        let asking_name = Dialogue::chose(1);
        assert_eq!(
            asking_name.clone().answer("/cancel now"),
            Transition::Retry(asking_name, Rejection::Command)
        );

        let asking_id = Dialogue::AwaitingGameId { tournament_id: 1, game_name: "Ace".to_string() };
        assert_eq!(
            asking_id.clone().answer(" /foo"),
            Transition::Retry(asking_id, Rejection::Command)
        );
    }

    #[test]
    fn test_accepts_answer_at_limit() {
        let exact = "é".repeat(MAX_ANSWER_CHARS);
        assert!(matches!(Dialogue::chose(1).answer(&exact), Transition::Next(_)));
    }

    #[test]
    fn test_text_while_choosing() {
        assert_eq!(
            Dialogue::ChoosingTournament.answer("the first one"),
            Transition::Retry(Dialogue::ChoosingTournament, Rejection::UseKeyboard)
        );
    }

    #[tokio::test]
    async fn test_sessions_are_per_user() {
        let sessions = Sessions::new();
        sessions.put(1, Dialogue::ChoosingTournament).await;
        sessions.put(2, Dialogue::chose(9)).await;

        assert_eq!(sessions.get(1).await, Some(Dialogue::ChoosingTournament));
        assert_eq!(sessions.take(2).await, Some(Dialogue::chose(9)));
        assert_eq!(sessions.take(2).await, None);

        assert!(sessions.cancel(1).await);
        assert!(!sessions.cancel(1).await);
    }
}
