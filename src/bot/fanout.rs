//! Paced delivery of one message to many chats.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Something that can deliver a text to a chat.
pub trait Deliver {
    fn deliver(&self, chat_id: i64, text: &str) -> impl Future<Output = Result<(), String>> + Send;
}

/// Outcome of a fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tally {
    pub sent: usize,
    pub failed: usize,
}

impl Tally {
    pub fn total(&self) -> usize {
        self.sent + self.failed
    }
}

/// Send `text` to every recipient in order, pausing between sends.
///
/// Failures (blocked bot, deleted account) are logged and counted; the
/// loop always runs to the end.
pub async fn fan_out<D: Deliver>(outbox: &D, recipients: &[i64], text: &str, pause: Duration) -> Tally {
    let mut tally = Tally::default();

    for (i, &chat_id) in recipients.iter().enumerate() {
        if i > 0 && !pause.is_zero() {
            sleep(pause).await;
        }
        match outbox.deliver(chat_id, text).await {
            Ok(()) => tally.sent += 1,
            Err(e) => {
                warn!("Could not deliver to {}: {}", chat_id, e);
                tally.failed += 1;
            }
        }
    }

    info!("📢 Fan-out finished: {}/{} delivered", tally.sent, tally.total());
    tally
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeOutbox {
        blocked: HashSet<i64>,
        delivered: Mutex<Vec<(i64, String)>>,
    }

    impl Deliver for FakeOutbox {
        fn deliver(&self, chat_id: i64, text: &str) -> impl Future<Output = Result<(), String>> + Send {
            let result = if self.blocked.contains(&chat_id) {
                Err("Forbidden: bot was blocked by the user".to_string())
            } else {
                self.delivered.lock().unwrap().push((chat_id, text.to_string()));
                Ok(())
            };
            async move { result }
        }
    }

    #[tokio::test]
    async fn test_delivers_to_everyone_in_order() {
        let outbox = FakeOutbox::default();
        let tally = fan_out(&outbox, &[3, 1, 2], "hello", Duration::ZERO).await;

        assert_eq!(tally, Tally { sent: 3, failed: 0 });
        let order: Vec<i64> = outbox.delivered.lock().unwrap().iter().map(|(id, _)| *id).collect();
        assert_eq!(order, vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn test_failures_are_counted_not_fatal() {
        let outbox = FakeOutbox {
            blocked: HashSet::from([2, 4]),
            ..Default::default()
        };
        let tally = fan_out(&outbox, &[1, 2, 3, 4, 5], "room 123", Duration::from_millis(1)).await;

        assert_eq!(tally, Tally { sent: 3, failed: 2 });
        assert_eq!(tally.total(), 5);
        assert_eq!(outbox.delivered.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_no_recipients() {
        let outbox = FakeOutbox::default();
        let tally = fan_out(&outbox, &[], "nobody", Duration::from_secs(10)).await;
        assert_eq!(tally, Tally::default());
    }
}
