//! Relay loop: one console line in, at most one webhook send out.

use crate::botpress::{MessagePayload, RelayError, WebhookReply, WebhookSender};
use crate::conversation::ConversationCell;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Input that ends the relay loop. Case-insensitive.
pub const QUIT_COMMAND: &str = "quit";

/// Result of handling one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Blank line; nothing sent.
    Skipped,
    /// Quit command; the loop stops after this.
    Quit,
    /// No conversation id has been received yet; nothing sent.
    Waiting,
    Reply(WebhookReply),
    Failed(RelayError),
}

/// Why `Relay::run` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayStop {
    Quit,
    EndOfInput,
}

/// Forwards operator lines to the webhook using the current conversation id.
#[derive(Clone)]
pub struct Relay {
    sender: Arc<dyn WebhookSender>,
    conversation: ConversationCell,
    user_id: String,
}

impl Relay {
    pub fn new(
        sender: Arc<dyn WebhookSender>,
        conversation: ConversationCell,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            sender,
            conversation,
            user_id: user_id.into(),
        }
    }

    /// Handle a single line. Send failures come back as `Failed`, never as an error.
    pub async fn handle_line(&self, line: &str) -> RelayOutcome {
        let text = line.trim();
        if text.is_empty() {
            return RelayOutcome::Skipped;
        }
        if text.eq_ignore_ascii_case(QUIT_COMMAND) {
            return RelayOutcome::Quit;
        }
        let Some(conversation_id) = self.conversation.get().await else {
            log::debug!("relay: no conversation id yet, not sending");
            return RelayOutcome::Waiting;
        };
        let payload = MessagePayload::new(conversation_id, self.user_id.as_str(), text);
        match self.sender.send(&payload).await {
            Ok(reply) => RelayOutcome::Reply(reply),
            Err(e) => {
                log::debug!("relay: send failed: {}", e);
                RelayOutcome::Failed(e)
            }
        }
    }

    /// Drain `lines` until quit or end of input, reporting each outcome to `on_outcome`.
    pub async fn run<F>(&self, mut lines: mpsc::Receiver<String>, mut on_outcome: F) -> RelayStop
    where
        F: FnMut(&RelayOutcome),
    {
        while let Some(line) = lines.recv().await {
            let outcome = self.handle_line(&line).await;
            on_outcome(&outcome);
            if outcome == RelayOutcome::Quit {
                log::info!("relay: quit received");
                return RelayStop::Quit;
            }
        }
        log::info!("relay: input closed");
        RelayStop::EndOfInput
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::botpress::FALLBACK_REPLY;
    use crate::relay::{spawn_line_reader, VecLineSource};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every payload; answers with a canned result.
    struct FakeSender {
        sent: Mutex<Vec<MessagePayload>>,
        result: Result<WebhookReply, RelayError>,
    }

    impl FakeSender {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
                result: Ok(WebhookReply {
                    text: text.to_string(),
                    conversation_id: None,
                }),
            })
        }

        fn failing(err: RelayError) -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
                result: Err(err),
            })
        }

        fn sent(&self) -> Vec<MessagePayload> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl WebhookSender for FakeSender {
        async fn send(&self, payload: &MessagePayload) -> Result<WebhookReply, RelayError> {
            self.sent.lock().unwrap().push(payload.clone());
            self.result.clone()
        }
    }

    async fn relay_with(sender: Arc<FakeSender>, conversation: Option<&str>) -> Relay {
        let cell = ConversationCell::new();
        if let Some(id) = conversation {
            cell.set(id).await;
        }
        Relay::new(sender, cell, "simulator_user")
    }

    #[tokio::test]
    async fn blank_lines_send_nothing() {
        let sender = FakeSender::replying("hello");
        let relay = relay_with(sender.clone(), Some("conv-1")).await;
        assert_eq!(relay.handle_line("").await, RelayOutcome::Skipped);
        assert_eq!(relay.handle_line("   \t").await, RelayOutcome::Skipped);
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn quit_in_any_case() {
        let sender = FakeSender::replying("hello");
        let relay = relay_with(sender.clone(), Some("conv-1")).await;
        for line in ["quit", "QUIT", " Quit "] {
            assert_eq!(relay.handle_line(line).await, RelayOutcome::Quit);
        }
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn waits_for_conversation_id() {
        let sender = FakeSender::replying("hello");
        let relay = relay_with(sender.clone(), None).await;
        assert_eq!(relay.handle_line("hi").await, RelayOutcome::Waiting);
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn sends_with_current_conversation() {
        let sender = FakeSender::replying("hello");
        let relay = relay_with(sender.clone(), Some("conv-1")).await;
        let outcome = relay.handle_line("  hi bot \n").await;
        assert_eq!(
            outcome,
            RelayOutcome::Reply(WebhookReply {
                text: "hello".to_string(),
                conversation_id: None,
            })
        );
        assert_eq!(
            sender.sent(),
            vec![MessagePayload::new("conv-1", "simulator_user", "hi bot")]
        );
    }

    #[tokio::test]
    async fn picks_up_conversation_changes_between_lines() {
        let sender = FakeSender::replying(FALLBACK_REPLY);
        let cell = ConversationCell::new();
        let relay = Relay::new(sender.clone(), cell.clone(), "u");
        cell.set("first").await;
        relay.handle_line("a").await;
        cell.set("second").await;
        relay.handle_line("b").await;
        let ids: Vec<String> = sender.sent().into_iter().map(|p| p.conversation_id).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn send_failure_is_reported_not_raised() {
        let sender = FakeSender::failing(RelayError::HttpStatus(500));
        let relay = relay_with(sender.clone(), Some("conv-1")).await;
        match relay.handle_line("hi").await {
            RelayOutcome::Failed(e) => assert!(e.to_string().contains("500")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn run_stops_at_quit() {
        let sender = FakeSender::replying("ok");
        let relay = relay_with(sender.clone(), Some("conv-1")).await;
        let lines = spawn_line_reader(VecLineSource::new(["one", "", "QUIT", "never sent"])).unwrap();
        let mut outcomes = Vec::new();
        let stop = relay.run(lines, |o| outcomes.push(o.clone())).await;
        assert_eq!(stop, RelayStop::Quit);
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[2], RelayOutcome::Quit);
        assert_eq!(sender.sent().len(), 1);
    }

    #[tokio::test]
    async fn run_ends_with_input() {
        let sender = FakeSender::replying("ok");
        let relay = relay_with(sender.clone(), Some("conv-1")).await;
        let lines = spawn_line_reader(VecLineSource::new(["a", "b"])).unwrap();
        let stop = relay.run(lines, |_| {}).await;
        assert_eq!(stop, RelayStop::EndOfInput);
        assert_eq!(sender.sent().len(), 2);
    }
}
