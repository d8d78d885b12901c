//! Delivery of rendered notifications to chat subscribers.

mod telegram;

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

pub use telegram::TelegramNotifier;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("no chat accepted the message for theme '{theme}' ({failed} failed)")]
    AllFailed { theme: String, failed: usize },
}

/// How the chat platform should interpret message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Html,
    Plain,
}

/// A message ready to be delivered to every subscriber of a theme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub text: String,
    pub parse_mode: ParseMode,
}

impl OutgoingMessage {
    #[must_use]
    pub fn html(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parse_mode: ParseMode::Html,
        }
    }
}

/// Fan-out of a message to the chats subscribed to a theme.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `message` to every chat subscribed to `theme`.
    ///
    /// Returns the number of chats the message reached.
    ///
    /// # Errors
    ///
    /// Returns an error when delivery failed for every subscriber.
    async fn notify_all(&self, theme: &str, message: &OutgoingMessage)
        -> Result<usize, NotifyError>;
}

/// Chat ids grouped by the theme they subscribed to.
#[derive(Debug, Clone, Default)]
pub struct SubscriberRegistry {
    themes: HashMap<String, Vec<i64>>,
}

impl SubscriberRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `chat_id` to `theme`. Repeated subscriptions are ignored.
    pub fn subscribe(&mut self, theme: &str, chat_id: i64) {
        let chats = self.themes.entry(theme.to_string()).or_default();
        if !chats.contains(&chat_id) {
            chats.push(chat_id);
        }
    }

    /// Chats subscribed to `theme`, in subscription order.
    #[must_use]
    pub fn subscribers(&self, theme: &str) -> &[i64] {
        self.themes.get(theme).map_or(&[], Vec::as_slice)
    }
}

impl<I> From<(&str, I)> for SubscriberRegistry
where
    I: IntoIterator<Item = i64>,
{
    fn from((theme, chat_ids): (&str, I)) -> Self {
        let mut registry = Self::new();
        for chat_id in chat_ids {
            registry.subscribe(theme, chat_id);
        }
        registry
    }
}

/// Notifier that only writes messages to the log.
///
/// Used when no chat backend is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_all(
        &self,
        theme: &str,
        message: &OutgoingMessage,
    ) -> Result<usize, NotifyError> {
        info!(theme = %theme, text = %message.text, "Notification (no chat backend configured)");
        Ok(0)
    }
}
