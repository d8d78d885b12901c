use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{Notifier, NotifyError, OutgoingMessage, ParseMode, SubscriberRegistry};

/// Delivers messages through the Telegram Bot API `sendMessage` method.
pub struct TelegramNotifier {
    client: Client,
    api_url: String,
    token: String,
    subscribers: SubscriberRegistry,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    disable_web_page_preview: bool,
}

impl TelegramNotifier {
    /// Create a notifier for the bot identified by `token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        api_url: &str,
        token: &str,
        subscribers: SubscriberRegistry,
    ) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(NotifyError::Client)?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            subscribers,
        })
    }

    async fn send(&self, chat_id: i64, message: &OutgoingMessage) -> Result<(), reqwest::Error> {
        let body = SendMessage {
            chat_id,
            text: &message.text,
            parse_mode: match message.parse_mode {
                ParseMode::Html => Some("HTML"),
                ParseMode::Plain => None,
            },
            disable_web_page_preview: true,
        };

        self.client
            .post(format!("{}/bot{}/sendMessage", self.api_url, self.token))
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify_all(
        &self,
        theme: &str,
        message: &OutgoingMessage,
    ) -> Result<usize, NotifyError> {
        let chats = self.subscribers.subscribers(theme);
        if chats.is_empty() {
            debug!(theme = %theme, "No subscribers for theme");
            return Ok(0);
        }

        let mut delivered = 0;
        for &chat_id in chats {
            match self.send(chat_id, message).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    let status = e.status();
                    // The request URL contains the bot token.
                    let e = e.without_url();
                    warn!(chat_id, ?status, "Failed to deliver message: {e}");
                }
            }
        }

        if delivered == 0 {
            return Err(NotifyError::AllFailed {
                theme: theme.to_string(),
                failed: chats.len(),
            });
        }

        info!(theme = %theme, delivered, total = chats.len(), "Notification delivered");
        Ok(delivered)
    }
}
