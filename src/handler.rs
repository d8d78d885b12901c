//! Turns one Discourse webhook into one chat notification.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::{Config, DEFAULT_THEME};
use crate::discourse::{ClientError, EventKind, Payload, TopicClient};
use crate::message::{MessageError, MessageFormatter};
use crate::notify::{Notifier, OutgoingMessage};

/// Environment variable holding the Discourse API key used for enrichment.
pub const API_KEY_ENV: &str = "DISCOURSE_API_KEY";

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("failed to decode webhook payload: {0}")]
    DecodePayload(#[source] serde_json::Error),
    #[error("topic enrichment failed: {0}")]
    Enrichment(#[from] ClientError),
    #[error("cannot format notification: {0}")]
    Message(#[from] MessageError),
}

/// Where the enrichment API key comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiKeySource {
    /// Read `DISCOURSE_API_KEY` on every request.
    Env,
    /// Fixed key; `None` disables enrichment.
    Static(Option<String>),
}

impl ApiKeySource {
    fn current(&self) -> Option<String> {
        let key = match self {
            Self::Env => std::env::var(API_KEY_ENV).ok(),
            Self::Static(key) => key.clone(),
        };
        key.filter(|k| !k.is_empty())
    }
}

/// Handles webhook deliveries: decode, enrich, format, dispatch.
pub struct EventHandler {
    topics: TopicClient,
    notifier: Arc<dyn Notifier>,
    formatter: MessageFormatter,
    theme: String,
    api_key: ApiKeySource,
}

impl EventHandler {
    #[must_use]
    pub fn new(topics: TopicClient, notifier: Arc<dyn Notifier>, formatter: MessageFormatter) -> Self {
        Self {
            topics,
            notifier,
            formatter,
            theme: DEFAULT_THEME.to_string(),
            api_key: ApiKeySource::Env,
        }
    }

    /// Build a handler from application configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the enrichment HTTP client cannot be built.
    pub fn from_config(config: &Config, notifier: Arc<dyn Notifier>) -> Result<Self, ClientError> {
        let mut formatter = MessageFormatter::new(config.locale);
        if config.include_preview {
            formatter = formatter.with_preview(config.preview_max_chars);
        }
        let topics = TopicClient::new(config.enrichment_timeout)?;
        Ok(Self::new(topics, notifier, formatter).with_theme(&config.notify_theme))
    }

    /// Dispatch to subscribers of `theme` instead of the default.
    #[must_use]
    pub fn with_theme(mut self, theme: &str) -> Self {
        self.theme = theme.to_string();
        self
    }

    /// Pin the enrichment key instead of reading it from the environment.
    #[must_use]
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = ApiKeySource::Static(api_key);
        self
    }

    /// Handle one webhook delivery.
    ///
    /// Returns `Ok(None)` for event types that are not notified about, and
    /// the dispatched text otherwise. Delivery failures are logged but do
    /// not fail the call.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be decoded, the topic lookup
    /// fails, or the payload lacks what its event needs. Nothing is
    /// dispatched in those cases.
    pub async fn handle(
        &self,
        event_type: &str,
        forum_url: &str,
        body: &[u8],
    ) -> Result<Option<String>, HandlerError> {
        let Some(kind) = EventKind::from_header(event_type) else {
            debug!(event = %event_type, "Ignoring unhandled event type");
            return Ok(None);
        };

        let mut payload = Payload::from_webhook(body, forum_url).map_err(|e| {
            error!(event = %kind, "Failed to decode webhook payload: {e}");
            HandlerError::DecodePayload(e)
        })?;

        if kind.is_post_event() {
            self.enrich(&mut payload).await?;
        }

        let text = self.formatter.format(kind, &payload).map_err(|e| {
            warn!(event = %kind, "Cannot format notification: {e}");
            HandlerError::Message(e)
        })?;

        let message = OutgoingMessage::html(text);
        match self.notifier.notify_all(&self.theme, &message).await {
            Ok(delivered) => info!(event = %kind, theme = %self.theme, delivered, "Dispatched notification"),
            Err(e) => warn!(event = %kind, theme = %self.theme, "Notification delivery failed: {e}"),
        }

        Ok(Some(message.text))
    }

    /// Attach the topic to a post payload that arrived without one.
    async fn enrich(&self, payload: &mut Payload) -> Result<(), HandlerError> {
        if !payload.needs_topic() {
            return Ok(());
        }
        let Some(api_key) = self.api_key.current() else {
            debug!("No Discourse API key configured, skipping topic lookup");
            return Ok(());
        };
        let Some(post) = payload.post.as_ref() else {
            return Ok(());
        };

        let topic = self
            .topics
            .fetch_topic(&payload.forum_url, post.topic_id, &api_key, &post.username)
            .await
            .map_err(|e| {
                error!(topic_id = post.topic_id, "Problem getting topic details: {e}");
                HandlerError::Enrichment(e)
            })?;

        payload.topic = Some(topic);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_api_key() {
        assert_eq!(ApiKeySource::Static(None).current(), None);
        assert_eq!(ApiKeySource::Static(Some(String::new())).current(), None);
        assert_eq!(
            ApiKeySource::Static(Some("k".to_string())).current().as_deref(),
            Some("k")
        );
    }
}
