use std::fmt;
use std::str::FromStr;

/// Header carrying the webhook event type.
pub const EVENT_HEADER: &str = "X-Discourse-Event";
/// Header carrying the origin of the forum that sent the webhook.
pub const INSTANCE_HEADER: &str = "X-Discourse-Instance";

/// Webhook events this service turns into notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    TopicCreated,
    PostCreated,
    PostEdited,
}

impl EventKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TopicCreated => "topic_created",
            Self::PostCreated => "post_created",
            Self::PostEdited => "post_edited",
        }
    }

    /// Whether this event is about a single post rather than a whole topic.
    #[must_use]
    pub const fn is_post_event(self) -> bool {
        matches!(self, Self::PostCreated | Self::PostEdited)
    }

    /// Map a header value to a known event, `None` for anything else.
    #[must_use]
    pub fn from_header(value: &str) -> Option<Self> {
        value.parse().ok()
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event type string not handled by this service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized event type: {0}")]
pub struct UnknownEvent(pub String);

impl FromStr for EventKind {
    type Err = UnknownEvent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "topic_created" => Ok(Self::TopicCreated),
            "post_created" => Ok(Self::PostCreated),
            "post_edited" => Ok(Self::PostEdited),
            other => Err(UnknownEvent(other.to_string())),
        }
    }
}
