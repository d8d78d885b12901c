//! Notification text for forum events.
//!
//! Messages are rendered as chat HTML: the link phrase is wrapped in an
//! anchor, and every value that came from the forum is escaped.

use regex::Regex;
use scraper::Html;
use thiserror::Error;

use crate::discourse::{EventKind, Payload, Post, Topic};

/// Matches block-level markup that chat HTML cannot display.
static BLOCK_MARKUP: std::sync::LazyLock<Regex> =
    std::sync::LazyLock::new(|| Regex::new(r"(?i)<\s*(div|blockquote)\b").unwrap());

/// Language of rendered notifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Locale {
    #[default]
    En,
    Ru,
}

impl Locale {
    /// Text shown instead of a post body that cannot be previewed.
    #[must_use]
    pub const fn preview_placeholder(self) -> &'static str {
        match self {
            Self::En => "(preview unavailable: the post contains quotes or embedded content)",
            Self::Ru => "(превью недоступно: пост содержит цитаты или встроенный контент)",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MessageError {
    #[error("{0} payload has no post")]
    MissingPost(EventKind),
    #[error("{0} payload has no topic")]
    MissingTopic(EventKind),
    #[error("topic {topic_id} has no creator details")]
    MissingCreator { topic_id: u64 },
}

/// Renders payloads into notification text.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageFormatter {
    locale: Locale,
    preview_max_chars: Option<usize>,
}

impl MessageFormatter {
    #[must_use]
    pub fn new(locale: Locale) -> Self {
        Self {
            locale,
            preview_max_chars: None,
        }
    }

    /// Append a body preview of at most `max_chars` characters to post messages.
    #[must_use]
    pub fn with_preview(mut self, max_chars: usize) -> Self {
        self.preview_max_chars = Some(max_chars);
        self
    }

    /// Render the notification for `kind`.
    ///
    /// Post events use the embedded topic title when there is one and a
    /// generic wording otherwise. Topic events always credit the creator from
    /// `topic.details.created_by`.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload lacks the entity the event is about.
    pub fn format(&self, kind: EventKind, payload: &Payload) -> Result<String, MessageError> {
        match kind {
            EventKind::PostCreated | EventKind::PostEdited => {
                let post = payload.post.as_ref().ok_or(MessageError::MissingPost(kind))?;
                let mut message =
                    self.post_headline(kind, &payload.forum_url, post, payload.topic.as_ref());
                if let Some(max_chars) = self.preview_max_chars {
                    if let Some(preview) = render_preview(&post.cooked, max_chars, self.locale) {
                        message.push_str("\n\n");
                        message.push_str(&preview);
                    }
                }
                Ok(message)
            }
            EventKind::TopicCreated => {
                let topic = payload
                    .topic
                    .as_ref()
                    .ok_or(MessageError::MissingTopic(kind))?;
                let creator = topic
                    .creator_username()
                    .ok_or(MessageError::MissingCreator { topic_id: topic.id })?;
                Ok(self.topic_headline(&payload.forum_url, topic, creator))
            }
        }
    }

    fn post_headline(
        &self,
        kind: EventKind,
        forum_url: &str,
        post: &Post,
        topic: Option<&Topic>,
    ) -> String {
        let user = escape_html(&post.username);
        let url = escape_html(&post_url(forum_url, post));
        let edited = kind == EventKind::PostEdited;

        match (self.locale, topic) {
            (Locale::En, Some(topic)) => {
                let title = escape_html(&topic.title);
                if edited {
                    format!(r#"@{user} updated a <a href="{url}">link to "{title}"</a>"#)
                } else {
                    format!(r#"@{user} posted a new <a href="{url}">link to "{title}"</a>"#)
                }
            }
            (Locale::En, None) => {
                if edited {
                    format!(r#"@{user} updated a <a href="{url}">link to the forum</a>"#)
                } else {
                    format!(r#"@{user} posted a new <a href="{url}">link to the forum</a>"#)
                }
            }
            (Locale::Ru, Some(topic)) => {
                let title = escape_html(&topic.title);
                if edited {
                    format!(r#"@{user} обновил <a href="{url}">пост в "{title}"</a>"#)
                } else {
                    format!(r#"@{user} написал новый <a href="{url}">пост в "{title}"</a>"#)
                }
            }
            (Locale::Ru, None) => {
                if edited {
                    format!(r#"@{user} обновил <a href="{url}">пост на форуме</a>"#)
                } else {
                    format!(r#"@{user} написал новый <a href="{url}">пост на форум</a>"#)
                }
            }
        }
    }

    fn topic_headline(&self, forum_url: &str, topic: &Topic, creator: &str) -> String {
        let user = escape_html(creator);
        let url = escape_html(&topic_url(forum_url, topic));
        let title = escape_html(&topic.title);

        match self.locale {
            Locale::En => {
                format!(r#"@{user} created a new link <a href="{url}">"{title}"</a> on the forum"#)
            }
            Locale::Ru => {
                format!(r#"@{user} создал новый топик <a href="{url}">"{title}"</a> на форуме"#)
            }
        }
    }
}

/// `{forum}/t/{slug}/{topic_id}/{post_id}`, taken from the post itself.
#[must_use]
pub fn post_url(forum_url: &str, post: &Post) -> String {
    format!(
        "{}/t/{}/{}/{}",
        forum_url.trim_end_matches('/'),
        post.topic_slug,
        post.topic_id,
        post.id
    )
}

/// `{forum}/t/{slug}/{topic_id}`.
#[must_use]
pub fn topic_url(forum_url: &str, topic: &Topic) -> String {
    format!(
        "{}/t/{}/{}",
        forum_url.trim_end_matches('/'),
        topic.slug,
        topic.id
    )
}

/// Turn a post's cooked HTML into something a chat message can carry.
///
/// Bodies with block-level markup become the locale's placeholder. Short
/// bodies pass through unchanged; long ones are reduced to their text,
/// truncated and escaped. Returns `None` for an empty body.
#[must_use]
pub fn render_preview(cooked: &str, max_chars: usize, locale: Locale) -> Option<String> {
    let cooked = cooked.trim();
    if cooked.is_empty() {
        return None;
    }
    if contains_block_markup(cooked) {
        return Some(locale.preview_placeholder().to_string());
    }
    if cooked.chars().count() <= max_chars {
        return Some(cooked.to_string());
    }

    let text = html_to_text(cooked);
    if text.is_empty() {
        return None;
    }
    if text.chars().count() <= max_chars {
        return Some(escape_html(&text));
    }
    let truncated: String = text.chars().take(max_chars).collect();
    Some(format!("{}…", escape_html(truncated.trim_end())))
}

/// Whether `html` contains a `<div>` or `<blockquote>` tag.
#[must_use]
pub fn contains_block_markup(html: &str) -> bool {
    BLOCK_MARKUP.is_match(html)
}

fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text: String = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Escape text for interpolation into chat HTML.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
