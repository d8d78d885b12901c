//! Typed Discourse webhook payloads.
//!
//! Discourse omits or nulls many fields depending on the event and the
//! forum version, so scalar fields decode leniently to their defaults.

use serde::{Deserialize, Deserializer, Serialize};

/// A forum post as carried by `post_created` / `post_edited` webhooks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: u64,
    /// Author display name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Author username, used for `@mentions` and API impersonation.
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub post_number: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub post_type: i32,
    /// Rendered body HTML.
    #[serde(default, deserialize_with = "null_as_default")]
    pub cooked: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub topic_id: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub topic_slug: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_username: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub admin: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub staff: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_id: i64,
}

/// A forum topic, either nested in a webhook or returned by `/t/{id}.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub visible: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub slug: String,
    #[serde(default)]
    pub details: Option<TopicDetails>,
}

impl Topic {
    /// Username of the member who opened the topic, if Discourse sent it.
    #[must_use]
    pub fn creator_username(&self) -> Option<&str> {
        self.details
            .as_ref()
            .and_then(|d| d.created_by.as_ref())
            .map(|u| u.username.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicDetails {
    #[serde(default)]
    pub created_by: Option<UserSummary>,
}

/// Compact user record nested under `topic.details`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
    #[serde(default)]
    pub avatar_template: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Body of a Discourse webhook plus the forum origin from `X-Discourse-Instance`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Payload {
    #[serde(default)]
    pub topic: Option<Topic>,
    #[serde(default)]
    pub post: Option<Post>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(skip)]
    pub forum_url: String,
}

impl Payload {
    /// Decode a webhook body, attaching the forum origin it came from.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not valid JSON for this shape.
    pub fn from_webhook(body: &[u8], forum_url: &str) -> Result<Self, serde_json::Error> {
        let mut payload: Self = serde_json::from_slice(body)?;
        payload.forum_url = forum_url.trim_end_matches('/').to_string();
        Ok(payload)
    }

    /// Whether the topic has to be looked up before formatting.
    #[must_use]
    pub fn needs_topic(&self) -> bool {
        self.post.is_some() && self.topic.is_none()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    const POST_CREATED: &str = r#"{
        "post": {
            "id": 4242,
            "name": null,
            "username": "alice",
            "avatar_template": "/user_avatar/forum.example.com/alice/{size}/1_2.png",
            "created_at": "2024-03-01T12:00:00.000Z",
            "cooked": "<p>Have a look at this</p>",
            "post_number": 3,
            "post_type": 1,
            "updated_at": "2024-03-01T12:00:00.000Z",
            "reply_count": 0,
            "topic_id": 17,
            "topic_slug": "weekly-links",
            "topic_title": "Weekly links",
            "display_username": null,
            "admin": false,
            "staff": false,
            "user_id": 12
        }
    }"#;

    const TOPIC_CREATED: &str = r#"{
        "topic": {
            "id": 17,
            "title": "Weekly links",
            "slug": "weekly-links",
            "visible": true,
            "user_id": 12,
            "created_at": "2024-03-01T11:00:00.000Z",
            "details": {
                "created_by": {
                    "id": 12,
                    "username": "alice",
                    "avatar_template": "/user_avatar/forum.example.com/alice/{size}/1_2.png"
                }
            }
        },
        "user": { "id": 1, "username": "system", "name": "System" }
    }"#;

    #[test]
    fn test_decode_post_without_topic() {
        let payload = Payload::from_webhook(POST_CREATED.as_bytes(), "https://forum.example.com/")
            .unwrap();

        assert_eq!(payload.forum_url, "https://forum.example.com");
        assert!(payload.topic.is_none());
        assert!(payload.needs_topic());

        let post = payload.post.unwrap();
        assert_eq!(post.id, 4242);
        assert_eq!(post.username, "alice");
        assert_eq!(post.name, "");
        assert_eq!(post.display_username, "");
        assert_eq!(post.topic_id, 17);
        assert_eq!(post.topic_slug, "weekly-links");
        assert_eq!(post.post_number, 3);
    }

    #[test]
    fn test_decode_topic_with_creator() {
        let payload = Payload::from_webhook(TOPIC_CREATED.as_bytes(), "https://forum.example.com")
            .unwrap();

        let topic = payload.topic.as_ref().unwrap();
        assert_eq!(topic.title, "Weekly links");
        assert!(topic.visible);
        assert_eq!(topic.creator_username(), Some("alice"));
        assert_eq!(payload.user.as_ref().unwrap().username, "system");
        assert!(!payload.needs_topic());
    }

    #[test]
    fn test_topic_without_details_has_no_creator() {
        let topic: Topic = serde_json::from_str(r#"{"id": 1, "title": "T", "details": null}"#).unwrap();
        assert_eq!(topic.creator_username(), None);
    }

    #[test]
    fn test_null_numbers_decode_to_default() {
        let body = br#"{
            "post": {"id": 42, "username": "alice", "topic_id": 7, "topic_slug": "foo",
                     "user_id": null, "post_number": null, "post_type": null},
            "topic": {"id": null, "title": "Foo", "user_id": null,
                      "details": {"created_by": {"id": null, "username": "ghost"}}},
            "user": {"id": null, "username": "system"}
        }"#;
        let payload = Payload::from_webhook(body, "https://forum.example.com").unwrap();

        let post = payload.post.unwrap();
        assert_eq!(post.id, 42);
        assert_eq!(post.user_id, 0);
        assert_eq!(post.post_number, 0);
        assert_eq!(post.post_type, 0);

        let topic = payload.topic.unwrap();
        assert_eq!(topic.id, 0);
        assert_eq!(topic.user_id, 0);
        assert_eq!(topic.creator_username(), Some("ghost"));
        assert_eq!(payload.user.unwrap().id, 0);
    }

    #[test]
    fn test_malformed_body_is_error() {
        assert!(Payload::from_webhook(b"{\"post\": ", "https://forum.example.com").is_err());
        assert!(Payload::from_webhook(b"{\"post\": 5}", "https://forum.example.com").is_err());
    }
}
