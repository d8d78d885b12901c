use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use tracing::debug;
use url::Url;

use super::models::Topic;

const USER_AGENT: &str = concat!("discourse-chat-notifier/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
    #[error("invalid topic URL for forum '{forum_url}': {source}")]
    InvalidUrl {
        forum_url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to fetch topic {topic_id}: {source}")]
    Request {
        topic_id: u64,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to decode topic {topic_id}: {source}")]
    Decode {
        topic_id: u64,
        #[source]
        source: serde_json::Error,
    },
}

/// Looks up topics that a webhook payload left out.
#[derive(Debug, Clone)]
pub struct TopicClient {
    client: Client,
}

impl TopicClient {
    /// Create a client whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(ClientError::Build)?;
        Ok(Self { client })
    }

    /// Fetch `{forum_url}/t/{topic_id}.json` on behalf of `api_username`.
    ///
    /// A single attempt is made; any failure is returned as-is.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be built, the request fails or
    /// returns a non-success status, or the body is not a topic.
    pub async fn fetch_topic(
        &self,
        forum_url: &str,
        topic_id: u64,
        api_key: &str,
        api_username: &str,
    ) -> Result<Topic, ClientError> {
        let url = topic_url(forum_url, topic_id, api_key, api_username)?;

        debug!(topic_id, forum = %forum_url, "Fetching topic for enrichment");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| request_error(topic_id, e))?;

        let body = response
            .bytes()
            .await
            .map_err(|e| request_error(topic_id, e))?;

        serde_json::from_slice(&body).map_err(|source| ClientError::Decode { topic_id, source })
    }
}

/// The request URL carries the API key, so it is dropped from the error.
fn request_error(topic_id: u64, source: reqwest::Error) -> ClientError {
    ClientError::Request {
        topic_id,
        source: source.without_url(),
    }
}

fn topic_url(
    forum_url: &str,
    topic_id: u64,
    api_key: &str,
    api_username: &str,
) -> Result<Url, ClientError> {
    let base = forum_url.trim_end_matches('/');
    let mut url =
        Url::parse(&format!("{base}/t/{topic_id}.json")).map_err(|source| ClientError::InvalidUrl {
            forum_url: forum_url.to_string(),
            source,
        })?;
    url.query_pairs_mut()
        .append_pair("api_key", api_key)
        .append_pair("api_username", api_username);
    Ok(url)
}
