//! Discourse webhook payloads and the forum API lookup used to complete them.

mod client;
mod event;
mod models;

pub use client::{ClientError, TopicClient};
pub use event::{EventKind, UnknownEvent, EVENT_HEADER, INSTANCE_HEADER};
pub use models::{Payload, Post, Topic, TopicDetails, User, UserSummary};
