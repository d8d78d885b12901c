//! Discourse chat notifier library.
//!
//! Receives Discourse webhooks, fills in topic details the payload left out,
//! renders a short HTML notification and hands it to the chats subscribed to
//! the forum's theme.

pub mod config;
pub mod discourse;
pub mod handler;
pub mod message;
pub mod notify;
pub mod web;
