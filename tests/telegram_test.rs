//! Integration tests for Telegram delivery.

use discourse_chat_notifier::notify::{
    Notifier, NotifyError, OutgoingMessage, ParseMode, SubscriberRegistry, TelegramNotifier,
};
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "123:abc";

fn ok_response() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(r#"{"ok": true, "result": {}}"#, "application/json")
}

#[tokio::test]
async fn test_sends_html_message_to_every_subscriber() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/sendMessage")))
        .and(body_json(serde_json::json!({
            "chat_id": 11,
            "text": "@alice posted",
            "parse_mode": "HTML",
            "disable_web_page_preview": true
        })))
        .respond_with(ok_response())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/sendMessage")))
        .and(body_partial_json(serde_json::json!({ "chat_id": -22 })))
        .respond_with(ok_response())
        .expect(1)
        .mount(&server)
        .await;

    let registry = SubscriberRegistry::from(("forum", vec![11, -22]));
    let notifier = TelegramNotifier::new(&server.uri(), TOKEN, registry).unwrap();

    let delivered = notifier
        .notify_all("forum", &OutgoingMessage::html("@alice posted"))
        .await
        .unwrap();

    assert_eq!(delivered, 2);
}

#[tokio::test]
async fn test_failed_chat_does_not_stop_others() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(serde_json::json!({ "chat_id": 1 })))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(serde_json::json!({ "chat_id": 2 })))
        .respond_with(ok_response())
        .expect(1)
        .mount(&server)
        .await;

    let registry = SubscriberRegistry::from(("forum", vec![1, 2]));
    let notifier = TelegramNotifier::new(&server.uri(), TOKEN, registry).unwrap();

    let delivered = notifier
        .notify_all("forum", &OutgoingMessage::html("hi"))
        .await
        .unwrap();

    assert_eq!(delivered, 1);
}

#[tokio::test]
async fn test_all_chats_failing_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let registry = SubscriberRegistry::from(("forum", vec![1, 2]));
    let notifier = TelegramNotifier::new(&server.uri(), TOKEN, registry).unwrap();

    let err = notifier
        .notify_all("forum", &OutgoingMessage::html("hi"))
        .await
        .unwrap_err();

    assert!(matches!(err, NotifyError::AllFailed { failed: 2, .. }));
}

#[tokio::test]
async fn test_theme_without_subscribers_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ok_response())
        .expect(0)
        .mount(&server)
        .await;

    let registry = SubscriberRegistry::from(("forum", vec![1]));
    let notifier = TelegramNotifier::new(&server.uri(), TOKEN, registry).unwrap();

    let delivered = notifier
        .notify_all("releases", &OutgoingMessage::html("hi"))
        .await
        .unwrap();

    assert_eq!(delivered, 0);
}

#[tokio::test]
async fn test_plain_message_omits_parse_mode() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/sendMessage")))
        .and(body_json(serde_json::json!({
            "chat_id": 5,
            "text": "a < b",
            "disable_web_page_preview": true
        })))
        .respond_with(ok_response())
        .expect(1)
        .mount(&server)
        .await;

    let registry = SubscriberRegistry::from(("forum", vec![5]));
    let notifier = TelegramNotifier::new(&server.uri(), TOKEN, registry).unwrap();
    let message = OutgoingMessage {
        text: "a < b".to_string(),
        parse_mode: ParseMode::Plain,
    };

    let delivered = notifier.notify_all("forum", &message).await.unwrap();

    assert_eq!(delivered, 1);
}
