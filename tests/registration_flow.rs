//! Registration conversation driven against a mocked Telegram Bot API.
//!
//! Covers the two-state flow at the handler level: a rejected input keeps
//! the dialogue waiting with nothing stored, and the full `/start` followed
//! by a valid `HH:MM` reply stores the time, confirms it and ends the
//! dialogue.

use anyhow::Result;
use fingram_bot::bot::handlers::{receive_time, start};
use fingram_bot::bot::state::State;
use fingram_bot::schedule::{DailyTime, ScheduleStore};
use reqwest::Url;
use serde_json::{json, Value};
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};
use teloxide::prelude::*;
use teloxide::types::ChatId;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Private chat message payload, matching the Telegram Bot API structure
fn message_payload(chat_id: i64, text: &str) -> Value {
    json!({
        "message_id": 1,
        "date": 1700000000i64,
        "chat": {
            "id": chat_id,
            "type": "private",
            "first_name": "Test",
        },
        "from": {
            "id": chat_id,
            "is_bot": false,
            "first_name": "Test",
        },
        "text": text,
    })
}

fn text_message(chat_id: i64, text: &str) -> Message {
    serde_json::from_value(message_payload(chat_id, text)).expect("valid message payload")
}

/// Stub answering every Bot API call with a well-formed sendMessage result
async fn telegram_stub() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": message_payload(1, "ok"),
        })))
        .mount(&server)
        .await;
    server
}

fn bot_for(server: &MockServer) -> Bot {
    let url = Url::parse(&server.uri()).expect("valid stub url");
    Bot::new("dummy-token").set_api_url(url)
}

async fn sent_bodies(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .expect("request recording enabled")
        .iter()
        .map(|request| String::from_utf8_lossy(&request.body).into_owned())
        .collect()
}

#[tokio::test]
async fn rejected_time_input_keeps_dialogue_waiting() -> Result<()> {
    let server = telegram_stub().await;
    let store = ScheduleStore::new();
    let dialogue = Dialogue::new(InMemStorage::<State>::new(), ChatId(7));
    dialogue.update(State::AwaitingTime).await?;

    receive_time(
        bot_for(&server),
        text_message(7, "18:70"),
        store.clone(),
        dialogue.clone(),
    )
    .await?;

    assert_eq!(dialogue.get().await?, Some(State::AwaitingTime));
    assert!(store.is_empty().await);

    let bodies = sent_bodies(&server).await;
    assert!(
        bodies.iter().any(|b| b.contains("Неверный формат времени")),
        "got: {bodies:?}"
    );
    Ok(())
}

#[tokio::test]
async fn registration_flow_stores_time_and_ends_dialogue() -> Result<()> {
    let server = telegram_stub().await;
    let bot = bot_for(&server);
    let store = ScheduleStore::new();
    let dialogue = Dialogue::new(InMemStorage::<State>::new(), ChatId(9));

    start(bot.clone(), text_message(9, "/start"), dialogue.clone()).await?;
    assert_eq!(dialogue.get().await?, Some(State::AwaitingTime));

    receive_time(bot, text_message(9, "09:15"), store.clone(), dialogue.clone()).await?;

    assert_eq!(store.get(ChatId(9)).await, DailyTime::parse("09:15"));
    assert_eq!(dialogue.get().await?, None);

    let bodies = sent_bodies(&server).await;
    let confirmation = bodies.last().expect("confirmation request");
    assert!(
        confirmation.contains("Время установлено на 09:15"),
        "got: {confirmation}"
    );
    Ok(())
}
