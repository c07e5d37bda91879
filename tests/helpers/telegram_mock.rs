//! Mock Telegram API Server for testing
//!
//! A wiremock server answering the Bot API methods the bot calls, so the
//! production notifier and the update handlers can be exercised end to end.

use serde_json::{json, Value};
use teloxide::Bot;
use wiremock::{
    matchers::{method, path_regex},
    Mock, MockServer, ResponseTemplate,
};

pub const TEST_BOT_TOKEN: &str = "12345:test_token";

/// Mock Telegram API server for testing
pub struct TelegramMockServer {
    pub server: MockServer,
}

impl TelegramMockServer {
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Bot pointed at the mock server
    pub fn bot(&self) -> Bot {
        let url = self.server.uri().parse().expect("Mock server URI is not a URL");
        Bot::new(TEST_BOT_TOKEN).set_api_url(url)
    }

    /// Answer every `sendMessage` with a successful private-chat message
    pub async fn mock_send_message(&self) {
        Mock::given(method("POST"))
            .and(path_regex(r"(?i)/bot[^/]+/sendmessage$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sent_message(77)))
            .mount(&self.server)
            .await;
    }

    /// Answer every `sendMessage` with a Bot API error
    pub async fn mock_send_message_failure(&self) {
        Mock::given(method("POST"))
            .and(path_regex(r"(?i)/bot[^/]+/sendmessage$"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "ok": false,
                "error_code": 403,
                "description": "Forbidden: bot was blocked by the user"
            })))
            .mount(&self.server)
            .await;
    }

    /// Answer every method the handlers call: messages, callback answers and keyboard edits
    pub async fn mock_bot_api(&self) {
        self.mock_send_message().await;
        Mock::given(method("POST"))
            .and(path_regex(r"(?i)/bot[^/]+/answercallbackquery$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": true })))
            .mount(&self.server)
            .await;
        Mock::given(method("POST"))
            .and(path_regex(r"(?i)/bot[^/]+/editmessagereplymarkup$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sent_message(77)))
            .mount(&self.server)
            .await;
    }

    /// JSON bodies of the calls made to one Bot API method, matched case-insensitively
    pub async fn calls_to(&self, api_method: &str) -> Vec<Value> {
        let suffix = format!("/{}", api_method.to_lowercase());
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path().to_lowercase().ends_with(&suffix))
            .filter_map(|request| serde_json::from_slice(&request.body).ok())
            .collect()
    }

    /// Texts of every `sendMessage` call, in order
    pub async fn sent_texts(&self) -> Vec<String> {
        self.calls_to("sendMessage")
            .await
            .iter()
            .filter_map(|body| body["text"].as_str().map(str::to_owned))
            .collect()
    }

    /// JSON bodies of every request the server received
    pub async fn request_bodies(&self) -> Vec<Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter_map(|request| serde_json::from_slice(&request.body).ok())
            .collect()
    }
}

fn sent_message(chat_id: i64) -> Value {
    json!({
        "ok": true,
        "result": {
            "message_id": 123,
            "from": {
                "id": 12345,
                "is_bot": true,
                "first_name": "TradeDesk",
                "username": "tradedesk_bot"
            },
            "chat": {
                "id": chat_id,
                "first_name": "Buyer",
                "type": "private"
            },
            "date": 1640995200,
            "text": "ok"
        }
    })
}
