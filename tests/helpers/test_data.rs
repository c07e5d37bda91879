//! Deal fixtures
//!
//! Deals can be built either through the composition session (what a buyer
//! does in chat) or straight through the repository when a test only needs a
//! deal in some status.

use chrono::{DateTime, Utc};
use serde_json::json;
use teloxide::types::{CallbackQuery, Message};
use TradeDesk::models::{CreateDealRequest, Currency, Deal, DealFieldWrites, DealStatus};
use TradeDesk::services::SessionReply;

use super::test_context::TestContext;

/// Chat inputs of a crypto deal over Binance ID for 15kk
pub const CRYPTO_INPUTS: &[&str] = &["💵 USDT", "Binance ID", "15кк"];

/// Chat inputs of a local deal through Monobank for 20kk
pub const LOCAL_INPUTS: &[&str] = &["💴 ГРН", "Монобанк", "И.П.", "20"];

pub fn crypto_request(user_id: i64, quantity: i64) -> CreateDealRequest {
    CreateDealRequest {
        user_id,
        currency: Currency::Usdt,
        bank: None,
        initials: None,
        network: Some("Binance ID".to_string()),
        quantity,
    }
}

pub fn local_request(user_id: i64, quantity: i64) -> CreateDealRequest {
    CreateDealRequest {
        user_id,
        currency: Currency::Uah,
        bank: Some("Приват24".to_string()),
        initials: Some("О.К.".to_string()),
        network: None,
        quantity,
    }
}

/// Run a whole composition session and return the created deal
pub async fn compose_deal(ctx: &TestContext, user_id: i64, inputs: &[&str]) -> Deal {
    let now = Utc::now();
    ctx.services
        .session_service
        .start(user_id, now)
        .await
        .expect("Failed to start session");

    let mut last = None;
    for input in inputs {
        last = ctx
            .services
            .session_service
            .submit_input(user_id, input, now)
            .await
            .expect("Session input failed");
    }

    match last {
        Some(SessionReply::Created(deal)) => deal,
        other => panic!("Session did not produce a deal: {:?}", other),
    }
}

/// Insert a deal directly and force it into `status`
pub async fn seed_deal(ctx: &TestContext, request: CreateDealRequest, status: DealStatus) -> Deal {
    let deal = ctx
        .database
        .deals
        .create(request, Utc::now())
        .await
        .expect("Failed to insert deal")
        .expect("User already has an active deal");

    if status == DealStatus::New {
        return deal;
    }

    ctx.database
        .deals
        .transition(deal.id, DealStatus::New, status, DealFieldWrites::default())
        .await
        .expect("Failed to move deal")
        .expect("Deal was not in new status")
}

/// A `nick_set` deal whose buyer must act before `expires_at`
pub async fn seed_nick_set(ctx: &TestContext, user_id: i64, expires_at: DateTime<Utc>) -> Deal {
    let deal = seed_deal(ctx, crypto_request(user_id, 15), DealStatus::TimeConfirmed).await;
    ctx.database
        .deals
        .transition(
            deal.id,
            DealStatus::TimeConfirmed,
            DealStatus::NickSet,
            DealFieldWrites {
                nickname: Some("Seller".to_string()),
                expires_at: Some(expires_at),
                ..Default::default()
            },
        )
        .await
        .expect("Failed to assign nickname")
        .expect("Deal was not in time_confirmed status")
}

fn private_user(user_id: i64) -> serde_json::Value {
    json!({ "id": user_id, "is_bot": false, "first_name": "TestUser", "username": "testuser" })
}

fn private_chat(chat_id: i64) -> serde_json::Value {
    json!({ "id": chat_id, "type": "private", "first_name": "TestUser" })
}

/// A private text message from `user_id`, as the Bot API delivers it
pub fn create_test_message(user_id: i64, text: &str) -> Message {
    serde_json::from_value(json!({
        "message_id": 1,
        "date": 1640995200,
        "chat": private_chat(user_id),
        "from": private_user(user_id),
        "text": text
    }))
    .expect("Invalid test message")
}

/// A press of an inline button on bot message `message_id` in the user's private chat
pub fn create_test_callback_query(user_id: i64, message_id: i32, data: &str) -> CallbackQuery {
    serde_json::from_value(json!({
        "id": format!("callback_{}_{}", user_id, message_id),
        "from": private_user(user_id),
        "chat_instance": "test_chat_instance",
        "data": data,
        "message": {
            "message_id": message_id,
            "date": 1640995200,
            "chat": private_chat(user_id),
            "from": { "id": 12345, "is_bot": true, "first_name": "TradeDesk", "username": "tradedesk_bot" },
            "text": "notice"
        }
    }))
    .expect("Invalid test callback query")
}
