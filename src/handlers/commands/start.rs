//! Start command handler
//!
//! Main menu and the entry into deal composition

use chrono::Utc;
use teloxide::{Bot, types::{ChatId, Message, ParseMode}, prelude::*};
use tracing::debug;
use crate::handlers::{menu, reply_error, sender_id};
use crate::services::ServiceFactory;
use crate::state::ScenarioStep;
use crate::utils::errors::{Result, TradeDeskError};

/// Handle /start command and the "main menu" button
pub async fn handle_start(bot: Bot, msg: Message, services: ServiceFactory) -> Result<()> {
    if let Some(user_id) = sender_id(&msg) {
        debug!(user_id = user_id, is_admin = services.auth.is_admin(user_id), "Main menu opened");
    }

    bot.send_message(msg.chat.id, "🏦 <b>R2 SILVER TRADE</b>")
        .parse_mode(ParseMode::Html)
        .reply_markup(menu::main_menu())
        .await?;
    Ok(())
}

/// Handle the "new deal" button: open a composition session
pub async fn handle_new_deal(bot: Bot, msg: Message, services: ServiceFactory) -> Result<()> {
    let user_id = sender_id(&msg)
        .ok_or_else(|| TradeDeskError::InvalidInput("No user in message".to_string()))?;
    let chat_id = msg.chat.id;
    let now = Utc::now();

    if let Err(e) = services.gate.admit(user_id, now).await {
        services.session_service.abandon(user_id).await;
        return reply_error(&bot, chat_id, user_id, "new_deal", e).await;
    }

    match services.session_service.start(user_id, now).await {
        Ok(step) => send_prompt(&bot, chat_id, &step).await,
        Err(e) => reply_error(&bot, chat_id, user_id, "new_deal", e).await,
    }
}

/// Ask for a session field, offering its choices as a reply keyboard
pub async fn send_prompt(bot: &Bot, chat_id: ChatId, step: &ScenarioStep) -> Result<()> {
    let request = bot.send_message(chat_id, step.prompt);
    if step.choices.is_empty() {
        request.reply_markup(menu::back_to_menu()).await?;
    } else {
        request.reply_markup(menu::reply_keyboard(step.choices.iter().copied())).await?;
    }
    Ok(())
}
