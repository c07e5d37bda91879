//! Admin command handlers

use chrono::Utc;
use teloxide::{Bot, types::{Message, ParseMode}, prelude::*};
use crate::handlers::{menu, reply_error, sender_id};
use crate::services::ServiceFactory;
use crate::utils::errors::{Result, TradeDeskError};

/// Cancel every active deal in one pass
pub async fn handle_clear_active(bot: Bot, msg: Message, services: ServiceFactory) -> Result<()> {
    let user_id = sender_id(&msg)
        .ok_or_else(|| TradeDeskError::InvalidInput("No user in message".to_string()))?;
    let chat_id = msg.chat.id;

    if let Err(e) = services.gate.admit(user_id, Utc::now()).await {
        return reply_error(&bot, chat_id, user_id, "clear_active", e).await;
    }

    let count = match services.deal_service.clear_active(user_id).await {
        Ok(count) => count,
        Err(e) => return reply_error(&bot, chat_id, user_id, "clear_active", e).await,
    };

    let text = if count == 0 {
        "🧹 Активных сделок нет.".to_string()
    } else {
        format!("🧹 <b>Очистка завершена</b>\nПользователей очищено: <b>{}</b>", count)
    };

    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(menu::back_to_menu())
        .await?;
    Ok(())
}
