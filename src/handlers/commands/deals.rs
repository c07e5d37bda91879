//! Active deals and history views

use teloxide::{Bot, types::{Message, ParseMode}, prelude::*};
use crate::handlers::{menu, sender_id};
use crate::models::CallbackAction;
use crate::services::notification::inline_keyboard;
use crate::services::{ActionButton, ServiceFactory};
use crate::utils::errors::{Result, TradeDeskError};

/// List the user's active deals, each with its own cancel button
pub async fn handle_active(bot: Bot, msg: Message, services: ServiceFactory) -> Result<()> {
    let user_id = sender_id(&msg)
        .ok_or_else(|| TradeDeskError::InvalidInput("No user in message".to_string()))?;
    let deals = services.database.active_deals_of(user_id).await?;

    if deals.is_empty() {
        bot.send_message(msg.chat.id, "📂 У вас нет активных сделок.")
            .reply_markup(menu::back_to_menu())
            .await?;
        return Ok(());
    }

    let notifications = &services.notification_service;
    for deal in deals {
        let text = notifications.format_message("active_card", &notifications.deal_parameters(&deal))?;
        let buttons = [ActionButton::new(CallbackAction::UserCancel, deal.id)];
        bot.send_message(msg.chat.id, text)
            .parse_mode(ParseMode::Html)
            .reply_markup(inline_keyboard(&buttons))
            .await?;
    }
    Ok(())
}

/// Latest completed deals: everyone's for the admin, own for a buyer
pub async fn handle_history(bot: Bot, msg: Message, services: ServiceFactory) -> Result<()> {
    let user_id = sender_id(&msg)
        .ok_or_else(|| TradeDeskError::InvalidInput("No user in message".to_string()))?;
    let is_admin = services.auth.is_admin(user_id);
    let deals = services.database.history(user_id, is_admin).await?;

    let text = if deals.is_empty() {
        "📜 История пуста.".to_string()
    } else {
        let notifications = &services.notification_service;
        let (title, line_key) = if is_admin {
            ("📜 <b>История заказов (ADMIN)</b>", "history_admin_line")
        } else {
            ("📜 <b>История сделок</b>", "history_user_line")
        };

        let mut text = format!("{}\n\n", title);
        for deal in &deals {
            text.push_str(&notifications.format_message(line_key, &notifications.deal_parameters(deal))?);
            text.push('\n');
        }
        text
    };

    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(menu::back_to_menu())
        .await?;
    Ok(())
}
