//! Message handlers module
//!
//! Routes free text: menu labels first, then a pending admin prompt, then an
//! in-progress composition session.

use chrono::Utc;
use teloxide::{Bot, types::{ChatId, Message, MessageId, ParseMode}, prelude::*};
use tracing::debug;
use crate::handlers::callbacks::strip_keyboard;
use crate::handlers::commands::{admin, deals, info, start};
use crate::handlers::menu::{self, MenuItem};
use crate::handlers::{leave_conversation, reply_error, sender_id, user_notice};
use crate::services::{Actor, ServiceFactory, SessionReply};
use crate::state::{AdminPrompt, AdminPromptKind, ConversationContext, DealInput};
use crate::utils::errors::{Result, TradeDeskError};
use crate::utils::helpers::kk_fmt;

/// Handle regular text messages
pub async fn handle_message(bot: Bot, msg: Message, services: ServiceFactory) -> Result<()> {
    let (Some(user_id), Some(text)) = (sender_id(&msg), msg.text().map(str::to_owned)) else {
        return Ok(());
    };

    if let Some(item) = MenuItem::from_label(&text) {
        return handle_menu(bot, msg, services, item).await;
    }

    if let Some(prompt) = services.storage.take_admin_prompt(user_id).await {
        return handle_admin_answer(bot, msg.chat.id, services, user_id, prompt, &text).await;
    }

    if services.session_service.is_composing(user_id).await {
        return handle_session_input(bot, msg.chat.id, services, user_id, &text).await;
    }

    debug!(user_id = user_id, "Free text outside any conversation");
    bot.send_message(msg.chat.id, "Выберите действие в меню.")
        .reply_markup(menu::main_menu())
        .await?;
    Ok(())
}

/// Menu labels abandon whatever conversation was in progress
async fn handle_menu(bot: Bot, msg: Message, services: ServiceFactory, item: MenuItem) -> Result<()> {
    leave_conversation(&services, &msg).await;

    match item {
        MenuItem::NewDeal => start::handle_new_deal(bot, msg, services).await,
        MenuItem::Rates => info::handle_rates(bot, msg, services).await,
        MenuItem::ActiveDeals => deals::handle_active(bot, msg, services).await,
        MenuItem::History => deals::handle_history(bot, msg, services).await,
        MenuItem::ClearActive => admin::handle_clear_active(bot, msg, services).await,
        MenuItem::About => info::handle_about(bot, msg).await,
        MenuItem::MainMenu => start::handle_start(bot, msg, services).await,
    }
}

async fn handle_session_input(bot: Bot, chat_id: ChatId, services: ServiceFactory, user_id: i64, text: &str) -> Result<()> {
    let now = Utc::now();
    if let Err(e) = services.gate.admit(user_id, now).await {
        if matches!(e, TradeDeskError::Banned { .. }) {
            services.session_service.abandon(user_id).await;
        }
        return reply_error(&bot, chat_id, user_id, "session_input", e).await;
    }

    let reply = match services.session_service.submit_input(user_id, text, now).await {
        Ok(Some(reply)) => reply,
        Ok(None) => return Ok(()),
        Err(e) => return reply_error(&bot, chat_id, user_id, "session_input", e).await,
    };

    match reply {
        SessionReply::Prompt(step) => start::send_prompt(&bot, chat_id, &step).await,
        SessionReply::Retry { step, reason } => {
            let hint = user_notice(&reason).unwrap_or_else(|| "Попробуйте ещё раз.".to_string());
            bot.send_message(chat_id, hint).await?;
            start::send_prompt(&bot, chat_id, &step).await
        }
        SessionReply::Created(deal) => {
            let text = format!(
                "✅ Заявка #{} отправлена админу.\n📦 {}\n💵 {}",
                deal.id,
                kk_fmt(deal.quantity),
                services.notification_service.pricing().format_price(deal.currency, deal.quantity)
            );
            bot.send_message(chat_id, text)
                .parse_mode(ParseMode::Html)
                .reply_markup(menu::back_to_menu())
                .await?;
            Ok(())
        }
    }
}

async fn handle_admin_answer(
    bot: Bot,
    chat_id: ChatId,
    services: ServiceFactory,
    user_id: i64,
    prompt: AdminPrompt,
    text: &str,
) -> Result<()> {
    let now = Utc::now();
    if let Err(e) = services.gate.admit(user_id, now).await {
        // Keep the prompt so a dropped message can simply be resent
        services.storage.save_context(ConversationContext::admin_prompt(user_id, prompt)).await;
        return reply_error(&bot, chat_id, user_id, "admin_prompt", e).await;
    }

    let input = match prompt.kind {
        AdminPromptKind::Time => DealInput::ProposeTime(text.to_string()),
        AdminPromptKind::Nickname => DealInput::AssignNick(text.to_string()),
    };

    match services.deal_service.apply(prompt.deal_id, Actor::admin(user_id), input, now).await {
        Ok(deal) => {
            if let Some(message_id) = prompt.controls_message_id {
                strip_keyboard(&bot, chat_id, MessageId(message_id)).await;
            }
            bot.send_message(chat_id, format!("✅ Сделка #{}: отправлено покупателю.", deal.id)).await?;
            Ok(())
        }
        Err(e @ TradeDeskError::InvalidInput(_)) => {
            services.storage.save_context(ConversationContext::admin_prompt(user_id, prompt)).await;
            reply_error(&bot, chat_id, user_id, "admin_prompt", e).await
        }
        Err(e) => reply_error(&bot, chat_id, user_id, "admin_prompt", e).await,
    }
}
