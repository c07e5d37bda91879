//! Callback query handlers module
//!
//! Every inline button press lands here as `"<action>:<deal id>"`.

use chrono::{DateTime, Utc};
use teloxide::{Bot, types::{CallbackQuery, ChatId, MessageId}, prelude::*};
use tracing::{debug, info, warn};
use crate::handlers::user_notice;
use crate::models::{CallbackAction, CallbackData};
use crate::services::{Actor, ServiceFactory};
use crate::state::{AdminPrompt, AdminPromptKind, ConversationContext, DealInput};
use crate::utils::errors::{Result, TradeDeskError};
use crate::utils::logging::log_rejection;

/// Main callback query dispatcher
pub async fn handle_callback_query(bot: Bot, query: CallbackQuery, services: ServiceFactory) -> Result<()> {
    let user_id = query.from.id.0 as i64;

    let callback = match query.data.as_deref().map(CallbackData::parse) {
        Some(Ok(callback)) => callback,
        Some(Err(e)) => {
            warn!(user_id = user_id, error = %e, "Unrecognised callback data");
            answer(&bot, &query, None).await;
            return Ok(());
        }
        None => {
            answer(&bot, &query, None).await;
            return Ok(());
        }
    };

    info!(user_id = user_id, action = callback.action.as_str(), deal_id = callback.deal_id, "Button pressed");
    let now = Utc::now();

    let result = match services.gate.admit(user_id, now).await {
        Ok(()) => route(&bot, &query, &services, user_id, callback, now).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => {
            answer(&bot, &query, None).await;
            // Prompt buttons stay usable until the admin's answer commits
            if !callback.action.opens_prompt() {
                remove_controls(&bot, &query).await;
            }
            Ok(())
        }
        Err(e) => {
            log_rejection(user_id, callback.action.as_str(), &e);
            if matches!(e, TradeDeskError::RateLimitExceeded) {
                answer(&bot, &query, None).await;
                return Ok(());
            }
            match user_notice(&e) {
                Some(text) => {
                    answer(&bot, &query, Some(text)).await;
                    if e.is_stale() {
                        remove_controls(&bot, &query).await;
                    }
                    Ok(())
                }
                None => {
                    answer(&bot, &query, None).await;
                    Err(e)
                }
            }
        }
    }
}

/// Map a parsed button to the controller
async fn route(
    bot: &Bot,
    query: &CallbackQuery,
    services: &ServiceFactory,
    user_id: i64,
    callback: CallbackData,
    now: DateTime<Utc>,
) -> Result<()> {
    let deal_id = callback.deal_id;

    let input = match callback.action {
        CallbackAction::Time => return open_prompt(bot, query, services, user_id, deal_id, AdminPromptKind::Time).await,
        CallbackAction::Nick => return open_prompt(bot, query, services, user_id, deal_id, AdminPromptKind::Nickname).await,
        CallbackAction::Confirm => DealInput::ConfirmTime,
        CallbackAction::Created => DealInput::AckCreated,
        CallbackAction::Paid => DealInput::MarkPaid,
        CallbackAction::UserConfirm => DealInput::ConfirmReceipt,
        CallbackAction::Finish => DealInput::Finish,
        CallbackAction::Cancel | CallbackAction::UserCancel => DealInput::Cancel,
    };
    let actor = Actor { user_id, role: callback.action.role() };

    let input_is_cancel = input == DealInput::Cancel;
    let deal = services.deal_service.apply(deal_id, actor, input, now).await?;

    if input_is_cancel {
        bot.send_message(chat_of(query, user_id), format!("❌ Сделка #{} отменена.", deal.id)).await?;
    }
    Ok(())
}

/// Verify the deal still waits for the admin, then ask for the free text
async fn open_prompt(
    bot: &Bot,
    query: &CallbackQuery,
    services: &ServiceFactory,
    user_id: i64,
    deal_id: i64,
    kind: AdminPromptKind,
) -> Result<()> {
    services.deal_service.check_prompt(deal_id, user_id, kind).await?;

    let mut prompt = AdminPrompt::new(deal_id, kind);
    if let Some(message) = &query.message {
        prompt = prompt.with_controls(message.id().0);
    }
    services
        .storage
        .save_context(ConversationContext::admin_prompt(user_id, prompt))
        .await;
    debug!(user_id = user_id, deal_id = deal_id, kind = ?kind, "Admin prompt opened");

    let text = match kind {
        AdminPromptKind::Time => format!("Введите время сделки #{} (HH:MM):", deal_id),
        AdminPromptKind::Nickname => format!("Введите ник покупателя для сделки #{}:", deal_id),
    };
    bot.send_message(chat_of(query, user_id), text).await?;
    Ok(())
}

fn chat_of(query: &CallbackQuery, user_id: i64) -> ChatId {
    query
        .message
        .as_ref()
        .map(|message| message.chat().id)
        .unwrap_or(ChatId(user_id))
}

async fn answer(bot: &Bot, query: &CallbackQuery, text: Option<String>) {
    let request = bot.answer_callback_query(query.id.clone());
    let result = match text {
        Some(text) => request.text(text).await,
        None => request.await,
    };
    if let Err(e) = result {
        warn!(error = %e, "Failed to answer callback query");
    }
}

/// Strip the inline keyboard from the pressed message
async fn remove_controls(bot: &Bot, query: &CallbackQuery) {
    if let Some(message) = &query.message {
        strip_keyboard(bot, message.chat().id, message.id()).await;
    }
}

/// Remove the inline keyboard of a sent message; failures are only logged
pub async fn strip_keyboard(bot: &Bot, chat_id: ChatId, message_id: MessageId) {
    if let Err(e) = bot.edit_message_reply_markup(chat_id, message_id).await {
        warn!(chat_id = chat_id.0, message_id = message_id.0, error = %e, "Failed to remove inline controls");
    }
}
