//! Bot handlers module
//!
//! This module contains all Telegram bot handlers organized by type:
//! - Command handlers for bot commands
//! - Callback handlers for inline keyboard interactions
//! - Message handlers for menu labels, session input and admin prompts

pub mod commands;
pub mod callbacks;
pub mod messages;
pub mod menu;

// Re-export commonly used handler functions
pub use commands::{handle_command, Command};
pub use callbacks::handle_callback_query;
pub use messages::handle_message;

use teloxide::{prelude::*, types::{ChatId, Message, ParseMode}};
use tracing::debug;
use crate::services::ServiceFactory;
use crate::utils::errors::{Result, TradeDeskError};
use crate::utils::helpers::format_clock;
use crate::utils::logging::log_rejection;

/// Telegram user id of the message author, if any
pub fn sender_id(msg: &Message) -> Option<i64> {
    msg.from.as_ref().map(|user| user.id.0 as i64)
}

/// Commands and menu labels both drop whatever conversation was in progress
pub async fn leave_conversation(services: &ServiceFactory, msg: &Message) {
    if let Some(user_id) = sender_id(msg) {
        if services.session_service.abandon(user_id).await {
            debug!(user_id = user_id, "Conversation left for a menu action");
        }
    }
}

/// Short user-facing text for errors the user can act on.
/// `None` means either a silent drop or an unexpected failure.
pub fn user_notice(error: &TradeDeskError) -> Option<String> {
    match error {
        TradeDeskError::StaleTransition { .. } | TradeDeskError::DealNotFound { .. } => {
            Some("⚠️ Уже обработано.".to_string())
        }
        TradeDeskError::PermissionDenied(_) => Some("⛔ Недостаточно прав.".to_string()),
        TradeDeskError::Banned { until, .. } => Some(format!("⛔ Временный бан до {}.", format_clock(*until))),
        TradeDeskError::ActiveDealExists { .. } => Some("⚠️ У вас уже есть активная сделка.".to_string()),
        TradeDeskError::BelowFloor { floor, .. } => Some(format!("Минимум {}кк.", floor)),
        TradeDeskError::InvalidInput(_) => Some("Введите корректное значение.".to_string()),
        _ => None,
    }
}

/// Answer a failed action in chat.
///
/// Recoverable rejections are logged and answered (or silently dropped);
/// anything else is handed back so the dispatcher boundary logs it.
pub async fn reply_error(bot: &Bot, chat_id: ChatId, user_id: i64, action: &str, error: TradeDeskError) -> Result<()> {
    log_rejection(user_id, action, &error);

    if matches!(error, TradeDeskError::RateLimitExceeded) {
        return Ok(());
    }

    match user_notice(&error) {
        Some(text) => {
            bot.send_message(chat_id, text)
                .parse_mode(ParseMode::Html)
                .reply_markup(menu::back_to_menu())
                .await?;
            Ok(())
        }
        None => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DealStatus;

    #[test]
    fn test_user_notice_taxonomy() {
        assert!(user_notice(&TradeDeskError::stale(1, &[DealStatus::New], None)).is_some());
        assert!(user_notice(&TradeDeskError::RateLimitExceeded).is_none());
        assert!(user_notice(&TradeDeskError::Config("x".into())).is_none());
        assert_eq!(
            user_notice(&TradeDeskError::BelowFloor { quantity: 5, floor: 10 }).as_deref(),
            Some("Минимум 10кк.")
        );
    }
}
