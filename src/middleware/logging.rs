//! Logging middleware
//! 
//! Tags each inbound update with a correlation id so every log line emitted
//! while handling it can be grouped.

use teloxide::types::{Update, UpdateKind};
use tracing::{debug, info, info_span, Span};
use crate::utils::helpers::generate_uuid;

#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingMiddleware;

impl LoggingMiddleware {
    pub fn new() -> Self {
        Self
    }

    /// Span wrapping the handling of one update
    pub fn update_span(&self, update: &Update) -> Span {
        let user_id = update.from().map(|user| user.id.0 as i64);
        info_span!("update", update_id = update.id.0, user_id = user_id, correlation_id = %generate_uuid())
    }

    /// Log incoming update
    pub fn log_update(&self, update: &Update) {
        match &update.kind {
            UpdateKind::Message(message) => {
                info!(
                    chat_id = message.chat.id.0,
                    has_text = message.text().is_some(),
                    "Message received"
                );
            }
            UpdateKind::CallbackQuery(callback) => {
                info!(
                    user_id = callback.from.id.0,
                    callback_data = callback.data.as_deref().unwrap_or("none"),
                    "Callback query received"
                );
            }
            _ => {
                debug!("Other update type received");
            }
        }
    }
}
