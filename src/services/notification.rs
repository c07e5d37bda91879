//! Notification service implementation
//!
//! Builds the addressed, state-scoped messages that tell each party what
//! happened and what they are expected to do next, and hands them to a
//! [`Notifier`]. Delivery is best-effort: a failed send is logged and never
//! reverts the state change that produced it.

use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use teloxide::{
    prelude::*,
    types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, ParseMode},
};
use tracing::{debug, warn};
use crate::config::{BotConfig, PricingConfig};
use crate::models::{ActorRole, CallbackAction, CallbackData, Deal, DealStatus};
use crate::utils::errors::{Result, TradeDeskError};
use crate::utils::helpers::{escape_html, format_clock, format_timestamp, kk_fmt, truncate_text};

/// Longest admin free text echoed back in notices
const FREE_TEXT_LIMIT: usize = 64;

/// Inline control attached to a notice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionButton {
    pub label: String,
    pub data: CallbackData,
}

impl ActionButton {
    pub fn new(action: CallbackAction, deal_id: i64) -> Self {
        Self {
            label: action.label().to_string(),
            data: CallbackData::new(action, deal_id),
        }
    }
}

/// One outbound HTML message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub chat_id: i64,
    pub text: String,
    pub buttons: Vec<ActionButton>,
}

impl Notice {
    pub fn new(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            buttons: Vec::new(),
        }
    }

    pub fn with_button(mut self, action: CallbackAction, deal_id: i64) -> Self {
        self.buttons.push(ActionButton::new(action, deal_id));
        self
    }
}

/// Message-send capability
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, notice: &Notice) -> Result<()>;
}

/// One button per row
pub fn inline_keyboard(buttons: &[ActionButton]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(
        buttons
            .iter()
            .map(|b| vec![InlineKeyboardButton::callback(b.label.clone(), b.data.encode())]),
    )
}

/// Sends notices through the Telegram Bot API
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn deliver(&self, notice: &Notice) -> Result<()> {
        let request = self
            .bot
            .send_message(ChatId(notice.chat_id), notice.text.clone())
            .parse_mode(ParseMode::Html);

        if notice.buttons.is_empty() {
            request.await?;
        } else {
            request.reply_markup(inline_keyboard(&notice.buttons)).await?;
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct NotificationService {
    notifier: Arc<dyn Notifier>,
    admin_id: i64,
    broadcast_chat_id: Option<i64>,
    pricing: PricingConfig,
    templates: HashMap<&'static str, &'static str>,
}

impl NotificationService {
    pub fn new(notifier: Arc<dyn Notifier>, bot: &BotConfig, pricing: PricingConfig) -> Self {
        Self {
            notifier,
            admin_id: bot.admin_id,
            broadcast_chat_id: bot.broadcast_chat_id,
            pricing,
            templates: Self::load_default_templates(),
        }
    }

    pub fn admin_id(&self) -> i64 {
        self.admin_id
    }

    pub fn pricing(&self) -> &PricingConfig {
        &self.pricing
    }

    /// Send every notice, logging failures; returns how many were delivered
    pub async fn dispatch(&self, notices: Vec<Notice>) -> usize {
        let mut delivered = 0;
        for notice in &notices {
            match self.notifier.deliver(notice).await {
                Ok(()) => {
                    delivered += 1;
                    debug!(chat_id = notice.chat_id, buttons = notice.buttons.len(), "Notice delivered");
                }
                Err(e) => {
                    let e = TradeDeskError::delivery(notice.chat_id, e);
                    warn!(chat_id = notice.chat_id, error = %e, "Notice delivery failed");
                }
            }
        }
        delivered
    }

    /// Announce a freshly created deal
    pub async fn deal_created(&self, deal: &Deal) -> usize {
        self.dispatch(self.creation_notices(deal)).await
    }

    /// Tell the counterpart about a transition `actor` just made
    pub async fn deal_transitioned(&self, deal: &Deal, actor: ActorRole) -> usize {
        self.dispatch(self.transition_notices(deal, actor)).await
    }

    /// Tell both parties a deal timed out
    pub async fn deal_expired(&self, deal: &Deal, banned_until: DateTime<Utc>) -> usize {
        self.dispatch(self.expiry_notices(deal, banned_until)).await
    }

    pub fn creation_notices(&self, deal: &Deal) -> Vec<Notice> {
        let text = self.render("deal_created", deal, &[]);
        let mut notices = vec![Notice::new(self.admin_id, text)
            .with_button(CallbackAction::Time, deal.id)
            .with_button(CallbackAction::Cancel, deal.id)];

        if let Some(chat_id) = self.broadcast_chat_id {
            notices.push(Notice::new(chat_id, self.render("deal_announced", deal, &[])));
        }
        notices
    }

    pub fn transition_notices(&self, deal: &Deal, actor: ActorRole) -> Vec<Notice> {
        let id = deal.id;
        let buyer = deal.user_id;
        let admin = self.admin_id;

        match deal.status {
            DealStatus::New => Vec::new(),
            DealStatus::TimeSet => vec![Notice::new(buyer, self.render("time_set", deal, &[]))
                .with_button(CallbackAction::Confirm, id)
                .with_button(CallbackAction::UserCancel, id)],
            DealStatus::TimeConfirmed => vec![Notice::new(admin, self.render("time_confirmed", deal, &[]))
                .with_button(CallbackAction::Nick, id)
                .with_button(CallbackAction::Cancel, id)],
            DealStatus::NickSet => {
                let deadline = deal.expires_at.map(format_clock).unwrap_or_else(|| "—".to_string());
                vec![Notice::new(buyer, self.render("nick_set", deal, &[("deadline", deadline)]))
                    .with_button(CallbackAction::Created, id)]
            }
            DealStatus::BuyerCreated => vec![Notice::new(admin, self.render("buyer_created", deal, &[]))
                .with_button(CallbackAction::Paid, id)],
            DealStatus::Paid => vec![Notice::new(buyer, self.render("paid", deal, &[]))
                .with_button(CallbackAction::UserConfirm, id)],
            DealStatus::BuyerConfirmed => vec![Notice::new(admin, self.render("buyer_confirmed", deal, &[]))
                .with_button(CallbackAction::Finish, id)],
            DealStatus::Done => vec![
                Notice::new(buyer, self.render("done_buyer", deal, &[])),
                Notice::new(admin, self.render("done_admin", deal, &[])),
            ],
            DealStatus::Cancelled => match actor {
                ActorRole::Buyer => vec![Notice::new(admin, self.render("cancelled_by_buyer", deal, &[]))],
                ActorRole::Admin => vec![Notice::new(buyer, self.render("cancelled_by_admin", deal, &[]))],
            },
        }
    }

    pub fn expiry_notices(&self, deal: &Deal, banned_until: DateTime<Utc>) -> Vec<Notice> {
        let until = format_clock(banned_until);
        vec![
            Notice::new(deal.user_id, self.render("expired_buyer", deal, &[("until", until)])),
            Notice::new(self.admin_id, self.render("expired_admin", deal, &[])),
        ]
    }

    /// Deal summary used in cards, lists and history lines
    pub fn deal_parameters(&self, deal: &Deal) -> HashMap<&'static str, String> {
        let mut params = HashMap::new();
        params.insert("deal_id", deal.id.to_string());
        params.insert("user_id", deal.user_id.to_string());
        params.insert("quantity", kk_fmt(deal.quantity));
        params.insert("price", self.pricing.format_price(deal.currency, deal.quantity));
        params.insert("rail", escape_html(deal.rail_label()));
        params.insert("status", deal.status.to_string());
        params.insert("time", escape_html(&truncate_text(deal.deal_time.as_deref().unwrap_or("—"), FREE_TEXT_LIMIT)));
        params.insert("nickname", escape_html(&truncate_text(deal.nickname.as_deref().unwrap_or("—"), FREE_TEXT_LIMIT)));
        params.insert("created", format_timestamp(deal.created_at));
        params
    }

    fn render(&self, key: &str, deal: &Deal, extra: &[(&'static str, String)]) -> String {
        let mut params = self.deal_parameters(deal);
        for (name, value) in extra {
            params.insert(*name, value.clone());
        }
        match self.format_message(key, &params) {
            Ok(text) => text,
            Err(e) => {
                warn!(template = key, error = %e, "Falling back to bare deal line");
                format!("Сделка #{}: {}", deal.id, deal.status)
            }
        }
    }

    /// Substitute `{name}` placeholders of a template
    pub fn format_message(&self, key: &str, parameters: &HashMap<&'static str, String>) -> Result<String> {
        let template = self
            .templates
            .get(key)
            .ok_or_else(|| TradeDeskError::InvalidInput(format!("Template not found: {}", key)))?;

        let mut formatted = template.to_string();
        for (name, value) in parameters {
            formatted = formatted.replace(&format!("{{{}}}", name), value);
        }
        Ok(formatted)
    }

    fn load_default_templates() -> HashMap<&'static str, &'static str> {
        let mut templates = HashMap::new();

        templates.insert("deal_created", "🆕 <b>Заявка #{deal_id}</b>\n👤 UID {user_id}\n📦 {quantity}\n💵 {price}\n🏦 {rail}");
        templates.insert("deal_announced", "🆕 <b>Заявка #{deal_id}</b>\n📦 {quantity}\n💵 {price}");
        templates.insert("time_set", "⏱ Время сделки #{deal_id}: <b>{time}</b>");
        templates.insert("time_confirmed", "⏱ Время подтверждено по сделке #{deal_id}");
        templates.insert("nick_set", "👤 Ник для сделки #{deal_id}: <b>{nickname}</b>\nСоздайте сделку в игре до {deadline}.");
        templates.insert("buyer_created", "💸 Сделка #{deal_id}: покупатель создал сделку");
        templates.insert("paid", "💸 Средства по сделке #{deal_id} переведены. Подтвердите получение.");
        templates.insert("buyer_confirmed", "✅ Покупатель подтвердил сделку #{deal_id}");
        templates.insert("done_buyer", "🎉 Сделка #{deal_id} успешно завершена!");
        templates.insert("done_admin", "🎉 Сделка #{deal_id} завершена.");
        templates.insert("cancelled_by_buyer", "❌ Покупатель отменил сделку #{deal_id}.");
        templates.insert("cancelled_by_admin", "❌ Сделка #{deal_id} отменена администратором.");
        templates.insert("expired_buyer", "⏱ Время истекло. Сделка #{deal_id} отменена.\n⛔ Новые заявки недоступны до {until}.");
        templates.insert("expired_admin", "⛔ Сделка #{deal_id} отменена по таймеру.");
        templates.insert("active_card", "📂 <b>Сделка #{deal_id}</b>\n📦 {quantity}\n💵 {price}\n📌 Статус: <i>{status}</i>");
        templates.insert("history_admin_line", "• #{deal_id} | UID {user_id} | {quantity} | {price} | {created}");
        templates.insert("history_user_line", "• #{deal_id} — {quantity} — {price}");

        templates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Currency;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct Collecting {
        sent: Mutex<Vec<Notice>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for Collecting {
        async fn deliver(&self, notice: &Notice) -> Result<()> {
            if self.fail {
                return Err(std::io::Error::new(std::io::ErrorKind::NotConnected, "offline").into());
            }
            self.sent.lock().await.push(notice.clone());
            Ok(())
        }
    }

    fn deal(status: DealStatus) -> Deal {
        Deal {
            id: 3,
            user_id: 77,
            currency: Currency::Uah,
            bank: Some("Монобанк".to_string()),
            initials: Some("A.B.".to_string()),
            network: None,
            quantity: 15,
            deal_time: Some("18:30".to_string()),
            nickname: Some("<Hero>".to_string()),
            status,
            created_at: Utc::now(),
            expires_at: None,
        }
    }

    fn service(notifier: Arc<dyn Notifier>, broadcast: Option<i64>) -> NotificationService {
        let bot = BotConfig { token: "t".to_string(), admin_id: 1, broadcast_chat_id: broadcast };
        NotificationService::new(notifier, &bot, PricingConfig::default())
    }

    #[test]
    fn test_creation_notice_has_admin_controls_and_plain_broadcast() {
        let svc = service(Arc::new(Collecting::default()), Some(-100));
        let notices = svc.creation_notices(&deal(DealStatus::New));

        assert_eq!(notices.len(), 2);
        assert_eq!(notices[0].chat_id, 1);
        assert_eq!(notices[0].buttons[0].data.encode(), "time:3");
        assert!(notices[0].text.contains("15кк (15.000.000)"));
        assert!(notices[0].text.contains("900 грн"));
        assert_eq!(notices[1].chat_id, -100);
        assert!(notices[1].buttons.is_empty());
    }

    #[test]
    fn test_transition_notices_target_counterpart() {
        let svc = service(Arc::new(Collecting::default()), None);

        let to_buyer = svc.transition_notices(&deal(DealStatus::NickSet), ActorRole::Admin);
        assert_eq!(to_buyer[0].chat_id, 77);
        assert!(to_buyer[0].text.contains("&lt;Hero&gt;"));
        assert_eq!(to_buyer[0].buttons[0].data.action, CallbackAction::Created);

        let cancelled = svc.transition_notices(&deal(DealStatus::Cancelled), ActorRole::Buyer);
        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0].chat_id, 1);

        let done = svc.transition_notices(&deal(DealStatus::Done), ActorRole::Admin);
        assert_eq!(done.iter().map(|n| n.chat_id).collect::<Vec<_>>(), vec![77, 1]);
    }

    #[tokio::test]
    async fn test_dispatch_swallows_failures() {
        let failing = Arc::new(Collecting { fail: true, ..Default::default() });
        let svc = service(failing, None);
        assert_eq!(svc.deal_transitioned(&deal(DealStatus::Done), ActorRole::Admin).await, 0);
    }

    #[test]
    fn test_every_template_key_exists() {
        let svc = service(Arc::new(Collecting::default()), None);
        for key in ["active_card", "history_admin_line", "history_user_line", "expired_buyer"] {
            assert!(svc.format_message(key, &svc.deal_parameters(&deal(DealStatus::Paid))).is_ok());
        }
        assert!(svc.format_message("missing", &HashMap::new()).is_err());
    }
}
