//! Inline button payloads
//!
//! Callback data travels as `"<action>:<deal id>"`.

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use crate::models::ActorRole;
use crate::utils::errors::TradeDeskError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallbackAction {
    /// Admin opens the time prompt
    Time,
    /// Buyer confirms the proposed time
    Confirm,
    /// Admin opens the nickname prompt
    Nick,
    Created,
    Paid,
    UserConfirm,
    Finish,
    /// Admin-side cancel
    Cancel,
    /// Buyer-side cancel
    UserCancel,
}

impl CallbackAction {
    pub const ALL: [CallbackAction; 9] = [
        CallbackAction::Time,
        CallbackAction::Confirm,
        CallbackAction::Nick,
        CallbackAction::Created,
        CallbackAction::Paid,
        CallbackAction::UserConfirm,
        CallbackAction::Finish,
        CallbackAction::Cancel,
        CallbackAction::UserCancel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CallbackAction::Time => "time",
            CallbackAction::Confirm => "confirm",
            CallbackAction::Nick => "nick",
            CallbackAction::Created => "created",
            CallbackAction::Paid => "paid",
            CallbackAction::UserConfirm => "user_confirm",
            CallbackAction::Finish => "finish",
            CallbackAction::Cancel => "cancel",
            CallbackAction::UserCancel => "user_cancel",
        }
    }

    /// Role the presser must hold
    pub fn role(&self) -> ActorRole {
        match self {
            CallbackAction::Time
            | CallbackAction::Nick
            | CallbackAction::Paid
            | CallbackAction::Finish
            | CallbackAction::Cancel => ActorRole::Admin,
            CallbackAction::Confirm
            | CallbackAction::Created
            | CallbackAction::UserConfirm
            | CallbackAction::UserCancel => ActorRole::Buyer,
        }
    }

    /// Buttons that only open an admin prompt; the deal moves when the answer arrives
    pub fn opens_prompt(&self) -> bool {
        matches!(self, CallbackAction::Time | CallbackAction::Nick)
    }

    /// Button caption
    pub fn label(&self) -> &'static str {
        match self {
            CallbackAction::Time => "⏱ УКАЗАТЬ ВРЕМЯ",
            CallbackAction::Confirm => "✅ ПОДТВЕРДИТЬ",
            CallbackAction::Nick => "✏️ ВВЕСТИ НИК",
            CallbackAction::Created => "🟢 СДЕЛКУ СОЗДАЛ",
            CallbackAction::Paid => "💰 ОПЛАТИЛ",
            CallbackAction::UserConfirm => "✅ СДЕЛКУ ПОДТВЕРДИЛ",
            CallbackAction::Finish => "🏁 ЗАВЕРШИТЬ СДЕЛКУ",
            CallbackAction::Cancel => "❌ ОТМЕНИТЬ",
            CallbackAction::UserCancel => "❌ ОТМЕНИТЬ СДЕЛКУ",
        }
    }
}

impl FromStr for CallbackAction {
    type Err = TradeDeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CallbackAction::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| TradeDeskError::InvalidInput(format!("Unknown callback action: {}", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackData {
    pub action: CallbackAction,
    pub deal_id: i64,
}

impl CallbackData {
    pub fn new(action: CallbackAction, deal_id: i64) -> Self {
        Self { action, deal_id }
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }

    pub fn parse(data: &str) -> Result<Self, TradeDeskError> {
        let (action, deal_id) = data
            .rsplit_once(':')
            .ok_or_else(|| TradeDeskError::InvalidInput(format!("Malformed callback data: {}", data)))?;

        let deal_id = deal_id
            .parse::<i64>()
            .map_err(|_| TradeDeskError::InvalidInput(format!("Malformed deal id in callback: {}", data)))?;

        Ok(Self {
            action: action.parse()?,
            deal_id,
        })
    }
}

impl fmt::Display for CallbackData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.action.as_str(), self.deal_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_callback_data() {
        let data = CallbackData::parse("user_confirm:42").unwrap();
        assert_eq!(data, CallbackData::new(CallbackAction::UserConfirm, 42));
        assert_eq!(data.encode(), "user_confirm:42");
    }

    #[test]
    fn test_rejects_malformed_data() {
        assert!(CallbackData::parse("finish").is_err());
        assert!(CallbackData::parse("finish:abc").is_err());
        assert!(CallbackData::parse("explode:1").is_err());
    }

    #[test]
    fn test_cancel_actions_are_role_scoped() {
        assert_eq!(CallbackAction::Cancel.role(), ActorRole::Admin);
        assert_eq!(CallbackAction::UserCancel.role(), ActorRole::Buyer);
    }

    #[test]
    fn test_only_admin_prompts_defer_the_transition() {
        let deferred: Vec<_> = CallbackAction::ALL.iter().filter(|a| a.opens_prompt()).collect();
        assert_eq!(deferred, vec![&CallbackAction::Time, &CallbackAction::Nick]);
    }
}
