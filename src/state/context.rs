//! Conversation context management
//!
//! Transient per-user state: either a deal being composed field by field, or
//! an admin prompt waiting for free text about an existing deal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::models::{CreateDealRequest, Currency};

/// Next field a composing user is expected to send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStep {
    Currency,
    Bank,
    Initials,
    Network,
    Quantity,
}

impl SessionStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStep::Currency => "currency",
            SessionStep::Bank => "bank",
            SessionStep::Initials => "initials",
            SessionStep::Network => "network",
            SessionStep::Quantity => "quantity",
        }
    }
}

/// Fields collected so far
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DealDraft {
    pub currency: Option<Currency>,
    pub bank: Option<String>,
    pub initials: Option<String>,
    pub network: Option<String>,
}

impl DealDraft {
    /// Build the creation request once a valid quantity is known
    pub fn into_request(self, user_id: i64, currency: Currency, quantity: i64) -> CreateDealRequest {
        CreateDealRequest {
            user_id,
            currency,
            bank: self.bank,
            initials: self.initials,
            network: self.network,
            quantity,
        }
    }
}

/// Which free-text answer the admin owes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdminPromptKind {
    Time,
    Nickname,
}

/// Pending admin answer. The notice whose button opened it keeps its
/// controls until the answer commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminPrompt {
    pub deal_id: i64,
    pub kind: AdminPromptKind,
    #[serde(default)]
    pub controls_message_id: Option<i32>,
}

impl AdminPrompt {
    pub fn new(deal_id: i64, kind: AdminPromptKind) -> Self {
        Self { deal_id, kind, controls_message_id: None }
    }

    pub fn with_controls(mut self, message_id: i32) -> Self {
        self.controls_message_id = Some(message_id);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConversationState {
    Composing { step: SessionStep, draft: DealDraft },
    AwaitingAdmin(AdminPrompt),
}

/// User conversation context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    pub user_id: i64,
    pub state: ConversationState,
    pub updated_at: DateTime<Utc>,
}

impl ConversationContext {
    /// Fresh composition session positioned on the currency step
    pub fn composing(user_id: i64) -> Self {
        Self {
            user_id,
            state: ConversationState::Composing {
                step: SessionStep::Currency,
                draft: DealDraft::default(),
            },
            updated_at: Utc::now(),
        }
    }

    pub fn admin_prompt(user_id: i64, prompt: AdminPrompt) -> Self {
        Self {
            user_id,
            state: ConversationState::AwaitingAdmin(prompt),
            updated_at: Utc::now(),
        }
    }

    pub fn is_composing(&self) -> bool {
        matches!(self.state, ConversationState::Composing { .. })
    }

    /// Current session step, if composing
    pub fn step(&self) -> Option<SessionStep> {
        match &self.state {
            ConversationState::Composing { step, .. } => Some(*step),
            ConversationState::AwaitingAdmin(_) => None,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
