//! Deal transition table
//!
//! The complete set of legal status changes. Anything not listed here is
//! rejected by the controller before the store is touched.

use serde::{Deserialize, Serialize};
use crate::models::{ActorRole, DealStatus};

/// What an actor asks a deal to do, with any free text it carries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DealInput {
    ProposeTime(String),
    ConfirmTime,
    AssignNick(String),
    AckCreated,
    MarkPaid,
    ConfirmReceipt,
    Finish,
    Cancel,
}

/// Payload-free discriminant of [`DealInput`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trigger {
    ProposeTime,
    ConfirmTime,
    AssignNick,
    AckCreated,
    MarkPaid,
    ConfirmReceipt,
    Finish,
    Cancel,
}

impl DealInput {
    pub fn trigger(&self) -> Trigger {
        match self {
            DealInput::ProposeTime(_) => Trigger::ProposeTime,
            DealInput::ConfirmTime => Trigger::ConfirmTime,
            DealInput::AssignNick(_) => Trigger::AssignNick,
            DealInput::AckCreated => Trigger::AckCreated,
            DealInput::MarkPaid => Trigger::MarkPaid,
            DealInput::ConfirmReceipt => Trigger::ConfirmReceipt,
            DealInput::Finish => Trigger::Finish,
            DealInput::Cancel => Trigger::Cancel,
        }
    }
}

/// One edge of the deal lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
    pub from: DealStatus,
    pub actor: ActorRole,
    pub trigger: Trigger,
    pub to: DealStatus,
}

const fn rule(from: DealStatus, actor: ActorRole, trigger: Trigger, to: DealStatus) -> TransitionRule {
    TransitionRule { from, actor, trigger, to }
}

/// Forward edges. Cancellation is handled by [`target`] for every active status.
pub const TRANSITIONS: &[TransitionRule] = &[
    rule(DealStatus::New, ActorRole::Admin, Trigger::ProposeTime, DealStatus::TimeSet),
    rule(DealStatus::TimeSet, ActorRole::Buyer, Trigger::ConfirmTime, DealStatus::TimeConfirmed),
    rule(DealStatus::TimeConfirmed, ActorRole::Admin, Trigger::AssignNick, DealStatus::NickSet),
    rule(DealStatus::NickSet, ActorRole::Buyer, Trigger::AckCreated, DealStatus::BuyerCreated),
    rule(DealStatus::BuyerCreated, ActorRole::Admin, Trigger::MarkPaid, DealStatus::Paid),
    rule(DealStatus::Paid, ActorRole::Buyer, Trigger::ConfirmReceipt, DealStatus::BuyerConfirmed),
    rule(DealStatus::BuyerConfirmed, ActorRole::Admin, Trigger::Finish, DealStatus::Done),
];

/// Status reached when `actor` fires `trigger` on a deal in `from`
pub fn target(from: DealStatus, actor: ActorRole, trigger: Trigger) -> Option<DealStatus> {
    if trigger == Trigger::Cancel {
        return (!from.is_terminal()).then_some(DealStatus::Cancelled);
    }

    TRANSITIONS
        .iter()
        .find(|r| r.from == from && r.actor == actor && r.trigger == trigger)
        .map(|r| r.to)
}

/// Statuses from which `actor` may fire `trigger`
pub fn sources(actor: ActorRole, trigger: Trigger) -> Vec<DealStatus> {
    if trigger == Trigger::Cancel {
        return DealStatus::ACTIVE.to_vec();
    }

    TRANSITIONS
        .iter()
        .filter(|r| r.actor == actor && r.trigger == trigger)
        .map(|r| r.from)
        .collect()
}
