//! Deal model

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, FromRow, Row};
use crate::utils::errors::TradeDeskError;

/// Lifecycle of a deal. `Done` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealStatus {
    New,
    TimeSet,
    TimeConfirmed,
    NickSet,
    BuyerCreated,
    Paid,
    BuyerConfirmed,
    Done,
    Cancelled,
}

impl DealStatus {
    /// Every non-terminal status, in negotiation order
    pub const ACTIVE: [DealStatus; 7] = [
        DealStatus::New,
        DealStatus::TimeSet,
        DealStatus::TimeConfirmed,
        DealStatus::NickSet,
        DealStatus::BuyerCreated,
        DealStatus::Paid,
        DealStatus::BuyerConfirmed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DealStatus::New => "new",
            DealStatus::TimeSet => "time_set",
            DealStatus::TimeConfirmed => "time_confirmed",
            DealStatus::NickSet => "nick_set",
            DealStatus::BuyerCreated => "buyer_created",
            DealStatus::Paid => "paid",
            DealStatus::BuyerConfirmed => "buyer_confirmed",
            DealStatus::Done => "done",
            DealStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DealStatus::Done | DealStatus::Cancelled)
    }
}

impl fmt::Display for DealStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DealStatus {
    type Err = TradeDeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s {
            "new" => DealStatus::New,
            "time_set" => DealStatus::TimeSet,
            "time_confirmed" => DealStatus::TimeConfirmed,
            "nick_set" => DealStatus::NickSet,
            "buyer_created" => DealStatus::BuyerCreated,
            "paid" => DealStatus::Paid,
            "buyer_confirmed" => DealStatus::BuyerConfirmed,
            "done" => DealStatus::Done,
            "cancelled" => DealStatus::Cancelled,
            other => return Err(TradeDeskError::InvalidInput(format!("Unknown deal status: {}", other))),
        };
        Ok(status)
    }
}

/// Currency the buyer pays in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    /// Local currency via bank transfer
    Uah,
    /// USDT over a crypto network
    Usdt,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Uah => "UAH",
            Currency::Usdt => "USDT",
        }
    }

    /// Parse a menu choice such as "💴 ГРН" or "usdt"
    pub fn from_choice(text: &str) -> Option<Self> {
        let lowered = text.to_lowercase();
        if lowered.contains("грн") || lowered.contains("uah") {
            Some(Currency::Uah)
        } else if lowered.contains("usdt") {
            Some(Currency::Usdt)
        } else {
            None
        }
    }
}

impl FromStr for Currency {
    type Err = TradeDeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UAH" => Ok(Currency::Uah),
            "USDT" => Ok(Currency::Usdt),
            other => Err(TradeDeskError::InvalidInput(format!("Unknown currency: {}", other))),
        }
    }
}

/// Which party performs an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorRole {
    Buyer,
    Admin,
}

impl ActorRole {
    pub fn counterpart(&self) -> ActorRole {
        match self {
            ActorRole::Buyer => ActorRole::Admin,
            ActorRole::Admin => ActorRole::Buyer,
        }
    }
}

/// A negotiated trade between a buyer and the admin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub id: i64,
    pub user_id: i64,
    pub currency: Currency,
    pub bank: Option<String>,
    pub initials: Option<String>,
    pub network: Option<String>,
    /// Quantity in kk (millions)
    pub quantity: i64,
    pub deal_time: Option<String>,
    pub nickname: Option<String>,
    pub status: DealStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Deal {
    /// Bank for the local branch, network for the crypto branch
    pub fn rail_label(&self) -> &str {
        match self.currency {
            Currency::Uah => self.bank.as_deref().unwrap_or("—"),
            Currency::Usdt => self.network.as_deref().unwrap_or("—"),
        }
    }
}

fn decode_timestamp(column: &str, seconds: i64) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::from_timestamp(seconds, 0).ok_or_else(|| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: format!("timestamp out of range: {}", seconds).into(),
    })
}

impl<'r> FromRow<'r, SqliteRow> for Deal {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        let status = status.parse::<DealStatus>().map_err(|e| sqlx::Error::ColumnDecode {
            index: "status".to_string(),
            source: Box::new(e),
        })?;
        let currency: String = row.try_get("currency")?;
        let currency = currency.parse::<Currency>().map_err(|e| sqlx::Error::ColumnDecode {
            index: "currency".to_string(),
            source: Box::new(e),
        })?;
        // Older builds left the numeric columns nullable
        let created_at = decode_timestamp("created_at", row.try_get::<Option<i64>, _>("created_at")?.unwrap_or(0))?;
        let expires_at = match row.try_get::<Option<i64>, _>("timer_until")? {
            Some(seconds) => Some(decode_timestamp("timer_until", seconds)?),
            None => None,
        };

        Ok(Deal {
            id: row.try_get("id")?,
            user_id: row.try_get::<Option<i64>, _>("user_id")?.unwrap_or(0),
            currency,
            bank: row.try_get("bank")?,
            initials: row.try_get("initials")?,
            network: row.try_get("usdt_net")?,
            quantity: row.try_get::<Option<i64>, _>("amount_kk")?.unwrap_or(0),
            deal_time: row.try_get("deal_time")?,
            nickname: row.try_get("nick")?,
            status,
            created_at,
            expires_at,
        })
    }
}

/// Fields collected by a finished composition session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDealRequest {
    pub user_id: i64,
    pub currency: Currency,
    pub bank: Option<String>,
    pub initials: Option<String>,
    pub network: Option<String>,
    pub quantity: i64,
}

/// Field writes that accompany a status change
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DealFieldWrites {
    pub deal_time: Option<String>,
    pub nickname: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}
