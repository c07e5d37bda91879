//! Test helpers module
//!
//! Shared setup for the TradeDesk integration tests: an in-memory database,
//! a notifier that records instead of sending, deal fixtures and a mock
//! Telegram API server.

#![allow(dead_code)]

pub mod recording_notifier;
pub mod telegram_mock;
pub mod test_context;
pub mod test_data;

pub use recording_notifier::*;
pub use telegram_mock::*;
pub use test_context::*;
pub use test_data::*;
