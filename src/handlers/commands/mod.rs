//! Command handlers module
//!
//! This module contains handlers for all bot commands like /start, /help, etc.

pub mod start;
pub mod info;
pub mod deals;
pub mod admin;

use teloxide::{Bot, types::Message, utils::command::BotCommands};
use crate::handlers::leave_conversation;
use crate::utils::errors::Result;
use crate::services::ServiceFactory;

/// All available bot commands
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "TradeDesk commands:")]
pub enum Command {
    #[command(description = "Show the main menu")]
    Start,
    #[command(description = "Show current exchange rates")]
    Rates,
    #[command(description = "List your active deals")]
    Active,
    #[command(description = "Show completed deals")]
    History,
    #[command(description = "About this bot")]
    About,
    #[command(description = "Cancel all active deals (admin only)")]
    Clear,
    #[command(description = "Show help information")]
    Help,
}

/// Main command dispatcher
pub async fn handle_command(bot: Bot, msg: Message, cmd: Command, services: ServiceFactory) -> Result<()> {
    leave_conversation(&services, &msg).await;

    match cmd {
        Command::Start => start::handle_start(bot, msg, services).await,
        Command::Rates => info::handle_rates(bot, msg, services).await,
        Command::Active => deals::handle_active(bot, msg, services).await,
        Command::History => deals::handle_history(bot, msg, services).await,
        Command::About => info::handle_about(bot, msg).await,
        Command::Clear => admin::handle_clear_active(bot, msg, services).await,
        Command::Help => info::handle_help(bot, msg).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("/start", "tradedesk_bot").unwrap(), Command::Start);
        assert_eq!(Command::parse("/clear", "tradedesk_bot").unwrap(), Command::Clear);
        assert!(Command::parse("/events", "tradedesk_bot").is_err());
    }
}
