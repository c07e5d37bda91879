//! Read-only informational views

use teloxide::{Bot, types::{Message, ParseMode}, prelude::*};
use crate::handlers::menu;
use crate::services::ServiceFactory;
use crate::utils::errors::Result;

/// Current exchange rates
pub async fn handle_rates(bot: Bot, msg: Message, services: ServiceFactory) -> Result<()> {
    let pricing = services.notification_service.pricing();
    let text = format!(
        "💴 <b>{}</b> грн / 1кк\n💵 <b>{}</b> USDT / 1кк",
        pricing.uah_per_kk, pricing.usdt_per_kk
    );

    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(menu::back_to_menu())
        .await?;
    Ok(())
}

pub async fn handle_about(bot: Bot, msg: Message) -> Result<()> {
    let text = "🤖 <b>О БОТЕ</b>\n\n\
        Бот предназначен для создания сделок.\n\
        Все оплаты и подтверждения проходят <b>ТОЛЬКО В ИГРЕ</b>.";

    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(menu::back_to_menu())
        .await?;
    Ok(())
}

/// Handle /help command
pub async fn handle_help(bot: Bot, msg: Message) -> Result<()> {
    let help_text = "🤖 TradeDesk\n\n\
        /start - Главное меню\n\
        /rates - Текущий курс\n\
        /active - Мои активные сделки\n\
        /history - История сделок\n\
        /about - О боте\n\
        /help - Эта справка";

    bot.send_message(msg.chat.id, help_text)
        .reply_markup(menu::main_menu())
        .await?;
    Ok(())
}
