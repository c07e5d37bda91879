//! Reply-keyboard main menu

use teloxide::types::{KeyboardButton, KeyboardMarkup};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    NewDeal,
    Rates,
    ActiveDeals,
    History,
    ClearActive,
    About,
    MainMenu,
}

impl MenuItem {
    pub const MAIN: [MenuItem; 6] = [
        MenuItem::NewDeal,
        MenuItem::Rates,
        MenuItem::ActiveDeals,
        MenuItem::History,
        MenuItem::ClearActive,
        MenuItem::About,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MenuItem::NewDeal => "🟢 ОСТАВИТЬ ЗАЯВКУ",
            MenuItem::Rates => "💱 ПРОВЕРИТЬ КУРС",
            MenuItem::ActiveDeals => "📂 МОИ АКТИВНЫЕ СДЕЛКИ",
            MenuItem::History => "📜 ИСТОРИЯ",
            MenuItem::ClearActive => "🧹 ОЧИСТИТЬ АКТИВНЫЕ ЗАКАЗЫ",
            MenuItem::About => "ℹ️ О БОТЕ",
            MenuItem::MainMenu => "⬅ ГЛАВНОЕ МЕНЮ",
        }
    }

    pub fn from_label(text: &str) -> Option<Self> {
        let text = text.trim();
        MenuItem::MAIN
            .into_iter()
            .chain(std::iter::once(MenuItem::MainMenu))
            .find(|item| item.label() == text)
    }
}

/// One button per row, like the rest of the bot's keyboards
pub fn reply_keyboard<I, S>(labels: I) -> KeyboardMarkup
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    KeyboardMarkup::new(labels.into_iter().map(|label| vec![KeyboardButton::new(label)]))
        .resize_keyboard()
}

pub fn main_menu() -> KeyboardMarkup {
    reply_keyboard(MenuItem::MAIN.iter().map(|item| item.label()))
}

pub fn back_to_menu() -> KeyboardMarkup {
    reply_keyboard([MenuItem::MainMenu.label()])
}
