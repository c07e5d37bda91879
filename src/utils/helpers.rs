//! Helper functions and utilities
//! 
//! This module contains common helper functions used throughout the application.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a new UUID v4
pub fn generate_uuid() -> String {
    Uuid::new_v4().to_string()
}

/// Format a timestamp for display
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Wall-clock time of day, used for deadlines shown to users
pub fn format_clock(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%H:%M UTC").to_string()
}

/// Quantity in kk with the full figure: `15кк (15.000.000)`
pub fn kk_fmt(kk: i64) -> String {
    let full = (kk as i128 * 1_000_000).to_string();
    let (sign, digits) = match full.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", full.as_str()),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    format!("{}кк ({}{})", kk, sign, grouped)
}

/// Escape text for Telegram HTML parse mode
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Truncate text to a maximum number of characters with ellipsis
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kk_fmt() {
        assert_eq!(kk_fmt(15), "15кк (15.000.000)");
        assert_eq!(kk_fmt(1), "1кк (1.000.000)");
        assert_eq!(kk_fmt(1000), "1000кк (1.000.000.000)");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>&</b>"), "&lt;b&gt;&amp;&lt;/b&gt;");
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("hello", 10), "hello");
        assert_eq!(truncate_text("Привет мир", 8), "Приве...");
    }

    #[test]
    fn test_generate_uuid_is_unique() {
        assert_ne!(generate_uuid(), generate_uuid());
    }
}
