//! Notifier double that keeps every notice in memory

use async_trait::async_trait;
use tokio::sync::Mutex;
use TradeDesk::models::CallbackAction;
use TradeDesk::services::{Notice, Notifier};
use TradeDesk::{Result, TradeDeskError};

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notice>>,
    offline: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following delivery fail
    pub async fn go_offline(&self) {
        *self.offline.lock().await = true;
    }

    pub async fn sent(&self) -> Vec<Notice> {
        self.sent.lock().await.clone()
    }

    /// Drain the recorded notices
    pub async fn take(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.sent.lock().await)
    }

    pub async fn sent_to(&self, chat_id: i64) -> Vec<Notice> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|notice| notice.chat_id == chat_id)
            .cloned()
            .collect()
    }

    /// Actions of every button attached to notices for `chat_id`
    pub async fn buttons_for(&self, chat_id: i64) -> Vec<CallbackAction> {
        self.sent_to(chat_id)
            .await
            .iter()
            .flat_map(|notice| notice.buttons.iter().map(|button| button.data.action))
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, notice: &Notice) -> Result<()> {
        if *self.offline.lock().await {
            let offline = std::io::Error::new(std::io::ErrorKind::NotConnected, "recording notifier is offline");
            return Err(TradeDeskError::from(offline));
        }
        self.sent.lock().await.push(notice.clone());
        Ok(())
    }
}
