use std::sync::Arc;

use chrono::Local;

use crate::config::BotSettings;
use crate::info::{self, ChannelDetail, SystemStats};
use crate::store::{DataStore, LogStatus};
use crate::telegram::{ChatGateway, MessageRef, TelegramError};
use crate::ui::Panel;

/// Dependencies shared by the message and callback handlers.
#[derive(Debug)]
pub struct BotContext<G: ?Sized> {
    pub gateway: Arc<G>,
    pub store: Arc<DataStore>,
    pub settings: BotSettings,
}

impl<G> BotContext<G>
where
    G: ChatGateway + ?Sized,
{
    pub fn new(gateway: Arc<G>, store: Arc<DataStore>, settings: BotSettings) -> Self {
        Self {
            gateway,
            store,
            settings,
        }
    }

    pub async fn stats(&self) -> SystemStats {
        info::get_system_stats(
            &self.store,
            self.settings.target_channels.len(),
            Local::now().naive_local(),
        )
        .await
    }

    /// Metadata for every configured target, in configuration order.
    pub async fn channel_details(&self) -> Vec<ChannelDetail> {
        info::get_all_channel_details(self.gateway.as_ref(), &self.settings.target_channels).await
    }

    /// Re-renders a panel. An unchanged panel is not an error.
    pub async fn edit(&self, message: MessageRef, panel: &Panel) -> Result<(), TelegramError> {
        match self.gateway.edit_panel(message, panel).await {
            Err(TelegramError::MessageNotModified) => Ok(()),
            other => other,
        }
    }

    /// Sends plain text as a reply.
    pub async fn reply(
        &self,
        chat_id: i64,
        reply_to: i32,
        text: impl Into<String>,
    ) -> Result<i32, TelegramError> {
        self.gateway
            .send_panel(chat_id, &Panel::text(text), Some(reply_to))
            .await
    }

    pub async fn log(&self, action: &str, status: LogStatus, message: impl Into<String>, user: &str) {
        self.store.add_log(action, status, message, user).await;
    }
}
