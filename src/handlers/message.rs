//! Text message handling: commands and the text-driven steps of the
//! broadcast and set-naming flows.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, error, info};

use super::commands::TextCommand;
use super::context::BotContext;
use super::session::{BroadcastTarget, SessionStore, SetDraft, UserState};
use crate::broadcast::broadcast_to_targets;
use crate::store::{ChatRef, LogStatus};
use crate::telegram::{ChatGateway, IncomingMessage, MessageRef};
use crate::ui::panels;

/// Characters of the broadcast content kept in the log entry.
const LOG_PREVIEW_CHARS: usize = 50;

/// Handles messages from admins in the control chat.
pub struct MessageHandler<G: ?Sized> {
    ctx: Arc<BotContext<G>>,
}

impl<G> MessageHandler<G>
where
    G: ChatGateway + ?Sized,
{
    #[must_use]
    pub fn new(ctx: Arc<BotContext<G>>) -> Self {
        Self { ctx }
    }

    /// Runs a command if the message is one, then feeds the message to the
    /// user's pending step unless the command consumed it.
    ///
    /// # Errors
    ///
    /// Returns an error if a Telegram call needed to respond fails.
    pub async fn handle(&self, sessions: &mut SessionStore, msg: &IncomingMessage) -> Result<()> {
        if let Some(command) = TextCommand::parse(&msg.text, &self.ctx.settings.command_prefix) {
            debug!("Handling command: {}", command);
            if self.run_command(sessions, msg, &command).await? {
                return Ok(());
            }
        }

        match sessions.state(msg.sender_id).clone() {
            UserState::AwaitingBroadcastMessage(target) => {
                sessions.reset(msg.sender_id);
                self.process_broadcast(msg, target).await
            }
            UserState::AwaitingSetName { panel_message_id } => {
                self.process_set_name(sessions, msg, panel_message_id).await
            }
            UserState::Idle | UserState::SelectingGroupsForSet(_) => Ok(()),
        }
    }

    /// Returns whether the command consumed the message.
    async fn run_command(
        &self,
        sessions: &mut SessionStore,
        msg: &IncomingMessage,
        command: &TextCommand,
    ) -> Result<bool> {
        let prefix = &self.ctx.settings.command_prefix;
        let user = msg.sender_name.as_str();

        match command {
            TextCommand::Start => {
                sessions.reset(msg.sender_id);
                let panel = panels::main_panel(&self.ctx.stats().await, prefix);

                match self.ctx.gateway.send_panel(msg.chat_id, &panel, None).await {
                    Ok(_) => {
                        self.ctx
                            .log("command", LogStatus::Success, format!("Ran command: {prefix}{command}"), user)
                            .await;
                    }
                    Err(e) => {
                        error!("Failed to send main panel: {}", e);
                        self.ctx
                            .log(
                                "command_start",
                                LogStatus::Failure,
                                format!("Failed to show main panel: {e}"),
                                user,
                            )
                            .await;
                    }
                }
                Ok(true)
            }
            TextCommand::Cancel => {
                if sessions.reset(msg.sender_id) != UserState::Idle {
                    self.ctx
                        .reply(msg.chat_id, msg.message_id, "✅ Operation cancelled.")
                        .await
                        .context("Failed to confirm cancellation")?;
                    self.ctx
                        .log("command", LogStatus::Success, format!("Ran command: {prefix}{command}"), user)
                        .await;
                }
                Ok(true)
            }
            TextCommand::Id => {
                let mut text = format!(
                    "👤 **Your user ID:** `{}`\n💬 **This chat ID:** `{}`",
                    msg.sender_id, msg.chat_id
                );
                if let Some(replied_id) = msg.reply_to.as_ref().and_then(|r| r.sender_id) {
                    text.push_str(&format!("\n\n👤 **Replied user ID:** `{replied_id}`"));
                }
                self.ctx
                    .reply(msg.chat_id, msg.message_id, text)
                    .await
                    .context("Failed to reply with ids")?;
                self.ctx
                    .log("command", LogStatus::Success, format!("Ran command: {prefix}{command}"), user)
                    .await;
                Ok(true)
            }
            TextCommand::Unknown(_) => {
                self.ctx
                    .log("command", LogStatus::Failure, format!("Unknown command: {prefix}{command}"), user)
                    .await;
                Ok(false)
            }
        }
    }

    async fn process_broadcast(&self, msg: &IncomingMessage, target: BroadcastTarget) -> Result<()> {
        let user = msg.sender_name.as_str();

        let (channels, target_name): (Vec<ChatRef>, String) = match target {
            BroadcastTarget::All => (
                self.ctx.settings.target_channels.clone(),
                "all groups".to_owned(),
            ),
            BroadcastTarget::Set(id) => match self.ctx.store.broadcast_set(id).await {
                Some(set) => (set.channels, format!("set \"{}\"", set.name)),
                None => (Vec::new(), String::new()),
            },
        };

        if channels.is_empty() {
            let err_msg = "Error: no broadcast targets found.";
            self.ctx
                .reply(msg.chat_id, msg.message_id, format!("❌ {err_msg}"))
                .await
                .context("Failed to report missing targets")?;
            self.ctx.log("broadcast", LogStatus::Failure, err_msg, user).await;
            return Ok(());
        }

        let status_id = self
            .ctx
            .reply(
                msg.chat_id,
                msg.message_id,
                panels::broadcast_started(&target_name, channels.len()),
            )
            .await
            .context("Failed to post broadcast status")?;

        let (source_id, content) = match &msg.reply_to {
            Some(replied) => (
                replied.message_id,
                replied.text.clone().unwrap_or_else(|| {
                    if replied.has_media {
                        "Media message".to_owned()
                    } else {
                        String::new()
                    }
                }),
            ),
            None => (msg.message_id, msg.text.clone()),
        };

        info!("{} started a broadcast to {}", user, target_name);
        let report = broadcast_to_targets(
            self.ctx.gateway.as_ref(),
            &channels,
            MessageRef::new(msg.chat_id, source_id),
            self.ctx.settings.broadcast_delay(),
        )
        .await;

        self.ctx
            .edit(
                MessageRef::new(msg.chat_id, status_id),
                &panels::Panel::text(panels::broadcast_finished(
                    &target_name,
                    report.success,
                    report.failed,
                )),
            )
            .await
            .context("Failed to update broadcast status")?;

        let detail = format!(
            "Broadcast to {target_name}. Result: {} succeeded, {} failed. Content: {}",
            report.success,
            report.failed,
            panels::truncate(&content, LOG_PREVIEW_CHARS)
        );
        self.ctx
            .log(
                "broadcast",
                LogStatus::for_counts(report.success, report.failed),
                detail,
                user,
            )
            .await;
        Ok(())
    }

    async fn process_set_name(
        &self,
        sessions: &mut SessionStore,
        msg: &IncomingMessage,
        panel_message_id: i32,
    ) -> Result<()> {
        let draft = SetDraft {
            set_id: 0,
            name: msg.text.clone(),
            selected: Vec::new(),
            panel_message_id,
        };
        self.ctx
            .log(
                "manage_set",
                LogStatus::Info,
                format!("Naming new set: {}", draft.name),
                &msg.sender_name,
            )
            .await;

        let channels = self.ctx.channel_details().await;
        let panel = panels::set_editor_panel(draft.set_id, &draft.name, &channels, &draft.selected);
        sessions.set_state(msg.sender_id, UserState::SelectingGroupsForSet(draft));

        self.ctx
            .edit(MessageRef::new(msg.chat_id, panel_message_id), &panel)
            .await
            .context("Failed to open set editor")?;
        Ok(())
    }
}
