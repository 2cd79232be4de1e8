use std::sync::Arc;

use tracing::{debug, error, warn};

use super::callback::{CallbackHandler, CallbackOutcome};
use super::context::BotContext;
use super::message::MessageHandler;
use super::session::SessionStore;
use crate::telegram::{BotEvent, ChatGateway, IncomingCallback, IncomingMessage, TelegramError};

/// Routes inbound events to the handlers, one at a time.
pub struct Dispatcher<G: ?Sized> {
    ctx: Arc<BotContext<G>>,
    messages: MessageHandler<G>,
    callbacks: CallbackHandler<G>,
    sessions: SessionStore,
}

impl<G> Dispatcher<G>
where
    G: ChatGateway + ?Sized,
{
    #[must_use]
    pub fn new(ctx: Arc<BotContext<G>>) -> Self {
        Self {
            messages: MessageHandler::new(Arc::clone(&ctx)),
            callbacks: CallbackHandler::new(Arc::clone(&ctx)),
            ctx,
            sessions: SessionStore::new(),
        }
    }

    /// Handles one event. Handler failures are logged, never propagated.
    pub async fn dispatch(&mut self, event: BotEvent) {
        match event {
            BotEvent::Message(msg) => self.dispatch_message(&msg).await,
            BotEvent::Callback(query) => self.dispatch_callback(&query).await,
        }
    }

    async fn dispatch_message(&mut self, msg: &IncomingMessage) {
        let settings = &self.ctx.settings;
        if msg.chat_id != settings.control_chat || !settings.is_admin(msg.sender_id) {
            debug!(
                "Ignoring message from {} in chat {}",
                msg.sender_id, msg.chat_id
            );
            return;
        }

        if let Err(e) = self.messages.handle(&mut self.sessions, msg).await {
            error!("Error handling message {}: {:#}", msg.message_id, e);
        }
    }

    async fn dispatch_callback(&mut self, query: &IncomingCallback) {
        if !self.ctx.settings.is_admin(query.sender_id) {
            debug!("Ignoring button press from non-admin {}", query.sender_id);
            return;
        }

        let (text, alert) = match self.callbacks.handle(&mut self.sessions, query).await {
            Ok(CallbackOutcome::Answered) => return,
            Ok(CallbackOutcome::Silent) => (None, false),
            Ok(CallbackOutcome::Alert(text)) => (Some(text), true),
            Err(e) => {
                error!(
                    "Error handling callback {:?}: {:#}",
                    String::from_utf8_lossy(&query.data),
                    e
                );
                (Some(format!("Error while handling: {}", error_kind(&e))), true)
            }
        };

        if let Err(e) = self
            .ctx
            .gateway
            .answer_callback(query.query_id, text.as_deref(), alert)
            .await
        {
            warn!("Failed to answer callback {}: {}", query.query_id, e);
        }
    }
}

/// Short name of the root failure, shown to the operator.
fn error_kind(err: &anyhow::Error) -> &'static str {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<TelegramError>())
        .map_or("Error", TelegramError::kind)
}
