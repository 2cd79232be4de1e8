//! Telegram client wrapper built on grammers.
//!
//! [`TelegramBot`] owns the connection, handles sign-in, keeps a cache of
//! known peers keyed by marked id, and implements [`ChatGateway`].
//! [`EventStream`] turns raw updates into [`BotEvent`]s.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use grammers_client::client::{LoginToken, PasswordToken, UpdateStream, UpdatesConfiguration};
use grammers_client::types::peer::Peer;
use grammers_client::update::{self, Update};
use grammers_client::{Client, InputMessage, SenderPool, SignInError, button, reply_markup, sender};
use grammers_session::storages::SqliteSession;
use grammers_tl_types as tl;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::events::{BotEvent, IncomingCallback, IncomingMessage, RepliedMessage};
use super::gateway::{
    ChatGateway, ChatInfo, DialogEntry, DialogKind, MessageRef, PeerKind, marked_id,
};
use super::TelegramError;
use crate::config::TelegramConfig;
use crate::store::ChatRef;
use crate::ui::Panel;

/// Basic identity of the signed-in account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub id: i64,
    pub first_name: String,
}

/// A cached peer with everything needed to address it.
#[derive(Clone)]
struct KnownPeer {
    peer: Peer,
    entry: DialogEntry,
    input: tl::enums::InputPeer,
}

/// High-level Telegram client wrapper.
pub struct TelegramBot {
    /// The underlying grammers client.
    client: Client,

    /// Handle to the sender pool for disconnection.
    handle: sender::SenderPoolHandle,

    /// Peers seen in dialogs, resolutions and updates, by marked id.
    peers: RwLock<HashMap<i64, KnownPeer>>,

    /// Display names of users seen in messages.
    names: RwLock<HashMap<i64, String>>,

    /// Update stream, handed out once to the event loop.
    updates: Mutex<Option<UpdateStream>>,

    /// Background task running the sender pool.
    _pool_task: JoinHandle<()>,
}

impl TelegramBot {
    /// Connects to Telegram with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if connection fails.
    pub async fn connect(config: &TelegramConfig) -> Result<Self, TelegramError> {
        info!("Connecting to Telegram...");

        let session = Arc::new(
            SqliteSession::open(&config.session_path)
                .await
                .map_err(|e| TelegramError::Session(e.to_string()))?,
        );

        let SenderPool {
            runner,
            updates,
            handle,
        } = SenderPool::new(Arc::clone(&session), config.api_id);

        let client = Client::new(handle.clone());

        // Spawn the sender pool runner
        let pool_task = tokio::spawn(async move {
            runner.run().await;
        });

        let update_stream = client
            .stream_updates(
                updates,
                UpdatesConfiguration {
                    catch_up: false,
                    ..Default::default()
                },
            )
            .await;

        let is_authorized = client
            .is_authorized()
            .await
            .map_err(|e| TelegramError::Connection(e.to_string()))?;

        info!("Connected to Telegram. Authorized: {}", is_authorized);

        Ok(Self {
            client,
            handle: handle.thin,
            peers: RwLock::new(HashMap::new()),
            names: RwLock::new(HashMap::new()),
            updates: Mutex::new(Some(update_stream)),
            _pool_task: pool_task,
        })
    }

    /// Checks if the client is authorized.
    ///
    /// # Errors
    ///
    /// Returns an error if the check fails.
    pub async fn is_authorized(&self) -> Result<bool, TelegramError> {
        self.client
            .is_authorized()
            .await
            .map_err(|e| TelegramError::Connection(e.to_string()))
    }

    /// Requests a login code to be sent to the phone number.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn request_login_code(
        &self,
        phone: &str,
        api_hash: &str,
    ) -> Result<LoginToken, TelegramError> {
        info!("Requesting login code for phone: {}...", mask_phone(phone));

        self.client
            .request_login_code(phone, api_hash)
            .await
            .map_err(|e| TelegramError::SignInFailed(e.to_string()))
    }

    /// Signs in with the login code.
    ///
    /// # Errors
    ///
    /// Returns an error if sign in fails.
    pub async fn sign_in(&self, token: &LoginToken, code: &str) -> Result<(), TelegramError> {
        info!("Signing in with login code...");

        match self.client.sign_in(token, code).await {
            Ok(_user) => {
                info!("Successfully signed in!");
                Ok(())
            }
            Err(SignInError::PasswordRequired(password_token)) => {
                debug!("2FA password required, hint: {:?}", password_token.hint());
                Err(TelegramError::PasswordRequired(password_token))
            }
            Err(SignInError::InvalidCode) => {
                Err(TelegramError::SignInFailed("Invalid code".to_owned()))
            }
            Err(e) => Err(TelegramError::SignInFailed(e.to_string())),
        }
    }

    /// Checks the 2FA password.
    ///
    /// # Errors
    ///
    /// Returns an error if the password is invalid.
    pub async fn check_password(
        &self,
        password_token: PasswordToken,
        password: &str,
    ) -> Result<(), TelegramError> {
        info!("Checking 2FA password...");

        match self.client.check_password(password_token, password).await {
            Ok(_user) => {
                info!("Successfully authenticated with 2FA!");
                Ok(())
            }
            Err(SignInError::InvalidPassword(token)) => Err(TelegramError::InvalidPassword(token)),
            Err(e) => Err(TelegramError::SignInFailed(e.to_string())),
        }
    }

    /// Fetches the signed-in account and caches it as the Saved Messages
    /// chat (its marked id is the account's user id).
    ///
    /// # Errors
    ///
    /// Returns an error if not authorized or the API call fails.
    pub async fn me(&self) -> Result<AccountInfo, TelegramError> {
        if !self.is_authorized().await? {
            return Err(TelegramError::NotAuthorized);
        }

        let me = self.client.get_me().await?;
        let tl::enums::User::User(user) = &me.raw else {
            return Err(TelegramError::Invocation("Could not load own account".to_owned()));
        };
        let account = AccountInfo {
            id: user.id,
            first_name: user.first_name.clone().unwrap_or_default(),
        };

        self.peers.write().await.insert(
            account.id,
            KnownPeer {
                peer: Peer::User(me),
                entry: DialogEntry {
                    id: account.id,
                    title: Some("Saved Messages".to_owned()),
                    kind: DialogKind::User,
                },
                input: tl::enums::InputPeer::PeerSelf,
            },
        );

        Ok(account)
    }

    /// Takes the update stream. Only the first call returns a stream.
    pub async fn take_events(self: &Arc<Self>) -> Option<EventStream> {
        let updates = self.updates.lock().await.take()?;
        Some(EventStream {
            bot: Arc::clone(self),
            updates,
        })
    }

    /// Reloads every dialog into the peer cache.
    async fn refresh_dialogs(&self) -> Result<Vec<DialogEntry>, TelegramError> {
        let mut dialogs = self.client.iter_dialogs();
        let mut fresh = Vec::new();

        while let Some(dialog) = dialogs.next().await? {
            if let Some(known) = describe_peer(&dialog.peer) {
                fresh.push(known);
            }
        }

        let entries: Vec<DialogEntry> = fresh.iter().map(|k| k.entry.clone()).collect();
        let mut peers = self.peers.write().await;
        for known in fresh {
            peers.insert(known.entry.id, known);
        }
        debug!("Peer cache holds {} chats", peers.len());

        Ok(entries)
    }

    /// Looks up a cached peer, reloading dialogs once on a miss.
    async fn peer_by_id(&self, chat_id: i64) -> Result<KnownPeer, TelegramError> {
        if let Some(known) = self.peers.read().await.get(&chat_id) {
            return Ok(known.clone());
        }

        debug!("Chat {} not cached, reloading dialogs", chat_id);
        self.refresh_dialogs().await?;
        self.peers
            .read()
            .await
            .get(&chat_id)
            .cloned()
            .ok_or_else(|| TelegramError::PeerUnavailable(format!("unknown chat {chat_id}")))
    }

    async fn resolve(&self, chat: &ChatRef) -> Result<KnownPeer, TelegramError> {
        match chat {
            ChatRef::Id(id) => self.peer_by_id(*id).await,
            ChatRef::Username(name) => {
                let peer = self
                    .client
                    .resolve_username(name)
                    .await?
                    .ok_or_else(|| TelegramError::PeerUnavailable(format!("@{name}")))?;
                let known = describe_peer(&peer)
                    .ok_or_else(|| TelegramError::PeerUnavailable(format!("@{name}")))?;
                self.peers.write().await.insert(known.entry.id, known.clone());
                Ok(known)
            }
        }
    }

    async fn member_count(&self, known: &KnownPeer) -> Result<Option<i32>, TelegramError> {
        match &known.input {
            tl::enums::InputPeer::Channel(channel) => {
                let request = tl::functions::channels::GetFullChannel {
                    channel: tl::enums::InputChannel::Channel(tl::types::InputChannel {
                        channel_id: channel.channel_id,
                        access_hash: channel.access_hash,
                    }),
                };
                let tl::enums::messages::ChatFull::Full(full) = self.client.invoke(&request).await?;
                Ok(match full.full_chat {
                    tl::enums::ChatFull::ChannelFull(info) => info.participants_count,
                    tl::enums::ChatFull::Full(_) => None,
                })
            }
            _ => Ok(raw_participants_count(&known.peer)),
        }
    }

    async fn display_name(&self, user_id: i64) -> String {
        self.names
            .read()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| user_id.to_string())
    }

    /// Disconnects from Telegram.
    pub fn disconnect(&self) {
        info!("Disconnecting from Telegram...");
        self.handle.quit();
    }
}

impl std::fmt::Debug for TelegramBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramBot").finish_non_exhaustive()
    }
}

#[async_trait]
impl ChatGateway for TelegramBot {
    async fn get_chat(&self, chat: &ChatRef) -> Result<ChatInfo, TelegramError> {
        let known = self.resolve(chat).await?;
        let member_count = self.member_count(&known).await?;
        Ok(ChatInfo {
            id: known.entry.id,
            title: known.entry.title,
            member_count,
        })
    }

    async fn copy_message(
        &self,
        destination: &ChatRef,
        source: MessageRef,
    ) -> Result<(), TelegramError> {
        let from = self.peer_by_id(source.chat_id).await?;
        let to = self.resolve(destination).await?;

        let request = tl::functions::messages::ForwardMessages {
            silent: false,
            background: false,
            with_my_score: false,
            drop_author: true,
            drop_media_captions: false,
            noforwards: false,
            allow_paid_floodskip: false,
            from_peer: from.input,
            id: vec![source.message_id],
            random_id: vec![rand::random()],
            to_peer: to.input,
            top_msg_id: None,
            reply_to: None,
            schedule_date: None,
            send_as: None,
            quick_reply_shortcut: None,
            video_timestamp: None,
            allow_paid_stars: None,
            suggested_post: None,
        };
        self.client.invoke(&request).await?;
        Ok(())
    }

    async fn list_dialogs(&self) -> Result<Vec<DialogEntry>, TelegramError> {
        self.refresh_dialogs().await
    }

    async fn send_panel(
        &self,
        chat_id: i64,
        panel: &Panel,
        reply_to: Option<i32>,
    ) -> Result<i32, TelegramError> {
        let known = self.peer_by_id(chat_id).await?;
        let message = self
            .client
            .send_message(&known.peer, input_message(panel).reply_to(reply_to))
            .await?;
        Ok(message.id())
    }

    async fn edit_panel(&self, message: MessageRef, panel: &Panel) -> Result<(), TelegramError> {
        let known = self.peer_by_id(message.chat_id).await?;
        self.client
            .edit_message(&known.peer, message.message_id, input_message(panel))
            .await?;
        Ok(())
    }

    async fn answer_callback(
        &self,
        query_id: i64,
        text: Option<&str>,
        alert: bool,
    ) -> Result<(), TelegramError> {
        let request = tl::functions::messages::SetBotCallbackAnswer {
            alert,
            query_id,
            message: text.map(str::to_owned),
            url: None,
            cache_time: 0,
        };
        self.client.invoke(&request).await?;
        Ok(())
    }
}

/// Stream of inbound events for the dispatcher.
pub struct EventStream {
    bot: Arc<TelegramBot>,
    updates: UpdateStream,
}

impl EventStream {
    /// Waits for the next message or button press, skipping other updates.
    ///
    /// # Errors
    ///
    /// Returns an error if the update stream fails.
    pub async fn next_event(&mut self) -> Result<BotEvent, TelegramError> {
        loop {
            let event = match self.updates.next().await? {
                Update::NewMessage(message) => self.convert_message(&message).await,
                Update::CallbackQuery(query) => self.convert_callback(&query.raw).await,
                _ => None,
            };
            if let Some(event) = event {
                return Ok(event);
            }
        }
    }

    async fn convert_message(
        &self,
        message: &update::Message,
    ) -> Option<BotEvent> {
        let tl::enums::Message::Message(raw) = &message.raw else {
            return None;
        };
        if raw.message.is_empty() {
            return None;
        }

        let chat_id = raw_peer_id(&raw.peer_id);
        let sender_id = raw.from_id.as_ref().map_or(chat_id, raw_peer_id);
        let sender_name = message
            .sender()
            .map_or_else(|| sender_id.to_string(), |peer| peer_title(&peer));
        self.bot
            .names
            .write()
            .await
            .insert(sender_id, sender_name.clone());

        let reply_to = match message.get_reply().await {
            Ok(Some(reply)) => {
                let (sender, has_media) = match &reply.raw {
                    tl::enums::Message::Message(r) => {
                        (r.from_id.as_ref().map(raw_peer_id), r.media.is_some())
                    }
                    _ => (None, false),
                };
                let text = reply.text();
                Some(RepliedMessage {
                    message_id: reply.id(),
                    sender_id: sender,
                    text: (!text.is_empty()).then(|| text.to_owned()),
                    has_media,
                })
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Could not load replied message: {}", e);
                None
            }
        };

        Some(BotEvent::Message(IncomingMessage {
            chat_id,
            message_id: raw.id,
            sender_id,
            sender_name,
            text: raw.message.clone(),
            reply_to,
        }))
    }

    async fn convert_callback(&self, raw: &tl::enums::Update) -> Option<BotEvent> {
        let tl::enums::Update::BotCallbackQuery(query) = raw else {
            return None;
        };

        Some(BotEvent::Callback(IncomingCallback {
            query_id: query.query_id,
            chat_id: raw_peer_id(&query.peer),
            message_id: query.msg_id,
            sender_id: query.user_id,
            sender_name: self.bot.display_name(query.user_id).await,
            data: query.data.clone().unwrap_or_default(),
        }))
    }
}

fn input_message(panel: &Panel) -> InputMessage {
    let message = InputMessage::markdown(&panel.text);
    if panel.keyboard.is_empty() {
        return message;
    }

    let rows: Vec<Vec<button::Inline>> = panel
        .keyboard
        .iter()
        .map(|row| {
            row.iter()
                .map(|b| button::inline(&b.label, b.action.encode().into_bytes()))
                .collect()
        })
        .collect();
    message.reply_markup(&reply_markup::inline(rows))
}

/// Marked id of a raw peer reference.
fn raw_peer_id(peer: &tl::enums::Peer) -> i64 {
    match peer {
        tl::enums::Peer::User(p) => marked_id(PeerKind::User, p.user_id),
        tl::enums::Peer::Chat(p) => marked_id(PeerKind::Chat, p.chat_id),
        tl::enums::Peer::Channel(p) => marked_id(PeerKind::Channel, p.channel_id),
    }
}

fn peer_title(peer: &Peer) -> String {
    match peer {
        Peer::User(u) => u.full_name(),
        Peer::Group(g) => g.title().unwrap_or("Group").to_owned(),
        Peer::Channel(c) => c.title().to_owned(),
    }
}

fn raw_participants_count(peer: &Peer) -> Option<i32> {
    match peer {
        Peer::Group(g) => match &g.raw {
            tl::enums::Chat::Chat(chat) => Some(chat.participants_count),
            tl::enums::Chat::Channel(channel) => channel.participants_count,
            _ => None,
        },
        Peer::Channel(c) => c.raw.participants_count,
        Peer::User(_) => None,
    }
}

/// Builds the cache entry for a group or channel. Users are not addressed
/// by id, so they are skipped.
fn describe_peer(peer: &Peer) -> Option<KnownPeer> {
    let (entry, input) = match peer {
        Peer::User(_) => return None,
        Peer::Group(g) => match &g.raw {
            tl::enums::Chat::Chat(chat) => (
                DialogEntry {
                    id: marked_id(PeerKind::Chat, chat.id),
                    title: Some(chat.title.clone()),
                    kind: DialogKind::Group,
                },
                tl::enums::InputPeer::Chat(tl::types::InputPeerChat { chat_id: chat.id }),
            ),
            tl::enums::Chat::Channel(channel) => (
                DialogEntry {
                    id: marked_id(PeerKind::Channel, channel.id),
                    title: Some(channel.title.clone()),
                    kind: if channel.megagroup {
                        DialogKind::Supergroup
                    } else {
                        DialogKind::Channel
                    },
                },
                channel_input(channel.id, channel.access_hash),
            ),
            _ => return None,
        },
        Peer::Channel(c) => (
            DialogEntry {
                id: marked_id(PeerKind::Channel, c.raw.id),
                title: Some(c.raw.title.clone()),
                kind: if c.raw.megagroup {
                    DialogKind::Supergroup
                } else {
                    DialogKind::Channel
                },
            },
            channel_input(c.raw.id, c.raw.access_hash),
        ),
    };

    Some(KnownPeer {
        peer: peer.clone(),
        entry,
        input,
    })
}

fn channel_input(channel_id: i64, access_hash: Option<i64>) -> tl::enums::InputPeer {
    tl::enums::InputPeer::Channel(tl::types::InputPeerChannel {
        channel_id,
        access_hash: access_hash.unwrap_or_default(),
    })
}

/// Masks a phone number for logging (shows last 4 digits).
fn mask_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.len() > 4 {
        format!("***{}", &digits[digits.len() - 4..])
    } else {
        "****".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_phone() {
        assert_eq!(mask_phone("+1234567890"), "***7890");
        assert_eq!(mask_phone("123"), "****");
        assert_eq!(mask_phone("+7 (999) 123-45-67"), "***4567");
    }

    #[test]
    fn test_raw_peer_id() {
        let channel = tl::enums::Peer::Channel(tl::types::PeerChannel {
            channel_id: 1_234_567_890,
        });
        assert_eq!(raw_peer_id(&channel), -1_001_234_567_890);

        let chat = tl::enums::Peer::Chat(tl::types::PeerChat { chat_id: 55 });
        assert_eq!(raw_peer_id(&chat), -55);

        let user = tl::enums::Peer::User(tl::types::PeerUser { user_id: 7 });
        assert_eq!(raw_peer_id(&user), 7);
    }
}
