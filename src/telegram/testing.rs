//! In-memory [`ChatGateway`] used by unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{ChatGateway, ChatInfo, DialogEntry, DialogKind, MessageRef, TelegramError};
use crate::store::ChatRef;
use crate::ui::Panel;

/// Scripted result of one copy attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    Ok,
    FloodWait(u32),
    Blocked,
    Fail,
}

impl CopyOutcome {
    fn into_result(self) -> Result<(), TelegramError> {
        match self {
            Self::Ok => Ok(()),
            Self::FloodWait(secs) => Err(TelegramError::FloodWait(secs)),
            Self::Blocked => Err(TelegramError::PeerUnavailable("USER_IS_BLOCKED".to_owned())),
            Self::Fail => Err(TelegramError::Invocation("boom".to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentPanel {
    pub chat_id: i64,
    pub message_id: i32,
    pub panel: Panel,
    pub reply_to: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackAnswer {
    pub query_id: i64,
    pub text: Option<String>,
    pub alert: bool,
}

#[derive(Debug, Default)]
pub struct FakeGateway {
    chats: HashMap<ChatRef, ChatInfo>,
    dialogs: Vec<DialogEntry>,
    copy_script: Mutex<HashMap<ChatRef, VecDeque<CopyOutcome>>>,
    copies: Mutex<Vec<(ChatRef, MessageRef)>>,
    sent: Mutex<Vec<SentPanel>>,
    edits: Mutex<Vec<(MessageRef, Panel)>>,
    answers: Mutex<Vec<CallbackAnswer>>,
    next_message_id: AtomicI32,
    fail_sends: AtomicBool,
    failing_sends: AtomicUsize,
    fail_edits: AtomicBool,
    closed_chats: HashSet<i64>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            next_message_id: AtomicI32::new(1000),
            ..Self::default()
        }
    }

    /// Registers a resolvable chat keyed by its configured reference.
    pub fn with_chat(mut self, chat: ChatRef, id: i64, title: &str, members: i32) -> Self {
        self.chats.insert(
            chat,
            ChatInfo {
                id,
                title: Some(title.to_owned()),
                member_count: Some(members),
            },
        );
        self
    }

    /// Registers a resolvable chat that has no title.
    pub fn with_untitled_chat(mut self, chat: ChatRef, id: i64) -> Self {
        self.chats.insert(
            chat,
            ChatInfo {
                id,
                title: None,
                member_count: None,
            },
        );
        self
    }

    pub fn with_dialog(mut self, id: i64, title: &str, kind: DialogKind) -> Self {
        self.dialogs.push(DialogEntry {
            id,
            title: Some(title.to_owned()),
            kind,
        });
        self
    }

    /// Queues outcomes for successive copies to `destination`.
    /// Unscripted attempts succeed.
    pub fn script_copy(self, destination: ChatRef, outcomes: &[CopyOutcome]) -> Self {
        self.copy_script
            .lock()
            .unwrap()
            .entry(destination)
            .or_default()
            .extend(outcomes.iter().copied());
        self
    }

    /// Makes every send to `chat_id` fail as if the chat were inaccessible.
    pub fn with_closed_chat(mut self, chat_id: i64) -> Self {
        self.closed_chats.insert(chat_id);
        self
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn fail_edits(&self, fail: bool) {
        self.fail_edits.store(fail, Ordering::SeqCst);
    }

    /// Makes only the next `count` sends fail.
    pub fn fail_next_sends(&self, count: usize) {
        self.failing_sends.store(count, Ordering::SeqCst);
    }

    pub fn copies(&self) -> Vec<(ChatRef, MessageRef)> {
        self.copies.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<SentPanel> {
        self.sent.lock().unwrap().clone()
    }

    pub fn edits(&self) -> Vec<(MessageRef, Panel)> {
        self.edits.lock().unwrap().clone()
    }

    pub fn last_edit(&self) -> Option<(MessageRef, Panel)> {
        self.edits.lock().unwrap().last().cloned()
    }

    pub fn answers(&self) -> Vec<CallbackAnswer> {
        self.answers.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatGateway for FakeGateway {
    async fn get_chat(&self, chat: &ChatRef) -> Result<ChatInfo, TelegramError> {
        self.chats
            .get(chat)
            .cloned()
            .ok_or_else(|| TelegramError::PeerUnavailable("PEER_ID_INVALID".to_owned()))
    }

    async fn copy_message(
        &self,
        destination: &ChatRef,
        source: MessageRef,
    ) -> Result<(), TelegramError> {
        self.copies.lock().unwrap().push((destination.clone(), source));
        let outcome = self
            .copy_script
            .lock()
            .unwrap()
            .get_mut(destination)
            .and_then(VecDeque::pop_front)
            .unwrap_or(CopyOutcome::Ok);
        outcome.into_result()
    }

    async fn list_dialogs(&self) -> Result<Vec<DialogEntry>, TelegramError> {
        Ok(self.dialogs.clone())
    }

    async fn send_panel(
        &self,
        chat_id: i64,
        panel: &Panel,
        reply_to: Option<i32>,
    ) -> Result<i32, TelegramError> {
        let scripted_failure = self
            .failing_sends
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if scripted_failure
            || self.fail_sends.load(Ordering::SeqCst)
            || self.closed_chats.contains(&chat_id)
        {
            return Err(TelegramError::PeerUnavailable("CHAT_WRITE_FORBIDDEN".to_owned()));
        }
        let message_id = self.next_message_id.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().unwrap().push(SentPanel {
            chat_id,
            message_id,
            panel: panel.clone(),
            reply_to,
        });
        Ok(message_id)
    }

    async fn edit_panel(&self, message: MessageRef, panel: &Panel) -> Result<(), TelegramError> {
        if self.fail_edits.load(Ordering::SeqCst) {
            return Err(TelegramError::PeerUnavailable("MESSAGE_ID_INVALID".to_owned()));
        }
        let mut edits = self.edits.lock().unwrap();
        if edits
            .iter()
            .rev()
            .find(|(m, _)| *m == message)
            .is_some_and(|(_, last)| last == panel)
        {
            return Err(TelegramError::MessageNotModified);
        }
        edits.push((message, panel.clone()));
        Ok(())
    }

    async fn answer_callback(
        &self,
        query_id: i64,
        text: Option<&str>,
        alert: bool,
    ) -> Result<(), TelegramError> {
        self.answers.lock().unwrap().push(CallbackAnswer {
            query_id,
            text: text.map(str::to_owned),
            alert,
        });
        Ok(())
    }
}
