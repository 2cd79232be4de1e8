//! Inline button handling.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, error, warn};

use super::context::BotContext;
use super::session::{BroadcastTarget, SessionStore, SetDraft, UserState};
use crate::info::scan_all_dialogs;
use crate::store::LogStatus;
use crate::telegram::{ChatGateway, IncomingCallback, MessageRef};
use crate::ui::{BackTarget, CallbackAction, GroupsMenu, MainMenu, Panel, panels};

/// Log entries shown on the recent activity panel.
const LOG_PANEL_ENTRIES: usize = 15;

/// How a button press should be acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Plain acknowledgement.
    Silent,
    /// A modal alert.
    Alert(String),
    /// The handler already answered the query.
    Answered,
}

impl CallbackOutcome {
    fn alert(text: &str) -> Self {
        Self::Alert(text.to_owned())
    }
}

/// Handles button presses from admins.
pub struct CallbackHandler<G: ?Sized> {
    ctx: Arc<BotContext<G>>,
}

impl<G> CallbackHandler<G>
where
    G: ChatGateway + ?Sized,
{
    #[must_use]
    pub fn new(ctx: Arc<BotContext<G>>) -> Self {
        Self { ctx }
    }

    /// Decodes the pressed button and runs its action.
    ///
    /// Unknown payloads are logged and acknowledged without doing anything.
    ///
    /// # Errors
    ///
    /// Returns an error if a Telegram call needed to respond fails.
    pub async fn handle(
        &self,
        sessions: &mut SessionStore,
        query: &IncomingCallback,
    ) -> Result<CallbackOutcome> {
        let action = match CallbackAction::parse_bytes(&query.data) {
            Ok(action) => action,
            Err(e) => {
                warn!("Ignoring button press: {}", e);
                self.ctx
                    .log("callback", LogStatus::Failure, e.to_string(), &query.sender_name)
                    .await;
                return Ok(CallbackOutcome::Silent);
            }
        };
        debug!("Handling callback: {}", action);

        let panel = MessageRef::new(query.chat_id, query.message_id);
        match action {
            CallbackAction::Back(target) => self.show_back(panel, target).await,
            CallbackAction::Main(item) => self.show_main_item(panel, item).await,
            CallbackAction::BroadcastAll => {
                sessions.set_state(
                    query.sender_id,
                    UserState::AwaitingBroadcastMessage(BroadcastTarget::All),
                );
                self.show(panel, Panel::text(panels::broadcast_prompt("all groups")))
                    .await
            }
            CallbackAction::BroadcastSet(id) => {
                let Some(set) = self.ctx.store.broadcast_set(id).await else {
                    return Ok(CallbackOutcome::alert("❌ Broadcast set not found."));
                };
                sessions.set_state(
                    query.sender_id,
                    UserState::AwaitingBroadcastMessage(BroadcastTarget::Set(id)),
                );
                let target = format!("set \"{}\"", set.name);
                self.show(panel, Panel::text(panels::broadcast_prompt(&target)))
                    .await
            }
            CallbackAction::Groups(item) => self.show_groups_item(sessions, query, item).await,
            CallbackAction::ScanPage(page) => match sessions.scan(query.sender_id) {
                Some(dialogs) => {
                    self.show(panel, panels::scan_results_panel(dialogs, page))
                        .await
                }
                None => Ok(CallbackOutcome::alert(
                    "Scan results expired, please scan again.",
                )),
            },
            CallbackAction::SetAdd => {
                sessions.set_state(
                    query.sender_id,
                    UserState::AwaitingSetName {
                        panel_message_id: query.message_id,
                    },
                );
                let text = format!(
                    "📝 Send the name for the new set (use {}cancel to abort):",
                    self.ctx.settings.command_prefix
                );
                self.show(panel, Panel::text(text)).await
            }
            CallbackAction::SetView(id) => {
                let Some(set) = self.ctx.store.broadcast_set(id).await else {
                    return Ok(CallbackOutcome::alert("❌ Broadcast set not found."));
                };
                let draft = SetDraft {
                    set_id: id,
                    name: set.name,
                    selected: set.channels,
                    panel_message_id: query.message_id,
                };
                let channels = self.ctx.channel_details().await;
                let editor =
                    panels::set_editor_panel(id, &draft.name, &channels, &draft.selected);
                sessions.set_state(query.sender_id, UserState::SelectingGroupsForSet(draft));
                self.show(panel, editor).await
            }
            CallbackAction::SetToggle { set_id, channel } => {
                let Some(draft) = sessions.draft_mut(query.sender_id) else {
                    return Ok(CallbackOutcome::Silent);
                };
                draft.toggle(&channel);
                let channels = self.ctx.channel_details().await;
                let editor =
                    panels::set_editor_panel(set_id, &draft.name, &channels, &draft.selected);
                self.show(panel, editor).await
            }
            CallbackAction::SetSelectAll(set_id) => {
                self.select_channels(sessions, query, set_id, true).await
            }
            CallbackAction::SetSelectNone(set_id) => {
                self.select_channels(sessions, query, set_id, false).await
            }
            CallbackAction::SetSave(set_id) => self.save_set(sessions, query, set_id).await,
            CallbackAction::SetDeleteConfirm(set_id) => {
                let Some(set) = self.ctx.store.broadcast_set(set_id).await else {
                    return Ok(CallbackOutcome::alert("❌ Broadcast set not found."));
                };
                self.show(panel, panels::delete_confirmation_panel(set_id, &set.name))
                    .await
            }
            CallbackAction::SetDeleteExecute(set_id) => {
                let removed = self.ctx.store.delete_broadcast_set(set_id).await;
                let (status, message) = if removed {
                    (LogStatus::Success, format!("Deleted broadcast set {set_id}"))
                } else {
                    (LogStatus::Info, format!("Broadcast set {set_id} was already gone"))
                };
                self.ctx
                    .log("manage_set", status, message, &query.sender_name)
                    .await;
                sessions.reset(query.sender_id);

                let sets = self.ctx.store.broadcast_sets().await;
                self.show(panel, panels::set_management_panel(&sets)).await?;
                Ok(CallbackOutcome::alert("🗑️ Set deleted!"))
            }
        }
    }

    async fn show_back(&self, panel: MessageRef, target: BackTarget) -> Result<CallbackOutcome> {
        let rendered = match target {
            BackTarget::Main => {
                panels::main_panel(&self.ctx.stats().await, &self.ctx.settings.command_prefix)
            }
            BackTarget::Groups => panels::group_management_panel(),
            BackTarget::ManageSets => {
                panels::set_management_panel(&self.ctx.store.broadcast_sets().await)
            }
        };
        self.show(panel, rendered).await
    }

    async fn show_main_item(&self, panel: MessageRef, item: MainMenu) -> Result<CallbackOutcome> {
        match item {
            MainMenu::Broadcast => {
                let sets = self.ctx.store.broadcast_sets().await;
                self.show(panel, panels::broadcast_target_panel(&sets)).await
            }
            MainMenu::Groups => self.show(panel, panels::group_management_panel()).await,
            MainMenu::Logs => {
                let entries = self.ctx.store.recent_logs(LOG_PANEL_ENTRIES).await;
                self.show(panel, panels::logs_panel(&entries)).await
            }
            MainMenu::Schedule | MainMenu::Drafts => Ok(CallbackOutcome::alert(
                "This feature is not available yet.",
            )),
        }
    }

    async fn show_groups_item(
        &self,
        sessions: &mut SessionStore,
        query: &IncomingCallback,
        item: GroupsMenu,
    ) -> Result<CallbackOutcome> {
        let panel = MessageRef::new(query.chat_id, query.message_id);
        match item {
            GroupsMenu::ManageSets => {
                let sets = self.ctx.store.broadcast_sets().await;
                self.show(panel, panels::set_management_panel(&sets)).await
            }
            GroupsMenu::TestAll => {
                self.ctx
                    .gateway
                    .answer_callback(query.query_id, Some("Testing all target groups..."), false)
                    .await
                    .context("Failed to acknowledge group test")?;
                let channels = self.ctx.channel_details().await;
                let report = panels::channel_test_report(&channels);
                if let Err(e) = self.ctx.reply(query.chat_id, query.message_id, report).await {
                    // The query is already answered, so the failure goes to the chat.
                    error!("Failed to send group test report: {}", e);
                    let notice = format!("Error while handling: {}", e.kind());
                    if let Err(e) = self.ctx.reply(query.chat_id, query.message_id, notice).await {
                        warn!("Failed to report group test failure: {}", e);
                    }
                }
                Ok(CallbackOutcome::Answered)
            }
            GroupsMenu::ScanAll => {
                self.show(
                    panel,
                    Panel::text("📡 Scanning every group and channel on this account, please wait..."),
                )
                .await?;
                let dialogs = scan_all_dialogs(self.ctx.gateway.as_ref())
                    .await
                    .context("Failed to scan dialogs")?;
                self.ctx
                    .log(
                        "scan_groups",
                        LogStatus::Info,
                        format!("Scan finished, found {} groups/channels.", dialogs.len()),
                        &query.sender_name,
                    )
                    .await;

                let rendered = panels::scan_results_panel(&dialogs, 0);
                sessions.store_scan(query.sender_id, dialogs);
                self.show(panel, rendered).await
            }
        }
    }

    /// Selects every reachable configured channel, or none.
    async fn select_channels(
        &self,
        sessions: &mut SessionStore,
        query: &IncomingCallback,
        set_id: i64,
        all: bool,
    ) -> Result<CallbackOutcome> {
        let Some(draft) = sessions.draft_mut(query.sender_id) else {
            return Ok(CallbackOutcome::Silent);
        };
        let channels = self.ctx.channel_details().await;
        draft.selected = if all {
            channels
                .iter()
                .filter(|c| c.reachable)
                .map(|c| c.id.clone())
                .collect()
        } else {
            Vec::new()
        };

        let editor = panels::set_editor_panel(set_id, &draft.name, &channels, &draft.selected);
        self.show(MessageRef::new(query.chat_id, query.message_id), editor)
            .await
    }

    async fn save_set(
        &self,
        sessions: &mut SessionStore,
        query: &IncomingCallback,
        set_id: i64,
    ) -> Result<CallbackOutcome> {
        let UserState::SelectingGroupsForSet(draft) = sessions.state(query.sender_id).clone()
        else {
            return Ok(CallbackOutcome::Silent);
        };

        let id = (set_id != 0).then_some(set_id);
        let saved = self
            .ctx
            .store
            .save_broadcast_set(&draft.name, draft.selected.clone(), id)
            .await;
        sessions.reset(query.sender_id);

        let outcome = match saved {
            Some(saved_id) => {
                self.ctx
                    .log(
                        "manage_set",
                        LogStatus::Success,
                        format!(
                            "Saved broadcast set {saved_id} \"{}\" with {} groups",
                            draft.name,
                            draft.selected.len()
                        ),
                        &query.sender_name,
                    )
                    .await;
                CallbackOutcome::alert("💾 Set saved!")
            }
            None => {
                self.ctx
                    .log(
                        "manage_set",
                        LogStatus::Failure,
                        format!("Broadcast set {set_id} not found, nothing saved"),
                        &query.sender_name,
                    )
                    .await;
                CallbackOutcome::alert("❌ Broadcast set not found.")
            }
        };

        let sets = self.ctx.store.broadcast_sets().await;
        let panel = MessageRef::new(query.chat_id, query.message_id);
        self.show(panel, panels::set_management_panel(&sets)).await?;
        Ok(outcome)
    }

    async fn show(&self, message: MessageRef, panel: Panel) -> Result<CallbackOutcome> {
        self.ctx
            .edit(message, &panel)
            .await
            .context("Failed to update panel")?;
        Ok(CallbackOutcome::Silent)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::config::BotSettings;
    use crate::store::{ChatRef, DataStore};
    use crate::telegram::DialogKind;
    use crate::telegram::testing::FakeGateway;

    const CONTROL: i64 = -1_000_000_000_001;
    const ADMIN: i64 = 7;
    const PANEL_ID: i32 = 300;

    struct Harness {
        _dir: TempDir,
        gateway: Arc<FakeGateway>,
        ctx: Arc<BotContext<FakeGateway>>,
        handler: CallbackHandler<FakeGateway>,
        sessions: SessionStore,
    }

    fn harness(gateway: FakeGateway) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(DataStore::open(dir.path().join("data.json")));
        let settings = BotSettings::new(
            CONTROL,
            vec![ADMIN],
            vec![ChatRef::Id(-1001), ChatRef::Id(-1002), ChatRef::Id(-1003)],
        );
        let gateway = Arc::new(gateway);
        let ctx = Arc::new(BotContext::new(Arc::clone(&gateway), store, settings));
        Harness {
            _dir: dir,
            gateway,
            handler: CallbackHandler::new(Arc::clone(&ctx)),
            ctx,
            sessions: SessionStore::new(),
        }
    }

    fn targets() -> FakeGateway {
        FakeGateway::new()
            .with_chat(ChatRef::Id(-1001), -1001, "Alpha", 10)
            .with_chat(ChatRef::Id(-1002), -1002, "Beta", 20)
    }

    fn press(action: &CallbackAction) -> IncomingCallback {
        IncomingCallback {
            query_id: 555,
            chat_id: CONTROL,
            message_id: PANEL_ID,
            sender_id: ADMIN,
            sender_name: "alice".to_owned(),
            data: action.encode().into_bytes(),
        }
    }

    impl Harness {
        async fn press(&mut self, action: CallbackAction) -> CallbackOutcome {
            self.handler
                .handle(&mut self.sessions, &press(&action))
                .await
                .unwrap()
        }

        fn last_panel(&self) -> Panel {
            let (message, panel) = self.gateway.last_edit().unwrap();
            assert_eq!(message, MessageRef::new(CONTROL, PANEL_ID));
            panel
        }
    }

    #[tokio::test]
    async fn test_unknown_payload_is_logged() {
        let mut h = harness(FakeGateway::new());
        let mut query = press(&CallbackAction::SetAdd);
        query.data = b"weird:stuff".to_vec();

        let outcome = h.handler.handle(&mut h.sessions, &query).await.unwrap();

        assert_eq!(outcome, CallbackOutcome::Silent);
        assert!(h.gateway.edits().is_empty());
        assert_eq!(h.ctx.store.logs().await[0].status, LogStatus::Failure);
    }

    #[tokio::test]
    async fn test_navigation_renders_panels() {
        let mut h = harness(FakeGateway::new());

        h.press(CallbackAction::Main(MainMenu::Groups)).await;
        assert_eq!(h.last_panel(), panels::group_management_panel());

        h.press(CallbackAction::Groups(GroupsMenu::ManageSets)).await;
        assert_eq!(h.last_panel(), panels::set_management_panel(&[]));

        h.press(CallbackAction::Back(BackTarget::Main)).await;
        assert!(h.last_panel().text.contains("Broadcast Userbot"));
    }

    #[tokio::test]
    async fn test_repeated_render_is_not_an_error() {
        let mut h = harness(FakeGateway::new());
        h.press(CallbackAction::Main(MainMenu::Groups)).await;
        let outcome = h.press(CallbackAction::Back(BackTarget::Groups)).await;

        assert_eq!(outcome, CallbackOutcome::Silent);
        assert_eq!(h.gateway.edits().len(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_features_alert() {
        let mut h = harness(FakeGateway::new());
        let outcome = h.press(CallbackAction::Main(MainMenu::Schedule)).await;
        assert!(matches!(outcome, CallbackOutcome::Alert(text) if text.contains("not available")));
    }

    #[tokio::test]
    async fn test_logs_panel_lists_entries() {
        let mut h = harness(FakeGateway::new());
        h.ctx
            .store
            .add_log("broadcast", LogStatus::Success, "sent", "bob")
            .await;

        h.press(CallbackAction::Main(MainMenu::Logs)).await;
        let panel = h.last_panel();
        assert!(panel.text.contains("[SUCCESS] broadcast (bob): sent"));
    }

    #[tokio::test]
    async fn test_broadcast_target_selection() {
        let mut h = harness(FakeGateway::new());

        h.press(CallbackAction::BroadcastAll).await;
        assert_eq!(
            h.sessions.state(ADMIN),
            &UserState::AwaitingBroadcastMessage(BroadcastTarget::All)
        );

        let outcome = h.press(CallbackAction::BroadcastSet(9)).await;
        assert_eq!(outcome, CallbackOutcome::alert("❌ Broadcast set not found."));
        assert_eq!(
            h.sessions.state(ADMIN),
            &UserState::AwaitingBroadcastMessage(BroadcastTarget::All)
        );

        h.ctx.store.save_broadcast_set("VIP", vec![], None).await;
        h.press(CallbackAction::BroadcastSet(1)).await;
        assert_eq!(
            h.sessions.state(ADMIN),
            &UserState::AwaitingBroadcastMessage(BroadcastTarget::Set(1))
        );
        assert!(h.last_panel().text.contains("set \"VIP\""));
    }

    #[tokio::test]
    async fn test_test_all_answers_then_reports() {
        let mut h = harness(targets());

        let outcome = h.press(CallbackAction::Groups(GroupsMenu::TestAll)).await;

        assert_eq!(outcome, CallbackOutcome::Answered);
        assert_eq!(h.gateway.answers()[0].query_id, 555);
        let sent = h.gateway.sent();
        assert_eq!(sent[0].reply_to, Some(PANEL_ID));
        assert!(sent[0].panel.text.contains("• Alpha: 10 members"));
        assert!(sent[0].panel.text.contains("• Error (-1003): unreachable"));
    }

    #[tokio::test]
    async fn test_test_all_report_failure_goes_to_chat() {
        let mut h = harness(targets());
        h.gateway.fail_next_sends(1);

        let outcome = h.press(CallbackAction::Groups(GroupsMenu::TestAll)).await;

        assert_eq!(outcome, CallbackOutcome::Answered);
        assert_eq!(h.gateway.answers().len(), 1);
        let sent = h.gateway.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].chat_id, CONTROL);
        assert_eq!(sent[0].panel.text, "Error while handling: PeerUnavailable");
    }

    #[tokio::test]
    async fn test_scan_and_paging() {
        let mut gateway = FakeGateway::new().with_dialog(42, "Alice", DialogKind::User);
        for i in 0..12 {
            gateway = gateway.with_dialog(-1_000_000_000_100 - i, &format!("Chan {i}"), DialogKind::Channel);
        }
        let mut h = harness(gateway);

        let expired = h.press(CallbackAction::ScanPage(1)).await;
        assert!(matches!(expired, CallbackOutcome::Alert(_)));

        h.press(CallbackAction::Groups(GroupsMenu::ScanAll)).await;
        assert!(h.last_panel().text.contains("12 groups/channels, page 1/2"));
        let logs = h.ctx.store.logs().await;
        assert_eq!(logs[0].action, "scan_groups");
        assert_eq!(logs[0].status, LogStatus::Info);

        h.press(CallbackAction::BroadcastAll).await;
        h.press(CallbackAction::ScanPage(1)).await;
        let page = h.last_panel();
        assert!(page.text.contains("page 2/2"));
        assert!(page.text.contains("Chan 11"));
    }

    #[tokio::test]
    async fn test_create_set_flow() {
        let mut h = harness(targets());

        h.press(CallbackAction::SetAdd).await;
        assert_eq!(
            h.sessions.state(ADMIN),
            &UserState::AwaitingSetName {
                panel_message_id: PANEL_ID
            }
        );

        h.sessions.set_state(
            ADMIN,
            UserState::SelectingGroupsForSet(SetDraft {
                set_id: 0,
                name: "VIP".to_owned(),
                selected: vec![],
                panel_message_id: PANEL_ID,
            }),
        );

        h.press(CallbackAction::SetSelectAll(0)).await;
        assert_eq!(
            h.sessions.draft_mut(ADMIN).unwrap().selected,
            vec![ChatRef::Id(-1001), ChatRef::Id(-1002)],
            "unreachable channels are not selected"
        );

        h.press(CallbackAction::SetToggle {
            set_id: 0,
            channel: ChatRef::Id(-1001),
        })
        .await;
        assert!(h.last_panel().text.contains("Selected 1 / 3 groups."));

        h.press(CallbackAction::SetSelectNone(0)).await;
        h.press(CallbackAction::SetToggle {
            set_id: 0,
            channel: ChatRef::Id(-1002),
        })
        .await;

        let outcome = h.press(CallbackAction::SetSave(0)).await;
        assert_eq!(outcome, CallbackOutcome::alert("💾 Set saved!"));
        assert_eq!(h.sessions.state(ADMIN), &UserState::Idle);

        let sets = h.ctx.store.broadcast_sets().await;
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].id, 1);
        assert_eq!(sets[0].name, "VIP");
        assert_eq!(sets[0].channels, vec![ChatRef::Id(-1002)]);
        assert_eq!(h.last_panel(), panels::set_management_panel(&sets));
    }

    #[tokio::test]
    async fn test_edit_existing_set() {
        let mut h = harness(targets());
        h.ctx
            .store
            .save_broadcast_set("News", vec![ChatRef::Id(-1001)], None)
            .await;

        h.press(CallbackAction::SetView(1)).await;
        assert!(h.last_panel().text.contains("**News**"));

        h.press(CallbackAction::SetToggle {
            set_id: 1,
            channel: ChatRef::Id(-1002),
        })
        .await;
        h.press(CallbackAction::SetSave(1)).await;

        let set = h.ctx.store.broadcast_set(1).await.unwrap();
        assert_eq!(set.channels, vec![ChatRef::Id(-1001), ChatRef::Id(-1002)]);
    }

    #[tokio::test]
    async fn test_toggle_without_editor_is_ignored() {
        let mut h = harness(targets());
        let outcome = h
            .press(CallbackAction::SetToggle {
                set_id: 0,
                channel: ChatRef::Id(-1001),
            })
            .await;

        assert_eq!(outcome, CallbackOutcome::Silent);
        assert!(h.gateway.edits().is_empty());
    }

    #[tokio::test]
    async fn test_delete_flow() {
        let mut h = harness(targets());
        h.ctx.store.save_broadcast_set("Old", vec![], None).await;

        h.press(CallbackAction::SetDeleteConfirm(1)).await;
        assert!(h.last_panel().text.contains("Delete the set \"Old\"?"));

        let outcome = h.press(CallbackAction::SetDeleteExecute(1)).await;
        assert_eq!(outcome, CallbackOutcome::alert("🗑️ Set deleted!"));
        assert!(h.ctx.store.broadcast_sets().await.is_empty());
        assert_eq!(h.last_panel(), panels::set_management_panel(&[]));

        let missing = h.press(CallbackAction::SetDeleteConfirm(1)).await;
        assert_eq!(missing, CallbackOutcome::alert("❌ Broadcast set not found."));
    }
}
