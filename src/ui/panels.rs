//! Panel rendering.
//!
//! Every function here is a pure mapping from a state snapshot to the text
//! and inline keyboard shown to the operator.

use crate::info::{ChannelDetail, DialogInfo, SystemStats};
use crate::store::{BroadcastSet, ChatRef, LogEntry};

use super::callback::{BackTarget, CallbackAction, GroupsMenu, MainMenu};

/// Telegram's maximum message length, in characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Dialogs shown per page of scan results.
pub const SCAN_PAGE_SIZE: usize = 10;

/// Toggle buttons per row in the set editor.
const EDITOR_COLUMNS: usize = 2;

/// Longest channel title shown on an editor button.
const EDITOR_TITLE_CHARS: usize = 20;

/// An inline button bound to a typed action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub action: CallbackAction,
}

impl Button {
    #[must_use]
    pub fn new(label: impl Into<String>, action: CallbackAction) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }

    fn back(target: BackTarget) -> Self {
        Self::new("🔙 Back", CallbackAction::Back(target))
    }
}

/// Markdown text plus an optional inline keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Panel {
    pub text: String,
    pub keyboard: Vec<Vec<Button>>,
}

impl Panel {
    /// A panel without buttons.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_keyboard(text: impl Into<String>, keyboard: Vec<Vec<Button>>) -> Self {
        Self {
            text: text.into(),
            keyboard,
        }
    }

    /// Iterates over every button, row by row.
    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.keyboard.iter().flatten()
    }
}

pub fn main_panel(stats: &SystemStats, command_prefix: &str) -> Panel {
    let text = format!(
        "🤖 **Broadcast Userbot**\n\n\
         📊 **System info:**\n\
         - Broadcast sets: {}\n\
         - Target groups: {}\n\
         - Log entries (24h): {}\n\n\
         💡 Send `{command_prefix}start` to refresh this panel.",
        stats.set_count, stats.total_target_count, stats.logs_last_24h
    );

    Panel::with_keyboard(
        text,
        vec![
            vec![Button::new("🚀 Broadcast now", CallbackAction::Main(MainMenu::Broadcast))],
            vec![
                Button::new("⏰ Schedules", CallbackAction::Main(MainMenu::Schedule)),
                Button::new("📝 Drafts", CallbackAction::Main(MainMenu::Drafts)),
            ],
            vec![
                Button::new("👥 Groups", CallbackAction::Main(MainMenu::Groups)),
                Button::new("📊 Logs", CallbackAction::Main(MainMenu::Logs)),
            ],
        ],
    )
}

pub fn broadcast_target_panel(sets: &[BroadcastSet]) -> Panel {
    let mut keyboard = vec![vec![Button::new("📢 All groups", CallbackAction::BroadcastAll)]];
    keyboard.extend(sets.iter().map(|set| {
        vec![Button::new(
            format!("🎯 {} ({})", set.name, set.channels.len()),
            CallbackAction::BroadcastSet(set.id),
        )]
    }));
    keyboard.push(vec![Button::back(BackTarget::Main)]);

    Panel::with_keyboard("Choose the target for this broadcast:", keyboard)
}

pub fn group_management_panel() -> Panel {
    Panel::with_keyboard(
        "Manage your broadcast sets or test the configured groups.",
        vec![
            vec![Button::new("🎯 Broadcast sets", CallbackAction::Groups(GroupsMenu::ManageSets))],
            vec![Button::new("🔗 Test group access", CallbackAction::Groups(GroupsMenu::TestAll))],
            vec![Button::new("📡 Scan my dialogs", CallbackAction::Groups(GroupsMenu::ScanAll))],
            vec![Button::back(BackTarget::Main)],
        ],
    )
}

pub fn set_management_panel(sets: &[BroadcastSet]) -> Panel {
    let mut keyboard: Vec<Vec<Button>> = sets
        .iter()
        .map(|set| {
            vec![Button::new(
                format!("⚙️ {} ({})", set.name, set.channels.len()),
                CallbackAction::SetView(set.id),
            )]
        })
        .collect();
    keyboard.push(vec![Button::new("➕ New set", CallbackAction::SetAdd)]);
    keyboard.push(vec![Button::back(BackTarget::Groups)]);

    Panel::with_keyboard("Manage your broadcast sets.\nTap a set to edit it.", keyboard)
}

pub fn set_editor_panel(
    set_id: i64,
    set_name: &str,
    channels: &[ChannelDetail],
    selected: &[ChatRef],
) -> Panel {
    let text = format!(
        "Editing set: **{set_name}**\nSelected {} / {} groups.",
        selected.len(),
        channels.len()
    );

    let toggles: Vec<Button> = channels
        .iter()
        .map(|channel| {
            let mark = if selected.contains(&channel.id) { "✅" } else { "⬜️" };
            let title: String = channel.title.chars().take(EDITOR_TITLE_CHARS).collect();
            Button::new(
                format!("{mark} {title}"),
                CallbackAction::SetToggle {
                    set_id,
                    channel: channel.id.clone(),
                },
            )
        })
        .collect();

    let mut keyboard: Vec<Vec<Button>> = toggles
        .chunks(EDITOR_COLUMNS)
        .map(<[Button]>::to_vec)
        .collect();
    keyboard.push(vec![
        Button::new("✅ Select all", CallbackAction::SetSelectAll(set_id)),
        Button::new("⬜️ Clear", CallbackAction::SetSelectNone(set_id)),
    ]);
    keyboard.push(vec![Button::new(
        format!("💾 Save set ({})", selected.len()),
        CallbackAction::SetSave(set_id),
    )]);
    if set_id != 0 {
        keyboard.push(vec![Button::new(
            "🗑️ Delete this set",
            CallbackAction::SetDeleteConfirm(set_id),
        )]);
    }
    keyboard.push(vec![Button::back(BackTarget::ManageSets)]);

    Panel::with_keyboard(text, keyboard)
}

pub fn delete_confirmation_panel(set_id: i64, set_name: &str) -> Panel {
    Panel::with_keyboard(
        format!("⚠️ **Delete the set \"{set_name}\"?\nThis cannot be undone.**"),
        vec![
            vec![Button::new("❗️ Confirm delete", CallbackAction::SetDeleteExecute(set_id))],
            vec![Button::new("🔙 Back", CallbackAction::SetView(set_id))],
        ],
    )
}

/// Number of scan result pages (at least one).
#[must_use]
pub fn scan_page_count(dialogs: &[DialogInfo]) -> usize {
    dialogs.len().div_ceil(SCAN_PAGE_SIZE).max(1)
}

/// One page of dialog scan results. Out-of-range pages show the last page.
pub fn scan_results_panel(dialogs: &[DialogInfo], page: usize) -> Panel {
    let pages = scan_page_count(dialogs);
    let page = page.min(pages - 1);

    let mut text = format!(
        "📡 **Scan results** ({} groups/channels, page {}/{})\n\n",
        dialogs.len(),
        page + 1,
        pages
    );
    if dialogs.is_empty() {
        text.push_str("No supergroups or channels found on this account.");
    } else {
        let lines: Vec<String> = dialogs
            .iter()
            .skip(page * SCAN_PAGE_SIZE)
            .take(SCAN_PAGE_SIZE)
            .map(dialog_line)
            .collect();
        text.push_str(&lines.join("\n"));
    }

    let mut nav = Vec::new();
    if page > 0 {
        nav.push(Button::new("◀️ Prev", CallbackAction::ScanPage(page - 1)));
    }
    if page + 1 < pages {
        nav.push(Button::new("Next ▶️", CallbackAction::ScanPage(page + 1)));
    }

    let mut keyboard = Vec::new();
    if !nav.is_empty() {
        keyboard.push(nav);
    }
    keyboard.push(vec![Button::back(BackTarget::Groups)]);

    Panel::with_keyboard(text, keyboard)
}

pub fn logs_panel(entries: &[LogEntry]) -> Panel {
    let mut text = String::from("📊 **Recent activity**\n\n");
    if entries.is_empty() {
        text.push_str("No log entries yet.");
    } else {
        let lines: Vec<String> = entries
            .iter()
            .map(|entry| {
                format!(
                    "`{}` [{}] {} ({}): {}",
                    entry.time.format("%m-%d %H:%M"),
                    entry.status,
                    entry.action,
                    entry.user,
                    truncate(&entry.message, 60)
                )
            })
            .collect();
        text.push_str(&lines.join("\n"));
    }

    Panel::with_keyboard(
        truncate_message(&text),
        vec![vec![Button::back(BackTarget::Main)]],
    )
}

/// Result text for the "test group access" action.
#[must_use]
pub fn channel_test_report(channels: &[ChannelDetail]) -> String {
    let lines: Vec<String> = channels
        .iter()
        .map(|channel| {
            let members = match (channel.reachable, channel.member_count) {
                (false, _) => "unreachable".to_owned(),
                (true, Some(count)) => format!("{count} members"),
                (true, None) => "N/A".to_owned(),
            };
            format!("• {}: {members}", channel.title)
        })
        .collect();

    truncate_message(&format!(
        "👥 **Group access test ({}):**\n\n{}",
        channels.len(),
        lines.join("\n")
    ))
}

/// Dialog report posted to the control chat at startup.
#[must_use]
pub fn dialog_report(dialogs: &[DialogInfo]) -> String {
    let mut text = String::from("📡 **Startup group scan**\n\n");
    if dialogs.is_empty() {
        text.push_str("No supergroups or channels found on this account.");
    } else {
        let lines: Vec<String> = dialogs.iter().map(dialog_line).collect();
        text.push_str(&lines.join("\n"));
    }
    truncate_message(&text)
}

#[must_use]
pub fn startup_notice(command_prefix: &str) -> String {
    format!(
        "✅ **Broadcast userbot started!**\nSend `{command_prefix}start` to open the main menu."
    )
}

#[must_use]
pub fn broadcast_prompt(target_name: &str) -> String {
    format!("✅ **Target: {target_name}**\n\nSend or reply to the message you want to broadcast.")
}

#[must_use]
pub fn broadcast_started(target_name: &str, count: usize) -> String {
    format!("🚀 **Broadcast started...**\nTarget: {target_name} ({count})")
}

#[must_use]
pub fn broadcast_finished(target_name: &str, success: usize, failed: usize) -> String {
    format!(
        "✅ **Broadcast finished!**\n\n- **Target**: {target_name}\n- **Succeeded**: {success}\n- **Failed**: {failed}"
    )
}

fn dialog_line(dialog: &DialogInfo) -> String {
    format!("• **{}**\n  `{}` ({})", dialog.title, dialog.id, dialog.kind.label())
}

/// Cuts text to Telegram's message limit, noting the truncation.
#[must_use]
pub fn truncate_message(text: &str) -> String {
    const NOTE: &str = "\n...report truncated";
    if text.chars().count() <= MAX_MESSAGE_CHARS {
        return text.to_owned();
    }
    let keep = MAX_MESSAGE_CHARS - NOTE.chars().count();
    let mut cut: String = text.chars().take(keep).collect();
    cut.push_str(NOTE);
    cut
}

/// Truncates a string to a maximum length, adding "..." if truncated.
#[must_use]
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_owned()
    } else {
        format!("{}...", s.chars().take(max_len).collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::info::DialogKind;
    use crate::store::LogStatus;

    fn channel(id: i64, title: &str) -> ChannelDetail {
        ChannelDetail {
            id: ChatRef::Id(id),
            title: title.to_owned(),
            member_count: Some(10),
            reachable: true,
        }
    }

    fn dialogs(n: usize) -> Vec<DialogInfo> {
        (0..n)
            .map(|i| DialogInfo {
                id: -1_000_000_000_000 - i as i64,
                title: format!("Group {i}"),
                kind: DialogKind::Supergroup,
            })
            .collect()
    }

    fn sets() -> Vec<BroadcastSet> {
        vec![
            BroadcastSet {
                id: 1,
                name: "VIP".to_owned(),
                channels: vec![ChatRef::Id(-100)],
            },
            BroadcastSet {
                id: 7,
                name: "News".to_owned(),
                channels: vec![],
            },
        ]
    }

    fn all_panels() -> Vec<Panel> {
        let stats = SystemStats {
            set_count: 2,
            total_target_count: 3,
            logs_last_24h: 4,
        };
        let channels = vec![channel(-1001, "Alpha"), channel(-1002, "Beta"), channel(-1003, "Gamma")];
        let entry = LogEntry {
            time: NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            action: "broadcast".to_owned(),
            status: LogStatus::Success,
            message: "done".to_owned(),
            user: "alice".to_owned(),
        };

        vec![
            main_panel(&stats, "."),
            broadcast_target_panel(&sets()),
            group_management_panel(),
            set_management_panel(&sets()),
            set_editor_panel(0, "New", &channels, &[ChatRef::Id(-1002)]),
            set_editor_panel(7, "News", &channels, &[]),
            delete_confirmation_panel(7, "News"),
            scan_results_panel(&dialogs(25), 1),
            logs_panel(&[entry]),
        ]
    }

    #[test]
    fn test_every_button_payload_parses_back() {
        for panel in all_panels() {
            for button in panel.buttons() {
                let payload = button.action.encode();
                assert!(payload.len() <= 64, "payload too long: {payload}");
                assert_eq!(
                    CallbackAction::parse(&payload),
                    Ok(button.action.clone()),
                    "payload {payload} did not round-trip"
                );
            }
        }
    }

    #[test]
    fn test_main_panel_shows_stats() {
        let stats = SystemStats {
            set_count: 2,
            total_target_count: 5,
            logs_last_24h: 9,
        };
        let panel = main_panel(&stats, ".");
        assert!(panel.text.contains("Broadcast sets: 2"));
        assert!(panel.text.contains("Target groups: 5"));
        assert!(panel.text.contains("Log entries (24h): 9"));
        assert!(panel.text.contains("`.start`"));
    }

    #[test]
    fn test_target_panel_lists_sets() {
        let panel = broadcast_target_panel(&sets());
        assert_eq!(panel.keyboard.len(), 4);
        assert_eq!(panel.keyboard[1][0].label, "🎯 VIP (1)");
        assert_eq!(panel.keyboard[2][0].action, CallbackAction::BroadcastSet(7));
    }

    #[test]
    fn test_editor_layout() {
        let channels = vec![channel(-1001, "Alpha"), channel(-1002, "Beta"), channel(-1003, "Gamma")];
        let panel = set_editor_panel(0, "New", &channels, &[ChatRef::Id(-1002)]);

        assert!(panel.text.contains("Selected 1 / 3 groups."));
        assert_eq!(panel.keyboard[0].len(), 2);
        assert_eq!(panel.keyboard[1].len(), 1);
        assert_eq!(panel.keyboard[0][0].label, "⬜️ Alpha");
        assert_eq!(panel.keyboard[0][1].label, "✅ Beta");
        assert!(
            !panel
                .buttons()
                .any(|b| matches!(b.action, CallbackAction::SetDeleteConfirm(_))),
            "unsaved sets have no delete button"
        );

        let saved = set_editor_panel(7, "News", &channels, &[]);
        assert!(
            saved
                .buttons()
                .any(|b| b.action == CallbackAction::SetDeleteConfirm(7))
        );
    }

    #[test]
    fn test_editor_cuts_long_titles() {
        let channels = vec![channel(-1, "Abcdefghijklmnopqrstuvwxyz")];
        let panel = set_editor_panel(0, "x", &channels, &[]);
        assert_eq!(panel.keyboard[0][0].label, "⬜️ Abcdefghijklmnopqrst");
    }

    #[test]
    fn test_scan_pagination() {
        let all = dialogs(25);
        assert_eq!(scan_page_count(&all), 3);
        assert_eq!(scan_page_count(&[]), 1);

        let first = scan_results_panel(&all, 0);
        assert!(first.text.contains("Group 0"));
        assert!(!first.text.contains("Group 10"));
        assert_eq!(first.keyboard[0], vec![Button::new("Next ▶️", CallbackAction::ScanPage(1))]);

        let last = scan_results_panel(&all, 99);
        assert!(last.text.contains("page 3/3"));
        assert!(last.text.contains("Group 24"));
        assert_eq!(last.keyboard[0], vec![Button::new("◀️ Prev", CallbackAction::ScanPage(1))]);
    }

    #[test]
    fn test_dialog_report_is_truncated() {
        let report = dialog_report(&dialogs(500));
        assert_eq!(report.chars().count(), MAX_MESSAGE_CHARS);
        assert!(report.ends_with("...report truncated"));
    }

    #[test]
    fn test_channel_test_report() {
        let mut broken = channel(-3, "Error (-3)");
        broken.reachable = false;
        broken.member_count = None;
        let report = channel_test_report(&[channel(-1, "Alpha"), broken]);

        assert!(report.contains("(2)"));
        assert!(report.contains("• Alpha: 10 members"));
        assert!(report.contains("• Error (-3): unreachable"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Hello", 10), "Hello");
        assert_eq!(truncate("Hello, World!", 5), "Hello...");
    }
}
