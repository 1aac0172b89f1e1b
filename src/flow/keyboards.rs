//! Inline keyboards rendered by the flow engine.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use url::Url;

use super::callback::{CallbackAction, ListAction};
use crate::database::models::{TransmissionList, TransmissionListChannel};

fn button(text: impl Into<String>, action: CallbackAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text, action.data())
}

fn command(text: &str, command: &str) -> InlineKeyboardButton {
    button(text, CallbackAction::Command(command.to_string()))
}

/// Button opening the admin channel invite, if the link is a valid URL.
fn join_button(invite_link: &str) -> Option<InlineKeyboardButton> {
    Url::parse(invite_link)
        .ok()
        .map(|url| InlineKeyboardButton::url("📢 Join the channel", url))
}

pub fn start(invite_link: &str) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    if let Some(join) = join_button(invite_link) {
        rows.push(vec![join]);
    }
    rows.push(vec![command("📝 New list", "/newlist")]);
    rows.push(vec![command("⚙️ Commands", "/commands")]);
    InlineKeyboardMarkup::new(rows)
}

/// Shown with the subscription denial.
pub fn join(invite_link: &str) -> Option<InlineKeyboardMarkup> {
    join_button(invite_link).map(|b| InlineKeyboardMarkup::new(vec![vec![b]]))
}

pub fn cancel() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![command("❌ Cancel", "/cancel")]])
}

pub fn done() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        command("✅ Done", "/done"),
        command("❌ Cancel", "/cancel"),
    ]])
}

pub fn new_list() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![command("📝 New list", "/newlist")]])
}

pub fn new_list_and_commands() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![command("📝 New list", "/newlist")],
        vec![command("⚙️ Commands", "/commands")],
    ])
}

pub fn confirm_send(message_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        button("✅ Confirm", CallbackAction::ConfirmSend(message_id)),
        button("❌ Cancel", CallbackAction::CancelSend(message_id)),
    ]])
}

/// One `select_list` button per list, then a cancel button.
pub fn select_list(lists: &[TransmissionList]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = lists
        .iter()
        .map(|list| vec![button(list.name.clone(), CallbackAction::SelectList(list.id))])
        .collect();
    rows.push(vec![command("❌ Cancel", "/cancel")]);
    InlineKeyboardMarkup::new(rows)
}

pub fn lists_overview(lists: &[TransmissionList]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = lists
        .iter()
        .map(|list| vec![button(list.name.clone(), CallbackAction::ViewList(list.id))])
        .collect();
    rows.push(vec![command("📝 New list", "/newlist")]);
    rows.push(vec![button("✖️ Close", CallbackAction::CloseKeyboard)]);
    InlineKeyboardMarkup::new(rows)
}

/// Channel rows (tap to remove), list actions, navigation.
pub fn list_view(list_id: i64, channels: &[TransmissionListChannel]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = channels
        .iter()
        .map(|channel| {
            vec![button(
                format!("🗑 {}", channel.display_name()),
                CallbackAction::DeleteChannel(channel.id),
            )]
        })
        .collect();

    rows.push(vec![
        button("➕ Add channels", CallbackAction::List(ListAction::Add, list_id)),
        button("✉️ Send", CallbackAction::List(ListAction::Send, list_id)),
    ]);
    rows.push(vec![
        button("✏️ Rename", CallbackAction::List(ListAction::Rename, list_id)),
        button("🗑 Delete list", CallbackAction::List(ListAction::Delete, list_id)),
    ]);
    rows.push(vec![
        command("🔙 Back", "/lists"),
        button("✖️ Close", CallbackAction::CloseKeyboard),
    ]);
    InlineKeyboardMarkup::new(rows)
}

#[cfg(test)]
mod tests {
    use teloxide::types::InlineKeyboardButtonKind;

    use super::*;

    fn callback_data(markup: &InlineKeyboardMarkup) -> Vec<String> {
        markup
            .inline_keyboard
            .iter()
            .flatten()
            .filter_map(|b| match &b.kind {
                InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_start_without_valid_link_has_no_url_button() {
        assert_eq!(start("").inline_keyboard.len(), 2);
        assert_eq!(start("https://t.me/+abc").inline_keyboard.len(), 3);
        assert!(join("not a link").is_none());
    }

    #[test]
    fn test_select_list_ends_with_cancel() {
        let lists = vec![TransmissionList::new(1, 7, "A"), TransmissionList::new(2, 7, "B")];
        assert_eq!(
            callback_data(&select_list(&lists)),
            vec!["select_list:1", "select_list:2", "/cancel"]
        );
    }

    #[test]
    fn test_confirm_send_buttons() {
        assert_eq!(callback_data(&confirm_send(9)), vec!["confirm_send:9", "cancel_send:9"]);
    }
}
