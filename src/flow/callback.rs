//! Callback data carried by inline buttons.
//!
//! Every button the bot renders encodes one of these actions. Data starting
//! with `/` is a command and goes through the same path as typed commands.

/// Action on an existing list, from the list view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListAction {
    Add,
    Send,
    Rename,
    Delete,
}

impl ListAction {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Send => "send",
            Self::Rename => "rename",
            Self::Delete => "delete",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "add" => Some(Self::Add),
            "send" => Some(Self::Send),
            "rename" => Some(Self::Rename),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    /// `/newlist`, `/cancel`, ... pressed as a button.
    Command(String),
    SelectList(i64),
    ConfirmSend(i64),
    CancelSend(i64),
    ViewList(i64),
    List(ListAction, i64),
    DeleteChannel(i64),
    CloseKeyboard,
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        if data.starts_with('/') {
            return Some(Self::Command(data.to_string()));
        }
        if data == "close_keyboard" {
            return Some(Self::CloseKeyboard);
        }

        let (prefix, rest) = data.split_once(':')?;
        match prefix {
            "select_list" => rest.parse().ok().map(Self::SelectList),
            "confirm_send" => rest.parse().ok().map(Self::ConfirmSend),
            "cancel_send" => rest.parse().ok().map(Self::CancelSend),
            "list_view" => rest.parse().ok().map(Self::ViewList),
            "list_action" => {
                let (action, id) = rest.split_once(':')?;
                Some(Self::List(ListAction::parse(action)?, id.parse().ok()?))
            }
            "channel_action" => match rest.split_once(':')? {
                ("delete", id) => id.parse().ok().map(Self::DeleteChannel),
                _ => None,
            },
            _ => None,
        }
    }

    /// Encode as callback data. Always within Telegram's 64-byte limit.
    pub fn data(&self) -> String {
        match self {
            Self::Command(command) => command.clone(),
            Self::SelectList(id) => format!("select_list:{id}"),
            Self::ConfirmSend(id) => format!("confirm_send:{id}"),
            Self::CancelSend(id) => format!("cancel_send:{id}"),
            Self::ViewList(id) => format!("list_view:{id}"),
            Self::List(action, id) => format!("list_action:{}:{id}", action.as_str()),
            Self::DeleteChannel(id) => format!("channel_action:delete:{id}"),
            Self::CloseKeyboard => "close_keyboard".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_actions() {
        assert_eq!(CallbackAction::parse("select_list:12"), Some(CallbackAction::SelectList(12)));
        assert_eq!(CallbackAction::parse("confirm_send:3"), Some(CallbackAction::ConfirmSend(3)));
        assert_eq!(CallbackAction::parse("cancel_send:3"), Some(CallbackAction::CancelSend(3)));
        assert_eq!(CallbackAction::parse("list_view:8"), Some(CallbackAction::ViewList(8)));
        assert_eq!(
            CallbackAction::parse("list_action:rename:8"),
            Some(CallbackAction::List(ListAction::Rename, 8))
        );
        assert_eq!(
            CallbackAction::parse("channel_action:delete:41"),
            Some(CallbackAction::DeleteChannel(41))
        );
        assert_eq!(CallbackAction::parse("close_keyboard"), Some(CallbackAction::CloseKeyboard));
        assert_eq!(
            CallbackAction::parse("/newList"),
            Some(CallbackAction::Command("/newList".to_string()))
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(CallbackAction::parse("select_list:abc"), None);
        assert_eq!(CallbackAction::parse("list_action:archive:1"), None);
        assert_eq!(CallbackAction::parse("channel_action:rename:1"), None);
        assert_eq!(CallbackAction::parse("help:back"), None);
        assert_eq!(CallbackAction::parse(""), None);
    }

    #[test]
    fn test_data_is_parseable() {
        let action = CallbackAction::List(ListAction::Delete, 1_000_000);
        assert_eq!(action.data(), "list_action:delete:1000000");
        assert_eq!(CallbackAction::parse(&action.data()), Some(action));
    }
}
