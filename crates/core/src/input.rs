//! Run input — plain text or a structured item list.
//!
//! The runner clones the input before use, so mutations the caller makes to
//! its own copy after `run` starts never reach the captured history.

use crate::item::ConversationItem;
use serde::{Deserialize, Serialize};

/// The input to an agent run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Input {
    /// A simple text input, treated as a single user message.
    Text(String),

    /// An ordered list of structured conversation items.
    Items(Vec<ConversationItem>),
}

impl Input {
    /// Convert this input into conversation items, per variant.
    pub fn to_items(&self) -> Vec<ConversationItem> {
        match self {
            Input::Text(text) => vec![ConversationItem::user(text.clone())],
            Input::Items(items) => items.clone(),
        }
    }

    /// Flatten the input to plain text, joining message contents.
    ///
    /// Used as the relevance signal for tool routing.
    pub fn text(&self) -> String {
        match self {
            Input::Text(text) => text.clone(),
            Input::Items(items) => {
                let parts: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.message_content())
                    .collect();
                parts.join(" ")
            }
        }
    }
}

impl From<&str> for Input {
    fn from(s: &str) -> Self {
        Input::Text(s.to_string())
    }
}

impl From<String> for Input {
    fn from(s: String) -> Self {
        Input::Text(s)
    }
}

impl From<Vec<ConversationItem>> for Input {
    fn from(items: Vec<ConversationItem>) -> Self {
        Input::Items(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Role;

    #[test]
    fn text_input_becomes_user_message() {
        let input = Input::from("Hello, world!");
        let items = input.to_items();
        assert_eq!(items.len(), 1);
        assert!(matches!(
            &items[0],
            ConversationItem::Message {
                role: Role::User,
                content
            } if content == "Hello, world!"
        ));
    }

    #[test]
    fn items_input_passes_through() {
        let input = Input::from(vec![
            ConversationItem::user("message 1"),
            ConversationItem::assistant("message 2"),
        ]);
        assert_eq!(input.to_items().len(), 2);
    }

    #[test]
    fn clone_isolates_caller_mutations() {
        let mut original = vec![ConversationItem::user("before")];
        let input = Input::from(original.clone());
        let captured = input.clone();

        original.push(ConversationItem::user("after"));
        original[0] = ConversationItem::user("mutated");

        assert_eq!(captured.to_items().len(), 1);
        assert_eq!(captured.to_items()[0].message_content(), Some("before"));
    }

    #[test]
    fn text_flattens_message_contents() {
        let input = Input::from(vec![
            ConversationItem::user("check the weather"),
            ConversationItem::tool_result("call_1", "ignored"),
            ConversationItem::assistant("in Tokyo"),
        ]);
        assert_eq!(input.text(), "check the weather in Tokyo");
    }
}
