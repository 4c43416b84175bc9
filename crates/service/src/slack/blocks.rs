//! The subset of Slack Block Kit this service posts.

use serde::Serialize;

/// Slack rejects header text over 150 characters.
pub const HEADER_MAX_CHARS: usize = 150;
/// Slack rejects section text over 3000 characters.
pub const SECTION_MAX_CHARS: usize = 3000;

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Text {
    PlainText { text: String },
    Mrkdwn { text: String },
}

impl Text {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::PlainText { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Text::PlainText { text } | Text::Mrkdwn { text } => text,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header { text: Text },
    Section { text: Text },
}

impl Block {
    pub fn header(text: &str) -> Self {
        Block::Header { text: Text::plain(truncate(text, HEADER_MAX_CHARS)) }
    }

    pub fn section(text: &str) -> Self {
        Block::Section { text: Text::mrkdwn(truncate(text, SECTION_MAX_CHARS)) }
    }

    pub fn text(&self) -> &str {
        match self {
            Block::Header { text } | Block::Section { text } => text.as_str(),
        }
    }
}

/// Message body for `chat.postMessage`. `text` is the notification fallback.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SlackMessage {
    pub text: String,
    pub blocks: Vec<Block>,
}

impl SlackMessage {
    pub fn new(text: impl Into<String>, blocks: Vec<Block>) -> Self {
        Self { text: text.into(), blocks }
    }
}

/// A Slack member id such as `U024BE7LH`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlackUserId(pub String);

impl SlackUserId {
    pub fn mention(&self) -> String {
        format!("<@{}>", self.0)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => {
            let mut cut: String = text[..idx].chars().take(max_chars.saturating_sub(1)).collect();
            cut.push('…');
            cut
        }
        None => text.to_string(),
    }
}
