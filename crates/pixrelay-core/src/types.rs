// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the bot workflows.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Stable external identity of a chat user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a discussion thread inside the staff group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TopicId(pub i32);

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Location of a message the transport already holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i32,
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum AdapterType {
    Messenger,
    Storage,
    Generator,
}

// --- Persistence types ---

/// Durable per-user record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub user_id: UserId,
    /// Completed generations; never decreases.
    pub usage_count: u64,
    pub topic_id: Option<TopicId>,
}

impl UserRecord {
    /// A freshly created record with no usage and no topic.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            usage_count: 0,
            topic_id: None,
        }
    }
}

/// How a stored topic reference should change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicChange {
    Set(TopicId),
    Clear,
}

/// Partial update of a [`UserRecord`]. `None` fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserUpdate {
    pub usage_count: Option<u64>,
    pub topic: Option<TopicChange>,
}

impl UserUpdate {
    pub fn set_topic(topic: TopicId) -> Self {
        Self {
            usage_count: None,
            topic: Some(TopicChange::Set(topic)),
        }
    }

    pub fn clear_topic() -> Self {
        Self {
            usage_count: None,
            topic: Some(TopicChange::Clear),
        }
    }

    pub fn usage(count: u64) -> Self {
        Self {
            usage_count: Some(count),
            topic: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.usage_count.is_none() && self.topic.is_none()
    }
}

// --- Messaging types ---

/// Identity of the user behind an inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: UserId,
    pub full_name: String,
}

impl UserProfile {
    /// Name used for thread titles: the full name, or the id when blank.
    pub fn display_name(&self) -> String {
        let name = self.full_name.trim();
        if name.is_empty() {
            self.id.to_string()
        } else {
            name.to_string()
        }
    }
}

/// Where an outbound message goes: a chat, optionally a thread inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatTarget {
    pub chat_id: i64,
    pub thread: Option<TopicId>,
}

impl ChatTarget {
    pub fn chat(chat_id: i64) -> Self {
        Self {
            chat_id,
            thread: None,
        }
    }

    pub fn user(user: UserId) -> Self {
        Self::chat(user.0)
    }

    pub fn topic(group_chat_id: i64, topic: TopicId) -> Self {
        Self {
            chat_id: group_chat_id,
            thread: Some(topic),
        }
    }
}

/// What pressing an inline button does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    Url(String),
    Callback(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub text: String,
    pub action: ButtonAction,
}

impl Button {
    pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: ButtonAction::Url(url.into()),
        }
    }

    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: ButtonAction::Callback(data.into()),
        }
    }
}

/// Inline keyboard attached to a message, row by row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn new(rows: Vec<Vec<Button>>) -> Self {
        Self { rows }
    }

    /// A keyboard with one button per row.
    pub fn column(buttons: Vec<Button>) -> Self {
        Self {
            rows: buttons.into_iter().map(|b| vec![b]).collect(),
        }
    }

    pub fn single(button: Button) -> Self {
        Self {
            rows: vec![vec![button]],
        }
    }

    /// Iterates over all callback payloads in the keyboard.
    pub fn callback_data(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().flatten().filter_map(|b| match &b.action {
            ButtonAction::Callback(data) => Some(data.as_str()),
            ButtonAction::Url(_) => None,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParseMode {
    #[default]
    Plain,
    Html,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoSource {
    Url(String),
    /// A file already stored by the transport (e.g. a profile photo).
    FileId(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    Photo {
        source: PhotoSource,
        caption: Option<String>,
    },
}

/// Message body plus presentation, independent of the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub content: Content,
    pub keyboard: Option<Keyboard>,
    pub parse_mode: ParseMode,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: Content::Text(text.into()),
            keyboard: None,
            parse_mode: ParseMode::Plain,
        }
    }

    pub fn photo(source: PhotoSource, caption: impl Into<String>) -> Self {
        Self {
            content: Content::Photo {
                source,
                caption: Some(caption.into()),
            },
            keyboard: None,
            parse_mode: ParseMode::Plain,
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    pub fn with_optional_keyboard(mut self, keyboard: Option<Keyboard>) -> Self {
        self.keyboard = keyboard;
        self
    }

    pub fn html(mut self) -> Self {
        self.parse_mode = ParseMode::Html;
        self
    }

    /// Text body or photo caption.
    pub fn body(&self) -> Option<&str> {
        match &self.content {
            Content::Text(t) => Some(t),
            Content::Photo { caption, .. } => caption.as_deref(),
        }
    }

    /// Binds the reply to a destination.
    pub fn to(self, target: ChatTarget) -> OutboundMessage {
        OutboundMessage {
            target,
            reply: self,
        }
    }
}

/// A reply bound to a destination chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub target: ChatTarget,
    pub reply: Reply,
}

/// An in-memory file sent as a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub caption: Option<String>,
}

/// Bot commands understood in private chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Command {
    Start,
    Gen,
    Users,
    #[strum(serialize = "bro")]
    Broadcast,
    Debug,
}

impl Command {
    /// Parses `/name[@bot] args...` into a command and its trimmed argument string.
    ///
    /// Returns `None` for text that is not a known command.
    pub fn parse(text: &str) -> Option<(Command, String)> {
        let rest = text.trim_start().strip_prefix('/')?;
        let (head, args) = match rest.find(char::is_whitespace) {
            Some(idx) => (&rest[..idx], rest[idx..].trim()),
            None => (rest, ""),
        };
        let name = head.split('@').next().unwrap_or(head);
        let command = name.to_ascii_lowercase().parse::<Command>().ok()?;
        Some((command, args.to_string()))
    }

    /// Whether only the configured operator may run this command.
    pub fn is_admin_only(self) -> bool {
        matches!(self, Command::Users | Command::Broadcast | Command::Debug)
    }
}

/// Everything the bot reacts to, already stripped of transport details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// A slash command.
    Command {
        from: UserProfile,
        message: MessageRef,
        command: Command,
        args: String,
    },
    /// Free text in a private chat.
    PrivateText {
        from: UserProfile,
        message: MessageRef,
        text: String,
    },
    /// Any other private message (photo, sticker, ...). Relayed only.
    PrivateOther {
        from: UserProfile,
        message: MessageRef,
    },
    /// An inline-button press.
    Callback {
        from: UserProfile,
        callback_id: String,
        message: Option<MessageRef>,
        data: String,
    },
    /// Free text posted inside a staff-group thread.
    TopicReply {
        from: UserProfile,
        topic: TopicId,
        text: String,
    },
}

impl InboundEvent {
    pub fn sender(&self) -> &UserProfile {
        match self {
            InboundEvent::Command { from, .. }
            | InboundEvent::PrivateText { from, .. }
            | InboundEvent::PrivateOther { from, .. }
            | InboundEvent::Callback { from, .. }
            | InboundEvent::TopicReply { from, .. } => from,
        }
    }
}

// --- Generation types ---

/// Output aspect of a generated image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Wide,
    Tall,
    Square,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Dimension::Wide, Dimension::Tall, Dimension::Square];

    /// Human label including pixel size.
    pub fn label(self) -> &'static str {
        match self {
            Dimension::Wide => "Wide (1024x576)",
            Dimension::Tall => "Tall (576x1024)",
            Dimension::Square => "Square (768x768)",
        }
    }
}

/// A fully captured generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub dimension: Dimension,
    pub improve: bool,
}

/// Terminal result of one run of the generation pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Delivered {
        image_url: String,
        elapsed_secs: f64,
        size_kb: f64,
    },
    /// Transient failures exhausted the attempt budget.
    Unavailable,
    /// The API answered without an image reference.
    NoImage,
    /// The image was generated but its URL failed verification.
    Invalid,
    /// A non-retryable failure.
    Unexpected(String),
}

impl GenerationOutcome {
    /// Short reason shown to the user for non-delivered outcomes.
    pub fn failure_reason(&self) -> Option<&'static str> {
        match self {
            GenerationOutcome::Delivered { .. } => None,
            GenerationOutcome::Unavailable => Some("Image generation unavailable"),
            GenerationOutcome::NoImage => Some("No image URL"),
            GenerationOutcome::Invalid => Some("Image URL invalid"),
            GenerationOutcome::Unexpected(_) => Some("Unexpected error"),
        }
    }
}

/// Rounds to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_parse_plain() {
        assert_eq!(Command::parse("/gen"), Some((Command::Gen, String::new())));
        assert_eq!(Command::parse("/start"), Some((Command::Start, String::new())));
    }

    #[test]
    fn command_parse_with_bot_suffix_and_args() {
        let (cmd, args) = Command::parse("/bro@pix_bot  Hello  world ").unwrap();
        assert_eq!(cmd, Command::Broadcast);
        assert_eq!(args, "Hello  world");
    }

    #[test]
    fn command_parse_keeps_newlines_in_args() {
        let (_, args) = Command::parse("/bro line one\nline two").unwrap();
        assert_eq!(args, "line one\nline two");
    }

    #[test]
    fn command_parse_rejects_unknown_and_plain_text() {
        assert!(Command::parse("/unknown").is_none());
        assert!(Command::parse("hello").is_none());
        assert!(Command::parse("").is_none());
    }

    #[test]
    fn admin_only_commands() {
        assert!(Command::Users.is_admin_only());
        assert!(Command::Broadcast.is_admin_only());
        assert!(Command::Debug.is_admin_only());
        assert!(!Command::Gen.is_admin_only());
        assert!(!Command::Start.is_admin_only());
    }

    #[test]
    fn dimension_round_trips_through_strings() {
        for dim in Dimension::ALL {
            let parsed: Dimension = dim.to_string().parse().unwrap();
            assert_eq!(parsed, dim);
        }
        assert!("diagonal".parse::<Dimension>().is_err());
    }

    #[test]
    fn display_name_falls_back_to_id() {
        let named = UserProfile {
            id: UserId(7),
            full_name: "Ada Lovelace".into(),
        };
        assert_eq!(named.display_name(), "Ada Lovelace");

        let blank = UserProfile {
            id: UserId(7),
            full_name: "  ".into(),
        };
        assert_eq!(blank.display_name(), "7");
    }

    #[test]
    fn keyboard_lists_callback_payloads() {
        let kb = Keyboard::new(vec![vec![
            Button::callback("Yes", "imp_true"),
            Button::url("Site", "https://example.com"),
            Button::callback("No", "imp_false"),
        ]]);
        let data: Vec<&str> = kb.callback_data().collect();
        assert_eq!(data, vec!["imp_true", "imp_false"]);
    }

    #[test]
    fn round2_rounds_half_up() {
        assert_eq!(round2(1.234), 1.23);
        assert_eq!(round2(1.235_1), 1.24);
        assert_eq!(round2(0.0), 0.0);
    }

    #[test]
    fn failure_reasons_are_distinct() {
        assert!(GenerationOutcome::Delivered {
            image_url: "u".into(),
            elapsed_secs: 1.0,
            size_kb: 1.0
        }
        .failure_reason()
        .is_none());
        assert_eq!(
            GenerationOutcome::Invalid.failure_reason(),
            Some("Image URL invalid")
        );
        assert_ne!(
            GenerationOutcome::Unavailable.failure_reason(),
            GenerationOutcome::Unexpected("x".into()).failure_reason()
        );
    }

    #[test]
    fn user_update_constructors() {
        assert!(UserUpdate::default().is_empty());
        assert_eq!(
            UserUpdate::set_topic(TopicId(3)).topic,
            Some(TopicChange::Set(TopicId(3)))
        );
        assert_eq!(UserUpdate::clear_topic().topic, Some(TopicChange::Clear));
        assert_eq!(UserUpdate::usage(4).usage_count, Some(4));
    }
}
