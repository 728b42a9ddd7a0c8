// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Translation of Telegram updates into [`InboundEvent`]s.
//!
//! Private chats yield commands, free text and "other" messages; the staff
//! forum group only yields text posted inside a thread. Everything else,
//! including messages from bots, is dropped here.

use pixrelay_core::types::{Command, InboundEvent, MessageRef, TopicId, UserId, UserProfile};
use teloxide::prelude::*;
use teloxide::types::{ChatKind, User};
use tracing::debug;

/// Checks whether the message is from a private (DM) chat.
pub fn is_dm(msg: &Message) -> bool {
    matches!(msg.chat.kind, ChatKind::Private(_))
}

/// Identity of a Telegram user, or `None` for bots and out-of-range ids.
pub fn profile_of(user: &User) -> Option<UserProfile> {
    if user.is_bot {
        return None;
    }
    let id = i64::try_from(user.id.0).ok()?;
    Some(UserProfile {
        id: UserId(id),
        full_name: user.full_name(),
    })
}

/// Reference to a message as the core types see it.
pub fn message_ref(msg: &Message) -> MessageRef {
    MessageRef {
        chat_id: msg.chat.id.0,
        message_id: msg.id.0,
    }
}

/// Map a message to an event, or `None` when the bot should ignore it.
pub fn message_to_event(msg: &Message, group_chat_id: i64) -> Option<InboundEvent> {
    let from = profile_of(msg.from.as_ref()?)?;

    if is_dm(msg) {
        let message = message_ref(msg);
        let Some(text) = msg.text() else {
            return Some(InboundEvent::PrivateOther { from, message });
        };
        if let Some((command, args)) = Command::parse(text) {
            return Some(InboundEvent::Command {
                from,
                message,
                command,
                args,
            });
        }
        if text.trim_start().starts_with('/') {
            debug!(user_id = %from.id, "ignoring unknown command");
            return None;
        }
        return Some(InboundEvent::PrivateText {
            from,
            message,
            text: text.to_string(),
        });
    }

    if msg.chat.id.0 != group_chat_id || !msg.is_topic_message {
        return None;
    }
    let thread = msg.thread_id?;
    let text = msg.text()?;
    Some(InboundEvent::TopicReply {
        from,
        topic: TopicId(thread.0.0),
        text: text.to_string(),
    })
}

/// Map an inline-button press to an event. Presses without data are ignored.
pub fn callback_to_event(query: &CallbackQuery) -> Option<InboundEvent> {
    let data = query.data.clone()?;
    let from = profile_of(&query.from)?;
    let message = query.message.as_ref().map(|m| MessageRef {
        chat_id: m.chat().id.0,
        message_id: m.id().0,
    });
    Some(InboundEvent::Callback {
        from,
        callback_id: query.id.to_string(),
        message,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixrelay_core::types::Command;

    const GROUP: i64 = -100123;

    fn user_json(id: u64) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "is_bot": false,
            "first_name": "Ada",
            "last_name": "Lovelace",
        })
    }

    fn private_message(user_id: u64, text: &str) -> Message {
        let json = serde_json::json!({
            "message_id": 11,
            "date": 1700000000i64,
            "chat": {
                "id": user_id as i64,
                "type": "private",
                "first_name": "Ada",
            },
            "from": user_json(user_id),
            "text": text,
        });
        serde_json::from_value(json).expect("failed to deserialize mock message")
    }

    fn private_location(user_id: u64) -> Message {
        let json = serde_json::json!({
            "message_id": 12,
            "date": 1700000000i64,
            "chat": {
                "id": user_id as i64,
                "type": "private",
                "first_name": "Ada",
            },
            "from": user_json(user_id),
            "location": { "latitude": 1.0, "longitude": 2.0 },
        });
        serde_json::from_value(json).expect("failed to deserialize mock message")
    }

    fn topic_message(chat_id: i64, thread: i32, text: &str) -> Message {
        let json = serde_json::json!({
            "message_id": 300,
            "message_thread_id": thread,
            "is_topic_message": true,
            "date": 1700000000i64,
            "chat": {
                "id": chat_id,
                "type": "supergroup",
                "title": "Staff",
                "is_forum": true,
            },
            "from": user_json(7),
            "text": text,
        });
        serde_json::from_value(json).expect("failed to deserialize mock topic message")
    }

    #[test]
    fn dm_detection() {
        assert!(is_dm(&private_message(5, "hi")));
        assert!(!is_dm(&topic_message(GROUP, 4, "hi")));
    }

    #[test]
    fn private_text_becomes_private_text() {
        let event = message_to_event(&private_message(42, "a cat in space"), GROUP).unwrap();
        match event {
            InboundEvent::PrivateText {
                from,
                message,
                text,
            } => {
                assert_eq!(from.id, UserId(42));
                assert_eq!(from.full_name, "Ada Lovelace");
                assert_eq!(message.chat_id, 42);
                assert_eq!(message.message_id, 11);
                assert_eq!(text, "a cat in space");
            }
            other => panic!("expected PrivateText, got {other:?}"),
        }
    }

    #[test]
    fn known_command_is_parsed() {
        let event = message_to_event(&private_message(42, "/bro hello -Buy:x.com"), GROUP).unwrap();
        match event {
            InboundEvent::Command { command, args, .. } => {
                assert_eq!(command, Command::Broadcast);
                assert_eq!(args, "hello -Buy:x.com");
            }
            other => panic!("expected Command, got {other:?}"),
        }
    }

    #[test]
    fn unknown_command_is_ignored() {
        assert!(message_to_event(&private_message(42, "/settings"), GROUP).is_none());
    }

    #[test]
    fn non_text_private_message_is_other() {
        let event = message_to_event(&private_location(42), GROUP).unwrap();
        assert!(matches!(event, InboundEvent::PrivateOther { .. }));
    }

    #[test]
    fn thread_text_in_staff_group_is_topic_reply() {
        let event = message_to_event(&topic_message(GROUP, 77, "hello user"), GROUP).unwrap();
        match event {
            InboundEvent::TopicReply { from, topic, text } => {
                assert_eq!(from.id, UserId(7));
                assert_eq!(topic, TopicId(77));
                assert_eq!(text, "hello user");
            }
            other => panic!("expected TopicReply, got {other:?}"),
        }
    }

    #[test]
    fn other_groups_are_ignored() {
        assert!(message_to_event(&topic_message(-100999, 77, "hello"), GROUP).is_none());
    }

    #[test]
    fn callback_without_message_maps_fields() {
        let json = serde_json::json!({
            "id": "cbq-1",
            "from": user_json(42),
            "chat_instance": "instance",
            "data": "dim_wide",
        });
        let query: CallbackQuery = serde_json::from_value(json).unwrap();
        match callback_to_event(&query).unwrap() {
            InboundEvent::Callback {
                from,
                callback_id,
                message,
                data,
            } => {
                assert_eq!(from.id, UserId(42));
                assert_eq!(callback_id, "cbq-1");
                assert!(message.is_none());
                assert_eq!(data, "dim_wide");
            }
            other => panic!("expected Callback, got {other:?}"),
        }
    }

    #[test]
    fn callback_carries_message_ref() {
        let json = serde_json::json!({
            "id": "cbq-2",
            "from": user_json(42),
            "chat_instance": "instance",
            "data": "imp_true",
            "message": {
                "message_id": 99,
                "date": 1700000000i64,
                "chat": { "id": 42, "type": "private", "first_name": "Ada" },
                "text": "Enable quality?",
            },
        });
        let query: CallbackQuery = serde_json::from_value(json).unwrap();
        match callback_to_event(&query).unwrap() {
            InboundEvent::Callback { message, .. } => {
                assert_eq!(
                    message,
                    Some(MessageRef {
                        chat_id: 42,
                        message_id: 99
                    })
                );
            }
            other => panic!("expected Callback, got {other:?}"),
        }
    }

    #[test]
    fn callback_without_data_is_ignored() {
        let json = serde_json::json!({
            "id": "cbq-3",
            "from": user_json(42),
            "chat_instance": "instance",
        });
        let query: CallbackQuery = serde_json::from_value(json).unwrap();
        assert!(callback_to_event(&query).is_none());
    }
}
