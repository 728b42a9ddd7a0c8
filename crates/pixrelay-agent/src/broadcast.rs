// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Two-phase broadcast: compose and preview, then confirm or decline.
//!
//! Syntax of the `/bro` argument:
//!
//! ```text
//! <message> [-<button name>:<button link>] [--<image link>]
//! ```
//!
//! The first whitespace-separated token starting with `--` opens the image
//! part, which runs to the end of the input. Before it, the first token
//! starting with a single `-` opens the button part. Whatever precedes the
//! button part is the message.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use pixrelay_core::types::{Button, ChatTarget, Keyboard, MessageRef, PhotoSource, Reply};
use pixrelay_core::{Messenger, RelayError, UserId, UserStore};
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::texts;

const IMAGE_MARKER: &str = "--";
const BUTTON_MARKER: char = '-';
const LINK_PREFIXES: [&str; 3] = ["http://", "https://", "t.me/"];

/// Link button attached to a broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkButton {
    pub name: String,
    pub link: String,
}

/// A parsed broadcast, ready to preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastDraft {
    pub message: String,
    pub button: Option<LinkButton>,
    pub image_url: Option<String>,
}

impl BroadcastDraft {
    /// The reply every recipient gets.
    pub fn reply(&self) -> Reply {
        let keyboard = self
            .button
            .as_ref()
            .map(|b| Keyboard::single(Button::url(b.name.clone(), b.link.clone())));
        let reply = match &self.image_url {
            Some(url) => Reply::photo(PhotoSource::Url(url.clone()), self.message.clone()),
            None => Reply::text(self.message.clone()),
        };
        reply.with_optional_keyboard(keyboard)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BroadcastParseError {
    #[error("broadcast text is empty")]
    Empty,
    #[error("broadcast has no message besides its button or image")]
    MissingMessage,
}

/// Byte offset and text of each whitespace-separated token.
fn tokens(input: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut start = None;
    for (i, c) in input.char_indices() {
        if c.is_whitespace() {
            if let Some(s) = start.take() {
                out.push((s, &input[s..i]));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        out.push((s, &input[s..]));
    }
    out
}

fn is_button_token(token: &str) -> bool {
    let mut chars = token.chars();
    chars.next() == Some(BUTTON_MARKER) && chars.next().is_some_and(|c| c != BUTTON_MARKER)
}

pub(crate) fn normalize_link(link: &str) -> String {
    if LINK_PREFIXES.iter().any(|p| link.starts_with(p)) {
        link.to_string()
    } else {
        format!("https://{link}")
    }
}

fn parse_button(part: &str) -> Option<LinkButton> {
    let (name, link) = part.split_once(':')?;
    let (name, link) = (name.trim(), link.trim());
    if name.is_empty() || link.is_empty() {
        return None;
    }
    Some(LinkButton {
        name: name.to_string(),
        link: normalize_link(link),
    })
}

/// Parses the `/bro` argument string.
pub fn parse_broadcast(input: &str) -> Result<BroadcastDraft, BroadcastParseError> {
    if input.trim().is_empty() {
        return Err(BroadcastParseError::Empty);
    }

    let tokens = tokens(input);
    let image_at = tokens
        .iter()
        .find(|(_, t)| t.starts_with(IMAGE_MARKER))
        .map(|(at, _)| *at);
    let (head, image_url) = match image_at {
        Some(at) => {
            let url = input[at + IMAGE_MARKER.len()..].trim();
            (&input[..at], (!url.is_empty()).then(|| url.to_string()))
        }
        None => (input, None),
    };

    let button_at = tokens
        .iter()
        .take_while(|(at, _)| *at < head.len())
        .find(|(_, t)| is_button_token(t))
        .map(|(at, _)| *at);
    let (message, button) = match button_at {
        Some(at) => (&head[..at], parse_button(&head[at + 1..])),
        None => (head, None),
    };

    let message = message.trim();
    if message.is_empty() {
        return Err(BroadcastParseError::MissingMessage);
    }
    Ok(BroadcastDraft {
        message: message.to_string(),
        button,
        image_url,
    })
}

/// Operator's answer to a preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Decline,
}

/// Callback payload for a decision on job `id`.
pub fn decision_data(decision: Decision, id: Uuid) -> String {
    match decision {
        Decision::Approve => format!("broadcast_yes_{id}"),
        Decision::Decline => format!("broadcast_no_{id}"),
    }
}

/// Parses `broadcast_yes_<id>` / `broadcast_no_<id>`.
pub fn parse_decision(data: &str) -> Option<(Decision, Uuid)> {
    let rest = data.strip_prefix("broadcast_")?;
    let (decision, id) = if let Some(id) = rest.strip_prefix("yes_") {
        (Decision::Approve, id)
    } else if let Some(id) = rest.strip_prefix("no_") {
        (Decision::Decline, id)
    } else {
        return None;
    };
    Uuid::parse_str(id).ok().map(|id| (decision, id))
}

/// A composed broadcast waiting for the operator's decision.
#[derive(Debug, Clone)]
pub struct BroadcastJob {
    pub draft: BroadcastDraft,
    pub admin_id: UserId,
}

/// What a decision did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionOutcome {
    /// The job was sent; number of recipients reached.
    Sent(usize),
    Canceled,
    /// No such pending job. Nothing happened.
    Unknown,
}

/// Pending broadcast jobs and their delivery.
pub struct BroadcastDesk {
    messenger: Arc<dyn Messenger>,
    store: Arc<dyn UserStore>,
    jobs: DashMap<Uuid, BroadcastJob>,
    send_delay: Duration,
}

impl BroadcastDesk {
    pub fn new(
        messenger: Arc<dyn Messenger>,
        store: Arc<dyn UserStore>,
        send_delay: Duration,
    ) -> Self {
        Self {
            messenger,
            store,
            jobs: DashMap::new(),
            send_delay,
        }
    }

    /// Number of jobs awaiting a decision.
    pub fn pending(&self) -> usize {
        self.jobs.len()
    }

    /// Parses `args`, previews the result to `admin` and asks for approval.
    ///
    /// Returns the job id. A failed preview drops the job again.
    pub async fn compose(&self, admin: UserId, args: &str) -> Result<Uuid, RelayError> {
        let draft =
            parse_broadcast(args).map_err(|e| RelayError::Validation(e.to_string()))?;
        let id = Uuid::new_v4();
        let preview = draft.reply();
        self.jobs.insert(
            id,
            BroadcastJob {
                draft,
                admin_id: admin,
            },
        );

        let target = ChatTarget::user(admin);
        let approval = Reply::text(texts::BROADCAST_APPROVE).with_keyboard(Keyboard::new(vec![
            vec![
                Button::callback(texts::YES, decision_data(Decision::Approve, id)),
                Button::callback(texts::NO, decision_data(Decision::Decline, id)),
            ],
        ]));
        let shown = async {
            self.messenger.send(preview.to(target)).await?;
            self.messenger.send(approval.to(target)).await
        };
        if let Err(e) = shown.await {
            self.jobs.remove(&id);
            return Err(e);
        }

        info!(broadcast_id = %id, admin_id = admin.0, "broadcast awaiting approval");
        Ok(id)
    }

    /// Applies a decision. The job is consumed before anything is sent, so a
    /// repeated or late decision is a no-op.
    ///
    /// `prompt` is the approval message, which is edited to show the result.
    pub async fn decide(
        &self,
        decision: Decision,
        id: Uuid,
        prompt: Option<MessageRef>,
    ) -> DecisionOutcome {
        let Some((_, job)) = self.jobs.remove(&id) else {
            debug!(broadcast_id = %id, "decision for unknown broadcast ignored");
            return DecisionOutcome::Unknown;
        };

        let (outcome, text) = match decision {
            Decision::Decline => {
                info!(broadcast_id = %id, "broadcast canceled");
                (DecisionOutcome::Canceled, texts::BROADCAST_CANCELED.to_string())
            }
            Decision::Approve => {
                let count = self.deliver(&job.draft).await;
                info!(broadcast_id = %id, delivered = count, "broadcast finished");
                (DecisionOutcome::Sent(count), texts::broadcast_success(count))
            }
        };
        self.report(job.admin_id, prompt, &text).await;
        outcome
    }

    /// Sends the draft to every stored user. Returns the number reached.
    pub async fn deliver(&self, draft: &BroadcastDraft) -> usize {
        let users = match self.store.list_all().await {
            Ok(users) => users,
            Err(e) => {
                error!(error = %e, "cannot list broadcast recipients");
                return 0;
            }
        };

        let reply = draft.reply();
        let mut delivered = 0;
        for (i, user) in users.iter().enumerate() {
            if i > 0 && !self.send_delay.is_zero() {
                tokio::time::sleep(self.send_delay).await;
            }
            let msg = reply.clone().to(ChatTarget::user(user.user_id));
            match self.messenger.send(msg).await {
                Ok(_) => delivered += 1,
                Err(e) => error!(user_id = user.user_id.0, error = %e, "broadcast failed for user"),
            }
        }
        delivered
    }

    async fn report(&self, admin: UserId, prompt: Option<MessageRef>, text: &str) {
        let result = match prompt {
            Some(message) => self.messenger.edit_text(message, text, None).await,
            None => self
                .messenger
                .send(Reply::text(text).to(ChatTarget::user(admin)))
                .await
                .map(|_| ()),
        };
        if let Err(e) = result {
            error!(admin_id = admin.0, error = %e, "failed to report broadcast result");
        }
    }
}
