use blockmail_core::models::{Address, Mailbox, Message, Profile};
use blockmail_core::store::AppState;
use blockmail_core::views::{DashboardView, ViewItem};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use serde_json::json;

/// One message as listed in a mailbox view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// 1-based position in the listing, used by the shell
    pub position: usize,
    /// Contract index and list, absent when the message cannot be modified
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mailbox: Option<Mailbox>,
    /// "From" or "To", relative to the viewing account
    pub direction: &'static str,
    pub counterpart: String,
    pub subject: String,
    pub content: String,
    pub date: String,
    pub starred: bool,
}

impl Card {
    pub fn new(position: usize, item: &ViewItem<'_>, viewer: Option<&Address>) -> Self {
        let message = item.message;
        Self {
            position,
            index: item.target.map(|t| t.index),
            mailbox: item.target.map(|t| t.mailbox),
            direction: direction(message, viewer),
            counterpart: message.counterpart(viewer).short(),
            subject: message.subject.clone(),
            content: message.content.clone(),
            date: format_timestamp(message.timestamp),
            starred: message.is_starred,
        }
    }

    /// Single-line rendering for the shell.
    pub fn line(&self) -> String {
        format!(
            "{:>3}. {}{}: {}  {}  [{}]",
            self.position,
            if self.starred { "* " } else { "" },
            self.direction,
            self.counterpart,
            self.subject,
            self.date
        )
    }
}

fn direction(message: &Message, viewer: Option<&Address>) -> &'static str {
    if viewer == Some(&message.from) {
        "To"
    } else {
        "From"
    }
}

/// Seconds since the epoch, shown in local time.
pub fn format_timestamp(timestamp: u64) -> String {
    i64::try_from(timestamp)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|utc| utc.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

pub fn cards(view: &DashboardView<'_>, viewer: Option<&Address>) -> Vec<Card> {
    view.items()
        .iter()
        .enumerate()
        .map(|(i, item)| Card::new(i + 1, item, viewer))
        .collect()
}

pub fn view_json(view: &DashboardView<'_>, viewer: Option<&Address>) -> serde_json::Value {
    json!({
        "items": cards(view, viewer),
        "notice": view.notice(),
    })
}

pub fn profile_json(address: Option<&Address>, profile: Option<&Profile>) -> serde_json::Value {
    json!({
        "address": address.map(|a| a.to_hex()),
        "name": profile.and_then(|p| p.name.clone()),
        "avatar": profile.and_then(|p| p.avatar.clone()),
        "exists": profile.map(|p| p.exists).unwrap_or(false),
    })
}

pub fn status_json(state: &AppState) -> serde_json::Value {
    json!({
        "connected": state.session.connected,
        "address": state.session.active().map(|a| a.to_hex()),
        "accounts": state.session.accounts.iter().map(Address::to_hex).collect::<Vec<_>>(),
        "profile": profile_json(state.session.active().as_ref(), state.profile.as_ref()),
        "sent": state.mailbox.sent.len(),
        "received": state.mailbox.received.len(),
        "starred": state.mailbox.starred.len(),
    })
}

/// Full message body for the shell's `open` command.
pub fn detail(card: &Card) -> String {
    format!(
        "{}: {}\nDate: {}\nSubject: {}\n\n{}",
        card.direction, card.counterpart, card.date, card.subject, card.content
    )
}
