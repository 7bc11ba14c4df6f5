//! Derived dashboard views over a mailbox snapshot.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DRAFTS_PLACEHOLDER, NO_RECEIVED_EMAILS, NO_SEARCH_RESULTS, NO_SENT_EMAILS, NO_STARRED_EMAILS,
    TRASH_PLACEHOLDER,
};
use crate::models::{MailEntry, Message, MessageRef};
use crate::search::search_entries;
use crate::sync::MailboxSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Inbox,
    Sent,
    Starred,
    /// No backing data source
    Drafts,
    /// No backing data source
    Trash,
}

impl Tab {
    pub const ALL: [Tab; 5] = [Tab::Inbox, Tab::Sent, Tab::Starred, Tab::Drafts, Tab::Trash];

    pub fn label(self) -> &'static str {
        match self {
            Tab::Inbox => "Inbox",
            Tab::Sent => "Sent",
            Tab::Starred => "Starred",
            Tab::Drafts => "Drafts",
            Tab::Trash => "Trash",
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Tab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inbox" => Ok(Tab::Inbox),
            "sent" => Ok(Tab::Sent),
            "starred" => Ok(Tab::Starred),
            "drafts" => Ok(Tab::Drafts),
            "trash" => Ok(Tab::Trash),
            other => Err(format!("unknown tab: {}", other)),
        }
    }
}

/// One rendered card. `target` is `None` when the message cannot be
/// addressed for mutation (a starred entry with no live sent/received copy).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewItem<'a> {
    pub message: &'a Message,
    pub target: Option<MessageRef>,
}

impl<'a> From<&'a MailEntry> for ViewItem<'a> {
    fn from(entry: &'a MailEntry) -> Self {
        Self {
            message: &entry.message,
            target: Some(entry.reference()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardView<'a> {
    Messages(Vec<ViewItem<'a>>),
    /// The selected tab has nothing to show
    Empty { notice: &'static str },
    /// A search query matched nothing
    NoResults,
    /// Tab without a data source
    Placeholder { tab: Tab, notice: &'static str },
}

impl<'a> DashboardView<'a> {
    pub fn items(&self) -> &[ViewItem<'a>] {
        match self {
            DashboardView::Messages(items) => items,
            _ => &[],
        }
    }

    pub fn notice(&self) -> Option<&'static str> {
        match self {
            DashboardView::Messages(_) => None,
            DashboardView::Empty { notice } => Some(*notice),
            DashboardView::NoResults => Some(NO_SEARCH_RESULTS),
            DashboardView::Placeholder { notice, .. } => Some(*notice),
        }
    }
}

/// What the dashboard shows for `tab` and `query`. A non-empty query
/// replaces the tab with search results over sent and received messages.
pub fn dashboard_view<'a>(snapshot: &'a MailboxSnapshot, tab: Tab, query: &str) -> DashboardView<'a> {
    if !query.is_empty() {
        let items: Vec<ViewItem<'a>> = search_entries(snapshot, query)
            .into_iter()
            .map(ViewItem::from)
            .collect();
        return if items.is_empty() {
            DashboardView::NoResults
        } else {
            DashboardView::Messages(items)
        };
    }
    tab_view(snapshot, tab)
}

/// The unfiltered view of one tab.
pub fn tab_view(snapshot: &MailboxSnapshot, tab: Tab) -> DashboardView<'_> {
    let (items, notice): (Vec<ViewItem<'_>>, &'static str) = match tab {
        Tab::Inbox => (
            snapshot.received.iter().map(ViewItem::from).collect(),
            NO_RECEIVED_EMAILS,
        ),
        Tab::Sent => (snapshot.sent.iter().map(ViewItem::from).collect(), NO_SENT_EMAILS),
        Tab::Starred => (
            snapshot
                .starred
                .iter()
                .map(|message| ViewItem {
                    message,
                    target: snapshot.resolve_starred(message),
                })
                .collect(),
            NO_STARRED_EMAILS,
        ),
        Tab::Drafts => {
            return DashboardView::Placeholder {
                tab,
                notice: DRAFTS_PLACEHOLDER,
            }
        }
        Tab::Trash => {
            return DashboardView::Placeholder {
                tab,
                notice: TRASH_PLACEHOLDER,
            }
        }
    };
    if items.is_empty() {
        DashboardView::Empty { notice }
    } else {
        DashboardView::Messages(items)
    }
}
