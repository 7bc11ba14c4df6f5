use serde::Serialize;

use crate::error::MailError;
use crate::models::{ComposeDraft, Contact, ContactBook, Profile, Session};
use crate::sync::MailboxSnapshot;
use crate::views::{dashboard_view, DashboardView, Tab};

/// Everything the presentation layer reads. Only the worker writes it, and
/// only through [`AppState::apply`].
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub session: Session,
    /// True while a wallet prompt, contract write or refresh is pending
    pub loading: bool,
    pub mailbox: MailboxSnapshot,
    pub profile: Option<Profile>,
    pub contacts: ContactBook,
    pub tab: Tab,
    pub search_query: String,
    pub compose: ComposeDraft,
    #[serde(skip)]
    pub last_error: Option<MailError>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    /// A new or changed wallet session. Switching to a different account
    /// drops everything fetched for the previous one.
    SessionChanged(Session),
    Disconnected,
    LoadingStarted,
    LoadingFinished,
    MailboxRefreshed(MailboxSnapshot),
    ProfileLoaded(Profile),
    TabSelected(Tab),
    SearchChanged(String),
    ComposeEdited(ComposeDraft),
    ComposeCleared,
    ContactAdded(Contact),
    Failed(MailError),
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, change: StateChange) {
        match change {
            StateChange::SessionChanged(session) => {
                if session.active() != self.session.active() {
                    self.mailbox = MailboxSnapshot::default();
                    self.profile = None;
                }
                self.session = session;
            }
            StateChange::Disconnected => {
                // Leaving the dashboard drops everything, contacts included.
                *self = AppState::default();
            }
            StateChange::LoadingStarted => {
                self.loading = true;
                self.last_error = None;
            }
            StateChange::LoadingFinished => self.loading = false,
            StateChange::MailboxRefreshed(snapshot) => {
                // A late refresh never overwrites a newer one.
                if snapshot.generation >= self.mailbox.generation {
                    self.mailbox = snapshot;
                }
            }
            StateChange::ProfileLoaded(profile) => self.profile = Some(profile),
            StateChange::TabSelected(tab) => self.tab = tab,
            StateChange::SearchChanged(query) => self.search_query = query,
            StateChange::ComposeEdited(draft) => self.compose = draft,
            StateChange::ComposeCleared => self.compose = ComposeDraft::default(),
            StateChange::ContactAdded(contact) => self.contacts.add(contact),
            StateChange::Failed(err) => self.last_error = Some(err),
        }
    }

    pub fn view(&self) -> DashboardView<'_> {
        dashboard_view(&self.mailbox, self.tab, &self.search_query)
    }

    pub fn is_busy(&self) -> bool {
        self.loading
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{live_entries, Address, Mailbox, Message};

    fn addr(byte: u8) -> Address {
        Address::new([byte; 20])
    }

    fn connected(accounts: Vec<Address>) -> Session {
        let mut session = Session::default();
        session.connect(accounts);
        session
    }

    fn snapshot(generation: u64, subjects: &[&str]) -> MailboxSnapshot {
        let received = subjects
            .iter()
            .map(|subject| Message {
                from: addr(0xb),
                to: addr(0xa),
                subject: subject.to_string(),
                content: String::new(),
                timestamp: 1,
                is_sent: false,
                is_starred: false,
                is_deleted: false,
            })
            .collect();
        MailboxSnapshot {
            sent: Vec::new(),
            received: live_entries(received, Mailbox::Received),
            starred: Vec::new(),
            generation,
        }
    }

    #[test]
    fn test_account_change_drops_mailbox_and_profile() {
        let mut state = AppState::new();
        state.apply(StateChange::SessionChanged(connected(vec![addr(0xa), addr(0xc)])));
        state.apply(StateChange::MailboxRefreshed(snapshot(1, &["Hi"])));
        state.apply(StateChange::ProfileLoaded(Profile::default()));

        // Same active account: caches survive.
        state.apply(StateChange::SessionChanged(connected(vec![addr(0xa)])));
        assert_eq!(state.mailbox.received.len(), 1);
        assert!(state.profile.is_some());

        state.apply(StateChange::SessionChanged(connected(vec![addr(0xc)])));
        assert!(state.mailbox.received.is_empty());
        assert!(state.profile.is_none());
    }

    #[test]
    fn test_stale_refresh_is_ignored() {
        let mut state = AppState::new();
        state.apply(StateChange::MailboxRefreshed(snapshot(2, &["new"])));
        state.apply(StateChange::MailboxRefreshed(snapshot(1, &["old"])));
        assert_eq!(state.mailbox.received[0].message.subject, "new");
    }

    #[test]
    fn test_disconnect_resets_everything() {
        let mut state = AppState::new();
        state.apply(StateChange::SessionChanged(connected(vec![addr(0xa)])));
        state.apply(StateChange::ContactAdded(Contact::new("Bob", "0xbb", None).unwrap()));
        state.apply(StateChange::SearchChanged("hi".into()));
        state.apply(StateChange::TabSelected(Tab::Sent));

        state.apply(StateChange::Disconnected);
        assert!(!state.session.connected);
        assert!(state.contacts.is_empty());
        assert_eq!(state.tab, Tab::Inbox);
        assert!(state.search_query.is_empty());
    }

    #[test]
    fn test_loading_clears_previous_error() {
        let mut state = AppState::new();
        state.apply(StateChange::Failed(MailError::UserRejected));
        state.apply(StateChange::LoadingStarted);
        assert!(state.is_busy());
        assert!(state.last_error.is_none());
        state.apply(StateChange::LoadingFinished);
        assert!(!state.is_busy());
    }

    #[test]
    fn test_view_follows_tab_and_search() {
        let mut state = AppState::new();
        state.apply(StateChange::MailboxRefreshed(snapshot(1, &["Hi", "Invoice"])));
        assert_eq!(state.view().items().len(), 2);

        state.apply(StateChange::SearchChanged("invoice".into()));
        assert_eq!(state.view().items().len(), 1);

        state.apply(StateChange::SearchChanged(String::new()));
        state.apply(StateChange::TabSelected(Tab::Drafts));
        assert!(state.view().items().is_empty());
    }
}
