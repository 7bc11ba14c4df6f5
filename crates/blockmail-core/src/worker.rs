use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::runtime::Runtime;

use crate::error::{MailError, MailResult};
use crate::events::{Notification, NotificationKind};
use crate::gateway::ContractGateway;
use crate::models::{Address, ComposeDraft, Contact, MessageRef};
use crate::store::{AppState, ProfileCache, StateChange};
use crate::sync::SyncController;
use crate::views::Tab;
use crate::wallet::{AccountChange, WalletProvider, WalletSession};

pub type Responder = Sender<MailResult<()>>;

pub enum MailCommand {
    /// Reconnect silently if the wallet already authorized us
    CheckSession { response_tx: Option<Responder> },
    Connect { response_tx: Option<Responder> },
    Disconnect { response_tx: Option<Responder> },
    SwitchAccount {
        address: Address,
        response_tx: Option<Responder>,
    },
    Refresh { response_tx: Option<Responder> },
    Send {
        draft: ComposeDraft,
        response_tx: Option<Responder>,
    },
    Star {
        target: MessageRef,
        response_tx: Option<Responder>,
    },
    Unstar {
        target: MessageRef,
        response_tx: Option<Responder>,
    },
    Delete {
        target: MessageRef,
        response_tx: Option<Responder>,
    },
    UpdateProfile {
        name: String,
        avatar: String,
        response_tx: Option<Responder>,
    },
    AddContact {
        name: String,
        address: String,
        avatar: Option<String>,
        response_tx: Option<Responder>,
    },
    SelectTab {
        tab: Tab,
        response_tx: Option<Responder>,
    },
    SetSearch {
        query: String,
        response_tx: Option<Responder>,
    },
    EditCompose {
        draft: ComposeDraft,
        response_tx: Option<Responder>,
    },
    Shutdown,
}

/// Pushed to the presentation layer after the shared state changes.
#[derive(Debug, Clone)]
pub enum DataChange {
    StateUpdated,
    Notification(Notification),
    AccountChanged(AccountChange),
    /// The wallet went away; the dashboard must return to the connect view
    SessionLost(MailError),
}

pub struct MailWorker {
    wallet: WalletSession,
    sync: SyncController,
    profiles: ProfileCache,
    state: Arc<RwLock<AppState>>,
    data_tx: Sender<DataChange>,
    command_rx: Receiver<MailCommand>,
    account_poll_interval: Duration,
}

impl MailWorker {
    pub fn new(
        wallet: Arc<dyn WalletProvider>,
        gateway: Arc<dyn ContractGateway>,
        state: Arc<RwLock<AppState>>,
        data_tx: Sender<DataChange>,
        command_rx: Receiver<MailCommand>,
        account_poll_interval: Duration,
    ) -> Self {
        Self {
            wallet: WalletSession::new(wallet),
            sync: SyncController::new(gateway),
            profiles: ProfileCache::new(),
            state,
            data_tx,
            command_rx,
            account_poll_interval,
        }
    }

    pub fn run(mut self) {
        let rt = match Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                tracing::error!("Failed to create mail worker runtime: {}", e);
                return;
            }
        };
        tracing::debug!("mail worker started");

        loop {
            match self.command_rx.recv_timeout(self.account_poll_interval) {
                Ok(MailCommand::Shutdown) => {
                    tracing::debug!("mail worker shutting down");
                    break;
                }
                Ok(cmd) => rt.block_on(self.handle_command(cmd)),
                Err(RecvTimeoutError::Timeout) => rt.block_on(self.handle_account_poll()),
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        tracing::debug!("mail worker stopped");
    }

    async fn handle_command(&mut self, cmd: MailCommand) {
        match cmd {
            MailCommand::CheckSession { response_tx } => {
                let result = self.handle_check_session().await;
                respond(response_tx, result);
            }
            MailCommand::Connect { response_tx } => {
                let result = self.handle_connect().await;
                respond(response_tx, result);
            }
            MailCommand::Disconnect { response_tx } => {
                self.handle_disconnect();
                respond(response_tx, Ok(()));
            }
            MailCommand::SwitchAccount { address, response_tx } => {
                let result = self.handle_switch_account(address).await;
                respond(response_tx, result);
            }
            MailCommand::Refresh { response_tx } => {
                let result = match self.caller() {
                    Ok(caller) => {
                        self.begin();
                        let result = self.refresh_mailbox(caller).await;
                        self.finish();
                        result
                    }
                    Err(e) => Err(e),
                };
                respond(response_tx, result);
            }
            MailCommand::Send { draft, response_tx } => {
                let result = self.handle_send(draft).await;
                respond(response_tx, result);
            }
            MailCommand::Star { target, response_tx } => {
                let result = self.handle_flag(target, Flag::Star).await;
                respond(response_tx, result);
            }
            MailCommand::Unstar { target, response_tx } => {
                let result = self.handle_flag(target, Flag::Unstar).await;
                respond(response_tx, result);
            }
            MailCommand::Delete { target, response_tx } => {
                let result = self.handle_flag(target, Flag::Delete).await;
                respond(response_tx, result);
            }
            MailCommand::UpdateProfile {
                name,
                avatar,
                response_tx,
            } => {
                let result = self.handle_update_profile(&name, &avatar).await;
                respond(response_tx, result);
            }
            MailCommand::AddContact {
                name,
                address,
                avatar,
                response_tx,
            } => {
                let result = self.handle_add_contact(&name, &address, avatar.as_deref());
                respond(response_tx, result);
            }
            MailCommand::SelectTab { tab, response_tx } => {
                self.apply(StateChange::TabSelected(tab));
                respond(response_tx, Ok(()));
            }
            MailCommand::SetSearch { query, response_tx } => {
                self.apply(StateChange::SearchChanged(query));
                respond(response_tx, Ok(()));
            }
            MailCommand::EditCompose { draft, response_tx } => {
                self.apply(StateChange::ComposeEdited(draft));
                respond(response_tx, Ok(()));
            }
            // Handled by the run loop
            MailCommand::Shutdown => {}
        }
    }

    async fn handle_check_session(&mut self) -> MailResult<()> {
        match self.wallet.check_existing_session().await {
            Ok(accounts) if accounts.is_empty() => Ok(()),
            Ok(_) => {
                self.apply(StateChange::SessionChanged(self.wallet.session().clone()));
                self.load_dashboard().await;
                Ok(())
            }
            Err(e) => {
                tracing::error!("Error checking wallet session: {}", e);
                self.fail(e.clone(), None);
                self.emit(DataChange::SessionLost(e.clone()));
                Err(e)
            }
        }
    }

    async fn handle_connect(&mut self) -> MailResult<()> {
        self.begin();
        let result = self.wallet.request_connection().await;
        self.finish();
        match result {
            Ok(_) => {
                self.apply(StateChange::SessionChanged(self.wallet.session().clone()));
                self.notify(Notification::titled(
                    "Connected!",
                    "Successfully connected to wallet",
                    NotificationKind::Success,
                ));
                self.load_dashboard().await;
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to connect wallet: {}", e);
                self.fail(e.clone(), Some("Failed to connect to wallet"));
                if e.requires_reconnect() {
                    self.emit(DataChange::SessionLost(e.clone()));
                }
                Err(e)
            }
        }
    }

    fn handle_disconnect(&mut self) {
        self.wallet.disconnect();
        self.sync.clear();
        self.profiles.clear();
        self.apply(StateChange::Disconnected);
    }

    async fn handle_switch_account(&mut self, address: Address) -> MailResult<()> {
        if let Err(e) = self.wallet.switch_account(address) {
            tracing::error!("Failed to switch account: {}", e);
            self.fail(e.clone(), Some("Failed to switch account"));
            return Err(e);
        }
        self.sync.clear();
        self.apply(StateChange::SessionChanged(self.wallet.session().clone()));
        self.notify(Notification::titled(
            "Account Changed",
            "Successfully switched account",
            NotificationKind::Success,
        ));
        self.load_dashboard().await;
        Ok(())
    }

    async fn handle_account_poll(&mut self) {
        match self.wallet.poll_accounts().await {
            Ok(None) => {}
            Ok(Some(change)) => {
                self.emit(DataChange::AccountChanged(change.clone()));
                if change.current.is_none() {
                    self.sync.clear();
                    self.profiles.clear();
                    self.apply(StateChange::Disconnected);
                    self.emit(DataChange::SessionLost(MailError::NotConnected));
                    return;
                }
                self.apply(StateChange::SessionChanged(self.wallet.session().clone()));
                // Accounts added or removed behind the active one: caches still belong to it.
                if change.previous == change.current {
                    return;
                }
                self.sync.clear();
                self.notify(Notification::titled(
                    "Account Changed",
                    "Successfully switched account",
                    NotificationKind::Success,
                ));
                self.load_dashboard().await;
            }
            // A transient wallet failure keeps the session; only an empty
            // account list ends it.
            Err(e) => tracing::warn!("Error polling wallet accounts: {}", e),
        }
    }

    async fn handle_send(&mut self, draft: ComposeDraft) -> MailResult<()> {
        let caller = self.caller()?;
        self.apply(StateChange::ComposeEdited(draft.clone()));
        if let Err(e) = draft.validate() {
            // The form stays open with its contents.
            self.fail(e.clone(), Some("Please fill in all fields"));
            return Err(e);
        }

        self.begin();
        let result = self.sync.gateway().send(caller, &draft).await;
        self.finish();
        match result {
            Ok(()) => {
                tracing::info!(%caller, to = %draft.to, "email sent");
                self.apply(StateChange::ComposeCleared);
                self.notify(Notification::success("Email sent successfully"));
                self.refresh_after_mutation(caller).await;
                Ok(())
            }
            Err(e) => {
                tracing::error!("Error sending email: {}", e);
                self.fail(e.clone(), Some("Failed to send email"));
                Err(e)
            }
        }
    }

    async fn handle_flag(&mut self, target: MessageRef, flag: Flag) -> MailResult<()> {
        let caller = self.caller()?;
        let is_sent = target.mailbox.is_sent();
        let gateway = self.sync.gateway().clone();

        self.begin();
        let result = match flag {
            Flag::Star => gateway.star(caller, target.index, is_sent).await,
            Flag::Unstar => gateway.unstar(caller, target.index, is_sent).await,
            Flag::Delete => gateway.delete(caller, target.index, is_sent).await,
        };
        self.finish();

        match result {
            Ok(()) => {
                tracing::info!(%caller, index = target.index, is_sent, action = flag.verb(), "message updated");
                self.notify(Notification::success(format!("Email {} successfully", flag.past())));
                self.refresh_after_mutation(caller).await;
                Ok(())
            }
            Err(e) => {
                tracing::error!("Error trying to {} email: {}", flag.verb(), e);
                let summary = format!("Failed to {} email", flag.verb());
                self.fail(e.clone(), Some(summary.as_str()));
                Err(e)
            }
        }
    }

    async fn handle_update_profile(&mut self, name: &str, avatar: &str) -> MailResult<()> {
        let caller = self.caller()?;
        let gateway = self.sync.gateway().clone();

        self.begin();
        let result = self.profiles.update(gateway.as_ref(), caller, name, avatar).await;
        self.finish();

        match result {
            Ok(profile) => {
                self.apply(StateChange::ProfileLoaded(profile));
                self.notify(Notification::success("Profile updated successfully"));
                self.refresh_after_mutation(caller).await;
                Ok(())
            }
            Err(e) => {
                tracing::error!("Error updating profile: {}", e);
                self.fail(e.clone(), Some("Failed to update profile"));
                Err(e)
            }
        }
    }

    fn handle_add_contact(&mut self, name: &str, address: &str, avatar: Option<&str>) -> MailResult<()> {
        match Contact::new(name, address, avatar) {
            Ok(contact) => {
                self.apply(StateChange::ContactAdded(contact));
                self.notify(Notification::success("Contact added successfully"));
                Ok(())
            }
            Err(e) => {
                self.fail(e.clone(), Some("Please fill in all required fields"));
                Err(e)
            }
        }
    }

    /// Mailbox and profile for a freshly active account. Failures are
    /// reported but do not undo the connection.
    async fn load_dashboard(&mut self) {
        let Some(caller) = self.wallet.session().active() else {
            return;
        };
        self.begin();
        let _ = self.refresh_mailbox(caller).await;

        let gateway = self.sync.gateway().clone();
        match self.profiles.load(gateway.as_ref(), caller).await {
            Ok(profile) => self.apply(StateChange::ProfileLoaded(profile)),
            Err(e) => tracing::error!("Error fetching profile: {}", e),
        }
        self.finish();
    }

    async fn refresh_mailbox(&mut self, caller: Address) -> MailResult<()> {
        match self.sync.refresh(caller).await {
            Ok(snapshot) => {
                self.apply(StateChange::MailboxRefreshed(snapshot));
                Ok(())
            }
            Err(e) => {
                tracing::error!("Error fetching emails: {}", e);
                self.fail(e.clone(), Some("Failed to fetch emails"));
                Err(e)
            }
        }
    }

    /// The mutation itself succeeded; a failed refresh is reported on its own.
    async fn refresh_after_mutation(&mut self, caller: Address) {
        self.begin();
        let _ = self.refresh_mailbox(caller).await;
        self.finish();
    }

    fn caller(&self) -> MailResult<Address> {
        match self.wallet.session().active() {
            Some(address) => Ok(address),
            None => {
                self.fail(MailError::NotConnected, None);
                Err(MailError::NotConnected)
            }
        }
    }

    fn begin(&self) {
        self.apply(StateChange::LoadingStarted);
    }

    fn finish(&self) {
        self.apply(StateChange::LoadingFinished);
    }

    fn fail(&self, err: MailError, summary: Option<&str>) {
        let description = match summary {
            Some(summary) => format!("{}: {}", summary, err),
            None => err.to_string(),
        };
        self.apply(StateChange::Failed(err));
        self.notify(Notification::error(description));
    }

    fn apply(&self, change: StateChange) {
        self.state.write().apply(change);
        self.emit(DataChange::StateUpdated);
    }

    fn notify(&self, notification: Notification) {
        self.emit(DataChange::Notification(notification));
    }

    fn emit(&self, change: DataChange) {
        let _ = self.data_tx.send(change);
    }
}

#[derive(Debug, Clone, Copy)]
enum Flag {
    Star,
    Unstar,
    Delete,
}

impl Flag {
    fn verb(self) -> &'static str {
        match self {
            Flag::Star => "star",
            Flag::Unstar => "unstar",
            Flag::Delete => "delete",
        }
    }

    fn past(self) -> &'static str {
        match self {
            Flag::Star => "starred",
            Flag::Unstar => "unstarred",
            Flag::Delete => "deleted",
        }
    }
}

fn respond(response_tx: Option<Responder>, result: MailResult<()>) {
    if let Some(tx) = response_tx {
        let _ = tx.send(result);
    }
}
