use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::RwLock;

use crate::config::CoreConfig;
use crate::error::{MailError, MailResult};
use crate::gateway::{ContractGateway, RpcGateway};
use crate::models::{Address, ComposeDraft, MessageRef};
use crate::rpc::JsonRpcClient;
use crate::store::AppState;
use crate::views::Tab;
use crate::wallet::{RpcWallet, WalletProvider};
use crate::worker::{DataChange, MailCommand, MailWorker, Responder};

/// Cheap, cloneable sender side of the worker.
#[derive(Clone)]
pub struct CoreHandle {
    command_tx: Sender<MailCommand>,
    state: Arc<RwLock<AppState>>,
}

impl CoreHandle {
    pub fn send(&self, command: MailCommand) -> Result<(), mpsc::SendError<MailCommand>> {
        self.command_tx.send(command)
    }

    /// Send a command and block until the worker answers it.
    fn request(&self, build: impl FnOnce(Option<Responder>) -> MailCommand) -> MailResult<()> {
        let (tx, rx) = mpsc::channel();
        self.send(build(Some(tx)))
            .map_err(|_| MailError::WorkerStopped)?;
        rx.recv().unwrap_or(Err(MailError::WorkerStopped))
    }

    /// Mutations are refused while another operation is pending, including
    /// the reload that follows a switch of the active wallet account.
    fn mutate(&self, build: impl FnOnce(Option<Responder>) -> MailCommand) -> MailResult<()> {
        if self.state.read().is_busy() {
            return Err(MailError::Busy);
        }
        self.request(build)
    }

    pub fn check_session(&self) -> MailResult<()> {
        self.request(|response_tx| MailCommand::CheckSession { response_tx })
    }

    pub fn connect(&self) -> MailResult<()> {
        self.request(|response_tx| MailCommand::Connect { response_tx })
    }

    pub fn disconnect(&self) -> MailResult<()> {
        self.request(|response_tx| MailCommand::Disconnect { response_tx })
    }

    pub fn switch_account(&self, address: Address) -> MailResult<()> {
        self.mutate(|response_tx| MailCommand::SwitchAccount { address, response_tx })
    }

    pub fn refresh(&self) -> MailResult<()> {
        self.request(|response_tx| MailCommand::Refresh { response_tx })
    }

    pub fn send_email(&self, draft: ComposeDraft) -> MailResult<()> {
        self.mutate(|response_tx| MailCommand::Send { draft, response_tx })
    }

    pub fn star(&self, target: MessageRef) -> MailResult<()> {
        self.mutate(|response_tx| MailCommand::Star { target, response_tx })
    }

    pub fn unstar(&self, target: MessageRef) -> MailResult<()> {
        self.mutate(|response_tx| MailCommand::Unstar { target, response_tx })
    }

    pub fn delete(&self, target: MessageRef) -> MailResult<()> {
        self.mutate(|response_tx| MailCommand::Delete { target, response_tx })
    }

    pub fn update_profile(&self, name: impl Into<String>, avatar: impl Into<String>) -> MailResult<()> {
        let (name, avatar) = (name.into(), avatar.into());
        self.mutate(|response_tx| MailCommand::UpdateProfile {
            name,
            avatar,
            response_tx,
        })
    }

    pub fn add_contact(&self, name: impl Into<String>, address: impl Into<String>, avatar: Option<String>) -> MailResult<()> {
        let (name, address) = (name.into(), address.into());
        self.request(|response_tx| MailCommand::AddContact {
            name,
            address,
            avatar,
            response_tx,
        })
    }

    pub fn select_tab(&self, tab: Tab) -> MailResult<()> {
        self.request(|response_tx| MailCommand::SelectTab { tab, response_tx })
    }

    pub fn set_search(&self, query: impl Into<String>) -> MailResult<()> {
        let query = query.into();
        self.request(|response_tx| MailCommand::SetSearch { query, response_tx })
    }

    pub fn edit_compose(&self, draft: ComposeDraft) -> MailResult<()> {
        self.request(|response_tx| MailCommand::EditCompose { draft, response_tx })
    }
}

/// Owns the worker thread and the state it publishes.
pub struct CoreRuntime {
    state: Arc<RwLock<AppState>>,
    data_rx: Option<Receiver<DataChange>>,
    handle: CoreHandle,
    worker_handle: Option<JoinHandle<()>>,
}

impl CoreRuntime {
    /// Runtime backed by the configured JSON-RPC endpoint for both the
    /// wallet and the contract.
    pub fn new(config: CoreConfig) -> std::io::Result<Self> {
        let client = Arc::new(JsonRpcClient::new(config.rpc_url.clone()));
        let wallet = Arc::new(RpcWallet::new(client.clone()));
        let gateway = Arc::new(RpcGateway::new(client, &config));
        Self::with_backends(config, wallet, gateway)
    }

    pub fn with_backends(
        config: CoreConfig,
        wallet: Arc<dyn WalletProvider>,
        gateway: Arc<dyn ContractGateway>,
    ) -> std::io::Result<Self> {
        let state = Arc::new(RwLock::new(AppState::new()));
        let (command_tx, command_rx) = mpsc::channel::<MailCommand>();
        let (data_tx, data_rx) = mpsc::channel::<DataChange>();

        let worker = MailWorker::new(
            wallet,
            gateway,
            state.clone(),
            data_tx,
            command_rx,
            config.account_poll_interval,
        );
        let worker_handle = std::thread::Builder::new()
            .name("mail-worker".to_string())
            .spawn(move || worker.run())?;

        Ok(Self {
            state: state.clone(),
            data_rx: Some(data_rx),
            handle: CoreHandle { command_tx, state },
            worker_handle: Some(worker_handle),
        })
    }

    pub fn handle(&self) -> CoreHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> Arc<RwLock<AppState>> {
        self.state.clone()
    }

    pub fn take_data_rx(&mut self) -> Option<Receiver<DataChange>> {
        self.data_rx.take()
    }

    pub fn shutdown(&mut self) {
        let _ = self.handle.send(MailCommand::Shutdown);
        if let Some(worker_handle) = self.worker_handle.take() {
            let _ = worker_handle.join();
        }
    }
}
