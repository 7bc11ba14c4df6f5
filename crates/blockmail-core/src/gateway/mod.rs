//! Contract Gateway: one typed operation per mail-contract interaction.
//!
//! Implementations provide the raw contract calls; the list filtering and
//! compose validation that every implementation must share live in the
//! provided methods of [`ContractGateway`].

pub mod memory;
pub mod rpc;

use async_trait::async_trait;

use crate::error::MailResult;
use crate::models::{live_entries, Address, ComposeDraft, MailEntry, Mailbox, Message, Profile};

pub use memory::{InMemoryMailContract, Operation};
pub use rpc::RpcGateway;

#[async_trait]
pub trait ContractGateway: Send + Sync {
    /// `sendEmail`; resolves once the transaction is confirmed.
    async fn send_email(&self, caller: Address, to: Address, subject: &str, body: &str) -> MailResult<()>;

    /// Raw `getSentEmails` result, soft-deleted entries included.
    async fn sent_emails(&self, caller: Address) -> MailResult<Vec<Message>>;

    /// Raw `getReceivedEmails` result, soft-deleted entries included.
    async fn received_emails(&self, caller: Address) -> MailResult<Vec<Message>>;

    async fn starred_emails(&self, caller: Address) -> MailResult<Vec<Message>>;

    async fn star(&self, caller: Address, index: u64, is_sent: bool) -> MailResult<()>;

    async fn unstar(&self, caller: Address, index: u64, is_sent: bool) -> MailResult<()>;

    async fn delete(&self, caller: Address, index: u64, is_sent: bool) -> MailResult<()>;

    async fn get_profile(&self, caller: Address, address: Address) -> MailResult<Profile>;

    async fn update_profile(&self, caller: Address, name: &str, avatar: &str) -> MailResult<()>;

    /// Validate the compose form, then submit it. A validation failure never
    /// reaches the contract.
    async fn send(&self, caller: Address, draft: &ComposeDraft) -> MailResult<()> {
        let to = draft.validate()?;
        self.send_email(caller, to, &draft.subject, &draft.body).await
    }

    async fn list_sent(&self, caller: Address) -> MailResult<Vec<MailEntry>> {
        Ok(live_entries(self.sent_emails(caller).await?, Mailbox::Sent))
    }

    async fn list_received(&self, caller: Address) -> MailResult<Vec<MailEntry>> {
        Ok(live_entries(self.received_emails(caller).await?, Mailbox::Received))
    }

    /// Returned exactly as the contract reports it: no soft-delete filter.
    async fn list_starred(&self, caller: Address) -> MailResult<Vec<Message>> {
        self.starred_emails(caller).await
    }
}
