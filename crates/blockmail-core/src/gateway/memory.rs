use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::ContractGateway;
use crate::error::{MailError, MailResult};
use crate::models::{Address, Message, Profile};

/// Contract operations, used to inject failures and count calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Send,
    ListSent,
    ListReceived,
    ListStarred,
    Star,
    Unstar,
    Delete,
    GetProfile,
    UpdateProfile,
}

#[derive(Debug, Default)]
struct Mailboxes {
    sent: Vec<Message>,
    received: Vec<Message>,
}

#[derive(Default)]
struct ContractState {
    mailboxes: HashMap<Address, Mailboxes>,
    profiles: HashMap<Address, Profile>,
    failures: HashSet<Operation>,
    delays: HashMap<Operation, Duration>,
    calls: HashMap<Operation, usize>,
}

/// Mail contract simulated in process memory, with the same per-caller list
/// and soft-delete semantics as the deployed contract.
pub struct InMemoryMailContract {
    state: Mutex<ContractState>,
    clock: AtomicU64,
}

impl Default for InMemoryMailContract {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMailContract {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ContractState::default()),
            clock: AtomicU64::new(1_700_000_000),
        }
    }

    /// Make the next call of `op` revert.
    pub fn fail_next(&self, op: Operation) {
        self.state.lock().failures.insert(op);
    }

    /// Delay every call of `op` before it touches contract state.
    pub fn set_delay(&self, op: Operation, delay: Duration) {
        self.state.lock().delays.insert(op, delay);
    }

    pub fn calls(&self, op: Operation) -> usize {
        self.state.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Deliver a message directly, as another account sending to `to`.
    pub fn deliver(&self, from: Address, to: Address, subject: &str, content: &str) {
        let timestamp = self.clock.fetch_add(60, Ordering::SeqCst);
        let mut state = self.state.lock();
        push_message(&mut state, from, to, subject, content, timestamp);
    }

    /// Start a call: count it, honor any configured delay, then consume an
    /// injected failure.
    async fn enter(&self, op: Operation) -> MailResult<()> {
        let delay = {
            let mut state = self.state.lock();
            *state.calls.entry(op).or_insert(0) += 1;
            state.delays.get(&op).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.state.lock().failures.remove(&op) {
            return Err(MailError::chain(format!("{:?}: execution reverted", op)));
        }
        Ok(())
    }

    fn update_flag(
        &self,
        caller: Address,
        index: u64,
        is_sent: bool,
        apply: impl FnOnce(&mut Message),
    ) -> MailResult<()> {
        let mut state = self.state.lock();
        let boxes = state.mailboxes.entry(caller).or_default();
        let list = if is_sent { &mut boxes.sent } else { &mut boxes.received };
        let message = usize::try_from(index)
            .ok()
            .and_then(|i| list.get_mut(i))
            .ok_or_else(|| MailError::chain(format!("execution reverted: invalid index {}", index)))?;
        apply(message);
        Ok(())
    }
}

fn push_message(
    state: &mut ContractState,
    from: Address,
    to: Address,
    subject: &str,
    content: &str,
    timestamp: u64,
) {
    let message = Message {
        from,
        to,
        subject: subject.to_string(),
        content: content.to_string(),
        timestamp,
        is_sent: true,
        is_starred: false,
        is_deleted: false,
    };
    let mut received = message.clone();
    received.is_sent = false;
    state.mailboxes.entry(from).or_default().sent.push(message);
    state.mailboxes.entry(to).or_default().received.push(received);
}

#[async_trait]
impl ContractGateway for InMemoryMailContract {
    async fn send_email(&self, caller: Address, to: Address, subject: &str, body: &str) -> MailResult<()> {
        self.enter(Operation::Send).await?;
        let timestamp = self.clock.fetch_add(60, Ordering::SeqCst);
        let mut state = self.state.lock();
        push_message(&mut state, caller, to, subject, body, timestamp);
        Ok(())
    }

    async fn sent_emails(&self, caller: Address) -> MailResult<Vec<Message>> {
        self.enter(Operation::ListSent).await?;
        let state = self.state.lock();
        Ok(state
            .mailboxes
            .get(&caller)
            .map(|b| b.sent.clone())
            .unwrap_or_default())
    }

    async fn received_emails(&self, caller: Address) -> MailResult<Vec<Message>> {
        self.enter(Operation::ListReceived).await?;
        let state = self.state.lock();
        Ok(state
            .mailboxes
            .get(&caller)
            .map(|b| b.received.clone())
            .unwrap_or_default())
    }

    /// Starred copies from both lists. Soft-deleted entries are not removed
    /// here; clients trust this list as returned.
    async fn starred_emails(&self, caller: Address) -> MailResult<Vec<Message>> {
        self.enter(Operation::ListStarred).await?;
        let state = self.state.lock();
        Ok(state
            .mailboxes
            .get(&caller)
            .map(|b| {
                b.sent
                    .iter()
                    .chain(b.received.iter())
                    .filter(|m| m.is_starred)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn star(&self, caller: Address, index: u64, is_sent: bool) -> MailResult<()> {
        self.enter(Operation::Star).await?;
        self.update_flag(caller, index, is_sent, |m| m.is_starred = true)
    }

    async fn unstar(&self, caller: Address, index: u64, is_sent: bool) -> MailResult<()> {
        self.enter(Operation::Unstar).await?;
        self.update_flag(caller, index, is_sent, |m| m.is_starred = false)
    }

    async fn delete(&self, caller: Address, index: u64, is_sent: bool) -> MailResult<()> {
        self.enter(Operation::Delete).await?;
        self.update_flag(caller, index, is_sent, |m| m.is_deleted = true)
    }

    async fn get_profile(&self, _caller: Address, address: Address) -> MailResult<Profile> {
        self.enter(Operation::GetProfile).await?;
        Ok(self
            .state
            .lock()
            .profiles
            .get(&address)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_profile(&self, caller: Address, name: &str, avatar: &str) -> MailResult<()> {
        self.enter(Operation::UpdateProfile).await?;
        self.state.lock().profiles.insert(
            caller,
            Profile::from_contract(name.to_string(), avatar.to_string(), true),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ComposeDraft, Mailbox};

    fn addr(byte: u8) -> Address {
        Address::new([byte; 20])
    }

    #[tokio::test]
    async fn test_send_lands_in_both_lists() {
        let contract = InMemoryMailContract::new();
        let draft = ComposeDraft::new(addr(2).to_hex(), "Hi", "hello there");
        contract.send(addr(1), &draft).await.unwrap();

        let sent = contract.list_sent(addr(1)).await.unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].message.is_sent);
        assert_eq!(sent[0].mailbox, Mailbox::Sent);

        let received = contract.list_received(addr(2)).await.unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].message.from, addr(1));
        assert!(!received[0].message.is_sent);
    }

    #[tokio::test]
    async fn test_invalid_draft_never_reaches_contract() {
        let contract = InMemoryMailContract::new();
        let draft = ComposeDraft::new(addr(2).to_hex(), "", "body");
        let err = contract.send(addr(1), &draft).await.unwrap_err();
        assert!(matches!(err, MailError::Validation { field: "subject", .. }));
        assert_eq!(contract.calls(Operation::Send), 0);
    }

    #[tokio::test]
    async fn test_soft_delete_filtered_from_sent_and_received_only() {
        let contract = InMemoryMailContract::new();
        contract.deliver(addr(2), addr(1), "first", "a");
        contract.deliver(addr(2), addr(1), "second", "b");
        contract.star(addr(1), 0, false).await.unwrap();
        contract.delete(addr(1), 0, false).await.unwrap();

        let received = contract.list_received(addr(1)).await.unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].index, 1);
        assert_eq!(received[0].message.subject, "second");

        // The starred list is passed through untouched, deleted entry included.
        let starred = contract.list_starred(addr(1)).await.unwrap();
        assert_eq!(starred.len(), 1);
        assert!(starred[0].is_deleted);

        // The sender's copy is unaffected.
        assert_eq!(contract.list_sent(addr(2)).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_index_reverts() {
        let contract = InMemoryMailContract::new();
        let err = contract.star(addr(1), 5, true).await.unwrap_err();
        assert!(matches!(err, MailError::Chain { .. }));
    }

    #[tokio::test]
    async fn test_fail_next_is_consumed_once() {
        let contract = InMemoryMailContract::new();
        contract.fail_next(Operation::ListSent);
        assert!(contract.list_sent(addr(1)).await.is_err());
        assert!(contract.list_sent(addr(1)).await.is_ok());
        assert_eq!(contract.calls(Operation::ListSent), 2);
    }

    #[tokio::test]
    async fn test_profile_round_trip() {
        let contract = InMemoryMailContract::new();
        assert!(!contract.get_profile(addr(1), addr(1)).await.unwrap().exists);
        contract.update_profile(addr(1), "Alice", "").await.unwrap();
        let profile = contract.get_profile(addr(9), addr(1)).await.unwrap();
        assert_eq!(profile.name.as_deref(), Some("Alice"));
        assert!(profile.avatar.is_none());
        assert!(profile.exists);
    }
}
