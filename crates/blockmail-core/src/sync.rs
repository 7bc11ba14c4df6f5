//! Synchronization Controller: keeps the sent/received/starred caches in
//! step with the contract.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::error::MailResult;
use crate::gateway::ContractGateway;
use crate::models::{Address, MailEntry, Mailbox, Message, MessageRef};

/// The three list caches from one completed refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MailboxSnapshot {
    pub sent: Vec<MailEntry>,
    pub received: Vec<MailEntry>,
    pub starred: Vec<Message>,
    /// Increases by one per completed refresh; 0 means never fetched
    pub generation: u64,
}

impl MailboxSnapshot {
    pub fn entries(&self, mailbox: Mailbox) -> &[MailEntry] {
        match mailbox {
            Mailbox::Sent => &self.sent,
            Mailbox::Received => &self.received,
        }
    }

    /// Sent followed by received, the order search results use.
    pub fn all_entries(&self) -> impl Iterator<Item = &MailEntry> {
        self.sent.iter().chain(self.received.iter())
    }

    /// Find the sent/received copy a starred message refers to. The starred
    /// list carries no index of its own.
    pub fn resolve_starred(&self, message: &Message) -> Option<MessageRef> {
        self.entries(Mailbox::from_is_sent(message.is_sent))
            .iter()
            .find(|entry| entry.message.same_message(message))
            .map(MailEntry::reference)
    }
}

pub struct SyncController {
    gateway: Arc<dyn ContractGateway>,
    cache: RwLock<MailboxSnapshot>,
    /// Held for the whole of a refresh; a second refresh waits its turn.
    in_flight: tokio::sync::Mutex<()>,
    generation: AtomicU64,
}

impl SyncController {
    pub fn new(gateway: Arc<dyn ContractGateway>) -> Self {
        Self {
            gateway,
            cache: RwLock::new(MailboxSnapshot::default()),
            in_flight: tokio::sync::Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn gateway(&self) -> &Arc<dyn ContractGateway> {
        &self.gateway
    }

    /// Fetch all three lists concurrently and swap them in together. On any
    /// failure the previous cache is left untouched.
    pub async fn refresh(&self, caller: Address) -> MailResult<MailboxSnapshot> {
        let _guard = self.in_flight.lock().await;

        let (sent, received, starred) = futures::try_join!(
            self.gateway.list_sent(caller),
            self.gateway.list_received(caller),
            self.gateway.list_starred(caller),
        )
        .map_err(|e| {
            tracing::warn!(%caller, error = %e, "refresh failed, keeping previous cache");
            e
        })?;

        let snapshot = MailboxSnapshot {
            sent,
            received,
            starred,
            generation: self.generation.fetch_add(1, Ordering::SeqCst) + 1,
        };
        *self.cache.write() = snapshot.clone();
        tracing::debug!(
            %caller,
            generation = snapshot.generation,
            sent = snapshot.sent.len(),
            received = snapshot.received.len(),
            starred = snapshot.starred.len(),
            "mailbox refreshed"
        );
        Ok(snapshot)
    }

    pub fn snapshot(&self) -> MailboxSnapshot {
        self.cache.read().clone()
    }

    pub fn is_refreshing(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    /// Drop cached lists, e.g. on disconnect or account change.
    pub fn clear(&self) {
        *self.cache.write() = MailboxSnapshot::default();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::MailError;
    use crate::gateway::{InMemoryMailContract, Operation};

    fn addr(byte: u8) -> Address {
        Address::new([byte; 20])
    }

    fn controller() -> (Arc<InMemoryMailContract>, Arc<SyncController>) {
        let contract = Arc::new(InMemoryMailContract::new());
        let sync = Arc::new(SyncController::new(contract.clone()));
        (contract, sync)
    }

    #[tokio::test]
    async fn test_refresh_populates_all_lists() {
        let (contract, sync) = controller();
        contract.deliver(addr(0xb), addr(0xa), "Hi", "hello");
        contract.deliver(addr(0xa), addr(0xc), "Re", "reply");

        let snapshot = sync.refresh(addr(0xa)).await.unwrap();
        assert_eq!(snapshot.generation, 1);
        assert_eq!(snapshot.received.len(), 1);
        assert_eq!(snapshot.received[0].message.from, addr(0xb));
        assert_eq!(snapshot.sent.len(), 1);
        assert!(snapshot.starred.is_empty());
        assert_eq!(sync.snapshot(), snapshot);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_cache() {
        let (contract, sync) = controller();
        contract.deliver(addr(0xb), addr(0xa), "Hi", "hello");
        let before = sync.refresh(addr(0xa)).await.unwrap();

        contract.deliver(addr(0xb), addr(0xa), "Second", "again");
        contract.fail_next(Operation::ListStarred);
        let err = sync.refresh(addr(0xa)).await.unwrap_err();
        assert!(matches!(err, MailError::Chain { .. }));
        assert_eq!(sync.snapshot(), before);
    }

    #[tokio::test]
    async fn test_star_reflected_after_refresh() {
        let (contract, sync) = controller();
        contract.deliver(addr(0xb), addr(0xa), "Hi", "hello");
        sync.refresh(addr(0xa)).await.unwrap();

        contract.star(addr(0xa), 0, false).await.unwrap();
        let snapshot = sync.refresh(addr(0xa)).await.unwrap();
        assert!(snapshot.received[0].message.is_starred);
        assert_eq!(snapshot.starred.len(), 1);
        assert_eq!(
            snapshot.resolve_starred(&snapshot.starred[0]),
            Some(MessageRef {
                index: 0,
                mailbox: Mailbox::Received
            })
        );

        contract.unstar(addr(0xa), 0, false).await.unwrap();
        let snapshot = sync.refresh(addr(0xa)).await.unwrap();
        assert!(!snapshot.received[0].message.is_starred);
        assert!(snapshot.starred.is_empty());
    }

    #[tokio::test]
    async fn test_delete_reflected_after_refresh() {
        let (contract, sync) = controller();
        contract.deliver(addr(0xb), addr(0xa), "one", "1");
        contract.deliver(addr(0xb), addr(0xa), "two", "2");
        let snapshot = sync.refresh(addr(0xa)).await.unwrap();
        let target = snapshot.received[0].reference();

        contract
            .delete(addr(0xa), target.index, target.mailbox.is_sent())
            .await
            .unwrap();
        let snapshot = sync.refresh(addr(0xa)).await.unwrap();
        assert_eq!(snapshot.received.len(), 1);
        assert_eq!(snapshot.received[0].message.subject, "two");
        assert_eq!(snapshot.received[0].index, 1);
    }

    #[tokio::test]
    async fn test_overlapping_refreshes_never_mix_lists() {
        let (contract, sync) = controller();
        contract.deliver(addr(0xb), addr(0xa), "first", "1");
        // The received read resolves well after the other two.
        contract.set_delay(Operation::ListReceived, Duration::from_millis(50));

        let first = {
            let sync = sync.clone();
            tokio::spawn(async move { sync.refresh(addr(0xa)).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(sync.is_refreshing());

        // Contract state moves on while the first refresh is pending.
        contract.deliver(addr(0xa), addr(0xb), "outgoing", "2");
        contract.deliver(addr(0xb), addr(0xa), "second", "3");
        let second = {
            let sync = sync.clone();
            tokio::spawn(async move { sync.refresh(addr(0xa)).await })
        };

        let first = first.await.unwrap().unwrap();
        let second = second.await.unwrap().unwrap();
        assert_eq!(first.generation + 1, second.generation);
        // Each list is whatever its own read saw: the late received read
        // already includes the second delivery.
        assert_eq!(first.sent.len(), 0);
        assert_eq!(first.received.len(), 2);

        let cache = sync.snapshot();
        assert_eq!(cache, second);
        assert_eq!(cache.sent.len(), 1);
        assert_eq!(cache.received.len(), 2);
    }

    #[test]
    fn test_resolve_starred_without_match() {
        let snapshot = MailboxSnapshot::default();
        let message = Message {
            from: addr(1),
            to: addr(2),
            subject: "s".into(),
            content: "c".into(),
            timestamp: 1,
            is_sent: true,
            is_starred: true,
            is_deleted: false,
        };
        assert!(snapshot.resolve_starred(&message).is_none());
    }
}
