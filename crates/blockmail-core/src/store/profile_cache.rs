use crate::error::MailResult;
use crate::gateway::ContractGateway;
use crate::models::{Address, Profile};

/// Profile of the active account. Only one entry is kept; it is replaced on
/// account change and dropped on disconnect.
#[derive(Debug, Default)]
pub struct ProfileCache {
    entry: Option<(Address, Profile)>,
}

impl ProfileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, address: Address) -> Option<&Profile> {
        match &self.entry {
            Some((cached, profile)) if *cached == address => Some(profile),
            _ => None,
        }
    }

    /// Cached profile for `address`, fetching it on a miss. A failed fetch
    /// leaves the cache as it was.
    pub async fn load(&mut self, gateway: &dyn ContractGateway, address: Address) -> MailResult<Profile> {
        if let Some(profile) = self.get(address) {
            return Ok(profile.clone());
        }
        self.fetch(gateway, address).await
    }

    /// Always re-read from the contract.
    pub async fn fetch(&mut self, gateway: &dyn ContractGateway, address: Address) -> MailResult<Profile> {
        let profile = gateway.get_profile(address, address).await?;
        tracing::debug!(%address, exists = profile.exists, "profile loaded");
        self.entry = Some((address, profile.clone()));
        Ok(profile)
    }

    /// Write the profile, then re-read it so the cache reflects the contract.
    pub async fn update(
        &mut self,
        gateway: &dyn ContractGateway,
        address: Address,
        name: &str,
        avatar: &str,
    ) -> MailResult<Profile> {
        gateway.update_profile(address, name, avatar).await?;
        self.fetch(gateway, address).await
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }
}
