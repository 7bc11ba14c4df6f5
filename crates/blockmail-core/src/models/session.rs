use serde::Serialize;

use super::Address;

/// Local record of the wallet connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Session {
    pub connected: bool,
    pub address: Option<Address>,
    pub accounts: Vec<Address>,
}

impl Session {
    /// Connect with the given accounts; the first one becomes active.
    /// An empty list leaves the session disconnected.
    pub fn connect(&mut self, accounts: Vec<Address>) {
        self.address = accounts.first().copied();
        self.connected = self.address.is_some();
        self.accounts = accounts;
    }

    pub fn disconnect(&mut self) {
        *self = Session::default();
    }

    /// Make another already-authorized account active.
    pub fn switch_to(&mut self, address: Address) -> bool {
        if self.connected && self.accounts.contains(&address) {
            self.address = Some(address);
            true
        } else {
            false
        }
    }

    pub fn active(&self) -> Option<Address> {
        if self.connected {
            self.address
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_uses_first_account() {
        let a = Address::new([1; 20]);
        let b = Address::new([2; 20]);
        let mut session = Session::default();
        session.connect(vec![a, b]);
        assert!(session.connected);
        assert_eq!(session.active(), Some(a));

        assert!(session.switch_to(b));
        assert_eq!(session.active(), Some(b));
        assert!(!session.switch_to(Address::new([3; 20])));

        session.disconnect();
        assert_eq!(session, Session::default());
    }

    #[test]
    fn test_connect_with_no_accounts_stays_disconnected() {
        let mut session = Session::default();
        session.connect(Vec::new());
        assert!(!session.connected);
        assert!(session.active().is_none());
    }
}
