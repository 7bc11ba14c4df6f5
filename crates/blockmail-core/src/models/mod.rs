pub mod address;
pub mod contact;
pub mod draft;
pub mod message;
pub mod profile;
pub mod session;

pub use address::{Address, AddressParseError};
pub use contact::{Contact, ContactBook};
pub use draft::ComposeDraft;
pub use message::{live_entries, MailEntry, Mailbox, Message, MessageRef};
pub use profile::Profile;
pub use session::Session;
