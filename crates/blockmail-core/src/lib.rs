pub mod abi;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod gateway;
pub mod models;
pub mod rpc;
pub mod runtime;
pub mod search;
pub mod store;
pub mod sync;
pub mod views;
pub mod wallet;
pub mod worker;

pub use config::CoreConfig;
pub use error::{MailError, MailResult};
pub use runtime::{CoreHandle, CoreRuntime};
pub use worker::{DataChange, MailCommand};
