pub mod config;
pub mod executor;
pub mod protocol;
pub mod render;
pub mod shell;

pub use config::CliConfig;
pub use executor::{build_runtime, execute};
pub use protocol::{CliCommand, Response};
pub use shell::run_shell;
