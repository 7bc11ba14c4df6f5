use std::path::PathBuf;

use anyhow::Result;
use blockmail_cli::cli::protocol::message_ref;
use blockmail_cli::cli::{build_runtime, execute, run_shell, CliCommand, CliConfig, Response};
use blockmail_cli::tracing_setup::init_tracing;
use blockmail_core::models::Address;
use blockmail_core::views::Tab;
use blockmail_core::MailError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "blockmail")]
#[command(about = "Read and send mail stored in an on-chain mail contract")]
struct Cli {
    /// Pretty-print JSON output
    #[arg(long, short)]
    pretty: bool,

    /// Path to JSON config file (rpcUrl, contractAddress, ...)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Use an in-process wallet and contract with sample mail
    #[arg(long)]
    demo: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct SearchArgs {
    /// Search sent and received mail instead of listing the tab
    #[arg(long, short)]
    search: Option<String>,
}

#[derive(Args)]
struct TargetArgs {
    /// Contract index of the message
    index: u64,
    /// The index refers to the sent list rather than the received list
    #[arg(long)]
    sent: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show session, profile and mailbox counts
    Status,

    /// Ask the wallet to authorize this client
    Connect,

    /// List received mail
    Inbox(SearchArgs),

    /// List sent mail
    Sent(SearchArgs),

    /// List starred mail
    Starred(SearchArgs),

    /// Send a message
    Send {
        /// Recipient address (0x-prefixed hex)
        to: String,
        subject: String,
        body: String,
    },

    Star(TargetArgs),

    Unstar(TargetArgs),

    /// Soft-delete a message
    Delete(TargetArgs),

    /// Show the profile, or update it when --name or --avatar is given
    Profile {
        #[arg(long, short = 'n')]
        name: Option<String>,
        #[arg(long, short = 'a')]
        avatar: Option<String>,
    },

    /// Make another authorized wallet account active
    Switch {
        address: Address,
    },

    /// Interactive dashboard
    Shell,
}

fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_tracing(config.log_file.as_deref()) {
        eprintln!("Warning: {:#}", e);
    }

    if let Err(e) = run(cli, config) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli, config: CliConfig) -> Result<()> {
    let command = match cli.command {
        Some(Commands::Status) => CliCommand::Status,
        Some(Commands::Connect) => CliCommand::Connect,
        Some(Commands::Inbox(args)) => list(Tab::Inbox, args),
        Some(Commands::Sent(args)) => list(Tab::Sent, args),
        Some(Commands::Starred(args)) => list(Tab::Starred, args),
        Some(Commands::Send { to, subject, body }) => CliCommand::Send { to, subject, body },
        Some(Commands::Star(t)) => CliCommand::Star(message_ref(t.index, t.sent)),
        Some(Commands::Unstar(t)) => CliCommand::Unstar(message_ref(t.index, t.sent)),
        Some(Commands::Delete(t)) => CliCommand::Delete(message_ref(t.index, t.sent)),
        Some(Commands::Profile { name, avatar }) => CliCommand::Profile { name, avatar },
        Some(Commands::Switch { address }) => CliCommand::SwitchAccount(address),
        Some(Commands::Shell) => {
            let mut runtime = build_runtime(config.to_core_config()?, cli.demo)?;
            let result = run_shell(&mut runtime);
            runtime.shutdown();
            if let Err(e) = &result {
                print_hint(e.downcast_ref::<MailError>(), &config);
            }
            return result;
        }
        None => {
            eprintln!("No command specified. Use --help for usage.");
            std::process::exit(1);
        }
    };

    let mut runtime = build_runtime(config.to_core_config()?, cli.demo)?;
    let result = execute(&runtime, command);
    runtime.shutdown();

    let response = match &result {
        Ok(value) => Response::success(value.clone()),
        Err(e) => Response::error(e),
    };
    if cli.pretty {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("{}", serde_json::to_string(&response)?);
    }

    if let Err(e) = result {
        print_hint(Some(&e), &config);
        std::process::exit(1);
    }
    Ok(())
}

fn list(tab: Tab, args: SearchArgs) -> CliCommand {
    CliCommand::List {
        tab,
        search: args.search,
    }
}

fn print_hint(err: Option<&MailError>, config: &CliConfig) {
    match err {
        Some(MailError::WalletUnavailable { .. }) => eprintln!(
            "No wallet reachable at {}. Start a wallet or node RPC endpoint, set rpcUrl in the config, or use --demo.",
            config
                .rpc_url
                .as_deref()
                .unwrap_or(blockmail_core::constants::DEFAULT_RPC_URL)
        ),
        Some(MailError::NotConnected) => eprintln!("Run `blockmail connect` first."),
        _ => {}
    }
}

/// `--config` if given, otherwise the file in the default location if any.
fn load_config(cli: &Cli) -> Result<CliConfig> {
    match &cli.config {
        Some(path) => CliConfig::load(path),
        None => CliConfig::load_default(),
    }
}
