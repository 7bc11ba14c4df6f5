use std::sync::Arc;

use anyhow::{Context, Result};
use blockmail_core::gateway::InMemoryMailContract;
use blockmail_core::models::{Address, ComposeDraft};
use blockmail_core::wallet::MemoryWallet;
use blockmail_core::{CoreConfig, CoreRuntime, MailError, MailResult};
use serde_json::json;

use super::protocol::CliCommand;
use super::render::{profile_json, status_json, view_json};

pub const DEMO_ACCOUNT: Address = Address::new([0xa1; 20]);
pub const DEMO_SECOND_ACCOUNT: Address = Address::new([0xa2; 20]);
pub const DEMO_PEER: Address = Address::new([0xb0; 20]);

/// Start the core against the configured RPC endpoint, or against an
/// in-process wallet and contract seeded with sample mail.
pub fn build_runtime(config: CoreConfig, demo: bool) -> Result<CoreRuntime> {
    tracing::info!(demo, rpc_url = %config.rpc_url, contract = %config.contract_address, "starting mail runtime");
    let runtime = if demo {
        let wallet = Arc::new(MemoryWallet::authorized(vec![DEMO_ACCOUNT, DEMO_SECOND_ACCOUNT]));
        CoreRuntime::with_backends(config, wallet, Arc::new(demo_contract()))
    } else {
        CoreRuntime::new(config)
    };
    runtime.context("Failed to start mail worker")
}

pub fn demo_contract() -> InMemoryMailContract {
    let contract = InMemoryMailContract::new();
    contract.deliver(
        DEMO_PEER,
        DEMO_ACCOUNT,
        "Welcome to BlockMail",
        "Messages live on-chain. Star, search and delete them from here.",
    );
    contract.deliver(
        DEMO_ACCOUNT,
        DEMO_PEER,
        "Lunch on Friday?",
        "Noon at the usual place works for me.",
    );
    contract.deliver(
        DEMO_PEER,
        DEMO_ACCOUNT,
        "Invoice #42",
        "Please find the invoice for last month attached.",
    );
    contract.deliver(DEMO_PEER, DEMO_SECOND_ACCOUNT, "Second account", "Hello from the other side.");
    contract
}

/// Run one command against a started runtime and return its JSON result.
/// Restores an existing wallet session first.
pub fn execute(runtime: &CoreRuntime, command: CliCommand) -> MailResult<serde_json::Value> {
    let handle = runtime.handle();
    let state = runtime.state();

    if !state.read().session.connected {
        handle.check_session()?;
    }
    if command.requires_session() && !state.read().session.connected {
        return Err(MailError::NotConnected);
    }

    match command {
        CliCommand::Status => {}
        CliCommand::Connect => {
            if !state.read().session.connected {
                handle.connect()?;
            }
        }
        CliCommand::List { tab, search } => {
            handle.select_tab(tab)?;
            handle.set_search(search.unwrap_or_default())?;
            let state = state.read();
            return Ok(view_json(&state.view(), state.session.active().as_ref()));
        }
        CliCommand::Send { to, subject, body } => {
            handle.send_email(ComposeDraft::new(to, subject, body))?;
        }
        CliCommand::Star(target) => handle.star(target)?,
        CliCommand::Unstar(target) => handle.unstar(target)?,
        CliCommand::Delete(target) => handle.delete(target)?,
        CliCommand::Profile { name, avatar } => {
            if name.is_some() || avatar.is_some() {
                let current = state.read().profile.clone().unwrap_or_default();
                handle.update_profile(
                    name.or(current.name).unwrap_or_default(),
                    avatar.or(current.avatar).unwrap_or_default(),
                )?;
            }
            let state = state.read();
            return Ok(profile_json(state.session.active().as_ref(), state.profile.as_ref()));
        }
        CliCommand::SwitchAccount(address) => handle.switch_account(address)?,
    }

    let state = state.read();
    Ok(json!({ "ok": true, "status": status_json(&state) }))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use blockmail_core::views::Tab;

    use super::*;
    use crate::cli::protocol::message_ref;

    fn demo_runtime() -> CoreRuntime {
        let mut config = CoreConfig::default();
        config.account_poll_interval = Duration::from_millis(50);
        build_runtime(config, true).unwrap()
    }

    #[test]
    fn test_demo_session_is_restored() {
        let mut runtime = demo_runtime();
        let result = execute(&runtime, CliCommand::Status).unwrap();
        assert_eq!(result["status"]["connected"], true);
        assert_eq!(result["status"]["address"], DEMO_ACCOUNT.to_hex());
        assert_eq!(result["status"]["received"], 2);
        runtime.shutdown();
    }

    #[test]
    fn test_list_inbox_and_search() {
        let mut runtime = demo_runtime();
        let inbox = execute(
            &runtime,
            CliCommand::List {
                tab: Tab::Inbox,
                search: None,
            },
        )
        .unwrap();
        assert_eq!(inbox["items"].as_array().map(Vec::len), Some(2));
        assert_eq!(inbox["items"][0]["direction"], "From");

        let found = execute(
            &runtime,
            CliCommand::List {
                tab: Tab::Inbox,
                search: Some("lunch".to_string()),
            },
        )
        .unwrap();
        assert_eq!(found["items"].as_array().map(Vec::len), Some(1));
        assert_eq!(found["items"][0]["direction"], "To");

        let none = execute(
            &runtime,
            CliCommand::List {
                tab: Tab::Inbox,
                search: Some("nothing like this".to_string()),
            },
        )
        .unwrap();
        assert_eq!(none["notice"], "No emails found matching your search");
        runtime.shutdown();
    }

    #[test]
    fn test_star_then_list_starred() {
        let mut runtime = demo_runtime();
        execute(&runtime, CliCommand::Star(message_ref(0, false))).unwrap();
        let starred = execute(
            &runtime,
            CliCommand::List {
                tab: Tab::Starred,
                search: None,
            },
        )
        .unwrap();
        assert_eq!(starred["items"][0]["subject"], "Welcome to BlockMail");
        assert_eq!(starred["items"][0]["mailbox"], "received");
        runtime.shutdown();
    }

    #[test]
    fn test_send_with_missing_subject_is_rejected() {
        let mut runtime = demo_runtime();
        let err = execute(
            &runtime,
            CliCommand::Send {
                to: DEMO_PEER.to_hex(),
                subject: String::new(),
                body: "body".to_string(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, MailError::Validation { field: "subject", .. }));
        runtime.shutdown();
    }

    #[test]
    fn test_profile_update_keeps_unset_fields() {
        let mut runtime = demo_runtime();
        execute(
            &runtime,
            CliCommand::Profile {
                name: Some("Alice".to_string()),
                avatar: Some("https://example.org/a.png".to_string()),
            },
        )
        .unwrap();
        let profile = execute(
            &runtime,
            CliCommand::Profile {
                name: Some("Alice B".to_string()),
                avatar: None,
            },
        )
        .unwrap();
        assert_eq!(profile["name"], "Alice B");
        assert_eq!(profile["avatar"], "https://example.org/a.png");
        assert_eq!(profile["exists"], true);
        runtime.shutdown();
    }

    #[test]
    fn test_switch_account() {
        let mut runtime = demo_runtime();
        execute(&runtime, CliCommand::SwitchAccount(DEMO_SECOND_ACCOUNT)).unwrap();
        let inbox = execute(
            &runtime,
            CliCommand::List {
                tab: Tab::Inbox,
                search: None,
            },
        )
        .unwrap();
        assert_eq!(inbox["items"][0]["subject"], "Second account");
        assert_eq!(inbox["items"][0]["mailbox"], "received");
        runtime.shutdown();
    }
}
