use std::io::{BufRead, Write};
use std::sync::mpsc::Receiver;

use anyhow::Result;
use blockmail_core::events::Notification;
use blockmail_core::models::{Address, ComposeDraft};
use blockmail_core::views::{DashboardView, Tab};
use blockmail_core::{CoreRuntime, DataChange, MailError, MailResult};

use super::render::{cards, detail, status_json};

const HELP: &str = "\
Commands:
  inbox | sent | starred | drafts | trash   switch tab and list it
  list                                      list the current view
  search [QUERY]                            search sent and received (empty clears)
  open N                                    show message N of the current view
  star N | unstar N | delete N              act on message N of the current view
  compose TO SUBJECT BODY                   fill the compose form
  to ADDR | subject TEXT | body TEXT        edit one compose field
  draft                                     show the compose form
  send                                      send the compose form
  profile                                   show your profile
  profile set NAME [AVATAR]                 update your profile
  contacts                                  list contacts
  contact add NAME ADDRESS [AVATAR]         add a contact
  accounts | switch ADDRESS                 list or switch wallet accounts
  connect | disconnect | refresh | status
  help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Help,
    Quit,
    Status,
    Connect,
    Disconnect,
    Refresh,
    Tab(Tab),
    List,
    Search(String),
    Open(usize),
    Star(usize),
    Unstar(usize),
    Delete(usize),
    Compose(ComposeDraft),
    SetTo(String),
    SetSubject(String),
    SetBody(String),
    ShowDraft,
    Send,
    ShowProfile,
    SetProfile { name: String, avatar: String },
    Contacts,
    AddContact {
        name: String,
        address: String,
        avatar: Option<String>,
    },
    Accounts,
    Switch(Address),
}

/// Split a line into words; double quotes group words and `\"` escapes.
pub fn tokenize(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quoted = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                quoted = !quoted;
                in_word = true;
            }
            '\\' if quoted => match chars.next() {
                Some(next) => current.push(next),
                None => return Err("dangling escape".to_string()),
            },
            c if c.is_whitespace() && !quoted => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if quoted {
        return Err("unterminated quote".to_string());
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

fn position(arg: Option<&String>) -> Result<usize, String> {
    let arg = arg.ok_or("missing message number")?;
    match arg.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("not a message number: {}", arg)),
    }
}

pub fn parse_line(line: &str) -> Result<Option<ShellCommand>, String> {
    let words = tokenize(line)?;
    let Some((head, args)) = words.split_first() else {
        return Ok(None);
    };
    let rest = || args.join(" ");

    let command = match head.to_ascii_lowercase().as_str() {
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        "status" => ShellCommand::Status,
        "connect" => ShellCommand::Connect,
        "disconnect" => ShellCommand::Disconnect,
        "refresh" => ShellCommand::Refresh,
        "list" | "ls" => ShellCommand::List,
        "search" => ShellCommand::Search(rest()),
        "open" => ShellCommand::Open(position(args.first())?),
        "star" => ShellCommand::Star(position(args.first())?),
        "unstar" => ShellCommand::Unstar(position(args.first())?),
        "delete" | "rm" => ShellCommand::Delete(position(args.first())?),
        "compose" => match args {
            [to, subject, body @ ..] => ShellCommand::Compose(ComposeDraft::new(
                to.as_str(),
                subject.as_str(),
                body.join(" "),
            )),
            _ => return Err("usage: compose TO SUBJECT BODY".to_string()),
        },
        "to" => ShellCommand::SetTo(rest()),
        "subject" => ShellCommand::SetSubject(rest()),
        "body" => ShellCommand::SetBody(rest()),
        "draft" => ShellCommand::ShowDraft,
        "send" => ShellCommand::Send,
        "profile" => match args {
            [] => ShellCommand::ShowProfile,
            [set, name] if set == "set" => ShellCommand::SetProfile {
                name: name.clone(),
                avatar: String::new(),
            },
            [set, name, avatar] if set == "set" => ShellCommand::SetProfile {
                name: name.clone(),
                avatar: avatar.clone(),
            },
            _ => return Err("usage: profile set NAME [AVATAR]".to_string()),
        },
        "contacts" => ShellCommand::Contacts,
        "contact" => match args {
            [add, name, address] if add == "add" => ShellCommand::AddContact {
                name: name.clone(),
                address: address.clone(),
                avatar: None,
            },
            [add, name, address, avatar] if add == "add" => ShellCommand::AddContact {
                name: name.clone(),
                address: address.clone(),
                avatar: Some(avatar.clone()),
            },
            _ => return Err("usage: contact add NAME ADDRESS [AVATAR]".to_string()),
        },
        "accounts" => ShellCommand::Accounts,
        "switch" => {
            let arg = args.first().ok_or("usage: switch ADDRESS")?;
            ShellCommand::Switch(arg.parse().map_err(|e| format!("{}", e))?)
        }
        other => match other.parse::<Tab>() {
            Ok(tab) => ShellCommand::Tab(tab),
            Err(_) => return Err(format!("unknown command: {} (try help)", other)),
        },
    };
    Ok(Some(command))
}

/// Interactive dashboard over stdin/stdout. Notifications go to stderr.
pub fn run_shell(runtime: &mut CoreRuntime) -> Result<()> {
    let data_rx = runtime.take_data_rx();
    let handle = runtime.handle();
    let state = runtime.state();
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    if let Err(e) = handle.check_session() {
        flush_notifications(data_rx.as_ref());
        return Err(e.into());
    }
    flush_notifications(data_rx.as_ref());
    if !state.read().session.connected {
        println!("No wallet session. Type `connect` to authorize this client.");
    }
    println!("Type `help` for commands.");

    loop {
        print!("blockmail> ");
        stdout.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let command = match parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };
        if command == ShellCommand::Quit {
            break;
        }

        let result = run_command(runtime, command);
        flush_notifications(data_rx.as_ref());
        match result {
            Ok(()) => {}
            Err(e @ MailError::WalletUnavailable { .. }) => return Err(e.into()),
            // Already reported as a notification
            Err(_) => {}
        }
    }
    Ok(())
}

fn run_command(runtime: &CoreRuntime, command: ShellCommand) -> MailResult<()> {
    let handle = runtime.handle();
    let state = runtime.state();

    match command {
        ShellCommand::Help => println!("{}", HELP),
        ShellCommand::Quit => {}
        ShellCommand::Status => print_json(&status_json(&state.read())),
        ShellCommand::Connect => {
            handle.connect()?;
            print_view(runtime);
        }
        ShellCommand::Disconnect => {
            handle.disconnect()?;
            println!("Disconnected.");
        }
        ShellCommand::Refresh => {
            handle.refresh()?;
            print_view(runtime);
        }
        ShellCommand::Tab(tab) => {
            handle.select_tab(tab)?;
            print_view(runtime);
        }
        ShellCommand::List => print_view(runtime),
        ShellCommand::Search(query) => {
            handle.set_search(query)?;
            print_view(runtime);
        }
        ShellCommand::Open(n) => {
            let state = state.read();
            let view = state.view();
            match cards(&view, state.session.active().as_ref()).get(n - 1) {
                Some(card) => println!("{}", detail(card)),
                None => eprintln!("No message {} in this view", n),
            }
        }
        ShellCommand::Star(n) => {
            handle.star(target_at(runtime, n)?)?;
            print_view(runtime);
        }
        ShellCommand::Unstar(n) => {
            handle.unstar(target_at(runtime, n)?)?;
            print_view(runtime);
        }
        ShellCommand::Delete(n) => {
            handle.delete(target_at(runtime, n)?)?;
            print_view(runtime);
        }
        ShellCommand::Compose(draft) => handle.edit_compose(draft)?,
        ShellCommand::SetTo(to) => edit_draft(runtime, |draft| draft.to = to)?,
        ShellCommand::SetSubject(subject) => edit_draft(runtime, |draft| draft.subject = subject)?,
        ShellCommand::SetBody(body) => edit_draft(runtime, |draft| draft.body = body)?,
        ShellCommand::ShowDraft => {
            let draft = state.read().compose.clone();
            println!("To: {}\nSubject: {}\n\n{}", draft.to, draft.subject, draft.body);
        }
        ShellCommand::Send => {
            let draft = state.read().compose.clone();
            handle.send_email(draft)?;
        }
        ShellCommand::ShowProfile => {
            let state = state.read();
            let address = state.session.active();
            match (&address, &state.profile) {
                (Some(address), Some(profile)) => println!(
                    "{} ({})\nAvatar: {}",
                    profile.display_name().unwrap_or("Unnamed"),
                    address,
                    profile.avatar.as_deref().unwrap_or("-")
                ),
                (Some(address), None) => println!("{} (profile not loaded)", address),
                (None, _) => println!("Not connected"),
            }
        }
        ShellCommand::SetProfile { name, avatar } => handle.update_profile(name, avatar)?,
        ShellCommand::Contacts => {
            let state = state.read();
            if state.contacts.is_empty() {
                println!("No contacts");
            }
            for contact in state.contacts.all() {
                println!("{}  {}", contact.name, contact.address);
            }
        }
        ShellCommand::AddContact {
            name,
            address,
            avatar,
        } => handle.add_contact(name, address, avatar)?,
        ShellCommand::Accounts => {
            let state = state.read();
            for account in &state.session.accounts {
                let marker = if state.session.active() == Some(*account) { "*" } else { " " };
                println!("{} {}", marker, account);
            }
        }
        ShellCommand::Switch(address) => {
            handle.switch_account(address)?;
            print_view(runtime);
        }
    }
    Ok(())
}

/// The mutation target behind position `n` of the current view.
fn target_at(runtime: &CoreRuntime, n: usize) -> MailResult<blockmail_core::models::MessageRef> {
    let state = runtime.state();
    let state = state.read();
    let view = state.view();
    match view.items().get(n - 1) {
        Some(item) => item
            .target
            .ok_or_else(|| MailError::validation("message", "this message can no longer be modified")),
        None => Err(MailError::validation("message", format!("no message {} in this view", n))),
    }
}

fn edit_draft(runtime: &CoreRuntime, edit: impl FnOnce(&mut ComposeDraft)) -> MailResult<()> {
    let mut draft = runtime.state().read().compose.clone();
    edit(&mut draft);
    runtime.handle().edit_compose(draft)
}

fn print_view(runtime: &CoreRuntime) {
    let state = runtime.state();
    let state = state.read();
    let view = state.view();
    match &view {
        DashboardView::Messages(_) => {
            println!("-- {} --", state.tab);
            for card in cards(&view, state.session.active().as_ref()) {
                println!("{}", card.line());
            }
        }
        other => {
            if let Some(notice) = other.notice() {
                println!("{}", notice);
            }
        }
    }
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Failed to render output: {}", e),
    }
}

fn flush_notifications(data_rx: Option<&Receiver<DataChange>>) {
    let Some(rx) = data_rx else {
        return;
    };
    for change in rx.try_iter() {
        match change {
            DataChange::Notification(notification) => print_notification(&notification),
            DataChange::SessionLost(e) => eprintln!("Session ended: {}", e),
            DataChange::AccountChanged(_) | DataChange::StateUpdated => {}
        }
    }
}

fn print_notification(notification: &Notification) {
    eprintln!("[{}] {}", notification.title, notification.description);
}
