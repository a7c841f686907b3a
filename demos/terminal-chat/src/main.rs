use parley::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

const DEFAULT_BROKER_ADDR: &str = "127.0.0.1:9001";

const USAGE: &str = "usage: terminal-chat [chat | broker [ADDR]]";

const HELP: &str = "\
/join ROOM     switch to ROOM (created if unknown)
/create ROOM   add ROOM and switch to it
/nick NAME     change account name
/who           members of the current room
/rooms         known rooms
/quit          leave
anything else is sent to the current room";

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Join(String),
    Create(String),
    Nick(String),
    Who,
    Rooms,
    Help,
    Quit,
    Say(String),
    Unknown(String),
}

fn parse_input(line: &str) -> Option<Input> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Some(Input::Say(line.to_string()));
    };

    let (verb, arg) = match command.split_once(char::is_whitespace) {
        Some((verb, arg)) => (verb, arg.trim()),
        None => (command, ""),
    };
    let input = match (verb, arg) {
        ("join", room) if !room.is_empty() => Input::Join(room.to_string()),
        ("create", room) if !room.is_empty() => Input::Create(room.to_string()),
        ("nick", name) if !name.is_empty() => Input::Nick(name.to_string()),
        ("who", _) => Input::Who,
        ("rooms", _) => Input::Rooms,
        ("help", _) => Input::Help,
        ("quit", _) => Input::Quit,
        _ => Input::Unknown(line.to_string()),
    };
    Some(input)
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn format_members(snapshot: &SessionSnapshot) -> String {
    let Some(room) = snapshot.current() else {
        return String::from("(no room)");
    };
    let mut members: Vec<&MemberInfo> = room.members().values().collect();
    members.sort_by(|a, b| a.account.as_str().cmp(b.account.as_str()));
    members
        .iter()
        .map(|m| {
            let state = if m.online { "online" } else { "offline" };
            format!("  {} ({state})", m.account)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_rooms(snapshot: &SessionSnapshot) -> String {
    snapshot
        .rooms
        .room_names()
        .map(|name| {
            let marker = if *name == snapshot.current_room { '*' } else { ' ' };
            format!("{marker} {name}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prints messages and presence changes of the current room as they arrive.
async fn print_updates(mut snapshots: watch::Receiver<SessionSnapshot>) {
    let mut room = String::new();
    let mut printed = 0;
    let mut online: Vec<String> = Vec::new();

    loop {
        let snapshot = snapshots.borrow_and_update().clone();
        if let Some(current) = snapshot.current() {
            if snapshot.current_room.as_str() != room {
                room = snapshot.current_room.to_string();
                printed = 0;
                online.clear();
                println!("-- {room} --");
            }
            for message in current.messages().get(printed..).unwrap_or_default() {
                println!("[{room}] {}: {}", message.sender, message.text);
            }
            printed = current.messages().len();

            let now_online: Vec<String> =
                current.online_members().iter().map(|a| a.to_string()).collect();
            if now_online != online {
                println!("* online: {}", now_online.join(", "));
                online = now_online;
            }
        }

        if snapshots.changed().await.is_err() {
            break;
        }
    }
}

// ---------------------------------------------------------------------------
// Modes
// ---------------------------------------------------------------------------

async fn run_broker(addr: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::from_env()?;
    let mut broker = WsBroker::bind(addr).await?;
    if !config.credentials.is_anonymous() {
        broker = broker.require_credentials(config.credentials);
    }
    eprintln!("broker listening on ws://{}", broker.local_addr()?);
    broker.run().await?;
    Ok(())
}

async fn run_chat() -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::from_env()?;
    let chat = ClientBuilder::new().connect(&config).await?;
    eprintln!("joined as {} (type /help)", chat.snapshot().account);

    let printer = tokio::spawn(print_updates(chat.watch()));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let Some(input) = parse_input(&line) else {
            continue;
        };
        let result = match input {
            Input::Join(room) => chat.open_room(&room).await,
            Input::Create(room) => chat.add_room(&room).await,
            Input::Nick(name) => chat.change_account_name(&name).await,
            Input::Say(text) => match chat.change_draft(text).await {
                Ok(()) => chat.send_draft().await,
                Err(e) => Err(e),
            },
            Input::Who => {
                println!("{}", format_members(&chat.snapshot()));
                Ok(())
            }
            Input::Rooms => {
                println!("{}", format_rooms(&chat.snapshot()));
                Ok(())
            }
            Input::Help => {
                println!("{HELP}");
                Ok(())
            }
            Input::Unknown(line) => {
                eprintln!("! unknown command: {line}");
                Ok(())
            }
            Input::Quit => break,
        };
        if let Err(e) = result {
            eprintln!("! {e}");
            if matches!(e, SessionError::Unavailable) {
                break;
            }
        }
    }

    if let Err(e) = chat.shutdown().await {
        tracing::debug!(error = %e, "session already stopped");
    }
    printer.abort();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    parley::logging::init("warn");

    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        None | Some("chat") => run_chat().await,
        Some("broker") => {
            let addr = args.next().unwrap_or_else(|| DEFAULT_BROKER_ADDR.to_string());
            run_broker(&addr).await
        }
        Some(_) => {
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    }
}
