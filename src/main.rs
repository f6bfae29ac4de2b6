use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use teamchat::cli::{parse_input, ChatConsole, Cli, Commands, ConsoleCommand, SessionCommands};
use teamchat::server::{self, AppState};
use teamchat::{
    build_default_team, history, respond_or_apologize, utils, Agent, SessionStore, Settings,
};
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let settings = Settings::new().context("failed to load configuration")?;

    // RUST_LOG wins over the configured level
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind } => handle_serve(settings, bind).await,
        Commands::Chat { message } => handle_chat(settings, message).await,
        Commands::Interactive { session } => handle_interactive(settings, session).await,
        Commands::Sessions { command } => handle_sessions(settings, command),
    }
}

fn build_agent(settings: &Settings) -> Result<Arc<dyn Agent>> {
    let api_key = Settings::api_key()?;
    let team: Arc<dyn Agent> = Arc::new(build_default_team(settings, api_key));
    Ok(team)
}

fn open_sessions(settings: &Settings) -> Result<SessionStore> {
    let path = settings
        .storage
        .sessions_db
        .as_ref()
        .context("storage.sessions_db is not configured")?;
    SessionStore::open(path).with_context(|| format!("failed to open {}", path.display()))
}

async fn handle_serve(settings: Settings, bind: Option<String>) -> Result<()> {
    let agent = build_agent(&settings)?;
    let mut state = AppState::new(agent);
    if settings.storage.sessions_db.is_some() {
        state = state.with_sessions(open_sessions(&settings)?);
    }

    let bind = bind.unwrap_or_else(|| settings.server.bind_address.clone());
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "teamchat starting");
    server::serve(Arc::new(state), &bind).await
}

async fn handle_chat(settings: Settings, message: String) -> Result<()> {
    let agent = build_agent(&settings)?;
    utils::print_info("Sending request...");

    let reply = respond_or_apologize(agent.as_ref(), &message, &[]).await;
    println!("\n{}", reply);
    Ok(())
}

fn print_help() {
    println!("Special commands:");
    println!("  /history - Show this conversation");
    println!("  /clear   - Clear the conversation");
    println!("  /help    - Show this help");
    println!("  /exit    - Exit\n");
}

async fn handle_interactive(settings: Settings, session: Option<String>) -> Result<()> {
    let agent = build_agent(&settings)?;
    let mut console = ChatConsole::new(agent);

    utils::print_header("Interactive Mode");
    if let Some(id) = session {
        let transcript = open_sessions(&settings)?.session(id.as_str());
        let previous = history(&transcript).await?.len();
        console = console.with_session(transcript);
        utils::print_info(&format!("Session ID: {} ({} previous turns)", id, previous));
    }
    utils::print_info("Type your messages (/help for commands, /exit to quit)\n");

    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin);

    loop {
        utils::print_prompt("You: ");
        let mut input = String::new();
        if reader.read_line(&mut input).await? == 0 {
            break;
        }

        let Some(command) = parse_input(&input) else {
            continue;
        };

        match command {
            ConsoleCommand::Message(message) => {
                let reply = console.submit(&message).await;
                utils::print_info("Assistant: ");
                println!("{}\n", reply);
            }
            ConsoleCommand::History => {
                if console.entries().is_empty() {
                    utils::print_info("No messages yet\n");
                }
                for entry in console.entries() {
                    utils::print_turn(entry.role, &entry.content);
                }
                println!();
            }
            ConsoleCommand::Clear => {
                console.clear();
                utils::print_success("Conversation cleared\n");
            }
            ConsoleCommand::Help => print_help(),
            ConsoleCommand::Exit => break,
            ConsoleCommand::Unknown(cmd) => {
                utils::print_error(&format!("Unknown command: {} (try /help)", cmd));
            }
        }
    }

    Ok(())
}

fn handle_sessions(settings: Settings, command: SessionCommands) -> Result<()> {
    let store = open_sessions(&settings)?;

    match command {
        SessionCommands::List => {
            let sessions = store.list_sessions()?;
            if sessions.is_empty() {
                utils::print_info("No sessions recorded");
            }
            for summary in sessions {
                println!("{}  {}", summary.created_at, summary.session_id);
            }
        }
        SessionCommands::Show { id } => {
            let turns = store.read_turns(&id)?;
            if turns.is_empty() {
                utils::print_error(&format!("No turns for session '{}'", id));
            } else {
                utils::print_header(&format!("Session {}", id));
            }
            for turn in turns {
                utils::print_turn(turn.role, &turn.content);
            }
        }
    }

    Ok(())
}
