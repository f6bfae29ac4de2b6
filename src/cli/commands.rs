use clap::{Parser, Subcommand};

/// Rejects blank session ids
fn parse_session_id(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        return Err("session id must not be empty".to_string());
    }
    Ok(s.to_string())
}

#[derive(Parser, Debug)]
#[command(name = "teamchat")]
#[command(author, version, about = "Multi-agent chat assistant with a SQLite turn log", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Run the HTTP API
    Serve {
        /// Address to listen on (defaults to server.bind_address)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Send a single message to the agent team
    Chat { message: String },

    /// Start an interactive chat session
    Interactive {
        /// Also log every exchange under this session id
        #[arg(short, long, value_parser = parse_session_id)]
        session: Option<String>,
    },

    /// Inspect the multi-session log
    Sessions {
        #[command(subcommand)]
        command: SessionCommands,
    },
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum SessionCommands {
    /// List sessions, newest first
    List,

    /// Print every turn of one session
    Show {
        #[arg(value_parser = parse_session_id)]
        id: String,
    },
}
