mod commands;
pub mod console;

pub use commands::{Cli, Commands, SessionCommands};
pub use console::{parse_input, ChatConsole, ConsoleCommand, ConsoleEntry};
