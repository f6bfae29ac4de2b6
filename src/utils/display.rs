use crate::storage::Role;
use colored::*;

pub fn print_header(text: &str) {
    println!("\n{}", text.bright_cyan().bold());
    println!("{}", "=".repeat(text.len()).bright_cyan());
}

pub fn print_success(text: &str) {
    println!("{}", text.green());
}

pub fn print_error(text: &str) {
    eprintln!("{}", text.red().bold());
}

pub fn print_info(text: &str) {
    println!("{}", text.blue());
}

pub fn print_prompt(text: &str) {
    print!("{}", text.yellow().bold());
}

/// Print one transcript line, labelled by speaker.
pub fn print_turn(role: Role, content: &str) {
    let label = match role {
        Role::User => "You:".yellow().bold(),
        Role::Assistant => "Assistant:".magenta().bold(),
    };
    println!("{} {}", label, content);
}
