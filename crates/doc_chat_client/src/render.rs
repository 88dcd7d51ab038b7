//! Transcript rendering for the terminal.

use colored::Colorize;

use crate::markdown;
use crate::messages::{Message, Reference, Role};
use crate::references::reference_entries;

pub fn message(message: &Message) -> String {
    match message.role() {
        Role::User => format!("{} {}", "You:".cyan().bold(), message.content()),
        Role::Assistant => {
            let mut out = format!(
                "{}\n{}",
                "Assistant:".green().bold(),
                markdown::render(message.content())
            );
            if message.has_references() {
                out.push_str("\n\n");
                out.push_str(&references(message.references()));
            }
            out
        }
    }
}

/// Numbered list with title, type label, url and the available actions.
pub fn references(references: &[Reference]) -> String {
    let mut out = "Referenced documents:".bold().to_string();
    for entry in reference_entries(references) {
        out.push_str(&format!(
            "\n  [{}] {} · {}\n      {}\n      :view {}  :download {}",
            entry.position,
            entry.title.bold(),
            entry.kind.label(),
            entry.url.underline(),
            entry.position,
            entry.position,
        ));
    }
    out
}

pub fn banner(text: &str) -> String {
    format!("! {text}").red().bold().to_string()
}

pub fn sending() -> String {
    "Sending…".dimmed().to_string()
}
