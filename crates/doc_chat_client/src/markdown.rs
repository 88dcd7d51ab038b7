//! Terminal styling for assistant replies written in Markdown.
//!
//! Block markup (headers, lists, quotes, fenced code) is handled per line;
//! inline markup (code spans, bold, italics) is styled within each line.
//! Code spans are cut out first so emphasis markers inside them stay literal.

use colored::Colorize;
use regex::{Captures, Regex};
use std::sync::OnceLock;

fn re_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(#{1,6})\s+(.*)$")
            .expect("re_header: pattern is valid and should always compile")
    })
}

fn re_unordered_list() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\s*)[-*+]\s+(.*)$")
            .expect("re_unordered_list: pattern is valid and should always compile")
    })
}

fn re_ordered_list() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\s*)(\d+[.)])\s+(.*)$")
            .expect("re_ordered_list: pattern is valid and should always compile")
    })
}

fn re_blockquote() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^>\s?(.*)$")
            .expect("re_blockquote: pattern is valid and should always compile")
    })
}

fn re_inline_code() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"`([^`]+)`")
            .expect("re_inline_code: pattern is valid and should always compile")
    })
}

fn re_bold() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\*\*(.+?)\*\*|__(.+?)__")
            .expect("re_bold: pattern is valid and should always compile")
    })
}

fn re_italic() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // \b around underscore italic keeps snake_case identifiers intact.
    RE.get_or_init(|| {
        Regex::new(r"\*([^*]+)\*|\b_([^_]+)_\b")
            .expect("re_italic: pattern is valid and should always compile")
    })
}

/// Styles a Markdown document for an ANSI terminal.
pub fn render(text: &str) -> String {
    let mut lines = Vec::new();
    let mut in_fence = false;
    for line in text.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            lines.push(format!("    {}", line.yellow()));
        } else {
            lines.push(render_line(line));
        }
    }
    lines.join("\n")
}

fn render_line(line: &str) -> String {
    if let Some(caps) = re_header().captures(line) {
        return inline(&caps[2]).bold().underline().to_string();
    }
    if let Some(caps) = re_unordered_list().captures(line) {
        return format!("{}• {}", &caps[1], inline(&caps[2]));
    }
    if let Some(caps) = re_ordered_list().captures(line) {
        return format!("{}{} {}", &caps[1], &caps[2], inline(&caps[3]));
    }
    if let Some(caps) = re_blockquote().captures(line) {
        return format!("│ {}", inline(&caps[1]).italic());
    }
    inline(line)
}

fn inline(text: &str) -> String {
    let mut out = String::new();
    let mut last = 0;
    for caps in re_inline_code().captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&emphasis(&text[last..whole.start()]));
        out.push_str(&caps[1].yellow().to_string());
        last = whole.end();
    }
    out.push_str(&emphasis(&text[last..]));
    out
}

fn first_group<'t>(caps: &Captures<'t>) -> &'t str {
    caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str())
}

fn emphasis(text: &str) -> String {
    let bold = re_bold().replace_all(text, |caps: &Captures| first_group(caps).bold().to_string());
    re_italic()
        .replace_all(&bold, |caps: &Captures| first_group(caps).italic().to_string())
        .into_owned()
}
