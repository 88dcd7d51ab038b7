//! doc-chat: terminal chat client for the document assistant.
//! Runs interactively on a terminal. Otherwise sends the positional question,
//! or each non-empty stdin line in order, and prints the transcript to stdout.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::style::Print;
use crossterm::terminal::{self, ClearType};
use crossterm::{cursor, execute, queue};
use doc_chat_client::config::{self, Config, ConfigError};
use doc_chat_client::input::{InputAction, InputBox, KeyPress};
use doc_chat_client::{
    render, ChatSession, ChatTransport, Conversation, DownloadOutcome, Downloader, ProxyClient,
};
use tokio::runtime::Runtime;

const PROMPT: &str = "> ";
const HELP: &str = ":view N / :download N act on the last reply's references, :quit or Ctrl+C exits.";

/// CLI arguments for the chat client.
#[derive(Parser, Debug)]
#[command(name = "doc-chat", about = "Chat with the document assistant")]
struct Args {
    /// Config file (default: ~/.doc-chat/config.yaml).
    #[arg(long, env = "DOC_CHAT_CONFIG")]
    config: Option<PathBuf>,

    /// Proxy chat endpoint, overriding the config file.
    #[arg(long)]
    proxy_url: Option<String>,

    /// Send this question and exit instead of reading input.
    question: Option<String>,
}

fn load_config(args: &Args) -> Result<Config, ConfigError> {
    match &args.config {
        Some(path) => config::load(path),
        None => {
            let path = config::default_config_path().ok_or(ConfigError::NoPath)?;
            config::load_or_default(&path)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    View(usize),
    Download(usize),
    Quit,
}

/// `None` when `text` is a chat message rather than a `:command`.
fn parse_command(text: &str) -> Option<Result<Command, String>> {
    let rest = text.strip_prefix(':')?;
    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let index = parts.next().map(str::parse::<usize>);
    let parsed = match (name, index) {
        ("quit" | "q", None) => Ok(Command::Quit),
        ("view", Some(Ok(n))) if n > 0 => Ok(Command::View(n)),
        ("download", Some(Ok(n))) if n > 0 => Ok(Command::Download(n)),
        _ => Err(format!("Unknown command: {text}")),
    };
    Some(parsed)
}

struct App {
    rt: Runtime,
    session: ChatSession,
    client: ProxyClient,
    downloader: Downloader,
    printed: usize,
}

impl App {
    /// Writes entries up to the newest one when the conversation asks to scroll.
    fn flush_transcript(&mut self, out: &mut impl Write, newline: &str) -> io::Result<()> {
        if let Some(newest) = self.session.take_scroll_request() {
            for message in &self.session.conversation().messages()[self.printed..=newest] {
                write_block(out, &render::message(message), newline)?;
            }
            self.printed = newest + 1;
        }
        Ok(())
    }

    /// Runs one submit cycle, showing the user entry before the reply arrives.
    fn send(&mut self, text: &str, out: &mut impl Write, newline: &str) -> io::Result<bool> {
        self.session.set_input(text);
        let Some(message) = self.session.begin_submit() else {
            return Ok(true);
        };
        self.flush_transcript(out, newline)?;
        if newline == "\r\n" {
            write_block(out, &render::sending(), newline)?;
        }
        let result = self.rt.block_on(self.client.send(&message));
        self.session.finish_submit(result);
        self.flush_transcript(out, newline)?;
        Ok(self.session.error().is_none())
    }

    fn run_command(&self, command: Command) -> Result<String, String> {
        let (Command::View(n) | Command::Download(n)) = command else {
            return Ok(String::new());
        };
        let url = reference_url(self.session.conversation(), n)?;
        match command {
            Command::Download(_) => match self.rt.block_on(self.downloader.download(url)) {
                Ok(DownloadOutcome::Saved(path)) => Ok(format!("Saved {}", path.display())),
                Ok(DownloadOutcome::OpenedInBrowser) => Ok(format!("Opened {url}")),
                Err(e) => Err(e.to_string()),
            },
            _ => self
                .downloader
                .view(url)
                .map(|()| format!("Opened {url}"))
                .map_err(|e| e.to_string()),
        }
    }
}

/// URL of reference `n` (1-based) on the last assistant reply.
fn reference_url(conversation: &Conversation, n: usize) -> Result<&str, String> {
    let reply = conversation
        .last_reply()
        .filter(|m| m.has_references())
        .ok_or("The last reply has no referenced documents")?;
    reply
        .references()
        .get(n - 1)
        .map(|r| r.url.as_str())
        .ok_or_else(|| format!("No reference [{n}]"))
}

fn write_block(out: &mut impl Write, text: &str, newline: &str) -> io::Result<()> {
    write!(out, "{}{}", text.replace('\n', newline), newline)?;
    out.flush()
}

/// Non-interactive mode. Returns whether every turn reached the proxy.
fn run_lines<I>(app: &mut App, lines: I) -> io::Result<bool>
where
    I: IntoIterator<Item = String>,
{
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut all_ok = true;
    for line in lines {
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        match parse_command(text) {
            Some(Ok(Command::Quit)) => break,
            Some(Ok(command)) => match app.run_command(command) {
                Ok(msg) => writeln!(out, "{msg}")?,
                Err(msg) => eprintln!("{}", render::banner(&msg)),
            },
            Some(Err(msg)) => eprintln!("{}", render::banner(&msg)),
            None => {
                if !app.send(text, &mut out, "\n")? {
                    if let Some(banner) = app.session.error() {
                        eprintln!("{}", render::banner(banner));
                    }
                    all_ok = false;
                }
            }
        }
    }
    Ok(all_ok)
}

/// Raw mode plus, where the terminal supports it, disambiguated key codes so
/// Shift+Enter is reported apart from Enter. Both are undone on drop.
struct RawMode {
    enhanced: bool,
}

impl RawMode {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let enhanced = terminal::supports_keyboard_enhancement().unwrap_or(false);
        if enhanced {
            execute!(
                io::stdout(),
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES)
            )?;
        }
        Ok(Self { enhanced })
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if self.enhanced {
            let _ = execute!(io::stdout(), PopKeyboardEnhancementFlags);
        }
        let _ = terminal::disable_raw_mode();
    }
}

fn help_text(enhanced: bool) -> String {
    let newline = if enhanced { "Shift+Enter or Alt+Enter" } else { "Alt+Enter" };
    format!("doc-chat: Enter sends, {newline} adds a line, {HELP}")
}

fn key_press(key: &KeyEvent) -> KeyPress {
    match key.code {
        KeyCode::Enter => KeyPress::Enter {
            newline: key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT),
        },
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => KeyPress::Char(c),
        KeyCode::Backspace => KeyPress::Backspace,
        _ => KeyPress::Other,
    }
}

fn is_quit(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('d'))
}

/// Physical terminal rows taken by `line` once prefixed.
fn physical_rows(line: &str, columns: u16) -> u16 {
    let len = PROMPT.len() + line.chars().count();
    let columns = usize::from(columns.max(1));
    u16::try_from(len.div_ceil(columns).max(1)).unwrap_or(u16::MAX)
}

fn clear_input(out: &mut impl Write, drawn: u16) -> io::Result<()> {
    if drawn == 0 {
        return Ok(());
    }
    queue!(out, cursor::MoveToColumn(0))?;
    if drawn > 1 {
        queue!(out, cursor::MoveUp(drawn - 1))?;
    }
    queue!(out, terminal::Clear(ClearType::FromCursorDown))?;
    out.flush()
}

/// Redraws the compose box at its current height; blank padding goes above
/// the text so the cursor ends after the last character.
fn draw_input(out: &mut impl Write, input: &InputBox, drawn: u16, columns: u16) -> io::Result<u16> {
    clear_input(out, drawn)?;
    let lines: Vec<&str> = input.text().split('\n').collect();
    let rows = usize::from(input.rows());
    let start = lines.len().saturating_sub(rows);
    let shown = &lines[start..];
    let padding = rows.saturating_sub(shown.len());

    let mut physical: u16 = 0;
    for i in 0..padding {
        if i > 0 {
            queue!(out, Print("\r\n"))?;
        }
        physical += 1;
    }
    for (i, line) in shown.iter().enumerate() {
        if padding > 0 || i > 0 {
            queue!(out, Print("\r\n"))?;
        }
        let prefix = if start == 0 && i == 0 { PROMPT } else { "  " };
        queue!(out, Print(prefix), Print(line))?;
        physical = physical.saturating_add(physical_rows(line, columns));
    }
    out.flush()?;
    Ok(physical)
}

fn run_interactive(app: &mut App, cfg: &Config) -> io::Result<()> {
    let mut out = io::stdout();
    let (mut columns, _) = terminal::size()?;
    let (min_rows, max_rows) = cfg.input_rows();
    let text_width = |columns: u16| columns.saturating_sub(PROMPT.len() as u16);
    let mut input = InputBox::new(min_rows, max_rows, text_width(columns));

    let raw = RawMode::enable()?;
    execute!(out, event::EnableFocusChange)?;
    write_block(&mut out, &help_text(raw.enhanced), "\r\n")?;
    input.focus();
    let mut drawn = draw_input(&mut out, &input, 0, columns)?;

    loop {
        match event::read()? {
            Event::Key(key) if key.kind != KeyEventKind::Release => {
                if is_quit(&key) {
                    break;
                }
                if input.handle_key(key_press(&key)) == InputAction::Submit {
                    let text = input.text().trim().to_string();
                    clear_input(&mut out, drawn)?;
                    drawn = 0;
                    match parse_command(&text) {
                        Some(Ok(Command::Quit)) => break,
                        Some(Ok(command)) => {
                            let line = app.run_command(command).unwrap_or_else(|e| render::banner(&e));
                            write_block(&mut out, &line, "\r\n")?;
                            input.clear();
                        }
                        Some(Err(msg)) => write_block(&mut out, &render::banner(&msg), "\r\n")?,
                        None => {
                            app.send(input.text(), &mut out, "\r\n")?;
                            if let Some(banner) = app.session.error() {
                                write_block(&mut out, &render::banner(banner), "\r\n")?;
                            }
                            input.set_text(app.session.input());
                        }
                    }
                }
                drawn = draw_input(&mut out, &input, drawn, columns)?;
            }
            Event::Resize(width, _) => {
                columns = width;
                input.set_width(text_width(columns));
                drawn = draw_input(&mut out, &input, drawn, columns)?;
            }
            Event::FocusGained => {
                input.focus();
                drawn = draw_input(&mut out, &input, drawn, columns)?;
            }
            _ => {}
        }
    }

    clear_input(&mut out, drawn)?;
    execute!(out, event::DisableFocusChange)?;
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let cfg = match load_config(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: failed to load config: {e}");
            process::exit(1);
        }
    };

    let proxy_url = args
        .proxy_url
        .clone()
        .unwrap_or_else(|| cfg.proxy_url().to_string());

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| {
            eprintln!("Error: failed to create runtime: {e}");
            process::exit(1);
        });

    let mut app = App {
        rt,
        session: ChatSession::new(),
        client: ProxyClient::new(proxy_url),
        downloader: Downloader::system(cfg.download_dir()),
        printed: 0,
    };

    let outcome = if let Some(question) = args.question {
        run_lines(&mut app, std::iter::once(question))
    } else if io::stdin().is_terminal() && io::stdout().is_terminal() {
        run_interactive(&mut app, &cfg).map(|()| true)
    } else {
        let lines = io::stdin().lock().lines().map_while(Result::ok);
        run_lines(&mut app, lines)
    };

    match outcome {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
