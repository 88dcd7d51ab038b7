//! Compose box: text editing, submit-on-Enter, and height that follows the content.

/// Keys the compose box reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPress {
    Char(char),
    /// `newline` is set when a modifier (Shift or Alt) was held.
    Enter { newline: bool },
    Backspace,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    Submit,
    Edited,
    Ignored,
}

#[derive(Debug, Clone)]
pub struct InputBox {
    text: String,
    min_rows: u16,
    max_rows: u16,
    width: u16,
    rows: u16,
}

impl InputBox {
    /// `width` is the usable column count; 0 disables wrapping.
    pub fn new(min_rows: u16, max_rows: u16, width: u16) -> Self {
        let min_rows = min_rows.max(1);
        let mut input = Self {
            text: String::new(),
            min_rows,
            max_rows: max_rows.max(min_rows),
            width,
            rows: min_rows,
        };
        input.recompute_rows();
        input
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.recompute_rows();
    }

    pub fn clear(&mut self) {
        self.set_text(String::new());
    }

    /// Visible height in rows.
    pub fn rows(&self) -> u16 {
        self.rows
    }

    pub fn set_width(&mut self, width: u16) {
        self.width = width;
        self.recompute_rows();
    }

    pub fn focus(&mut self) {
        self.recompute_rows();
    }

    pub fn handle_key(&mut self, key: KeyPress) -> InputAction {
        let action = match key {
            KeyPress::Enter { newline: false } => InputAction::Submit,
            KeyPress::Enter { newline: true } => {
                self.text.push('\n');
                InputAction::Edited
            }
            KeyPress::Char(c) => {
                self.text.push(c);
                InputAction::Edited
            }
            KeyPress::Backspace => {
                if self.text.pop().is_some() {
                    InputAction::Edited
                } else {
                    InputAction::Ignored
                }
            }
            KeyPress::Other => InputAction::Ignored,
        };
        self.recompute_rows();
        action
    }

    fn recompute_rows(&mut self) {
        let lines = wrapped_line_count(&self.text, self.width);
        let lines = u16::try_from(lines).unwrap_or(u16::MAX);
        self.rows = lines.clamp(self.min_rows, self.max_rows);
    }
}

fn wrapped_line_count(text: &str, width: u16) -> usize {
    let width = usize::from(width);
    text.split('\n')
        .map(|line| {
            let len = line.chars().count();
            if width == 0 || len == 0 {
                1
            } else {
                len.div_ceil(width)
            }
        })
        .sum()
}
