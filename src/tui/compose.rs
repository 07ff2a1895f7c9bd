//! Compose box: single-line input for the open conversation.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthChar;

/// State for the compose box.
#[derive(Default)]
pub struct ComposeState {
    /// Current input text.
    pub input: String,
    /// Cursor position (character offset into `input`).
    pub cursor_pos: usize,
}

impl ComposeState {
    /// Insert a character at the current cursor position.
    pub fn insert_char(&mut self, c: char) {
        let byte_pos = self.char_to_byte(self.cursor_pos);
        self.input.insert(byte_pos, c);
        self.cursor_pos += 1;
    }

    /// Delete the character before the cursor.
    pub fn backspace(&mut self) {
        if self.cursor_pos > 0 {
            let end = self.char_to_byte(self.cursor_pos);
            let start = self.char_to_byte(self.cursor_pos - 1);
            self.input.drain(start..end);
            self.cursor_pos -= 1;
        }
    }

    /// Delete the character under the cursor.
    pub fn delete(&mut self) {
        if self.cursor_pos < self.input.chars().count() {
            let start = self.char_to_byte(self.cursor_pos);
            let end = self.char_to_byte(self.cursor_pos + 1);
            self.input.drain(start..end);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor_pos = self.cursor_pos.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.cursor_pos < self.input.chars().count() {
            self.cursor_pos += 1;
        }
    }

    pub fn move_home(&mut self) {
        self.cursor_pos = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor_pos = self.input.chars().count();
    }

    /// Discard the draft.
    pub fn clear(&mut self) {
        self.input.clear();
        self.cursor_pos = 0;
    }

    fn char_to_byte(&self, char_pos: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_pos)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len())
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Height of the compose box: border + input line + border.
pub const COMPOSE_HEIGHT: u16 = 3;

/// Render the compose box. Takes the `Frame` so the terminal cursor can be
/// placed inside the input when it is focused and enabled.
pub fn render(area: Rect, frame: &mut Frame, state: &ComposeState, enabled: bool, focused: bool) {
    let active = enabled && focused;
    let border_style = if active {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let border_type = if active {
        BorderType::Double
    } else {
        BorderType::Plain
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(border_style);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.height == 0 || inner.width == 0 {
        return;
    }
    let input_area = Rect::new(inner.x, inner.y, inner.width, 1);

    if !enabled {
        let line = Line::from(Span::styled(
            " Select a conversation to start chatting",
            Style::default().fg(Color::DarkGray),
        ));
        frame.render_widget(Paragraph::new(line), input_area);
        return;
    }

    if state.input.is_empty() {
        let line = Line::from(Span::styled(
            " Type a message, Enter to send",
            Style::default().fg(Color::DarkGray),
        ));
        frame.render_widget(Paragraph::new(line), input_area);
        if focused {
            frame.set_cursor_position((input_area.x + 1, input_area.y));
        }
        return;
    }

    let view = visible_window(&state.input, state.cursor_pos, inner.width as usize);
    let line = Line::from(Span::styled(
        format!(" {}", view.visible),
        Style::default().fg(Color::White),
    ));
    frame.render_widget(Paragraph::new(line), input_area);

    if focused {
        frame.set_cursor_position((input_area.x + 1 + view.cursor_offset as u16, input_area.y));
    }
}

/// The slice of input shown in the box and where the cursor falls in it.
struct InputView {
    visible: String,
    /// Cursor column relative to the start of `visible`.
    cursor_offset: usize,
}

/// Scroll the input horizontally so the cursor stays in view.
///
/// Widths are display columns, so wide characters take two cells.
fn visible_window(input: &str, cursor_pos: usize, width: usize) -> InputView {
    // One column is taken by the leading space.
    let avail = width.saturating_sub(1);
    if avail == 0 {
        return InputView {
            visible: String::new(),
            cursor_offset: 0,
        };
    }

    let chars: Vec<(char, usize)> = input
        .chars()
        .map(|c| (c, c.width().unwrap_or(0)))
        .collect();
    let cursor_pos = cursor_pos.min(chars.len());

    // Walk back from the cursor until the window is full.
    let mut start = cursor_pos;
    let mut used = 1; // room for the cursor cell itself
    while start > 0 && used + chars[start - 1].1 <= avail {
        start -= 1;
        used += chars[start].1;
    }

    let cursor_offset: usize = chars[start..cursor_pos].iter().map(|(_, w)| w).sum();

    let mut visible = String::new();
    let mut cols = 0;
    for &(c, w) in &chars[start..] {
        if cols + w > avail {
            break;
        }
        visible.push(c);
        cols += w;
    }

    InputView {
        visible,
        cursor_offset,
    }
}
