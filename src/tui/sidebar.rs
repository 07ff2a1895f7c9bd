//! Roster sidebar: counterparts with an existing conversation.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
};

use crate::models::User;

/// Cursor position in the roster and loading flag.
pub struct SidebarState {
    /// Index into the roster (0-based)
    pub selected: usize,
    /// Whether the roster fetch is still outstanding.
    pub loading: bool,
}

impl Default for SidebarState {
    fn default() -> Self {
        Self {
            selected: 0,
            loading: true,
        }
    }
}

impl SidebarState {
    /// Move the cursor up.
    pub fn move_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Move the cursor down within a roster of `count` entries.
    pub fn move_down(&mut self, count: usize) {
        if self.selected + 1 < count {
            self.selected += 1;
        }
    }

    /// Keep the cursor inside the roster after it changed size.
    pub fn clamp(&mut self, count: usize) {
        if count == 0 {
            self.selected = 0;
        } else if self.selected >= count {
            self.selected = count - 1;
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render the roster into the given area.
///
/// `active_id` marks the counterpart whose conversation is open.
pub fn render(
    area: Rect,
    buf: &mut Buffer,
    roster: &[User],
    active_id: Option<&str>,
    state: &SidebarState,
    focused: bool,
) {
    let border_style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let border_type = if focused {
        BorderType::Double
    } else {
        BorderType::Plain
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(border_style)
        .title(" Conversations ");

    let inner = block.inner(area);
    block.render(area, buf);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    if roster.is_empty() {
        let text = if state.loading {
            " Loading..."
        } else {
            " No conversations"
        };
        let line = Line::from(Span::styled(text, Style::default().fg(Color::DarkGray)));
        Paragraph::new(line).render(Rect::new(inner.x, inner.y, inner.width, 1), buf);
        return;
    }

    let height = inner.height as usize;
    let offset = compute_scroll_offset(state.selected, height, roster.len());

    for (row, idx) in (offset..roster.len()).take(height).enumerate() {
        let user = &roster[idx];
        let row_area = Rect::new(inner.x, inner.y + row as u16, inner.width, 1);
        let is_cursor = idx == state.selected;
        let is_active = active_id == Some(user.id.as_str());
        render_entry(buf, row_area, user, is_cursor && focused, is_active);
    }
}

/// Keep the cursor row visible.
fn compute_scroll_offset(selected: usize, height: usize, total: usize) -> usize {
    if total <= height || selected < height {
        return 0;
    }
    let max_offset = total.saturating_sub(height);
    selected.saturating_sub(height - 1).min(max_offset)
}

fn render_entry(buf: &mut Buffer, area: Rect, user: &User, cursor: bool, active: bool) {
    let width = area.width as usize;
    let marker = if cursor { "\u{25BA}" } else { " " };
    let icon = if active { "*" } else { " " };
    let label: String = format!("{}{} {}", marker, icon, user.display_name())
        .chars()
        .take(width)
        .collect();
    let pad = width.saturating_sub(label.chars().count());

    let style = if cursor {
        Style::default()
            .fg(Color::White)
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD)
    } else if active {
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };

    let line = Line::from(vec![
        Span::styled(label, style),
        Span::styled(" ".repeat(pad), style),
    ]);
    Paragraph::new(line).render(area, buf);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_movement_is_bounded() {
        let mut state = SidebarState::default();
        state.move_up();
        assert_eq!(state.selected, 0);
        state.move_down(3);
        state.move_down(3);
        state.move_down(3);
        assert_eq!(state.selected, 2);
        state.clamp(1);
        assert_eq!(state.selected, 0);
    }

    #[test]
    fn test_scroll_offset_keeps_cursor_visible() {
        assert_eq!(compute_scroll_offset(2, 5, 3), 0);
        assert_eq!(compute_scroll_offset(4, 5, 20), 0);
        assert_eq!(compute_scroll_offset(9, 5, 20), 5);
        assert_eq!(compute_scroll_offset(19, 5, 20), 15);
    }

    #[test]
    fn test_render_marks_active_counterpart() {
        let roster = vec![
            User {
                id: "u1".to_string(),
                name: "An".to_string(),
                email: String::new(),
                avatar: None,
            },
            User {
                id: "u2".to_string(),
                name: "Binh".to_string(),
                email: String::new(),
                avatar: None,
            },
        ];
        let area = Rect::new(0, 0, 20, 5);
        let mut buf = Buffer::empty(area);
        let state = SidebarState {
            selected: 0,
            loading: false,
        };
        render(area, &mut buf, &roster, Some("u2"), &state, true);

        let row = |y: u16| -> String { (0..20).map(|x| buf[(x, y)].symbol().to_string()).collect() };
        assert!(row(1).contains("\u{25BA}  An"));
        assert!(row(2).contains(" * Binh"));
    }
}
