//! Conversation pane: messages exchanged with the selected counterpart.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
};

use crate::api::format_timestamp;
use crate::panel::ChatPanel;

/// Scroll position of the conversation pane.
#[derive(Default)]
pub struct MessagesState {
    /// Lines scrolled up from the bottom (0 = following the newest message).
    pub scroll_back: usize,
}

impl MessagesState {
    /// Scroll toward older messages.
    pub fn scroll_up(&mut self, n: usize) {
        self.scroll_back = self.scroll_back.saturating_add(n);
    }

    /// Scroll toward newer messages.
    pub fn scroll_down(&mut self, n: usize) {
        self.scroll_back = self.scroll_back.saturating_sub(n);
    }

    /// Jump back to the newest message.
    pub fn follow(&mut self) {
        self.scroll_back = 0;
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render the conversation pane into the given area.
pub fn render(area: Rect, buf: &mut Buffer, panel: &ChatPanel, state: &MessagesState, focused: bool) {
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
        .border_style(border_style);

    let inner = block.inner(area);
    block.render(area, buf);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let header = match panel.selected() {
        Some(user) if user.email.is_empty() => user.display_name().to_string(),
        Some(user) => format!("{} <{}>", user.display_name(), user.email),
        None => "No conversation selected".to_string(),
    };
    render_header(Rect::new(inner.x, inner.y, inner.width, 1), buf, &header);

    let body = Rect::new(
        inner.x,
        inner.y + 1,
        inner.width,
        inner.height.saturating_sub(1),
    );
    if body.height == 0 {
        return;
    }

    if panel.selected().is_none() {
        let hint = Line::from(Span::styled(
            " Pick a customer on the left and press Enter",
            Style::default().fg(Color::DarkGray),
        ));
        Paragraph::new(hint).render(Rect::new(body.x, body.y, body.width, 1), buf);
        return;
    }

    let lines = build_lines(panel, body.width as usize);
    let visible = body.height as usize;
    let start = visible_start(lines.len(), visible, state.scroll_back);

    for (row, line) in lines.iter().skip(start).take(visible).enumerate() {
        let line_area = Rect::new(body.x, body.y + row as u16, body.width, 1);
        Paragraph::new(line.clone()).render(line_area, buf);
    }

    // Scroll indicator when newer lines are hidden below.
    if start + visible < lines.len() {
        let x = body.x + body.width.saturating_sub(1);
        let y = body.y + body.height.saturating_sub(1);
        let cell = &mut buf[(x, y)];
        cell.set_char('v');
        cell.set_style(Style::default().fg(Color::DarkGray));
    }
}

/// Render the conversation header line.
fn render_header(area: Rect, buf: &mut Buffer, header: &str) {
    let line = Line::from(vec![Span::styled(
        format!(" {} ", header),
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    )]);
    Paragraph::new(line)
        .style(Style::default().bg(Color::DarkGray))
        .render(area, buf);
}

/// First line index to show so the bottom of the conversation stays in view.
fn visible_start(total: usize, visible: usize, scroll_back: usize) -> usize {
    let max_start = total.saturating_sub(visible);
    max_start.saturating_sub(scroll_back)
}

/// Flatten the conversation into display lines.
fn build_lines(panel: &ChatPanel, width: usize) -> Vec<Line<'static>> {
    let operator_id = panel.operator().id.as_str();
    let counterpart_name = panel
        .selected()
        .map(|u| u.display_name().to_string())
        .unwrap_or_default();

    let mut lines = Vec::new();
    if panel.messages().is_empty() {
        lines.push(Line::from(Span::styled(
            " (no messages yet)",
            Style::default().fg(Color::DarkGray),
        )));
        return lines;
    }

    for msg in panel.messages() {
        let outgoing = msg.from == operator_id;
        let (sender, sender_style) = if outgoing {
            ("You".to_string(), Style::default().fg(Color::Green))
        } else {
            (counterpart_name.clone(), Style::default().fg(Color::Cyan))
        };

        lines.push(Line::from(vec![
            Span::styled(
                format!(" {}", sender),
                sender_style.add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  {}", format_timestamp(msg)),
                Style::default().fg(Color::DarkGray),
            ),
        ]));

        for text in wrap_text(&msg.content, width.saturating_sub(3)) {
            lines.push(Line::from(format!("   {}", text)));
        }
        lines.push(Line::from(""));
    }

    lines
}

/// Word-wrap by display width: split on newlines first, then wrap long lines.
fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    use unicode_width::UnicodeWidthStr;

    if max_width == 0 {
        return vec![];
    }
    let mut result = Vec::new();
    for line in text.lines() {
        if line.width() <= max_width {
            result.push(line.to_string());
            continue;
        }
        let mut current = String::new();
        for word in line.split_whitespace() {
            if current.is_empty() {
                current = word.to_string();
            } else if current.width() + 1 + word.width() <= max_width {
                current.push(' ');
                current.push_str(word);
            } else {
                result.push(std::mem::take(&mut current));
                current = word.to_string();
            }
        }
        if !current.is_empty() {
            result.push(current);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChatMessage, User};

    fn user(id: &str, name: &str) -> User {
        User {
            id: id.to_string(),
            name: name.to_string(),
            email: String::new(),
            avatar: None,
        }
    }

    #[test]
    fn test_wrap_text() {
        assert_eq!(wrap_text("short", 10), vec!["short"]);
        assert_eq!(
            wrap_text("the boat leaves at nine", 10),
            vec!["the boat", "leaves at", "nine"]
        );
        assert_eq!(wrap_text("a\nb", 10), vec!["a", "b"]);
        assert!(wrap_text("anything", 0).is_empty());
    }

    #[test]
    fn test_visible_start_follows_bottom() {
        assert_eq!(visible_start(5, 10, 0), 0);
        assert_eq!(visible_start(30, 10, 0), 20);
        assert_eq!(visible_start(30, 10, 5), 15);
        assert_eq!(visible_start(30, 10, 100), 0);
    }

    #[test]
    fn test_build_lines_labels_senders() {
        let mut panel = ChatPanel::new(user("admin-1", "Mai"));
        let ticket = panel.select(user("u1", "An"));
        panel.apply_history(
            &ticket,
            Ok(vec![
                ChatMessage {
                    id: "1".to_string(),
                    from: "u1".to_string(),
                    to: "admin-1".to_string(),
                    content: "Hello".to_string(),
                    created_at: None,
                },
                ChatMessage {
                    id: "2".to_string(),
                    from: "admin-1".to_string(),
                    to: "u1".to_string(),
                    content: "Hi An".to_string(),
                    created_at: None,
                },
            ]),
        );

        let text: Vec<String> = build_lines(&panel, 40)
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect();
        assert_eq!(text[0], " An  --");
        assert_eq!(text[1], "   Hello");
        assert_eq!(text[3], " You  --");
        assert_eq!(text[4], "   Hi An");
    }
}
