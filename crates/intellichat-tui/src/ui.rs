use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use intellichat_core::ChatRole;
use unicode_width::UnicodeWidthChar;
use crate::app::{App, BackendStatus};

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            // Consume the second *
            chars.next();

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;

            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                if !current_text.is_empty() {
                    spans.push(Span::raw(std::mem::take(&mut current_text)));
                }
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
                if found_close {
                    current_text.push_str("**");
                }
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, chat, ask box, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let (badge, badge_color) = match app.backend_status {
        BackendStatus::Unknown => ("checking", Color::Gray),
        BackendStatus::Online => ("online", Color::Green),
        BackendStatus::Offline => ("offline", Color::Red),
    };

    let title = Line::from(vec![
        Span::styled(" IntelliChat ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{} ", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
        Span::styled(app.server_url.clone(), Style::default().fg(Color::White)),
        Span::raw(" "),
        Span::styled(format!("[{}]", badge), Style::default().fg(badge_color).bold()),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store area for mouse hit-testing and inner size for scroll calculations
    app.chat_area = Some(area);
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Chat ");

    let mut lines: Vec<Line> = Vec::new();

    for msg in app.controller.transcript() {
        match msg.role() {
            ChatRole::User => {
                lines.push(Line::from(Span::styled(
                    "You:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
                for line in msg.content().lines() {
                    lines.push(Line::from(line.to_string()));
                }
            }
            ChatRole::Bot => {
                lines.push(Line::from(Span::styled(
                    "IntelliChat:",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
                for line in msg.content().lines() {
                    lines.push(parse_markdown_line(line));
                }
            }
        }
        lines.push(Line::default());
    }

    if app.controller.is_typing() {
        lines.push(Line::from(Span::styled(
            "IntelliChat:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let enabled = app.controller.input_enabled();
    let (border_color, title) = if enabled {
        (Color::Yellow, " Ask ")
    } else {
        (Color::DarkGray, " Waiting for reply... ")
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let (visible_text, cursor_x) = visible_input(&app.input, app.cursor, inner_width);

    let text_color = if enabled { Color::Cyan } else { Color::DarkGray };
    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(text_color))
        .block(input_block);

    frame.render_widget(input, area);
    frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
}

/// Slice of the ask box that fits in `width` columns with the cursor in view.
///
/// `cursor` counts chars; the returned cursor column counts display cells, so
/// wide (CJK, emoji) characters take two.
fn visible_input(input: &str, cursor: usize, width: usize) -> (String, u16) {
    if width == 0 {
        return (String::new(), 0);
    }

    let widths: Vec<usize> = input.chars().map(|c| c.width().unwrap_or(0)).collect();
    let cursor = cursor.min(widths.len());

    // Scroll right until the text before the cursor leaves a cell for it
    let mut start = 0;
    let mut before_cursor: usize = widths[..cursor].iter().sum();
    while before_cursor >= width && start < cursor {
        before_cursor -= widths[start];
        start += 1;
    }

    let mut used = 0;
    let visible: String = input
        .chars()
        .zip(&widths)
        .skip(start)
        .take_while(|(_, w)| {
            used += **w;
            used <= width
        })
        .map(|(c, _)| c)
        .collect();

    (visible, before_cursor as u16)
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut hints = if app.controller.input_enabled() {
        vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
        ]
    } else {
        vec![Span::styled(" waiting for reply ", label_style.fg(Color::Yellow))]
    };

    hints.extend(vec![
        Span::styled(" PgUp/PgDn ", key_style),
        Span::styled(" scroll ", label_style),
        Span::styled(" Esc ", key_style),
        Span::styled(" quit ", label_style),
    ]);

    let footer = Paragraph::new(Line::from(hints)).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_bold_markdown() {
        let line = parse_markdown_line("Attendance is **92%** this quarter");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "92%");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(plain(&line), "Attendance is 92% this quarter");
    }

    #[test]
    fn test_unclosed_bold_is_literal() {
        let line = parse_markdown_line("a **b");
        assert_eq!(plain(&line), "a **b");
    }

    #[test]
    fn test_visible_input_ascii_scrolls_with_cursor() {
        assert_eq!(visible_input("hello", 5, 10), ("hello".to_string(), 5));
        assert_eq!(visible_input("abcdefgh", 8, 5), ("efgh".to_string(), 4));
        assert_eq!(visible_input("abcdefgh", 0, 5), ("abcde".to_string(), 0));
    }

    #[test]
    fn test_visible_input_counts_wide_chars_as_two_cells() {
        // Each CJK char is two columns wide
        assert_eq!(visible_input("出勤率", 3, 10), ("出勤率".to_string(), 6));
        assert_eq!(visible_input("a出勤", 2, 10), ("a出勤".to_string(), 3));

        // Five columns: the cursor after the third char needs the first dropped
        let (text, x) = visible_input("出勤率", 3, 5);
        assert_eq!(text, "勤率");
        assert_eq!(x, 4);
    }

    #[test]
    fn test_visible_input_zero_width() {
        assert_eq!(visible_input("abc", 2, 0), (String::new(), 0));
    }

    #[test]
    fn test_empty_line() {
        assert!(parse_markdown_line("").spans.is_empty());
    }
}
