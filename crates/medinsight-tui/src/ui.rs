use medinsight_core::{Author, ChatTurn, PasswordStrength};
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Screen};

const TITLE: &str = "MedInsight";
const SUBTITLE: &str = "AI Medical Intelligence";
const DISCLAIMER: &str = "Medical Disclaimer: general medical information only. Not a substitute for \
professional medical advice, diagnosis, or treatment. Always consult a qualified healthcare provider.";
const WELCOME: &str = "Hello! I'm your medical insight assistant. Ask an evidence-based medical \
question and I'll answer with a short summary, supporting context and the sources I used.";
const WELCOME_TOPICS: [&str; 3] = ["Medication Insights", "Symptom Analysis", "Health Intelligence"];

/// Wrap text to fit within a given width, breaking on word boundaries.
/// Words wider than a whole line (long URLs) are split across lines.
fn wrap_text_to_width(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if current_len > 0 && current_len + 1 + word_len <= width {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
            continue;
        }
        if current_len > 0 {
            lines.push(std::mem::take(&mut current));
        }

        let chars: Vec<char> = word.chars().collect();
        let mut pieces = chars.chunks(width).peekable();
        current_len = 0;
        while let Some(piece) = pieces.next() {
            let piece: String = piece.iter().collect();
            if pieces.peek().is_some() {
                lines.push(piece);
            } else {
                current_len = piece.chars().count();
                current = piece;
            }
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Convert `**bold**` runs to bold spans; an unclosed `**` stays literal
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("**") {
        let after = &rest[start + 2..];
        let Some(len) = after.find("**") else {
            break;
        };
        if start > 0 {
            spans.push(Span::raw(rest[..start].to_string()));
        }
        if len > 0 {
            spans.push(Span::styled(
                after[..len].to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ));
        }
        rest = &after[len + 2..];
    }

    if !rest.is_empty() {
        spans.push(Span::raw(rest.to_string()));
    }
    Line::from(spans)
}

/// A `width` x `height` box centred in `area`, shrunk to fit
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    match app.screen {
        Screen::Login => render_login(app, frame),
        Screen::Register => render_register(app, frame),
        Screen::Chat => render_chat(app, frame),
    }
}

// ============================================================================
// Sign-in screens
// ============================================================================

fn brand_lines() -> Vec<Line<'static>> {
    vec![
        Line::from(Span::styled(TITLE, Style::default().fg(Color::Cyan).bold())),
        Line::from(Span::styled(SUBTITLE, Style::default().fg(Color::DarkGray))),
        Line::default(),
    ]
}

fn field_lines(label: &str, value: &str, masked: bool, focused: bool) -> Vec<Line<'static>> {
    let shown = if masked {
        "•".repeat(value.chars().count())
    } else {
        value.to_string()
    };
    let marker = if focused { "> " } else { "  " };
    let value_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };

    vec![
        Line::from(Span::styled(
            format!("{}{}", marker, label),
            Style::default().fg(Color::Gray),
        )),
        Line::from(vec![Span::raw("  "), Span::styled(shown, value_style)]),
    ]
}

fn error_line(error: &Option<String>) -> Line<'static> {
    match error {
        Some(msg) => Line::from(Span::styled(
            format!("! {}", msg),
            Style::default().fg(Color::Red),
        )),
        None => Line::default(),
    }
}

fn strength_line(password: &str) -> Line<'static> {
    let Some(strength) = PasswordStrength::of(password) else {
        return Line::default();
    };
    let color = match strength {
        PasswordStrength::Weak => Color::Red,
        PasswordStrength::Medium => Color::Yellow,
        PasswordStrength::Strong => Color::Green,
    };
    let filled = (strength.thirds() * 4) as usize;
    Line::from(vec![
        Span::raw("  "),
        Span::styled("█".repeat(filled), Style::default().fg(color)),
        Span::styled("░".repeat(12 - filled), Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
        Span::styled(strength.label(), Style::default().fg(color)),
    ])
}

fn render_form(frame: &mut Frame, heading: &str, lines: Vec<Line<'static>>, hint: &str) {
    let area = frame.area();
    let height = lines.len() as u16 + 2;
    let form_area = centered_rect(52, height + 2, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" {} ", heading))
        .title_bottom(Line::from(format!(" {} ", hint)).fg(Color::DarkGray));

    frame.render_widget(Clear, form_area);
    frame.render_widget(
        Paragraph::new(Text::from(lines))
            .block(block)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: false }),
        form_area,
    );
}

fn render_login(app: &mut App, frame: &mut Frame) {
    let state = &app.login;
    let mut lines = brand_lines();
    lines.push(error_line(&state.error));
    lines.extend(field_lines("Email", &state.form.email, false, state.focus == 0));
    lines.extend(field_lines("Password", &state.form.password, true, state.focus == 1));
    lines.push(Line::default());

    let button = if state.loading { "Signing in..." } else { "[ Sign In ]" };
    lines.push(Line::from(Span::styled(button, Style::default().fg(Color::Cyan).bold())).centered());

    render_form(
        frame,
        "Welcome Back",
        lines,
        "Tab next · Enter sign in · Ctrl-R create account · Esc quit",
    );
}

fn render_register(app: &mut App, frame: &mut Frame) {
    let state = &app.register;
    let form = &state.form;
    let mut lines = brand_lines();
    lines.push(error_line(&state.error));
    lines.extend(field_lines("Full Name", &form.display_name, false, state.focus == 0));
    lines.extend(field_lines("Email", &form.email, false, state.focus == 1));
    lines.extend(field_lines("Password", &form.password, true, state.focus == 2));
    lines.push(strength_line(&form.password));

    let mut confirm = field_lines("Confirm Password", &form.confirm_password, true, state.focus == 3);
    if !form.confirm_password.is_empty() && form.confirm_password == form.password {
        if let Some(last) = confirm.last_mut() {
            last.push_span(Span::styled(" ✓", Style::default().fg(Color::Green)));
        }
    }
    lines.extend(confirm);
    lines.push(Line::default());

    let button = if state.loading { "Creating Account..." } else { "[ Create Account ]" };
    lines.push(Line::from(Span::styled(button, Style::default().fg(Color::Cyan).bold())).centered());

    render_form(
        frame,
        "Create Account",
        lines,
        "Tab next · Enter create · Ctrl-L sign in instead · Esc quit",
    );
}

// ============================================================================
// Chat screen
// ============================================================================

fn render_chat(app: &mut App, frame: &mut Frame) {
    let [header_area, disclaimer_area, chat_area, input_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(2),
        Constraint::Min(3),
        Constraint::Length(3),
    ])
    .areas(frame.area());

    render_header(app, frame, header_area);

    frame.render_widget(
        Paragraph::new(DISCLAIMER)
            .style(Style::default().fg(Color::Yellow))
            .wrap(Wrap { trim: true }),
        disclaimer_area,
    );

    render_messages(app, frame, chat_area);
    render_input(app, frame, input_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let user = app
        .current_user()
        .map(|u| {
            if u.display_name.is_empty() {
                u.email.clone()
            } else {
                u.display_name.clone()
            }
        })
        .unwrap_or_default();

    let line = Line::from(vec![
        Span::styled(format!(" {} ", TITLE), Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{} ", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw("│ "),
        Span::styled(user, Style::default().fg(Color::White).bold()),
        Span::styled("  Ctrl-O sign out · Esc quit", Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(
        Paragraph::new(line).style(Style::default().bg(Color::Black)),
        area,
    );
}

fn turn_header(turn: &ChatTurn) -> Line<'static> {
    let (label, color) = match turn.author {
        Author::User => ("You", Color::Magenta),
        Author::Assistant => (TITLE, Color::Cyan),
    };
    let time = turn
        .created_at
        .with_timezone(&chrono::Local)
        .format("%H:%M")
        .to_string();

    Line::from(vec![
        Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
        Span::styled(format!("  {}", time), Style::default().fg(Color::DarkGray)),
    ])
}

/// All chat lines, already wrapped to `width` so the count is exact
fn chat_lines(turns: &[ChatTurn], pending: bool, frame_no: u8, width: usize) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();

    if turns.is_empty() && !pending {
        lines.push(Line::from(Span::styled(
            format!("Welcome to {}", TITLE),
            Style::default().fg(Color::Cyan).bold(),
        )));
        for chunk in wrap_text_to_width(WELCOME, width) {
            lines.push(Line::from(chunk));
        }
        lines.push(Line::default());
        for topic in WELCOME_TOPICS {
            lines.push(Line::from(Span::styled(
                format!("  • {}", topic),
                Style::default().fg(Color::DarkGray),
            )));
        }
        return lines;
    }

    for turn in turns {
        lines.push(turn_header(turn));
        for raw in turn.text.lines() {
            for chunk in wrap_text_to_width(raw, width) {
                let line = parse_markdown_line(&chunk);
                lines.push(if turn.author == Author::User {
                    line.fg(Color::Magenta)
                } else {
                    line
                });
            }
        }
        lines.push(Line::default());
    }

    if pending {
        lines.push(Line::from(Span::styled(
            TITLE,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )));
        let dots = ".".repeat(frame_no as usize + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

fn render_messages(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Conversation (PgUp/PgDn to scroll) ");

    let inner_width = area.width.saturating_sub(2) as usize;
    app.chat_height = area.height.saturating_sub(2);

    let lines = chat_lines(app.turns(), app.is_pending(), app.animation_frame, inner_width);
    let total = lines.len().min(u16::MAX as usize) as u16;
    let max_scroll = total.saturating_sub(app.chat_height);

    if app.follow_tail || app.chat_scroll >= max_scroll {
        app.chat_scroll = max_scroll;
        app.follow_tail = true;
    }

    frame.render_widget(
        Paragraph::new(Text::from(lines))
            .block(block)
            .scroll((app.chat_scroll, 0)),
        area,
    );
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let pending = app.is_pending();
    let border = if pending { Color::DarkGray } else { Color::Cyan };
    let title = if pending {
        " Waiting for answer... ".to_string()
    } else {
        format!(" Ask your medical question · {} characters ", app.input.chars().count())
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(title)
        .title_bottom(Line::from(" Enter to send ").fg(Color::DarkGray));

    // Horizontal scroll keeps the cursor inside the box
    let inner_width = area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width == 0 || app.input_cursor < inner_width {
        0
    } else {
        app.input_cursor - inner_width + 1
    };
    let visible: String = app
        .input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let style = if pending {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::White)
    };
    frame.render_widget(Paragraph::new(visible).style(style).block(block), area);

    if !pending {
        let cursor_x = (app.input_cursor - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}
