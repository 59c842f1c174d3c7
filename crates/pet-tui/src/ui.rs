use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Position, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use pet_core::expression::{ANGER, CONFUSION, JOY, NEUTRAL, SADNESS, SHYNESS, SURPRISE, TALK};
use pet_core::{Author, PrimingState};
use crate::app::App;

const AVATAR_WIDTH: u16 = 28;

/// Face drawn for an expression code, with a short mood name
fn face_for(expression: &str) -> ([&'static str; 4], &'static str) {
    match expression {
        NEUTRAL => (["  .-----.  ", " ( •   • ) ", " (   ‿   ) ", "  '-----'  "], "neutral"),
        TALK => (["  .-----.  ", " ( •   • ) ", " (   o   ) ", "  '-----'  "], "talking"),
        ANGER => (["  .-----.  ", " ( ╲   ╱ ) ", " (   ︵  ) ", "  '-----'  "], "angry"),
        SADNESS => (["  .-----.  ", " ( ╥   ╥ ) ", " (   ︵  ) ", "  '-----'  "], "sad"),
        JOY => (["  .-----.  ", " ( ^   ^ ) ", " (   ▽   ) ", "  '-----'  "], "happy"),
        SURPRISE => (["  .-----.  ", " ( ⊙   ⊙ ) ", " (   O   ) ", "  '-----'  "], "surprised"),
        SHYNESS => (["  .-----.  ", " ( >   < ) ", " ( ///‿/// )", "  '-----'  "], "shy"),
        CONFUSION => (["  .-----.  ", " ( •   ⊙ ) ", " (   ~   ) ", "  '-----' ?"], "confused"),
        _ => (["  .-----.  ", " ( •   • ) ", " (   -   ) ", "  '-----'  "], "custom"),
    }
}

fn author_color(author: Author) -> Color {
    match author {
        Author::You => Color::LightBlue,
        Author::Ai => Color::LightGreen,
        Author::System => Color::Yellow,
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let [header, body, input] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(5),
        Constraint::Length(3),
    ])
    .areas(frame.area());

    let [avatar, chat] =
        Layout::horizontal([Constraint::Length(AVATAR_WIDTH), Constraint::Min(20)]).areas(body);

    render_header(app, frame, header);
    render_avatar(app, frame, avatar);
    render_chat(app, frame, chat);
    render_input(app, frame, input);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let (status, color) = if app.session.is_busy() {
        ("thinking", Color::Magenta)
    } else {
        match app.session.priming_state() {
            PrimingState::NotStarted => ("idle", Color::DarkGray),
            PrimingState::Priming => ("warming up", Color::Yellow),
            PrimingState::Ready => ("ready", Color::Green),
        }
    };

    let key = match app.key_source {
        Some(source) => Span::styled(format!("key: {source}"), Style::default().fg(Color::DarkGray)),
        None => Span::styled("no API key", Style::default().fg(Color::Red)),
    };

    let line = Line::from(vec![
        Span::styled(" desktop-pet ", Style::default().bold().fg(Color::Cyan)),
        Span::raw("│ "),
        Span::raw(app.model_name.clone()),
        Span::raw(" │ "),
        Span::styled(status, Style::default().fg(color)),
        Span::raw(" │ "),
        key,
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn render_avatar(app: &App, frame: &mut Frame, area: Rect) {
    let expressions = app.session.expressions();
    let current = expressions.current();
    let (face, mood) = face_for(current);

    let mut lines: Vec<Line> = vec![Line::raw("")];
    lines.extend(face.iter().map(|row| Line::styled(*row, Style::default().fg(Color::LightMagenta))));
    lines.push(Line::raw(""));
    lines.push(Line::from(vec![
        Span::styled(current.to_string(), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!(" {mood}")),
    ]));

    match expressions.remaining() {
        Some(left) => lines.push(Line::styled(
            format!("back to neutral in {left:.1}s"),
            Style::default().fg(Color::DarkGray),
        )),
        None => lines.push(Line::raw("")),
    }

    if app.session.is_busy() {
        let dots = ".".repeat(app.animation_frame as usize + 1);
        lines.push(Line::styled(format!("thinking{dots}"), Style::default().fg(Color::Magenta)));
    }

    let block = Block::default().borders(Borders::ALL).title(" Avatar ");
    frame.render_widget(
        Paragraph::new(Text::from(lines)).alignment(Alignment::Center).block(block),
        area,
    );
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(" Chat ");
    let inner = block.inner(area);
    app.chat_height = inner.height;
    app.chat_width = inner.width;
    app.update_scroll();

    let mut lines: Vec<Line> = Vec::new();
    for entry in app.session.log().lines() {
        let label = Span::styled(
            format!("{}: ", entry.author.label()),
            Style::default().fg(author_color(entry.author)).add_modifier(Modifier::BOLD),
        );
        let mut text_lines = entry.text.lines();
        let first = text_lines.next().unwrap_or_default();
        lines.push(Line::from(vec![label, Span::raw(first.to_string())]));
        lines.extend(text_lines.map(|l| Line::raw(l.to_string())));
    }

    if app.session.is_busy() {
        let dots = ".".repeat(app.animation_frame as usize + 1);
        lines.push(Line::styled(
            format!("AI: Thinking{dots}"),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ));
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let title = if app.session.priming_state() == PrimingState::Priming {
        " Message (assistant warming up) · Enter send · Esc quit "
    } else {
        " Message · Enter send · PgUp/PgDn scroll · /reset · Esc quit "
    };
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(area);

    // Keep the cursor visible on long input by scrolling horizontally
    let width = inner.width.max(1) as usize;
    let offset = app.cursor.saturating_sub(width.saturating_sub(1));
    let visible: String = app.input.chars().skip(offset).take(width).collect();

    frame.render_widget(Paragraph::new(visible).block(block), area);
    frame.set_cursor_position(Position::new(
        inner.x + (app.cursor - offset) as u16,
        inner.y,
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_builtin_expression_has_a_face() {
        for code in pet_core::expression::BUILTIN_EXPRESSIONS {
            let (face, mood) = face_for(code);
            assert_eq!(face.len(), 4);
            assert_ne!(mood, "custom", "{code} fell back to the generic face");
        }
        assert_eq!(face_for("F42").1, "custom");
    }
}
