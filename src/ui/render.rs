//! Top-level render dispatch.

use crate::app::{App, ConfirmAction, Prompt};
use crate::sync::Mode;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use super::{detail, entries, help, sidebar, status};

/// Minimum terminal dimensions required for normal operation.
pub(super) const MIN_WIDTH: u16 = 60;
pub(super) const MIN_HEIGHT: u16 = 10;

pub(super) fn render(f: &mut Frame, app: &mut App) {
    let area = f.area();
    if area.width < 1 || area.height < 1 {
        return;
    }

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = if area.height < 3 || area.width < 20 {
            Paragraph::new("Too small")
        } else {
            Paragraph::new(format!(
                "Terminal too small\n\nMinimum: {}x{}\nCurrent: {}x{}",
                MIN_WIDTH, MIN_HEIGHT, area.width, area.height
            ))
            .alignment(Alignment::Center)
        };
        f.render_widget(msg, area);
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(28), Constraint::Percentage(72)])
        .split(rows[0]);

    sidebar::render(f, app, columns[0]);
    match app.sync.mode() {
        Mode::List => entries::render(f, app, columns[1]),
        Mode::Detail => detail::render(f, app, columns[1]),
    }
    status::render(f, app, rows[1]);

    if app.show_help {
        help::render(f, app);
    }
    if let Some(confirm) = &app.pending_confirm {
        render_confirm_overlay(f, confirm);
    }
    if let Some(prompt) = &app.prompt {
        render_prompt_overlay(f, prompt);
    }
}

fn overlay_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(4));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn render_confirm_overlay(f: &mut Frame, confirm: &ConfirmAction) {
    let text = match confirm {
        ConfirmAction::DeleteFeed { title, .. } => format!(
            "Unsubscribe from \"{}\"?\n\nIts entries will be removed.\n\n(y) Confirm  (n/Esc) Cancel",
            title
        ),
        ConfirmAction::DeleteTag { name } => format!(
            "Delete tag \"{}\"?\n\nFeeds keep their other tags.\n\n(y) Confirm  (n/Esc) Cancel",
            name
        ),
    };

    let overlay = overlay_rect(f.area(), 56, 7);
    if overlay.width < 10 || overlay.height < 5 {
        return;
    }
    f.render_widget(Clear, overlay);

    let paragraph = Paragraph::new(text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" Confirm "),
        )
        .alignment(Alignment::Center);
    f.render_widget(paragraph, overlay);
}

/// One row per field, the focused one with a cursor.
fn render_prompt_overlay(f: &mut Frame, prompt: &Prompt) {
    let height = prompt.fields.len() as u16 * 2 + 3;
    let overlay = overlay_rect(f.area(), 64, height);
    if overlay.width < 20 || overlay.height < 4 {
        return;
    }
    f.render_widget(Clear, overlay);

    let label_width = prompt
        .fields
        .iter()
        .map(|field| field.label.len())
        .max()
        .unwrap_or(0);
    let value_width = (overlay.width as usize).saturating_sub(label_width + 6);

    let mut lines = Vec::with_capacity(prompt.fields.len() * 2 + 1);
    let mut cursor = None;
    for (i, field) in prompt.fields.iter().enumerate() {
        let focused = i == prompt.focused;
        // Show the tail of long values so the cursor stays visible.
        let mut shown = field.value.as_str();
        while UnicodeWidthStr::width(shown) > value_width.saturating_sub(1) {
            let mut chars = shown.chars();
            chars.next();
            shown = chars.as_str();
        }
        let label_style = if focused {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        if focused {
            let x = overlay.x + 1 + (label_width + 2 + UnicodeWidthStr::width(shown)) as u16;
            let y = overlay.y + 1 + lines.len() as u16;
            cursor = Some(Position::new(x, y));
        }
        lines.push(Line::from(vec![
            Span::styled(format!("{:>width$}: ", field.label, width = label_width), label_style),
            Span::raw(shown.to_string()),
        ]));
        lines.push(Line::from(""));
    }
    lines.push(Line::from(Span::styled(
        "(Enter) Submit  (Tab) Next field  (Esc) Cancel",
        Style::default().fg(Color::DarkGray),
    )));

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(prompt.title()),
    );
    f.render_widget(paragraph, overlay);

    if let Some(position) = cursor {
        f.set_cursor_position(position);
    }
}
