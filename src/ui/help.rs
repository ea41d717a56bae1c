//! Help overlay: scrollable keybinding table grouped by context, including
//! any overrides from the config file.

use crate::app::App;
use crate::keybindings::Context;
use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Row, Table},
    Frame,
};

const CONTEXT_ORDER: [(Context, &str); 6] = [
    (Context::Global, "General"),
    (Context::Menu, "Sidebar"),
    (Context::EntryList, "Entry List"),
    (Context::Detail, "Entry"),
    (Context::Prompt, "Prompt"),
    (Context::Confirm, "Confirmation"),
];

pub fn render(f: &mut Frame, app: &App) {
    let overlay = centered_rect(80, 80, f.area());
    if overlay.width < 20 || overlay.height < 6 {
        return;
    }
    f.render_widget(Clear, overlay);

    let bindings = app.keybindings.all_bindings();
    let mut rows: Vec<Row> = Vec::new();

    for (ctx, label) in &CONTEXT_ORDER {
        let ctx_bindings: Vec<_> = bindings.iter().filter(|(c, _, _, _)| c == ctx).collect();
        if ctx_bindings.is_empty() {
            continue;
        }
        if !rows.is_empty() {
            rows.push(Row::new(vec![String::new(), String::new()]));
        }
        rows.push(
            Row::new(vec![
                Line::from(Span::styled(
                    format!("-- {} --", label),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
            ])
            .style(Style::default().fg(Color::Cyan)),
        );
        for (_, key_str, _, description) in ctx_bindings {
            rows.push(Row::new(vec![
                format!("  {}", key_str),
                description.to_string(),
            ]));
        }
    }

    let visible_height = overlay.height.saturating_sub(4) as usize; // borders + header
    let max_scroll = rows.len().saturating_sub(visible_height);
    let scroll = app.help_scroll_offset.min(max_scroll);
    let visible_rows: Vec<Row> = rows.into_iter().skip(scroll).take(visible_height).collect();

    let title = if max_scroll > 0 {
        format!(" Help ({}/{}) ", scroll + 1, max_scroll + 1)
    } else {
        " Help (? to close) ".to_string()
    };

    let table = Table::new(
        visible_rows,
        [Constraint::Length(18), Constraint::Min(20)],
    )
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(title),
    )
    .header(
        Row::new(vec!["Key", "Action"])
            .style(
                Style::default()
                    .add_modifier(Modifier::BOLD)
                    .add_modifier(Modifier::UNDERLINED),
            )
            .bottom_margin(1),
    );
    f.render_widget(table, overlay);

    if scroll < max_scroll {
        let hint = Paragraph::new(Span::styled(
            " j/k to scroll, ? or Esc to close ",
            Style::default().fg(Color::DarkGray),
        ));
        let hint_area = Rect {
            x: overlay.x + 1,
            y: overlay.y + overlay.height.saturating_sub(1),
            width: overlay.width.saturating_sub(2),
            height: 1,
        };
        f.render_widget(hint, hint_area);
    }
}

/// Centered rectangle taking the given percentages of `area`.
pub(super) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let width = (u32::from(area.width) * u32::from(percent_x) / 100) as u16;
    let height = (u32::from(area.height) * u32::from(percent_y) / 100) as u16;
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}
