use crate::app::{App, RenderedDetail};
use crate::util::{html_to_lines, strip_control_chars};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::loop_runner::SPINNER_FRAMES;

const SPINNER: [&str; SPINNER_FRAMES] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Render the active entry. Content is converted once per entry and width.
pub fn render(f: &mut Frame, app: &mut App, area: Rect) {
    if area.width < 3 || area.height < 3 {
        return;
    }
    let inner_width = area.width.saturating_sub(2);

    let Some(entry) = app.sync.current_entry() else {
        let paragraph = Paragraph::new("No entry selected")
            .block(Block::default().borders(Borders::ALL).title(" Entry "));
        f.render_widget(paragraph, area);
        return;
    };
    let entry_id = entry.id;

    let feed_title = app
        .sync
        .aggregates()
        .feed(entry.feed_id)
        .map(|feed| feed.display_title().to_string())
        .unwrap_or_default();
    let mut byline: Vec<&str> = vec![feed_title.as_str()];
    byline.extend(entry.author.as_deref().filter(|a| !a.is_empty()));
    byline.extend(entry.date.as_deref().filter(|d| !d.is_empty()));

    let mut marks = String::new();
    if entry.favorite {
        marks.push_str("★ ");
    }
    if !entry.read {
        marks.push_str("● ");
    }

    let mut lines = vec![
        Line::from(vec![
            Span::styled(marks, Style::default().fg(Color::Yellow)),
            Span::styled(
                strip_control_chars(&entry.title).into_owned(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(Span::styled(
            strip_control_chars(&byline.join(" · ")).into_owned(),
            Style::default().fg(Color::DarkGray),
        )),
    ];
    if let Some(link) = entry.link.as_deref().filter(|l| !l.is_empty()) {
        lines.push(Line::from(Span::styled(
            strip_control_chars(link).into_owned(),
            Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::UNDERLINED),
        )));
    }
    lines.push(Line::from(""));
    let header_len = lines.len();

    let shown = app.sync.displayed_entry().map(|e| e.id) == Some(entry_id);
    let body: Vec<Line> = if shown {
        let stale = !matches!(
            &app.detail_cache,
            Some(c) if c.id == entry_id && c.width == inner_width
        );
        if stale {
            let html = app
                .sync
                .displayed_entry()
                .and_then(|e| e.content.as_deref())
                .unwrap_or_default();
            app.detail_cache = Some(RenderedDetail {
                id: entry_id,
                width: inner_width,
                lines: html_to_lines(html, inner_width as usize),
            });
        }
        app.detail_cache
            .as_ref()
            .map(|c| c.lines.iter().map(|l| Line::from(l.clone())).collect())
            .unwrap_or_default()
    } else if app.sync.is_awaiting_content() {
        vec![Line::from(Span::styled(
            format!("{} Loading...", SPINNER[app.spinner_frame % SPINNER_FRAMES]),
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        vec![Line::from(Span::styled(
            "Content unavailable. Press R to retry.",
            Style::default().fg(Color::Red),
        ))]
    };

    // Keep the scroll inside the content for the current viewport.
    let viewport = area.height.saturating_sub(2) as usize;
    app.detail_viewport = viewport;
    let total = header_len + body.len();
    app.detail_scroll = app.detail_scroll.min(total.saturating_sub(viewport));

    lines.extend(body);
    let position = if total > viewport {
        format!(" {}/{} ", app.detail_scroll + viewport.min(total), total)
    } else {
        String::new()
    };

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" Entry ")
                .title_bottom(Line::from(position).right_aligned()),
        )
        .scroll((app.detail_scroll.min(u16::MAX as usize) as u16, 0));
    f.render_widget(paragraph, area);
}
