use crate::app::{App, Focus};
use crate::util::{strip_control_chars, truncate_to_width};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
    Frame,
};

/// Render the entry list for the active scope.
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    let is_focused = app.focus == Focus::Entries;
    let store = app.sync.store();
    let aggregates = app.sync.aggregates();
    let inner_width = area.width.saturating_sub(2) as usize;
    let highlighted = app.sync.current_entry().map(|e| e.id);

    let mut items: Vec<ListItem> = store
        .entries()
        .iter()
        .map(|entry| {
            let mut spans = Vec::with_capacity(4);
            spans.push(if entry.favorite {
                Span::styled("★ ", Style::default().fg(Color::Yellow))
            } else {
                Span::raw("  ")
            });

            let feed_title = aggregates
                .feed(entry.feed_id)
                .map(|feed| strip_control_chars(feed.display_title()).into_owned())
                .unwrap_or_default();
            let suffix = match entry.date.as_deref() {
                Some(date) if !date.is_empty() => format!("  {} · {}", feed_title, date),
                _ => format!("  {}", feed_title),
            };
            let suffix = truncate_to_width(&suffix, inner_width / 3).into_owned();
            let room = inner_width.saturating_sub(2 + suffix.chars().count());

            let mut title_style = if entry.read {
                Style::default().fg(Color::Gray)
            } else {
                Style::default().add_modifier(Modifier::BOLD)
            };
            if highlighted == Some(entry.id) {
                title_style = title_style.fg(Color::Cyan);
            }
            let title = strip_control_chars(&entry.title);
            spans.push(Span::styled(
                truncate_to_width(&title, room).into_owned(),
                title_style,
            ));
            spans.push(Span::styled(suffix, Style::default().fg(Color::DarkGray)));
            ListItem::new(Line::from(spans))
        })
        .collect();

    if store.is_loading() {
        items.push(ListItem::new(Span::styled(
            "  Loading...",
            Style::default().fg(Color::DarkGray),
        )));
    } else if items.is_empty() {
        items.push(ListItem::new("  No entries"));
    }

    let border_style = if is_focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };

    let scope = app.sync.scope();
    let mut title = format!(" {} [{}]", app.sync.scope_title(), scope.status.label());
    if let Some(query) = &scope.query {
        title.push_str(&format!(" /{}", query));
    }
    title.push(' ');

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(title),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));

    let selected = (!store.is_empty()).then_some(app.entry_selected);
    let mut state = ListState::default().with_selected(selected);
    f.render_stateful_widget(list, area, &mut state);
}
