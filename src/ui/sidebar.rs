use crate::app::{App, Focus, MenuItem};
use crate::util::{strip_control_chars, truncate_to_width};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
    Frame,
};

/// Render the sidebar: sources with unread counts, the active one marked.
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    let is_focused = app.focus == Focus::Menu;
    let aggregates = app.sync.aggregates();
    let active = &app.sync.scope().source;
    let inner_width = area.width.saturating_sub(2) as usize;

    let items: Vec<ListItem> = app
        .menu_items()
        .iter()
        .map(|item| {
            let source = item.source();
            let unread = aggregates.unread_for(&source);
            let (prefix, label) = match item {
                MenuItem::All => ("", "All items".to_string()),
                MenuItem::Tag { name, collapsed } => {
                    (if *collapsed { "▸ " } else { "▾ " }, name.clone())
                }
                MenuItem::Feed { id, nested } => {
                    let title = aggregates
                        .feed(*id)
                        .map(|feed| strip_control_chars(feed.display_title()).into_owned())
                        .unwrap_or_default();
                    (if *nested { "    " } else { "  " }, title)
                }
            };

            let count = if unread > 0 {
                format!(" {}", unread)
            } else {
                String::new()
            };
            let room = inner_width.saturating_sub(prefix.chars().count() + count.len());
            let label = truncate_to_width(&label, room).into_owned();

            let mut style = if unread > 0 {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            if source == *active {
                style = style.fg(Color::Cyan);
            }

            ListItem::new(Line::from(vec![
                Span::raw(prefix),
                Span::styled(label, style),
                Span::styled(count, Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();

    let border_style = if is_focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(format!("Feeds ({})", aggregates.feeds().len())),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));

    let mut state = ListState::default().with_selected(Some(app.menu_selected));
    f.render_stateful_widget(list, area, &mut state);
}
