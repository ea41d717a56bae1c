use crate::app::App;
use crate::keybindings::Context;
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::Paragraph,
    Frame,
};
use std::borrow::Cow;

/// Render the status bar: a transient message if one is set, otherwise
/// unread totals and key hints for the current context.
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 1 || area.height < 1 {
        return;
    }

    let text: Cow<'_, str> = if let Some((msg, _)) = &app.status_message {
        Cow::Borrowed(msg.as_ref())
    } else {
        let hints = match app.context() {
            Context::Menu => "[Enter]open [e]dit [d]elete [h/l]fold [+]subscribe [Tab]entries [?]help",
            Context::Detail => "[b]ack [space/n/p]next/prev [m]read [f]av [v]open [j/k]scroll [?]help",
            Context::Prompt => "[Tab]next field [Enter]submit [Esc]cancel",
            Context::Confirm => "[y]confirm [n]cancel",
            _ => "[Enter]open [1-4]filter [/]search [A]mark read [R]efresh [Tab]feeds [?]help [q]uit",
        };
        let busy = if app.is_busy() { "… " } else { "" };
        Cow::Owned(format!(
            "{}{} unread | {}",
            busy,
            app.sync.aggregates().total_unread(),
            hints
        ))
    };

    let style = Style::default().bg(Color::DarkGray).fg(Color::White);
    f.render_widget(Paragraph::new(text).style(style), area);
}
