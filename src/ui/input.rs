//! Keyboard input handling.
//!
//! Overlays capture keys first (help, confirmation, prompt); everything else
//! goes through the keybinding registry for the current context.

use crate::app::{App, AppEvent, Focus, Prompt};
use crate::keybindings::{Action as KbAction, Context as KbContext};
use crate::sync::{Direction, StatusFilter};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc;

use super::effects::dispatch;
use super::helpers::open_entry_link;
use super::Action;

/// Terminals report uppercase letters with SHIFT set; bindings store the
/// character alone. Shift is kept for space so shift-space stays distinct.
pub(super) fn normalize_key(code: KeyCode, modifiers: KeyModifiers) -> (KeyCode, KeyModifiers) {
    match code {
        KeyCode::Char(c) if c != ' ' => (code, modifiers.difference(KeyModifiers::SHIFT)),
        _ => (code, modifiers),
    }
}

pub(super) fn handle_input(
    app: &mut App,
    key: KeyEvent,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Action {
    if key.kind != KeyEventKind::Press {
        return Action::Continue;
    }
    let (code, modifiers) = normalize_key(key.code, key.modifiers);

    if app.show_help {
        return handle_help_input(app, code);
    }

    match app.context() {
        KbContext::Confirm => handle_confirm_input(app, code, modifiers, event_tx),
        KbContext::Prompt => handle_prompt_input(app, code, modifiers, event_tx),
        context => handle_view_input(app, context, code, modifiers, event_tx),
    }
}

/// Help overlay: j/k/Up/Down scroll, Esc/q/? dismiss.
fn handle_help_input(app: &mut App, code: KeyCode) -> Action {
    match code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') => {
            app.show_help = false;
            app.help_scroll_offset = 0;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.help_scroll_offset = app.help_scroll_offset.saturating_add(1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.help_scroll_offset = app.help_scroll_offset.saturating_sub(1);
        }
        _ => {}
    }
    Action::Continue
}

fn handle_confirm_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Action {
    match app
        .keybindings
        .action_for_key(code, modifiers, KbContext::Confirm)
    {
        Some(KbAction::Confirm) => {
            let commands = app.confirm();
            dispatch(app, commands, event_tx);
        }
        Some(KbAction::CancelPrompt) => app.pending_confirm = None,
        _ => {}
    }
    Action::Continue
}

fn handle_prompt_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Action {
    match app
        .keybindings
        .action_for_key(code, modifiers, KbContext::Prompt)
    {
        Some(KbAction::SubmitPrompt) => {
            let commands = app.submit_prompt();
            dispatch(app, commands, event_tx);
            return Action::Continue;
        }
        Some(KbAction::CancelPrompt) => {
            app.prompt = None;
            return Action::Continue;
        }
        _ => {}
    }

    let Some(prompt) = app.prompt.as_mut() else {
        return Action::Continue;
    };
    match code {
        KeyCode::Char(c)
            if !modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            prompt.insert(c)
        }
        KeyCode::Backspace => prompt.backspace(),
        KeyCode::Tab | KeyCode::Down => prompt.cycle(true),
        KeyCode::BackTab | KeyCode::Up => prompt.cycle(false),
        _ => {}
    }
    Action::Continue
}

fn handle_view_input(
    app: &mut App,
    context: KbContext,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Action {
    let Some(action) = app.keybindings.action_for_key(code, modifiers, context) else {
        return Action::Continue;
    };
    tracing::trace!(?action, ?context, "Key action");

    let commands = match action {
        KbAction::Quit => return Action::Quit,
        KbAction::ShowHelp => {
            app.show_help = true;
            Vec::new()
        }
        KbAction::CycleFocus => {
            app.focus = match app.focus {
                Focus::Menu => Focus::Entries,
                Focus::Entries => Focus::Menu,
            };
            Vec::new()
        }
        KbAction::NavDown | KbAction::NextEntry if context == KbContext::Menu => {
            app.menu_down();
            Vec::new()
        }
        KbAction::NavUp | KbAction::PrevEntry if context == KbContext::Menu => {
            app.menu_up();
            Vec::new()
        }
        KbAction::NavDown => app.entry_down(),
        KbAction::NavUp => {
            app.entry_up();
            Vec::new()
        }
        KbAction::NextEntry if context == KbContext::Detail => app.step_entry(Direction::Next),
        KbAction::PrevEntry if context == KbContext::Detail => {
            app.step_entry(Direction::Previous)
        }
        KbAction::NextEntry => app.entry_down(),
        KbAction::PrevEntry => {
            app.entry_up();
            Vec::new()
        }
        KbAction::Select => match context {
            KbContext::Menu => app.open_menu_selection(),
            KbContext::EntryList => app.open_highlighted(),
            _ => Vec::new(),
        },
        KbAction::Back => match context {
            KbContext::Detail => app.sync.leave_detail(),
            KbContext::Menu => {
                app.focus = Focus::Entries;
                Vec::new()
            }
            _ if app.sync.scope().query.is_some() => {
                app.entry_selected = 0;
                app.sync.set_query(None)
            }
            _ => Vec::new(),
        },
        KbAction::HistoryBack => app.history_back(),
        KbAction::ScrollDown => {
            app.scroll_down(1);
            Vec::new()
        }
        KbAction::ScrollUp => {
            app.scroll_up(1);
            Vec::new()
        }
        KbAction::PageDown => {
            app.scroll_down(app.detail_viewport.max(2) / 2);
            Vec::new()
        }
        KbAction::PageUp => {
            app.scroll_up(app.detail_viewport.max(2) / 2);
            Vec::new()
        }
        KbAction::ToggleRead => match app.target_entry().map(|e| e.id) {
            Some(id) => app.sync.toggle_read(id),
            None => Vec::new(),
        },
        KbAction::ToggleFavorite => match app.target_entry().map(|e| e.id) {
            Some(id) => app.sync.toggle_favorite(id),
            None => Vec::new(),
        },
        KbAction::OpenLink => {
            open_entry_link(app);
            Vec::new()
        }
        KbAction::MarkScopeRead => {
            app.set_status(format!("Marked {} as read", app.sync.scope_title()));
            app.sync.mark_scope_read()
        }
        KbAction::Refresh => {
            app.set_status("Refreshing...");
            app.sync.refresh()
        }
        KbAction::LoadMore => app.sync.load_next_page(),
        KbAction::ShowAll => set_status_filter(app, StatusFilter::ALL),
        KbAction::ShowUnread => set_status_filter(app, StatusFilter::UNREAD),
        KbAction::ShowRead => set_status_filter(app, StatusFilter::READ),
        KbAction::ShowFavorites => set_status_filter(app, StatusFilter::FAVORITES),
        KbAction::EnterSearch => {
            app.open_search();
            Vec::new()
        }
        KbAction::Subscribe => {
            app.prompt = Some(Prompt::subscribe());
            Vec::new()
        }
        KbAction::EditItem => {
            app.open_edit();
            Vec::new()
        }
        KbAction::DeleteItem => {
            app.request_delete();
            Vec::new()
        }
        KbAction::CollapseTag => app.set_collapsed(true),
        KbAction::ExpandTag => app.set_collapsed(false),
        KbAction::CancelPrompt | KbAction::SubmitPrompt | KbAction::Confirm => Vec::new(),
    };
    dispatch(app, commands, event_tx);
    Action::Continue
}

fn set_status_filter(app: &mut App, status: StatusFilter) -> Vec<crate::sync::Command> {
    app.entry_selected = 0;
    app.sync.set_status_filter(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiClient, ApiOptions};
    use crate::app::ConfirmAction;
    use crate::keybindings::KeybindingRegistry;
    use crate::sync::{Entry, Mode, Route, Source, SyncOptions};

    fn test_app() -> App {
        let api = ApiClient::new(
            reqwest::Client::new(),
            ApiOptions {
                api_url: "http://127.0.0.1:9/api".to_string(),
                ..ApiOptions::default()
            },
        )
        .unwrap();
        App::new(api, KeybindingRegistry::new(), SyncOptions::default(), Vec::new())
    }

    fn press(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> Action {
        let (tx, _rx) = mpsc::channel(64);
        handle_input(app, KeyEvent::new(code, modifiers), &tx)
    }

    fn type_str(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c), KeyModifiers::NONE);
        }
    }

    fn with_entries(app: &mut App, ids: &[i64]) {
        app.navigate(Route::list(Source::All));
        let token = app.sync.store().token();
        let page = ids
            .iter()
            .map(|&id| Entry {
                id,
                feed_id: 1,
                title: format!("Entry {}", id),
                link: Some(format!("https://example.com/{}", id)),
                content: Some("<p>body</p>".into()),
                author: None,
                date: None,
                read: false,
                favorite: false,
            })
            .collect();
        app.sync.page_loaded(token, page);
        app.absorb_notifications();
    }

    #[test]
    fn test_normalize_strips_shift_from_letters_only() {
        assert_eq!(
            normalize_key(KeyCode::Char('A'), KeyModifiers::SHIFT),
            (KeyCode::Char('A'), KeyModifiers::NONE)
        );
        assert_eq!(
            normalize_key(KeyCode::Char(' '), KeyModifiers::SHIFT),
            (KeyCode::Char(' '), KeyModifiers::SHIFT)
        );
        assert_eq!(
            normalize_key(KeyCode::Char('c'), KeyModifiers::CONTROL | KeyModifiers::SHIFT),
            (KeyCode::Char('c'), KeyModifiers::CONTROL)
        );
    }

    #[tokio::test]
    async fn test_quit_key() {
        let mut app = test_app();
        assert!(matches!(
            press(&mut app, KeyCode::Char('q'), KeyModifiers::NONE),
            Action::Quit
        ));
    }

    #[tokio::test]
    async fn test_prompt_captures_command_keys() {
        let mut app = test_app();
        with_entries(&mut app, &[1, 2]);
        press(&mut app, KeyCode::Char('/'), KeyModifiers::NONE);
        assert_eq!(app.context(), KbContext::Prompt);

        type_str(&mut app, "quit");
        assert!(matches!(
            press(&mut app, KeyCode::Char('q'), KeyModifiers::NONE),
            Action::Continue
        ));
        assert_eq!(app.prompt.as_ref().unwrap().value(0), "quitq");

        press(&mut app, KeyCode::Enter, KeyModifiers::NONE);
        assert!(app.prompt.is_none());
        assert_eq!(app.sync.scope().query.as_deref(), Some("quitq"));
        assert!(app.sync.store().is_loading());
    }

    #[tokio::test]
    async fn test_escape_clears_active_search() {
        let mut app = test_app();
        with_entries(&mut app, &[1]);
        app.sync.set_query(Some("rust"));
        press(&mut app, KeyCode::Esc, KeyModifiers::NONE);
        assert_eq!(app.sync.scope().query, None);
    }

    #[tokio::test]
    async fn test_shifted_letter_reaches_binding() {
        let mut app = test_app();
        with_entries(&mut app, &[1, 2]);
        press(&mut app, KeyCode::Char('A'), KeyModifiers::SHIFT);
        assert!(app.sync.store().entries().iter().all(|e| e.read));
    }

    #[tokio::test]
    async fn test_enter_opens_highlighted_and_space_steps() {
        let mut app = test_app();
        with_entries(&mut app, &[1, 2, 3]);

        press(&mut app, KeyCode::Char('j'), KeyModifiers::NONE);
        press(&mut app, KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(app.sync.mode(), Mode::Detail);
        assert_eq!(app.sync.current_entry().map(|e| e.id), Some(2));

        press(&mut app, KeyCode::Char(' '), KeyModifiers::NONE);
        assert_eq!(app.sync.current_entry().map(|e| e.id), Some(3));
        assert_eq!(app.router.current(), &Route::entry(Source::All, 3));

        press(&mut app, KeyCode::Char(' '), KeyModifiers::SHIFT);
        assert_eq!(app.sync.current_entry().map(|e| e.id), Some(2));

        press(&mut app, KeyCode::Char('b'), KeyModifiers::NONE);
        assert_eq!(app.sync.mode(), Mode::List);
        assert_eq!(app.entry_selected, 1);
    }

    #[tokio::test]
    async fn test_toggle_keys_target_highlighted_entry() {
        let mut app = test_app();
        with_entries(&mut app, &[1, 2]);
        press(&mut app, KeyCode::Char('f'), KeyModifiers::NONE);
        press(&mut app, KeyCode::Char('m'), KeyModifiers::NONE);
        let first = app.sync.store().get(1).unwrap();
        assert!(first.favorite);
        assert!(first.read);
    }

    #[tokio::test]
    async fn test_confirm_cancel_and_accept() {
        let mut app = test_app();
        app.pending_confirm = Some(ConfirmAction::DeleteTag { name: "x".into() });
        press(&mut app, KeyCode::Char('n'), KeyModifiers::NONE);
        assert!(app.pending_confirm.is_none());

        app.pending_confirm = Some(ConfirmAction::DeleteTag { name: "x".into() });
        press(&mut app, KeyCode::Char('y'), KeyModifiers::NONE);
        assert!(app.pending_confirm.is_none());
    }

    #[tokio::test]
    async fn test_help_overlay_captures_keys() {
        let mut app = test_app();
        press(&mut app, KeyCode::Char('?'), KeyModifiers::NONE);
        assert!(app.show_help);
        assert!(matches!(
            press(&mut app, KeyCode::Char('j'), KeyModifiers::NONE),
            Action::Continue
        ));
        assert_eq!(app.help_scroll_offset, 1);
        press(&mut app, KeyCode::Esc, KeyModifiers::NONE);
        assert!(!app.show_help);
    }

    #[tokio::test]
    async fn test_release_events_ignored() {
        let mut app = test_app();
        let (tx, _rx) = mpsc::channel(8);
        let mut key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        key.kind = KeyEventKind::Release;
        assert!(matches!(handle_input(&mut app, key, &tx), Action::Continue));
    }
}
