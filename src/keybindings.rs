//! Keybinding registry: maps actions to key events with config overrides.
use crossterm::event::{KeyCode, KeyModifiers};
use std::collections::HashMap;

// ============================================================================
// Action Enum
// ============================================================================

/// All user-facing actions that can be triggered by keybindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Quit,
    NavDown,
    NavUp,
    CycleFocus,
    Back,
    Select,
    HistoryBack,
    NextEntry,
    PrevEntry,
    ScrollDown,
    ScrollUp,
    PageDown,
    PageUp,
    ToggleRead,
    ToggleFavorite,
    OpenLink,
    MarkScopeRead,
    Refresh,
    LoadMore,
    ShowAll,
    ShowUnread,
    ShowRead,
    ShowFavorites,
    EnterSearch,
    CancelPrompt,
    SubmitPrompt,
    Subscribe,
    EditItem,
    DeleteItem,
    CollapseTag,
    ExpandTag,
    Confirm,
    ShowHelp,
}

impl Action {
    /// Human-readable description for the help screen.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Quit => "Quit application",
            Self::NavDown => "Navigate down",
            Self::NavUp => "Navigate up",
            Self::CycleFocus => "Switch between menu and entries",
            Self::Back => "Back to list / dismiss",
            Self::Select => "Open selected item",
            Self::HistoryBack => "Go to previous location",
            Self::NextEntry => "Next entry",
            Self::PrevEntry => "Previous entry",
            Self::ScrollDown => "Scroll down one line",
            Self::ScrollUp => "Scroll up one line",
            Self::PageDown => "Page down",
            Self::PageUp => "Page up",
            Self::ToggleRead => "Toggle read",
            Self::ToggleFavorite => "Toggle favorite",
            Self::OpenLink => "Open entry link in browser",
            Self::MarkScopeRead => "Mark all shown entries read",
            Self::Refresh => "Reload entries and feeds",
            Self::LoadMore => "Load more entries",
            Self::ShowAll => "Show all entries",
            Self::ShowUnread => "Show unread entries",
            Self::ShowRead => "Show read entries",
            Self::ShowFavorites => "Show favorites",
            Self::EnterSearch => "Search entries",
            Self::CancelPrompt => "Cancel input",
            Self::SubmitPrompt => "Submit input",
            Self::Subscribe => "Subscribe to feed",
            Self::EditItem => "Rename tag / edit feed tags",
            Self::DeleteItem => "Delete feed or tag",
            Self::CollapseTag => "Collapse tag group",
            Self::ExpandTag => "Expand tag group",
            Self::Confirm => "Confirm",
            Self::ShowHelp => "Show help",
        }
    }
}

// ============================================================================
// Context Enum
// ============================================================================

/// Dispatch context: determines which bindings are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Context {
    Global,
    Menu,
    EntryList,
    Detail,
    Prompt,
    Confirm,
}

// ============================================================================
// Key Specification
// ============================================================================

/// A key event: code + modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeySpec {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeySpec {
    pub const fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    pub const fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    pub const fn char(c: char) -> Self {
        Self::plain(KeyCode::Char(c))
    }

    pub const fn ctrl(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    pub const fn shift(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::SHIFT)
    }
}

/// Parse a key string from config into a KeySpec.
///
/// Supported formats:
/// - Single char: "q", "j", "/"
/// - Named keys: "Enter", "Esc", "Tab", "Up", "Down", "Backspace", "Space"
/// - Modifier combos: "Ctrl+d", "Shift+Space"
/// - Function keys: "F1" through "F12"
fn parse_key_string(s: &str) -> Option<KeySpec> {
    let s = s.trim();

    if let Some(rest) = s.strip_prefix("Ctrl+") {
        let rest = rest.trim();
        if rest.chars().count() == 1 {
            let c = rest.chars().next()?;
            return Some(KeySpec::ctrl(c));
        }
        return None;
    }

    if let Some(rest) = s.strip_prefix("Shift+") {
        let base = parse_key_string(rest)?;
        if base.modifiers != KeyModifiers::NONE {
            return None;
        }
        return Some(match base.code {
            // Terminals report shifted letters as the uppercase char.
            KeyCode::Char(c) if c.is_ascii_alphabetic() => KeySpec::char(c.to_ascii_uppercase()),
            code => KeySpec::shift(code),
        });
    }

    match s.to_lowercase().as_str() {
        "enter" | "return" => return Some(KeySpec::plain(KeyCode::Enter)),
        "esc" | "escape" => return Some(KeySpec::plain(KeyCode::Esc)),
        "tab" => return Some(KeySpec::plain(KeyCode::Tab)),
        "up" => return Some(KeySpec::plain(KeyCode::Up)),
        "down" => return Some(KeySpec::plain(KeyCode::Down)),
        "left" => return Some(KeySpec::plain(KeyCode::Left)),
        "right" => return Some(KeySpec::plain(KeyCode::Right)),
        "backspace" => return Some(KeySpec::plain(KeyCode::Backspace)),
        "space" => return Some(KeySpec::char(' ')),
        "pageup" => return Some(KeySpec::plain(KeyCode::PageUp)),
        "pagedown" => return Some(KeySpec::plain(KeyCode::PageDown)),
        _ => {}
    }

    if s.len() > 1 && (s.starts_with('F') || s.starts_with('f')) {
        if let Ok(n) = s[1..].parse::<u8>() {
            if (1..=12).contains(&n) {
                return Some(KeySpec::plain(KeyCode::F(n)));
            }
        }
    }

    if s.chars().count() == 1 {
        let c = s.chars().next()?;
        return Some(KeySpec::char(c));
    }

    None
}

/// Format a KeySpec as a human-readable string for the help screen.
fn format_key(key: &KeySpec) -> String {
    let modifier = if key.modifiers.contains(KeyModifiers::CONTROL) {
        "Ctrl+"
    } else if key.modifiers.contains(KeyModifiers::SHIFT) {
        "Shift+"
    } else {
        ""
    };

    let key_name = match key.code {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::Up => "Up".to_string(),
        KeyCode::Down => "Down".to_string(),
        KeyCode::Left => "Left".to_string(),
        KeyCode::Right => "Right".to_string(),
        KeyCode::Backspace => "Backspace".to_string(),
        KeyCode::PageUp => "PageUp".to_string(),
        KeyCode::PageDown => "PageDown".to_string(),
        KeyCode::F(n) => format!("F{}", n),
        _ => "?".to_string(),
    };

    format!("{}{}", modifier, key_name)
}

// ============================================================================
// Keybinding Registry
// ============================================================================

/// Registry of keybindings, supporting default bindings and config overrides.
///
/// The same key can map to different actions in different contexts; lookups
/// fall back to `Global`.
pub struct KeybindingRegistry {
    lookup: HashMap<(Context, KeySpec), Action>,
    /// All bindings in registration order, for the help screen.
    bindings: Vec<(Context, KeySpec, Action)>,
}

impl KeybindingRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            lookup: HashMap::new(),
            bindings: Vec::new(),
        };
        registry.register_defaults();
        registry
    }

    fn bind(&mut self, context: Context, key: KeySpec, action: Action) {
        self.lookup.insert((context, key), action);
        self.bindings.push((context, key, action));
    }

    fn bind_all(&mut self, context: Context, keys: &[KeySpec], action: Action) {
        for key in keys {
            self.bind(context, *key, action);
        }
    }

    fn register_defaults(&mut self) {
        use Context::*;

        // === Global ===
        self.bind_all(Global, &[KeySpec::char('q'), KeySpec::ctrl('c')], Action::Quit);
        self.bind_all(
            Global,
            &[KeySpec::char('j'), KeySpec::plain(KeyCode::Down)],
            Action::NavDown,
        );
        self.bind_all(
            Global,
            &[KeySpec::char('k'), KeySpec::plain(KeyCode::Up)],
            Action::NavUp,
        );
        self.bind(Global, KeySpec::plain(KeyCode::Tab), Action::CycleFocus);
        self.bind(Global, KeySpec::plain(KeyCode::Esc), Action::Back);
        self.bind(Global, KeySpec::plain(KeyCode::Enter), Action::Select);
        self.bind(Global, KeySpec::plain(KeyCode::Backspace), Action::HistoryBack);
        self.bind_all(
            Global,
            &[KeySpec::char('n'), KeySpec::char(' ')],
            Action::NextEntry,
        );
        self.bind_all(
            Global,
            &[KeySpec::char('p'), KeySpec::shift(KeyCode::Char(' '))],
            Action::PrevEntry,
        );
        self.bind_all(Global, &[KeySpec::char('m'), KeySpec::char('r')], Action::ToggleRead);
        self.bind_all(
            Global,
            &[KeySpec::char('f'), KeySpec::char('s')],
            Action::ToggleFavorite,
        );
        self.bind_all(Global, &[KeySpec::char('v'), KeySpec::char('o')], Action::OpenLink);
        self.bind(Global, KeySpec::char('A'), Action::MarkScopeRead);
        self.bind_all(
            Global,
            &[KeySpec::char('R'), KeySpec::plain(KeyCode::F(5))],
            Action::Refresh,
        );
        self.bind(Global, KeySpec::char('1'), Action::ShowAll);
        self.bind(Global, KeySpec::char('2'), Action::ShowUnread);
        self.bind(Global, KeySpec::char('3'), Action::ShowRead);
        self.bind(Global, KeySpec::char('4'), Action::ShowFavorites);
        self.bind(Global, KeySpec::char('/'), Action::EnterSearch);
        self.bind(Global, KeySpec::char('+'), Action::Subscribe);
        self.bind(Global, KeySpec::char('?'), Action::ShowHelp);

        // === Menu ===
        self.bind(Menu, KeySpec::char('e'), Action::EditItem);
        self.bind(Menu, KeySpec::char('d'), Action::DeleteItem);
        self.bind_all(
            Menu,
            &[KeySpec::char('h'), KeySpec::plain(KeyCode::Left)],
            Action::CollapseTag,
        );
        self.bind_all(
            Menu,
            &[KeySpec::char('l'), KeySpec::plain(KeyCode::Right)],
            Action::ExpandTag,
        );

        // === Entry list ===
        self.bind(EntryList, KeySpec::char('L'), Action::LoadMore);

        // === Detail ===
        self.bind(Detail, KeySpec::plain(KeyCode::Right), Action::NextEntry);
        self.bind(Detail, KeySpec::plain(KeyCode::Left), Action::PrevEntry);
        self.bind_all(
            Detail,
            &[KeySpec::char('j'), KeySpec::plain(KeyCode::Down)],
            Action::ScrollDown,
        );
        self.bind_all(
            Detail,
            &[KeySpec::char('k'), KeySpec::plain(KeyCode::Up)],
            Action::ScrollUp,
        );
        self.bind_all(
            Detail,
            &[KeySpec::ctrl('d'), KeySpec::plain(KeyCode::PageDown)],
            Action::PageDown,
        );
        self.bind_all(
            Detail,
            &[KeySpec::ctrl('u'), KeySpec::plain(KeyCode::PageUp)],
            Action::PageUp,
        );
        self.bind(Detail, KeySpec::char('b'), Action::Back);

        // === Prompt (text input) ===
        self.bind(Prompt, KeySpec::plain(KeyCode::Esc), Action::CancelPrompt);
        self.bind(Prompt, KeySpec::plain(KeyCode::Enter), Action::SubmitPrompt);

        // === Confirmation ===
        self.bind(Confirm, KeySpec::char('y'), Action::Confirm);
        self.bind_all(
            Confirm,
            &[KeySpec::char('n'), KeySpec::plain(KeyCode::Esc)],
            Action::CancelPrompt,
        );
    }

    /// Apply user overrides from config keybindings map.
    ///
    /// Keys in the map are action names (e.g., "quit", "toggle_read").
    /// Values are key strings (e.g., "q", "Ctrl+d", "F5").
    ///
    /// Returns a list of warnings for unrecognized action names or unparseable keys.
    pub fn apply_overrides(&mut self, overrides: &HashMap<String, String>) -> Vec<String> {
        let mut warnings = Vec::new();

        for (action_name, key_str) in overrides {
            let Some(action) = parse_action_name(action_name) else {
                warnings.push(format!("Unknown action '{}', ignoring", action_name));
                continue;
            };

            let Some(key) = parse_key_string(key_str) else {
                warnings.push(format!(
                    "Cannot parse key '{}' for action '{}', ignoring",
                    key_str, action_name
                ));
                continue;
            };

            // Rebind in every context the action was bound in.
            let mut contexts: Vec<Context> = Vec::new();
            for (ctx, _, a) in &self.bindings {
                if *a == action && !contexts.contains(ctx) {
                    contexts.push(*ctx);
                }
            }

            self.lookup.retain(|_, a| *a != action);
            self.bindings.retain(|(_, _, a)| *a != action);

            for ctx in contexts {
                self.bind(ctx, key, action);
            }

            tracing::info!(
                action = %action_name,
                key = %key_str,
                "Applied keybinding override"
            );
        }

        warnings
    }

    /// Look up the action for a given key in a given context.
    ///
    /// Tries the specific context first, then falls back to Global. Prompt
    /// and confirmation contexts never fall back, so typed text is not
    /// mistaken for commands.
    pub fn action_for_key(
        &self,
        code: KeyCode,
        modifiers: KeyModifiers,
        context: Context,
    ) -> Option<Action> {
        let key = KeySpec::new(code, modifiers);

        if let Some(&action) = self.lookup.get(&(context, key)) {
            return Some(action);
        }

        match context {
            Context::Global | Context::Prompt | Context::Confirm => None,
            _ => self.lookup.get(&(Context::Global, key)).copied(),
        }
    }

    /// All bindings for the help screen as
    /// (context, key_display_string, action, description) tuples.
    pub fn all_bindings(&self) -> Vec<(Context, String, Action, &'static str)> {
        self.bindings
            .iter()
            .map(|(ctx, key, action)| (*ctx, format_key(key), *action, action.describe()))
            .collect()
    }
}

impl Default for KeybindingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse an action name string (from config) into an Action enum.
fn parse_action_name(name: &str) -> Option<Action> {
    match name.to_lowercase().as_str() {
        "quit" => Some(Action::Quit),
        "nav_down" | "down" => Some(Action::NavDown),
        "nav_up" | "up" => Some(Action::NavUp),
        "cycle_focus" | "tab" => Some(Action::CycleFocus),
        "back" => Some(Action::Back),
        "select" | "enter" => Some(Action::Select),
        "history_back" => Some(Action::HistoryBack),
        "next_entry" | "next" => Some(Action::NextEntry),
        "prev_entry" | "previous" | "prev" => Some(Action::PrevEntry),
        "scroll_down" => Some(Action::ScrollDown),
        "scroll_up" => Some(Action::ScrollUp),
        "page_down" => Some(Action::PageDown),
        "page_up" => Some(Action::PageUp),
        "toggle_read" | "read" => Some(Action::ToggleRead),
        "toggle_favorite" | "favorite" | "star" => Some(Action::ToggleFavorite),
        "open_link" | "open" => Some(Action::OpenLink),
        "mark_scope_read" | "mark_all_read" => Some(Action::MarkScopeRead),
        "refresh" => Some(Action::Refresh),
        "load_more" => Some(Action::LoadMore),
        "show_all" => Some(Action::ShowAll),
        "show_unread" | "unread" => Some(Action::ShowUnread),
        "show_read" => Some(Action::ShowRead),
        "show_favorites" | "favorites" => Some(Action::ShowFavorites),
        "search" | "enter_search" => Some(Action::EnterSearch),
        "cancel" | "cancel_prompt" => Some(Action::CancelPrompt),
        "submit" | "submit_prompt" => Some(Action::SubmitPrompt),
        "subscribe" | "add_feed" => Some(Action::Subscribe),
        "edit" | "edit_item" => Some(Action::EditItem),
        "delete" | "delete_item" => Some(Action::DeleteItem),
        "collapse_tag" | "collapse" => Some(Action::CollapseTag),
        "expand_tag" | "expand" => Some(Action::ExpandTag),
        "confirm" => Some(Action::Confirm),
        "show_help" | "help" => Some(Action::ShowHelp),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
