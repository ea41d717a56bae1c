//! Application state for the terminal client.
//!
//! `App` owns the sync engine and the router and adds what only the
//! terminal needs: focus, cursors, scroll offsets, prompts and the status
//! line. It never performs IO itself; intents return the engine's
//! [`Command`]s for the UI layer to execute.

use std::borrow::Cow;
use std::collections::HashSet;

use tokio::time::Instant;

use crate::api::{ApiClient, ApiError};
use crate::keybindings::{Context, KeybindingRegistry};
use crate::sync::{
    split_tags, Command, Direction, Entry, EntryId, Feed, FeedId, FeedPatch, Mode, Notification,
    Route, Router, ScopeToken, Source, SyncController, SyncOptions,
};

/// Upper bound for scroll offsets; keeps arithmetic within `u16` for ratatui.
pub const MAX_SCROLL: usize = u16::MAX as usize;

/// How close to the end of the loaded list the cursor may get before the
/// next page is requested.
pub const LOAD_AHEAD: usize = 5;

/// Seconds a status message stays visible.
const STATUS_TTL_SECS: u64 = 3;

/// Maximum characters accepted in a single prompt field.
pub const MAX_FIELD_LEN: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Menu,
    Entries,
}

/// One row of the sidebar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuItem {
    All,
    Tag { name: String, collapsed: bool },
    /// `nested` feeds are listed under a tag group.
    Feed { id: FeedId, nested: bool },
}

impl MenuItem {
    pub fn source(&self) -> Source {
        match self {
            MenuItem::All => Source::All,
            MenuItem::Tag { name, .. } => Source::Tag(name.clone()),
            MenuItem::Feed { id, .. } => Source::Feed(*id),
        }
    }
}

// ============================================================================
// Prompts and confirmations
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptKind {
    Search,
    Subscribe,
    EditFeed(FeedId),
    RenameTag(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptField {
    pub label: &'static str,
    pub value: String,
}

impl PromptField {
    fn new(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            value: value.into(),
        }
    }
}

/// A modal text form with one or more fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub kind: PromptKind,
    pub fields: Vec<PromptField>,
    pub focused: usize,
}

impl Prompt {
    pub fn search(current: Option<&str>) -> Self {
        Self {
            kind: PromptKind::Search,
            fields: vec![PromptField::new("Search", current.unwrap_or_default())],
            focused: 0,
        }
    }

    pub fn subscribe() -> Self {
        Self {
            kind: PromptKind::Subscribe,
            fields: vec![PromptField::new("URL", ""), PromptField::new("Tags", "")],
            focused: 0,
        }
    }

    pub fn edit_feed(feed: &Feed) -> Self {
        Self {
            kind: PromptKind::EditFeed(feed.id),
            fields: vec![
                PromptField::new("Title", feed.title.as_str()),
                PromptField::new("URL", feed.url.as_str()),
                PromptField::new("Tags", feed.tags.join(", ")),
            ],
            focused: 0,
        }
    }

    pub fn rename_tag(name: &str) -> Self {
        Self {
            kind: PromptKind::RenameTag(name.to_string()),
            fields: vec![PromptField::new("Name", name)],
            focused: 0,
        }
    }

    pub fn title(&self) -> &'static str {
        match self.kind {
            PromptKind::Search => " Search ",
            PromptKind::Subscribe => " Subscribe to Feed ",
            PromptKind::EditFeed(_) => " Edit Feed ",
            PromptKind::RenameTag(_) => " Rename Tag ",
        }
    }

    pub fn value(&self, index: usize) -> &str {
        self.fields.get(index).map_or("", |f| f.value.as_str())
    }

    pub fn insert(&mut self, c: char) {
        if let Some(field) = self.fields.get_mut(self.focused) {
            if field.value.chars().count() < MAX_FIELD_LEN && !c.is_control() {
                field.value.push(c);
            }
        }
    }

    pub fn backspace(&mut self) {
        if let Some(field) = self.fields.get_mut(self.focused) {
            field.value.pop();
        }
    }

    pub fn cycle(&mut self, forward: bool) {
        let n = self.fields.len();
        if n == 0 {
            return;
        }
        self.focused = if forward {
            (self.focused + 1) % n
        } else {
            (self.focused + n - 1) % n
        };
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmAction {
    DeleteFeed { id: FeedId, title: String },
    DeleteTag { name: String },
}

// ============================================================================
// Events from background tasks
// ============================================================================

/// Results of spawned API requests, delivered to the event loop.
#[derive(Debug)]
pub enum AppEvent {
    PageLoaded {
        token: ScopeToken,
        result: Result<Vec<Entry>, ApiError>,
    },
    EntryLoaded {
        token: ScopeToken,
        id: EntryId,
        result: Result<Entry, ApiError>,
    },
    EntryPatched {
        id: EntryId,
        result: Result<(), ApiError>,
    },
    ScopeMarkedRead(Result<(), ApiError>),
    FeedsLoaded(Result<Vec<Feed>, ApiError>),
    FeedCreated {
        url: String,
        result: Result<(), ApiError>,
    },
    FeedUpdated {
        id: FeedId,
        result: Result<(), ApiError>,
    },
    FeedDeleted {
        id: FeedId,
        result: Result<(), ApiError>,
    },
    TagRenamed {
        name: String,
        new_name: String,
        result: Result<(), ApiError>,
    },
    TagDeleted {
        name: String,
        result: Result<(), ApiError>,
    },
    CollapsedSaved {
        tag: String,
        result: Result<(), ApiError>,
    },
    TaskPanicked {
        task: &'static str,
        error: String,
    },
}

/// Entry content already converted to terminal lines for a given width.
#[derive(Debug, Clone)]
pub struct RenderedDetail {
    pub id: EntryId,
    pub width: u16,
    pub lines: Vec<String>,
}

// ============================================================================
// App
// ============================================================================

pub struct App {
    pub api: ApiClient,
    pub sync: SyncController,
    pub router: Router,
    pub keybindings: KeybindingRegistry,
    pub focus: Focus,
    pub menu_selected: usize,
    pub entry_selected: usize,
    pub collapsed: HashSet<String>,
    pub detail_scroll: usize,
    pub detail_cache: Option<RenderedDetail>,
    /// Body height of the detail pane at the last render.
    pub detail_viewport: usize,
    pub prompt: Option<Prompt>,
    pub pending_confirm: Option<ConfirmAction>,
    pub show_help: bool,
    pub help_scroll_offset: usize,
    pub status_message: Option<(Cow<'static, str>, Instant)>,
    /// Outstanding feed-list fetches, for the spinner.
    pub feeds_in_flight: usize,
    pub spinner_frame: usize,
    pub needs_redraw: bool,
}

impl App {
    pub fn new(
        api: ApiClient,
        keybindings: KeybindingRegistry,
        options: SyncOptions,
        collapsed: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            api,
            sync: SyncController::new(options),
            router: Router::default(),
            keybindings,
            focus: Focus::Entries,
            menu_selected: 0,
            entry_selected: 0,
            collapsed: collapsed.into_iter().collect(),
            detail_scroll: 0,
            detail_cache: None,
            detail_viewport: 20,
            prompt: None,
            pending_confirm: None,
            show_help: false,
            help_scroll_offset: 0,
            status_message: None,
            feeds_in_flight: 0,
            spinner_frame: 0,
            needs_redraw: true,
        }
    }

    /// Keybinding context for the current state.
    pub fn context(&self) -> Context {
        if self.pending_confirm.is_some() {
            Context::Confirm
        } else if self.prompt.is_some() {
            Context::Prompt
        } else if self.focus == Focus::Menu {
            Context::Menu
        } else if self.sync.mode() == Mode::Detail {
            Context::Detail
        } else {
            Context::EntryList
        }
    }

    pub fn is_busy(&self) -> bool {
        self.feeds_in_flight > 0 || self.sync.store().is_loading() || self.sync.is_awaiting_content()
    }

    // ------------------------------------------------------------------------
    // Status line
    // ------------------------------------------------------------------------

    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.status_message = Some((msg.into(), Instant::now()));
        self.needs_redraw = true;
    }

    /// Clear the status message once it has expired. Returns true if a
    /// message was cleared.
    pub fn clear_expired_status(&mut self) -> bool {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed().as_secs() >= STATUS_TTL_SECS {
                self.status_message = None;
                return true;
            }
        }
        false
    }

    // ------------------------------------------------------------------------
    // Engine notifications
    // ------------------------------------------------------------------------

    /// Fold the engine's change notifications into view state.
    pub fn absorb_notifications(&mut self) {
        let notifications = self.sync.take_notifications();
        if notifications.is_empty() {
            return;
        }
        for notification in notifications {
            match notification {
                Notification::EntriesChanged => self.clamp_entry_selection(),
                Notification::AggregateChanged => self.clamp_menu_selection(),
                Notification::ModeChanged(mode) => {
                    if mode == Mode::Detail {
                        self.focus = Focus::Entries;
                    }
                    self.follow_current_entry();
                }
                Notification::EntryDisplayed(id) => {
                    self.detail_scroll = 0;
                    self.detail_cache = None;
                    if let Some(pos) = self.sync.store().position(id) {
                        self.entry_selected = pos;
                    }
                }
                Notification::Notice(msg) => self.set_status(msg),
            }
        }
        self.needs_redraw = true;
    }

    fn follow_current_entry(&mut self) {
        let current = self.sync.current_entry().map(|e| e.id);
        if let Some(pos) = current.and_then(|id| self.sync.store().position(id)) {
            self.entry_selected = pos;
        }
    }

    fn clamp_entry_selection(&mut self) {
        let len = self.sync.store().len();
        self.entry_selected = self.entry_selected.min(len.saturating_sub(1));
    }

    fn clamp_menu_selection(&mut self) {
        let len = self.menu_items().len();
        self.menu_selected = self.menu_selected.min(len.saturating_sub(1));
    }

    // ------------------------------------------------------------------------
    // Routing
    // ------------------------------------------------------------------------

    /// Commands for the first frame: resolve the initial route and load the
    /// feed list.
    pub fn start(&mut self, route: Route) -> Vec<Command> {
        let mut commands = self.navigate(route);
        commands.push(Command::FetchFeeds);
        commands
    }

    /// Record `route` in history and resolve it in the engine.
    pub fn navigate(&mut self, route: Route) -> Vec<Command> {
        let route = self.router.navigate(route);
        self.sync.open_route(&route)
    }

    pub fn history_back(&mut self) -> Vec<Command> {
        match self.router.back() {
            Some(route) => {
                tracing::debug!(route = %route, "History back");
                self.sync.open_route(&route)
            }
            None => Vec::new(),
        }
    }

    // ------------------------------------------------------------------------
    // Sidebar
    // ------------------------------------------------------------------------

    /// Sidebar rows: "All items", tag groups with their feeds (unless
    /// collapsed), then untagged feeds.
    pub fn menu_items(&self) -> Vec<MenuItem> {
        let aggregates = self.sync.aggregates();
        let mut items = vec![MenuItem::All];
        for group in aggregates.tag_groups() {
            let collapsed = self.collapsed.contains(&group.name);
            items.push(MenuItem::Tag {
                name: group.name.clone(),
                collapsed,
            });
            if !collapsed {
                items.extend(
                    group
                        .feeds
                        .iter()
                        .map(|&id| MenuItem::Feed { id, nested: true }),
                );
            }
        }
        items.extend(aggregates.untagged().map(|f| MenuItem::Feed {
            id: f.id,
            nested: false,
        }));
        items
    }

    pub fn selected_menu_item(&self) -> Option<MenuItem> {
        self.menu_items().into_iter().nth(self.menu_selected)
    }

    pub fn menu_down(&mut self) {
        let len = self.menu_items().len();
        if self.menu_selected + 1 < len {
            self.menu_selected += 1;
        }
    }

    pub fn menu_up(&mut self) {
        self.menu_selected = self.menu_selected.saturating_sub(1);
    }

    /// Open the highlighted sidebar source.
    pub fn open_menu_selection(&mut self) -> Vec<Command> {
        let Some(item) = self.selected_menu_item() else {
            return Vec::new();
        };
        self.focus = Focus::Entries;
        self.entry_selected = 0;
        self.navigate(Route::list(item.source()))
    }

    /// Collapse or expand the tag group under the cursor. A feed row acts
    /// on its parent group.
    pub fn set_collapsed(&mut self, collapsed: bool) -> Vec<Command> {
        let Some(name) = self.menu_tag_at_cursor() else {
            return Vec::new();
        };
        let changed = if collapsed {
            self.collapsed.insert(name.clone())
        } else {
            self.collapsed.remove(&name)
        };
        if !changed {
            return Vec::new();
        }
        if let Some(pos) = self
            .menu_items()
            .iter()
            .position(|item| matches!(item, MenuItem::Tag { name: n, .. } if *n == name))
        {
            self.menu_selected = pos;
        }
        vec![Command::SaveCollapsed {
            tag: name,
            collapsed,
        }]
    }

    fn menu_tag_at_cursor(&self) -> Option<String> {
        let items = self.menu_items();
        match items.get(self.menu_selected)? {
            MenuItem::Tag { name, .. } => Some(name.clone()),
            MenuItem::Feed { nested: true, .. } => {
                items[..self.menu_selected]
                    .iter()
                    .rev()
                    .find_map(|item| match item {
                        MenuItem::Tag { name, .. } => Some(name.clone()),
                        _ => None,
                    })
            }
            _ => None,
        }
    }

    /// Follow a tag rename in the locally held collapse set.
    pub fn rename_collapsed(&mut self, name: &str, new_name: &str) {
        if self.collapsed.remove(name) {
            self.collapsed.insert(new_name.to_string());
        }
    }

    // ------------------------------------------------------------------------
    // Entry list
    // ------------------------------------------------------------------------

    pub fn highlighted_entry(&self) -> Option<&Entry> {
        self.sync.store().at(self.entry_selected)
    }

    /// Entry that per-entry actions apply to: the active one in detail,
    /// otherwise the highlighted row.
    pub fn target_entry(&self) -> Option<&Entry> {
        match self.sync.mode() {
            Mode::Detail => self.sync.current_entry(),
            Mode::List => self.highlighted_entry(),
        }
    }

    pub fn entry_down(&mut self) -> Vec<Command> {
        if self.entry_selected + 1 < self.sync.store().len() {
            self.entry_selected += 1;
        }
        self.prefetch()
    }

    pub fn entry_up(&mut self) {
        self.entry_selected = self.entry_selected.saturating_sub(1);
    }

    pub fn open_highlighted(&mut self) -> Vec<Command> {
        match self.highlighted_entry().map(|e| e.id) {
            Some(id) => self.sync.select_entry(id),
            None => Vec::new(),
        }
    }

    /// Move to the neighboring loaded entry in detail. Never loads a page;
    /// only the list highlight prefetches.
    pub fn step_entry(&mut self, direction: Direction) -> Vec<Command> {
        self.sync.step(direction)
    }

    /// Request the next page once the cursor nears the end of what is
    /// loaded.
    pub fn prefetch(&mut self) -> Vec<Command> {
        let store = self.sync.store();
        if store.cursor().at_end || store.is_loading() {
            return Vec::new();
        }
        if self.entry_selected + LOAD_AHEAD >= store.len() {
            self.sync.load_next_page()
        } else {
            Vec::new()
        }
    }

    // ------------------------------------------------------------------------
    // Detail view
    // ------------------------------------------------------------------------

    pub fn scroll_down(&mut self, lines: usize) {
        self.detail_scroll = self.detail_scroll.saturating_add(lines).min(MAX_SCROLL);
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.detail_scroll = self.detail_scroll.saturating_sub(lines);
    }

    // ------------------------------------------------------------------------
    // Prompts
    // ------------------------------------------------------------------------

    pub fn open_search(&mut self) {
        let current = self.sync.scope().query.clone();
        self.prompt = Some(Prompt::search(current.as_deref()));
    }

    /// Open the edit form for the sidebar row under the cursor.
    pub fn open_edit(&mut self) {
        match self.selected_menu_item() {
            Some(MenuItem::Tag { name, .. }) => self.prompt = Some(Prompt::rename_tag(&name)),
            Some(MenuItem::Feed { id, .. }) => {
                if let Some(feed) = self.sync.aggregates().feed(id) {
                    self.prompt = Some(Prompt::edit_feed(feed));
                }
            }
            _ => {}
        }
    }

    /// Ask for confirmation before deleting the sidebar row under the cursor.
    pub fn request_delete(&mut self) {
        self.pending_confirm = match self.selected_menu_item() {
            Some(MenuItem::Tag { name, .. }) => Some(ConfirmAction::DeleteTag { name }),
            Some(MenuItem::Feed { id, .. }) => {
                self.sync
                    .aggregates()
                    .feed(id)
                    .map(|feed| ConfirmAction::DeleteFeed {
                        id,
                        title: feed.display_title().to_string(),
                    })
            }
            _ => None,
        };
    }

    pub fn submit_prompt(&mut self) -> Vec<Command> {
        let Some(prompt) = self.prompt.take() else {
            return Vec::new();
        };
        match &prompt.kind {
            PromptKind::Search => {
                self.entry_selected = 0;
                self.sync.set_query(Some(prompt.value(0)))
            }
            PromptKind::Subscribe => self.sync.subscribe(prompt.value(0), prompt.value(1)),
            PromptKind::EditFeed(id) => {
                let patch = FeedPatch {
                    title: Some(prompt.value(0).trim().to_string()),
                    url: Some(prompt.value(1).trim().to_string()),
                    tags: Some(split_tags(prompt.value(2))),
                };
                self.sync.edit_feed(*id, patch)
            }
            PromptKind::RenameTag(name) => self.sync.rename_tag(name, prompt.value(0)),
        }
    }

    pub fn confirm(&mut self) -> Vec<Command> {
        match self.pending_confirm.take() {
            Some(ConfirmAction::DeleteFeed { id, .. }) => self.sync.delete_feed(id),
            Some(ConfirmAction::DeleteTag { name }) => self.sync.delete_tag(&name),
            None => Vec::new(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
