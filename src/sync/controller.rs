//! Orchestration of scope, cache, aggregates and navigation.
//!
//! Every public intent enqueues internal messages, drains them in arrival
//! order, and hands back the commands the host must execute. Responses
//! are fed back through the `*_loaded` / `*_failed` methods, which follow
//! the same path.

use std::collections::VecDeque;

use super::aggregate::AggregateTracker;
use super::model::{
    split_tags, Entry, EntryId, EntryPatch, Feed, FeedId, FeedPatch, NewFeed, ReadTransition,
};
use super::navigation::{Direction, Mode, NavigationController, SelectOutcome};
use super::route::Route;
use super::scope::{FilterContext, FilterScope, Source, StatusFilter};
use super::store::{EntryStore, PageApplied, DEFAULT_PAGE_LIMIT};
use super::{Command, Notification, ScopeToken};

/// What to do after a remote entry mutation fails. The local state is
/// never rolled back either way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MutationFailurePolicy {
    /// Keep the optimistic local state and only surface the failure.
    #[default]
    KeepLocal,
    /// Also refetch the entry so a remote echo can correct the cache.
    Refetch,
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub page_limit: usize,
    pub mark_read_on_open: bool,
    pub on_mutation_failure: MutationFailurePolicy,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            page_limit: DEFAULT_PAGE_LIMIT,
            mark_read_on_open: true,
            on_mutation_failure: MutationFailurePolicy::KeepLocal,
        }
    }
}

// ============================================================================
// Messages
// ============================================================================

#[derive(Debug)]
enum Message {
    /// Adopt a new scope and start loading it.
    ScopeChanged {
        scope: FilterScope,
        pending: Option<EntryId>,
    },
    PageLoaded(PageApplied),
    /// An entry's flags changed, locally or by remote echo.
    EntryMutated {
        transition: Option<ReadTransition>,
    },
    AggregateDirty,
    ModeChanged,
    /// Enter detail for a cached entry, fetching content if needed.
    Activate(EntryId),
    /// Content for the active entry is available.
    Display(EntryId),
}

// ============================================================================
// SyncController
// ============================================================================

#[derive(Debug)]
pub struct SyncController {
    filter: FilterContext,
    store: EntryStore,
    aggregates: AggregateTracker,
    nav: NavigationController,
    options: SyncOptions,
    /// Entry requested by a route that triggered a reset.
    pending_detail: Option<EntryId>,
    /// Entry whose content fetch is outstanding.
    awaiting_content: Option<EntryId>,
    queue: VecDeque<Message>,
    commands: Vec<Command>,
    notifications: Vec<Notification>,
}

impl SyncController {
    pub fn new(options: SyncOptions) -> Self {
        Self {
            filter: FilterContext::default(),
            store: EntryStore::new(options.page_limit),
            aggregates: AggregateTracker::default(),
            nav: NavigationController::default(),
            options,
            pending_detail: None,
            awaiting_content: None,
            queue: VecDeque::new(),
            commands: Vec::new(),
            notifications: Vec::new(),
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn scope(&self) -> &FilterScope {
        self.filter.current()
    }

    pub fn store(&self) -> &EntryStore {
        &self.store
    }

    pub fn aggregates(&self) -> &AggregateTracker {
        &self.aggregates
    }

    pub fn mode(&self) -> Mode {
        self.nav.mode()
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// The active (or last-viewed) entry.
    pub fn current_entry(&self) -> Option<&Entry> {
        self.nav.current().and_then(|id| self.store.get(id))
    }

    /// The entry whose content is ready to show, if any.
    pub fn displayed_entry(&self) -> Option<&Entry> {
        self.nav.displayed().and_then(|id| self.store.get(id))
    }

    pub fn is_awaiting_content(&self) -> bool {
        self.awaiting_content.is_some()
    }

    pub fn scope_title(&self) -> String {
        match &self.filter.current().source {
            Source::All => "All items".to_string(),
            Source::Tag(tag) => tag.clone(),
            Source::Feed(id) => self
                .aggregates
                .feed(*id)
                .map(|f| f.display_title().to_string())
                .unwrap_or_else(|| format!("Feed {}", id)),
        }
    }

    /// Drain pending change notifications. Consecutive duplicates are
    /// collapsed.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        let mut out: Vec<Notification> = Vec::with_capacity(self.notifications.len());
        for n in self.notifications.drain(..) {
            if out.last() != Some(&n) {
                out.push(n);
            }
        }
        out
    }

    // ------------------------------------------------------------------------
    // Scope intents
    // ------------------------------------------------------------------------

    /// Resolve a route. The source comes from the route; status and query
    /// are kept from the active scope.
    pub fn open_route(&mut self, route: &Route) -> Vec<Command> {
        let candidate = self.filter.current().with_source(route.source.clone());
        self.request(candidate, route.entry)
    }

    pub fn set_status_filter(&mut self, status: StatusFilter) -> Vec<Command> {
        let candidate = self.filter.current().with_status(status);
        self.request(candidate, None)
    }

    pub fn set_query(&mut self, query: Option<&str>) -> Vec<Command> {
        let candidate = self.filter.current().with_query(query);
        self.request(candidate, None)
    }

    /// Reload the active scope and the feed list.
    pub fn refresh(&mut self) -> Vec<Command> {
        let scope = self.filter.current().clone();
        let pending = match self.nav.mode() {
            Mode::Detail => self.nav.current(),
            Mode::List => None,
        };
        self.enqueue(Message::ScopeChanged { scope, pending });
        self.commands.push(Command::FetchFeeds);
        self.drain()
    }

    fn request(&mut self, candidate: FilterScope, entry: Option<EntryId>) -> Vec<Command> {
        if self.filter.needs_reset(&candidate, self.store.is_empty()) {
            self.enqueue(Message::ScopeChanged {
                scope: candidate,
                pending: entry,
            });
        } else if let Some(id) = entry {
            self.enqueue(Message::Activate(id));
        } else if self.nav.leave_detail() {
            self.enqueue(Message::ModeChanged);
        }
        self.drain()
    }

    /// Claim the next page of the active scope, if allowed.
    pub fn load_next_page(&mut self) -> Vec<Command> {
        self.begin_page_load();
        self.drain()
    }

    fn begin_page_load(&mut self) {
        match self.store.begin_load() {
            Ok(req) => {
                let query = self.filter.current().page(req.offset, req.limit);
                tracing::debug!(offset = req.offset, limit = req.limit, "Requesting page");
                self.commands.push(Command::FetchPage {
                    token: req.token,
                    query,
                });
            }
            Err(refusal) => {
                tracing::debug!(reason = %refusal, "Page load skipped");
            }
        }
    }

    // ------------------------------------------------------------------------
    // Navigation intents
    // ------------------------------------------------------------------------

    pub fn select_entry(&mut self, id: EntryId) -> Vec<Command> {
        match self.nav.select(id) {
            SelectOutcome::AlreadyActive => {}
            SelectOutcome::EnterDetail => self.enqueue(Message::Activate(id)),
            SelectOutcome::Navigate => {
                let source = self.filter.current().source.clone();
                self.commands.push(Command::Navigate(Route::entry(source, id)));
            }
        }
        self.drain()
    }

    /// Move to the neighboring loaded entry. Never triggers a page load.
    pub fn step(&mut self, direction: Direction) -> Vec<Command> {
        if let Some(id) = self.nav.step(direction, &self.store) {
            let source = self.filter.current().source.clone();
            self.commands.push(Command::Navigate(Route::entry(source, id)));
        }
        self.drain()
    }

    pub fn leave_detail(&mut self) -> Vec<Command> {
        if self.nav.leave_detail() {
            self.enqueue(Message::ModeChanged);
        }
        self.drain()
    }

    // ------------------------------------------------------------------------
    // Entry mutations
    // ------------------------------------------------------------------------

    pub fn toggle_read(&mut self, id: EntryId) -> Vec<Command> {
        if let Some(read) = self.store.get(id).map(|e| e.read) {
            self.mutate(id, EntryPatch::read(!read));
        }
        self.drain()
    }

    pub fn toggle_favorite(&mut self, id: EntryId) -> Vec<Command> {
        if let Some(favorite) = self.store.get(id).map(|e| e.favorite) {
            self.mutate(id, EntryPatch::favorite(!favorite));
        }
        self.drain()
    }

    /// Optimistic local flip plus a fire-and-forget remote patch.
    fn mutate(&mut self, id: EntryId, patch: EntryPatch) {
        let Some(entry) = self.store.get_mut(id) else {
            return;
        };
        let transition = entry.apply(&patch);
        self.enqueue(Message::EntryMutated { transition });
        self.commands.push(Command::PatchEntry { id, patch });
    }

    /// Mark everything in the active scope read.
    pub fn mark_scope_read(&mut self) -> Vec<Command> {
        let scope = self.filter.current().clone();
        let flipped = self.store.mark_all_read();
        let touched = self.aggregates.mark_source_read(&scope.source);
        tracing::info!(
            entries = flipped,
            feeds = touched.len(),
            "Marked scope read"
        );
        self.notifications.push(Notification::EntriesChanged);
        self.enqueue(Message::AggregateDirty);

        let mut filter = scope.filter();
        filter.read = Some(true);
        self.commands.push(Command::MarkRead { filter });
        self.drain()
    }

    // ------------------------------------------------------------------------
    // Feed and tag management
    // ------------------------------------------------------------------------

    /// Subscribe to `url` with a comma-separated tag list.
    pub fn subscribe(&mut self, url: &str, tags: &str) -> Vec<Command> {
        let url = url.trim();
        if url.is_empty() {
            self.notice("Feed URL is required");
            return self.drain();
        }
        self.commands.push(Command::CreateFeed(NewFeed {
            url: url.to_string(),
            tags: split_tags(tags),
        }));
        self.drain()
    }

    pub fn edit_feed(&mut self, id: FeedId, patch: FeedPatch) -> Vec<Command> {
        if self.aggregates.feed(id).is_none() {
            tracing::debug!(feed_id = id, "Edit for unknown feed ignored");
            return self.drain();
        }
        self.commands.push(Command::PatchFeed { id, patch });
        self.drain()
    }

    pub fn delete_feed(&mut self, id: FeedId) -> Vec<Command> {
        if self.aggregates.feed(id).is_some() {
            self.commands.push(Command::DeleteFeed(id));
        }
        self.drain()
    }

    pub fn rename_tag(&mut self, name: &str, new_name: &str) -> Vec<Command> {
        let new_name = new_name.trim();
        if new_name.is_empty() || new_name.contains(['/', ',']) {
            self.notice(format!("Invalid tag name: {:?}", new_name));
            return self.drain();
        }
        if new_name != name {
            self.commands.push(Command::RenameTag {
                name: name.to_string(),
                new_name: new_name.to_string(),
            });
        }
        self.drain()
    }

    pub fn delete_tag(&mut self, name: &str) -> Vec<Command> {
        if self.aggregates.tag_group(name).is_some() {
            self.commands.push(Command::DeleteTag(name.to_string()));
        }
        self.drain()
    }

    // ------------------------------------------------------------------------
    // Responses
    // ------------------------------------------------------------------------

    pub fn page_loaded(&mut self, token: ScopeToken, page: Vec<Entry>) -> Vec<Command> {
        match self.store.apply_page(token, page) {
            Some(applied) => self.enqueue(Message::PageLoaded(applied)),
            None => tracing::debug!(?token, "Discarded stale page"),
        }
        self.drain()
    }

    pub fn page_failed(&mut self, token: ScopeToken, error: &str) -> Vec<Command> {
        if self.store.fail_load(token) {
            tracing::warn!(error, "Page load failed");
            self.pending_detail = None;
            self.notice(format!("Failed to load entries: {}", error));
        } else {
            tracing::debug!(?token, "Discarded stale page failure");
        }
        self.drain()
    }

    pub fn entry_loaded(&mut self, token: ScopeToken, entry: Entry) -> Vec<Command> {
        if token != self.store.token() {
            tracing::debug!(id = entry.id, "Discarded stale entry");
            return self.drain();
        }
        let id = entry.id;
        let transition = self.store.merge_remote(entry);
        self.enqueue(Message::EntryMutated { transition });
        if self.awaiting_content == Some(id) && self.store.get(id).is_some() {
            self.enqueue(Message::Display(id));
        }
        self.drain()
    }

    pub fn entry_failed(&mut self, token: ScopeToken, id: EntryId, error: &str) -> Vec<Command> {
        if token != self.store.token() {
            return self.drain();
        }
        tracing::warn!(id, error, "Entry load failed");
        if self.awaiting_content == Some(id) {
            self.awaiting_content = None;
        }
        self.notice(format!("Failed to load entry: {}", error));
        self.drain()
    }

    /// A `PatchEntry` failed. Local state is kept.
    pub fn patch_failed(&mut self, id: EntryId, error: &str) -> Vec<Command> {
        tracing::warn!(id, error, "Entry update failed");
        self.notice(format!("Failed to update entry: {}", error));
        if self.options.on_mutation_failure == MutationFailurePolicy::Refetch
            && self.store.get(id).is_some()
        {
            self.commands.push(Command::FetchEntry {
                token: self.store.token(),
                id,
            });
        }
        self.drain()
    }

    pub fn mark_read_failed(&mut self, error: &str) -> Vec<Command> {
        tracing::warn!(error, "Bulk mark-read failed");
        self.notice(format!("Failed to mark entries read: {}", error));
        self.drain()
    }

    /// Wholesale feed resync. Overwrites locally tracked counts.
    pub fn feeds_loaded(&mut self, feeds: Vec<Feed>) -> Vec<Command> {
        self.aggregates.sync_feeds(feeds);
        self.enqueue(Message::AggregateDirty);
        self.drain()
    }

    pub fn feeds_failed(&mut self, error: &str) -> Vec<Command> {
        tracing::warn!(error, "Feed list load failed");
        self.notice(format!("Failed to load feeds: {}", error));
        self.drain()
    }

    /// A feed was created or edited remotely. The resync overwrites local
    /// unread counts.
    pub fn feeds_changed(&mut self) -> Vec<Command> {
        self.commands.push(Command::FetchFeeds);
        self.drain()
    }

    /// A feed is gone remotely: drop it and its cached entries.
    pub fn feed_removed(&mut self, id: FeedId) -> Vec<Command> {
        self.aggregates.remove_feed(id);
        let removed = self.store.remove_feed(id);
        tracing::info!(feed_id = id, entries = removed, "Feed removed");

        let orphaned = self
            .nav
            .current()
            .is_some_and(|current| self.store.get(current).is_none());
        if orphaned {
            self.awaiting_content = None;
            if self.nav.clear() {
                self.enqueue(Message::ModeChanged);
            }
        }
        if removed > 0 {
            self.notifications.push(Notification::EntriesChanged);
        }
        self.enqueue(Message::AggregateDirty);
        self.commands.push(Command::FetchFeeds);
        self.drain()
    }

    /// A tag was renamed (`Some(new)`) or deleted (`None`). If the active
    /// scope was that tag, follow it.
    pub fn tag_changed(&mut self, name: &str, new_name: Option<&str>) -> Vec<Command> {
        self.commands.push(Command::FetchFeeds);
        if self.filter.current().source == Source::Tag(name.to_string()) {
            let route = match new_name {
                Some(new_name) => Route::list(Source::Tag(new_name.to_string())),
                None => Route::default(),
            };
            self.commands.push(Command::Navigate(route));
        }
        self.drain()
    }

    pub fn management_failed(&mut self, error: &str) -> Vec<Command> {
        tracing::warn!(error, "Feed management request failed");
        self.notice(error.to_string());
        self.drain()
    }

    // ------------------------------------------------------------------------
    // Queue
    // ------------------------------------------------------------------------

    fn notice(&mut self, message: impl Into<String>) {
        self.notifications.push(Notification::Notice(message.into()));
    }

    fn enqueue(&mut self, message: Message) {
        self.queue.push_back(message);
    }

    fn drain(&mut self) -> Vec<Command> {
        while let Some(message) = self.queue.pop_front() {
            self.dispatch(message);
        }
        std::mem::take(&mut self.commands)
    }

    fn dispatch(&mut self, message: Message) {
        match message {
            Message::ScopeChanged { scope, pending } => {
                tracing::debug!(?scope, ?pending, "Scope reset");
                self.filter.apply(scope);
                let token = self.store.token().next();
                self.store.reset(token);
                self.awaiting_content = None;
                self.pending_detail = pending;
                if self.nav.clear() {
                    self.enqueue(Message::ModeChanged);
                }
                self.notifications.push(Notification::EntriesChanged);
                self.begin_page_load();
            }
            Message::PageLoaded(applied) => {
                tracing::debug!(
                    appended = applied.appended,
                    received = applied.received,
                    at_end = applied.at_end,
                    "Page applied"
                );
                self.notifications.push(Notification::EntriesChanged);
                if applied.first_page {
                    if let Some(id) = self.pending_detail.take() {
                        if self.store.get(id).is_some() {
                            self.enqueue(Message::Activate(id));
                        } else {
                            tracing::debug!(id, "Pending entry not in first page, dropped");
                        }
                    }
                }
            }
            Message::EntryMutated { transition } => {
                self.notifications.push(Notification::EntriesChanged);
                if let Some(transition) = transition {
                    if self.aggregates.apply_transition(transition) {
                        self.enqueue(Message::AggregateDirty);
                    }
                }
            }
            Message::AggregateDirty => {
                self.notifications.push(Notification::AggregateChanged);
            }
            Message::ModeChanged => {
                self.notifications
                    .push(Notification::ModeChanged(self.nav.mode()));
            }
            Message::Activate(id) => self.activate(id),
            Message::Display(id) => self.display(id),
        }
    }

    fn activate(&mut self, id: EntryId) {
        let Some(has_content) = self.store.get(id).map(Entry::has_content) else {
            tracing::debug!(id, "Entry not cached, activation dropped");
            return;
        };
        if self.nav.activate(id) {
            self.enqueue(Message::ModeChanged);
        }
        if self.nav.displayed() == Some(id) {
            return;
        }
        if has_content {
            self.awaiting_content = None;
            self.enqueue(Message::Display(id));
        } else if self.awaiting_content != Some(id) {
            self.awaiting_content = Some(id);
            self.commands.push(Command::FetchEntry {
                token: self.store.token(),
                id,
            });
        }
    }

    fn display(&mut self, id: EntryId) {
        if self.awaiting_content == Some(id) {
            self.awaiting_content = None;
        }
        if !self.nav.mark_displayed(id) {
            return;
        }
        self.notifications.push(Notification::EntryDisplayed(id));
        let unread = self.store.get(id).is_some_and(|e| !e.read);
        if unread && self.options.mark_read_on_open {
            self.mutate(id, EntryPatch::read(true));
        }
    }
}

impl Default for SyncController {
    fn default() -> Self {
        Self::new(SyncOptions::default())
    }
}
