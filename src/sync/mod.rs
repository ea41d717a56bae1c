//! Client-side entry synchronization and state reconciliation.
//!
//! This module is sans-IO: it owns the cached entries, the active filter
//! scope, unread aggregates and the list/detail state, and expresses every
//! side effect as a [`Command`] for the host to execute. Results come back
//! through the `*_loaded` / `*_failed` methods on [`SyncController`].
//!
//! # Module Structure
//!
//! - `model` - Feed and entry entities, mutation payloads
//! - `scope` - Filter scope and the reset predicate
//! - `store` - Paginated, deduplicated entry cache
//! - `aggregate` - Unread counters per feed and tag
//! - `navigation` - List/detail state machine
//! - `route` - Route strings and the in-process router
//! - `controller` - Orchestration of all of the above

mod aggregate;
mod controller;
mod model;
mod navigation;
mod route;
mod scope;
mod store;

pub use aggregate::{AggregateTracker, TagGroup};
pub use controller::{MutationFailurePolicy, SyncController, SyncOptions};
pub use model::{
    join_tags, split_tags, Entry, EntryId, EntryPatch, Feed, FeedId, FeedPatch, NewFeed,
    ReadTransition,
};
pub use navigation::{Direction, Mode, NavigationController, SelectOutcome};
pub use route::{Route, RouteError, Router};
pub use scope::{EntryQuery, FilterContext, FilterScope, ScopeFilter, Source, StatusFilter};
pub use store::{EntryStore, LoadRefusal, PageApplied, PageCursor, PageRequest, DEFAULT_PAGE_LIMIT};

/// Generation number of a scope. Bumped on every reset and carried by
/// fetch commands so late responses for an abandoned scope can be dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeToken(u64);

impl ScopeToken {
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// Side effects requested from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Load one page of the scope identified by `token`.
    FetchPage { token: ScopeToken, query: EntryQuery },
    /// Load one entry with its content.
    FetchEntry { token: ScopeToken, id: EntryId },
    /// Persist a local entry mutation. Fire-and-forget.
    PatchEntry { id: EntryId, patch: EntryPatch },
    /// Mark everything matching `filter` read on the remote side.
    MarkRead { filter: ScopeFilter },
    /// Refetch the feed list.
    FetchFeeds,
    /// Route to a new location; the host feeds it back via `open_route`.
    Navigate(Route),
    CreateFeed(NewFeed),
    PatchFeed { id: FeedId, patch: FeedPatch },
    DeleteFeed(FeedId),
    RenameTag { name: String, new_name: String },
    DeleteTag(String),
    /// Persist a tag group's collapsed state. Fire-and-forget.
    SaveCollapsed { tag: String, collapsed: bool },
}

/// Change notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    EntriesChanged,
    AggregateChanged,
    ModeChanged(Mode),
    /// Content for this entry is ready to show.
    EntryDisplayed(EntryId),
    /// A user-facing message, typically a surfaced failure.
    Notice(String),
}
