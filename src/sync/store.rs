//! Ordered, deduplicated cache of the entries loaded for the active scope.
//!
//! Entries are kept in server response order and never reordered. The
//! cursor tracks how far into the scope we have paged; a single in-flight
//! guard keeps page loads from overlapping.

use std::collections::HashMap;

use thiserror::Error;

use super::model::{Entry, EntryId, FeedId, ReadTransition};
use super::ScopeToken;

/// Page size used when the config does not override it.
pub const DEFAULT_PAGE_LIMIT: usize = 50;

/// Pagination state for the active scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    pub offset: usize,
    pub limit: usize,
    /// Set when a page came back short. Only a reset clears it.
    pub at_end: bool,
}

/// A page load that the store has agreed to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub token: ScopeToken,
    pub offset: usize,
    pub limit: usize,
}

/// Why `begin_load` declined to start a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LoadRefusal {
    #[error("a page load is already in flight")]
    AlreadyLoading,
    #[error("all entries for this scope are loaded")]
    AtEnd,
}

/// Result of applying a page to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageApplied {
    /// Entries that were new to the store.
    pub appended: usize,
    /// Entries in the response, duplicates included.
    pub received: usize,
    pub at_end: bool,
    /// True for the first page after a reset.
    pub first_page: bool,
}

#[derive(Debug)]
pub struct EntryStore {
    entries: Vec<Entry>,
    positions: HashMap<EntryId, usize>,
    cursor: PageCursor,
    loading: bool,
    token: ScopeToken,
}

impl EntryStore {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            positions: HashMap::new(),
            cursor: PageCursor {
                offset: 0,
                limit: limit.max(1),
                at_end: false,
            },
            loading: false,
            token: ScopeToken::default(),
        }
    }

    /// Drop every cached entry and rewind the cursor for a new scope.
    ///
    /// A load still in flight for the previous token is abandoned: its
    /// response will fail the token check in [`apply_page`](Self::apply_page).
    pub fn reset(&mut self, token: ScopeToken) {
        self.entries.clear();
        self.positions.clear();
        self.cursor.offset = 0;
        self.cursor.at_end = false;
        self.loading = false;
        self.token = token;
    }

    /// Claim the next page. Refuses while a load is in flight or at the end.
    pub fn begin_load(&mut self) -> Result<PageRequest, LoadRefusal> {
        if self.loading {
            return Err(LoadRefusal::AlreadyLoading);
        }
        if self.cursor.at_end {
            return Err(LoadRefusal::AtEnd);
        }
        self.loading = true;
        Ok(PageRequest {
            token: self.token,
            offset: self.cursor.offset,
            limit: self.cursor.limit,
        })
    }

    /// Append a page response. Returns `None` when the response belongs to
    /// an abandoned scope or no load is pending (nothing is touched then).
    pub fn apply_page(&mut self, token: ScopeToken, page: Vec<Entry>) -> Option<PageApplied> {
        if token != self.token || !self.loading {
            return None;
        }
        self.loading = false;

        let first_page = self.cursor.offset == 0;
        let received = page.len();
        let mut appended = 0;
        for entry in page {
            if self.positions.contains_key(&entry.id) {
                continue;
            }
            self.positions.insert(entry.id, self.entries.len());
            self.entries.push(entry);
            appended += 1;
        }

        self.cursor.offset += self.cursor.limit;
        self.cursor.at_end = received < self.cursor.limit;

        Some(PageApplied {
            appended,
            received,
            at_end: self.cursor.at_end,
            first_page,
        })
    }

    /// Release the in-flight guard after a failed load so a later attempt
    /// can retry the same offset. Returns false for stale tokens.
    pub fn fail_load(&mut self, token: ScopeToken) -> bool {
        if token != self.token || !self.loading {
            return false;
        }
        self.loading = false;
        true
    }

    pub fn token(&self) -> ScopeToken {
        self.token
    }

    pub fn cursor(&self) -> PageCursor {
        self.cursor
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn get(&self, id: EntryId) -> Option<&Entry> {
        self.positions.get(&id).map(|&idx| &self.entries[idx])
    }

    pub(crate) fn get_mut(&mut self, id: EntryId) -> Option<&mut Entry> {
        match self.positions.get(&id) {
            Some(&idx) => self.entries.get_mut(idx),
            None => None,
        }
    }

    pub fn position(&self, id: EntryId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    pub fn at(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    /// Merge a freshly fetched copy of a cached entry, keeping its position.
    ///
    /// A `read` flag that differs from the cached one is a remote echo and
    /// is reported as a transition. Entries not in the cache are ignored.
    pub fn merge_remote(&mut self, remote: Entry) -> Option<ReadTransition> {
        let cached = self.get_mut(remote.id)?;
        let transition = (cached.read != remote.read).then_some(ReadTransition {
            feed_id: remote.feed_id,
            now_read: remote.read,
        });
        *cached = remote;
        transition
    }

    /// Flip every cached entry to read without reporting transitions.
    /// Returns how many entries changed.
    pub fn mark_all_read(&mut self) -> usize {
        let mut changed = 0;
        for entry in self.entries.iter_mut().filter(|e| !e.read) {
            entry.read = true;
            changed += 1;
        }
        changed
    }

    /// Remove the entries of a deleted feed, preserving the order of the rest.
    pub fn remove_feed(&mut self, feed_id: FeedId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.feed_id != feed_id);
        let removed = before - self.entries.len();
        if removed > 0 {
            self.positions = self
                .entries
                .iter()
                .enumerate()
                .map(|(idx, e)| (e.id, idx))
                .collect();
        }
        removed
    }
}

impl Default for EntryStore {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(id: EntryId, feed_id: FeedId) -> Entry {
        Entry {
            id,
            feed_id,
            title: format!("Entry {}", id),
            link: None,
            content: None,
            author: None,
            date: None,
            read: false,
            favorite: false,
        }
    }

    fn page(ids: std::ops::Range<EntryId>) -> Vec<Entry> {
        ids.map(|id| entry(id, 1)).collect()
    }

    fn store_with_token(limit: usize) -> (EntryStore, ScopeToken) {
        let mut store = EntryStore::new(limit);
        let token = ScopeToken::default().next();
        store.reset(token);
        (store, token)
    }

    #[test]
    fn test_full_then_short_page_reaches_end() {
        let (mut store, token) = store_with_token(50);

        let req = store.begin_load().unwrap();
        assert_eq!(req.offset, 0);
        let applied = store.apply_page(token, page(0..50)).unwrap();
        assert!(applied.first_page);
        assert!(!applied.at_end);
        assert_eq!(store.cursor().offset, 50);

        let req = store.begin_load().unwrap();
        assert_eq!(req.offset, 50);
        let applied = store.apply_page(token, page(50..62)).unwrap();
        assert!(applied.at_end);
        assert!(!applied.first_page);
        assert_eq!(store.len(), 62);
        assert_eq!(store.begin_load(), Err(LoadRefusal::AtEnd));
    }

    #[test]
    fn test_begin_load_is_not_reentrant() {
        let (mut store, _) = store_with_token(10);
        store.begin_load().unwrap();
        assert_eq!(store.begin_load(), Err(LoadRefusal::AlreadyLoading));
    }

    #[test]
    fn test_duplicates_keep_original_position() {
        let (mut store, token) = store_with_token(3);
        store.begin_load().unwrap();
        store.apply_page(token, page(1..4)).unwrap();

        store.begin_load().unwrap();
        let applied = store
            .apply_page(token, vec![entry(2, 1), entry(4, 1), entry(4, 1)])
            .unwrap();
        assert_eq!(applied.appended, 1);
        assert_eq!(applied.received, 3);
        let ids: Vec<EntryId> = store.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(store.position(4), Some(3));
    }

    #[test]
    fn test_stale_token_is_ignored() {
        let (mut store, old) = store_with_token(5);
        store.begin_load().unwrap();
        let new = old.next();
        store.reset(new);

        assert_eq!(store.apply_page(old, page(0..5)), None);
        assert!(store.is_empty());
        assert!(!store.fail_load(old));

        store.begin_load().unwrap();
        assert!(store.apply_page(new, page(10..12)).is_some());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_failed_load_releases_guard_without_advancing() {
        let (mut store, token) = store_with_token(5);
        store.begin_load().unwrap();
        assert!(store.fail_load(token));
        assert!(!store.is_loading());
        let req = store.begin_load().unwrap();
        assert_eq!(req.offset, 0);
    }

    #[test]
    fn test_reset_clears_cursor_and_end_flag() {
        let (mut store, token) = store_with_token(5);
        store.begin_load().unwrap();
        store.apply_page(token, page(0..2)).unwrap();
        assert!(store.cursor().at_end);

        store.reset(token.next());
        assert!(store.is_empty());
        assert_eq!(store.cursor().offset, 0);
        assert!(!store.cursor().at_end);
        assert!(store.begin_load().is_ok());
    }

    #[test]
    fn test_merge_remote_reports_echoed_read_change() {
        let (mut store, token) = store_with_token(5);
        store.begin_load().unwrap();
        store.apply_page(token, page(0..3)).unwrap();

        let mut remote = entry(1, 1);
        remote.read = true;
        remote.content = Some("<p>body</p>".into());
        let transition = store.merge_remote(remote);
        assert_eq!(
            transition,
            Some(ReadTransition {
                feed_id: 1,
                now_read: true
            })
        );
        assert!(store.get(1).unwrap().has_content());
        assert_eq!(store.position(1), Some(1));

        assert_eq!(store.merge_remote(entry(99, 1)), None);
        assert!(store.get(99).is_none());
    }

    #[test]
    fn test_remove_feed_reindexes() {
        let (mut store, token) = store_with_token(5);
        store.begin_load().unwrap();
        store
            .apply_page(token, vec![entry(1, 1), entry(2, 2), entry(3, 1)])
            .unwrap();
        assert_eq!(store.remove_feed(2), 1);
        assert_eq!(store.position(3), Some(1));
        assert!(store.get(2).is_none());
    }
}
