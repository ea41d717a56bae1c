//! List/detail state machine and list-relative stepping.

use super::model::EntryId;
use super::store::EntryStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Browsing the entry list.
    #[default]
    List,
    /// One entry is active and shown.
    Detail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// What selecting an entry from the list should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// The entry is already active in detail mode.
    AlreadyActive,
    /// The entry is the highlighted one: switch to detail without routing.
    EnterDetail,
    /// A different entry: route to it and let the route activate it.
    Navigate,
}

/// Tracks the mode and the active entry.
///
/// In `Detail` the current entry is always set. Leaving detail keeps it as
/// the last-viewed highlight until a scope reset clears it.
#[derive(Debug, Default)]
pub struct NavigationController {
    mode: Mode,
    current: Option<EntryId>,
    displayed: Option<EntryId>,
}

impl NavigationController {
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn current(&self) -> Option<EntryId> {
        self.current
    }

    /// The entry whose content is on screen. Lags `current` while content
    /// is being fetched.
    pub fn displayed(&self) -> Option<EntryId> {
        self.displayed
    }

    pub fn select(&self, id: EntryId) -> SelectOutcome {
        match (self.current == Some(id), self.mode) {
            (true, Mode::Detail) => SelectOutcome::AlreadyActive,
            (true, Mode::List) => SelectOutcome::EnterDetail,
            (false, _) => SelectOutcome::Navigate,
        }
    }

    /// Make `id` the active entry in detail mode. Returns true if the mode
    /// changed.
    pub fn activate(&mut self, id: EntryId) -> bool {
        if self.current != Some(id) {
            self.displayed = None;
        }
        self.current = Some(id);
        let changed = self.mode != Mode::Detail;
        self.mode = Mode::Detail;
        changed
    }

    /// Record that `id` is now on screen. Ignored if the user moved on.
    pub fn mark_displayed(&mut self, id: EntryId) -> bool {
        if self.mode != Mode::Detail || self.current != Some(id) {
            return false;
        }
        self.displayed = Some(id);
        true
    }

    /// Neighbor of the current entry within the loaded entries. Only legal
    /// in detail mode; never looks past the loaded pages.
    pub fn step(&self, direction: Direction, store: &EntryStore) -> Option<EntryId> {
        if self.mode != Mode::Detail {
            return None;
        }
        let index = store.position(self.current?)?;
        let target = match direction {
            Direction::Next => index.checked_add(1)?,
            Direction::Previous => index.checked_sub(1)?,
        };
        store.at(target).map(|e| e.id)
    }

    /// Back to the list, keeping the highlight. Returns true if the mode
    /// changed.
    pub fn leave_detail(&mut self) -> bool {
        let changed = self.mode != Mode::List;
        self.mode = Mode::List;
        changed
    }

    /// Forget everything on a scope reset. Returns true if the mode changed.
    pub fn clear(&mut self) -> bool {
        self.current = None;
        self.displayed = None;
        self.leave_detail()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::model::Entry;
    use crate::sync::ScopeToken;

    fn store_with(ids: &[EntryId]) -> EntryStore {
        let mut store = EntryStore::new(100);
        let token = ScopeToken::default().next();
        store.reset(token);
        store.begin_load().unwrap();
        let page = ids
            .iter()
            .map(|&id| Entry {
                id,
                feed_id: 1,
                title: String::new(),
                link: None,
                content: None,
                author: None,
                date: None,
                read: false,
                favorite: false,
            })
            .collect();
        store.apply_page(token, page).unwrap();
        store
    }

    #[test]
    fn test_starts_in_list_without_entry() {
        let nav = NavigationController::default();
        assert_eq!(nav.mode(), Mode::List);
        assert_eq!(nav.current(), None);
    }

    #[test]
    fn test_select_outcomes() {
        let mut nav = NavigationController::default();
        assert_eq!(nav.select(1), SelectOutcome::Navigate);
        nav.activate(1);
        assert_eq!(nav.select(1), SelectOutcome::AlreadyActive);
        assert_eq!(nav.select(2), SelectOutcome::Navigate);
        nav.leave_detail();
        assert_eq!(nav.select(1), SelectOutcome::EnterDetail);
    }

    #[test]
    fn test_step_within_loaded_entries() {
        let store = store_with(&[10, 20, 30]);
        let mut nav = NavigationController::default();
        nav.activate(20);
        assert_eq!(nav.step(Direction::Next, &store), Some(30));
        assert_eq!(nav.step(Direction::Previous, &store), Some(10));
    }

    #[test]
    fn test_step_out_of_bounds_is_none() {
        let store = store_with(&[10, 20]);
        let mut nav = NavigationController::default();
        nav.activate(20);
        assert_eq!(nav.step(Direction::Next, &store), None);
        nav.activate(10);
        assert_eq!(nav.step(Direction::Previous, &store), None);
    }

    #[test]
    fn test_step_requires_detail_mode() {
        let store = store_with(&[10, 20]);
        let mut nav = NavigationController::default();
        nav.activate(10);
        nav.leave_detail();
        assert_eq!(nav.step(Direction::Next, &store), None);
    }

    #[test]
    fn test_leave_detail_keeps_highlight_until_clear() {
        let mut nav = NavigationController::default();
        nav.activate(5);
        assert!(nav.leave_detail());
        assert_eq!(nav.current(), Some(5));
        nav.clear();
        assert_eq!(nav.current(), None);
        assert_eq!(nav.mode(), Mode::List);
    }

    #[test]
    fn test_displayed_follows_current_only() {
        let mut nav = NavigationController::default();
        nav.activate(1);
        nav.activate(2);
        assert!(!nav.mark_displayed(1));
        assert!(nav.mark_displayed(2));
        assert_eq!(nav.displayed(), Some(2));
        nav.activate(3);
        assert_eq!(nav.displayed(), None);
    }
}
