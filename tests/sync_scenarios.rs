//! End-to-end scenarios for the synchronization engine.
//!
//! The engine is sans-IO, so each test plays the host: it executes the
//! returned commands by hand and feeds canned responses back in.

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use readr::sync::{
    AggregateTracker, Command, Direction, Entry, EntryId, EntryPatch, EntryQuery, EntryStore,
    Feed, FeedId, FilterContext, FilterScope, Mode, ReadTransition, Route, ScopeToken, Source,
    StatusFilter, SyncController, SyncOptions,
};

fn entry(id: EntryId, feed_id: FeedId) -> Entry {
    Entry {
        id,
        feed_id,
        title: format!("Entry {}", id),
        link: Some(format!("https://example.com/{}", id)),
        content: None,
        author: None,
        date: None,
        read: false,
        favorite: false,
    }
}

fn feed(id: FeedId, tags: &[&str], unread: u32) -> Feed {
    Feed {
        id,
        title: format!("Feed {}", id),
        url: format!("https://example.com/{}.xml", id),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        unread_count: unread,
    }
}

fn controller(limit: usize) -> SyncController {
    SyncController::new(SyncOptions {
        page_limit: limit,
        ..SyncOptions::default()
    })
}

fn fetch_page(cmds: &[Command]) -> (ScopeToken, EntryQuery) {
    cmds.iter()
        .find_map(|c| match c {
            Command::FetchPage { token, query } => Some((*token, query.clone())),
            _ => None,
        })
        .expect("no FetchPage command")
}

// ============================================================================
// Pagination
// ============================================================================

#[test]
fn test_feed_scope_full_page_then_short_page() {
    let mut sync = controller(50);
    let (token, query) = fetch_page(&sync.open_route(&Route::list(Source::Feed(7))));
    assert_eq!(query.filter.feed_id, Some(7));
    assert_eq!((query.offset, query.limit), (0, 50));

    sync.page_loaded(token, (1..=50).map(|id| entry(id, 7)).collect());
    let cursor = sync.store().cursor();
    assert!(!cursor.at_end);
    assert_eq!(cursor.offset, 50);

    let (token, query) = fetch_page(&sync.load_next_page());
    assert_eq!(query.offset, 50);
    sync.page_loaded(token, (51..=62).map(|id| entry(id, 7)).collect());

    let cursor = sync.store().cursor();
    assert!(cursor.at_end);
    assert_eq!(sync.store().len(), 62);
    let ids: Vec<EntryId> = sync.store().entries().iter().map(|e| e.id).collect();
    assert_eq!(ids, (1..=62).collect::<Vec<_>>());

    // At the end nothing more is requested until a reset.
    assert!(sync.load_next_page().is_empty());
}

#[test]
fn test_concurrent_load_is_refused() {
    let mut sync = controller(10);
    sync.open_route(&Route::default());
    assert!(sync.store().is_loading());
    assert!(sync.load_next_page().is_empty());
}

#[test]
fn test_scope_change_discards_late_page() {
    let mut sync = controller(10);
    let (old, _) = fetch_page(&sync.open_route(&Route::list(Source::Feed(1))));
    let (new, _) = fetch_page(&sync.open_route(&Route::list(Source::Tag("news".into()))));

    sync.page_loaded(old, vec![entry(1, 1)]);
    assert!(sync.store().is_empty());
    assert!(sync.store().is_loading());

    sync.page_loaded(new, vec![entry(2, 2)]);
    assert_eq!(sync.store().entries()[0].id, 2);
}

// ============================================================================
// Read-state aggregates
// ============================================================================

#[test]
fn test_toggle_read_round_trip() {
    let mut sync = controller(10);
    sync.feeds_loaded(vec![feed(3, &["news"], 5)]);
    let (token, _) = fetch_page(&sync.open_route(&Route::default()));
    sync.page_loaded(token, vec![entry(10, 3)]);

    let cmds = sync.toggle_read(10);
    assert_eq!(
        cmds,
        vec![Command::PatchEntry {
            id: 10,
            patch: EntryPatch::read(true),
        }]
    );
    assert_eq!(sync.aggregates().feed(3).map(|f| f.unread_count), Some(4));
    assert_eq!(sync.aggregates().tag_unread("news"), 4);

    sync.toggle_read(10);
    assert_eq!(sync.aggregates().feed(3).map(|f| f.unread_count), Some(5));
    assert_eq!(sync.store().get(10).map(|e| e.read), Some(false));
}

#[test]
fn test_favorite_leaves_counts_alone() {
    let mut sync = controller(10);
    sync.feeds_loaded(vec![feed(3, &[], 2)]);
    let (token, _) = fetch_page(&sync.open_route(&Route::default()));
    sync.page_loaded(token, vec![entry(10, 3)]);

    let cmds = sync.toggle_favorite(10);
    assert_eq!(
        cmds,
        vec![Command::PatchEntry {
            id: 10,
            patch: EntryPatch::favorite(true),
        }]
    );
    assert_eq!(sync.aggregates().total_unread(), 2);
    assert_eq!(sync.store().get(10).map(|e| e.favorite), Some(true));
}

#[test]
fn test_mark_tag_read_zeroes_members_only() {
    let mut sync = controller(10);
    sync.feeds_loaded(vec![
        feed(1, &["news"], 3),
        feed(2, &["news", "tech"], 2),
        feed(3, &["sports"], 4),
    ]);
    let (token, _) = fetch_page(&sync.open_route(&Route::list(Source::Tag("news".into()))));
    sync.page_loaded(token, vec![entry(1, 1), entry(2, 2)]);

    let cmds = sync.mark_scope_read();
    let filter = cmds
        .iter()
        .find_map(|c| match c {
            Command::MarkRead { filter } => Some(filter.clone()),
            _ => None,
        })
        .expect("no MarkRead command");
    assert_eq!(filter.tag.as_deref(), Some("news"));
    assert_eq!(filter.read, Some(true));

    let aggregates = sync.aggregates();
    assert_eq!(aggregates.feed(1).map(|f| f.unread_count), Some(0));
    assert_eq!(aggregates.feed(2).map(|f| f.unread_count), Some(0));
    assert_eq!(aggregates.tag_unread("news"), 0);
    assert_eq!(aggregates.feed(3).map(|f| f.unread_count), Some(4));
    assert!(sync.store().entries().iter().all(|e| e.read));
}

#[test]
fn test_feed_resync_overwrites_local_counts() {
    let mut sync = controller(10);
    sync.feeds_loaded(vec![feed(1, &[], 5)]);
    let (token, _) = fetch_page(&sync.open_route(&Route::default()));
    sync.page_loaded(token, vec![entry(1, 1)]);
    sync.toggle_read(1);
    assert_eq!(sync.aggregates().total_unread(), 4);

    sync.feeds_loaded(vec![feed(1, &[], 9)]);
    assert_eq!(sync.aggregates().total_unread(), 9);
}

// ============================================================================
// Navigation
// ============================================================================

#[test]
fn test_step_past_last_loaded_entry_is_noop() {
    let mut sync = controller(2);
    let (token, _) = fetch_page(&sync.open_route(&Route::default()));
    let mut first = entry(1, 1);
    let mut second = entry(2, 1);
    first.content = Some("<p>one</p>".into());
    second.content = Some("<p>two</p>".into());
    sync.page_loaded(token, vec![first, second]);
    assert!(!sync.store().cursor().at_end);

    sync.open_route(&Route::entry(Source::All, 2));
    assert_eq!(sync.mode(), Mode::Detail);
    sync.take_notifications();

    assert!(sync.step(Direction::Next).is_empty());
    assert!(sync.take_notifications().is_empty());
    assert_eq!(sync.mode(), Mode::Detail);
    assert_eq!(sync.current_entry().map(|e| e.id), Some(2));
    assert!(!sync.store().is_loading());
}

#[test]
fn test_step_previous_navigates() {
    let mut sync = controller(10);
    let (token, _) = fetch_page(&sync.open_route(&Route::list(Source::Feed(1))));
    sync.page_loaded(token, vec![entry(1, 1), entry(2, 1)]);
    sync.open_route(&Route::entry(Source::Feed(1), 2));

    let cmds = sync.step(Direction::Previous);
    assert_eq!(
        cmds,
        vec![Command::Navigate(Route::entry(Source::Feed(1), 1))]
    );
}

#[test]
fn test_deep_link_activates_after_first_page() {
    let mut sync = controller(50);
    let route: Route = "feed/7/123".parse().unwrap();
    assert_eq!(route, Route::entry(Source::Feed(7), 123));

    let cmds = sync.open_route(&route);
    let (token, query) = fetch_page(&cmds);
    assert_eq!(query.filter.feed_id, Some(7));
    assert_eq!(query.offset, 0);
    assert_eq!(sync.mode(), Mode::List);

    let cmds = sync.page_loaded(token, vec![entry(122, 7), entry(123, 7)]);
    assert_eq!(cmds, vec![Command::FetchEntry { token, id: 123 }]);
    assert_eq!(sync.mode(), Mode::Detail);
    assert_eq!(sync.current_entry().map(|e| e.id), Some(123));
    assert!(sync.is_awaiting_content());

    let mut full = entry(123, 7);
    full.content = Some("<p>body</p>".into());
    let cmds = sync.entry_loaded(token, full);
    assert_eq!(
        cmds,
        vec![Command::PatchEntry {
            id: 123,
            patch: EntryPatch::read(true),
        }]
    );
    assert_eq!(sync.displayed_entry().map(|e| e.id), Some(123));
}

#[test]
fn test_deep_link_missing_from_first_page_stays_in_list() {
    let mut sync = controller(50);
    let (token, _) = fetch_page(&sync.open_route(&Route::entry(Source::Feed(7), 999)));
    let cmds = sync.page_loaded(token, vec![entry(1, 7)]);
    assert!(cmds.is_empty());
    assert_eq!(sync.mode(), Mode::List);
}

#[test]
fn test_status_filter_keeps_source() {
    let mut sync = controller(10);
    let (token, _) = fetch_page(&sync.open_route(&Route::list(Source::Feed(4))));
    sync.page_loaded(token, vec![entry(1, 4)]);

    let (_, query) = fetch_page(&sync.set_status_filter(StatusFilter::FAVORITES));
    assert_eq!(query.filter.feed_id, Some(4));
    assert_eq!(query.filter.favorite, Some(true));
    assert_eq!(query.offset, 0);
}

// ============================================================================
// Scope predicate
// ============================================================================

#[test]
fn test_same_scope_never_resets_unless_empty() {
    let scope = FilterScope {
        source: Source::Tag("news".into()),
        status: StatusFilter::UNREAD,
        query: Some("rust".into()),
    };
    let mut context = FilterContext::new(scope.clone());
    assert!(!context.would_change_scope(&scope));
    assert!(!context.needs_reset(&scope, false));
    assert!(context.needs_reset(&scope, true));

    context.apply(scope.clone());
    assert!(!context.needs_reset(&scope, false));
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_pages_append_in_order_without_duplicates(
        limit in 1usize..8,
        pages in prop::collection::vec(prop::collection::vec(0i64..40, 0..8), 1..8),
    ) {
        let mut store = EntryStore::new(limit);
        let token = ScopeToken::default().next();
        store.reset(token);

        let mut expected: Vec<EntryId> = Vec::new();
        for page in pages {
            let page: Vec<EntryId> = page.into_iter().take(limit).collect();
            let before = store.cursor();
            let Ok(request) = store.begin_load() else {
                prop_assert!(before.at_end);
                break;
            };
            prop_assert_eq!(request.offset, before.offset);

            let short = page.len() < limit;
            for id in &page {
                if !expected.contains(id) {
                    expected.push(*id);
                }
            }
            store.apply_page(token, page.iter().map(|&id| entry(id, 1)).collect());

            let after = store.cursor();
            prop_assert_eq!(after.offset, before.offset + limit);
            prop_assert_eq!(after.at_end, short);
        }

        let ids: Vec<EntryId> = store.entries().iter().map(|e| e.id).collect();
        prop_assert_eq!(ids, expected);
    }

    #[test]
    fn prop_tag_unread_is_sum_of_members(
        feeds in prop::collection::vec(
            (prop::sample::subsequence(vec!["a", "b", "c"], 0..=3), 0u32..20),
            1..10,
        ),
        flips in prop::collection::vec((0usize..10, any::<bool>()), 0..40),
    ) {
        let feeds: Vec<Feed> = feeds
            .iter()
            .enumerate()
            .map(|(i, (tags, unread))| feed(i as FeedId, tags, *unread))
            .collect();
        let count = feeds.len();
        let mut tracker = AggregateTracker::new(feeds);

        for (idx, now_read) in flips {
            tracker.apply_transition(ReadTransition {
                feed_id: (idx % count) as FeedId,
                now_read,
            });
            for tag in ["a", "b", "c"] {
                let sum: u64 = tracker
                    .feeds()
                    .iter()
                    .filter(|f| f.has_tag(tag))
                    .map(|f| u64::from(f.unread_count))
                    .sum();
                prop_assert_eq!(tracker.tag_unread(tag), sum);
            }
        }
    }
}
