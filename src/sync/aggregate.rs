//! Unread-count bookkeeping for feeds and the tag groups derived from them.
//!
//! Feed counters are adjusted incrementally as entries change; tag-group
//! counters are never stored and are summed from member feeds on demand.
//! Tag groups are rebuilt wholesale whenever the feed set changes.

use std::collections::{BTreeMap, HashMap};

use super::model::{Feed, FeedId, ReadTransition};
use super::scope::Source;

/// A tag and the feeds carrying it, in feed-list order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagGroup {
    pub name: String,
    pub feeds: Vec<FeedId>,
}

#[derive(Debug, Default)]
pub struct AggregateTracker {
    feeds: Vec<Feed>,
    index: HashMap<FeedId, usize>,
    groups: BTreeMap<String, TagGroup>,
}

impl AggregateTracker {
    pub fn new(feeds: Vec<Feed>) -> Self {
        let mut tracker = Self::default();
        tracker.sync_feeds(feeds);
        tracker
    }

    /// Replace the feed set with the server's view. Locally tracked counts
    /// are overwritten by the fetched ones.
    pub fn sync_feeds(&mut self, feeds: Vec<Feed>) {
        self.feeds = feeds;
        self.rebuild();
    }

    pub fn remove_feed(&mut self, id: FeedId) -> Option<Feed> {
        let idx = self.index.get(&id).copied()?;
        let feed = self.feeds.remove(idx);
        self.rebuild();
        Some(feed)
    }

    fn rebuild(&mut self) {
        self.index = self
            .feeds
            .iter()
            .enumerate()
            .map(|(idx, feed)| (feed.id, idx))
            .collect();

        self.groups.clear();
        for feed in &self.feeds {
            for tag in &feed.tags {
                self.groups
                    .entry(tag.clone())
                    .or_insert_with(|| TagGroup {
                        name: tag.clone(),
                        feeds: Vec::new(),
                    })
                    .feeds
                    .push(feed.id);
            }
        }
        tracing::debug!(
            feeds = self.feeds.len(),
            tags = self.groups.len(),
            "Rebuilt tag groups"
        );
    }

    pub fn feeds(&self) -> &[Feed] {
        &self.feeds
    }

    pub fn feed(&self, id: FeedId) -> Option<&Feed> {
        self.index.get(&id).map(|&idx| &self.feeds[idx])
    }

    /// Tag groups sorted by name.
    pub fn tag_groups(&self) -> impl Iterator<Item = &TagGroup> {
        self.groups.values()
    }

    pub fn tag_group(&self, name: &str) -> Option<&TagGroup> {
        self.groups.get(name)
    }

    /// Feeds that carry no tag at all.
    pub fn untagged(&self) -> impl Iterator<Item = &Feed> {
        self.feeds.iter().filter(|f| f.tags.is_empty())
    }

    /// Adjust the owning feed for a read flip: -1 on read (floored at 0),
    /// +1 on unread. Returns false when the feed is unknown.
    pub fn apply_transition(&mut self, transition: ReadTransition) -> bool {
        let Some(&idx) = self.index.get(&transition.feed_id) else {
            tracing::debug!(
                feed_id = transition.feed_id,
                "Read transition for unknown feed ignored"
            );
            return false;
        };
        let feed = &mut self.feeds[idx];
        feed.unread_count = if transition.now_read {
            feed.unread_count.saturating_sub(1)
        } else {
            feed.unread_count.saturating_add(1)
        };
        true
    }

    /// Zero every feed covered by `source`. O(feeds); the remote side does
    /// the per-entry work. Returns the affected feed ids.
    pub fn mark_source_read(&mut self, source: &Source) -> Vec<FeedId> {
        let mut touched = Vec::new();
        for feed in self.feeds.iter_mut() {
            let covered = match source {
                Source::All => true,
                Source::Feed(id) => feed.id == *id,
                Source::Tag(tag) => feed.has_tag(tag),
            };
            if covered {
                feed.unread_count = 0;
                touched.push(feed.id);
            }
        }
        touched
    }

    /// Sum of member unread counts. Unknown tags count as zero.
    pub fn tag_unread(&self, name: &str) -> u64 {
        self.groups
            .get(name)
            .map(|group| {
                group
                    .feeds
                    .iter()
                    .filter_map(|id| self.feed(*id))
                    .map(|f| u64::from(f.unread_count))
                    .sum()
            })
            .unwrap_or(0)
    }

    pub fn total_unread(&self) -> u64 {
        self.feeds.iter().map(|f| u64::from(f.unread_count)).sum()
    }

    /// Unread count shown for a source in the menu.
    pub fn unread_for(&self, source: &Source) -> u64 {
        match source {
            Source::All => self.total_unread(),
            Source::Tag(tag) => self.tag_unread(tag),
            Source::Feed(id) => self.feed(*id).map_or(0, |f| u64::from(f.unread_count)),
        }
    }
}
