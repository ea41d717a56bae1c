//! Filter scope: which slice of the remote entry collection is being viewed.

use super::model::FeedId;

// ============================================================================
// Scope axes
// ============================================================================

/// Source axis: everything, one tag, or one feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Source {
    #[default]
    All,
    Tag(String),
    Feed(FeedId),
}

/// Status axis. At most one of `read` / `favorite` is set at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StatusFilter {
    pub read: Option<bool>,
    pub favorite: Option<bool>,
}

impl StatusFilter {
    pub const ALL: Self = Self {
        read: None,
        favorite: None,
    };
    pub const UNREAD: Self = Self {
        read: Some(false),
        favorite: None,
    };
    pub const READ: Self = Self {
        read: Some(true),
        favorite: None,
    };
    pub const FAVORITES: Self = Self {
        read: None,
        favorite: Some(true),
    };

    pub fn label(&self) -> &'static str {
        match (self.read, self.favorite) {
            (Some(false), _) => "unread",
            (Some(true), _) => "read",
            (None, Some(_)) => "favorites",
            (None, None) => "all",
        }
    }
}

/// The full selection: source + status + optional search query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FilterScope {
    pub source: Source,
    pub status: StatusFilter,
    pub query: Option<String>,
}

impl FilterScope {
    pub fn with_source(&self, source: Source) -> Self {
        Self {
            source,
            ..self.clone()
        }
    }

    pub fn with_status(&self, status: StatusFilter) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }

    /// Blank queries are normalized away so `""` and "no query" compare equal.
    pub fn with_query(&self, query: Option<&str>) -> Self {
        let query = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_string);
        Self {
            query,
            ..self.clone()
        }
    }

    /// Filter parameters for the remote side, without pagination.
    pub fn filter(&self) -> ScopeFilter {
        let (feed_id, tag) = match &self.source {
            Source::All => (None, None),
            Source::Tag(tag) => (None, Some(tag.clone())),
            Source::Feed(id) => (Some(*id), None),
        };
        ScopeFilter {
            feed_id,
            tag,
            read: self.status.read,
            favorite: self.status.favorite,
            q: self.query.clone(),
        }
    }

    pub fn page(&self, offset: usize, limit: usize) -> EntryQuery {
        EntryQuery {
            offset,
            limit,
            filter: self.filter(),
        }
    }
}

// ============================================================================
// Remote parameters
// ============================================================================

/// Scope expressed as remote query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeFilter {
    pub feed_id: Option<FeedId>,
    pub tag: Option<String>,
    pub read: Option<bool>,
    pub favorite: Option<bool>,
    pub q: Option<String>,
}

impl ScopeFilter {
    /// Key/value pairs in a stable order. Flags are encoded as `0`/`1`.
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(5);
        if let Some(id) = self.feed_id {
            pairs.push(("feed_id", id.to_string()));
        }
        if let Some(tag) = &self.tag {
            pairs.push(("tag", tag.clone()));
        }
        if let Some(read) = self.read {
            pairs.push(("read", u8::from(read).to_string()));
        }
        if let Some(favorite) = self.favorite {
            pairs.push(("favorite", u8::from(favorite).to_string()));
        }
        if let Some(q) = &self.q {
            pairs.push(("q", q.clone()));
        }
        pairs
    }
}

/// One page request against the entry collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryQuery {
    pub offset: usize,
    pub limit: usize,
    pub filter: ScopeFilter,
}

impl EntryQuery {
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("offset", self.offset.to_string()),
            ("limit", self.limit.to_string()),
        ];
        pairs.extend(self.filter.pairs());
        pairs
    }
}

// ============================================================================
// FilterContext
// ============================================================================

/// Holds the active scope and answers "does this request need a reset?".
#[derive(Debug, Default)]
pub struct FilterContext {
    current: FilterScope,
}

impl FilterContext {
    pub fn new(scope: FilterScope) -> Self {
        Self { current: scope }
    }

    pub fn current(&self) -> &FilterScope {
        &self.current
    }

    /// True iff `candidate` differs from the active scope on any axis.
    /// Every axis alters the remote query, so any difference forces a reset.
    pub fn would_change_scope(&self, candidate: &FilterScope) -> bool {
        self.current != *candidate
    }

    /// Reset decision including the empty-store rule: with nothing cached
    /// (first load, restart, empty result) the scope is always refetched.
    pub fn needs_reset(&self, candidate: &FilterScope, store_is_empty: bool) -> bool {
        store_is_empty || self.would_change_scope(candidate)
    }

    /// Replace the active scope. Fetching is the controller's job.
    pub fn apply(&mut self, candidate: FilterScope) {
        self.current = candidate;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_same_scope_is_not_a_change() {
        let scope = FilterScope {
            source: Source::Feed(7),
            status: StatusFilter::UNREAD,
            query: Some("rust".into()),
        };
        let ctx = FilterContext::new(scope.clone());
        assert!(!ctx.would_change_scope(&scope));
        assert!(!ctx.needs_reset(&scope, false));
    }

    #[test]
    fn test_empty_store_forces_reset_for_same_scope() {
        let ctx = FilterContext::default();
        assert!(ctx.needs_reset(&FilterScope::default(), true));
    }

    #[test]
    fn test_each_axis_forces_reset() {
        let ctx = FilterContext::default();
        let base = ctx.current().clone();
        assert!(ctx.would_change_scope(&base.with_source(Source::Tag("news".into()))));
        assert!(ctx.would_change_scope(&base.with_status(StatusFilter::FAVORITES)));
        assert!(ctx.would_change_scope(&base.with_query(Some("x"))));
    }

    #[test]
    fn test_blank_query_normalizes_to_none() {
        let base = FilterScope::default();
        assert_eq!(base.with_query(Some("   ")), base);
        assert_eq!(base.with_query(Some(" go ")).query.as_deref(), Some("go"));
    }

    #[test]
    fn test_apply_replaces_scope() {
        let mut ctx = FilterContext::default();
        let next = FilterScope::default().with_source(Source::Feed(3));
        ctx.apply(next.clone());
        assert_eq!(ctx.current(), &next);
    }

    #[test]
    fn test_query_pairs_encode_all_axes() {
        let scope = FilterScope {
            source: Source::Tag("news".into()),
            status: StatusFilter::UNREAD,
            query: Some("rust".into()),
        };
        let pairs = scope.page(50, 50).pairs();
        assert_eq!(
            pairs,
            vec![
                ("offset", "50".to_string()),
                ("limit", "50".to_string()),
                ("tag", "news".to_string()),
                ("read", "0".to_string()),
                ("q", "rust".to_string()),
            ]
        );
    }

    #[test]
    fn test_feed_source_maps_to_feed_id() {
        let filter = FilterScope::default().with_source(Source::Feed(9)).filter();
        assert_eq!(filter.feed_id, Some(9));
        assert_eq!(filter.tag, None);
    }
}
