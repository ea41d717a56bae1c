//! Route strings: the bookmarkable address of a source and optional entry.
//!
//! Shapes, in precedence order:
//!
//! - `tag/<name>[/<entry>]`, with `<name>` percent-encoded
//! - `feed/<id>[/<entry>]`
//! - `[<entry>]` for the unfiltered scope
//!
//! Status and query filters are not part of a route.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::model::EntryId;
use super::scope::Source;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("Invalid entry id in route: {0:?}")]
    InvalidEntryId(String),
    #[error("Invalid feed id in route: {0:?}")]
    InvalidFeedId(String),
    #[error("Missing tag name in route")]
    MissingTag,
    #[error("Invalid tag encoding in route: {0:?}")]
    InvalidTag(String),
    #[error("Unrecognized route: {0:?}")]
    Unrecognized(String),
}

/// A decoded route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Route {
    pub source: Source,
    pub entry: Option<EntryId>,
}

impl Route {
    pub fn list(source: Source) -> Self {
        Self {
            source,
            entry: None,
        }
    }

    pub fn entry(source: Source, id: EntryId) -> Self {
        Self {
            source,
            entry: Some(id),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.source, self.entry) {
            (Source::Tag(tag), Some(id)) => {
                write!(f, "tag/{}/{}", urlencoding::encode(tag), id)
            }
            (Source::Tag(tag), None) => write!(f, "tag/{}", urlencoding::encode(tag)),
            (Source::Feed(feed), Some(id)) => write!(f, "feed/{}/{}", feed, id),
            (Source::Feed(feed), None) => write!(f, "feed/{}", feed),
            (Source::All, Some(id)) => write!(f, "{}", id),
            (Source::All, None) => Ok(()),
        }
    }
}

fn parse_entry(raw: &str) -> Result<EntryId, RouteError> {
    raw.parse()
        .map_err(|_| RouteError::InvalidEntryId(raw.to_string()))
}

impl FromStr for Route {
    type Err = RouteError;

    /// Accepts an optional leading `#` or `/` and a trailing `/`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix('#').unwrap_or(trimmed);
        let trimmed = trimmed.trim_matches('/');

        if trimmed.is_empty() {
            return Ok(Route::default());
        }

        let segments: Vec<&str> = trimmed.split('/').collect();
        match segments.as_slice() {
            ["tag", name, rest @ ..] if rest.len() <= 1 => {
                if name.is_empty() {
                    return Err(RouteError::MissingTag);
                }
                let tag = urlencoding::decode(name)
                    .map_err(|_| RouteError::InvalidTag((*name).to_string()))?;
                let entry = rest.first().map(|raw| parse_entry(raw)).transpose()?;
                Ok(Route {
                    source: Source::Tag(tag.into_owned()),
                    entry,
                })
            }
            ["tag"] => Err(RouteError::MissingTag),
            ["feed", id, rest @ ..] if rest.len() <= 1 => {
                let feed = id
                    .parse()
                    .map_err(|_| RouteError::InvalidFeedId((*id).to_string()))?;
                let entry = rest.first().map(|raw| parse_entry(raw)).transpose()?;
                Ok(Route {
                    source: Source::Feed(feed),
                    entry,
                })
            }
            [entry] => Ok(Route::entry(Source::All, parse_entry(entry)?)),
            _ => Err(RouteError::Unrecognized(s.to_string())),
        }
    }
}

// ============================================================================
// Router
// ============================================================================

/// In-process router: remembers the current route and a back stack.
#[derive(Debug, Default)]
pub struct Router {
    current: Route,
    history: Vec<Route>,
}

/// Upper bound on remembered routes.
const MAX_HISTORY: usize = 100;

impl Router {
    pub fn current(&self) -> &Route {
        &self.current
    }

    /// Record `route` as current. Navigating to the current route does not
    /// grow the history.
    pub fn navigate(&mut self, route: Route) -> Route {
        if route != self.current {
            let previous = std::mem::replace(&mut self.current, route);
            self.history.push(previous);
            if self.history.len() > MAX_HISTORY {
                self.history.remove(0);
            }
        }
        tracing::debug!(route = %self.current, "Navigated");
        self.current.clone()
    }

    /// Pop the back stack.
    pub fn back(&mut self) -> Option<Route> {
        let previous = self.history.pop()?;
        self.current = previous.clone();
        Some(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_precedence_and_shapes() {
        assert_eq!(
            Route::entry(Source::Tag("news".into()), 5).to_string(),
            "tag/news/5"
        );
        assert_eq!(Route::list(Source::Tag("news".into())).to_string(), "tag/news");
        assert_eq!(Route::entry(Source::Feed(7), 123).to_string(), "feed/7/123");
        assert_eq!(Route::list(Source::Feed(7)).to_string(), "feed/7");
        assert_eq!(Route::entry(Source::All, 9).to_string(), "9");
        assert_eq!(Route::default().to_string(), "");
    }

    #[test]
    fn test_parse_accepts_fragment_forms() {
        assert_eq!(
            "#feed/7/123".parse::<Route>().unwrap(),
            Route::entry(Source::Feed(7), 123)
        );
        assert_eq!(
            "/tag/news/".parse::<Route>().unwrap(),
            Route::list(Source::Tag("news".into()))
        );
        assert_eq!("".parse::<Route>().unwrap(), Route::default());
        assert_eq!("42".parse::<Route>().unwrap(), Route::entry(Source::All, 42));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            "feed/x".parse::<Route>(),
            Err(RouteError::InvalidFeedId("x".into()))
        );
        assert_eq!(
            "tag/news/abc".parse::<Route>(),
            Err(RouteError::InvalidEntryId("abc".into()))
        );
        assert_eq!("tag".parse::<Route>(), Err(RouteError::MissingTag));
        assert!(matches!(
            "feed/1/2/3".parse::<Route>(),
            Err(RouteError::Unrecognized(_))
        ));
    }

    #[test]
    fn test_round_trip_through_display() {
        for raw in ["tag/news/5", "tag/news", "feed/7/123", "feed/7", "9", ""] {
            assert_eq!(raw.parse::<Route>().unwrap().to_string(), raw);
        }
    }

    #[test]
    fn test_tag_with_separator_round_trips() {
        let route = Route::entry(Source::Tag("a/b c".into()), 5);
        let encoded = route.to_string();
        assert_eq!(encoded, "tag/a%2Fb%20c/5");
        assert_eq!(encoded.parse::<Route>().unwrap(), route);

        let list = Route::list(Source::Tag("50%/x".into()));
        assert_eq!(list.to_string().parse::<Route>().unwrap(), list);
        assert_eq!(
            "tag/%FF".parse::<Route>(),
            Err(RouteError::InvalidTag("%FF".into()))
        );
    }

    #[test]
    fn test_router_history() {
        let mut router = Router::default();
        router.navigate(Route::list(Source::Feed(1)));
        router.navigate(Route::list(Source::Feed(1)));
        router.navigate(Route::entry(Source::Feed(1), 3));
        assert_eq!(router.back(), Some(Route::list(Source::Feed(1))));
        assert_eq!(router.back(), Some(Route::default()));
        assert_eq!(router.back(), None);
        assert_eq!(router.current(), &Route::default());
    }
}
