//! Results of background requests fed back into the engine.

use tokio::sync::mpsc;

use crate::app::{App, AppEvent};

use super::effects::dispatch;

pub(super) fn handle_app_event(
    app: &mut App,
    event: AppEvent,
    event_tx: &mpsc::Sender<AppEvent>,
) {
    app.needs_redraw = true;
    let commands = match event {
        AppEvent::PageLoaded { token, result } => match result {
            Ok(page) => {
                tracing::debug!(count = page.len(), "Page loaded");
                app.sync.page_loaded(token, page)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Page request failed");
                app.sync.page_failed(token, &e.to_string())
            }
        },
        AppEvent::EntryLoaded { token, id, result } => match result {
            Ok(entry) => app.sync.entry_loaded(token, entry),
            Err(e) => {
                tracing::warn!(entry_id = id, error = %e, "Entry request failed");
                app.sync.entry_failed(token, id, &e.to_string())
            }
        },
        AppEvent::EntryPatched { id, result } => match result {
            Ok(()) => Vec::new(),
            Err(e) => {
                tracing::warn!(
                    entry_id = id,
                    transport = e.is_transport(),
                    error = %e,
                    "Entry update failed"
                );
                app.sync.patch_failed(id, &e.to_string())
            }
        },
        AppEvent::ScopeMarkedRead(result) => match result {
            Ok(()) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Bulk mark-read failed");
                app.sync.mark_read_failed(&e.to_string())
            }
        },
        AppEvent::FeedsLoaded(result) => {
            app.feeds_in_flight = app.feeds_in_flight.saturating_sub(1);
            match result {
                Ok(feeds) => {
                    tracing::debug!(count = feeds.len(), "Feed list loaded");
                    app.sync.feeds_loaded(feeds)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Feed list request failed");
                    app.sync.feeds_failed(&e.to_string())
                }
            }
        }
        AppEvent::FeedCreated { url, result } => match result {
            Ok(()) => {
                tracing::info!(url = %url, "Subscribed");
                app.set_status(format!("Subscribed to {}", url));
                app.sync.feeds_changed()
            }
            Err(e) => app.sync.management_failed(&e.to_string()),
        },
        AppEvent::FeedUpdated { id, result } => match result {
            Ok(()) => {
                tracing::info!(feed_id = id, "Feed updated");
                app.sync.feeds_changed()
            }
            Err(e) => app.sync.management_failed(&e.to_string()),
        },
        AppEvent::FeedDeleted { id, result } => match result {
            Ok(()) => {
                tracing::info!(feed_id = id, "Feed deleted");
                app.set_status("Feed deleted");
                app.sync.feed_removed(id)
            }
            Err(e) => app.sync.management_failed(&e.to_string()),
        },
        AppEvent::TagRenamed {
            name,
            new_name,
            result,
        } => match result {
            Ok(()) => {
                tracing::info!(tag = %name, new_name = %new_name, "Tag renamed");
                app.rename_collapsed(&name, &new_name);
                app.sync.tag_changed(&name, Some(&new_name))
            }
            Err(e) => app.sync.management_failed(&e.to_string()),
        },
        AppEvent::TagDeleted { name, result } => match result {
            Ok(()) => {
                tracing::info!(tag = %name, "Tag deleted");
                app.collapsed.remove(&name);
                app.sync.tag_changed(&name, None)
            }
            Err(e) => app.sync.management_failed(&e.to_string()),
        },
        AppEvent::CollapsedSaved { tag, result } => {
            if let Err(e) = result {
                tracing::warn!(tag = %tag, error = %e, "Failed to save collapse state");
            }
            Vec::new()
        }
        AppEvent::TaskPanicked { task, error } => {
            tracing::error!(task, error = %error, "Background task panicked");
            app.set_status(format!("Internal error in {}: {}", task, error));
            Vec::new()
        }
    };
    dispatch(app, commands, event_tx);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiClient, ApiError, ApiOptions};
    use crate::keybindings::KeybindingRegistry;
    use crate::sync::{Entry, Feed, Route, Source, SyncOptions};

    fn test_app() -> App {
        let api = ApiClient::new(
            reqwest::Client::new(),
            ApiOptions {
                api_url: "http://127.0.0.1:9/api".to_string(),
                ..ApiOptions::default()
            },
        )
        .unwrap();
        App::new(api, KeybindingRegistry::new(), SyncOptions::default(), Vec::new())
    }

    fn entry(id: i64) -> Entry {
        Entry {
            id,
            feed_id: 1,
            title: format!("Entry {}", id),
            link: None,
            content: None,
            author: None,
            date: None,
            read: false,
            favorite: false,
        }
    }

    fn status(app: &App) -> &str {
        app.status_message
            .as_ref()
            .map(|(m, _)| m.as_ref())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_page_result_reaches_store() {
        let mut app = test_app();
        let (tx, _rx) = mpsc::channel(16);
        app.navigate(Route::list(Source::All));
        let token = app.sync.store().token();

        handle_app_event(
            &mut app,
            AppEvent::PageLoaded {
                token,
                result: Ok(vec![entry(1), entry(2)]),
            },
            &tx,
        );
        assert_eq!(app.sync.store().len(), 2);
        assert!(!app.sync.store().is_loading());
    }

    #[tokio::test]
    async fn test_page_failure_sets_status() {
        let mut app = test_app();
        let (tx, _rx) = mpsc::channel(16);
        app.navigate(Route::list(Source::All));
        let token = app.sync.store().token();

        handle_app_event(
            &mut app,
            AppEvent::PageLoaded {
                token,
                result: Err(ApiError::HttpStatus(502)),
            },
            &tx,
        );
        assert!(status(&app).starts_with("Failed to load entries"));
        assert!(!app.sync.store().is_loading());
    }

    #[tokio::test]
    async fn test_subscribe_error_text_surfaced() {
        let mut app = test_app();
        let (tx, _rx) = mpsc::channel(16);

        handle_app_event(
            &mut app,
            AppEvent::FeedCreated {
                url: "https://example.com/rss".into(),
                result: Err(ApiError::Rejected("Feed already exists".into())),
            },
            &tx,
        );
        assert!(status(&app).contains("Feed already exists"));
    }

    #[tokio::test]
    async fn test_feed_list_clears_spinner_counter() {
        let mut app = test_app();
        let (tx, _rx) = mpsc::channel(16);
        app.feeds_in_flight = 1;

        let feed = Feed {
            id: 1,
            title: "One".into(),
            url: "https://one.example/rss".into(),
            tags: vec!["news".into()],
            unread_count: 3,
        };
        handle_app_event(&mut app, AppEvent::FeedsLoaded(Ok(vec![feed])), &tx);
        assert_eq!(app.feeds_in_flight, 0);
        assert_eq!(app.sync.aggregates().tag_unread("news"), 3);
    }

    #[tokio::test]
    async fn test_tag_rename_carries_collapse_state() {
        let mut app = test_app();
        let (tx, _rx) = mpsc::channel(16);
        app.collapsed.insert("news".into());

        handle_app_event(
            &mut app,
            AppEvent::TagRenamed {
                name: "news".into(),
                new_name: "world".into(),
                result: Ok(()),
            },
            &tx,
        );
        assert!(app.collapsed.contains("world"));
        assert_eq!(app.feeds_in_flight, 1);
    }
}
