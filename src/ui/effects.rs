//! Execution of engine commands.
//!
//! Routing commands are resolved in place; everything else becomes a
//! spawned request whose result comes back as an [`AppEvent`].

use std::collections::VecDeque;
use std::future::Future;

use tokio::sync::mpsc;

use crate::app::{App, AppEvent};
use crate::sync::Command;

use super::helpers::catch_task_panic;

/// Execute `commands`, then fold the engine's notifications into the view.
pub(super) fn dispatch(
    app: &mut App,
    commands: Vec<Command>,
    event_tx: &mpsc::Sender<AppEvent>,
) {
    let mut queue: VecDeque<Command> = commands.into();
    while let Some(command) = queue.pop_front() {
        if let Command::Navigate(route) = command {
            queue.extend(app.navigate(route));
        } else {
            execute(app, command, event_tx);
        }
    }
    app.absorb_notifications();
}

fn execute(app: &mut App, command: Command, event_tx: &mpsc::Sender<AppEvent>) {
    let api = app.api.clone();
    match command {
        Command::FetchPage { token, query } => {
            spawn_request("fetch_page", event_tx, async move {
                let result = api.fetch_entries(&query).await;
                AppEvent::PageLoaded { token, result }
            });
        }
        Command::FetchEntry { token, id } => {
            spawn_request("fetch_entry", event_tx, async move {
                let result = api.fetch_entry(id).await;
                AppEvent::EntryLoaded { token, id, result }
            });
        }
        Command::PatchEntry { id, patch } => {
            spawn_request("patch_entry", event_tx, async move {
                let result = api.patch_entry(id, &patch).await;
                AppEvent::EntryPatched { id, result }
            });
        }
        Command::MarkRead { filter } => {
            spawn_request("mark_read", event_tx, async move {
                AppEvent::ScopeMarkedRead(api.mark_read(&filter).await)
            });
        }
        Command::FetchFeeds => {
            app.feeds_in_flight += 1;
            spawn_request("fetch_feeds", event_tx, async move {
                AppEvent::FeedsLoaded(api.fetch_feeds().await)
            });
        }
        Command::CreateFeed(feed) => {
            app.set_status(format!("Subscribing to {}...", feed.url));
            spawn_request("create_feed", event_tx, async move {
                let result = api.create_feed(&feed).await;
                AppEvent::FeedCreated {
                    url: feed.url,
                    result,
                }
            });
        }
        Command::PatchFeed { id, patch } => {
            spawn_request("patch_feed", event_tx, async move {
                let result = api.patch_feed(id, &patch).await;
                AppEvent::FeedUpdated { id, result }
            });
        }
        Command::DeleteFeed(id) => {
            spawn_request("delete_feed", event_tx, async move {
                let result = api.delete_feed(id).await;
                AppEvent::FeedDeleted { id, result }
            });
        }
        Command::RenameTag { name, new_name } => {
            spawn_request("rename_tag", event_tx, async move {
                let result = api.rename_tag(&name, &new_name).await;
                AppEvent::TagRenamed {
                    name,
                    new_name,
                    result,
                }
            });
        }
        Command::DeleteTag(name) => {
            spawn_request("delete_tag", event_tx, async move {
                let result = api.delete_tag(&name).await;
                AppEvent::TagDeleted { name, result }
            });
        }
        Command::SaveCollapsed { tag, collapsed } => {
            if !api.has_settings() {
                tracing::debug!(
                    tag = %tag,
                    collapsed,
                    "No settings URL, collapse state kept locally"
                );
                return;
            }
            spawn_request("save_collapsed", event_tx, async move {
                let result = api.save_collapsed(&tag, collapsed).await;
                AppEvent::CollapsedSaved { tag, result }
            });
        }
        Command::Navigate(route) => {
            // Resolved by `dispatch`; reaching here means a caller bypassed it.
            tracing::warn!(route = %route, "Navigate command executed out of band");
        }
    }
}

/// Run `request` on the runtime and deliver its event. A panic inside the
/// request is reported as [`AppEvent::TaskPanicked`].
fn spawn_request<F>(task: &'static str, event_tx: &mpsc::Sender<AppEvent>, request: F)
where
    F: Future<Output = AppEvent> + Send + 'static,
{
    let tx = event_tx.clone();
    tokio::spawn(async move {
        let event = match catch_task_panic(request).await {
            Ok(event) => event,
            Err(error) => {
                tracing::error!(task, error = %error, "Request task panicked");
                AppEvent::TaskPanicked { task, error }
            }
        };
        if let Err(e) = tx.send(event).await {
            tracing::warn!(task, error = %e, "Failed to deliver result (receiver dropped)");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiClient, ApiOptions};
    use crate::keybindings::KeybindingRegistry;
    use crate::sync::{Route, Source, SyncOptions};

    fn test_app(settings_url: Option<String>) -> App {
        let api = ApiClient::new(
            reqwest::Client::new(),
            ApiOptions {
                api_url: "http://127.0.0.1:9/api".to_string(),
                settings_url,
                ..ApiOptions::default()
            },
        )
        .unwrap();
        App::new(api, KeybindingRegistry::new(), SyncOptions::default(), Vec::new())
    }

    #[tokio::test]
    async fn test_navigate_resolved_in_place() {
        let mut app = test_app(None);
        let (tx, _rx) = mpsc::channel(8);

        dispatch(
            &mut app,
            vec![Command::Navigate(Route::list(Source::Feed(4)))],
            &tx,
        );
        assert_eq!(app.router.current(), &Route::list(Source::Feed(4)));
        assert_eq!(app.sync.scope().source, Source::Feed(4));
        assert!(app.sync.store().is_loading());
    }

    #[tokio::test]
    async fn test_collapse_without_settings_url_is_local() {
        let mut app = test_app(None);
        let (tx, mut rx) = mpsc::channel(8);

        dispatch(
            &mut app,
            vec![Command::SaveCollapsed {
                tag: "news".into(),
                collapsed: true,
            }],
            &tx,
        );
        drop(tx);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_failed_request_is_delivered() {
        let mut app = test_app(None);
        let (tx, mut rx) = mpsc::channel(8);

        dispatch(&mut app, vec![Command::FetchFeeds], &tx);
        assert_eq!(app.feeds_in_flight, 1);
        match rx.recv().await {
            Some(AppEvent::FeedsLoaded(result)) => assert!(result.is_err()),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_panicking_request_reports_task() {
        async fn explode() -> AppEvent {
            panic!("kaboom")
        }

        let (tx, mut rx) = mpsc::channel(8);
        spawn_request("boom", &tx, explode());
        match rx.recv().await {
            Some(AppEvent::TaskPanicked { task, error }) => {
                assert_eq!(task, "boom");
                assert!(error.contains("kaboom"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
