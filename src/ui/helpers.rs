//! Helpers shared across the UI layer.

use crate::app::App;
use crate::util::validate_link;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;

/// Run `future`, converting a panic into `Err(message)` so a failing
/// request task reports back instead of vanishing.
pub(super) async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: std::future::Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| {
            if let Some(s) = panic.downcast_ref::<&'static str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else if let Some(e) = panic.downcast_ref::<Box<dyn std::error::Error + Send>>() {
                e.to_string()
            } else {
                format!("Unknown panic: {:?}", (*panic).type_id())
            }
        })
}

/// Open the target entry's link in the system browser.
pub(super) fn open_entry_link(app: &mut App) {
    let Some(entry) = app.target_entry() else {
        return;
    };
    match validate_link(entry.link.as_deref()) {
        Ok(url) => {
            tracing::debug!(entry_id = entry.id, url = %url, "Opening link");
            if let Err(e) = open::that(url.as_str()) {
                app.set_status(format!("Failed to open browser: {}", e));
            }
        }
        Err(e) => app.set_status(e.to_string()),
    }
}
