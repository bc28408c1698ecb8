//! Infinite scroll controller.
//!
//! [`ScrollWatcher`] turns "the sentinel row became visible" reports from
//! the host viewport into debounced [`CatalogClient::fetch_next_page`]
//! calls. Rapid repeated reports inside the debounce window collapse into
//! one fetch; the client's own in-flight guard and `has_more` bookkeeping
//! stop everything else.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::warn;

use crate::catalog::{CatalogClient, LoadPhase};

/// Default pause between a sentinel report and the page fetch.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// How far below the viewport the sentinel should trigger, in pixels.
/// Advisory: the host viewport applies it when observing the sentinel.
pub const LOOKAHEAD_MARGIN_PX: u32 = 300;

/// Debounced bridge between viewport sentinel events and catalog paging.
pub struct ScrollWatcher {
    catalog: CatalogClient,
    debounce: Duration,
    attached: AtomicBool,
    /// At most one armed debounce task at a time.
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl ScrollWatcher {
    /// Create a detached watcher with the default debounce delay.
    #[must_use]
    pub fn new(catalog: CatalogClient) -> Self {
        Self::with_debounce(catalog, DEFAULT_DEBOUNCE)
    }

    /// Create a detached watcher with a custom debounce delay.
    #[must_use]
    pub fn with_debounce(catalog: CatalogClient, debounce: Duration) -> Self {
        Self {
            catalog,
            debounce,
            attached: AtomicBool::new(false),
            pending: Mutex::new(None),
        }
    }

    /// Arm the watcher. Any debounce task left over from before a previous
    /// detach is cancelled so it cannot fire into the new session.
    pub fn attach(&self) {
        self.abort_pending();
        self.attached.store(true, Ordering::Release);
    }

    /// Whether the watcher is currently armed.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    /// The host reports that the sentinel entered the (margin-extended)
    /// viewport.
    ///
    /// Ignored while detached, while a fetch is in flight or a page is
    /// still being applied, when the listing is exhausted, or when a
    /// debounce task is already armed. Otherwise arms a task that sleeps
    /// the debounce delay and then fetches the next page, logging any
    /// fetch error instead of propagating it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn sentinel_visible(&self) {
        if !self.attached.load(Ordering::Acquire) {
            return;
        }
        if self.catalog.is_busy() || self.catalog.load_phase() != LoadPhase::Idle {
            return;
        }
        if !self.catalog.has_more() {
            return;
        }

        let mut pending = self.lock_pending();
        if pending.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }

        let catalog = self.catalog.clone();
        let debounce = self.debounce;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if let Err(err) = catalog.fetch_next_page().await {
                warn!(error = %err, "deferred page fetch failed");
            }
        }));
    }

    /// Detach and cancel any armed debounce task. Safe to call repeatedly,
    /// and after the underlying client has been closed.
    pub fn disconnect(&self) {
        self.attached.store(false, Ordering::Release);
        self.abort_pending();
    }

    fn abort_pending(&self) {
        if let Some(task) = self.lock_pending().take() {
            task.abort();
        }
    }

    fn lock_pending(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ScrollWatcher {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl std::fmt::Debug for ScrollWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrollWatcher")
            .field("debounce", &self.debounce)
            .field("attached", &self.is_attached())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ContentConfig;

    // Points at a closed port; tests here never let a fetch actually run.
    fn catalog() -> CatalogClient {
        let config = ContentConfig {
            base_url: url::Url::parse("http://127.0.0.1:9/cdn").unwrap(),
            token: "test-token".to_string(),
            per_page: 25,
            timeout: Duration::from_secs(1),
        };
        CatalogClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn sentinel_is_ignored_while_detached() {
        let watcher = ScrollWatcher::new(catalog());

        watcher.sentinel_visible();

        assert!(!watcher.is_attached());
        assert!(watcher.lock_pending().is_none());
    }

    #[tokio::test]
    async fn sentinel_arms_a_single_debounce_task() {
        let watcher = ScrollWatcher::with_debounce(catalog(), Duration::from_secs(60));
        watcher.attach();

        watcher.sentinel_visible();
        watcher.sentinel_visible();

        let pending = watcher.lock_pending();
        assert!(pending.as_ref().is_some_and(|task| !task.is_finished()));
    }

    #[tokio::test]
    async fn disconnect_cancels_and_detaches() {
        let watcher = ScrollWatcher::with_debounce(catalog(), Duration::from_secs(60));
        watcher.attach();
        watcher.sentinel_visible();

        watcher.disconnect();
        watcher.disconnect();

        assert!(!watcher.is_attached());
        assert!(watcher.lock_pending().is_none());
    }

    #[tokio::test]
    async fn attach_cancels_a_leftover_task() {
        let watcher = ScrollWatcher::with_debounce(catalog(), Duration::from_secs(60));
        watcher.attach();
        watcher.sentinel_visible();
        assert!(watcher.lock_pending().is_some());

        watcher.attach();

        assert!(watcher.is_attached());
        assert!(watcher.lock_pending().is_none());
    }
}
