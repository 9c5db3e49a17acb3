//! Storage for mounted widgets.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tracing::info;
use uuid::Uuid;

use super::chat::ChatWidget;
use crate::client::AdvisorClient;

/// Thread-safe store of mounted widgets, keyed by id.
///
/// Every widget shares the store's [`AdvisorClient`]. Widgets idle for longer
/// than the store's timeout are dropped the next time a widget is mounted.
#[derive(Clone)]
pub struct WidgetStore {
    inner: Arc<WidgetStoreInner>,
}

struct WidgetStoreInner {
    widgets: RwLock<HashMap<String, ChatWidget>>,
    client: Arc<dyn AdvisorClient>,
    idle_timeout: Duration,
}

impl fmt::Debug for WidgetStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetStore")
            .field("mounted", &self.len())
            .field("idle_timeout", &self.inner.idle_timeout)
            .finish_non_exhaustive()
    }
}

impl WidgetStore {
    /// Create an empty store.
    pub fn new(client: Arc<dyn AdvisorClient>, idle_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(WidgetStoreInner {
                widgets: RwLock::new(HashMap::new()),
                client,
                idle_timeout,
            }),
        }
    }

    /// Mount a new widget with fresh state.
    pub fn mount(&self) -> ChatWidget {
        let removed = self.cleanup_expired();
        if removed > 0 {
            info!(name: "widget.expired", removed, "Idle widgets removed");
        }

        let id = Uuid::new_v4().to_string();
        let widget = ChatWidget::new(id.clone(), Arc::clone(&self.inner.client));
        self.inner.widgets.write().unwrap().insert(id, widget.clone());
        widget
    }

    /// Get a mounted widget and mark it active.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<ChatWidget> {
        let widget = self.inner.widgets.read().unwrap().get(id).cloned()?;
        widget.touch();
        Some(widget)
    }

    /// Unmount a widget. Returns `false` if it was not mounted.
    pub fn unmount(&self, id: &str) -> bool {
        self.inner.widgets.write().unwrap().remove(id).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.widgets.read().unwrap().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove widgets idle for longer than the store's timeout.
    ///
    /// Returns the number of widgets removed.
    pub fn cleanup_expired(&self) -> usize {
        let timeout = self.inner.idle_timeout;
        let mut guard = self.inner.widgets.write().unwrap();
        let before = guard.len();
        guard.retain(|_, widget| !widget.is_expired_with_timeout(timeout));
        before - guard.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::{Advisor, AdvisorRegistry, EndpointStyle};
    use crate::client::HttpAdvisorClient;
    use crate::widget::WidgetEvent;

    fn store_with_timeout(idle_timeout: Duration) -> WidgetStore {
        let registry =
            AdvisorRegistry::new([(Advisor::SolutionArchitect, "http://sa.local")], EndpointStyle::Query)
                .unwrap();
        WidgetStore::new(
            Arc::new(HttpAdvisorClient::new(registry, None).unwrap()),
            idle_timeout,
        )
    }

    fn store() -> WidgetStore {
        store_with_timeout(Duration::from_secs(3600))
    }

    #[test]
    fn test_widget_store() {
        let store = store();
        assert!(store.is_empty());

        let widget = store.mount();
        assert_eq!(store.len(), 1);
        assert_eq!(widget.snapshot().advisor, Advisor::SolutionArchitect);

        let retrieved = store.get(widget.id()).unwrap();
        assert_eq!(retrieved.id(), widget.id());

        assert!(store.unmount(widget.id()));
        assert!(!store.unmount(widget.id()));
        assert!(store.is_empty());
    }

    #[test]
    fn test_mount_gives_fresh_state() {
        let store = store();
        let first = store.mount();
        first.edit_query("draft");

        let second = store.mount();
        assert_ne!(first.id(), second.id());
        assert!(second.snapshot().query.is_empty());
    }

    #[test]
    fn test_idle_widgets_expire_on_mount() {
        let store = store_with_timeout(Duration::from_millis(1));
        let idle = store.mount();
        std::thread::sleep(Duration::from_millis(20));

        let fresh = store.mount();
        assert_eq!(store.len(), 1);
        assert!(store.get(idle.id()).is_none());
        assert!(store.get(fresh.id()).is_some());
    }

    #[test]
    fn test_cleanup_keeps_active_and_loading_widgets() {
        let store = store();
        store.mount();
        store.mount();
        assert_eq!(store.cleanup_expired(), 0);
        assert_eq!(store.len(), 2);

        let store = store_with_timeout(Duration::from_millis(1));
        let loading = store.mount();
        loading.dispatch(WidgetEvent::SubmitStarted);
        let idle = store.mount();
        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(store.cleanup_expired(), 1);
        assert!(store.get(loading.id()).is_some());
        assert!(store.get(idle.id()).is_none());
    }
}
