//! The chat widget driver.

use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use super::state::{WidgetEvent, WidgetState};
use crate::advisor::Advisor;
use crate::answer::ReferenceExcerpt;
use crate::client::AdvisorClient;
use crate::error::SubmitError;

/// One mounted chat widget.
///
/// Cloning is cheap and clones share state.
#[derive(Clone)]
pub struct ChatWidget {
    inner: Arc<WidgetInner>,
}

struct WidgetInner {
    id: String,
    state: RwLock<WidgetState>,
    client: Arc<dyn AdvisorClient>,
    last_activity: RwLock<Instant>,
}

impl fmt::Debug for ChatWidget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatWidget")
            .field("id", &self.inner.id)
            .field("state", &self.inner.state)
            .finish_non_exhaustive()
    }
}

impl ChatWidget {
    /// Mount a widget with initial state.
    pub fn new(id: impl Into<String>, client: Arc<dyn AdvisorClient>) -> Self {
        let advisor = client.registry().default_advisor();
        Self {
            inner: Arc::new(WidgetInner {
                id: id.into(),
                state: RwLock::new(WidgetState::new(advisor)),
                client,
                last_activity: RwLock::new(Instant::now()),
            }),
        }
    }

    /// Get the widget ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> WidgetState {
        self.inner.state.read().unwrap().clone()
    }

    /// Advisors offered in the selector.
    #[must_use]
    pub fn advisors(&self) -> Vec<Advisor> {
        self.inner.client.registry().advisors().collect()
    }

    /// Apply `event` and return the resulting state.
    pub fn dispatch(&self, event: WidgetEvent) -> WidgetState {
        let next = {
            let mut guard = self.inner.state.write().unwrap();
            let next = std::mem::take(&mut *guard).apply(event);
            *guard = next.clone();
            next
        };
        self.touch();
        next
    }

    /// Update the last activity timestamp.
    pub(super) fn touch(&self) {
        *self.inner.last_activity.write().unwrap() = Instant::now();
    }

    /// Whether the widget has been idle longer than `timeout`.
    ///
    /// A widget with a request in flight never expires.
    #[must_use]
    pub fn is_expired_with_timeout(&self, timeout: Duration) -> bool {
        if self.inner.state.read().unwrap().is_loading() {
            return false;
        }
        self.inner.last_activity.read().unwrap().elapsed() > timeout
    }

    pub fn edit_query(&self, query: impl Into<String>) -> WidgetState {
        self.dispatch(WidgetEvent::QueryEdited(query.into()))
    }

    pub fn select_advisor(&self, advisor: Advisor) -> WidgetState {
        self.dispatch(WidgetEvent::AdvisorSelected(advisor))
    }

    /// Ask `advisor` the question and settle the widget with the outcome.
    ///
    /// An empty question is rejected before any request is made. Once the
    /// request starts, the widget always returns to idle, including when the
    /// returned future is dropped before completion.
    pub async fn submit(
        &self,
        query: impl Into<String>,
        advisor: Advisor,
    ) -> Result<WidgetState, SubmitError> {
        let query = query.into();
        if query.is_empty() {
            warn!(name: "widget.submit.rejected", widget_id = %self.id(), "Empty question rejected");
            return Err(SubmitError::EmptyQuery);
        }

        self.dispatch(WidgetEvent::QueryEdited(query.clone()));
        self.dispatch(WidgetEvent::AdvisorSelected(advisor));
        let generation = self.dispatch(WidgetEvent::SubmitStarted).generation;

        info!(
            name: "widget.submit.started",
            widget_id = %self.id(),
            advisor = %advisor,
            generation,
            "Submission started"
        );

        let guard = SettleGuard {
            widget: self,
            generation,
            settled: false,
        };

        let event = match self.inner.client.ask(&query, advisor).await {
            Ok(answer) => {
                info!(
                    name: "widget.submit.succeeded",
                    widget_id = %self.id(),
                    generation,
                    references = answer.references.len(),
                    "Submission succeeded"
                );
                WidgetEvent::SubmitSucceeded(answer)
            }
            Err(err) => {
                error!(
                    name: "widget.submit.failed",
                    widget_id = %self.id(),
                    generation,
                    kind = err.kind(),
                    error = %err,
                    "Submission failed"
                );
                WidgetEvent::SubmitFailed
            }
        };

        Ok(guard.settle(event))
    }

    /// Open the excerpt at `index` in the overlay.
    pub fn select_excerpt(&self, index: usize) -> Option<ReferenceExcerpt> {
        let excerpt = self.snapshot().references.get(index).cloned()?;
        self.dispatch(WidgetEvent::ExcerptOpened(excerpt.excerpt_text.clone()));
        Some(excerpt)
    }

    /// Dismiss the overlay.
    pub fn close_excerpt(&self) -> WidgetState {
        self.dispatch(WidgetEvent::ExcerptClosed)
    }
}

/// Settles a submission exactly once, on completion or on drop.
struct SettleGuard<'a> {
    widget: &'a ChatWidget,
    generation: u64,
    settled: bool,
}

impl SettleGuard<'_> {
    fn settle(mut self, event: WidgetEvent) -> WidgetState {
        self.settled = true;
        self.apply(event)
    }

    fn apply(&self, event: WidgetEvent) -> WidgetState {
        let current = self.widget.inner.state.read().unwrap().generation;
        if current != self.generation {
            // Last settle wins; a newer submission is overwritten.
            warn!(
                name: "widget.submit.superseded",
                widget_id = %self.widget.id(),
                generation = self.generation,
                current,
                "Stale response settled after a newer submission started"
            );
        }
        self.widget.dispatch(event)
    }
}

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        warn!(
            name: "widget.submit.abandoned",
            widget_id = %self.widget.id(),
            generation = self.generation,
            "Submission dropped before settling"
        );
        self.apply(WidgetEvent::SubmitFailed);
    }
}
