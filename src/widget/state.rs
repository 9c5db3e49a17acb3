//! Widget state record and its reducer.

use serde::Serialize;

use crate::advisor::Advisor;
use crate::answer::{Answer, ReferenceExcerpt};
use crate::error::USER_FACING_ERROR;

/// Whether a submission is in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestState {
    #[default]
    Idle,
    Loading,
}

/// Everything a widget renders from.
///
/// The record is replaced wholesale on every [`WidgetEvent`]; see
/// [`WidgetState::apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WidgetState {
    /// Text currently in the question box.
    pub query: String,
    /// Advisor the next question goes to.
    pub advisor: Advisor,
    pub request: RequestState,
    /// Markdown answer, or the fixed error text after a failure.
    pub response: Option<String>,
    /// Excerpts backing the current answer, in server order.
    pub references: Vec<ReferenceExcerpt>,
    /// Excerpt text shown in the overlay.
    pub displayed_excerpt: Option<String>,
    /// Number of submissions started so far.
    pub generation: u64,
}

/// Discrete transitions of a [`WidgetState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetEvent {
    QueryEdited(String),
    AdvisorSelected(Advisor),
    SubmitStarted,
    SubmitSucceeded(Answer),
    SubmitFailed,
    ExcerptOpened(String),
    ExcerptClosed,
}

impl WidgetState {
    /// Initial state for a freshly mounted widget.
    #[must_use]
    pub fn new(advisor: Advisor) -> Self {
        Self {
            advisor,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.request == RequestState::Loading
    }

    /// Apply one event, producing the next state.
    #[must_use]
    pub fn apply(self, event: WidgetEvent) -> Self {
        match event {
            WidgetEvent::QueryEdited(query) => Self { query, ..self },
            WidgetEvent::AdvisorSelected(advisor) => Self { advisor, ..self },
            WidgetEvent::SubmitStarted => Self {
                request: RequestState::Loading,
                response: None,
                references: Vec::new(),
                displayed_excerpt: None,
                generation: self.generation + 1,
                ..self
            },
            WidgetEvent::SubmitSucceeded(answer) => Self {
                request: RequestState::Idle,
                response: Some(answer.text),
                references: answer.references,
                displayed_excerpt: None,
                ..self
            },
            WidgetEvent::SubmitFailed => Self {
                request: RequestState::Idle,
                response: Some(USER_FACING_ERROR.to_string()),
                references: Vec::new(),
                displayed_excerpt: None,
                ..self
            },
            WidgetEvent::ExcerptOpened(text) => Self {
                displayed_excerpt: Some(text),
                ..self
            },
            WidgetEvent::ExcerptClosed => Self {
                displayed_excerpt: None,
                ..self
            },
        }
    }
}
