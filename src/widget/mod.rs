//! The chat widget: state, events and the submit cycle.
//!
//! # Architecture
//!
//! - [`WidgetState`]: immutable record every render reads from
//! - [`WidgetEvent`]: the transitions, applied by [`WidgetState::apply`]
//! - [`ChatWidget`]: one mounted widget driving submissions through an
//!   [`AdvisorClient`](crate::client::AdvisorClient)
//! - [`WidgetStore`]: mounted widgets keyed by id
//!
//! A submission moves the widget `Idle -> Loading -> Idle`. There is no retry
//! and no cancellation; a second submission simply starts over.

mod chat;
mod state;
mod store;

pub use chat::ChatWidget;
pub use state::{RequestState, WidgetEvent, WidgetState};
pub use store::WidgetStore;
