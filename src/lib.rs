//! Advisor Chat
//!
//! An HTML-first chat widget that forwards a question to a selected advisor
//! service and renders the markdown answer with its source excerpts.
//!
//! # Architecture
//!
//! - **Server**: Axum router serving the widget as plain HTML forms, enhanced
//!   by htmx when present
//! - **Widget**: immutable state record driven by discrete events
//! - **Client**: `reqwest` advisor client behind the [`client::AdvisorClient`] trait
//!
//! # Modules
//!
//! - [`advisor`]: advisor tags and the tag -> base URL registry
//! - [`answer`]: request/response wire types and excerpt projection
//! - [`client`]: outbound advisor client
//! - [`widget`]: widget state, events and the submit cycle
//! - [`render`]: HTML and markdown rendering

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]

pub mod advisor;
pub mod answer;
pub mod client;
pub mod config;
pub mod error;
pub mod render;
pub mod server;
pub mod widget;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::render::WidgetView;
use crate::widget::WidgetStore;

/// Application state shared across all handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Mounted widgets.
    pub widgets: WidgetStore,
    /// Presentation settings.
    pub view: Arc<WidgetView>,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}
