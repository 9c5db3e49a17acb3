//! Shared helpers: a local advisor service and app construction.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use advisor_chat::AppState;
use advisor_chat::advisor::{Advisor, AdvisorRegistry, EndpointStyle};
use advisor_chat::client::{AdvisorClient, HttpAdvisorClient};
use advisor_chat::config::{
    AdvisorsConfig, AppConfig, ClientConfig, LoggingConfig, ServerConfig, WidgetConfig,
};
use advisor_chat::render::ReferenceLayout;
use advisor_chat::widget::WidgetStore;
use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::Value;

/// A request the fake advisor received.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub body: Value,
}

/// What the fake advisor answers with.
#[derive(Debug, Clone)]
pub enum Reply {
    Json(Value),
    Status(StatusCode),
    Raw(&'static str),
}

#[derive(Clone)]
struct UpstreamState {
    recorded: Arc<Mutex<Vec<Recorded>>>,
    reply: Reply,
}

/// A running fake advisor service.
pub struct Upstream {
    pub base_url: String,
    pub recorded: Arc<Mutex<Vec<Recorded>>>,
}

impl Upstream {
    pub fn requests(&self) -> Vec<Recorded> {
        self.recorded.lock().unwrap().clone()
    }
}

async fn record(State(state): State<UpstreamState>, uri: Uri, Json(body): Json<Value>) -> Response {
    state.recorded.lock().unwrap().push(Recorded {
        path: uri.path().to_string(),
        body,
    });
    match state.reply {
        Reply::Json(value) => Json(value).into_response(),
        Reply::Status(status) => (status, "upstream failure").into_response(),
        Reply::Raw(text) => (StatusCode::OK, text).into_response(),
    }
}

/// Start a fake advisor on an ephemeral port, answering every POST with `reply`.
pub async fn spawn_upstream(reply: Reply) -> Upstream {
    let recorded = Arc::new(Mutex::new(Vec::new()));
    let state = UpstreamState {
        recorded: Arc::clone(&recorded),
        reply,
    };
    let app = Router::new()
        .route("/", post(record))
        .route("/{*rest}", post(record))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Upstream {
        base_url: format!("http://{addr}"),
        recorded,
    }
}

/// A base URL nothing is listening on.
pub async fn dead_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub fn test_config(layout: ReferenceLayout) -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            static_dir: "static".into(),
        },
        advisors: AdvisorsConfig {
            engineering_management: None,
            solution_architect: None,
            endpoint_style: EndpointStyle::Query,
        },
        widget: WidgetConfig {
            title: "Jarvis".into(),
            reference_layout: layout,
            idle_timeout_secs: 1800,
        },
        client: ClientConfig::default(),
        logging: LoggingConfig { json: false },
    }
}

/// App state around any client.
pub fn state_with_client(client: Arc<dyn AdvisorClient>, layout: ReferenceLayout) -> AppState {
    let config = test_config(layout);
    AppState {
        widgets: WidgetStore::new(client, config.widget_idle_timeout()),
        view: Arc::new(config.view()),
        config: Arc::new(config),
    }
}

/// App state using the real HTTP client against the given advisors.
pub fn http_state(
    advisors: &[(Advisor, &str)],
    style: EndpointStyle,
    layout: ReferenceLayout,
) -> AppState {
    let registry = AdvisorRegistry::new(advisors.iter().copied(), style).unwrap();
    let client = HttpAdvisorClient::new(registry, None).unwrap();
    state_with_client(Arc::new(client), layout)
}
