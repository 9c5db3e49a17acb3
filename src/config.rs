//! Layered configuration.
//!
//! Priority, lowest first: built-in defaults (advisor base URLs baked in at
//! compile time), config file, `ADVISOR_CHAT_` environment variables, CLI
//! flags and their environment aliases.

use std::time::Duration;

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::advisor::{Advisor, AdvisorRegistry, EndpointStyle, RegistryError};
use crate::render::{ReferenceLayout, WidgetView};

/// Engineering management base URL baked in at build time.
const BUILD_ENGINEERING_MANAGEMENT_URL: Option<&str> =
    option_env!("ADVISOR_CHAT_ENGINEERING_MANAGEMENT_URL");
/// Solution architect base URL baked in at build time.
const BUILD_SOLUTION_ARCHITECT_URL: Option<&str> = option_env!("ADVISOR_CHAT_SOLUTION_ARCHITECT_URL");

/// Config file looked up in the working directory when none is given.
const DEFAULT_CONFIG_NAME: &str = "advisor-chat";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Address to bind
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Base URL of the engineering management advisor
    #[arg(long, env = "ADVISOR_CHAT_ENGINEERING_MANAGEMENT_URL")]
    pub engineering_management_url: Option<String>,

    /// Base URL of the solution architect advisor
    #[arg(long, env = "ADVISOR_CHAT_SOLUTION_ARCHITECT_URL")]
    pub solution_architect_url: Option<String>,

    /// `query` posts to <base>/query, `base` posts to <base>
    #[arg(long)]
    pub endpoint_style: Option<String>,

    /// `modal` or `inline`
    #[arg(long)]
    pub reference_layout: Option<String>,

    /// Emit JSON logs
    #[arg(long, env = "LOG_JSON")]
    pub log_json: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub advisors: AdvisorsConfig,
    pub widget: WidgetConfig,
    #[serde(default)]
    pub client: ClientConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory served under `/static`.
    pub static_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AdvisorsConfig {
    pub engineering_management: Option<String>,
    pub solution_architect: Option<String>,
    pub endpoint_style: EndpointStyle,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WidgetConfig {
    pub title: String,
    pub reference_layout: ReferenceLayout,
    /// Widgets untouched for this long are dropped on the next mount.
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ClientConfig {
    /// Request timeout; unset leaves the HTTP client default.
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub json: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.static_dir", "static")?
            .set_default("advisors.endpoint_style", "query")?
            .set_default("widget.title", "Jarvis")?
            .set_default("widget.reference_layout", "modal")?
            .set_default("widget.idle_timeout_secs", 1800)?
            .set_default("logging.json", false)?;

        if let Some(url) = BUILD_ENGINEERING_MANAGEMENT_URL {
            builder = builder.set_default("advisors.engineering_management", url)?;
        }
        if let Some(url) = BUILD_SOLUTION_ARCHITECT_URL {
            builder = builder.set_default("advisors.solution_architect", url)?;
        }

        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_NAME).required(false)),
        };

        // E.g. ADVISOR_CHAT_SERVER__PORT=8000
        builder = builder.add_source(
            Environment::with_prefix("ADVISOR_CHAT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Some(url) = cli.engineering_management_url {
            builder = builder.set_override("advisors.engineering_management", url)?;
        }
        if let Some(url) = cli.solution_architect_url {
            builder = builder.set_override("advisors.solution_architect", url)?;
        }
        if let Some(style) = cli.endpoint_style {
            builder = builder.set_override("advisors.endpoint_style", style)?;
        }
        if let Some(layout) = cli.reference_layout {
            builder = builder.set_override("widget.reference_layout", layout)?;
        }
        if let Some(json) = cli.log_json {
            builder = builder.set_override("logging.json", json)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Build the advisor registry from the configured base URLs.
    pub fn registry(&self) -> Result<AdvisorRegistry, RegistryError> {
        let entries = [
            (Advisor::EngineeringManagement, &self.advisors.engineering_management),
            (Advisor::SolutionArchitect, &self.advisors.solution_architect),
        ];
        AdvisorRegistry::new(
            entries
                .into_iter()
                .filter_map(|(advisor, url)| url.as_deref().map(|url| (advisor, url))),
            self.advisors.endpoint_style,
        )
    }

    #[must_use]
    pub fn view(&self) -> WidgetView {
        WidgetView {
            title: self.widget.title.clone(),
            layout: self.widget.reference_layout,
        }
    }

    #[must_use]
    pub fn widget_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.widget.idle_timeout_secs)
    }

    #[must_use]
    pub fn client_timeout(&self) -> Option<Duration> {
        self.client.timeout_secs.map(Duration::from_secs)
    }

    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
