//! Advisor personas and the endpoints that answer them.
//!
//! Each [`Advisor`] is backed by one remote service. The [`AdvisorRegistry`]
//! is the static tag -> base URL mapping built at start-up; it derives the
//! URL a question is posted to.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

/// A named persona selecting which backend answers a question.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Advisor {
    /// Engineering management advisor (the default).
    #[default]
    EngineeringManagement,
    /// Solution architecture advisor.
    SolutionArchitect,
}

impl Advisor {
    /// Every advisor, in selector order.
    pub const ALL: [Advisor; 2] = [Advisor::EngineeringManagement, Advisor::SolutionArchitect];

    /// Wire tag used in forms and JSON.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::EngineeringManagement => "engineering-management",
            Self::SolutionArchitect => "solution-architect",
        }
    }

    /// Human-readable name shown in the selector and button.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::EngineeringManagement => "Engineering Management Advisor",
            Self::SolutionArchitect => "Solution Architect Advisor",
        }
    }
}

impl fmt::Display for Advisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Error returned when parsing an unknown advisor tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown advisor: {0}")]
pub struct UnknownAdvisorTag(pub String);

impl FromStr for Advisor {
    type Err = UnknownAdvisorTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|advisor| advisor.tag() == s.trim())
            .ok_or_else(|| UnknownAdvisorTag(s.to_string()))
    }
}

/// How the question URL is derived from an advisor's base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointStyle {
    /// `POST <base>/query`.
    #[default]
    Query,
    /// `POST <base>`.
    Base,
}

/// Errors building a registry from configuration.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// No advisor has a base URL.
    #[error("at least one advisor base URL must be configured")]
    Empty,
    /// A configured base URL does not parse.
    #[error("invalid base URL for {advisor}: {source}")]
    InvalidUrl {
        advisor: Advisor,
        #[source]
        source: url::ParseError,
    },
}

/// Static mapping of advisor tag to base URL.
#[derive(Debug, Clone)]
pub struct AdvisorRegistry {
    bases: BTreeMap<Advisor, Url>,
    style: EndpointStyle,
}

impl AdvisorRegistry {
    /// Build a registry from `(advisor, base_url)` pairs.
    ///
    /// Blank URLs are skipped, so an advisor without a configured URL is simply
    /// not offered.
    pub fn new<I, S>(entries: I, style: EndpointStyle) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = (Advisor, S)>,
        S: AsRef<str>,
    {
        let mut bases = BTreeMap::new();
        for (advisor, raw) in entries {
            let raw = raw.as_ref().trim();
            if raw.is_empty() {
                continue;
            }
            let url = Url::parse(raw).map_err(|source| RegistryError::InvalidUrl { advisor, source })?;
            bases.insert(advisor, url);
        }
        if bases.is_empty() {
            return Err(RegistryError::Empty);
        }
        Ok(Self { bases, style })
    }

    /// Advisors with a configured endpoint, in selector order.
    pub fn advisors(&self) -> impl Iterator<Item = Advisor> + '_ {
        self.bases.keys().copied()
    }

    /// Whether the form needs an advisor selector.
    #[must_use]
    pub fn is_multi(&self) -> bool {
        self.bases.len() > 1
    }

    #[must_use]
    pub fn contains(&self, advisor: Advisor) -> bool {
        self.bases.contains_key(&advisor)
    }

    /// The advisor selected when a widget mounts.
    #[must_use]
    pub fn default_advisor(&self) -> Advisor {
        if self.contains(Advisor::default()) {
            return Advisor::default();
        }
        self.advisors().next().unwrap_or_default()
    }

    #[must_use]
    pub fn style(&self) -> EndpointStyle {
        self.style
    }

    /// URL a question for `advisor` is posted to.
    #[must_use]
    pub fn endpoint(&self, advisor: Advisor) -> Option<Url> {
        let base = self.bases.get(&advisor)?;
        match self.style {
            EndpointStyle::Base => Some(base.clone()),
            EndpointStyle::Query => {
                let mut url = base.clone();
                let path = format!("{}/query", base.path().trim_end_matches('/'));
                url.set_path(&path);
                Some(url)
            }
        }
    }
}
