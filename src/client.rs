//! Outbound advisor client.
//!
//! [`AdvisorClient`] is the seam the widget talks through: one question in,
//! one [`Answer`] or [`RequestFailure`] out. [`HttpAdvisorClient`] is the
//! production implementation over `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::advisor::{Advisor, AdvisorRegistry};
use crate::answer::{Answer, AnswerBody, QueryRequest};
use crate::error::{RequestFailure, Result};

/// Something that can answer a question on behalf of an advisor.
#[async_trait]
pub trait AdvisorClient: Send + Sync {
    /// Ask `advisor` the given question.
    async fn ask(&self, query: &str, advisor: Advisor) -> Result<Answer>;

    /// Advisors this client can route to.
    fn registry(&self) -> &AdvisorRegistry;
}

/// `reqwest`-backed client posting `{ "prompt": .. }` as JSON.
#[derive(Debug, Clone)]
pub struct HttpAdvisorClient {
    http: reqwest::Client,
    registry: AdvisorRegistry,
}

impl HttpAdvisorClient {
    /// Create a client. `timeout` of `None` leaves reqwest's default (no timeout).
    pub fn new(registry: AdvisorRegistry, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            registry,
        })
    }
}

#[async_trait]
impl AdvisorClient for HttpAdvisorClient {
    async fn ask(&self, query: &str, advisor: Advisor) -> Result<Answer> {
        let url = self
            .registry
            .endpoint(advisor)
            .ok_or(RequestFailure::UnknownAdvisor(advisor))?;

        info!(
            name: "advisor.request.sent",
            advisor = %advisor,
            url = %url,
            prompt_len = query.len(),
            "Posting question to advisor"
        );

        let resp = self
            .http
            .post(url)
            .json(&QueryRequest::new(query))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(RequestFailure::Status { status, body });
        }

        let body: AnswerBody = serde_json::from_str(&body)?;
        debug!(
            name: "advisor.response.decoded",
            advisor = %advisor,
            references = body.search_results.len(),
            "Advisor answer decoded"
        );
        Ok(body.into())
    }

    fn registry(&self) -> &AdvisorRegistry {
        &self.registry
    }
}
