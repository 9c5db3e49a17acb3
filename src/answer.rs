//! Wire and domain types for advisor answers.
//!
//! [`QueryRequest`] is the body posted to an advisor; [`AnswerBody`] is what it
//! sends back. [`Answer`] is the projection the widget keeps.

use serde::{Deserialize, Deserializer, Serialize};

/// Body of the outbound POST.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The user's question, verbatim.
    pub prompt: String,
}

impl QueryRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }
}

/// One retrieved source chunk as the advisor reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub file_name: String,
    pub chunk: String,
}

/// Response body returned by an advisor endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerBody {
    /// Markdown answer.
    pub response: String,
    /// Source chunks backing the answer; absent or `null` means none.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub search_results: Vec<SearchResult>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<SearchResult>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<SearchResult>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A snippet of source-document text attributed to a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceExcerpt {
    pub source_name: String,
    pub excerpt_text: String,
}

impl From<SearchResult> for ReferenceExcerpt {
    fn from(result: SearchResult) -> Self {
        Self {
            source_name: result.file_name,
            excerpt_text: result.chunk,
        }
    }
}

/// A settled, successful answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    /// Markdown text.
    pub text: String,
    /// Excerpts in server order.
    pub references: Vec<ReferenceExcerpt>,
}

impl Answer {
    /// Answer without references.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            references: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_reference(mut self, source_name: impl Into<String>, excerpt_text: impl Into<String>) -> Self {
        self.references.push(ReferenceExcerpt {
            source_name: source_name.into(),
            excerpt_text: excerpt_text.into(),
        });
        self
    }
}

impl From<AnswerBody> for Answer {
    fn from(body: AnswerBody) -> Self {
        Self {
            text: body.response,
            references: body.search_results.into_iter().map(Into::into).collect(),
        }
    }
}
