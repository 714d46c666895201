//! Extraction client: one model round-trip per user turn.
//!
//! The model is asked for a JSON object
//! `{ "response": "...", "extractedData": { industry, location, roles, urgency } }`.
//! Only the structure is checked: the output must be JSON, the top level must
//! be an object, and `extractedData` (when present) must be an object. Inside
//! `extractedData` anything goes; typed views are read through accessors that
//! fall back to `"unknown"` / empty. Rejected output is replaced by the
//! configured fallback reply with empty extracted data. Failures are logged
//! here and never returned to the caller.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm::{LlmProvider, Turn};

/// RecruitGenie persona and extraction schema, sent as the system instruction.
pub const SALES_ASSISTANT_PROMPT: &str =
    include_str!("../../../config/prompts/sales_assistant.txt");

/// Used when the model's JSON omits `response`.
const MISSING_RESPONSE_TEXT: &str = "Sorry, I couldn't process that.";

const UNKNOWN: &str = "unknown";

// ── Reply schema ──────────────────────────────────────────────────────────────

/// One requested role, read leniently from a `roles` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleRequirement<'a> {
    pub role: Option<&'a str>,
    /// `2` and `"2"` both read as `Some(2)`; `"unknown"`, `null` or a
    /// missing key read as `None`.
    pub count: Option<u32>,
}

impl<'a> RoleRequirement<'a> {
    fn from_value(value: &'a Value) -> Self {
        let obj = value.as_object();
        Self {
            role: obj.and_then(|o| o.get("role")).and_then(Value::as_str),
            count: obj.and_then(|o| o.get("count")).and_then(parse_count),
        }
    }

    pub fn role(&self) -> &'a str {
        self.role.unwrap_or(UNKNOWN)
    }
}

fn parse_count(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Structured lead data pulled from the conversation.
///
/// Holds the model's `extractedData` object as-is, so the stored document is
/// exactly what the model produced. Use the accessors for `"unknown"` / empty
/// defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractedData(Map<String, Value>);

impl ExtractedData {
    pub fn industry(&self) -> &str {
        self.text("industry")
    }

    pub fn location(&self) -> &str {
        self.text("location")
    }

    pub fn urgency(&self) -> &str {
        self.text("urgency")
    }

    /// Entries of `roles`; empty when the key is absent or not an array.
    pub fn roles(&self) -> Vec<RoleRequirement<'_>> {
        match self.0.get("roles") {
            Some(Value::Array(items)) => items.iter().map(RoleRequirement::from_value).collect(),
            _ => Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    fn text(&self, key: &str) -> &str {
        match self.0.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => s.as_str(),
            _ => UNKNOWN,
        }
    }
}

impl From<Map<String, Value>> for ExtractedData {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// What the chat endpoint hands back for one user turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantReply {
    pub response: String,
    pub extracted_data: ExtractedData,
    /// Set when this is the fallback reply rather than model output.
    #[serde(skip)]
    pub degraded: bool,
}

#[derive(Debug, Error)]
pub enum ReplyError {
    #[error("model output is not JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("model output has the wrong shape: {0}")]
    Shape(String),
}

/// Check raw model text against the reply structure.
pub fn parse_reply(raw: &str) -> Result<(String, ExtractedData), ReplyError> {
    let value: Value = serde_json::from_str(strip_code_fence(raw))?;
    let Value::Object(mut obj) = value else {
        return Err(ReplyError::Shape("top level is not an object".into()));
    };

    let response = match obj.remove("response") {
        None | Some(Value::Null) => MISSING_RESPONSE_TEXT.to_string(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    };

    let extracted = match obj.remove("extractedData") {
        None | Some(Value::Null) => ExtractedData::default(),
        Some(Value::Object(map)) => ExtractedData::from(map),
        Some(other) => {
            return Err(ReplyError::Shape(format!("`extractedData` is not an object: {other}")));
        }
    };

    Ok((response, extracted))
}

/// Models sometimes wrap JSON in a Markdown fence despite the JSON mime type.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

// ── Client ────────────────────────────────────────────────────────────────────

/// Wraps an [`LlmProvider`] with the sales-assistant instruction and the
/// validate-or-fallback policy. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ExtractionClient {
    provider: LlmProvider,
    system_instruction: String,
    fallback_reply: String,
}

impl ExtractionClient {
    pub fn new(provider: LlmProvider, fallback_reply: impl Into<String>) -> Self {
        Self {
            provider,
            system_instruction: SALES_ASSISTANT_PROMPT.to_string(),
            fallback_reply: fallback_reply.into(),
        }
    }

    /// Ask the model for the next reply. Never fails: provider or parse
    /// errors yield the fallback reply with `degraded = true`.
    pub async fn get_response(&self, conversation: &[Turn]) -> AssistantReply {
        let raw = match self.provider.generate(conversation, &self.system_instruction).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(provider = self.provider.name(), error = %e, "model call failed; using fallback reply");
                return self.fallback();
            }
        };

        match parse_reply(&raw) {
            Ok((response, extracted_data)) => {
                debug!(
                    industry = extracted_data.industry(),
                    location = extracted_data.location(),
                    roles = extracted_data.roles().len(),
                    urgency = extracted_data.urgency(),
                    "model reply parsed"
                );
                AssistantReply { response, extracted_data, degraded: false }
            }
            Err(e) => {
                warn!(provider = self.provider.name(), error = %e, raw_len = raw.len(), "model reply rejected; using fallback reply");
                self.fallback()
            }
        }
    }

    fn fallback(&self) -> AssistantReply {
        AssistantReply {
            response: self.fallback_reply.clone(),
            extracted_data: ExtractedData::default(),
            degraded: true,
        }
    }
}
