//! Agents subsystem: the RecruitGenie sales agent.
//!
//! [`SalesAgent`] owns the three request operations and is what the comms
//! channel calls into:
//!
//! - `submit_message`  store user turn → assemble → model → store reply → upsert lead data
//! - `history`         ordered turns, seeding the greeting into an empty session
//! - `extracted_data`  latest lead data, if any
//!
//! Store calls are blocking SQLite work and run on `spawn_blocking`.
//! Same-session requests are not serialized against each other.

pub mod conversation;
pub mod extraction;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::AssistantConfig;
use crate::error::AppError;
use crate::subsystems::memory::{Message, Role, SessionStore};

pub use conversation::ConversationAssembler;
pub use extraction::{AssistantReply, ExtractedData, ExtractionClient, RoleRequirement};

/// `id` reported for a greeting seeded by this very request.
pub const INITIAL_GREETING_ID: &str = "initial";

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("sessionId and message are required")]
    MissingField,
    #[error(transparent)]
    Memory(#[from] AppError),
}

/// One entry of `GET /history/{session_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub text: String,
    pub id: String,
}

impl From<Message> for HistoryEntry {
    fn from(m: Message) -> Self {
        Self { role: m.role, text: m.text, id: m.id.to_string() }
    }
}

#[derive(Debug, Clone)]
pub struct SalesAgent {
    store: SessionStore,
    extractor: ExtractionClient,
    assembler: ConversationAssembler,
    greeting: String,
}

impl SalesAgent {
    pub fn new(store: SessionStore, extractor: ExtractionClient, config: &AssistantConfig) -> Self {
        Self {
            store,
            extractor,
            assembler: ConversationAssembler::new(config.max_history_turns),
            greeting: config.greeting.clone(),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Handle one user turn and return the assistant's reply.
    ///
    /// Fails only on missing input (before anything is written) or on a
    /// storage error. Model failures come back as the fallback reply, which
    /// is still persisted as a model turn; stored lead data is left untouched
    /// in that case.
    pub async fn submit_message(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<AssistantReply, AgentError> {
        if session_id.is_empty() || message.is_empty() {
            return Err(AgentError::MissingField);
        }

        let store = self.store.clone();
        let assembler = self.assembler;
        let (sid, text) = (session_id.to_string(), message.to_string());
        let contents = blocking(move || {
            let user_id = store.append_message(&sid, Role::User, &text)?;
            assembler.build_contents(&store, &sid, &text, Some(user_id))
        })
        .await?;

        debug!(%session_id, turns = contents.len(), "conversation assembled");

        let reply = self.extractor.get_response(&contents).await;

        let store = self.store.clone();
        let sid = session_id.to_string();
        let response = reply.response.clone();
        let data = (!reply.degraded).then(|| reply.extracted_data.to_value());
        blocking(move || {
            store.append_message(&sid, Role::Model, &response)?;
            if let Some(data) = data {
                store.put_extracted_data(&sid, &data)?;
            }
            Ok(())
        })
        .await?;

        if reply.degraded {
            warn!(%session_id, "answered with fallback reply");
        } else {
            info!(
                %session_id,
                industry = reply.extracted_data.industry(),
                roles = reply.extracted_data.roles().len(),
                "chat turn completed"
            );
        }

        Ok(reply)
    }

    /// All turns of the session in order.
    ///
    /// Side effect: an empty session gets the greeting written as its first
    /// model turn. The request that writes it sees the entry with id
    /// [`INITIAL_GREETING_ID`]; later calls see the stored row.
    pub async fn history(&self, session_id: &str) -> Result<Vec<HistoryEntry>, AgentError> {
        if session_id.is_empty() {
            return Err(AgentError::MissingField);
        }

        let store = self.store.clone();
        let sid = session_id.to_string();
        let greeting = self.greeting.clone();
        let entries = blocking(move || -> Result<Vec<HistoryEntry>, AppError> {
            let messages = store.list_messages(&sid)?;
            if !messages.is_empty() {
                return Ok(messages.into_iter().map(HistoryEntry::from).collect());
            }

            match store.ensure_greeting(&sid, &greeting)? {
                Some(_) => Ok(vec![HistoryEntry {
                    role: Role::Model,
                    text: greeting,
                    id: INITIAL_GREETING_ID.to_string(),
                }]),
                // Another request wrote first; report what is stored now.
                None => Ok(store
                    .list_messages(&sid)?
                    .into_iter()
                    .map(HistoryEntry::from)
                    .collect()),
            }
        })
        .await?;

        debug!(%session_id, entries = entries.len(), "history fetched");
        Ok(entries)
    }

    /// Latest lead data, or `None` if no turn has produced any yet.
    pub async fn extracted_data(
        &self,
        session_id: &str,
    ) -> Result<Option<serde_json::Value>, AgentError> {
        if session_id.is_empty() {
            return Err(AgentError::MissingField);
        }

        let store = self.store.clone();
        let sid = session_id.to_string();
        Ok(blocking(move || store.get_extracted_data(&sid)).await?)
    }
}

/// Run blocking store work off the async executor.
async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Memory(format!("store task failed: {e}")))?
}
