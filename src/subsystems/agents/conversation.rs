//! Conversation assembly: stored history plus the new user turn.

use crate::error::AppError;
use crate::llm::Turn;
use crate::subsystems::memory::{Message, MessageId, SessionStore};

/// Builds the turn list sent to the model.
///
/// By default the whole session is replayed on every call. A window, when
/// configured, keeps only the most recent stored turns.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConversationAssembler {
    max_history_turns: Option<usize>,
}

impl ConversationAssembler {
    pub fn new(max_history_turns: Option<usize>) -> Self {
        Self { max_history_turns }
    }

    /// Read the session's stored turns and append `user_input` as a user turn.
    ///
    /// `pending` is the id of `user_input` when it was already persisted; it
    /// and anything written after it are left out so the turn is not sent twice.
    pub fn build_contents(
        &self,
        store: &SessionStore,
        session_id: &str,
        user_input: &str,
        pending: Option<MessageId>,
    ) -> Result<Vec<Turn>, AppError> {
        let mut history = store.list_messages(session_id)?;
        if let Some(pending) = pending {
            history.retain(|m| m.id < pending);
        }
        Ok(self.assemble(&history, user_input))
    }

    /// Map `history` to turns, apply the window, append the user turn.
    pub fn assemble(&self, history: &[Message], user_input: &str) -> Vec<Turn> {
        let skip = self
            .max_history_turns
            .map(|max| history.len().saturating_sub(max))
            .unwrap_or(0);

        history[skip..]
            .iter()
            .map(Turn::from)
            .chain(std::iter::once(Turn::user(user_input)))
            .collect()
    }
}
