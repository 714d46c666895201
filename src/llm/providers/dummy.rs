//! Dummy LLM provider: answers every turn with a well-formed reply object
//! echoing the latest user text. Lets the service run without an API key.

use serde_json::json;

use crate::llm::{ProviderError, Turn, TurnRole};

#[derive(Debug, Clone)]
pub struct DummyProvider;

impl DummyProvider {
    pub async fn generate(&self, turns: &[Turn], _system: &str) -> Result<String, ProviderError> {
        let last = turns
            .iter()
            .rev()
            .find(|t| t.role == TurnRole::User)
            .map(|t| t.text.as_str())
            .unwrap_or_default();

        let reply = json!({
            "response": format!("[echo] {last}"),
            "extractedData": {
                "industry": "unknown",
                "location": "unknown",
                "roles": [],
                "urgency": "unknown",
            }
        });
        Ok(reply.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echoes_last_user_turn() {
        let turns = vec![Turn::user("first"), Turn::model("ok"), Turn::user("hello")];
        let raw = DummyProvider.generate(&turns, "").await.unwrap();
        let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(v["response"], "[echo] hello");
        assert_eq!(v["extractedData"]["roles"], json!([]));
    }

    #[tokio::test]
    async fn empty_conversation() {
        let raw = DummyProvider.generate(&[], "").await.unwrap();
        let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(v["response"], "[echo] ");
    }
}
