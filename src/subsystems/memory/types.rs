//! Row types persisted by the session store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::llm::{Turn, TurnRole};

/// Store-assigned, monotonically increasing message id.
pub type MessageId = i64;

/// Author of a stored chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "model" => Ok(Role::Model),
            other => Err(AppError::Memory(format!("unknown message role '{other}'"))),
        }
    }
}

impl From<Role> for TurnRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => TurnRole::User,
            Role::Model => TurnRole::Model,
        }
    }
}

/// One persisted chat turn. Never updated or deleted once written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub session_id: String,
    pub role: Role,
    pub text: String,
    /// RFC 3339 UTC creation time.
    pub created_at: String,
}

impl From<&Message> for Turn {
    fn from(m: &Message) -> Self {
        Turn { role: m.role.into(), text: m.text.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::User, Role::Model] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("assistant".parse::<Role>().is_err());
    }

    #[test]
    fn message_maps_to_turn() {
        let m = Message {
            id: 7,
            session_id: "s".into(),
            role: Role::Model,
            text: "hi".into(),
            created_at: String::new(),
        };
        assert_eq!(Turn::from(&m), Turn::model("hi"));
    }
}
