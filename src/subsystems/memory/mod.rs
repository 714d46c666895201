//! Memory subsystem: durable chat history and extracted lead data.
//!
//! Everything lives in one SQLite file (`service.db_path` in config):
//!
//! ```text
//! agent_memory.db
//! ├── messages        (id, session_id, role, text, created_at)
//! └── extracted_data  (session_id PK, data_json, updated_at)
//! ```
//!
//! Sessions are caller-named and unauthenticated: any caller holding a
//! session id can read and append to it. Only this subsystem writes the
//! tables.

pub mod store;
pub mod types;

pub use store::SessionStore;
pub use types::{Message, MessageId, Role};
