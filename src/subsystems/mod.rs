//! Subsystem modules for the RecruitGenie service.
//!
//! Request flow: `comms` (HTTP) → `agents` (assembly, model call) → `memory` (SQLite).

pub mod agents;
pub mod comms;
pub mod memory;
