//! Agents of the AI Town simulation.
//!
//! An [`Agent`] owns everything about a townsperson except its position,
//! which the town map holds. The pieces are split by concern:
//!
//! - [`agent`] -- The agent record and its observer views
//! - [`memory`] -- Bounded, importance-ranked memory with lexical retrieval
//! - [`vitals`] -- Energy and hunger drift, rest, eating, pressing moods
//! - [`social`] -- Relationship scores
//! - [`conversation`] -- Bounded conversation logs
//! - [`config`] -- Vitals and memory tunables

pub mod agent;
pub mod config;
pub mod conversation;
pub mod memory;
pub mod social;
pub mod vitals;

pub use agent::{Agent, INITIAL_ACTION, INITIAL_MOOD};
pub use config::{MemoryConfig, VitalsConfig};
pub use conversation::ConversationLog;
pub use memory::MemoryStore;
pub use social::Relationships;
pub use vitals::Vitals;
