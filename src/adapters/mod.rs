//! Adapters module — presentation surfaces for the agent router.
//!
//! - **CLI** — one-shot questions and an interactive chat with usage counters

pub mod cli;

pub use cli::{install_interrupt_handler, CancelSlot, ChatInput, ChatSession, UsageMetrics};
