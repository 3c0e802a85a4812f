//! AgriSight Agent — control loop, model gateway, and tools.
//!
//! This crate contains:
//! - **tools**: Tool trait, registry, and built-in tools (weather, web search)
//! - **gateway**: Message formatting, backend selection, and reply parsing
//! - **executor**: Runs the tool calls of one assistant message
//! - **directive**: System directive construction from the user profile
//! - **agent_loop**: The model ↔ tool-calling loop and the session-aware entry point

pub mod agent_loop;
pub mod directive;
pub mod executor;
pub mod gateway;
pub mod tools;

#[cfg(test)]
pub(crate) mod testing;

pub use agent_loop::{AgentLoop, LoopState, StopReason, TurnInput, TurnOutcome};
pub use directive::DirectiveBuilder;
pub use executor::ToolExecutor;
pub use gateway::{Backend, BackendSelection, ModelGateway};
pub use tools::{Tool, ToolRegistry};
