//! Core logic including the agent loop, tool execution, and the
//! observation hooks around them.
//!
//! The entry point is [`Agent`], built with [`AgentBuilder`]:
//!
//! ```no_run
//! # async fn demo<P: loop_agent_model::ModelProvider + 'static>(provider: P) {
//! use loop_agent_core::AgentBuilder;
//!
//! let agent = AgentBuilder::with_model_provider(provider)
//!     .with_system_prompt("You are a helpful customer service agent.")
//!     .with_max_iterations(10)
//!     .build();
//! match agent.run("Find all premium users").await {
//!     Ok(outcome) => println!("{}", outcome.output()),
//!     Err(err) => eprintln!("{err}"),
//! }
//! # }
//! ```

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod agent;
mod error;
mod model_client;
pub mod observer;
pub mod tool;
pub mod transcript;

pub use agent::{
    Agent, AgentBuilder, DEFAULT_MAX_ITERATIONS, DEFAULT_SYSTEM_PROMPT,
    MAX_ITERATIONS_FALLBACK, RunOutcome,
};
pub use error::Error;
