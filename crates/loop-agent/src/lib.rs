//! A customer-service agent built on the loop agent.
//!
//! The crate wires a small set of purpose-built tools (search, lookup,
//! notification and subscription updates over an in-memory user store)
//! into an [`Agent`](loop_agent_core::Agent). It includes a CLI for trying
//! the agent in the terminal against any OpenAI-compatible endpoint.

#![deny(missing_docs)]

#[allow(unused_imports)]
#[macro_use]
extern crate tracing;

mod session;
pub mod tools;

pub use session::{CUSTOMER_SERVICE_PROMPT, Session, SessionBuilder};

/// Re-exports of [`loop_agent_core`] crate.
pub mod core {
    pub use loop_agent_core::*;
}
