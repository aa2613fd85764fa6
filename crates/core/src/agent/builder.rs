use std::sync::Arc;

use backoff::ExponentialBackoff;
use loop_agent_model::ModelProvider;

use super::Agent;
use crate::model_client::ModelClient;
use crate::observer::{NoopObserver, Observer};
use crate::tool::{Registry, Tool};

/// The system prompt used when none is given.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// The iteration budget used when none is given.
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// [`Agent`] builder.
pub struct AgentBuilder {
    pub(crate) model_client: ModelClient,
    pub(crate) model: Option<String>,
    pub(crate) system_prompt: String,
    pub(crate) max_iterations: usize,
    pub(crate) tools: Registry,
    pub(crate) observer: Arc<dyn Observer>,
}

impl AgentBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            model: None,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_owned(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tools: Registry::default(),
            observer: Arc::new(NoopObserver),
        }
    }

    /// Sets the model identifier passed to the provider.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the system prompt for the agent.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Sets the maximum number of rounds in one run.
    ///
    /// `0` is treated as unset and falls back to [`DEFAULT_MAX_ITERATIONS`].
    #[inline]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = if max_iterations == 0 {
            DEFAULT_MAX_ITERATIONS
        } else {
            max_iterations
        };
        self
    }

    /// Registers a tool. A tool with the same name registered earlier is
    /// replaced.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.tools.add_tool(tool);
        self
    }

    /// Attaches an observer to be notified about rounds and tool calls.
    #[inline]
    pub fn with_observer<O: Observer>(mut self, observer: O) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    /// Retries model calls that fail with a transient error.
    ///
    /// Without a policy, the first model failure ends the run.
    #[inline]
    pub fn with_model_retry(mut self, policy: ExponentialBackoff) -> Self {
        self.model_client.set_retry_policy(policy);
        self
    }

    /// Builds the agent.
    #[inline]
    pub fn build(self) -> Agent {
        Agent::from_builder(self)
    }
}
