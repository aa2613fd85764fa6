use backoff::ExponentialBackoff;
use loop_agent_core::observer::Observer;
use loop_agent_core::{Agent, AgentBuilder, Error, RunOutcome};
use loop_agent_model::ModelProvider;

use crate::tools::*;

/// The system prompt of the customer-service agent.
pub const CUSTOMER_SERVICE_PROMPT: &str = include_str!("./system_prompt.md");

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    agent_builder: AgentBuilder,
    store: Option<UserStore>,
}

impl SessionBuilder {
    /// Creates a session builder with a specified model provider.
    pub fn with_model_provider<M: ModelProvider + 'static>(
        provider: M,
    ) -> Self {
        let agent_builder = AgentBuilder::with_model_provider(provider)
            .with_system_prompt(CUSTOMER_SERVICE_PROMPT);
        Self {
            agent_builder,
            store: None,
        }
    }

    /// Sets the model identifier passed to the provider.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.agent_builder = self.agent_builder.with_model(model);
        self
    }

    /// Replaces the customer-service system prompt.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.agent_builder = self.agent_builder.with_system_prompt(prompt);
        self
    }

    /// Sets the round budget of every query.
    #[inline]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.agent_builder =
            self.agent_builder.with_max_iterations(max_iterations);
        self
    }

    /// Attaches an observer to the agent.
    #[inline]
    pub fn with_observer<O: Observer>(mut self, observer: O) -> Self {
        self.agent_builder = self.agent_builder.with_observer(observer);
        self
    }

    /// Retries rate-limited model calls with the given policy.
    #[inline]
    pub fn with_model_retry(mut self, policy: ExponentialBackoff) -> Self {
        self.agent_builder = self.agent_builder.with_model_retry(policy);
        self
    }

    /// Uses the given store instead of the seeded demo accounts.
    #[inline]
    pub fn with_user_store(mut self, store: UserStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Builds a new session.
    pub fn build(self) -> Session {
        let store = self.store.unwrap_or_default();
        let agent = self
            .agent_builder
            .with_tool(NotifyCustomerTool::new(store.clone()))
            .with_tool(SearchUsersTool::new(store.clone()))
            .with_tool(GetUserDetailsTool::new(store.clone()))
            .with_tool(UpdateSubscriptionTool::new(store.clone()))
            .build();

        Session { agent, store }
    }
}

/// A customer-service session.
///
/// The session holds a fully configured agent and the store its tools work
/// on. Every query is an independent run: nothing but the store's state
/// carries over between queries.
pub struct Session {
    agent: Agent,
    store: UserStore,
}

impl Session {
    /// Answers a query.
    #[inline]
    pub async fn ask(&self, query: &str) -> Result<RunOutcome, Error> {
        self.agent.run(query).await
    }

    /// Returns the store shared by the tools.
    #[inline]
    pub fn store(&self) -> &UserStore {
        &self.store
    }

    /// Returns the underlying agent.
    #[inline]
    pub fn agent(&self) -> &Agent {
        &self.agent
    }
}
