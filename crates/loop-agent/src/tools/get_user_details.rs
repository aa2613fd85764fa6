use loop_agent_core::tool::{Error as ToolError, Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

use super::store::UserStore;

/// Input of [`GetUserDetailsTool`].
#[derive(Deserialize, JsonSchema)]
pub struct GetUserDetailsParameters {
    #[schemars(description = "User's email address")]
    email: String,
}

/// A tool for reading one user's account details.
pub struct GetUserDetailsTool {
    store: UserStore,
    parameter_schema: Value,
}

impl GetUserDetailsTool {
    /// Creates a new details tool over the given store.
    #[inline]
    pub fn new(store: UserStore) -> Self {
        GetUserDetailsTool {
            store,
            parameter_schema: schema_for!(GetUserDetailsParameters).to_value(),
        }
    }
}

impl Tool for GetUserDetailsTool {
    type Input = GetUserDetailsParameters;

    fn name(&self) -> &str {
        "get_user_details"
    }

    fn description(&self) -> &str {
        "Get detailed information about a specific user"
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn validate(
        &self,
        input: &GetUserDetailsParameters,
    ) -> Result<(), ToolError> {
        if input.email.trim().is_empty() {
            return Err(ToolError::invalid_input()
                .with_reason("`email` must not be empty"));
        }
        Ok(())
    }

    fn execute(
        &self,
        input: GetUserDetailsParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let details = match self.store.find(&input.email) {
            Some(user) => user.format_details(),
            None => format!("No user found with email: {}", input.email),
        };
        std::future::ready(Ok(format!(
            "{details}

Actions available:
- Use 'notify_customer' to send them an email
- Use 'update_subscription' to modify their plan"
        )))
    }
}
