use chrono::Utc;
use loop_agent_core::tool::{Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

use super::store::{Plan, SubscriptionAction, UserStore};

/// Input of [`UpdateSubscriptionTool`].
#[derive(Deserialize, JsonSchema)]
pub struct UpdateSubscriptionParameters {
    #[schemars(description = "Customer's email address")]
    email: String,
    #[schemars(description = "New subscription plan")]
    plan: Option<Plan>,
    #[schemars(description = "Action to take on subscription")]
    action: Option<SubscriptionAction>,
}

/// A tool for changing a customer's plan, renewing or cancelling it.
pub struct UpdateSubscriptionTool {
    store: UserStore,
    parameter_schema: Value,
}

impl UpdateSubscriptionTool {
    /// Creates a new subscription tool over the given store.
    #[inline]
    pub fn new(store: UserStore) -> Self {
        UpdateSubscriptionTool {
            store,
            parameter_schema: schema_for!(UpdateSubscriptionParameters)
                .to_value(),
        }
    }
}

impl Tool for UpdateSubscriptionTool {
    type Input = UpdateSubscriptionParameters;

    fn name(&self) -> &str {
        "update_subscription"
    }

    fn description(&self) -> &str {
        "Update a customer's subscription plan or status"
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: UpdateSubscriptionParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let updated = self.store.update_subscription(
            &input.email,
            input.plan,
            input.action,
            Utc::now(),
        );
        let output = match updated {
            None => format!(
                "❌ Failed to update subscription: \
                 Customer with email {} not found",
                input.email
            ),
            Some((user, changes)) if changes.is_empty() => {
                format!("No changes made to {}'s subscription.", user.name)
            }
            Some((user, changes)) => {
                info!("updated subscription of {}: {changes:?}", user.email);
                format!(
                    "✓ Updated {}'s subscription: {}",
                    user.name,
                    changes.join(", ")
                )
            }
        };
        std::future::ready(Ok(output))
    }
}
