use std::time::Duration;

use loop_agent_core::tool::{Error as ToolError, Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;
use tokio::time::sleep;

use super::store::UserStore;

/// How long a simulated delivery takes.
const SEND_LATENCY: Duration = Duration::from_millis(500);

/// Input of [`NotifyCustomerTool`].
#[derive(Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotifyCustomerParameters {
    #[schemars(description = "Customer's email address")]
    customer_email: String,
    #[schemars(description = "The update message to send to the customer")]
    message: String,
}

/// A tool for emailing a customer. Delivery is simulated.
pub struct NotifyCustomerTool {
    store: UserStore,
    parameter_schema: Value,
}

impl NotifyCustomerTool {
    /// Creates a new notification tool over the given store.
    #[inline]
    pub fn new(store: UserStore) -> Self {
        NotifyCustomerTool {
            store,
            parameter_schema: schema_for!(NotifyCustomerParameters).to_value(),
        }
    }
}

impl Tool for NotifyCustomerTool {
    type Input = NotifyCustomerParameters;

    fn name(&self) -> &str {
        "notify_customer"
    }

    fn description(&self) -> &str {
        "Send a notification email to a customer about their order or account"
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn validate(
        &self,
        input: &NotifyCustomerParameters,
    ) -> Result<(), ToolError> {
        if input.message.trim().is_empty() {
            return Err(ToolError::invalid_input()
                .with_reason("`message` must not be empty"));
        }
        Ok(())
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: NotifyCustomerParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let known = self.store.find(&input.customer_email).is_some();
        async move {
            let email = input.customer_email;
            if !known {
                return Ok(format!(
                    "❌ Failed to send notification: \
                     Customer with email {email} not found"
                ));
            }

            sleep(SEND_LATENCY).await;
            info!("notified {email}");
            Ok(format!("✓ Sent update to {email}: \"{}\"", input.message))
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::Instant;

    use super::*;

    fn input(email: &str, message: &str) -> NotifyCustomerParameters {
        NotifyCustomerParameters {
            customer_email: email.to_owned(),
            message: message.to_owned(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_notify_customer() {
        let tool = NotifyCustomerTool::new(UserStore::seeded());

        let started = Instant::now();
        let output = tool
            .execute(input("john@co.com", "Your plan renews soon."))
            .await
            .unwrap();
        assert_eq!(
            output,
            "✓ Sent update to john@co.com: \"Your plan renews soon.\""
        );
        assert!(started.elapsed() >= SEND_LATENCY);

        let output = tool.execute(input("alice@co.com", "Hi")).await.unwrap();
        assert_eq!(
            output,
            "❌ Failed to send notification: \
             Customer with email alice@co.com not found"
        );
    }

    #[test]
    fn test_parameter_names() {
        let decoded: NotifyCustomerParameters =
            serde_json::from_value(serde_json::json!({
                "customerEmail": "john@co.com",
                "message": "Hi",
            }))
            .unwrap();
        assert_eq!(decoded.customer_email, "john@co.com");

        let tool = NotifyCustomerTool::new(UserStore::seeded());
        assert!(tool.validate(&decoded).is_ok());
        assert!(tool.validate(&input("john@co.com", " ")).is_err());
    }
}
