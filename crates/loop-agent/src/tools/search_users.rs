use chrono::Utc;
use loop_agent_core::tool::{Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

use super::store::{Plan, SearchCriteria, Status, UserStore};

/// Input of [`SearchUsersTool`].
#[derive(Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchUsersParameters {
    #[schemars(
        description = "Search query to match against user names or emails"
    )]
    query: Option<String>,
    #[schemars(description = "Filter by subscription plan")]
    subscription_plan: Option<Plan>,
    #[schemars(description = "Filter by subscription status")]
    subscription_status: Option<Status>,
}

/// A tool for finding users by name, email or subscription.
pub struct SearchUsersTool {
    store: UserStore,
    parameter_schema: Value,
}

impl SearchUsersTool {
    /// Creates a new search tool over the given store.
    #[inline]
    pub fn new(store: UserStore) -> Self {
        SearchUsersTool {
            store,
            parameter_schema: schema_for!(SearchUsersParameters).to_value(),
        }
    }
}

impl Tool for SearchUsersTool {
    type Input = SearchUsersParameters;

    fn name(&self) -> &str {
        "search_users"
    }

    fn description(&self) -> &str {
        "Search for users by various criteria"
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: SearchUsersParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let criteria = SearchCriteria {
            query: input.query,
            plan: input.subscription_plan,
            status: input.subscription_status,
        };
        let users = self.store.search(&criteria);
        debug!("search_users matched {} users", users.len());

        let listing = if users.is_empty() {
            "No users found matching the criteria.".to_owned()
        } else {
            let now = Utc::now();
            let entries: Vec<_> = users
                .iter()
                .enumerate()
                .map(|(idx, user)| user.format_summary(idx + 1, now))
                .collect();
            format!(
                "Found {} user{}:\n\n{}",
                users.len(),
                if users.len() == 1 { "" } else { "s" },
                entries.join("\n\n")
            )
        };
        std::future::ready(Ok(format!(
            "{listing}\n\nNeed more details? \
             Use 'get_user_details' with the user's email."
        )))
    }
}
