use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::Arc;

use loop_agent_model::ModelTool;

use crate::tool::Tool;
use crate::tool::object::{ToolObject, ToolObjectImpl};

/// A fixed set of tools, looked up by name.
///
/// Registering a tool whose name is already taken replaces the earlier one
/// (last wins). The replacement keeps the declaration slot of the first
/// registration, so [`Registry::definitions`] stays in registration order.
///
/// Once handed to an agent, the registry is never mutated again and is
/// shared by every run of that agent.
#[derive(Default)]
pub struct Registry {
    tools: Vec<Arc<dyn ToolObject>>,
    index: HashMap<String, usize>,
}

impl Registry {
    /// Registers a tool.
    pub fn add_tool<T: Tool>(&mut self, tool: T) {
        let name = tool.name().to_owned();
        let tool: Arc<dyn ToolObject> = Arc::new(ToolObjectImpl(tool));
        match self.index.get(&name) {
            Some(&slot) => {
                debug!("tool `{name}` registered twice, replacing the old one");
                self.tools[slot] = tool;
            }
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    /// Returns `true` if a tool with the given name is registered.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Returns the number of registered tools.
    #[inline]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` if no tool is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Returns the names of the registered tools, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|tool| tool.name())
    }

    /// Returns the tool declarations to be sent to the model.
    pub fn definitions(&self) -> Vec<ModelTool> {
        self.tools
            .iter()
            .map(|tool| ModelTool {
                name: tool.name().to_owned(),
                description: tool.description().to_owned(),
                parameters: tool.parameter_schema().clone(),
            })
            .collect()
    }

    #[inline]
    pub(crate) fn get(&self, name: &str) -> Option<&Arc<dyn ToolObject>> {
        self.index.get(name).map(|&slot| &self.tools[slot])
    }
}

impl Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::future::ready;

    use serde_json::{Value, json};

    use super::*;
    use crate::tool::ToolResult;

    struct NamedTool {
        name: &'static str,
        description: &'static str,
        schema: Value,
    }

    impl NamedTool {
        fn new(name: &'static str, description: &'static str) -> Self {
            Self {
                name,
                description,
                schema: json!({ "type": "object" }),
            }
        }
    }

    impl Tool for NamedTool {
        type Input = Value;

        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            self.description
        }

        fn parameter_schema(&self) -> &Value {
            &self.schema
        }

        fn execute(
            &self,
            _input: Self::Input,
        ) -> impl Future<Output = ToolResult> + Send + 'static {
            ready(Ok(self.description.to_owned()))
        }
    }

    #[test]
    fn test_definitions_in_order() {
        let mut registry = Registry::default();
        registry.add_tool(NamedTool::new("search_users", "Search"));
        registry.add_tool(NamedTool::new("notify_customer", "Notify"));

        let names: Vec<_> = registry
            .definitions()
            .into_iter()
            .map(|def| def.name)
            .collect();
        assert_eq!(names, ["search_users", "notify_customer"]);
        assert!(registry.contains("notify_customer"));
        assert!(!registry.contains("send_fax"));
    }

    #[tokio::test]
    async fn test_last_registration_wins() {
        let mut registry = Registry::default();
        registry.add_tool(NamedTool::new("lookup", "first"));
        registry.add_tool(NamedTool::new("other", "other"));
        registry.add_tool(NamedTool::new("lookup", "second"));

        assert_eq!(registry.len(), 2);
        let defs = registry.definitions();
        assert_eq!(defs[0].name, "lookup");
        assert_eq!(defs[0].description, "second");

        let tool = Arc::clone(registry.get("lookup").unwrap());
        assert_eq!(tool.execute("{}").await.unwrap(), "second");
    }
}
