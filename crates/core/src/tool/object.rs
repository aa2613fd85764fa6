use std::future::ready;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tracing::Instrument;

use super::{Error, Tool, ToolResult};

pub(crate) type ToolFuture = Pin<Box<dyn Future<Output = ToolResult> + Send>>;

pub(crate) trait ToolObject: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameter_schema(&self) -> &Value;

    fn execute(self: Arc<Self>, arguments: &str) -> ToolFuture;
}

pub(crate) struct ToolObjectImpl<T: Tool>(pub T);

impl<T: Tool> ToolObject for ToolObjectImpl<T> {
    #[inline]
    fn name(&self) -> &str {
        self.0.name()
    }

    #[inline]
    fn description(&self) -> &str {
        self.0.description()
    }

    #[inline]
    fn parameter_schema(&self) -> &Value {
        self.0.parameter_schema()
    }

    fn execute(self: Arc<Self>, arguments: &str) -> ToolFuture {
        // Models tend to send nothing at all for tools without parameters.
        let arguments = match arguments.trim() {
            "" => "{}",
            arguments => arguments,
        };
        let input: T::Input = match serde_json::from_str(arguments) {
            Ok(input) => input,
            Err(err) => {
                return Box::pin(ready(Err(
                    Error::invalid_input().with_reason(format!("{err}"))
                )));
            }
        };
        if let Err(err) = self.0.validate(&input) {
            trace!("input rejected by the tool: {err}");
            let err = Error::invalid_input().with_reason(err.reason());
            return Box::pin(ready(Err(err)));
        }

        Box::pin(
            async move { self.0.execute(input).await }
                .instrument(debug_span!("tool execute")),
        )
    }
}
