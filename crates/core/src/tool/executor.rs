use std::sync::Arc;

use loop_agent_model::{ToolCallRequest, ToolCallResult};
use tracing::Instrument;

use crate::observer::{Observer, ToolFinished, ToolStarted, notify};
use crate::tool::{Error, Registry, ToolResult};

/// An executor that handles tool call requests from the model.
pub struct Executor {
    registry: Arc<Registry>,
}

impl Executor {
    #[inline]
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Runs all requests concurrently and returns one result per request,
    /// in request order.
    ///
    /// Every failure (unknown tool, bad arguments, failing or panicking
    /// execution) is turned into an error result, this method never fails.
    pub async fn dispatch(
        &self,
        requests: &[ToolCallRequest],
        iteration: usize,
        observer: &Arc<dyn Observer>,
    ) -> Vec<ToolCallResult> {
        // Fan out: every request gets its own task.
        let mut handles = Vec::with_capacity(requests.len());
        for (idx, req) in requests.iter().enumerate() {
            let fut = match self.registry.get(&req.name) {
                Some(tool) => {
                    trace!(
                        "spawning a tool ({}) with args: {}",
                        req.id,
                        req.arguments
                    );
                    Some(Arc::clone(tool).execute(&req.arguments))
                }
                None => {
                    warn!("tool not found: {}", req.name);
                    None
                }
            };

            let observer = Arc::clone(observer);
            let req = req.clone();
            let span = debug_span!("tool call", id = %req.id, name = %req.name);
            let handle = tokio::spawn(
                async move {
                    notify("on_tool_start", || {
                        observer.on_tool_start(&ToolStarted {
                            iteration,
                            id: &req.id,
                            name: &req.name,
                            arguments: &req.arguments,
                        })
                    });
                    let result: ToolResult = match fut {
                        Some(fut) => fut.await,
                        None => Err(Error::not_found()),
                    };
                    let result = into_call_result(&req, result);
                    notify("on_tool_end", || {
                        observer.on_tool_end(&ToolFinished {
                            iteration,
                            id: &req.id,
                            name: &req.name,
                            output: &result.content,
                            is_error: result.is_error,
                        })
                    });
                    result
                }
                .instrument(span),
            );
            handles.push((idx, handle));
        }

        // Fan in: results are written back by request index, whatever order
        // the tasks complete in.
        let mut slots: Vec<Option<ToolCallResult>> =
            vec![None; requests.len()];
        for (idx, handle) in handles {
            let req = &requests[idx];
            let result = match handle.await {
                Ok(result) => result,
                Err(err) => {
                    error!("tool task ({}) failed: {err}", req.id);
                    let err = Error::execution_error()
                        .with_reason(format!("tool task failed: {err}"));
                    ToolCallResult::failure(
                        &req.id,
                        err.to_tool_output(&req.name),
                    )
                }
            };
            slots[idx] = Some(result);
        }
        slots.into_iter().flatten().collect()
    }
}

fn into_call_result(
    req: &ToolCallRequest,
    result: ToolResult,
) -> ToolCallResult {
    match result {
        Ok(output) => ToolCallResult::success(&req.id, output),
        Err(err) => {
            debug!("tool ({}) failed: {err}", req.id);
            ToolCallResult::failure(&req.id, err.to_tool_output(&req.name))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde::Deserialize;
    use serde_json::Value;

    use super::*;
    use crate::observer::NoopObserver;
    use crate::tool::Tool;

    static SCHEMA: &Value = &Value::Null;

    #[derive(Deserialize)]
    struct DelayInput {
        #[serde(default)]
        delay_ms: u64,
    }

    struct DelayTool;

    impl Tool for DelayTool {
        type Input = DelayInput;

        fn name(&self) -> &str {
            "delay"
        }

        fn description(&self) -> &str {
            "Waits, then reports how long it waited"
        }

        fn parameter_schema(&self) -> &Value {
            SCHEMA
        }

        #[allow(clippy::manual_async_fn)]
        fn execute(
            &self,
            input: Self::Input,
        ) -> impl Future<Output = ToolResult> + Send + 'static {
            async move {
                tokio::time::sleep(Duration::from_millis(input.delay_ms)).await;
                Ok(format!("waited {}ms", input.delay_ms))
            }
        }
    }

    fn executor() -> Executor {
        let mut registry = Registry::default();
        registry.add_tool(DelayTool);
        Executor::new(Arc::new(registry))
    }

    fn request(id: &str, name: &str, arguments: &str) -> ToolCallRequest {
        ToolCallRequest {
            id: id.to_owned(),
            name: name.to_owned(),
            arguments: arguments.to_owned(),
        }
    }

    #[tokio::test]
    async fn test_dispatch_nothing() {
        let observer: Arc<dyn Observer> = Arc::new(NoopObserver);
        assert!(executor().dispatch(&[], 1, &observer).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_keeps_request_order() {
        let observer: Arc<dyn Observer> = Arc::new(NoopObserver);
        let requests = [
            request("a", "delay", r#"{"delay_ms": 300}"#),
            request("b", "delay", r#"{"delay_ms": 100}"#),
            request("c", "nope", "{}"),
            request("d", "delay", r#"{"delay_ms": 200}"#),
        ];

        let started = tokio::time::Instant::now();
        let results = executor().dispatch(&requests, 1, &observer).await;

        // Calls overlap: the round takes as long as the slowest call.
        assert!(started.elapsed() < Duration::from_millis(400));
        assert_eq!(
            results,
            [
                ToolCallResult::success("a", "waited 300ms"),
                ToolCallResult::success("b", "waited 100ms"),
                ToolCallResult::failure("c", "Error: Tool nope not found"),
                ToolCallResult::success("d", "waited 200ms"),
            ]
        );
    }

    #[tokio::test]
    async fn test_dispatch_blank_arguments() {
        let observer: Arc<dyn Observer> = Arc::new(NoopObserver);
        let requests = [request("a", "delay", ""), request("b", "delay", "  ")];
        let results = executor().dispatch(&requests, 1, &observer).await;
        assert_eq!(
            results,
            [
                ToolCallResult::success("a", "waited 0ms"),
                ToolCallResult::success("b", "waited 0ms"),
            ]
        );
    }
}
