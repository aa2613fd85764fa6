//! Extension points for tracing and metrics sinks.
//!
//! An [`Observer`] is notified at well-defined points of a run: round
//! start/end, tool start/end and run end. Notifications are fire-and-forget,
//! nothing an observer does can change how the run proceeds, and a run with
//! [`NoopObserver`] behaves exactly like a run with any other observer.
//!
//! Tool notifications are delivered from the tasks executing the tools, so
//! they may interleave when a round runs several tools. A panicking hook is
//! logged and otherwise ignored.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use loop_agent_model::{AssistantMessage, ModelMessage};

/// A round is about to call the model.
#[derive(Debug)]
pub struct RoundStarted<'a> {
    /// 1-based round number.
    pub iteration: usize,
    /// The transcript sent to the model.
    pub messages: &'a [ModelMessage],
}

/// A round has finished, including its tool calls.
#[derive(Debug)]
pub struct RoundFinished<'a> {
    /// 1-based round number.
    pub iteration: usize,
    /// The message returned by the model.
    pub message: &'a AssistantMessage,
    /// Whether this round produced the final answer.
    pub done: bool,
}

/// A tool call is about to run.
#[derive(Debug)]
pub struct ToolStarted<'a> {
    /// 1-based round number.
    pub iteration: usize,
    /// The tool call request id.
    pub id: &'a str,
    /// The requested tool name.
    pub name: &'a str,
    /// Raw arguments from the model.
    pub arguments: &'a str,
}

/// A tool call has produced its result.
#[derive(Debug)]
pub struct ToolFinished<'a> {
    /// 1-based round number.
    pub iteration: usize,
    /// The tool call request id.
    pub id: &'a str,
    /// The requested tool name.
    pub name: &'a str,
    /// The text appended to the transcript.
    pub output: &'a str,
    /// Whether `output` describes a failure.
    pub is_error: bool,
}

/// A run has returned its answer.
#[derive(Debug)]
pub struct RunFinished<'a> {
    /// The returned text.
    pub output: &'a str,
    /// Rounds used.
    pub iterations: usize,
    /// Whether the iteration budget ran out.
    pub exhausted: bool,
}

/// A sink of run events.
///
/// All methods have empty default implementations.
pub trait Observer: Send + Sync + 'static {
    /// Called before the model is called in a round.
    fn on_round_start(&self, event: &RoundStarted<'_>) {
        let _ = event;
    }

    /// Called when a round has finished.
    fn on_round_end(&self, event: &RoundFinished<'_>) {
        let _ = event;
    }

    /// Called before a tool call runs.
    fn on_tool_start(&self, event: &ToolStarted<'_>) {
        let _ = event;
    }

    /// Called when a tool call has produced its result.
    fn on_tool_end(&self, event: &ToolFinished<'_>) {
        let _ = event;
    }

    /// Called when a run returns an answer.
    fn on_run_end(&self, event: &RunFinished<'_>) {
        let _ = event;
    }
}

/// Calls an observer hook, catching any panic it raises.
pub(crate) fn notify<F: FnOnce()>(hook: &'static str, f: F) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
        error!("observer panicked in {hook}: {}", panic_message(&*payload));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        *msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown panic"
    }
}

/// An observer that does nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {}

/// An observer that emits structured [`tracing`] events.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn on_round_start(&self, event: &RoundStarted<'_>) {
        info!(
            iteration = event.iteration,
            messages = event.messages.len(),
            "round started"
        );
    }

    fn on_round_end(&self, event: &RoundFinished<'_>) {
        info!(
            iteration = event.iteration,
            tool_calls = event.message.tool_calls.len(),
            done = event.done,
            "round finished"
        );
    }

    fn on_tool_start(&self, event: &ToolStarted<'_>) {
        info!(
            iteration = event.iteration,
            tool_call_id = event.id,
            tool_name = event.name,
            input = event.arguments,
            "tool started"
        );
    }

    fn on_tool_end(&self, event: &ToolFinished<'_>) {
        if event.is_error {
            warn!(
                iteration = event.iteration,
                tool_call_id = event.id,
                tool_name = event.name,
                error = event.output,
                "tool failed"
            );
        } else {
            info!(
                iteration = event.iteration,
                tool_call_id = event.id,
                tool_name = event.name,
                output = event.output,
                "tool finished"
            );
        }
    }

    fn on_run_end(&self, event: &RunFinished<'_>) {
        info!(
            total_iterations = event.iterations,
            max_iterations_reached = event.exhausted,
            output = event.output,
            "run finished"
        );
    }
}
