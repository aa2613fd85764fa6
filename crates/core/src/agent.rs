mod builder;
mod state;

use std::sync::Arc;

use loop_agent_model::ModelRequest;
use tracing::Instrument;

use crate::error::Error;
use crate::model_client::ModelClient;
use crate::observer::{
    Observer, RoundFinished, RoundStarted, RunFinished, notify,
};
use crate::tool::{Executor as ToolExecutor, Registry};
pub use builder::{AgentBuilder, DEFAULT_MAX_ITERATIONS, DEFAULT_SYSTEM_PROMPT};
use state::{Next, RunState};
pub use state::{MAX_ITERATIONS_FALLBACK, RunOutcome};

/// An agent that answers a request by alternating model calls and tool
/// calls, until the model gives a text answer or the iteration budget runs
/// out.
///
/// The agent itself holds no per-run state: every [`Agent::run`] call owns
/// its transcript, so one agent can serve several runs at the same time.
/// The tool registry is shared by all of them.
pub struct Agent {
    model_client: ModelClient,
    model: Option<String>,
    system_prompt: String,
    max_iterations: usize,
    tool_executor: ToolExecutor,
    observer: Arc<dyn Observer>,
}

impl Agent {
    fn from_builder(builder: AgentBuilder) -> Self {
        let AgentBuilder {
            model_client,
            model,
            system_prompt,
            max_iterations,
            tools,
            observer,
        } = builder;

        Self {
            model_client,
            model,
            system_prompt,
            max_iterations,
            tool_executor: ToolExecutor::new(Arc::new(tools)),
            observer,
        }
    }

    /// Returns the tools available to the model.
    #[inline]
    pub fn tools(&self) -> &Registry {
        self.tool_executor.registry()
    }

    /// Returns the maximum number of rounds in one run.
    #[inline]
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Runs the loop for one user request.
    ///
    /// Tool failures never end the run, they are reported to the model as
    /// tool results. The only error is a failing model call.
    pub async fn run<S: Into<String>>(
        &self,
        input: S,
    ) -> Result<RunOutcome, Error> {
        let span =
            info_span!("agent run", max_iterations = self.max_iterations);
        self.run_loop(input.into()).instrument(span).await
    }

    async fn run_loop(&self, input: String) -> Result<RunOutcome, Error> {
        let mut state = RunState::new(&self.system_prompt, input);
        let declarations = self.tools().definitions();

        while state.should_continue(self.max_iterations) {
            let iteration = state.iteration() + 1;
            let round_span = debug_span!("round", iteration);

            notify("on_round_start", || {
                self.observer.on_round_start(&RoundStarted {
                    iteration,
                    messages: state.transcript().messages(),
                })
            });

            let request = ModelRequest {
                model: self.model.clone(),
                messages: state.transcript().messages().to_vec(),
                tools: declarations.clone(),
            };
            let response = match self
                .model_client
                .send_request(request)
                .instrument(round_span.clone())
                .await
            {
                Ok(response) => response,
                Err(err) => {
                    error!("model call failed in round {iteration}: {err}");
                    return Err(Error::model(iteration, err));
                }
            };

            match response.finish_reason {
                Some(reason) => {
                    trace!("round {iteration} finished with {reason:?}")
                }
                None => {
                    warn!("model response in round {iteration} was cut off")
                }
            }

            match state.record_assistant(response.message) {
                Next::DispatchTools(requests) => {
                    debug!(
                        "round {iteration} requested {} tool(s)",
                        requests.len()
                    );
                    let results = self
                        .tool_executor
                        .dispatch(&requests, iteration, &self.observer)
                        .instrument(round_span)
                        .await;
                    state.record_tool_results(results);
                }
                Next::Finish => debug!("round {iteration} produced an answer"),
                Next::Continue => {}
            }
            state.end_round(self.max_iterations);

            if let Some(message) = state.transcript().last_assistant() {
                notify("on_round_end", || {
                    self.observer.on_round_end(&RoundFinished {
                        iteration,
                        message,
                        done: state.is_done(),
                    })
                });
            }
        }

        let outcome = state.into_outcome();
        if outcome.is_exhausted() {
            warn!("no answer after {} rounds", outcome.iterations());
        }
        notify("on_run_end", || {
            self.observer.on_run_end(&RunFinished {
                output: outcome.output(),
                iterations: outcome.iterations(),
                exhausted: outcome.is_exhausted(),
            })
        });
        Ok(outcome)
    }
}
