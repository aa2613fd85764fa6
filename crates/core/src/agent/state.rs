use loop_agent_model::{AssistantMessage, ToolCallRequest, ToolCallResult};

use crate::transcript::Transcript;

/// The text returned when the iteration budget runs out.
pub const MAX_ITERATIONS_FALLBACK: &str =
    "Agent reached maximum iterations without completing the task.";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunStage {
    #[default]
    Running,
    AwaitingToolResults,
    Done,
    Exhausted,
}

/// What the loop should do with the message it just recorded.
pub enum Next {
    DispatchTools(Vec<ToolCallRequest>),
    Finish,
    Continue,
}

/// The mutable state of one run.
pub struct RunState {
    transcript: Transcript,
    iteration: usize,
    stage: RunStage,
}

impl RunState {
    pub fn new(system_prompt: &str, input: String) -> Self {
        Self {
            transcript: Transcript::new(system_prompt, input),
            iteration: 0,
            stage: RunStage::Running,
        }
    }

    #[inline]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    #[inline]
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    #[cfg(test)]
    #[inline]
    pub fn stage(&self) -> RunStage {
        self.stage
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.stage == RunStage::Done
    }

    #[inline]
    pub fn should_continue(&self, max_iterations: usize) -> bool {
        self.stage == RunStage::Running && self.iteration < max_iterations
    }

    /// Appends the model's turn and moves to the stage it implies.
    ///
    /// Tool calls take precedence over text. A turn with neither keeps the
    /// run going, it only burns an iteration.
    pub fn record_assistant(&mut self, message: AssistantMessage) -> Next {
        debug_assert_eq!(self.stage, RunStage::Running);
        let next = if message.has_tool_calls() {
            self.stage = RunStage::AwaitingToolResults;
            Next::DispatchTools(message.tool_calls.clone())
        } else if message.has_text() {
            self.stage = RunStage::Done;
            Next::Finish
        } else {
            debug!("model returned an empty turn");
            Next::Continue
        };
        self.transcript.push_assistant(message);
        next
    }

    pub fn record_tool_results(&mut self, results: Vec<ToolCallResult>) {
        debug_assert_eq!(self.stage, RunStage::AwaitingToolResults);
        self.transcript.push_tool_results(results);
        self.stage = RunStage::Running;
    }

    pub fn end_round(&mut self, max_iterations: usize) {
        self.iteration += 1;
        if self.stage == RunStage::Running
            && self.iteration >= max_iterations
        {
            self.stage = RunStage::Exhausted;
        }
    }

    /// Consumes the state and produces the answer of the run.
    pub fn into_outcome(self) -> RunOutcome {
        let answer = match self.stage {
            RunStage::Done => self
                .transcript
                .last_assistant()
                .filter(|msg| msg.has_text())
                .map(|msg| msg.content.clone()),
            _ => None,
        };
        let exhausted = answer.is_none();
        RunOutcome {
            output: answer
                .unwrap_or_else(|| MAX_ITERATIONS_FALLBACK.to_owned()),
            iterations: self.iteration,
            exhausted,
            transcript: self.transcript,
        }
    }
}

/// The answer of a run, with data about how it was reached.
#[derive(Clone, Debug)]
pub struct RunOutcome {
    output: String,
    iterations: usize,
    exhausted: bool,
    transcript: Transcript,
}

impl RunOutcome {
    /// Returns the answer text.
    #[inline]
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Returns the number of rounds the run used.
    #[inline]
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Returns `true` if the run ran out of iterations, in which case the
    /// output is the fallback text.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Returns the full transcript of the run.
    #[inline]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }
}
