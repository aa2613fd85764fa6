use std::error::Error as StdError;
use std::fmt::{self, Debug, Display};

use loop_agent_model::{ErrorKind, ModelProviderError};

/// The error returned by [`Agent::run`](crate::Agent::run).
///
/// Only model call failures end a run with an error. Tool failures are
/// reported to the model as tool results instead.
pub struct Error {
    iteration: usize,
    source: Box<dyn ModelProviderError>,
}

impl Error {
    #[inline]
    pub(crate) fn model(
        iteration: usize,
        source: Box<dyn ModelProviderError>,
    ) -> Self {
        Self { iteration, source }
    }

    /// Returns the kind of the underlying model provider error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }

    /// Returns the 1-based round in which the model call failed.
    #[inline]
    pub fn iteration(&self) -> usize {
        self.iteration
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Error")
            .field("iteration", &self.iteration)
            .field("kind", &self.kind())
            .field("source", &self.source)
            .finish()
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "model call failed in round {}: {}",
            self.iteration, self.source
        )
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.source.as_ref())
    }
}
