//! Tool call supports.

mod error;
mod executor;
mod object;
mod registry;

use serde::de::DeserializeOwned;
use serde_json::Value;

pub use error::{Error, ErrorKind};
pub(crate) use executor::Executor;
pub use registry::Registry;

/// The result of a tool call.
pub type ToolResult = Result<String, Error>;

/// A tool that can be called by the model.
///
/// Arguments sent by the model are decoded into [`Tool::Input`] first, so
/// the input type itself acts as the schema: a payload that fails to
/// decode never reaches [`Tool::execute`]. Checks that can't be expressed
/// by the type go to [`Tool::validate`].
///
/// The tool may own shared state (a data store, a client, etc.). Since the
/// same tool can be executed concurrently, keeping that state consistent is
/// the tool's responsibility.
pub trait Tool: Send + Sync + 'static {
    /// The type of input that the tool accepts.
    type Input: DeserializeOwned + Send;

    /// Returns the name of the tool.
    fn name(&self) -> &str;

    /// Returns the description of the tool.
    fn description(&self) -> &str;

    /// Returns the parameter schema of the tool.
    ///
    /// The schema is forwarded to the model as is.
    fn parameter_schema(&self) -> &Value;

    /// Validates the decoded input before execution.
    ///
    /// Returning an error here produces an `InvalidInput` result without
    /// calling [`Tool::execute`].
    #[inline]
    fn validate(&self, input: &Self::Input) -> Result<(), Error> {
        let _ = input;
        Ok(())
    }

    /// Executes the tool with the given input.
    ///
    /// This method must return a future that is fully independent of `self`.
    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static;
}
