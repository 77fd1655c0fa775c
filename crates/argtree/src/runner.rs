use std::fmt;
use std::sync::Arc;

use crate::command::Command;

/// A command on the matched path together with its positional arguments.
///
/// Returned by [`RunMode::Runner`](crate::RunMode::Runner) so the caller can
/// inspect, reorder or invoke the matched commands itself.
pub struct Runner<U, T> {
    command: Arc<Command<U, T>>,
    args: Vec<String>,
    result: Option<T>,
}

impl<U, T> Runner<U, T> {
    pub(crate) fn new(command: Arc<Command<U, T>>) -> Self {
        Self {
            command,
            args: Vec::new(),
            result: None,
        }
    }

    pub fn command(&self) -> &Arc<Command<U, T>> {
        &self.command
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub(crate) fn push_arg(&mut self, arg: &str) {
        self.args.push(arg.to_string());
    }

    /// Result of the last [`run`](Self::run), `None` before that or when the
    /// command has no executable.
    pub fn result(&self) -> Option<&T> {
        self.result.as_ref()
    }

    pub fn take_result(&mut self) -> Option<T> {
        self.result.take()
    }

    /// Execute the command with its own arguments and store the result.
    pub async fn run(&mut self, userdata: &mut U) -> anyhow::Result<()> {
        self.result = self.command.execute(&self.args, userdata).await?;
        Ok(())
    }
}

impl<U, T: fmt::Debug> fmt::Debug for Runner<U, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("command", &self.command.dotted_path())
            .field("args", &self.args)
            .field("result", &self.result)
            .finish()
    }
}
