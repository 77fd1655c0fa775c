//! JSON report printed by `argtree run`.

use std::collections::BTreeMap;

use argtree::{Command, Outcome, RunFn, run_fn};
use argtree_manifest::CommandSpec;
use serde::Serialize;

/// What one matched command saw: its path, positional arguments and the
/// value of every flag it declares (`null` when unset without a default).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandReport {
    pub path: String,
    pub args: Vec<String>,
    pub flags: BTreeMap<String, Option<String>>,
}

impl CommandReport {
    pub fn capture<U, T>(command: &Command<U, T>, args: &[String]) -> Self {
        let flags = command
            .flags()
            .iter()
            .map(|flag| (flag.name().to_string(), flag.value_as_string()))
            .collect();
        Self {
            path: command.dotted_path(),
            args: args.to_vec(),
            flags,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum RunReport {
    Help { text: String },
    Values { commands: Vec<CommandReport> },
    Runners { commands: Vec<CommandReport> },
}

impl From<Outcome<(), CommandReport>> for RunReport {
    fn from(outcome: Outcome<(), CommandReport>) -> Self {
        match outcome {
            Outcome::Help(text) => Self::Help { text },
            Outcome::Values(values) => Self::Values {
                commands: values.into_iter().flatten().collect(),
            },
            Outcome::Runners(runners) => Self::Runners {
                commands: runners
                    .iter()
                    .map(|runner| CommandReport::capture(runner.command(), runner.args()))
                    .collect(),
            },
        }
    }
}

/// Executable bound to every manifest command: snapshot instead of acting.
pub fn snapshot(_: &CommandSpec) -> Option<RunFn<(), CommandReport>> {
    Some(run_fn::<(), CommandReport, _>(|args, _, cmd| {
        Box::pin(async move { Ok(CommandReport::capture(cmd, args)) })
    }))
}
