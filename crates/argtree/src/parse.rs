//! The parsing/execution engine.
//!
//! A parse walks the argument vector once, left to right. Flags are resolved
//! against the registry of the command that is current at that point, bare
//! words may descend into a child command while the current scope has no
//! positional arguments yet, and everything else is collected as a positional
//! argument of the current command. Once the input is exhausted the matched
//! path is dispatched according to [`RunMode`].

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::command::Command;
use crate::error::{Error, UsageError, UsageErrorKind, ValueError};
use crate::flag::{self, BoolFlag, Flag};
use crate::runner::Runner;
use crate::suggest::DEFAULT_DISTANCE;

/// Which commands on the matched path are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Every command from the root to the leaf, in that order.
    All,
    /// Only the innermost matched command.
    #[default]
    Last,
    /// Nothing; the matched path is handed back as [`Runner`]s.
    Runner,
}

#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub mode: RunMode,
    /// Treat unknown flags as positional arguments instead of failing.
    pub allow_unknown_flag: bool,
    /// Treat unknown subcommand names as positional arguments instead of failing.
    pub allow_unknown_command: bool,
    /// Edit distance for "did you mean" suggestions; zero disables them.
    pub suggest_distance: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            mode: RunMode::default(),
            allow_unknown_flag: false,
            allow_unknown_command: false,
            suggest_distance: DEFAULT_DISTANCE,
        }
    }
}

/// Result of a successful parse.
pub enum Outcome<U, T> {
    /// `-h`/`--help` was given; holds the help text of the command that was
    /// current at that point. Nothing was executed.
    Help(String),
    /// One entry per executed command, `None` for commands without an executable.
    Values(Vec<Option<T>>),
    /// The matched path, root first, not yet executed.
    Runners(Vec<Runner<U, T>>),
}

impl<U, T> Outcome<U, T> {
    pub fn is_help(&self) -> bool {
        matches!(self, Self::Help(_))
    }

    pub fn into_values(self) -> Option<Vec<Option<T>>> {
        match self {
            Self::Values(values) => Some(values),
            _ => None,
        }
    }

    pub fn into_runners(self) -> Option<Vec<Runner<U, T>>> {
        match self {
            Self::Runners(runners) => Some(runners),
            _ => None,
        }
    }
}

impl<U, T: fmt::Debug> fmt::Debug for Outcome<U, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Help(text) => f.debug_tuple("Help").field(text).finish(),
            Self::Values(values) => f.debug_tuple("Values").field(values).finish(),
            Self::Runners(runners) => f.debug_tuple("Runners").field(runners).finish(),
        }
    }
}

/// Parse `argv` against the tree rooted at `root` and dispatch the result.
///
/// `userdata` is handed to every executable that runs. Executable failures
/// are returned as [`Error::Run`] without modification.
pub async fn parse<U, T, S>(
    root: &Arc<Command<U, T>>,
    argv: &[S],
    userdata: &mut U,
    options: &ParseOptions,
) -> Result<Outcome<U, T>, Error>
where
    S: AsRef<str>,
{
    debug!(
        command = %root.dotted_path(),
        tokens = argv.len(),
        mode = ?options.mode,
        "parsing arguments"
    );

    root.flags().reset();
    let mut session = Session::new(root.clone(), options);

    for token in argv {
        if session.help_requested() {
            return Ok(Outcome::Help(session.leaf.command().help()));
        }
        session.step(token.as_ref()).await?;
    }

    session.finish(userdata).await
}

/// A flag resolved from a token: declared by a command, or the implicit help.
enum Target {
    Declared(Arc<dyn Flag>),
    Help,
}

struct Pending {
    target: Target,
    token: String,
}

struct Session<'o, U, T> {
    options: &'o ParseOptions,
    help: BoolFlag,
    ancestors: Vec<Runner<U, T>>,
    leaf: Runner<U, T>,
    pending: Option<Pending>,
}

impl<'o, U, T> Session<'o, U, T> {
    fn new(root: Arc<Command<U, T>>, options: &'o ParseOptions) -> Self {
        Self {
            options,
            help: BoolFlag::new("help").short('h'),
            ancestors: Vec::new(),
            leaf: Runner::new(root),
            pending: None,
        }
    }

    fn help_requested(&self) -> bool {
        self.help.value().unwrap_or(false)
    }

    fn lookup_long(&self, command: &Command<U, T>, name: &str) -> Option<Target> {
        match command.flags().find(name) {
            Some(flag) => Some(Target::Declared(flag.clone())),
            None if name == "help" => Some(Target::Help),
            None => None,
        }
    }

    fn lookup_short(&self, command: &Command<U, T>, short: char) -> Option<Target> {
        match command.flags().find_short(short) {
            Some(flag) => Some(Target::Declared(flag.clone())),
            None if short == 'h' => Some(Target::Help),
            None => None,
        }
    }

    fn is_boolean(&self, target: &Target) -> bool {
        match target {
            Target::Declared(flag) => flag.is_boolean(),
            Target::Help => true,
        }
    }

    fn usage_error(&self, command: &Command<U, T>, kind: UsageErrorKind) -> UsageError {
        UsageError::new(kind, command.usage_block())
    }

    /// Feed `text` to `target` as one occurrence of the flag.
    async fn apply(
        &self,
        command: &Command<U, T>,
        target: &Target,
        text: &str,
    ) -> Result<(), Error> {
        let (result, name) = match target {
            Target::Declared(flag) => (flag.parse(text).await, flag::display_name(flag.as_ref())),
            Target::Help => (self.help.parse(text).await, flag::display_name(&self.help)),
        };

        result.map_err(|source| {
            let suggestion = match (&source, target) {
                (ValueError::NotAllowed { .. }, Target::Declared(flag)) => {
                    flag.guess_closest(text, self.options.suggest_distance)
                }
                _ => None,
            };
            let kind = UsageErrorKind::InvalidValue {
                flag: name,
                value: text.to_string(),
                source,
            };
            self.usage_error(command, kind)
                .with_suggestion(suggestion)
                .into()
        })
    }

    async fn step(&mut self, token: &str) -> Result<(), Error> {
        let command = self.leaf.command().clone();

        if let Some(pending) = self.pending.take() {
            trace!(token, flag = %pending.token, "flag value");
            return self.apply(&command, &pending.target, token).await;
        }

        if token == "-" {
            self.leaf.push_arg(token);
            return Ok(());
        }

        if let Some(body) = token.strip_prefix("--") {
            if !self.long_flag(&command, token, body).await? {
                self.leaf.push_arg(token);
            }
            return Ok(());
        }

        if let Some(body) = token.strip_prefix('-') {
            if !self.shorthand(&command, token, body).await? {
                self.leaf.push_arg(token);
            }
            return Ok(());
        }

        self.word(&command, token)
    }

    /// `--name`, `--name=value` or `--name value`.
    ///
    /// Returns `false` when the flag is unknown and unknown flags are allowed.
    async fn long_flag(
        &mut self,
        command: &Command<U, T>,
        token: &str,
        body: &str,
    ) -> Result<bool, Error> {
        let (name, value) = match body.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (body, None),
        };

        let Some(target) = self.lookup_long(command, name) else {
            if self.options.allow_unknown_flag {
                trace!(token, "unknown flag kept as argument");
                return Ok(false);
            }
            let suggestion = command
                .flags()
                .guess(name, self.options.suggest_distance)
                .map(|name| format!("--{name}"));
            let err = self
                .usage_error(command, UsageErrorKind::UnknownFlag(format!("--{name}")))
                .with_suggestion(suggestion);
            return Err(err.into());
        };

        trace!(token, "long flag");
        match value {
            Some(value) => self.apply(command, &target, value).await?,
            None if self.is_boolean(&target) => self.apply(command, &target, "1").await?,
            None => {
                self.pending = Some(Pending {
                    target,
                    token: token.to_string(),
                })
            }
        }
        Ok(true)
    }

    /// `-x`, `-xVALUE`, `-x=VALUE`, `-xyz` and `-xyzVALUE`.
    ///
    /// Returns `false` when the first shorthand is unknown and unknown flags
    /// are allowed.
    async fn shorthand(
        &mut self,
        command: &Command<U, T>,
        token: &str,
        body: &str,
    ) -> Result<bool, Error> {
        let mut chars = body.chars();
        let Some(first) = chars.next() else {
            return Ok(false);
        };

        let Some(mut target) = self.lookup_short(command, first) else {
            if self.options.allow_unknown_flag {
                trace!(token, "unknown shorthand kept as argument");
                return Ok(false);
            }
            let kind = UsageErrorKind::UnknownShorthand {
                short: first,
                token: token.to_string(),
            };
            return Err(self.usage_error(command, kind).into());
        };

        trace!(token, "shorthand flags");
        let mut rest = chars.as_str();
        loop {
            if rest.is_empty() {
                if self.is_boolean(&target) {
                    self.apply(command, &target, "1").await?;
                } else {
                    self.pending = Some(Pending {
                        target,
                        token: token.to_string(),
                    });
                }
                break;
            }

            if let Some(value) = rest.strip_prefix('=') {
                self.apply(command, &target, value).await?;
                break;
            }

            if !self.is_boolean(&target) {
                self.apply(command, &target, rest).await?;
                break;
            }

            self.apply(command, &target, "1").await?;
            if matches!(target, Target::Help) {
                break;
            }

            let mut chars = rest.chars();
            let Some(next) = chars.next() else {
                break;
            };
            rest = chars.as_str();
            target = match self.lookup_short(command, next) {
                Some(target) => target,
                None => {
                    let kind = UsageErrorKind::UnknownShorthand {
                        short: next,
                        token: token.to_string(),
                    };
                    return Err(self.usage_error(command, kind).into());
                }
            };
        }

        Ok(true)
    }

    /// A bare word: subcommand name while the scope is fresh, else positional.
    fn word(&mut self, command: &Command<U, T>, token: &str) -> Result<(), Error> {
        if self.leaf.args().is_empty() && command.has_children() {
            if let Some(child) = command.child(token) {
                debug!(command = %child.dotted_path(), "entering subcommand");
                child.flags().reset();
                let parent = std::mem::replace(&mut self.leaf, Runner::new(child));
                self.ancestors.push(parent);
                return Ok(());
            }

            if !self.options.allow_unknown_command {
                let suggestion = command.guess(token, self.options.suggest_distance);
                let kind = UsageErrorKind::UnknownCommand {
                    name: token.to_string(),
                    command: command.dotted_path(),
                };
                return Err(self
                    .usage_error(command, kind)
                    .with_suggestion(suggestion)
                    .into());
            }
        }

        trace!(token, "positional argument");
        self.leaf.push_arg(token);
        Ok(())
    }

    async fn finish(self, userdata: &mut U) -> Result<Outcome<U, T>, Error> {
        if self.help_requested() {
            return Ok(Outcome::Help(self.leaf.command().help()));
        }

        let Session {
            options,
            mut ancestors,
            mut leaf,
            pending,
            ..
        } = self;

        if let Some(pending) = pending {
            let err = UsageError::new(
                UsageErrorKind::MissingValue(pending.token),
                leaf.command().usage_block(),
            );
            return Err(err.into());
        }

        match options.mode {
            RunMode::Runner => {
                ancestors.push(leaf);
                Ok(Outcome::Runners(ancestors))
            }
            RunMode::All => {
                ancestors.push(leaf);
                let mut values = Vec::with_capacity(ancestors.len());
                for runner in &mut ancestors {
                    debug!(command = %runner.command().dotted_path(), "running command");
                    runner.run(userdata).await.map_err(Error::Run)?;
                    values.push(runner.take_result());
                }
                Ok(Outcome::Values(values))
            }
            RunMode::Last => {
                debug!(command = %leaf.command().dotted_path(), "running command");
                leaf.run(userdata).await.map_err(Error::Run)?;
                Ok(Outcome::Values(vec![leaf.take_result()]))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flag::{BoolFlag, StringFlag};

    type Cmd = Command<(), String>;

    fn app() -> (Arc<Cmd>, Arc<BoolFlag>, Arc<StringFlag>) {
        let slot = Arc::new(parking_lot::Mutex::new(None));
        let handles = slot.clone();
        let root = Cmd::builder("app")
            .run(|args, _, _| Box::pin(async move { Ok(args.join(",")) }))
            .prepare(move |flags| {
                let verbose = flags.add(BoolFlag::new("verbose").short('v'))?;
                let output = flags.add(StringFlag::new("output").short('o'))?;
                *handles.lock() = Some((verbose, output));
                Ok(None)
            })
            .build()
            .unwrap();
        let (verbose, output) = slot.lock().take().unwrap();
        (root, verbose, output)
    }

    #[tokio::test]
    async fn positional_arguments_reach_the_executable() {
        let (root, _, _) = app();
        let out = parse(&root, &["a", "-", "b"], &mut (), &ParseOptions::default())
            .await
            .unwrap();
        assert_eq!(out.into_values(), Some(vec![Some("a,-,b".to_string())]));
    }

    #[tokio::test]
    async fn help_in_chain_stops_the_chain() {
        let (root, verbose, _) = app();
        let out = parse(&root, &["-vhx"], &mut (), &ParseOptions::default())
            .await
            .unwrap();
        assert!(out.is_help());
        assert_eq!(verbose.value(), Some(true));
    }

    #[tokio::test]
    async fn pending_value_swallows_flag_like_token() {
        let (root, verbose, output) = app();
        parse(&root, &["-o", "-v"], &mut (), &ParseOptions::default())
            .await
            .unwrap();
        assert_eq!(output.value().as_deref(), Some("-v"));
        assert_eq!(verbose.value(), None);
    }

    #[tokio::test]
    async fn unknown_shorthand_names_character_and_token() {
        let (root, _, _) = app();
        let err = parse(&root, &["-vq"], &mut (), &ParseOptions::default())
            .await
            .unwrap_err();
        let usage = err.as_usage().expect("usage error");
        assert!(matches!(
            usage.kind(),
            UsageErrorKind::UnknownShorthand { short: 'q', token } if token == "-vq"
        ));
        assert!(usage.suggestion().is_none());
    }
}
