//! The command tree.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use futures_util::future::BoxFuture;
use parking_lot::RwLock;

use crate::error::BuildError;
use crate::help;
use crate::registry::FlagRegistry;
use crate::suggest;

/// The executable bound to a command.
///
/// Receives the positional arguments collected for the command, the
/// caller's userdata and the command itself.
pub type RunFn<U, T> = Arc<
    dyn for<'a> Fn(&'a [String], &'a mut U, &'a Command<U, T>) -> BoxFuture<'a, anyhow::Result<T>>
        + Send
        + Sync,
>;

type PrepareFn<U, T> =
    Box<dyn FnOnce(&mut FlagRegistry) -> Result<Option<RunFn<U, T>>, BuildError>>;

/// Wrap a closure as a [`RunFn`].
///
/// ```rust,ignore
/// let run = run_fn(|args, _data, cmd| Box::pin(async move {
///     Ok(format!("{} {:?}", cmd.name(), args))
/// }));
/// ```
pub fn run_fn<U, T, F>(f: F) -> RunFn<U, T>
where
    F: for<'a> Fn(&'a [String], &'a mut U, &'a Command<U, T>) -> BoxFuture<'a, anyhow::Result<T>>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

/// One node of the subcommand tree.
///
/// `U` is the userdata type forwarded to every executable, `T` is what the
/// executables return.
pub struct Command<U = (), T = ()> {
    name: String,
    usage: String,
    usage_long: String,
    parent: OnceLock<Weak<Command<U, T>>>,
    children: RwLock<BTreeMap<String, Arc<Command<U, T>>>>,
    flags: FlagRegistry,
    run: Option<RunFn<U, T>>,
}

/// Construction options for a [`Command`].
pub struct CommandBuilder<U, T> {
    name: String,
    usage: String,
    usage_long: String,
    run: Option<RunFn<U, T>>,
    prepare: Option<PrepareFn<U, T>>,
}

impl<U, T> CommandBuilder<U, T> {
    /// One-line summary; whitespace is collapsed.
    pub fn usage(mut self, usage: &str) -> Self {
        self.usage = usage.split_whitespace().collect::<Vec<_>>().join(" ");
        self
    }

    /// Preamble of the full help text. Falls back to `usage` when empty.
    pub fn usage_long(mut self, usage_long: &str) -> Self {
        self.usage_long = usage_long.trim().to_string();
        self
    }

    pub fn run<F>(mut self, f: F) -> Self
    where
        F: for<'a> Fn(
                &'a [String],
                &'a mut U,
                &'a Command<U, T>,
            ) -> BoxFuture<'a, anyhow::Result<T>>
            + Send
            + Sync
            + 'static,
    {
        self.run = Some(run_fn(f));
        self
    }

    /// Declare flags against the command's own registry.
    ///
    /// An executable returned from `prepare` replaces one set with [`run`](Self::run).
    pub fn prepare<P>(mut self, prepare: P) -> Self
    where
        P: FnOnce(&mut FlagRegistry) -> Result<Option<RunFn<U, T>>, BuildError> + 'static,
    {
        self.prepare = Some(Box::new(prepare));
        self
    }

    pub fn build(self) -> Result<Arc<Command<U, T>>, BuildError> {
        if self.name.is_empty() || self.name.starts_with('-') {
            return Err(BuildError::InvalidCommandName(self.name));
        }

        let mut flags = FlagRegistry::new(self.name.clone());
        let mut run = self.run;
        if let Some(prepare) = self.prepare {
            if let Some(prepared) = prepare(&mut flags)? {
                run = Some(prepared);
            }
        }

        Ok(Arc::new(Command {
            name: self.name,
            usage: self.usage,
            usage_long: self.usage_long,
            parent: OnceLock::new(),
            children: RwLock::new(BTreeMap::new()),
            flags,
            run,
        }))
    }
}

impl<U, T> Command<U, T> {
    pub fn builder(name: impl Into<String>) -> CommandBuilder<U, T> {
        CommandBuilder {
            name: name.into(),
            usage: String::new(),
            usage_long: String::new(),
            run: None,
            prepare: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn usage(&self) -> &str {
        &self.usage
    }

    pub fn usage_long(&self) -> &str {
        if self.usage_long.is_empty() {
            &self.usage
        } else {
            &self.usage_long
        }
    }

    pub fn flags(&self) -> &FlagRegistry {
        &self.flags
    }

    /// The parent link is weak: callers walking down from the root must keep
    /// the root `Arc` alive, or ancestors vanish from paths and usage lines.
    pub fn parent(&self) -> Option<Arc<Self>> {
        self.parent.get().and_then(Weak::upgrade)
    }

    pub fn is_runnable(&self) -> bool {
        self.run.is_some()
    }

    /// Attach `child` below this command.
    pub fn add(self: &Arc<Self>, child: Arc<Self>) -> Result<(), BuildError> {
        if child.parent.get().is_some() {
            return Err(BuildError::AlreadyAttached {
                command: child.name.clone(),
                parent: child
                    .parent()
                    .map(|p| p.dotted_path())
                    .unwrap_or_default(),
            });
        }

        let mut node = Some(self.clone());
        while let Some(current) = node {
            if Arc::ptr_eq(&current, &child) {
                return Err(BuildError::Cycle {
                    command: child.name.clone(),
                    parent: self.dotted_path(),
                });
            }
            node = current.parent();
        }

        let mut children = self.children.write();
        if children.contains_key(&child.name) {
            return Err(BuildError::DuplicateCommand {
                parent: self.dotted_path(),
                name: child.name.clone(),
            });
        }
        if child.parent.set(Arc::downgrade(self)).is_err() {
            return Err(BuildError::AlreadyAttached {
                command: child.name.clone(),
                parent: self.dotted_path(),
            });
        }
        children.insert(child.name.clone(), child);
        Ok(())
    }

    /// Build a command from `builder` and attach it in one step.
    pub fn add_new(
        self: &Arc<Self>,
        builder: CommandBuilder<U, T>,
    ) -> Result<Arc<Self>, BuildError> {
        let child = builder.build()?;
        self.add(child.clone())?;
        Ok(child)
    }

    pub fn child(&self, name: &str) -> Option<Arc<Self>> {
        self.children.read().get(name).cloned()
    }

    /// Immediate children ordered by name.
    pub fn children(&self) -> Vec<Arc<Self>> {
        self.children.read().values().cloned().collect()
    }

    pub fn has_children(&self) -> bool {
        !self.children.read().is_empty()
    }

    /// Closest immediate child name to `name`.
    pub fn guess(&self, name: &str, max_distance: usize) -> Option<String> {
        let children = self.children.read();
        suggest::closest(name, children.keys().map(String::as_str), max_distance)
            .map(str::to_string)
    }

    /// Names from the root of the tree down to this command.
    pub fn path_segments(&self) -> Vec<String> {
        let mut segments = vec![self.name.clone()];
        let mut node = self.parent();
        while let Some(current) = node {
            segments.push(current.name.clone());
            node = current.parent();
        }
        segments.reverse();
        segments
    }

    /// `root.child.grandchild`
    pub fn dotted_path(&self) -> String {
        self.path_segments().join(".")
    }

    /// Full help text, including the long usage preamble.
    pub fn help(&self) -> String {
        help::render(self, true)
    }

    /// Help text without the preamble, as embedded in usage errors.
    pub fn usage_block(&self) -> String {
        help::render(self, false)
    }

    /// Invoke the executable, if any, with `args` and `userdata`.
    pub async fn execute(&self, args: &[String], userdata: &mut U) -> anyhow::Result<Option<T>> {
        match &self.run {
            Some(run) => run(args, userdata, self).await.map(Some),
            None => Ok(None),
        }
    }
}

impl<U, T> fmt::Display for Command<U, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.help())
    }
}

impl<U, T> fmt::Debug for Command<U, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("flags", &self.flags)
            .field(
                "children",
                &self.children.read().keys().cloned().collect::<Vec<_>>(),
            )
            .field("runnable", &self.run.is_some())
            .finish()
    }
}
