//! The `argtree` command tree, built with the engine it exercises.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use argtree::suggest::DEFAULT_DISTANCE;
use argtree::{BoolFlag, BuildError, Command, ParseOptions, RunMode, StringFlag, UintFlag, run_fn};
use argtree_manifest::{CommandSpec, DEFAULT_MANIFEST_NAME, build_tree};

use crate::manifest::load_manifest;
use crate::report::{RunReport, snapshot};

/// Per-invocation state handed to every executable.
#[derive(Debug, Default)]
pub struct Invocation {
    /// Arguments after the first `--`, parsed against the manifest tree.
    pub target: Vec<String>,
}

/// Executables return the text to print on stdout.
pub type Cli = Command<Invocation, String>;

/// Split process arguments at the first `--`.
pub fn split_target(mut args: Vec<String>) -> (Vec<String>, Vec<String>) {
    match args.iter().position(|arg| arg == "--") {
        Some(index) => {
            let target = args.split_off(index + 1);
            args.pop();
            (args, target)
        }
        None => (args, Vec::new()),
    }
}

pub fn build() -> Result<Arc<Cli>, BuildError> {
    let root = Cli::builder("argtree")
        .usage("inspect and dry-run argtree command manifests")
        .usage_long(
            "Inspect and dry-run argtree command manifests.\n\n\
             Arguments after `--` are parsed against the manifest tree by `run`.",
        )
        .prepare(|flags| {
            flags.add(
                StringFlag::new("manifest")
                    .short('m')
                    .usage("path to the command manifest")
                    .default(DEFAULT_MANIFEST_NAME.to_string()),
            )?;
            Ok(None)
        })
        .run(|_, _, cmd| {
            let help = cmd.help();
            Box::pin(async move { Ok(help) })
        })
        .build()?;

    root.add_new(
        Cli::builder("check")
            .usage("load the manifest and summarize its command tree")
            .run(|_, _, cmd| {
                let manifest = manifest_arg(cmd);
                Box::pin(async move { check(manifest) })
            }),
    )?;

    root.add_new(
        Cli::builder("run")
            .usage("parse the arguments after `--` against the manifest tree")
            .prepare(|flags| {
                let mode = flags.add(
                    StringFlag::new("mode")
                        .usage("which matched commands to execute")
                        .default("last".to_string())
                        .allowed(["all", "last", "runner"].map(String::from)),
                )?;
                let allow_unknown_flag = flags.add(
                    BoolFlag::new("allow-unknown-flag")
                        .usage("keep unknown flags as positional arguments"),
                )?;
                let allow_unknown_command = flags.add(
                    BoolFlag::new("allow-unknown-command")
                        .usage("keep unknown subcommand names as positional arguments"),
                )?;
                let distance = flags.add(
                    UintFlag::new("distance")
                        .usage("edit distance for suggestions, 0 disables them")
                        .default(DEFAULT_DISTANCE as u64),
                )?;

                Ok(Some(run_fn::<Invocation, String, _>(move |_, invocation, cmd| {
                    let manifest = manifest_arg(cmd);
                    let options = run_options(
                        mode.value().as_deref(),
                        allow_unknown_flag.value().unwrap_or(false),
                        allow_unknown_command.value().unwrap_or(false),
                        distance.value().unwrap_or(DEFAULT_DISTANCE as u64),
                    );
                    Box::pin(async move { dry_run(manifest, &invocation.target, options?).await })
                })))
            }),
    )?;

    root.add_new(
        Cli::builder("help-for")
            .usage("print the help of a manifest command")
            .usage_long(
                "Print the help of the manifest command reached by the given\n\
                 subcommand names, e.g. `argtree help-for serve`.",
            )
            .run(|args, _, cmd| {
                let manifest = manifest_arg(cmd);
                Box::pin(async move { help_for(manifest, args) })
            }),
    )?;

    Ok(root)
}

/// `--manifest` of the root command, `None` when left at its default.
fn manifest_arg(cmd: &Cli) -> Option<PathBuf> {
    let root = cmd.parent()?;
    let flag = root.flags().find("manifest")?;
    if !flag.is_set() {
        return None;
    }
    flag.value_as_string().map(PathBuf::from)
}

fn run_options(
    mode: Option<&str>,
    allow_unknown_flag: bool,
    allow_unknown_command: bool,
    distance: u64,
) -> Result<ParseOptions> {
    let mode = match mode {
        Some("all") => RunMode::All,
        Some("last") | None => RunMode::Last,
        Some("runner") => RunMode::Runner,
        Some(other) => bail!("unsupported mode: {other}"),
    };
    Ok(ParseOptions {
        mode,
        allow_unknown_flag,
        allow_unknown_command,
        suggest_distance: usize::try_from(distance).context("--distance is too large")?,
    })
}

fn check(manifest: Option<PathBuf>) -> Result<String> {
    tracing::debug!("executing check command");

    let loaded = load_manifest(manifest.as_deref())?;
    let tree = build_tree::<(), (), _>(&loaded.manifest.root, &|_: &CommandSpec| None)
        .with_context(|| format!("invalid command tree in {}", loaded.path.display()))?;

    let (commands, flags) = count(&tree);
    Ok(format!(
        "manifest: {}\nroot: {}\ncommands: {commands}\nflags: {flags}\n",
        loaded.path.display(),
        tree.name(),
    ))
}

fn count<U, T>(command: &Command<U, T>) -> (usize, usize) {
    command
        .children()
        .iter()
        .map(|child| count(child.as_ref()))
        .fold((1, command.flags().len()), |(c, f), (cc, cf)| (c + cc, f + cf))
}

async fn dry_run(
    manifest: Option<PathBuf>,
    target: &[String],
    options: ParseOptions,
) -> Result<String> {
    tracing::debug!(mode = ?options.mode, tokens = target.len(), "executing run command");

    let loaded = load_manifest(manifest.as_deref())?;
    let tree = build_tree(&loaded.manifest.root, &snapshot)
        .with_context(|| format!("invalid command tree in {}", loaded.path.display()))?;

    let outcome = argtree::parse(&tree, target, &mut (), &options).await?;
    let mut json = serde_json::to_string_pretty(&RunReport::from(outcome))?;
    json.push('\n');
    Ok(json)
}

fn help_for(manifest: Option<PathBuf>, path: &[String]) -> Result<String> {
    let loaded = load_manifest(manifest.as_deref())?;
    let root = build_tree::<(), (), _>(&loaded.manifest.root, &|_: &CommandSpec| None)
        .with_context(|| format!("invalid command tree in {}", loaded.path.display()))?;
    describe(root, path)
}

/// Help of the command reached from `root` by `path`.
///
/// `root` is held until the help is rendered; children only link weakly to
/// their parents.
fn describe<U, T>(root: Arc<Command<U, T>>, path: &[String]) -> Result<String> {
    let mut current = root.clone();
    for name in path {
        current = match current.child(name) {
            Some(child) => child,
            None => {
                let hint = current
                    .guess(name, DEFAULT_DISTANCE)
                    .map(|guess| format!(" (did you mean {guess:?}?)"))
                    .unwrap_or_default();
                bail!("no command {name:?} under {:?}{hint}", current.dotted_path());
            }
        };
    }
    Ok(current.help())
}
