//! Subcommand-aware argument parsing with typed flags.
//!
//! A tree of [`Command`]s, each owning a [`FlagRegistry`], is matched against
//! an argument vector by [`parse`]:
//! - long (`--port 80`, `--port=80`) and shorthand (`-p80`, `-p=80`, `-vp80`) flags
//! - subcommand descent, with "did you mean" suggestions for typos
//! - an implicit `-h/--help` on every command
//! - three dispatch modes over the matched path (see [`RunMode`])
//!
//! ```rust,ignore
//! let root = Command::<(), String>::builder("app")
//!     .prepare(|flags| {
//!         let port = flags.add(UintFlag::new("port").short('p').default(8080))?;
//!         Ok(Some(run_fn(move |_args, _data, _cmd| {
//!             let port = port.value();
//!             Box::pin(async move { Ok(format!("listening on {port:?}")) })
//!         })))
//!     })
//!     .build()?;
//!
//! let outcome = parse(&root, &["-p", "9000"], &mut (), &ParseOptions::default()).await?;
//! ```

pub mod command;
pub mod error;
pub mod flag;
mod help;
pub mod parse;
pub mod registry;
pub mod runner;
pub mod suggest;

pub use command::{Command, CommandBuilder, RunFn, run_fn};
pub use error::{BuildError, Error, UsageError, UsageErrorKind, ValueError};
pub use flag::{
    ArrayFlag, BigIntArrayFlag, BigIntFlag, BoolArrayFlag, BoolFlag, Flag, FlagKind,
    IntArrayFlag, IntFlag, NumberArrayFlag, NumberFlag, ScalarFlag, StringArrayFlag, StringFlag,
    UintArrayFlag, UintFlag, ValueKind,
};
pub use parse::{Outcome, ParseOptions, RunMode, parse};
pub use registry::FlagRegistry;
pub use runner::Runner;
