mod app;
mod manifest;
mod report;

use anyhow::{Context, Result};
use argtree::{Error, Outcome, ParseOptions, UsageError};
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt};

use crate::app::{Invocation, split_target};

/// Exit status for command-line usage errors.
const USAGE_EXIT: u8 = 2;

fn main() -> ExitCode {
    init_tracing();
    let (front, target) = split_target(std::env::args().skip(1).collect());

    match run(front, target) {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => match usage_error(&err) {
            Some(usage) => {
                eprint!("{usage}");
                ExitCode::from(USAGE_EXIT)
            }
            None => {
                eprintln!("Error: {err:#}");
                ExitCode::FAILURE
            }
        },
    }
}

fn run(front: Vec<String>, target: Vec<String>) -> Result<String> {
    let cli = app::build().context("failed to build the argtree command tree")?;
    let mut invocation = Invocation { target };

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async {
            let options = ParseOptions::default();
            let outcome = argtree::parse(&cli, &front, &mut invocation, &options).await?;
            Ok(match outcome {
                Outcome::Help(text) => text,
                Outcome::Values(values) => values.into_iter().flatten().collect(),
                Outcome::Runners(_) => String::new(),
            })
        })
}

/// A usage error from either the front-end parse or the target parse of `run`.
fn usage_error(err: &anyhow::Error) -> Option<&UsageError> {
    let mut current = err.downcast_ref::<Error>()?;
    loop {
        match current {
            Error::Usage(usage) => return Some(usage),
            Error::Run(inner) => current = inner.downcast_ref::<Error>()?,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("ARGTREE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
