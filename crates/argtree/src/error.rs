//! Error taxonomy for tree construction, flag values and parse-time usage
//! mistakes.

use std::fmt;

use thiserror::Error;

/// Raised while a command tree is being assembled, before any parse runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("invalid flag name {0:?}: must be non-empty and must not contain '='")]
    InvalidFlagName(String),

    #[error("invalid shorthand {short:?} for flag --{flag}")]
    InvalidShorthand { flag: String, short: char },

    #[error("flag --{flag} redefined in command {command}")]
    DuplicateFlag { command: String, flag: String },

    #[error(
        "shorthand -{short} for flag --{flag} in command {command} is already used by --{existing}"
    )]
    ShorthandInUse {
        command: String,
        flag: String,
        short: char,
        existing: String,
    },

    #[error("invalid command name {0:?}: must be non-empty and must not start with '-'")]
    InvalidCommandName(String),

    #[error("command {command} is already attached to {parent}")]
    AlreadyAttached { command: String, parent: String },

    #[error("command {parent} already has a subcommand named {name}")]
    DuplicateCommand { parent: String, name: String },

    #[error("command {command} cannot be added below its own descendant {parent}")]
    Cycle { command: String, parent: String },
}

/// Why a single piece of flag text was refused.
#[derive(Debug, Error)]
pub enum ValueError {
    #[error("{0}")]
    Invalid(String),

    #[error("{value} is not in allowed values: {allowed}")]
    NotAllowed { value: String, allowed: String },

    #[error(transparent)]
    Rejected(anyhow::Error),
}

/// What went wrong in a [`UsageError`].
#[derive(Debug, Error)]
pub enum UsageErrorKind {
    #[error("unknown flag: {0}")]
    UnknownFlag(String),

    #[error("unknown shorthand flag: '{short}' in {token}")]
    UnknownShorthand { short: char, token: String },

    #[error("flag needs an argument: {0}")]
    MissingValue(String),

    #[error("invalid argument {value:?} for {flag} flag: {source}")]
    InvalidValue {
        flag: String,
        value: String,
        source: ValueError,
    },

    #[error("unknown command {name:?} for {command:?}")]
    UnknownCommand { name: String, command: String },
}

/// The distinguished parse-time error.
///
/// Its `Display` output is ready to print: the message, an optional
/// "did you mean" line and the usage block of the command that was current
/// when the mistake was found.
#[derive(Debug)]
pub struct UsageError {
    kind: UsageErrorKind,
    suggestion: Option<String>,
    usage: String,
}

impl UsageError {
    pub(crate) fn new(kind: UsageErrorKind, usage: String) -> Self {
        Self {
            kind,
            suggestion: None,
            usage,
        }
    }

    pub(crate) fn with_suggestion(mut self, suggestion: Option<String>) -> Self {
        self.suggestion = suggestion;
        self
    }

    pub fn kind(&self) -> &UsageErrorKind {
        &self.kind
    }

    /// Closest known name or value, when one was within the distance threshold.
    pub fn suggestion(&self) -> Option<&str> {
        self.suggestion.as_deref()
    }

    /// Rendered usage of the command the error belongs to.
    pub fn usage(&self) -> &str {
        &self.usage
    }

    /// `true` for unresolved subcommand names, `false` for every flag error.
    pub fn is_command_error(&self) -> bool {
        matches!(self.kind, UsageErrorKind::UnknownCommand { .. })
    }

    pub fn is_flag_error(&self) -> bool {
        !self.is_command_error()
    }
}

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Error: {}", self.kind)?;
        if let Some(suggestion) = &self.suggestion {
            writeln!(f, "\nDid you mean this?\n\t{suggestion}")?;
        }
        write!(f, "\n{}", self.usage)
    }
}

impl std::error::Error for UsageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.kind)
    }
}

/// Everything a parse call can fail with.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Usage(#[from] UsageError),

    /// An executable failed during dispatch; the error is passed through as-is.
    #[error(transparent)]
    Run(anyhow::Error),
}

impl Error {
    pub fn as_usage(&self) -> Option<&UsageError> {
        match self {
            Self::Usage(err) => Some(err),
            Self::Run(_) => None,
        }
    }
}
