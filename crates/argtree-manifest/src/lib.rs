//! JSON manifest model for argtree command trees.
//!
//! A manifest describes commands and their flags declaratively so a tree can
//! be built without writing Rust:
//!
//! ```json
//! {
//!   "schema-version": 1,
//!   "root": {
//!     "name": "app",
//!     "flags": [{ "name": "verbose", "short": "v", "kind": "bool" }],
//!     "commands": [
//!       {
//!         "name": "serve",
//!         "flags": [{ "name": "port", "short": "p", "kind": "uint", "default": 8080 }]
//!       }
//!     ]
//!   }
//! }
//! ```
//!
//! Defaults and allow-lists go through the same text conversion as argv
//! values, so `"default": 8080` and `"default": "8080"` are equivalent.

use std::sync::Arc;

use argtree::flag::{BigInt, Bool, Int, Number, Text, Uint};
use argtree::{
    ArrayFlag, BuildError, Command, FlagRegistry, RunFn, ScalarFlag, ValueError, ValueKind,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Manifest schema understood by this crate.
pub const SCHEMA_VERSION: u32 = 1;

/// File name looked up when no manifest path is given.
pub const DEFAULT_MANIFEST_NAME: &str = "argtree.json";

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("invalid manifest JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported schema-version {found} (expected {expected})", expected = SCHEMA_VERSION)]
    UnsupportedSchema { found: u32 },

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("invalid default for flag --{flag} of {command:?}: {source}")]
    Default {
        command: String,
        flag: String,
        source: ValueError,
    },

    #[error("invalid allowed value for flag --{flag} of {command:?}: {source}")]
    Allowed {
        command: String,
        flag: String,
        source: ValueError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagType {
    #[default]
    String,
    Number,
    Int,
    Uint,
    BigInt,
    Bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FlagSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short: Option<char>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub usage: String,
    #[serde(default)]
    pub kind: FlagType,
    /// Collect every occurrence instead of keeping the last one.
    #[serde(default)]
    pub array: bool,
    /// Scalar for plain flags, JSON array for array flags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CommandSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub usage: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub usage_long: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<FlagSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<CommandSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Manifest {
    pub schema_version: u32,
    pub root: CommandSpec,
}

impl Manifest {
    pub fn from_json(text: &str) -> Result<Self, ManifestError> {
        let manifest: Manifest = serde_json::from_str(text)?;
        if manifest.schema_version != SCHEMA_VERSION {
            return Err(ManifestError::UnsupportedSchema {
                found: manifest.schema_version,
            });
        }
        Ok(manifest)
    }

    pub fn to_json_pretty(&self) -> Result<String, ManifestError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Build a live command tree from `spec`.
///
/// `executable` is asked once per command for the executable to bind; `None`
/// leaves the command without one.
pub fn build_tree<U, T, F>(
    spec: &CommandSpec,
    executable: &F,
) -> Result<Arc<Command<U, T>>, ManifestError>
where
    U: 'static,
    T: 'static,
    F: Fn(&CommandSpec) -> Option<RunFn<U, T>>,
{
    let installers = spec
        .flags
        .iter()
        .map(|flag| installer(&spec.name, flag))
        .collect::<Result<Vec<_>, _>>()?;
    let run = executable(spec);

    let command = Command::builder(spec.name.as_str())
        .usage(&spec.usage)
        .usage_long(&spec.usage_long)
        .prepare(move |flags| {
            for install in installers {
                install(flags)?;
            }
            Ok(run)
        })
        .build()?;

    for child in &spec.commands {
        command.add(build_tree(child, executable)?)?;
    }
    Ok(command)
}

type Installer = Box<dyn FnOnce(&mut FlagRegistry) -> Result<(), BuildError>>;

fn installer(command: &str, spec: &FlagSpec) -> Result<Installer, ManifestError> {
    match spec.kind {
        FlagType::String => typed::<Text>(command, spec),
        FlagType::Number => typed::<Number>(command, spec),
        FlagType::Int => typed::<Int>(command, spec),
        FlagType::Uint => typed::<Uint>(command, spec),
        FlagType::BigInt => typed::<BigInt>(command, spec),
        FlagType::Bool => typed::<Bool>(command, spec),
    }
}

fn typed<K: ValueKind>(command: &str, spec: &FlagSpec) -> Result<Installer, ManifestError> {
    let default_error = |source| ManifestError::Default {
        command: command.to_string(),
        flag: spec.name.clone(),
        source,
    };
    let allowed = spec
        .allowed
        .as_deref()
        .map(|values| values.iter().map(convert::<K>).collect::<Result<Vec<_>, _>>())
        .transpose()
        .map_err(|source| ManifestError::Allowed {
            command: command.to_string(),
            flag: spec.name.clone(),
            source,
        })?;

    if spec.array {
        let mut flag = ArrayFlag::<K>::new(spec.name.as_str()).usage(&spec.usage);
        if let Some(short) = spec.short {
            flag = flag.short(short);
        }
        if let Some(default) = &spec.default {
            let Value::Array(items) = default else {
                return Err(default_error(ValueError::Invalid(
                    "array flags take a JSON array as default".to_string(),
                )));
            };
            let values = items
                .iter()
                .map(convert::<K>)
                .collect::<Result<Vec<_>, _>>()
                .map_err(default_error)?;
            flag = flag.default(values);
        }
        if let Some(allowed) = allowed {
            flag = flag.allowed(allowed);
        }
        return Ok(Box::new(move |flags| flags.add(flag).map(drop)));
    }

    let mut flag = ScalarFlag::<K>::new(spec.name.as_str()).usage(&spec.usage);
    if let Some(short) = spec.short {
        flag = flag.short(short);
    }
    if let Some(default) = &spec.default {
        flag = flag.default(convert::<K>(default).map_err(default_error)?);
    }
    if let Some(allowed) = allowed {
        flag = flag.allowed(allowed);
    }
    Ok(Box::new(move |flags| flags.add(flag).map(drop)))
}

/// Feed a JSON scalar through the flag's text conversion.
fn convert<K: ValueKind>(value: &Value) -> Result<K::Value, ValueError> {
    let text = match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        other => {
            return Err(ValueError::Invalid(format!(
                "{other} is not a string, number or boolean"
            )));
        }
    };
    K::convert(&text)
}
