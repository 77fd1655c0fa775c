//! Per-command flag storage.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::error::BuildError;
use crate::flag::{self, Flag};
use crate::suggest;

/// Flags declared by one command, addressable by long and short name.
///
/// Flags are never inherited: a child command has its own registry.
pub struct FlagRegistry {
    owner: String,
    flags: Vec<Arc<dyn Flag>>,
    by_long: HashMap<String, usize>,
    by_short: HashMap<char, usize>,
    sorted: OnceLock<Vec<usize>>,
}

impl FlagRegistry {
    pub(crate) fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            flags: Vec::new(),
            by_long: HashMap::new(),
            by_short: HashMap::new(),
            sorted: OnceLock::new(),
        }
    }

    /// Register `flag` and hand back a shared handle for reading its value.
    pub fn add<F>(&mut self, flag: F) -> Result<Arc<F>, BuildError>
    where
        F: Flag + 'static,
    {
        flag::check_definition(&flag)?;

        let name = flag.name().to_string();
        if self.by_long.contains_key(&name) {
            return Err(BuildError::DuplicateFlag {
                command: self.owner.clone(),
                flag: name,
            });
        }
        if let Some(short) = flag.shorthand() {
            if let Some(&idx) = self.by_short.get(&short) {
                return Err(BuildError::ShorthandInUse {
                    command: self.owner.clone(),
                    flag: name,
                    short,
                    existing: self.flags[idx].name().to_string(),
                });
            }
        }

        let flag = Arc::new(flag);
        let idx = self.flags.len();
        if let Some(short) = flag.shorthand() {
            self.by_short.insert(short, idx);
        }
        self.by_long.insert(name, idx);
        self.flags.push(flag.clone());
        self.sorted = OnceLock::new();

        Ok(flag)
    }

    pub fn find(&self, name: &str) -> Option<&Arc<dyn Flag>> {
        self.by_long.get(name).map(|&idx| &self.flags[idx])
    }

    pub fn find_short(&self, short: char) -> Option<&Arc<dyn Flag>> {
        self.by_short.get(&short).map(|&idx| &self.flags[idx])
    }

    /// Closest long name to `name`; shorthands are never suggested.
    pub fn guess(&self, name: &str, max_distance: usize) -> Option<&str> {
        suggest::closest(name, self.iter().map(|f| f.name()), max_distance)
    }

    /// Clear every current value; defaults remain as the fallback.
    pub fn reset(&self) {
        for flag in &self.flags {
            flag.reset();
        }
    }

    /// Flags ordered by long name.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Flag>> + '_ {
        let order = self.sorted.get_or_init(|| {
            let mut order: Vec<usize> = (0..self.flags.len()).collect();
            order.sort_by(|&a, &b| self.flags[a].name().cmp(self.flags[b].name()));
            order
        });
        order.iter().map(|&idx| &self.flags[idx])
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

impl fmt::Debug for FlagRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlagRegistry")
            .field("owner", &self.owner)
            .field(
                "flags",
                &self.iter().map(|f| f.name().to_string()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
