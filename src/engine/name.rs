//! Engine names.
//!
//! Every backing medium is addressed by an [`EngineName`]. The four built-in media have their
//! own variants; anything else a host registers is a [`EngineName::Custom`] engine.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Built-in engine names, in variant order.
const BUILTIN_NAMES: [&str; 4] = ["memory", "session", "local", "cookie"];

/// Identifies one storage engine (and therefore one adapter in the registry).
///
/// A `Custom` name spelling a built-in engine (in any case) is the same engine as the built-in
/// variant: it compares, hashes and displays like it.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum EngineName {
    /// Process-local map. Always supported, terminal node of every fallback chain.
    Memory,
    /// Storage scoped to a single browsing session.
    Session,
    /// Durable storage that survives restarts.
    Local,
    /// Cookie jar backed storage.
    Cookie,
    /// Engine registered by the host application.
    Custom(String),
}

impl EngineName {
    /// Returns the four built-in engines in their default priority order.
    pub fn builtin() -> [EngineName; 4] {
        [EngineName::Local, EngineName::Session, EngineName::Cookie, EngineName::Memory]
    }

    /// Creates a name for a host-registered engine. Built-in names map onto their own variant,
    /// so `custom("memory")` is the same engine as [`EngineName::Memory`].
    pub fn custom<S: Into<String>>(name: S) -> Self {
        let name = name.into();
        match name.parse() {
            Ok(engine) => engine,
            Err(_) => EngineName::Custom(name),
        }
    }

    pub fn as_str(&self) -> &str {
        self.key().1
    }

    pub fn is_builtin(&self) -> bool {
        self.key().0 < BUILTIN_NAMES.len()
    }

    /// Variant rank and canonical spelling.
    fn key(&self) -> (usize, &str) {
        let name = match self {
            EngineName::Memory => return (0, BUILTIN_NAMES[0]),
            EngineName::Session => return (1, BUILTIN_NAMES[1]),
            EngineName::Local => return (2, BUILTIN_NAMES[2]),
            EngineName::Cookie => return (3, BUILTIN_NAMES[3]),
            EngineName::Custom(name) => name.as_str(),
        };
        match BUILTIN_NAMES.iter().position(|b| b.eq_ignore_ascii_case(name)) {
            Some(rank) => (rank, BUILTIN_NAMES[rank]),
            None => (BUILTIN_NAMES.len(), name),
        }
    }
}

impl PartialEq for EngineName {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for EngineName {}

impl Hash for EngineName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for EngineName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EngineName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for EngineName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string cannot be used as an engine name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid storage engine name {0:?}")]
pub struct ParseEngineNameError(pub String);

impl FromStr for EngineName {
    type Err = ParseEngineNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.len() != s.len() {
            return Err(ParseEngineNameError(s.to_string()));
        }

        Ok(match trimmed.to_ascii_lowercase().as_str() {
            "memory" => EngineName::Memory,
            "session" => EngineName::Session,
            "local" => EngineName::Local,
            "cookie" => EngineName::Cookie,
            _ => EngineName::Custom(trimmed.to_string()),
        })
    }
}

impl TryFrom<String> for EngineName {
    type Error = ParseEngineNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EngineName> for String {
    fn from(name: EngineName) -> Self {
        name.as_str().to_string()
    }
}
