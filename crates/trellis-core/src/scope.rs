use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maven-compatible dependency scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    Compile,
    Runtime,
    Test,
    Provided,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown scope `{0}` (expected compile, runtime, test, provided or system)")]
pub struct UnknownScope(pub String);

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Compile => "compile",
            Scope::Runtime => "runtime",
            Scope::Test => "test",
            Scope::Provided => "provided",
            Scope::System => "system",
        }
    }

    /// Scope of a transitive dependency declared with `declared` by an
    /// artifact whose own scope is `inherited`.
    ///
    /// Returns `None` when the declaration is not transitive (test and
    /// provided dependencies of a dependency never reach the classpath).
    /// Without an inherited scope the declared one is kept as is.
    pub fn inherit(inherited: Option<Scope>, declared: Scope) -> Option<Scope> {
        let Some(inherited) = inherited else {
            return Some(declared);
        };
        if matches!(declared, Scope::Test | Scope::Provided) {
            return None;
        }
        let scope = match (inherited, declared) {
            (_, Scope::System) => Scope::System,
            (Scope::Test, _) => Scope::Test,
            (Scope::Provided, _) => Scope::Provided,
            (Scope::Compile, Scope::Compile) => Scope::Compile,
            _ => Scope::Runtime,
        };
        Some(scope)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = UnknownScope;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "compile" => Ok(Scope::Compile),
            "runtime" => Ok(Scope::Runtime),
            "test" => Ok(Scope::Test),
            "provided" => Ok(Scope::Provided),
            "system" => Ok(Scope::System),
            _ => Err(UnknownScope(s.to_string())),
        }
    }
}
