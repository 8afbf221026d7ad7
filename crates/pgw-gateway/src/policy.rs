//! How the gateway treats a contract whose route matched but whose
//! validation failed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Short-circuit policy for failed validations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchPolicy {
    /// Keep trying later contracts; the first full pass wins. On total
    /// failure the earliest matching contract's failure is reported.
    #[default]
    FirstPassWins,
    /// Reject as soon as one contract matches the route and fails.
    /// Later contracts are never consulted for that request.
    RejectOnFirstMatch,
}

impl MatchPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstPassWins => "first-pass-wins",
            Self::RejectOnFirstMatch => "reject-on-first-match",
        }
    }
}

impl fmt::Display for MatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown match policy '{0}', expected 'first-pass-wins' or 'reject-on-first-match'")]
pub struct UnknownMatchPolicy(pub String);

impl FromStr for MatchPolicy {
    type Err = UnknownMatchPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first-pass-wins" => Ok(Self::FirstPassWins),
            "reject-on-first-match" => Ok(Self::RejectOnFirstMatch),
            _ => Err(UnknownMatchPolicy(s.to_string())),
        }
    }
}
