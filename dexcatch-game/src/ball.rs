//! Capture-item kinds.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A kind of capture ball. Each kind has its own stock and success multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BallKind {
    /// The default ball; unlimited supply.
    Poke,
    Great,
    Ultra,
}

impl BallKind {
    pub const ALL: [Self; 3] = [Self::Poke, Self::Great, Self::Ultra];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Poke => "poke",
            Self::Great => "great",
            Self::Ultra => "ultra",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Poke => "Poké Ball",
            Self::Great => "Great Ball",
            Self::Ultra => "Ultra Ball",
        }
    }

    /// Whether this kind is the default, unlimited ball.
    #[must_use]
    pub const fn is_default(self) -> bool {
        matches!(self, Self::Poke)
    }
}

impl fmt::Display for BallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown ball kind: {0}")]
pub struct UnknownBall(pub String);

impl FromStr for BallKind {
    type Err = UnknownBall;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "poke" | "pokeball" | "poke-ball" | "a" => Ok(Self::Poke),
            "great" | "greatball" | "great-ball" | "b" => Ok(Self::Great),
            "ultra" | "ultraball" | "ultra-ball" | "c" => Ok(Self::Ultra),
            _ => Err(UnknownBall(s.to_string())),
        }
    }
}
