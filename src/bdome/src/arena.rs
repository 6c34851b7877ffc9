//! Arenas and the metadata attached to every recorded drop.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    GENERATED, MULTIPLE_CHALLENGERS, MULTIPLE_DIFFICULTIES, MULTIPLE_SOURCES,
};
use crate::drops::DropsError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown arena: {0}")]
pub struct UnknownArena(pub String);

/// One of the eight Battledome arenas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Arena {
    CosmicDome,
    NeocolaCentre,
    CentralArena,
    DomeOfTheDeep,
    RattlingCauldron,
    PangoPalladium,
    FrostArena,
    UggaDome,
}

impl Arena {
    /// In-game name, as written in drop and weight files
    pub fn name(&self) -> &'static str {
        match self {
            Self::CosmicDome => "Cosmic Dome",
            Self::NeocolaCentre => "Neocola Centre",
            Self::CentralArena => "Central Arena",
            Self::DomeOfTheDeep => "Dome of the Deep",
            Self::RattlingCauldron => "Rattling Cauldron",
            Self::PangoPalladium => "Pango Palladium",
            Self::FrostArena => "Frost Arena",
            Self::UggaDome => "Ugga Dome",
        }
    }
}

impl std::fmt::Display for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Arena {
    type Err = UnknownArena;

    /// Accepts the in-game name in any case, with `_` standing in for spaces.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('_', " ").to_lowercase();
        crate::constants::ARENAS
            .into_iter()
            .find(|arena| arena.name().to_lowercase() == wanted)
            .ok_or_else(|| UnknownArena(s.to_string()))
    }
}

/// Selects one challenger at one difficulty in one arena
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChallengerKey {
    pub arena: Arena,
    pub challenger: String,
    pub difficulty: String,
}

impl ChallengerKey {
    pub fn new(arena: Arena, challenger: impl Into<String>, difficulty: impl Into<String>) -> Self {
        Self {
            arena,
            challenger: challenger.into(),
            difficulty: difficulty.into(),
        }
    }
}

impl std::fmt::Display for ChallengerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} in {}", self.difficulty, self.challenger, self.arena)
    }
}

/// Where a set of drops came from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DropMetadata {
    /// Drop file basename, or a sentinel once sources are mixed
    pub source: String,
    pub arena: Arena,
    pub challenger: String,
    pub difficulty: String,
}

impl DropMetadata {
    pub fn new(
        source: impl Into<String>,
        arena: Arena,
        challenger: impl Into<String>,
        difficulty: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            arena,
            challenger: challenger.into(),
            difficulty: difficulty.into(),
        }
    }

    /// Metadata stamped on synthetic samples
    pub fn generated(arena: Arena) -> Self {
        Self::new(GENERATED, arena, GENERATED, GENERATED)
    }

    /// Metadata carrying only an arena, used when no drops were recorded
    pub fn arena_only(arena: Arena) -> Self {
        Self::new("", arena, "", "")
    }

    pub fn key(&self) -> ChallengerKey {
        ChallengerKey::new(self.arena, self.challenger.clone(), self.difficulty.clone())
    }

    /// Merge two metadata values from the same arena.
    ///
    /// Fields that disagree collapse to their "multiple" sentinel.
    pub fn combine(&self, other: &DropMetadata) -> Result<DropMetadata, DropsError> {
        if self.arena != other.arena {
            return Err(DropsError::ArenaMismatch {
                left: self.arena,
                right: other.arena,
            });
        }

        let pick = |a: &str, b: &str, sentinel: &str| {
            if a == b {
                a.to_string()
            } else {
                sentinel.to_string()
            }
        };

        Ok(DropMetadata {
            source: pick(&self.source, &other.source, MULTIPLE_SOURCES),
            arena: self.arena,
            challenger: pick(&self.challenger, &other.challenger, MULTIPLE_CHALLENGERS),
            difficulty: pick(&self.difficulty, &other.difficulty, MULTIPLE_DIFFICULTIES),
        })
    }
}

impl std::fmt::Display for DropMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} | {} | {} ({})",
            self.arena, self.challenger, self.difficulty, self.source
        )
    }
}
