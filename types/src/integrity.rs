//! Structural integrity of a forge session or artifact.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Quality score in `[0.0, 1.0]`.
///
/// Every mutating helper clamps, so a value of this type is always in range.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Integrity(f64);

#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("integrity {0} is outside [0, 1]")]
pub struct IntegrityOutOfRange(pub f64);

impl Integrity {
    pub const MAX: Integrity = Integrity(1.0);
    pub const MIN: Integrity = Integrity(0.0);

    pub fn new(value: f64) -> Result<Self, IntegrityOutOfRange> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(IntegrityOutOfRange(value))
        }
    }

    /// Clamp an arbitrary float into range. NaN collapses to zero.
    #[must_use]
    pub fn clamped(value: f64) -> Self {
        if value.is_nan() {
            return Self::MIN;
        }
        Self(value.clamp(0.0, 1.0))
    }

    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Subtract `amount`, never dropping below `floor`.
    ///
    /// A value already below the floor is left where it is.
    #[must_use]
    pub fn penalize(self, amount: f64, floor: f64) -> Self {
        let lowered = self.0 - amount;
        if lowered >= floor {
            Self::clamped(lowered)
        } else {
            Self::clamped(floor.min(self.0))
        }
    }

    #[must_use]
    pub fn reinforce(self, amount: f64) -> Self {
        Self::clamped(self.0 + amount)
    }

    #[must_use]
    pub fn amplify(self, factor: f64) -> Self {
        Self::clamped(self.0 * factor)
    }

    /// Whole-number percentage, as embedded in prompts.
    #[must_use]
    pub fn percent(self) -> u32 {
        (self.0 * 100.0).round() as u32
    }
}

impl Default for Integrity {
    fn default() -> Self {
        Self::MAX
    }
}

impl TryFrom<f64> for Integrity {
    type Error = IntegrityOutOfRange;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Integrity> for f64 {
    fn from(value: Integrity) -> Self {
        value.0
    }
}

impl std::fmt::Display for Integrity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.percent())
    }
}
