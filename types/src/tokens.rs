//! Intelligence tokens (IQ-T) and the strike cost model.

use serde::{Deserialize, Serialize};

use crate::{Intent, realm::ForgeMode};

/// Floor of the strike cost before the mode multiplier, in tokens.
pub const MIN_STRIKE_BASE: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenGrade {
    #[default]
    Alpha,
    Beta,
    Omega,
}

impl TokenGrade {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            TokenGrade::Alpha => "ALPHA",
            TokenGrade::Beta => "BETA",
            TokenGrade::Omega => "OMEGA",
        }
    }
}

impl std::fmt::Display for TokenGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalance {
    pub amount: u64,
    pub grade: TokenGrade,
}

impl TokenBalance {
    #[must_use]
    pub const fn new(amount: u64, grade: TokenGrade) -> Self {
        Self { amount, grade }
    }
}

impl std::fmt::Display for TokenBalance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} IQ-T [{}]", self.amount, self.grade)
    }
}

/// Token cost of a strike: `ceil(max(chars * 0.1, 10) * multiplier)`.
///
/// Computed in tenths of a token against a percentage multiplier, so the
/// estimate shown before a strike and the amount debited are identical.
#[must_use]
pub fn strike_cost(intent: &Intent, mode: ForgeMode) -> u64 {
    strike_cost_for_len(intent.char_len(), mode)
}

pub(crate) fn strike_cost_for_len(chars: usize, mode: ForgeMode) -> u64 {
    let tenths = (chars as u64).max(MIN_STRIKE_BASE * 10);
    (tenths * u64::from(mode.multiplier_percent())).div_ceil(1000)
}
