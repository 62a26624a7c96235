//! Tunable constants for the forge, the ledger and the chat panel.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tokens::TokenGrade;

/// Numeric knobs of the forge state machine.
///
/// Defaults reproduce the stock forge behaviour. Loaded from the `[forge]`
/// config section with every field optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeParams {
    pub heat_increment: u32,
    pub prepared_min: u32,
    pub prepared_max: u32,
    /// Heat strictly above this erodes integrity on every heat step.
    pub overheat_threshold: u32,
    pub overheat_penalty: f64,
    pub cold_strike_penalty: f64,
    pub integrity_floor: f64,
    pub strike_reinforcement: f64,
    /// Quality hint sent with a strike inside the prepared window.
    pub prepared_hint: f64,
    /// Quality hint sent with an infinity strike outside the window.
    pub unprepared_hint: f64,
    /// Tokens credited back after a successful strike.
    pub strike_reward_tokens: u64,
    pub transmute_cost: u64,
    pub transmute_overdrive: f64,
    pub transmuted_heat: u32,
    pub infinity_quench_multiplier: f64,
    pub masterwork_threshold: f64,
}

impl Default for ForgeParams {
    fn default() -> Self {
        Self {
            heat_increment: 25,
            prepared_min: 60,
            prepared_max: 95,
            overheat_threshold: 100,
            overheat_penalty: 0.05,
            cold_strike_penalty: 0.1,
            integrity_floor: 0.1,
            strike_reinforcement: 0.05,
            prepared_hint: 0.95,
            unprepared_hint: 0.6,
            strike_reward_tokens: 0,
            transmute_cost: 50,
            transmute_overdrive: 1.2,
            transmuted_heat: 100,
            infinity_quench_multiplier: 1.5,
            masterwork_threshold: 0.9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForgeParamsError {
    #[error("prepared window is empty: {min} > {max}")]
    EmptyWindow { min: u32, max: u32 },
    #[error("heat increment must be positive")]
    ZeroHeatIncrement,
    #[error("{field} must be within [0, 1], got {value}")]
    OutOfUnitRange { field: &'static str, value: f64 },
    #[error("{field} must be a finite value >= 1, got {value}")]
    BadMultiplier { field: &'static str, value: f64 },
}

impl ForgeParams {
    /// `true` when `heat` lies inside the inclusive prepared window.
    #[must_use]
    pub fn is_prepared(&self, heat: u32) -> bool {
        (self.prepared_min..=self.prepared_max).contains(&heat)
    }

    pub fn validate(&self) -> Result<(), ForgeParamsError> {
        if self.prepared_min > self.prepared_max {
            return Err(ForgeParamsError::EmptyWindow {
                min: self.prepared_min,
                max: self.prepared_max,
            });
        }
        if self.heat_increment == 0 {
            return Err(ForgeParamsError::ZeroHeatIncrement);
        }
        for (field, value) in [
            ("overheat_penalty", self.overheat_penalty),
            ("cold_strike_penalty", self.cold_strike_penalty),
            ("integrity_floor", self.integrity_floor),
            ("strike_reinforcement", self.strike_reinforcement),
            ("masterwork_threshold", self.masterwork_threshold),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ForgeParamsError::OutOfUnitRange { field, value });
            }
        }
        for (field, value) in [
            ("transmute_overdrive", self.transmute_overdrive),
            ("infinity_quench_multiplier", self.infinity_quench_multiplier),
        ] {
            if !value.is_finite() || value < 1.0 {
                return Err(ForgeParamsError::BadMultiplier { field, value });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerParams {
    pub starting_balance: u64,
    pub grade: TokenGrade,
}

impl Default for LedgerParams {
    fn default() -> Self {
        Self {
            starting_balance: 1500,
            grade: TokenGrade::Alpha,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatParams {
    pub message_cost: u64,
    /// Balance under which the panel reports a low-resource warning.
    pub low_balance_warning: u64,
}

impl Default for ChatParams {
    fn default() -> Self {
        Self {
            message_cost: 20,
            low_balance_warning: 100,
        }
    }
}
