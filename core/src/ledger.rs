//! Shared intelligence-token ledger.
//!
//! One ledger is shared by every consumer (forge session, chat panel) through
//! cheap clones of [`TokenLedger`]. Debits check and subtract under a single
//! lock, so concurrent debits can never overdraw the balance.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use iadess_types::{LedgerParams, TokenBalance, TokenGrade};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("insufficient IQ-T: requested {requested}, available {available}")]
pub struct InsufficientTokens {
    pub requested: u64,
    pub available: u64,
}

#[derive(Debug)]
struct LedgerState {
    amount: u64,
    grade: TokenGrade,
}

#[derive(Debug, Clone)]
pub struct TokenLedger {
    state: Arc<Mutex<LedgerState>>,
    params: LedgerParams,
}

impl Default for TokenLedger {
    fn default() -> Self {
        Self::new(LedgerParams::default())
    }
}

impl TokenLedger {
    #[must_use]
    pub fn new(params: LedgerParams) -> Self {
        Self {
            state: Arc::new(Mutex::new(LedgerState {
                amount: params.starting_balance,
                grade: params.grade,
            })),
            params,
        }
    }

    /// Ledger starting at `amount` with default grade.
    #[must_use]
    pub fn with_balance(amount: u64) -> Self {
        Self::new(LedgerParams {
            starting_balance: amount,
            ..LedgerParams::default()
        })
    }

    // The state is two plain integers; a panic mid-update cannot leave it torn.
    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn balance(&self) -> u64 {
        self.lock().amount
    }

    #[must_use]
    pub fn grade(&self) -> TokenGrade {
        self.lock().grade
    }

    #[must_use]
    pub fn snapshot(&self) -> TokenBalance {
        let state = self.lock();
        TokenBalance::new(state.amount, state.grade)
    }

    /// Subtract `cost`, returning the remaining balance.
    pub fn try_debit(&self, cost: u64) -> Result<u64, InsufficientTokens> {
        let mut state = self.lock();
        if cost > state.amount {
            return Err(InsufficientTokens {
                requested: cost,
                available: state.amount,
            });
        }
        state.amount -= cost;
        Ok(state.amount)
    }

    /// `false` (and no change) when the balance does not cover `cost`.
    pub fn debit(&self, cost: u64) -> bool {
        self.try_debit(cost).is_ok()
    }

    /// Add `amount`, returning the new balance.
    pub fn credit(&self, amount: u64) -> u64 {
        let mut state = self.lock();
        state.amount = state.amount.saturating_add(amount);
        state.amount
    }

    /// Restore the configured starting balance and grade.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.amount = self.params.starting_balance;
        state.grade = self.params.grade;
    }
}
