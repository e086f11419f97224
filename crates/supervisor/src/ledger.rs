//! Credit ledger — SPEC_FULL.md §4.3.1 (supplement).
//!
//! A minimal in-memory admission-control counter, not a durable ledger:
//! debit on admission, refund on failure. Single-writer discipline inside
//! the Supervisor worker, consistent with spec.md §5's shared-resource
//! policy for Supervisor-owned tables.

use std::collections::HashMap;

use crate::error::JobError;

pub struct Ledger {
    balances: HashMap<String, i64>,
    starting_balance: i64,
}

impl Ledger {
    pub fn new(starting_balance: i64) -> Self {
        Self {
            balances: HashMap::new(),
            starting_balance,
        }
    }

    /// Current balance for `id`, auto-opening it at the configured starting
    /// balance if it has never been seen before. A local testing
    /// convenience, not external settlement — see spec.md's Non-goals.
    pub fn balance(&mut self, id: &str) -> i64 {
        *self
            .balances
            .entry(id.to_string())
            .or_insert(self.starting_balance)
    }

    /// Debits `amount` from `id`'s balance. Rejects with
    /// [`JobError::Insufficient`] without mutating the balance if it would
    /// go negative.
    pub fn debit(&mut self, id: &str, amount: u64) -> Result<(), JobError> {
        let amount = amount as i64;
        let balance = self.balances.entry(id.to_string()).or_insert(self.starting_balance);
        if *balance < amount {
            return Err(JobError::Insufficient(id.to_string()));
        }
        *balance -= amount;
        Ok(())
    }

    /// Refunds `amount` back to `id`'s balance (on job failure or
    /// unconsumed-budget return at timeout).
    pub fn credit(&mut self, id: &str, amount: u64) {
        let balance = self.balances.entry(id.to_string()).or_insert(self.starting_balance);
        *balance += amount as i64;
    }
}
