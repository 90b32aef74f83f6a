//! Account number allocation
//!
//! Account numbers are `ACC` followed by a six-digit zero-padded sequence
//! number. The first candidate is derived from the current record count;
//! the caller probes each candidate against the store and advances on
//! collision.
//!
//! Deriving the sequence from a live count is racy: two concurrent callers
//! can compute the same candidate before either insert commits. The store
//! closes that window by inserting with a conflict check on the primary key,
//! so a lost race surfaces as one more collision instead of a duplicate.

pub const PREFIX: &str = "ACC";

/// Sequence digits; numbers past 999999 simply grow wider
pub const WIDTH: usize = 6;

/// Upper bound on inserts lost to concurrent writers during one allocation.
/// Numbers that are already taken are skipped without counting against it.
pub const MAX_CONCURRENT_RETRIES: usize = 64;

/// Render a sequence number as an account number
pub fn format_account_number(sequence: u64) -> String {
    format!("{}{:0width$}", PREFIX, sequence, width = WIDTH)
}

/// Yields account-number candidates for one allocation, starting one past
/// the current record count.
#[derive(Debug, Clone)]
pub struct AccountNumberAllocator {
    next: u64,
}

impl AccountNumberAllocator {
    pub fn starting_after(count: u64) -> Self {
        Self { next: count + 1 }
    }

    pub fn next_candidate(&mut self) -> String {
        let candidate = format_account_number(self.next);
        self.next += 1;
        candidate
    }
}
