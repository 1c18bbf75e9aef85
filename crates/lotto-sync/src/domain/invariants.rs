//! # Domain Invariants
//!
//! Rules the derived state must always satisfy, plus the game constants.

use super::errors::LottoError;

/// Ledger height below which no game ever existed.
pub const HARD_CHECKPOINT: u64 = 4_934_993;

/// Blocks processed per crawl window.
pub const BLOCK_CRAWL_COUNT: u64 = 70;

/// Entries kept in each history list.
pub const HISTORY_CAPACITY: usize = 10;

/// Completed rounds the checkpoint scan tries to cover.
pub const CHECKPOINT_ROUNDS: u64 = 10;

/// Candidate blocks inspected when deriving winning numbers.
pub const WINNING_LOOKAHEAD: usize = 32;

/// Number value reserved as non-significant entropy.
pub const SENTINEL_NUMBER: &str = "00";

/// Invariant: history lists never exceed their capacity.
pub fn invariant_history_bounded(len: usize, capacity: usize) -> Result<(), LottoError> {
    if len > capacity {
        return Err(LottoError::InvariantViolation(format!(
            "history holds {} entries, capacity is {}",
            len, capacity
        )));
    }
    Ok(())
}

/// Invariant: an active round never schedules its draw before the previous one.
pub fn invariant_draw_schedule(prev_draw: u64, next_draw: u64) -> Result<(), LottoError> {
    if prev_draw > next_draw {
        return Err(LottoError::InvariantViolation(format!(
            "previous draw {} is after next draw {}",
            prev_draw, next_draw
        )));
    }
    Ok(())
}

/// Invariant: a start block never precedes the hard checkpoint.
pub fn invariant_above_checkpoint(block_no: u64, hard_checkpoint: u64) -> Result<(), LottoError> {
    if block_no < hard_checkpoint {
        return Err(LottoError::InvariantViolation(format!(
            "block {} is below hard checkpoint {}",
            block_no, hard_checkpoint
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_bounded() {
        assert!(invariant_history_bounded(10, HISTORY_CAPACITY).is_ok());
        assert!(invariant_history_bounded(11, HISTORY_CAPACITY).is_err());
    }

    #[test]
    fn test_draw_schedule() {
        assert!(invariant_draw_schedule(1000, 1500).is_ok());
        assert!(invariant_draw_schedule(1500, 1500).is_ok());
        assert!(matches!(
            invariant_draw_schedule(2000, 1500),
            Err(LottoError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_above_checkpoint() {
        assert!(invariant_above_checkpoint(HARD_CHECKPOINT, HARD_CHECKPOINT).is_ok());
        assert!(invariant_above_checkpoint(HARD_CHECKPOINT - 1, HARD_CHECKPOINT).is_err());
    }
}
