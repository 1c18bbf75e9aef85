//! # Prize Arithmetic
//!
//! Integer pot accounting. All amounts are currency units.

/// Pot contribution of `ticket_count` tickets.
///
/// `ticket_count × ticket_price × ratio_percent / 100`, truncated and
/// saturating at `u64::MAX`.
pub fn ticket_revenue(ticket_count: u64, ticket_price: u64, ratio_percent: u64) -> u64 {
    u128::from(ticket_count)
        .checked_mul(u128::from(ticket_price))
        .and_then(|v| v.checked_mul(u128::from(ratio_percent)))
        .map_or(u64::MAX, |v| u64::try_from(v / 100).unwrap_or(u64::MAX))
}

/// Even share of `pot` per winning ticket.
///
/// The division residue is dropped, not redistributed.
pub fn split_prize(pot: u64, winning_tickets: usize) -> u64 {
    match u64::try_from(winning_tickets) {
        Ok(0) | Err(_) => 0,
        Ok(n) => pot / n,
    }
}
