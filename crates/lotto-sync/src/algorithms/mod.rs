//! # Algorithms Module
//!
//! Pure functions: winning number derivation and pot arithmetic.

pub mod prize;
pub mod winning_numbers;

pub use prize::{split_prize, ticket_revenue};
pub use winning_numbers::{block_number, combination_values, derive_winning_numbers};
