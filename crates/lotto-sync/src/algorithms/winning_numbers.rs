//! # Winning Number Derivation
//!
//! Maps the blocks produced after a draw block to an ordered, deduplicated
//! sequence of two-digit numbers.
//!
//! ## Rules
//!
//! 1. Only blocks with at least one transaction are candidates
//! 2. The number is the last two decimal digits of the block size
//! 3. `"00"` is never drawn
//! 4. The first block producing a number wins it; later duplicates are skipped
//!
//! A result shorter than `digits` means the draw is not resolvable yet.

use std::collections::HashSet;

use crate::domain::{Block, WinningBlock, SENTINEL_NUMBER};

/// Two-digit number drawn from a block's size.
pub fn block_number(block: &Block) -> String {
    format!("{:02}", block.size % 100)
}

/// Derive up to `digits` winning numbers from post-draw `blocks`.
///
/// `blocks` must be in ascending height order. The result is a pure
/// function of its input.
pub fn derive_winning_numbers(blocks: &[Block], digits: usize) -> Vec<WinningBlock> {
    let mut seen = HashSet::new();
    let mut numbers = Vec::with_capacity(digits);

    for block in blocks.iter().filter(|b| b.tx_count > 0) {
        if numbers.len() == digits {
            break;
        }

        let number = block_number(block);
        if number == SENTINEL_NUMBER || !seen.insert(number.clone()) {
            continue;
        }

        numbers.push(WinningBlock {
            hash: block.hash_hex(),
            number,
        });
    }

    numbers
}

/// Numeric values of a combination, in draw order.
pub fn combination_values(numbers: &[WinningBlock]) -> Vec<u32> {
    numbers.iter().map(WinningBlock::value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn block(block_no: u64, size: u64) -> Block {
        Block {
            size,
            tx_count: 1,
            hash: vec![block_no as u8],
            ..Block::at(block_no)
        }
    }

    #[test]
    fn test_block_number_zero_padded() {
        assert_eq!(block_number(&block(1, 7)), "07");
        assert_eq!(block_number(&block(1, 1234)), "34");
        assert_eq!(block_number(&block(1, 0)), "00");
    }

    #[test]
    fn test_derive_takes_first_distinct() {
        let blocks = vec![block(1, 512), block(2, 1012), block(3, 305), block(4, 899)];
        let numbers = derive_winning_numbers(&blocks, 3);
        let values: Vec<&str> = numbers.iter().map(|n| n.number.as_str()).collect();
        assert_eq!(values, vec!["12", "05", "99"]);
        assert_eq!(numbers[0].hash, "01");
    }

    #[test]
    fn test_derive_skips_sentinel() {
        let blocks = vec![block(1, 1200), block(2, 341)];
        let numbers = derive_winning_numbers(&blocks, 2);
        assert_eq!(numbers.len(), 1);
        assert_eq!(numbers[0].number, "41");
    }

    #[test]
    fn test_derive_skips_empty_blocks() {
        let mut empty = block(1, 333);
        empty.tx_count = 0;
        let numbers = derive_winning_numbers(&[empty, block(2, 444)], 1);
        assert_eq!(numbers[0].number, "44");
    }

    #[test]
    fn test_derive_short_result() {
        let blocks = vec![block(1, 111), block(2, 211)];
        assert_eq!(derive_winning_numbers(&blocks, 3).len(), 1);
    }

    #[test]
    fn test_combination_values() {
        let numbers = derive_winning_numbers(&[block(1, 104), block(2, 256)], 2);
        assert_eq!(combination_values(&numbers), vec![4, 56]);
    }

    proptest! {
        #[test]
        fn prop_never_sentinel_or_duplicate(
            sizes in proptest::collection::vec(0u64..100_000, 0..64),
            digits in 1usize..12,
        ) {
            let blocks: Vec<Block> = sizes.iter().enumerate()
                .map(|(i, size)| block(i as u64, *size))
                .collect();
            let numbers = derive_winning_numbers(&blocks, digits);

            prop_assert!(numbers.len() <= digits);
            prop_assert!(numbers.iter().all(|n| n.number != SENTINEL_NUMBER));
            let distinct: HashSet<_> = numbers.iter().map(|n| n.number.clone()).collect();
            prop_assert_eq!(distinct.len(), numbers.len());
        }

        #[test]
        fn prop_idempotent(sizes in proptest::collection::vec(0u64..100_000, 0..64)) {
            let blocks: Vec<Block> = sizes.iter().enumerate()
                .map(|(i, size)| block(i as u64, *size))
                .collect();
            prop_assert_eq!(derive_winning_numbers(&blocks, 5), derive_winning_numbers(&blocks, 5));
        }

        #[test]
        fn prop_prefix_stable(
            sizes in proptest::collection::vec(0u64..100_000, 0..64),
            extra in proptest::collection::vec(0u64..100_000, 0..16),
        ) {
            let mut blocks: Vec<Block> = sizes.iter().enumerate()
                .map(|(i, size)| block(i as u64, *size))
                .collect();
            let before = derive_winning_numbers(&blocks, 4);
            let offset = blocks.len();
            blocks.extend(extra.iter().enumerate().map(|(i, size)| block((offset + i) as u64, *size)));
            let after = derive_winning_numbers(&blocks, 4);
            prop_assert_eq!(&after[..before.len()], &before[..]);
        }
    }
}
