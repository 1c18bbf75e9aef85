//! # Domain Value Objects
//!
//! Immutable value types: parsed transaction metadata and closed draw records.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::entities::{Block, Transaction};
use super::errors::LottoError;

/// Largest number of distinct two-digit numbers a draw can produce (01..=99).
pub const MAX_DIGITS: u32 = 99;

/// Round configuration carried by a genesis transaction.
///
/// Parsed once per game instance and immutable for its lifetime.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct GameGenesisMeta {
    /// Pot a fresh round starts with.
    #[serde(alias = "basePrize")]
    pub base_prize: u64,
    /// Minimum amount a ticket purchase must transfer.
    #[serde(alias = "ticketPrice")]
    pub ticket_price: u64,
    /// Draw period length in blocks.
    #[serde(alias = "blockInterval")]
    pub block_interval: u64,
    /// Winning combination length.
    #[serde(alias = "digits")]
    pub digits: u32,
    /// Percentage of ticket revenue that goes into the pot.
    #[serde(alias = "winnerPrizeRatio")]
    pub winner_prize_ratio: u64,
}

impl GameGenesisMeta {
    /// Parse the first metadata payload of a genesis transaction.
    pub fn from_transaction(tx: &Transaction) -> Result<Self, LottoError> {
        let meta: Self = parse_first_payload(tx)?;
        meta.validate()?;
        if tx.block.block_no.checked_add(meta.block_interval).is_none() {
            return Err(LottoError::MalformedMetadata(format!(
                "block interval {} overflows the schedule from block {}",
                meta.block_interval, tx.block.block_no
            )));
        }
        Ok(meta)
    }

    fn validate(&self) -> Result<(), LottoError> {
        if self.block_interval == 0 {
            return Err(LottoError::MalformedMetadata(
                "block interval must be positive".to_string(),
            ));
        }
        if self.digits == 0 || self.digits > MAX_DIGITS {
            return Err(LottoError::MalformedMetadata(format!(
                "digits out of range: {}",
                self.digits
            )));
        }
        if self.winner_prize_ratio > 100 {
            return Err(LottoError::MalformedMetadata(format!(
                "winner prize ratio above 100%: {}",
                self.winner_prize_ratio
            )));
        }
        Ok(())
    }

    /// Pot contribution of `ticket_count` purchases at the round's ticket price.
    pub fn ticket_revenue(&self, ticket_count: u64) -> u64 {
        crate::algorithms::ticket_revenue(ticket_count, self.ticket_price, self.winner_prize_ratio)
    }
}

/// Number combination chosen on a ticket.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Combination {
    /// Structured list of numbers.
    Numbers(Vec<u32>),
    /// Free-form text as written by older wallets.
    Text(String),
}

impl Combination {
    /// Numbers in the combination, if it is structured or dash-separated.
    pub fn numbers(&self) -> Option<Vec<u32>> {
        match self {
            Combination::Numbers(numbers) => Some(numbers.clone()),
            Combination::Text(text) => text
                .split(|c: char| c == '-' || c == ',' || c.is_whitespace())
                .filter(|part| !part.is_empty())
                .map(|part| part.parse().ok())
                .collect(),
        }
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Combination::Numbers(numbers) => {
                let parts: Vec<String> = numbers.iter().map(|n| format!("{:02}", n)).collect();
                write!(f, "{}", parts.join("-"))
            }
            Combination::Text(text) => write!(f, "{}", text),
        }
    }
}

/// Metadata of a ticket purchase transaction.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct TicketMeta {
    /// Chosen numbers.
    #[serde(alias = "combination")]
    pub combination: Combination,
}

impl TicketMeta {
    /// Parse the first metadata payload of a ticket purchase transaction.
    pub fn from_transaction(tx: &Transaction) -> Result<Self, LottoError> {
        parse_first_payload(tx)
    }
}

/// Metadata payloads arrive either as JSON objects or as JSON-encoded strings.
fn parse_first_payload<T: serde::de::DeserializeOwned>(tx: &Transaction) -> Result<T, LottoError> {
    let payload = tx
        .metadata
        .first()
        .ok_or_else(|| LottoError::MalformedMetadata(format!("tx {} has no metadata", tx.id)))?;

    let parsed = match payload {
        serde_json::Value::String(raw) => serde_json::from_str(raw),
        other => serde_json::from_value(other.clone()),
    };
    parsed.map_err(|e| LottoError::MalformedMetadata(format!("tx {}: {}", tx.id, e)))
}

/// A block contributing one number to a winning combination.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WinningBlock {
    /// Hex-encoded hash of the source block.
    pub hash: String,
    /// Two-digit number taken from the block size.
    pub number: String,
}

impl WinningBlock {
    /// Numeric value of the drawn number.
    pub fn value(&self) -> u32 {
        self.number.parse().unwrap_or(0)
    }
}

/// Closed record of one draw outcome.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DrawResult {
    /// Timestamp of the draw block.
    pub draw_date: u64,
    /// Drawn numbers in draw order.
    pub numbers: Vec<WinningBlock>,
    /// Pot at draw time.
    pub prize: u64,
    /// Number of matching tickets.
    pub winner_count: usize,
}

/// A winning address for one draw.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Winner {
    /// Address the winning ticket was paid from.
    pub address: String,
    /// Accumulated prize for this address in this draw.
    pub prize: u64,
    /// Draw block the prize belongs to.
    pub draw_block: Block,
    /// Payout transaction, once observed on the ledger.
    pub reward_tx: Option<Transaction>,
}

impl Winner {
    /// Has the payout been observed?
    pub fn is_settled(&self) -> bool {
        self.reward_tx.is_some()
    }
}

/// A ticket held by an address in the active round.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TicketEntry {
    /// Hex-encoded ticket transaction hash.
    pub tx_hash: String,
    /// Chosen numbers, dash separated.
    pub combination: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tx_with(payload: serde_json::Value) -> Transaction {
        Transaction {
            id: 7,
            hash: vec![0xab, 0xcd],
            block: Block::at(1000),
            metadata: vec![payload],
        }
    }

    #[test]
    fn test_genesis_meta_pascal_case() {
        let tx = tx_with(json!({
            "BasePrize": 100000,
            "TicketPrice": 2000000,
            "BlockInterval": 500,
            "Digits": 3,
            "WinnerPrizeRatio": 70
        }));
        let meta = GameGenesisMeta::from_transaction(&tx).unwrap();
        assert_eq!(meta.block_interval, 500);
        assert_eq!(meta.digits, 3);
    }

    #[test]
    fn test_genesis_meta_from_encoded_string() {
        let raw = r#"{"basePrize":1,"ticketPrice":2,"blockInterval":3,"digits":4,"winnerPrizeRatio":50}"#;
        let tx = tx_with(json!(raw));
        let meta = GameGenesisMeta::from_transaction(&tx).unwrap();
        assert_eq!(meta.ticket_price, 2);
        assert_eq!(meta.winner_prize_ratio, 50);
    }

    #[test]
    fn test_genesis_meta_rejects_zero_interval() {
        let tx = tx_with(json!({
            "BasePrize": 1, "TicketPrice": 1, "BlockInterval": 0, "Digits": 3, "WinnerPrizeRatio": 70
        }));
        assert!(matches!(
            GameGenesisMeta::from_transaction(&tx),
            Err(LottoError::MalformedMetadata(_))
        ));
    }

    #[test]
    fn test_genesis_meta_rejects_overflowing_schedule() {
        let tx = tx_with(json!({
            "BasePrize": 1, "TicketPrice": 1, "BlockInterval": u64::MAX, "Digits": 3, "WinnerPrizeRatio": 70
        }));
        assert!(matches!(
            GameGenesisMeta::from_transaction(&tx),
            Err(LottoError::MalformedMetadata(_))
        ));

        // genesis sits at block 1000, so this draw lands exactly on u64::MAX
        let tx = tx_with(json!({
            "BasePrize": 1, "TicketPrice": 1, "BlockInterval": u64::MAX - 1000, "Digits": 3, "WinnerPrizeRatio": 70
        }));
        assert!(GameGenesisMeta::from_transaction(&tx).is_ok());
    }

    #[test]
    fn test_genesis_meta_missing_payload() {
        let mut tx = tx_with(json!({}));
        tx.metadata.clear();
        assert!(GameGenesisMeta::from_transaction(&tx).is_err());
    }

    #[test]
    fn test_ticket_meta_numbers() {
        let tx = tx_with(json!({ "Combination": [4, 17, 9] }));
        let meta = TicketMeta::from_transaction(&tx).unwrap();
        assert_eq!(meta.combination.numbers(), Some(vec![4, 17, 9]));
        assert_eq!(meta.combination.to_string(), "04-17-09");
    }

    #[test]
    fn test_ticket_meta_text() {
        let tx = tx_with(json!({ "Combination": "12-34-56" }));
        let meta = TicketMeta::from_transaction(&tx).unwrap();
        assert_eq!(meta.combination.numbers(), Some(vec![12, 34, 56]));
        assert_eq!(meta.combination.to_string(), "12-34-56");
    }

    #[test]
    fn test_combination_text_not_numeric() {
        let combination = Combination::Text("lucky".to_string());
        assert_eq!(combination.numbers(), None);
    }

    #[test]
    fn test_winning_block_value() {
        let wb = WinningBlock { hash: "00".to_string(), number: "07".to_string() };
        assert_eq!(wb.value(), 7);
    }
}
