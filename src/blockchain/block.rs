use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::crypto::sha256_hex;
use super::transaction::Transaction;

/// Errors that can occur while sealing a block
#[derive(Debug, Error)]
pub enum BlockError {
    #[error("Mining cancelled at nonce {nonce}")]
    MiningCancelled { nonce: u64 },
}

/// Returns true if `hash` starts with `difficulty` zero characters
pub fn meets_difficulty(hash: &str, difficulty: usize) -> bool {
    hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
}

/// Represents a block in the blockchain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    /// Timestamp when the block was created
    pub timestamp: DateTime<Utc>,

    /// List of transactions included in this block
    pub transactions: Vec<Transaction>,

    /// Hash of the previous block
    pub previous_hash: String,

    /// Proof of work
    pub nonce: u64,

    /// Hash of the current block
    pub hash: String,
}

impl Block {
    /// Creates a new block with a nonce of zero and its hash already computed
    pub fn new(timestamp: DateTime<Utc>, transactions: Vec<Transaction>, previous_hash: String) -> Self {
        let mut block = Block {
            timestamp,
            transactions,
            previous_hash,
            nonce: 0,
            hash: String::new(),
        };

        block.hash = block.calculate_hash();
        block
    }

    /// Calculates the hash of the block
    ///
    /// # Returns
    ///
    /// The SHA-256 hash of the block as a hexadecimal string
    pub fn calculate_hash(&self) -> String {
        let block_data = serde_json::json!({
            "timestamp": self.timestamp,
            "transactions": self.transactions,
            "previous_hash": self.previous_hash,
            "nonce": self.nonce,
        });

        sha256_hex(block_data.to_string().as_bytes())
    }

    /// Searches for a nonce whose hash meets `difficulty`
    ///
    /// Blocks until a matching hash is found.
    pub fn mine(&mut self, difficulty: usize) {
        let never = AtomicBool::new(false);
        // Only the stop flag can end the search early, and it is never set.
        let _ = self.mine_cancellable(difficulty, &never);
    }

    /// Like [`Block::mine`], but gives up as soon as `stop` is set
    ///
    /// On cancellation the block keeps the last nonce tried and does not meet
    /// the target.
    pub fn mine_cancellable(&mut self, difficulty: usize, stop: &AtomicBool) -> Result<(), BlockError> {
        while !meets_difficulty(&self.hash, difficulty) {
            if stop.load(Ordering::Relaxed) {
                return Err(BlockError::MiningCancelled { nonce: self.nonce });
            }

            self.nonce += 1;
            self.hash = self.calculate_hash();
        }

        info!("Block mined: {}", self.hash);
        Ok(())
    }

    /// Checks that every transaction in the block is valid
    pub fn has_valid_transactions(&self) -> bool {
        self.transactions.iter().all(Transaction::is_valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::crypto::{Address, Wallet};
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_new_block() {
        let transactions = vec![
            Transaction::new_reward(Address::from("recipient1"), 10.0),
            Transaction::new_reward(Address::from("recipient2"), 20.0),
        ];

        let block = Block::new(fixed_time(), transactions, "previous_hash".to_string());

        assert_eq!(block.nonce, 0);
        assert_eq!(block.previous_hash, "previous_hash");
        assert_eq!(block.transactions.len(), 2);
        assert_eq!(block.hash, block.calculate_hash());
    }

    #[test]
    fn test_calculate_hash() {
        let transactions = vec![Transaction::new_reward(Address::from("recipient"), 10.0)];

        let block = Block::new(fixed_time(), transactions, "previous_hash".to_string());

        let hash = block.calculate_hash();
        assert_eq!(hash.len(), 64); // SHA-256 hash is 64 characters in hex
        assert_eq!(hash, block.calculate_hash());
    }

    #[test]
    fn test_hash_changes_with_contents() {
        let mut block = Block::new(
            fixed_time(),
            vec![Transaction::new_reward(Address::from("miner"), 10.0)],
            "0".to_string(),
        );
        let original = block.calculate_hash();

        block.nonce += 1;
        assert_ne!(original, block.calculate_hash());
        block.nonce -= 1;

        block.transactions[0].amount = 11.0;
        assert_ne!(original, block.calculate_hash());
        block.transactions[0].amount = 10.0;

        block.previous_hash = "1".to_string();
        assert_ne!(original, block.calculate_hash());
    }

    #[test]
    fn test_meets_difficulty() {
        assert!(meets_difficulty("00ab", 2));
        assert!(meets_difficulty("000b", 2));
        assert!(!meets_difficulty("0a0b", 2));
        assert!(meets_difficulty("abcd", 0));
        assert!(!meets_difficulty("00", 3));
    }

    #[test]
    fn test_mine_finds_smallest_nonce() {
        let mut block = Block::new(
            fixed_time(),
            vec![Transaction::new_reward(Address::from("miner"), 100.0)],
            "0".to_string(),
        );

        block.mine(2);

        assert!(block.hash.starts_with("00"));
        assert_eq!(block.hash, block.calculate_hash());

        let mut probe = block.clone();
        for nonce in 0..block.nonce {
            probe.nonce = nonce;
            assert!(!meets_difficulty(&probe.calculate_hash(), 2));
        }
    }

    #[test]
    fn test_mine_cancelled() {
        let mut block = Block::new(fixed_time(), Vec::new(), "0".to_string());
        let stop = AtomicBool::new(true);

        // 64 zeros is unreachable, so only the flag can end the search
        let result = block.mine_cancellable(64, &stop);

        assert!(matches!(result, Err(BlockError::MiningCancelled { nonce: 0 })));
        assert_eq!(block.nonce, 0);
        assert_eq!(block.hash, block.calculate_hash());
    }

    #[test]
    fn test_has_valid_transactions() {
        let wallet = Wallet::new();
        let mut signed = Transaction::new(wallet.address().clone(), Address::from("bob"), 5.0);
        signed.sign(&wallet).unwrap();
        let reward = Transaction::new_reward(wallet.address().clone(), 100.0);

        let block = Block::new(fixed_time(), vec![signed.clone(), reward.clone()], "0".to_string());
        assert!(block.has_valid_transactions());

        let unsigned = Transaction::new(wallet.address().clone(), Address::from("bob"), 5.0);
        let block = Block::new(fixed_time(), vec![signed, unsigned, reward], "0".to_string());
        assert!(!block.has_valid_transactions());
    }
}
