use std::sync::atomic::AtomicBool;

use chrono::{DateTime, TimeZone, Utc};
use log::{debug, info, warn};
use thiserror::Error;

use super::block::{Block, BlockError};
use super::config::{ChainConfig, ConfigError};
use super::crypto::Address;
use super::transaction::{Transaction, TransactionError};

/// Genesis timestamp, 2021-06-27T00:00:00Z
const GENESIS_TIMESTAMP: i64 = 1_624_752_000;

/// Previous hash recorded in the genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Errors that can occur during blockchain operations
#[derive(Debug, Error)]
pub enum BlockchainError {
    #[error("Transaction error: {0}")]
    TransactionError(#[from] TransactionError),

    #[error("Block error: {0}")]
    BlockError(#[from] BlockError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

/// Represents the blockchain
#[derive(Debug, Clone)]
pub struct Blockchain {
    /// The chain of blocks, genesis first
    chain: Vec<Block>,

    /// Transactions waiting to be included in the next block
    pending_transactions: Vec<Transaction>,

    /// Mining difficulty (number of leading zeros required in hash)
    difficulty: usize,

    /// Mining reward
    mining_reward: f64,
}

impl Blockchain {
    /// Creates a new blockchain with the default configuration
    pub fn new() -> Self {
        Self::from_valid_config(ChainConfig::default())
    }

    /// Creates a new blockchain with the given difficulty and mining reward
    pub fn with_config(config: ChainConfig) -> Result<Self, BlockchainError> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: ChainConfig) -> Self {
        Blockchain {
            chain: vec![Self::create_genesis_block()],
            pending_transactions: Vec::new(),
            difficulty: config.difficulty,
            mining_reward: config.mining_reward,
        }
    }

    /// Creates the genesis block (first block in the chain)
    ///
    /// The genesis block is never mined and holds no transactions.
    pub fn create_genesis_block() -> Block {
        let timestamp: DateTime<Utc> = Utc
            .timestamp_opt(GENESIS_TIMESTAMP, 0)
            .single()
            .unwrap_or_default();

        Block::new(timestamp, Vec::new(), GENESIS_PREVIOUS_HASH.to_string())
    }

    /// Gets the last block in the chain
    pub fn get_latest_block(&self) -> &Block {
        // The genesis block is always present
        &self.chain[self.chain.len() - 1]
    }

    /// Adds a new transaction to the pending transactions
    ///
    /// The transaction must name a sender and a recipient and carry a valid
    /// signature. Sender balances are not checked.
    pub fn add_transaction(&mut self, transaction: Transaction) -> Result<(), BlockchainError> {
        if let Err(err) = Self::check_admission(&transaction) {
            warn!("Rejected transaction {}: {}", transaction.calculate_hash(), err);
            return Err(err.into());
        }

        debug!("Accepted transaction {}", transaction.calculate_hash());
        self.pending_transactions.push(transaction);

        Ok(())
    }

    fn check_admission(transaction: &Transaction) -> Result<(), TransactionError> {
        match &transaction.from_address {
            Some(sender) if !sender.is_empty() => {}
            _ => return Err(TransactionError::MissingSender),
        }

        if transaction.to_address.is_empty() {
            return Err(TransactionError::MissingRecipient);
        }

        transaction.verify()
    }

    /// Mines a new block with the pending transactions plus a reward for
    /// `mining_reward_address`
    ///
    /// Blocks until proof of work completes. The pending pool is empty
    /// afterwards.
    pub fn mine_pending_transactions(&mut self, mining_reward_address: &Address) -> &Block {
        let mut block = self.next_block(mining_reward_address);
        block.mine(self.difficulty);

        self.pending_transactions.clear();
        self.append(block)
    }

    /// Like [`Blockchain::mine_pending_transactions`], but stops when `stop`
    /// is set
    ///
    /// A cancelled run leaves the chain and the pending pool unchanged.
    pub fn mine_pending_transactions_cancellable(
        &mut self,
        mining_reward_address: &Address,
        stop: &AtomicBool,
    ) -> Result<&Block, BlockchainError> {
        let mut block = self.next_block(mining_reward_address);

        if let Err(err) = block.mine_cancellable(self.difficulty, stop) {
            warn!("Mining aborted: {}", err);
            return Err(err.into());
        }

        self.pending_transactions.clear();
        Ok(self.append(block))
    }

    fn next_block(&self, mining_reward_address: &Address) -> Block {
        let mut transactions = self.pending_transactions.clone();
        transactions.push(Transaction::new_reward(
            mining_reward_address.clone(),
            self.mining_reward,
        ));

        Block::new(Utc::now(), transactions, self.get_latest_block().hash.clone())
    }

    fn append(&mut self, block: Block) -> &Block {
        info!(
            "Appending block {} with {} transactions at height {}",
            block.hash,
            block.transactions.len(),
            self.chain.len()
        );

        let index = self.chain.len();
        self.chain.push(block);
        &self.chain[index]
    }

    /// Computes the balance of `address` by replaying every transaction
    pub fn get_balance_of_address(&self, address: &Address) -> f64 {
        let mut balance = 0.0;

        for block in &self.chain {
            for transaction in &block.transactions {
                if transaction.from_address.as_ref() == Some(address) {
                    balance -= transaction.amount;
                }

                if transaction.to_address == *address {
                    balance += transaction.amount;
                }
            }
        }

        balance
    }

    /// Validates the blockchain
    ///
    /// Every block after genesis must hold valid transactions, carry the hash
    /// of its own contents and point at the hash of its predecessor.
    pub fn is_chain_valid(&self) -> bool {
        for (i, pair) in self.chain.windows(2).enumerate() {
            let previous_block = &pair[0];
            let current_block = &pair[1];
            let height = i + 1;

            if !current_block.has_valid_transactions() {
                warn!("Block {} holds an invalid transaction", height);
                return false;
            }

            if current_block.hash != current_block.calculate_hash() {
                warn!("Block {} hash does not match its contents", height);
                return false;
            }

            if current_block.previous_hash != previous_block.hash {
                warn!("Block {} does not link to block {}", height, i);
                return false;
            }
        }

        true
    }

    /// Gets the entire blockchain
    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    /// Gets all pending transactions
    pub fn pending_transactions(&self) -> &[Transaction] {
        &self.pending_transactions
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    pub fn mining_reward(&self) -> f64 {
        self.mining_reward
    }

    /// Number of blocks, genesis included
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Always false, a chain holds at least its genesis block
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}
