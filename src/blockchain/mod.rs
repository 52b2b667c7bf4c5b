// Blockchain module
//
// This module contains the ledger engine:
// - Cryptography utilities (hashing, addresses, signatures, wallets)
// - Transaction structure
// - Block structure and proof of work
// - Chain configuration
// - Blockchain structure

pub mod block;
pub mod chain;
pub mod config;
pub mod crypto;
pub mod transaction;

// Re-export main components for easier access
pub use block::{Block, BlockError};
pub use chain::{Blockchain, BlockchainError};
pub use config::{ChainConfig, ConfigError};
pub use crypto::{Address, CryptoError, DigitalSignature, Signer, Wallet};
pub use transaction::{ErrorKind, Transaction, TransactionError};
