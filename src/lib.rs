//! A single-node ledger of signed transactions sealed into proof-of-work blocks.
//!
//! ```no_run
//! use signed_ledger::blockchain::{Address, Blockchain, Transaction, Wallet};
//!
//! let wallet = Wallet::new();
//! let mut chain = Blockchain::new();
//!
//! let mut tx = Transaction::new(wallet.address().clone(), Address::from("recipient"), 10.0);
//! tx.sign(&wallet).unwrap();
//! chain.add_transaction(tx).unwrap();
//!
//! chain.mine_pending_transactions(wallet.address());
//! assert_eq!(chain.get_balance_of_address(wallet.address()), 90.0);
//! ```

pub mod blockchain;
