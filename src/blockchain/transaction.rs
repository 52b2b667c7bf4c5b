use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::crypto::{sha256_digest, verify_signature, Address, CryptoError, DigitalSignature, Signer};

/// Errors that can occur during transaction operations
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("Cannot sign transactions for other wallets: signer {signer}, sender {sender}")]
    Unauthorized { signer: String, sender: String },

    #[error("No signature in this transaction")]
    MissingSignature,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Transaction must include a sender address")]
    MissingSender,

    #[error("Transaction must include a recipient address")]
    MissingRecipient,

    #[error("Crypto error: {0}")]
    CryptoError(#[from] CryptoError),
}

/// Broad category of a [`TransactionError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The signer is not allowed to act for the declared sender
    Authorization,
    /// The transaction is malformed or its signature does not hold
    Validation,
}

impl TransactionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransactionError::Unauthorized { .. } => ErrorKind::Authorization,
            _ => ErrorKind::Validation,
        }
    }
}

/// Represents a transfer of value between two addresses
///
/// A transaction without a sender is a mining reward. Reward transactions are
/// never signed and are always considered valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Sender's address, `None` for mining rewards
    pub from_address: Option<Address>,

    /// Recipient's address
    pub to_address: Address,

    /// Amount being transferred
    pub amount: f64,

    /// Signature over the transaction hash
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<DigitalSignature>,
}

impl Transaction {
    /// Creates a new unsigned transaction
    ///
    /// No validation happens here; admission into a chain checks the
    /// addresses and the signature.
    pub fn new(from_address: Address, to_address: Address, amount: f64) -> Self {
        Transaction {
            from_address: Some(from_address),
            to_address,
            amount,
            signature: None,
        }
    }

    /// Creates a mining reward transaction
    pub fn new_reward(to_address: Address, amount: f64) -> Self {
        Transaction {
            from_address: None,
            to_address,
            amount,
            signature: None,
        }
    }

    /// Checks if the transaction is a mining reward
    pub fn is_reward(&self) -> bool {
        self.from_address.is_none()
    }

    fn digest(&self) -> [u8; 32] {
        let from = self.from_address.as_ref().map(Address::as_str).unwrap_or_default();
        let payload = format!("{}{}{}", from, self.to_address, self.amount);
        sha256_digest(payload.as_bytes())
    }

    /// Calculates the hash of the sender, recipient and amount
    ///
    /// The hash is never cached; it always reflects the current fields.
    pub fn calculate_hash(&self) -> String {
        hex::encode(self.digest())
    }

    /// Signs the transaction
    ///
    /// Fails with [`TransactionError::Unauthorized`] unless the signer's
    /// address is the transaction's sender. The signature is left untouched
    /// on failure.
    pub fn sign<S: Signer + ?Sized>(&mut self, signer: &S) -> Result<(), TransactionError> {
        let signer_address = signer.address();

        match &self.from_address {
            Some(sender) if *sender == signer_address => {}
            sender => {
                return Err(TransactionError::Unauthorized {
                    signer: signer_address.0,
                    sender: sender.as_ref().map(|a| a.0.clone()).unwrap_or_default(),
                })
            }
        }

        let signature = signer.sign_hash(&self.digest())?;
        self.signature = Some(signature);

        Ok(())
    }

    /// Verifies the transaction, reporting why it is invalid
    pub fn verify(&self) -> Result<(), TransactionError> {
        let sender = match &self.from_address {
            Some(sender) => sender,
            None => return Ok(()),
        };

        let signature = match &self.signature {
            Some(sig) if !sig.is_empty() => sig,
            _ => return Err(TransactionError::MissingSignature),
        };

        if verify_signature(sender, &self.digest(), signature)? {
            Ok(())
        } else {
            Err(TransactionError::InvalidSignature)
        }
    }

    /// Checks whether the transaction is valid
    ///
    /// Reward transactions are always valid. Unsigned, malformed or
    /// wrongly signed transactions yield `false`.
    pub fn is_valid(&self) -> bool {
        match self.verify() {
            Ok(()) => true,
            Err(err) => {
                debug!("Transaction {} is invalid: {}", self.calculate_hash(), err);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::crypto::Wallet;

    #[test]
    fn test_new_transaction() {
        let sender_wallet = Wallet::new();
        let recipient_wallet = Wallet::new();

        let transaction = Transaction::new(
            sender_wallet.address().clone(),
            recipient_wallet.address().clone(),
            10.5,
        );

        assert_eq!(transaction.from_address.as_ref(), Some(sender_wallet.address()));
        assert_eq!(transaction.to_address, *recipient_wallet.address());
        assert_eq!(transaction.amount, 10.5);
        assert!(transaction.signature.is_none());
        assert!(!transaction.is_reward());
    }

    #[test]
    fn test_hash_determinism() {
        let tx = Transaction::new(Address::from("alice"), Address::from("bob"), 10.0);
        assert_eq!(tx.calculate_hash(), tx.calculate_hash());
        assert_eq!(tx.calculate_hash().len(), 64);

        let other_sender = Transaction::new(Address::from("carol"), Address::from("bob"), 10.0);
        let other_recipient = Transaction::new(Address::from("alice"), Address::from("carol"), 10.0);
        let other_amount = Transaction::new(Address::from("alice"), Address::from("bob"), 11.0);

        assert_ne!(tx.calculate_hash(), other_sender.calculate_hash());
        assert_ne!(tx.calculate_hash(), other_recipient.calculate_hash());
        assert_ne!(tx.calculate_hash(), other_amount.calculate_hash());
    }

    #[test]
    fn test_hash_ignores_signature() {
        let wallet = Wallet::new();
        let mut tx = Transaction::new(wallet.address().clone(), Address::from("bob"), 1.0);
        let before = tx.calculate_hash();
        tx.sign(&wallet).unwrap();
        assert_eq!(before, tx.calculate_hash());
    }

    #[test]
    fn test_sign_transaction() {
        let sender_wallet = Wallet::new();
        let recipient_wallet = Wallet::new();

        let mut transaction = Transaction::new(
            sender_wallet.address().clone(),
            recipient_wallet.address().clone(),
            10.5,
        );

        transaction.sign(&sender_wallet).unwrap();

        assert!(transaction.signature.is_some());
        assert!(transaction.verify().is_ok());
        assert!(transaction.is_valid());
    }

    #[test]
    fn test_signature_from_other_key_is_invalid() {
        let sender_wallet = Wallet::new();
        let forger = Wallet::new();

        let mut forged = Transaction::new(forger.address().clone(), Address::from("bob"), 5.0);
        forged.sign(&forger).unwrap();

        // Same fields, but claiming to come from the real sender
        forged.from_address = Some(sender_wallet.address().clone());

        assert!(!forged.is_valid());
        assert!(matches!(forged.verify(), Err(TransactionError::InvalidSignature)));
    }

    #[test]
    fn test_tampered_amount_is_invalid() {
        let wallet = Wallet::new();
        let mut tx = Transaction::new(wallet.address().clone(), Address::from("bob"), 5.0);
        tx.sign(&wallet).unwrap();

        tx.amount = 500.0;
        assert!(!tx.is_valid());
    }

    #[test]
    fn test_cannot_sign_for_other_wallet() {
        let owner = Wallet::new();
        let intruder = Wallet::new();

        let mut tx = Transaction::new(owner.address().clone(), Address::from("bob"), 5.0);
        let err = tx.sign(&intruder).unwrap_err();

        assert!(matches!(err, TransactionError::Unauthorized { .. }));
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert!(tx.signature.is_none());
    }

    #[test]
    fn test_cannot_sign_reward() {
        let wallet = Wallet::new();
        let mut reward = Transaction::new_reward(wallet.address().clone(), 100.0);

        assert!(reward.sign(&wallet).is_err());
        assert!(reward.signature.is_none());
    }

    #[test]
    fn test_missing_signature() {
        let wallet = Wallet::new();
        let mut tx = Transaction::new(wallet.address().clone(), Address::from("bob"), 5.0);

        let err = tx.verify().unwrap_err();
        assert!(matches!(err, TransactionError::MissingSignature));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(!tx.is_valid());

        tx.signature = Some(DigitalSignature(String::new()));
        assert!(matches!(tx.verify(), Err(TransactionError::MissingSignature)));
    }

    #[test]
    fn test_malformed_sender_is_invalid() {
        let wallet = Wallet::new();
        let mut tx = Transaction::new(Address::from("not-a-key"), Address::from("bob"), 5.0);
        tx.signature = Some(wallet.sign(b"whatever"));

        assert!(matches!(tx.verify(), Err(TransactionError::CryptoError(_))));
        assert!(!tx.is_valid());
    }

    #[test]
    fn test_reward_transaction() {
        let miner_wallet = Wallet::new();

        let transaction = Transaction::new_reward(miner_wallet.address().clone(), 50.0);

        assert!(transaction.from_address.is_none());
        assert_eq!(transaction.to_address, *miner_wallet.address());
        assert_eq!(transaction.amount, 50.0);
        assert!(transaction.is_reward());
        assert!(transaction.is_valid());
    }
}
