use anyhow::Context;
use log::info;

use signed_ledger::blockchain::{Address, Blockchain, ChainConfig, Transaction, Wallet};

// Fixed key so repeated runs mine to the same address
const DEMO_SECRET_KEY: &str = "7f49dc8ea56b9eb1be1ca8a59158fa424078fb6accdb9b3e9ef50594622a8d23";

fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = ChainConfig::from_env().context("invalid chain configuration")?;
    let mut blockchain = Blockchain::with_config(config)?;

    let wallet = Wallet::from_secret_hex(DEMO_SECRET_KEY).context("invalid demo key")?;
    info!("Using wallet with address: {}", wallet.address());

    // Send 10 coins
    let mut transaction = Transaction::new(
        wallet.address().clone(),
        Address::from("public key address"),
        10.0,
    );
    transaction.sign(&wallet)?;
    blockchain.add_transaction(transaction)?;

    info!("Starting miner...");
    blockchain.mine_pending_transactions(wallet.address());

    println!(
        "Balance of my wallet is {}",
        blockchain.get_balance_of_address(wallet.address())
    );
    println!("Chain valid: {}", blockchain.is_chain_valid());

    Ok(())
}
