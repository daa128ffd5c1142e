//! Deploy wallets for two users, mint into them and move tokens between
//! them, checking balances and total supply after every step.
use std::fmt;

use alloy::primitives::{Address, U256};
use e2e::{ensure, ensure_eq, Client, Keypair};

use crate::contracts::{
    exit_code, TokenRoot, TokenWallet, WalletDeploy, MIN_WALLET_DEPLOY_VALUE,
};

/// Tokens the first wallet is deployed with.
pub const INITIAL_TOKENS: u128 = 1_000_000_000;
/// Tokens minted into a deployed wallet.
pub const MINTED_TOKENS: u128 = 1_000_000_000;
/// Tokens moved from the first user to the second.
pub const TRANSFERRED_TOKENS: u128 = 500_000_000;
/// Native value a new wallet is deployed with.
pub const WALLET_DEPLOY_EVERS: u64 = 200_000_000;

/// What [`run`] observed once every check passed.
#[derive(Clone, Debug)]
pub struct MintTransferReport {
    /// Address of the token root.
    pub root: Address,
    /// Wallet of the first user.
    pub sender: Address,
    /// Wallet of the second user, deployed by the transfer.
    pub recipient: Address,
    /// Final total supply.
    pub total_supply: U256,
    /// Final token balance of the first user.
    pub sender_tokens: U256,
    /// Final token balance of the second user.
    pub recipient_tokens: U256,
}

impl fmt::Display for MintTransferReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "root contract:    {}", self.root)?;
        writeln!(f, "sender wallet:    {}", self.sender)?;
        writeln!(f, "recipient wallet: {}", self.recipient)?;
        writeln!(f, "total supply      {}", self.total_supply)?;
        writeln!(f, "sender tokens     {}", self.sender_tokens)?;
        write!(f, "recipient tokens  {}", self.recipient_tokens)
    }
}

/// Run the scenario with fresh keys for the root owner and both users.
///
/// # Errors
///
/// May fail if a step fails or a check doesn't hold.
pub async fn run(client: &Client) -> eyre::Result<MintTransferReport> {
    let owner = Keypair::generate();
    let sender_keys = Keypair::generate();
    let recipient_keys = Keypair::generate();

    let root = TokenRoot::new(client, owner)?;
    root.deploy().await?;
    let sender = TokenWallet::new(client, sender_keys.clone(), root.address())?;
    let recipient =
        TokenWallet::new(client, recipient_keys.clone(), root.address())?;
    let deploy_evers = U256::from(WALLET_DEPLOY_EVERS);

    // Wallet deployment must carry enough value.
    let request = WalletDeploy {
        wallet_public_key: sender_keys.public_key_id(),
        tokens: INITIAL_TOKENS,
        deploy_evers,
        value: U256::from(1),
    };
    root.deploy_wallet(request)
        .await?
        .expect_exit_code(exit_code::LOW_DEPLOY_VALUE)?;
    let request =
        WalletDeploy { value: U256::from(MIN_WALLET_DEPLOY_VALUE), ..request };
    root.deploy_wallet(request)
        .await?
        .expect_exit_code(exit_code::NOT_ENOUGH_BALANCE)?;

    let request = WalletDeploy { value: deploy_evers * U256::from(2), ..request };
    let deployed = root.deploy_wallet(request).await?.into_success()?;
    ensure_eq(deployed, sender.address(), "address of the deployed wallet")?;
    ensure_eq(
        sender.token_balance().await?,
        Some(U256::from(INITIAL_TOKENS)),
        "sender tokens after deployment",
    )?;

    root.mint(MINTED_TOKENS, sender.address()).await?.into_success()?;
    let minted = U256::from(INITIAL_TOKENS + MINTED_TOKENS);
    ensure_eq(
        sender.token_balance().await?,
        Some(minted),
        "sender tokens after mint",
    )?;
    let supply = root.total_supply().await?;
    ensure_eq(supply, minted, "total supply after mint")?;

    // Minting into a wallet that doesn't exist bounces.
    let bounced = root.mint(MINTED_TOKENS, recipient.address()).await?;
    tracing::info!(
        accepted = bounced.is_success(),
        "minted into an undeployed wallet"
    );
    ensure_eq(
        root.total_supply().await?,
        supply,
        "total supply after bounced mint",
    )?;
    ensure_eq(
        recipient.token_balance().await?,
        None,
        "recipient tokens after bounced mint",
    )?;

    // A transfer that can't pay for the recipient's wallet moves nothing.
    let short = sender
        .transfer_to_recipient(
            recipient_keys.public_key_id(),
            TRANSFERRED_TOKENS,
            deploy_evers,
            deploy_evers - U256::from(1),
        )
        .await?;
    tracing::info!(
        accepted = short.is_success(),
        "transfer without enough value for deployment"
    );
    ensure_eq(
        sender.token_balance().await?,
        Some(minted),
        "sender tokens after underfunded transfer",
    )?;
    ensure(
        recipient.token_balance().await?.unwrap_or_default().is_zero(),
        "recipient received tokens from an underfunded transfer",
    )?;

    sender
        .transfer_to_recipient(
            recipient_keys.public_key_id(),
            TRANSFERRED_TOKENS,
            deploy_evers,
            deploy_evers,
        )
        .await?
        .into_success()?;
    let sender_tokens = minted - U256::from(TRANSFERRED_TOKENS);
    let recipient_tokens = U256::from(TRANSFERRED_TOKENS);
    ensure_eq(
        sender.token_balance().await?,
        Some(sender_tokens),
        "sender tokens after transfer",
    )?;
    ensure_eq(
        recipient.token_balance().await?,
        Some(recipient_tokens),
        "recipient tokens after transfer",
    )?;
    let total_supply = root.total_supply().await?;
    ensure_eq(total_supply, minted, "total supply after transfer")?;

    Ok(MintTransferReport {
        root: root.address(),
        sender: sender.address(),
        recipient: recipient.address(),
        total_supply,
        sender_tokens,
        recipient_tokens,
    })
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;

    use super::*;

    #[test]
    fn report_lists_final_balances() {
        let report = MintTransferReport {
            root: address!("00000000000000000000000000000000000000aa"),
            sender: address!("00000000000000000000000000000000000000bb"),
            recipient: address!("00000000000000000000000000000000000000cc"),
            total_supply: U256::from(2_000_000_000_u64),
            sender_tokens: U256::from(1_500_000_000_u64),
            recipient_tokens: U256::from(500_000_000_u64),
        };

        let text = report.to_string();
        assert!(text.contains("total supply      2000000000"));
        assert!(text.contains("sender tokens     1500000000"));
        assert!(text.ends_with("recipient tokens  500000000"));
    }
}
