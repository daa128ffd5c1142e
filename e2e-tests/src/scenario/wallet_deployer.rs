//! Deploy a token wallet through the wallet deployer helper.
use std::fmt;

use alloy::primitives::{Address, U256};
use e2e::{Client, Keypair, Rejection};

use super::display_balance;
use crate::contracts::{TokenRoot, TokenWallet, TokenWalletDeployer};

/// Value the helper sends to the root.
pub const SEND_EVERS: u64 = 5_000_000_000;
/// Value the root is asked to forward to the new wallet.
pub const DEPLOY_EVERS: u64 = 9_000_000_000;

/// Native balances of the contracts taking part.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Balances {
    /// Token root.
    pub root: Option<U256>,
    /// Wallet deployer helper.
    pub deployer: Option<U256>,
    /// Wallet of the root owner.
    pub wallet: Option<U256>,
}

/// What [`run`] observed.
#[derive(Clone, Debug)]
pub struct WalletDeployerReport {
    /// Address of the token root.
    pub root: Address,
    /// Address of the helper.
    pub deployer: Address,
    /// Address the wallet has, or will have once deployed.
    pub wallet: Address,
    /// Wallet the helper reports as deployed last.
    pub last_deployed_wallet: Address,
    /// Rejection of the helper's `deployWallet`, if any.
    pub rejection: Option<Rejection>,
    /// Balances before asking the helper to deploy.
    pub before: Balances,
    /// Balances after.
    pub after: Balances,
}

impl fmt::Display for WalletDeployerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "root contract:     {}", self.root)?;
        writeln!(f, "deployer contract: {}", self.deployer)?;
        writeln!(f, "wallet contract:   {}", self.wallet)?;
        writeln!(f, "last deployed:     {}", self.last_deployed_wallet)?;
        if let Some(rejection) = &self.rejection {
            writeln!(f, "deployWallet rejected: {rejection}")?;
        }
        writeln!(
            f,
            "root balance before deploy     {}",
            display_balance(self.before.root)
        )?;
        writeln!(
            f,
            "deployer balance before deploy {}",
            display_balance(self.before.deployer)
        )?;
        writeln!(f, "root balance     {}", display_balance(self.after.root))?;
        writeln!(
            f,
            "deployer balance {}",
            display_balance(self.after.deployer)
        )?;
        write!(f, "wallet balance   {}", display_balance(self.after.wallet))
    }
}

/// Result of asking the helper for a wallet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalletRequest {
    /// Rejection of the helper's `deployWallet`, if any.
    pub rejection: Option<Rejection>,
    /// Wallet the helper reports as deployed last, zero if none.
    pub last_deployed_wallet: Address,
}

/// Ask `deployer` to have `root` deploy the wallet of `wallet_public_key`,
/// then read back which wallet it recorded.
///
/// An accepted request doesn't mean a wallet was deployed: when
/// `send_evers` can't cover `deploy_evers` the helper records nothing and
/// the zero address is reported.
///
/// # Errors
///
/// May fail if the call can't be sent or the helper can't be queried.
pub async fn request_wallet(
    deployer: &TokenWalletDeployer,
    root: Address,
    wallet_public_key: U256,
    send_evers: U256,
    deploy_evers: U256,
) -> eyre::Result<WalletRequest> {
    let outcome = deployer
        .deploy_wallet(root, wallet_public_key, send_evers, deploy_evers)
        .await?;
    let last_deployed_wallet = deployer.last_deployed_wallet().await?;
    tracing::info!(
        accepted = outcome.is_success(),
        %last_deployed_wallet,
        "wallet requested"
    );
    Ok(WalletRequest {
        rejection: outcome.rejection().cloned(),
        last_deployed_wallet,
    })
}

/// Deploy a root and a helper with one keypair, then ask the helper to
/// deploy the owner's wallet with [`SEND_EVERS`] and [`DEPLOY_EVERS`].
///
/// # Errors
///
/// May fail if a deployment or a query fails.
pub async fn run(client: &Client) -> eyre::Result<WalletDeployerReport> {
    run_with(client, U256::from(SEND_EVERS), U256::from(DEPLOY_EVERS)).await
}

/// [`run`] with explicit values.
///
/// # Errors
///
/// May fail if a deployment or a query fails.
pub async fn run_with(
    client: &Client,
    send_evers: U256,
    deploy_evers: U256,
) -> eyre::Result<WalletDeployerReport> {
    let keys = Keypair::generate();

    let root = TokenRoot::new(client, keys.clone())?;
    root.deploy().await?;
    tracing::info!(address = %root.address(), "root contract deployed");

    let deployer = TokenWalletDeployer::new(client, keys.clone())?;
    deployer.deploy().await?;
    tracing::info!(address = %deployer.address(), "deployer contract deployed");

    let wallet = TokenWallet::new(client, keys.clone(), root.address())?;

    let before = Balances {
        root: root.native_balance().await?,
        deployer: deployer.native_balance().await?,
        wallet: None,
    };

    let request = request_wallet(
        &deployer,
        root.address(),
        keys.public_key_id(),
        send_evers,
        deploy_evers,
    )
    .await?;

    let after = Balances {
        root: root.native_balance().await?,
        deployer: deployer.native_balance().await?,
        wallet: wallet.native_balance().await?,
    };

    Ok(WalletDeployerReport {
        root: root.address(),
        deployer: deployer.address(),
        wallet: wallet.address(),
        last_deployed_wallet: request.last_deployed_wallet,
        rejection: request.rejection,
        before,
        after,
    })
}
