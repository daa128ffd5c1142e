//! Typed handles over the token contracts.
//!
//! Each handle wraps an [`Account`] and knows the init data and method
//! signatures of one contract, so scenarios never spell out argument names.
use std::sync::Arc;

use alloy::primitives::{Address, U256};
use e2e::{
    Account, Client, ContractArtifact, DeployOptions, Keypair, Outcome,
    RunResult,
};
use serde_json::json;

use crate::abi::{
    missing_methods, TOKEN_ROOT_METHODS, TOKEN_WALLET_DEPLOYER_METHODS,
    TOKEN_WALLET_METHODS,
};

/// Artifact name of the token root.
pub const TOKEN_ROOT: &str = "TokenRoot";
/// Artifact name of the token wallet.
pub const TOKEN_WALLET: &str = "TokenWallet";
/// Artifact name of the wallet deployer helper.
pub const TOKEN_WALLET_DEPLOYER: &str = "TokenWalletDeployer";

/// Smallest value the root accepts alongside a wallet deployment.
pub const MIN_WALLET_DEPLOY_VALUE: u64 = 100_000_000;

/// Exit codes raised by the token contracts.
pub mod exit_code {
    /// Attached value is below [`super::MIN_WALLET_DEPLOY_VALUE`].
    pub const LOW_DEPLOY_VALUE: u32 = 102;
    /// Attached value does not cover the requested deploy value.
    pub const NOT_ENOUGH_BALANCE: u32 = 103;
}

/// Fail unless `artifact` has every method in `expected`.
fn check_methods(
    artifact: &ContractArtifact,
    expected: &[&str],
) -> eyre::Result<()> {
    let missing = missing_methods(&artifact.abi, expected);
    if !missing.is_empty() {
        eyre::bail!(
            "artifact `{}` lacks {}",
            artifact.name,
            missing.join(", ")
        );
    }
    Ok(())
}

/// Root of a token: mints tokens and deploys wallets.
#[derive(Clone, Debug)]
pub struct TokenRoot {
    account: Account,
}

/// Arguments of [`TokenRoot::deploy_wallet`].
#[derive(Clone, Copy, Debug)]
pub struct WalletDeploy {
    /// Public key id of the wallet owner.
    pub wallet_public_key: U256,
    /// Tokens minted into the new wallet.
    pub tokens: u128,
    /// Native value the root forwards to the new wallet.
    pub deploy_evers: U256,
    /// Native value attached to the call.
    pub value: U256,
}

impl TokenRoot {
    /// Handle of the root owned by `owner`.
    ///
    /// # Errors
    ///
    /// May fail if an artifact can't be loaded or lacks a method.
    pub fn new(client: &Client, owner: Keypair) -> eyre::Result<Self> {
        let wallet = client.artifact(TOKEN_WALLET)?;
        let artifact = client.artifact(TOKEN_ROOT)?;
        check_methods(&artifact, TOKEN_ROOT_METHODS)?;
        let account = Account::new(
            artifact,
            owner,
            client.clone(),
            json!({ "wallet_code": wallet.code }),
        )?;
        Ok(Self { account })
    }

    /// Underlying account.
    #[must_use]
    pub fn account(&self) -> &Account {
        &self.account
    }

    /// Address of the root.
    #[must_use]
    pub fn address(&self) -> Address {
        self.account.address()
    }

    /// Deploy the root with funds from the giver.
    ///
    /// # Errors
    ///
    /// May fail if funding or deployment fails.
    pub async fn deploy(&self) -> eyre::Result<()> {
        self.account.deploy(DeployOptions::with_giver()).await?;
        Ok(())
    }

    /// Deploy a wallet for `request.wallet_public_key`.
    ///
    /// Returns the address of the new wallet.
    ///
    /// # Errors
    ///
    /// May fail if the call can't be sent.
    pub async fn deploy_wallet(
        &self,
        request: WalletDeploy,
    ) -> eyre::Result<Outcome<Address>> {
        let outcome = self
            .account
            .call(
                "deployWallet",
                json!({
                    "tokens": request.tokens.to_string(),
                    "deploy_evers": request.deploy_evers.to_string(),
                    "wallet_public_key": request.wallet_public_key.to_string(),
                }),
            )
            .value(request.value)
            .run()
            .await?;

        Ok(match outcome {
            Outcome::Success(result) => {
                Outcome::Success(result.output.address("value0")?)
            }
            Outcome::Rejected(rejection) => Outcome::Rejected(rejection),
        })
    }

    /// Mint `tokens` into the wallet at `to`.
    ///
    /// # Errors
    ///
    /// May fail if the call can't be sent.
    pub async fn mint(
        &self,
        tokens: u128,
        to: Address,
    ) -> eyre::Result<Outcome<RunResult>> {
        self.account
            .run("mint", json!({ "tokens": tokens.to_string(), "to": to }))
            .await
    }

    /// Tokens minted so far.
    ///
    /// # Errors
    ///
    /// May fail if the root isn't deployed or can't be queried.
    pub async fn total_supply(&self) -> eyre::Result<U256> {
        self.account
            .run_local("totalSupply", json!({}))
            .await?
            .uint("value0")
    }

    /// Native balance of the root, `None` if it doesn't exist.
    ///
    /// # Errors
    ///
    /// May fail if the node can't be queried.
    pub async fn native_balance(&self) -> eyre::Result<Option<U256>> {
        self.account.balance().await
    }
}

/// Token wallet owned by one public key.
#[derive(Clone, Debug)]
pub struct TokenWallet {
    account: Account,
}

impl TokenWallet {
    /// Handle of the wallet of `owner` under the root at `root`.
    ///
    /// The wallet needn't be deployed: its address is the one the root
    /// deploys it at.
    ///
    /// # Errors
    ///
    /// May fail if the wallet artifact can't be loaded or lacks a method.
    pub fn new(
        client: &Client,
        owner: Keypair,
        root: Address,
    ) -> eyre::Result<Self> {
        let artifact = client.artifact(TOKEN_WALLET)?;
        check_methods(&artifact, TOKEN_WALLET_METHODS)?;
        let init_data = json!({
            "root_address": root,
            "wallet_code": artifact.code,
        });
        let account =
            Account::new(artifact, owner, client.clone(), init_data)?;
        Ok(Self { account })
    }

    /// Underlying account.
    #[must_use]
    pub fn account(&self) -> &Account {
        &self.account
    }

    /// Address of the wallet.
    #[must_use]
    pub fn address(&self) -> Address {
        self.account.address()
    }

    /// Whether code is deployed at the wallet address.
    ///
    /// # Errors
    ///
    /// May fail if the node can't be queried.
    pub async fn is_deployed(&self) -> eyre::Result<bool> {
        Ok(self.account.state().await?.is_active())
    }

    /// Native balance of the wallet, `None` if it doesn't exist.
    ///
    /// # Errors
    ///
    /// May fail if the node can't be queried.
    pub async fn native_balance(&self) -> eyre::Result<Option<U256>> {
        self.account.balance().await
    }

    /// Token balance, `None` if the wallet isn't deployed.
    ///
    /// # Errors
    ///
    /// May fail if the node can't be queried.
    pub async fn token_balance(&self) -> eyre::Result<Option<U256>> {
        if !self.is_deployed().await? {
            return Ok(None);
        }
        let output = self.account.run_local("balance", json!({})).await?;
        output.uint("value0").map(Some)
    }

    /// Send `tokens` to the wallet of `recipient_public_key`, deploying it
    /// with `deploy_evers` if needed.
    ///
    /// # Errors
    ///
    /// May fail if the owner can't be funded or the call can't be sent.
    pub async fn transfer_to_recipient(
        &self,
        recipient_public_key: U256,
        tokens: u128,
        deploy_evers: U256,
        value: U256,
    ) -> eyre::Result<Outcome<RunResult>> {
        let client = self.account.client();
        client.fund_signer(self.account.keypair()).await?;
        self.account
            .call(
                "transferToRecipient",
                json!({
                    "recipient_public_key": recipient_public_key.to_string(),
                    "tokens": tokens.to_string(),
                    "deploy_evers": deploy_evers.to_string(),
                }),
            )
            .value(value)
            .run()
            .await
    }
}

/// Helper contract deploying wallets through a root.
#[derive(Clone, Debug)]
pub struct TokenWalletDeployer {
    account: Account,
}

impl TokenWalletDeployer {
    /// Handle of the deployer signed by `keypair`.
    ///
    /// # Errors
    ///
    /// May fail if the deployer artifact can't be loaded or lacks a method.
    pub fn new(client: &Client, keypair: Keypair) -> eyre::Result<Self> {
        let artifact = client.artifact(TOKEN_WALLET_DEPLOYER)?;
        Self::with_artifact(client, keypair, artifact)
    }

    /// Handle of a deployer built from `artifact` instead of the configured
    /// one.
    ///
    /// # Errors
    ///
    /// May fail if `artifact` lacks a method of the helper.
    pub fn with_artifact(
        client: &Client,
        keypair: Keypair,
        artifact: Arc<ContractArtifact>,
    ) -> eyre::Result<Self> {
        check_methods(&artifact, TOKEN_WALLET_DEPLOYER_METHODS)?;
        let account = Account::new(
            artifact,
            keypair,
            client.clone(),
            serde_json::Value::Null,
        )?;
        Ok(Self { account })
    }

    /// Underlying account.
    #[must_use]
    pub fn account(&self) -> &Account {
        &self.account
    }

    /// Address of the deployer.
    #[must_use]
    pub fn address(&self) -> Address {
        self.account.address()
    }

    /// Deploy the helper with funds from the giver.
    ///
    /// # Errors
    ///
    /// May fail if funding or deployment fails.
    pub async fn deploy(&self) -> eyre::Result<()> {
        self.account.deploy(DeployOptions::with_giver()).await?;
        Ok(())
    }

    /// Ask `root` to deploy the wallet of `wallet_public_key`.
    ///
    /// The helper sends `send_evers` to the root and asks it to forward
    /// `deploy_evers` to the new wallet.
    ///
    /// # Errors
    ///
    /// May fail if the call can't be sent.
    pub async fn deploy_wallet(
        &self,
        root: Address,
        wallet_public_key: U256,
        send_evers: U256,
        deploy_evers: U256,
    ) -> eyre::Result<Outcome<RunResult>> {
        self.account
            .run(
                "deployWallet",
                json!({
                    "_root_contract": root,
                    "_wallet_public_key": wallet_public_key.to_string(),
                    "_send_evers": send_evers.to_string(),
                    "_deploy_evers": deploy_evers.to_string(),
                }),
            )
            .await
    }

    /// Wallet address the helper deployed last, zero if none.
    ///
    /// # Errors
    ///
    /// May fail if the helper can't be queried.
    pub async fn last_deployed_wallet(&self) -> eyre::Result<Address> {
        self.account
            .run_local("lastDeployedWallet", json!({}))
            .await?
            .address("lastDeployedWallet")
    }

    /// Native balance of the helper, `None` if it doesn't exist.
    ///
    /// # Errors
    ///
    /// May fail if the node can't be queried.
    pub async fn native_balance(&self) -> eyre::Result<Option<U256>> {
        self.account.balance().await
    }
}
