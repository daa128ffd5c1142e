use std::sync::Arc;

use alloy::primitives::{Address, Bytes, U256};
use serde_json::Value;

use crate::{
    artifact::ContractArtifact,
    client::{AccountState, Client},
    deploy::{self, create2_address, init_code, DeployOptions, Deployment},
    error::{ClientError, Outcome},
    invoke::{Call, DecodedOutput, RunResult},
    keys::Keypair,
};

/// A contract bound to a signer and a client.
///
/// The address is derived from the artifact, the init data and the signer's
/// public key when the handle is created, so it is known (and stable) before
/// the contract is deployed.
#[derive(Clone)]
pub struct Account {
    artifact: Arc<ContractArtifact>,
    keypair: Keypair,
    client: Client,
    init_data: Value,
    init_code: Bytes,
    address: Address,
}

impl Account {
    /// Bind `artifact` to `keypair` and `client`.
    ///
    /// `init_data` is an object keyed by constructor parameter name, or
    /// `null` when the contract takes none.
    ///
    /// # Errors
    ///
    /// May fail if `init_data` doesn't match the contract's constructor.
    pub fn new(
        artifact: Arc<ContractArtifact>,
        keypair: Keypair,
        client: Client,
        init_data: Value,
    ) -> Result<Self, ClientError> {
        let init_code = init_code(&artifact, &init_data)?;
        let address = create2_address(&init_code, keypair.public_key_id());
        Ok(Self { artifact, keypair, client, init_data, init_code, address })
    }

    /// Address of the contract, deployed or not.
    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    /// Contract this handle targets.
    #[must_use]
    pub fn artifact(&self) -> &ContractArtifact {
        &self.artifact
    }

    /// Signer of external calls and deployment.
    #[must_use]
    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    /// Client this handle talks through.
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Init data the address was derived from.
    #[must_use]
    pub fn init_data(&self) -> &Value {
        &self.init_data
    }

    pub(crate) fn init_code(&self) -> &[u8] {
        &self.init_code
    }

    /// Current ledger state of the contract address.
    ///
    /// # Errors
    ///
    /// May fail if the node can't be queried.
    pub async fn state(&self) -> eyre::Result<AccountState> {
        self.client.account_state(self.address).await
    }

    /// Native balance of the contract, `None` if the account does not exist.
    ///
    /// # Errors
    ///
    /// May fail if the node can't be queried.
    pub async fn balance(&self) -> eyre::Result<Option<U256>> {
        self.client.balance(self.address).await
    }

    /// Deploy the contract, see [`DeployOptions`].
    ///
    /// # Errors
    ///
    /// May fail if funding or the deployment transaction fails.
    pub async fn deploy(
        &self,
        options: DeployOptions,
    ) -> eyre::Result<Deployment> {
        deploy::deploy(self, options).await
    }

    /// Prepare a call of `method` with named `args`.
    pub fn call(&self, method: &str, args: Value) -> Call<'_> {
        Call::new(self, method, args)
    }

    /// Send a signed call of `method`.
    ///
    /// # Errors
    ///
    /// See [`Call::run`].
    pub async fn run(
        &self,
        method: &str,
        args: Value,
    ) -> eyre::Result<Outcome<RunResult>> {
        self.call(method, args).run().await
    }

    /// Execute `method` locally against current state.
    ///
    /// # Errors
    ///
    /// See [`Call::run_local`].
    pub async fn run_local(
        &self,
        method: &str,
        args: Value,
    ) -> eyre::Result<DecodedOutput> {
        self.call(method, args).run_local().await
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("contract", &self.artifact.name)
            .field("address", &self.address)
            .field("init_data", &self.init_data)
            .finish_non_exhaustive()
    }
}
