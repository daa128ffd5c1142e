use std::{
    collections::HashMap,
    future::Future,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex,
    },
};

use alloy::{
    network::EthereumWallet,
    primitives::{Address, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    transports::http::reqwest::Url,
};
use eyre::{bail, Context};

use crate::{
    artifact::ContractArtifact,
    config::Config,
    error::{transport_unreachable, ClientError},
    freshness::poll_until,
    giver::Giver,
    keys::Keypair,
};

/// Observed state of an address on the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccountState {
    /// Nothing is known about the address.
    Nonexistent,
    /// The address holds funds but no code.
    Uninit {
        /// Native balance.
        balance: U256,
    },
    /// Code is deployed at the address.
    Active {
        /// Native balance.
        balance: U256,
    },
}

impl AccountState {
    /// Native balance, or `None` if the account does not exist.
    #[must_use]
    pub fn balance(&self) -> Option<U256> {
        match self {
            Self::Nonexistent => None,
            Self::Uninit { balance } | Self::Active { balance } => {
                Some(*balance)
            }
        }
    }

    /// Whether code is deployed at the address.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }
}

struct Inner {
    config: Config,
    url: Url,
    provider: DynProvider,
    giver: Giver,
    /// Highest block observed in any receipt of this client.
    observed_block: AtomicU64,
    closed: AtomicBool,
    artifacts: Mutex<HashMap<String, Arc<ContractArtifact>>>,
}

/// Handle to the blockchain node shared by every account of a run.
///
/// Cloning is cheap; all clones refer to the same connection.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

impl Client {
    /// Connect using configuration from the environment.
    ///
    /// # Errors
    ///
    /// May fail if the configuration is invalid or the node is unreachable.
    pub async fn new() -> eyre::Result<Self> {
        Self::connect(Config::load()?).await
    }

    /// Connect to the node described by `config`.
    ///
    /// # Errors
    ///
    /// May fail if the endpoint is invalid or the node is unreachable.
    pub async fn connect(config: Config) -> eyre::Result<Self> {
        let url: Url = config
            .endpoint
            .parse()
            .wrap_err(format!("invalid endpoint {}", config.endpoint))?;
        let provider = ProviderBuilder::new().connect_http(url.clone()).erased();
        let giver = Giver::new(&config.giver_private_key, url.clone())?;

        let chain_id = match provider.get_chain_id().await {
            Ok(chain_id) => chain_id,
            Err(source) if transport_unreachable(&source) => {
                return Err(ClientError::NetworkInaccessible {
                    endpoint: config.endpoint.clone(),
                    source,
                }
                .into());
            }
            Err(e) => {
                return Err(eyre::Report::new(e)
                    .wrap_err("failed to query chain id"));
            }
        };
        tracing::info!(endpoint = %config.endpoint, chain_id, "connected");

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                url,
                provider,
                giver,
                observed_block: AtomicU64::new(0),
                closed: AtomicBool::new(false),
                artifacts: Mutex::new(HashMap::new()),
            }),
        })
    }

    /// Connect, run `workflow`, and close the client on every exit path.
    ///
    /// # Errors
    ///
    /// May fail if connecting fails or `workflow` fails.
    pub async fn scoped<T, F, Fut>(
        config: Config,
        workflow: F,
    ) -> eyre::Result<T>
    where
        F: FnOnce(Client) -> Fut,
        Fut: Future<Output = eyre::Result<T>>,
    {
        let client = Self::connect(config).await?;
        let result = workflow(client.clone()).await;
        client.close();
        result
    }

    /// Release the handle. Every later network operation fails.
    pub fn close(&self) {
        if !self.inner.closed.swap(true, Ordering::SeqCst) {
            tracing::info!(endpoint = %self.inner.config.endpoint, "closed");
        }
    }

    /// Whether [`Client::close`] was called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Configuration the client was connected with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Network faucet.
    ///
    /// # Errors
    ///
    /// May fail if the client is closed.
    pub fn giver(&self) -> eyre::Result<&Giver> {
        self.ensure_open()?;
        Ok(&self.inner.giver)
    }

    /// Read-only provider.
    pub(crate) fn provider(&self) -> eyre::Result<&DynProvider> {
        self.ensure_open()?;
        Ok(&self.inner.provider)
    }

    /// Provider signing transactions with `keypair`.
    pub(crate) fn wallet(&self, keypair: &Keypair) -> eyre::Result<DynProvider> {
        self.ensure_open()?;
        Ok(ProviderBuilder::new()
            .wallet(EthereumWallet::from(keypair.signer().clone()))
            .connect_http(self.inner.url.clone())
            .erased())
    }

    fn ensure_open(&self) -> eyre::Result<()> {
        if self.is_closed() {
            bail!("client for {} is closed", self.inner.config.endpoint);
        }
        Ok(())
    }

    /// Load artifact `name` from the configured directory, once per client.
    ///
    /// # Errors
    ///
    /// May fail if the artifact is missing or malformed.
    pub fn artifact(
        &self,
        name: &str,
    ) -> Result<Arc<ContractArtifact>, ClientError> {
        let mut cache = self
            .inner
            .artifacts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(artifact) = cache.get(name) {
            return Ok(artifact.clone());
        }
        let artifact =
            ContractArtifact::load(&self.inner.config.artifacts_dir, name)?;
        cache.insert(name.to_string(), artifact.clone());
        Ok(artifact)
    }

    /// Make sure `keypair` can pay fees for external calls, topping it up
    /// from the giver up to the configured fee allowance.
    ///
    /// # Errors
    ///
    /// May fail if the giver's transfer fails.
    pub async fn fund_signer(&self, keypair: &Keypair) -> eyre::Result<()> {
        self.ensure_open()?;
        let allowance = self.inner.config.fee_allowance;
        if let Some(block) =
            self.inner.giver.top_up(keypair.address(), allowance).await?
        {
            self.observe_block(block);
        }
        Ok(())
    }

    /// Record that the ledger reached `block`.
    pub(crate) fn observe_block(&self, block: u64) {
        self.inner.observed_block.fetch_max(block, Ordering::SeqCst);
    }

    /// Wait until the node serves state at least as recent as every block
    /// this client observed.
    ///
    /// # Errors
    ///
    /// May fail if the node can't be queried or doesn't catch up in time.
    pub async fn wait_fresh(&self) -> eyre::Result<()> {
        let target = self.inner.observed_block.load(Ordering::SeqCst);
        if target == 0 {
            return Ok(());
        }
        let provider = self.provider()?;
        poll_until(
            self.inner.config.poll,
            "head block",
            move || async move {
                provider
                    .get_block_number()
                    .await
                    .wrap_err("failed to get block number")
            },
            |head| *head >= target,
        )
        .await?;
        Ok(())
    }

    /// Current state of `address`.
    ///
    /// # Errors
    ///
    /// May fail if the node can't be queried.
    pub async fn account_state(
        &self,
        address: Address,
    ) -> eyre::Result<AccountState> {
        self.wait_fresh().await?;
        let provider = self.provider()?;
        let code = provider
            .get_code_at(address)
            .await
            .wrap_err(format!("failed to get code at {address}"))?;
        let balance = provider
            .get_balance(address)
            .await
            .wrap_err(format!("failed to get balance of {address}"))?;

        Ok(if !code.is_empty() {
            AccountState::Active { balance }
        } else if balance.is_zero() {
            AccountState::Nonexistent
        } else {
            AccountState::Uninit { balance }
        })
    }

    /// Native balance of `address`, `None` if the account does not exist.
    ///
    /// # Errors
    ///
    /// May fail if the node can't be queried.
    pub async fn balance(&self, address: Address) -> eyre::Result<Option<U256>> {
        Ok(self.account_state(address).await?.balance())
    }
}
