use alloy::{
    network::{EthereumWallet, TransactionBuilder},
    primitives::{Address, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
    transports::http::reqwest::Url,
};
use eyre::Context;
use once_cell::sync::Lazy;
use tokio::sync::{Mutex, MutexGuard};

/// Pre-funded account that pays for new addresses during test setup.
#[derive(Clone)]
pub struct Giver {
    address: Address,
    wallet: DynProvider,
}

impl Giver {
    pub(crate) fn new(private_key: &str, url: Url) -> eyre::Result<Self> {
        let signer: PrivateKeySigner = private_key
            .parse()
            .wrap_err("failed to parse giver private key")?;
        let address = signer.address();
        let wallet = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();
        Ok(Self { address, wallet })
    }

    /// Get access to the giver in a synchronized manner.
    async fn lock() -> MutexGuard<'static, ()> {
        /// Every funding transaction is sent from the same giver account, so
        /// sending them concurrently would reuse nonces.
        static SYNC_GIVER: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

        SYNC_GIVER.lock().await
    }

    /// Giver account address.
    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    /// Send `value` to `to` and wait until the transfer is mined.
    ///
    /// Returns the number of the block including the transfer.
    ///
    /// # Errors
    ///
    /// May fail if the transaction can't be sent or is not mined.
    pub async fn send(&self, to: Address, value: U256) -> eyre::Result<u64> {
        let _lock = Giver::lock().await;

        let tx = TransactionRequest::default()
            .with_from(self.address)
            .with_to(to)
            .with_value(value);

        let receipt = self
            .wallet
            .send_transaction(tx)
            .await
            .wrap_err(format!("giver failed to send funds to {to}"))?
            .get_receipt()
            .await
            .wrap_err(format!("giver transfer to {to} was not mined"))?;

        eyre::ensure!(
            receipt.status(),
            "giver transfer to {to} failed in block {:?}",
            receipt.block_number
        );
        tracing::info!(%to, %value, "giver sent funds");
        Ok(receipt.block_number.unwrap_or_default())
    }

    /// Make sure `to` holds at least `min`, sending the difference if not.
    ///
    /// Returns the block of the transfer, if one was needed.
    ///
    /// # Errors
    ///
    /// May fail if the balance can't be read or the transfer fails.
    pub async fn top_up(
        &self,
        to: Address,
        min: U256,
    ) -> eyre::Result<Option<u64>> {
        let balance = self
            .wallet
            .get_balance(to)
            .await
            .wrap_err(format!("failed to get balance of {to}"))?;
        if balance >= min {
            return Ok(None);
        }
        self.send(to, min - balance).await.map(Some)
    }
}
