//! Deterministic contract deployment.
//!
//! Contracts are created through the canonical deterministic-deployment proxy
//! so that an address depends only on the creation code, the init data and
//! the deployer's public key, and is known before deployment.
use alloy::{
    dyn_abi::JsonAbiExt,
    network::TransactionBuilder,
    primitives::{address, Address, Bytes, B256, U256},
    providers::Provider,
    rpc::types::{TransactionReceipt, TransactionRequest},
};
use eyre::Context;
use serde_json::Value;

use crate::{
    account::Account, artifact::ContractArtifact, error::ClientError,
    invoke::encode_params,
};

/// Deterministic-deployment proxy available on development nodes.
pub const DETERMINISTIC_DEPLOYER: Address =
    address!("4e59b44847b379578588920ca78fbf26c0b4956c");

/// How [`Account::deploy`] provisions the new contract.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeployOptions {
    /// Fund the address and the signer from the giver first.
    pub use_giver: bool,
    /// Amount sent by the giver, the configured default if `None`.
    pub value: Option<U256>,
}

impl DeployOptions {
    /// Deploy with funds from the giver.
    #[must_use]
    pub fn with_giver() -> Self {
        Self { use_giver: true, value: None }
    }

    /// Override the amount sent by the giver.
    #[must_use]
    pub fn value(mut self, value: U256) -> Self {
        self.value = Some(value);
        self
    }
}

/// Record of a deployment.
#[derive(Clone, Debug)]
pub struct Deployment {
    /// Address of the contract.
    pub address: Address,
    /// Receipt of the deploying transaction, `None` if the contract was
    /// already deployed.
    pub receipt: Option<TransactionReceipt>,
}

/// Creation code followed by the ABI-encoded init data.
///
/// `init_data` is an object keyed by constructor parameter name.
///
/// # Errors
///
/// May fail if `init_data` doesn't match the constructor.
pub fn init_code(
    artifact: &ContractArtifact,
    init_data: &Value,
) -> Result<Bytes, ClientError> {
    let init_error = |reason: String| ClientError::InitData {
        contract: artifact.name.clone(),
        reason,
    };

    let Some(constructor) = &artifact.abi.constructor else {
        return match init_data {
            Value::Null => Ok(artifact.code.clone()),
            Value::Object(map) if map.is_empty() => Ok(artifact.code.clone()),
            _ => Err(init_error(
                "contract takes no init data".to_string(),
            )),
        };
    };

    let values =
        encode_params(&constructor.inputs, init_data).map_err(init_error)?;
    let encoded = constructor
        .abi_encode_input(&values)
        .map_err(|e| init_error(e.to_string()))?;

    let mut code = artifact.code.to_vec();
    code.extend_from_slice(&encoded);
    Ok(code.into())
}

/// Address a contract will have once deployed.
///
/// A pure function of its inputs: no network access is involved.
///
/// # Errors
///
/// May fail if `init_data` doesn't match the constructor.
pub fn compute_address(
    artifact: &ContractArtifact,
    init_data: &Value,
    public_key_id: U256,
) -> Result<Address, ClientError> {
    let code = init_code(artifact, init_data)?;
    Ok(create2_address(&code, public_key_id))
}

pub(crate) fn create2_address(init_code: &[u8], public_key_id: U256) -> Address {
    let salt = B256::from(public_key_id);
    DETERMINISTIC_DEPLOYER.create2_from_code(salt.0, init_code)
}

/// Deploy `account`, funding it from the giver if requested.
///
/// Does nothing if code is already present at the account address.
pub(crate) async fn deploy(
    account: &Account,
    options: DeployOptions,
) -> eyre::Result<Deployment> {
    let client = account.client();
    let address = account.address();
    let contract = &account.artifact().name;
    let keypair = account.keypair();

    if client.account_state(address).await?.is_active() {
        tracing::info!(%contract, %address, "already deployed");
        return Ok(Deployment { address, receipt: None });
    }

    if options.use_giver {
        let value = options.value.unwrap_or(client.config().giver_funding);
        if !value.is_zero() {
            let block = client.giver()?.send(address, value).await?;
            client.observe_block(block);
        }
        client.fund_signer(keypair).await?;
    }

    let salt = B256::from(keypair.public_key_id());
    let mut input = salt.to_vec();
    input.extend_from_slice(account.init_code());
    let tx = TransactionRequest::default()
        .with_from(keypair.address())
        .with_to(DETERMINISTIC_DEPLOYER)
        .with_input(Bytes::from(input));

    let receipt = client
        .wallet(keypair)?
        .send_transaction(tx)
        .await
        .wrap_err(format!("failed to deploy `{contract}`"))?
        .get_receipt()
        .await
        .wrap_err(format!("deployment of `{contract}` was not mined"))?;
    let block = receipt.block_number.unwrap_or_default();
    client.observe_block(block);
    eyre::ensure!(
        receipt.status(),
        "deployment of `{contract}` failed in block {block}"
    );

    if !client.account_state(address).await?.is_active() {
        return Err(ClientError::NotDeployed {
            contract: contract.clone(),
            address,
        }
        .into());
    }

    tracing::info!(
        %contract,
        %address,
        tx = %receipt.transaction_hash,
        block,
        "deployed"
    );
    Ok(Deployment { address, receipt: Some(receipt) })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::artifact::tests::wallet;

    fn init_data() -> Value {
        json!({
            "root_address": "0x00000000000000000000000000000000000000aa",
            "wallet_code": "0x6080",
        })
    }

    #[test]
    fn address_is_deterministic() {
        let artifact = wallet();
        let key = U256::from(0xdead_beef_u64);

        let first = compute_address(&artifact, &init_data(), key).unwrap();
        let second = compute_address(&artifact, &init_data(), key).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn address_depends_on_every_input() {
        let artifact = wallet();
        let key = U256::from(1);
        let base = compute_address(&artifact, &init_data(), key).unwrap();

        let other_key =
            compute_address(&artifact, &init_data(), U256::from(2)).unwrap();
        assert_ne!(base, other_key);

        let other_root = json!({
            "root_address": "0x00000000000000000000000000000000000000bb",
            "wallet_code": "0x6080",
        });
        let other_data =
            compute_address(&artifact, &other_root, key).unwrap();
        assert_ne!(base, other_data);

        let mut other_code = artifact.clone();
        other_code.code = Bytes::from_static(&[0x60, 0x00]);
        let other_artifact =
            compute_address(&other_code, &init_data(), key).unwrap();
        assert_ne!(base, other_artifact);
    }

    #[test]
    fn init_code_appends_constructor_arguments() {
        let artifact = wallet();
        let code = init_code(&artifact, &init_data()).unwrap();
        assert!(code.starts_with(&artifact.code));
        // address head, bytes offset, bytes length, one padded word of data.
        assert_eq!(code.len(), artifact.code.len() + 4 * 32);
    }

    #[test]
    fn rejects_mismatched_init_data() {
        let artifact = wallet();
        let err = init_code(&artifact, &json!({ "wallet_code": "0x" }))
            .unwrap_err();
        assert!(matches!(err, ClientError::InitData { .. }));

        let mut no_constructor = artifact.clone();
        no_constructor.abi.constructor = None;
        assert_eq!(
            init_code(&no_constructor, &json!({})).unwrap(),
            no_constructor.code
        );
        assert!(init_code(&no_constructor, &init_data()).is_err());
    }

    #[test]
    fn salt_is_the_public_key_id() {
        let code = [0x00_u8];
        let expected = DETERMINISTIC_DEPLOYER
            .create2(B256::ZERO.0, alloy::primitives::keccak256(code).0);
        assert_eq!(create2_address(&code, U256::ZERO), expected);
    }
}
