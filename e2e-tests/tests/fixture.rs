#![cfg(feature = "e2e")]
//! Call paths of the harness exercised against `fixtures/TokenFixture`,
//! which raises the token root's exit codes and records wallets like the
//! wallet deployer helper.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use e2e::{
    compute_address, Account, Client, ClientError, ContractArtifact,
    DeployOptions, Keypair, Rejection,
};
use eyre::Result;
use serde_json::{json, Value};
use token_e2e::{
    contracts::{exit_code, TokenWalletDeployer, MIN_WALLET_DEPLOY_VALUE},
    scenario::wallet_deployer::{self, request_wallet},
};

const DEPLOY_EVERS: u64 = 200_000_000;

fn fixture_artifact() -> Result<Arc<ContractArtifact>> {
    let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");
    Ok(ContractArtifact::load(dir, "TokenFixture")?)
}

/// Deployed fixture owned by `keys`.
async fn deployed_fixture(client: &Client, keys: Keypair) -> Result<Account> {
    let account =
        Account::new(fixture_artifact()?, keys, client.clone(), Value::Null)?;
    account.deploy(DeployOptions::with_giver()).await?;
    Ok(account)
}

fn deploy_wallet_args(keys: &Keypair) -> Value {
    json!({
        "tokens": "1000000000",
        "deploy_evers": DEPLOY_EVERS.to_string(),
        "wallet_public_key": keys.public_key_id().to_string(),
    })
}

// ============================================================================
// Integration Tests: Deployment
// ============================================================================

#[e2e::test]
async fn fixture_lands_at_computed_address_once(client: Client) -> Result<()> {
    let keys = Keypair::generate();
    let artifact = fixture_artifact()?;
    let expected =
        compute_address(&artifact, &Value::Null, keys.public_key_id())?;
    let account = Account::new(artifact, keys, client.clone(), Value::Null)?;
    assert_eq!(account.address(), expected);
    assert!(!account.state().await?.is_active());

    let first = account.deploy(DeployOptions::with_giver()).await?;
    let second = account.deploy(DeployOptions::with_giver()).await?;

    assert_eq!(first.address, expected);
    assert!(first.receipt.is_some());
    assert!(second.receipt.is_none());
    assert!(account.state().await?.is_active());
    Ok(())
}

#[e2e::test]
async fn deployment_without_runtime_code_fails(client: Client) -> Result<()> {
    let artifact = Arc::new(
        ContractArtifact::from_json("Empty", r#"{"abi":[],"bytecode":"0x00"}"#)
            .map_err(|reason| eyre::eyre!(reason))?,
    );
    let account = Account::new(
        artifact,
        Keypair::generate(),
        client.clone(),
        Value::Null,
    )?;

    let err = account
        .deploy(DeployOptions::with_giver())
        .await
        .expect_err("nothing should be deployed");

    assert!(matches!(
        err.downcast_ref::<ClientError>(),
        Some(ClientError::NotDeployed { address, .. })
            if *address == account.address()
    ));
    Ok(())
}

// ============================================================================
// Integration Tests: Calls
// ============================================================================

#[e2e::test]
async fn exit_codes_become_rejections(client: Client) -> Result<()> {
    let keys = Keypair::generate();
    let fixture = deployed_fixture(&client, keys.clone()).await?;
    let args = deploy_wallet_args(&keys);

    fixture
        .call("deployWallet", args.clone())
        .value(U256::from(1))
        .run()
        .await?
        .expect_exit_code(exit_code::LOW_DEPLOY_VALUE)?;
    fixture
        .call("deployWallet", args.clone())
        .value(U256::from(MIN_WALLET_DEPLOY_VALUE))
        .run()
        .await?
        .expect_exit_code(exit_code::NOT_ENOUGH_BALANCE)?;

    let last = fixture.run_local("lastDeployedWallet", json!({})).await?;
    assert_eq!(last.address("lastDeployedWallet")?, Address::ZERO);
    Ok(())
}

#[e2e::test]
async fn accepted_call_returns_simulated_output(client: Client) -> Result<()> {
    let keys = Keypair::generate();
    let fixture = deployed_fixture(&client, keys.clone()).await?;

    let result = fixture
        .call("deployWallet", deploy_wallet_args(&keys))
        .value(U256::from(DEPLOY_EVERS))
        .run()
        .await?
        .into_success()?;

    assert!(result.receipt.status());
    assert_eq!(result.output.address("value0")?, keys.address());
    let last = fixture.run_local("lastDeployedWallet", Value::Null).await?;
    assert_eq!(last.address("lastDeployedWallet")?, keys.address());
    Ok(())
}

#[e2e::test]
async fn failed_transaction_is_replayed_for_its_exit_code(
    client: Client,
) -> Result<()> {
    let fixture = deployed_fixture(&client, Keypair::generate()).await?;

    let outcome = fixture
        .call("reject", json!({ "code": 103 }))
        .without_simulation()
        .gas_limit(100_000)
        .run()
        .await?;

    assert_eq!(outcome.rejection(), Some(&Rejection::Exit(103)));
    Ok(())
}

#[e2e::test]
async fn local_run_of_rejecting_method_fails(client: Client) -> Result<()> {
    let fixture = deployed_fixture(&client, Keypair::generate()).await?;

    let err = fixture
        .run_local("reject", json!({ "code": 102 }))
        .await
        .expect_err("reject always reverts");

    assert!(err.to_string().contains("exit code 102"), "{err}");
    Ok(())
}

// ============================================================================
// Integration Tests: Wallet deployer
// ============================================================================

#[e2e::test]
async fn accepted_request_without_deployment_reads_zero_wallet(
    client: Client,
) -> Result<()> {
    let keys = Keypair::generate();
    let deployer = TokenWalletDeployer::with_artifact(
        &client,
        keys.clone(),
        fixture_artifact()?,
    )?;
    deployer.deploy().await?;

    let request = request_wallet(
        &deployer,
        Address::ZERO,
        keys.public_key_id(),
        U256::from(wallet_deployer::SEND_EVERS),
        U256::from(wallet_deployer::DEPLOY_EVERS),
    )
    .await?;

    assert_eq!(request.rejection, None);
    assert_eq!(request.last_deployed_wallet, Address::ZERO);

    let request = request_wallet(
        &deployer,
        Address::ZERO,
        keys.public_key_id(),
        U256::from(wallet_deployer::DEPLOY_EVERS),
        U256::from(wallet_deployer::SEND_EVERS),
    )
    .await?;

    assert_eq!(request.rejection, None);
    assert_eq!(request.last_deployed_wallet, keys.address());
    Ok(())
}

// ============================================================================
// Integration Tests: Client lifecycle
// ============================================================================

#[e2e::test]
async fn closed_client_refuses_funding(client: Client) -> Result<()> {
    let keys = Keypair::generate();
    client.close();

    assert!(client.giver().is_err());
    assert!(client.fund_signer(&keys).await.is_err());
    assert!(client.balance(keys.address()).await.is_err());
    Ok(())
}
