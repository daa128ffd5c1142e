//! Workflows over the token contracts.
//!
//! Every scenario is one sequential chain: provision keys, deploy, call,
//! check and report. The first failed check aborts the scenario.
use std::fmt;

use alloy::primitives::U256;
use e2e::Client;

pub mod mint_transfer;
pub mod wallet_deployer;

pub use mint_transfer::MintTransferReport;
pub use wallet_deployer::WalletDeployerReport;

/// A runnable workflow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scenario {
    /// Deploy a wallet through the wallet deployer helper.
    WalletDeployer,
    /// Deploy wallets, mint and transfer, checking every balance.
    MintTransfer,
}

impl Scenario {
    /// Every scenario, in the order they are run.
    pub const ALL: [Self; 2] = [Self::WalletDeployer, Self::MintTransfer];

    /// Name used in logs and on the command line.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::WalletDeployer => "wallet-deployer",
            Self::MintTransfer => "mint-transfer",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a scenario observed.
#[derive(Clone, Debug)]
pub enum Report {
    /// See [`wallet_deployer::run`].
    WalletDeployer(WalletDeployerReport),
    /// See [`mint_transfer::run`].
    MintTransfer(MintTransferReport),
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WalletDeployer(report) => write!(f, "{report}"),
            Self::MintTransfer(report) => write!(f, "{report}"),
        }
    }
}

/// Run `scenario` on `client`.
///
/// # Errors
///
/// May fail if any step of the scenario fails or any check doesn't hold.
pub async fn run(client: &Client, scenario: Scenario) -> eyre::Result<Report> {
    tracing::info!(%scenario, "running scenario");
    let report = match scenario {
        Scenario::WalletDeployer => {
            Report::WalletDeployer(wallet_deployer::run(client).await?)
        }
        Scenario::MintTransfer => {
            Report::MintTransfer(mint_transfer::run(client).await?)
        }
    };
    tracing::info!(%scenario, "scenario passed");
    Ok(report)
}

/// Render a balance that may be missing.
pub(crate) fn display_balance(balance: Option<U256>) -> String {
    balance.map_or_else(|| "no value".to_string(), |b| b.to_string())
}
