//! Interfaces the token contracts are driven through.
//!
//! Handles call methods by name with named arguments, so a renamed method or
//! a changed parameter list in a contract build would only surface halfway
//! through a scenario. Checking an artifact against these interfaces when a
//! handle is created catches that up front.
#![allow(missing_docs)]
use alloy::{json_abi::JsonAbi, sol, sol_types::SolCall};

sol! {
    interface ITokenRoot {
        function deployWallet(uint128 tokens, uint128 deploy_evers, uint256 wallet_public_key) external payable returns (address value0);
        function mint(uint128 tokens, address to) external;
        function totalSupply() external view returns (uint128 value0);
    }

    interface ITokenWallet {
        function balance() external view returns (uint128 value0);
        function transferToRecipient(uint256 recipient_public_key, uint128 tokens, uint128 deploy_evers) external payable;
    }

    interface ITokenWalletDeployer {
        function deployWallet(address _root_contract, uint256 _wallet_public_key, uint128 _send_evers, uint128 _deploy_evers) external;
        function lastDeployedWallet() external view returns (address lastDeployedWallet);
    }
}

/// Methods [`crate::contracts::TokenRoot`] calls.
pub const TOKEN_ROOT_METHODS: &[&str] = &[
    ITokenRoot::deployWalletCall::SIGNATURE,
    ITokenRoot::mintCall::SIGNATURE,
    ITokenRoot::totalSupplyCall::SIGNATURE,
];

/// Methods [`crate::contracts::TokenWallet`] calls.
pub const TOKEN_WALLET_METHODS: &[&str] = &[
    ITokenWallet::balanceCall::SIGNATURE,
    ITokenWallet::transferToRecipientCall::SIGNATURE,
];

/// Methods [`crate::contracts::TokenWalletDeployer`] calls.
pub const TOKEN_WALLET_DEPLOYER_METHODS: &[&str] = &[
    ITokenWalletDeployer::deployWalletCall::SIGNATURE,
    ITokenWalletDeployer::lastDeployedWalletCall::SIGNATURE,
];

/// Signatures in `expected` that no function of `abi` has.
#[must_use]
pub fn missing_methods<'a>(abi: &JsonAbi, expected: &[&'a str]) -> Vec<&'a str> {
    expected
        .iter()
        .copied()
        .filter(|signature| {
            !abi.functions().any(|function| function.signature() == *signature)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use alloy::sol_types::SolError;
    use e2e::{ContractArtifact, ExitCode};

    use super::*;

    const FIXTURE: &str = include_str!("../tests/fixtures/TokenFixture.json");

    fn fixture() -> ContractArtifact {
        ContractArtifact::from_json("TokenFixture", FIXTURE).unwrap()
    }

    #[test]
    fn signatures_match_the_named_arguments() {
        assert_eq!(
            ITokenRoot::deployWalletCall::SIGNATURE,
            "deployWallet(uint128,uint128,uint256)"
        );
        assert_eq!(
            ITokenWalletDeployer::deployWalletCall::SIGNATURE,
            "deployWallet(address,uint256,uint128,uint128)"
        );
        assert_eq!(
            ITokenWallet::transferToRecipientCall::SIGNATURE,
            "transferToRecipient(uint256,uint128,uint128)"
        );
    }

    #[test]
    fn fixture_implements_the_wallet_deployer() {
        let fixture = fixture();
        assert!(missing_methods(&fixture.abi, TOKEN_WALLET_DEPLOYER_METHODS)
            .is_empty());
        assert_eq!(
            missing_methods(&fixture.abi, TOKEN_ROOT_METHODS),
            ["mint(uint128,address)", "totalSupply()"]
        );
        assert_eq!(
            missing_methods(&fixture.abi, TOKEN_WALLET_METHODS),
            TOKEN_WALLET_METHODS
        );
    }

    #[test]
    fn fixture_code_dispatches_on_the_interface_selectors() {
        let fixture = fixture();
        let contains = |needle: [u8; 4]| {
            fixture.code.windows(4).any(|window| window == needle)
        };

        assert!(contains(ITokenRoot::deployWalletCall::SELECTOR));
        assert!(contains(ITokenWalletDeployer::deployWalletCall::SELECTOR));
        assert!(contains(ITokenWalletDeployer::lastDeployedWalletCall::SELECTOR));
        assert!(contains(ExitCode::SELECTOR));
    }
}
