//! Token contract scenarios.
//!
//! Typed handles over the token root, wallet and wallet deployer contracts,
//! and the workflows run against them by the `token-demo` binary and the
//! `e2e` tests.
pub mod abi;
pub mod contracts;
pub mod scenario;
