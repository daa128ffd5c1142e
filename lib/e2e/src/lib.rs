//! End-to-end testing harness for token contracts.
//!
//! Deploys compiled contracts at deterministic addresses, funds them from a
//! giver, calls them and checks the results against a development node.
mod account;
mod artifact;
mod assert;
mod client;
mod config;
mod deploy;
mod error;
mod freshness;
mod giver;
mod invoke;
mod keys;

pub use account::Account;
pub use artifact::ContractArtifact;
pub use assert::{ensure, ensure_eq, AssertionFailed};
pub use client::{AccountState, Client};
pub use config::Config;
pub use deploy::{
    compute_address, init_code, DeployOptions, Deployment,
    DETERMINISTIC_DEPLOYER,
};
pub use e2e_proc::test;
pub use error::{
    is_network_inaccessible, ClientError, ExitCode, Outcome, Rejection,
};
pub use freshness::{poll_until, PollPolicy};
pub use giver::Giver;
pub use invoke::{Call, DecodedOutput, RunResult};
pub use keys::Keypair;
