//! Harness configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file whose
//! path is given by `E2E_CONFIG`, then individual environment
//! variables.
use std::{path::PathBuf, time::Duration};

use alloy::primitives::{utils::parse_ether, U256};
use eyre::{Context, ContextCompat};
use serde::Deserialize;

use crate::freshness::PollPolicy;

pub(crate) const CONFIG_PATH_ENV_VAR_NAME: &str = "E2E_CONFIG";
pub(crate) const RPC_URL_ENV_VAR_NAME: &str = "RPC_URL";
const ARTIFACTS_DIR_ENV_VAR_NAME: &str = "ARTIFACTS_DIR";
const GIVER_PRIVATE_KEY_ENV_VAR_NAME: &str = "GIVER_PRIVATE_KEY";
const GIVER_FUNDING_ENV_VAR_NAME: &str = "GIVER_FUNDING_WEI";
const FEE_ALLOWANCE_ENV_VAR_NAME: &str = "FEE_ALLOWANCE_WEI";
const POLL_TIMEOUT_ENV_VAR_NAME: &str = "POLL_TIMEOUT_MS";

const DEFAULT_RPC_URL: &str = "http://localhost:8545";
const DEFAULT_ARTIFACTS_DIR: &str = "out";
/// First pre-funded account of a local development node.
const DEFAULT_GIVER_PRIVATE_KEY: &str =
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// Settings shared by every client connected in a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// JSON-RPC endpoint of the node.
    pub endpoint: String,
    /// Directory holding compiled contract artifacts.
    pub artifacts_dir: PathBuf,
    /// Hex-encoded private key of the giver.
    pub giver_private_key: String,
    /// Amount the giver sends to a contract address before deployment.
    pub giver_funding: U256,
    /// Minimum native balance kept on a signer to pay for transactions.
    pub fee_allowance: U256,
    /// How reads wait for the node to catch up with observed transactions.
    pub poll: PollPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_RPC_URL.to_string(),
            artifacts_dir: PathBuf::from(DEFAULT_ARTIFACTS_DIR),
            giver_private_key: DEFAULT_GIVER_PRIVATE_KEY.to_string(),
            giver_funding: U256::from(10_000_000_000_000_000_000_u128),
            fee_allowance: U256::from(1_000_000_000_000_000_000_u128),
            poll: PollPolicy::default(),
        }
    }
}

/// On-disk representation. Every field is optional and overrides the
/// default.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct ConfigFile {
    endpoint: Option<String>,
    artifacts_dir: Option<PathBuf>,
    giver_private_key: Option<String>,
    /// In ether, e.g. `"10"` or `"0.5"`.
    giver_funding: Option<String>,
    /// In ether.
    fee_allowance: Option<String>,
    poll_timeout_ms: Option<u64>,
    poll_initial_delay_ms: Option<u64>,
    poll_max_delay_ms: Option<u64>,
}

impl Config {
    /// Load the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// May fail if the config file can't be read or a value can't be parsed.
    pub fn load() -> eyre::Result<Self> {
        Self::from_sources(|name| std::env::var(name).ok())
    }

    /// Load the configuration using `env` to look up variables.
    ///
    /// # Errors
    ///
    /// May fail if the config file can't be read or a value can't be parsed.
    pub fn from_sources(
        env: impl Fn(&str) -> Option<String>,
    ) -> eyre::Result<Self> {
        let mut config = Self::default();

        if let Some(path) = env(CONFIG_PATH_ENV_VAR_NAME) {
            let contents = std::fs::read_to_string(&path)
                .wrap_err(format!("failed to read config file {path}"))?;
            config.merge_toml(&contents).wrap_err(format!(
                "failed to parse config file {path}"
            ))?;
        }

        if let Some(endpoint) = env(RPC_URL_ENV_VAR_NAME) {
            config.endpoint = endpoint;
        }
        if let Some(dir) = env(ARTIFACTS_DIR_ENV_VAR_NAME) {
            config.artifacts_dir = PathBuf::from(dir);
        }
        if let Some(key) = env(GIVER_PRIVATE_KEY_ENV_VAR_NAME) {
            config.giver_private_key = key;
        }
        if let Some(wei) = env(GIVER_FUNDING_ENV_VAR_NAME) {
            config.giver_funding = parse_wei(GIVER_FUNDING_ENV_VAR_NAME, &wei)?;
        }
        if let Some(wei) = env(FEE_ALLOWANCE_ENV_VAR_NAME) {
            config.fee_allowance = parse_wei(FEE_ALLOWANCE_ENV_VAR_NAME, &wei)?;
        }
        if let Some(ms) = env(POLL_TIMEOUT_ENV_VAR_NAME) {
            let ms = ms.parse::<u64>().wrap_err(format!(
                "failed to parse {POLL_TIMEOUT_ENV_VAR_NAME}"
            ))?;
            config.poll.timeout = Duration::from_millis(ms);
        }

        config
            .endpoint
            .parse::<alloy::transports::http::reqwest::Url>()
            .wrap_err(format!("invalid endpoint {}", config.endpoint))?;

        Ok(config)
    }

    /// Apply values from a TOML document on top of `self`.
    fn merge_toml(&mut self, contents: &str) -> eyre::Result<()> {
        let file: ConfigFile = toml::from_str(contents)?;

        if let Some(endpoint) = file.endpoint {
            self.endpoint = endpoint;
        }
        if let Some(dir) = file.artifacts_dir {
            self.artifacts_dir = dir;
        }
        if let Some(key) = file.giver_private_key {
            self.giver_private_key = key;
        }
        if let Some(eth) = file.giver_funding {
            self.giver_funding = parse_ether(&eth)
                .wrap_err("failed to parse giver-funding")?;
        }
        if let Some(eth) = file.fee_allowance {
            self.fee_allowance = parse_ether(&eth)
                .wrap_err("failed to parse fee-allowance")?;
        }
        if let Some(ms) = file.poll_timeout_ms {
            self.poll.timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = file.poll_initial_delay_ms {
            self.poll.initial_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = file.poll_max_delay_ms {
            self.poll.max_delay = Duration::from_millis(ms);
        }
        Ok(())
    }

    /// Same configuration pointed at another endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Same configuration reading artifacts from another directory.
    #[must_use]
    pub fn with_artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = dir.into();
        self
    }
}

fn parse_wei(name: &str, value: &str) -> eyre::Result<U256> {
    value
        .parse::<U256>()
        .ok()
        .wrap_err(format!("failed to parse {name}: `{value}` is not an amount"))
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, io::Write};

    use super::*;

    fn lookup<'a>(
        vars: &[(&'a str, &'a str)],
    ) -> impl Fn(&str) -> Option<String> + 'a {
        let vars: HashMap<_, _> = vars.iter().copied().collect();
        move |name| vars.get(name).map(ToString::to_string)
    }

    #[test]
    fn defaults_without_environment() {
        let config = Config::from_sources(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.endpoint, "http://localhost:8545");
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = Config::from_sources(lookup(&[
            ("RPC_URL", "http://127.0.0.1:9000"),
            ("ARTIFACTS_DIR", "build"),
            ("GIVER_FUNDING_WEI", "42"),
            ("POLL_TIMEOUT_MS", "1500"),
        ]))
        .unwrap();

        assert_eq!(config.endpoint, "http://127.0.0.1:9000");
        assert_eq!(config.artifacts_dir, PathBuf::from("build"));
        assert_eq!(config.giver_funding, U256::from(42));
        assert_eq!(config.poll.timeout, Duration::from_millis(1500));
    }

    #[test]
    fn file_then_environment() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
endpoint = "http://node:8545"
artifacts-dir = "contracts/out"
giver-funding = "2.5"
poll-max-delay-ms = 250
"#
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = Config::from_sources(lookup(&[
            ("E2E_CONFIG", path.as_str()),
            ("RPC_URL", "http://override:8545"),
        ]))
        .unwrap();

        assert_eq!(config.endpoint, "http://override:8545");
        assert_eq!(config.artifacts_dir, PathBuf::from("contracts/out"));
        assert_eq!(
            config.giver_funding,
            U256::from(2_500_000_000_000_000_000_u128)
        );
        assert_eq!(config.poll.max_delay, Duration::from_millis(250));
    }

    #[test]
    fn rejects_bad_values() {
        let err = Config::from_sources(lookup(&[("GIVER_FUNDING_WEI", "a lot")]))
            .unwrap_err();
        assert!(format!("{err:#}").contains("GIVER_FUNDING_WEI"));

        assert!(Config::from_sources(lookup(&[("RPC_URL", "not a url")]))
            .is_err());
    }

    #[test]
    fn rejects_unknown_file_keys() {
        let mut config = Config::default();
        assert!(config.merge_toml("endpint = \"typo\"").is_err());
    }
}
