//! Runs the token scenarios against a development node and prints what they
//! observed.
use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, ValueEnum};
use e2e::{is_network_inaccessible, Client, Config};
use token_e2e::scenario::{self, Scenario};
use tracing_subscriber::EnvFilter;

/// Deploy and exercise the token contracts.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Scenario to run.
    #[arg(long, value_enum, default_value_t = ScenarioArg::All)]
    scenario: ScenarioArg,
    /// JSON-RPC endpoint of the node, overrides `RPC_URL`.
    #[arg(long)]
    endpoint: Option<String>,
    /// Directory holding the compiled contracts, overrides `ARTIFACTS_DIR`.
    #[arg(long)]
    artifacts: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ScenarioArg {
    WalletDeployer,
    MintTransfer,
    All,
}

impl ScenarioArg {
    fn scenarios(self) -> Vec<Scenario> {
        match self {
            Self::WalletDeployer => vec![Scenario::WalletDeployer],
            Self::MintTransfer => vec![Scenario::MintTransfer],
            Self::All => Scenario::ALL.to_vec(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("invalid configuration: {e:?}");
            return ExitCode::FAILURE;
        }
    };
    let config = match cli.endpoint {
        Some(endpoint) => config.with_endpoint(endpoint),
        None => config,
    };
    let config = match cli.artifacts {
        Some(dir) => config.with_artifacts_dir(dir),
        None => config,
    };
    let endpoint = config.endpoint.clone();

    println!("Hello {endpoint}!");
    let scenarios = cli.scenario.scenarios();
    let result = Client::scoped(config, |client| async move {
        for scenario in scenarios {
            let report = scenario::run(&client, scenario).await?;
            println!("== {scenario}\n{report}");
        }
        Ok::<_, eyre::Report>(())
    })
    .await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if is_network_inaccessible(&e) => {
            eprintln!(
                "Network is inaccessible at {endpoint}. You have to start \
                 the local node, e.g. with `anvil`.\nIf it listens on another \
                 host or port, set RPC_URL or pass --endpoint \
                 http://host:port."
            );
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!("{e:?}");
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr, filtered by `RUST_LOG`.
fn init_logging() {
    use tracing_subscriber::{
        fmt, layer::SubscriberExt, util::SubscriberInitExt,
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("token_e2e=info,e2e=info,warn"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .compact(),
        )
        .with(env_filter)
        .init();
}
