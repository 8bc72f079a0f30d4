use alloy::{primitives::Address, providers::ProviderBuilder};
use clap::{Parser, Subcommand};
use eyre::WrapErr;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use mcs_admin::{
    admin::{Admin, CROSS_CHAIN_SERVICE_PROXY, SERVICE_RELAY_PROXY},
    chain::EvmChain,
    chains::{ChainId, ChainList},
    config::Config,
    registry::FileRegistry,
};

#[derive(Parser)]
#[command(name = "mcs-admin")]
#[command(about = "Deploys and configures MAP Cross Chain Service contracts", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: Config,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Deploy FeeCenter unless this network already has one
    DeployFeeCenter,

    /// Allow a token to bridge to each of the given chains
    SetCanBridgeToken {
        /// Token contract address
        #[arg(long)]
        token: Address,

        /// Comma separated destination chain ids, e.g. 1,56,1313161554
        #[arg(long)]
        chains: ChainList,

        /// Deployment name of the MapCrossChainService proxy
        #[arg(long, default_value = CROSS_CHAIN_SERVICE_PROXY)]
        proxy: String,
    },

    /// Register a named chain with the relay
    #[command(alias = "relay-init-near")]
    RegisterRelayChain {
        /// Chain label stored by the relay
        #[arg(long, default_value = "near")]
        name: String,

        /// Chain id the label maps to
        #[arg(long)]
        chain: ChainId,

        /// Deployment name of the MAPCrossChainServiceRelay proxy
        #[arg(long, default_value = SERVICE_RELAY_PROXY)]
        proxy: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> eyre::Result<()> {
    // before parsing, so `.env` can supply the MCS_* fallbacks
    let dotenv = dotenvy::dotenv();

    color_eyre::install()?;
    let cli = Cli::parse();
    init_logging(cli.verbose);
    if let Ok(path) = dotenv {
        debug!("Loaded .env from {:?}", path);
    }

    run(cli).await
}

async fn run(cli: Cli) -> eyre::Result<()> {
    let config = &cli.config;
    debug!(?config, "configuration loaded");

    let signers = config.signers()?;
    let provider = ProviderBuilder::new()
        .with_recommended_fillers()
        .wallet(signers.wallet())
        .on_http(config.rpc_url.clone());
    let chain = EvmChain::new(provider, config.confirmations);

    let chain_id = chain
        .chain_id()
        .await
        .wrap_err_with(|| format!("failed to reach {}", config.rpc_url))?;
    info!(network = %config.network, chain_id, rpc = %config.rpc_url, "connected");

    let registry = FileRegistry::new(
        &config.network,
        &config.deployments_dir,
        &config.artifacts_dir,
        chain.clone(),
    );
    let admin = Admin::new(&signers, &registry, &chain);

    match cli.command {
        Command::DeployFeeCenter => {
            let fee_center = admin.ensure_fee_center().await?;
            println!("feeCenter address: {}", fee_center.address);
        }
        Command::SetCanBridgeToken {
            token,
            chains,
            proxy,
        } => {
            let receipts = admin.set_can_bridge_token(&proxy, token, &chains).await?;
            for (chain, receipt) in chains.iter().zip(&receipts) {
                println!("chain {chain}: {}", receipt.tx_hash);
            }
            println!("MapCrossChainService setCanBridgeToken success");
        }
        Command::RegisterRelayChain { name, chain, proxy } => {
            let receipt = admin.register_relay_chain(&proxy, &name, chain).await?;
            println!("setChain tx: {}", receipt.tx_hash);
            println!("MAPCrossChainServiceRelay init {name} chain success");
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "info,mcs_admin=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
