use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use seth_bridge_agent::cache::{EvmProviderFactory, ProviderCache};
use seth_bridge_agent::commands::{dispatch, Command};
use seth_bridge_agent::config::AgentConfig;
use seth_bridge_agent::invoker::ContractInvoker;
use seth_bridge_agent::registry::ChainRegistry;
use seth_bridge_agent::session::BridgeSession;
use seth_bridge_agent::wallet::WalletStore;

fn main() -> eyre::Result<()> {
    // Install color-eyre for better error reporting
    color_eyre::install()?;

    // Run the async main
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> eyre::Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    info!("Starting sETH Bridge Agent");

    let config = AgentConfig::from_env()?;
    let registry = Arc::new(ChainRegistry::load()?);
    config.validate(&registry)?;

    let wallet = Arc::new(WalletStore::new(&config.wallet_file));
    let cache = ProviderCache::new(Arc::new(EvmProviderFactory), wallet);
    let invoker = ContractInvoker::new(registry.clone(), config.receipt_wait.clone());

    let session =
        BridgeSession::bootstrap(registry, cache, invoker, &config.default_chain_id).await?;

    let network = session.current_network().await?;
    println!(
        "Connected to {} ({}) as {}",
        network.chain_name, network.chain_id, network.signer_address
    );
    println!("Type 'help' for commands, 'exit' to quit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
                            break;
                        }
                        match Command::parse(line) {
                            Ok(command) => println!("{}", dispatch(&session, command).await),
                            Err(e) => println!("Error: {}", e),
                        }
                    }
                    // stdin closed
                    Ok(None) => break,
                    Err(e) => {
                        error!(error = %e, "Failed to read input");
                        break;
                    }
                }
            }
            _ = wait_for_shutdown_signal() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    info!("Shutting down");
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,seth_bridge_agent=debug"));

    if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
