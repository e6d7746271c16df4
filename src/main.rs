use clap::Parser;
use searchgate::{
    config::Config,
    grpc::start_grpc_server,
    searcher::{ConcurrentSearcher, RankingConfig},
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "searchgate", about = "Concurrent search gateway over an externally built index")]
struct Args {
    /// Configuration file (overrides SEARCHGATE_CONFIG)
    #[arg(short, long, env = "SEARCHGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Index directory (overrides the configured path)
    #[arg(short, long)]
    index: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration
    let config = Config::load(args.config.as_deref())?;

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("searchgate={}", config.observability.log_level).into());
    if config.observability.json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Starting searchgate v{}", env!("CARGO_PKG_VERSION"));

    let index_path = args
        .index
        .unwrap_or_else(|| PathBuf::from(&config.search.index_path));
    tracing::info!("Index directory: {}", index_path.display());

    // Open the current snapshot of the externally written index
    let ranking = RankingConfig::new(config.search.default_fields.clone());
    let searcher = Arc::new(ConcurrentSearcher::open(&index_path, ranking)?);

    let info = searcher.info();
    tracing::info!(
        num_docs = info.num_docs,
        num_segments = info.num_segments,
        opstamp = info.opstamp,
        "Index snapshot adopted"
    );

    // Spawn the periodic refresh task
    if config.search.refresh_interval_secs > 0 {
        let refresh_searcher = searcher.clone();
        let interval = Duration::from_secs(config.search.refresh_interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let searcher = refresh_searcher.clone();
                let result = tokio::task::spawn_blocking(move || searcher.refresh()).await;
                match result {
                    Ok(Ok(true)) => tracing::info!("Adopted newer index snapshot"),
                    Ok(Ok(false)) => tracing::debug!("Index snapshot unchanged"),
                    Ok(Err(e)) => tracing::error!("Snapshot refresh failed: {}", e),
                    Err(e) => tracing::error!("Refresh task panicked: {}", e),
                }
            }
        });
        tracing::info!(
            "Snapshot refresh task started (every {}s)",
            config.search.refresh_interval_secs
        );
    } else {
        tracing::info!("Periodic snapshot refresh disabled; refresh via RPC only");
    }

    // Run the gRPC server until shutdown
    let grpc_config = config.clone();
    let grpc_searcher = searcher.clone();
    let grpc_handle = tokio::spawn(async move {
        if let Err(e) = start_grpc_server(&grpc_config, grpc_searcher).await {
            tracing::error!("gRPC server error: {}", e);
        }
    });

    tokio::select! {
        _ = grpc_handle => {
            tracing::warn!("gRPC server stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    tracing::info!("Shutting down gracefully...");
    Ok(())
}
