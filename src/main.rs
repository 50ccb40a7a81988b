use clap::Parser;
use feed_calc::utils::error::AppError;
use feed_calc::utils::{logger, validation::Validate};
use feed_calc::{server, AppState, LocalAssets, ServerConfig, Topology};

fn main() {
    let config = ServerConfig::parse();

    if config.json_logs {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_server_logger(config.verbose);
    }

    let topology = Topology::default();
    tracing::info!(
        "Starting feed-calc: {} workers x {} threads, {:?} request timeout",
        topology.workers,
        topology.threads_per_worker,
        topology.request_timeout
    );
    if config.verbose {
        tracing::debug!("Server config: {:?}", config);
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(topology.total_slots())
        .thread_name("feed-calc-worker")
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => fail(AppError::IoError(e)),
    };

    if let Err(e) = runtime.block_on(run(config, topology)) {
        fail(e);
    }
}

async fn run(config: ServerConfig, topology: Topology) -> feed_calc::Result<()> {
    config.validate()?;
    topology.validate()?;

    let assets = LocalAssets::new(".");
    let state = AppState::load(&assets, &config, topology).await?;
    let app = server::build_router(state);

    let listener = server::bind(config.bind_addr()?).await?;
    server::serve(listener, app).await
}

fn fail(e: AppError) -> ! {
    tracing::error!(
        "❌ Startup failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());

    // Start-time failures never exit 0, whatever their severity.
    std::process::exit(e.exit_code().max(1));
}
