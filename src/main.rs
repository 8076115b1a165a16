use anyhow::{anyhow, Context};
use clap::Parser;
use hou::{logger, server, Cli, Server, Settings};
use tracing::info;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(&cli).context("failed to load configuration")?;

    logger::init(&settings.logging, settings.verbose)
        .map_err(|e| anyhow!("failed to initialize logging: {e}"))?;
    logger::log_config_table(&settings);

    // Runtime thread count follows performance.workers, CPU count otherwise
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = settings.performance.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder
        .build()
        .context("failed to build tokio runtime")?;

    runtime.block_on(async_main(settings))
}

async fn async_main(settings: Settings) -> anyhow::Result<()> {
    let server = Server::bind(settings).context("failed to start server")?;
    server.run(server::shutdown_signal()).await?;
    info!("Server stopped");
    Ok(())
}
