//! Run command - connect to X-Plane and keep ground services in sync.

use groundsync::config::ConfigFile;
use groundsync::service::{GroundSyncRuntime, ServiceError, XPlaneContext};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Run the run command.
pub fn run(debug: bool) -> Result<(), CliError> {
    let runner = CliRunner::with_debug(debug)?;
    runner.log_startup("run");

    let config = runner.config();
    info!(
        host = %config.connection.host,
        port = config.connection.port,
        prefix = %config.ground_ops.prefix,
        "Configuration loaded"
    );

    println!("GroundSync v{}", groundsync::VERSION);
    println!(
        "Connecting to X-Plane at {}:{} (Ctrl-C to stop)",
        config.connection.host, config.connection.port
    );

    runner.block_on(serve(config))??;

    println!("GroundSync stopped.");
    Ok(())
}

async fn serve(config: &ConfigFile) -> Result<(), ServiceError> {
    let context = XPlaneContext::from_config(config)?;
    let runtime = GroundSyncRuntime::new(context);

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown requested");
                shutdown.cancel();
            }
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
        }
    });

    runtime.run(cancel).await
}
