//! Weaver - MCP server over a local markdown knowledge vault

use rmcp::transport::stdio;
use rmcp::ServiceExt;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use weaver::config::Config;
use weaver::error::WeaverError;
use weaver::mcp::WeaverServer;
use weaver::RuntimeContext;

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!(error = %e, "weaver exited with error");
            e.exit_code()
        }
    };
    std::process::exit(exit_code);
}

async fn run() -> Result<(), WeaverError> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::new(config.log_level.clone()))
        .init();

    tracing::info!(vault = %config.vault_path.display(), "starting weaver");

    let vault_root = config.vault_path.clone();
    let ctx = RuntimeContext::build(config).await?;

    let _watch_loop = ctx.spawn_watch_loop()?;
    let _retention_sweep = ctx.spawn_retention_sweep();

    let server = WeaverServer::new(ctx.cache.clone(), ctx.runner.clone(), vault_root);
    let service = server.serve(stdio()).await.map_err(|e| WeaverError::Config(e.to_string()))?;

    tracing::info!("weaver MCP server started");
    service.waiting().await.map_err(|e| WeaverError::Config(e.to_string()))?;

    Ok(())
}
