use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::Context;

use reactor_core::{config::ServerConfig, engine::Launch, server::Server};
use reactor_http::HttpTransport;

mod commands;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = reactor_core::logging::init("reactor") {
        eprintln!("reactor: {e}");
        return ExitCode::FAILURE;
    }

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("reactor exited with a fault: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {

    let cfg = ServerConfig::from_env().context("loading configuration")?;
    let transport = Arc::new(HttpTransport::new(&cfg).context("building http transport")?);
    let router = Arc::new(commands::CommandRouter::new(
        std::env::var_os("REACTOR_DEMO_VIDEO").map(PathBuf::from),
    ));

    let mut server = Server::new(cfg, transport, router)?;

    let stop = server.stop_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, stopping after the current poll");
            stop.cancel();
        }
    });

    tracing::info!("starting telegram server");
    server.start(Launch::Joined).await?;
    tracing::info!("server stopped");
    Ok(())
}
