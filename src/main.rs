use std::sync::Arc;

use trading_chat::channels::{CliChannel, ws};
use trading_chat::config::{AppConfig, RunnerConfig};
use trading_chat::conversation::Collector;
use trading_chat::error::{ChannelError, Result};

#[tokio::main]
async fn main() -> Result<()> {
    // Credentials for the pipeline (API keys etc.) come from .env when present
    let dotenv_path = dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        eprintln!("  export TRADING_CHAT_PIPELINE_CMD='python -m my_pipeline'");
        eprintln!("  or TRADING_CHAT_RUNNER=http TRADING_CHAT_PIPELINE_URL=http://host/analyze");
        std::process::exit(1);
    });

    let runner = config.build_runner()?;
    let base_config = config.load_base_config()?;

    eprintln!("📊 Trading Chat v{}", env!("CARGO_PKG_VERSION"));
    if let Some(ref path) = dotenv_path {
        eprintln!("   Env file: {}", path.display());
    }
    match config.runner {
        RunnerConfig::Command { ref command_line } => eprintln!("   Pipeline: command `{}`", command_line),
        RunnerConfig::Http { ref url, .. } => eprintln!("   Pipeline: POST {}", url),
    }
    if let Some(ref path) = config.base_config_path {
        eprintln!("   Base config: {}", path.display());
    }
    eprintln!("   Dispatch timeout: {}s", config.dispatch_timeout.as_secs());

    let collector = Arc::new(
        Collector::new(runner, base_config).with_dispatch_timeout(config.dispatch_timeout),
    );

    // ── WebSocket chat ──────────────────────────────────────────────────
    let listener = match config.ws_port {
        Some(port) => {
            let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
                .await
                .map_err(|e| ChannelError::StartupFailed {
                    name: "ws".to_string(),
                    reason: format!("bind port {}: {}", port, e),
                })?;
            eprintln!("   Chat WS: ws://0.0.0.0:{}/ws/chat", port);
            Some(listener)
        }
        None => None,
    };

    if !config.cli_enabled {
        // from_env guarantees a port when the CLI is off
        if let Some(listener) = listener {
            ws::serve(listener, collector).await?;
        }
        return Ok(());
    }

    if let Some(listener) = listener {
        let collector = Arc::clone(&collector);
        tokio::spawn(async move {
            if let Err(e) = ws::serve(listener, collector).await {
                tracing::error!("Chat WebSocket server stopped: {}", e);
            }
        });
    }

    // ── CLI ─────────────────────────────────────────────────────────────
    eprintln!("   Type your answers and press Enter. /restart to start over, /quit to exit.\n");
    CliChannel::new(collector).run().await?;

    Ok(())
}
