//! CLI for chanbus
//!
//! Subcommands:
//! - `server`: run the WebSocket broker
//! - `client`: run a report agent against a running broker (smoke test)

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chanbus::agent::ReportAgent;
use chanbus::broker::Broker;
use chanbus::config::load_config;
use chanbus::transport::ServerFrame;
use chanbus::transport::start_websocket_server;
use clap::Parser;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "chanbus", version, about)]
enum Command {
    /// Start the WebSocket broker
    Server {
        /// Override `server.host`
        #[arg(long)]
        host: Option<String>,
        /// Override `server.port`
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run a report agent: subscribe, publish one report, wait for the echo
    Client {
        /// WebSocket URL of the broker
        #[arg(long, default_value = "ws://127.0.0.1:8765")]
        url: String,
        /// Channel to report on
        #[arg(long, default_value = "reports")]
        channel: String,
        /// Agent name included in the report
        #[arg(long, default_value = "status-agent")]
        agent: String,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cmd = Command::parse();

    match cmd {
        Command::Server { host, port } => {
            if let Err(e) = run_server(host, port).await {
                // no-op when run_server already installed the subscriber
                chanbus::utils::logging::init("info");
                error!("Server failed: {e}");
                std::process::exit(1);
            }
        }
        Command::Client {
            url,
            channel,
            agent,
        } => {
            chanbus::utils::logging::init("info");
            if let Err(e) = run_client(&url, &channel, &agent).await {
                error!("Client failed: {e}");
                std::process::exit(1);
            }
        }
    }
}

async fn run_server(
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config()?;
    chanbus::utils::logging::init(&config.logging.level);

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let addr = config.server.addr();
    let broker = Arc::new(Mutex::new(Broker::new(config.broker.clone())));

    tokio::select! {
        res = start_websocket_server(&addr, broker) => {
            res?;
            error!("WebSocket server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    Ok(())
}

async fn run_client(url: &str, channel: &str, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut agent = ReportAgent::connect(url, name).await?;
    agent.subscribe(channel).await?;

    let report = agent.report(channel);
    agent.publish(channel, &report).await?;
    info!("Published report to {channel}");

    let echo = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match agent.next_frame().await? {
                ServerFrame::Msg { sender, body, .. } if sender == agent.identity() => {
                    return Ok::<_, chanbus::agent::AgentError>(body);
                }
                other => info!("Incoming: {other}"),
            }
        }
    })
    .await??;
    info!("Report delivered: {echo}");

    agent.close().await?;
    Ok(())
}
