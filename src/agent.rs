//! Report agent
//!
//! A small protocol client used by the `client` subcommand and by the
//! end-to-end tests. It performs the connect handshake (`IDENTITY`, then
//! `CHANNELS`), subscribes, and publishes JSON reports.

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::identity::ConnectionId;
use crate::transport::codec::{Command, FrameError, ServerFrame};

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("malformed frame from broker: {0}")]
    Frame(#[from] FrameError),

    #[error("unexpected frame during handshake: {0}")]
    Handshake(String),

    #[error("broker returned error {code}: {details}")]
    Server { code: u16, details: String },

    #[error("connection closed by broker")]
    ConnectionClosed,
}

pub struct ReportAgent {
    name: String,
    identity: ConnectionId,
    available_channels: Vec<String>,
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl ReportAgent {
    /// Connects to `url` and completes the identity handshake.
    pub async fn connect(url: &str, name: &str) -> Result<Self, AgentError> {
        let (mut ws, _response) = connect_async(url).await?;

        let identity = match next_frame(&mut ws).await? {
            ServerFrame::Identity(id) => id,
            ServerFrame::Error { code, details } => {
                return Err(AgentError::Server { code, details });
            }
            other => return Err(AgentError::Handshake(other.to_string())),
        };
        let available_channels = match next_frame(&mut ws).await? {
            ServerFrame::Channels(channels) => channels,
            other => return Err(AgentError::Handshake(other.to_string())),
        };
        info!("{name} connected as {identity}; channels: {available_channels:?}");

        Ok(Self {
            name: name.to_string(),
            identity,
            available_channels,
            ws,
        })
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn available_channels(&self) -> &[String] {
        &self.available_channels
    }

    /// Subscribes and waits for the matching `SUB-ACK`. Messages that arrive
    /// in between are skipped.
    pub async fn subscribe(&mut self, channel: &str) -> Result<(), AgentError> {
        self.send(Command::Subscribe {
            channel: channel.to_string(),
        })
        .await?;

        loop {
            match self.next_frame().await? {
                ServerFrame::SubAck(acked) if acked == channel => return Ok(()),
                ServerFrame::Error { code, details } => {
                    return Err(AgentError::Server { code, details });
                }
                other => debug!("{} skipped {other} while subscribing", self.name),
            }
        }
    }

    pub async fn publish(&mut self, channel: &str, body: &str) -> Result<(), AgentError> {
        self.send(Command::Publish {
            channel: channel.to_string(),
            body: body.to_string(),
        })
        .await
    }

    /// Builds a compact JSON report for `channel`.
    pub fn report(&self, channel: &str) -> String {
        json!({
            "agent": self.name,
            "identity": self.identity,
            "channel": channel,
            "kind": "status_report",
            "generated_at": chrono::Utc::now().to_rfc3339(),
            "summary": format!("{} is online and reporting on {}", self.name, channel),
        })
        .to_string()
    }

    /// Waits for the next text frame from the broker.
    pub async fn next_frame(&mut self) -> Result<ServerFrame, AgentError> {
        next_frame(&mut self.ws).await
    }

    pub async fn close(mut self) -> Result<(), AgentError> {
        self.ws.close(None).await?;
        Ok(())
    }

    async fn send(&mut self, command: Command) -> Result<(), AgentError> {
        self.ws.send(WsMessage::from(command)).await?;
        Ok(())
    }
}

async fn next_frame(
    ws: &mut WebSocketStream<MaybeTlsStream<TcpStream>>,
) -> Result<ServerFrame, AgentError> {
    while let Some(msg) = ws.next().await {
        match msg? {
            WsMessage::Text(text) => return Ok(text.as_str().parse()?),
            WsMessage::Close(_) => return Err(AgentError::ConnectionClosed),
            _ => {}
        }
    }
    Err(AgentError::ConnectionClosed)
}
