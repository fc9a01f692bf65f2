//! Text frame codec
//!
//! Frames are single WebSocket text messages made of colon-separated fields:
//!
//! ```text
//! client → broker   SUBSCRIBE:<channel>
//!                   UNSUBSCRIBE:<channel>
//!                   PUBLISH:<channel>:<body>
//! broker → client   IDENTITY:<id>
//!                   CHANNELS:<c1>,<c2>,...
//!                   SUB-ACK:<channel>
//!                   UNSUB-ACK:<channel>
//!                   MSG:<channel>:<sender-id>:<body>
//!                   ERROR:<code>:<details>
//! ```
//!
//! Only the leading fields are split; a body keeps any colons it contains.
//! Names (channels, identities) are case-sensitive and may not be empty or
//! contain `:`, `,`, CR or LF.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tungstenite::protocol::Message as WsMessage;

use crate::broker::identity::ConnectionId;

pub const ERR_NOT_SUBSCRIBED: u16 = 401;
pub const ERR_SERVER_FULL: u16 = 503;

/// A decoded client → broker frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Subscribe { channel: String },
    Unsubscribe { channel: String },
    Publish { channel: String, body: String },
}

/// A broker → client frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerFrame {
    Identity(ConnectionId),
    Channels(Vec<String>),
    SubAck(String),
    UnsubAck(String),
    Msg {
        channel: String,
        sender: ConnectionId,
        body: String,
    },
    Error {
        code: u16,
        details: String,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("empty frame")]
    Empty,

    #[error("frame contains a line break")]
    EmbeddedNewline,

    #[error("unknown verb: {0}")]
    UnknownVerb(String),

    #[error("{verb} frame is missing its {field} field")]
    MissingField {
        verb: &'static str,
        field: &'static str,
    },

    #[error("invalid name: {0:?}")]
    InvalidName(String),

    #[error("invalid error code: {0:?}")]
    InvalidCode(String),
}

/// Whether `name` can be used as a channel name or identity.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains([':', ',', '\r', '\n'])
}

fn name(value: &str) -> Result<String, FrameError> {
    if is_valid_name(value) {
        Ok(value.to_string())
    } else {
        Err(FrameError::InvalidName(value.to_string()))
    }
}

/// Splits off the verb. The remainder is `None` when there is no colon.
fn split_verb(frame: &str) -> Result<(&str, Option<&str>), FrameError> {
    if frame.is_empty() {
        return Err(FrameError::Empty);
    }
    if frame.contains(['\r', '\n']) {
        return Err(FrameError::EmbeddedNewline);
    }
    Ok(match frame.split_once(':') {
        Some((verb, rest)) => (verb, Some(rest)),
        None => (frame, None),
    })
}

fn field<'a>(
    rest: Option<&'a str>,
    verb: &'static str,
    field: &'static str,
) -> Result<&'a str, FrameError> {
    rest.ok_or(FrameError::MissingField { verb, field })
}

impl FromStr for Command {
    type Err = FrameError;

    fn from_str(frame: &str) -> Result<Self, Self::Err> {
        let (verb, rest) = split_verb(frame)?;
        match verb {
            "SUBSCRIBE" => Ok(Command::Subscribe {
                channel: name(field(rest, "SUBSCRIBE", "channel")?)?,
            }),
            "UNSUBSCRIBE" => Ok(Command::Unsubscribe {
                channel: name(field(rest, "UNSUBSCRIBE", "channel")?)?,
            }),
            "PUBLISH" => {
                let rest = field(rest, "PUBLISH", "channel")?;
                let (channel, body) = rest.split_once(':').ok_or(FrameError::MissingField {
                    verb: "PUBLISH",
                    field: "body",
                })?;
                Ok(Command::Publish {
                    channel: name(channel)?,
                    body: body.to_string(),
                })
            }
            other => Err(FrameError::UnknownVerb(other.to_string())),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Subscribe { channel } => write!(f, "SUBSCRIBE:{channel}"),
            Command::Unsubscribe { channel } => write!(f, "UNSUBSCRIBE:{channel}"),
            Command::Publish { channel, body } => write!(f, "PUBLISH:{channel}:{body}"),
        }
    }
}

impl ServerFrame {
    pub fn not_subscribed() -> Self {
        ServerFrame::Error {
            code: ERR_NOT_SUBSCRIBED,
            details: "Not subscribed".to_string(),
        }
    }

    pub fn server_full() -> Self {
        ServerFrame::Error {
            code: ERR_SERVER_FULL,
            details: "Server full".to_string(),
        }
    }
}

impl FromStr for ServerFrame {
    type Err = FrameError;

    fn from_str(frame: &str) -> Result<Self, Self::Err> {
        let (verb, rest) = split_verb(frame)?;
        match verb {
            "IDENTITY" => Ok(ServerFrame::Identity(name(field(rest, "IDENTITY", "id")?)?)),
            "CHANNELS" => {
                let list = field(rest, "CHANNELS", "list")?;
                if list.is_empty() {
                    return Ok(ServerFrame::Channels(Vec::new()));
                }
                let channels = list.split(',').map(name).collect::<Result<Vec<String>, FrameError>>()?;
                Ok(ServerFrame::Channels(channels))
            }
            "SUB-ACK" => Ok(ServerFrame::SubAck(name(field(rest, "SUB-ACK", "channel")?)?)),
            "UNSUB-ACK" => Ok(ServerFrame::UnsubAck(name(field(
                rest,
                "UNSUB-ACK",
                "channel",
            )?)?)),
            "MSG" => {
                let mut parts = field(rest, "MSG", "channel")?.splitn(3, ':');
                let channel = name(parts.next().unwrap_or_default())?;
                let sender = name(parts.next().ok_or(FrameError::MissingField {
                    verb: "MSG",
                    field: "sender",
                })?)?;
                let body = parts.next().ok_or(FrameError::MissingField {
                    verb: "MSG",
                    field: "body",
                })?;
                Ok(ServerFrame::Msg {
                    channel,
                    sender,
                    body: body.to_string(),
                })
            }
            "ERROR" => {
                let (code, details) =
                    field(rest, "ERROR", "code")?
                        .split_once(':')
                        .ok_or(FrameError::MissingField {
                            verb: "ERROR",
                            field: "details",
                        })?;
                let code = code
                    .parse::<u16>()
                    .map_err(|_| FrameError::InvalidCode(code.to_string()))?;
                Ok(ServerFrame::Error {
                    code,
                    details: details.to_string(),
                })
            }
            other => Err(FrameError::UnknownVerb(other.to_string())),
        }
    }
}

impl fmt::Display for ServerFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerFrame::Identity(id) => write!(f, "IDENTITY:{id}"),
            ServerFrame::Channels(names) => write!(f, "CHANNELS:{}", names.join(",")),
            ServerFrame::SubAck(channel) => write!(f, "SUB-ACK:{channel}"),
            ServerFrame::UnsubAck(channel) => write!(f, "UNSUB-ACK:{channel}"),
            ServerFrame::Msg {
                channel,
                sender,
                body,
            } => write!(f, "MSG:{channel}:{sender}:{body}"),
            ServerFrame::Error { code, details } => write!(f, "ERROR:{code}:{details}"),
        }
    }
}

impl From<ServerFrame> for WsMessage {
    fn from(frame: ServerFrame) -> Self {
        WsMessage::text(frame.to_string())
    }
}

impl From<Command> for WsMessage {
    fn from(command: Command) -> Self {
        WsMessage::text(command.to_string())
    }
}
