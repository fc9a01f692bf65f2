//! Fan-out router
//!
//! Executes decoded client commands against the broker. Acknowledgements go
//! to the requester only; `PUBLISH` goes to every member of a subscriber
//! snapshot taken before the first send. One failed delivery never stops the
//! rest of the pass. Peers that failed are evicted once the pass is done.

use tracing::{debug, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::Broker;
use crate::broker::identity::ConnectionId;
use crate::broker::message::Message;
use crate::transport::codec::{Command, ServerFrame};
use crate::utils::error::{BrokerError, Result};

/// Outcome of one fan-out pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FanOutReport {
    pub delivered: Vec<ConnectionId>,
    pub evicted: Vec<ConnectionId>,
}

impl Broker {
    /// Runs one command on behalf of `from`.
    pub fn handle_command(&mut self, from: &str, command: Command) {
        if !self.clients.contains(from) {
            // evicted while its reader was still draining the socket
            debug!("Ignoring command from unregistered {from}");
            return;
        }

        match command {
            Command::Subscribe { channel } => {
                if self.subscribe(from, &channel).is_ok() {
                    debug!("{from} subscribed to {channel}");
                    self.reply(from, ServerFrame::SubAck(channel));
                }
            }
            Command::Unsubscribe { channel } => {
                if self.unsubscribe(from, &channel).is_ok() {
                    debug!("{from} unsubscribed from {channel}");
                    self.reply(from, ServerFrame::UnsubAck(channel));
                }
            }
            Command::Publish { channel, body } => match self.publish(from, &channel, body) {
                Ok(report) => debug!(
                    "{from} published to {channel}: {} delivered, {} evicted",
                    report.delivered.len(),
                    report.evicted.len()
                ),
                Err(BrokerError::NotSubscribed { .. }) => {
                    debug!("{from} published to {channel} without subscribing");
                    self.reply(from, ServerFrame::not_subscribed());
                }
                Err(e) => warn!("Publish from {from} failed: {e}"),
            },
        }
    }

    /// Publishes `body` to `channel` as `from`.
    ///
    /// The sender must have joined the channel.
    pub fn publish(&mut self, from: &str, channel: &str, body: String) -> Result<FanOutReport> {
        if !self.channels.is_subscribed(channel, from) {
            return Err(BrokerError::NotSubscribed {
                connection: from.to_string(),
                channel: channel.to_string(),
            });
        }

        let message = Message::new(channel, from.to_string(), body);
        Ok(self.fan_out(&message))
    }

    /// Delivers `message` to a snapshot of its channel's subscribers.
    pub fn fan_out(&mut self, message: &Message) -> FanOutReport {
        let snapshot = self.channels.subscribers_of(&message.channel);
        let ws_msg: WsMessage = ServerFrame::from(message).into();
        let mut report = FanOutReport::default();
        let mut failed = Vec::new();

        for sub_id in snapshot {
            match self.clients.send(&sub_id, ws_msg.clone()) {
                Ok(()) => report.delivered.push(sub_id),
                Err(e) => {
                    warn!("Failed to deliver message from {} to {sub_id}: {e}", message.sender);
                    failed.push(sub_id);
                }
            }
        }

        for sub_id in failed {
            self.disconnect(&sub_id);
            warn!("Evicted {sub_id} from the broker");
            report.evicted.push(sub_id);
        }

        debug!(
            "Fanned out message on {} published at {}",
            message.channel, message.timestamp
        );
        report
    }
}
