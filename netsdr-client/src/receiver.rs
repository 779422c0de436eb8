//! UDP receiver for the data item stream.

use crate::error::ClientError;
use crate::sequence::{SequenceEvent, SequenceStats, SequenceTracker};
use netsdr_protocol::{DataItem, Message, DEFAULT_DATA_PORT, MAX_DATA_ITEM_LENGTH};
use std::net::{Ipv4Addr, SocketAddr};
use tokio::net::UdpSocket;

/// Largest UDP payload.
const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Data receiver configuration.
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Local address to bind.
    pub bind_addr: SocketAddr,
    /// Largest datagram accepted; larger ones are dropped.
    pub datagram_size: usize,
}

impl ReceiverConfig {
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            datagram_size: MAX_DATA_ITEM_LENGTH,
        }
    }

    pub fn with_datagram_size(mut self, size: usize) -> Self {
        self.datagram_size = size.clamp(MAX_DATA_ITEM_LENGTH, MAX_DATAGRAM_SIZE);
        self
    }
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_DATA_PORT)))
    }
}

/// Receives data items streamed by the device.
pub struct DataReceiver {
    socket: UdpSocket,
    // One byte past datagram_size, so a truncated read fills it
    buf: Vec<u8>,
    datagram_size: usize,
    tracker: SequenceTracker,
}

impl DataReceiver {
    /// Binds the receive socket.
    pub async fn bind(config: ReceiverConfig) -> Result<Self, ClientError> {
        let socket = UdpSocket::bind(config.bind_addr).await?;
        tracing::info!("Listening for data items on {}", socket.local_addr()?);
        Ok(Self {
            socket,
            buf: vec![0u8; config.datagram_size + 1],
            datagram_size: config.datagram_size,
            tracker: SequenceTracker::new(),
        })
    }

    /// Returns the bound address.
    pub fn local_addr(&self) -> Result<SocketAddr, ClientError> {
        Ok(self.socket.local_addr()?)
    }

    /// Waits for the next valid data item.
    ///
    /// Datagrams that are not data items, or larger than the configured
    /// datagram size, are logged and skipped.
    pub async fn recv(&mut self) -> Result<DataItem, ClientError> {
        loop {
            let (n, from) = self.socket.recv_from(&mut self.buf).await?;

            if n > self.datagram_size {
                tracing::warn!(
                    "[{}] Dropping datagram larger than {} bytes",
                    from,
                    self.datagram_size
                );
                continue;
            }

            let item = match Message::parse(&self.buf[..n]) {
                Ok(Message::Data(item)) => item,
                Ok(Message::Control(item)) => {
                    tracing::debug!("[{}] Ignoring control item {} on data port", from, item.item_code);
                    continue;
                }
                Err(e) => {
                    tracing::warn!("[{}] Dropping datagram ({} bytes): {}", from, n, e);
                    continue;
                }
            };

            match self.tracker.observe(item.sequence_number) {
                SequenceEvent::Gap { missing } => tracing::warn!(
                    "[{}] Lost {} data block(s) before #{}",
                    from,
                    missing,
                    item.sequence_number
                ),
                SequenceEvent::Late => tracing::debug!(
                    "[{}] Late data block #{}",
                    from,
                    item.sequence_number
                ),
                SequenceEvent::Start => {
                    tracing::debug!("[{}] Stream started at #{}", from, item.sequence_number)
                }
                SequenceEvent::InOrder => {}
            }

            return Ok(item);
        }
    }

    /// Returns sequence statistics for the stream so far.
    pub fn stats(&self) -> SequenceStats {
        self.tracker.stats()
    }
}
