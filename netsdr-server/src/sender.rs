//! Periodic UDP data item sender.
//!
//! Emulates a device streaming sample blocks: every interval one data item
//! carrying a sequence number and random sample bytes goes to the target.

use crate::config::SenderConfig;
use crate::error::ServerError;
use bytes::BytesMut;
use netsdr_protocol::{DataItem, MessageType, ProtocolError};
use parking_lot::Mutex;
use rand::RngCore;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Returns the sequence number sent after `seq`. Zero only marks the first
/// block of a stream.
pub fn next_sequence(seq: u16) -> u16 {
    if seq == u16::MAX {
        1
    } else {
        seq + 1
    }
}

/// Builds one data block of `block_size` random sample bytes.
pub fn random_block(
    msg_type: MessageType,
    sequence_number: u16,
    block_size: usize,
) -> Result<BytesMut, ProtocolError> {
    let mut body = vec![0u8; block_size];
    rand::rng().fill_bytes(&mut body);
    DataItem::new(msg_type, sequence_number, body).encode()
}

/// Sends data items to a fixed target on a timer.
pub struct UdpTimedSender {
    config: SenderConfig,
    task: Mutex<Option<JoinHandle<()>>>,
    blocks_sent: Arc<AtomicU64>,
}

impl UdpTimedSender {
    pub fn new(config: SenderConfig) -> Self {
        Self {
            config,
            task: Mutex::new(None),
            blocks_sent: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Returns the sender configuration.
    pub fn config(&self) -> &SenderConfig {
        &self.config
    }

    /// Starts sending in a background task.
    pub async fn start(&self) -> Result<(), ServerError> {
        if self.is_running() {
            return Err(ServerError::AlreadyRunning);
        }

        self.config.validate()?;

        let bind_addr: SocketAddr = if self.config.target_addr.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(bind_addr).await?;

        tracing::info!(
            "Sending {}-byte data blocks to {} every {:?}",
            self.config.block_size,
            self.config.target_addr,
            self.config.interval()
        );

        let config = self.config.clone();
        let blocks_sent = self.blocks_sent.clone();
        let handle = tokio::spawn(async move {
            Self::send_loop(socket, config, blocks_sent).await;
        });

        let mut task = self.task.lock();
        if let Some(old) = task.replace(handle) {
            old.abort();
        }
        Ok(())
    }

    async fn send_loop(socket: UdpSocket, config: SenderConfig, blocks_sent: Arc<AtomicU64>) {
        let mut ticker = tokio::time::interval(config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut seq: u16 = 0;

        loop {
            ticker.tick().await;

            let block = match random_block(config.message_type, seq, config.block_size) {
                Ok(block) => block,
                Err(e) => {
                    tracing::error!("Failed to build data block: {}", e);
                    return;
                }
            };

            match socket.send_to(&block, config.target_addr).await {
                Ok(n) => {
                    tracing::debug!("Sent data block #{} ({} bytes)", seq, n);
                    blocks_sent.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => tracing::error!("Send to {} failed: {}", config.target_addr, e),
            }

            seq = next_sequence(seq);
        }
    }

    /// Stops sending. Does nothing when not started.
    pub fn stop(&self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
            tracing::info!("Stopped sending to {}", self.config.target_addr);
        }
    }

    /// Returns whether the send task is active.
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Returns the number of blocks sent so far.
    pub fn blocks_sent(&self) -> u64 {
        self.blocks_sent.load(Ordering::Relaxed)
    }
}

impl Drop for UdpTimedSender {
    fn drop(&mut self) {
        self.stop();
    }
}
