//! Control channel connection management.

use crate::error::ClientError;
use netsdr_protocol::control::is_nak;
use netsdr_protocol::{
    ControlItem, ControlItemCode, Decoder, Encoder, Message, MessageType, DEFAULT_CONTROL_PORT,
};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, oneshot, Mutex};

/// Default read buffer size (8 KiB).
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// Minimum read buffer size (1 KiB).
pub const MIN_READ_BUFFER_SIZE: usize = 1024;

/// Maximum read buffer size (1 MiB).
pub const MAX_READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Default capacity for the unsolicited message channel.
const UNSOLICITED_CHANNEL_CAPACITY: usize = 256;

/// Byte stream the control channel runs over.
pub trait Transport: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> Transport for T {}

type BoxedTransport = Box<dyn Transport>;

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Device control address.
    pub addr: SocketAddr,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Time to wait for the reply to a control item.
    pub request_timeout: Duration,
    /// Read buffer size for socket reads.
    pub read_buffer_size: usize,
}

impl ConnectionConfig {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(5),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.clamp(MIN_READ_BUFFER_SIZE, MAX_READ_BUFFER_SIZE);
        self
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_CONTROL_PORT)))
    }
}

/// A control item request waiting for its reply.
struct PendingRequest {
    item_code: ControlItemCode,
    tx: oneshot::Sender<Result<ControlItem, ClientError>>,
}

/// A control channel connection to a NetSDR device.
///
/// Replies are delivered by [`Connection::read_loop`], which the owner must
/// run in a background task. The device answers control items in order, so
/// only one request is in flight at a time.
pub struct Connection {
    config: ConnectionConfig,
    /// Write half of the stream (for sending control items).
    writer: Mutex<Option<WriteHalf<BoxedTransport>>>,
    /// Read half of the stream (for receiving replies).
    reader: Mutex<Option<ReadHalf<BoxedTransport>>>,
    /// Decoder for reassembling frames.
    decoder: Mutex<Decoder>,
    /// Request waiting for a reply.
    pending: Mutex<Option<PendingRequest>>,
    /// Serializes requests.
    request_lock: Mutex<()>,
    connected: AtomicBool,
    /// Messages that did not answer a pending request.
    unsolicited: broadcast::Sender<Message>,
}

impl Connection {
    /// Creates a new connection (not yet connected).
    pub fn new(config: ConnectionConfig) -> Self {
        let (unsolicited, _) = broadcast::channel(UNSOLICITED_CHANNEL_CAPACITY);
        Self {
            config,
            writer: Mutex::new(None),
            reader: Mutex::new(None),
            decoder: Mutex::new(Decoder::new()),
            pending: Mutex::new(None),
            request_lock: Mutex::new(()),
            connected: AtomicBool::new(false),
            unsolicited,
        }
    }

    /// Returns the connection configuration.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Subscribes to messages that were not replies to a request, such as
    /// unsolicited status items or data items sent over TCP.
    pub fn subscribe_unsolicited(&self) -> broadcast::Receiver<Message> {
        self.unsolicited.subscribe()
    }

    /// Connects to the device.
    pub async fn connect(&self) -> Result<(), ClientError> {
        tracing::debug!("Connecting to {}...", self.config.addr);

        let tcp_stream = tokio::time::timeout(
            self.config.connect_timeout,
            TcpStream::connect(self.config.addr),
        )
        .await
        .map_err(|_| {
            tracing::debug!("Connection timeout");
            ClientError::Timeout
        })?
        .map_err(|e| {
            tracing::debug!("Connection failed: {}", e);
            ClientError::Io(e)
        })?;

        tcp_stream.set_nodelay(true).ok();
        self.attach(tcp_stream).await;

        tracing::info!("Connected to {}", self.config.addr);
        Ok(())
    }

    /// Uses an already established stream as the control channel.
    pub async fn attach<T: Transport + 'static>(&self, stream: T) {
        let stream: BoxedTransport = Box::new(stream);
        let (read_half, write_half) = tokio::io::split(stream);
        *self.writer.lock().await = Some(write_half);
        *self.reader.lock().await = Some(read_half);
        self.decoder.lock().await.clear();
        self.connected.store(true, Ordering::SeqCst);
    }

    /// Sends a control item without waiting for a reply.
    pub async fn send_control_item(
        &self,
        msg_type: MessageType,
        item_code: ControlItemCode,
        parameters: &[u8],
    ) -> Result<(), ClientError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(ClientError::NotConnected);
        }

        let encoded = Encoder::encode_control_item(msg_type, item_code, parameters)?;
        tracing::debug!(
            "Sending {:?} {} ({} bytes)",
            msg_type,
            item_code,
            encoded.len()
        );

        let mut writer_guard = self.writer.lock().await;
        let writer = writer_guard.as_mut().ok_or(ClientError::NotConnected)?;
        writer.write_all(&encoded).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Sends a control item and waits for the reply carrying the same item
    /// code.
    pub async fn request(
        &self,
        msg_type: MessageType,
        item_code: ControlItemCode,
        parameters: &[u8],
    ) -> Result<ControlItem, ClientError> {
        if !self.connected.load(Ordering::SeqCst) {
            tracing::debug!("request() called but not connected");
            return Err(ClientError::NotConnected);
        }

        let _serial = self.request_lock.lock().await;

        let (tx, rx) = oneshot::channel();
        *self.pending.lock().await = Some(PendingRequest { item_code, tx });

        if let Err(e) = self.send_control_item(msg_type, item_code, parameters).await {
            self.pending.lock().await.take();
            return Err(e);
        }

        let reply = match tokio::time::timeout(self.config.request_timeout, rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => {
                tracing::debug!("Request {} channel closed", item_code);
                Err(ClientError::ConnectionClosed)
            }
            Err(_) => {
                tracing::debug!("Request {} timed out", item_code);
                self.pending.lock().await.take();
                Err(ClientError::Timeout)
            }
        };

        tracing::debug!("Request {} completed (ok={})", item_code, reply.is_ok());
        reply
    }

    /// Reads and dispatches replies and unsolicited messages (call this in a
    /// background task).
    ///
    /// Frames that fail to parse are logged and skipped.
    pub async fn read_loop(&self) -> Result<(), ClientError> {
        tracing::debug!("read_loop started");
        let mut buf = vec![0u8; self.config.read_buffer_size];

        loop {
            let n = {
                let mut reader_guard = self.reader.lock().await;
                let reader = reader_guard.as_mut().ok_or(ClientError::NotConnected)?;
                reader.read(&mut buf).await?
            };

            if n == 0 {
                tracing::debug!("read_loop: connection closed");
                self.connected.store(false, Ordering::SeqCst);
                if let Some(pending) = self.pending.lock().await.take() {
                    let _ = pending.tx.send(Err(ClientError::ConnectionClosed));
                }
                return Err(ClientError::ConnectionClosed);
            }

            tracing::debug!("read_loop: received {} bytes", n);
            let mut decoder = self.decoder.lock().await;
            decoder.extend(&buf[..n]);

            loop {
                let frame = match decoder.decode_frame() {
                    Ok(Some(frame)) => frame,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!("read_loop: dropping frame: {}", e);
                        continue;
                    }
                };

                if is_nak(&frame) {
                    self.dispatch_nak().await;
                    continue;
                }

                match Message::parse(&frame) {
                    Ok(message) => self.dispatch(message).await,
                    Err(e) => tracing::warn!("read_loop: dropping frame: {}", e),
                }
            }
        }
    }

    async fn dispatch(&self, message: Message) {
        if let Message::Control(ref item) = message {
            let mut pending = self.pending.lock().await;
            let matches = pending
                .as_ref()
                .is_some_and(|p| p.item_code == item.item_code);
            if matches {
                if let Some(p) = pending.take() {
                    tracing::debug!("read_loop: dispatching reply {}", item.item_code);
                    let _ = p.tx.send(Ok(item.clone()));
                }
                return;
            }
        }

        tracing::debug!(
            "read_loop: unsolicited {:?} {}",
            message.msg_type(),
            message.item_code()
        );
        // Ignore errors (no subscribers)
        let _ = self.unsolicited.send(message);
    }

    async fn dispatch_nak(&self) {
        match self.pending.lock().await.take() {
            Some(p) => {
                tracing::debug!("read_loop: NAK for {}", p.item_code);
                let _ = p.tx.send(Err(ClientError::Nak(p.item_code)));
            }
            None => tracing::warn!("read_loop: NAK with no request pending"),
        }
    }

    /// Returns whether the connection is established.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Returns whether a request is waiting for its reply.
    pub fn has_pending(&self) -> bool {
        self.pending
            .try_lock()
            .map(|p| p.is_some())
            .unwrap_or(true)
    }

    /// Closes the connection.
    ///
    /// Stop the task running [`Connection::read_loop`] first; it holds the
    /// read half while waiting for data.
    pub async fn close(&self) -> Result<(), ClientError> {
        tracing::debug!("Closing connection...");
        self.connected.store(false, Ordering::SeqCst);

        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }
        let _ = self.reader.lock().await.take();

        // Dropping the sender fails the waiting request
        self.pending.lock().await.take();

        tracing::debug!("Connection closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netsdr_protocol::DataItem;
    use std::sync::Arc;
    use tokio_test::io::Builder;

    fn test_config() -> ConnectionConfig {
        ConnectionConfig::new("127.0.0.1:50000".parse().unwrap())
            .with_request_timeout(Duration::from_millis(200))
    }

    fn control_frame(msg_type: MessageType, code: ControlItemCode, params: &[u8]) -> Vec<u8> {
        Encoder::encode_control_item(msg_type, code, params)
            .unwrap()
            .to_vec()
    }

    #[test]
    fn test_config_defaults() {
        let config = ConnectionConfig::default();
        assert_eq!(config.addr.port(), DEFAULT_CONTROL_PORT);
        assert_eq!(config.read_buffer_size, DEFAULT_READ_BUFFER_SIZE);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_config_buffer_clamping() {
        let config =
            ConnectionConfig::new("127.0.0.1:50000".parse().unwrap()).with_read_buffer_size(100); // Below minimum
        assert_eq!(config.read_buffer_size, MIN_READ_BUFFER_SIZE);

        let config = ConnectionConfig::new("127.0.0.1:50000".parse().unwrap())
            .with_read_buffer_size(10 * 1024 * 1024); // Above maximum
        assert_eq!(config.read_buffer_size, MAX_READ_BUFFER_SIZE);
    }

    #[tokio::test]
    async fn test_request_not_connected() {
        let conn = Connection::new(test_config());
        let result = conn
            .request(MessageType::CurrentControlItem, ControlItemCode::ReceiverState, &[])
            .await;
        assert!(matches!(result, Err(ClientError::NotConnected)));
    }

    #[tokio::test]
    async fn test_request_reply() {
        let request = control_frame(
            MessageType::CurrentControlItem,
            ControlItemCode::ReceiverFrequency,
            &[0x00],
        );
        let reply = control_frame(
            MessageType::SetControlItem,
            ControlItemCode::ReceiverFrequency,
            &[0x00, 0x40, 0x42, 0x0F, 0x00, 0x00],
        );
        let mock = Builder::new().write(&request).read(&reply).build();

        let conn = Arc::new(Connection::new(test_config()));
        conn.attach(mock).await;

        let reader = {
            let conn = conn.clone();
            tokio::spawn(async move { conn.read_loop().await })
        };

        let item = conn
            .request(
                MessageType::CurrentControlItem,
                ControlItemCode::ReceiverFrequency,
                &[0x00],
            )
            .await
            .unwrap();
        assert_eq!(item.item_code, ControlItemCode::ReceiverFrequency);
        assert_eq!(item.parameters.as_ref(), &[0x00, 0x40, 0x42, 0x0F, 0x00, 0x00]);

        // Mock reports EOF once its script is exhausted
        let result = reader.await.unwrap();
        assert!(matches!(result, Err(ClientError::ConnectionClosed)));
        assert!(!conn.is_connected());
    }

    #[tokio::test]
    async fn test_request_nak() {
        let request = control_frame(
            MessageType::SetControlItem,
            ControlItemCode::RFFilter,
            &[0x00, 0x0B],
        );
        let mock = Builder::new().write(&request).read(&[0x02, 0x00]).build();

        let conn = Arc::new(Connection::new(test_config()));
        conn.attach(mock).await;
        let reader = {
            let conn = conn.clone();
            tokio::spawn(async move { conn.read_loop().await })
        };

        let result = conn
            .request(
                MessageType::SetControlItem,
                ControlItemCode::RFFilter,
                &[0x00, 0x0B],
            )
            .await;
        assert!(matches!(
            result,
            Err(ClientError::Nak(ControlItemCode::RFFilter))
        ));
        let _ = reader.await;
    }

    #[tokio::test]
    async fn test_invalid_frame_is_skipped() {
        let request = control_frame(
            MessageType::CurrentControlItem,
            ControlItemCode::ADModes,
            &[],
        );
        let mut replies = vec![0x04, 0x20, 0x77, 0x77]; // unknown item code
        replies.extend(control_frame(
            MessageType::CurrentControlItem,
            ControlItemCode::ADModes,
            &[0x01],
        ));
        let mock = Builder::new().write(&request).read(&replies).build();

        let conn = Arc::new(Connection::new(test_config()));
        conn.attach(mock).await;
        let reader = {
            let conn = conn.clone();
            tokio::spawn(async move { conn.read_loop().await })
        };

        let item = conn
            .request(MessageType::CurrentControlItem, ControlItemCode::ADModes, &[])
            .await
            .unwrap();
        assert_eq!(item.parameters.as_ref(), &[0x01]);
        let _ = reader.await;
    }

    #[tokio::test]
    async fn test_unsolicited_messages() {
        let status = control_frame(
            MessageType::CurrentControlItem,
            ControlItemCode::ReceiverState,
            &[0x80, 0x02],
        );
        let block = DataItem::new(MessageType::DataItem0, 1, vec![0x10u8, 0x20])
            .encode()
            .unwrap();
        let mock = Builder::new().read(&status).read(&block).build();

        let conn = Connection::new(test_config());
        let mut rx = conn.subscribe_unsolicited();
        conn.attach(mock).await;

        let result = conn.read_loop().await;
        assert!(matches!(result, Err(ClientError::ConnectionClosed)));

        let first = rx.recv().await.unwrap();
        assert_eq!(first.item_code(), ControlItemCode::ReceiverState);

        let second = rx.recv().await.unwrap();
        assert_eq!(second.msg_type(), MessageType::DataItem0);
        assert_eq!(second.sequence_number(), 1);
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let request = control_frame(
            MessageType::CurrentControlItem,
            ControlItemCode::IQOutputDataSampleRate,
            &[0x00],
        );
        let mock = Builder::new().write(&request).build();

        let conn = Connection::new(test_config());
        conn.attach(mock).await;

        let result = conn
            .request(
                MessageType::CurrentControlItem,
                ControlItemCode::IQOutputDataSampleRate,
                &[0x00],
            )
            .await;
        assert!(matches!(result, Err(ClientError::Timeout)));
        assert!(!conn.has_pending());
    }

    #[tokio::test]
    async fn test_close() {
        let mock = Builder::new().build();
        let conn = Connection::new(test_config());
        conn.attach(mock).await;
        assert!(conn.is_connected());

        conn.close().await.unwrap();
        assert!(!conn.is_connected());

        let result = conn
            .send_control_item(MessageType::Ack, ControlItemCode::ReceiverState, &[])
            .await;
        assert!(matches!(result, Err(ClientError::NotConnected)));
    }
}
