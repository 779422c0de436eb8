//! High-level client API.

use crate::connection::{Connection, ConnectionConfig};
use crate::error::ClientError;
use netsdr_protocol::{ControlItem, ControlItemCode, Message, MessageType};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

/// High-level client for a NetSDR control channel.
pub struct Client {
    conn: Arc<Connection>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl Client {
    /// Creates a new client with the given configuration.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            conn: Arc::new(Connection::new(config)),
            reader: Mutex::new(None),
        }
    }

    /// Connects to the device and starts the background read loop.
    pub async fn connect(&self) -> Result<(), ClientError> {
        self.conn.connect().await?;

        let conn = self.conn.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = conn.read_loop().await {
                tracing::debug!("read loop ended: {}", e);
            }
        });
        if let Some(old) = self.reader.lock().await.replace(handle) {
            old.abort();
        }
        Ok(())
    }

    /// Returns whether the client is connected.
    pub fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    /// Closes the connection.
    pub async fn close(&self) -> Result<(), ClientError> {
        if let Some(handle) = self.reader.lock().await.take() {
            handle.abort();
            let _ = handle.await;
        }
        self.conn.close().await
    }

    /// Returns the underlying connection.
    pub fn connection(&self) -> Arc<Connection> {
        self.conn.clone()
    }

    /// Subscribes to messages the device sent without being asked.
    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.conn.subscribe_unsolicited()
    }

    /// Requests the current value of a control item.
    pub async fn get_item(
        &self,
        item_code: ControlItemCode,
        parameters: &[u8],
    ) -> Result<ControlItem, ClientError> {
        self.conn
            .request(MessageType::CurrentControlItem, item_code, parameters)
            .await
    }

    /// Sets a control item; the device echoes the applied value.
    pub async fn set_item(
        &self,
        item_code: ControlItemCode,
        parameters: &[u8],
    ) -> Result<ControlItem, ClientError> {
        self.conn
            .request(MessageType::SetControlItem, item_code, parameters)
            .await
    }

    /// Requests the valid range of a control item.
    pub async fn get_range(
        &self,
        item_code: ControlItemCode,
        parameters: &[u8],
    ) -> Result<ControlItem, ClientError> {
        self.conn
            .request(MessageType::ControlItemRange, item_code, parameters)
            .await
    }

    /// Sends a control item without waiting for a reply.
    pub async fn send(
        &self,
        msg_type: MessageType,
        item_code: ControlItemCode,
        parameters: &[u8],
    ) -> Result<(), ClientError> {
        self.conn
            .send_control_item(msg_type, item_code, parameters)
            .await
    }
}
