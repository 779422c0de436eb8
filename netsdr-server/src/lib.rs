//! # netsdr-server
//!
//! Test bench services for NetSDR clients.
//!
//! This crate provides:
//! - TCP echo server standing in for a device control port
//! - Periodic UDP sender emitting sequenced data items
//! - YAML and environment configuration

pub mod config;
pub mod error;
pub mod sender;
pub mod server;

pub use config::{Config, ConfigError, NetworkConfig, SenderConfig};
pub use error::ServerError;
pub use sender::UdpTimedSender;
pub use server::{EchoServer, ServerConfig, ServerStats};
