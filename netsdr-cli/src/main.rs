//! netsdr-cli - Command-line interface for NetSDR receivers
//!
//! Sends control items, listens to the data stream, and encodes or decodes
//! frames offline.

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use netsdr_client::{Client, ConnectionConfig};
use netsdr_protocol::{ControlItemCode, MessageType, DEFAULT_CONTROL_PORT};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "netsdr-cli")]
#[command(about = "Command-line interface for NetSDR receivers")]
#[command(version)]
struct Cli {
    /// Device control address
    #[arg(short, long, env = "NETSDR_DEVICE", default_value_t = default_device())]
    device: SocketAddr,

    /// Request timeout in milliseconds
    #[arg(long, default_value = "5000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

fn default_device() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_CONTROL_PORT))
}

/// Control item message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ControlType {
    Set,
    Current,
    Range,
    Ack,
}

impl From<ControlType> for MessageType {
    fn from(t: ControlType) -> Self {
        match t {
            ControlType::Set => MessageType::SetControlItem,
            ControlType::Current => MessageType::CurrentControlItem,
            ControlType::Range => MessageType::ControlItemRange,
            ControlType::Ack => MessageType::Ack,
        }
    }
}

/// Data item message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DataType {
    Data0,
    Data1,
    Data2,
    Data3,
}

impl From<DataType> for MessageType {
    fn from(t: DataType) -> Self {
        match t {
            DataType::Data0 => MessageType::DataItem0,
            DataType::Data1 => MessageType::DataItem1,
            DataType::Data2 => MessageType::DataItem2,
            DataType::Data3 => MessageType::DataItem3,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send a control item to the device
    Send {
        /// Message type
        #[arg(short = 'T', long = "type", value_enum, default_value = "current")]
        msg_type: ControlType,

        /// Item code (name such as receiver-state, or a known hex code like 0x18)
        #[arg(short, long, value_parser = commands::parse_item_code)]
        code: ControlItemCode,

        /// Parameters as hex
        #[arg(short, long)]
        params: Option<String>,

        /// Wait for and print the device reply
        #[arg(short, long)]
        wait: bool,
    },

    /// Receive data items and print their samples
    Listen {
        /// Local UDP address to bind
        #[arg(short, long, default_value = "0.0.0.0:60000")]
        bind: SocketAddr,

        /// Sample width in bits (8, 16, 24 or 32)
        #[arg(short, long, default_value = "16")]
        bits: u16,

        /// Stop after this many data items
        #[arg(short = 'n', long)]
        count: Option<u64>,

        /// Samples to print per data item
        #[arg(long, default_value = "8")]
        show: usize,
    },

    /// Decode a frame given as hex
    Decode {
        /// Frame bytes as hex
        frame: String,

        /// Also extract samples from a data item body at this width
        #[arg(short, long)]
        bits: Option<u16>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build a control item and print it as hex
    EncodeControl {
        /// Message type
        #[arg(short = 'T', long = "type", value_enum, default_value = "set")]
        msg_type: ControlType,

        /// Item code
        #[arg(short, long, value_parser = commands::parse_item_code)]
        code: ControlItemCode,

        /// Parameters as hex
        #[arg(short, long)]
        params: Option<String>,
    },

    /// Build a data item and print it as hex
    EncodeData {
        /// Message type
        #[arg(short = 'T', long = "type", value_enum, default_value = "data0")]
        msg_type: DataType,

        /// Sequence number
        #[arg(short, long, default_value = "0")]
        seq: u16,

        /// Sample body as hex
        #[arg(default_value = "")]
        body: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Send {
            msg_type,
            code,
            params,
            wait,
        } => {
            let config = ConnectionConfig::new(cli.device)
                .with_request_timeout(Duration::from_millis(cli.timeout_ms));
            let client = Client::new(config);

            client.connect().await.map_err(|e| {
                eprintln!("{}: {}", "Connection failed".red(), e);
                e
            })?;

            let result =
                commands::send(&client, msg_type.into(), code, params.as_deref(), wait).await;
            client.close().await?;
            result
        }
        Commands::Listen {
            bind,
            bits,
            count,
            show,
        } => commands::listen(bind, bits, count, show).await,
        Commands::Decode { frame, bits, json } => commands::parse_hex(&frame)
            .map_err(Into::into)
            .and_then(|frame| commands::decode(&frame, bits, json)),
        Commands::EncodeControl {
            msg_type,
            code,
            params,
        } => commands::encode_control(msg_type.into(), code, params.as_deref()),
        Commands::EncodeData {
            msg_type,
            seq,
            body,
        } => commands::encode_data(msg_type.into(), seq, &body),
    };

    match result {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    }

    Ok(())
}
