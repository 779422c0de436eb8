//! Command execution.

use colored::Colorize;
use netsdr_client::{Client, DataReceiver, ReceiverConfig};
use netsdr_protocol::{
    control, extract, ControlItem, ControlItemCode, DataItem, Header, Message, MessageType,
    SampleWidth,
};
use serde_json::{json, Value};
use std::net::SocketAddr;

type CommandResult = Result<String, Box<dyn std::error::Error>>;

/// Parses an item code given by name (`receiver-state`, `RF_FILTER`) or as a
/// hex wire value (`0x18`).
pub fn parse_item_code(arg: &str) -> Result<ControlItemCode, String> {
    if let Some(hex) = arg.strip_prefix("0x").or_else(|| arg.strip_prefix("0X")) {
        let code = u16::from_str_radix(hex, 16).map_err(|e| e.to_string())?;
        return ControlItemCode::try_from(code).map_err(|e| e.to_string());
    }

    let wanted = arg.to_lowercase().replace('-', "_");
    ControlItemCode::ALL
        .into_iter()
        .find(|code| code.to_string().to_lowercase() == wanted)
        .ok_or_else(|| format!("unknown item code '{}'", arg))
}

/// Decodes a hex argument. Whitespace, `:` separators and a `0x` prefix are
/// ignored.
pub fn parse_hex(arg: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let arg = arg.trim();
    let arg = arg
        .strip_prefix("0x")
        .or_else(|| arg.strip_prefix("0X"))
        .unwrap_or(arg);
    let digits: String = arg
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    hex::decode(digits)
}

/// Sends a control item over a connected client.
pub async fn send(
    client: &Client,
    msg_type: MessageType,
    code: ControlItemCode,
    params: Option<&str>,
    wait: bool,
) -> CommandResult {
    let params = params.map(parse_hex).transpose()?.unwrap_or_default();

    if !wait {
        client.send(msg_type, code, &params).await?;
        return Ok(format!(
            "{} {:?} {} ({} parameter bytes)",
            "Sent".green(),
            msg_type,
            code.to_string().cyan(),
            params.len()
        ));
    }

    let reply = match msg_type {
        MessageType::SetControlItem => client.set_item(code, &params).await?,
        MessageType::ControlItemRange => client.get_range(code, &params).await?,
        _ => client.get_item(code, &params).await?,
    };
    Ok(format_control_item(&reply))
}

/// Receives data items until `count` is reached or Ctrl+C.
pub async fn listen(bind: SocketAddr, bits: u16, count: Option<u64>, show: usize) -> CommandResult {
    let width = SampleWidth::try_from(bits)?;
    let mut receiver = DataReceiver::bind(ReceiverConfig::new(bind)).await?;

    eprintln!(
        "{} on {} ({}-bit samples)",
        "Listening".green(),
        receiver.local_addr()?,
        width.bits()
    );
    eprintln!("{}", "Press Ctrl+C to stop...".dimmed());

    let mut received = 0u64;
    loop {
        if count.is_some_and(|n| received >= n) {
            break;
        }

        tokio::select! {
            item = receiver.recv() => {
                let item = item?;
                println!("{}", format_data_item(&item, Some(width), show)?);
                received += 1;
            }
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\n{}", "Stopping...".dimmed());
                break;
            }
        }
    }

    let stats = receiver.stats();
    Ok(format!(
        "{} data items, {} lost, {} late, {} restarts",
        stats.received, stats.lost, stats.late, stats.restarts
    ))
}

/// Builds a control item and returns it as hex.
pub fn encode_control(
    msg_type: MessageType,
    code: ControlItemCode,
    params: Option<&str>,
) -> CommandResult {
    let params = params.map(parse_hex).transpose()?.unwrap_or_default();
    let encoded = control::build(msg_type, code, &params)?;
    Ok(hex::encode(encoded))
}

/// Builds a data item and returns it as hex.
pub fn encode_data(msg_type: MessageType, seq: u16, body: &str) -> CommandResult {
    let encoded = DataItem::new(msg_type, seq, parse_hex(body)?).encode()?;
    Ok(hex::encode(encoded))
}

/// Decodes one frame for display.
pub fn decode(frame: &[u8], bits: Option<u16>, as_json: bool) -> CommandResult {
    let message = Message::parse(frame)?;

    if as_json {
        return Ok(format_json(&message_json(frame, &message, bits)?));
    }

    match message {
        Message::Control(ref item) => Ok(format_control_item(item)),
        Message::Data(ref item) => {
            let width = bits.map(SampleWidth::try_from).transpose()?;
            format_data_item(item, width, usize::MAX)
        }
    }
}

fn message_json(
    frame: &[u8],
    message: &Message,
    bits: Option<u16>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let length = Header::peek(frame).map(|h| h.length()).unwrap_or_default();

    let value = match message {
        Message::Control(item) => json!({
            "type": item.msg_type,
            "length": length,
            "item_code": item.item_code,
            "code": item.item_code.code(),
            "parameters": hex::encode(&item.parameters),
        }),
        Message::Data(item) => {
            let mut value = json!({
                "type": item.msg_type,
                "length": length,
                "sequence_number": item.sequence_number,
                "body": hex::encode(&item.body),
            });
            if let Some(bits) = bits {
                let samples: Vec<u32> = extract(bits, item.body.clone())?.collect();
                value["samples"] = json!(samples);
            }
            value
        }
    };
    Ok(value)
}

fn format_control_item(item: &ControlItem) -> String {
    let mut output = format!(
        "{} {} (0x{:04X})",
        format!("{:?}", item.msg_type).bold(),
        item.item_code.to_string().cyan(),
        item.item_code.code()
    );
    if !item.parameters.is_empty() {
        output.push_str(&format!("\n  Parameters: {}", hex::encode(&item.parameters)));
    }
    output
}

fn format_data_item(item: &DataItem, width: Option<SampleWidth>, show: usize) -> CommandResult {
    let mut output = format!(
        "{} #{} ({} body bytes)",
        format!("{:?}", item.msg_type).bold(),
        item.sequence_number.to_string().yellow(),
        item.body.len()
    );

    if let Some(width) = width {
        let samples = extract(width.bits(), item.body.clone())?;
        let total = samples.len();
        let shown: Vec<String> = samples.take(show).map(|s| s.to_string()).collect();
        output.push_str(&format!("\n  {} samples: [{}", total, shown.join(", ")));
        if total > shown.len() {
            output.push_str(", ...");
        }
        output.push(']');
    }

    Ok(output)
}

/// Formats JSON for display.
fn format_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
