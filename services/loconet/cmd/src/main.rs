//! LocoNet command line tool.
//!
//! Decodes captured traffic, encodes single commands and monitors a live
//! bus connected through stdin and stdout.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use loconet_session::{spawn, EventNotifier, InterfaceEvent, LocoNetInterface};
use loconet_wire::{append_checksum, is_opcode, ImmRepeat, Message, MessageDecoder, SwitchState};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod logging;

use config::{resolve_log_level, LocoNetConfig};
use logging::LocoNetLogFormatter;

/// Decode, encode and monitor LocoNet traffic
#[derive(Parser, Debug)]
#[command(name = "loconet", version, about = "Decode, encode and monitor LocoNet traffic")]
struct Args {
    /// Configuration file path
    #[arg(long, default_value = "loconet.yaml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); falls back to LOCONET_LOG_LEVEL
    #[arg(long)]
    log_level: Option<String>,

    /// Retransmissions before a send is abandoned
    #[arg(long)]
    retry_budget: Option<i32>,

    /// Length of the acknowledgment awaited after an echo, in bytes
    #[arg(long)]
    ack_wait_bytes: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reassemble hex bytes and print the classified messages
    Decode {
        /// Hex bytes, e.g. "83 7C" or 837C
        #[arg(required = true)]
        bytes: Vec<String>,
    },
    /// Print the checksummed frame for a command
    Encode {
        #[command(subcommand)]
        command: EncodeCommand,
    },
    /// Run the interface over stdin/stdout and log every message
    Monitor {
        /// Stop after this long, e.g. 30s (default: until Ctrl-C)
        #[arg(long)]
        duration: Option<humantime::Duration>,

        /// Message to send on start, hex without checksum (repeatable)
        #[arg(long)]
        send: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
enum EncodeCommand {
    /// Global power on
    PowerOn,
    /// Global power off
    PowerOff,
    /// Request a command station query slot (1 to 5)
    QuerySlot { query_slot: u8 },
    /// Request slot data, expanded when a bank is given
    SlotData {
        slot: u8,
        #[arg(long)]
        bank: Option<u8>,
    },
    /// Request the slot for a locomotive address
    LocoAddress {
        address: u16,
        /// Use the expanded slot protocol
        #[arg(long)]
        p2: bool,
    },
    /// Set slot speed
    Speed { slot: u8, speed: u8 },
    /// Set a switch
    Switch {
        address: u16,
        position: SwitchPosition,
        /// Ask the command station to acknowledge
        #[arg(long)]
        ack: bool,
    },
    /// Request a switch position
    SwitchState { address: u16 },
    /// Inject a raw DCC packet (hex, error byte excluded)
    Imm {
        packet: String,
        /// Repeat code (0 to 7, 15 for continuous)
        #[arg(long, default_value_t = 0)]
        repeat: u8,
    },
    /// Discover IPL devices
    Discover,
    /// Set duplex group name, channel and id
    DuplexGroup { name: String, channel: u8, group_id: u8 },
    /// Set the LocoNet ID (0 to 7)
    LoconetId { id: u8 },
    /// Append a checksum to arbitrary bytes (hex)
    Raw { bytes: String },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SwitchPosition {
    Closed,
    Thrown,
}

impl From<SwitchPosition> for SwitchState {
    fn from(position: SwitchPosition) -> Self {
        match position {
            SwitchPosition::Closed => SwitchState::Closed,
            SwitchPosition::Thrown => SwitchState::Thrown,
        }
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = resolve_log_level(args.log_level.as_deref(), |key| std::env::var(key).ok());
    let env_filter = EnvFilter::new("warn")
        .add_directive(format!("loconet={}", log_level).parse()?)
        .add_directive(format!("loconet_session={}", log_level).parse()?)
        .add_directive(format!("loconet_wire={}", log_level).parse()?);

    let formatter = LocoNetLogFormatter::new("loconet".to_string());

    // stdout carries bus traffic in monitor mode
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .event_format(formatter)
        .init();

    let mut config = LocoNetConfig::load_from_file(&args.config)?;
    if let Some(budget) = args.retry_budget {
        config.interface.retry_budget = budget;
    }
    if let Some(bytes) = args.ack_wait_bytes {
        config.interface.ack_wait_bytes = bytes;
    }

    info!(
        "loconet v{}: config={:?}, retry_budget={}, ack_wait_bytes={}",
        env!("CARGO_PKG_VERSION"),
        args.config,
        config.interface.retry_budget,
        config.interface.ack_wait_bytes
    );

    match args.command {
        Command::Decode { bytes } => decode(&config, &bytes),
        Command::Encode { command } => {
            let message = encode(command)?;
            println!("{}", spaced_hex(&message.frame()));
            Ok(())
        }
        Command::Monitor { duration, send } => {
            monitor(&config, duration.map(Duration::from), &send).await
        }
    }
}

fn decode(config: &LocoNetConfig, input: &[String]) -> Result<()> {
    let mut decoder = MessageDecoder::new();
    for chunk in input {
        let bytes = parse_hex(chunk)?;
        component_debug!("decode", "Read {} bytes", bytes.len());
        decoder.push(&bytes);
    }

    for message in decoder.decode_all() {
        println!("{}", message);
    }

    if decoder.buffered() > 0 {
        component_warn!("decode", "{} trailing bytes did not form a frame", decoder.buffered());
    }
    if config.report_stats {
        let stats = decoder.stats();
        component_info!(
            "decode",
            "frames={} checksum_failures={} resyncs={} discarded_bytes={}",
            stats.frames_decoded,
            stats.checksum_failures,
            stats.resyncs,
            stats.discarded_bytes
        );
    }
    Ok(())
}

fn encode(command: EncodeCommand) -> Result<Message> {
    let message = match command {
        EncodeCommand::PowerOn => Message::power_on(),
        EncodeCommand::PowerOff => Message::power_off(),
        EncodeCommand::QuerySlot { query_slot } => {
            Message::get_query_slot(query_slot).context("query slot must be 1 to 5")?
        }
        EncodeCommand::SlotData { slot, bank: None } => {
            Message::get_loco_slot_data_p1(slot).context("slot must be 1 to 119")?
        }
        EncodeCommand::SlotData { slot, bank: Some(bank) } => {
            Message::get_loco_slot_data_p2(bank, slot)
                .context("bank must be 0 to 3 and slot 1 to 119")?
        }
        EncodeCommand::LocoAddress { address, p2 } => {
            let message = if p2 {
                Message::get_loco_slot_data_adr_p2(address)
            } else {
                Message::get_loco_slot_data_adr_p1(address)
            };
            message.context("address must be 1 to 10239")?
        }
        EncodeCommand::Speed { slot, speed } => {
            Message::loco_spd_p1(slot, speed).context("slot must be 1 to 119 and speed 0 to 127")?
        }
        EncodeCommand::Switch { address, position, ack } => {
            let message = if ack {
                Message::set_sw_with_ack(address, position.into())
            } else {
                Message::set_sw(address, position.into())
            };
            message.context("switch address must be 1 to 2048")?
        }
        EncodeCommand::SwitchState { address } => {
            Message::get_sw_state(address).context("switch address must be 1 to 2048")?
        }
        EncodeCommand::Imm { packet, repeat } => {
            let repeat = ImmRepeat::try_from(repeat)?;
            Message::imm_packet(&parse_hex(&packet)?, repeat)
                .context("packet must be 1 to 5 bytes")?
        }
        EncodeCommand::Discover => Message::ipl_discover(None),
        EncodeCommand::DuplexGroup { name, channel, group_id } => {
            Message::set_duplex_group_data(&name, channel, group_id)
                .context("group name must be 8 bytes or fewer")?
        }
        EncodeCommand::LoconetId { id } => {
            Message::set_loconet_id(id).context("LocoNet ID must be 0 to 7")?
        }
        EncodeCommand::Raw { bytes } => {
            let bytes = parse_hex(&bytes)?;
            if bytes.is_empty() {
                bail!("no bytes given");
            }
            Message::new(bytes)
        }
    };
    Ok(message)
}

async fn monitor(config: &LocoNetConfig, duration: Option<Duration>, send: &[String]) -> Result<()> {
    let mut interface = LocoNetInterface::new(config.interface.clone());
    let (notifier, mut events) = EventNotifier::channel();
    interface.subscribe(notifier);

    let (handle, task) = spawn(interface, tokio::io::stdin(), tokio::io::stdout());
    component_info!("monitor", "Monitoring LocoNet on stdin/stdout");

    for text in send {
        let message = parse_message(text)?;
        component_info!("monitor", "Queueing {}", message);
        handle.send(message)?;
    }

    let stop = async {
        match duration {
            Some(duration) => tokio::time::sleep(duration).await,
            None => {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    component_warn!("monitor", "Failed to listen for Ctrl-C: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        }
    };
    tokio::pin!(stop);

    loop {
        tokio::select! {
            _ = &mut stop => {
                // the driver may already have stopped on end of input
                handle.shutdown().ok();
                break;
            }
            event = events.recv() => match event {
                Some(InterfaceEvent::MessageReceived { sequence, message }) => {
                    component_info!(
                        "monitor",
                        "#{} +{}ms {}",
                        sequence,
                        message.time_since_last().as_millis(),
                        message
                    );
                }
                Some(InterfaceEvent::SendAbandoned { sequence, message }) => {
                    component_warn!("monitor", "#{} gave up sending {}", sequence, message);
                }
                None => break,
            }
        }
    }

    let stats = match task.await? {
        Ok(stats) => stats,
        Err(e) => {
            component_error!("monitor", "Interface driver failed: {:#}", e);
            return Err(e);
        }
    };
    if config.report_stats {
        component_info!(
            "monitor",
            "received={} transmitted={} retransmissions={} completed={} abandoned={}",
            stats.messages_received,
            stats.frames_transmitted,
            stats.retransmissions,
            stats.messages_completed,
            stats.messages_abandoned
        );
    }
    Ok(())
}

/// Parse hex bytes, ignoring whitespace, commas, colons and `0x` prefixes
fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let digits: String = text
        .split(|c: char| c.is_whitespace() || c == ',' || c == ':')
        .map(|token| token.trim_start_matches("0x").trim_start_matches("0X"))
        .collect();

    hex::decode(&digits).with_context(|| format!("invalid hex input {:?}", text))
}

/// Parse a message given without its checksum; the length must fit the opcode
fn parse_message(text: &str) -> Result<Message> {
    let bytes = parse_hex(text)?;
    match bytes.first() {
        None => bail!("no bytes given"),
        Some(&opcode) if !is_opcode(opcode) => bail!("{:02X} is not an opcode", opcode),
        Some(_) => {}
    }
    Message::from_frame(&append_checksum(&bytes))
        .with_context(|| format!("invalid message {:?}", text))
}

fn spaced_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|byte| hex::encode_upper([*byte]))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use loconet_wire::MessageType;

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("83 7C").unwrap(), vec![0x83, 0x7c]);
        assert_eq!(parse_hex("0xB2,0x01").unwrap(), vec![0xb2, 0x01]);
        assert_eq!(parse_hex("e7:0e").unwrap(), vec![0xe7, 0x0e]);
        assert!(parse_hex("837").is_err());
        assert!(parse_hex("zz").is_err());
        assert!(parse_hex("0xé1").is_err());
        assert!(parse_hex("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_message() {
        let message = parse_message("83").unwrap();
        assert_eq!(message.frame().as_ref(), &[0x83, 0x7c]);

        let switch = parse_message("b0 01 30").unwrap();
        assert_eq!(switch.message_type(), MessageType::SetSw);

        assert!(parse_message("").is_err());
        assert!(parse_message("01 02").is_err());
        // opcode 0xb0 carries two data bytes
        assert!(parse_message("b0 01").is_err());
        assert!(parse_message("83 00").is_err());
    }

    #[test]
    fn test_encode_commands() {
        assert_eq!(encode(EncodeCommand::PowerOn).unwrap().frame().as_ref(), &[0x83, 0x7c]);

        let switch = encode(EncodeCommand::Switch {
            address: 12,
            position: SwitchPosition::Thrown,
            ack: true,
        })
        .unwrap();
        assert_eq!(switch.message_type(), MessageType::SetSwWithAck);

        assert!(encode(EncodeCommand::QuerySlot { query_slot: 6 }).is_err());
        assert!(encode(EncodeCommand::SlotData { slot: 5, bank: Some(4) }).is_err());
        assert!(encode(EncodeCommand::Raw { bytes: String::new() }).is_err());
    }

    #[test]
    fn test_hex_output() {
        assert_eq!(spaced_hex(&[0x83, 0x7c]), "83 7C");
        assert_eq!(spaced_hex(&[]), "");
    }
}
