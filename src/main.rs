use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use loraraw_rs::logging::{init_logger_with_default, log_decode_summary, log_field};
use loraraw_rs::payload::decoder::{decode_frame_with, DecodedField};
use loraraw_rs::payload::header::MessageIdFraming;
use loraraw_rs::payload::registry::{lookup_label, Encoding};
use loraraw_rs::util::hex::{encode_hex_upper, parse_hex_lenient};
use loraraw_rs::{
    decode_droplet, encode_frame, CodecConfig, DropletModel, EncryptionSession, EnvelopeKey,
    FieldValue, FieldWrite, UplinkDecoder,
};
use serde_json::json;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "loraraw-cli")]
#[command(about = "Decode and build LoRaRAW frames")]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Framing {
    /// Message ID present when the flags say so
    Flags,
    /// Never a message ID
    Uplink,
    /// Always a message ID
    Response,
}

impl From<Framing> for MessageIdFraming {
    fn from(framing: Framing) -> Self {
        match framing {
            Framing::Flags => MessageIdFraming::FromFlags,
            Framing::Uplink => MessageIdFraming::Uplink,
            Framing::Response => MessageIdFraming::Response,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a plaintext payload
    Decode {
        payload: String,
        #[arg(long, value_enum, default_value = "flags")]
        framing: Framing,
    },
    /// Authenticate, decrypt and decode an envelope
    Open {
        envelope: String,
        #[arg(short, long)]
        key: Option<String>,
        /// The frame ends with RSSI/SNR bytes
        #[arg(long)]
        radio: bool,
    },
    /// Encode fields and seal them in an envelope
    Seal {
        #[arg(short, long)]
        address: String,
        #[arg(short, long)]
        key: Option<String>,
        #[arg(long)]
        opts: Option<u8>,
        #[arg(long)]
        nonce: Option<u8>,
        /// label:position:value, e.g. temp:1:21.5
        #[arg(short, long = "field", required = true)]
        fields: Vec<String>,
    },
    /// Decode a plain-hex Droplet frame
    Legacy {
        payload: String,
        #[arg(short, long)]
        model: Option<String>,
    },
}

fn main() -> Result<()> {
    init_logger_with_default("warn");

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => CodecConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => CodecConfig::default(),
    };

    match cli.command {
        Commands::Decode { payload, framing } => {
            let bytes = parse_hex_lenient(&payload).context("payload is not valid hex")?;
            let frame = decode_frame_with(&bytes, framing.into());
            for field in &frame.fields {
                log_field(field);
                println!("{}", field_json(field));
            }
            log_decode_summary(&frame.summary);
        }
        Commands::Open {
            envelope,
            key,
            radio,
        } => {
            let key = resolve_key(key.as_deref(), &config)?;
            let raw = parse_hex_lenient(&envelope).context("envelope is not valid hex")?;
            let decoder = UplinkDecoder::new(key).with_radio_metrics(radio || config.radio_metrics);
            let (summary, fields) = decoder.decode_all(&raw).context("opening envelope")?;

            let mut header = json!({
                "address": summary.address_hex(),
                "opts": summary.opts,
                "nonce": summary.nonce,
                "message_id": summary.frame.header.message_id,
            });
            if let Some(radio) = summary.radio {
                header["rssi"] = json!(radio.rssi);
                header["snr"] = json!(radio.snr);
            }
            println!("{header}");
            for field in &fields {
                log_field(field);
                println!("{}", field_json(field));
            }
            log_decode_summary(&summary.frame);
        }
        Commands::Seal {
            address,
            key,
            opts,
            nonce,
            fields,
        } => {
            let key = resolve_key(key.as_deref(), &config)?;
            let writes = fields
                .iter()
                .map(|arg| parse_field_arg(arg))
                .collect::<Result<Vec<_>>>()?;
            let payload = encode_frame(config.frame_header(), &writes)?;

            let session = match nonce {
                Some(n) => EncryptionSession::starting_at(n),
                None => config.session(),
            };
            let envelope = session.encrypt(
                &address,
                &payload,
                key.as_bytes(),
                opts.unwrap_or(config.default_opts),
            )?;
            println!(
                "{}",
                json!({
                    "payload": encode_hex_upper(&payload),
                    "envelope": encode_hex_upper(&envelope),
                })
            );
        }
        Commands::Legacy { payload, model } => {
            let model = match model {
                Some(name) => name.parse::<DropletModel>()?,
                None => config
                    .legacy_model
                    .ok_or_else(|| anyhow!("no --model given and none configured"))?,
            };
            let frame = decode_droplet(model, &payload)?;
            let readings: serde_json::Map<_, _> = frame
                .readings
                .iter()
                .map(|r| (r.label.to_string(), json!(r.value)))
                .collect();
            println!(
                "{}",
                json!({
                    "address": frame.address_hex(),
                    "model": model.to_string(),
                    "readings": readings,
                    "rssi": frame.radio.rssi,
                    "snr": frame.radio.snr,
                })
            );
        }
    }

    Ok(())
}

fn resolve_key(arg: Option<&str>, config: &CodecConfig) -> Result<EnvelopeKey> {
    match arg {
        Some(hex) => Ok(EnvelopeKey::from_hex(hex)?),
        None => config.key().context("no --key given"),
    }
}

fn parse_field_arg(arg: &str) -> Result<FieldWrite> {
    let mut parts = arg.splitn(3, ':');
    let (Some(label), Some(position), Some(value)) = (parts.next(), parts.next(), parts.next())
    else {
        bail!("field {arg:?} is not label:position:value");
    };

    let descriptor =
        lookup_label(label).ok_or_else(|| anyhow!("unknown field label {label:?}"))?;
    let position: u8 = position
        .parse()
        .with_context(|| format!("bad position in {arg:?}"))?;
    let value = match descriptor.encoding {
        Encoding::Text => FieldValue::from(value),
        _ => FieldValue::Number(
            value
                .parse()
                .with_context(|| format!("bad numeric value in {arg:?}"))?,
        ),
    };
    Ok(FieldWrite::new(descriptor.key, position, value))
}

fn field_json(field: &DecodedField) -> serde_json::Value {
    let mut value = json!({
        "name": field.name,
        "key": field.key,
        "value": field.value,
    });
    if let Some(text) = &field.text {
        value["text"] = json!(text);
    }
    if let Some(error) = &field.error {
        value["error"] = json!(error.to_string());
    }
    value
}
