//! Droplet environmental sensors (plain hex, no envelope)
//!
//! Frame layout, little-endian:
//!
//! | offset | size | reading     | scale            |
//! |--------|------|-------------|------------------|
//! | 0      | 4    | address     |                  |
//! | 4      | 2    | temperature | i16 / 100 (°C)   |
//! | 6      | 2    | pressure    | u16 / 10 (hPa)   |
//! | 8      | 1    | humidity    | low 7 bits (%)   |
//! | 9      | 2    | light       | u16 (lux)        |
//! | 11     | 1    | voltage     | u8 / 50 (V)      |
//! | 12     | 1    | motion      | nonzero = moving |
//!
//! Anything between the motion byte and the last two bytes is ignored; the
//! last two bytes are the RSSI/SNR appended by the gateway.

use super::{LegacyError, LegacyFrame, Reading};
use crate::constants::{ADDRESS_LEN, RADIO_METRICS_LEN};
use crate::loraraw::uplink::RadioMetrics;
use crate::util::hex::parse_hex_lenient;
use nom::{
    bytes::complete::take,
    number::complete::{le_i16, le_u16, u8 as parse_u8},
    IResult,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const BODY_LEN: usize = 13;

/// Droplet sub-model, deciding which readings the device populates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropletModel {
    /// Temperature, humidity, pressure
    #[serde(rename = "TH")]
    Th,
    /// Adds light
    #[serde(rename = "THL")]
    Thl,
    /// Adds light and motion
    #[serde(rename = "THLM")]
    Thlm,
}

impl DropletModel {
    fn has_light(self) -> bool {
        matches!(self, Self::Thl | Self::Thlm)
    }

    fn has_motion(self) -> bool {
        matches!(self, Self::Thlm)
    }
}

impl FromStr for DropletModel {
    type Err = LegacyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TH" => Ok(Self::Th),
            "THL" => Ok(Self::Thl),
            "THLM" => Ok(Self::Thlm),
            _ => Err(LegacyError::UnknownModel(s.to_string())),
        }
    }
}

impl fmt::Display for DropletModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Th => "TH",
            Self::Thl => "THL",
            Self::Thlm => "THLM",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct DropletBody {
    address: [u8; ADDRESS_LEN],
    temperature: i16,
    pressure: u16,
    humidity: u8,
    light: u16,
    voltage: u8,
    motion: u8,
}

fn parse_body(input: &[u8]) -> IResult<&[u8], DropletBody> {
    let (input, address) = take(ADDRESS_LEN)(input)?;
    let (input, temperature) = le_i16(input)?;
    let (input, pressure) = le_u16(input)?;
    let (input, humidity) = parse_u8(input)?;
    let (input, light) = le_u16(input)?;
    let (input, voltage) = parse_u8(input)?;
    let (input, motion) = parse_u8(input)?;

    let mut addr = [0u8; ADDRESS_LEN];
    addr.copy_from_slice(address);

    Ok((
        input,
        DropletBody {
            address: addr,
            temperature,
            pressure,
            humidity,
            light,
            voltage,
            motion,
        },
    ))
}

/// Decode a Droplet frame given as hex
pub fn decode_droplet(model: DropletModel, hex: &str) -> Result<LegacyFrame, LegacyError> {
    let bytes = parse_hex_lenient(hex).map_err(LegacyError::InvalidHex)?;
    decode_droplet_bytes(model, &bytes)
}

pub fn decode_droplet_bytes(model: DropletModel, bytes: &[u8]) -> Result<LegacyFrame, LegacyError> {
    let needed = BODY_LEN + RADIO_METRICS_LEN;
    if bytes.len() < needed {
        return Err(LegacyError::TooShort {
            expected: needed,
            actual: bytes.len(),
        });
    }

    let (frame, metrics) = bytes.split_at(bytes.len() - RADIO_METRICS_LEN);
    let (rest, body) = parse_body(frame).map_err(|e| LegacyError::Parse(e.to_string()))?;
    if !rest.is_empty() {
        log::trace!("Droplet frame carries {} unused bytes", rest.len());
    }

    let mut readings = vec![
        Reading::new("temperature", round2(body.temperature as f64 / 100.0)),
        Reading::new("humidity", (body.humidity & 0x7F) as f64),
        Reading::new("pressure", round2(body.pressure as f64 / 10.0)),
        Reading::new("voltage", round2(body.voltage as f64 / 50.0)),
    ];
    if model.has_light() {
        readings.push(Reading::new("light", body.light as f64));
    }
    if model.has_motion() {
        readings.push(Reading::new("motion", if body.motion != 0 { 1.0 } else { 0.0 }));
    }

    let frame = LegacyFrame {
        address: body.address,
        readings,
        radio: RadioMetrics::from_bytes(metrics[0], metrics[1]),
    };
    log::debug!(
        "Droplet {model} frame from {}: {} readings",
        frame.address_hex(),
        frame.readings.len()
    );
    Ok(frame)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const VECTOR: &str = "CBB272EAB20696263C0000DD000000041861";

    #[test]
    fn test_reference_vector() {
        let frame = decode_droplet(DropletModel::Thlm, VECTOR).unwrap();
        assert_eq!(frame.address_hex(), "CBB272EA");
        assert_eq!(frame.get("temperature"), Some(17.14));
        assert_eq!(frame.get("pressure"), Some(987.8));
        assert_eq!(frame.get("humidity"), Some(60.0));
        assert_eq!(frame.get("voltage"), Some(4.42));
        assert_eq!(frame.get("light"), Some(0.0));
        assert_eq!(frame.get("motion"), Some(0.0));
        assert_eq!(frame.radio.rssi, -24);
        assert_eq!(frame.radio.snr, 24.25);
    }

    #[test]
    fn test_model_selects_readings() {
        let th = decode_droplet(DropletModel::Th, VECTOR).unwrap();
        assert_eq!(th.readings.len(), 4);
        assert_eq!(th.get("light"), None);

        let thl = decode_droplet(DropletModel::Thl, VECTOR).unwrap();
        assert_eq!(thl.get("light"), Some(0.0));
        assert_eq!(thl.get("motion"), None);
    }

    #[test]
    fn test_negative_temperature_and_humidity_mask() {
        // -5.25 °C = 0xFDF3, humidity byte with the high bit set
        let frame = decode_droplet(DropletModel::Thlm, "01020304F3FD9626BC0A00DD011861").unwrap();
        assert_eq!(frame.get("temperature"), Some(-5.25));
        assert_eq!(frame.get("humidity"), Some(60.0));
        assert_eq!(frame.get("light"), Some(10.0));
        assert_eq!(frame.get("motion"), Some(1.0));
    }

    #[test]
    fn test_model_parsing() {
        assert_eq!("thlm".parse::<DropletModel>().unwrap(), DropletModel::Thlm);
        assert_eq!(DropletModel::Thl.to_string(), "THL");
        assert!(matches!("XY".parse::<DropletModel>(), Err(LegacyError::UnknownModel(_))));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            decode_droplet(DropletModel::Th, "CBB272EA"),
            Err(LegacyError::TooShort { expected: 15, actual: 4 })
        ));
        assert!(matches!(
            decode_droplet(DropletModel::Th, "CBB"),
            Err(LegacyError::InvalidHex(_))
        ));
    }
}
