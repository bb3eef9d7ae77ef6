//! # Uplink Decoding
//!
//! The gateway's serial bridge appends two bytes of radio metrics to every
//! frame it forwards: RSSI (negated magnitude) and SNR (signed, quarter dB).
//! They sit outside the authenticated region. [`UplinkDecoder`] strips them,
//! opens the envelope and feeds the payload to a [`FrameSink`].

use crate::constants::{ADDRESS_LEN, RADIO_METRICS_LEN};
use crate::loraraw::crypto::{open_with_key, EnvelopeError, EnvelopeKey};
use crate::payload::decoder::{DecodeSummary, DecodedField, Flow, FrameDecoder, FrameSink};
use crate::payload::header::MessageIdFraming;
use crate::util::hex::encode_hex_upper;

/// Signal quality reported by the receiving radio
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadioMetrics {
    /// dBm
    pub rssi: i16,
    /// dB
    pub snr: f32,
}

impl RadioMetrics {
    pub fn from_bytes(rssi: u8, snr: u8) -> Self {
        Self {
            rssi: -(rssi as i16),
            snr: (snr as i8) as f32 / 4.0,
        }
    }
}

/// Split the trailing RSSI/SNR bytes off a forwarded frame
pub fn split_radio_metrics(raw: &[u8]) -> Option<(&[u8], RadioMetrics)> {
    if raw.len() < RADIO_METRICS_LEN {
        return None;
    }
    let (frame, metrics) = raw.split_at(raw.len() - RADIO_METRICS_LEN);
    Some((frame, RadioMetrics::from_bytes(metrics[0], metrics[1])))
}

/// Envelope fields and decode outcome of one uplink
#[derive(Debug, Clone, PartialEq)]
pub struct UplinkSummary {
    pub address: [u8; ADDRESS_LEN],
    pub opts: u8,
    pub nonce: u8,
    pub radio: Option<RadioMetrics>,
    pub frame: DecodeSummary,
}

impl UplinkSummary {
    pub fn address_hex(&self) -> String {
        encode_hex_upper(&self.address)
    }
}

/// Opens envelopes for one device key and decodes their payloads
#[derive(Debug, Clone)]
pub struct UplinkDecoder {
    key: EnvelopeKey,
    framing: MessageIdFraming,
    radio_metrics: bool,
}

impl UplinkDecoder {
    pub fn new(key: EnvelopeKey) -> Self {
        Self {
            key,
            framing: MessageIdFraming::FromFlags,
            radio_metrics: false,
        }
    }

    pub fn with_framing(mut self, framing: MessageIdFraming) -> Self {
        self.framing = framing;
        self
    }

    /// Expect RSSI/SNR bytes after the CMAC
    pub fn with_radio_metrics(mut self, enabled: bool) -> Self {
        self.radio_metrics = enabled;
        self
    }

    /// Authenticate, decrypt and decode `raw` into `sink`
    pub fn decode<S: FrameSink + ?Sized>(
        &self,
        raw: &[u8],
        sink: &mut S,
    ) -> Result<UplinkSummary, EnvelopeError> {
        let (envelope, radio) = if self.radio_metrics {
            let (envelope, metrics) = split_radio_metrics(raw)
                .ok_or(EnvelopeError::InvalidLength { actual: raw.len() })?;
            (envelope, Some(metrics))
        } else {
            (raw, None)
        };

        let opened = open_with_key(envelope, &self.key)?;
        log::debug!(
            "Uplink from {} (nonce={}, {} payload bytes, radio {:?})",
            opened.address_hex(),
            opened.nonce,
            opened.payload.len(),
            radio
        );

        let frame = FrameDecoder::new(&opened.payload)
            .with_framing(self.framing)
            .run(sink);

        Ok(UplinkSummary {
            address: opened.address,
            opts: opened.opts,
            nonce: opened.nonce,
            radio,
            frame,
        })
    }

    /// Like [`decode`](Self::decode), collecting the fields
    pub fn decode_all(&self, raw: &[u8]) -> Result<(UplinkSummary, Vec<DecodedField>), EnvelopeError> {
        let mut fields = Vec::new();
        let summary = self.decode(raw, &mut |field: DecodedField| {
            fields.push(field);
            Flow::Continue
        })?;
        Ok((summary, fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loraraw::crypto::EncryptionSession;
    use crate::payload::decoder::FrameEnd;
    use crate::payload::encoder::FrameEncoder;
    use crate::payload::header::FrameHeader;
    use crate::payload::registry::keys;

    const KEY: [u8; 16] = [0x11; 16];
    const REFERENCE_PAYLOAD: [u8; 9] = [0, 5, 92, 240, 74, 217, 134, 205, 44];

    fn decoder() -> UplinkDecoder {
        UplinkDecoder::new(EnvelopeKey::from_bytes(&KEY).unwrap())
    }

    #[test]
    fn test_radio_metrics() {
        let metrics = RadioMetrics::from_bytes(0x18, 0x61);
        assert_eq!(metrics.rssi, -24);
        assert_eq!(metrics.snr, 24.25);

        let negative = RadioMetrics::from_bytes(0x70, 0xF6);
        assert_eq!(negative.rssi, -112);
        assert_eq!(negative.snr, -2.5);

        assert!(split_radio_metrics(&[0x18]).is_none());
    }

    #[test]
    fn test_uplink_reference_payload() {
        let envelope = EncryptionSession::starting_at(3)
            .encrypt("CBB272EA", &REFERENCE_PAYLOAD, &KEY, 0)
            .unwrap();
        let (summary, fields) = decoder().decode_all(&envelope).unwrap();

        assert_eq!(summary.address_hex(), "CBB272EA");
        assert_eq!(summary.nonce, 3);
        assert_eq!(summary.radio, None);
        assert_eq!(summary.frame.end, FrameEnd::Exhausted { trailing_bits: 1 });

        let values: Vec<_> = fields.iter().map(|f| (f.name.as_str(), f.value)).collect();
        assert_eq!(values, [("temp_1", 66.66), ("rh_1", 55.55), ("lux_1", 26262.0)]);
    }

    #[test]
    fn test_uplink_with_radio_metrics() {
        let mut raw = EncryptionSession::new()
            .encrypt("CBB272EA", &REFERENCE_PAYLOAD, &KEY, 0)
            .unwrap();
        raw.extend_from_slice(&[0x50, 0x28]);

        let (summary, fields) = decoder().with_radio_metrics(true).decode_all(&raw).unwrap();
        assert_eq!(summary.radio, Some(RadioMetrics { rssi: -80, snr: 10.0 }));
        assert_eq!(fields.len(), 3);

        // Without stripping, the metrics bytes break the block alignment
        assert!(matches!(
            decoder().decode_all(&raw),
            Err(EnvelopeError::InvalidLength { .. })
        ));
    }

    #[test]
    fn test_response_reaches_correlator() {
        struct Correlator(Option<u8>, usize);
        impl FrameSink for Correlator {
            fn on_field(&mut self, _field: DecodedField) -> Flow {
                self.1 += 1;
                Flow::Continue
            }
            fn on_message_id(&mut self, header: &FrameHeader) {
                self.0 = header.message_id;
            }
        }

        let mut encoder = FrameEncoder::response(0x5A);
        encoder.push(keys::PUSH_FREQUENCY, 1, 600.0).unwrap();
        let envelope = EncryptionSession::new()
            .encrypt("01020304", &encoder.finish(), &KEY, 0)
            .unwrap();

        let mut sink = Correlator(None, 0);
        decoder().decode(&envelope, &mut sink).unwrap();
        assert_eq!(sink.0, Some(0x5A));
        assert_eq!(sink.1, 1);
    }

    #[test]
    fn test_wrong_key_yields_no_fields() {
        let envelope = EncryptionSession::new()
            .encrypt("01020304", &REFERENCE_PAYLOAD, &[0x22; 16], 0)
            .unwrap();
        let mut seen = 0;
        let result = decoder().decode(&envelope, &mut |_: DecodedField| {
            seen += 1;
            Flow::Continue
        });
        assert_eq!(result, Err(EnvelopeError::AuthenticationError));
        assert_eq!(seen, 0);
    }
}
