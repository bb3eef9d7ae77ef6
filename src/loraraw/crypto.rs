//! # LoRaRAW Envelope Encryption
//!
//! Wraps a bit-packed payload for the air interface:
//!
//! ```text
//! [address: 4][opts: 1][nonce: 1][len: 1][payload ... zero padding][cmac: 4]
//!             |<-------- AES-128-CBC, all-zero IV -------------->|
//! ```
//!
//! The address travels in the clear. The tag is the first four bytes of an
//! AES-128-CMAC computed over `buf[0..16] || buf[4..]`, where `buf` is the
//! address followed by the ciphertext. Bytes 4..16 are therefore covered
//! twice. Deployed firmware computes exactly this, so it is reproduced as-is.
//!
//! Decryption authenticates first and only then touches the cipher.
//!
//! ## Usage
//!
//! ```rust
//! use loraraw_rs::loraraw::crypto::{open, EncryptionSession};
//!
//! let key = [0x2B; 16];
//! let session = EncryptionSession::starting_at(7);
//! let envelope = session.encrypt("CBB272EA", &[0x00, 0x05, 0x5C], &key, 0)?;
//!
//! let opened = open(&envelope, &key)?;
//! assert_eq!(opened.nonce, 7);
//! assert_eq!(opened.payload, vec![0x00, 0x05, 0x5C]);
//! # Ok::<(), loraraw_rs::loraraw::crypto::EnvelopeError>(())
//! ```

use crate::constants::{
    ADDRESS_LEN, AES_BLOCK_SIZE, AES_KEY_LEN, CMAC_LEN, ENVELOPE_HEADER_LEN, MIN_ENVELOPE_LEN,
};
use crate::util::hex::{decode_hex_array, encode_hex_upper};
use crate::util::logging::{log_frame_hex, LogThrottle};
use aes::Aes128;
use cmac::{Cmac, Mac};
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

static AUTH_FAILURE_THROTTLE: Lazy<Mutex<LogThrottle>> =
    Lazy::new(|| Mutex::new(LogThrottle::new(1000, 5)));

/// Envelope errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EnvelopeError {
    #[error("Invalid AES key: {reason}")]
    KeyError { reason: String },

    #[error("Invalid device address: {reason}")]
    AddressDecodeError { reason: String },

    #[error("incorrect CMAC or Key")]
    AuthenticationError,

    #[error("Invalid envelope length: {actual} bytes")]
    InvalidLength { actual: usize },

    #[error("Payload too long: {0} bytes, at most 255 fit the length byte")]
    PayloadTooLong(usize),

    #[error("Length byte declares {declared} payload bytes, only {available} decrypted")]
    LengthMismatch { declared: usize, available: usize },
}

/// AES-128 key, wiped from memory on drop
#[derive(Clone, PartialEq, Zeroize, ZeroizeOnDrop)]
pub struct EnvelopeKey {
    key: [u8; AES_KEY_LEN],
}

impl EnvelopeKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        let key: [u8; AES_KEY_LEN] = bytes.try_into().map_err(|_| EnvelopeError::KeyError {
            reason: format!("expected {AES_KEY_LEN} bytes, got {}", bytes.len()),
        })?;
        Ok(Self { key })
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, EnvelopeError> {
        let key = decode_hex_array::<AES_KEY_LEN>(hex_str).map_err(|e| EnvelopeError::KeyError {
            reason: e.to_string(),
        })?;
        Ok(Self { key })
    }

    pub fn as_bytes(&self) -> &[u8; AES_KEY_LEN] {
        &self.key
    }
}

impl fmt::Debug for EnvelopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EnvelopeKey(..)")
    }
}

/// Issues envelopes with a rolling 8-bit nonce.
///
/// The nonce is read and advanced atomically, so a session can be shared
/// between threads without two envelopes ever carrying the same value
/// until the counter wraps.
#[derive(Debug, Default)]
pub struct EncryptionSession {
    nonce: AtomicU8,
}

impl EncryptionSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(nonce: u8) -> Self {
        Self {
            nonce: AtomicU8::new(nonce),
        }
    }

    /// Nonce the next envelope will carry
    pub fn next_nonce(&self) -> u8 {
        self.nonce.load(Ordering::SeqCst)
    }

    /// Encrypt `payload` for the device at `address_hex` (8 hex characters)
    pub fn encrypt(
        &self,
        address_hex: &str,
        payload: &[u8],
        key: &[u8],
        opts: u8,
    ) -> Result<Vec<u8>, EnvelopeError> {
        let key = EnvelopeKey::from_bytes(key)?;
        let address = parse_address(address_hex)?;
        self.seal(&address, payload, &key, opts)
    }

    /// Encrypt with an already-validated key and address
    pub fn seal(
        &self,
        address: &[u8; ADDRESS_LEN],
        payload: &[u8],
        key: &EnvelopeKey,
        opts: u8,
    ) -> Result<Vec<u8>, EnvelopeError> {
        if payload.len() > u8::MAX as usize {
            return Err(EnvelopeError::PayloadTooLong(payload.len()));
        }
        // fetch_add wraps on overflow
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        Ok(seal_with_nonce(address, payload, key, opts, nonce))
    }
}

/// Build an envelope with an explicit nonce. `payload` must fit the length byte.
fn seal_with_nonce(
    address: &[u8; ADDRESS_LEN],
    payload: &[u8],
    key: &EnvelopeKey,
    opts: u8,
    nonce: u8,
) -> Vec<u8> {
    let mut plaintext = Vec::with_capacity(payload.len() + AES_BLOCK_SIZE + 3);
    plaintext.extend_from_slice(&[opts, nonce, payload.len() as u8]);
    plaintext.extend_from_slice(payload);
    let padded_len = plaintext.len().div_ceil(AES_BLOCK_SIZE) * AES_BLOCK_SIZE;
    plaintext.resize(padded_len, 0);

    let mut envelope = Vec::with_capacity(ADDRESS_LEN + padded_len + CMAC_LEN);
    envelope.extend_from_slice(address);
    envelope.extend_from_slice(&aes_cbc_encrypt(key, &plaintext));
    plaintext.zeroize();

    let tag = compute_cmac(key, &envelope);
    envelope.extend_from_slice(&tag);

    log::debug!(
        "Sealed envelope for {} (opts=0x{opts:02X}, nonce={nonce}, {} payload bytes)",
        encode_hex_upper(address),
        payload.len()
    );
    log_frame_hex("Sealed envelope", &envelope);
    envelope
}

/// Verify and decrypt an envelope.
///
/// Returns `address || decrypted block(s) || cmac`, the same framing that
/// went over the air with the ciphertext replaced by plaintext.
pub fn decrypt(envelope: &[u8], key: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    let key = EnvelopeKey::from_bytes(key)?;
    decrypt_with_key(envelope, &key)
}

pub fn decrypt_with_key(envelope: &[u8], key: &EnvelopeKey) -> Result<Vec<u8>, EnvelopeError> {
    log_frame_hex("Received envelope", envelope);

    if envelope.len() < MIN_ENVELOPE_LEN
        || (envelope.len() - ADDRESS_LEN - CMAC_LEN) % AES_BLOCK_SIZE != 0
    {
        return Err(EnvelopeError::InvalidLength {
            actual: envelope.len(),
        });
    }

    let (body, received_tag) = envelope.split_at(envelope.len() - CMAC_LEN);
    if !verify_cmac(key, body, received_tag) {
        if AUTH_FAILURE_THROTTLE.lock().map(|mut t| t.allow()).unwrap_or(true) {
            log::warn!(
                "CMAC mismatch for envelope from {}",
                encode_hex_upper(&body[..ADDRESS_LEN])
            );
        }
        return Err(EnvelopeError::AuthenticationError);
    }

    let mut out = Vec::with_capacity(envelope.len());
    out.extend_from_slice(&body[..ADDRESS_LEN]);
    out.extend_from_slice(&aes_cbc_decrypt(key, &body[ADDRESS_LEN..]));
    out.extend_from_slice(received_tag);
    Ok(out)
}

/// Truncated AES-CMAC over `buf[0..16] || buf[4..]`.
///
/// `buf` is the address followed by the ciphertext and must hold at least
/// one block after the address.
pub fn compute_cmac(key: &EnvelopeKey, buf: &[u8]) -> [u8; CMAC_LEN] {
    let full = cmac_mac(key, buf).finalize().into_bytes();
    let mut tag = [0u8; CMAC_LEN];
    tag.copy_from_slice(&full[..CMAC_LEN]);
    tag
}

fn verify_cmac(key: &EnvelopeKey, buf: &[u8], tag: &[u8]) -> bool {
    cmac_mac(key, buf).verify_truncated_left(tag).is_ok()
}

fn cmac_mac(key: &EnvelopeKey, buf: &[u8]) -> Cmac<Aes128> {
    use aes::cipher::KeyInit;

    let mut mac = <Cmac<Aes128> as KeyInit>::new(key.as_bytes().into());
    let head = buf.len().min(AES_BLOCK_SIZE);
    mac.update(&buf[..head]);
    mac.update(&buf[ADDRESS_LEN.min(buf.len())..]);
    mac
}

fn aes_cbc_encrypt(key: &EnvelopeKey, plaintext: &[u8]) -> Vec<u8> {
    use aes::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};

    let cipher = Aes128::new(key.as_bytes().into());
    let mut result = Vec::with_capacity(plaintext.len());
    let mut prev_block = [0u8; AES_BLOCK_SIZE];

    for chunk in plaintext.chunks_exact(AES_BLOCK_SIZE) {
        let mut block = [0u8; AES_BLOCK_SIZE];
        block.copy_from_slice(chunk);

        // XOR with previous ciphertext block (or IV)
        for (b, p) in block.iter_mut().zip(prev_block.iter()) {
            *b ^= p;
        }

        let mut ga = GenericArray::from(block);
        cipher.encrypt_block(&mut ga);
        prev_block.copy_from_slice(&ga);
        result.extend_from_slice(&ga);
    }

    result
}

fn aes_cbc_decrypt(key: &EnvelopeKey, ciphertext: &[u8]) -> Vec<u8> {
    use aes::cipher::{generic_array::GenericArray, BlockDecrypt, KeyInit};

    let cipher = Aes128::new(key.as_bytes().into());
    let mut result = Vec::with_capacity(ciphertext.len());
    let mut prev_block = [0u8; AES_BLOCK_SIZE];

    for chunk in ciphertext.chunks_exact(AES_BLOCK_SIZE) {
        let mut ga = GenericArray::clone_from_slice(chunk);
        cipher.decrypt_block(&mut ga);

        for (i, byte) in ga.iter().enumerate() {
            result.push(byte ^ prev_block[i]);
        }
        prev_block.copy_from_slice(chunk);
    }

    result
}

fn parse_address(address_hex: &str) -> Result<[u8; ADDRESS_LEN], EnvelopeError> {
    decode_hex_array::<ADDRESS_LEN>(address_hex).map_err(|e| EnvelopeError::AddressDecodeError {
        reason: e.to_string(),
    })
}

/// A verified, decrypted envelope split into its parts
#[derive(Debug, Clone, PartialEq)]
pub struct OpenedEnvelope {
    pub address: [u8; ADDRESS_LEN],
    pub opts: u8,
    pub nonce: u8,
    /// Payload with the zero padding removed
    pub payload: Vec<u8>,
    pub cmac: [u8; CMAC_LEN],
}

impl OpenedEnvelope {
    /// Split the output of [`decrypt`]
    pub fn parse(decrypted: &[u8]) -> Result<Self, EnvelopeError> {
        if decrypted.len() < ENVELOPE_HEADER_LEN + CMAC_LEN {
            return Err(EnvelopeError::InvalidLength {
                actual: decrypted.len(),
            });
        }

        let mut address = [0u8; ADDRESS_LEN];
        address.copy_from_slice(&decrypted[..ADDRESS_LEN]);
        let mut cmac = [0u8; CMAC_LEN];
        cmac.copy_from_slice(&decrypted[decrypted.len() - CMAC_LEN..]);

        let opts = decrypted[ADDRESS_LEN];
        let nonce = decrypted[ADDRESS_LEN + 1];
        let declared = decrypted[ADDRESS_LEN + 2] as usize;

        let body = &decrypted[ENVELOPE_HEADER_LEN..decrypted.len() - CMAC_LEN];
        if declared > body.len() {
            return Err(EnvelopeError::LengthMismatch {
                declared,
                available: body.len(),
            });
        }

        Ok(Self {
            address,
            opts,
            nonce,
            payload: body[..declared].to_vec(),
            cmac,
        })
    }

    pub fn address_hex(&self) -> String {
        encode_hex_upper(&self.address)
    }
}

/// Verify, decrypt and split an envelope
pub fn open(envelope: &[u8], key: &[u8]) -> Result<OpenedEnvelope, EnvelopeError> {
    OpenedEnvelope::parse(&decrypt(envelope, key)?)
}

pub fn open_with_key(envelope: &[u8], key: &EnvelopeKey) -> Result<OpenedEnvelope, EnvelopeError> {
    OpenedEnvelope::parse(&decrypt_with_key(envelope, key)?)
}
