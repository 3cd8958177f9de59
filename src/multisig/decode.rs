//! Manual ABI decoding for protocol config blobs.
//!
//! The changelog and multisig views carry ULN verifier configs as
//! ABI-encoded `bytes` values. We decode just the one struct we need by
//! slicing 32-byte words, with bounds checks at every step:
//!
//!   (uint64 confirmations, uint8 requiredDVNCount, uint8 optionalDVNCount,
//!    uint8 optionalDVNThreshold, address[] requiredDVNs, address[] optionalDVNs)
//!
//! Head: six words (scalars, then byte offsets to the two array tails).
//! Tail per array: length word followed by one word per address.

use alloy::primitives::{hex, Address, U256};
use thiserror::Error;

/// Rendered in place of a config value that failed to decode. The
/// surrounding row and page are unaffected.
pub const DECODE_PLACEHOLDER: &str = "could not be decoded";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("config blob truncated at byte {0}")]
    Truncated(usize),
    #[error("{0} out of range")]
    OutOfRange(&'static str),
    #[error("DVN count {declared} does not match array length {actual}")]
    CountMismatch { declared: usize, actual: usize },
    #[error("not a hex string")]
    BadHex,
}

/// Decoded ULN verifier configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UlnConfig {
    pub confirmations: u64,
    pub required_dvns: Vec<Address>,
    pub optional_dvns: Vec<Address>,
    pub optional_threshold: u8,
}

impl std::fmt::Display for UlnConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let required: Vec<String> = self.required_dvns.iter().map(|a| a.to_string()).collect();
        let optional: Vec<String> = self.optional_dvns.iter().map(|a| a.to_string()).collect();
        write!(
            f,
            "confirmations={} requiredDVNs=[{}] optionalDVNs=[{}] threshold={}",
            self.confirmations,
            required.join(", "),
            optional.join(", "),
            self.optional_threshold
        )
    }
}

fn word(data: &[u8], byte_offset: usize) -> Result<[u8; 32], DecodeError> {
    data.get(byte_offset..byte_offset + 32)
        .and_then(|slice| slice.try_into().ok())
        .ok_or(DecodeError::Truncated(byte_offset))
}

fn word_u64(data: &[u8], byte_offset: usize, what: &'static str) -> Result<u64, DecodeError> {
    U256::from_be_bytes(word(data, byte_offset)?)
        .try_into()
        .map_err(|_| DecodeError::OutOfRange(what))
}

fn word_u8(data: &[u8], byte_offset: usize, what: &'static str) -> Result<u8, DecodeError> {
    u8::try_from(word_u64(data, byte_offset, what)?).map_err(|_| DecodeError::OutOfRange(what))
}

fn word_usize(data: &[u8], byte_offset: usize, what: &'static str) -> Result<usize, DecodeError> {
    usize::try_from(word_u64(data, byte_offset, what)?).map_err(|_| DecodeError::OutOfRange(what))
}

fn address_array(data: &[u8], byte_offset: usize) -> Result<Vec<Address>, DecodeError> {
    let len = word_usize(data, byte_offset, "array length")?;
    // An address array longer than the blob itself is a malformed offset,
    // not a huge allocation.
    if len > data.len() / 32 {
        return Err(DecodeError::OutOfRange("array length"));
    }
    let mut addresses = Vec::with_capacity(len);
    for i in 0..len {
        let w = word(data, byte_offset + 32 + i * 32)?;
        addresses.push(Address::from_slice(&w[12..]));
    }
    Ok(addresses)
}

/// Decode a ULN config struct from its raw ABI encoding.
pub fn decode_uln_config(data: &[u8]) -> Result<UlnConfig, DecodeError> {
    let confirmations = word_u64(data, 0, "confirmations")?;
    let required_count = word_u8(data, 32, "requiredDVNCount")? as usize;
    let optional_count = word_u8(data, 64, "optionalDVNCount")? as usize;
    let optional_threshold = word_u8(data, 96, "optionalDVNThreshold")?;

    let required_offset = word_usize(data, 128, "requiredDVNs offset")?;
    let optional_offset = word_usize(data, 160, "optionalDVNs offset")?;

    let required_dvns = address_array(data, required_offset)?;
    let optional_dvns = address_array(data, optional_offset)?;

    if required_dvns.len() != required_count {
        return Err(DecodeError::CountMismatch {
            declared: required_count,
            actual: required_dvns.len(),
        });
    }
    if optional_dvns.len() != optional_count {
        return Err(DecodeError::CountMismatch {
            declared: optional_count,
            actual: optional_dvns.len(),
        });
    }

    Ok(UlnConfig {
        confirmations,
        required_dvns,
        optional_dvns,
        optional_threshold,
    })
}

/// Decode from a `0x`-prefixed hex string as stored in changelog values.
pub fn decode_uln_config_hex(value: &str) -> Result<UlnConfig, DecodeError> {
    let stripped = value.strip_prefix("0x").ok_or(DecodeError::BadHex)?;
    let bytes = hex::decode(stripped).map_err(|_| DecodeError::BadHex)?;
    decode_uln_config(&bytes)
}

/// Render a config value for display: decoded summary, or the
/// per-field placeholder on any failure.
pub fn display_uln_config(value: &str) -> String {
    match decode_uln_config_hex(value) {
        Ok(config) => config.to_string(),
        Err(_) => DECODE_PLACEHOLDER.to_string(),
    }
}
