//! URL-safe payload codec: JSON, deflated, prefixed with a format byte, then
//! base64url without padding.

use std::io::{Read, Write};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::CodecError;

const CODEC_VERSION: u8 = 1;

/// Upper bound on inflated size; links are short, anything larger is hostile.
const MAX_INFLATED_BYTES: u64 = 256 * 1024;

pub fn encode_payload<T: Serialize>(payload: &T) -> Result<String, CodecError> {
    let json = serde_json::to_vec(payload)?;
    let mut encoder = DeflateEncoder::new(vec![CODEC_VERSION], Compression::best());
    encoder
        .write_all(&json)
        .map_err(|e| CodecError::Compression(e.to_string()))?;
    let bytes = encoder
        .finish()
        .map_err(|e| CodecError::Compression(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

pub fn decode_payload<T: DeserializeOwned>(encoded: &str) -> Result<T, CodecError> {
    let encoded = encoded.trim();
    if encoded.is_empty() {
        return Err(CodecError::Empty);
    }
    let bytes = URL_SAFE_NO_PAD.decode(encoded)?;
    let (&version, body) = bytes.split_first().ok_or(CodecError::Empty)?;
    if version != CODEC_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }

    let mut json = Vec::new();
    DeflateDecoder::new(body)
        .take(MAX_INFLATED_BYTES)
        .read_to_end(&mut json)
        .map_err(|e| CodecError::Compression(e.to_string()))?;
    if json.is_empty() {
        return Err(CodecError::Empty);
    }
    Ok(serde_json::from_slice(&json)?)
}
