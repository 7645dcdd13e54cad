//! Request signing primitives shared by the adapters
//!
//! Venues differ in digest (SHA-256, SHA-384, SHA-512, MD5) and output
//! encoding (hex, base64) but all sign with an HMAC over a venue-defined
//! payload string.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::errors::{ExchangeError, Result};

type HmacSha256 = Hmac<Sha256>;
type HmacSha384 = Hmac<Sha384>;
type HmacSha512 = Hmac<Sha512>;
type HmacMd5 = Hmac<Md5>;

fn mac_bytes<M: Mac + hmac::digest::KeyInit>(key: &[u8], payload: &[u8]) -> Result<Vec<u8>> {
    let mut mac = <M as Mac>::new_from_slice(key)
        .map_err(|e| ExchangeError::SigningError(format!("HMAC setup failed: {e}")))?;
    mac.update(payload);
    Ok(mac.finalize().into_bytes().to_vec())
}

pub fn hmac_sha256(key: &[u8], payload: &[u8]) -> Result<Vec<u8>> {
    mac_bytes::<HmacSha256>(key, payload)
}

pub fn hmac_sha384(key: &[u8], payload: &[u8]) -> Result<Vec<u8>> {
    mac_bytes::<HmacSha384>(key, payload)
}

pub fn hmac_sha512(key: &[u8], payload: &[u8]) -> Result<Vec<u8>> {
    mac_bytes::<HmacSha512>(key, payload)
}

pub fn hmac_md5(key: &[u8], payload: &[u8]) -> Result<Vec<u8>> {
    mac_bytes::<HmacMd5>(key, payload)
}

pub fn sha256(payload: &[u8]) -> Vec<u8> {
    Sha256::digest(payload).to_vec()
}

pub fn sha1_hex(payload: &[u8]) -> String {
    hex::encode(Sha1::digest(payload))
}

pub fn md5_hex(payload: &[u8]) -> String {
    hex::encode(Md5::digest(payload))
}

pub fn hex_encode(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

pub fn base64_encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// `k=v` pairs sorted by key and joined with `&`. Values are URL-encoded
/// when `encode` is set.
pub fn sorted_query(params: &[(String, String)], encode: bool) -> String {
    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));
    sorted
        .into_iter()
        .map(|(k, v)| {
            if encode {
                format!("{}={}", urlencoding::encode(k), urlencoding::encode(v))
            } else {
                format!("{k}={v}")
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// `k=v` pairs in insertion order, URL-encoded
pub fn encode_query(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}
