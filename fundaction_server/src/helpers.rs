use std::{net::IpAddr, str::FromStr};

use actix_web::HttpRequest;
use hmac::{Hmac, Mac};
use log::{debug, trace};
use regex::Regex;
use sha2::Sha256;

use crate::errors::SignatureError;

type HmacSha256 = Hmac<Sha256>;

/// Get the remote IP address from the request. It uses 3 sources to determine the IP address, in decreasing order
/// of preference:
/// 1. The `X-Forwarded-For` header, iif `use_x_forwarded_for` is set to true in the configuration.
/// 2. The `Forwarded` header, iif `use_forwarded` is set to true in the configuration.
/// 3. The peer address from the connection info.
pub fn get_remote_ip(req: &HttpRequest, use_x_forwarded_for: bool, use_forwarded: bool) -> Option<IpAddr> {
    let mut result = None;
    if use_x_forwarded_for {
        trace!("Checking X-Forwarded-For header");
        result = req
            .headers()
            .get("X-Forwarded-For")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| IpAddr::from_str(s.trim()).ok());
        if let Some(ip) = result {
            debug!("Using X-Forwarded-For header for remote address: {ip}");
        }
    }
    if use_forwarded && result.is_none() {
        trace!("Checking Forwarded header");
        result = req.headers().get("Forwarded").and_then(|v| v.to_str().ok()).and_then(forwarded_for);
        if let Some(ip) = result {
            debug!("Using Forwarded header for remote address: {ip}");
        }
    }
    result.or_else(|| {
        let peer_addr = req.connection_info().peer_addr().map(|a| a.to_string());
        trace!("Using Peer address for remote address: {:?}", peer_addr);
        peer_addr.and_then(|s| IpAddr::from_str(&s).ok())
    })
}

fn forwarded_for(header: &str) -> Option<IpAddr> {
    let re = Regex::new(r#"for="?(?P<ip>[^;,"]+)"#).ok()?;
    re.captures(header).and_then(|caps| caps.name("ip")).and_then(|m| IpAddr::from_str(m.as_str()).ok())
}

/// Hex-encoded HMAC-SHA256 of `data`, keyed with `secret`.
pub fn calculate_hmac(secret: &str, data: &[u8]) -> String {
    // HMAC accepts keys of any length
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::default(),
    };
    mac.update(data);
    hex::encode(mac.finalize().into_bytes())
}

/// A parsed gateway signature header, e.g. `t=1714000000,v1=5257a8...,v1=9f3c2e...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub signatures: Vec<Vec<u8>>,
}

impl FromStr for SignatureHeader {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut timestamp = None;
        let mut signatures = vec![];
        for item in s.split(',') {
            let (key, value) = item
                .trim()
                .split_once('=')
                .ok_or_else(|| SignatureError::Malformed(format!("'{item}' is not a key=value pair")))?;
            match key {
                "t" => {
                    let t = value
                        .parse::<i64>()
                        .map_err(|e| SignatureError::Malformed(format!("Invalid timestamp '{value}'. {e}")))?;
                    timestamp = Some(t);
                },
                "v1" => {
                    let sig = hex::decode(value)
                        .map_err(|e| SignatureError::Malformed(format!("Signature is not valid hex. {e}")))?;
                    signatures.push(sig);
                },
                // Other schemes (e.g. v0 test signatures) are ignored
                _ => trace!("🪝️ Ignoring signature header entry {key}"),
            }
        }
        let timestamp = timestamp.ok_or_else(|| SignatureError::Malformed("No timestamp was provided".into()))?;
        if signatures.is_empty() {
            return Err(SignatureError::Malformed("No v1 signature was provided".into()));
        }
        Ok(Self { timestamp, signatures })
    }
}

/// Checks a webhook signature header against the raw request body.
///
/// The signed payload is `"{t}.{body}"`. The timestamp must be within `tolerance_secs` of `now` (unix seconds), and
/// at least one of the `v1` signatures must match.
pub fn verify_signature(
    header: &str,
    body: &[u8],
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), SignatureError> {
    let header = header.parse::<SignatureHeader>()?;
    let drift = now
        .checked_sub(header.timestamp)
        .ok_or_else(|| SignatureError::Malformed(format!("Timestamp {} is out of range", header.timestamp)))?;
    if drift.unsigned_abs() > tolerance_secs.unsigned_abs() {
        return Err(SignatureError::OutsideTolerance(drift));
    }
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| SignatureError::Malformed(e.to_string()))?;
    mac.update(header.timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    if header.signatures.iter().any(|sig| mac.clone().verify_slice(sig).is_ok()) {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Builds a signature header for `body`. Used to sign test payloads, and by tools that replay gateway events.
pub fn sign_payload(body: &[u8], secret: &str, timestamp: i64) -> String {
    let mut payload = timestamp.to_string().into_bytes();
    payload.push(b'.');
    payload.extend_from_slice(body);
    format!("t={timestamp},v1={}", calculate_hmac(secret, &payload))
}
