//! Credentials and statement interval.
//!
//! Everything here runs before the first remote call, so a bad token file,
//! an unreadable key or an inverted interval stops the run early.

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Datelike, TimeZone, Utc};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;

/// Resolve the API token.
///
/// A value starting with `@` names a file holding the token.
pub fn load_token(value: &str) -> Result<String> {
    let token = match value.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read token file {}", path))?
            .trim()
            .to_string(),
        None => value.trim().to_string(),
    };

    if token.is_empty() {
        bail!("API token is empty");
    }

    Ok(token)
}

/// Load the SCA private key from a PEM file.
///
/// PKCS#1 (`RSA PRIVATE KEY`) is expected; PKCS#8 (`PRIVATE KEY`) is
/// accepted as well.
pub fn load_private_key(path: &Path) -> Result<RsaPrivateKey> {
    let pem = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read private key {}", path.display()))?;

    parse_private_key(&pem)
        .with_context(|| format!("Failed to parse private key {}", path.display()))
}

fn parse_private_key(pem: &str) -> Result<RsaPrivateKey> {
    match RsaPrivateKey::from_pkcs1_pem(pem) {
        Ok(key) => Ok(key),
        Err(pkcs1_err) => RsaPrivateKey::from_pkcs8_pem(pem).map_err(|pkcs8_err| {
            anyhow::anyhow!(
                "not an RSA private key (PKCS#1: {}; PKCS#8: {})",
                pkcs1_err,
                pkcs8_err
            )
        }),
    }
}

/// Parse an RFC 3339 timestamp given on the command line.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|t| t.with_timezone(&Utc))
}

/// First instant of the month `now` falls in.
pub fn beginning_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

/// Fill in interval defaults and validate the result.
///
/// Start defaults to the beginning of the current month, end to `now`.
pub fn resolve_interval(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let start = start.unwrap_or_else(|| beginning_of_month(now));
    let end = end.unwrap_or(now);

    if end < start {
        bail!("Interval end {} is before its start {}", end, start);
    }

    Ok((start, end))
}
