//! Deterministic compress+encode of markup, and canonical message
//! serialization.

use crate::error::{CrawlError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use flate2::read::{GzDecoder, GzEncoder};
use flate2::Compression;
use std::io::Read;

/// gzip (default compression) then standard base64.
pub fn compress(markup: &[u8]) -> Result<String> {
    let mut encoder = GzEncoder::new(markup, Compression::default());
    let mut compressed = Vec::new();
    encoder
        .read_to_end(&mut compressed)
        .map_err(CrawlError::Io)?;
    Ok(STANDARD.encode(compressed))
}

/// Reverse of [`compress`].
pub fn decompress(encoded: &str) -> Result<Vec<u8>> {
    let compressed = STANDARD
        .decode(encoded)
        .map_err(|e| CrawlError::custom(format!("invalid base64: {e}")))?;
    let mut decoder = GzDecoder::new(&compressed[..]);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).map_err(CrawlError::Io)?;
    Ok(out)
}
