//! Response Compression
//!
//! Gzip-encodes textual origin bodies for clients that accept it.

use std::io::Write;

use bytes::Bytes;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::cache::Variant;
use crate::error::Result;

/// Encoding marker written to `Content-Encoding` and stored on the entry.
pub const GZIP: &str = "gzip";

/// Returns true for textual or structured content types.
pub fn is_compressible(content_type: &str) -> bool {
    content_type.contains("text") || content_type.contains("application")
}

/// Compresses `body` when the request accepts gzip and the content is textual.
///
/// Returns the body to send and the encoding that was applied, which is
/// empty when the body is returned untouched.
pub fn compress(
    accept_encoding: Option<&str>,
    content_type: &str,
    body: Bytes,
) -> Result<(Bytes, &'static str)> {
    let variant = Variant::from_accept_encoding(accept_encoding);
    if variant != Variant::Gzip || !is_compressible(content_type) {
        return Ok((body, ""));
    }

    let mut encoder = GzEncoder::new(Vec::with_capacity(body.len() / 2), Compression::default());
    encoder.write_all(&body)?;
    // finish() writes the trailer, so the stream is complete before it is read
    let compressed = encoder.finish()?;

    Ok((Bytes::from(compressed), GZIP))
}
