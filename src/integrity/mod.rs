//! Structural sanity gate for uploaded documents.
//!
//! This is deliberately a shallow check, not a parser: it confirms the bytes
//! begin with the PDF magic signature, that an end-of-file marker appears in
//! the tail window, and that the payload is large enough to plausibly be a
//! document at all. Payloads that pass here can still fail to decode in the
//! watermark renderer; that asymmetry is intentional (favor availability
//! over strict validation) and must be preserved.

use thiserror::Error;

/// Required magic signature at offset 0.
const HEADER_MAGIC: &[u8] = b"%PDF-";

/// End-of-file marker. Producers place it at varying offsets from the end
/// (trailing newlines, linearization padding), so the check is "present in
/// the tail window", not "at a fixed offset".
const TRAILER_MARKER: &[u8] = b"%%EOF";

/// Number of bytes inspected at the end of the stream for [`TRAILER_MARKER`].
const TRAILER_WINDOW: usize = 32;

/// Minimum plausible size for a real document, in bytes.
const MIN_DOCUMENT_SIZE: usize = 100;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("document does not start with the {} signature", String::from_utf8_lossy(HEADER_MAGIC))]
    MalformedHeader,

    #[error("no end-of-file marker within the final {TRAILER_WINDOW} bytes")]
    MalformedTrailer,

    #[error("document is {len} bytes, below the {MIN_DOCUMENT_SIZE} byte minimum")]
    TooSmall { len: usize },
}

/// Validate raw document bytes before any processing.
///
/// Checks, in order: minimum size, magic header, trailer marker in the tail
/// window. The first failing check is reported.
pub fn validate(bytes: &[u8]) -> Result<(), IntegrityError> {
    if bytes.len() < MIN_DOCUMENT_SIZE {
        return Err(IntegrityError::TooSmall { len: bytes.len() });
    }

    if !bytes.starts_with(HEADER_MAGIC) {
        return Err(IntegrityError::MalformedHeader);
    }

    let tail = &bytes[bytes.len() - TRAILER_WINDOW..];
    if !contains(tail, TRAILER_MARKER) {
        return Err(IntegrityError::MalformedTrailer);
    }

    Ok(())
}

/// Byte-slice containment (`[u8]` has no `contains` for subslices).
fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack
        .windows(needle.len())
        .any(|window| window == needle)
}
