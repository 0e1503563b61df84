//! `Range` header parsing for media delivery.
//!
//! Only a single `bytes=<start>-[<end>]` range is supported. Suffix ranges
//! (`bytes=-500`) and multi-range requests are rejected as malformed.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("Malformed range header: {0}")]
    Malformed(String),

    #[error("Range start beyond end of {size} byte resource")]
    NotSatisfiable { size: u64 },
}

/// Inclusive byte range within a resource of known size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
    pub size: u64,
}

impl ByteRange {
    /// Parse a `Range` header value against a resource of `size` bytes.
    ///
    /// An end beyond the resource is clamped to `size - 1`.
    pub fn parse(header: &str, size: u64) -> Result<Self, RangeError> {
        let malformed = || RangeError::Malformed(header.to_string());

        let spec = header
            .trim()
            .strip_prefix("bytes=")
            .ok_or_else(malformed)?
            .trim();

        if spec.contains(',') {
            return Err(malformed());
        }

        let (start_str, end_str) = spec.split_once('-').ok_or_else(malformed)?;
        let start_str = start_str.trim();
        let end_str = end_str.trim();

        if start_str.is_empty() {
            return Err(malformed());
        }
        let start: u64 = start_str.parse().map_err(|_| malformed())?;

        let requested_end = if end_str.is_empty() {
            None
        } else {
            let end: u64 = end_str.parse().map_err(|_| malformed())?;
            if end < start {
                return Err(malformed());
            }
            Some(end)
        };

        if start >= size {
            return Err(RangeError::NotSatisfiable { size });
        }

        let last = size - 1;
        let end = requested_end.map_or(last, |end| end.min(last));

        Ok(Self { start, end, size })
    }

    /// Number of bytes covered by the range.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value for the `Content-Range` response header.
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.size)
    }

    /// `Content-Range` value sent with a 416 response.
    pub fn unsatisfied_content_range(size: u64) -> String {
        format!("bytes */{}", size)
    }
}
