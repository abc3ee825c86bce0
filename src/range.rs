//! HTTP `Range` header parsing for partial-content downloads.

use thiserror::Error;

const UNIT_PREFIX: &str = "bytes=";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("Malformed Range header: {0}")]
    Malformed(String),
    #[error("Range end {end} is outside of resource length {total}")]
    OutOfRange { end: u64, total: u64 },
    #[error("Range start {start} is after range end {end}")]
    InvalidOrder { start: u64, end: u64 },
}

/// An inclusive `[start, end]` byte span within a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered by the range.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value for the `Content-Range` header of a 206 response.
    pub fn content_range(&self, total: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, total)
    }
}

/// Parse a `Range` header value against a resource of `total` bytes.
///
/// Ranges come back in header order without merging or sorting. Suffix
/// ranges (`bytes=-500`) are not supported and are rejected as malformed.
/// Whitespace around each comma-separated spec is ignored.
pub fn parse_range(header: &str, total: u64) -> Result<Vec<ByteRange>, RangeError> {
    let specs = header
        .strip_prefix(UNIT_PREFIX)
        .ok_or_else(|| RangeError::Malformed("expected 'bytes=' prefix".to_string()))?;

    specs
        .split(',')
        .map(|spec| parse_spec(spec.trim(), total))
        .collect()
}

fn parse_spec(spec: &str, total: u64) -> Result<ByteRange, RangeError> {
    let mut parts = spec.split('-');
    let (start, end) = match (parts.next(), parts.next(), parts.next()) {
        (Some(start), Some(end), None) => (start, end),
        _ => {
            return Err(RangeError::Malformed(format!(
                "range spec '{spec}' must have the form <start>-<end>"
            )))
        }
    };

    let start: u64 = start.parse().map_err(|_| {
        RangeError::Malformed(format!("range start '{start}' is not a non-negative integer"))
    })?;

    let end = if end.is_empty() {
        // Open range to EOF. A zero-length resource has no last byte.
        match total.checked_sub(1) {
            Some(last) => last,
            None => return Err(RangeError::InvalidOrder { start, end: 0 }),
        }
    } else {
        let end: u64 = end.parse().map_err(|_| {
            RangeError::Malformed(format!("range end '{end}' is not a non-negative integer"))
        })?;
        if end >= total {
            return Err(RangeError::OutOfRange { end, total });
        }
        end
    };

    if start > end {
        return Err(RangeError::InvalidOrder { start, end });
    }

    Ok(ByteRange { start, end })
}
