//! Inclusive byte ranges as used in HTTP `Range` headers.

use std::fmt;

use super::PlanningError;

/// Inclusive byte range; `end == None` means "to the end of the resource".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ByteRange {
    start: u64,
    end: Option<u64>,
}

impl ByteRange {
    /// Validated constructor: `end`, when present, must be `>= start`.
    pub fn new(start: u64, end: Option<u64>) -> Result<Self, PlanningError> {
        match end {
            Some(e) if e < start => Err(PlanningError::InvalidRange { start, end: e }),
            _ => Ok(Self { start, end }),
        }
    }

    /// Closed range `[start, end]`; caller guarantees `end >= start`.
    pub(crate) fn closed(start: u64, end: u64) -> Self {
        debug_assert!(end >= start);
        Self {
            start,
            end: Some(end),
        }
    }

    /// Open-ended range `[start, ..)`.
    pub fn open(start: u64) -> Self {
        Self { start, end: None }
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> Option<u64> {
        self.end
    }

    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// Last byte covered, resolving an open end against `total_size`.
    pub fn last_byte(&self, total_size: u64) -> u64 {
        self.end.unwrap_or_else(|| total_size.saturating_sub(1))
    }

    /// Number of bytes covered within a resource of `total_size` bytes.
    pub fn len_within(&self, total_size: u64) -> u64 {
        let last = self.last_byte(total_size);
        if total_size == 0 || last < self.start {
            return 0;
        }
        last - self.start + 1
    }

    /// HTTP Range header value: `bytes=start-end` or `bytes=start-`.
    pub fn range_header_value(&self) -> String {
        format!("bytes={}", self)
    }

    /// Parses the `start-end` / `start-` form produced by `Display`.
    pub fn parse(s: &str) -> Option<Self> {
        let (start, end) = s.split_once('-')?;
        let start = start.parse().ok()?;
        let end = if end.is_empty() {
            None
        } else {
            Some(end.parse().ok()?)
        };
        Self::new(start, end).ok()
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "{}-{}", self.start, end),
            None => write!(f, "{}-", self.start),
        }
    }
}
