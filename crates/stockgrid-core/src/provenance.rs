//! Write provenance: distinguishes a write's point of origin from its
//! replicated copies.
//!
//! The tag travels out-of-band in a request header, never in the item
//! body. Only origin writes may fan out or invalidate the cache.

use http::HeaderValue;

/// Header carrying the provenance tag on `PUT /update/{id}`.
pub const PROVENANCE_HEADER: &str = "x-stockgrid-provenance";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOrigin {
    /// First application of a write (client, order tier, or admin).
    Origin,
    /// Copy of a write forwarded by a sibling replica.
    Replicated,
}

impl WriteOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Origin => "origin",
            Self::Replicated => "replicated",
        }
    }

    /// Read the tag from a header value. Missing or unrecognized values
    /// count as origin writes.
    pub fn from_header(value: Option<&HeaderValue>) -> Self {
        match value.and_then(|v| v.to_str().ok()) {
            Some(v) if v.trim().eq_ignore_ascii_case("replicated") => Self::Replicated,
            _ => Self::Origin,
        }
    }

    /// Whether a write with this provenance may trigger fan-out and
    /// invalidation.
    pub fn may_propagate(self) -> bool {
        self == Self::Origin
    }
}

impl std::fmt::Display for WriteOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
