//! Spine export versions accepted by the loaders.

/// Oldest export accepted, as `(major, minor)`. Clipping attachments are stable from 3.8 on.
pub const SPINE_EXPORT_MIN: (u32, u32) = (3, 8);

/// Newest export major version accepted.
pub const SPINE_EXPORT_MAX_MAJOR: u32 = 4;

/// A `major.minor[.patch...]` version string as written by the Spine editor.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct SpineVersion {
    pub major: u32,
    pub minor: u32,
}

impl SpineVersion {
    /// Parses the leading `major.minor` of a version string. A missing minor reads as `0`; any
    /// trailing patch or tag component is ignored.
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.trim().split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = match parts.next() {
            None => 0,
            Some(minor) => {
                let digits: &str = &minor[..minor
                    .find(|c: char| !c.is_ascii_digit())
                    .unwrap_or(minor.len())];
                digits.parse().ok()?
            }
        };
        Some(Self { major, minor })
    }

    pub fn is_supported(&self) -> bool {
        (self.major, self.minor) >= SPINE_EXPORT_MIN && self.major <= SPINE_EXPORT_MAX_MAJOR
    }
}
