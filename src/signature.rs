//! Byte-pattern constants identifying the start and end of each supported format.
//!
//! The longest start signature is 4 bytes (ZIP, JPEG) and the longest end signature is
//! 12 bytes (PNG), so carrying forward 11 bytes of the previous scan window is always
//! enough to detect a signature straddling a chunk boundary.

use std::fmt;
use std::str::FromStr;

pub const PNG_START: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
pub const PNG_STARTS: &[&[u8]] = &[PNG_START];
pub const PNG_END: &[u8] = &[
    0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

/// The four recognized JPEG start variants. Each is checked in order by the scanner;
/// the shared parser only cares that the first two bytes are `FF D8`.
pub const JPEG_STARTS: &[&[u8]] = &[
    &[0xFF, 0xD8, 0xFF, 0xDB],
    &[0xFF, 0xD8, 0xFF, 0xE0],
    &[0xFF, 0xD8, 0xFF, 0xEE],
    &[0xFF, 0xD8, 0xFF, 0xE1],
];
pub const JPEG_RESTART_RANGE: std::ops::RangeInclusive<u8> = 0xD0..=0xD7;
pub const JPEG_SOS_MARKER: u8 = 0xDA;
pub const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];

pub const ZIP_START: &[u8] = &[0x50, 0x4B, 0x03, 0x04];
pub const ZIP_STARTS: &[&[u8]] = &[ZIP_START];
pub const ZIP_EOCD: &[u8] = &[0x50, 0x4B, 0x05, 0x06];

pub const PDF_START: &[u8] = b"%PDF-";
pub const PDF_STARTS: &[&[u8]] = &[PDF_START];
pub const PDF_END: &[u8] = b"%%EOF";

/// Longest end signature length minus one; the amount of buffer carried across chunk
/// reads so a signature that straddles the boundary is still found whole.
pub const CARRY_FORWARD_BYTES: usize = PNG_END.len() - 1;

pub const SCAN_CHUNK_SIZE: usize = 1024;

/// Supported carved file kinds, in scanner priority order (ZIP, PDF, JPEG, PNG).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Zip,
    Pdf,
    Jpg,
    Png,
}

impl Kind {
    pub fn extension(&self) -> &'static str {
        match self {
            Kind::Jpg => "jpg",
            Kind::Png => "png",
            Kind::Zip => "zip",
            Kind::Pdf => "pdf",
        }
    }

    /// Maximum number of bytes a region of this kind may span, bounding the cost of a
    /// false-positive start signature.
    pub fn cap(&self) -> u64 {
        const MIB: u64 = 1024 * 1024;
        match self {
            Kind::Jpg => 5 * MIB,
            Kind::Png => 5 * MIB,
            Kind::Zip => 50 * MIB,
            Kind::Pdf => 10 * MIB,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownKind;

impl fmt::Display for UnknownKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized file kind")
    }
}

impl std::error::Error for UnknownKind {}

impl FromStr for Kind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "jpg" => Ok(Kind::Jpg),
            "png" => Ok(Kind::Png),
            "zip" => Ok(Kind::Zip),
            "pdf" => Ok(Kind::Pdf),
            _ => Err(UnknownKind),
        }
    }
}
