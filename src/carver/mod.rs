//! Format-specific parsers: given a device and a candidate start offset, compute the
//! end offset by following the format's internal structure.
//!
//! Every parser shares the same shape: `(device, start) -> end | FAILURE`, bounded by a
//! per-format size cap, reading forward only. `Ok(None)` is FAILURE (a spurious start, or
//! the cap was exceeded before an end marker turned up) and is never an error in the Rust
//! sense; `Err` is reserved for a genuine I/O fault reading the device.

mod jpeg;
mod pdf;
mod png;
mod zip;

pub use jpeg::JpegCarver;
pub use pdf::PdfCarver;
pub use png::PngCarver;
pub use zip::ZipCarver;

use crate::signature::Kind;
use std::io::{self, Read, Seek};

/// Blanket capability for anything the carvers can read from: a real device file in
/// production, an in-memory `Cursor<Vec<u8>>` in tests.
pub trait Device: Read + Seek {}
impl<T: Read + Seek + ?Sized> Device for T {}

pub trait Carver: Send + Sync {
    fn kind(&self) -> Kind;

    /// The byte patterns that mark a candidate start of this format.
    fn start_signatures(&self) -> &'static [&'static [u8]];

    /// Given a device and an absolute offset where a start signature was found, compute
    /// the absolute end offset (exclusive) of the carved region, or `None` if the bytes
    /// starting here don't actually parse as this format.
    fn extract(&self, device: &mut dyn Device, start: u64) -> io::Result<Option<u64>>;
}

/// Reads the next `buf.len()` bytes from `device` at `pos`, returning `Ok(None)` instead
/// of an error on a short read (ran off the end of the device) since that's FAILURE, not
/// an I/O fault.
fn read_at(device: &mut dyn Device, pos: u64, buf: &mut [u8]) -> io::Result<bool> {
    device.seek(io::SeekFrom::Start(pos))?;
    match device.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// Slides a fixed-size window forward from `start`, one byte at a time, looking for
/// `needle`, up to `cap` bytes past `start`. Returns the absolute offset of the first
/// match, or `None` if the cap was reached first.
///
/// Used by the PNG and ZIP parsers, whose end marker is a single fixed byte sequence
/// with no interior structure to walk.
fn find_forward(
    device: &mut dyn Device,
    start: u64,
    needle: &[u8],
    cap: u64,
) -> io::Result<Option<u64>> {
    let window_len = needle.len() * 2;
    let mut window = vec![0u8; window_len];
    let mut pos = start;

    if !read_at(device, pos, &mut window)? {
        return Ok(None);
    }

    loop {
        if pos - start > cap {
            return Ok(None);
        }
        if let Some(idx) = window
            .windows(needle.len())
            .position(|w| w == needle)
        {
            return Ok(Some(pos + idx as u64));
        }

        // Slide the window forward by needle.len(), keeping the tail as overlap so a
        // match straddling the old boundary is still caught next iteration.
        window.drain(0..needle.len());
        let mut fresh = vec![0u8; needle.len()];
        if !read_at(device, pos + window_len as u64, &mut fresh)? {
            return Ok(None);
        }
        window.extend_from_slice(&fresh);
        pos += needle.len() as u64;
    }
}
