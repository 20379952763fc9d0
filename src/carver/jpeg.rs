use super::{read_at, Carver, Device};
use crate::signature::{Kind, JPEG_EOI, JPEG_RESTART_RANGE, JPEG_SOS_MARKER, JPEG_STARTS};
use byteorder::{BigEndian, ByteOrder};
use std::io;

/// JPEG is a sequence of marker segments. Most carry a big-endian length; the Start Of
/// Scan marker (`FF DA`) introduces entropy-coded data of unstated length, terminated by
/// the end-of-image marker `FF D9` rather than a length field.
pub struct JpegCarver;

impl Carver for JpegCarver {
    fn kind(&self) -> Kind {
        Kind::Jpg
    }

    fn start_signatures(&self) -> &'static [&'static [u8]] {
        JPEG_STARTS
    }

    fn extract(&self, device: &mut dyn Device, start: u64) -> io::Result<Option<u64>> {
        let cap = self.kind().cap();
        let mut pos = start + 2; // past SOI

        loop {
            if pos - start > cap {
                return Ok(None);
            }

            let mut marker = [0u8; 2];
            if !read_at(device, pos, &mut marker)? {
                return Ok(None);
            }

            if marker[0] != 0xFF {
                // desynchronized: this start was spurious, not a real marker boundary.
                return Ok(None);
            }

            if marker == JPEG_EOI {
                return Ok(Some(pos + 2));
            }

            if marker[1] == 0xD8 || JPEG_RESTART_RANGE.contains(&marker[1]) {
                pos += 2;
                continue;
            }

            let mut len_bytes = [0u8; 2];
            if !read_at(device, pos + 2, &mut len_bytes)? {
                return Ok(None);
            }
            let segment_len = BigEndian::read_u16(&len_bytes) as u64;

            if marker[1] == JPEG_SOS_MARKER {
                let scan_start = pos + 2 + segment_len;
                return find_eoi_in_scan(device, scan_start, start, cap);
            }

            pos += 2 + segment_len;
        }
    }
}

/// Scans entropy-coded scan data in 1024-byte chunks for the first `FF D9`. Byte-stuffed
/// `FF 00` inside the bitstream never matches this two-byte pattern, so it is correctly
/// skipped over without special-casing.
fn find_eoi_in_scan(
    device: &mut dyn Device,
    scan_start: u64,
    file_start: u64,
    cap: u64,
) -> io::Result<Option<u64>> {
    const CHUNK: usize = 1024;
    let mut sos_offset: u64 = 0;

    loop {
        if scan_start + sos_offset - file_start > cap {
            return Ok(None);
        }
        let mut chunk = vec![0u8; CHUNK];
        let absolute = scan_start + sos_offset;
        let read = read_chunk(device, absolute, &mut chunk)?;
        if read == 0 {
            return Ok(None);
        }
        chunk.truncate(read);

        if let Some(idx) = chunk.windows(2).position(|w| w == JPEG_EOI) {
            return Ok(Some(absolute + idx as u64 + 2));
        }

        sos_offset += CHUNK as u64;
    }
}

fn read_chunk(device: &mut dyn Device, pos: u64, buf: &mut [u8]) -> io::Result<usize> {
    use std::io::SeekFrom;
    device.seek(SeekFrom::Start(pos))?;
    let mut total = 0;
    while total < buf.len() {
        match device.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}
