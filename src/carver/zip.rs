use super::{find_forward, read_at, Carver, Device};
use crate::signature::{Kind, ZIP_EOCD, ZIP_START, ZIP_STARTS};
use byteorder::{ByteOrder, LittleEndian};
use std::io;

/// A ZIP ends with an End-Of-Central-Directory record: `50 4B 05 06`, 22 bytes of fixed
/// fields, then a variable-length comment whose length is the last 2 bytes of those
/// fixed fields (little-endian). ZIP64 EOCD and multi-disk archives aren't handled here;
/// the validator rejects anything the resulting range doesn't actually decode as.
pub struct ZipCarver;

impl Carver for ZipCarver {
    fn kind(&self) -> Kind {
        Kind::Zip
    }

    fn start_signatures(&self) -> &'static [&'static [u8]] {
        ZIP_STARTS
    }

    fn extract(&self, device: &mut dyn Device, start: u64) -> io::Result<Option<u64>> {
        let search_from = start + ZIP_START.len() as u64 - 1;
        let Some(eocd) = find_forward(device, search_from, ZIP_EOCD, self.kind().cap())? else {
            return Ok(None);
        };

        let comment_len_offset = eocd + 20;
        let mut comment_len_bytes = [0u8; 2];
        if !read_at(device, comment_len_offset, &mut comment_len_bytes)? {
            return Ok(None);
        }
        let comment_len = LittleEndian::read_u16(&comment_len_bytes) as u64;

        Ok(Some(eocd + 22 + comment_len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn minimal_zip(comment: &[u8]) -> Vec<u8> {
        let mut data = ZIP_START.to_vec();
        data.extend(std::iter::repeat(0xAA).take(12)); // stand-in local file header body
        data.extend_from_slice(ZIP_EOCD);
        data.extend(std::iter::repeat(0x00).take(18)); // fixed EOCD fields up to comment len
        let len = data.len();
        data[len - 2..].copy_from_slice(&(comment.len() as u16).to_le_bytes());
        data.extend_from_slice(comment);
        data
    }

    #[test]
    fn parses_zip_with_no_comment() {
        let data = minimal_zip(b"");
        let expected_end = data.len() as u64;
        let mut cursor = Cursor::new(data);
        let end = ZipCarver.extract(&mut cursor, 0).unwrap();
        assert_eq!(end, Some(expected_end));
    }

    #[test]
    fn parses_zip_with_comment() {
        let data = minimal_zip(b"hello");
        let expected_end = data.len() as u64;
        let mut cursor = Cursor::new(data);
        let end = ZipCarver.extract(&mut cursor, 0).unwrap();
        assert_eq!(end, Some(expected_end));
    }

    #[test]
    fn missing_eocd_fails() {
        let mut data = minimal_zip(b"");
        data.truncate(data.len() - ZIP_EOCD.len() - 18);
        let mut cursor = Cursor::new(data);
        let end = ZipCarver.extract(&mut cursor, 0).unwrap();
        assert_eq!(end, None);
    }
}
