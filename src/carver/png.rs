use super::{find_forward, Carver, Device};
use crate::signature::{Kind, PNG_END, PNG_START, PNG_STARTS};
use std::io;

/// PNG's end is unambiguous: the 12-byte IEND chunk (type + CRC). No structural parsing
/// of intermediate chunks is required for carving.
pub struct PngCarver;

impl Carver for PngCarver {
    fn kind(&self) -> Kind {
        Kind::Png
    }

    fn start_signatures(&self) -> &'static [&'static [u8]] {
        PNG_STARTS
    }

    fn extract(&self, device: &mut dyn Device, start: u64) -> io::Result<Option<u64>> {
        let search_from = start + PNG_START.len() as u64 - 1;
        let found = find_forward(device, search_from, PNG_END, self.kind().cap())?;
        Ok(found.map(|m| m + PNG_END.len() as u64))
    }
}
