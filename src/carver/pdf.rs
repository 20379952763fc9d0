use super::{read_at, Carver, Device};
use crate::signature::{Kind, PDF_END, PDF_START, PDF_STARTS};
use std::io;

/// PDFs begin with `%PDF-` and terminate with `%%EOF`. Incremental updates put multiple
/// `%%EOF` markers in one file; those aren't nesting, just trailer revisions. A PDF may
/// also genuinely contain an embedded PDF. This carver tracks a nesting depth: each
/// unmatched `%PDF-` before the matching `%%EOF` increments it, each `%%EOF` decrements
/// it, and the region ends where depth returns to zero.
pub struct PdfCarver;

impl Carver for PdfCarver {
    fn kind(&self) -> Kind {
        Kind::Pdf
    }

    fn start_signatures(&self) -> &'static [&'static [u8]] {
        PDF_STARTS
    }

    fn extract(&self, device: &mut dyn Device, start: u64) -> io::Result<Option<u64>> {
        let cap = self.kind().cap();
        let window_len = PDF_END.len() * 2;
        let mut pos = start + PDF_START.len() as u64 - 1;
        let mut window = vec![0u8; window_len];
        if !read_at(device, pos, &mut window)? {
            return Ok(None);
        }

        let mut depth: i64 = 1;

        loop {
            if pos - start > cap {
                return Ok(None);
            }

            let start_idx = find_in(&window, PDF_START);
            let end_idx = find_in(&window, PDF_END);

            match (start_idx, end_idx) {
                (Some(s), Some(e)) => {
                    if depth == 1 && e < s {
                        depth -= 1;
                    }
                    // otherwise: an inner file opens before the outer closes, or both
                    // occur beyond the first pending close — depth nets to no change
                    // within this window; the matching decrement happens when the
                    // corresponding end is the next thing the window sees alone.
                }
                (Some(_), None) => depth += 1,
                (None, Some(_)) => depth -= 1,
                (None, None) => {}
            }

            if depth <= 0 {
                // depth only ever decreases alongside a matched end_idx (see above), so
                // this is always Some; depth underflow closes the outer file here.
                let e = end_idx.expect("depth decrement always pairs with a found end marker");
                return Ok(Some(pos + e as u64 + PDF_END.len() as u64));
            }

            window.drain(0..PDF_END.len());
            let mut fresh = vec![0u8; PDF_END.len()];
            if !read_at(device, pos + window_len as u64, &mut fresh)? {
                return Ok(None);
            }
            window.extend_from_slice(&fresh);
            pos += PDF_END.len() as u64;
        }
    }
}

fn find_in(window: &[u8], needle: &[u8]) -> Option<usize> {
    window.windows(needle.len()).position(|w| w == needle)
}
