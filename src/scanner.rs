//! Walks the device sequentially with a small rolling buffer, finds start signatures,
//! invokes the per-format parsers in priority order, and advances past accepted regions.
//!
//! Single-threaded by design (see the concurrency notes in the crate's top-level spec):
//! the algorithm's correctness depends on a monotonic cursor, and the bottleneck is
//! sequential device I/O anyway, so there is nothing for a second thread to overlap with.

use crate::carver::{Carver, Device, JpegCarver, PdfCarver, PngCarver, ZipCarver};
use crate::error::CarveError;
use crate::extractor::Extractor;
use crate::index::IndexStore;
use crate::region::FileRegion;
use crate::signature::{CARRY_FORWARD_BYTES, JPEG_STARTS, PDF_START, SCAN_CHUNK_SIZE, ZIP_START};
use std::io::{Read, Seek, SeekFrom};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const GB: u64 = 1_000_000_000;
const SAVE_EVERY_N_REGIONS: usize = 100;

pub struct Scanner<D: Read + Seek> {
    device: D,
    zip: ZipCarver,
    pdf: PdfCarver,
    jpeg: JpegCarver,
    png: PngCarver,
    regions: Vec<FileRegion>,
    index_store: IndexStore,
    last_index_write: usize,
    boundary_size: u64,
    next_boundary: u64,
    extractor: Extractor,
    cancel: Arc<AtomicBool>,
}

impl<D: Read + Seek> Scanner<D> {
    pub fn new(
        device: D,
        index_store: IndexStore,
        extractor: Extractor,
        regions: Vec<FileRegion>,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        let last_index_write = regions.len();
        let boundary_size = GB;
        let next_boundary = next_boundary_after(regions.last(), boundary_size);
        Self {
            device,
            zip: ZipCarver,
            pdf: PdfCarver,
            jpeg: JpegCarver,
            png: PngCarver,
            regions,
            index_store,
            last_index_write,
            boundary_size,
            next_boundary,
            extractor,
            cancel,
        }
    }

    /// Overrides the periodic-flush boundary (1 GB in production). Exists so tests can
    /// force the flush path without synthesizing gigabyte-scale devices.
    #[cfg(test)]
    pub(crate) fn set_boundary_size(&mut self, boundary_size: u64) {
        self.boundary_size = boundary_size;
        self.next_boundary = next_boundary_after(self.regions.last(), boundary_size);
    }

    pub fn regions(&self) -> &[FileRegion] {
        &self.regions
    }

    pub fn extractor(&mut self) -> &mut Extractor {
        &mut self.extractor
    }

    /// Reclaims ownership of the device, extractor, and accepted regions after the
    /// sweep has finished, so the caller can drive a final extraction pass over the
    /// same open handle instead of reopening the device.
    pub fn into_parts(self) -> (D, Extractor, Vec<FileRegion>) {
        (self.device, self.extractor, self.regions)
    }

    /// Runs the sweep to completion (device exhausted) or until cancelled, persisting
    /// the region list and restart marker before returning either way.
    ///
    /// The device cursor is never trusted between iterations: every carver, and the
    /// extractor invoked from `maybe_flush`, is free to leave it anywhere (mid-probe,
    /// near a format's size cap, wherever a validated region's bytes were). `read_pos`
    /// is this loop's own record of where the next sequential byte lives, and every
    /// `refill` seeks there explicitly rather than reading from wherever the device
    /// cursor happens to be.
    pub fn run(&mut self) -> Result<(), CarveError> {
        let mut buf: Vec<u8> = Vec::new();
        let mut have_buffer = false;
        // A non-empty resumed index means earlier bytes are already accounted for;
        // seek past them before reading the first chunk instead of rescanning from 0.
        let mut just_accepted: Option<u64> = self.regions.last().map(|r| r.end);
        let mut read_pos: u64 = just_accepted.unwrap_or(0);

        loop {
            if self.cancel.load(Ordering::Relaxed) {
                log::info!("scan cancelled, saving state");
                break;
            }

            let (next_buf, offset) =
                self.refill(buf, have_buffer, just_accepted.take(), &mut read_pos)?;
            buf = next_buf;
            if buf.is_empty() {
                log::info!("reached end of device");
                break;
            }
            have_buffer = true;

            self.maybe_flush(offset, read_pos)?;

            match self.scan_buffer(&buf, offset)? {
                ScanOutcome::Accepted(end) => {
                    just_accepted = Some(end);
                    read_pos = end;
                }
                ScanOutcome::JpegDesync(skip_to) => {
                    have_buffer = false;
                    buf = Vec::new();
                    read_pos = skip_to;
                }
                ScanOutcome::NoMatch => {}
            }
        }

        self.index_store.save(&self.regions)?;
        self.last_index_write = self.regions.len();
        Ok(())
    }

    /// Reads the next buffer and returns it along with the device offset of its first
    /// byte. Always re-seeks to `read_pos` (or `just_accepted`, which becomes the new
    /// `read_pos`) before reading, regardless of where the device cursor currently sits.
    fn refill(
        &mut self,
        prev: Vec<u8>,
        have_buffer: bool,
        just_accepted: Option<u64>,
        read_pos: &mut u64,
    ) -> Result<(Vec<u8>, u64), CarveError> {
        if let Some(end) = just_accepted {
            self.device.seek(SeekFrom::Start(end))?;
            let chunk = self.read_chunk(SCAN_CHUNK_SIZE)?;
            *read_pos = end + chunk.len() as u64;
            Ok((chunk, end))
        } else if have_buffer {
            let carry_from = prev.len().saturating_sub(CARRY_FORWARD_BYTES);
            let carried = prev[carry_from..].to_vec();
            let buf_start = *read_pos - carried.len() as u64;
            self.device.seek(SeekFrom::Start(*read_pos))?;
            let fresh = self.read_chunk(SCAN_CHUNK_SIZE)?;
            if fresh.is_empty() {
                // Nothing new since the last read: the carried tail was already part
                // of that buffer, so re-presenting it alone would spin forever at EOF.
                return Ok((Vec::new(), buf_start));
            }
            *read_pos += fresh.len() as u64;
            let mut combined = carried;
            combined.extend(fresh);
            Ok((combined, buf_start))
        } else {
            let buf_start = *read_pos;
            self.device.seek(SeekFrom::Start(*read_pos))?;
            let chunk = self.read_chunk(SCAN_CHUNK_SIZE)?;
            *read_pos += chunk.len() as u64;
            Ok((chunk, buf_start))
        }
    }

    fn read_chunk(&mut self, size: usize) -> Result<Vec<u8>, CarveError> {
        let mut buf = vec![0u8; size];
        let mut total = 0;
        while total < size {
            match self.device.read(&mut buf[total..])? {
                0 => break,
                n => total += n,
            }
        }
        buf.truncate(total);
        Ok(buf)
    }

    fn scan_buffer(&mut self, buf: &[u8], offset: u64) -> Result<ScanOutcome, CarveError> {
        if let Some(idx) = find(buf, ZIP_START) {
            let start = offset + idx as u64;
            if let Some(end) = self.zip.extract(&mut self.device as &mut dyn Device, start)? {
                self.accept(start, end, crate::signature::Kind::Zip)?;
                return Ok(ScanOutcome::Accepted(end));
            }
            log::debug!("spurious ZIP signature at {start}");
        }

        if let Some(idx) = find(buf, PDF_START) {
            let start = offset + idx as u64;
            if let Some(end) = self.pdf.extract(&mut self.device as &mut dyn Device, start)? {
                self.accept(start, end, crate::signature::Kind::Pdf)?;
                return Ok(ScanOutcome::Accepted(end));
            }
            log::debug!("spurious PDF signature at {start}");
        }

        for variant in JPEG_STARTS {
            if let Some(idx) = find(buf, variant) {
                let start = offset + idx as u64;
                match self.jpeg.extract(&mut self.device as &mut dyn Device, start)? {
                    Some(end) => {
                        self.accept(start, end, crate::signature::Kind::Jpg)?;
                        return Ok(ScanOutcome::Accepted(end));
                    }
                    None => {
                        log::debug!("spurious JPEG signature at {start}, skipping 4 bytes");
                        return Ok(ScanOutcome::JpegDesync(start + 4));
                    }
                }
            }
        }

        if let Some(idx) = find(buf, crate::signature::PNG_START) {
            let start = offset + idx as u64;
            if let Some(end) = self.png.extract(&mut self.device as &mut dyn Device, start)? {
                self.accept(start, end, crate::signature::Kind::Png)?;
                return Ok(ScanOutcome::Accepted(end));
            }
            log::debug!("PNG at {start} exceeded size cap before IEND");
        }

        Ok(ScanOutcome::NoMatch)
    }

    fn accept(&mut self, start: u64, end: u64, kind: crate::signature::Kind) -> Result<(), CarveError> {
        log::info!("{kind} found: {start}..{end} ({} bytes)", end - start);
        self.regions.push(FileRegion::new(start, end, kind));
        if self.regions.len() - self.last_index_write > SAVE_EVERY_N_REGIONS {
            self.index_store.save(&self.regions)?;
            self.last_index_write = self.regions.len();
        }
        Ok(())
    }

    /// `offset` gates whether this is a boundary crossing; `resume_at` is where the
    /// scan loop's own bookkeeping says the next sequential byte is, i.e. `offset +
    /// buf.len()`. The extractor seeks all over the device re-reading indexed regions,
    /// so the scanner's cursor is explicitly restored to `resume_at` before returning,
    /// per the device-sharing contract: scanner yields the device, extractor uses it,
    /// scanner reacquires it by re-seeking.
    fn maybe_flush(&mut self, offset: u64, resume_at: u64) -> Result<(), CarveError> {
        if offset < self.next_boundary {
            return Ok(());
        }
        log::info!(
            "offset {offset}, {} regions found so far",
            self.regions.len()
        );
        self.index_store.save(&self.regions)?;
        self.last_index_write = self.regions.len();
        self.extractor
            .run(&mut self.device as &mut dyn Device, &self.regions)?;
        self.device.seek(SeekFrom::Start(resume_at))?;
        self.next_boundary += self.boundary_size;
        Ok(())
    }
}

fn next_boundary_after(last: Option<&FileRegion>, boundary_size: u64) -> u64 {
    last.map_or(boundary_size, |r| ((r.end / boundary_size) + 1) * boundary_size)
}

enum ScanOutcome {
    Accepted(u64),
    JpegDesync(u64),
    NoMatch,
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::RestartMarker;
    use crate::signature::Kind;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn new_scanner(data: Vec<u8>, dir: &std::path::Path) -> Scanner<Cursor<Vec<u8>>> {
        let index_store = IndexStore::new(dir.join("index.txt"));
        let marker = RestartMarker::new(dir.join("last_write_index.txt"));
        let extractor = Extractor::new(marker, dir.join("recovered")).unwrap();
        Scanner::new(
            Cursor::new(data),
            index_store,
            extractor,
            Vec::new(),
            Arc::new(AtomicBool::new(false)),
        )
    }

    fn minimal_jpeg() -> Vec<u8> {
        let mut data = vec![0xFF, 0xD8, 0xFF, 0xDB, 0x00, 0x04, 0x00, 0x00];
        data.extend_from_slice(&[0xFF, 0xD9]);
        data
    }

    fn minimal_png() -> Vec<u8> {
        let mut data = crate::signature::PNG_START.to_vec();
        data.extend_from_slice(crate::signature::PNG_END);
        data
    }

    #[test]
    fn finds_single_jpeg_surrounded_by_garbage() {
        let dir = tempdir().unwrap();
        let jpeg = minimal_jpeg();
        let mut data = vec![0u8; 1000];
        let jpeg_start = data.len() as u64;
        data.extend_from_slice(&jpeg);
        data.extend(vec![0u8; 1000]);

        let mut scanner = new_scanner(data, dir.path());
        scanner.run().unwrap();

        assert_eq!(scanner.regions().len(), 1);
        let region = scanner.regions()[0];
        assert_eq!(region.start, jpeg_start);
        assert_eq!(region.kind, Kind::Jpg);
        assert_eq!(region.end, jpeg_start + jpeg.len() as u64);
    }

    #[test]
    fn finds_two_pngs_with_garbage_between() {
        let dir = tempdir().unwrap();
        let png = minimal_png();
        let mut data = png.clone();
        data.extend(vec![0u8; 4096]);
        let second_start = data.len() as u64;
        data.extend_from_slice(&png);

        let mut scanner = new_scanner(data, dir.path());
        scanner.run().unwrap();

        assert_eq!(scanner.regions().len(), 2);
        assert_eq!(scanner.regions()[0].start, 0);
        assert_eq!(scanner.regions()[1].start, second_start);
    }

    #[test]
    fn truncated_jpeg_emits_no_region() {
        let dir = tempdir().unwrap();
        let mut jpeg = minimal_jpeg();
        jpeg.truncate(jpeg.len() - 2); // drop EOI
        let mut data = vec![0u8; 10];
        data.extend_from_slice(&jpeg);

        let mut scanner = new_scanner(data, dir.path());
        scanner.run().unwrap();
        assert!(scanner.regions().is_empty());
    }

    #[test]
    fn resumes_from_last_indexed_region_without_rescanning() {
        let dir = tempdir().unwrap();
        let png = minimal_png();
        let mut data = png.clone();
        data.extend(vec![0u8; 4096]);
        let second_start = data.len() as u64;
        data.extend_from_slice(&png);

        // Pretend a prior run already indexed the first PNG and crashed before seeing
        // the second. Resuming must not re-emit the first region from scratch.
        let resumed = vec![FileRegion::new(0, png.len() as u64, Kind::Png)];
        let index_store = IndexStore::new(dir.path().join("index.txt"));
        let marker = RestartMarker::new(dir.path().join("last_write_index.txt"));
        let extractor = Extractor::new(marker, dir.path().join("recovered")).unwrap();
        let mut scanner = Scanner::new(
            Cursor::new(data),
            index_store,
            extractor,
            resumed,
            Arc::new(AtomicBool::new(false)),
        );
        scanner.run().unwrap();

        assert_eq!(scanner.regions().len(), 2);
        assert_eq!(scanner.regions()[0].start, 0);
        assert_eq!(scanner.regions()[1].start, second_start);
    }

    #[test]
    fn flush_at_small_boundary_does_not_corrupt_subsequent_scan() {
        let dir = tempdir().unwrap();
        let jpeg = minimal_jpeg();
        let png = minimal_png();

        let mut data = vec![0u8; 10];
        let jpeg_start = data.len() as u64;
        data.extend_from_slice(&jpeg);
        data.extend(vec![0u8; 2960]);
        let png_start = data.len() as u64;
        data.extend_from_slice(&png);
        data.extend(vec![0u8; 50]);

        let mut scanner = new_scanner(data, dir.path());
        // Force a flush well before the 1 GB default so a small device can exercise
        // the extractor-shares-the-device path without synthesizing gigabytes of data.
        scanner.set_boundary_size(1500);
        scanner.run().unwrap();

        let regions = scanner.regions();
        assert_eq!(
            regions.len(),
            2,
            "a boundary flush must not desynchronize the scan, got {regions:?}"
        );
        assert_eq!(regions[0].start, jpeg_start);
        assert_eq!(regions[0].kind, Kind::Jpg);
        assert_eq!(regions[1].start, png_start);
        assert_eq!(regions[1].kind, Kind::Png);

        // The boundary crossing should have triggered an extractor flush for the JPEG
        // already found at that point, before the scan even finished.
        let jpg_path = dir.path().join("recovered").join("jpg").join("0.jpg");
        assert!(
            jpg_path.exists(),
            "boundary flush should have extracted the already-found jpeg"
        );
    }

    #[test]
    fn regions_are_returned_in_nondecreasing_start_order() {
        let dir = tempdir().unwrap();
        let png = minimal_png();
        let jpeg = minimal_jpeg();
        let mut data = jpeg.clone();
        data.extend(vec![0u8; 512]);
        data.extend_from_slice(&png);

        let mut scanner = new_scanner(data, dir.path());
        scanner.run().unwrap();

        let regions = scanner.regions();
        for pair in regions.windows(2) {
            assert!(pair[0].start <= pair[1].start);
        }
    }
}
