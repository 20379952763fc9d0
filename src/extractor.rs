//! For each indexed region past the restart cursor, re-reads the range, revalidates it,
//! and writes the output file. Idempotent: re-running with the same index and marker is
//! a no-op; re-running with a reset marker re-validates and overwrites every output.

use crate::carver::Device;
use crate::error::CarveError;
use crate::index::RestartMarker;
use crate::postprocess;
use crate::region::FileRegion;
use crate::validate;
use std::io::SeekFrom;
use std::path::PathBuf;

pub struct Extractor {
    restart_marker: RestartMarker,
    marker: Option<usize>,
    output_dir: PathBuf,
}

impl Extractor {
    pub fn new(restart_marker: RestartMarker, output_dir: PathBuf) -> Result<Self, CarveError> {
        let marker = restart_marker.load()?;
        Ok(Self {
            restart_marker,
            marker,
            output_dir,
        })
    }

    pub fn marker(&self) -> Option<usize> {
        self.marker
    }

    /// Extracts every region whose list position is strictly greater than the restart
    /// marker, validating each before writing it out. Returns the number of files
    /// actually written (validation failures and already-extracted regions don't count).
    pub fn run(
        &mut self,
        device: &mut dyn Device,
        regions: &[FileRegion],
    ) -> Result<usize, CarveError> {
        let start_idx = self.marker.map_or(0, |m| m + 1);
        if start_idx >= regions.len() {
            return Ok(0);
        }

        let mut written = 0;
        for (idx, region) in regions.iter().enumerate().skip(start_idx) {
            device.seek(SeekFrom::Start(region.start))?;
            let mut buf = vec![0u8; region.len() as usize];
            device.read_exact(&mut buf)?;

            match validate::validate(region.kind, &buf)? {
                true => {
                    let path = self.write_output(idx, region, &buf)?;
                    postprocess::run(&path);
                    written += 1;
                }
                false => {
                    log::warn!(
                        "region {idx} ({}, {}..{}) failed validation; no output written",
                        region.kind,
                        region.start,
                        region.end
                    );
                }
            }

            self.marker = Some(idx);
        }

        if let Some(marker) = self.marker {
            self.restart_marker.save(marker)?;
        }
        Ok(written)
    }

    fn write_output(
        &self,
        idx: usize,
        region: &FileRegion,
        data: &[u8],
    ) -> Result<PathBuf, CarveError> {
        let dir = self.output_dir.join(region.kind.extension());
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{idx}.{}", region.kind.extension()));
        std::fs::write(&path, data)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::Kind;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn minimal_png() -> Vec<u8> {
        let mut data = crate::signature::PNG_START.to_vec();
        data.extend_from_slice(crate::signature::PNG_END);
        data
    }

    #[test]
    fn writes_validated_region_and_advances_marker() {
        let dir = tempdir().unwrap();
        let marker_path = dir.path().join("last_write_index.txt");
        let output_dir = dir.path().join("recovered");

        let png = minimal_png();
        let region = FileRegion::new(0, png.len() as u64, Kind::Png);
        let mut device = Cursor::new(png.clone());

        let mut extractor =
            Extractor::new(RestartMarker::new(&marker_path), output_dir.clone()).unwrap();
        let written = extractor.run(&mut device, &[region]).unwrap();

        assert_eq!(written, 1);
        assert_eq!(extractor.marker(), Some(0));
        let out_path = output_dir.join("png").join("0.png");
        assert_eq!(std::fs::read(out_path).unwrap(), png);
    }

    #[test]
    fn reruns_past_marker_are_noop() {
        let dir = tempdir().unwrap();
        let marker_path = dir.path().join("last_write_index.txt");
        let output_dir = dir.path().join("recovered");

        let png = minimal_png();
        let region = FileRegion::new(0, png.len() as u64, Kind::Png);
        let mut device = Cursor::new(png);

        let mut extractor =
            Extractor::new(RestartMarker::new(&marker_path), output_dir.clone()).unwrap();
        extractor.run(&mut device, &[region]).unwrap();

        let mut extractor2 = Extractor::new(RestartMarker::new(&marker_path), output_dir).unwrap();
        let written = extractor2.run(&mut device, &[region]).unwrap();
        assert_eq!(written, 0);
    }

    #[test]
    fn invalid_region_writes_nothing() {
        let dir = tempdir().unwrap();
        let marker_path = dir.path().join("last_write_index.txt");
        let output_dir = dir.path().join("recovered");

        let garbage = vec![0u8; 100];
        let region = FileRegion::new(0, garbage.len() as u64, Kind::Png);
        let mut device = Cursor::new(garbage);

        let mut extractor =
            Extractor::new(RestartMarker::new(&marker_path), output_dir.clone()).unwrap();
        let written = extractor.run(&mut device, &[region]).unwrap();
        assert_eq!(written, 0);
        assert!(!output_dir.join("png").join("0.png").exists());
    }
}
