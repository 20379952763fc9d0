//! Persists the region list (`index.txt`) and the extraction restart marker
//! (`last_write_index.txt`) so an interrupted scan or extraction resumes cheaply instead
//! of starting over.

use crate::error::CarveError;
use crate::region::FileRegion;
use std::fs;
use std::path::{Path, PathBuf};

/// Textual, line-oriented persistence of the region list: `start,end,kind` per line.
pub struct IndexStore {
    path: PathBuf,
}

impl IndexStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loads the region list, sorted by `start`. An absent file yields an empty list.
    /// A malformed line is fatal: a corrupted index must be repaired by the operator,
    /// not silently dropped.
    pub fn load(&self) -> Result<Vec<FileRegion>, CarveError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut regions = Vec::new();
        for (i, line) in contents.lines().enumerate() {
            if line.is_empty() {
                continue;
            }
            let region = parse_line(line).map_err(|reason| CarveError::IndexParse {
                line: i + 1,
                reason,
            })?;
            regions.push(region);
        }
        regions.sort_by_key(|r| r.start);
        Ok(regions)
    }

    /// Rewrites the whole file atomically: write to a sibling temp file, then rename
    /// over the target, so a crash mid-write never leaves a half-written index behind.
    pub fn save(&self, regions: &[FileRegion]) -> Result<(), CarveError> {
        let mut sorted: Vec<&FileRegion> = regions.iter().collect();
        sorted.sort_by_key(|r| r.start);

        let mut contents = String::new();
        for region in sorted {
            contents.push_str(&format!(
                "{},{},{}\n",
                region.start, region.end, region.kind
            ));
        }

        atomic_write(&self.path, &contents)?;
        Ok(())
    }

    pub fn remove(&self) -> Result<(), CarveError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Single-integer persistence of the restart marker: the highest region-list position
/// whose bytes have already been extracted and written to disk.
pub struct RestartMarker {
    path: PathBuf,
}

impl RestartMarker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<Option<usize>, CarveError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let trimmed = contents.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        trimmed
            .parse::<usize>()
            .map(Some)
            .map_err(|e| CarveError::IndexParse {
                line: 1,
                reason: format!("invalid restart marker {trimmed:?}: {e}"),
            })
    }

    pub fn save(&self, marker: usize) -> Result<(), CarveError> {
        atomic_write(&self.path, &marker.to_string())?;
        Ok(())
    }

    pub fn remove(&self) -> Result<(), CarveError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn atomic_write(path: &Path, contents: &str) -> std::io::Result<()> {
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, contents)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

fn parse_line(line: &str) -> Result<FileRegion, String> {
    let mut fields = line.splitn(3, ',');
    let start = fields.next().ok_or("missing start field")?;
    let end = fields.next().ok_or("missing end field")?;
    let kind = fields.next().ok_or("missing kind field")?;

    let start: u64 = start
        .parse()
        .map_err(|_| format!("invalid start offset {start:?}"))?;
    let end: u64 = end
        .parse()
        .map_err(|_| format!("invalid end offset {end:?}"))?;
    if end <= start {
        return Err(format!("end {end} does not exceed start {start}"));
    }
    let kind = kind
        .parse()
        .map_err(|_| format!("unrecognized kind {kind:?}"))?;

    Ok(FileRegion::new(start, end, kind))
}
