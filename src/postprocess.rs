//! Post-processing hook invoked on every newly written recovered file.
//!
//! This is deliberately a thin, best-effort external collaborator: it shells out to the
//! `file` command to ask an independent oracle what a recovered `.zip` really is, and
//! moves Office Open XML documents (`.docx`/`.xlsx`/`.pptx`, which are themselves ZIP
//! containers) out of `recovered/zip/` into `recovered/office/`. Any failure here — the
//! `file` binary missing, unexpected output, a permissions error on the rename — is
//! logged and never propagates; it must never fail an otherwise-successful extraction.

use std::path::{Path, PathBuf};
use std::process::Command;

/// Inspects a freshly written recovered file and reclassifies it if an external
/// file-type oracle recognizes it as an Office Open XML document.
pub fn run(path: &Path) {
    if path.extension().and_then(|e| e.to_str()) != Some("zip") {
        return;
    }

    let description = match describe(path) {
        Some(d) => d,
        None => return,
    };

    if let Some(ext) = office_extension(&description) {
        if let Err(e) = reclassify(path, ext) {
            log::warn!("postprocess: failed to reclassify {}: {e}", path.display());
        }
    }
}

fn describe(path: &Path) -> Option<String> {
    let output = match Command::new("file").arg(path).output() {
        Ok(o) => o,
        Err(e) => {
            log::debug!("postprocess: `file` oracle unavailable: {e}");
            return None;
        }
    };
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout);
    text.split_once(": ").map(|(_, desc)| desc.trim().to_string())
}

fn office_extension(description: &str) -> Option<&'static str> {
    let lower = description.to_lowercase();
    if !lower.contains("2007+") {
        return None;
    }
    if lower.contains("word") {
        Some("docx")
    } else if lower.contains("excel") {
        Some("xlsx")
    } else if lower.contains("powerpoint") {
        Some("pptx")
    } else {
        None
    }
}

fn reclassify(path: &Path, ext: &str) -> std::io::Result<()> {
    let stem = path
        .file_stem()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("recovered"));
    let office_dir = path
        .parent()
        .and_then(|p| p.parent())
        .map(|p| p.join("office"))
        .ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "recovered file has no grandparent directory")
        })?;
    std::fs::create_dir_all(&office_dir)?;
    let dest = office_dir.join(stem).with_extension(ext);
    std::fs::rename(path, dest)
}
