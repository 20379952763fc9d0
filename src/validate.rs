//! Validators confirm that an extracted byte range actually decodes as the format the
//! scanner believed it to be. Validation is advisory at scan time (the scanner accepts
//! parser output into the index regardless, so a later, better validator can be re-run
//! without rescanning the device) and authoritative at extraction time (only validated
//! regions produce output files).

use crate::error::CarveError;
use crate::signature::Kind;
use image::GenericImageView;
use std::io::Cursor;
use zip::ZipArchive;

/// Rejects square icons at or under this side length; overwhelmingly false positives
/// in this workload rather than genuinely recovered photos or graphics.
const ICON_MAX_SIDE: u32 = 64;

/// Validates `data` against the expected `kind`, returning whether it decodes.
///
/// Returns `Err` only when a validator's backing decoder itself could not be used (a
/// `MissingValidatorDependency` condition); a candidate simply failing to decode is a
/// `Ok(false)`, not an error.
pub fn validate(kind: Kind, data: &[u8]) -> Result<bool, CarveError> {
    match kind {
        Kind::Jpg | Kind::Png => Ok(validate_image(data)),
        Kind::Zip => validate_zip(data),
        Kind::Pdf => validate_pdf(data),
    }
}

fn validate_image(data: &[u8]) -> bool {
    let img = match image::load_from_memory(data) {
        Ok(img) => img,
        Err(_) => return false,
    };
    let (width, height) = img.dimensions();
    if width == height && width <= ICON_MAX_SIDE {
        return false;
    }
    true
}

/// An `Io` error out of the `zip` crate means the decoder itself couldn't read from the
/// backing cursor — a dependency-level failure, not a statement about the candidate
/// bytes. Anything else (invalid/unsupported archive structure) is just a rejection.
fn validate_zip(data: &[u8]) -> Result<bool, CarveError> {
    let cursor = Cursor::new(data);
    let mut archive = match ZipArchive::new(cursor) {
        Ok(archive) => archive,
        Err(zip::result::ZipError::Io(e)) => {
            return Err(CarveError::MissingValidator(format!(
                "zip decoder unavailable: {e}"
            )))
        }
        Err(_) => return Ok(false),
    };
    for i in 0..archive.len() {
        let mut entry = match archive.by_index(i) {
            Ok(entry) => entry,
            Err(zip::result::ZipError::Io(e)) => {
                return Err(CarveError::MissingValidator(format!(
                    "zip decoder unavailable: {e}"
                )))
            }
            Err(_) => return Ok(false),
        };
        if std::io::copy(&mut entry, &mut std::io::sink()).is_err() {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Same split as `validate_zip`: an `Io` error means `lopdf` couldn't even read the
/// candidate bytes, as opposed to reading them and finding they aren't a PDF.
fn validate_pdf(data: &[u8]) -> Result<bool, CarveError> {
    match lopdf::Document::load_mem(data) {
        Ok(_) => Ok(true),
        Err(lopdf::Error::IO(e)) => Err(CarveError::MissingValidator(format!(
            "pdf decoder unavailable: {e}"
        ))),
        Err(_) => Ok(false),
    }
}
