//! Streaming file carver for raw disk images and block devices.
//!
//! Recovers JPEG, PNG, ZIP and PDF files from an opaque byte stream by locating their
//! signature boundaries and validating the extracted ranges, without relying on
//! filesystem metadata. See the module docs on [`scanner`] and [`extractor`] for the two
//! halves of the pipeline: a sequential sweep that builds a resumable index of
//! candidate regions, and an extraction pass that validates and writes them out.

pub mod carver;
pub mod error;
pub mod extractor;
pub mod index;
pub mod postprocess;
pub mod region;
pub mod scanner;
pub mod signature;
pub mod validate;

pub use carver::{Carver, JpegCarver, PdfCarver, PngCarver, ZipCarver};
pub use error::CarveError;
pub use extractor::Extractor;
pub use index::{IndexStore, RestartMarker};
pub use region::FileRegion;
pub use scanner::Scanner;
pub use signature::Kind;
