//! Error types produced by the flag pipeline.

use std::{io, time::Duration};

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::http::TransportError;

/// Failure downloading one record's vector flag. Never aborts the batch.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FlagFetchError {
    /// The record key cannot name a file.
    #[error("country key {alpha3_code:?} is not a three-letter code")]
    InvalidKey { alpha3_code: String },
    /// The record carries no flag URL.
    #[error("country {alpha3_code} has no flag URL")]
    MissingUrl { alpha3_code: String },
    /// The download failed.
    #[error("failed to download flag for {alpha3_code}: {source}")]
    Download {
        alpha3_code: String,
        source: TransportError,
    },
    /// Local file handling failed.
    #[error("failed to write flag to {path}: {source}")]
    Io { path: Utf8PathBuf, source: io::Error },
}

/// Failure raised by a [`crate::flags::Rasteriser`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RasterError {
    /// The document is not a usable SVG.
    #[error("invalid SVG document: {0}")]
    Parse(#[from] resvg::usvg::Error),
    /// The document declares a size that cannot be rendered.
    #[error("SVG canvas {width}x{height} cannot be rendered")]
    EmptyCanvas { width: u32, height: u32 },
    /// JPEG encoding failed.
    #[error("failed to encode JPEG: {0}")]
    Encode(#[from] image::ImageError),
}

impl RasterError {
    /// Whether the input document itself is at fault.
    #[must_use]
    pub const fn is_format(&self) -> bool {
        matches!(self, Self::Parse(_) | Self::EmptyCanvas { .. })
    }
}

/// Failure converting one record's flag.
///
/// Variants fall into three classes: permanent skips for known-bad inputs,
/// transient failures worth retrying on a later run, and everything else,
/// which must be surfaced.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConversionError {
    /// The record is known to carry an unrenderable flag.
    #[error("flag for {alpha3_code} is known to be unconvertible: {source}")]
    KnownBad {
        alpha3_code: String,
        source: RasterError,
    },
    /// The flag document is malformed.
    #[error("flag for {alpha3_code} could not be read: {source}")]
    Format {
        alpha3_code: String,
        source: RasterError,
    },
    /// Rasterisation failed for a reason unrelated to the input.
    #[error("failed to rasterise flag for {alpha3_code}: {source}")]
    Raster {
        alpha3_code: String,
        source: RasterError,
    },
    /// The vector flag stayed locked past the deadline.
    #[error("{path} was still locked after {waited:?}")]
    LockTimeout { path: Utf8PathBuf, waited: Duration },
    /// Local file handling failed.
    #[error("failed to access {path}: {source}")]
    Io { path: Utf8PathBuf, source: io::Error },
    /// The record key cannot name a file.
    #[error("country key {alpha3_code:?} is not a three-letter code")]
    InvalidKey { alpha3_code: String },
}

impl ConversionError {
    /// Classify a rasteriser failure for `alpha3_code`.
    #[must_use]
    pub fn from_raster(alpha3_code: &str, known_bad: bool, source: RasterError) -> Self {
        let alpha3_code = alpha3_code.to_owned();
        match (source.is_format(), known_bad) {
            (true, true) => Self::KnownBad {
                alpha3_code,
                source,
            },
            (true, false) => Self::Format {
                alpha3_code,
                source,
            },
            (false, _) => Self::Raster {
                alpha3_code,
                source,
            },
        }
    }

    /// Later runs must not attempt this conversion again.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::KnownBad { .. })
    }

    /// A later run may succeed without any change to the input.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::LockTimeout { .. } | Self::Io { .. })
    }
}

/// The pipeline stopped because its cancellation token fired.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("flag pipeline cancelled after {completed} records")]
pub struct Cancelled {
    /// Records finished before cancellation was observed.
    pub completed: usize,
}
