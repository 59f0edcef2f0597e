//! Flag asset pipeline: download each country's vector flag, then rasterise
//! it into a JPEG beside it.
//!
//! The two stages hand files over through advisory locks. A vector flag is
//! written under an exclusive lock, and conversion waits with bounded
//! backoff until that lock is released. Records are processed one at a time
//! and a failure is reported per record without stopping the batch. Flags
//! known not to render are recorded with an `.unconvertible` marker so later
//! runs skip them quietly.

mod error;
mod pipeline;
mod raster;
mod retry;
mod source;


pub use error::{Cancelled, ConversionError, FlagFetchError, RasterError};
pub use pipeline::{
    ConvertOutcome, ConvertReport, DEFAULT_KNOWN_BAD, FetchOutcome, FetchReport, FileLockProbe,
    FlagPipeline, LockProbe, PipelineReport,
};
pub use raster::{Rasteriser, SvgRasteriser};
pub use retry::LockRetryPolicy;
pub use source::{FlagSource, HttpFlagSource};
