//! Common utilities module
//!
//! Error taxonomy, raster containers and step timings shared across the
//! depth pipeline.

pub mod error;
pub mod raster;
pub mod timing;

pub use error::{ConversionError, Result};
pub use raster::{Raster, RasterView};
pub use timing::{PipelineTimings, StepTiming, Timer};
