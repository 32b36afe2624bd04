use tracing::{debug, instrument};

use crate::depth_pipeline::common::error::{ConversionError, Result};
use crate::depth_pipeline::common::raster::Raster;
use crate::depth_pipeline::matcher::correspondence::CorrespondenceMatcher;
use crate::depth_pipeline::matcher::types::DisparityRaster;

/// Runs several matchers and fills the first one's unknown pixels from the
/// others, in order. Small blocks keep detail where they match; larger
/// blocks cover the low-texture areas they leave empty.
pub struct MultiBlockMatcher {
    matchers: Vec<Box<dyn CorrespondenceMatcher>>,
}

impl MultiBlockMatcher {
    pub fn new(matchers: Vec<Box<dyn CorrespondenceMatcher>>) -> Self {
        Self { matchers }
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

impl CorrespondenceMatcher for MultiBlockMatcher {
    #[instrument(skip_all, fields(matchers = self.matchers.len()))]
    fn compute(&self, left: &Raster<u8>, right: &Raster<u8>) -> Result<DisparityRaster> {
        let mut matchers = self.matchers.iter();
        let Some(primary) = matchers.next() else {
            return Err(ConversionError::InvalidDimensions(0, 0));
        };
        let mut merged = primary.compute(left, right)?;
        let unknown = merged.sentinel();

        for matcher in matchers {
            let candidate = matcher.compute(left, right)?;
            if (candidate.width(), candidate.height()) != (merged.width(), merged.height()) {
                return Err(ConversionError::InvalidDimensions(
                    candidate.width(),
                    candidate.height(),
                ));
            }
            let candidate_unknown = candidate.sentinel();
            let mut filled = 0usize;
            for (dst, &src) in merged
                .raster_mut()
                .data_mut()
                .iter_mut()
                .zip(candidate.raster().data())
            {
                if *dst == unknown && src != candidate_unknown {
                    *dst = src;
                    filled += 1;
                }
            }
            debug!(filled, "Merged fallback disparities");
        }
        Ok(merged)
    }
}
