use crate::depth_pipeline::common::error::Result;
use crate::depth_pipeline::common::raster::Raster;
use crate::depth_pipeline::matcher::types::DisparityRaster;

/// Dense correspondence search over a stereo pair. The only contract on the
/// output is that "no match" pixels hold the raster's global minimum.
pub trait CorrespondenceMatcher {
    fn compute(&self, left: &Raster<u8>, right: &Raster<u8>) -> Result<DisparityRaster>;
}

impl<M: CorrespondenceMatcher + ?Sized> CorrespondenceMatcher for Box<M> {
    fn compute(&self, left: &Raster<u8>, right: &Raster<u8>) -> Result<DisparityRaster> {
        (**self).compute(left, right)
    }
}
