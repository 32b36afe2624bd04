//! Disparity raster and matcher configuration types

use crate::depth_pipeline::common::error::Result;
use crate::depth_pipeline::common::raster::Raster;

/// Stored disparity = true disparity in pixels x 16 (4 fractional bits).
pub const DISPARITY_FRACTION_SCALE: i32 = 16;

/// Fixed-point disparity magnitudes, one per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisparityRaster {
    raster: Raster<i16>,
}

impl DisparityRaster {
    pub fn new(raster: Raster<i16>) -> Self {
        debug_assert_eq!(raster.channels(), 1);
        Self { raster }
    }

    pub fn from_vec(width: usize, height: usize, data: Vec<i16>) -> Result<Self> {
        Ok(Self::new(Raster::from_vec(width, height, 1, data)?))
    }

    pub fn width(&self) -> usize {
        self.raster.width()
    }

    pub fn height(&self) -> usize {
        self.raster.height()
    }

    pub fn get(&self, x: usize, y: usize) -> i16 {
        self.raster.get(x, y)
    }

    pub fn raster(&self) -> &Raster<i16> {
        &self.raster
    }

    pub fn raster_mut(&mut self) -> &mut Raster<i16> {
        &mut self.raster
    }

    pub fn into_raster(self) -> Raster<i16> {
        self.raster
    }

    /// `(min, max)` over all samples, `None` for an empty raster.
    pub fn min_max(&self) -> Option<(i16, i16)> {
        let data = self.raster.data();
        let first = *data.first()?;
        Some(
            data.iter()
                .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
        )
    }

    /// The "no correspondence" value: this raster's own global minimum.
    pub fn sentinel(&self) -> i16 {
        self.min_max().map(|(lo, _)| lo).unwrap_or(0)
    }

    /// Pixels that are not the sentinel.
    pub fn known_count(&self) -> usize {
        let sentinel = self.sentinel();
        self.raster.data().iter().filter(|&&v| v != sentinel).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherKind {
    /// Winner-takes-all over block SAD costs.
    Block,
    /// Block SAD costs smoothed along four scanline paths first.
    SemiGlobal,
}

#[derive(Debug, Clone)]
pub struct MatcherConfig {
    pub kind: MatcherKind,
    /// Odd block edge lengths. More than one size merges the results,
    /// preferring the smallest block wherever it found a match.
    pub block_sizes: Vec<usize>,
    /// Smallest disparity searched, in whole pixels.
    pub min_disparity: i32,
    /// Number of whole-pixel disparities searched.
    pub num_disparities: usize,
    /// Clamp for the x-Sobel prefilter response.
    pub prefilter_cap: u8,
    /// Minimum summed prefilter texture inside a block; 0 disables.
    pub texture_threshold: u32,
    /// Percentage margin by which the best cost must beat any
    /// non-adjacent candidate; 0 disables.
    pub uniqueness_ratio: u32,
    /// Semi-global smoothness penalties per block pixel, for one-pixel and
    /// larger disparity changes.
    pub sgm_penalties: (u32, u32),
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            kind: MatcherKind::Block,
            block_sizes: vec![33],
            min_disparity: 48,
            num_disparities: 32,
            prefilter_cap: 63,
            texture_threshold: 3000,
            uniqueness_ratio: 15,
            sgm_penalties: (8, 32),
        }
    }
}

impl MatcherConfig {
    /// Value written where no match was found; below every encodable match.
    pub fn invalid_disparity(&self) -> i16 {
        ((self.min_disparity - 1) * DISPARITY_FRACTION_SCALE) as i16
    }
}
