use tracing::{debug, instrument};

use crate::depth_pipeline::common::error::{ConversionError, Result};
use crate::depth_pipeline::common::raster::Raster;
use crate::depth_pipeline::matcher::correspondence::CorrespondenceMatcher;
use crate::depth_pipeline::matcher::cost::{
    block_texture, fully_searchable, prefilter_xsobel, select_disparity, CostVolume,
};
use crate::depth_pipeline::matcher::types::{DisparityRaster, MatcherConfig};

/// Local block matching: every pixel takes the disparity with the smallest
/// SAD between its block and the shifted block in the right image.
pub struct BlockMatcher {
    config: MatcherConfig,
    block_size: usize,
}

impl BlockMatcher {
    pub fn new(config: &MatcherConfig, block_size: usize) -> Self {
        Self {
            config: config.clone(),
            block_size: block_size.max(1) | 1,
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }
}

pub(super) fn check_pair(left: &Raster<u8>, right: &Raster<u8>) -> Result<()> {
    let (width, height) = left.dimensions();
    if width == 0 || height == 0 {
        return Err(ConversionError::InvalidDimensions(width, height));
    }
    if right.dimensions() != (width, height) {
        return Err(ConversionError::StreamMismatchError(format!(
            "left view is {}x{} but right view is {}x{}",
            width,
            height,
            right.width(),
            right.height()
        )));
    }
    Ok(())
}

impl CorrespondenceMatcher for BlockMatcher {
    #[instrument(skip_all, fields(block_size = self.block_size))]
    fn compute(&self, left: &Raster<u8>, right: &Raster<u8>) -> Result<DisparityRaster> {
        check_pair(left, right)?;
        let (width, height) = left.dimensions();
        let cfg = &self.config;

        let left_pf = prefilter_xsobel(left, cfg.prefilter_cap);
        let right_pf = prefilter_xsobel(right, cfg.prefilter_cap);
        let volume = CostVolume::block_sad(
            &left_pf,
            &right_pf,
            cfg.min_disparity,
            cfg.num_disparities,
            self.block_size,
            cfg.prefilter_cap,
        );
        let texture = block_texture(&left_pf, self.block_size, cfg.prefilter_cap);

        let invalid = cfg.invalid_disparity();
        let mut out = Raster::filled(width, height, 1, invalid);
        let mut low_texture = 0usize;
        for y in 0..height {
            for x in 0..width {
                if !fully_searchable(x, y, width, height, self.block_size, cfg) {
                    continue;
                }
                if texture.get(x, y) < cfg.texture_threshold {
                    low_texture += 1;
                    continue;
                }
                if let Some(d) = select_disparity(volume.at(x, y), cfg) {
                    out.set(x, y, d);
                }
            }
        }

        let disparity = DisparityRaster::new(out);
        debug!(
            known = disparity.known_count(),
            low_texture,
            "Block matching done"
        );
        Ok(disparity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depth_pipeline::matcher::cost::testing::textured_pair;

    fn test_config() -> MatcherConfig {
        MatcherConfig {
            min_disparity: 0,
            num_disparities: 16,
            texture_threshold: 10,
            ..MatcherConfig::default()
        }
    }

    #[test]
    fn recovers_uniform_shift() {
        let (left, right) = textured_pair(64, 24, 6);
        let cfg = test_config();
        let disparity = BlockMatcher::new(&cfg, 7).compute(&left, &right).unwrap();

        // Searchable region for block 7 and disparities 0..=15.
        for y in 3..21 {
            for x in 18..60 {
                let d = disparity.get(x, y) as i32;
                assert!((d - 6 * 16).abs() <= 8, "({}, {}) = {}", x, y, d);
            }
        }
        assert_eq!(disparity.get(0, 0), cfg.invalid_disparity());
        assert_eq!(disparity.sentinel(), cfg.invalid_disparity());
    }

    #[test]
    fn flat_images_have_no_matches() {
        let flat = Raster::filled(48, 16, 1, 128u8);
        let cfg = test_config();
        let disparity = BlockMatcher::new(&cfg, 5).compute(&flat, &flat).unwrap();
        assert_eq!(disparity.known_count(), 0);
        assert!(disparity.raster().data().iter().all(|&d| d == cfg.invalid_disparity()));
    }

    #[test]
    fn even_block_sizes_are_rounded_up() {
        assert_eq!(BlockMatcher::new(&test_config(), 8).block_size(), 9);
    }

    #[test]
    fn views_must_agree_on_size() {
        let left = Raster::filled(16, 8, 1, 0u8);
        let right = Raster::filled(16, 9, 1, 0u8);
        let err = BlockMatcher::new(&test_config(), 5).compute(&left, &right).unwrap_err();
        assert!(matches!(err, ConversionError::StreamMismatchError(_)));
    }
}
