use tracing::{debug, instrument};

use crate::depth_pipeline::common::error::Result;
use crate::depth_pipeline::common::raster::Raster;
use crate::depth_pipeline::matcher::block_matcher::check_pair;
use crate::depth_pipeline::matcher::correspondence::CorrespondenceMatcher;
use crate::depth_pipeline::matcher::cost::{
    fully_searchable, prefilter_xsobel, select_disparity, CostVolume,
};
use crate::depth_pipeline::matcher::types::{DisparityRaster, MatcherConfig};

/// Semi-global matching over small SAD blocks, aggregated along the four
/// horizontal and vertical scanline directions.
pub struct SemiGlobalMatcher {
    config: MatcherConfig,
    block_size: usize,
}

impl SemiGlobalMatcher {
    pub fn new(config: &MatcherConfig, block_size: usize) -> Self {
        Self {
            config: config.clone(),
            block_size: block_size.max(1) | 1,
        }
    }

    fn penalties(&self) -> (u32, u32) {
        let area = (self.block_size * self.block_size) as u32;
        let (p1, p2) = self.config.sgm_penalties;
        let p1 = p1.saturating_mul(area);
        (p1, p2.saturating_mul(area).max(p1))
    }
}

/// Scratch state for one scanline pass.
struct PathState {
    prev: Vec<u32>,
    cur: Vec<u32>,
}

impl PathState {
    fn new(n: usize) -> Self {
        Self {
            prev: vec![0; n],
            cur: vec![0; n],
        }
    }

    /// Runs the path recurrence along `line` and adds it into `total`.
    fn aggregate(
        &mut self,
        volume: &CostVolume,
        line: impl Iterator<Item = usize>,
        (p1, p2): (u32, u32),
        total: &mut [u32],
    ) {
        let n = volume.num_disparities;
        let mut prev_min: Option<u32> = None;
        for pixel in line {
            let costs = &volume.costs[pixel * n..(pixel + 1) * n];
            match prev_min {
                None => self.cur.copy_from_slice(costs),
                Some(prev_min) => {
                    for d in 0..n {
                        let mut best = self.prev[d];
                        if d > 0 {
                            best = best.min(self.prev[d - 1].saturating_add(p1));
                        }
                        if d + 1 < n {
                            best = best.min(self.prev[d + 1].saturating_add(p1));
                        }
                        best = best.min(prev_min.saturating_add(p2));
                        self.cur[d] = costs[d] + (best - prev_min);
                    }
                }
            }
            prev_min = self.cur.iter().copied().min();
            for (acc, &c) in total[pixel * n..(pixel + 1) * n].iter_mut().zip(&self.cur) {
                *acc = acc.saturating_add(c);
            }
            std::mem::swap(&mut self.prev, &mut self.cur);
        }
    }
}

impl CorrespondenceMatcher for SemiGlobalMatcher {
    #[instrument(skip_all, fields(block_size = self.block_size))]
    fn compute(&self, left: &Raster<u8>, right: &Raster<u8>) -> Result<DisparityRaster> {
        check_pair(left, right)?;
        let (width, height) = left.dimensions();
        let cfg = &self.config;
        let n = cfg.num_disparities;

        let volume = CostVolume::block_sad(
            &prefilter_xsobel(left, cfg.prefilter_cap),
            &prefilter_xsobel(right, cfg.prefilter_cap),
            cfg.min_disparity,
            n,
            self.block_size,
            cfg.prefilter_cap,
        );

        let penalties = self.penalties();
        let mut total = vec![0u32; width * height * n];
        let mut state = PathState::new(n);
        for y in 0..height {
            let row = move |x: usize| y * width + x;
            state.aggregate(&volume, (0..width).map(row), penalties, &mut total);
            state.aggregate(&volume, (0..width).rev().map(row), penalties, &mut total);
        }
        for x in 0..width {
            let column = move |y: usize| y * width + x;
            state.aggregate(&volume, (0..height).map(column), penalties, &mut total);
            state.aggregate(&volume, (0..height).rev().map(column), penalties, &mut total);
        }

        let invalid = cfg.invalid_disparity();
        let mut out = Raster::filled(width, height, 1, invalid);
        for y in 0..height {
            for x in 0..width {
                if !fully_searchable(x, y, width, height, self.block_size, cfg) {
                    continue;
                }
                let pixel = y * width + x;
                if let Some(d) = select_disparity(&total[pixel * n..(pixel + 1) * n], cfg) {
                    out.set(x, y, d);
                }
            }
        }

        let disparity = DisparityRaster::new(out);
        debug!(known = disparity.known_count(), "Semi-global matching done");
        Ok(disparity)
    }
}
