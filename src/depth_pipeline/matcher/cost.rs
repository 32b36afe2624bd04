//! Matching costs shared by the block and semi-global matchers.

use crate::depth_pipeline::common::raster::Raster;
use crate::depth_pipeline::filters::sobel;
use crate::depth_pipeline::matcher::types::{DISPARITY_FRACTION_SCALE, MatcherConfig};

/// Horizontal Sobel response clamped to `[-cap, cap]` and shifted to
/// `[0, 2 * cap]`. Matching on this instead of raw intensity removes the
/// brightness offset between the two cameras.
pub(super) fn prefilter_xsobel(image: &Raster<u8>, cap: u8) -> Raster<u8> {
    let mono = image.to_mono().map(|v| v as f32);
    let (gx, _) = sobel(&mono);
    let cap = cap as i32;
    gx.map(|g| ((g as i32).clamp(-cap, cap) + cap) as u8)
}

/// Summed-area table with one row and column of zero padding.
struct Integral {
    width: usize,
    sums: Vec<u64>,
}

impl Integral {
    fn build(width: usize, height: usize, value: impl Fn(usize, usize) -> u64) -> Self {
        let stride = width + 1;
        let mut sums = vec![0u64; stride * (height + 1)];
        for y in 0..height {
            let mut row_sum = 0;
            for x in 0..width {
                row_sum += value(x, y);
                sums[(y + 1) * stride + x + 1] = sums[y * stride + x + 1] + row_sum;
            }
        }
        Self { width, sums }
    }

    /// Sum over the half-open box `[x0, x1) x [y0, y1)`.
    fn sum(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> u64 {
        let stride = self.width + 1;
        self.sums[y1 * stride + x1] + self.sums[y0 * stride + x0]
            - self.sums[y0 * stride + x1]
            - self.sums[y1 * stride + x0]
    }
}

/// Window bounds clipped to the image.
fn window(x: usize, y: usize, half: usize, width: usize, height: usize) -> (usize, usize, usize, usize) {
    (
        x.saturating_sub(half),
        y.saturating_sub(half),
        (x + half + 1).min(width),
        (y + half + 1).min(height),
    )
}

/// Block SAD cost for every pixel and candidate disparity, laid out as
/// `(y * width + x) * num_disparities + d`.
pub(super) struct CostVolume {
    pub width: usize,
    pub height: usize,
    pub num_disparities: usize,
    pub costs: Vec<u32>,
}

impl CostVolume {
    pub fn block_sad(
        left: &Raster<u8>,
        right: &Raster<u8>,
        min_disparity: i32,
        num_disparities: usize,
        block_size: usize,
        cap: u8,
    ) -> Self {
        let (width, height) = left.dimensions();
        let half = block_size / 2;
        let out_of_range = 2 * cap as u64;
        let mut costs = vec![0u32; width * height * num_disparities];

        for d in 0..num_disparities {
            let disparity = min_disparity + d as i32;
            let diff = Integral::build(width, height, |x, y| {
                let rx = x as i32 - disparity;
                if rx < 0 || rx >= width as i32 {
                    out_of_range
                } else {
                    (left.get(x, y) as i32 - right.get(rx as usize, y) as i32).unsigned_abs() as u64
                }
            });
            for y in 0..height {
                for x in 0..width {
                    let (x0, y0, x1, y1) = window(x, y, half, width, height);
                    let sad = diff.sum(x0, y0, x1, y1).min(u32::MAX as u64) as u32;
                    costs[(y * width + x) * num_disparities + d] = sad;
                }
            }
        }

        Self {
            width,
            height,
            num_disparities,
            costs,
        }
    }

    pub fn at(&self, x: usize, y: usize) -> &[u32] {
        let start = (y * self.width + x) * self.num_disparities;
        &self.costs[start..start + self.num_disparities]
    }
}

/// Summed distance of the prefiltered left image from its zero level over
/// each block; low values mean there is nothing to match against.
pub(super) fn block_texture(prefiltered: &Raster<u8>, block_size: usize, cap: u8) -> Raster<u32> {
    let (width, height) = prefiltered.dimensions();
    let half = block_size / 2;
    let integral = Integral::build(width, height, |x, y| {
        (prefiltered.get(x, y) as i32 - cap as i32).unsigned_abs() as u64
    });
    let mut out = Raster::<u32>::new(width, height, 1);
    for y in 0..height {
        for x in 0..width {
            let (x0, y0, x1, y1) = window(x, y, half, width, height);
            out.set(x, y, integral.sum(x0, y0, x1, y1).min(u32::MAX as u64) as u32);
        }
    }
    out
}

/// Whether the whole block, and its counterpart at every candidate
/// disparity, lies inside the image.
pub(super) fn fully_searchable(
    x: usize,
    y: usize,
    width: usize,
    height: usize,
    block_size: usize,
    config: &MatcherConfig,
) -> bool {
    let half = (block_size / 2) as i64;
    let (x, y, w, h) = (x as i64, y as i64, width as i64, height as i64);
    let min_d = config.min_disparity as i64;
    let max_d = min_d + config.num_disparities as i64 - 1;
    y - half >= 0
        && y + half < h
        && x - half >= 0
        && x + half < w
        && x - half - max_d >= 0
        && x + half - min_d < w
}

/// Winner-takes-all with a uniqueness check and parabolic sub-pixel
/// refinement. Returns the fixed-point disparity, or `None` when the best
/// candidate is ambiguous.
pub(super) fn select_disparity(costs: &[u32], config: &MatcherConfig) -> Option<i16> {
    let (best, &best_cost) = costs
        .iter()
        .enumerate()
        .min_by_key(|&(d, &c)| (c, d))?;

    if config.uniqueness_ratio > 0 {
        let threshold = best_cost as u64 + best_cost as u64 * config.uniqueness_ratio as u64 / 100;
        let ambiguous = costs
            .iter()
            .enumerate()
            .any(|(d, &c)| d.abs_diff(best) > 1 && c as u64 <= threshold);
        if ambiguous {
            return None;
        }
    }

    let mut fraction = 0.0;
    if best > 0 && best + 1 < costs.len() {
        let prev = costs[best - 1] as f64;
        let next = costs[best + 1] as f64;
        let denom = prev + next - 2.0 * best_cost as f64;
        if denom > 0.0 {
            fraction = (prev - next) / (2.0 * denom);
        }
    }

    let whole = (config.min_disparity + best as i32) * DISPARITY_FRACTION_SCALE;
    let value = whole + (fraction * DISPARITY_FRACTION_SCALE as f64).round() as i32;
    Some(value.clamp(i16::MIN as i32 + 1, i16::MAX as i32) as i16)
}


#[cfg(test)]
mod tests {
    use super::*;

    fn config(min_disparity: i32, num_disparities: usize, uniqueness_ratio: u32) -> MatcherConfig {
        MatcherConfig {
            min_disparity,
            num_disparities,
            uniqueness_ratio,
            ..MatcherConfig::default()
        }
    }

    #[test]
    fn integral_box_sums_match_brute_force() {
        let integral = Integral::build(4, 3, |x, y| (x + 10 * y) as u64);
        let brute: u64 = (1..3).flat_map(|y| (1..4).map(move |x| (x + 10 * y) as u64)).sum();
        assert_eq!(integral.sum(1, 1, 4, 3), brute);
    }

    #[test]
    fn clear_minimum_gets_subpixel_offset() {
        // Costs lean towards the next candidate, so the vertex sits past d = 2.
        let costs = [90, 60, 10, 20, 90, 95];
        let value = select_disparity(&costs, &config(10, 6, 15)).unwrap();
        assert!(value > 12 * 16 && value < 12 * 16 + 8, "got {}", value);
    }

    #[test]
    fn ambiguous_minimum_is_rejected() {
        let costs = [10, 80, 80, 11, 80, 80];
        assert_eq!(select_disparity(&costs, &config(0, 6, 15)), None);
        assert!(select_disparity(&costs, &config(0, 6, 0)).is_some());
    }

    #[test]
    fn search_window_respects_largest_disparity() {
        let cfg = config(4, 8, 0);
        // Needs x - 2 - 11 >= 0.
        assert!(!fully_searchable(12, 5, 40, 20, 5, &cfg));
        assert!(fully_searchable(13, 5, 40, 20, 5, &cfg));
        assert!(!fully_searchable(13, 1, 40, 20, 5, &cfg));
        assert!(!fully_searchable(38, 5, 40, 20, 5, &cfg));
    }
}
