use tracing::{debug, instrument, warn};

use crate::depth_pipeline::common::raster::Raster;
use crate::depth_pipeline::filters::{binomial_blur, canny, median_filter, EdgeMask};
use crate::depth_pipeline::matcher::DisparityRaster;
use crate::depth_pipeline::refine::types::RefinerConfig;

/// Removes the halo a block matcher leaves around foreground objects.
///
/// A disparity edge is trusted only when the reference image has an edge at
/// (or next to) the same column. Untrusted edges are erased back to the
/// sentinel, walking along the row until either image shows an edge.
#[derive(Debug, Clone, Default)]
pub struct DepthRefiner {
    config: RefinerConfig,
}

impl DepthRefiner {
    pub fn new(config: RefinerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RefinerConfig {
        &self.config
    }

    /// Edge-coincidence deflation followed by the median filter, repeated
    /// until a pass changes nothing. The result is therefore its own
    /// refinement.
    #[instrument(skip_all, fields(width = disparity.width(), height = disparity.height()))]
    pub fn refine(&self, disparity: &DisparityRaster, reference: &Raster<u8>) -> DisparityRaster {
        let mut current = self.refine_pass(disparity, reference);
        for pass in 1..self.config.max_passes.max(1) {
            let next = self.refine_pass(&current, reference);
            if next == current {
                debug!(passes = pass, "Refinement settled");
                return current;
            }
            current = next;
        }
        if self.config.max_passes > 1 {
            warn!(
                max_passes = self.config.max_passes,
                "Refinement still changing after the last pass"
            );
        }
        current
    }

    /// One deflation and median step.
    pub fn refine_pass(&self, disparity: &DisparityRaster, reference: &Raster<u8>) -> DisparityRaster {
        let deflated = self.deflate(disparity, reference);
        DisparityRaster::new(median_filter(deflated.raster(), self.config.median_window))
    }

    /// Edge detector run on the reference image.
    pub fn color_edges(&self, reference: &Raster<u8>) -> EdgeMask {
        let (low, high) = self.config.color_thresholds;
        canny(&binomial_blur(&reference.to_mono(), self.config.color_blur), low, high)
    }

    /// Edge detector run on the disparity, rescaled to 8 bits over its own
    /// value range.
    pub fn disparity_edges(&self, disparity: &DisparityRaster) -> EdgeMask {
        let (low, high) = self.config.disparity_thresholds;
        canny(&binomial_blur(&rescale_to_u8(disparity), self.config.disparity_blur), low, high)
    }

    /// The row scan alone. Every output pixel is either its input value or
    /// the input's sentinel.
    pub fn deflate(&self, disparity: &DisparityRaster, reference: &Raster<u8>) -> DisparityRaster {
        let (width, height) = (disparity.width(), disparity.height());
        if width == 0 || height == 0 {
            return disparity.clone();
        }
        if reference.dimensions() != (width, height) {
            warn!(
                width,
                height,
                ref_width = reference.width(),
                ref_height = reference.height(),
                "Reference image size differs from disparity, skipping edge check"
            );
            return disparity.clone();
        }

        let sentinel = disparity.sentinel();
        let color = self.color_edges(reference);
        let edges = self.disparity_edges(disparity);

        let mut out = disparity.clone();
        let mut erased = 0usize;
        for y in 0..height {
            let row = RowEdges {
                color: color.row(y),
                disparity: edges.row(y),
                tolerance: self.config.edge_tolerance,
            };
            erased += row.deflate(out.raster_mut().row_mut(y), sentinel);
        }
        debug!(erased, sentinel, "Deflated unsupported disparity edges");
        out
    }
}

/// Linear map of `[min, max]` onto `[0, 255]` using `255 / (max - min + 1)`.
fn rescale_to_u8(disparity: &DisparityRaster) -> Raster<u8> {
    let Some((min, max)) = disparity.min_max() else {
        return Raster::new(disparity.width(), disparity.height(), 1);
    };
    let scale = 255.0 / (max as f32 - min as f32 + 1.0);
    disparity
        .raster()
        .map(|v| ((v as f32 - min as f32) * scale).round().clamp(0.0, 255.0) as u8)
}

/// Both edge masks for one row.
struct RowEdges<'a> {
    color: &'a [bool],
    disparity: &'a [bool],
    tolerance: usize,
}

impl RowEdges<'_> {
    fn color_near(&self, x: usize) -> bool {
        let lo = x.saturating_sub(self.tolerance);
        let hi = (x + self.tolerance).min(self.color.len() - 1);
        self.color[lo..=hi].iter().any(|&e| e)
    }

    fn any_edge(&self, x: usize) -> bool {
        self.color[x] || self.disparity[x]
    }

    /// Returns the number of pixels changed to `sentinel`.
    fn deflate(&self, row: &mut [i16], sentinel: i16) -> usize {
        let mut erased = 0;
        let mut erase = |v: &mut i16| {
            if *v != sentinel {
                *v = sentinel;
                erased += 1;
            }
        };

        let mut on_edge = false;
        for j in 0..row.len() {
            match (on_edge, self.disparity[j]) {
                (false, true) => {
                    on_edge = true;
                    if !self.color_near(j) {
                        erase(&mut row[j]);
                        for k in (0..j).rev() {
                            if self.any_edge(k) {
                                break;
                            }
                            erase(&mut row[k]);
                        }
                    }
                }
                (true, false) => {
                    on_edge = false;
                    if !self.color_near(j - 1) {
                        erase(&mut row[j - 1]);
                        for k in j..row.len() {
                            if self.any_edge(k) {
                                break;
                            }
                            erase(&mut row[k]);
                        }
                    }
                }
                _ => {}
            }
        }
        erased
    }
}
