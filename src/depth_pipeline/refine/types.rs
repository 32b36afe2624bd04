/// Edge detection and filtering parameters for [`DepthRefiner`](super::DepthRefiner).
#[derive(Debug, Clone, PartialEq)]
pub struct RefinerConfig {
    /// Binomial blur kernel applied to the reference image (1, 3, 5 or 7).
    pub color_blur: usize,
    /// Canny `(low, high)` on the reference image. Kept low so colour edges
    /// are over-detected.
    pub color_thresholds: (f32, f32),
    /// Binomial blur kernel applied to the rescaled disparity.
    pub disparity_blur: usize,
    /// Canny `(low, high)` on the 8-bit disparity. Kept high so only strong
    /// jumps count.
    pub disparity_thresholds: (f32, f32),
    /// A colour edge this many columns away still counts as coincident.
    pub edge_tolerance: usize,
    /// Odd median window; 1 disables the median step.
    pub median_window: usize,
    /// Upper bound on scan-and-median passes while looking for a result
    /// that a further pass leaves unchanged.
    pub max_passes: usize,
}

impl Default for RefinerConfig {
    fn default() -> Self {
        Self {
            color_blur: 5,
            color_thresholds: (20.0, 60.0),
            disparity_blur: 3,
            disparity_thresholds: (150.0, 300.0),
            edge_tolerance: 1,
            median_window: 5,
            max_passes: 16,
        }
    }
}
