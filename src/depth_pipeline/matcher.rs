//! Stereo correspondence search
//!
//! Produces 12:4 fixed-point disparity rasters whose global minimum marks
//! pixels without a correspondence.

mod correspondence;
mod cost;
mod block_matcher;
mod semi_global;
mod merge;
pub mod types;

pub use correspondence::CorrespondenceMatcher;
pub use block_matcher::BlockMatcher;
pub use semi_global::SemiGlobalMatcher;
pub use merge::MultiBlockMatcher;
pub use types::{DisparityRaster, MatcherConfig, MatcherKind, DISPARITY_FRACTION_SCALE};

/// Builds the matcher described by `config`. Several block sizes produce a
/// smallest-first merge of one matcher per size.
pub fn build_matcher(config: &MatcherConfig) -> Box<dyn CorrespondenceMatcher> {
    let mut sizes: Vec<usize> = config.block_sizes.iter().map(|&b| b.max(1) | 1).collect();
    sizes.sort_unstable();
    sizes.dedup();
    if sizes.is_empty() {
        sizes.push(MatcherConfig::default().block_sizes[0]);
    }

    let mut matchers: Vec<Box<dyn CorrespondenceMatcher>> = sizes
        .iter()
        .map(|&block_size| -> Box<dyn CorrespondenceMatcher> {
            match config.kind {
                MatcherKind::Block => Box::new(BlockMatcher::new(config, block_size)),
                MatcherKind::SemiGlobal => Box::new(SemiGlobalMatcher::new(config, block_size)),
            }
        })
        .collect();

    if matchers.len() == 1 {
        matchers.remove(0)
    } else {
        Box::new(MultiBlockMatcher::new(matchers))
    }
}
