//! Command-line arguments.

use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use stereo_depth_rs::depth_pipeline::{MatcherKind, PipelineConfig, TiffCompression};

/// Converts a stereo AVI into per-frame depth maps
#[derive(Parser, Debug)]
#[command(
    name = "stereo_depth",
    author,
    version,
    about = "Stereo video to depth map converter",
    long_about = "Reads a two-track stereo AVI, matches every left/right frame pair and \n\
                  writes colour, depth (millimetres) and camera intrinsics to an output directory."
)]
pub struct Cli {
    /// Stereo recording with one video stream per camera
    pub input: PathBuf,

    /// Output directory [default: the input path without its extension]
    pub output: Option<PathBuf>,

    /// Correspondence strategy
    #[arg(long, value_enum, default_value = "block")]
    pub matcher: Matcher,

    /// Matching block size in pixels, repeat to merge several sizes
    #[arg(long = "block-size", value_name = "PIXELS")]
    pub block_sizes: Vec<usize>,

    /// Skip edge-coincidence refinement of the disparity
    #[arg(long)]
    pub no_refine: bool,

    /// Keep RGB reference frames instead of luma
    #[arg(long)]
    pub color: bool,

    /// Treat the second video stream as the left camera
    #[arg(long)]
    pub swap_tracks: bool,

    /// Also write the right camera's frames
    #[arg(long)]
    pub write_right: bool,

    /// TIFF compression
    #[arg(long, value_enum, default_value = "deflate-fast")]
    pub compression: Compression,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Matcher {
    /// Block matching
    Block,
    /// Semi-global matching
    SemiGlobal,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compression {
    None,
    Lzw,
    DeflateFast,
    DeflateBalanced,
    DeflateBest,
}

impl Cli {
    /// `recordings/clip.avi` writes to `recordings/clip/`.
    pub fn output_dir(&self) -> anyhow::Result<PathBuf> {
        match &self.output {
            Some(dir) => Ok(dir.clone()),
            None => default_output_dir(&self.input),
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        let compression = match self.compression {
            Compression::None => TiffCompression::None,
            Compression::Lzw => TiffCompression::Lzw,
            Compression::DeflateFast => TiffCompression::DeflateFast,
            Compression::DeflateBalanced => TiffCompression::DeflateBalanced,
            Compression::DeflateBest => TiffCompression::DeflateBest,
        };
        let kind = match self.matcher {
            Matcher::Block => MatcherKind::Block,
            Matcher::SemiGlobal => MatcherKind::SemiGlobal,
        };

        let mut builder = PipelineConfig::builder()
            .matcher_kind(kind)
            .refine(!self.no_refine)
            .grayscale(!self.color)
            .swap_tracks(self.swap_tracks)
            .write_right(self.write_right)
            .compression(compression)
            .predictor((compression != TiffCompression::None).then_some(2));
        if !self.block_sizes.is_empty() {
            builder = builder.block_sizes(self.block_sizes.clone());
        }
        builder.build()
    }
}

fn default_output_dir(input: &Path) -> anyhow::Result<PathBuf> {
    let stem = input
        .file_stem()
        .ok_or_else(|| anyhow::anyhow!("{} has no file name", input.display()))?;
    Ok(input.with_file_name(stem))
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use clap::error::ErrorKind;

    use super::*;

    #[test]
    fn argument_definitions_are_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn missing_input_is_a_usage_error() {
        let err = Cli::try_parse_from(["stereo_depth"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn help_is_available() {
        let err = Cli::try_parse_from(["stereo_depth", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn output_defaults_to_the_input_stem() {
        let cli = Cli::try_parse_from(["stereo_depth", "recordings/clip.avi"]).unwrap();
        assert_eq!(cli.output_dir().unwrap(), PathBuf::from("recordings/clip"));

        let cli = Cli::try_parse_from(["stereo_depth", "clip.avi", "out"]).unwrap();
        assert_eq!(cli.output_dir().unwrap(), PathBuf::from("out"));
    }

    #[test]
    fn defaults_match_the_library_configuration() {
        let cli = Cli::try_parse_from(["stereo_depth", "clip.avi"]).unwrap();
        let config = cli.pipeline_config();
        assert_eq!(config.matcher.kind, MatcherKind::Block);
        assert_eq!(config.matcher.block_sizes, PipelineConfig::default().matcher.block_sizes);
        assert!(config.refine);
        assert!(config.grayscale);
        assert_eq!(config.compression, TiffCompression::DeflateFast);
        assert_eq!(config.predictor, Some(2));
    }

    #[test]
    fn flags_reach_the_pipeline_configuration() {
        let cli = Cli::try_parse_from([
            "stereo_depth",
            "clip.avi",
            "--matcher",
            "semi-global",
            "--block-size",
            "9",
            "--block-size",
            "21",
            "--no-refine",
            "--color",
            "--swap-tracks",
            "--compression",
            "none",
        ])
        .unwrap();
        let config = cli.pipeline_config();
        assert_eq!(config.matcher.kind, MatcherKind::SemiGlobal);
        assert_eq!(config.matcher.block_sizes, vec![9, 21]);
        assert!(!config.refine);
        assert!(!config.grayscale);
        assert!(config.swap_tracks);
        assert_eq!(config.predictor, None);
    }

    #[test]
    fn unknown_matcher_is_rejected() {
        let err = Cli::try_parse_from(["stereo_depth", "clip.avi", "--matcher", "fast"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
    }
}
