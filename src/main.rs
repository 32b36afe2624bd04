mod cli;

use anyhow::Context;
use clap::Parser;
use stereo_depth_rs::depth_pipeline::StereoDepthPipeline;
use stereo_depth_rs::logger;

use tracing::{error, info};

use crate::cli::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logger::init();

    let output = cli.output_dir()?;

    info!("Starting stereo_depth...");

    let pipeline = StereoDepthPipeline::new(cli.pipeline_config());

    info!("Stereo depth pipeline initialized");
    info!("Matcher: {:?} {:?}", pipeline.config().matcher.kind, pipeline.config().matcher.block_sizes);
    info!(
        "Refinement: {}",
        if pipeline.config().refine {
            "enabled"
        } else {
            "disabled"
        }
    );

    match pipeline.convert_file(&cli.input, &output) {
        Ok(summary) => {
            info!(pairs = summary.pairs_written, "Conversion successful!");
            Ok(())
        }
        Err(e) => {
            error!("Conversion failed: {}", e);
            Err(e).with_context(|| format!("converting {}", cli.input.display()))
        }
    }
}
