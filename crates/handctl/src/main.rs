use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use handctl::{
    config::{Args, Mode},
    hand::HandLandmarker,
    pipeline::GesturePipeline,
    server,
};
use handctl_image::Image;

fn main() -> anyhow::Result<()> {
    handctl::init_logger!();
    let args = Args::parse();

    let landmarker = HandLandmarker::load(&args.model, args.detector_config())
        .with_context(|| format!("failed to load model '{}'", args.model.display()))?;
    let pipeline = GesturePipeline::new(landmarker);

    match args.mode() {
        Mode::Detect { image } => {
            let frame = Image::load(&image)?.flip_horizontal();
            let command = pipeline.process_frame(&frame)?;
            println!("{}", command);
        }
        Mode::Serve => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(server::serve(
                args.listen_addr(),
                Arc::new(pipeline),
                args.max_body_bytes,
            ))?;
        }
    }

    Ok(())
}
