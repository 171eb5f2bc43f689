mod cli;
mod config;
mod pipeline;
mod preview;
mod run_artifacts;
mod video;

use anyhow::Result;
use cli::Args;
use config::FaceBlurConfig;
use pipeline::orchestrator::run_faceblur;

fn main() -> Result<()> {
    // Load environment variables from .env if present
    dotenvy::dotenv().ok();

    let args = Args::parse_args();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level())
        .with_writer(std::io::stderr)
        .init();

    let config = FaceBlurConfig::from_args(&args)?;
    let summary = run_faceblur(&config)?;

    tracing::info!(
        "Finished ({:?}): read {} frames, wrote {}, blurred {} faces in {:.1}s -> {}",
        summary.stop_reason,
        summary.frames_read,
        summary.frames_written,
        summary.faces_blurred,
        summary.elapsed.as_secs_f64(),
        config.output.display()
    );

    Ok(())
}
