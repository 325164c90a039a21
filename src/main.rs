use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use env_logger::{Builder, Env};

use objtrace::session::{ImageDirSink, ImageDirSource};
use objtrace::{Annotator, PipelineConfig, SessionDriver};

#[derive(Parser)]
#[command(name = "objtrace")]
#[command(about = "Track a known-radius object in 3D from an image-sequence video")]
struct Cli {
    /// Directory holding the video frames as numbered image files
    #[arg(value_name = "FRAMES_DIR")]
    frames_dir: PathBuf,

    /// Pipeline configuration (JSON); defaults are used when omitted
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write annotated frames to this directory
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Process every Nth frame (overrides the config value)
    #[arg(long, value_name = "N")]
    frame_skip: Option<u32>,

    /// TTF/OTF font used for coordinate labels
    #[arg(long, value_name = "FILE")]
    label_font: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    Builder::from_env(Env::default().default_filter_or(default_level)).init();

    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(skip) = args.frame_skip {
        config.frame_skip = skip;
    }
    config.validate()?;

    if args.verbose {
        println!(
            "Pipeline: cues {}+{}, preprocess {} (k={}), segment {}, area ratio {}",
            config.cue_a_color.name(),
            config.cue_b_color.name(),
            config.preprocess.name(),
            config.preprocess_kernel,
            config.segment.name(),
            config.area_ratio,
        );
    }

    let mut source = ImageDirSource::open(&args.frames_dir)?;

    let annotator = match &args.label_font {
        Some(font) => Annotator::with_font_file(font)?,
        None => Annotator::new(),
    };

    let mut sink = match &args.out_dir {
        Some(dir) => Some(ImageDirSink::create(dir)?),
        None => None,
    };

    let mut driver = SessionDriver::new(&config, annotator)?;

    let start = Instant::now();
    let summary = driver.run(
        &mut source,
        sink.as_mut().map(|s| s as &mut dyn objtrace::FrameSink),
    )?;
    let elapsed = start.elapsed().as_secs_f64();

    println!("\n=== Session Summary ===");
    println!("Frames read:      {}", summary.frames_read);
    println!("Frames processed: {}", summary.frames_processed);
    println!("Frames failed:    {}", summary.frames_failed);
    println!("Detections:       {}", summary.detections);
    if elapsed > 0.0 {
        println!(
            "Processed {} frames in {:.2} sec ({:.2} FPS)",
            summary.frames_read,
            elapsed,
            summary.frames_read as f64 / elapsed
        );
    }

    if let Some(output) = driver.last_output() {
        for (i, detection) in output.detections.iter().enumerate() {
            let [x, y, z] = detection.position_3d;
            println!(
                "  Object {}: centroid ({:.1}, {:.1}) px, radius {:.1} px, position [{:.1}, {:.1}, {:.1}]",
                i + 1,
                detection.centroid_px.0,
                detection.centroid_px.1,
                detection.pixel_radius,
                x,
                y,
                z
            );
        }
    }

    Ok(())
}
