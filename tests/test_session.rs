use std::io::Write;
use std::path::Path;

use anyhow::Result;
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_filled_circle_mut;
use objtrace::session::{FrameSink, FrameSource, ImageDirSource, MemorySource};
use objtrace::{Annotator, PipelineConfig, SegmentMethod, SessionDriver};

struct CollectingSink {
    frames: Vec<RgbImage>,
}

impl FrameSink for CollectingSink {
    fn consume(&mut self, frame: &RgbImage) -> Result<()> {
        self.frames.push(frame.clone());
        Ok(())
    }
}

fn black_frame(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::new(width, height))
}

fn circle_frame(width: u32, height: u32) -> DynamicImage {
    let mut img = RgbImage::new(width, height);
    draw_filled_circle_mut(
        &mut img,
        (width as i32 / 2, height as i32 / 2),
        width as i32 / 4,
        Rgb([255, 255, 255]),
    );
    DynamicImage::ImageRgb8(img)
}

#[test]
fn missing_frame_directory_is_fatal() {
    assert!(ImageDirSource::open(Path::new("/nonexistent/frames")).is_err());
}

#[test]
fn empty_frame_directory_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    assert!(ImageDirSource::open(dir.path()).is_err());
}

#[test]
fn image_directory_source_reads_frames_in_order() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..3 {
        RgbImage::from_pixel(8, 8, Rgb([i * 10, 0, 0]))
            .save(dir.path().join(format!("{i:03}.png")))
            .unwrap();
    }
    // non-image files are ignored
    std::fs::write(dir.path().join("notes.txt"), b"not a frame").unwrap();

    let mut source = ImageDirSource::open(dir.path()).unwrap();
    let mut reds = Vec::new();
    while let Some(frame) = source.next_frame().unwrap() {
        reds.push(frame.to_rgb8().get_pixel(0, 0)[0]);
    }
    assert_eq!(reds, vec![0, 10, 20]);
}

#[test]
fn frame_skip_processes_every_nth_frame() {
    let config = PipelineConfig { frame_skip: 2, ..PipelineConfig::default() };
    let mut driver = SessionDriver::new(&config, Annotator::new()).unwrap();
    let mut source = MemorySource::new(vec![black_frame(64, 48); 6]);

    let summary = driver.run(&mut source, None).unwrap();
    assert_eq!(summary.frames_read, 6);
    assert_eq!(summary.frames_processed, 3);
    assert_eq!(summary.frames_failed, 0);
}

#[test]
fn skipped_frames_reuse_the_last_annotated_output() {
    let config = PipelineConfig { frame_skip: 2, ..PipelineConfig::default() };
    let mut driver = SessionDriver::new(&config, Annotator::new()).unwrap();
    // second frame differs but is skipped, so the sink must see the
    // first frame's annotation twice
    let mut source = MemorySource::new(vec![circle_frame(64, 48), black_frame(64, 48)]);
    let mut sink = CollectingSink { frames: Vec::new() };

    driver.run(&mut source, Some(&mut sink)).unwrap();
    assert_eq!(sink.frames.len(), 2);
    assert_eq!(sink.frames[0], sink.frames[1]);
}

#[test]
fn session_counts_detections_across_frames() {
    let config = PipelineConfig {
        frame_skip: 1,
        camera: objtrace::CameraIntrinsics { fx: 1000.0, fy: 1000.0, cx: 0.0, cy: 0.0 },
        ..PipelineConfig::default()
    };
    let mut driver = SessionDriver::new(&config, Annotator::new()).unwrap();
    let mut source = MemorySource::new(vec![circle_frame(320, 240); 2]);

    let summary = driver.run(&mut source, None).unwrap();
    assert_eq!(summary.frames_processed, 2);
    assert_eq!(summary.detections, 2);
    assert!(driver.last_output().is_some());
    assert_eq!(driver.last_output().unwrap().detections.len(), 1);
}

#[test]
fn config_file_round_trips_with_fallback_methods() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "segment": "watershed",
            "area_ratio": 0.01,
            "camera": {{ "fx": 500.0, "fy": 500.0 }}
        }}"#
    )
    .unwrap();

    let config = PipelineConfig::from_json_file(file.path()).unwrap();
    // unrecognized method degrades instead of failing the session
    assert_eq!(config.segment, SegmentMethod::None);
    assert_eq!(config.area_ratio, 0.01);
    assert_eq!(config.camera.fx, 500.0);
    // unspecified fields keep their defaults
    assert_eq!(config.kernel_open, 11);
}

#[test]
fn invalid_config_values_are_rejected() {
    let even_kernel = PipelineConfig { kernel_open: 4, ..PipelineConfig::default() };
    assert!(even_kernel.validate().is_err());

    let bad_ratio = PipelineConfig { area_ratio: 1.5, ..PipelineConfig::default() };
    assert!(bad_ratio.validate().is_err());

    let bad_focal = PipelineConfig {
        camera: objtrace::CameraIntrinsics { fx: 0.0, fy: 1.0, cx: 0.0, cy: 0.0 },
        ..PipelineConfig::default()
    };
    assert!(bad_focal.validate().is_err());

    let bad_radius = PipelineConfig { known_radius: -1.0, ..PipelineConfig::default() };
    assert!(bad_radius.validate().is_err());
}
