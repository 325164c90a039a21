use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_filled_circle_mut;
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use objtrace::{CameraIntrinsics, PipelineConfig, PreprocessMethod, TrackingPipeline};

fn test_camera() -> CameraIntrinsics {
    CameraIntrinsics { fx: 1000.0, fy: 1000.0, cx: 0.0, cy: 0.0 }
}

fn circle_frame(width: u32, height: u32, cx: i32, cy: i32, r: i32) -> DynamicImage {
    let mut img = RgbImage::new(width, height);
    draw_filled_circle_mut(&mut img, (cx, cy), r, Rgb([255, 255, 255]));
    DynamicImage::ImageRgb8(img)
}

#[test]
fn centered_circle_recovers_known_depth() {
    let config = PipelineConfig {
        camera: test_camera(),
        known_radius: 10.0,
        ..PipelineConfig::default()
    };
    let mut pipeline = TrackingPipeline::from_config(&config).unwrap();

    let frame = circle_frame(640, 480, 320, 240, 100);
    let output = pipeline.process_frame(&frame).unwrap();

    assert_eq!(output.detections.len(), 1, "expected exactly one detection");
    let detection = &output.detections[0];
    let [x, y, z] = detection.position_3d;

    // fx * R / r_px = 1000 * 10 / 100
    assert!((z - 100.0).abs() / 100.0 < 0.03, "z = {z}");
    assert!(x.abs() < 1.0, "x = {x}");
    assert!(y.abs() < 1.0, "y = {y}");
    assert!((detection.pixel_radius - 100.0).abs() < 3.0);
    assert!((detection.centroid_px.0 - 320.0).abs() < 2.0);
    assert!((detection.centroid_px.1 - 240.0).abs() < 2.0);
}

#[test]
fn all_black_video_stays_silent_after_warmup() {
    let config = PipelineConfig {
        camera: test_camera(),
        bg_history: 5,
        ..PipelineConfig::default()
    };
    let mut pipeline = TrackingPipeline::from_config(&config).unwrap();
    let black = DynamicImage::ImageRgb8(RgbImage::new(160, 120));

    let mut last = None;
    for _ in 0..10 {
        last = Some(pipeline.process_frame(&black).unwrap());
    }

    let output = last.unwrap();
    assert!(output.detections.is_empty());
    assert!(output.mask.pixels().all(|p| p[0] == 0));
}

#[test]
fn lowering_area_ratio_never_loses_detections() {
    let mut img = RgbImage::new(200, 200);
    draw_filled_circle_mut(&mut img, (60, 60), 40, Rgb([255, 255, 255]));
    draw_filled_rect_mut(&mut img, Rect::at(150, 150).of_size(6, 6), Rgb([255, 255, 255]));
    let frame = DynamicImage::ImageRgb8(img);

    let base = PipelineConfig {
        camera: test_camera(),
        preprocess: PreprocessMethod::Identity,
        kernel_open: 1,
        kernel_close: 1,
        ..PipelineConfig::default()
    };

    let strict_config = PipelineConfig { area_ratio: 0.05, ..base.clone() };
    let permissive_config = PipelineConfig { area_ratio: 0.0, ..base };

    let strict = TrackingPipeline::from_config(&strict_config)
        .unwrap()
        .process_frame(&frame)
        .unwrap();
    let permissive = TrackingPipeline::from_config(&permissive_config)
        .unwrap()
        .process_frame(&frame)
        .unwrap();

    assert_eq!(strict.detections.len(), 1);
    assert_eq!(permissive.detections.len(), 2);
    assert!(permissive.detections.len() >= strict.detections.len());
}

#[test]
fn detections_are_rebuilt_fresh_each_frame() {
    let config = PipelineConfig {
        camera: test_camera(),
        known_radius: 10.0,
        ..PipelineConfig::default()
    };
    let mut pipeline = TrackingPipeline::from_config(&config).unwrap();

    let frame = circle_frame(640, 480, 200, 240, 80);
    let first = pipeline.process_frame(&frame).unwrap();
    let second = pipeline.process_frame(&frame).unwrap();

    // no correspondence or smoothing: each frame stands alone
    assert_eq!(first.detections.len(), 1);
    assert_eq!(second.detections.len(), 1);
    let a = &first.detections[0];
    let b = &second.detections[0];
    assert!((a.centroid_px.0 - b.centroid_px.0).abs() < 1.0);
    assert!((a.position_3d[2] - b.position_3d[2]).abs() < 1.0);
}

#[test]
fn cluster_segmentation_also_finds_the_object() {
    let config = PipelineConfig {
        camera: test_camera(),
        known_radius: 10.0,
        segment: objtrace::SegmentMethod::Cluster2,
        ..PipelineConfig::default()
    };
    let mut pipeline = TrackingPipeline::from_config(&config).unwrap();

    let output = pipeline.process_frame(&circle_frame(640, 480, 320, 240, 100)).unwrap();
    assert_eq!(output.detections.len(), 1);
    let z = output.detections[0].position_3d[2];
    assert!((z - 100.0).abs() / 100.0 < 0.05, "z = {z}");
}
