use imageproc::point::Point;
use objtrace::stages::localize::min_enclosing_circle;
use objtrace::{CameraIntrinsics, Contour, ObjectLocalizer};

fn circle_contour(cx: f64, cy: f64, r: f64) -> Contour {
    let points = (0..360)
        .map(|deg| {
            let theta = (deg as f64).to_radians();
            Point::new(
                (cx + r * theta.cos()).round() as i32,
                (cy + r * theta.sin()).round() as i32,
            )
        })
        .collect();
    Contour::new(points)
}

fn intrinsics(fx: f64, fy: f64, cx: f64, cy: f64) -> CameraIntrinsics {
    CameraIntrinsics { fx, fy, cx, cy }
}

#[test]
fn min_enclosing_circle_recovers_radius_and_center() {
    let contour = circle_contour(100.0, 80.0, 40.0);
    let (cx, cy, r) = min_enclosing_circle(&contour.points);
    assert!((cx - 100.0).abs() < 1.5, "cx = {cx}");
    assert!((cy - 80.0).abs() < 1.5, "cy = {cy}");
    assert!((r - 40.0).abs() < 1.5, "r = {r}");
}

#[test]
fn depth_is_inversely_proportional_to_pixel_radius() {
    let localizer = ObjectLocalizer::new(intrinsics(1000.0, 1000.0, 0.0, 0.0), 10.0);

    let near = localizer.localize(&[circle_contour(320.0, 240.0, 100.0)], 640, 480);
    let far = localizer.localize(&[circle_contour(320.0, 240.0, 50.0)], 640, 480);
    assert_eq!(near.len(), 1);
    assert_eq!(far.len(), 1);

    let z_near = near[0].position_3d[2];
    let z_far = far[0].position_3d[2];
    // doubling the pixel radius halves the depth
    assert!((z_far / z_near - 2.0).abs() < 0.05, "ratio = {}", z_far / z_near);
    assert!((z_near - 100.0).abs() < 2.0, "z_near = {z_near}");
}

#[test]
fn tiny_enclosing_radius_is_skipped() {
    let localizer = ObjectLocalizer::new(intrinsics(1000.0, 1000.0, 0.0, 0.0), 10.0);
    // non-degenerate triangle, but its enclosing circle is under a pixel
    let tiny = Contour::new(vec![Point::new(0, 0), Point::new(1, 0), Point::new(0, 1)]);
    assert!(tiny.centroid().is_some());
    assert!(localizer.localize(&[tiny], 640, 480).is_empty());
}

#[test]
fn degenerate_contours_are_skipped() {
    let localizer = ObjectLocalizer::new(intrinsics(1000.0, 1000.0, 0.0, 0.0), 10.0);
    let point = Contour::new(vec![Point::new(5, 5)]);
    let segment = Contour::new(vec![Point::new(0, 0), Point::new(10, 0)]);
    let collinear = Contour::new(vec![Point::new(0, 0), Point::new(5, 0), Point::new(10, 0)]);
    assert!(localizer.localize(&[point, segment, collinear], 640, 480).is_empty());
}

#[test]
fn zero_principal_point_measures_from_frame_center() {
    let localizer = ObjectLocalizer::new(intrinsics(1000.0, 1000.0, 0.0, 0.0), 10.0);
    let detections = localizer.localize(&[circle_contour(320.0, 240.0, 80.0)], 640, 480);
    assert_eq!(detections.len(), 1);
    let [x, y, _] = detections[0].position_3d;
    assert!(x.abs() < 0.5, "x = {x}");
    assert!(y.abs() < 0.5, "y = {y}");
}

#[test]
fn explicit_principal_point_shifts_lateral_position() {
    let localizer = ObjectLocalizer::new(intrinsics(1000.0, 1000.0, 100.0, 50.0), 10.0);
    let detections = localizer.localize(&[circle_contour(320.0, 240.0, 80.0)], 640, 480);
    assert_eq!(detections.len(), 1);
    let [x, y, z] = detections[0].position_3d;
    assert!((x - (320.0 - 100.0) * z / 1000.0).abs() < 0.5);
    assert!((y - (240.0 - 50.0) * z / 1000.0).abs() < 0.5);
}

#[test]
fn detections_preserve_contour_order() {
    let localizer = ObjectLocalizer::new(intrinsics(1000.0, 1000.0, 0.0, 0.0), 10.0);
    let first = circle_contour(100.0, 100.0, 30.0);
    let second = circle_contour(400.0, 300.0, 60.0);
    let detections = localizer.localize(&[first, second], 640, 480);
    assert_eq!(detections.len(), 2);
    assert!(detections[0].centroid_px.0 < detections[1].centroid_px.0);
    assert!(detections[0].pixel_radius < detections[1].pixel_radius);
}

#[test]
fn centroid_matches_polygon_center_of_square() {
    let square = Contour::new(vec![
        Point::new(10, 10),
        Point::new(30, 10),
        Point::new(30, 30),
        Point::new(10, 30),
    ]);
    let (cx, cy) = square.centroid().expect("square has area");
    assert!((cx - 20.0).abs() < 1e-9);
    assert!((cy - 20.0).abs() < 1e-9);
    assert!((square.area() - 400.0).abs() < 1e-9);
}
