use imageproc::geometry::convex_hull;
use imageproc::point::Point;

use crate::models::{CameraIntrinsics, Contour, DetectedObject};

/// Converts contours into 3D detections via a pinhole-camera model.
///
/// Depth follows from similar triangles: `Z = fx * known_radius / r_px`,
/// where `r_px` is the minimum enclosing circle radius of the contour. This
/// holds when the object's circular silhouette faces the camera roughly
/// orthogonally; strongly oblique views underestimate the radius and so
/// overestimate depth. Lateral position back-projects the centroid ray at
/// the estimated depth.
pub struct ObjectLocalizer {
    intrinsics: CameraIntrinsics,
    known_radius: f64,
}

impl ObjectLocalizer {
    pub fn new(intrinsics: CameraIntrinsics, known_radius: f64) -> Self {
        Self { intrinsics, known_radius }
    }

    /// Localize every qualifying contour. Degenerate contours and contours
    /// whose enclosing circle is at most one pixel are skipped, never fatal.
    pub fn localize(
        &self,
        contours: &[Contour],
        frame_width: u32,
        frame_height: u32,
    ) -> Vec<DetectedObject> {
        let (cx, cy) = self.intrinsics.principal_point(frame_width, frame_height);
        let mut detections = Vec::new();

        for contour in contours {
            let Some((u, v)) = contour.centroid() else {
                log::trace!("skipping degenerate contour ({} points)", contour.points.len());
                continue;
            };
            let (_, _, r_px) = min_enclosing_circle(&contour.points);
            if r_px <= 1.0 {
                log::trace!("skipping contour with enclosing radius {r_px:.2}px");
                continue;
            }

            let z = self.intrinsics.fx * self.known_radius / r_px;
            let x = (u - cx) * z / self.intrinsics.fx;
            let y = (v - cy) * z / self.intrinsics.fy;

            detections.push(DetectedObject {
                centroid_px: (u, v),
                pixel_radius: r_px,
                position_3d: [x, y, z],
                contour: contour.clone(),
            });
        }

        detections
    }
}

/// Exact minimum enclosing circle `(center_x, center_y, radius)`.
///
/// Runs the incremental algorithm over the convex hull, which keeps the
/// candidate set small for the long boundary chains contours produce.
pub fn min_enclosing_circle(points: &[Point<i32>]) -> (f64, f64, f64) {
    if points.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let hull = if points.len() > 3 {
        convex_hull(points.to_vec())
    } else {
        points.to_vec()
    };
    let pts: Vec<(f64, f64)> = hull.iter().map(|p| (p.x as f64, p.y as f64)).collect();

    let mut circle = (pts[0].0, pts[0].1, 0.0);
    for i in 1..pts.len() {
        if contains(circle, pts[i]) {
            continue;
        }
        circle = (pts[i].0, pts[i].1, 0.0);
        for j in 0..i {
            if contains(circle, pts[j]) {
                continue;
            }
            circle = circle_from_two(pts[i], pts[j]);
            for k in 0..j {
                if !contains(circle, pts[k]) {
                    circle = circle_from_three(pts[i], pts[j], pts[k]);
                }
            }
        }
    }
    circle
}

fn contains((cx, cy, r): (f64, f64, f64), (px, py): (f64, f64)) -> bool {
    let dx = px - cx;
    let dy = py - cy;
    dx * dx + dy * dy <= r * r + 1e-7
}

fn circle_from_two((ax, ay): (f64, f64), (bx, by): (f64, f64)) -> (f64, f64, f64) {
    let cx = (ax + bx) / 2.0;
    let cy = (ay + by) / 2.0;
    let r = ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt() / 2.0;
    (cx, cy, r)
}

fn circle_from_three(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> (f64, f64, f64) {
    let d = 2.0 * (a.0 * (b.1 - c.1) + b.0 * (c.1 - a.1) + c.0 * (a.1 - b.1));
    if d.abs() < 1e-9 {
        // collinear: widest pair diameter covers all three
        let candidates = [
            circle_from_two(a, b),
            circle_from_two(a, c),
            circle_from_two(b, c),
        ];
        return candidates
            .into_iter()
            .max_by(|p, q| p.2.total_cmp(&q.2))
            .unwrap_or((a.0, a.1, 0.0));
    }
    let a2 = a.0 * a.0 + a.1 * a.1;
    let b2 = b.0 * b.0 + b.1 * b.1;
    let c2 = c.0 * c.0 + c.1 * c.1;
    let ux = (a2 * (b.1 - c.1) + b2 * (c.1 - a.1) + c2 * (a.1 - b.1)) / d;
    let uy = (a2 * (c.0 - b.0) + b2 * (a.0 - c.0) + c2 * (b.0 - a.0)) / d;
    let r = ((a.0 - ux).powi(2) + (a.1 - uy).powi(2)).sqrt();
    (ux, uy, r)
}
