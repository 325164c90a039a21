use image::GrayImage;
use imageproc::point::Point;
use serde::{Deserialize, Serialize};

/// Binary image: every pixel is 0 (background) or 255 (foreground).
pub type Mask = GrayImage;

/// Closed outer boundary of one detected region, in image pixel coordinates.
///
/// Points are ordered along the boundary and the last point implicitly
/// connects back to the first. A contour may be degenerate (two points or
/// fewer, zero enclosed area).
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    pub points: Vec<Point<i32>>,
}

impl Contour {
    pub fn new(points: Vec<Point<i32>>) -> Self {
        Self { points }
    }

    /// Enclosed polygon area in square pixels (shoelace formula).
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    fn signed_area(&self) -> f64 {
        if self.points.len() < 3 {
            return 0.0;
        }
        let mut acc = 0.0f64;
        let n = self.points.len();
        for i in 0..n {
            let p = self.points[i];
            let q = self.points[(i + 1) % n];
            acc += p.x as f64 * q.y as f64 - q.x as f64 * p.y as f64;
        }
        acc / 2.0
    }

    /// Area centroid from first-order polygon moments.
    ///
    /// Returns `None` for degenerate contours whose zeroth moment vanishes,
    /// such as single points or straight pixel runs.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.points.len() < 3 {
            return None;
        }
        let n = self.points.len();
        let mut m00 = 0.0f64;
        let mut m10 = 0.0f64;
        let mut m01 = 0.0f64;
        for i in 0..n {
            let p = self.points[i];
            let q = self.points[(i + 1) % n];
            let (px, py) = (p.x as f64, p.y as f64);
            let (qx, qy) = (q.x as f64, q.y as f64);
            let cross = px * qy - qx * py;
            m00 += cross;
            m10 += (px + qx) * cross;
            m01 += (py + qy) * cross;
        }
        m00 /= 2.0;
        if m00.abs() < 1e-9 {
            return None;
        }
        m10 /= 6.0;
        m01 /= 6.0;
        // the orientation sign cancels in the ratio
        Some((m10 / m00, m01 / m00))
    }

    pub fn is_degenerate(&self) -> bool {
        self.centroid().is_none()
    }
}

/// Pinhole camera intrinsics in pixel units.
///
/// `cx`/`cy` of zero mean the principal point is assumed to sit at the frame
/// center (undistorted, centered optics); the localizer resolves the
/// effective offsets against the frame dimensions in that case.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    /// Focal length in x (pixels).
    pub fx: f64,
    /// Focal length in y (pixels).
    pub fy: f64,
    /// Principal point x (pixels), 0 = frame center.
    #[serde(default)]
    pub cx: f64,
    /// Principal point y (pixels), 0 = frame center.
    #[serde(default)]
    pub cy: f64,
}

impl CameraIntrinsics {
    pub fn is_valid(self) -> bool {
        self.fx.is_finite()
            && self.fy.is_finite()
            && self.cx.is_finite()
            && self.cy.is_finite()
            && self.fx > 0.0
            && self.fy > 0.0
    }

    /// Effective principal point for a frame of the given size.
    pub fn principal_point(self, frame_width: u32, frame_height: u32) -> (f64, f64) {
        if self.cx == 0.0 && self.cy == 0.0 {
            (frame_width as f64 / 2.0, frame_height as f64 / 2.0)
        } else {
            (self.cx, self.cy)
        }
    }
}

/// One localized object in a single frame.
///
/// `position_3d` is expressed in the camera frame, in the same physical unit
/// as the configured object radius. Detections are per-frame values; nothing
/// links them across frames.
#[derive(Debug, Clone)]
pub struct DetectedObject {
    /// Area centroid in image pixels.
    pub centroid_px: (f64, f64),
    /// Minimum enclosing circle radius in pixels.
    pub pixel_radius: f64,
    /// Estimated (X, Y, Z) relative to the camera.
    pub position_3d: [f64; 3],
    /// Boundary this detection was derived from.
    pub contour: Contour,
}

/// Per-frame result contract: the cleaned mask plus detections in
/// contour-detection order.
#[derive(Debug, Clone)]
pub struct FrameOutput {
    pub mask: Mask,
    pub detections: Vec<DetectedObject>,
}
