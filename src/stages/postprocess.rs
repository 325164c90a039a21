use image::Luma;
use imageproc::contours::{BorderType, find_contours};
use imageproc::distance_transform::Norm;
use imageproc::drawing::draw_polygon_mut;
use imageproc::morphology::{close, open};

use crate::models::{Contour, Mask};

/// Noise, area and hole cleanup on the fused mask.
///
/// Opening removes small speckles, contours below the configured fraction of
/// the frame area are discarded (an intentional, tunable false-negative
/// trade), and closing smooths the surviving boundaries and fills small
/// interior holes.
pub struct PostProcessor {
    open_radius: u8,
    close_radius: u8,
    area_ratio: f64,
}

impl PostProcessor {
    /// Kernel sizes must be odd and positive, `area_ratio` in [0, 1]
    /// (validated at config time).
    pub fn new(kernel_open: u32, kernel_close: u32, area_ratio: f64) -> Self {
        Self {
            open_radius: ((kernel_open - 1) / 2).min(u8::MAX as u32) as u8,
            close_radius: ((kernel_close - 1) / 2).min(u8::MAX as u32) as u8,
            area_ratio,
        }
    }

    /// Clean one fused mask. Returns the final mask together with the kept
    /// contours (pre-closing, in image coordinates, detection order).
    pub fn apply(&self, mask: &Mask) -> (Mask, Vec<Contour>) {
        let (w, h) = mask.dimensions();
        let opened = open(mask, Norm::LInf, self.open_radius);

        let min_area = self.area_ratio * w as f64 * h as f64;
        let kept: Vec<Contour> = find_contours::<i32>(&opened)
            .into_iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .map(|c| Contour::new(c.points))
            .filter(|c| c.area() >= min_area)
            .collect();

        let mut filtered = Mask::new(w, h);
        for contour in &kept {
            render_filled(&mut filtered, contour);
        }

        (close(&filtered, Norm::LInf, self.close_radius), kept)
    }
}

fn render_filled(mask: &mut Mask, contour: &Contour) {
    let mut points = contour.points.as_slice();
    // draw_polygon_mut rejects an explicitly closed ring
    if points.len() > 1 && points.first() == points.last() {
        points = &points[..points.len() - 1];
    }
    if points.len() >= 3 {
        draw_polygon_mut(mask, points, Luma([255]));
    } else {
        for p in points {
            if p.x >= 0 && p.y >= 0 && (p.x as u32) < mask.width() && (p.y as u32) < mask.height() {
                mask.put_pixel(p.x as u32, p.y as u32, Luma([255]));
            }
        }
    }
}
