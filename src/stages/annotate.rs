use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use anyhow::{Context, Result};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut, draw_text_mut};

use crate::models::DetectedObject;

const OUTLINE_COLOR: Rgb<u8> = Rgb([255, 128, 0]);
const MARKER_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const MARKER_RADIUS: i32 = 4;
const LABEL_SCALE: f32 = 24.0;

/// Renders detections onto a copy of the source frame.
///
/// Purely presentational: detection values are read, never modified. Text
/// labels need a font; without one only outlines and centroid markers are
/// drawn.
pub struct Annotator {
    font: Option<FontVec>,
}

impl Annotator {
    pub fn new() -> Self {
        Self { font: None }
    }

    /// Enable `[X, Y, Z]` labels, loading the TTF/OTF font at `path`.
    pub fn with_font_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read font {}", path.display()))?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|_| anyhow::anyhow!("invalid font file {}", path.display()))?;
        Ok(Self { font: Some(font) })
    }

    /// Draw every detection onto a fresh copy of `frame`.
    pub fn annotate(&self, frame: &DynamicImage, detections: &[DetectedObject]) -> RgbImage {
        let mut canvas = frame.to_rgb8();

        for detection in detections {
            draw_outline(&mut canvas, detection);

            let (u, v) = detection.centroid_px;
            draw_filled_circle_mut(
                &mut canvas,
                (u.round() as i32, v.round() as i32),
                MARKER_RADIUS,
                MARKER_COLOR,
            );

            if let Some(font) = &self.font {
                let [x, y, z] = detection.position_3d;
                let label = format!("coords: [{x:.1}, {y:.1}, {z:.1}]");
                draw_text_mut(
                    &mut canvas,
                    MARKER_COLOR,
                    (u.round() as i32 - 60).max(0),
                    v.round() as i32 + 2 * MARKER_RADIUS,
                    PxScale::from(LABEL_SCALE),
                    font,
                    &label,
                );
            }
        }

        canvas
    }
}

impl Default for Annotator {
    fn default() -> Self {
        Self::new()
    }
}

fn draw_outline(canvas: &mut RgbImage, detection: &DetectedObject) {
    let points = &detection.contour.points;
    if points.len() < 2 {
        return;
    }
    let n = points.len();
    for i in 0..n {
        let p = points[i];
        let q = points[(i + 1) % n];
        draw_line_segment_mut(
            canvas,
            (p.x as f32, p.y as f32),
            (q.x as f32, q.y as f32),
            OUTLINE_COLOR,
        );
    }
}
