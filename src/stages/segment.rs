use image::{DynamicImage, Luma};
use imageproc::contrast::{ThresholdType, otsu_level, threshold};
use imageproc::edges::canny;

use crate::config::SegmentMethod;
use crate::stages::MaskStage;
use crate::models::Mask;

// Fixed Canny thresholds.
const CANNY_LOW: f32 = 100.0;
const CANNY_HIGH: f32 = 120.0;

// 2-means convergence bounds.
const KMEANS_MAX_ITERS: usize = 10;
const KMEANS_EPSILON: f32 = 1.0;

/// Foreground/background extraction, producing a binary cue mask.
pub struct Segmenter {
    method: SegmentMethod,
}

impl Segmenter {
    pub fn new(method: SegmentMethod) -> Self {
        Self { method }
    }
}

impl MaskStage for Segmenter {
    fn segment(&self, frame: &DynamicImage) -> Mask {
        match self.method {
            SegmentMethod::AdaptiveThreshold => {
                let gray = frame.to_luma8();
                let level = otsu_level(&gray);
                threshold(&gray, level, ThresholdType::Binary)
            }
            SegmentMethod::EdgeDetect => canny(&frame.to_luma8(), CANNY_LOW, CANNY_HIGH),
            SegmentMethod::Cluster2 => cluster_two(frame),
            SegmentMethod::None => Mask::new(frame.width(), frame.height()),
        }
    }

    fn name(&self) -> &'static str {
        match self.method {
            SegmentMethod::AdaptiveThreshold => "segment:adaptive-threshold",
            SegmentMethod::EdgeDetect => "segment:edge-detect",
            SegmentMethod::Cluster2 => "segment:cluster-2",
            SegmentMethod::None => "segment:none",
        }
    }
}

/// 2-means over per-pixel feature vectors; the brighter cluster becomes
/// foreground. Seeding is deterministic (first pixel, then the pixel
/// farthest from it), so repeated runs agree.
fn cluster_two(frame: &DynamicImage) -> Mask {
    let (w, h) = (frame.width(), frame.height());
    let features: Vec<[f32; 3]> = match frame {
        DynamicImage::ImageLuma8(gray) => gray
            .pixels()
            .map(|Luma([v])| {
                let v = *v as f32;
                [v, v, v]
            })
            .collect(),
        other => other
            .to_rgb8()
            .pixels()
            .map(|p| [p[0] as f32, p[1] as f32, p[2] as f32])
            .collect(),
    };
    if features.is_empty() {
        return Mask::new(w, h);
    }

    let mut centroids = [features[0], farthest_from(&features, features[0])];
    let mut labels = vec![0u8; features.len()];

    for _ in 0..KMEANS_MAX_ITERS {
        for (label, feature) in labels.iter_mut().zip(&features) {
            *label = if dist2(*feature, centroids[0]) <= dist2(*feature, centroids[1]) {
                0
            } else {
                1
            };
        }

        let mut sums = [[0.0f64; 3]; 2];
        let mut counts = [0usize; 2];
        for (label, feature) in labels.iter().zip(&features) {
            let cluster = *label as usize;
            counts[cluster] += 1;
            for c in 0..3 {
                sums[cluster][c] += feature[c] as f64;
            }
        }

        let mut shift = 0.0f32;
        for cluster in 0..2 {
            if counts[cluster] == 0 {
                continue;
            }
            let updated = [
                (sums[cluster][0] / counts[cluster] as f64) as f32,
                (sums[cluster][1] / counts[cluster] as f64) as f32,
                (sums[cluster][2] / counts[cluster] as f64) as f32,
            ];
            shift = shift.max(dist2(updated, centroids[cluster]).sqrt());
            centroids[cluster] = updated;
        }
        if shift <= KMEANS_EPSILON {
            break;
        }
    }

    let brightness = |c: [f32; 3]| c[0] + c[1] + c[2];
    let foreground: u8 = if brightness(centroids[1]) > brightness(centroids[0]) {
        1
    } else if brightness(centroids[1]) < brightness(centroids[0]) {
        0
    } else {
        // uniform frames collapse both centroids; keep the empty cluster as
        // foreground so nothing lights up
        let count1 = labels.iter().filter(|&&l| l == 1).count();
        if count1 * 2 <= labels.len() { 1 } else { 0 }
    };

    let mut mask = Mask::new(w, h);
    for (out, label) in mask.pixels_mut().zip(&labels) {
        if *label == foreground {
            *out = Luma([255]);
        }
    }
    mask
}

fn farthest_from(features: &[[f32; 3]], origin: [f32; 3]) -> [f32; 3] {
    let mut best = origin;
    let mut best_dist = 0.0f32;
    for feature in features {
        let d = dist2(*feature, origin);
        if d > best_dist {
            best_dist = d;
            best = *feature;
        }
    }
    best
}

fn dist2(a: [f32; 3], b: [f32; 3]) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    dx * dx + dy * dy + dz * dz
}
