use image::{DynamicImage, Luma};

use crate::models::Mask;

// Variance assigned to freshly observed pixels and the floor it may decay
// to; both in squared intensity units.
const VAR_INIT: f32 = 225.0;
const VAR_MIN: f32 = 4.0;

/// Session-scoped motion-cue extractor.
///
/// Maintains a running per-pixel Gaussian (mean and variance of intensity).
/// A pixel whose squared deviation from its mean exceeds
/// `var_threshold * variance` is emitted as changed (255). The learning rate
/// ramps from 1/1 down to 1/history over the warm-up window, then stays at
/// 1/history.
///
/// Frames must arrive in strict temporal order; the statistic is undefined
/// if frames are reordered. Create one model per video session and feed it
/// every frame that is actually processed.
pub struct BackgroundModel {
    history: u32,
    var_threshold: f32,
    frames_seen: u32,
    dimensions: (u32, u32),
    mean: Vec<f32>,
    variance: Vec<f32>,
}

impl BackgroundModel {
    pub fn new(history: u32, var_threshold: f64, detect_shadows: bool) -> Self {
        if detect_shadows {
            log::warn!("shadow detection requested but not modelled; treating as off");
        }
        Self {
            history: history.max(1),
            var_threshold: var_threshold as f32,
            frames_seen: 0,
            dimensions: (0, 0),
            mean: Vec::new(),
            variance: Vec::new(),
        }
    }

    /// Number of frames consumed so far.
    pub fn frames_seen(&self) -> u32 {
        self.frames_seen
    }

    /// Consume the next frame and emit its motion mask.
    pub fn apply(&mut self, frame: &DynamicImage) -> Mask {
        let gray = frame.to_luma8();
        let (w, h) = gray.dimensions();
        let mut mask = Mask::new(w, h);

        if self.frames_seen == 0 || self.dimensions != (w, h) {
            if self.frames_seen != 0 {
                log::warn!(
                    "frame dimensions changed {}x{} -> {w}x{h}; resetting background statistics",
                    self.dimensions.0,
                    self.dimensions.1
                );
            }
            self.dimensions = (w, h);
            self.mean = gray.pixels().map(|Luma([v])| *v as f32).collect();
            self.variance = vec![VAR_INIT; (w * h) as usize];
            self.frames_seen = 1;
            return mask;
        }

        let alpha = 1.0 / self.frames_seen.min(self.history) as f32;
        for (i, (Luma([v]), out)) in gray.pixels().zip(mask.pixels_mut()).enumerate() {
            let value = *v as f32;
            let delta = value - self.mean[i];
            if delta * delta > self.var_threshold * self.variance[i] {
                *out = Luma([255]);
            }
            self.mean[i] += alpha * delta;
            self.variance[i] =
                ((1.0 - alpha) * self.variance[i] + alpha * delta * delta).max(VAR_MIN);
        }
        self.frames_seen += 1;
        mask
    }
}
