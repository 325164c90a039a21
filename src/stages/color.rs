use image::{DynamicImage, Rgb, RgbImage};

use crate::config::ColorMode;
use crate::stages::FrameStage;

/// Per-frame color-model conversion.
///
/// `Gray` reduces to a single channel; `Hsv` and `Lab` keep a 3-channel
/// layout whose channels carry the transformed basis in OpenCV-compatible
/// 8-bit ranges (H halved into [0, 180), L/a/b rescaled into [0, 255]).
/// `Identity` returns the frame unchanged.
pub struct ColorSpaceTransform {
    mode: ColorMode,
}

impl ColorSpaceTransform {
    pub fn new(mode: ColorMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ColorMode {
        self.mode
    }
}

impl FrameStage for ColorSpaceTransform {
    fn apply(&self, frame: &DynamicImage) -> DynamicImage {
        match self.mode {
            ColorMode::Gray => DynamicImage::ImageLuma8(frame.to_luma8()),
            ColorMode::Hsv => DynamicImage::ImageRgb8(map_rgb(&frame.to_rgb8(), rgb_to_hsv)),
            ColorMode::Lab => DynamicImage::ImageRgb8(map_rgb(&frame.to_rgb8(), rgb_to_lab)),
            ColorMode::Identity => frame.clone(),
        }
    }

    fn name(&self) -> &'static str {
        match self.mode {
            ColorMode::Gray => "color:gray",
            ColorMode::Hsv => "color:hsv",
            ColorMode::Lab => "color:lab",
            ColorMode::Identity => "color:identity",
        }
    }
}

fn map_rgb(image: &RgbImage, f: fn([u8; 3]) -> [u8; 3]) -> RgbImage {
    let mut out = RgbImage::new(image.width(), image.height());
    for (src, dst) in image.pixels().zip(out.pixels_mut()) {
        *dst = Rgb(f(src.0));
    }
    out
}

/// Hue in [0, 180), saturation and value in [0, 255].
fn rgb_to_hsv([r, g, b]: [u8; 3]) -> [u8; 3] {
    let (r, g, b) = (r as f32, g as f32, b as f32);
    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = v - min;

    let s = if v == 0.0 { 0.0 } else { delta * 255.0 / v };
    let mut h = if delta == 0.0 {
        0.0
    } else if v == r {
        60.0 * (g - b) / delta
    } else if v == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    if h < 0.0 {
        h += 360.0;
    }

    [
        ((h / 2.0).round() as u8).min(179),
        s.round() as u8,
        v.round() as u8,
    ]
}

/// CIE L*a*b* under D65, rescaled to 8 bits (L*255/100, a+128, b+128).
fn rgb_to_lab([r, g, b]: [u8; 3]) -> [u8; 3] {
    let (r, g, b) = (r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);

    let x = (0.412453 * r + 0.357580 * g + 0.180423 * b) / 0.950456;
    let y = 0.212671 * r + 0.715160 * g + 0.072169 * b;
    let z = (0.019334 * r + 0.119193 * g + 0.950227 * b) / 1.088754;

    fn f(t: f32) -> f32 {
        if t > 0.008856 {
            t.cbrt()
        } else {
            7.787 * t + 16.0 / 116.0
        }
    }

    let l = if y > 0.008856 {
        116.0 * y.cbrt() - 16.0
    } else {
        903.3 * y
    };
    let a = 500.0 * (f(x) - f(y));
    let b_star = 200.0 * (f(y) - f(z));

    [
        (l * 255.0 / 100.0).round().clamp(0.0, 255.0) as u8,
        (a + 128.0).round().clamp(0.0, 255.0) as u8,
        (b_star + 128.0).round().clamp(0.0, 255.0) as u8,
    ]
}
