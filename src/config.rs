use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Deserializer};

use crate::models::CameraIntrinsics;

/// Target color representation for a cue branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Hsv,
    Lab,
    Gray,
    /// Pass the frame through unchanged. Also the fallback for
    /// unrecognized mode names.
    Identity,
}

impl ColorMode {
    /// Parse a mode name, degrading to `Identity` (with a warning) on
    /// anything unrecognized rather than failing the session.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "hsv" => Self::Hsv,
            "lab" => Self::Lab,
            "gray" | "grey" => Self::Gray,
            "identity" | "none" => Self::Identity,
            other => {
                log::warn!("unrecognized color mode {other:?}, falling back to identity");
                Self::Identity
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Hsv => "hsv",
            Self::Lab => "lab",
            Self::Gray => "gray",
            Self::Identity => "identity",
        }
    }
}

impl<'de> Deserialize<'de> for ColorMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_name(&name))
    }
}

/// Noise-suppression filter applied to each cue branch before segmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreprocessMethod {
    GaussianBlur,
    BilateralBlur,
    MedianBlur,
    MorphOpen,
    MorphClose,
    OpenClose,
    /// No-op. Also the fallback for unrecognized method names.
    Identity,
}

impl PreprocessMethod {
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "gaussian-blur" | "gaussian" => Self::GaussianBlur,
            "bilateral-blur" | "bilateral" => Self::BilateralBlur,
            "median-blur" | "median" => Self::MedianBlur,
            "morphological-open" | "opening" => Self::MorphOpen,
            "morphological-close" | "closing" => Self::MorphClose,
            "open-then-close" | "open-close" => Self::OpenClose,
            "identity" | "none" => Self::Identity,
            other => {
                log::warn!("unrecognized preprocess method {other:?}, falling back to identity");
                Self::Identity
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::GaussianBlur => "gaussian-blur",
            Self::BilateralBlur => "bilateral-blur",
            Self::MedianBlur => "median-blur",
            Self::MorphOpen => "morphological-open",
            Self::MorphClose => "morphological-close",
            Self::OpenClose => "open-then-close",
            Self::Identity => "identity",
        }
    }
}

impl<'de> Deserialize<'de> for PreprocessMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_name(&name))
    }
}

/// Foreground extraction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentMethod {
    /// Otsu's global threshold on intensity.
    AdaptiveThreshold,
    /// Canny edges with fixed 100/120 thresholds; yields thin boundaries,
    /// not filled regions.
    EdgeDetect,
    /// Two-cluster k-means over per-pixel feature vectors.
    Cluster2,
    /// All-zero mask. Also the fallback for unrecognized method names.
    None,
}

impl SegmentMethod {
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "adaptive-threshold" | "threshold" | "otsu" => Self::AdaptiveThreshold,
            "edge-detect" | "canny" => Self::EdgeDetect,
            "cluster-2" | "kmeans" => Self::Cluster2,
            "none" => Self::None,
            other => {
                log::warn!("unrecognized segmentation method {other:?}, masks will be empty");
                Self::None
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::AdaptiveThreshold => "adaptive-threshold",
            Self::EdgeDetect => "edge-detect",
            Self::Cluster2 => "cluster-2",
            Self::None => "none",
        }
    }
}

impl<'de> Deserialize<'de> for SegmentMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_name(&name))
    }
}

/// Session-wide pipeline configuration. Built once before the first frame
/// and immutable afterwards.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Color representation of the first cue branch.
    pub cue_a_color: ColorMode,
    /// Color representation of the second cue branch.
    pub cue_b_color: ColorMode,
    pub preprocess: PreprocessMethod,
    /// Preprocessing kernel size (odd, positive).
    pub preprocess_kernel: u32,
    pub segment: SegmentMethod,
    /// Kernel size of the speckle-removing opening (odd, positive).
    pub kernel_open: u32,
    /// Kernel size of the hole-filling closing (odd, positive).
    pub kernel_close: u32,
    /// Contours below this fraction of the frame area are discarded.
    pub area_ratio: f64,
    /// Background model history length in frames.
    pub bg_history: u32,
    /// Background model squared-deviation sensitivity.
    pub bg_var_threshold: f64,
    /// Accepted for completeness; shadow labelling is not modelled.
    pub bg_detect_shadows: bool,
    pub camera: CameraIntrinsics,
    /// Real-world radius of the tracked object; sets the unit of the
    /// recovered 3D positions.
    pub known_radius: f64,
    /// Process every Nth frame; skipped frames re-emit the previous output.
    pub frame_skip: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cue_a_color: ColorMode::Gray,
            cue_b_color: ColorMode::Hsv,
            preprocess: PreprocessMethod::OpenClose,
            preprocess_kernel: 7,
            segment: SegmentMethod::AdaptiveThreshold,
            kernel_open: 11,
            kernel_close: 9,
            area_ratio: 0.004,
            bg_history: 50,
            bg_var_threshold: 12.0,
            bg_detect_shadows: false,
            camera: CameraIntrinsics {
                fx: 2564.318_686_9,
                fy: 2569.702_731_11,
                cx: 0.0,
                cy: 0.0,
            },
            known_radius: 10.0,
            frame_skip: 2,
        }
    }
}

fn check_kernel(name: &str, k: u32) -> Result<()> {
    if k == 0 || k % 2 == 0 {
        bail!("{name} must be an odd positive kernel size, got {k}");
    }
    Ok(())
}

impl PipelineConfig {
    /// Load a configuration from a JSON file and validate it.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        check_kernel("preprocess_kernel", self.preprocess_kernel)?;
        check_kernel("kernel_open", self.kernel_open)?;
        check_kernel("kernel_close", self.kernel_close)?;
        if !(0.0..=1.0).contains(&self.area_ratio) {
            bail!("area_ratio must lie in [0, 1], got {}", self.area_ratio);
        }
        if !self.camera.is_valid() {
            bail!(
                "camera intrinsics must have finite positive focal lengths, got fx={} fy={}",
                self.camera.fx,
                self.camera.fy
            );
        }
        if !(self.known_radius.is_finite() && self.known_radius > 0.0) {
            bail!("known_radius must be positive, got {}", self.known_radius);
        }
        if self.bg_history == 0 {
            bail!("bg_history must be at least 1");
        }
        if !(self.bg_var_threshold.is_finite() && self.bg_var_threshold > 0.0) {
            bail!("bg_var_threshold must be positive, got {}", self.bg_var_threshold);
        }
        if self.frame_skip == 0 {
            bail!("frame_skip must be at least 1");
        }
        Ok(())
    }
}
