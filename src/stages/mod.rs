pub mod annotate;
pub mod background;
pub mod color;
pub mod fusion;
pub mod localize;
pub mod postprocess;
pub mod preprocess;
pub mod segment;

use anyhow::Result;
use image::DynamicImage;

use crate::config::PipelineConfig;
use crate::models::{FrameOutput, Mask};

pub use annotate::Annotator;
pub use background::BackgroundModel;
pub use color::ColorSpaceTransform;
pub use localize::ObjectLocalizer;
pub use postprocess::PostProcessor;
pub use preprocess::Preprocessor;
pub use segment::Segmenter;

/// A stateless per-frame image transform, selected once at configuration
/// time.
pub trait FrameStage: Send + Sync {
    fn apply(&self, frame: &DynamicImage) -> DynamicImage;

    /// Human-readable name for this stage (used in trace output).
    fn name(&self) -> &'static str;
}

/// A stateless stage turning a frame into a binary foreground mask.
pub trait MaskStage: Send + Sync {
    fn segment(&self, frame: &DynamicImage) -> Mask;

    fn name(&self) -> &'static str;
}

/// One segmentation cue: color transform, then smoothing, then
/// foreground extraction.
pub struct CueBranch {
    pub color: ColorSpaceTransform,
    pub preprocess: Preprocessor,
    pub segment: Segmenter,
}

impl CueBranch {
    pub fn cue_mask(&self, frame: &DynamicImage) -> Mask {
        let mut working = frame.clone();
        for stage in [&self.color as &dyn FrameStage, &self.preprocess as &dyn FrameStage] {
            working = stage.apply(&working);
            log::trace!("{}: {}x{}", stage.name(), working.width(), working.height());
        }
        self.segment.segment(&working)
    }
}

/// Full single-frame tracking pipeline.
///
/// Two cue branches and the motion mask are OR'd together, cleaned up, and
/// the surviving contours localized in 3D. The embedded [`BackgroundModel`]
/// accumulates ordered per-pixel statistics, so one pipeline instance must
/// see every processed frame of exactly one session, in order.
pub struct TrackingPipeline {
    cue_a: CueBranch,
    cue_b: CueBranch,
    background: BackgroundModel,
    post: PostProcessor,
    localizer: ObjectLocalizer,
}

impl TrackingPipeline {
    /// Build the pipeline for one session. Fails on invalid parameters.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        let branch = |mode| CueBranch {
            color: ColorSpaceTransform::new(mode),
            preprocess: Preprocessor::new(config.preprocess, config.preprocess_kernel),
            segment: Segmenter::new(config.segment),
        };
        Ok(Self {
            cue_a: branch(config.cue_a_color),
            cue_b: branch(config.cue_b_color),
            background: BackgroundModel::new(
                config.bg_history,
                config.bg_var_threshold,
                config.bg_detect_shadows,
            ),
            post: PostProcessor::new(config.kernel_open, config.kernel_close, config.area_ratio),
            localizer: ObjectLocalizer::new(config.camera, config.known_radius),
        })
    }

    /// Run every stage over one frame and return the per-frame result.
    pub fn process_frame(&mut self, frame: &DynamicImage) -> Result<FrameOutput> {
        let mask_a = self.cue_a.cue_mask(frame);
        let mask_b = self.cue_b.cue_mask(frame);
        let cue_mask = fusion::or(&mask_a, &mask_b);

        let motion_mask = self.background.apply(frame);
        let combined = fusion::or(&cue_mask, &motion_mask);

        let (mask, contours) = self.post.apply(&combined);
        let detections = self.localizer.localize(&contours, frame.width(), frame.height());
        log::debug!(
            "frame {}x{}: {} contour(s), {} detection(s)",
            frame.width(),
            frame.height(),
            contours.len(),
            detections.len()
        );

        Ok(FrameOutput { mask, detections })
    }
}
