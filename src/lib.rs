pub mod config;
pub mod models;
pub mod session;
pub mod stages;

pub use config::{ColorMode, PipelineConfig, PreprocessMethod, SegmentMethod};
pub use models::{CameraIntrinsics, Contour, DetectedObject, FrameOutput, Mask};
pub use session::{
    FrameSink, FrameSource, ImageDirSink, ImageDirSource, MemorySource, SessionDriver,
    SessionSummary,
};
pub use stages::{
    Annotator, BackgroundModel, ColorSpaceTransform, ObjectLocalizer, PostProcessor, Preprocessor,
    Segmenter, TrackingPipeline,
};
