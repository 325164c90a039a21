use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use image::{DynamicImage, ImageReader, RgbImage};

use crate::config::PipelineConfig;
use crate::models::FrameOutput;
use crate::stages::{Annotator, TrackingPipeline};

/// Ordered supplier of fixed-resolution frames.
///
/// `Ok(None)` signals clean end-of-sequence. Constructors should fail when
/// the underlying source cannot be opened; mid-stream read errors are
/// per-frame failures the driver isolates.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<DynamicImage>>;
}

/// Optional consumer of the annotated frame stream. The pipeline works
/// identically with no sink attached.
pub trait FrameSink {
    fn consume(&mut self, frame: &RgbImage) -> Result<()>;
}

/// Frame source backed by the sorted image files of one directory — the
/// decoded stand-in for a video stream.
pub struct ImageDirSource {
    paths: VecDeque<PathBuf>,
}

impl ImageDirSource {
    /// Fails if the directory cannot be read or holds no image files
    /// (fatal at session initialization).
    pub fn open(dir: &Path) -> Result<Self> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("cannot open frame directory {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                matches!(
                    p.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref(),
                    Some("png" | "jpg" | "jpeg" | "bmp")
                )
            })
            .collect();
        if paths.is_empty() {
            bail!("no image frames found in {}", dir.display());
        }
        paths.sort();
        Ok(Self { paths: paths.into() })
    }
}

impl FrameSource for ImageDirSource {
    fn next_frame(&mut self) -> Result<Option<DynamicImage>> {
        let Some(path) = self.paths.pop_front() else {
            return Ok(None);
        };
        let frame = ImageReader::open(&path)
            .with_context(|| format!("failed to open frame {}", path.display()))?
            .decode()
            .with_context(|| format!("failed to decode frame {}", path.display()))?;
        Ok(Some(frame))
    }
}

/// In-memory frame source, mainly for tests and embedding.
pub struct MemorySource {
    frames: VecDeque<DynamicImage>,
}

impl MemorySource {
    pub fn new(frames: Vec<DynamicImage>) -> Self {
        Self { frames: frames.into() }
    }
}

impl FrameSource for MemorySource {
    fn next_frame(&mut self) -> Result<Option<DynamicImage>> {
        Ok(self.frames.pop_front())
    }
}

/// Sink writing numbered PNGs into a directory.
pub struct ImageDirSink {
    dir: PathBuf,
    index: u64,
}

impl ImageDirSink {
    pub fn create(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("cannot create output directory {}", dir.display()))?;
        Ok(Self { dir: dir.to_path_buf(), index: 0 })
    }
}

impl FrameSink for ImageDirSink {
    fn consume(&mut self, frame: &RgbImage) -> Result<()> {
        let path = self.dir.join(format!("{:06}.png", self.index));
        self.index += 1;
        frame
            .save(&path)
            .with_context(|| format!("failed to save annotated frame {}", path.display()))
    }
}

/// End-of-session accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Frames pulled from the source.
    pub frames_read: u64,
    /// Frames that went through the full pipeline.
    pub frames_processed: u64,
    /// Processed frames whose pipeline run failed and was isolated.
    pub frames_failed: u64,
    /// Total detections over all processed frames.
    pub detections: u64,
}

/// Per-session frame loop.
///
/// Owns the pipeline (and with it the background model) for exactly one
/// session, applies the frame-skip policy, re-emits the last good annotated
/// frame for skipped or failed frames, and isolates per-frame failures so a
/// single bad frame never aborts the session.
pub struct SessionDriver {
    pipeline: TrackingPipeline,
    annotator: Annotator,
    frame_skip: u64,
    last_annotated: Option<RgbImage>,
    last_output: Option<FrameOutput>,
}

impl SessionDriver {
    pub fn new(config: &PipelineConfig, annotator: Annotator) -> Result<Self> {
        Ok(Self {
            pipeline: TrackingPipeline::from_config(config)?,
            annotator,
            frame_skip: config.frame_skip as u64,
            last_annotated: None,
            last_output: None,
        })
    }

    /// Result of the most recent successfully processed frame.
    pub fn last_output(&self) -> Option<&FrameOutput> {
        self.last_output.as_ref()
    }

    /// Pull frames until the source is exhausted.
    pub fn run(
        &mut self,
        source: &mut dyn FrameSource,
        mut sink: Option<&mut dyn FrameSink>,
    ) -> Result<SessionSummary> {
        let mut summary = SessionSummary::default();
        let mut frame_index = 0u64;

        loop {
            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(err) => {
                    log::error!("frame {frame_index} unreadable, continuing: {err:#}");
                    summary.frames_failed += 1;
                    frame_index += 1;
                    continue;
                }
            };
            summary.frames_read += 1;

            if frame_index % self.frame_skip == 0 {
                match self.pipeline.process_frame(&frame) {
                    Ok(output) => {
                        summary.frames_processed += 1;
                        summary.detections += output.detections.len() as u64;
                        self.last_annotated =
                            Some(self.annotator.annotate(&frame, &output.detections));
                        self.last_output = Some(output);
                    }
                    Err(err) => {
                        // keep the previous frame's result and move on
                        log::error!("frame {frame_index} failed, continuing: {err:#}");
                        summary.frames_failed += 1;
                    }
                }
            }

            if let Some(sink) = sink.as_deref_mut() {
                match &self.last_annotated {
                    Some(annotated) => sink.consume(annotated)?,
                    None => sink.consume(&frame.to_rgb8())?,
                }
            }
            frame_index += 1;
        }

        Ok(summary)
    }
}
