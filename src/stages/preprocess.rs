use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use imageproc::filter::{bilateral_filter, gaussian_blur_f32, median_filter};
use imageproc::morphology::{Mask as StructuringElement, grayscale_close, grayscale_open};

use crate::config::PreprocessMethod;
use crate::stages::FrameStage;

// Fixed bilateral parameters, matching the usual d=9, sigma=75 tuning.
const BILATERAL_WINDOW: u32 = 9;
const BILATERAL_SIGMA: f32 = 75.0;

/// Per-frame noise suppression.
///
/// Blur methods trade edge sharpness for noise suppression; morphological
/// opening/closing trade small-object preservation against speckle and hole
/// removal. `OpenClose` composes both directions with the same kernel.
pub struct Preprocessor {
    method: PreprocessMethod,
    kernel_size: u32,
}

impl Preprocessor {
    /// `kernel_size` must be odd and positive (validated at config time).
    pub fn new(method: PreprocessMethod, kernel_size: u32) -> Self {
        Self { method, kernel_size }
    }

    /// Square structuring-element radius for this kernel size.
    fn radius(&self) -> u8 {
        ((self.kernel_size - 1) / 2).min(u8::MAX as u32) as u8
    }

    /// Gaussian sigma derived from the kernel size the way OpenCV derives
    /// it when none is given.
    fn sigma(&self) -> f32 {
        0.3 * ((self.kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
    }
}

impl FrameStage for Preprocessor {
    fn apply(&self, frame: &DynamicImage) -> DynamicImage {
        let radius = self.radius();
        match self.method {
            PreprocessMethod::GaussianBlur => match frame {
                DynamicImage::ImageLuma8(gray) => {
                    DynamicImage::ImageLuma8(gaussian_blur_f32(gray, self.sigma()))
                }
                other => DynamicImage::ImageRgb8(gaussian_blur_f32(&other.to_rgb8(), self.sigma())),
            },
            PreprocessMethod::MedianBlur => match frame {
                DynamicImage::ImageLuma8(gray) => {
                    DynamicImage::ImageLuma8(median_filter(gray, radius as u32, radius as u32))
                }
                other => DynamicImage::ImageRgb8(median_filter(
                    &other.to_rgb8(),
                    radius as u32,
                    radius as u32,
                )),
            },
            PreprocessMethod::BilateralBlur => apply_channelwise(frame, |gray| {
                bilateral_filter(gray, BILATERAL_WINDOW, BILATERAL_SIGMA, BILATERAL_SIGMA)
            }),
            PreprocessMethod::MorphOpen => {
                let kernel = StructuringElement::square(radius);
                apply_channelwise(frame, |gray| grayscale_open(gray, &kernel))
            }
            PreprocessMethod::MorphClose => {
                let kernel = StructuringElement::square(radius);
                apply_channelwise(frame, |gray| grayscale_close(gray, &kernel))
            }
            PreprocessMethod::OpenClose => {
                let kernel = StructuringElement::square(radius);
                apply_channelwise(frame, |gray| {
                    grayscale_close(&grayscale_open(gray, &kernel), &kernel)
                })
            }
            PreprocessMethod::Identity => frame.clone(),
        }
    }

    fn name(&self) -> &'static str {
        match self.method {
            PreprocessMethod::GaussianBlur => "preprocess:gaussian-blur",
            PreprocessMethod::BilateralBlur => "preprocess:bilateral-blur",
            PreprocessMethod::MedianBlur => "preprocess:median-blur",
            PreprocessMethod::MorphOpen => "preprocess:morphological-open",
            PreprocessMethod::MorphClose => "preprocess:morphological-close",
            PreprocessMethod::OpenClose => "preprocess:open-then-close",
            PreprocessMethod::Identity => "preprocess:identity",
        }
    }
}

/// Run a single-channel filter over a frame, splitting 3-channel frames
/// into planes and recombining afterwards.
fn apply_channelwise(frame: &DynamicImage, f: impl Fn(&GrayImage) -> GrayImage) -> DynamicImage {
    match frame {
        DynamicImage::ImageLuma8(gray) => DynamicImage::ImageLuma8(f(gray)),
        other => {
            let rgb = other.to_rgb8();
            let planes = split_planes(&rgb).map(|plane| f(&plane));
            DynamicImage::ImageRgb8(merge_planes(&planes))
        }
    }
}

fn split_planes(image: &RgbImage) -> [GrayImage; 3] {
    let (w, h) = image.dimensions();
    let mut planes = [GrayImage::new(w, h), GrayImage::new(w, h), GrayImage::new(w, h)];
    for (x, y, pixel) in image.enumerate_pixels() {
        for (c, plane) in planes.iter_mut().enumerate() {
            plane.put_pixel(x, y, Luma([pixel[c]]));
        }
    }
    planes
}

fn merge_planes(planes: &[GrayImage; 3]) -> RgbImage {
    let (w, h) = planes[0].dimensions();
    let mut out = RgbImage::new(w, h);
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        *pixel = Rgb([
            planes[0].get_pixel(x, y)[0],
            planes[1].get_pixel(x, y)[0],
            planes[2].get_pixel(x, y)[0],
        ]);
    }
    out
}
