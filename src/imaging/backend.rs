//! Pixel work behind the image transforms.
//!
//! [`ImageBackend`] is the seam the renderer and the image processor call
//! through. [`RasterBackend`] decodes and encodes with the `image` crate and
//! renders PDF first pages with the `pdftoppm` executable.

use crate::utils::path::ensure_parent;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
    #[error("`{0}` not found. Please install it first.")]
    MissingTool(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

pub trait ImageBackend {
    /// Pixel size without a full decode.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Write `input` to `output`, shrunk to fit inside `max_size` if given.
    /// Images are never enlarged. The format follows the output extension.
    fn resize_to_fit(
        &self,
        input: &Path,
        output: &Path,
        max_size: Option<(u32, u32)>,
    ) -> Result<(), BackendError>;

    /// Render the first page of a PDF into a raster `output`.
    fn first_page_thumbnail(
        &self,
        input: &Path,
        output: &Path,
        max_size: Option<(u32, u32)>,
    ) -> Result<(), BackendError>;
}

#[derive(Debug, Default)]
pub struct RasterBackend;

const PDFTOPPM: &str = "pdftoppm";

fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {e}", path.display()))
        })
}

fn fit(image: DynamicImage, max_size: Option<(u32, u32)>) -> DynamicImage {
    match max_size {
        Some((w, h)) if image.width() > w || image.height() > h => {
            image.resize(w, h, FilterType::Lanczos3)
        }
        _ => image,
    }
}

fn save_image(image: DynamicImage, output: &Path) -> Result<(), BackendError> {
    let format = ImageFormat::from_path(output).map_err(|e| {
        BackendError::ProcessingFailed(format!("Unsupported output {}: {e}", output.display()))
    })?;
    // Encoders without alpha support need flattened pixels
    let image = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8()),
        ImageFormat::WebP | ImageFormat::Gif => DynamicImage::ImageRgba8(image.to_rgba8()),
        _ => image,
    };
    ensure_parent(output).map_err(|e| BackendError::ProcessingFailed(format!("{e:#}")))?;
    image.save_with_format(output, format).map_err(|e| {
        BackendError::ProcessingFailed(format!("Failed to encode {}: {e}", output.display()))
    })
}

impl ImageBackend for RasterBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = image::image_dimensions(path).map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to identify {}: {e}", path.display()))
        })?;
        Ok(Dimensions { width, height })
    }

    fn resize_to_fit(
        &self,
        input: &Path,
        output: &Path,
        max_size: Option<(u32, u32)>,
    ) -> Result<(), BackendError> {
        let image = fit(load_image(input)?, max_size);
        save_image(image, output)
    }

    fn first_page_thumbnail(
        &self,
        input: &Path,
        output: &Path,
        max_size: Option<(u32, u32)>,
    ) -> Result<(), BackendError> {
        let tool = which::which(PDFTOPPM).map_err(|_| BackendError::MissingTool(PDFTOPPM))?;
        ensure_parent(output).map_err(|e| BackendError::ProcessingFailed(format!("{e:#}")))?;

        // pdftoppm appends `.png` to the prefix it is given
        let prefix: PathBuf = output.with_extension("first-page");
        let page = prefix.with_extension("first-page.png");

        let mut cmd = Command::new(tool);
        cmd.args(["-png", "-f", "1", "-l", "1", "-singlefile"]);
        if let Some((w, h)) = max_size {
            cmd.arg("-scale-to").arg(w.max(h).to_string());
        }
        let status = cmd.arg(input).arg(&prefix).status()?;
        if !status.success() {
            return Err(BackendError::ProcessingFailed(format!(
                "{PDFTOPPM} exited with {status} for {}",
                input.display()
            )));
        }

        let result = self.resize_to_fit(&page, output, max_size);
        let _ = fs::remove_file(&page);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    fn write_png(path: &Path, width: u32, height: u32) {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 10, 10, 128]));
        img.save(path).unwrap();
    }

    #[test]
    fn test_identify() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.png");
        write_png(&src, 40, 20);

        let dims = RasterBackend.identify(&src).unwrap();
        assert_eq!(dims, Dimensions { width: 40, height: 20 });
    }

    #[test]
    fn test_resize_keeps_aspect_ratio() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.png");
        write_png(&src, 400, 200);
        let out = dir.path().join("thumbs/a.jpg");

        RasterBackend.resize_to_fit(&src, &out, Some((100, 100))).unwrap();

        let dims = RasterBackend.identify(&out).unwrap();
        assert_eq!(dims, Dimensions { width: 100, height: 50 });
    }

    #[test]
    fn test_resize_never_enlarges() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("small.png");
        write_png(&src, 30, 10);
        let out = dir.path().join("small.webp");

        RasterBackend.resize_to_fit(&src, &out, Some((5000, 5000))).unwrap();
        assert_eq!(RasterBackend.identify(&out).unwrap().width, 30);
    }

    #[test]
    fn test_decode_failure() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("broken.png");
        fs::write(&src, b"not a png").unwrap();

        let err = RasterBackend
            .resize_to_fit(&src, &dir.path().join("out.png"), None)
            .unwrap_err();
        assert!(matches!(err, BackendError::ProcessingFailed(_)));
    }
}
