//! Image and PDF derivatives.
//!
//! [`plan`] decides which derived files a source produces; [`backend`] does the
//! pixel work.

pub mod backend;
pub mod plan;

pub use backend::{BackendError, Dimensions, ImageBackend, RasterBackend};
pub use plan::{PlannedTransform, TransformOp, default_transform, transforms_for};

use std::path::Path;

const RASTER_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// `original` or an extension the backend can write.
pub fn is_known_output_type(ty: &str) -> bool {
    let ty = ty.to_ascii_lowercase();
    ty == "original" || ty == "pdf" || ty == "svg" || RASTER_EXTENSIONS.contains(&ty.as_str())
}

fn ext_of(path: &str) -> String {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

pub fn is_raster_image(path: &str) -> bool {
    RASTER_EXTENSIONS.contains(&ext_of(path).as_str())
}

pub fn is_svg(path: &str) -> bool {
    ext_of(path) == "svg"
}

pub fn is_pdf(path: &str) -> bool {
    ext_of(path) == "pdf"
}

/// Sources the transform planner accepts.
pub fn is_transformable(path: &str) -> bool {
    is_raster_image(path) || is_svg(path) || is_pdf(path)
}

pub fn mimetype_for(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}
