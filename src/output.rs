//! Image output

use std::path::Path;

use image::{ImageFormat, RgbImage};

use crate::error::{Result, SonogramError};

/// Pick the image format from the file extension.
pub fn image_format_for(path: &Path) -> Result<ImageFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => Ok(ImageFormat::Png),
        "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
        _ => Err(SonogramError::config(format!(
            "Unsupported image extension for {} (expected .png, .jpg or .jpeg)", path.display()
        ))),
    }
}

pub fn save_image<P: AsRef<Path>>(image: &RgbImage, path: P) -> Result<()> {
    let path = path.as_ref();
    let format = image_format_for(path)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SonogramError::io(format!("Cannot create output directory: {}", e)))?;
        }
    }

    image.save_with_format(path, format)?;
    log::debug!("Saved {}x{} {:?} image: {}", image.width(), image.height(), format, path.display());
    Ok(())
}
