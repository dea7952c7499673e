//! Screen capture and text recognition.
//!
//! Captures serve two purposes: the diagnostic artifact written on fatal
//! failures, and the screenshot region handed to OCR for search-result
//! detection. OCR is a capability behind a trait; the default backing is a
//! spawned `tesseract` binary, and its absence means "no detection", never
//! a failed run.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{anyhow, Context};
use image::RgbaImage;

pub struct ScreenCapture;

impl ScreenCapture {
    /// Capture the entire primary monitor.
    pub fn capture_primary() -> anyhow::Result<RgbaImage> {
        let monitors =
            xcap::Monitor::all().map_err(|e| anyhow!("failed to get monitors: {}", e))?;
        let primary = monitors
            .into_iter()
            .find(|m| m.is_primary())
            .ok_or_else(|| anyhow!("no primary monitor found"))?;
        primary
            .capture_image()
            .map_err(|e| anyhow!("failed to capture screen: {}", e))
    }

    /// Capture the screen and write it to `dir` under a UTC-stamped name.
    pub fn save_to_dir(dir: &Path) -> anyhow::Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating capture dir {}", dir.display()))?;
        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
        let path = dir.join(format!("pagepilot_{stamp}.png"));
        let image = Self::capture_primary()?;
        image
            .save(&path)
            .with_context(|| format!("writing capture {}", path.display()))?;
        Ok(path)
    }

    /// Clamp-and-crop a region out of a capture. A region that falls
    /// outside the image yields an empty crop rather than a panic.
    pub fn crop(image: &RgbaImage, x: u32, y: u32, width: u32, height: u32) -> RgbaImage {
        let x = x.min(image.width());
        let y = y.min(image.height());
        let w = width.min(image.width() - x);
        let h = height.min(image.height() - y);
        image::imageops::crop_imm(image, x, y, w, h).to_image()
    }
}

/// Optical text recognition over an image. Implementations are consulted
/// for optional checks only; callers treat errors as "nothing recognized".
pub trait TextRecognizer {
    fn recognize(&self, image: &RgbaImage) -> anyhow::Result<String>;
}

/// OCR via a spawned `tesseract` binary. Missing binary or a failed run
/// surfaces as an error the caller downgrades to no-detection.
pub struct TesseractCli {
    /// Language pack argument, e.g. `chi_sim+eng`.
    pub langs: String,
}

impl TesseractCli {
    pub fn new(langs: impl Into<String>) -> Self {
        Self { langs: langs.into() }
    }
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self::new("chi_sim+eng")
    }
}

impl TextRecognizer for TesseractCli {
    fn recognize(&self, image: &RgbaImage) -> anyhow::Result<String> {
        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%fZ");
        let tmp = std::env::temp_dir().join(format!("pagepilot_ocr_{stamp}.png"));
        image
            .save(&tmp)
            .with_context(|| format!("writing OCR temp image {}", tmp.display()))?;

        let output = Command::new("tesseract")
            .arg(&tmp)
            .arg("stdout")
            .args(["-l", &self.langs])
            .output();
        let _ = std::fs::remove_file(&tmp);

        let output = output.context("tesseract binary not available")?;
        if !output.status.success() {
            return Err(anyhow!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crop_clamps_out_of_bounds_regions() {
        let img = RgbaImage::new(100, 50);
        let crop = ScreenCapture::crop(&img, 80, 40, 400, 300);
        assert_eq!((crop.width(), crop.height()), (20, 10));
        let empty = ScreenCapture::crop(&img, 200, 100, 10, 10);
        assert_eq!((empty.width(), empty.height()), (0, 0));
    }
}
