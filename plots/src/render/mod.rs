use crate::PlotBytes;
use anyhow::{Result, anyhow};
use image::{ExtendedColorType, ImageEncoder};
use std::fmt::Display;
use std::path::Path;

/// Image formats a plot can be saved as, chosen from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Svg,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("png") => Ok(OutputFormat::Png),
            Some("svg") => Ok(OutputFormat::Svg),
            _ => Err(anyhow!(
                "Unsupported plot format for {}: expected a .png or .svg path",
                path.display()
            )),
        }
    }
}

/// Encode an RGB pixel buffer as PNG
pub fn encode_png(pixels: &[u8], width: u32, height: u32) -> Result<PlotBytes> {
    let expected = (width as usize) * (height as usize) * 3;
    if pixels.len() != expected {
        return Err(anyhow!(
            "plot buffer has {} bytes, expected {} for {}x{}",
            pixels.len(),
            expected,
            width,
            height
        ));
    }

    // PNG of a plot compresses well below the raw size
    let mut encoded = Vec::with_capacity(expected / 8);
    image::codecs::png::PngEncoder::new(&mut encoded)
        .write_image(pixels, width, height, ExtendedColorType::Rgb8)
        .map_err(|e| anyhow!("failed to PNG encode plot: {e}"))?;
    Ok(encoded)
}

/// Convert plotters errors, which are not `'static` for generic backends
pub(crate) trait DrawResultExt<T> {
    fn draw_context(self, what: &str) -> Result<T>;
}

impl<T, E: Display> DrawResultExt<T> for std::result::Result<T, E> {
    fn draw_context(self, what: &str) -> Result<T> {
        self.map_err(|e| anyhow!("failed to {what}: {e}"))
    }
}
