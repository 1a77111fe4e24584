//! Document rasterizer: first page of an uploaded PDF to a PNG byte buffer.
//!
//! Uses MuPDF for page rendering and the `image` crate for PNG encoding.
//! Rasterization is synchronous; callers on the async runtime wrap it in
//! `tokio::task::spawn_blocking`.

pub mod cache;

pub use cache::RasterCache;

use std::io::Cursor;

use bytes::Bytes;
use image::DynamicImage;
use mupdf::{Colorspace, Document, Matrix};
use thiserror::Error;

/// MIME tag carried alongside every rasterized page.
pub const PNG_MIME: &str = "image/png";

/// Render scale applied to the page's native size. 2.0 ≈ 144 DPI, enough
/// for the model to read resume body text.
const RENDER_SCALE: f32 = 2.0;

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("uploaded file is empty")]
    EmptyInput,

    #[error("uploaded file is not a PDF")]
    NotAPdf,

    #[error("PDF could not be parsed: {0}")]
    Parse(String),

    #[error("PDF has no pages")]
    NoPages,

    #[error("page could not be rendered: {0}")]
    Render(String),

    #[error("PNG encoding failed: {0}")]
    Encode(String),
}

/// A PDF first page rendered to an image, immutable once produced.
#[derive(Debug, Clone)]
pub struct RasterizedPage {
    pub png: Bytes,
    pub mime_type: &'static str,
}

/// Rasterizer seam. Carried in `AppState` as `Arc<dyn PageRasterizer>` so
/// handler tests can substitute a stub backend.
pub trait PageRasterizer: Send + Sync {
    fn rasterize_first_page(&self, pdf: &[u8]) -> Result<RasterizedPage, ConversionError>;
}

/// MuPDF-backed rasterizer.
pub struct MupdfRasterizer;

impl MupdfRasterizer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MupdfRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl PageRasterizer for MupdfRasterizer {
    fn rasterize_first_page(&self, pdf: &[u8]) -> Result<RasterizedPage, ConversionError> {
        if pdf.is_empty() {
            return Err(ConversionError::EmptyInput);
        }
        // Reject non-PDF uploads before handing bytes to MuPDF.
        if !pdf.starts_with(b"%PDF-") {
            return Err(ConversionError::NotAPdf);
        }

        let doc = Document::from_bytes(pdf, "application/pdf")
            .map_err(|e| ConversionError::Parse(e.to_string()))?;

        let page_count = doc
            .page_count()
            .map_err(|e| ConversionError::Parse(e.to_string()))?;
        if page_count == 0 {
            return Err(ConversionError::NoPages);
        }

        // Only the first page is analyzed; later pages are ignored.
        let page = doc
            .load_page(0)
            .map_err(|e| ConversionError::Render(e.to_string()))?;

        let matrix = Matrix::new_scale(RENDER_SCALE, RENDER_SCALE);
        let colorspace = Colorspace::device_rgb();
        let pixmap = page
            .to_pixmap(&matrix, &colorspace, true, false)
            .map_err(|e| ConversionError::Render(e.to_string()))?;

        let png = encode_pixmap_png(&pixmap)?;

        Ok(RasterizedPage {
            png: Bytes::from(png),
            mime_type: PNG_MIME,
        })
    }
}

/// Converts a MuPDF pixmap (3 or 4 samples per pixel) to an RGBA buffer and
/// encodes it as PNG.
fn encode_pixmap_png(pixmap: &mupdf::Pixmap) -> Result<Vec<u8>, ConversionError> {
    let width = pixmap.width() as u32;
    let height = pixmap.height() as u32;
    let samples = pixmap.samples();
    let n = pixmap.n() as usize;

    let mut rgba_buffer = Vec::with_capacity((width * height * 4) as usize);

    for y in 0..height as usize {
        for x in 0..width as usize {
            let offset = (y * width as usize + x) * n;
            let r = samples.get(offset).copied().unwrap_or(0);
            let g = samples.get(offset + 1).copied().unwrap_or(0);
            let b = samples.get(offset + 2).copied().unwrap_or(0);
            let a = if n >= 4 {
                samples.get(offset + 3).copied().unwrap_or(255)
            } else {
                255
            };
            rgba_buffer.extend_from_slice(&[r, g, b, a]);
        }
    }

    let img = image::RgbaImage::from_raw(width, height, rgba_buffer)
        .ok_or_else(|| ConversionError::Encode("failed to create image buffer".to_string()))?;

    let mut output = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut output), image::ImageFormat::Png)
        .map_err(|e| ConversionError::Encode(e.to_string()))?;

    Ok(output)
}

/// Builds a minimal valid one-page PDF with `text` drawn in Helvetica.
/// Shared by rasterizer and handler tests.
#[cfg(test)]
pub(crate) fn minimal_pdf(text: &str) -> Vec<u8> {
    let content = format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET");
    let objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
         /Resources << /Font << /F1 4 0 R >> >> /Contents 5 0 R >>"
            .to_string(),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
        format!(
            "<< /Length {} >>\nstream\n{content}\nendstream",
            content.len()
        ),
    ];

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::new();
    for (i, obj) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{obj}\nendobj\n", i + 1).as_bytes());
    }

    let xref_at = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for off in &offsets {
        out.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
            objects.len() + 1
        )
        .as_bytes(),
    );
    out
}
