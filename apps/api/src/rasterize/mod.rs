//! PDF rasterisation: render the first page of a resume to a PNG via pdfium.
//!
//! pdfium is a C++ library with thread-local state, so rendering runs inside
//! `tokio::task::spawn_blocking` and binds the library per conversion.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use image::DynamicImage;
use pdfium_render::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::DocumentFile;

const UNKNOWN_ERROR: &str = "Unknown error";

/// Conversion failure. `detail` may be absent, in which case callers show a fallback.
#[derive(Debug, Clone, Default, PartialEq, Error)]
#[error("{}", describe_detail(.detail.as_deref()))]
pub struct ConversionError {
    pub detail: Option<String>,
}

impl ConversionError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: Some(detail.into()),
        }
    }

    #[cfg(test)]
    pub fn unknown() -> Self {
        Self { detail: None }
    }

    /// The detail, or "Unknown error" when none (or an empty one) was supplied.
    pub fn describe(&self) -> &str {
        describe_detail(self.detail.as_deref())
    }
}

pub fn describe_detail(detail: Option<&str>) -> &str {
    detail.filter(|d| !d.is_empty()).unwrap_or(UNKNOWN_ERROR)
}

/// Document → image seam.
#[async_trait]
pub trait DocumentRasterizer: Send + Sync {
    async fn convert(&self, document: &DocumentFile) -> Result<DocumentFile, ConversionError>;
}

pub struct PdfiumRasterizer {
    library_path: Option<PathBuf>,
    scale: f32,
}

impl PdfiumRasterizer {
    pub fn new(library_path: Option<PathBuf>, scale: f32) -> Self {
        Self {
            library_path,
            scale,
        }
    }
}

#[async_trait]
impl DocumentRasterizer for PdfiumRasterizer {
    async fn convert(&self, document: &DocumentFile) -> Result<DocumentFile, ConversionError> {
        if !document.is_pdf() {
            return Err(ConversionError::new(format!(
                "{} is not a PDF document",
                document.file_name
            )));
        }

        let bytes = document.bytes.to_vec();
        let library_path = self.library_path.clone();
        let scale = self.scale;

        let image = tokio::task::spawn_blocking(move || {
            render_first_page(library_path.as_deref(), bytes, scale)
        })
        .await
        .map_err(|e| ConversionError::new(format!("Render task panicked: {e}")))??;

        let png = encode_png(&image)?;
        info!(
            "Rendered {} → {}x{} px PNG ({} bytes)",
            document.file_name,
            image.width(),
            image.height(),
            png.len()
        );

        Ok(DocumentFile::new(
            image_file_name(&document.file_name),
            "image/png",
            Bytes::from(png),
        ))
    }
}

fn bind_pdfium(library_path: Option<&Path>) -> Result<Pdfium, ConversionError> {
    let bindings = match library_path {
        Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| ConversionError::new(format!("pdfium library unavailable: {e:?}")))?;
    Ok(Pdfium::new(bindings))
}

/// Blocking implementation of first-page rendering.
fn render_first_page(
    library_path: Option<&Path>,
    bytes: Vec<u8>,
    scale: f32,
) -> Result<DynamicImage, ConversionError> {
    let pdfium = bind_pdfium(library_path)?;

    let document = pdfium
        .load_pdf_from_byte_vec(bytes, None)
        .map_err(|e| ConversionError::new(format!("Failed to open PDF: {e:?}")))?;

    let page = document
        .pages()
        .first()
        .map_err(|e| ConversionError::new(format!("PDF has no pages: {e:?}")))?;

    let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);
    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| ConversionError::new(format!("Failed to render page 1: {e:?}")))?;

    let image = bitmap.as_image();
    debug!("Rendered page 1 → {}x{} px", image.width(), image.height());
    Ok(image)
}

/// Lossless PNG keeps text crisp for the vision model.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, ConversionError> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| ConversionError::new(format!("Failed to encode PNG: {e}")))?;
    Ok(buf)
}

/// `resume.pdf` → `resume.png`.
pub fn image_file_name(document_name: &str) -> String {
    let stem = match document_name.rsplit_once('.') {
        Some((stem, _ext)) => stem,
        None => document_name,
    };
    let stem = if stem.is_empty() { "resume" } else { stem };
    format!("{stem}.png")
}
