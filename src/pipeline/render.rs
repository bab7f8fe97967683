//! PDF rasterisation: render every page of an uploaded PDF to `DynamicImage`.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! [`render_pages`] moves the work onto tokio's blocking pool so request
//! handlers never stall a worker thread while a scan renders.
//!
//! ## Why cap pixels, not DPI?
//!
//! Phone scans arrive at arbitrary physical sizes. `max_rendered_pixels` caps
//! the longest edge regardless, keeping memory bounded and the image inside
//! the size range vision models read handwriting well at.

use crate::config::{MAX_RENDERED_PIXELS, MIN_RENDERED_PIXELS};
use crate::error::GraderError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Converts raw PDF bytes into page images in document order.
///
/// Implementations are blocking; call them through [`render_pages`].
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, pdf: &[u8]) -> Result<Vec<DynamicImage>, GraderError>;
}

/// Rasterise `pdf` on the blocking thread pool.
pub async fn render_pages(
    rasterizer: Arc<dyn Rasterizer>,
    pdf: Vec<u8>,
) -> Result<Vec<DynamicImage>, GraderError> {
    tokio::task::spawn_blocking(move || rasterizer.rasterize(&pdf))
        .await
        .map_err(|e| GraderError::Internal(format!("Render task panicked: {}", e)))?
}

/// pdfium-backed [`Rasterizer`].
#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    lib_path: Option<PathBuf>,
    max_pixels: u32,
}

impl PdfiumRasterizer {
    /// `lib_path` may name the libpdfium file itself or the directory holding it.
    /// `max_pixels` is clamped like `AppConfigBuilder::max_rendered_pixels`.
    pub fn new(lib_path: Option<PathBuf>, max_pixels: u32) -> Self {
        Self {
            lib_path,
            max_pixels: max_pixels.clamp(MIN_RENDERED_PIXELS, MAX_RENDERED_PIXELS),
        }
    }

    /// Longest edge as the `i32` pdfium expects.
    fn edge(&self) -> i32 {
        i32::try_from(self.max_pixels).unwrap_or(i32::MAX)
    }

    fn bind(&self) -> Result<Pdfium, GraderError> {
        let bindings = match &self.lib_path {
            Some(path) => Pdfium::bind_to_library(library_file(path)),
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| GraderError::PdfiumBindingFailed(format!("{:?}", e)))?;

        Ok(Pdfium::new(bindings))
    }
}

/// Resolve a directory to the platform library name inside it.
fn library_file(path: &Path) -> PathBuf {
    if path.is_dir() {
        Pdfium::pdfium_platform_library_name_at_path(path)
    } else {
        path.to_path_buf()
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn rasterize(&self, pdf: &[u8]) -> Result<Vec<DynamicImage>, GraderError> {
        let pdfium = self.bind()?;

        let document = pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(|e| GraderError::CorruptPdf {
                detail: format!("{:?}", e),
            })?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        info!("PDF loaded: {} pages", total_pages);

        if total_pages == 0 {
            return Err(GraderError::NoPages);
        }

        let render_config = PdfRenderConfig::new()
            .set_target_width(self.edge())
            .set_maximum_height(self.edge());

        let mut images = Vec::with_capacity(total_pages);

        for (idx, page) in pages.iter().enumerate() {
            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                GraderError::RasterisationFailed {
                    page: idx + 1,
                    detail: format!("{:?}", e),
                }
            })?;

            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                idx + 1,
                image.width(),
                image.height()
            );

            images.push(image);
        }

        Ok(images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    struct Blank(usize);

    impl Rasterizer for Blank {
        fn rasterize(&self, _pdf: &[u8]) -> Result<Vec<DynamicImage>, GraderError> {
            Ok((0..self.0)
                .map(|i| {
                    DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                        4 + i as u32,
                        4,
                        Rgba([255, 255, 255, 255]),
                    ))
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn render_pages_preserves_page_order() {
        let images = render_pages(Arc::new(Blank(3)), b"%PDF".to_vec())
            .await
            .unwrap();
        let widths: Vec<u32> = images.iter().map(|i| i.width()).collect();
        assert_eq!(widths, vec![4, 5, 6]);
    }

    #[test]
    fn oversized_edge_stays_positive() {
        let r = PdfiumRasterizer::new(None, u32::MAX);
        assert_eq!(r.edge(), MAX_RENDERED_PIXELS as i32);
        assert_eq!(PdfiumRasterizer::new(None, 0).edge(), MIN_RENDERED_PIXELS as i32);
        assert_eq!(PdfiumRasterizer::new(None, 1600).edge(), 1600);
    }

    #[test]
    fn library_file_passes_files_through() {
        let p = PathBuf::from("/definitely/not/here/libpdfium.so");
        assert_eq!(library_file(&p), p);
    }

    #[test]
    fn library_file_resolves_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let resolved = library_file(tmp.path());
        assert_eq!(resolved.parent(), Some(tmp.path()));
        assert!(resolved
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.contains("pdfium")));
    }
}
