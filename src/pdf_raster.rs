use crate::PageRasterizer;
use crate::error::AquamarkError;
use crate::raster::pixmap_from_rgba_image;
use pdfium_render::prelude::{PdfPage, PdfRenderConfig, Pdfium, PdfiumError};
use tiny_skia::Pixmap;

/// Page rasterization backed by libpdfium. Pages render sequentially: the
/// underlying library is not thread safe, so parallelism lives in the
/// composite/encode stage instead.
pub struct PdfiumRasterizer {
    pdfium: Pdfium,
}

impl PdfiumRasterizer {
    /// Bind libpdfium, preferring a shared library next to the working
    /// directory over the system-wide install.
    pub fn new() -> Result<Self, AquamarkError> {
        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(pdfium_err)?;
        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }
}

fn pdfium_err(err: PdfiumError) -> AquamarkError {
    AquamarkError::DocumentDecode(err.to_string())
}

fn render_page(page: &PdfPage<'_>, scale: f32) -> Result<Pixmap, AquamarkError> {
    let config = PdfRenderConfig::new().scale_page_by_factor(scale);
    let bitmap = page.render_with_config(&config).map_err(pdfium_err)?;
    let rgba = bitmap.as_image().to_rgba8();
    pixmap_from_rgba_image(&rgba).ok_or_else(|| {
        AquamarkError::DocumentDecode("rendered page has zero dimensions".to_string())
    })
}

impl PageRasterizer for PdfiumRasterizer {
    fn page_count(&self, document: &[u8]) -> Result<usize, AquamarkError> {
        let doc = self
            .pdfium
            .load_pdf_from_byte_slice(document, None)
            .map_err(pdfium_err)?;
        Ok(doc.pages().len() as usize)
    }

    fn rasterize_page(
        &self,
        document: &[u8],
        page_no: usize,
        scale: f32,
    ) -> Result<Pixmap, AquamarkError> {
        let doc = self
            .pdfium
            .load_pdf_from_byte_slice(document, None)
            .map_err(pdfium_err)?;
        let count = doc.pages().len() as usize;
        if page_no == 0 || page_no > count {
            return Err(AquamarkError::DocumentDecode(format!(
                "page {} out of range 1..={}",
                page_no, count
            )));
        }
        let page = doc.pages().get((page_no - 1) as u16).map_err(pdfium_err)?;
        render_page(&page, scale)
    }

    // One parse for the whole document instead of one per page.
    fn rasterize_all(&self, document: &[u8], scale: f32) -> Result<Vec<Pixmap>, AquamarkError> {
        let doc = self
            .pdfium
            .load_pdf_from_byte_slice(document, None)
            .map_err(pdfium_err)?;
        let mut pages = Vec::with_capacity(doc.pages().len() as usize);
        for page in doc.pages().iter() {
            pages.push(render_page(&page, scale)?);
        }
        Ok(pages)
    }
}
