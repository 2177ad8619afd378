mod archive;
mod debug;
mod error;
mod inspect;
mod overlay;
mod pdf;
#[cfg(feature = "pdfium")]
mod pdf_raster;
mod plan;
mod raster;
mod types;

pub use error::AquamarkError;
pub use inspect::{DocumentReport, inspect_document_bytes, require_stampable};
pub use overlay::{decode_overlay, overlay_bytes_from_source};
#[cfg(feature = "pdfium")]
pub use pdf_raster::PdfiumRasterizer;
pub use plan::{DrawInstruction, EDGE_MARGIN, Placement, TILE_ROTATION, plan_overlay};
pub use types::{Px, Size};

use debug::RunLog;
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tiny_skia::Pixmap;

/// Pages render at twice the document's native unit by default, trading
/// memory for print-quality output.
pub const DEFAULT_RENDER_SCALE: f32 = 2.0;

/// Decode a document and render its pages to pixel buffers.
///
/// Page numbers are 1-based, matching PDF page numbering and the
/// `page_<n>.png` export naming. Every render returns a fresh buffer; a
/// backend must not share mutable state between pages.
pub trait PageRasterizer {
    fn page_count(&self, document: &[u8]) -> Result<usize, AquamarkError>;

    /// Render one page at `scale` times the document's native unit,
    /// preserving the page's aspect ratio exactly.
    fn rasterize_page(
        &self,
        document: &[u8],
        page_no: usize,
        scale: f32,
    ) -> Result<Pixmap, AquamarkError>;

    /// Render every page in document order. Backends that can amortize
    /// document parsing across pages should override this.
    fn rasterize_all(&self, document: &[u8], scale: f32) -> Result<Vec<Pixmap>, AquamarkError> {
        let count = self.page_count(document)?;
        (1..=count)
            .map(|page_no| self.rasterize_page(document, page_no, scale))
            .collect()
    }
}

/// One finished page: encoded bytes plus the pixel dimensions they decode
/// back to. Index-aligned with the source document's page order.
#[derive(Debug, Clone)]
pub struct StampedPage {
    pub page_no: usize,
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

impl StampedPage {
    pub fn entry_name(&self) -> String {
        format!("page_{}.png", self.page_no)
    }
}

/// The stamping pipeline: rasterize every page, composite the configured
/// overlays onto each, encode, and export.
pub struct Watermarker {
    opacity: f32,
    scale: f32,
    placement: Placement,
    render_scale: f32,
    debug: Option<Arc<RunLog>>,
}

#[derive(Clone)]
pub struct WatermarkerBuilder {
    opacity: f32,
    scale: f32,
    placement: Placement,
    render_scale: f32,
    debug_path: Option<std::path::PathBuf>,
}

impl WatermarkerBuilder {
    pub fn new() -> Self {
        Self {
            opacity: 0.5,
            scale: 0.5,
            placement: Placement::Center,
            render_scale: DEFAULT_RENDER_SCALE,
            debug_path: None,
        }
    }

    /// Global overlay opacity in `0..=1`, applied to every draw.
    pub fn opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    /// Multiplier applied to each overlay's intrinsic size.
    pub fn scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn render_scale(mut self, render_scale: f32) -> Self {
        self.render_scale = render_scale;
        self
    }

    /// Write JSON-lines run diagnostics to `path`.
    pub fn debug_log(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<Watermarker, AquamarkError> {
        if !self.opacity.is_finite() || !(0.0..=1.0).contains(&self.opacity) {
            return Err(AquamarkError::InvalidConfiguration(format!(
                "opacity must be within 0..=1 (got {})",
                self.opacity
            )));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(AquamarkError::InvalidConfiguration(format!(
                "scale must be positive (got {})",
                self.scale
            )));
        }
        if !self.render_scale.is_finite() || self.render_scale <= 0.0 {
            return Err(AquamarkError::InvalidConfiguration(format!(
                "render scale must be positive (got {})",
                self.render_scale
            )));
        }
        let debug = match self.debug_path {
            Some(path) => Some(Arc::new(RunLog::create(path)?)),
            None => None,
        };
        Ok(Watermarker {
            opacity: self.opacity,
            scale: self.scale,
            placement: self.placement,
            render_scale: self.render_scale,
            debug,
        })
    }
}

impl Default for WatermarkerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Watermarker {
    pub fn builder() -> WatermarkerBuilder {
        WatermarkerBuilder::new()
    }

    /// Run the full per-page pipeline and return the ordered encoded pages.
    ///
    /// The whole run either succeeds or fails with one categorized error;
    /// a missing overlay list and an unreadable document are rejected
    /// before any page is rendered.
    pub fn stamp_pages(
        &self,
        rasterizer: &dyn PageRasterizer,
        document: &[u8],
        overlays: &[Vec<u8>],
    ) -> Result<Vec<StampedPage>, AquamarkError> {
        if overlays.is_empty() {
            return Err(AquamarkError::InvalidConfiguration(
                "at least one overlay image is required".to_string(),
            ));
        }
        let report = inspect_document_bytes(document)?;
        require_stampable(&report)?;

        let t_overlays = Instant::now();
        let overlay_pixmaps = overlay::decode_overlays(overlays)?;
        if let Some(log) = self.debug.as_deref() {
            log.log_stage(
                "decode_overlays",
                overlay_pixmaps.len(),
                t_overlays.elapsed().as_secs_f64() * 1000.0,
            );
        }

        let t_raster = Instant::now();
        let pages = rasterizer.rasterize_all(document, self.render_scale)?;
        if let Some(log) = self.debug.as_deref() {
            log.log_stage(
                "rasterize",
                pages.len(),
                t_raster.elapsed().as_secs_f64() * 1000.0,
            );
        }

        // Pages are independent once rendered; compositing and encoding fan
        // out, then the collect is sorted back into document order.
        let t_stamp = Instant::now();
        let mut results: Vec<(usize, Result<StampedPage, AquamarkError>)> = pages
            .into_par_iter()
            .enumerate()
            .map(|(idx, mut page)| {
                let res = self.stamp_one(idx + 1, &mut page, &overlay_pixmaps);
                (idx, res)
            })
            .collect();
        results.sort_by_key(|(idx, _)| *idx);

        let mut stamped = Vec::with_capacity(results.len());
        for (_, res) in results {
            stamped.push(res?);
        }
        if let Some(log) = self.debug.as_deref() {
            log.log_stage(
                "composite",
                stamped.len(),
                t_stamp.elapsed().as_secs_f64() * 1000.0,
            );
            log.finish(stamped.len(), overlay_pixmaps.len());
        }
        Ok(stamped)
    }

    fn stamp_one(
        &self,
        page_no: usize,
        page: &mut Pixmap,
        overlays: &[Pixmap],
    ) -> Result<StampedPage, AquamarkError> {
        let t_page = Instant::now();
        let canvas = Size::from_pixels(page.width(), page.height());
        let mut instruction_count = 0usize;
        for overlay in overlays {
            let plan = plan_overlay(
                canvas,
                overlay.width(),
                overlay.height(),
                self.scale,
                self.placement,
            );
            instruction_count += plan.len();
            raster::composite_overlay(page, overlay, &plan, self.opacity);
        }
        let png = raster::encode_png(page)?;
        if let Some(log) = self.debug.as_deref() {
            log.log_page(
                page_no,
                instruction_count,
                t_page.elapsed().as_secs_f64() * 1000.0,
            );
            log.increment("stamp.instructions", instruction_count as u64);
        }
        Ok(StampedPage {
            page_no,
            width: page.width(),
            height: page.height(),
            png,
        })
    }

    /// Stamp every page and bundle the results as a ZIP archive with one
    /// `page_<n>.png` entry per page.
    pub fn stamp_to_zip(
        &self,
        rasterizer: &dyn PageRasterizer,
        document: &[u8],
        overlays: &[Vec<u8>],
    ) -> Result<Vec<u8>, AquamarkError> {
        let pages = self.stamp_pages(rasterizer, document, overlays)?;
        let t_archive = Instant::now();
        let bytes = archive::bundle_pages(&pages)?;
        if let Some(log) = self.debug.as_deref() {
            log.log_stage(
                "archive",
                pages.len(),
                t_archive.elapsed().as_secs_f64() * 1000.0,
            );
        }
        Ok(bytes)
    }

    /// Stamp every page and reassemble the results as a new PDF, one
    /// full-page image per page.
    pub fn stamp_to_pdf(
        &self,
        rasterizer: &dyn PageRasterizer,
        document: &[u8],
        overlays: &[Vec<u8>],
    ) -> Result<Vec<u8>, AquamarkError> {
        let pages = self.stamp_pages(rasterizer, document, overlays)?;
        let t_assemble = Instant::now();
        let bytes = pdf::assemble_document(&pages)?;
        if let Some(log) = self.debug.as_deref() {
            log.log_stage(
                "assemble",
                pages.len(),
                t_assemble.elapsed().as_secs_f64() * 1000.0,
            );
        }
        Ok(bytes)
    }
}
