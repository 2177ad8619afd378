use crate::error::AquamarkError;
use crate::raster::pixmap_from_rgba_image;
use base64::Engine;
use rayon::prelude::*;
use tiny_skia::Pixmap;

/// Decode one overlay image into a premultiplied-alpha pixmap. The intrinsic
/// pixel dimensions of the source asset are preserved; resampling happens at
/// draw time, never here.
pub fn decode_overlay(data: &[u8]) -> Result<Pixmap, AquamarkError> {
    let format = image::guess_format(data)
        .map_err(|err| AquamarkError::ImageDecode(err.to_string()))?;
    let decoded = image::load_from_memory_with_format(data, format)
        .map_err(|err| AquamarkError::ImageDecode(err.to_string()))?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    pixmap_from_rgba_image(&rgba).ok_or_else(|| {
        AquamarkError::ImageDecode(format!("unsupported overlay size {}x{}", width, height))
    })
}

/// Decode every overlay, preserving input order. Input order is compositing
/// order: the first overlay is drawn first, later overlays land on top.
pub fn decode_overlays(sources: &[Vec<u8>]) -> Result<Vec<Pixmap>, AquamarkError> {
    sources
        .par_iter()
        .map(|bytes| decode_overlay(bytes))
        .collect()
}

/// Resolve an overlay source string to raw image bytes: either an inline
/// `data:` URI or a filesystem path.
pub fn overlay_bytes_from_source(source: &str) -> Result<Vec<u8>, AquamarkError> {
    if let Some((_, data)) = parse_data_uri(source) {
        return Ok(data);
    }
    std::fs::read(source).map_err(AquamarkError::Io)
}

fn parse_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    if !uri.starts_with("data:") {
        return None;
    }
    let parts: Vec<&str> = uri.splitn(2, ',').collect();
    if parts.len() != 2 {
        return None;
    }
    let header = parts[0];
    let data_part = parts[1];
    let mime = header
        .trim_start_matches("data:")
        .split(';')
        .next()
        .unwrap_or("application/octet-stream")
        .to_string();
    let data = if header.contains("base64") {
        base64::engine::general_purpose::STANDARD
            .decode(data_part)
            .ok()?
    } else {
        data_part.as_bytes().to_vec()
    };
    Some((mime, data))
}
