use crate::error::AquamarkError;
use crate::plan::DrawInstruction;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, RgbaImage};
use tiny_skia::{FilterQuality, Pixmap, PixmapPaint, Transform};

/// Convert straight-alpha RGBA samples into the premultiplied form tiny-skia
/// buffers use. Returns None for zero-sized images.
pub(crate) fn pixmap_from_rgba_image(rgba: &RgbaImage) -> Option<Pixmap> {
    let (width, height) = rgba.dimensions();
    let mut pixmap = Pixmap::new(width, height)?;
    let src = rgba.as_raw();
    let dst = pixmap.data_mut();
    for (src_px, dst_px) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
        let r = src_px[0];
        let g = src_px[1];
        let b = src_px[2];
        let a = src_px[3];
        dst_px[0] = premul_u8(r, a);
        dst_px[1] = premul_u8(g, a);
        dst_px[2] = premul_u8(b, a);
        dst_px[3] = a;
    }
    Some(pixmap)
}

fn premul_u8(channel: u8, alpha: u8) -> u8 {
    let prod = (channel as u16) * (alpha as u16) + 127;
    ((prod + (prod >> 8)) >> 8) as u8
}

/// Draw one overlay onto a page buffer, once per instruction, source-over.
///
/// Each draw resamples the overlay to the instruction's drawn size
/// (bilinear), rotates it about its own center, and blends it at the target
/// position with every source pixel's alpha scaled by `opacity`. Draws that
/// fall outside the canvas clip silently; overlapping draws accumulate
/// coverage.
pub(crate) fn composite_overlay(
    page: &mut Pixmap,
    overlay: &Pixmap,
    instructions: &[DrawInstruction],
    opacity: f32,
) {
    let src_w = overlay.width() as f32;
    let src_h = overlay.height() as f32;
    if src_w <= 0.0 || src_h <= 0.0 {
        return;
    }

    let mut paint = PixmapPaint::default();
    paint.quality = FilterQuality::Bilinear;
    paint.opacity = opacity.clamp(0.0, 1.0);

    for instr in instructions {
        let w = instr.width.to_f32();
        let h = instr.height.to_f32();
        if w <= 0.0 || h <= 0.0 {
            continue;
        }
        let x = instr.x.to_f32();
        let y = instr.y.to_f32();

        // Source pixels -> drawn size -> centered -> rotated -> placed.
        let mut ts = Transform::from_scale(w / src_w, h / src_h)
            .post_concat(Transform::from_translate(-w / 2.0, -h / 2.0));
        if instr.rotation.abs() > f32::EPSILON {
            let deg = instr.rotation * 180.0 / core::f32::consts::PI;
            ts = ts.post_concat(Transform::from_rotate(deg));
        }
        ts = ts.post_concat(Transform::from_translate(x + w / 2.0, y + h / 2.0));

        page.draw_pixmap(0, 0, overlay.as_ref(), &paint, ts, None);
    }
}

/// Losslessly serialize a page buffer as RGBA PNG bytes.
pub(crate) fn encode_png(pixmap: &Pixmap) -> Result<Vec<u8>, AquamarkError> {
    let mut rgba = Vec::with_capacity(pixmap.data().len());
    for px in pixmap.pixels() {
        let c = px.demultiply();
        rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    let mut png = Vec::new();
    let encoder = PngEncoder::new(&mut png);
    encoder
        .write_image(&rgba, pixmap.width(), pixmap.height(), ColorType::Rgba8.into())
        .map_err(|err| AquamarkError::Encode(err.to_string()))?;
    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::DrawInstruction;
    use crate::types::Px;

    fn solid_pixmap(width: u32, height: u32, rgba: [u8; 4]) -> Pixmap {
        let mut image = RgbaImage::new(width, height);
        for px in image.pixels_mut() {
            *px = image::Rgba(rgba);
        }
        pixmap_from_rgba_image(&image).unwrap()
    }

    fn instruction(x: i32, y: i32, w: i32, h: i32) -> DrawInstruction {
        DrawInstruction {
            x: Px::from_i32(x),
            y: Px::from_i32(y),
            width: Px::from_i32(w),
            height: Px::from_i32(h),
            rotation: 0.0,
        }
    }

    #[test]
    fn unrotated_draw_lands_at_target_position() {
        let mut page = solid_pixmap(4, 4, [255, 255, 255, 255]);
        let overlay = solid_pixmap(2, 2, [255, 0, 0, 255]);
        composite_overlay(&mut page, &overlay, &[instruction(1, 1, 2, 2)], 1.0);
        let hit = page.pixel(2, 2).unwrap();
        assert!(hit.red() > 200 && hit.green() < 50);
        let miss = page.pixel(0, 0).unwrap();
        assert_eq!([miss.red(), miss.green(), miss.blue()], [255, 255, 255]);
    }

    #[test]
    fn global_opacity_halves_overlay_coverage() {
        let mut page = solid_pixmap(4, 4, [255, 255, 255, 255]);
        let overlay = solid_pixmap(4, 4, [255, 0, 0, 255]);
        composite_overlay(&mut page, &overlay, &[instruction(0, 0, 4, 4)], 0.5);
        let px = page.pixel(2, 2).unwrap();
        assert!(px.red() >= 250);
        assert!(px.green() >= 120 && px.green() <= 135);
        assert!(px.blue() >= 120 && px.blue() <= 135);
    }

    #[test]
    fn later_draw_wins_where_full_opacity_overlaps() {
        let mut forward = solid_pixmap(4, 4, [255, 255, 255, 255]);
        let red = solid_pixmap(2, 2, [255, 0, 0, 255]);
        let blue = solid_pixmap(2, 2, [0, 0, 255, 255]);
        let plan = [instruction(1, 1, 2, 2)];
        composite_overlay(&mut forward, &red, &plan, 1.0);
        composite_overlay(&mut forward, &blue, &plan, 1.0);

        let mut reversed = solid_pixmap(4, 4, [255, 255, 255, 255]);
        composite_overlay(&mut reversed, &blue, &plan, 1.0);
        composite_overlay(&mut reversed, &red, &plan, 1.0);

        let fwd = forward.pixel(2, 2).unwrap();
        let rev = reversed.pixel(2, 2).unwrap();
        assert!(fwd.blue() > fwd.red());
        assert!(rev.red() > rev.blue());
    }

    #[test]
    fn out_of_bounds_draws_clip_silently() {
        let mut page = solid_pixmap(4, 4, [255, 255, 255, 255]);
        let overlay = solid_pixmap(2, 2, [0, 255, 0, 255]);
        composite_overlay(
            &mut page,
            &overlay,
            &[instruction(-1, -1, 2, 2), instruction(3, 3, 2, 2), instruction(40, 40, 2, 2)],
            1.0,
        );
        assert_eq!(page.width(), 4);
        let inside = page.pixel(0, 0).unwrap();
        assert!(inside.green() > 100);
        let center = page.pixel(2, 2).unwrap();
        assert_eq!([center.red(), center.green(), center.blue()], [255, 255, 255]);
    }

    #[test]
    fn zero_sized_draw_is_a_no_op() {
        let mut page = solid_pixmap(4, 4, [255, 255, 255, 255]);
        let overlay = solid_pixmap(2, 2, [255, 0, 0, 255]);
        composite_overlay(&mut page, &overlay, &[instruction(1, 1, 0, 2)], 1.0);
        for x in 0..4 {
            for y in 0..4 {
                let px = page.pixel(x, y).unwrap();
                assert_eq!([px.red(), px.green(), px.blue()], [255, 255, 255]);
            }
        }
    }

    #[test]
    fn drawn_size_resamples_the_source() {
        let mut page = solid_pixmap(8, 8, [255, 255, 255, 255]);
        let overlay = solid_pixmap(1, 1, [0, 0, 255, 255]);
        composite_overlay(&mut page, &overlay, &[instruction(2, 2, 4, 4)], 1.0);
        let px = page.pixel(4, 4).unwrap();
        assert!(px.blue() > 200 && px.red() < 50);
    }

    #[test]
    fn rotated_tile_paints_around_its_center() {
        let mut page = solid_pixmap(16, 16, [255, 255, 255, 255]);
        let overlay = solid_pixmap(8, 8, [255, 0, 0, 255]);
        let instr = DrawInstruction {
            x: Px::from_i32(4),
            y: Px::from_i32(4),
            width: Px::from_i32(8),
            height: Px::from_i32(8),
            rotation: crate::plan::TILE_ROTATION,
        };
        composite_overlay(&mut page, &overlay, &[instr], 1.0);
        // The tile center is invariant under rotation about itself.
        let center = page.pixel(8, 8).unwrap();
        assert!(center.red() > 200 && center.green() < 50);
    }

    #[test]
    fn encode_png_round_trips_dimensions_and_color() {
        let page = solid_pixmap(5, 3, [10, 200, 30, 255]);
        let png = encode_png(&page).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (5, 3));
        assert_eq!(decoded.get_pixel(2, 1).0, [10, 200, 30, 255]);
    }
}
