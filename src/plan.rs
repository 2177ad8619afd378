use crate::types::{Px, Size};

/// Margin reserved between an anchored overlay and any page edge its
/// placement references, in page pixels.
pub const EDGE_MARGIN: i32 = 20;

/// Tiles are rotated about their own center by a fixed -45 degrees.
pub const TILE_ROTATION: f32 = -std::f32::consts::FRAC_PI_4;

/// Where an overlay lands on a page. Nine single anchors plus a repeating
/// tiled mode; exactly one is active per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    TopLeft,
    TopCenter,
    TopRight,
    CenterLeft,
    Center,
    CenterRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
    Tile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HAnchor {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VAnchor {
    Top,
    Center,
    Bottom,
}

impl Placement {
    fn anchors(self) -> Option<(HAnchor, VAnchor)> {
        match self {
            Placement::TopLeft => Some((HAnchor::Left, VAnchor::Top)),
            Placement::TopCenter => Some((HAnchor::Center, VAnchor::Top)),
            Placement::TopRight => Some((HAnchor::Right, VAnchor::Top)),
            Placement::CenterLeft => Some((HAnchor::Left, VAnchor::Center)),
            Placement::Center => Some((HAnchor::Center, VAnchor::Center)),
            Placement::CenterRight => Some((HAnchor::Right, VAnchor::Center)),
            Placement::BottomLeft => Some((HAnchor::Left, VAnchor::Bottom)),
            Placement::BottomCenter => Some((HAnchor::Center, VAnchor::Bottom)),
            Placement::BottomRight => Some((HAnchor::Right, VAnchor::Bottom)),
            Placement::Tile => None,
        }
    }
}

/// One fully resolved overlay draw: top-left target position, drawn size,
/// and rotation (radians, about the drawn rect's own center).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawInstruction {
    pub x: Px,
    pub y: Px,
    pub width: Px,
    pub height: Px,
    pub rotation: f32,
}

/// Compute the draw sequence for one overlay on one page. Pure: identical
/// inputs always yield the identical sequence.
///
/// Anchored placements produce exactly one unrotated instruction. Tile
/// covers the canvas with a grid at 1.5x the drawn dimension per axis,
/// starting one full drawn dimension before the origin so partial tiles
/// bleed over every edge, enumerated row-major (y outer, x inner).
pub fn plan_overlay(
    canvas: Size,
    overlay_width: u32,
    overlay_height: u32,
    scale: f32,
    placement: Placement,
) -> Vec<DrawInstruction> {
    let drawn_w = Px::from_u32(overlay_width) * scale;
    let drawn_h = Px::from_u32(overlay_height) * scale;

    match placement.anchors() {
        Some((h, v)) => {
            let margin = Px::from_i32(EDGE_MARGIN);
            let x = match h {
                HAnchor::Left => margin,
                HAnchor::Center => (canvas.width - drawn_w).mul_ratio(1, 2),
                HAnchor::Right => canvas.width - drawn_w - margin,
            };
            let y = match v {
                VAnchor::Top => margin,
                VAnchor::Center => (canvas.height - drawn_h).mul_ratio(1, 2),
                VAnchor::Bottom => canvas.height - drawn_h - margin,
            };
            vec![DrawInstruction {
                x,
                y,
                width: drawn_w,
                height: drawn_h,
                rotation: 0.0,
            }]
        }
        None => {
            // A non-positive pitch would never advance the walk.
            if !drawn_w.is_positive() || !drawn_h.is_positive() {
                return Vec::new();
            }
            let step_x = drawn_w.mul_ratio(3, 2);
            let step_y = drawn_h.mul_ratio(3, 2);
            let mut instructions = Vec::new();
            let mut y = -drawn_h;
            while y < canvas.height {
                let mut x = -drawn_w;
                while x < canvas.width {
                    instructions.push(DrawInstruction {
                        x,
                        y,
                        width: drawn_w,
                        height: drawn_h,
                        rotation: TILE_ROTATION,
                    });
                    x += step_x;
                }
                y += step_y;
            }
            instructions
        }
    }
}
