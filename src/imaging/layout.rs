//! Pure layout calculations: canvas size and per-photo placement.
//!
//! All functions here are pure and testable without any pixels. The numbers
//! are fixed by the print templates and must stay exactly as they are, since
//! saved photos and previews have to look the same across versions.

use crate::types::TemplateType;

/// Horizontal and top margin around a single polaroid photo.
pub const POLAROID_INSET: f32 = 30.0;
/// Extra height a single polaroid adds for its caption strip.
pub const POLAROID_EXTRA_HEIGHT: u32 = 180;
/// Extra height reserved under a polaroid grid for the caption.
pub const POLAROID_GRID_CAPTION: u32 = 140;
/// Border added around a square-framed photo (50px per side).
pub const SQUARE_FRAME_BORDER: u32 = 100;

pub const STRIP_GAP: f32 = 30.0;
pub const STRIP_TOP_PAD: f32 = 60.0;
pub const STRIP_BOTTOM_PAD: f32 = 60.0;

/// Columns in the multi-photo grid.
pub const GRID_COLUMNS: usize = 2;

/// Which part of the source image is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crop {
    /// The whole source, stretched to the destination.
    Full,
    /// The largest centred square of the source.
    CenterSquare,
}

/// Destination rectangle (canvas pixels) and crop for one source image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub crop: Crop,
}

impl Placement {
    fn full(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            crop: Crop::Full,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Snap to whole pixels as `(x, y, width, height)`.
    ///
    /// Edges are rounded independently so neighbouring cells share a border
    /// instead of leaving a one-pixel seam.
    pub fn pixel_rect(&self) -> (i32, i32, u32, u32) {
        let left = self.x.round() as i32;
        let top = self.y.round() as i32;
        let right = self.right().round() as i32;
        let bottom = self.bottom().round() as i32;
        (
            left,
            top,
            (right - left).max(1) as u32,
            (bottom - top).max(1) as u32,
        )
    }
}

/// Canvas size plus one placement per source image, in draw order.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub placements: Vec<Placement>,
}

/// Compute the canvas and placements for `image_count` photos.
///
/// `base_width`/`base_height` is the requested output size (the preview or
/// final tier). Single photos and multi-photo batches follow different rules:
///
/// | Photos | Template | Canvas | Placement |
/// |---|---|---|---|
/// | 1 | polaroid | (w+60)×(h+180) | w×h at (30,30) |
/// | 1 | square_frame | s×s, s = max(w,h)+100 | inset 50 |
/// | 1 | other | w×h | fills |
/// | N | strip | w × (60 + N·0.9w + (N−1)·30 + 60) | 0.9w squares, centred |
/// | N | other | w×h (+140 for polaroid) | 2-column grid, stretched |
///
/// Fractional canvas sizes truncate, like assigning to a raster canvas.
///
/// # Examples
/// ```
/// # use blushbooth::imaging::compute_layout;
/// # use blushbooth::types::TemplateType;
/// let layout = compute_layout(3, TemplateType::Strip, 600, 600);
/// assert_eq!((layout.canvas_width, layout.canvas_height), (600, 1740));
/// ```
pub fn compute_layout(
    image_count: usize,
    template: TemplateType,
    base_width: u32,
    base_height: u32,
) -> Layout {
    match image_count {
        0 => Layout {
            canvas_width: base_width,
            canvas_height: base_height,
            placements: Vec::new(),
        },
        1 => single_layout(template, base_width, base_height),
        n if template == TemplateType::Strip => strip_layout(n, base_width as f32),
        n => grid_layout(n, template, base_width, base_height),
    }
}

fn single_layout(template: TemplateType, base_width: u32, base_height: u32) -> Layout {
    let w = base_width as f32;
    let h = base_height as f32;
    match template {
        TemplateType::Polaroid => Layout {
            canvas_width: base_width + 2 * POLAROID_INSET as u32,
            canvas_height: base_height + POLAROID_EXTRA_HEIGHT,
            placements: vec![Placement::full(POLAROID_INSET, POLAROID_INSET, w, h)],
        },
        TemplateType::SquareFrame => {
            let size = base_width.max(base_height) + SQUARE_FRAME_BORDER;
            let inner = (size - SQUARE_FRAME_BORDER) as f32;
            let inset = (SQUARE_FRAME_BORDER / 2) as f32;
            Layout {
                canvas_width: size,
                canvas_height: size,
                placements: vec![Placement::full(inset, inset, inner, inner)],
            }
        }
        TemplateType::None | TemplateType::Strip => Layout {
            canvas_width: base_width,
            canvas_height: base_height,
            placements: vec![Placement::full(0.0, 0.0, w, h)],
        },
    }
}

/// Side of each square strip photo: 90% of the canvas width.
pub fn strip_photo_size(width: f32) -> f32 {
    width * 9.0 / 10.0
}

/// Height of a strip holding `count` photos on a canvas `width` wide.
pub fn strip_height(count: usize, width: f32) -> f32 {
    let photo = strip_photo_size(width);
    let n = count as f32;
    STRIP_TOP_PAD + photo * n + STRIP_GAP * (n - 1.0) + STRIP_BOTTOM_PAD
}

fn strip_layout(count: usize, w: f32) -> Layout {
    let photo = strip_photo_size(w);
    let side_pad = (w - photo) / 2.0;

    let placements = (0..count)
        .map(|i| Placement {
            x: side_pad,
            y: STRIP_TOP_PAD + i as f32 * (photo + STRIP_GAP),
            width: photo,
            height: photo,
            crop: Crop::CenterSquare,
        })
        .collect();

    Layout {
        canvas_width: w as u32,
        canvas_height: strip_height(count, w) as u32,
        placements,
    }
}

fn grid_layout(count: usize, template: TemplateType, base_width: u32, base_height: u32) -> Layout {
    let canvas_height = if template == TemplateType::Polaroid {
        base_height + POLAROID_GRID_CAPTION
    } else {
        base_height
    };
    let photo_area = if template == TemplateType::Polaroid {
        canvas_height - POLAROID_GRID_CAPTION
    } else {
        canvas_height
    };

    let rows = count.div_ceil(GRID_COLUMNS);
    let cell_w = base_width as f32 / GRID_COLUMNS as f32;
    let cell_h = photo_area as f32 / rows as f32;

    // Cells stretch their source; aspect mismatches are not corrected.
    let placements = (0..count)
        .map(|i| {
            let col = (i % GRID_COLUMNS) as f32;
            let row = (i / GRID_COLUMNS) as f32;
            Placement::full(col * cell_w, row * cell_h, cell_w, cell_h)
        })
        .collect();

    Layout {
        canvas_width: base_width,
        canvas_height,
        placements,
    }
}

/// Largest centred square of a `width`×`height` source as `(x, y, side)`.
pub fn center_square(width: u32, height: u32) -> (u32, u32, u32) {
    let side = width.min(height);
    ((width - side) / 2, (height - side) / 2, side)
}
