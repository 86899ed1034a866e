//! Caption and watermark text.
//!
//! Each line is rendered as a one-element SVG document through `usvg`/`resvg`
//! directly onto the canvas pixmap, so shaping, font fallback and the
//! watermark's blurred shadow all come from the SVG text stack. Fonts are the
//! system fonts, loaded once per process, with the generic `sans-serif`
//! family pointed at a face that is actually installed.

use super::backend::BackendError;
use super::params::TextParams;
use resvg::tiny_skia::{Pixmap, Transform};
use std::sync::{Arc, LazyLock};
use usvg::fontdb::Database;

/// Rounded sans first, generic fallback second.
pub const FONT_FAMILY: &str = "Quicksand, sans-serif";

/// Families tried, in order, for the generic `sans-serif`.
const SANS_FALLBACKS: &[&str] = &[
    "Quicksand",
    "Arial",
    "Helvetica",
    "DejaVu Sans",
    "Liberation Sans",
    "Noto Sans",
    "Open Sans",
    "Roboto",
];

static FONT_DB: LazyLock<Arc<Database>> = LazyLock::new(|| {
    let mut db = Database::new();
    db.load_system_fonts();
    match sans_family(&db) {
        Some(family) => {
            tracing::debug!(faces = db.len(), %family, "loaded system fonts");
            db.set_sans_serif_family(family);
        }
        None => tracing::warn!("no system fonts found, text will not render"),
    }
    Arc::new(db)
});

/// Installed family to stand in for `sans-serif`: a known sans if there is
/// one, else the first proportional face, else any face at all.
fn sans_family(db: &Database) -> Option<String> {
    let installed: Vec<(&str, bool)> = db
        .faces()
        .filter_map(|face| {
            face.families
                .first()
                .map(|(name, _)| (name.as_str(), face.monospaced))
        })
        .collect();
    SANS_FALLBACKS
        .iter()
        .copied()
        .find(|want| installed.iter().any(|(name, _)| name.eq_ignore_ascii_case(want)))
        .or_else(|| {
            installed
                .iter()
                .find(|(name, mono)| {
                    let lower = name.to_ascii_lowercase();
                    !mono && (lower.contains("sans") || !lower.contains("serif"))
                })
                .or_else(|| installed.iter().find(|(_, mono)| !mono))
                .or_else(|| installed.first())
                .map(|(name, _)| *name)
        })
        .map(|name| {
            installed
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map_or(name, |(n, _)| *n)
                .to_string()
        })
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// SVG document drawing `params` on a transparent `width`×`height` canvas.
pub fn text_svg(width: u32, height: u32, params: &TextParams) -> String {
    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    );
    let mut filter_attr = String::new();
    if let Some(shadow) = params.shadow {
        svg.push_str(&format!(
            r#"<defs><filter id="shadow" x="-50%" y="-50%" width="200%" height="200%"><feDropShadow dx="0" dy="0" stdDeviation="{}" flood-color="{}" flood-opacity="{}"/></filter></defs>"#,
            shadow.blur / 2.0,
            shadow.color.to_hex(),
            shadow.color.alpha,
        ));
        filter_attr.push_str(r#" filter="url(#shadow)""#);
    }
    svg.push_str(&format!(
        r#"<text x="{}" y="{}" font-family="{}" font-size="{}" font-weight="{}" fill="{}" fill-opacity="{}" text-anchor="{}"{}>{}</text></svg>"#,
        params.x,
        params.y,
        FONT_FAMILY,
        params.size,
        if params.bold { "bold" } else { "normal" },
        params.color.to_hex(),
        params.color.alpha,
        params.anchor.as_svg(),
        filter_attr,
        escape_xml(&params.text),
    ));
    svg
}

/// Draw one text line over the existing pixmap contents.
pub fn render_text(pixmap: &mut Pixmap, params: &TextParams) -> Result<(), BackendError> {
    if params.text.trim().is_empty() {
        return Ok(());
    }
    if FONT_DB.is_empty() {
        return Err(BackendError::Text(format!(
            "{}: no fonts available",
            params.text
        )));
    }
    let svg = text_svg(pixmap.width(), pixmap.height(), params);
    let options = usvg::Options {
        fontdb: Arc::clone(&FONT_DB),
        ..Default::default()
    };
    let tree = usvg::Tree::from_str(&svg, &options)
        .map_err(|e| BackendError::Text(format!("{}: {e}", params.text)))?;
    resvg::render(&tree, Transform::identity(), &mut pixmap.as_mut());
    Ok(())
}
