//! Image compositing: pure Rust, on tiny-skia and the `image` crate.
//!
//! | Step | Module | Crate / function |
//! |---|---|---|
//! | **Decode** | [`source`] | `image::load_from_memory`, rayon for batches |
//! | **Layout** | [`layout`] | pure arithmetic |
//! | **Filters** | [`filters`] | CSS filter matrices, `image::imageops::blur` |
//! | **Patterns** | [`pattern`] | tiny-skia paths |
//! | **Grain** | [`grain`] | tiny-skia pattern shader, overlay blend |
//! | **Text** | [`text`] | `usvg` + `resvg` |
//! | **Encode** | [`skia_backend`] | `image` PNG encoder |
//!
//! The module is split into:
//! - **Calculations**: [`layout`] and [`filters`], pure and unit testable
//! - **Parameters**: data structures describing drawing operations
//! - **Backend**: [`RenderBackend`] / [`DrawSurface`] traits + [`SkiaBackend`]
//! - **Composition**: [`compose`](compose::compose), which combines layout and
//!   filters with a backend into one PNG

pub mod backend;
pub mod compose;
pub mod filters;
pub mod grain;
pub mod layout;
mod params;
pub mod pattern;
pub mod skia_backend;
pub mod source;
pub mod text;

pub use backend::{BackendError, DrawSurface, RenderBackend};
pub use compose::{ComposedOutput, RenderRequest, compose, compose_with};
pub use filters::{FilterChain, FilterOp, build_filter_chain};
pub use layout::{Crop, Layout, Placement, compute_layout};
pub use params::{
    Color, Decoration, DrawImageParams, GrainParams, PAPER, TextAnchor, TextParams, TextShadow,
};
pub use skia_backend::SkiaBackend;
pub use source::{
    SourceError, SourceImage, decode_all, decode_data_uri, decode_data_uris, open_all,
    png_data_uri,
};
