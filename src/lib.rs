//! # BlushBooth
//!
//! A photo booth in a crate: take a run of camera shots, lay them out as a
//! polaroid, a photo strip, a framed square or a grid, dress them with
//! filters, grain and a border pattern, optionally restyle them with an AI
//! preset, and keep the results in a local gallery.
//!
//! # Architecture
//!
//! ```text
//! capture ──shots──▶ studio::EditSession ──▶ imaging::compose ──▶ PNG
//!                        │        ▲                                │
//!                     enhance     └── preview (debounced)          ▼
//!                                                   studio::Studio ─▶ store
//! ```
//!
//! The heart is [`imaging::compose`]: decoded photos + [`imaging::RenderRequest`]
//! → one PNG. It is a pure function of its inputs (given a grain seed), never
//! fails, and draws through the [`imaging::RenderBackend`] trait so tests can
//! record every drawing operation instead of inspecting pixels.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Layout, filters, patterns, grain, text and the compositor |
//! | [`capture`] | Camera session lifetime and the countdown state machine |
//! | [`enhance`] | AI restyling presets and the Gemini client |
//! | [`preview`] | Debounced live preview with stale-result dropping |
//! | [`store`] | JSON photo records on disk, legacy gallery migration |
//! | [`studio`] | Editor and gallery state; collaborator errors become notices |
//! | [`config`] | `blushbooth.toml` loading, merging and validation |
//! | [`logging`] | tracing subscriber setup |
//! | [`types`] | Shared enums and filter settings |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Decode First, Draw Second
//!
//! Sources are decoded (in parallel) before composition starts, so the
//! compositor only sees RGBA buffers and has no I/O or decode failure paths.
//!
//! ## Closed Enums
//!
//! Templates, filters, border patterns and presets are closed enums matched
//! exhaustively. Adding a pattern is a compile error everywhere it must be
//! handled.
//!
//! ## Reproducible Renders
//!
//! The only nondeterminism in a render is the grain noise and the caption
//! date. Both are explicit inputs on [`imaging::RenderRequest`], so a fixed
//! seed and date give byte-identical PNGs.

pub mod capture;
pub mod config;
pub mod enhance;
pub mod imaging;
pub mod logging;
pub mod output;
pub mod preview;
pub mod store;
pub mod studio;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
