//! Rendering backend traits and shared types.
//!
//! A [`RenderBackend`] hands out one [`DrawSurface`] per render. The surface
//! supports exactly the drawing steps the compositor needs: fill, border
//! pattern, grain, photos, text, and the final PNG encode.
//!
//! The production implementation is
//! [`SkiaBackend`](super::skia_backend::SkiaBackend), a tiny-skia pixmap.
//! Tests use the recording mock in [`tests`] to assert on the exact
//! sequence of drawing operations without touching pixels.

use super::params::{Color, DrawImageParams, GrainParams, TextParams};
use crate::types::BorderPattern;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("cannot allocate a {width}x{height} surface")]
    Allocation { width: u32, height: u32 },
    #[error("text rendering failed: {0}")]
    Text(String),
    #[error("PNG encode failed: {0}")]
    Encode(String),
    #[error("photo layer failed: {0}")]
    Layer(String),
}

/// Creates drawing surfaces. Shared across threads; each render owns its
/// surface exclusively.
pub trait RenderBackend: Sync {
    type Surface: DrawSurface;

    fn create_surface(&self, width: u32, height: u32) -> Result<Self::Surface, BackendError>;
}

/// A canvas being composed. Operations apply in call order.
pub trait DrawSurface {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Flood the whole surface with an opaque colour.
    fn fill(&mut self, color: Color);

    /// Tile a border pattern over the whole surface.
    fn draw_pattern(&mut self, pattern: BorderPattern);

    /// Overlay one pass of film grain over the whole surface.
    fn apply_grain(&mut self, params: &GrainParams);

    /// Crop, scale, filter and place one photo, with its decoration.
    fn draw_image(&mut self, params: &DrawImageParams<'_>) -> Result<(), BackendError>;

    fn draw_text(&mut self, params: &TextParams) -> Result<(), BackendError>;

    fn encode_png(&self) -> Result<Vec<u8>, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::layout::Crop;
    use crate::imaging::params::{Decoration, TextAnchor};
    use std::sync::{Arc, Mutex};

    /// PNG signature; enough for callers that only check the header.
    pub const MOCK_PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    /// Mock backend that records operations without executing them.
    /// Uses Mutex (not RefCell) so it is Sync like the real backend.
    #[derive(Default)]
    pub struct MockBackend {
        pub operations: Arc<Mutex<Vec<RecordedOp>>>,
        pub fail_create: bool,
        pub fail_encode: bool,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        CreateSurface {
            width: u32,
            height: u32,
        },
        Fill(Color),
        Pattern(BorderPattern),
        Grain {
            intensity: u8,
            seed: u64,
        },
        Image {
            x: f32,
            y: f32,
            width: f32,
            height: f32,
            crop: Crop,
            decoration: Decoration,
            filters: String,
        },
        Text {
            text: String,
            x: f32,
            y: f32,
            anchor: TextAnchor,
        },
        EncodePng,
    }

    impl RecordedOp {
        pub fn is_image(&self) -> bool {
            matches!(self, RecordedOp::Image { .. })
        }

        pub fn is_grain(&self) -> bool {
            matches!(self, RecordedOp::Grain { .. })
        }
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing_allocation() -> Self {
            Self {
                fail_create: true,
                ..Self::default()
            }
        }

        pub fn failing_encode() -> Self {
            Self {
                fail_encode: true,
                ..Self::default()
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }
    }

    pub struct MockSurface {
        width: u32,
        height: u32,
        fail_encode: bool,
        operations: Arc<Mutex<Vec<RecordedOp>>>,
    }

    impl MockSurface {
        fn record(&self, op: RecordedOp) {
            self.operations.lock().unwrap().push(op);
        }
    }

    impl RenderBackend for MockBackend {
        type Surface = MockSurface;

        fn create_surface(&self, width: u32, height: u32) -> Result<MockSurface, BackendError> {
            if self.fail_create {
                return Err(BackendError::Allocation { width, height });
            }
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::CreateSurface { width, height });
            Ok(MockSurface {
                width,
                height,
                fail_encode: self.fail_encode,
                operations: Arc::clone(&self.operations),
            })
        }
    }

    impl DrawSurface for MockSurface {
        fn width(&self) -> u32 {
            self.width
        }

        fn height(&self) -> u32 {
            self.height
        }

        fn fill(&mut self, color: Color) {
            self.record(RecordedOp::Fill(color));
        }

        fn draw_pattern(&mut self, pattern: BorderPattern) {
            self.record(RecordedOp::Pattern(pattern));
        }

        fn apply_grain(&mut self, params: &GrainParams) {
            self.record(RecordedOp::Grain {
                intensity: params.intensity,
                seed: params.seed,
            });
        }

        fn draw_image(&mut self, params: &DrawImageParams<'_>) -> Result<(), BackendError> {
            let p = params.placement;
            self.record(RecordedOp::Image {
                x: p.x,
                y: p.y,
                width: p.width,
                height: p.height,
                crop: p.crop,
                decoration: params.decoration,
                filters: params.filters.to_css(),
            });
            Ok(())
        }

        fn draw_text(&mut self, params: &TextParams) -> Result<(), BackendError> {
            self.record(RecordedOp::Text {
                text: params.text.clone(),
                x: params.x,
                y: params.y,
                anchor: params.anchor,
            });
            Ok(())
        }

        fn encode_png(&self) -> Result<Vec<u8>, BackendError> {
            if self.fail_encode {
                return Err(BackendError::Encode("mock encode failure".into()));
            }
            self.record(RecordedOp::EncodePng);
            Ok(MOCK_PNG.to_vec())
        }
    }

    #[test]
    fn mock_records_surface_and_fill() {
        let backend = MockBackend::new();
        let mut surface = backend.create_surface(340, 460).unwrap();
        surface.fill(Color::rgb(1, 2, 3));

        let ops = backend.get_operations();
        assert_eq!(
            ops,
            vec![
                RecordedOp::CreateSurface {
                    width: 340,
                    height: 460
                },
                RecordedOp::Fill(Color::rgb(1, 2, 3)),
            ]
        );
        assert_eq!((surface.width(), surface.height()), (340, 460));
    }

    #[test]
    fn mock_records_grain_seed() {
        let backend = MockBackend::new();
        let mut surface = backend.create_surface(10, 10).unwrap();
        surface.apply_grain(&GrainParams {
            intensity: 5,
            seed: 99,
        });

        let ops = backend.get_operations();
        assert!(matches!(
            ops[1],
            RecordedOp::Grain {
                intensity: 5,
                seed: 99
            }
        ));
        assert!(ops[1].is_grain());
    }

    #[test]
    fn mock_allocation_failure() {
        let backend = MockBackend::failing_allocation();
        assert!(matches!(
            backend.create_surface(10, 20),
            Err(BackendError::Allocation {
                width: 10,
                height: 20
            })
        ));
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn mock_encode_failure() {
        let backend = MockBackend::failing_encode();
        let surface = backend.create_surface(10, 10).unwrap();
        assert!(matches!(surface.encode_png(), Err(BackendError::Encode(_))));
    }

    #[test]
    fn error_messages_name_the_failing_step() {
        assert_eq!(
            BackendError::Layer("cannot allocate 3x4".into()).to_string(),
            "photo layer failed: cannot allocate 3x4"
        );
        assert_eq!(
            BackendError::Text("hi: no fonts available".into()).to_string(),
            "text rendering failed: hi: no fonts available"
        );
    }
}
