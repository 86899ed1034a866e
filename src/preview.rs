//! Debounced live preview.
//!
//! Every call to [`PreviewScheduler::request`] bumps a generation counter,
//! waits out the debounce delay and, if nothing newer arrived meanwhile,
//! composes on tokio's blocking pool from a snapshot of its inputs. The
//! result is published on a [`watch`] channel only when its generation is
//! still the latest one on arrival, so a slow render can never overwrite a
//! newer preview.

use crate::imaging::{ComposedOutput, RenderRequest, SourceImage, compose};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);

type Renderer = Arc<dyn Fn(&[SourceImage], &RenderRequest) -> ComposedOutput + Send + Sync>;

/// A published preview and the request generation that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub generation: u64,
    pub output: ComposedOutput,
}

pub struct PreviewScheduler {
    generation: Arc<AtomicU64>,
    debounce: Duration,
    renderer: Renderer,
    tx: watch::Sender<Option<Preview>>,
}

impl PreviewScheduler {
    pub fn new(debounce: Duration) -> Self {
        Self::with_renderer(debounce, compose)
    }

    /// Scheduler with a custom render function in place of [`compose`].
    pub fn with_renderer<F>(debounce: Duration, renderer: F) -> Self
    where
        F: Fn(&[SourceImage], &RenderRequest) -> ComposedOutput + Send + Sync + 'static,
    {
        let (tx, _) = watch::channel(None);
        Self {
            generation: Arc::new(AtomicU64::new(0)),
            debounce,
            renderer: Arc::new(renderer),
            tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Preview>> {
        self.tx.subscribe()
    }

    /// Most recently published preview.
    pub fn latest(&self) -> Option<Preview> {
        self.tx.borrow().clone()
    }

    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Drop every pending request without publishing anything.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Schedule a render. The handle resolves to `true` when this request's
    /// result was published. Must be called inside a tokio runtime.
    pub fn request(&self, sources: Vec<SourceImage>, request: RenderRequest) -> JoinHandle<bool> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let latest = Arc::clone(&self.generation);
        let renderer = Arc::clone(&self.renderer);
        let tx = self.tx.clone();
        let debounce = self.debounce;

        tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if latest.load(Ordering::SeqCst) != generation {
                debug!(generation, "preview superseded during debounce");
                return false;
            }

            let rendered =
                tokio::task::spawn_blocking(move || renderer(&sources, &request)).await;
            let output = match rendered {
                Ok(output) => output,
                Err(e) => {
                    warn!(generation, error = %e, "preview render task failed");
                    return false;
                }
            };

            if latest.load(Ordering::SeqCst) != generation {
                debug!(generation, "stale preview dropped");
                return false;
            }
            tx.send_replace(Some(Preview { generation, output }));
            debug!(generation, "preview published");
            true
        })
    }
}

impl Default for PreviewScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}
