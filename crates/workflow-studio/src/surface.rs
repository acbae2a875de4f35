//! Rendering-layer seam and session liveness

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use workflow_graph::Viewport;

use crate::error::{Result, StudioError};

/// The canvas rendering layer, as seen by the persistence coordinator
#[async_trait]
pub trait CanvasSurface: Send + Sync {
    /// Viewport the user is currently looking at, if the surface tracks one
    fn current_viewport(&self) -> Option<Viewport> {
        None
    }

    /// Set pan and zoom
    fn apply_viewport(&self, viewport: Viewport);

    /// Frame every node
    fn fit_view(&self);

    /// Resolves once the surface has rendered the latest graph
    ///
    /// Viewport changes are applied after this, so a render pass cannot
    /// reset them.
    async fn ready(&self);
}

/// A surface with nothing attached
pub struct NullSurface;

#[async_trait]
impl CanvasSurface for NullSurface {
    fn apply_viewport(&self, _viewport: Viewport) {}

    fn fit_view(&self) {}

    async fn ready(&self) {}
}

/// Shared flag cleared when the editor is torn down
///
/// Checked after every await; work that finishes after teardown is
/// discarded.
#[derive(Debug, Clone)]
pub struct Liveness {
    alive: Arc<AtomicBool>,
}

impl Liveness {
    pub fn new() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub fn teardown(&self) {
        self.alive.store(false, Ordering::Release);
    }

    /// `Err(Detached)` once torn down
    pub fn check(&self) -> Result<()> {
        if self.is_alive() {
            Ok(())
        } else {
            Err(StudioError::Detached)
        }
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}
