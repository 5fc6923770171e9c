// Presentable surface handed to the render surface binder

use crate::PlayerHandle;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// How decoded frames are laid out inside the binder's region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoGravity {
    /// Aspect-fit, letterboxed
    #[default]
    ResizeAspect,
    /// Aspect-fill, cropped
    ResizeAspectFill,
    /// Stretch to fill
    Resize,
}

struct SurfaceInner {
    handle: PlayerHandle,
    layer: u64,
    gravity: VideoGravity,
    attached: AtomicBool,
}

/// Shared view of an instance's presentable layer
///
/// The binder only reads from it. The owning instance detaches every surface
/// it handed out before the engine is released, after which `layer()` is `None`.
#[derive(Clone)]
pub struct RenderSurface {
    inner: Arc<SurfaceInner>,
}

impl RenderSurface {
    pub fn new(handle: PlayerHandle, layer: u64, gravity: VideoGravity) -> Self {
        Self {
            inner: Arc::new(SurfaceInner {
                handle,
                layer,
                gravity,
                attached: AtomicBool::new(true),
            }),
        }
    }

    pub fn handle(&self) -> PlayerHandle {
        self.inner.handle
    }

    /// Raw platform layer, or `None` once the engine behind it is gone
    pub fn layer(&self) -> Option<u64> {
        if self.is_attached() {
            Some(self.inner.layer)
        } else {
            None
        }
    }

    pub fn gravity(&self) -> VideoGravity {
        self.inner.gravity
    }

    pub fn is_attached(&self) -> bool {
        self.inner.attached.load(Ordering::Acquire)
    }

    pub fn detach(&self) {
        if self.inner.attached.swap(false, Ordering::AcqRel) {
            log::debug!("[surface] detached layer for player {}", self.inner.handle);
        }
    }
}

impl std::fmt::Debug for RenderSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderSurface")
            .field("handle", &self.inner.handle)
            .field("layer", &self.inner.layer)
            .field("gravity", &self.inner.gravity)
            .field("attached", &self.is_attached())
            .finish()
    }
}
