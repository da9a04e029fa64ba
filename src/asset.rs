//! Overlay assets and their asynchronous loading.
//!
//! Loading never blocks the render loop. An [`AssetSlot`] holds the asset the
//! compositor should draw; a load started with [`AssetSlot::request`] replaces
//! it only if no newer request, cancellation, or close happened meanwhile.

use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use image::RgbaImage;
use tokio::runtime::Handle;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// A decoded overlay image, shared read-only between frames.
#[derive(Debug, Clone)]
pub struct OverlayAsset {
    image: Arc<RgbaImage>,
}

impl OverlayAsset {
    /// Wrap a decoded image. Returns `None` for an image without pixels.
    pub fn new(image: RgbaImage) -> Option<Self> {
        if image.width() == 0 || image.height() == 0 {
            return None;
        }
        Some(Self {
            image: Arc::new(image),
        })
    }

    /// Decode an encoded image (PNG with transparency is typical).
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes)?.to_rgba8();
        Self::new(image).ok_or_else(|| Error::AssetLoad {
            reference: "<memory>".to_string(),
            reason: "image has no pixels".to_string(),
        })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

/// Resolves an opaque asset reference to encoded bytes.
pub trait AssetSource: Send + Sync + 'static {
    fn fetch(&self, reference: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Reads assets from files below a root directory.
#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }
}

impl AssetSource for FileSource {
    fn fetch(&self, reference: &str) -> impl Future<Output = Result<Vec<u8>>> + Send {
        let path = self.root.join(reference);
        async move { Ok(tokio::fs::read(&path).await?) }
    }
}

/// How a finished load was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The asset is now current.
    Adopted,
    /// A newer request, cancel, or close made this load irrelevant.
    Superseded,
}

/// Handle to an in-flight load.
#[derive(Debug)]
pub struct LoadHandle {
    handle: JoinHandle<Result<LoadOutcome>>,
}

impl LoadHandle {
    /// Wait for the load to resolve. Aborted loads report
    /// [`LoadOutcome::Superseded`].
    pub async fn finished(self) -> Result<LoadOutcome> {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => Ok(LoadOutcome::Superseded),
            Err(e) => Err(Error::TaskJoin(e.to_string())),
        }
    }
}

#[derive(Debug, Default)]
struct SlotState {
    generation: u64,
    asset: Option<OverlayAsset>,
    pending: Option<AbortHandle>,
    closed: bool,
}

impl SlotState {
    /// Invalidate whatever load is in flight.
    fn supersede(&mut self) {
        self.generation += 1;
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}

/// The overlay currently selected for a session.
#[derive(Debug, Clone, Default)]
pub struct AssetSlot {
    state: Arc<Mutex<SlotState>>,
}

fn lock(state: &Mutex<SlotState>) -> MutexGuard<'_, SlotState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl AssetSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// The asset to draw this frame, if any.
    pub fn current(&self) -> Option<OverlayAsset> {
        lock(&self.state).asset.clone()
    }

    /// True while a load is in flight.
    pub fn is_loading(&self) -> bool {
        lock(&self.state).pending.is_some()
    }

    /// Install an already decoded asset, superseding any pending load.
    pub fn set(&self, asset: Option<OverlayAsset>) {
        let mut state = lock(&self.state);
        if state.closed {
            return;
        }
        state.supersede();
        state.asset = asset;
    }

    /// Start loading `reference` from `source` in the background.
    ///
    /// The current asset stays in place until the load resolves. A failed
    /// load clears it. Outside a Tokio runtime this fails with
    /// [`Error::NoRuntime`] and leaves the slot as it was.
    pub fn request<S: AssetSource>(&self, source: Arc<S>, reference: impl Into<String>) -> Result<LoadHandle> {
        let runtime = Handle::try_current().map_err(|_| Error::NoRuntime)?;
        let reference = reference.into();
        let mut state = lock(&self.state);
        if state.closed {
            return Err(Error::SessionStopped);
        }
        state.supersede();
        let generation = state.generation;
        debug!(%reference, generation, "overlay load requested");

        let slot = Arc::clone(&self.state);
        let handle = runtime.spawn(load(slot, generation, source, reference));
        state.pending = Some(handle.abort_handle());
        Ok(LoadHandle { handle })
    }

    /// Abandon any in-flight load, keeping the current asset.
    pub fn cancel(&self) {
        lock(&self.state).supersede();
    }

    /// Abandon any in-flight load and drop the current asset.
    pub fn clear(&self) {
        let mut state = lock(&self.state);
        state.supersede();
        state.asset = None;
    }

    /// Clear the slot and refuse further loads.
    pub fn close(&self) {
        let mut state = lock(&self.state);
        state.supersede();
        state.asset = None;
        state.closed = true;
    }
}

async fn load<S: AssetSource>(
    slot: Arc<Mutex<SlotState>>,
    generation: u64,
    source: Arc<S>,
    reference: String,
) -> Result<LoadOutcome> {
    let decoded = match source.fetch(&reference).await {
        Ok(bytes) => tokio::task::spawn_blocking(move || OverlayAsset::decode(&bytes))
            .await
            .map_err(|e| Error::TaskJoin(e.to_string()))
            .and_then(|decoded| decoded),
        Err(e) => Err(e),
    };

    let mut state = lock(&slot);
    if state.generation != generation || state.closed {
        debug!(%reference, generation, "discarding stale overlay load");
        return Ok(LoadOutcome::Superseded);
    }
    state.pending = None;

    match decoded {
        Ok(asset) => {
            info!(%reference, width = asset.width(), height = asset.height(), "overlay adopted");
            state.asset = Some(asset);
            Ok(LoadOutcome::Adopted)
        }
        Err(e) => {
            warn!(%reference, error = %e, "overlay load failed");
            state.asset = None;
            Err(match e {
                Error::AssetLoad { reason, .. } => Error::AssetLoad { reference, reason },
                other => Error::AssetLoad {
                    reference,
                    reason: other.to_string(),
                },
            })
        }
    }
}
