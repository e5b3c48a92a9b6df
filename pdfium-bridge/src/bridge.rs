//! The handle-based facade over an engine.

use crate::config::BridgeConfig;
use crate::document::close_document_in;
use crate::engine::Engine;
use crate::error::{check, Result};
use crate::registry::{LiveCounts, Registry};
use crate::runtime::EngineRuntime;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard};

/// Entry point for every operation on documents, pages, text and outlines.
///
/// A bridge owns the handle registry for the resources it opened and shares
/// the engine lifecycle through an [`EngineRuntime`]. Operations hold the
/// runtime's engine lock and then the registry lock for the whole engine
/// call and its error translation, so engine calls never interleave, even
/// across bridges sharing a runtime.
///
/// # Example
///
/// ```ignore
/// let bridge = Bridge::with_pdfium();
/// let doc = bridge.open_file(File::open("document.pdf")?, None)?;
/// let mut size = Size::default();
/// let page = bridge.open_page(doc, 0, &mut size)?;
/// bridge.close_page(page)?;
/// bridge.close_document(doc)?;
/// ```
pub struct Bridge<E: Engine> {
    runtime: Arc<EngineRuntime<E>>,
    registry: Mutex<Registry<E>>,
    config: BridgeConfig,
}

impl<E: Engine> Bridge<E> {
    pub fn new(runtime: Arc<EngineRuntime<E>>) -> Self {
        Self::with_config(runtime, BridgeConfig::default())
    }

    pub fn with_config(runtime: Arc<EngineRuntime<E>>, config: BridgeConfig) -> Self {
        Self {
            runtime,
            registry: Mutex::new(Registry::new()),
            config,
        }
    }

    pub fn runtime(&self) -> &Arc<EngineRuntime<E>> {
        &self.runtime
    }

    pub fn engine(&self) -> &E {
        self.runtime.engine()
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Number of live handles of each kind.
    pub fn live_counts(&self) -> LiveCounts {
        self.lock().live_counts()
    }

    /// Serialize against the runtime, then lock this bridge's registry.
    pub(crate) fn lock(&self) -> Session<'_, E> {
        let serial = self.runtime.serialize();
        let registry = self
            .registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Session {
            registry,
            _serial: serial,
        }
    }
}

/// Registry access with the engine held. Fields drop in order, so the
/// registry is unlocked before the engine.
pub(crate) struct Session<'a, E: Engine> {
    registry: MutexGuard<'a, Registry<E>>,
    _serial: MutexGuard<'a, ()>,
}

impl<E: Engine> Deref for Session<'_, E> {
    type Target = Registry<E>;

    fn deref(&self) -> &Registry<E> {
        &self.registry
    }
}

impl<E: Engine> DerefMut for Session<'_, E> {
    fn deref_mut(&mut self) -> &mut Registry<E> {
        &mut self.registry
    }
}

impl<E: Engine> Drop for Bridge<E> {
    /// Close every document still open, along with its pages, text pages
    /// and searches, releasing the runtime once per document.
    fn drop(&mut self) {
        let _serial = self.runtime.serialize();
        let registry = self
            .registry
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for document in registry.documents.handles() {
            tracing::debug!(?document, "Closing document left open at drop");
            if let Err(err) = close_document_in(&self.runtime, registry, document) {
                tracing::warn!(?document, "Closing document at drop: {}", err);
            }
        }
    }
}

/// Run the engine's two-call buffer protocol: ask for the size with an empty
/// buffer, then fill one of that size. The register is checked after each call.
pub(crate) fn fetch_buffer<E: Engine>(
    engine: &E,
    mut fetch: impl FnMut(&mut [u8]) -> usize,
) -> Result<Vec<u8>> {
    let needed = fetch(&mut []);
    check(engine)?;
    if needed == 0 {
        return Ok(Vec::new());
    }
    let mut buffer = vec![0u8; needed];
    let written = fetch(&mut buffer);
    check(engine)?;
    buffer.truncate(written.min(needed));
    Ok(buffer)
}

#[cfg(feature = "pdfium")]
impl Bridge<crate::pdfium::Pdfium> {
    /// A bridge over the process-wide PDFium runtime.
    pub fn with_pdfium() -> Self {
        Self::new(crate::pdfium::Pdfium::shared_runtime())
    }
}

impl<E: Engine> std::fmt::Debug for Bridge<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("runtime", &self.runtime)
            .field("live", &self.live_counts())
            .field("config", &self.config)
            .finish()
    }
}
