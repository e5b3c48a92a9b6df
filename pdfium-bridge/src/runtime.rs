//! Reference-counted engine lifecycle.

use crate::engine::Library;
use crate::error::{check, PdfError, Result};
use std::sync::{Mutex, MutexGuard};

/// Owns the engine and counts its users.
///
/// The engine is initialized when the count goes 0→1 and torn down when it
/// goes 1→0. Every open document holds one count. Share one runtime between
/// bridges with `Arc`; the count is guarded by a mutex so unrelated
/// documents may open and close from different threads, and engine calls
/// from all bridges go through [`EngineRuntime::serialize`].
///
/// # Example
///
/// ```ignore
/// let runtime = Arc::new(EngineRuntime::new(Pdfium::new()));
/// runtime.acquire()?;   // engine initialized
/// runtime.acquire()?;   // shared
/// runtime.release()?;
/// runtime.release()?;   // engine torn down
/// ```
pub struct EngineRuntime<L> {
    engine: L,
    users: Mutex<usize>,
    serial: Mutex<()>,
}

impl<L: Library> EngineRuntime<L> {
    pub fn new(engine: L) -> Self {
        Self {
            engine,
            users: Mutex::new(0),
            serial: Mutex::new(()),
        }
    }

    /// The wrapped engine.
    pub fn engine(&self) -> &L {
        &self.engine
    }

    /// Register one user, initializing the engine if it is the first.
    ///
    /// On init failure the count is left unchanged.
    pub fn acquire(&self) -> Result<()> {
        let mut users = self.lock_users();
        if *users == 0 {
            self.engine.init_library();
            check(&self.engine)?;
            tracing::debug!("PDFium library initialized");
        }
        *users += 1;
        Ok(())
    }

    /// Drop one user, tearing the engine down after the last one.
    ///
    /// The count reaches zero even when teardown reports an error.
    pub fn release(&self) -> Result<()> {
        let mut users = self.lock_users();
        match *users {
            0 => {
                tracing::warn!("EngineRuntime::release called without a matching acquire");
                Err(PdfError::LibraryNotInitialized)
            }
            1 => {
                *users = 0;
                self.engine.destroy_library();
                tracing::debug!("PDFium library destroyed");
                check(&self.engine)
            }
            _ => {
                *users -= 1;
                Ok(())
            }
        }
    }

    /// Exclusive access to the engine. Every bridge on this runtime holds it
    /// for the whole of an engine call and the error check that follows.
    pub fn serialize(&self) -> MutexGuard<'_, ()> {
        self.serial.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of outstanding acquires.
    pub fn users(&self) -> usize {
        *self.lock_users()
    }

    pub fn is_initialized(&self) -> bool {
        self.users() > 0
    }

    fn lock_users(&self) -> MutexGuard<'_, usize> {
        // A panic while holding the lock cannot leave the count half-updated.
        self.users.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<L> std::fmt::Debug for EngineRuntime<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineRuntime")
            .field("users", &self.users)
            .finish_non_exhaustive()
    }
}
