//! Response buffer management.
//!
//! One native response buffer serves every paginated call a session makes.
//! It starts at a fixed capacity and doubles whenever the native layer
//! reports that a batch did not fit; capacity never shrinks while the
//! session lives. The buffer must be released before the session closes.

use crate::backend::{BufferRef, DirectoryBackend, ServiceRef};
use dirsvc_core::{Error, Result};
use tracing::debug;

/// Initial response buffer capacity: 32 KiB.
pub const INITIAL_BUFFER_CAPACITY: usize = 32 * 1024;

/// Grow-only ledger for the session's native response buffer.
#[derive(Debug)]
pub(crate) struct ResponseBuffer {
    initial_capacity: usize,
    state: Option<(BufferRef, usize)>,
    growth_count: u32,
}

impl ResponseBuffer {
    pub(crate) fn new(initial_capacity: usize) -> Self {
        Self {
            initial_capacity,
            state: None,
            growth_count: 0,
        }
    }

    /// Allocates the buffer at its initial capacity if not already
    /// allocated. Idempotent.
    pub(crate) fn ensure(
        &mut self,
        backend: &mut dyn DirectoryBackend,
        service: ServiceRef,
    ) -> Result<BufferRef> {
        if let Some((buffer, _)) = self.state {
            return Ok(buffer);
        }
        let buffer = alloc(backend, service, self.initial_capacity)?;
        self.state = Some((buffer, self.initial_capacity));
        Ok(buffer)
    }

    /// Reallocates the buffer at twice its current capacity.
    ///
    /// Only meaningful in response to a native "buffer too small" status;
    /// callers must have ensured the buffer first.
    pub(crate) fn grow(
        &mut self,
        backend: &mut dyn DirectoryBackend,
        service: ServiceRef,
    ) -> Result<BufferRef> {
        let (old, capacity) = self
            .state
            .take()
            .ok_or_else(|| Error::InvalidRequest("grow called before buffer allocation".into()))?;
        let _ = backend.release_buffer(old);
        let doubled = capacity * 2;
        debug!(capacity = doubled, "growing directory response buffer");
        let buffer = alloc(backend, service, doubled)?;
        self.state = Some((buffer, doubled));
        self.growth_count += 1;
        Ok(buffer)
    }

    /// Releases the buffer. Safe to call when already released.
    pub(crate) fn release(&mut self, backend: &mut dyn DirectoryBackend) {
        if let Some((buffer, _)) = self.state.take() {
            let _ = backend.release_buffer(buffer);
        }
    }

    /// Current capacity, or `None` before the first allocation.
    pub(crate) fn capacity(&self) -> Option<usize> {
        self.state.map(|(_, capacity)| capacity)
    }

    /// Number of reallocations performed since the session opened.
    pub(crate) fn growth_count(&self) -> u32 {
        self.growth_count
    }
}

fn alloc(
    backend: &mut dyn DirectoryBackend,
    service: ServiceRef,
    capacity: usize,
) -> Result<BufferRef> {
    backend
        .alloc_buffer(service, capacity)
        .map_err(|status| Error::ResourceExhausted {
            code: status.code(),
            location: "buffer allocation",
        })
}
