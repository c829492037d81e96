//! Directory session lifecycle and node resolution.
//!
//! A [`Session`] owns at most one live directory-service connection, the
//! shared response buffer, and the node handle cache. The connection is
//! opened lazily by the first operation that needs it and torn down either
//! explicitly, on drop of the owning handle, or forcibly after a fatal
//! (non-credential) authentication fault.
//!
//! Not safe for concurrent mutation: one session is driven by one logical
//! caller at a time (see the crate docs).

use crate::backend::{
    directory_error, split_node_path, BufferRef, Continuation, DirectoryBackend, NativeStatus,
    NodeRef, ServiceRef,
};
use crate::buffer::ResponseBuffer;
use crate::config::DirectoryConfig;
use dirsvc_core::Result;
use std::collections::HashMap;
use tracing::{debug, warn};

/// A node handle resolved for one operation.
///
/// Transient nodes were opened outside the cache and must be closed when
/// the operation finishes, on success and error paths alike.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ResolvedNode {
    pub(crate) node: NodeRef,
    pub(crate) transient: bool,
}

/// One logical directory-service session.
pub struct Session {
    pub(crate) backend: Box<dyn DirectoryBackend>,
    pub(crate) config: DirectoryConfig,
    pub(crate) service: Option<ServiceRef>,
    pub(crate) default_node: Option<NodeRef>,
    pub(crate) node_cache: HashMap<String, NodeRef>,
    pub(crate) buffer: ResponseBuffer,
}

impl Session {
    /// Creates a session over the given backend. No native call is made
    /// until the first operation.
    #[must_use]
    pub fn new(config: DirectoryConfig, backend: Box<dyn DirectoryBackend>) -> Self {
        let buffer = ResponseBuffer::new(config.initial_buffer_capacity());
        Self {
            backend,
            config,
            service: None,
            default_node: None,
            node_cache: HashMap::new(),
            buffer,
        }
    }

    /// Opens the directory-service connection if not already open.
    ///
    /// # Errors
    ///
    /// Returns a directory error carrying the native status on failure.
    pub fn open(&mut self) -> Result<ServiceRef> {
        if let Some(service) = self.service {
            return Ok(service);
        }
        let service = self
            .backend
            .open_service()
            .map_err(|status| directory_error(status, "open service"))?;
        debug!(service = service.0, "directory session opened");
        self.service = Some(service);
        Ok(service)
    }

    /// Closes the connection if open: cached and default node handles are
    /// closed first, the cache cleared, the buffer released, then the
    /// service handle itself. Safe to call when already closed.
    pub fn close(&mut self) {
        if let Some(service) = self.service.take() {
            for (_, node) in self.node_cache.drain() {
                let _ = self.backend.close_node(node);
            }
            if let Some(node) = self.default_node.take() {
                let _ = self.backend.close_node(node);
            }
            self.buffer.release(self.backend.as_mut());
            let _ = self.backend.close_service(service);
            debug!("directory session closed");
        } else {
            self.node_cache.clear();
            self.default_node = None;
        }
    }

    /// Tears the session down after a fatal native status so the next
    /// operation re-establishes a clean connection.
    pub(crate) fn force_close(&mut self, status: NativeStatus) {
        warn!(
            code = status.code(),
            "fatal directory status, resetting session"
        );
        self.close();
    }

    /// True while the native connection is established.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.service.is_some()
    }

    /// Number of node handles currently cached.
    #[must_use]
    pub fn cached_node_count(&self) -> usize {
        self.node_cache.len()
    }

    /// Opens the session's configured default node if not already open.
    pub(crate) fn ensure_default_node(&mut self) -> Result<NodeRef> {
        if let Some(node) = self.default_node {
            return Ok(node);
        }
        let path = self.config.default_node().to_string();
        let node = self.open_node_uncached(&path)?;
        self.default_node = Some(node);
        Ok(node)
    }

    /// Resolves a node for one operation: the default node when no path is
    /// given, otherwise the named node via the cache (or transiently when
    /// caching is disabled).
    pub(crate) fn resolve_node(&mut self, path: Option<&str>) -> Result<ResolvedNode> {
        match path {
            None => Ok(ResolvedNode {
                node: self.ensure_default_node()?,
                transient: false,
            }),
            Some(path) => self.open_named_node(path),
        }
    }

    /// Closes a transient node once its operation is over. Best effort.
    pub(crate) fn finish_node(&mut self, resolved: ResolvedNode) {
        if resolved.transient {
            let _ = self.backend.close_node(resolved.node);
        }
    }

    /// Allocates the shared response buffer if needed.
    pub(crate) fn ensure_buffer(&mut self) -> Result<BufferRef> {
        let service = self.open()?;
        self.buffer.ensure(self.backend.as_mut(), service)
    }

    /// Doubles the shared response buffer after a "buffer too small" status.
    pub(crate) fn grow_buffer(&mut self) -> Result<BufferRef> {
        let service = self.open()?;
        self.buffer.grow(self.backend.as_mut(), service)
    }

    /// Releases an abandoned continuation token. Best effort; used on error
    /// paths where the original failure is what gets reported.
    pub(crate) fn abort_continuation(&mut self, continuation: Option<Continuation>) {
        if let Some(token) = continuation {
            let _ = self.backend.release_continuation(token);
        }
    }

    fn open_named_node(&mut self, path: &str) -> Result<ResolvedNode> {
        if !self.config.cache_nodes() {
            let node = self.open_node_uncached(path)?;
            return Ok(ResolvedNode {
                node,
                transient: true,
            });
        }
        if let Some(&node) = self.node_cache.get(path) {
            return Ok(ResolvedNode {
                node,
                transient: false,
            });
        }
        let node = self.open_node_uncached(path)?;
        self.node_cache.insert(path.to_string(), node);
        Ok(ResolvedNode {
            node,
            transient: false,
        })
    }

    fn open_node_uncached(&mut self, path: &str) -> Result<NodeRef> {
        // Path validation happens before any native resource is acquired.
        let components = split_node_path(path)?;
        let service = self.open()?;
        self.backend
            .open_node(service, &components)
            .map_err(|status| directory_error(status, "open node"))
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("service", &self.service)
            .field("default_node", &self.default_node)
            .field("cached_nodes", &self.node_cache.len())
            .field("buffer", &self.buffer)
            .finish_non_exhaustive()
    }
}
