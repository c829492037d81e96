//! Configuration for a directory session.

use crate::buffer::INITIAL_BUFFER_CAPACITY;
use dirsvc_core::{Error, Result};

/// Configuration for connecting to a directory service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryConfig {
    default_node: String,
    initial_buffer_capacity: usize,
    cache_nodes: bool,
}

impl DirectoryConfig {
    /// Creates a configuration targeting the given default node path.
    ///
    /// # Errors
    ///
    /// Returns an error when the node path is empty.
    pub fn new(default_node: impl Into<String>) -> Result<Self> {
        let default_node = default_node.into();
        if default_node.trim_matches('/').is_empty() {
            return Err(Error::ConfigError(
                "default node path must not be empty".to_string(),
            ));
        }
        Ok(Self {
            default_node,
            initial_buffer_capacity: INITIAL_BUFFER_CAPACITY,
            cache_nodes: true,
        })
    }

    /// Returns the default node path.
    #[must_use]
    pub fn default_node(&self) -> &str {
        &self.default_node
    }

    /// Returns the initial response buffer capacity in bytes.
    #[must_use]
    pub const fn initial_buffer_capacity(&self) -> usize {
        self.initial_buffer_capacity
    }

    /// Returns whether resolved named nodes are cached for reuse.
    #[must_use]
    pub const fn cache_nodes(&self) -> bool {
        self.cache_nodes
    }

    /// Overrides the initial response buffer capacity.
    #[must_use]
    pub const fn with_initial_buffer_capacity(mut self, capacity: usize) -> Self {
        self.initial_buffer_capacity = capacity;
        self
    }

    /// Enables or disables the node handle cache.
    ///
    /// Caching pays off for authentication workloads that repeatedly target
    /// the same small set of nodes; with caching off every named node is
    /// opened and closed within a single call.
    #[must_use]
    pub const fn with_node_cache(mut self, cache: bool) -> Self {
        self.cache_nodes = cache;
        self
    }
}
