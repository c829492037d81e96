//! Directory-service session and query engine.
//!
//! This crate drives a platform directory-service API through a narrow
//! backend trait: it manages the session lifecycle, resolves and caches
//! directory nodes, runs paginated attribute queries against a growable
//! response buffer, and performs native authentication exchanges including
//! the proxied SASL Digest-MD5 handshake.
//!
//! The caller-facing surface is [`DirectoryHandle`]; everything underneath
//! goes through [`DirectoryBackend`], which production code implements over
//! the host's directory library and tests implement in memory.
//!
//! A handle is not safe for concurrent mutation. One handle is driven by
//! one logical caller at a time; embedders that multiplex callers must
//! serialize access themselves.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod backend;
pub mod buffer;
pub mod config;
pub mod handle;
pub mod query;
pub mod session;

pub use auth::SASL_MECHANISM_DIGEST_MD5;
pub use backend::{
    AuthMethod, BufferRef, Continuation, DirectoryBackend, ListRequest, NativeResult,
    NativeStatus, NodeBatch, NodeRef, RawAttribute, RawRecord, RecordBatch, RecordRef,
    SearchRequest, ServiceRef,
};
pub use buffer::INITIAL_BUFFER_CAPACITY;
pub use config::DirectoryConfig;
pub use handle::DirectoryHandle;
pub use query::{QueryPlan, RecordFilter};
pub use session::Session;
