//! Native directory backend abstraction.
//!
//! The engine never talks to a platform directory API directly. Everything
//! goes through [`DirectoryBackend`], one synchronous method per native
//! entry point. A production implementation wraps the host operating
//! system's directory-service library; tests substitute mocks or scripted
//! in-memory backends.
//!
//! Every method on the trait **blocks the calling thread** until the native
//! layer returns. The engine takes no position on scheduling: an embedding
//! layer that must keep a cooperative runtime responsive is responsible for
//! releasing its scheduling token around these calls.

use dirsvc_core::Result;

/// Status code returned by every native call.
///
/// The code space belongs to the platform; the constants below are the codes
/// the engine gives meaning to. Any other value is treated as a generic
/// directory fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeStatus(pub i32);

impl NativeStatus {
    /// Success.
    pub const NO_ERROR: Self = Self(0);
    /// The directory-service connection could not be established.
    pub const OPEN_FAILED: Self = Self(-14002);
    /// The requested node does not exist.
    pub const NODE_NOT_FOUND: Self = Self(-14008);
    /// The response buffer is too small for the next batch.
    pub const BUFFER_TOO_SMALL: Self = Self(-14069);
    /// A native data buffer could not be allocated.
    pub const NULL_DATA_BUFFER: Self = Self(-14081);
    /// The supplied credentials were rejected.
    pub const AUTH_FAILED: Self = Self(-14090);
    /// A native list allocation failed.
    pub const ALLOC_FAILED: Self = Self(-14097);
    /// The requested record does not exist.
    pub const RECORD_NOT_FOUND: Self = Self(-14136);

    /// Raw numeric code.
    #[must_use]
    pub const fn code(self) -> i32 {
        self.0
    }

    /// True when the status asks for a larger response buffer.
    #[must_use]
    pub const fn is_buffer_too_small(self) -> bool {
        self.0 == Self::BUFFER_TOO_SMALL.0
    }
}

/// Result type at the native-call boundary.
pub type NativeResult<T> = std::result::Result<T, NativeStatus>;

/// Opaque reference to an open directory-service connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceRef(pub u32);

/// Opaque reference to an open directory node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef(pub u32);

/// Opaque reference to a transiently opened record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordRef(pub u32);

/// Opaque reference to a native response buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferRef(pub u32);

/// Opaque continuation token: more results remain for the same query state.
///
/// Must be passed back unchanged on the next call, and explicitly released
/// when iteration is abandoned before exhaustion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Continuation(pub u64);

/// Native authentication exchange selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// One-step clear-text credential check
    ClearText,
    /// HTTP Digest challenge/response relay
    DigestMd5,
    /// Proxied SASL exchange (Digest-MD5 mechanism)
    SaslProxy,
}

impl AuthMethod {
    /// The native auth-type tag selecting this exchange.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::ClearText => "dsAuthMethodStandard:dsAuthClearText",
            Self::DigestMd5 => "dsAuthMethodStandard:dsAuthDIGEST_MD5",
            Self::SaslProxy => "dsAuthMethodStandard:dsAuthSASLProxy",
        }
    }
}

/// One attribute as returned by the native layer: a name plus raw value
/// payloads in native order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttribute {
    /// Attribute name
    pub name: String,
    /// Raw value payloads, one per attribute value
    pub values: Vec<Vec<u8>>,
}

/// One record as returned by the native layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Record name
    pub name: String,
    /// Attributes in native order
    pub attributes: Vec<RawAttribute>,
}

/// One batch of records from a paginated list or search call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordBatch {
    /// Records in native order
    pub records: Vec<RawRecord>,
    /// Token for the next batch, or `None` when exhausted
    pub continuation: Option<Continuation>,
}

/// One batch of node names from the paginated node enumeration call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeBatch {
    /// Node path names in native order
    pub names: Vec<String>,
    /// Token for the next batch, or `None` when exhausted
    pub continuation: Option<Continuation>,
}

/// Filter state for a record list call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    /// Record names to match (the wildcard constant lists everything)
    pub record_names: Vec<String>,
    /// Record types to match
    pub record_types: Vec<String>,
    /// Attribute names to return
    pub attributes: Vec<String>,
    /// Maximum records to return, 0 = unbounded
    pub max_count: u32,
}

/// Filter state for a pattern-match search call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Attribute to match against; empty for a compound expression
    pub attribute: String,
    /// Match pattern, or the pre-formed compound filter expression
    pub pattern: String,
    /// Match-type code with the case-insensitivity flag folded in
    pub match_code: u32,
    /// Record types to match
    pub record_types: Vec<String>,
    /// Attribute names to return
    pub attributes: Vec<String>,
    /// Maximum records to return, 0 = unbounded
    pub max_count: u32,
}

/// The synchronous native directory API.
///
/// Handle discipline: every `open_*`/`alloc_*` return value is owned by the
/// caller and must be paired with the matching `close_*`/`release_*` call.
/// Paginated calls take a [`BufferRef`] and must fail with
/// [`NativeStatus::BUFFER_TOO_SMALL`] when the serialized batch does not fit
/// the buffer's capacity. Length-prefixed fields in authentication payloads
/// and responses use little-endian `u32` prefixes.
#[cfg_attr(test, mockall::automock)]
pub trait DirectoryBackend: Send {
    /// Opens the directory-service connection. Blocks.
    fn open_service(&mut self) -> NativeResult<ServiceRef>;

    /// Closes the directory-service connection. Blocks.
    fn close_service(&mut self, service: ServiceRef) -> NativeResult<()>;

    /// Opens the node at the given path components. Blocks.
    fn open_node(&mut self, service: ServiceRef, path: &[String]) -> NativeResult<NodeRef>;

    /// Closes an open node. Blocks.
    fn close_node(&mut self, node: NodeRef) -> NativeResult<()>;

    /// Allocates a response buffer of the given capacity. Blocks.
    fn alloc_buffer(&mut self, service: ServiceRef, capacity: usize) -> NativeResult<BufferRef>;

    /// Releases a response buffer. Blocks.
    fn release_buffer(&mut self, buffer: BufferRef) -> NativeResult<()>;

    /// Enumerates directory nodes into the buffer. Blocks.
    fn list_nodes(
        &mut self,
        service: ServiceRef,
        buffer: BufferRef,
        continuation: Option<Continuation>,
    ) -> NativeResult<NodeBatch>;

    /// Reads attributes of an open node into the buffer. Blocks.
    fn node_info(
        &mut self,
        node: NodeRef,
        buffer: BufferRef,
        attributes: &[String],
    ) -> NativeResult<Vec<RawAttribute>>;

    /// Lists records matching the filter state into the buffer. Blocks.
    fn record_list(
        &mut self,
        node: NodeRef,
        buffer: BufferRef,
        request: &ListRequest,
        continuation: Option<Continuation>,
    ) -> NativeResult<RecordBatch>;

    /// Pattern-match record search into the buffer. Blocks.
    fn record_search(
        &mut self,
        node: NodeRef,
        buffer: BufferRef,
        request: &SearchRequest,
        continuation: Option<Continuation>,
    ) -> NativeResult<RecordBatch>;

    /// Opens a record by type and name. Blocks.
    fn open_record(
        &mut self,
        node: NodeRef,
        record_type: &str,
        name: &str,
    ) -> NativeResult<RecordRef>;

    /// Closes a transiently opened record. Blocks.
    fn close_record(&mut self, record: RecordRef) -> NativeResult<()>;

    /// Performs one native authentication exchange against a node. Blocks.
    ///
    /// `payload` is the packed credential buffer; the returned bytes are the
    /// native step-response buffer (may be empty).
    fn authenticate(
        &mut self,
        node: NodeRef,
        method: AuthMethod,
        payload: &[u8],
        buffer: BufferRef,
    ) -> NativeResult<Vec<u8>>;

    /// Releases a continuation token abandoned before exhaustion. Blocks.
    fn release_continuation(&mut self, continuation: Continuation) -> NativeResult<()>;
}

/// Maps a non-success native status to the engine error type.
pub(crate) fn directory_error(status: NativeStatus, location: &'static str) -> dirsvc_core::Error {
    dirsvc_core::Error::directory(status.code(), location)
}

/// Splits a slash-delimited node path into its components.
///
/// # Errors
///
/// Returns [`dirsvc_core::Error::InvalidRequest`] when the path contains no
/// components.
pub(crate) fn split_node_path(path: &str) -> Result<Vec<String>> {
    let components: Vec<String> = path
        .split('/')
        .filter(|component| !component.is_empty())
        .map(str::to_string)
        .collect();
    if components.is_empty() {
        return Err(dirsvc_core::Error::InvalidRequest(format!(
            "node path `{path}` has no components"
        )));
    }
    Ok(components)
}
