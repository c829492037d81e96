//! # dirsvc-core
//!
//! Core types for the dirsvc directory-service engine.
//!
//! This crate provides the foundational vocabulary shared by the engine and
//! by callers embedding it: the structured error taxonomy, attribute request
//! specifications and record results, pattern match types, and well-known
//! directory constants.
//!
//! ## Modules
//!
//! - [`error`] - Error types and the structured error object
//! - [`attrs`] - Attribute request specifications and record results
//! - [`matching`] - Pattern match types for attribute searches
//! - [`wellknown`] - Standard record-type and attribute-name constants

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod attrs;
pub mod error;
pub mod matching;
pub mod wellknown;

// Re-export commonly used types
pub use attrs::{AttrEncoding, AttrValue, AttributeSpec, RecordResult};
pub use error::{Error, ErrorObject, Result};
pub use matching::MatchType;
