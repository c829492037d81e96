//! Public directory handle.
//!
//! [`DirectoryHandle`] is the caller-facing surface: each method validates
//! its arguments, drives the session through one complete operation, and
//! returns fully decoded results. The underlying connection opens lazily on
//! first use and is torn down on [`close`](DirectoryHandle::close) or drop.

use crate::backend::DirectoryBackend;
use crate::config::DirectoryConfig;
use crate::query::{QueryPlan, RecordFilter};
use crate::session::Session;
use dirsvc_core::{AttrValue, AttributeSpec, MatchType, RecordResult, Result};
use secrecy::SecretString;
use std::collections::HashMap;

/// Handle to a directory service.
#[derive(Debug)]
pub struct DirectoryHandle {
    session: Session,
}

impl DirectoryHandle {
    /// Creates a handle over the given backend. No native call is made
    /// until the first operation.
    #[must_use]
    pub fn new(config: DirectoryConfig, backend: Box<dyn DirectoryBackend>) -> Self {
        Self {
            session: Session::new(config, backend),
        }
    }

    /// Lists every record of the given types on the default node, returning
    /// the requested attributes for each.
    ///
    /// # Errors
    ///
    /// Returns an argument error for empty record types or an empty
    /// attribute specification, or a directory error when a native call
    /// fails. No partial results are returned.
    pub fn list_all_records_with_attributes(
        &mut self,
        record_types: &[&str],
        attributes: &AttributeSpec,
        max_count: u32,
    ) -> Result<Vec<RecordResult>> {
        let plan = QueryPlan {
            node_path: None,
            record_types: owned(record_types),
            filter: RecordFilter::AllNames,
            max_count,
        };
        self.session.query_records(&plan, attributes)
    }

    /// Queries the default node for records whose `attribute` matches
    /// `pattern` under the given match type.
    ///
    /// # Errors
    ///
    /// Returns an argument error for malformed input, or a directory error
    /// when a native call fails.
    #[allow(clippy::too_many_arguments)]
    pub fn query_records_with_attribute(
        &mut self,
        attribute: &str,
        pattern: &str,
        match_type: MatchType,
        case_insensitive: bool,
        record_types: &[&str],
        attributes: &AttributeSpec,
        max_count: u32,
    ) -> Result<Vec<RecordResult>> {
        let plan = QueryPlan {
            node_path: None,
            record_types: owned(record_types),
            filter: RecordFilter::Match {
                attribute: attribute.to_string(),
                pattern: pattern.to_string(),
                match_type,
                case_insensitive,
            },
            max_count,
        };
        self.session.query_records(&plan, attributes)
    }

    /// Queries the default node with a pre-formed compound filter
    /// expression.
    ///
    /// # Errors
    ///
    /// Returns an argument error for malformed input, or a directory error
    /// when a native call fails.
    pub fn query_records_with_attributes(
        &mut self,
        expression: &str,
        case_insensitive: bool,
        record_types: &[&str],
        attributes: &AttributeSpec,
        max_count: u32,
    ) -> Result<Vec<RecordResult>> {
        let plan = QueryPlan {
            node_path: None,
            record_types: owned(record_types),
            filter: RecordFilter::Compound {
                expression: expression.to_string(),
                case_insensitive,
            },
            max_count,
        };
        self.session.query_records(&plan, attributes)
    }

    /// Enumerates the directory nodes reachable from this service.
    ///
    /// # Errors
    ///
    /// Returns a directory error when a native call fails.
    pub fn list_nodes(&mut self) -> Result<Vec<String>> {
        self.session.list_nodes()
    }

    /// Reads the requested attributes of the node at `node_path`.
    ///
    /// # Errors
    ///
    /// Returns an argument error for an empty attribute specification, or a
    /// directory error when a native call fails.
    pub fn get_node_attributes(
        &mut self,
        node_path: &str,
        attributes: &AttributeSpec,
    ) -> Result<HashMap<String, AttrValue>> {
        self.session.node_attributes(node_path, attributes)
    }

    /// Probes whether a record of the given type and name exists on the
    /// default node.
    ///
    /// # Errors
    ///
    /// Returns an argument error for empty inputs, or a directory error
    /// when a native call fails.
    pub fn record_exists(&mut self, record_type: &str, name: &str) -> Result<bool> {
        self.session.record_exists(record_type, name)
    }

    /// Checks clear-text credentials against the node at `node_path`.
    /// Returns `false` for rejected credentials.
    ///
    /// # Errors
    ///
    /// Returns a directory error for any native fault other than rejected
    /// credentials; such faults also reset the underlying session.
    pub fn authenticate_user_basic(
        &mut self,
        node_path: &str,
        identifier: &str,
        secret: &SecretString,
    ) -> Result<bool> {
        self.session
            .authenticate_clear_text(node_path, identifier, secret)
    }

    /// Relays a completed HTTP Digest exchange to the node at `node_path`.
    /// Returns `false` for rejected credentials.
    ///
    /// # Errors
    ///
    /// Returns a directory error for any native fault other than rejected
    /// credentials; such faults also reset the underlying session.
    pub fn authenticate_user_digest(
        &mut self,
        node_path: &str,
        identifier: &str,
        challenge: &str,
        response: &str,
        method: &str,
    ) -> Result<bool> {
        self.session
            .authenticate_digest(node_path, identifier, challenge, response, method)
    }

    /// Authenticates a Digest-MD5 response against an Active Directory
    /// node via the proxied SASL exchange. Returns `false` for rejected
    /// credentials.
    ///
    /// # Errors
    ///
    /// Returns a directory error for any native fault other than rejected
    /// credentials; such faults also reset the underlying session.
    pub fn authenticate_user_digest_to_active_directory(
        &mut self,
        node_path: &str,
        identifier: &str,
        response: &str,
    ) -> Result<bool> {
        let (ok, _) = self.session.authenticate_sasl_digest(
            node_path,
            identifier,
            response.as_bytes(),
            false,
        )?;
        Ok(ok)
    }

    /// Harvests the initial Digest-MD5 challenge from an Active Directory
    /// node. Returns `None` when the node declines the exchange.
    ///
    /// # Errors
    ///
    /// Returns a directory error for any native fault other than a declined
    /// exchange, or a data error when the challenge cannot be decoded.
    pub fn get_digest_md5_challenge_from_active_directory(
        &mut self,
        node_path: &str,
    ) -> Result<Option<String>> {
        let (ok, step) = self
            .session
            .authenticate_sasl_digest(node_path, "", b"", true)?;
        if ok {
            Ok(step)
        } else {
            Ok(None)
        }
    }

    /// True while the native connection is established.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.session.is_open()
    }

    /// Closes the underlying session, releasing every native resource.
    /// Safe to call repeatedly; the handle reopens lazily if used again.
    pub fn close(&mut self) {
        self.session.close();
    }
}

impl Drop for DirectoryHandle {
    fn drop(&mut self) {
        self.session.close();
    }
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}
