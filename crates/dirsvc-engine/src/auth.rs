//! Native authentication exchanges.
//!
//! Three exchange shapes are supported: one-step clear-text, HTTP Digest
//! relay, and the proxied SASL Digest-MD5 exchange used against nodes that
//! cannot authenticate natively. Credentials travel in a packed buffer of
//! little-endian length-prefixed fields, matching the wire layout the
//! native layer expects.
//!
//! Outcome taxonomy: rejected credentials are a clean boolean result and
//! leave the session intact; any other native fault tears the session down
//! so the next operation starts from a fresh connection.

use crate::backend::{directory_error, AuthMethod, NativeStatus};
use crate::session::Session;
use dirsvc_core::{Error, Result};
use secrecy::{ExposeSecret, SecretString};

/// SASL mechanism name used for every proxied exchange.
pub const SASL_MECHANISM_DIGEST_MD5: &str = "DIGEST-MD5";

/// Result of one native authentication exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AuthOutcome {
    /// The exchange succeeded; carries the native step-response buffer.
    Accepted(Vec<u8>),
    /// The credentials were rejected. The session stays open.
    Rejected,
}

/// Packs credential fields into the native wire layout: each field is
/// prefixed with its byte length as a little-endian `u32`.
pub(crate) fn pack_auth_fields(fields: &[&[u8]]) -> Vec<u8> {
    let total: usize = fields.iter().map(|f| 4 + f.len()).sum();
    let mut packed = Vec::with_capacity(total);
    for field in fields {
        let len = u32::try_from(field.len()).unwrap_or(u32::MAX);
        packed.extend_from_slice(&len.to_le_bytes());
        packed.extend_from_slice(field);
    }
    packed
}

/// Decodes the first length-prefixed field of a native step-response buffer
/// as UTF-8 text.
pub(crate) fn read_first_field(bytes: &[u8]) -> Result<String> {
    if bytes.len() < 4 {
        return Err(Error::MalformedData(
            "auth response buffer is truncated".to_string(),
        ));
    }
    let len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    let field = bytes
        .get(4..4 + len)
        .ok_or_else(|| Error::MalformedData("auth response field overruns buffer".to_string()))?;
    String::from_utf8(field.to_vec())
        .map_err(|_| Error::MalformedData("auth response field is not valid UTF-8".to_string()))
}

impl Session {
    /// One-step clear-text credential check against the node at `node_path`.
    ///
    /// Returns `false` when the credentials are rejected; the session stays
    /// open for further calls.
    ///
    /// # Errors
    ///
    /// Returns a directory error for any native fault other than rejected
    /// credentials. Such faults also reset the session.
    pub fn authenticate_clear_text(
        &mut self,
        node_path: &str,
        identifier: &str,
        secret: &SecretString,
    ) -> Result<bool> {
        if identifier.is_empty() {
            return Err(Error::InvalidRequest(
                "identifier must not be empty".to_string(),
            ));
        }
        let payload = pack_auth_fields(&[
            identifier.as_bytes(),
            secret.expose_secret().as_bytes(),
        ]);
        match self.run_auth(node_path, AuthMethod::ClearText, &payload)? {
            AuthOutcome::Accepted(_) => Ok(true),
            AuthOutcome::Rejected => Ok(false),
        }
    }

    /// Relays a completed HTTP Digest exchange to the node at `node_path`.
    ///
    /// The packed buffer carries the identifier, the server challenge, the
    /// client response, and the HTTP method. An empty `method` is omitted
    /// from the buffer entirely rather than sent as a zero-length field.
    ///
    /// # Errors
    ///
    /// Returns a directory error for any native fault other than rejected
    /// credentials. Such faults also reset the session.
    pub fn authenticate_digest(
        &mut self,
        node_path: &str,
        identifier: &str,
        challenge: &str,
        response: &str,
        method: &str,
    ) -> Result<bool> {
        if identifier.is_empty() {
            return Err(Error::InvalidRequest(
                "identifier must not be empty".to_string(),
            ));
        }
        let payload = if method.is_empty() {
            pack_auth_fields(&[
                identifier.as_bytes(),
                challenge.as_bytes(),
                response.as_bytes(),
            ])
        } else {
            pack_auth_fields(&[
                identifier.as_bytes(),
                challenge.as_bytes(),
                response.as_bytes(),
                method.as_bytes(),
            ])
        };
        match self.run_auth(node_path, AuthMethod::DigestMd5, &payload)? {
            AuthOutcome::Accepted(_) => Ok(true),
            AuthOutcome::Rejected => Ok(false),
        }
    }

    /// Runs one proxied SASL Digest-MD5 step against the node at
    /// `node_path`.
    ///
    /// When `want_step` is set and the exchange succeeds, the first field of
    /// the native response buffer is decoded as UTF-8 and returned as the
    /// server's challenge or next-step value. A zero-length identifier with
    /// a zero-length payload is a valid shape used to harvest the initial
    /// server challenge.
    ///
    /// # Errors
    ///
    /// Returns a directory error for any native fault other than rejected
    /// credentials, or a data error when a requested step field cannot be
    /// decoded. Native faults also reset the session.
    pub fn authenticate_sasl_digest(
        &mut self,
        node_path: &str,
        identifier: &str,
        payload: &[u8],
        want_step: bool,
    ) -> Result<(bool, Option<String>)> {
        let packed = pack_auth_fields(&[
            identifier.as_bytes(),
            SASL_MECHANISM_DIGEST_MD5.as_bytes(),
            payload,
        ]);
        match self.run_auth(node_path, AuthMethod::SaslProxy, &packed)? {
            AuthOutcome::Accepted(response) => {
                let step = if want_step {
                    Some(read_first_field(&response)?)
                } else {
                    None
                };
                Ok((true, step))
            }
            AuthOutcome::Rejected => Ok((false, None)),
        }
    }

    /// Common exchange core: resolve the node, ensure the response buffer,
    /// run the native call, classify the status.
    fn run_auth(
        &mut self,
        node_path: &str,
        method: AuthMethod,
        payload: &[u8],
    ) -> Result<AuthOutcome> {
        let resolved = self.resolve_node(Some(node_path))?;
        let buffer = match self.ensure_buffer() {
            Ok(buffer) => buffer,
            Err(err) => {
                self.finish_node(resolved);
                return Err(err);
            }
        };
        let outcome = self
            .backend
            .authenticate(resolved.node, method, payload, buffer);
        self.finish_node(resolved);
        match outcome {
            Ok(response) => Ok(AuthOutcome::Accepted(response)),
            Err(status) if status == NativeStatus::AUTH_FAILED => Ok(AuthOutcome::Rejected),
            Err(status) => {
                // Anything beyond a credential rejection leaves the native
                // session in an unknown state.
                self.force_close(status);
                Err(directory_error(status, "authenticate"))
            }
        }
    }
}
