//! Paginated record query engine.
//!
//! One query builds its filter lists once, then loops: issue the native
//! list/search call, double the buffer and retry when the batch does not
//! fit, decode the batch, and follow the continuation token until it comes
//! back empty. A query that fails mid-pagination returns nothing; every
//! native resource it acquired is released before the error propagates.

use crate::backend::{
    directory_error, Continuation, ListRequest, NativeStatus, NodeBatch, NodeRef, RawAttribute,
    RawRecord, RecordBatch, SearchRequest, ServiceRef,
};
use crate::session::Session;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use dirsvc_core::wellknown::ALL_RECORDS;
use dirsvc_core::{
    AttrEncoding, AttrValue, AttributeSpec, Error, MatchType, RecordResult, Result,
};
use std::collections::HashMap;

/// Which records a query selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordFilter {
    /// Every record of the requested types
    AllNames,
    /// Records with one of the given names
    Names(Vec<String>),
    /// Records where an attribute matches a pattern
    Match {
        /// Attribute to match against
        attribute: String,
        /// Match pattern
        pattern: String,
        /// How the pattern is applied
        match_type: MatchType,
        /// Case-insensitive matching
        case_insensitive: bool,
    },
    /// Records matching a pre-formed compound filter expression
    Compound {
        /// The compound filter expression
        expression: String,
        /// Case-insensitive matching
        case_insensitive: bool,
    },
}

/// One record query: target node, record selection, and result cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    /// Node to query; `None` targets the session's default node
    pub node_path: Option<String>,
    /// Record types to match; must not be empty
    pub record_types: Vec<String>,
    /// Record selection
    pub filter: RecordFilter,
    /// Maximum records to return, 0 = unbounded
    pub max_count: u32,
}

enum BuiltRequest {
    List(ListRequest),
    Search(SearchRequest),
}

impl BuiltRequest {
    const fn location(&self) -> &'static str {
        match self {
            Self::List(_) => "record list",
            Self::Search(_) => "record search",
        }
    }
}

impl Session {
    /// Runs one paginated record query and decodes every requested
    /// attribute per the specification.
    ///
    /// # Errors
    ///
    /// Returns an argument error before any native call for malformed
    /// input, or a directory error carrying the native status when a call
    /// fails; no partial results are returned.
    pub fn query_records(
        &mut self,
        plan: &QueryPlan,
        attributes: &AttributeSpec,
    ) -> Result<Vec<RecordResult>> {
        validate_plan(plan, attributes)?;
        let resolved = self.resolve_node(plan.node_path.as_deref())?;
        let outcome = self.paginate(resolved.node, plan, attributes);
        self.finish_node(resolved);
        outcome
    }

    /// Enumerates the directory nodes reachable from this session.
    ///
    /// # Errors
    ///
    /// Returns a directory error carrying the native status on failure.
    pub fn list_nodes(&mut self) -> Result<Vec<String>> {
        let service = self.open()?;
        let mut names = Vec::new();
        let mut continuation: Option<Continuation> = None;
        loop {
            let batch = match self.fetch_node_batch(service, continuation) {
                Ok(batch) => batch,
                Err(err) => {
                    self.abort_continuation(continuation);
                    return Err(err);
                }
            };
            names.extend(batch.names);
            match batch.continuation {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }
        Ok(names)
    }

    /// Reads the requested attributes of one named node.
    ///
    /// # Errors
    ///
    /// Returns an argument error for an empty attribute specification, or a
    /// directory error carrying the native status when a call fails.
    pub fn node_attributes(
        &mut self,
        path: &str,
        attributes: &AttributeSpec,
    ) -> Result<HashMap<String, AttrValue>> {
        if attributes.is_empty() {
            return Err(Error::InvalidRequest(
                "no attributes requested".to_string(),
            ));
        }
        let resolved = self.resolve_node(Some(path))?;
        let outcome = self.read_node_info(resolved.node, attributes);
        self.finish_node(resolved);
        outcome
    }

    /// Probes whether a record of the given type and name exists on the
    /// default node.
    ///
    /// # Errors
    ///
    /// Returns an argument error for empty inputs, or a directory error for
    /// any native status other than success or "record not found".
    pub fn record_exists(&mut self, record_type: &str, name: &str) -> Result<bool> {
        if record_type.is_empty() || name.is_empty() {
            return Err(Error::InvalidRequest(
                "record type and name must not be empty".to_string(),
            ));
        }
        let resolved = self.resolve_node(None)?;
        match self.backend.open_record(resolved.node, record_type, name) {
            Ok(record) => {
                let _ = self.backend.close_record(record);
                Ok(true)
            }
            Err(status) if status == NativeStatus::RECORD_NOT_FOUND => Ok(false),
            Err(status) => Err(directory_error(status, "open record")),
        }
    }

    fn paginate(
        &mut self,
        node: NodeRef,
        plan: &QueryPlan,
        attributes: &AttributeSpec,
    ) -> Result<Vec<RecordResult>> {
        let request = build_request(plan, attributes);
        let mut results = Vec::new();
        let mut continuation: Option<Continuation> = None;
        loop {
            let batch = match self.fetch_record_batch(node, &request, continuation) {
                Ok(batch) => batch,
                Err(err) => {
                    self.abort_continuation(continuation);
                    return Err(err);
                }
            };
            continuation = batch.continuation;
            match decode_batch(batch.records, attributes) {
                Ok(mut decoded) => results.append(&mut decoded),
                Err(err) => {
                    self.abort_continuation(continuation);
                    return Err(err);
                }
            }
            if continuation.is_none() {
                break;
            }
        }
        Ok(results)
    }

    /// Issues one native list/search call, growing the buffer and retrying
    /// for as long as the native layer reports it too small.
    fn fetch_record_batch(
        &mut self,
        node: NodeRef,
        request: &BuiltRequest,
        continuation: Option<Continuation>,
    ) -> Result<RecordBatch> {
        loop {
            let buffer = self.ensure_buffer()?;
            let outcome = match request {
                BuiltRequest::List(list) => {
                    self.backend.record_list(node, buffer, list, continuation)
                }
                BuiltRequest::Search(search) => {
                    self.backend.record_search(node, buffer, search, continuation)
                }
            };
            match outcome {
                Ok(batch) => return Ok(batch),
                Err(status) if status.is_buffer_too_small() => {
                    self.grow_buffer()?;
                }
                Err(status) => return Err(directory_error(status, request.location())),
            }
        }
    }

    fn fetch_node_batch(
        &mut self,
        service: ServiceRef,
        continuation: Option<Continuation>,
    ) -> Result<NodeBatch> {
        loop {
            let buffer = self.ensure_buffer()?;
            match self.backend.list_nodes(service, buffer, continuation) {
                Ok(batch) => return Ok(batch),
                Err(status) if status.is_buffer_too_small() => {
                    self.grow_buffer()?;
                }
                Err(status) => return Err(directory_error(status, "list nodes")),
            }
        }
    }

    fn read_node_info(
        &mut self,
        node: NodeRef,
        attributes: &AttributeSpec,
    ) -> Result<HashMap<String, AttrValue>> {
        let names = attributes.names();
        loop {
            let buffer = self.ensure_buffer()?;
            match self.backend.node_info(node, buffer, &names) {
                Ok(raw) => return decode_attributes(raw, attributes),
                Err(status) if status.is_buffer_too_small() => {
                    self.grow_buffer()?;
                }
                Err(status) => return Err(directory_error(status, "node info")),
            }
        }
    }
}

fn validate_plan(plan: &QueryPlan, attributes: &AttributeSpec) -> Result<()> {
    if plan.record_types.is_empty() {
        return Err(Error::InvalidRequest("no record types given".to_string()));
    }
    if attributes.is_empty() {
        return Err(Error::InvalidRequest(
            "no attributes requested".to_string(),
        ));
    }
    match &plan.filter {
        RecordFilter::AllNames => Ok(()),
        RecordFilter::Names(names) => {
            if names.is_empty() {
                return Err(Error::InvalidRequest(
                    "record name filter is empty".to_string(),
                ));
            }
            Ok(())
        }
        RecordFilter::Match { attribute, .. } => {
            if attribute.is_empty() {
                return Err(Error::InvalidRequest(
                    "match attribute must not be empty".to_string(),
                ));
            }
            Ok(())
        }
        RecordFilter::Compound { expression, .. } => {
            if expression.is_empty() {
                return Err(Error::InvalidRequest(
                    "compound expression must not be empty".to_string(),
                ));
            }
            Ok(())
        }
    }
}

fn build_request(plan: &QueryPlan, attributes: &AttributeSpec) -> BuiltRequest {
    let attribute_names = attributes.names();
    match &plan.filter {
        RecordFilter::AllNames => BuiltRequest::List(ListRequest {
            record_names: vec![ALL_RECORDS.to_string()],
            record_types: plan.record_types.clone(),
            attributes: attribute_names,
            max_count: plan.max_count,
        }),
        RecordFilter::Names(names) => BuiltRequest::List(ListRequest {
            record_names: names.clone(),
            record_types: plan.record_types.clone(),
            attributes: attribute_names,
            max_count: plan.max_count,
        }),
        RecordFilter::Match {
            attribute,
            pattern,
            match_type,
            case_insensitive,
        } => BuiltRequest::Search(SearchRequest {
            attribute: attribute.clone(),
            pattern: pattern.clone(),
            match_code: match_type.code(*case_insensitive),
            record_types: plan.record_types.clone(),
            attributes: attribute_names,
            max_count: plan.max_count,
        }),
        RecordFilter::Compound {
            expression,
            case_insensitive,
        } => BuiltRequest::Search(SearchRequest {
            attribute: String::new(),
            pattern: expression.clone(),
            match_code: MatchType::CompoundExpression.code(*case_insensitive),
            record_types: plan.record_types.clone(),
            attributes: attribute_names,
            max_count: plan.max_count,
        }),
    }
}

fn decode_batch(records: Vec<RawRecord>, spec: &AttributeSpec) -> Result<Vec<RecordResult>> {
    records
        .into_iter()
        .map(|record| decode_record(record, spec))
        .collect()
}

fn decode_record(record: RawRecord, spec: &AttributeSpec) -> Result<RecordResult> {
    let mut result = RecordResult::new(record.name);
    result.attrs = decode_attributes(record.attributes, spec)?;
    Ok(result)
}

fn decode_attributes(
    raw: Vec<RawAttribute>,
    spec: &AttributeSpec,
) -> Result<HashMap<String, AttrValue>> {
    let mut attrs = HashMap::new();
    for attribute in raw {
        // Attributes the caller never asked for are dropped.
        let Some(encoding) = spec.encoding_of(&attribute.name) else {
            continue;
        };
        // A requested attribute with zero values contributes no entry.
        if attribute.values.is_empty() {
            continue;
        }
        let mut values = Vec::with_capacity(attribute.values.len());
        for value in attribute.values {
            values.push(decode_value(&attribute.name, value, encoding)?);
        }
        let value = if values.len() == 1 {
            AttrValue::Single(values.pop().unwrap_or_default())
        } else {
            AttrValue::Multi(values)
        };
        attrs.insert(attribute.name, value);
    }
    Ok(attrs)
}

fn decode_value(name: &str, bytes: Vec<u8>, encoding: AttrEncoding) -> Result<String> {
    match encoding {
        AttrEncoding::Str => String::from_utf8(bytes).map_err(|_| {
            Error::MalformedData(format!("attribute `{name}` is not valid UTF-8"))
        }),
        AttrEncoding::Base64 => Ok(BASE64.encode(bytes)),
    }
}
