//! End-to-end flows against a scripted in-memory directory backend.
//!
//! The fake backend enforces native handle discipline: every ref it hands
//! out must be closed or released, continuation tokens must be consumed or
//! explicitly released, and record batches only fit once the response
//! buffer reaches the configured capacity.

use dirsvc_core::{AttrEncoding, AttrValue, AttributeSpec, MatchType};
use dirsvc_engine::{
    AuthMethod, BufferRef, Continuation, DirectoryBackend, DirectoryConfig, DirectoryHandle,
    ListRequest, NativeResult, NativeStatus, NodeBatch, NodeRef, RawAttribute, RawRecord,
    RecordBatch, RecordRef, SearchRequest, ServiceRef,
};
use secrecy::SecretString;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const DEFAULT_NODE: &str = "/LDAPv3/ldap.example.com";
const AD_NODE: &str = "/Active Directory/All Domains";
const USERS: &str = "dsRecTypeStandard:Users";

#[derive(Default)]
struct State {
    next_ref: u32,
    next_token: u64,
    service: Option<u32>,
    open_nodes: HashMap<u32, String>,
    open_records: Vec<u32>,
    buffers: HashMap<u32, usize>,
    pending_records: HashMap<u64, Vec<RawRecord>>,
    pending_nodes: HashMap<u64, Vec<String>>,

    records: Vec<(String, RawRecord)>,
    node_names: Vec<String>,
    users: HashMap<String, String>,
    proxy_responses: HashMap<String, Vec<u8>>,
    challenge: String,
    batch_size: usize,
    required_capacity: usize,
    auth_fault: Option<i32>,

    open_node_calls: u32,
    open_service_calls: u32,
}

impl State {
    fn fresh_ref(&mut self) -> u32 {
        self.next_ref += 1;
        self.next_ref
    }

    fn fresh_token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }

    fn all_closed(&self) -> bool {
        self.service.is_none()
            && self.open_nodes.is_empty()
            && self.open_records.is_empty()
            && self.buffers.is_empty()
            && self.pending_records.is_empty()
            && self.pending_nodes.is_empty()
    }
}

#[derive(Clone)]
struct FakeDirectory(Arc<Mutex<State>>);

impl FakeDirectory {
    fn new(state: State) -> (Self, Arc<Mutex<State>>) {
        let shared = Arc::new(Mutex::new(state));
        (Self(Arc::clone(&shared)), shared)
    }
}

fn parse_fields(mut bytes: &[u8]) -> Vec<Vec<u8>> {
    let mut fields = Vec::new();
    while bytes.len() >= 4 {
        let len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        fields.push(bytes[4..4 + len].to_vec());
        bytes = &bytes[4 + len..];
    }
    fields
}

fn pack_field(field: &[u8]) -> Vec<u8> {
    let mut packed = Vec::with_capacity(4 + field.len());
    packed.extend_from_slice(&u32::try_from(field.len()).unwrap().to_le_bytes());
    packed.extend_from_slice(field);
    packed
}

impl FakeDirectory {
    fn serve_record_batch(
        state: &mut State,
        buffer: BufferRef,
        matching: impl FnOnce(&State) -> Vec<RawRecord>,
        max_count: u32,
        continuation: Option<Continuation>,
    ) -> NativeResult<RecordBatch> {
        let capacity = *state
            .buffers
            .get(&buffer.0)
            .ok_or(NativeStatus::NULL_DATA_BUFFER)?;
        if capacity < state.required_capacity {
            return Err(NativeStatus::BUFFER_TOO_SMALL);
        }
        let mut remaining = match continuation {
            Some(token) => state
                .pending_records
                .remove(&token.0)
                .ok_or(NativeStatus(-14130))?,
            None => {
                let mut all = matching(state);
                if max_count > 0 {
                    all.truncate(max_count as usize);
                }
                all
            }
        };
        let batch: Vec<RawRecord> = remaining
            .drain(..remaining.len().min(state.batch_size))
            .collect();
        let continuation = if remaining.is_empty() {
            None
        } else {
            let token = state.fresh_token();
            state.pending_records.insert(token, remaining);
            Some(Continuation(token))
        };
        Ok(RecordBatch {
            records: batch,
            continuation,
        })
    }
}

impl DirectoryBackend for FakeDirectory {
    fn open_service(&mut self) -> NativeResult<ServiceRef> {
        let mut state = self.0.lock().unwrap();
        state.open_service_calls += 1;
        let service = state.fresh_ref();
        state.service = Some(service);
        Ok(ServiceRef(service))
    }

    fn close_service(&mut self, service: ServiceRef) -> NativeResult<()> {
        let mut state = self.0.lock().unwrap();
        assert_eq!(state.service.take(), Some(service.0), "unknown service ref");
        Ok(())
    }

    fn open_node(&mut self, _service: ServiceRef, path: &[String]) -> NativeResult<NodeRef> {
        let mut state = self.0.lock().unwrap();
        state.open_node_calls += 1;
        let joined = format!("/{}", path.join("/"));
        if joined != DEFAULT_NODE && joined != AD_NODE {
            return Err(NativeStatus::NODE_NOT_FOUND);
        }
        let node = state.fresh_ref();
        state.open_nodes.insert(node, joined);
        Ok(NodeRef(node))
    }

    fn close_node(&mut self, node: NodeRef) -> NativeResult<()> {
        let mut state = self.0.lock().unwrap();
        assert!(
            state.open_nodes.remove(&node.0).is_some(),
            "unknown node ref"
        );
        Ok(())
    }

    fn alloc_buffer(&mut self, _service: ServiceRef, capacity: usize) -> NativeResult<BufferRef> {
        let mut state = self.0.lock().unwrap();
        let buffer = state.fresh_ref();
        state.buffers.insert(buffer, capacity);
        Ok(BufferRef(buffer))
    }

    fn release_buffer(&mut self, buffer: BufferRef) -> NativeResult<()> {
        let mut state = self.0.lock().unwrap();
        assert!(
            state.buffers.remove(&buffer.0).is_some(),
            "unknown buffer ref"
        );
        Ok(())
    }

    fn list_nodes(
        &mut self,
        _service: ServiceRef,
        _buffer: BufferRef,
        continuation: Option<Continuation>,
    ) -> NativeResult<NodeBatch> {
        let mut state = self.0.lock().unwrap();
        let mut remaining = match continuation {
            Some(token) => state
                .pending_nodes
                .remove(&token.0)
                .ok_or(NativeStatus(-14130))?,
            None => state.node_names.clone(),
        };
        let batch: Vec<String> = remaining
            .drain(..remaining.len().min(state.batch_size))
            .collect();
        let continuation = if remaining.is_empty() {
            None
        } else {
            let token = state.fresh_token();
            state.pending_nodes.insert(token, remaining);
            Some(Continuation(token))
        };
        Ok(NodeBatch {
            names: batch,
            continuation,
        })
    }

    fn node_info(
        &mut self,
        _node: NodeRef,
        _buffer: BufferRef,
        _attributes: &[String],
    ) -> NativeResult<Vec<RawAttribute>> {
        Ok(vec![RawAttribute {
            name: "dsAttrTypeStandard:NodePath".to_string(),
            values: vec![DEFAULT_NODE.as_bytes().to_vec()],
        }])
    }

    fn record_list(
        &mut self,
        _node: NodeRef,
        buffer: BufferRef,
        request: &ListRequest,
        continuation: Option<Continuation>,
    ) -> NativeResult<RecordBatch> {
        let mut state = self.0.lock().unwrap();
        let types = request.record_types.clone();
        let names = request.record_names.clone();
        Self::serve_record_batch(
            &mut state,
            buffer,
            move |state| {
                state
                    .records
                    .iter()
                    .filter(|(kind, record)| {
                        types.contains(kind)
                            && (names.iter().any(|n| n == "dsRecordsAll")
                                || names.contains(&record.name))
                    })
                    .map(|(_, record)| record.clone())
                    .collect()
            },
            request.max_count,
            continuation,
        )
    }

    fn record_search(
        &mut self,
        _node: NodeRef,
        buffer: BufferRef,
        request: &SearchRequest,
        continuation: Option<Continuation>,
    ) -> NativeResult<RecordBatch> {
        let mut state = self.0.lock().unwrap();
        let attribute = request.attribute.clone();
        let pattern = request.pattern.clone();
        let types = request.record_types.clone();
        Self::serve_record_batch(
            &mut state,
            buffer,
            move |state| {
                state
                    .records
                    .iter()
                    .filter(|(kind, record)| {
                        types.contains(kind)
                            && record.attributes.iter().any(|a| {
                                a.name == attribute
                                    && a.values.iter().any(|v| v == pattern.as_bytes())
                            })
                    })
                    .map(|(_, record)| record.clone())
                    .collect()
            },
            request.max_count,
            continuation,
        )
    }

    fn open_record(
        &mut self,
        _node: NodeRef,
        record_type: &str,
        name: &str,
    ) -> NativeResult<RecordRef> {
        let mut state = self.0.lock().unwrap();
        let exists = state
            .records
            .iter()
            .any(|(kind, record)| kind == record_type && record.name == name);
        if !exists {
            return Err(NativeStatus::RECORD_NOT_FOUND);
        }
        let record = state.fresh_ref();
        state.open_records.push(record);
        Ok(RecordRef(record))
    }

    fn close_record(&mut self, record: RecordRef) -> NativeResult<()> {
        let mut state = self.0.lock().unwrap();
        let position = state
            .open_records
            .iter()
            .position(|r| *r == record.0)
            .expect("unknown record ref");
        state.open_records.remove(position);
        Ok(())
    }

    fn authenticate(
        &mut self,
        _node: NodeRef,
        method: AuthMethod,
        payload: &[u8],
        buffer: BufferRef,
    ) -> NativeResult<Vec<u8>> {
        let state = self.0.lock().unwrap();
        assert!(state.buffers.contains_key(&buffer.0), "unknown buffer ref");
        if let Some(code) = state.auth_fault {
            return Err(NativeStatus(code));
        }
        let fields = parse_fields(payload);
        match method {
            AuthMethod::ClearText => {
                let identifier = String::from_utf8(fields[0].clone()).unwrap();
                let secret = fields[1].as_slice();
                match state.users.get(&identifier) {
                    Some(expected) if expected.as_bytes() == secret => Ok(Vec::new()),
                    _ => Err(NativeStatus::AUTH_FAILED),
                }
            }
            AuthMethod::DigestMd5 => {
                assert!(fields.len() == 3 || fields.len() == 4);
                if fields[2] == b"valid-response" {
                    Ok(Vec::new())
                } else {
                    Err(NativeStatus::AUTH_FAILED)
                }
            }
            AuthMethod::SaslProxy => {
                assert_eq!(fields[1], b"DIGEST-MD5");
                let identifier = String::from_utf8(fields[0].clone()).unwrap();
                if identifier.is_empty() && fields[2].is_empty() {
                    return Ok(pack_field(state.challenge.as_bytes()));
                }
                match state.proxy_responses.get(&identifier) {
                    Some(expected) if *expected == fields[2] => Ok(Vec::new()),
                    _ => Err(NativeStatus::AUTH_FAILED),
                }
            }
        }
    }

    fn release_continuation(&mut self, continuation: Continuation) -> NativeResult<()> {
        let mut state = self.0.lock().unwrap();
        let known = state.pending_records.remove(&continuation.0).is_some()
            || state.pending_nodes.remove(&continuation.0).is_some();
        assert!(known, "unknown continuation token");
        Ok(())
    }
}

fn user_record(name: &str, uid: &str) -> (String, RawRecord) {
    (
        USERS.to_string(),
        RawRecord {
            name: name.to_string(),
            attributes: vec![
                RawAttribute {
                    name: "uid".to_string(),
                    values: vec![uid.as_bytes().to_vec()],
                },
                RawAttribute {
                    name: "cn".to_string(),
                    values: vec![name.as_bytes().to_vec()],
                },
            ],
        },
    )
}

fn default_state() -> State {
    State {
        batch_size: 2,
        challenge: "nonce=abc".to_string(),
        ..State::default()
    }
}

fn handle_over(state: State) -> (DirectoryHandle, Arc<Mutex<State>>) {
    let (backend, shared) = FakeDirectory::new(state);
    let config = DirectoryConfig::new(DEFAULT_NODE)
        .unwrap()
        .with_initial_buffer_capacity(1024);
    (DirectoryHandle::new(config, Box::new(backend)), shared)
}

#[test]
fn pagination_returns_every_record_in_order() {
    let mut state = default_state();
    for i in 0..5 {
        state
            .records
            .push(user_record(&format!("user{i}"), &format!("10{i}")));
    }
    let (mut handle, shared) = handle_over(state);

    let spec = AttributeSpec::new().with_attr("uid");
    let results = handle
        .list_all_records_with_attributes(&[USERS], &spec, 0)
        .unwrap();
    let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["user0", "user1", "user2", "user3", "user4"]);

    handle.close();
    assert!(shared.lock().unwrap().all_closed());
}

#[test]
fn listing_users_yields_names_and_uids_in_native_order() {
    let mut state = default_state();
    state.records.push(user_record("alice", "1001"));
    state.records.push(user_record("bob", "1002"));
    let (mut handle, _shared) = handle_over(state);

    let spec = AttributeSpec::new().with_attr("uid");
    let results = handle
        .list_all_records_with_attributes(&[USERS], &spec, 0)
        .unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].name, "alice");
    assert_eq!(results[0].first("uid"), Some("1001"));
    assert_eq!(results[1].name, "bob");
    assert_eq!(results[1].first("uid"), Some("1002"));
}

#[test]
fn buffer_doubles_until_the_batch_fits() {
    let mut state = default_state();
    state.records.push(user_record("alice", "1001"));
    // 1024 -> 2048 -> 4096 -> 8192: three doublings before a batch fits.
    state.required_capacity = 8192;
    let (mut handle, shared) = handle_over(state);

    let spec = AttributeSpec::new().with_attr("uid");
    let results = handle
        .list_all_records_with_attributes(&[USERS], &spec, 0)
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].first("uid"), Some("1001"));

    // Only the final buffer is live, at the doubled capacity.
    let state = shared.lock().unwrap();
    let capacities: Vec<usize> = state.buffers.values().copied().collect();
    assert_eq!(capacities, vec![8192]);
}

#[test]
fn requested_attributes_decode_and_unrequested_are_dropped() {
    let mut state = default_state();
    let photo: &[u8] = &[0xFF, 0xD8, 0x01, 0x02, 0x03];
    state.records.push((
        USERS.to_string(),
        RawRecord {
            name: "alice".to_string(),
            attributes: vec![
                RawAttribute {
                    name: "uid".to_string(),
                    values: vec![b"1001".to_vec()],
                },
                RawAttribute {
                    name: "jpegPhoto".to_string(),
                    values: vec![photo.to_vec()],
                },
                RawAttribute {
                    name: "memberOf".to_string(),
                    values: vec![b"staff".to_vec(), b"admins".to_vec()],
                },
                RawAttribute {
                    name: "unrequested".to_string(),
                    values: vec![b"hidden".to_vec()],
                },
            ],
        },
    ));
    let (mut handle, _shared) = handle_over(state);

    let spec = AttributeSpec::new()
        .with_attr("uid")
        .with_attr("memberOf")
        .with_attr_encoded("jpegPhoto", AttrEncoding::Base64);
    let results = handle
        .list_all_records_with_attributes(&[USERS], &spec, 0)
        .unwrap();
    let record = &results[0];

    assert_eq!(record.first("uid"), Some("1001"));
    assert_eq!(
        record.attrs["memberOf"],
        AttrValue::Multi(vec!["staff".to_string(), "admins".to_string()])
    );
    use base64::Engine as _;
    let encoded = record.first("jpegPhoto").unwrap();
    assert_eq!(
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .unwrap(),
        photo
    );
    assert!(!record.attrs.contains_key("unrequested"));
}

#[test]
fn attribute_match_finds_only_the_matching_user() {
    let mut state = default_state();
    state.records.push(user_record("alice", "1001"));
    state.records.push(user_record("bob", "1002"));
    let (mut handle, _shared) = handle_over(state);

    let spec = AttributeSpec::new().with_attr("uid").with_attr("cn");
    let results = handle
        .query_records_with_attribute(
            "uid",
            "1002",
            MatchType::Exact,
            false,
            &[USERS],
            &spec,
            0,
        )
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "bob");
    assert_eq!(results[0].first("cn"), Some("bob"));
}

#[test]
fn node_cache_reuses_handles_until_close() {
    let mut state = default_state();
    state.users.insert("alice".to_string(), "pw".to_string());
    let (mut handle, shared) = handle_over(state);

    let secret = SecretString::from("pw");
    for _ in 0..3 {
        assert!(handle
            .authenticate_user_basic(AD_NODE, "alice", &secret)
            .unwrap());
    }
    assert_eq!(shared.lock().unwrap().open_node_calls, 1);

    handle.close();
    assert!(shared.lock().unwrap().all_closed());

    // A closed handle reopens lazily and re-resolves the node.
    assert!(handle
        .authenticate_user_basic(AD_NODE, "alice", &secret)
        .unwrap());
    assert_eq!(shared.lock().unwrap().open_node_calls, 2);
}

#[test]
fn rejected_credentials_return_false_and_keep_the_session() {
    let mut state = default_state();
    state.users.insert("alice".to_string(), "pw".to_string());
    let (mut handle, shared) = handle_over(state);

    let wrong = SecretString::from("nope");
    assert!(!handle
        .authenticate_user_basic(AD_NODE, "alice", &wrong)
        .unwrap());
    assert!(handle.is_open());
    assert_eq!(shared.lock().unwrap().open_service_calls, 1);
}

#[test]
fn fatal_auth_status_raises_and_resets() {
    let mut state = default_state();
    state.auth_fault = Some(-14956);
    let (mut handle, shared) = handle_over(state);

    let secret = SecretString::from("pw");
    let err = handle
        .authenticate_user_basic(AD_NODE, "alice", &secret)
        .unwrap_err();
    assert_eq!(err.native_code(), -14956);
    assert_eq!(err.category(), "directory-error");
    assert!(!handle.is_open());
    assert!(shared.lock().unwrap().all_closed());

    // The next call re-establishes a fresh session.
    shared.lock().unwrap().auth_fault = None;
    shared
        .lock()
        .unwrap()
        .users
        .insert("alice".to_string(), "pw".to_string());
    assert!(handle
        .authenticate_user_basic(AD_NODE, "alice", &secret)
        .unwrap());
    assert_eq!(shared.lock().unwrap().open_service_calls, 2);
}

#[test]
fn challenge_harvest_returns_the_server_nonce() {
    let (mut handle, _shared) = handle_over(default_state());
    let challenge = handle
        .get_digest_md5_challenge_from_active_directory(AD_NODE)
        .unwrap();
    assert_eq!(challenge.as_deref(), Some("nonce=abc"));
}

#[test]
fn sasl_proxy_response_authenticates() {
    let mut state = default_state();
    state
        .proxy_responses
        .insert("alice".to_string(), b"digest-step".to_vec());
    let (mut handle, _shared) = handle_over(state);

    assert!(handle
        .authenticate_user_digest_to_active_directory(AD_NODE, "alice", "digest-step")
        .unwrap());
    assert!(!handle
        .authenticate_user_digest_to_active_directory(AD_NODE, "alice", "bad-step")
        .unwrap());
}

#[test]
fn digest_relay_authenticates() {
    let (mut handle, _shared) = handle_over(default_state());
    assert!(handle
        .authenticate_user_digest(AD_NODE, "alice", "nonce=abc", "valid-response", "GET")
        .unwrap());
    assert!(!handle
        .authenticate_user_digest(AD_NODE, "alice", "nonce=abc", "stale", "GET")
        .unwrap());
}

#[test]
fn node_listing_spans_batches() {
    let mut state = default_state();
    state.node_names = vec![
        "/LDAPv3/a".to_string(),
        "/LDAPv3/b".to_string(),
        "/LDAPv3/c".to_string(),
    ];
    let (mut handle, _shared) = handle_over(state);
    assert_eq!(
        handle.list_nodes().unwrap(),
        vec![
            "/LDAPv3/a".to_string(),
            "/LDAPv3/b".to_string(),
            "/LDAPv3/c".to_string()
        ]
    );
}

#[test]
fn record_probe_distinguishes_present_and_absent() {
    let mut state = default_state();
    state.records.push(user_record("alice", "1001"));
    let (mut handle, shared) = handle_over(state);

    assert!(handle.record_exists(USERS, "alice").unwrap());
    assert!(!handle.record_exists(USERS, "nobody").unwrap());
    handle.close();
    assert!(shared.lock().unwrap().all_closed());
}

#[test]
fn unknown_node_path_is_a_directory_error() {
    let (mut handle, shared) = handle_over(default_state());
    let secret = SecretString::from("pw");
    let err = handle
        .authenticate_user_basic("/LDAPv3/missing.example.com", "alice", &secret)
        .unwrap_err();
    assert_eq!(err.native_code(), NativeStatus::NODE_NOT_FOUND.code());
    // A failed node resolution leaks nothing.
    handle.close();
    assert!(shared.lock().unwrap().all_closed());
}

#[test]
fn drop_releases_every_native_resource() {
    let mut state = default_state();
    state.records.push(user_record("alice", "1001"));
    let (mut handle, shared) = handle_over(state);

    let spec = AttributeSpec::new().with_attr("uid");
    handle
        .list_all_records_with_attributes(&[USERS], &spec, 0)
        .unwrap();
    drop(handle);
    assert!(shared.lock().unwrap().all_closed());
}
