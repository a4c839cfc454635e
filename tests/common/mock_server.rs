//! In-memory SCIM server implementing the transport trait.
//!
//! Serves discovery, CRUD, list/filter/pagination and SCIM error bodies for
//! Users, Groups, Agents and AgenticApplications. [`MockBehavior`] switches on
//! the real-world non-conformances the probe has to detect or survive.

use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

use scim_conformance::client::{
    HttpMethod, JSON_CONTENT_TYPE, SCIM_CONTENT_TYPE, ScimRequest, ScimResponse, ScimTransport,
};
use scim_conformance::error::ClientError;
use scim_conformance::schema::{ERROR_URN, LIST_RESPONSE_URN, ResourceKind};

pub const MOCK_BASE_URL: &str = "https://mock.scim.test/v2";

/// Non-conformance switches. The default is a conformant server.
#[derive(Debug, Clone)]
pub struct MockBehavior {
    /// Resource type names advertised by /ResourceTypes
    pub resource_types: Vec<&'static str>,
    /// Answer with `application/json` instead of `application/scim+json`
    pub content_type_json: bool,
    pub missing_meta: bool,
    /// `meta` without `created`/`lastModified`
    pub missing_meta_fields: bool,
    /// Echo `password` back in responses
    pub password_in_response: bool,
    /// 400 on any `filter=` query
    pub reject_filters: bool,
    /// Answer the first N requests with 429
    pub throttle_count: usize,
    pub retry_after: Option<&'static str>,
    /// Answer the first N creating POSTs with 500
    pub transient_create_failures: usize,
    /// 500 on every POST sent with `application/scim+json`
    pub reject_scim_content_type: bool,
    /// 500 on every DELETE
    pub fail_deletes: bool,
    /// 404 on all discovery endpoints
    pub no_discovery: bool,
    /// Delay before every response
    pub latency: Option<Duration>,
    /// Prepended to every generated id, e.g. characters that need encoding
    pub id_prefix: &'static str,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            resource_types: vec!["User", "Group", "Agent", "AgenticApplication"],
            content_type_json: false,
            missing_meta: false,
            missing_meta_fields: false,
            password_in_response: false,
            reject_filters: false,
            throttle_count: 0,
            retry_after: None,
            transient_create_failures: 0,
            reject_scim_content_type: false,
            fail_deletes: false,
            no_discovery: false,
            latency: None,
            id_prefix: "",
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    /// endpoint name ("Users") -> id -> stored resource
    stores: HashMap<String, BTreeMap<String, Value>>,
    requests: Vec<ScimRequest>,
    throttled: usize,
    transient_failures: usize,
}

#[derive(Debug)]
struct Inner {
    behavior: MockBehavior,
    state: RwLock<MockState>,
}

/// Cloneable handle; clones share state.
#[derive(Debug, Clone)]
pub struct MockScimServer {
    inner: Arc<Inner>,
}

impl Default for MockScimServer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockScimServer {
    pub fn new() -> Self {
        Self::with_behavior(MockBehavior::default())
    }

    pub fn with_behavior(behavior: MockBehavior) -> Self {
        Self {
            inner: Arc::new(Inner {
                behavior,
                state: RwLock::new(MockState::default()),
            }),
        }
    }

    /// Every request received so far
    pub async fn requests(&self) -> Vec<ScimRequest> {
        self.inner.state.read().await.requests.clone()
    }

    /// Number of stored resources behind an endpoint such as `/Users`
    pub async fn count(&self, endpoint: &str) -> usize {
        let state = self.inner.state.read().await;
        state
            .stores
            .get(endpoint.trim_start_matches('/'))
            .map_or(0, BTreeMap::len)
    }

    /// Store a resource directly, bypassing HTTP. Returns its id.
    pub async fn seed(&self, endpoint: &str, resource: Value) -> String {
        let id = Uuid::new_v4().to_string();
        let mut state = self.inner.state.write().await;
        state
            .stores
            .entry(endpoint.trim_start_matches('/').to_string())
            .or_default()
            .insert(id.clone(), resource);
        id
    }

    fn behavior(&self) -> &MockBehavior {
        &self.inner.behavior
    }

    fn content_type(&self) -> &'static str {
        if self.behavior().content_type_json {
            JSON_CONTENT_TYPE
        } else {
            SCIM_CONTENT_TYPE
        }
    }

    fn json(&self, status: u16, body: Value) -> ScimResponse {
        ScimResponse::json_with_type(status, &body, self.content_type())
    }

    fn error(&self, status: u16, detail: &str) -> ScimResponse {
        self.json(
            status,
            json!({
                "schemas": [ERROR_URN],
                "status": status.to_string(),
                "detail": detail
            }),
        )
    }

    fn meta(&self, endpoint: &str, id: &str) -> Value {
        let now = chrono::Utc::now().to_rfc3339();
        let resource_type = ResourceKind::PROBED
            .into_iter()
            .find(|kind| kind.endpoint().trim_start_matches('/') == endpoint)
            .map_or("Unknown", |kind| kind.name());
        let mut meta = json!({
            "resourceType": resource_type,
            "created": now,
            "lastModified": now,
            "location": format!("{}/{}/{}", MOCK_BASE_URL, endpoint, id),
            "version": version(id)
        });
        if self.behavior().missing_meta_fields {
            if let Some(meta) = meta.as_object_mut() {
                meta.remove("created");
                meta.remove("lastModified");
            }
        }
        meta
    }

    /// Stored data plus server-managed attributes
    fn representation(&self, endpoint: &str, id: &str, stored: &Value) -> Value {
        let mut resource = stored.clone();
        if let Some(object) = resource.as_object_mut() {
            object.insert("id".into(), json!(id));
            if !self.behavior().missing_meta {
                object.insert("meta".into(), self.meta(endpoint, id));
            }
            if !self.behavior().password_in_response {
                object.remove("password");
            }
        }
        resource
    }

    fn resource_response(&self, status: u16, endpoint: &str, id: &str, stored: &Value) -> ScimResponse {
        let mut response = self
            .json(status, self.representation(endpoint, id, stored))
            .with_header("ETag", &version(id));
        if status == 201 {
            response = response.with_header("Location", &format!("{}/{}/{}", MOCK_BASE_URL, endpoint, id));
        }
        response
    }

    async fn handle(&self, request: &ScimRequest) -> ScimResponse {
        let mut state = self.inner.state.write().await;

        if state.throttled < self.behavior().throttle_count {
            state.throttled += 1;
            let mut response = self.error(429, "Too Many Requests");
            if let Some(retry_after) = self.behavior().retry_after {
                response = response.with_header("Retry-After", retry_after);
            }
            return response;
        }

        let relative = request.url.strip_prefix(MOCK_BASE_URL).unwrap_or(&request.url);
        let (path, query) = relative.split_once('?').unwrap_or((relative, ""));
        let decoded: Vec<String> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(percent_decode_path)
            .collect();
        let segments: Vec<&str> = decoded.iter().map(String::as_str).collect();

        match (request.method, segments.as_slice()) {
            (HttpMethod::Get, [endpoint @ ("ServiceProviderConfig" | "Schemas" | "ResourceTypes")]) => {
                self.discovery(endpoint)
            }
            (HttpMethod::Get, [endpoint]) => self.list(&state, endpoint, query),
            (HttpMethod::Post, [endpoint]) => self.create(&mut state, endpoint, request),
            (HttpMethod::Get, [endpoint, id]) => match stored(&state, endpoint, id) {
                Some(resource) => self.resource_response(200, endpoint, id, resource),
                None => self.error(404, &format!("Resource {} not found", id)),
            },
            (HttpMethod::Put, [endpoint, id]) => self.replace(&mut state, endpoint, id, request),
            (HttpMethod::Patch, [endpoint, id]) => self.patch(&mut state, endpoint, id, request),
            (HttpMethod::Delete, [endpoint, id]) => {
                if self.behavior().fail_deletes {
                    return self.error(500, "Delete failed");
                }
                match state.stores.get_mut(*endpoint).and_then(|store| store.remove(*id)) {
                    Some(_) => ScimResponse::new(204),
                    None => self.error(404, &format!("Resource {} not found", id)),
                }
            }
            _ => self.error(404, "Unknown endpoint"),
        }
    }

    fn discovery(&self, endpoint: &str) -> ScimResponse {
        if self.behavior().no_discovery {
            return self.error(404, "Not implemented");
        }
        match endpoint {
            "ServiceProviderConfig" => self.json(
                200,
                json!({
                    "schemas": ["urn:ietf:params:scim:schemas:core:2.0:ServiceProviderConfig"],
                    "patch": {"supported": true},
                    "bulk": {"supported": false, "maxOperations": 0, "maxPayloadSize": 0},
                    "filter": {"supported": !self.behavior().reject_filters, "maxResults": 200},
                    "changePassword": {"supported": false},
                    "sort": {"supported": false},
                    "etag": {"supported": true},
                    "authenticationSchemes": []
                }),
            ),
            "Schemas" => self.json(
                200,
                json!({
                    "schemas": [LIST_RESPONSE_URN],
                    "totalResults": 0,
                    "Resources": []
                }),
            ),
            _ => {
                let resources: Vec<Value> = self
                    .behavior()
                    .resource_types
                    .iter()
                    .map(|name| {
                        let endpoint = ResourceKind::from_name(name)
                            .map_or("/Unknown", |kind| kind.endpoint());
                        json!({"name": name, "endpoint": endpoint})
                    })
                    .collect();
                self.json(
                    200,
                    json!({
                        "schemas": [LIST_RESPONSE_URN],
                        "totalResults": resources.len(),
                        "Resources": resources
                    }),
                )
            }
        }
    }

    fn list(&self, state: &MockState, endpoint: &str, query: &str) -> ScimResponse {
        if !is_collection(endpoint) {
            return self.error(404, "Unknown endpoint");
        }
        let params = parse_query(query);

        let mut matches: Vec<(&String, &Value)> = state
            .stores
            .get(endpoint)
            .map(|store| store.iter().collect())
            .unwrap_or_default();
        if let Some(filter) = params.get("filter") {
            if self.behavior().reject_filters {
                return self.error(400, "Filtering is not supported");
            }
            let Some((attribute, value)) = parse_eq_filter(filter) else {
                return self.error(400, "invalidFilter");
            };
            matches.retain(|(_, resource)| resource.get(&attribute).and_then(Value::as_str) == Some(value.as_str()));
        }

        let total = matches.len();
        let start = params
            .get("startIndex")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(1)
            .max(1);
        let count = params
            .get("count")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(total);
        let page: Vec<Value> = matches
            .into_iter()
            .skip(start - 1)
            .take(count)
            .map(|(id, resource)| self.representation(endpoint, id, resource))
            .collect();

        self.json(
            200,
            json!({
                "schemas": [LIST_RESPONSE_URN],
                "totalResults": total,
                "startIndex": start,
                "itemsPerPage": page.len(),
                "Resources": page
            }),
        )
    }

    fn create(&self, state: &mut MockState, endpoint: &str, request: &ScimRequest) -> ScimResponse {
        if !is_collection(endpoint) {
            return self.error(404, "Unknown endpoint");
        }
        if state.transient_failures < self.behavior().transient_create_failures {
            state.transient_failures += 1;
            return self.error(500, "Temporary failure");
        }
        let scim_body = request
            .headers
            .get("Content-Type")
            .is_some_and(|value| value.starts_with(SCIM_CONTENT_TYPE));
        if self.behavior().reject_scim_content_type && scim_body {
            return self.error(500, "Unsupported media type");
        }

        let Some(body) = request.body.as_ref().and_then(Value::as_object) else {
            return self.error(400, "Request body must be a JSON object");
        };
        if let Some(message) = missing_attribute(endpoint, body) {
            return self.error(400, &message);
        }

        let id = format!("{}{}", self.behavior().id_prefix, Uuid::new_v4());
        let mut stored = body.clone();
        stored.remove("id");
        stored.remove("meta");
        let stored = Value::Object(stored);
        let response = self.resource_response(201, endpoint, &id, &stored);
        state
            .stores
            .entry(endpoint.to_string())
            .or_default()
            .insert(id, stored);
        response
    }

    fn replace(&self, state: &mut MockState, endpoint: &str, id: &str, request: &ScimRequest) -> ScimResponse {
        let Some(body) = request.body.as_ref().and_then(Value::as_object) else {
            return self.error(400, "Request body must be a JSON object");
        };
        if let Some(message) = missing_attribute(endpoint, body) {
            return self.error(400, &message);
        }
        let Some(existing) = state.stores.get_mut(endpoint).and_then(|store| store.get_mut(id)) else {
            return self.error(404, &format!("Resource {} not found", id));
        };
        let mut replacement = body.clone();
        replacement.remove("id");
        replacement.remove("meta");
        *existing = Value::Object(replacement);
        let existing = existing.clone();
        self.resource_response(200, endpoint, id, &existing)
    }

    fn patch(&self, state: &mut MockState, endpoint: &str, id: &str, request: &ScimRequest) -> ScimResponse {
        let operations = request
            .body
            .as_ref()
            .and_then(|body| body.get("Operations"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let Some(existing) = state
            .stores
            .get_mut(endpoint)
            .and_then(|store| store.get_mut(id))
            .and_then(Value::as_object_mut)
        else {
            return self.error(404, &format!("Resource {} not found", id));
        };

        for operation in &operations {
            let op = operation.get("op").and_then(Value::as_str).unwrap_or_default();
            let path = operation.get("path").and_then(Value::as_str);
            let value = operation.get("value").cloned().unwrap_or(Value::Null);
            match (op.to_ascii_lowercase().as_str(), path) {
                ("replace", Some(path)) => {
                    existing.insert(path.to_string(), value);
                }
                ("add", Some(path)) => match (existing.get_mut(path), value) {
                    (Some(Value::Array(current)), Value::Array(added)) => current.extend(added),
                    (_, value) => {
                        existing.insert(path.to_string(), value);
                    }
                },
                ("remove", Some(path)) => {
                    existing.remove(path);
                }
                ("add" | "replace", None) => {
                    if let Value::Object(values) = value {
                        existing.extend(values);
                    }
                }
                _ => return self.error(400, "invalidSyntax"),
            }
        }
        let existing = Value::Object(existing.clone());
        self.resource_response(200, endpoint, id, &existing)
    }
}

impl ScimTransport for MockScimServer {
    async fn send(&self, request: ScimRequest) -> Result<ScimResponse, ClientError> {
        if let Some(latency) = self.behavior().latency {
            tokio::time::sleep(latency).await;
        }
        let response = self.handle(&request).await;
        self.inner.state.write().await.requests.push(request);
        Ok(response)
    }
}

fn version(id: &str) -> String {
    format!("W/\"{}\"", id.chars().take(8).collect::<String>())
}

fn is_collection(endpoint: &str) -> bool {
    ResourceKind::PROBED
        .into_iter()
        .any(|kind| kind.endpoint().trim_start_matches('/') == endpoint)
}

fn stored<'a>(state: &'a MockState, endpoint: &str, id: &str) -> Option<&'a Value> {
    state.stores.get(endpoint)?.get(id)
}

/// Minimal request-body checks a real server performs
fn missing_attribute(endpoint: &str, body: &Map<String, Value>) -> Option<String> {
    let required = match endpoint {
        "Users" => "userName",
        "Groups" => "displayName",
        _ => "name",
    };
    if !body.get("schemas").is_some_and(Value::is_array) {
        return Some("Missing 'schemas'".to_string());
    }
    if !body.get(required).is_some_and(Value::is_string) {
        return Some(format!("Missing required attribute '{}'", required));
    }
    None
}

fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| (key.to_string(), percent_decode(value)))
        .collect()
}

/// Path segments keep a literal `+`
fn percent_decode_path(input: &str) -> String {
    percent_decode(&input.replace('+', "%2B"))
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        if bytes[index] == b'%' && index + 2 < bytes.len() {
            if let Ok(byte) = u8::from_str_radix(&input[index + 1..index + 3], 16) {
                decoded.push(byte);
                index += 3;
                continue;
            }
        }
        decoded.push(if bytes[index] == b'+' { b' ' } else { bytes[index] });
        index += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

/// `attribute eq "value"`
fn parse_eq_filter(filter: &str) -> Option<(String, String)> {
    let mut parts = filter.splitn(3, ' ');
    let attribute = parts.next()?;
    if !parts.next()?.eq_ignore_ascii_case("eq") {
        return None;
    }
    let value = parts.next()?.trim_matches('"');
    Some((attribute.to_string(), value.to_string()))
}
