//! In-memory REST resource.
//!
//! Implements [`Transport`] by routing requests straight to an in-memory
//! collection, so engine tests run without network overhead. Every request
//! is recorded for later assertions.

use async_trait::async_trait;
use parking_lot::Mutex;
use restbind_engine::codec::display_text;
use restbind_engine::{path, HttpRequest, HttpResponse, Method, SyncError, SyncResult, Transport};
use serde_json::{json, Map, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

/// Shape of list responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListShape {
    /// A bare JSON array.
    Array,
    /// `{"results": [...]}` with the total count at a dotted path.
    Results {
        /// Dotted path of the total count.
        total_path: String,
    },
}

/// Query parameter names the resource understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParams {
    /// Search term parameter.
    pub search: String,
    /// Page size parameter.
    pub limit: String,
    /// Page offset parameter.
    pub offset: String,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            search: "search".into(),
            limit: "limit".into(),
            offset: "offset".into(),
        }
    }
}

struct ResourceState {
    items: Vec<Value>,
    next_id: u64,
    requests: Vec<HttpRequest>,
    scripted: VecDeque<HttpResponse>,
    offline: bool,
}

struct Inner {
    base: String,
    identity_field: String,
    shape: ListShape,
    params: QueryParams,
    required: Vec<String>,
    state: Mutex<ResourceState>,
}

/// An in-memory REST collection served at one base path.
///
/// Cloning yields another handle to the same collection.
///
/// Routes:
/// - `GET {base}` lists items, filtered by the search term and paged by the
///   limit/offset parameters
/// - `GET {base}/{id}` returns one item or 404
/// - `POST {base}` creates an item, assigning an identity when missing
/// - `PUT {base}/{id}` replaces an item or 404
/// - `DELETE {base}/{id}` removes an item (204) or 404
/// - `DELETE {base}` is refused with 405
#[derive(Clone)]
pub struct InMemoryResource {
    inner: Arc<Inner>,
}

impl InMemoryResource {
    /// Creates an empty resource at `base`.
    pub fn new(base: impl Into<String>) -> Self {
        Self::builder(base).build()
    }

    /// Starts configuring a resource at `base`.
    pub fn builder(base: impl Into<String>) -> ResourceBuilder {
        ResourceBuilder {
            base: base.into(),
            identity_field: "id".into(),
            shape: ListShape::Array,
            params: QueryParams::default(),
            required: Vec::new(),
            items: Vec::new(),
        }
    }

    /// Returns every stored item, in insertion order.
    pub fn items(&self) -> Vec<Value> {
        self.inner.state.lock().items.clone()
    }

    /// Returns the stored item with the given identity.
    pub fn get(&self, id: &str) -> Option<Value> {
        let state = self.inner.state.lock();
        state
            .items
            .iter()
            .find(|item| self.identity(item) == id)
            .cloned()
    }

    /// Inserts an item directly, bypassing the HTTP routes.
    pub fn insert(&self, item: Value) {
        self.inner.state.lock().items.push(item);
    }

    /// Returns every request received so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.inner.state.lock().requests.clone()
    }

    /// Returns the number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.inner.state.lock().requests.len()
    }

    /// Returns the requests that used the given method.
    pub fn requests_with(&self, method: Method) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.method == method)
            .collect()
    }

    /// Makes the next request answer with `response` instead of being
    /// routed.
    pub fn script(&self, response: HttpResponse) {
        self.inner.state.lock().scripted.push_back(response);
    }

    /// Simulates a network outage: requests fail without a response.
    pub fn set_offline(&self, offline: bool) {
        self.inner.state.lock().offline = offline;
    }

    fn identity(&self, item: &Value) -> String {
        display_text(path::get(item, &self.inner.identity_field))
    }

    fn route(&self, state: &mut ResourceState, request: &HttpRequest) -> HttpResponse {
        let (path, query) = request
            .url
            .split_once('?')
            .unwrap_or((request.url.as_str(), ""));
        let Some(rest) = path.strip_prefix(self.inner.base.as_str()) else {
            return error(404, "unknown resource");
        };
        let rest = rest.trim_start_matches('/');
        let id = if rest.is_empty() {
            None
        } else {
            match urlencoding::decode(rest) {
                Ok(id) => Some(id.into_owned()),
                Err(_) => return error(400, "invalid identity"),
            }
        };

        match (request.method, id) {
            (Method::Get, None) => self.list(state, query),
            (Method::Get, Some(id)) => self.fetch(state, &id),
            (Method::Post, None) => self.create(state, request.body.as_deref()),
            (Method::Put, Some(id)) => self.update(state, &id, request.body.as_deref()),
            (Method::Delete, Some(id)) => self.delete(state, &id),
            (Method::Delete, None) => error(405, "cannot delete the collection"),
            _ => error(405, "method not allowed"),
        }
    }

    fn list(&self, state: &ResourceState, query: &str) -> HttpResponse {
        let params = parse_query(query);
        let param = |name: &str| {
            params
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str())
        };
        let term = param(&self.inner.params.search).map(str::to_lowercase);
        let offset = param(&self.inner.params.offset)
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);
        let limit = param(&self.inner.params.limit).and_then(|v| v.parse::<usize>().ok());

        let matching: Vec<&Value> = state
            .items
            .iter()
            .filter(|item| match &term {
                Some(term) => matches_term(item, term),
                None => true,
            })
            .collect();
        let total = matching.len();
        let page: Vec<Value> = matching
            .into_iter()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();

        match &self.inner.shape {
            ListShape::Array => HttpResponse::json_body(200, &Value::Array(page)),
            ListShape::Results { total_path } => {
                let mut body = json!({ "results": page });
                path::set(&mut body, total_path, json!(total));
                HttpResponse::json_body(200, &body)
            }
        }
    }

    fn fetch(&self, state: &ResourceState, id: &str) -> HttpResponse {
        match state.items.iter().find(|item| self.identity(item) == id) {
            Some(item) => HttpResponse::json_body(200, item),
            None => error(404, "not found"),
        }
    }

    fn create(&self, state: &mut ResourceState, body: Option<&str>) -> HttpResponse {
        let mut item = match self.parse_item(body) {
            Ok(item) => item,
            Err(response) => return response,
        };
        if self.identity(&item).is_empty() {
            state.next_id += 1;
            path::set(
                &mut item,
                &self.inner.identity_field,
                json!(state.next_id.to_string()),
            );
        }
        let id = self.identity(&item);
        if state.items.iter().any(|existing| self.identity(existing) == id) {
            return error(409, "identity already exists");
        }
        debug!(id = %id, "resource created item");
        state.items.push(item.clone());
        HttpResponse::json_body(201, &item)
    }

    fn update(&self, state: &mut ResourceState, id: &str, body: Option<&str>) -> HttpResponse {
        let mut item = match self.parse_item(body) {
            Ok(item) => item,
            Err(response) => return response,
        };
        path::set(&mut item, &self.inner.identity_field, json!(id));
        let identity = &self.inner.identity_field;
        match state
            .items
            .iter_mut()
            .find(|existing| display_text(path::get(existing, identity)) == id)
        {
            Some(existing) => {
                *existing = item.clone();
                HttpResponse::json_body(200, &item)
            }
            None => error(404, "not found"),
        }
    }

    fn delete(&self, state: &mut ResourceState, id: &str) -> HttpResponse {
        let before = state.items.len();
        state.items.retain(|item| self.identity(item) != id);
        if state.items.len() == before {
            error(404, "not found")
        } else {
            HttpResponse::no_content()
        }
    }

    /// Parses a request body and checks the required fields.
    fn parse_item(&self, body: Option<&str>) -> Result<Value, HttpResponse> {
        let item: Value = body
            .and_then(|body| serde_json::from_str(body).ok())
            .filter(Value::is_object)
            .ok_or_else(|| error(400, "body must be a JSON object"))?;

        let missing: Map<String, Value> = self
            .inner
            .required
            .iter()
            .filter(|field| display_text(path::get(&item, field)).is_empty())
            .map(|field| (field.clone(), json!(["required"])))
            .collect();
        if missing.is_empty() {
            Ok(item)
        } else {
            Err(HttpResponse::json_body(400, &json!({ "errors": missing })))
        }
    }
}

#[async_trait]
impl Transport for InMemoryResource {
    async fn request(&self, request: HttpRequest) -> SyncResult<HttpResponse> {
        let mut state = self.inner.state.lock();
        state.requests.push(request.clone());
        if state.offline {
            return Err(SyncError::transport("network unreachable"));
        }
        if let Some(response) = state.scripted.pop_front() {
            return Ok(response);
        }
        Ok(self.route(&mut state, &request))
    }
}

/// Builder for [`InMemoryResource`].
#[derive(Debug, Clone)]
pub struct ResourceBuilder {
    base: String,
    identity_field: String,
    shape: ListShape,
    params: QueryParams,
    required: Vec<String>,
    items: Vec<Value>,
}

impl ResourceBuilder {
    /// Sets the identity field.
    pub fn identity_field(mut self, field: impl Into<String>) -> Self {
        self.identity_field = field.into();
        self
    }

    /// Sets the list response shape.
    pub fn shape(mut self, shape: ListShape) -> Self {
        self.shape = shape;
        self
    }

    /// Sets the query parameter names.
    pub fn params(mut self, params: QueryParams) -> Self {
        self.params = params;
        self
    }

    /// Requires a non-empty field on create and update.
    pub fn require(mut self, field: impl Into<String>) -> Self {
        self.required.push(field.into());
        self
    }

    /// Seeds the collection.
    pub fn items<I: IntoIterator<Item = Value>>(mut self, items: I) -> Self {
        self.items.extend(items);
        self
    }

    /// Builds the resource.
    pub fn build(self) -> InMemoryResource {
        let next_id = self.items.len() as u64;
        InMemoryResource {
            inner: Arc::new(Inner {
                base: self.base.trim_end_matches('/').to_string(),
                identity_field: self.identity_field,
                shape: self.shape,
                params: self.params,
                required: self.required,
                state: Mutex::new(ResourceState {
                    items: self.items,
                    next_id,
                    requests: Vec::new(),
                    scripted: VecDeque::new(),
                    offline: false,
                }),
            }),
        }
    }
}

fn error(status: u16, message: &str) -> HttpResponse {
    HttpResponse::json_body(status, &json!({ "error": message }))
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let decode = |s: &str| {
                urlencoding::decode(s)
                    .map(|s| s.into_owned())
                    .unwrap_or_else(|_| s.to_string())
            };
            (decode(key), decode(value))
        })
        .collect()
}

fn matches_term(item: &Value, term: &str) -> bool {
    match item {
        Value::String(text) => text.to_lowercase().contains(term),
        Value::Number(n) => n.to_string().contains(term),
        Value::Array(values) => values.iter().any(|v| matches_term(v, term)),
        Value::Object(map) => map.values().any(|v| matches_term(v, term)),
        _ => false,
    }
}
