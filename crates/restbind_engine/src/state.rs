//! Binding engine state machine.

use crate::codec::{self, FieldBinding};
use crate::config::BindingConfig;
use crate::error::{ConfigError, SyncError, SyncResult};
use crate::hooks::{HookPipeline, RequestMeta};
use crate::path;
use crate::response::{unwrap_list, unwrap_single};
use crate::status::{Status, StatusReporter, StatusSink};
use crate::surface::{Cell, ControlValue, EditingSurface, ListingSurface, PageStatus, Row};
use crate::transport::{HttpRequest, HttpResponse, Method, Transport};
use parking_lot::{Mutex, MutexGuard};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tracing::{debug, info, warn};

/// Whether an action is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No action is running.
    Idle,
    /// At least one action is awaiting its round trip.
    Busy,
}

/// Pagination cursor: page offset plus the last known total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    /// Current offset, sent as the page-number parameter.
    pub offset: u64,
    /// Total item count from the last search, 0 when unknown.
    pub total: u64,
    /// Amount the offset moves per page.
    pub increment: u64,
}

impl PageCursor {
    /// Creates a cursor at offset 0 with an unknown total.
    pub fn new(increment: u64) -> Self {
        Self {
            offset: 0,
            total: 0,
            increment: increment.max(1),
        }
    }

    /// Returns the 1-based current page.
    pub fn page(&self) -> u64 {
        self.offset / self.increment + 1
    }

    /// Returns the 1-based page count, or `None` when the total is unknown.
    pub fn page_count(&self) -> Option<u64> {
        (self.total > 0).then(|| self.total / self.increment + 1)
    }

    /// Returns whether a previous page exists.
    pub fn has_previous(&self) -> bool {
        self.offset > 0
    }

    /// Returns whether a next page may exist.
    pub fn has_next(&self) -> bool {
        self.page_count().map_or(true, |pages| self.page() < pages)
    }

    /// Moves one page forward. Moving past a known total is allowed.
    pub fn advance(&mut self) {
        self.offset = self.offset.saturating_add(self.increment);
    }

    /// Moves one page back, stopping at 0.
    pub fn retreat(&mut self) {
        self.offset = self.offset.saturating_sub(self.increment);
    }

    /// Returns the status shown next to the listing.
    pub fn status(&self) -> PageStatus {
        PageStatus {
            page: self.page(),
            pages: self.page_count(),
            has_previous: self.has_previous(),
            has_next: self.has_next(),
        }
    }
}

/// Decrements the in-flight counter when an action ends, however it ends.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The binding engine wires one REST resource to a listing and an editing
/// surface.
///
/// Every action follows the same shape: pre-hook, at most one round trip,
/// response normalization, surface updates, post-hook, status. Each action
/// is a catch boundary: failures are reported as status and returned, and the
/// engine stays usable.
///
/// Selection lives on the editing surface: the identity control's value is
/// what is being edited. The listing's selection mark is a visual echo.
///
/// Actions take `&self` and may overlap when polled concurrently; whichever
/// finishes last wins on the surfaces, except that a search superseded by a
/// newer search does not re-render the listing.
pub struct SyncEngine<T: Transport, L: ListingSurface, E: EditingSurface> {
    config: BindingConfig,
    transport: T,
    hooks: HookPipeline,
    fields: Vec<FieldBinding>,
    listing: Mutex<L>,
    editing: Mutex<E>,
    status: StatusReporter,
    cursor: Mutex<PageCursor>,
    term: Mutex<Option<String>>,
    generation: AtomicU64,
    in_flight: AtomicUsize,
}

impl<T: Transport, L: ListingSurface, E: EditingSurface> SyncEngine<T, L, E> {
    /// Validates the configuration against the surfaces and creates the
    /// engine with no selection, offset 0 and an unknown total.
    pub fn new(
        config: BindingConfig,
        transport: T,
        listing: L,
        editing: E,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let fields = codec::bind(&editing.controls());
        config.validate_fields(&fields)?;

        debug!(
            endpoint = %config.endpoint,
            fields = fields.len(),
            hooks = ?config.hooks,
            "binding engine created"
        );

        Ok(Self {
            hooks: HookPipeline::new(config.hooks.clone()),
            cursor: Mutex::new(PageCursor::new(config.pagination.increment)),
            config,
            transport,
            fields,
            listing: Mutex::new(listing),
            editing: Mutex::new(editing),
            status: StatusReporter::new(),
            term: Mutex::new(None),
            generation: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
        })
    }

    /// Attaches a status sink.
    pub fn with_status_sink(mut self, sink: impl StatusSink + 'static) -> Self {
        self.status = self.status.with_sink(sink);
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &BindingConfig {
        &self.config
    }

    /// Returns the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the bound editing-surface fields.
    pub fn fields(&self) -> &[FieldBinding] {
        &self.fields
    }

    /// Locks the listing surface. Do not hold the guard across an action.
    pub fn listing(&self) -> MutexGuard<'_, L> {
        self.listing.lock()
    }

    /// Locks the editing surface. Do not hold the guard across an action.
    pub fn editing(&self) -> MutexGuard<'_, E> {
        self.editing.lock()
    }

    /// Returns whether an action is in flight.
    pub fn state(&self) -> EngineState {
        if self.in_flight.load(Ordering::SeqCst) > 0 {
            EngineState::Busy
        } else {
            EngineState::Idle
        }
    }

    /// Returns the pagination cursor.
    pub fn pagination(&self) -> PageCursor {
        *self.cursor.lock()
    }

    /// Returns the identity held by the editing surface, if any.
    pub fn selected_id(&self) -> Option<String> {
        let editing = self.editing.lock();
        self.identity_of(&*editing)
    }

    /// Returns the last reported status.
    pub fn last_status(&self) -> Option<Status> {
        self.status.last()
    }

    /// Runs an explicit search from the first page.
    ///
    /// The term is remembered for page navigation. Returns the number of
    /// rows rendered.
    pub async fn search(&self, term: Option<&str>) -> SyncResult<usize> {
        *self.term.lock() = term.map(str::to_string);
        self.cursor.lock().offset = 0;
        self.refresh("search").await
    }

    /// Moves to the next page and re-runs the last search.
    pub async fn next_page(&self) -> SyncResult<usize> {
        self.cursor.lock().advance();
        self.refresh("nextPage").await
    }

    /// Moves to the previous page (never below offset 0) and re-runs the
    /// last search.
    pub async fn previous_page(&self) -> SyncResult<usize> {
        self.cursor.lock().retreat();
        self.refresh("previousPage").await
    }

    /// Selects an item and loads it into the editing surface.
    pub async fn select_by_id(&self, id: &str) -> SyncResult<Value> {
        let _busy = InFlight::enter(&self.in_flight);
        let result = self.load_item(id.to_string()).await;
        self.finish("select", result)
    }

    /// Clears the selection and shows an empty item for editing.
    pub fn create_new(&self) -> SyncResult<Value> {
        let result = self.clear_form();
        if result.is_ok() {
            self.status.report(Status::info("Editing new item"));
        }
        self.finish("create", result)
    }

    /// Creates or updates the item on the editing surface.
    ///
    /// An empty identity control means create (`POST` to the endpoint),
    /// otherwise update (`PUT` to the item URL). Returns the saved item as
    /// shown on the editing surface.
    pub async fn save(&self) -> SyncResult<Value> {
        let _busy = InFlight::enter(&self.in_flight);
        let result = self.save_inner().await;
        self.finish("save", result)
    }

    /// Deletes the selected item.
    ///
    /// Fails with [`SyncError::NothingSelected`] when neither the editing
    /// surface nor the `preDelete` hook supplies an identity. Returns the
    /// deleted identity.
    pub async fn delete_selected(&self) -> SyncResult<String> {
        let _busy = InFlight::enter(&self.in_flight);
        let result = self.delete_inner().await;
        self.finish("delete", result)
    }

    /// Discards edits by reloading the selected item from the server, or
    /// shows an empty item when nothing is selected.
    pub async fn reset_form(&self) -> SyncResult<Value> {
        let _busy = InFlight::enter(&self.in_flight);
        let result = match self.selected_id() {
            Some(id) => self.load_item(id).await,
            None => self.clear_form().inspect(|_| {
                self.status.report(Status::info("Editing new item"));
            }),
        };
        self.finish("reset", result)
    }

    async fn refresh(&self, action: &'static str) -> SyncResult<usize> {
        let _busy = InFlight::enter(&self.in_flight);
        let result = self.search_inner().await;
        self.finish(action, result)
    }

    async fn search_inner(&self) -> SyncResult<usize> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let term = self.term.lock().clone();
        let offset = self.cursor.lock().offset;

        let url = self.config.search_url(term.as_deref(), offset);
        let mut meta = self.meta(Method::Get, url.clone());
        let term = self.hooks.pre_search(term, &mut meta)?;
        if meta.url == url {
            meta.url = self.config.search_url(term.as_deref(), offset);
        }

        let response = self.send(meta, None).await?;
        let result = unwrap_list(&response, self.config.total_path.as_deref())?;

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "discarding superseded search result");
            return Ok(result.items.len());
        }

        let page = {
            let mut cursor = self.cursor.lock();
            if let Some(total) = result.total {
                cursor.total = total;
            }
            cursor.status()
        };

        let items = self.hooks.pre_update_table(result.items)?;
        let rows = items.iter().map(|item| self.row(item)).collect();
        let selected = self.selected_id();
        {
            let mut listing = self.listing.lock();
            listing.replace_rows(rows);
            listing.mark_selected(selected.as_deref());
            listing.set_pagination(page);
        }
        if let Some(err) = self.hooks.post_update_table(&items) {
            self.status
                .report(Status::warning("postUpdateTable failed", err.to_string()));
        }

        let message = match page.pages {
            Some(pages) => format!("{} items, page {} of {}", items.len(), page.page, pages),
            None => format!("{} items, page {}", items.len(), page.page),
        };
        self.status.report(Status::info(message));
        Ok(items.len())
    }

    async fn load_item(&self, id: String) -> SyncResult<Value> {
        self.listing.lock().mark_selected(Some(&id));

        let url = self.config.item_url(&id);
        let mut meta = self.meta(Method::Get, url.clone());
        let id = self.hooks.pre_find_by_id(id, &mut meta)?;
        if meta.url == url {
            meta.url = self.config.item_url(&id);
        }

        let response = self.send(meta, None).await?;
        let item = unwrap_single(&response)?.ok_or(SyncError::NotFound { id })?;
        let item = self.show_item(item)?;
        self.status
            .report(Status::info(format!("Editing {}", self.display_name(&item))));
        Ok(item)
    }

    async fn save_inner(&self) -> SyncResult<Value> {
        let (id, record) = {
            let editing = self.editing.lock();
            (self.identity_of(&*editing), self.read_record(&*editing))
        };
        let (method, url) = match &id {
            None => (Method::Post, self.config.endpoint_base().to_string()),
            Some(id) => (Method::Put, self.config.item_url(id)),
        };
        let mut meta = self.meta(method, url);
        let record = self.hooks.pre_save(record, &mut meta)?;

        let response = self.send(meta, Some(record.to_string())).await?;
        let saved = match unwrap_single(&response) {
            Ok(saved) => saved.unwrap_or(record),
            Err(err) => {
                self.highlight(&err);
                return Err(err);
            }
        };

        if let Some(err) = self.hooks.post_save(&saved) {
            self.status
                .report(Status::warning("postSave failed", err.to_string()));
        }
        let shown = self.show_item(saved)?;

        // The listing reports its own failure; the save itself has succeeded.
        let _ = self.refresh("search").await;
        let identity = self.identity_in(&shown);
        self.listing.lock().mark_selected(identity.as_deref());

        info!(id = identity.as_deref().unwrap_or(""), "item saved");
        self.status
            .report(Status::info(format!("Saved {}", self.display_name(&shown))));
        Ok(shown)
    }

    async fn delete_inner(&self) -> SyncResult<String> {
        let selected = self.selected_id();
        // Without a selection the hook sees no URL at all.
        let url = selected
            .as_deref()
            .map(|id| self.config.item_url(id))
            .unwrap_or_default();
        let mut meta = self.meta(Method::Delete, url.clone());
        let id = self
            .hooks
            .pre_delete(selected, &mut meta)?
            .filter(|id| !id.is_empty())
            .ok_or(SyncError::NothingSelected)?;
        if meta.url == url {
            meta.url = self.config.item_url(&id);
        } else {
            meta.url = self.item_target(&meta.url, &id);
        }

        let response = self.send(meta, None).await?;
        unwrap_single(&response)?;

        if let Some(err) = self.hooks.post_delete(&id) {
            self.status
                .report(Status::warning("postDelete failed", err.to_string()));
        }
        self.clear_form()?;

        let _ = self.refresh("search").await;
        info!(id = %id, "item deleted");
        self.status.report(Status::info(format!("Deleted {id}")));
        Ok(id)
    }

    /// Points a hook-rewritten delete URL at the item when its path is empty
    /// or the collection itself. The query is kept.
    fn item_target(&self, url: &str, id: &str) -> String {
        let (path, query) = match url.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (url, None),
        };
        let base = self.config.endpoint_base();
        let path = path.trim_end_matches('/');
        if !path.is_empty() && path != base {
            return url.to_string();
        }
        let item = self.config.item_url(id);
        match query {
            Some(query) => format!("{item}?{query}"),
            None => item,
        }
    }

    fn clear_form(&self) -> SyncResult<Value> {
        self.listing.lock().mark_selected(None);
        self.show_item(Value::Object(Map::new()))
    }

    /// Runs the form-update hook pair around writing `item` to the editing
    /// surface. Returns the item as written.
    fn show_item(&self, item: Value) -> SyncResult<Value> {
        let item = self.hooks.pre_update_form(item)?;
        {
            let mut editing = self.editing.lock();
            for field in &self.fields {
                let value = path::get(&item, &field.name);
                let control = codec::encode(field.kind, value, &self.config.identity_field);
                editing.write(&field.name, control);
                editing.set_invalid(&field.name, false);
            }
        }
        if let Some(err) = self.hooks.post_update_form(&item) {
            self.status
                .report(Status::warning("postUpdateForm failed", err.to_string()));
        }
        Ok(item)
    }

    fn read_record(&self, editing: &E) -> Value {
        let mut record = Value::Object(Map::new());
        for field in &self.fields {
            if editing.is_disabled(&field.name) {
                continue;
            }
            let control = editing.read(&field.name);
            if let Some(value) = codec::decode(field.kind, &control) {
                path::set(&mut record, &field.name, value);
            }
        }
        record
    }

    /// Marks every field named in the error payload invalid and clears the
    /// others. A failure without a payload clears every mark.
    fn highlight(&self, err: &SyncError) {
        if err.status().is_none() {
            return;
        }
        let invalid = err.field_errors();
        let mut editing = self.editing.lock();
        for field in &self.fields {
            let named = invalid.is_some_and(|map| map.contains_key(&field.name));
            editing.set_invalid(&field.name, named);
        }
    }

    fn row(&self, item: &Value) -> Row {
        let cells = self
            .config
            .columns
            .iter()
            .map(|column| Cell {
                text: codec::display_text(path::get(item, column)),
                style: self.config.column_styles.get(column).cloned(),
            })
            .collect();
        Row {
            identity: self.identity_in(item),
            cells,
        }
    }

    fn identity_of(&self, editing: &E) -> Option<String> {
        match editing.read(&self.config.identity_field) {
            ControlValue::Text(text) if !text.is_empty() => Some(text),
            _ => None,
        }
    }

    fn identity_in(&self, item: &Value) -> Option<String> {
        let id = codec::display_text(path::get(item, &self.config.identity_field));
        (!id.is_empty()).then_some(id)
    }

    fn display_name(&self, item: &Value) -> String {
        let name = codec::display_text(path::get(item, &self.config.display_field));
        if !name.is_empty() {
            return name;
        }
        self.identity_in(item)
            .unwrap_or_else(|| "new item".to_string())
    }

    fn meta(&self, method: Method, url: String) -> RequestMeta {
        RequestMeta {
            method,
            url,
            headers: self.config.request_headers(),
        }
    }

    async fn send(&self, meta: RequestMeta, body: Option<String>) -> SyncResult<HttpResponse> {
        debug!(method = %meta.method, url = %meta.url, "sending request");
        let request = HttpRequest {
            method: meta.method,
            url: meta.url,
            headers: meta.headers,
            body,
        };
        let response = self.transport.request(request).await?;
        debug!(status = response.status, "received response");
        Ok(response)
    }

    fn finish<R>(&self, action: &str, result: SyncResult<R>) -> SyncResult<R> {
        if let Err(err) = &result {
            warn!(action, error = %err, "action failed");
            self.status.report(Status::failure(action, err));
        }
        result
    }
}
