//! Test fixtures and engine helpers.
//!
//! Provides a ready-made widgets binding wired to an in-memory resource and
//! recording surfaces.

use crate::server::{InMemoryResource, ListShape};
use crate::surfaces::{RecordingForm, RecordingListing};
use restbind_engine::{BindingConfig, Hooks, Pagination, SyncEngine};
use serde_json::{json, Value};
use std::ops::Deref;

/// Endpoint used by the widget fixtures.
pub const WIDGETS: &str = "/api/widgets";

/// Engine type used throughout the tests.
pub type TestEngine = SyncEngine<InMemoryResource, RecordingListing, RecordingForm>;

/// A widget record.
pub fn widget(id: &str, name: &str) -> Value {
    json!({ "id": id, "name": name })
}

/// `count` widgets with identities `1..=count` and names `widget N`.
pub fn widgets(count: usize) -> Vec<Value> {
    (1..=count)
        .map(|i| widget(&i.to_string(), &format!("widget {i}")))
        .collect()
}

/// Widgets binding: `id`/`name` columns, `limit`/`offset` paging with
/// increment 5 and the total at `meta.total`.
pub fn widget_config() -> BindingConfig {
    BindingConfig::new(WIDGETS)
        .with_columns(["id", "name"])
        .with_pagination(Pagination {
            size_param: Some("limit".into()),
            size: 5,
            number_param: Some("offset".into()),
            increment: 5,
        })
        .with_total_path("meta.total")
}

/// Editing surface with `id` and `name` text controls.
pub fn widget_form() -> RecordingForm {
    RecordingForm::new().text("id").text("name")
}

/// A widget resource answering `{"results": [...], "meta": {"total": n}}`.
pub fn widget_resource(items: Vec<Value>) -> InMemoryResource {
    InMemoryResource::builder(WIDGETS)
        .shape(ListShape::Results {
            total_path: "meta.total".into(),
        })
        .items(items)
        .build()
}

/// A widgets engine with its backing resource.
pub struct TestBinding {
    /// The engine under test.
    pub engine: TestEngine,
    /// Handle to the engine's resource.
    pub resource: InMemoryResource,
}

impl TestBinding {
    /// Widgets binding over the given items.
    pub fn widgets(items: Vec<Value>) -> Self {
        Self::with_hooks(items, Hooks::new())
    }

    /// Widgets binding over the given items with hooks attached.
    pub fn with_hooks(items: Vec<Value>, hooks: Hooks) -> Self {
        Self::build(
            widget_config().with_hooks(hooks),
            widget_resource(items),
            widget_form(),
        )
    }

    /// Builds a binding from parts.
    pub fn build(config: BindingConfig, resource: InMemoryResource, form: RecordingForm) -> Self {
        let engine = SyncEngine::new(config, resource.clone(), RecordingListing::new(), form)
            .expect("fixture configuration is valid");
        Self { engine, resource }
    }

    /// Types text into a control of the editing surface.
    pub fn type_text(&self, name: &str, text: &str) {
        self.engine.editing().set_text(name, text);
    }

    /// Returns a control's text.
    pub fn form_text(&self, name: &str) -> String {
        self.engine.editing().text_of(name)
    }

    /// Returns the cell text of every listing row.
    pub fn listed(&self) -> Vec<Vec<String>> {
        self.engine.listing().texts()
    }

    /// Returns the last status as text.
    pub fn status_text(&self) -> String {
        self.engine
            .last_status()
            .map(|status| status.to_string())
            .unwrap_or_default()
    }
}

impl Deref for TestBinding {
    type Target = TestEngine;

    fn deref(&self) -> &Self::Target {
        &self.engine
    }
}
