//! Integration tests for the binding engine against an in-memory resource.

use async_trait::async_trait;
use parking_lot::Mutex;
use restbind_engine::{
    BindingConfig, ConfigError, ControlValue, EngineState, HttpRequest, HttpResponse, Method,
    StatusLevel, SyncEngine, SyncError, SyncResult, Transport,
};
use restbind_testkit::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Notify;

fn body_of(request: &HttpRequest) -> Value {
    serde_json::from_str(request.body.as_deref().unwrap_or("null")).unwrap()
}

#[tokio::test]
async fn create_assigns_server_identity() {
    let binding = TestBinding::widgets(Vec::new());
    binding
        .resource
        .script(HttpResponse::json_body(201, &json!({"id": "42", "name": "Foo"})));

    binding.type_text("name", "Foo");
    let saved = binding.save().await.unwrap();

    let requests = binding.resource.requests();
    assert_eq!(requests[0].method, Method::Post);
    assert_eq!(requests[0].url, "/api/widgets");
    assert_eq!(body_of(&requests[0]), json!({"name": "Foo"}));
    assert_eq!(
        requests[0].headers.get("Content-Type").map(String::as_str),
        Some("application/json")
    );

    assert_eq!(saved["id"], "42");
    assert_eq!(binding.form_text("id"), "42");
    assert_eq!(binding.selected_id().as_deref(), Some("42"));
    assert_eq!(binding.listing().selected(), Some("42"));
    assert!(binding.status_text().contains("Foo"));
}

#[tokio::test]
async fn create_then_list() {
    let binding = TestBinding::widgets(widgets(2));

    binding.create_new().unwrap();
    assert_eq!(binding.status_text(), "Editing new item");
    binding.type_text("name", "Gizmo");
    binding.save().await.unwrap();

    assert_eq!(binding.form_text("id"), "3");
    assert_eq!(binding.resource.get("3"), Some(widget("3", "Gizmo")));
    // Save refreshes the listing.
    assert_eq!(
        binding.listed().last().cloned(),
        Some(vec!["3".to_string(), "Gizmo".to_string()])
    );
    assert_eq!(binding.status_text(), "Saved Gizmo");
}

#[tokio::test]
async fn update_uses_identity_from_form() {
    let binding = TestBinding::widgets(widgets(3));
    binding.search(None).await.unwrap();

    let item = binding.select_by_id("2").await.unwrap();
    assert_eq!(item, widget("2", "widget 2"));
    assert_eq!(binding.form_text("name"), "widget 2");
    assert_eq!(binding.listing().selected(), Some("2"));
    assert_eq!(binding.status_text(), "Editing widget 2");

    binding.type_text("name", "Renamed");
    binding.save().await.unwrap();

    let puts = binding.resource.requests_with(Method::Put);
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].url, "/api/widgets/2");
    assert_eq!(binding.resource.get("2"), Some(widget("2", "Renamed")));
    assert_eq!(binding.listed()[1], vec!["2", "Renamed"]);
    assert_eq!(binding.listing().selected(), Some("2"));
}

#[tokio::test]
async fn save_highlights_rejected_fields() {
    let resource = InMemoryResource::builder(WIDGETS).require("name").build();
    let binding = TestBinding::build(widget_config(), resource, widget_form());

    let err = binding.save().await.unwrap_err();

    assert_eq!(err.status(), Some(400));
    assert_eq!(binding.editing().invalid(), vec!["name".to_string()]);
    let status = binding.last_status().unwrap();
    assert_eq!(status.level, StatusLevel::Error);
    assert_eq!(status.message, "save failed");
    assert!(binding.resource.items().is_empty());
    assert_eq!(binding.state(), EngineState::Idle);

    // A successful save clears the marks.
    binding.type_text("name", "Fixed");
    binding.save().await.unwrap();
    assert!(binding.editing().invalid().is_empty());
}

#[tokio::test]
async fn save_failure_without_field_payload_clears_marks() {
    let resource = InMemoryResource::builder(WIDGETS).require("name").build();
    let binding = TestBinding::build(widget_config(), resource, widget_form());
    binding.save().await.unwrap_err();
    assert_eq!(binding.editing().invalid(), vec!["name".to_string()]);

    binding.type_text("name", "Foo");
    binding.resource.script(HttpResponse::new(502, "Bad Gateway"));
    let err = binding.save().await.unwrap_err();

    assert_eq!(err.status(), Some(502));
    assert!(binding.editing().invalid().is_empty());
}

#[tokio::test]
async fn save_failure_body_without_errors_key_marks_nothing() {
    let binding = TestBinding::widgets(widgets(1));
    binding.type_text("name", "Foo");
    binding.resource.script(HttpResponse::json_body(
        500,
        &json!({"message": "boom", "name": "x"}),
    ));

    let err = binding.save().await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert!(binding.editing().invalid().is_empty());

    binding.resource.script(HttpResponse::json_body(409, &widget("1", "widget 1")));
    binding.save().await.unwrap_err();
    assert!(binding.editing().invalid().is_empty());
}

#[tokio::test]
async fn save_without_body_keeps_sent_record() {
    let binding = TestBinding::widgets(widgets(1));
    binding.select_by_id("1").await.unwrap();
    binding.resource.script(HttpResponse::no_content());

    binding.type_text("name", "Quiet");
    let saved = binding.save().await.unwrap();

    assert_eq!(saved, widget("1", "Quiet"));
    assert_eq!(binding.form_text("name"), "Quiet");
}

#[tokio::test]
async fn delete_selected_item() {
    let binding = TestBinding::widgets(widgets(3));
    binding.select_by_id("2").await.unwrap();

    let id = binding.delete_selected().await.unwrap();

    assert_eq!(id, "2");
    let deletes = binding.resource.requests_with(Method::Delete);
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0].url, "/api/widgets/2");
    assert_eq!(binding.resource.items().len(), 2);
    assert_eq!(binding.form_text("id"), "");
    assert_eq!(binding.form_text("name"), "");
    assert_eq!(binding.listed().len(), 2);
    assert_eq!(binding.listing().selected(), None);
    assert_eq!(binding.status_text(), "Deleted 2");
}

#[tokio::test]
async fn delete_without_selection_never_targets_collection() {
    let binding = TestBinding::widgets(widgets(3));

    let err = binding.delete_selected().await.unwrap_err();

    assert!(matches!(err, SyncError::NothingSelected));
    assert!(binding.resource.requests_with(Method::Delete).is_empty());
    assert!(binding
        .resource
        .requests()
        .iter()
        .all(|request| !request.url.ends_with('/')));
    assert_eq!(binding.status_text(), "delete failed: nothing selected");
    assert_eq!(binding.resource.items().len(), 3);
}

#[tokio::test]
async fn select_missing_item() {
    let binding = TestBinding::widgets(widgets(1));

    let err = binding.select_by_id("99").await.unwrap_err();
    assert_eq!(err.status(), Some(404));

    binding.resource.script(HttpResponse::no_content());
    let err = binding.select_by_id("98").await.unwrap_err();
    assert!(matches!(err, SyncError::NotFound { ref id } if id == "98"));
    assert_eq!(binding.form_text("name"), "");
}

#[tokio::test]
async fn identity_is_percent_encoded() {
    let binding = TestBinding::widgets(vec![widget("a/b c", "slashed")]);

    binding.select_by_id("a/b c").await.unwrap();

    assert_eq!(binding.resource.requests()[0].url, "/api/widgets/a%2Fb%20c");
    assert_eq!(binding.form_text("name"), "slashed");
}

#[tokio::test]
async fn reset_reloads_or_clears() {
    let binding = TestBinding::widgets(widgets(2));

    binding.reset_form().await.unwrap();
    assert_eq!(binding.status_text(), "Editing new item");
    assert_eq!(binding.resource.request_count(), 0);

    binding.select_by_id("2").await.unwrap();
    binding.type_text("name", "dirty");
    let item = binding.reset_form().await.unwrap();

    assert_eq!(item, widget("2", "widget 2"));
    assert_eq!(binding.form_text("name"), "widget 2");
    assert_eq!(binding.resource.request_count(), 2);
}

#[tokio::test]
async fn create_new_clears_selection() {
    let binding = TestBinding::widgets(widgets(2));
    binding.select_by_id("1").await.unwrap();

    binding.create_new().unwrap();

    assert_eq!(binding.selected_id(), None);
    assert_eq!(binding.listing().selected(), None);
    assert_eq!(binding.form_text("name"), "");
}

#[tokio::test]
async fn pagination_offsets() {
    let binding = TestBinding::widgets(widgets(23));

    binding.search(None).await.unwrap();
    assert_eq!(binding.resource.requests()[0].url, "/api/widgets?limit=5&offset=0");
    assert_eq!(binding.status_text(), "5 items, page 1 of 5");
    let page = binding.listing().page().unwrap();
    assert_eq!((page.page, page.pages), (1, Some(5)));
    assert!(!page.has_previous);
    assert!(page.has_next);

    for _ in 0..3 {
        binding.next_page().await.unwrap();
    }
    assert_eq!(binding.pagination().offset, 15);
    assert_eq!(binding.listed()[0], vec!["16", "widget 16"]);

    binding.previous_page().await.unwrap();
    assert_eq!(binding.pagination().offset, 10);

    for _ in 0..4 {
        binding.previous_page().await.unwrap();
    }
    assert_eq!(binding.pagination().offset, 0);
    assert_eq!(binding.listed()[0], vec!["1", "widget 1"]);
}

#[tokio::test]
async fn last_page_disables_next() {
    let binding = TestBinding::widgets(widgets(12));
    binding.search(None).await.unwrap();
    binding.next_page().await.unwrap();
    binding.next_page().await.unwrap();

    let page = binding.listing().page().unwrap();
    assert_eq!((page.page, page.pages), (3, Some(3)));
    assert!(page.has_previous);
    assert!(!page.has_next);
    assert_eq!(binding.listed().len(), 2);
}

#[tokio::test]
async fn search_term_survives_paging() {
    let binding = TestBinding::widgets(widgets(23));

    binding.search(Some("widget 1")).await.unwrap();
    assert_eq!(binding.pagination().total, 11);
    binding.next_page().await.unwrap();

    let urls: Vec<String> = binding
        .resource
        .requests()
        .into_iter()
        .map(|request| request.url)
        .collect();
    assert_eq!(
        urls,
        [
            "/api/widgets?search=widget%201&limit=5&offset=0",
            "/api/widgets?search=widget%201&limit=5&offset=5",
        ]
    );

    // An explicit search starts over.
    binding.search(Some("widget 2")).await.unwrap();
    assert_eq!(binding.pagination().offset, 0);
    assert_eq!(binding.listed().len(), 5);
}

#[tokio::test]
async fn unknown_total_keeps_next_enabled() {
    let resource = InMemoryResource::new(WIDGETS);
    for item in widgets(3) {
        resource.insert(item);
    }
    let config = BindingConfig::new(WIDGETS).with_columns(["name"]);
    let binding = TestBinding::build(config, resource, widget_form());

    binding.search(None).await.unwrap();

    let page = binding.listing().page().unwrap();
    assert_eq!(page.pages, None);
    assert!(page.has_next);
    assert_eq!(binding.status_text(), "3 items, page 1");
    assert_eq!(binding.resource.requests()[0].url, "/api/widgets");
}

#[tokio::test]
async fn transport_failure_is_reported() {
    let binding = TestBinding::widgets(widgets(3));
    binding.resource.set_offline(true);

    let err = binding.search(None).await.unwrap_err();
    assert!(err.is_transport_like());
    assert_eq!(
        binding.status_text(),
        "search failed: transport error: network unreachable"
    );
    assert_eq!(binding.state(), EngineState::Idle);

    binding.resource.set_offline(false);
    assert_eq!(binding.search(None).await.unwrap(), 3);
}

#[tokio::test]
async fn construction_fails_fast() {
    let resource = InMemoryResource::new(WIDGETS);
    let form = RecordingForm::new().text("name");

    let result = SyncEngine::new(widget_config(), resource.clone(), RecordingListing::new(), form);
    assert!(matches!(
        result,
        Err(ConfigError::MissingIdentityControl(ref field)) if field == "id"
    ));

    let result = SyncEngine::new(
        BindingConfig::new(WIDGETS),
        resource.clone(),
        RecordingListing::new(),
        widget_form(),
    );
    assert!(matches!(result, Err(ConfigError::MissingColumns)));

    let result = SyncEngine::new(
        widget_config().with_header("X-Bad", "a\r\nb"),
        resource,
        RecordingListing::new(),
        widget_form(),
    );
    assert!(matches!(result, Err(ConfigError::InvalidHeader { .. })));
}

#[tokio::test]
async fn typed_fields_round_trip() {
    let resource = widget_resource(vec![json!({
        "id": "1",
        "name": "Deluxe",
        "active": 1,
        "released": "2024-03-05T10:00:00Z",
        "meta": {"a": 1},
        "tags": ["x", "y"],
        "owner": {"id": "u7", "name": "Ann"},
        "address": {"city": "Oslo"}
    })]);
    let form = RecordingForm::new()
        .text("id")
        .disabled("id")
        .text("name")
        .checkbox("active")
        .date("released")
        .json("meta")
        .array("tags")
        .select("owner")
        .text("address.city")
        .unnamed(restbind_engine::ControlType::Text);
    let config = widget_config()
        .with_columns(["name", "address.city"])
        .with_column_style("address.city", "muted");
    let binding = TestBinding::build(config, resource, form);

    binding.search(None).await.unwrap();
    let city = binding.listing().column(1);
    assert_eq!(city[0].text, "Oslo");
    assert_eq!(city[0].style.as_deref(), Some("muted"));

    binding.select_by_id("1").await.unwrap();
    {
        let form = binding.editing();
        assert_eq!(form.value("active"), ControlValue::Checked(true));
        assert_eq!(form.text_of("released"), "2024-03-05");
        assert_eq!(form.text_of("meta"), "{\n  \"a\": 1\n}");
        assert_eq!(form.text_of("tags"), "x\ny");
        assert_eq!(form.text_of("owner"), "u7");
        assert_eq!(form.text_of("address.city"), "Oslo");
    }

    binding.type_text("meta", "{broken");
    binding.save().await.unwrap();

    let put = binding.resource.requests_with(Method::Put).remove(0);
    assert_eq!(put.url, "/api/widgets/1");
    assert_eq!(
        body_of(&put),
        json!({
            "name": "Deluxe",
            "active": true,
            "released": "2024-03-05",
            "tags": ["x", "y"],
            "owner": "u7",
            "address": {"city": "Oslo"}
        })
    );
}

/// Holds the first request until released, so a later action can overtake it.
struct GatedTransport {
    inner: InMemoryResource,
    gate: Mutex<Option<Arc<Notify>>>,
}

#[async_trait]
impl Transport for GatedTransport {
    async fn request(&self, request: HttpRequest) -> SyncResult<HttpResponse> {
        let gate = self.gate.lock().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.inner.request(request).await
    }
}

#[tokio::test]
async fn superseded_search_does_not_render() {
    let resource = widget_resource(widgets(12));
    let gate = Arc::new(Notify::new());
    let transport = GatedTransport {
        inner: resource.clone(),
        gate: Mutex::new(Some(Arc::clone(&gate))),
    };
    let engine = SyncEngine::new(
        widget_config(),
        transport,
        RecordingListing::new(),
        widget_form(),
    )
    .unwrap();

    let slow = engine.search(Some("widget 1"));
    let fast = async {
        let rendered = engine.search(Some("widget 2")).await.unwrap();
        assert_eq!(engine.state(), EngineState::Busy);
        gate.notify_one();
        rendered
    };
    let (slow, fast) = tokio::join!(slow, fast);

    assert_eq!(fast, 1);
    assert!(slow.is_ok());
    assert_eq!(engine.state(), EngineState::Idle);
    assert_eq!(engine.listing().renders(), 1);
    assert_eq!(engine.listing().texts(), vec![vec!["2", "widget 2"]]);
    assert_eq!(resource.request_count(), 2);
}
