//! Lifecycle hooks around engine actions.
//!
//! A pre-hook sees the candidate payload and may return a replacement;
//! returning `Ok(None)` keeps the payload as is. A pre-hook that fails aborts
//! the whole action before any request is made.
//!
//! A post-hook sees the action's result. Its failure is logged and reported
//! but never undoes the action.
//!
//! An unset hook passes its input through unchanged.

use crate::error::{HookError, SyncError, SyncResult};
use crate::transport::Method;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// What a pre-hook returns: a replacement payload, or `None` to keep it.
pub type HookResult<T> = Result<Option<T>, HookError>;

/// Pre-hook for a step that issues a request.
pub type RequestHook<T> = Arc<dyn Fn(&T, &mut RequestMeta) -> HookResult<T> + Send + Sync>;

/// Pre-hook for a step that only touches a surface.
pub type TransformHook<T> = Arc<dyn Fn(&T) -> HookResult<T> + Send + Sync>;

/// Post-hook.
pub type ObserveHook<T> = Arc<dyn Fn(&T) -> Result<(), HookError> + Send + Sync>;

/// Request details a pre-hook may rewrite before the request is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMeta {
    /// HTTP method.
    pub method: Method,
    /// Target URL.
    pub url: String,
    /// Request headers.
    pub headers: BTreeMap<String, String>,
}

/// Lifecycle points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    /// Before a search request; payload is the search term.
    PreSearch,
    /// Before rows are rendered; payload is the item list.
    PreUpdateTable,
    /// After rows are rendered.
    PostUpdateTable,
    /// Before a fetch by identity; payload is the identity.
    PreFindById,
    /// Before an item is written to the editing surface.
    PreUpdateForm,
    /// After an item is written to the editing surface.
    PostUpdateForm,
    /// Before a create or update request; payload is the record.
    PreSave,
    /// After a successful save; payload is the saved item.
    PostSave,
    /// Before a delete request; payload is the identity, if any.
    PreDelete,
    /// After a successful delete.
    PostDelete,
}

impl HookPoint {
    /// Returns the lifecycle point's name.
    pub fn name(&self) -> &'static str {
        match self {
            HookPoint::PreSearch => "preSearch",
            HookPoint::PreUpdateTable => "preUpdateTable",
            HookPoint::PostUpdateTable => "postUpdateTable",
            HookPoint::PreFindById => "preFindById",
            HookPoint::PreUpdateForm => "preUpdateForm",
            HookPoint::PostUpdateForm => "postUpdateForm",
            HookPoint::PreSave => "preSave",
            HookPoint::PostSave => "postSave",
            HookPoint::PreDelete => "preDelete",
            HookPoint::PostDelete => "postDelete",
        }
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The set of configured hooks.
///
/// ```
/// use restbind_engine::{HookError, Hooks};
///
/// let hooks = Hooks::new()
///     .pre_save(|record, _meta| {
///         if record.get("name").is_none() {
///             return Err(HookError::new("name is required"));
///         }
///         Ok(None)
///     })
///     .post_delete(|id| {
///         println!("deleted {id}");
///         Ok(())
///     });
/// assert!(hooks.is_set(restbind_engine::HookPoint::PreSave));
/// ```
#[derive(Clone, Default)]
pub struct Hooks {
    pre_search: Option<RequestHook<Option<String>>>,
    pre_update_table: Option<TransformHook<Vec<Value>>>,
    post_update_table: Option<ObserveHook<[Value]>>,
    pre_find_by_id: Option<RequestHook<String>>,
    pre_update_form: Option<TransformHook<Value>>,
    post_update_form: Option<ObserveHook<Value>>,
    pre_save: Option<RequestHook<Value>>,
    post_save: Option<ObserveHook<Value>>,
    pre_delete: Option<RequestHook<Option<String>>>,
    post_delete: Option<ObserveHook<str>>,
}

impl Hooks {
    /// Creates an empty hook set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `preSearch` hook. The payload is the search term.
    pub fn pre_search<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Option<String>, &mut RequestMeta) -> HookResult<Option<String>> + Send + Sync + 'static,
    {
        self.pre_search = Some(Arc::new(hook));
        self
    }

    /// Sets the `preUpdateTable` hook.
    pub fn pre_update_table<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Vec<Value>) -> HookResult<Vec<Value>> + Send + Sync + 'static,
    {
        self.pre_update_table = Some(Arc::new(hook));
        self
    }

    /// Sets the `postUpdateTable` hook.
    pub fn post_update_table<F>(mut self, hook: F) -> Self
    where
        F: Fn(&[Value]) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.post_update_table = Some(Arc::new(hook));
        self
    }

    /// Sets the `preFindById` hook. The payload is the identity.
    pub fn pre_find_by_id<F>(mut self, hook: F) -> Self
    where
        F: Fn(&String, &mut RequestMeta) -> HookResult<String> + Send + Sync + 'static,
    {
        self.pre_find_by_id = Some(Arc::new(hook));
        self
    }

    /// Sets the `preUpdateForm` hook.
    pub fn pre_update_form<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Value) -> HookResult<Value> + Send + Sync + 'static,
    {
        self.pre_update_form = Some(Arc::new(hook));
        self
    }

    /// Sets the `postUpdateForm` hook.
    pub fn post_update_form<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Value) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.post_update_form = Some(Arc::new(hook));
        self
    }

    /// Sets the `preSave` hook. The payload is the record read from the
    /// editing surface.
    pub fn pre_save<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Value, &mut RequestMeta) -> HookResult<Value> + Send + Sync + 'static,
    {
        self.pre_save = Some(Arc::new(hook));
        self
    }

    /// Sets the `postSave` hook.
    pub fn post_save<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Value) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.post_save = Some(Arc::new(hook));
        self
    }

    /// Sets the `preDelete` hook.
    ///
    /// The payload is the selected identity, if any. Returning
    /// `Ok(Some(Some(id)))` deletes `id` even without a selection;
    /// `Ok(Some(None))` blocks the deletion.
    pub fn pre_delete<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Option<String>, &mut RequestMeta) -> HookResult<Option<String>>
            + Send
            + Sync
            + 'static,
    {
        self.pre_delete = Some(Arc::new(hook));
        self
    }

    /// Sets the `postDelete` hook. The payload is the deleted identity.
    pub fn post_delete<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.post_delete = Some(Arc::new(hook));
        self
    }

    /// Returns whether a hook is set for the given point.
    pub fn is_set(&self, point: HookPoint) -> bool {
        match point {
            HookPoint::PreSearch => self.pre_search.is_some(),
            HookPoint::PreUpdateTable => self.pre_update_table.is_some(),
            HookPoint::PostUpdateTable => self.post_update_table.is_some(),
            HookPoint::PreFindById => self.pre_find_by_id.is_some(),
            HookPoint::PreUpdateForm => self.pre_update_form.is_some(),
            HookPoint::PostUpdateForm => self.post_update_form.is_some(),
            HookPoint::PreSave => self.pre_save.is_some(),
            HookPoint::PostSave => self.post_save.is_some(),
            HookPoint::PreDelete => self.pre_delete.is_some(),
            HookPoint::PostDelete => self.post_delete.is_some(),
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const POINTS: [HookPoint; 10] = [
            HookPoint::PreSearch,
            HookPoint::PreUpdateTable,
            HookPoint::PostUpdateTable,
            HookPoint::PreFindById,
            HookPoint::PreUpdateForm,
            HookPoint::PostUpdateForm,
            HookPoint::PreSave,
            HookPoint::PostSave,
            HookPoint::PreDelete,
            HookPoint::PostDelete,
        ];
        f.debug_list()
            .entries(POINTS.iter().filter(|p| self.is_set(**p)).map(HookPoint::name))
            .finish()
    }
}

/// Runs hooks at their lifecycle points and applies the abort/observe
/// contract.
#[derive(Debug, Clone, Default)]
pub struct HookPipeline {
    hooks: Hooks,
}

impl HookPipeline {
    /// Creates a pipeline over the given hooks.
    pub fn new(hooks: Hooks) -> Self {
        Self { hooks }
    }

    /// Returns the configured hooks.
    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    /// Runs `preSearch`.
    pub fn pre_search(
        &self,
        term: Option<String>,
        meta: &mut RequestMeta,
    ) -> SyncResult<Option<String>> {
        intercept_request(HookPoint::PreSearch, self.hooks.pre_search.as_ref(), term, meta)
    }

    /// Runs `preUpdateTable`.
    pub fn pre_update_table(&self, items: Vec<Value>) -> SyncResult<Vec<Value>> {
        intercept(
            HookPoint::PreUpdateTable,
            self.hooks.pre_update_table.as_ref(),
            items,
        )
    }

    /// Runs `postUpdateTable`.
    pub fn post_update_table(&self, items: &[Value]) -> Option<HookError> {
        observe(
            HookPoint::PostUpdateTable,
            self.hooks.post_update_table.as_ref(),
            items,
        )
    }

    /// Runs `preFindById`.
    pub fn pre_find_by_id(&self, id: String, meta: &mut RequestMeta) -> SyncResult<String> {
        intercept_request(HookPoint::PreFindById, self.hooks.pre_find_by_id.as_ref(), id, meta)
    }

    /// Runs `preUpdateForm`.
    pub fn pre_update_form(&self, item: Value) -> SyncResult<Value> {
        intercept(HookPoint::PreUpdateForm, self.hooks.pre_update_form.as_ref(), item)
    }

    /// Runs `postUpdateForm`.
    pub fn post_update_form(&self, item: &Value) -> Option<HookError> {
        observe(HookPoint::PostUpdateForm, self.hooks.post_update_form.as_ref(), item)
    }

    /// Runs `preSave`.
    pub fn pre_save(&self, record: Value, meta: &mut RequestMeta) -> SyncResult<Value> {
        intercept_request(HookPoint::PreSave, self.hooks.pre_save.as_ref(), record, meta)
    }

    /// Runs `postSave`.
    pub fn post_save(&self, item: &Value) -> Option<HookError> {
        observe(HookPoint::PostSave, self.hooks.post_save.as_ref(), item)
    }

    /// Runs `preDelete`.
    pub fn pre_delete(
        &self,
        id: Option<String>,
        meta: &mut RequestMeta,
    ) -> SyncResult<Option<String>> {
        intercept_request(HookPoint::PreDelete, self.hooks.pre_delete.as_ref(), id, meta)
    }

    /// Runs `postDelete`.
    pub fn post_delete(&self, id: &str) -> Option<HookError> {
        observe(HookPoint::PostDelete, self.hooks.post_delete.as_ref(), id)
    }
}

fn intercept_request<T>(
    point: HookPoint,
    hook: Option<&RequestHook<T>>,
    payload: T,
    meta: &mut RequestMeta,
) -> SyncResult<T> {
    match hook {
        None => Ok(payload),
        Some(hook) => apply(point, hook(&payload, meta), payload),
    }
}

fn intercept<T>(point: HookPoint, hook: Option<&TransformHook<T>>, payload: T) -> SyncResult<T> {
    match hook {
        None => Ok(payload),
        Some(hook) => apply(point, hook(&payload), payload),
    }
}

fn apply<T>(point: HookPoint, outcome: HookResult<T>, payload: T) -> SyncResult<T> {
    match outcome {
        Ok(Some(replacement)) => {
            debug!(hook = point.name(), "hook replaced payload");
            Ok(replacement)
        }
        Ok(None) => Ok(payload),
        Err(err) => {
            warn!(hook = point.name(), error = %err, "hook aborted action");
            Err(SyncError::HookAbort {
                hook: point.name(),
                message: err.message().to_string(),
            })
        }
    }
}

fn observe<T: ?Sized>(
    point: HookPoint,
    hook: Option<&ObserveHook<T>>,
    payload: &T,
) -> Option<HookError> {
    let hook = hook?;
    let err = hook(payload).err()?;
    warn!(hook = point.name(), error = %err, "post hook failed");
    Some(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta() -> RequestMeta {
        RequestMeta {
            method: Method::Post,
            url: "/api/widgets".into(),
            headers: BTreeMap::new(),
        }
    }

    #[test]
    fn unset_hooks_pass_through() {
        let pipeline = HookPipeline::default();
        let mut meta = meta();
        let record = pipeline.pre_save(json!({"a": 1}), &mut meta).unwrap();
        assert_eq!(record, json!({"a": 1}));
        assert_eq!(meta.url, "/api/widgets");
        assert!(pipeline.post_save(&record).is_none());
        assert_eq!(pipeline.pre_delete(None, &mut meta).unwrap(), None);
    }

    #[test]
    fn pre_hook_replaces_payload_and_url() {
        let pipeline = HookPipeline::new(Hooks::new().pre_save(|record, meta| {
            meta.url.push_str("?validate=1");
            let mut record = record.clone();
            record["stamp"] = json!(true);
            Ok(Some(record))
        }));
        let mut meta = meta();
        let record = pipeline.pre_save(json!({"a": 1}), &mut meta).unwrap();
        assert_eq!(record, json!({"a": 1, "stamp": true}));
        assert_eq!(meta.url, "/api/widgets?validate=1");
    }

    #[test]
    fn pre_hook_returning_none_keeps_payload() {
        let pipeline = HookPipeline::new(Hooks::new().pre_update_form(|_| Ok(None)));
        assert_eq!(pipeline.pre_update_form(json!({"x": 1})).unwrap(), json!({"x": 1}));
    }

    #[test]
    fn pre_hook_failure_aborts() {
        let pipeline = HookPipeline::new(Hooks::new().pre_save(|_, _| Err("locked".into())));
        let err = pipeline.pre_save(json!({}), &mut meta()).unwrap_err();
        match err {
            SyncError::HookAbort { hook, message } => {
                assert_eq!(hook, "preSave");
                assert_eq!(message, "locked");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn pre_delete_can_supply_or_block_identity() {
        let supply = HookPipeline::new(Hooks::new().pre_delete(|_, _| Ok(Some(Some("7".into())))));
        assert_eq!(supply.pre_delete(None, &mut meta()).unwrap(), Some("7".into()));

        let block = HookPipeline::new(Hooks::new().pre_delete(|_, _| Ok(Some(None))));
        assert_eq!(block.pre_delete(Some("3".into()), &mut meta()).unwrap(), None);
    }

    #[test]
    fn post_hook_failure_is_observed() {
        let pipeline = HookPipeline::new(Hooks::new().post_delete(|_| Err("audit down".into())));
        let err = pipeline.post_delete("1").unwrap();
        assert_eq!(err.message(), "audit down");
    }

    #[test]
    fn debug_lists_configured_points() {
        let hooks = Hooks::new().pre_search(|_, _| Ok(None)).post_save(|_| Ok(()));
        assert_eq!(format!("{hooks:?}"), r#"["preSearch", "postSave"]"#);
    }
}
