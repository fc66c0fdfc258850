//! # restbind engine
//!
//! Binds a REST resource to a listing surface and an editing surface driven
//! purely by configuration.
//!
//! This crate provides:
//! - Dotted-path access into nested JSON records
//! - Typed conversion between editing controls and record values
//! - Normalization of list and single-item response shapes
//! - Lifecycle hooks with abort-on-failure pre-hooks
//! - The binding engine (search, select, create, save, delete, reset, paging)
//! - Status reporting
//!
//! ## Architecture
//!
//! A gesture on a surface calls one engine action. Each action runs:
//! 1. Pre-hook (may replace the payload or abort)
//! 2. At most one HTTP round trip through a [`Transport`]
//! 3. Response normalization
//! 4. Surface updates
//! 5. Post-hook (failure is reported, never undone)
//! 6. Status report
//!
//! ## Key Invariants
//!
//! - The editing surface's identity control is the source of truth for the
//!   selected item
//! - The pagination offset never goes negative
//! - A pre-hook failure means no request is made
//! - Delete never targets the collection root
//! - Every action is a catch boundary

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

pub mod codec;
mod config;
mod error;
mod hooks;
pub mod path;
pub mod response;
mod state;
mod status;
mod surface;
mod transport;

pub use codec::{FieldBinding, FieldKind};
pub use config::{BindingConfig, Pagination};
pub use error::{ConfigError, HookError, SyncError, SyncResult};
pub use hooks::{
    HookPipeline, HookPoint, HookResult, Hooks, ObserveHook, RequestHook, RequestMeta,
    TransformHook,
};
pub use response::ListResult;
pub use state::{EngineState, PageCursor, SyncEngine};
pub use status::{Status, StatusLevel, StatusReporter, StatusSink};
pub use surface::{
    Cell, ControlSpec, ControlType, ControlValue, EditingSurface, ListingSurface, PageStatus, Row,
};
pub use transport::{HttpRequest, HttpResponse, Method, MockTransport, Transport};
