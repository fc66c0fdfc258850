//! # restbind testkit
//!
//! Test utilities for restbind.
//!
//! This crate provides:
//! - An in-memory REST resource implementing the engine's transport
//! - Recording listing and editing surfaces
//! - Widget fixtures wiring an engine to both
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use restbind_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn lists_widgets() {
//!     let binding = TestBinding::widgets(widgets(3));
//!     binding.search(None).await.unwrap();
//!     assert_eq!(binding.listed().len(), 3);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod server;
pub mod surfaces;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::server::*;
    pub use crate::surfaces::*;
}

pub use fixtures::*;
pub use generators::*;
pub use server::*;
pub use surfaces::*;
