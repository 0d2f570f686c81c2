//! Fiber-optic distribution network tracing.
//!
//! `core` holds the in-memory inventory arena and the path tracer (pure, no I/O).
//! `store` holds the async collaborators that assemble a [`NetworkSnapshot`].

pub mod config;
pub mod core;
pub mod session;
pub mod store;

pub use crate::config::{AmbiguityPolicy, ConfigError, TracerConfig};
pub use crate::core::snapshot::{NetworkSnapshot, SnapshotError};
pub use crate::core::step::{EndCause, Highlight, PathStep, StepKind};
pub use crate::core::trace::{Trace, TraceError, TraceRequest, trace, trace_path};
pub use crate::core::types::ElementKind;
pub use crate::session::NetworkTracer;
pub use crate::store::loader::{LoadError, load_snapshot};
pub use crate::store::{CollectionPath, Document, InventoryStore, StoreError};
