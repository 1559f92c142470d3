//! tfplug - Terraform provider framework for Rust
//!
//! Provides the value model, schemas, provider traits and the helpers that
//! cloud providers share: client-side filtering, state polling and retries.

pub mod context;
pub mod error;
pub mod helper;
pub mod provider;
pub mod request;
pub mod schema;
pub mod timeouts;
pub mod types;
pub mod validator;

pub use context::Context;
pub use error::{Result, TfplugError};
pub use provider::{DataSource, Provider, Resource};
pub use schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
pub use timeouts::Timeouts;
pub use types::{Config, Diagnostic, Diagnostics, Dynamic, ResourceData, State};
