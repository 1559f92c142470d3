//! Signed REST bindings for the BCE services used by the provider

pub mod auth;
pub mod bcc;
pub mod ccev2;
pub mod client;
pub mod common;
pub mod eip;
pub mod error;
pub mod transport;
pub mod vpc;

#[cfg(test)]
pub mod test_helpers;

pub use auth::Credentials;
pub use client::{Client, RetryConfig, Service, ServiceEndpoints};
pub use common::{ApiQueryParams, PaginationParams, TagModel};
pub use error::ApiError;
