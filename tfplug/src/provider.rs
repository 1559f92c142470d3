//! Provider, resource and data source traits
//!
//! A provider is configured once, then acts as a factory for resources and
//! data sources by type name. The plugin transport that drives these traits
//! lives outside this crate.

use crate::request::{
    ConfigureRequest, ConfigureResponse, CreateRequest, CreateResponse, DataSourceSchemaResponse,
    DeleteRequest, DeleteResponse, ReadDataSourceRequest, ReadDataSourceResponse, ReadRequest,
    ReadResponse, ResourceSchemaResponse, SchemaRequest, UpdateRequest, UpdateResponse,
    ValidateRequest, ValidateResponse,
};
use crate::schema::{DataSourceSchema, ResourceSchema, Schema};
use crate::types::Diagnostics;
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;

#[async_trait]
pub trait Provider: Send + Sync {
    /// Schema of the provider block itself
    fn provider_schema(&self) -> Schema;

    async fn configure(&mut self, request: ConfigureRequest) -> ConfigureResponse;

    /// Fails with "Provider not configured" before `configure` succeeded
    async fn create_resource(&self, name: &str) -> Result<Box<dyn Resource>>;

    async fn create_data_source(&self, name: &str) -> Result<Box<dyn DataSource>>;

    async fn resource_schemas(&self) -> HashMap<String, ResourceSchema>;

    async fn data_source_schemas(&self) -> HashMap<String, DataSourceSchema>;
}

#[async_trait]
pub trait Resource: Send + Sync {
    /// Must match the key used in `Provider::resource_schemas`
    fn type_name(&self) -> &str;

    async fn schema(&self, request: SchemaRequest) -> ResourceSchemaResponse;

    /// Resource-specific checks beyond what the schema validates
    async fn validate(&self, _request: ValidateRequest) -> ValidateResponse {
        ValidateResponse {
            diagnostics: Diagnostics::new(),
        }
    }

    async fn create(&self, request: CreateRequest) -> CreateResponse;

    async fn read(&self, request: ReadRequest) -> ReadResponse;

    async fn update(&self, request: UpdateRequest) -> UpdateResponse;

    async fn delete(&self, request: DeleteRequest) -> DeleteResponse;
}

#[async_trait]
pub trait DataSource: Send + Sync {
    fn type_name(&self) -> &str;

    async fn schema(&self, request: SchemaRequest) -> DataSourceSchemaResponse;

    async fn validate(&self, _request: ValidateRequest) -> ValidateResponse {
        ValidateResponse {
            diagnostics: Diagnostics::new(),
        }
    }

    async fn read(&self, request: ReadDataSourceRequest) -> ReadDataSourceResponse;
}
