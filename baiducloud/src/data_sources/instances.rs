//! `baiducloud_instances`

use super::{
    common_attributes, finish_read, flatten_error, rows_attribute, string_map, validate_config,
};
use crate::api::bcc::ListInstanceArgs;
use crate::errors::{wrap_error, ErrorSource, ProviderError};
use crate::BaiduCloudProviderData;
use async_trait::async_trait;
use tfplug::request::{
    DataSourceSchemaResponse, ReadDataSourceRequest, ReadDataSourceResponse, SchemaRequest,
    ValidateRequest, ValidateResponse,
};
use tfplug::schema::DataSourceSchema;
use tfplug::{AttributeBuilder, AttributeType, Config, DataSource, Diagnostics, SchemaBuilder, State};

const TYPE_NAME: &str = "baiducloud_instances";

pub struct InstancesDataSource {
    data: BaiduCloudProviderData,
}

impl InstancesDataSource {
    pub fn new(data: BaiduCloudProviderData) -> Self {
        Self { data }
    }

    pub fn schema_static() -> DataSourceSchema {
        SchemaBuilder::new()
            .version(0)
            .description("Lists BCC instances")
            .attributes(common_attributes())
            .attribute(AttributeBuilder::string("internal_ip").optional().build())
            .attribute(AttributeBuilder::string("zone_name").optional().build())
            .attribute(AttributeBuilder::string("vpc_id").optional().build())
            .attribute(rows_attribute(
                "instances",
                "Matching instances",
                &[
                    ("instance_id", AttributeType::String),
                    ("name", AttributeType::String),
                    ("status", AttributeType::String),
                    ("description", AttributeType::String),
                    ("instance_type", AttributeType::String),
                    ("instance_spec", AttributeType::String),
                    ("cpu_count", AttributeType::Number),
                    ("memory_capacity_in_gb", AttributeType::Number),
                    ("image_id", AttributeType::String),
                    ("internal_ip", AttributeType::String),
                    ("public_ip", AttributeType::String),
                    ("zone_name", AttributeType::String),
                    ("vpc_id", AttributeType::String),
                    ("subnet_id", AttributeType::String),
                    ("payment_timing", AttributeType::String),
                    ("create_time", AttributeType::String),
                    ("tags", string_map()),
                ],
            ))
            .build()
    }

    async fn read_instances(&self, config: &Config) -> Result<State, ProviderError> {
        let args = ListInstanceArgs {
            internal_ip: config.get_non_empty_string("internal_ip"),
            zone_name: config.get_non_empty_string("zone_name"),
            vpc_id: config.get_non_empty_string("vpc_id"),
            ..Default::default()
        };
        let service = self.data.bcc_service();
        let instances = service
            .list_all_instances(&args)
            .await
            .map_err(|e| wrap_error(e, TYPE_NAME, "read", ErrorSource::BceSdk))?;
        let rows = service
            .flatten_instances(&instances)
            .map_err(|e| flatten_error(e, TYPE_NAME))?;
        finish_read(TYPE_NAME, config, "instances", "instance_id", rows).await
    }
}

#[async_trait]
impl DataSource for InstancesDataSource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    async fn schema(&self, _request: SchemaRequest) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn validate(&self, request: ValidateRequest) -> ValidateResponse {
        ValidateResponse {
            diagnostics: validate_config(&Self::schema_static(), &request.config),
        }
    }

    async fn read(&self, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        match self.read_instances(&request.config).await {
            Ok(state) => ReadDataSourceResponse {
                state,
                diagnostics: Diagnostics::new(),
            },
            Err(e) => ReadDataSourceResponse {
                state: request.config,
                diagnostics: e.to_diagnostics(),
            },
        }
    }
}
