//! `baiducloud_eips`

use super::{
    common_attributes, finish_read, flatten_error, rows_attribute, string_map, validate_config,
};
use crate::api::eip::ListEipArgs;
use crate::errors::{wrap_error, ErrorSource, ProviderError};
use crate::BaiduCloudProviderData;
use async_trait::async_trait;
use tfplug::request::{
    DataSourceSchemaResponse, ReadDataSourceRequest, ReadDataSourceResponse, SchemaRequest,
    ValidateRequest, ValidateResponse,
};
use tfplug::schema::DataSourceSchema;
use tfplug::{AttributeBuilder, AttributeType, Config, DataSource, Diagnostics, SchemaBuilder, State};

const TYPE_NAME: &str = "baiducloud_eips";

pub struct EipsDataSource {
    data: BaiduCloudProviderData,
}

impl EipsDataSource {
    pub fn new(data: BaiduCloudProviderData) -> Self {
        Self { data }
    }

    pub fn schema_static() -> DataSourceSchema {
        SchemaBuilder::new()
            .version(0)
            .description("Lists elastic IPs")
            .attributes(common_attributes())
            .attribute(AttributeBuilder::string("eip").optional().build())
            .attribute(
                AttributeBuilder::string("instance_type")
                    .optional()
                    .description("Bound instance type, required together with instance_id")
                    .build(),
            )
            .attribute(AttributeBuilder::string("instance_id").optional().build())
            .attribute(AttributeBuilder::string("status").optional().build())
            .attribute(rows_attribute(
                "eips",
                "Matching EIPs",
                &[
                    ("eip", AttributeType::String),
                    ("eip_id", AttributeType::String),
                    ("name", AttributeType::String),
                    ("status", AttributeType::String),
                    ("eip_instance_type", AttributeType::String),
                    ("instance_type", AttributeType::String),
                    ("instance_id", AttributeType::String),
                    ("share_group_id", AttributeType::String),
                    ("bandwidth_in_mbps", AttributeType::Number),
                    ("payment_timing", AttributeType::String),
                    ("billing_method", AttributeType::String),
                    ("create_time", AttributeType::String),
                    ("expire_time", AttributeType::String),
                    ("tags", string_map()),
                ],
            ))
            .build()
    }

    async fn read_eips(&self, config: &Config) -> Result<State, ProviderError> {
        let args = ListEipArgs {
            eip: config.get_non_empty_string("eip"),
            instance_type: config.get_non_empty_string("instance_type"),
            instance_id: config.get_non_empty_string("instance_id"),
            status: config.get_non_empty_string("status"),
            ..Default::default()
        };
        let service = self.data.eip_service();
        let eips = service
            .list_all_eips(&args)
            .await
            .map_err(|e| wrap_error(e, TYPE_NAME, "read", ErrorSource::BceSdk))?;
        let rows = service
            .flatten_eips(&eips)
            .map_err(|e| flatten_error(e, TYPE_NAME))?;
        finish_read(TYPE_NAME, config, "eips", "eip", rows).await
    }
}

#[async_trait]
impl DataSource for EipsDataSource {
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
        let mut diagnostics = validate_config(&Self::schema_static(), &request.config);
        let config = &request.config;
        if config.get_non_empty_string("instance_id").is_some()
            && config.get_non_empty_string("instance_type").is_none()
        {
            diagnostics.add_attribute_error(
                "instance_type",
                "Missing instance_type",
                Some("instance_type must be set when filtering by instance_id"),
            );
        }
        ValidateResponse { diagnostics }
    }

    async fn read(&self, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        match self.read_eips(&request.config).await {
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
