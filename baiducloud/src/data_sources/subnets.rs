//! `baiducloud_subnets`

use super::{
    common_attributes, finish_read, flatten_error, rows_attribute, string_map, validate_config,
};
use crate::api::vpc::ListSubnetArgs;
use crate::errors::{is_not_found, wrap_error, ErrorSource, ProviderError};
use crate::BaiduCloudProviderData;
use async_trait::async_trait;
use tfplug::request::{
    DataSourceSchemaResponse, ReadDataSourceRequest, ReadDataSourceResponse, SchemaRequest,
    ValidateRequest, ValidateResponse,
};
use tfplug::schema::DataSourceSchema;
use tfplug::{AttributeBuilder, AttributeType, Config, DataSource, Diagnostics, SchemaBuilder, State};

const TYPE_NAME: &str = "baiducloud_subnets";

pub struct SubnetsDataSource {
    data: BaiduCloudProviderData,
}

impl SubnetsDataSource {
    pub fn new(data: BaiduCloudProviderData) -> Self {
        Self { data }
    }

    pub fn schema_static() -> DataSourceSchema {
        SchemaBuilder::new()
            .version(0)
            .description("Lists the subnets of a VPC, or looks up one subnet")
            .attributes(common_attributes())
            .attribute(AttributeBuilder::string("vpc_id").optional().build())
            .attribute(AttributeBuilder::string("subnet_id").optional().build())
            .attribute(AttributeBuilder::string("zone_name").optional().build())
            .attribute(AttributeBuilder::string("subnet_type").optional().build())
            .attribute(rows_attribute(
                "subnets",
                "Matching subnets",
                &[
                    ("subnet_id", AttributeType::String),
                    ("name", AttributeType::String),
                    ("zone_name", AttributeType::String),
                    ("cidr", AttributeType::String),
                    ("vpc_id", AttributeType::String),
                    ("subnet_type", AttributeType::String),
                    ("description", AttributeType::String),
                    ("available_ip", AttributeType::Number),
                    ("tags", string_map()),
                ],
            ))
            .build()
    }

    async fn read_subnets(&self, config: &Config) -> Result<State, ProviderError> {
        let vpc_id = config.get_non_empty_string("vpc_id");
        let subnet_id = config.get_non_empty_string("subnet_id");
        let service = self.data.vpc_service();

        let subnets = match (subnet_id, vpc_id) {
            (None, None) => {
                return Err(wrap_error(
                    "VPC ID and Subnet ID cannot be empty at the same time",
                    TYPE_NAME,
                    "read",
                    ErrorSource::Provider,
                ))
            }
            (Some(subnet_id), _) => match service.get_subnet(&subnet_id).await {
                Ok(subnet) => vec![subnet],
                Err(e) if is_not_found(&e) => Vec::new(),
                Err(e) => return Err(wrap_error(e, TYPE_NAME, "read", ErrorSource::BceSdk)),
            },
            (None, vpc_id) => {
                let args = ListSubnetArgs {
                    vpc_id,
                    zone_name: config.get_non_empty_string("zone_name"),
                    subnet_type: config.get_non_empty_string("subnet_type"),
                    ..Default::default()
                };
                service
                    .list_all_subnets(&args)
                    .await
                    .map_err(|e| wrap_error(e, TYPE_NAME, "read", ErrorSource::BceSdk))?
            }
        };

        let rows = service
            .flatten_subnets(&subnets)
            .map_err(|e| flatten_error(e, TYPE_NAME))?;
        finish_read(TYPE_NAME, config, "subnets", "subnet_id", rows).await
    }
}

#[async_trait]
impl DataSource for SubnetsDataSource {
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
        match self.read_subnets(&request.config).await {
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
