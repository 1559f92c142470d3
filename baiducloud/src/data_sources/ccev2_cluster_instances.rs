//! `baiducloud_ccev2_cluster_instances`

use super::{common_attributes, finish_read, flatten_error, rows_attribute, validate_config};
use crate::errors::{wrap_error, ErrorSource, ProviderError};
use crate::BaiduCloudProviderData;
use async_trait::async_trait;
use tfplug::request::{
    DataSourceSchemaResponse, ReadDataSourceRequest, ReadDataSourceResponse, SchemaRequest,
    ValidateRequest, ValidateResponse,
};
use tfplug::schema::DataSourceSchema;
use tfplug::validator::StringInSliceValidator;
use tfplug::{AttributeBuilder, AttributeType, Config, DataSource, Diagnostics, SchemaBuilder, State};

const TYPE_NAME: &str = "baiducloud_ccev2_cluster_instances";

pub const KEYWORD_TYPES: &[&str] = &["instanceName", "instanceID"];

pub struct CceV2ClusterInstancesDataSource {
    data: BaiduCloudProviderData,
}

impl CceV2ClusterInstancesDataSource {
    pub fn new(data: BaiduCloudProviderData) -> Self {
        Self { data }
    }

    pub fn schema_static() -> DataSourceSchema {
        SchemaBuilder::new()
            .version(0)
            .description("Lists the instances of a CCE v2 cluster")
            .attributes(common_attributes())
            .attribute(AttributeBuilder::string("cluster_id").required().build())
            .attribute(
                AttributeBuilder::string("keyword_type")
                    .optional()
                    .validator(StringInSliceValidator::new(KEYWORD_TYPES))
                    .build(),
            )
            .attribute(AttributeBuilder::string("keyword").optional().build())
            .attribute(rows_attribute(
                "instances",
                "Cluster instances",
                &[
                    ("cce_instance_id", AttributeType::String),
                    ("instance_name", AttributeType::String),
                    ("cluster_role", AttributeType::String),
                    ("machine_type", AttributeType::String),
                    ("instance_type", AttributeType::String),
                    ("instance_phase", AttributeType::String),
                    ("machine_status", AttributeType::String),
                    ("instance_id", AttributeType::String),
                    ("vpc_ip", AttributeType::String),
                    ("eip", AttributeType::String),
                    ("vpc_id", AttributeType::String),
                    ("vpc_subnet_id", AttributeType::String),
                    ("available_zone", AttributeType::String),
                    ("cpu", AttributeType::Number),
                    ("mem", AttributeType::Number),
                    ("created_at", AttributeType::String),
                ],
            ))
            .build()
    }

    async fn read_cluster_instances(&self, config: &Config) -> Result<State, ProviderError> {
        let Some(cluster_id) = config.get_non_empty_string("cluster_id") else {
            return Err(wrap_error(
                "cluster_id must be set",
                TYPE_NAME,
                "read",
                ErrorSource::Provider,
            ));
        };
        let keyword_type = config.get_non_empty_string("keyword_type");
        let keyword = config.get_non_empty_string("keyword");

        let service = self.data.ccev2_service();
        let instances = service
            .list_all_instances(&cluster_id, keyword_type.as_deref(), keyword.as_deref())
            .await
            .map_err(|e| wrap_error(e, TYPE_NAME, "read", ErrorSource::BceSdk))?;
        let rows = service
            .flatten_instances(&instances)
            .map_err(|e| flatten_error(e, TYPE_NAME))?;
        finish_read(TYPE_NAME, config, "instances", "cce_instance_id", rows).await
    }
}

#[async_trait]
impl DataSource for CceV2ClusterInstancesDataSource {
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
        match self.read_cluster_instances(&request.config).await {
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
