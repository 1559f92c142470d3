//! `baiducloud_vpcs`

use super::{
    common_attributes, finish_read, flatten_error, rows_attribute, string_list, string_map,
    validate_config,
};
use crate::errors::{wrap_error, ErrorSource, ProviderError};
use crate::BaiduCloudProviderData;
use async_trait::async_trait;
use tfplug::request::{
    DataSourceSchemaResponse, ReadDataSourceRequest, ReadDataSourceResponse, SchemaRequest,
    ValidateRequest, ValidateResponse,
};
use tfplug::schema::DataSourceSchema;
use tfplug::{AttributeBuilder, AttributeType, Config, DataSource, Diagnostics, SchemaBuilder, State};

const TYPE_NAME: &str = "baiducloud_vpcs";

pub struct VpcsDataSource {
    data: BaiduCloudProviderData,
}

impl VpcsDataSource {
    pub fn new(data: BaiduCloudProviderData) -> Self {
        Self { data }
    }

    pub fn schema_static() -> DataSourceSchema {
        SchemaBuilder::new()
            .version(0)
            .description("Lists VPCs")
            .attributes(common_attributes())
            .attribute(
                AttributeBuilder::bool("is_default")
                    .optional()
                    .description("Only the default VPC (true) or only custom VPCs (false)")
                    .build(),
            )
            .attribute(rows_attribute(
                "vpcs",
                "Matching VPCs",
                &[
                    ("vpc_id", AttributeType::String),
                    ("name", AttributeType::String),
                    ("cidr", AttributeType::String),
                    ("ipv6_cidr", AttributeType::String),
                    ("description", AttributeType::String),
                    ("is_default", AttributeType::Bool),
                    ("secondary_cidrs", string_list()),
                    ("created_time", AttributeType::String),
                    ("tags", string_map()),
                ],
            ))
            .build()
    }

    async fn read_vpcs(&self, config: &Config) -> Result<State, ProviderError> {
        let service = self.data.vpc_service();
        let vpcs = service
            .list_all_vpcs(config.get_bool("is_default"))
            .await
            .map_err(|e| wrap_error(e, TYPE_NAME, "read", ErrorSource::BceSdk))?;
        let rows = service
            .flatten_vpcs(&vpcs)
            .map_err(|e| flatten_error(e, TYPE_NAME))?;
        finish_read(TYPE_NAME, config, "vpcs", "vpc_id", rows).await
    }
}

#[async_trait]
impl DataSource for VpcsDataSource {
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
        match self.read_vpcs(&request.config).await {
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

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use crate::logging::DebugLog;
    use mockito::{Matcher, Server};
    use std::collections::HashMap;
    use tfplug::{Context, Dynamic};

    fn data_source(url: &str) -> VpcsDataSource {
        VpcsDataSource::new(BaiduCloudProviderData::new(
            create_test_client(url),
            "bj",
            DebugLog::disabled(),
        ))
    }

    #[tokio::test]
    async fn lists_and_filters_vpcs() {
        let mut server = Server::new_async().await;
        let _list = server
            .mock("GET", "/v1/vpc")
            .match_query(Matcher::Any)
            .with_body(
                r#"{"vpcs":[
                    {"vpcId":"vpc-1","name":"prod","cidr":"10.0.0.0/16","isDefault":false},
                    {"vpcId":"vpc-2","name":"staging","cidr":"10.1.0.0/16","isDefault":false},
                    {"vpcId":"vpc-3","name":"default","cidr":"192.168.0.0/16","isDefault":true}
                ],"isTruncated":false}"#,
            )
            .create_async()
            .await;

        let filter = Dynamic::List(vec![Dynamic::Map(HashMap::from([
            ("name".to_string(), Dynamic::from("cidr")),
            (
                "values".to_string(),
                Dynamic::List(vec![Dynamic::from("^10\\.")]),
            ),
        ]))]);
        let mut config = Config::new();
        config.set("filter", filter);

        let response = data_source(&server.url())
            .read(ReadDataSourceRequest {
                context: Context::new(),
                config,
            })
            .await;

        assert!(!response.diagnostics.has_errors(), "{:?}", response.diagnostics);
        let vpcs = response.state.get_list("vpcs").unwrap();
        assert_eq!(vpcs.len(), 2);
        assert_eq!(
            vpcs[0].as_map().unwrap()["vpc_id"].as_string().map(String::as_str),
            Some("vpc-1")
        );
        assert!(response.state.id().is_some());
    }

    #[tokio::test]
    async fn api_failure_is_wrapped() {
        let mut server = Server::new_async().await;
        let _list = server
            .mock("GET", "/v1/vpc")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body(r#"{"requestId":"r","code":"AccessDenied","message":"denied"}"#)
            .create_async()
            .await;

        let response = data_source(&server.url())
            .read(ReadDataSourceRequest {
                context: Context::new(),
                config: Config::new(),
            })
            .await;

        let summary = &response.diagnostics.errors[0].summary;
        assert!(summary.starts_with("Resource baiducloud_vpcs read Failed!!! [bce-sdk]"));
        assert!(summary.contains("denied"));
    }
}
