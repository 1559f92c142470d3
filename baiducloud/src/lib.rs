pub mod api;
pub mod data_sources;
pub mod errors;
pub mod logging;
pub mod provider_data;
pub mod resources;
pub mod services;
pub mod utils;

pub use provider_data::BaiduCloudProviderData;

use api::{Client, Credentials, RetryConfig, ServiceEndpoints};
use async_trait::async_trait;
use logging::{init_logging, DebugLog};
use services::PollSettings;
use std::collections::HashMap;
use tfplug::request::{ConfigureRequest, ConfigureResponse};
use tfplug::schema::{DataSourceSchema, ResourceSchema};
use tfplug::validator::NumberRangeValidator;
use tfplug::{
    AttributeBuilder, Config, DataSource, Diagnostics, Provider, Resource, Schema, SchemaBuilder,
    TfplugError,
};

pub const DEFAULT_REGION: &str = "bj";

const ACCESS_KEY_ENV: &str = "BAIDUCLOUD_ACCESS_KEY";
const SECRET_KEY_ENV: &str = "BAIDUCLOUD_SECRET_KEY";
const REGION_ENV: &str = "BAIDUCLOUD_REGION";

pub struct BaiduCloudProvider {
    provider_data: Option<BaiduCloudProviderData>,
    poll: Option<PollSettings>,
}

impl Default for BaiduCloudProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl BaiduCloudProvider {
    pub fn new() -> Self {
        Self {
            provider_data: None,
            poll: None,
        }
    }

    /// Overrides the poll pacing of every wait
    pub fn with_poll_settings(mut self, poll: PollSettings) -> Self {
        self.poll = Some(poll);
        self
    }

    pub fn provider_data(&self) -> Option<&BaiduCloudProviderData> {
        self.provider_data.as_ref()
    }

    fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Baidu Cloud provider")
            .attribute(
                AttributeBuilder::string("access_key")
                    .optional()
                    .description("Access key, or BAIDUCLOUD_ACCESS_KEY")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("secret_key")
                    .optional()
                    .sensitive()
                    .description("Secret key, or BAIDUCLOUD_SECRET_KEY")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("region")
                    .optional()
                    .default(DEFAULT_REGION)
                    .description("Region, or BAIDUCLOUD_REGION")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string_map("endpoints")
                    .optional()
                    .description("Per-service endpoint overrides keyed by bcc, vpc, eip or cce")
                    .build(),
            )
            .attribute(
                AttributeBuilder::number("max_retries")
                    .optional()
                    .default(3i64)
                    .validator(NumberRangeValidator {
                        min: Some(0.0),
                        max: Some(10.0),
                    })
                    .build(),
            )
            .attribute(
                AttributeBuilder::bool("debug")
                    .optional()
                    .description("Log request and response bodies; DEBUG=terraform has the same effect")
                    .build(),
            )
            .build()
    }

    fn build_provider_data(
        &self,
        config: &Config,
        diags: &mut Diagnostics,
    ) -> Option<BaiduCloudProviderData> {
        let access_key = config
            .get_non_empty_string("access_key")
            .or_else(|| std::env::var(ACCESS_KEY_ENV).ok().filter(|v| !v.is_empty()));
        let secret_key = config
            .get_non_empty_string("secret_key")
            .or_else(|| std::env::var(SECRET_KEY_ENV).ok().filter(|v| !v.is_empty()));
        let region = config
            .get_non_empty_string("region")
            .or_else(|| std::env::var(REGION_ENV).ok().filter(|v| !v.is_empty()))
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let (access_key, secret_key) = match (access_key, secret_key) {
            (Some(ak), Some(sk)) => (ak, sk),
            (None, _) => {
                diags.add_attribute_error(
                    "access_key",
                    "access_key is required (set in provider config or BAIDUCLOUD_ACCESS_KEY env var)",
                    None::<String>,
                );
                return None;
            }
            (_, None) => {
                diags.add_attribute_error(
                    "secret_key",
                    "secret_key is required (set in provider config or BAIDUCLOUD_SECRET_KEY env var)",
                    None::<String>,
                );
                return None;
            }
        };

        let mut endpoints = match ServiceEndpoints::for_region(&region) {
            Ok(endpoints) => endpoints,
            Err(e) => {
                diags.add_attribute_error("region", format!("Invalid region: {}", e), None::<String>);
                return None;
            }
        };
        if let Some(overrides) = config.get_map("endpoints") {
            let mut keys: Vec<&String> = overrides.keys().collect();
            keys.sort();
            for key in keys {
                let Some(endpoint) = overrides[key].as_string() else {
                    continue;
                };
                endpoints = match endpoints.with_override(key, endpoint) {
                    Ok(endpoints) => endpoints,
                    Err(e) => {
                        diags.add_attribute_error(
                            "endpoints",
                            format!("Invalid endpoint for {}", key),
                            Some(e.to_string()),
                        );
                        return None;
                    }
                };
            }
        }

        let retry_config = RetryConfig {
            max_retries: config
                .get_i64("max_retries")
                .map(|n| n.clamp(0, 10) as u32)
                .unwrap_or(RetryConfig::default().max_retries),
            ..RetryConfig::default()
        };

        let client = match Client::with_config(
            Credentials {
                access_key,
                secret_key,
            },
            endpoints,
            retry_config,
        ) {
            Ok(client) => client,
            Err(e) => {
                diags.add_error(
                    format!("Failed to create API client: {}", e),
                    None::<String>,
                );
                return None;
            }
        };

        let debug_log = match config.get_bool("debug") {
            Some(true) => DebugLog::new(true),
            _ => DebugLog::from_env(),
        };
        init_logging(debug_log);
        let debug_enabled = debug_log.enabled();
        tracing::info!(region = %region, debug = debug_enabled, "configured baiducloud provider");

        let data = BaiduCloudProviderData::new(client, region, debug_log);
        Some(match self.poll {
            Some(poll) => data.with_poll_settings(poll),
            None => data,
        })
    }
}

#[async_trait]
impl Provider for BaiduCloudProvider {
    fn provider_schema(&self) -> Schema {
        Self::schema_static()
    }

    async fn configure(&mut self, request: ConfigureRequest) -> ConfigureResponse {
        let mut diags = Self::schema_static().validate(&request.config);
        if diags.has_errors() {
            return ConfigureResponse { diagnostics: diags };
        }

        if let Some(data) = self.build_provider_data(&request.config, &mut diags) {
            self.provider_data = Some(data);
        }

        ConfigureResponse { diagnostics: diags }
    }

    async fn create_resource(&self, name: &str) -> tfplug::Result<Box<dyn Resource>> {
        let data = self
            .provider_data
            .as_ref()
            .ok_or(TfplugError::ProviderNotConfigured)?
            .clone();

        match name {
            "baiducloud_vpc" => Ok(Box::new(resources::VpcResource::new(data))),
            "baiducloud_subnet" => Ok(Box::new(resources::SubnetResource::new(data))),
            "baiducloud_eip" => Ok(Box::new(resources::EipResource::new(data))),
            "baiducloud_instance" => Ok(Box::new(resources::InstanceResource::new(data))),
            "baiducloud_ccev2_cluster" => {
                Ok(Box::new(resources::CceV2ClusterResource::new(data)))
            }
            _ => Err(TfplugError::unknown_resource(name)),
        }
    }

    async fn create_data_source(&self, name: &str) -> tfplug::Result<Box<dyn DataSource>> {
        let data = self
            .provider_data
            .as_ref()
            .ok_or(TfplugError::ProviderNotConfigured)?
            .clone();

        match name {
            "baiducloud_vpcs" => Ok(Box::new(data_sources::VpcsDataSource::new(data))),
            "baiducloud_subnets" => Ok(Box::new(data_sources::SubnetsDataSource::new(data))),
            "baiducloud_eips" => Ok(Box::new(data_sources::EipsDataSource::new(data))),
            "baiducloud_instances" => Ok(Box::new(data_sources::InstancesDataSource::new(data))),
            "baiducloud_ccev2_cluster_instances" => Ok(Box::new(
                data_sources::CceV2ClusterInstancesDataSource::new(data),
            )),
            _ => Err(TfplugError::unknown_data_source(name)),
        }
    }

    async fn resource_schemas(&self) -> HashMap<String, ResourceSchema> {
        static SCHEMAS: std::sync::OnceLock<HashMap<String, ResourceSchema>> =
            std::sync::OnceLock::new();

        SCHEMAS
            .get_or_init(|| {
                HashMap::from([
                    (
                        "baiducloud_vpc".to_string(),
                        resources::VpcResource::schema_static(),
                    ),
                    (
                        "baiducloud_subnet".to_string(),
                        resources::SubnetResource::schema_static(),
                    ),
                    (
                        "baiducloud_eip".to_string(),
                        resources::EipResource::schema_static(),
                    ),
                    (
                        "baiducloud_instance".to_string(),
                        resources::InstanceResource::schema_static(),
                    ),
                    (
                        "baiducloud_ccev2_cluster".to_string(),
                        resources::CceV2ClusterResource::schema_static(),
                    ),
                ])
            })
            .clone()
    }

    async fn data_source_schemas(&self) -> HashMap<String, DataSourceSchema> {
        static SCHEMAS: std::sync::OnceLock<HashMap<String, DataSourceSchema>> =
            std::sync::OnceLock::new();

        SCHEMAS
            .get_or_init(|| {
                HashMap::from([
                    (
                        "baiducloud_vpcs".to_string(),
                        data_sources::VpcsDataSource::schema_static(),
                    ),
                    (
                        "baiducloud_subnets".to_string(),
                        data_sources::SubnetsDataSource::schema_static(),
                    ),
                    (
                        "baiducloud_eips".to_string(),
                        data_sources::EipsDataSource::schema_static(),
                    ),
                    (
                        "baiducloud_instances".to_string(),
                        data_sources::InstancesDataSource::schema_static(),
                    ),
                    (
                        "baiducloud_ccev2_cluster_instances".to_string(),
                        data_sources::CceV2ClusterInstancesDataSource::schema_static(),
                    ),
                ])
            })
            .clone()
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tfplug::{Context, Dynamic};

    fn clear_env() {
        std::env::remove_var(ACCESS_KEY_ENV);
        std::env::remove_var(SECRET_KEY_ENV);
        std::env::remove_var(REGION_ENV);
    }

    fn configure_request(config: Config) -> ConfigureRequest {
        ConfigureRequest {
            context: Context::new(),
            config,
        }
    }

    #[tokio::test]
    #[serial]
    async fn provider_configures_from_env_vars() {
        clear_env();
        std::env::set_var(ACCESS_KEY_ENV, "ak");
        std::env::set_var(SECRET_KEY_ENV, "sk");
        std::env::set_var(REGION_ENV, "gz");

        let mut provider = BaiduCloudProvider::new();
        let response = provider.configure(configure_request(Config::new())).await;

        assert!(response.diagnostics.errors.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(provider.provider_data().unwrap().region, "gz");

        clear_env();
    }

    #[tokio::test]
    #[serial]
    async fn provider_config_wins_over_env() {
        clear_env();
        std::env::set_var(REGION_ENV, "gz");

        let mut config = Config::new();
        config.set("access_key", "ak");
        config.set("secret_key", "sk");
        config.set("region", "su");

        let mut provider = BaiduCloudProvider::new();
        let response = provider.configure(configure_request(config)).await;

        assert!(response.diagnostics.errors.is_empty());
        assert_eq!(provider.provider_data().unwrap().region, "su");

        clear_env();
    }

    #[tokio::test]
    #[serial]
    async fn provider_debug_flag_enables_debug_log() {
        clear_env();
        let mut config = Config::new();
        config.set("access_key", "ak");
        config.set("secret_key", "sk");
        config.set("debug", true);

        let mut provider = BaiduCloudProvider::new();
        let response = provider.configure(configure_request(config)).await;

        assert!(response.diagnostics.errors.is_empty(), "{:?}", response.diagnostics);
        assert!(provider.provider_data().unwrap().debug.enabled());
    }

    #[tokio::test]
    #[serial]
    async fn provider_requires_access_key() {
        clear_env();
        std::env::set_var(SECRET_KEY_ENV, "sk");

        let mut provider = BaiduCloudProvider::new();
        let response = provider.configure(configure_request(Config::new())).await;

        assert!(response.diagnostics.errors[0]
            .summary
            .contains("access_key is required"));
        assert!(provider.provider_data().is_none());

        clear_env();
    }

    #[tokio::test]
    #[serial]
    async fn provider_rejects_unknown_endpoint_key() {
        clear_env();

        let mut config = Config::new();
        config.set("access_key", "ak");
        config.set("secret_key", "sk");
        config.set(
            "endpoints",
            Dynamic::Map(HashMap::from([(
                "bos".to_string(),
                Dynamic::from("bos.bj.baidubce.com"),
            )])),
        );

        let mut provider = BaiduCloudProvider::new();
        let response = provider.configure(configure_request(config)).await;

        assert_eq!(
            response.diagnostics.errors[0].attribute.as_deref(),
            Some("endpoints")
        );
    }

    #[tokio::test]
    #[serial]
    async fn provider_creates_resources_after_configuration() {
        clear_env();

        let mut config = Config::new();
        config.set("access_key", "ak");
        config.set("secret_key", "sk");

        let mut provider = BaiduCloudProvider::new();
        provider.configure(configure_request(config)).await;

        for name in provider.resource_schemas().await.keys() {
            let resource = provider.create_resource(name).await.unwrap();
            assert_eq!(resource.type_name(), name);
        }
        for name in provider.data_source_schemas().await.keys() {
            let data_source = provider.create_data_source(name).await.unwrap();
            assert_eq!(data_source.type_name(), name);
        }

        assert!(provider.create_resource("baiducloud_bos").await.is_err());
        assert!(provider.create_data_source("baiducloud_bos").await.is_err());
    }

    #[tokio::test]
    async fn provider_fails_to_create_resources_before_configuration() {
        let provider = BaiduCloudProvider::new();

        let resource = provider.create_resource("baiducloud_vpc").await;
        assert!(resource
            .err()
            .unwrap()
            .to_string()
            .contains("Provider not configured"));
    }

    #[tokio::test]
    async fn provider_schemas_contain_expected_types() {
        let provider = BaiduCloudProvider::new();

        let resources = provider.resource_schemas().await;
        assert_eq!(resources.len(), 5);
        assert!(resources.contains_key("baiducloud_ccev2_cluster"));

        let data_sources = provider.data_source_schemas().await;
        assert_eq!(data_sources.len(), 5);
        assert!(data_sources.contains_key("baiducloud_subnets"));
    }
}
