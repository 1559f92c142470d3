//! `baiducloud_vpc`

use super::{retry_api, tags_attribute, tags_from_config, tags_to_dynamic};
use crate::api::vpc::{CreateVpcRequest, UpdateVpcRequest, Vpc};
use crate::errors::{is_not_found, wrap_error, wrap_retry_failure, ErrorSource, ProviderError};
use crate::BaiduCloudProviderData;
use async_trait::async_trait;
use std::time::Duration;
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ReadRequest, ReadResponse,
    ResourceSchemaResponse, SchemaRequest, UpdateRequest, UpdateResponse, ValidateRequest,
    ValidateResponse,
};
use tfplug::schema::ResourceSchema;
use tfplug::timeouts::timeouts_attribute;
use tfplug::validator::StringLengthValidator;
use tfplug::{AttributeBuilder, Diagnostics, Dynamic, Resource, SchemaBuilder, State, Timeouts};

const TYPE_NAME: &str = "baiducloud_vpc";

pub struct VpcResource {
    data: BaiduCloudProviderData,
}

impl VpcResource {
    pub fn new(data: BaiduCloudProviderData) -> Self {
        Self { data }
    }

    pub fn schema_static() -> ResourceSchema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a VPC")
            .attribute(
                AttributeBuilder::string("id")
                    .computed()
                    .description("VPC ID")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("name")
                    .required()
                    .validator(StringLengthValidator {
                        min: Some(1),
                        max: Some(65),
                    })
                    .description("VPC name")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("cidr")
                    .required()
                    .force_new()
                    .description("IPv4 CIDR block of the VPC")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("description")
                    .optional()
                    .validator(StringLengthValidator {
                        min: None,
                        max: Some(200),
                    })
                    .build(),
            )
            .attribute(
                AttributeBuilder::bool("enable_ipv6")
                    .optional()
                    .force_new()
                    .default(false)
                    .build(),
            )
            .attribute(tags_attribute(true))
            .attribute(AttributeBuilder::string("ipv6_cidr").computed().build())
            .attribute(AttributeBuilder::bool("is_default").computed().build())
            .attribute(
                AttributeBuilder::string_list("secondary_cidrs")
                    .computed()
                    .build(),
            )
            .attribute(AttributeBuilder::string("created_time").computed().build())
            .attribute(timeouts_attribute())
            .build()
    }

    fn timeouts() -> Timeouts {
        Timeouts::new(Duration::from_secs(10 * 60))
    }

    async fn create_vpc(&self, request: &CreateRequest) -> Result<State, (State, ProviderError)> {
        let config = &request.config;
        let timeouts = Self::timeouts().resolve(config);
        let ctx = request.context.with_timeout(timeouts.create);

        let body = CreateVpcRequest {
            name: config.get_string("name").unwrap_or_default(),
            cidr: config.get_string("cidr").unwrap_or_default(),
            description: config.get_non_empty_string("description"),
            enable_ipv6: config.get_bool("enable_ipv6").unwrap_or(false),
            tags: tags_from_config(config),
        };
        self.data.debug.add_debug("create vpc", &body);

        let (client, body) = (&self.data.client, &body);
        let vpc_id = retry_api(&ctx, timeouts.create, || async move {
            client.vpc().create_vpc(body).await
        })
            .await
            .map_err(|e| (State::new(), wrap_retry_failure(e, TYPE_NAME, "create")))?;
        tracing::info!("created vpc {}", vpc_id);

        let mut state = request.planned_state.clone();
        state.set_id(vpc_id.clone());

        match self.data.vpc_service().get_vpc(&vpc_id).await {
            Ok(vpc) => {
                set_vpc_state(&mut state, &vpc);
                Ok(state)
            }
            Err(e) => {
                let err = wrap_error(e, TYPE_NAME, "create", ErrorSource::BceSdk);
                Err((state, err))
            }
        }
    }
}

fn set_vpc_state(state: &mut State, vpc: &Vpc) {
    state.set_id(vpc.vpc_id.clone());
    state.set("name", vpc.name.clone());
    state.set("cidr", vpc.cidr.clone());
    state.set("description", vpc.description.clone());
    state.set("ipv6_cidr", vpc.ipv6_cidr.clone());
    state.set("is_default", vpc.is_default);
    state.set(
        "secondary_cidrs",
        vpc.secondary_cidr
            .iter()
            .map(|c| Dynamic::String(c.clone()))
            .collect::<Vec<_>>(),
    );
    state.set("created_time", vpc.created_time.clone());
    state.set("tags", tags_to_dynamic(&vpc.tags));
}

#[async_trait]
impl Resource for VpcResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    async fn schema(&self, _request: SchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn validate(&self, request: ValidateRequest) -> ValidateResponse {
        ValidateResponse {
            diagnostics: Self::schema_static().validate(&request.config),
        }
    }

    async fn create(&self, request: CreateRequest) -> CreateResponse {
        match self.create_vpc(&request).await {
            Ok(state) => CreateResponse {
                state,
                diagnostics: Diagnostics::new(),
            },
            Err((state, err)) => CreateResponse {
                state,
                diagnostics: err.to_diagnostics(),
            },
        }
    }

    async fn read(&self, request: ReadRequest) -> ReadResponse {
        let Some(vpc_id) = request.current_state.id() else {
            return ReadResponse {
                state: None,
                diagnostics: Diagnostics::new(),
            };
        };

        match self.data.vpc_service().get_vpc(&vpc_id).await {
            Ok(vpc) => {
                let mut state = request.current_state.clone();
                set_vpc_state(&mut state, &vpc);
                ReadResponse {
                    state: Some(state),
                    diagnostics: Diagnostics::new(),
                }
            }
            Err(e) if is_not_found(&e) => {
                tracing::warn!("vpc {} no longer exists, removing from state", vpc_id);
                ReadResponse {
                    state: None,
                    diagnostics: Diagnostics::new(),
                }
            }
            Err(e) => ReadResponse {
                state: Some(request.current_state),
                diagnostics: wrap_error(e, TYPE_NAME, "read", ErrorSource::BceSdk).to_diagnostics(),
            },
        }
    }

    async fn update(&self, request: UpdateRequest) -> UpdateResponse {
        let config = &request.config;
        let current = &request.current_state;
        let mut state = current.clone();
        let Some(vpc_id) = current.id() else {
            return UpdateResponse {
                state,
                diagnostics: wrap_error("missing id in state", TYPE_NAME, "update", ErrorSource::Provider)
                    .to_diagnostics(),
            };
        };

        if config.has_change(current, "name") || config.has_change(current, "description") {
            let timeouts = Self::timeouts().resolve(config);
            let ctx = request.context.with_timeout(timeouts.update);
            let body = UpdateVpcRequest {
                name: config.get_string("name").unwrap_or_default(),
                description: Some(config.get_string("description").unwrap_or_default()),
            };
            self.data.debug.add_debug("update vpc", &body);

            let (client, id, body) = (&self.data.client, vpc_id.as_str(), &body);
            if let Err(e) = retry_api(&ctx, timeouts.update, || async move {
                client.vpc().update_vpc(id, body).await
            })
            .await
            {
                return UpdateResponse {
                    state,
                    diagnostics: wrap_retry_failure(e, TYPE_NAME, "update").to_diagnostics(),
                };
            }
        }

        let mut diagnostics = Diagnostics::new();
        match self.data.vpc_service().get_vpc(&vpc_id).await {
            Ok(vpc) => set_vpc_state(&mut state, &vpc),
            Err(e) => {
                diagnostics = wrap_error(e, TYPE_NAME, "update", ErrorSource::BceSdk).to_diagnostics()
            }
        }
        for key in ["timeouts", "enable_ipv6"] {
            if let Some(value) = config.get(key) {
                state.set(key, value.clone());
            }
        }

        UpdateResponse { state, diagnostics }
    }

    async fn delete(&self, request: DeleteRequest) -> DeleteResponse {
        let Some(vpc_id) = request.current_state.id() else {
            return DeleteResponse {
                diagnostics: Diagnostics::new(),
            };
        };
        let timeouts = Self::timeouts().resolve(&request.current_state);
        let ctx = request.context.with_timeout(timeouts.delete);
        let (client, id) = (&self.data.client, vpc_id.as_str());

        let result = retry_api(&ctx, timeouts.delete, || async move {
            match client.vpc().delete_vpc(id).await {
                Err(e) if is_not_found(&e) => Ok(()),
                other => other,
            }
        })
        .await;

        DeleteResponse {
            diagnostics: match result {
                Ok(()) => Diagnostics::new(),
                Err(e) => wrap_retry_failure(e, TYPE_NAME, "delete").to_diagnostics(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use crate::logging::DebugLog;
    use mockito::{Matcher, Server};
    use tfplug::{Config, Context};

    fn resource(url: &str) -> VpcResource {
        VpcResource::new(BaiduCloudProviderData::new(
            create_test_client(url),
            "bj",
            DebugLog::disabled(),
        ))
    }

    fn vpc_body(name: &str) -> String {
        format!(
            r#"{{"vpc":{{"vpcId":"vpc-1","name":"{}","cidr":"10.0.0.0/16","description":"d"}}}}"#,
            name
        )
    }

    #[tokio::test]
    async fn create_records_id_and_computed_fields() {
        let mut server = Server::new_async().await;
        let _create = server
            .mock("POST", "/v1/vpc")
            .match_query(Matcher::Any)
            .with_body(r#"{"vpcId":"vpc-1"}"#)
            .create_async()
            .await;
        let _get = server
            .mock("GET", "/v1/vpc/vpc-1")
            .with_body(vpc_body("main"))
            .create_async()
            .await;

        let mut config = Config::new();
        config.set("name", "main");
        config.set("cidr", "10.0.0.0/16");

        let response = resource(&server.url())
            .create(CreateRequest {
                context: Context::new(),
                config: config.clone(),
                planned_state: config,
            })
            .await;

        assert!(!response.diagnostics.has_errors());
        assert_eq!(response.state.id(), Some("vpc-1".to_string()));
        assert_eq!(response.state.get_string("description"), Some("d".to_string()));
        assert_eq!(response.state.get_bool("is_default"), Some(false));
    }

    #[tokio::test]
    async fn create_failure_uses_envelope() {
        let mut server = Server::new_async().await;
        let _create = server
            .mock("POST", "/v1/vpc")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"requestId":"r","code":"InvalidParameter","message":"bad cidr"}"#)
            .create_async()
            .await;

        let mut config = Config::new();
        config.set("name", "main");
        config.set("cidr", "bogus");

        let response = resource(&server.url())
            .create(CreateRequest {
                context: Context::new(),
                config: config.clone(),
                planned_state: config,
            })
            .await;

        assert!(response.state.id().is_none());
        let summary = &response.diagnostics.errors[0].summary;
        assert!(summary.starts_with("Resource baiducloud_vpc create Failed!!!"));
        assert!(summary.contains("bad cidr"));
    }

    #[tokio::test]
    async fn read_not_found_clears_state() {
        let mut server = Server::new_async().await;
        let _get = server
            .mock("GET", "/v1/vpc/vpc-1")
            .with_status(404)
            .with_body(r#"{"requestId":"r","code":"NoSuchObject","message":"gone"}"#)
            .create_async()
            .await;

        let mut state = State::new();
        state.set_id("vpc-1");

        let response = resource(&server.url())
            .read(ReadRequest {
                context: Context::new(),
                current_state: state,
            })
            .await;

        assert!(response.state.is_none());
        assert!(!response.diagnostics.has_errors());
    }

    #[tokio::test]
    async fn delete_not_found_succeeds() {
        let mut server = Server::new_async().await;
        let _delete = server
            .mock("DELETE", "/v1/vpc/vpc-1")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"requestId":"r","code":"NoSuchObject","message":"gone"}"#)
            .create_async()
            .await;

        let mut state = State::new();
        state.set_id("vpc-1");

        let response = resource(&server.url())
            .delete(DeleteRequest {
                context: Context::new(),
                current_state: state,
            })
            .await;

        assert!(!response.diagnostics.has_errors());
    }

    #[tokio::test]
    async fn update_renames_only_when_changed() {
        let mut server = Server::new_async().await;
        let update = server
            .mock("PUT", "/v1/vpc/vpc-1")
            .match_query(Matcher::Regex("modifyAttribute".to_string()))
            .match_body(Matcher::PartialJson(serde_json::json!({"name": "renamed"})))
            .create_async()
            .await;
        let _get = server
            .mock("GET", "/v1/vpc/vpc-1")
            .with_body(vpc_body("renamed"))
            .create_async()
            .await;

        let mut current = State::new();
        current.set_id("vpc-1");
        current.set("name", "main");
        current.set("cidr", "10.0.0.0/16");
        let mut config = current.clone();
        config.set("name", "renamed");

        let response = resource(&server.url())
            .update(UpdateRequest {
                context: Context::new(),
                config: config.clone(),
                planned_state: config,
                current_state: current,
            })
            .await;

        assert!(!response.diagnostics.has_errors());
        assert_eq!(response.state.get_string("name"), Some("renamed".to_string()));
        update.assert_async().await;
    }

    #[test]
    fn schema_requires_name_and_cidr() {
        let diags = VpcResource::schema_static().validate(&Config::new());
        assert_eq!(diags.errors.len(), 2);
    }
}
