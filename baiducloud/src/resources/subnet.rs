//! `baiducloud_subnet`

use super::{retry_api, tags_attribute, tags_from_config, tags_to_dynamic};
use crate::api::vpc::{CreateSubnetRequest, Subnet, UpdateSubnetRequest};
use crate::errors::{is_not_found, wrap_error, wrap_retry_failure, ErrorSource};
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
use tfplug::validator::{StringInSliceValidator, StringLengthValidator};
use tfplug::{AttributeBuilder, Diagnostics, Resource, SchemaBuilder, State, Timeouts};

const TYPE_NAME: &str = "baiducloud_subnet";

pub const SUBNET_TYPES: &[&str] = &["BCC", "BCC_NAT", "BBC"];

pub struct SubnetResource {
    data: BaiduCloudProviderData,
}

impl SubnetResource {
    pub fn new(data: BaiduCloudProviderData) -> Self {
        Self { data }
    }

    pub fn schema_static() -> ResourceSchema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a subnet inside a VPC")
            .attribute(AttributeBuilder::string("id").computed().build())
            .attribute(
                AttributeBuilder::string("name")
                    .required()
                    .validator(StringLengthValidator {
                        min: Some(1),
                        max: Some(65),
                    })
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("zone_name")
                    .required()
                    .force_new()
                    .description("Availability zone, e.g. cn-bj-a")
                    .build(),
            )
            .attribute(AttributeBuilder::string("cidr").required().force_new().build())
            .attribute(AttributeBuilder::string("vpc_id").required().force_new().build())
            .attribute(
                AttributeBuilder::string("subnet_type")
                    .optional()
                    .computed()
                    .force_new()
                    .validator(StringInSliceValidator::new(SUBNET_TYPES))
                    .build(),
            )
            .attribute(AttributeBuilder::string("description").optional().build())
            .attribute(tags_attribute(true))
            .attribute(
                AttributeBuilder::number("available_ip")
                    .computed()
                    .description("Number of unallocated addresses")
                    .build(),
            )
            .attribute(timeouts_attribute())
            .build()
    }

    fn timeouts() -> Timeouts {
        Timeouts::new(Duration::from_secs(10 * 60))
    }
}

fn set_subnet_state(state: &mut State, subnet: &Subnet) {
    state.set_id(subnet.subnet_id.clone());
    state.set("name", subnet.name.clone());
    state.set("zone_name", subnet.zone_name.clone());
    state.set("cidr", subnet.cidr.clone());
    state.set("vpc_id", subnet.vpc_id.clone());
    state.set("subnet_type", subnet.subnet_type.clone());
    state.set("description", subnet.description.clone());
    state.set("available_ip", subnet.available_ip);
    state.set("tags", tags_to_dynamic(&subnet.tags));
}

#[async_trait]
impl Resource for SubnetResource {
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
        let config = &request.config;
        let timeouts = Self::timeouts().resolve(config);
        let ctx = request.context.with_timeout(timeouts.create);
        let mut state = request.planned_state.clone();

        let body = CreateSubnetRequest {
            name: config.get_string("name").unwrap_or_default(),
            zone_name: config.get_string("zone_name").unwrap_or_default(),
            cidr: config.get_string("cidr").unwrap_or_default(),
            vpc_id: config.get_string("vpc_id").unwrap_or_default(),
            subnet_type: config.get_non_empty_string("subnet_type"),
            description: config.get_non_empty_string("description"),
            tags: tags_from_config(config),
        };
        self.data.debug.add_debug("create subnet", &body);

        let (client, body) = (&self.data.client, &body);
        let subnet_id = match retry_api(&ctx, timeouts.create, || async move {
            client.vpc().create_subnet(body).await
        })
        .await
        {
            Ok(id) => id,
            Err(e) => {
                return CreateResponse {
                    state: State::new(),
                    diagnostics: wrap_retry_failure(e, TYPE_NAME, "create").to_diagnostics(),
                }
            }
        };
        tracing::info!("created subnet {} in {}", subnet_id, body.vpc_id);
        state.set_id(subnet_id.clone());

        let diagnostics = match self.data.vpc_service().get_subnet(&subnet_id).await {
            Ok(subnet) => {
                set_subnet_state(&mut state, &subnet);
                Diagnostics::new()
            }
            Err(e) => wrap_error(e, TYPE_NAME, "create", ErrorSource::BceSdk).to_diagnostics(),
        };

        CreateResponse { state, diagnostics }
    }

    async fn read(&self, request: ReadRequest) -> ReadResponse {
        let Some(subnet_id) = request.current_state.id() else {
            return ReadResponse {
                state: None,
                diagnostics: Diagnostics::new(),
            };
        };

        match self.data.vpc_service().get_subnet(&subnet_id).await {
            Ok(subnet) => {
                let mut state = request.current_state.clone();
                set_subnet_state(&mut state, &subnet);
                ReadResponse {
                    state: Some(state),
                    diagnostics: Diagnostics::new(),
                }
            }
            Err(e) if is_not_found(&e) => {
                tracing::warn!("subnet {} not found, removing from state", subnet_id);
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
        let subnet_id = current.id().unwrap_or_default();

        if config.has_change(current, "name") || config.has_change(current, "description") {
            let timeouts = Self::timeouts().resolve(config);
            let ctx = request.context.with_timeout(timeouts.update);
            let body = UpdateSubnetRequest {
                name: config.get_string("name").unwrap_or_default(),
                description: Some(config.get_string("description").unwrap_or_default()),
            };
            self.data.debug.add_debug("update subnet", &body);

            let (client, id, body) = (&self.data.client, subnet_id.as_str(), &body);
            let result = retry_api(&ctx, timeouts.update, || async move {
                client.vpc().update_subnet(id, body).await
            })
            .await;
            if let Err(e) = result {
                return UpdateResponse {
                    state,
                    diagnostics: wrap_retry_failure(e, TYPE_NAME, "update").to_diagnostics(),
                };
            }
        }

        let diagnostics = match self.data.vpc_service().get_subnet(&subnet_id).await {
            Ok(subnet) => {
                set_subnet_state(&mut state, &subnet);
                Diagnostics::new()
            }
            Err(e) => wrap_error(e, TYPE_NAME, "update", ErrorSource::BceSdk).to_diagnostics(),
        };
        if let Some(timeouts) = config.get("timeouts") {
            state.set("timeouts", timeouts.clone());
        }

        UpdateResponse { state, diagnostics }
    }

    async fn delete(&self, request: DeleteRequest) -> DeleteResponse {
        let Some(subnet_id) = request.current_state.id() else {
            return DeleteResponse {
                diagnostics: Diagnostics::new(),
            };
        };
        let timeouts = Self::timeouts().resolve(&request.current_state);
        let ctx = request.context.with_timeout(timeouts.delete);
        let (client, id) = (&self.data.client, subnet_id.as_str());

        let result = retry_api(&ctx, timeouts.delete, || async move {
            match client.vpc().delete_subnet(id).await {
                Err(e) if is_not_found(&e) => Ok(()),
                other => other,
            }
        })
        .await;

        match result {
            Ok(()) => DeleteResponse {
                diagnostics: Diagnostics::new(),
            },
            Err(e) => DeleteResponse {
                diagnostics: wrap_retry_failure(e, TYPE_NAME, "delete").to_diagnostics(),
            },
        }
    }
}
