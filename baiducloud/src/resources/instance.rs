//! `baiducloud_instance`

use super::{
    billing_from_config, get_u32, retry_api, tags_attribute, tags_from_config, tags_to_dynamic,
    PAYMENT_TIMING_POSTPAID, PAYMENT_TIMING_PREPAID,
};
use crate::api::bcc::{CreateInstanceRequest, Instance};
use crate::errors::{
    is_not_found, wrap_error, wrap_retry_failure, wrap_wait_error, ErrorSource, ProviderError,
};
use crate::services::bcc::{
    INSTANCE_STATUS_DELETING, INSTANCE_STATUS_RUNNING, INSTANCE_STATUS_STARTING,
    INSTANCE_STATUS_STOPPED, INSTANCE_STATUS_STOPPING,
};
use crate::services::DELETED_STATE;
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
use tfplug::validator::{NumberRangeValidator, StringInSliceValidator};
use tfplug::{
    AttributeBuilder, Config, Context, Diagnostics, Resource, SchemaBuilder, State, Timeouts,
};

const TYPE_NAME: &str = "baiducloud_instance";

pub const ACTION_START: &str = "start";
pub const ACTION_STOP: &str = "stop";

pub struct InstanceResource {
    data: BaiduCloudProviderData,
}

impl InstanceResource {
    pub fn new(data: BaiduCloudProviderData) -> Self {
        Self { data }
    }

    pub fn schema_static() -> ResourceSchema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a BCC cloud server")
            .attribute(AttributeBuilder::string("id").computed().build())
            .attribute(
                AttributeBuilder::string("image_id")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("instance_spec")
                    .optional()
                    .computed()
                    .force_new()
                    .description("Flavor such as bcc.g1.tiny; alternative to cpu_count and memory_capacity_in_gb")
                    .build(),
            )
            .attribute(
                AttributeBuilder::number("cpu_count")
                    .optional()
                    .computed()
                    .force_new()
                    .validator(NumberRangeValidator {
                        min: Some(1.0),
                        max: None,
                    })
                    .build(),
            )
            .attribute(
                AttributeBuilder::number("memory_capacity_in_gb")
                    .optional()
                    .computed()
                    .force_new()
                    .validator(NumberRangeValidator {
                        min: Some(1.0),
                        max: None,
                    })
                    .build(),
            )
            .attribute(
                AttributeBuilder::number("root_disk_size_in_gb")
                    .optional()
                    .force_new()
                    .validator(NumberRangeValidator {
                        min: Some(0.0),
                        max: None,
                    })
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("root_disk_storage_type")
                    .optional()
                    .force_new()
                    .build(),
            )
            .attribute(AttributeBuilder::string("name").optional().computed().build())
            .attribute(
                AttributeBuilder::string("admin_pass")
                    .optional()
                    .sensitive()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("zone_name")
                    .optional()
                    .computed()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("subnet_id")
                    .optional()
                    .computed()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("security_group_id")
                    .optional()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("payment_timing")
                    .optional()
                    .force_new()
                    .default(PAYMENT_TIMING_POSTPAID)
                    .validator(StringInSliceValidator::new(&[
                        PAYMENT_TIMING_PREPAID,
                        PAYMENT_TIMING_POSTPAID,
                    ]))
                    .build(),
            )
            .attribute(
                AttributeBuilder::number("reservation_length")
                    .optional()
                    .force_new()
                    .validator(NumberRangeValidator {
                        min: Some(1.0),
                        max: None,
                    })
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("action")
                    .optional()
                    .default(ACTION_START)
                    .description("Desired power state")
                    .validator(StringInSliceValidator::new(&[ACTION_START, ACTION_STOP]))
                    .build(),
            )
            .attribute(tags_attribute(true))
            .attribute(AttributeBuilder::string("status").computed().build())
            .attribute(AttributeBuilder::string("internal_ip").computed().build())
            .attribute(AttributeBuilder::string("public_ip").computed().build())
            .attribute(AttributeBuilder::string("vpc_id").computed().build())
            .attribute(AttributeBuilder::string("create_time").computed().build())
            .attribute(timeouts_attribute())
            .build()
    }

    fn timeouts() -> Timeouts {
        Timeouts::new(Duration::from_secs(20 * 60))
    }

    async fn wait_status(
        &self,
        ctx: &Context,
        instance_id: &str,
        pending: &[&str],
        target: &[&str],
        timeout: Duration,
        action: &str,
    ) -> Result<Option<Instance>, ProviderError> {
        self.data
            .bcc_service()
            .state_conf(instance_id, pending, target, timeout)
            .wait_for_state(ctx)
            .await
            .map_err(|e| wrap_wait_error(e, TYPE_NAME, action))
    }

    /// Starts or stops the instance and waits for the matching status
    async fn apply_power_action(
        &self,
        ctx: &Context,
        instance_id: &str,
        power: &str,
        timeout: Duration,
        action: &str,
    ) -> Result<Option<Instance>, ProviderError> {
        let client = &self.data.client;
        let result = if power == ACTION_STOP {
            retry_api(ctx, timeout, || async move {
                client.bcc().stop_instance(instance_id, false).await
            })
            .await
        } else {
            retry_api(ctx, timeout, || async move {
                client.bcc().start_instance(instance_id).await
            })
            .await
        };
        result.map_err(|e| wrap_retry_failure(e, TYPE_NAME, action))?;

        let (pending, target) = if power == ACTION_STOP {
            (
                [INSTANCE_STATUS_RUNNING, INSTANCE_STATUS_STOPPING],
                INSTANCE_STATUS_STOPPED,
            )
        } else {
            (
                [INSTANCE_STATUS_STOPPED, INSTANCE_STATUS_STARTING],
                INSTANCE_STATUS_RUNNING,
            )
        };
        self.wait_status(ctx, instance_id, &pending, &[target], timeout, action)
            .await
    }
}

fn create_request_from_config(config: &Config) -> CreateInstanceRequest {
    CreateInstanceRequest {
        image_id: config.get_string("image_id").unwrap_or_default(),
        spec: config.get_non_empty_string("instance_spec"),
        cpu_count: get_u32(config, "cpu_count"),
        memory_capacity_in_gb: get_u32(config, "memory_capacity_in_gb"),
        root_disk_size_in_gb: get_u32(config, "root_disk_size_in_gb"),
        root_disk_storage_type: config.get_non_empty_string("root_disk_storage_type"),
        name: config.get_non_empty_string("name"),
        admin_pass: config.get_non_empty_string("admin_pass"),
        zone_name: config.get_non_empty_string("zone_name"),
        subnet_id: config.get_non_empty_string("subnet_id"),
        security_group_id: config.get_non_empty_string("security_group_id"),
        billing: billing_from_config(config),
        purchase_count: 1,
        tags: tags_from_config(config),
    }
}

fn power_action_for(status: &str) -> Option<&'static str> {
    match status {
        INSTANCE_STATUS_RUNNING => Some(ACTION_START),
        INSTANCE_STATUS_STOPPED => Some(ACTION_STOP),
        _ => None,
    }
}

fn set_instance_state(state: &mut State, instance: &Instance) {
    state.set_id(instance.id.clone());
    state.set("name", instance.name.clone());
    state.set("status", instance.status.clone());
    state.set("image_id", instance.image_id.clone());
    state.set("instance_spec", instance.spec.clone());
    state.set("cpu_count", instance.cpu_count);
    state.set("memory_capacity_in_gb", instance.memory_capacity_in_gb);
    state.set("internal_ip", instance.internal_ip.clone());
    state.set("public_ip", instance.public_ip.clone());
    state.set("zone_name", instance.zone_name.clone());
    state.set("vpc_id", instance.vpc_id.clone());
    state.set("subnet_id", instance.subnet_id.clone());
    state.set("create_time", instance.create_time.clone());
    state.set("tags", tags_to_dynamic(&instance.tags));
    if let Some(action) = power_action_for(&instance.status) {
        state.set("action", action);
    }
}

#[async_trait]
impl Resource for InstanceResource {
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
        let config = &request.config;
        let mut diagnostics = Self::schema_static().validate(config);

        let has_spec = config.get("instance_spec").is_some();
        let has_shape =
            config.get("cpu_count").is_some() && config.get("memory_capacity_in_gb").is_some();
        if !has_spec && !has_shape {
            diagnostics.add_error(
                "Either instance_spec or both cpu_count and memory_capacity_in_gb must be set",
                None::<String>,
            );
        }
        if config.get_string("payment_timing").as_deref() == Some(PAYMENT_TIMING_PREPAID)
            && config.get("reservation_length").is_none()
        {
            diagnostics.add_attribute_error(
                "reservation_length",
                "reservation_length is required when payment_timing is Prepaid",
                None::<String>,
            );
        }

        ValidateResponse { diagnostics }
    }

    async fn create(&self, request: CreateRequest) -> CreateResponse {
        let config = &request.config;
        let timeouts = Self::timeouts().resolve(config);
        let ctx = request.context.with_timeout(timeouts.create);

        let body = create_request_from_config(config);
        let mut logged = body.clone();
        if logged.admin_pass.is_some() {
            logged.admin_pass = Some("******".to_string());
        }
        self.data.debug.add_debug("create instance", &logged);

        let (client, body) = (&self.data.client, &body);
        let created = retry_api(&ctx, timeouts.create, || async move {
            client.bcc().create_instance(body).await
        })
        .await;
        let instance_id = match created.map(|ids| ids.into_iter().next()) {
            Ok(Some(id)) => id,
            Ok(None) => {
                return CreateResponse {
                    state: State::new(),
                    diagnostics: wrap_error(
                        "create returned no instance id",
                        TYPE_NAME,
                        "create",
                        ErrorSource::Provider,
                    )
                    .to_diagnostics(),
                }
            }
            Err(e) => {
                return CreateResponse {
                    state: State::new(),
                    diagnostics: wrap_retry_failure(e, TYPE_NAME, "create").to_diagnostics(),
                }
            }
        };
        tracing::info!("created instance {}", instance_id);

        let mut state = request.planned_state.clone();
        state.set_id(instance_id.clone());

        let mut result = self
            .wait_status(
                &ctx,
                &instance_id,
                &[INSTANCE_STATUS_STARTING],
                &[INSTANCE_STATUS_RUNNING],
                timeouts.create,
                "create",
            )
            .await;
        if result.is_ok() && config.get_string("action").as_deref() == Some(ACTION_STOP) {
            result = self
                .apply_power_action(&ctx, &instance_id, ACTION_STOP, timeouts.create, "create")
                .await;
        }

        let diagnostics = match result {
            Ok(Some(instance)) => {
                set_instance_state(&mut state, &instance);
                Diagnostics::new()
            }
            Ok(None) => Diagnostics::new(),
            Err(e) => e.to_diagnostics(),
        };
        CreateResponse { state, diagnostics }
    }

    async fn read(&self, request: ReadRequest) -> ReadResponse {
        let Some(instance_id) = request.current_state.id() else {
            return ReadResponse {
                state: None,
                diagnostics: Diagnostics::new(),
            };
        };

        match self.data.bcc_service().get_instance(&instance_id).await {
            Ok(instance) => {
                let mut state = request.current_state.clone();
                set_instance_state(&mut state, &instance);
                ReadResponse {
                    state: Some(state),
                    diagnostics: Diagnostics::new(),
                }
            }
            Err(e) if is_not_found(&e) => ReadResponse {
                state: None,
                diagnostics: Diagnostics::new(),
            },
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
        let instance_id = current.id().unwrap_or_default();
        let timeouts = Self::timeouts().resolve(config);
        let ctx = request.context.with_timeout(timeouts.update);

        if config.has_change(current, "name") {
            let name = config.get_string("name").unwrap_or_default();
            let (client, id, name) = (&self.data.client, instance_id.as_str(), name.as_str());
            let renamed = retry_api(&ctx, timeouts.update, || async move {
                client.bcc().rename_instance(id, name).await
            })
            .await;
            if let Err(e) = renamed {
                return UpdateResponse {
                    state,
                    diagnostics: wrap_retry_failure(e, TYPE_NAME, "update").to_diagnostics(),
                };
            }
        }

        if config.has_change(current, "action") {
            let power = config
                .get_string("action")
                .unwrap_or_else(|| ACTION_START.to_string());
            if let Err(e) = self
                .apply_power_action(&ctx, &instance_id, &power, timeouts.update, "update")
                .await
            {
                return UpdateResponse {
                    state,
                    diagnostics: e.to_diagnostics(),
                };
            }
        }

        let diagnostics = match self.data.bcc_service().get_instance(&instance_id).await {
            Ok(instance) => {
                set_instance_state(&mut state, &instance);
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
        let Some(instance_id) = request.current_state.id() else {
            return DeleteResponse {
                diagnostics: Diagnostics::new(),
            };
        };
        let timeouts = Self::timeouts().resolve(&request.current_state);
        let ctx = request.context.with_timeout(timeouts.delete);

        let (client, id) = (&self.data.client, instance_id.as_str());
        let deleted = retry_api(&ctx, timeouts.delete, || async move {
            match client.bcc().delete_instance(id).await {
                Err(e) if is_not_found(&e) => Ok(()),
                other => other,
            }
        })
        .await;
        if let Err(e) = deleted {
            return DeleteResponse {
                diagnostics: wrap_retry_failure(e, TYPE_NAME, "delete").to_diagnostics(),
            };
        }

        let waited = self
            .wait_status(
                &ctx,
                &instance_id,
                &[
                    INSTANCE_STATUS_RUNNING,
                    INSTANCE_STATUS_STOPPING,
                    INSTANCE_STATUS_STOPPED,
                    INSTANCE_STATUS_DELETING,
                ],
                &[DELETED_STATE],
                timeouts.delete,
                "delete",
            )
            .await;
        DeleteResponse {
            diagnostics: waited.map_or_else(|e| e.to_diagnostics(), |_| Diagnostics::new()),
        }
    }
}
