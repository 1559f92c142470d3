//! `baiducloud_eip`
//!
//! The EIP address doubles as the resource id. Creation, resizing and release
//! are asynchronous; each waits on the EIP status before returning.

use super::{
    billing_from_config, get_u32, retry_api, tags_attribute, tags_from_config, tags_to_dynamic,
    PAYMENT_TIMING_POSTPAID, PAYMENT_TIMING_PREPAID,
};
use crate::api::eip::{CreateEipRequest, Eip};
use crate::errors::{
    is_not_found, wrap_error, wrap_retry_failure, wrap_wait_error, ErrorSource, ProviderError,
};
use crate::services::eip::{
    EIP_STATUS_AVAILABLE, EIP_STATUS_BINDED, EIP_STATUS_BINDING, EIP_STATUS_CREATING,
    EIP_STATUS_PAUSED, EIP_STATUS_UNAVAILABLE, EIP_STATUS_UNBINDING, EIP_STATUS_UPDATING,
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
use tfplug::{AttributeBuilder, Context, Diagnostics, Resource, SchemaBuilder, State, Timeouts};

const TYPE_NAME: &str = "baiducloud_eip";

const BILLING_METHODS: &[&str] = &["ByTraffic", "ByBandwidth"];

/// Every status an existing EIP can report
const LIVE_STATUSES: &[&str] = &[
    EIP_STATUS_CREATING,
    EIP_STATUS_AVAILABLE,
    EIP_STATUS_BINDED,
    EIP_STATUS_BINDING,
    EIP_STATUS_UNBINDING,
    EIP_STATUS_UPDATING,
    EIP_STATUS_PAUSED,
    EIP_STATUS_UNAVAILABLE,
];

pub struct EipResource {
    data: BaiduCloudProviderData,
}

impl EipResource {
    pub fn new(data: BaiduCloudProviderData) -> Self {
        Self { data }
    }

    pub fn schema_static() -> ResourceSchema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages an elastic IP address")
            .attribute(
                AttributeBuilder::string("id")
                    .computed()
                    .description("Same as `eip`")
                    .build(),
            )
            .attribute(AttributeBuilder::string("name").optional().computed().force_new().build())
            .attribute(
                AttributeBuilder::number("bandwidth_in_mbps")
                    .required()
                    .validator(NumberRangeValidator {
                        min: Some(1.0),
                        max: Some(5000.0),
                    })
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("payment_timing")
                    .required()
                    .force_new()
                    .validator(StringInSliceValidator::new(&[
                        PAYMENT_TIMING_PREPAID,
                        PAYMENT_TIMING_POSTPAID,
                    ]))
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("billing_method")
                    .required()
                    .force_new()
                    .validator(StringInSliceValidator::new(BILLING_METHODS))
                    .build(),
            )
            .attribute(
                AttributeBuilder::number("reservation_length")
                    .optional()
                    .force_new()
                    .description("Months to reserve, required when prepaid")
                    .validator(NumberRangeValidator {
                        min: Some(1.0),
                        max: Some(36.0),
                    })
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("reservation_time_unit")
                    .optional()
                    .force_new()
                    .default("Month")
                    .build(),
            )
            .attribute(tags_attribute(true))
            .attribute(AttributeBuilder::string("eip").computed().build())
            .attribute(AttributeBuilder::string("eip_id").computed().build())
            .attribute(AttributeBuilder::string("status").computed().build())
            .attribute(AttributeBuilder::string("instance_id").computed().build())
            .attribute(AttributeBuilder::string("instance_type").computed().build())
            .attribute(AttributeBuilder::string("create_time").computed().build())
            .attribute(AttributeBuilder::string("expire_time").computed().build())
            .attribute(timeouts_attribute())
            .build()
    }

    fn timeouts() -> Timeouts {
        Timeouts::new(Duration::from_secs(20 * 60))
    }

    async fn wait_status(
        &self,
        ctx: &Context,
        eip: &str,
        pending: &[&str],
        target: &[&str],
        timeout: Duration,
        action: &str,
    ) -> Result<Option<Eip>, ProviderError> {
        self.data
            .eip_service()
            .state_conf(eip, pending, target, timeout)
            .wait_for_state(ctx)
            .await
            .map_err(|e| wrap_wait_error(e, TYPE_NAME, action))
    }
}

fn set_eip_state(state: &mut State, eip: &Eip) {
    state.set_id(eip.eip.clone());
    state.set("eip", eip.eip.clone());
    state.set("eip_id", eip.eip_id.clone());
    state.set("name", eip.name.clone());
    state.set("status", eip.status.clone());
    state.set("bandwidth_in_mbps", eip.bandwidth_in_mbps);
    state.set("payment_timing", eip.payment_timing.clone());
    state.set("billing_method", eip.billing_method.clone());
    state.set("instance_id", eip.instance_id.clone());
    state.set("instance_type", eip.instance_type.clone());
    state.set("create_time", eip.create_time.clone());
    state.set("expire_time", eip.expire_time.clone());
    state.set("tags", tags_to_dynamic(&eip.tags));
}

#[async_trait]
impl Resource for EipResource {
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

        let body = CreateEipRequest {
            name: config.get_non_empty_string("name"),
            bandwidth_in_mbps: get_u32(config, "bandwidth_in_mbps").unwrap_or(1),
            billing: billing_from_config(config),
            tags: tags_from_config(config),
        };
        self.data.debug.add_debug("create eip", &body);

        let (client, body) = (&self.data.client, &body);
        let address = match retry_api(&ctx, timeouts.create, || async move {
            client.eip().create(body).await
        })
        .await
        {
            Ok(address) => address,
            Err(e) => {
                return CreateResponse {
                    state: State::new(),
                    diagnostics: wrap_retry_failure(e, TYPE_NAME, "create").to_diagnostics(),
                }
            }
        };
        tracing::info!("allocated eip {}", address);

        let mut state = request.planned_state.clone();
        state.set_id(address.clone());
        state.set("eip", address.clone());

        let waited = self
            .wait_status(
                &ctx,
                &address,
                &[EIP_STATUS_CREATING],
                &[EIP_STATUS_AVAILABLE],
                timeouts.create,
                "create",
            )
            .await;
        let diagnostics = match waited {
            Ok(Some(eip)) => {
                set_eip_state(&mut state, &eip);
                Diagnostics::new()
            }
            Ok(None) => Diagnostics::new(),
            Err(e) => e.to_diagnostics(),
        };

        CreateResponse { state, diagnostics }
    }

    async fn read(&self, request: ReadRequest) -> ReadResponse {
        let Some(address) = request.current_state.id() else {
            return ReadResponse {
                state: None,
                diagnostics: Diagnostics::new(),
            };
        };

        match self.data.eip_service().get_eip(&address).await {
            Ok(Some(eip)) => {
                let mut state = request.current_state.clone();
                set_eip_state(&mut state, &eip);
                ReadResponse {
                    state: Some(state),
                    diagnostics: Diagnostics::new(),
                }
            }
            Ok(None) => {
                tracing::warn!("eip {} released outside terraform", address);
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
        let address = current.id().unwrap_or_default();
        let timeouts = Self::timeouts().resolve(config);
        let ctx = request.context.with_timeout(timeouts.update);

        if config.has_change(current, "bandwidth_in_mbps") {
            let bandwidth = get_u32(config, "bandwidth_in_mbps").unwrap_or(1);
            self.data.debug.add_debug("resize eip", &bandwidth);

            let (client, id) = (&self.data.client, address.as_str());
            let resized = retry_api(&ctx, timeouts.update, || async move {
                client.eip().resize(id, bandwidth).await
            })
            .await;
            if let Err(e) = resized {
                return UpdateResponse {
                    state,
                    diagnostics: wrap_retry_failure(e, TYPE_NAME, "update").to_diagnostics(),
                };
            }

            let waited = self
                .wait_status(
                    &ctx,
                    &address,
                    &[EIP_STATUS_UPDATING],
                    &[EIP_STATUS_AVAILABLE, EIP_STATUS_BINDED],
                    timeouts.update,
                    "update",
                )
                .await;
            if let Err(e) = waited {
                return UpdateResponse {
                    state,
                    diagnostics: e.to_diagnostics(),
                };
            }
        }

        let diagnostics = match self.data.eip_service().get_eip(&address).await {
            Ok(Some(eip)) => {
                set_eip_state(&mut state, &eip);
                Diagnostics::new()
            }
            Ok(None) => wrap_error(
                format!("eip {} disappeared during update", address),
                TYPE_NAME,
                "update",
                ErrorSource::Provider,
            )
            .to_diagnostics(),
            Err(e) => wrap_error(e, TYPE_NAME, "update", ErrorSource::BceSdk).to_diagnostics(),
        };
        if let Some(timeouts) = config.get("timeouts") {
            state.set("timeouts", timeouts.clone());
        }

        UpdateResponse { state, diagnostics }
    }

    async fn delete(&self, request: DeleteRequest) -> DeleteResponse {
        let Some(address) = request.current_state.id() else {
            return DeleteResponse {
                diagnostics: Diagnostics::new(),
            };
        };
        let timeouts = Self::timeouts().resolve(&request.current_state);
        let ctx = request.context.with_timeout(timeouts.delete);

        let (client, id) = (&self.data.client, address.as_str());
        let released = retry_api(&ctx, timeouts.delete, || async move {
            match client.eip().delete(id).await {
                Err(e) if is_not_found(&e) => Ok(()),
                other => other,
            }
        })
        .await;
        if let Err(e) = released {
            return DeleteResponse {
                diagnostics: wrap_retry_failure(e, TYPE_NAME, "delete").to_diagnostics(),
            };
        }

        let diagnostics = match self
            .wait_status(
                &ctx,
                &address,
                LIVE_STATUSES,
                &[DELETED_STATE],
                timeouts.delete,
                "delete",
            )
            .await
        {
            Ok(_) => Diagnostics::new(),
            Err(e) => e.to_diagnostics(),
        };
        DeleteResponse { diagnostics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use crate::logging::DebugLog;
    use crate::services::PollSettings;
    use mockito::{Matcher, Server};
    use tfplug::Config;

    fn resource(url: &str) -> EipResource {
        let poll = PollSettings {
            delay: Duration::from_millis(1),
            min_timeout: Duration::from_millis(5),
        };
        EipResource::new(
            BaiduCloudProviderData::new(create_test_client(url), "bj", DebugLog::disabled())
                .with_poll_settings(poll),
        )
    }

    fn eip_config() -> Config {
        let mut config = Config::new();
        config.set("name", "edge");
        config.set("bandwidth_in_mbps", 10i64);
        config.set("payment_timing", "Postpaid");
        config.set("billing_method", "ByTraffic");
        config
    }

    fn list_body(status: &str, bandwidth: u32) -> String {
        format!(
            r#"{{"eipList":[{{"eip":"1.2.3.4","eipId":"ip-1","name":"edge","status":"{}","bandwidthInMbps":{},"paymentTiming":"Postpaid","billingMethod":"ByTraffic"}}]}}"#,
            status, bandwidth
        )
    }

    #[tokio::test]
    async fn create_waits_until_available() {
        let mut server = Server::new_async().await;
        let _create = server
            .mock("POST", "/v1/eip")
            .match_query(Matcher::Any)
            .with_body(r#"{"eip":"1.2.3.4"}"#)
            .create_async()
            .await;
        let _list = server
            .mock("GET", "/v1/eip")
            .match_query(Matcher::UrlEncoded("eip".into(), "1.2.3.4".into()))
            .with_body(list_body("available", 10))
            .create_async()
            .await;

        let config = eip_config();
        let response = resource(&server.url())
            .create(CreateRequest {
                context: Context::new(),
                config: config.clone(),
                planned_state: config,
            })
            .await;

        assert!(!response.diagnostics.has_errors(), "{:?}", response.diagnostics);
        assert_eq!(response.state.id(), Some("1.2.3.4".to_string()));
        assert_eq!(response.state.get_string("status"), Some("available".to_string()));
        assert_eq!(response.state.get_string("eip_id"), Some("ip-1".to_string()));
    }

    #[tokio::test]
    async fn create_times_out_but_keeps_id() {
        let mut server = Server::new_async().await;
        let _create = server
            .mock("POST", "/v1/eip")
            .match_query(Matcher::Any)
            .with_body(r#"{"eip":"1.2.3.4"}"#)
            .create_async()
            .await;
        let _list = server
            .mock("GET", "/v1/eip")
            .match_query(Matcher::Any)
            .with_body(list_body("creating", 10))
            .create_async()
            .await;

        let mut config = eip_config();
        let mut timeouts = std::collections::HashMap::new();
        timeouts.insert("create".to_string(), tfplug::Dynamic::from("1s"));
        config.set("timeouts", timeouts);

        let response = resource(&server.url())
            .create(CreateRequest {
                context: Context::new(),
                config: config.clone(),
                planned_state: config,
            })
            .await;

        assert_eq!(response.state.id(), Some("1.2.3.4".to_string()));
        let summary = &response.diagnostics.errors[0].summary;
        assert!(summary.starts_with("Resource baiducloud_eip create Timeout!!!"), "{}", summary);
        assert!(summary.contains("creating"));
    }

    #[tokio::test]
    async fn resize_on_bandwidth_change() {
        let mut server = Server::new_async().await;
        let resize = server
            .mock("PUT", "/v1/eip/1.2.3.4")
            .match_query(Matcher::Regex("resize".into()))
            .match_body(Matcher::Json(serde_json::json!({"newBandwidthInMbps": 20})))
            .create_async()
            .await;
        let _list = server
            .mock("GET", "/v1/eip")
            .match_query(Matcher::Any)
            .with_body(list_body("available", 20))
            .create_async()
            .await;

        let mut current = eip_config();
        current.set_id("1.2.3.4");
        let mut config = current.clone();
        config.set("bandwidth_in_mbps", 20i64);

        let response = resource(&server.url())
            .update(UpdateRequest {
                context: Context::new(),
                config: config.clone(),
                planned_state: config,
                current_state: current,
            })
            .await;

        resize.assert_async().await;
        assert!(!response.diagnostics.has_errors(), "{:?}", response.diagnostics);
        assert_eq!(response.state.get_i64("bandwidth_in_mbps"), Some(20));
    }

    #[tokio::test]
    async fn delete_waits_until_gone() {
        let mut server = Server::new_async().await;
        let _delete = server
            .mock("DELETE", "/v1/eip/1.2.3.4")
            .match_query(Matcher::Any)
            .create_async()
            .await;
        let _list = server
            .mock("GET", "/v1/eip")
            .match_query(Matcher::Any)
            .with_body(r#"{"eipList":[]}"#)
            .create_async()
            .await;

        let mut state = eip_config();
        state.set_id("1.2.3.4");

        let response = resource(&server.url())
            .delete(DeleteRequest {
                context: Context::new(),
                current_state: state,
            })
            .await;

        assert!(!response.diagnostics.has_errors(), "{:?}", response.diagnostics);
    }

    #[tokio::test]
    async fn prepaid_requires_reservation() {
        let mut config = eip_config();
        config.set("payment_timing", "Prepaid");

        let response = resource("http://127.0.0.1:1")
            .validate(ValidateRequest {
                context: Context::new(),
                config,
            })
            .await;

        assert_eq!(response.diagnostics.errors.len(), 1);
        assert_eq!(
            response.diagnostics.errors[0].attribute.as_deref(),
            Some("reservation_length")
        );
    }

    #[test]
    fn postpaid_billing_has_no_reservation() {
        let mut config = eip_config();
        config.set("reservation_length", 3i64);
        let billing = billing_from_config(&config);
        assert!(billing.reservation.is_none());
        assert_eq!(billing.billing_method.as_deref(), Some("ByTraffic"));
    }
}
