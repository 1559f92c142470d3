//! Cloud server API (`/v2/instance`)

use crate::api::client::{Client, Service};
use crate::api::common::{ApiQueryParams, Billing, MarkerPage, PaginationParams, TagModel};
use crate::api::error::ApiError;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

pub struct BccApi<'a> {
    client: &'a Client,
}

impl<'a> BccApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// POST /v2/instance, returns the ids of the created instances
    pub async fn create_instance(
        &self,
        request: &CreateInstanceRequest,
    ) -> Result<Vec<String>, ApiError> {
        let params = ApiQueryParams::new().client_token();
        let response: CreateInstanceResponse = self
            .client
            .post(Service::Bcc, "/v2/instance", &params, request)
            .await?;
        Ok(response.instance_ids)
    }

    /// GET /v2/instance, one page
    pub async fn list_instances(
        &self,
        args: &ListInstanceArgs,
    ) -> Result<ListInstanceResponse, ApiError> {
        let params = args
            .page
            .apply(ApiQueryParams::new())
            .add_optional("internalIp", args.internal_ip.as_deref())
            .add_optional("zoneName", args.zone_name.as_deref())
            .add_optional("vpcId", args.vpc_id.as_deref());
        self.client.get(Service::Bcc, "/v2/instance", &params).await
    }

    /// GET /v2/instance/{instanceId}
    pub async fn get_instance(&self, instance_id: &str) -> Result<Instance, ApiError> {
        let path = format!("/v2/instance/{}", instance_id);
        let response: GetInstanceResponse = self
            .client
            .get(Service::Bcc, &path, &ApiQueryParams::new())
            .await?;
        Ok(response.instance)
    }

    /// PUT /v2/instance/{instanceId}?start
    pub async fn start_instance(&self, instance_id: &str) -> Result<(), ApiError> {
        self.action(instance_id, "start", None::<&()>).await
    }

    /// PUT /v2/instance/{instanceId}?stop
    pub async fn stop_instance(&self, instance_id: &str, force_stop: bool) -> Result<(), ApiError> {
        let body = StopInstanceRequest { force_stop };
        self.action(instance_id, "stop", Some(&body)).await
    }

    /// PUT /v2/instance/{instanceId}?modifyAttribute
    pub async fn rename_instance(&self, instance_id: &str, name: &str) -> Result<(), ApiError> {
        let body = RenameInstanceRequest {
            name: name.to_string(),
        };
        self.action(instance_id, "modifyAttribute", Some(&body))
            .await
    }

    /// DELETE /v2/instance/{instanceId}
    pub async fn delete_instance(&self, instance_id: &str) -> Result<(), ApiError> {
        let path = format!("/v2/instance/{}", instance_id);
        let params = ApiQueryParams::new().client_token();
        let _: Option<IgnoredAny> = self
            .client
            .delete(Service::Bcc, &path, &params, None::<&()>)
            .await?;
        Ok(())
    }

    async fn action<B: Serialize>(
        &self,
        instance_id: &str,
        action: &str,
        body: Option<&B>,
    ) -> Result<(), ApiError> {
        let path = format!("/v2/instance/{}", instance_id);
        let params = ApiQueryParams::new().flag(action).client_token();
        let _: Option<IgnoredAny> = self
            .client
            .put(Service::Bcc, &path, &params, body)
            .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub instance_type: String,
    #[serde(default)]
    pub spec: String,
    #[serde(default)]
    pub cpu_count: u32,
    #[serde(default, rename = "memoryCapacityInGB")]
    pub memory_capacity_in_gb: u32,
    #[serde(default)]
    pub image_id: String,
    #[serde(default)]
    pub internal_ip: String,
    #[serde(default)]
    pub public_ip: String,
    #[serde(default)]
    pub zone_name: String,
    #[serde(default)]
    pub vpc_id: String,
    #[serde(default)]
    pub subnet_id: String,
    #[serde(default)]
    pub payment_timing: String,
    #[serde(default)]
    pub create_time: String,
    #[serde(default)]
    pub tags: Vec<TagModel>,
}

#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstanceRequest {
    pub image_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_count: Option<u32>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        rename = "memoryCapacityInGB"
    )]
    pub memory_capacity_in_gb: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_disk_size_in_gb: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_disk_storage_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_pass: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_group_id: Option<String>,
    pub billing: Billing,
    pub purchase_count: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateInstanceResponse {
    #[serde(default)]
    instance_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StopInstanceRequest {
    force_stop: bool,
}

#[derive(Debug, Serialize)]
struct RenameInstanceRequest {
    name: String,
}

#[derive(Debug, Clone, Default)]
pub struct ListInstanceArgs {
    pub page: PaginationParams,
    pub internal_ip: Option<String>,
    pub zone_name: Option<String>,
    pub vpc_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListInstanceResponse {
    #[serde(flatten)]
    pub page: MarkerPage,
    #[serde(default)]
    pub instances: Vec<Instance>,
}

#[derive(Debug, Deserialize)]
struct GetInstanceResponse {
    instance: Instance,
}
