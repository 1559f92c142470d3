//! Container engine v2 API (`/api/cce/service/v2`)

use crate::api::client::{Client, Service};
use crate::api::common::ApiQueryParams;
use crate::api::error::ApiError;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

const BASE_PATH: &str = "/api/cce/service/v2";

/// Largest page the instance list accepts
pub const MAX_INSTANCE_PAGE_SIZE: u32 = 100;

pub struct CceV2Api<'a> {
    client: &'a Client,
}

impl<'a> CceV2Api<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// POST /cluster
    pub async fn create_cluster(
        &self,
        request: &CreateClusterRequest,
    ) -> Result<CreateClusterResponse, ApiError> {
        let path = format!("{}/cluster", BASE_PATH);
        self.client
            .post(Service::Cce, &path, &ApiQueryParams::new(), request)
            .await
    }

    /// GET /cluster/{clusterID}
    pub async fn get_cluster(&self, cluster_id: &str) -> Result<Cluster, ApiError> {
        let path = format!("{}/cluster/{}", BASE_PATH, cluster_id);
        let response: GetClusterResponse = self
            .client
            .get(Service::Cce, &path, &ApiQueryParams::new())
            .await?;
        Ok(response.cluster)
    }

    /// DELETE /cluster/{clusterID}, releasing the cluster's machines as well
    pub async fn delete_cluster(&self, cluster_id: &str) -> Result<(), ApiError> {
        let path = format!("{}/cluster/{}", BASE_PATH, cluster_id);
        let params = ApiQueryParams::new()
            .add("deleteResource", true)
            .add("deleteCDSSnapshot", true);
        let _: Option<IgnoredAny> = self
            .client
            .delete(Service::Cce, &path, &params, None::<&()>)
            .await?;
        Ok(())
    }

    /// GET /cluster/{clusterID}/instances, one page (pages start at 1)
    pub async fn list_instances(
        &self,
        cluster_id: &str,
        args: &ListInstancesArgs,
    ) -> Result<InstancePage, ApiError> {
        let path = format!("{}/cluster/{}/instances", BASE_PATH, cluster_id);
        let params = ApiQueryParams::new()
            .add("pageNo", args.page_no.max(1))
            .add("pageSize", args.page_size.clamp(1, MAX_INSTANCE_PAGE_SIZE))
            .add_optional("keywordType", args.keyword_type.as_deref())
            .add_optional("keyword", args.keyword.as_deref());
        let response: ListInstancesResponse = self.client.get(Service::Cce, &path, &params).await?;
        Ok(response.instance_page)
    }

    /// GET /cluster/{clusterID}/instance/{cceInstanceID}
    pub async fn get_instance(
        &self,
        cluster_id: &str,
        instance_id: &str,
    ) -> Result<ClusterInstance, ApiError> {
        let path = format!("{}/cluster/{}/instance/{}", BASE_PATH, cluster_id, instance_id);
        let response: GetInstanceResponse = self
            .client
            .get(Service::Cce, &path, &ApiQueryParams::new())
            .await?;
        Ok(response.instance)
    }

    /// POST /cluster/{clusterID}/instances, returns the new instance ids
    pub async fn create_instances(
        &self,
        cluster_id: &str,
        instance_sets: &[InstanceSet],
    ) -> Result<Vec<String>, ApiError> {
        let path = format!("{}/cluster/{}/instances", BASE_PATH, cluster_id);
        let response: CreateInstancesResponse = self
            .client
            .post(Service::Cce, &path, &ApiQueryParams::new(), &instance_sets)
            .await?;
        Ok(response.cce_instance_ids)
    }

    /// DELETE /cluster/{clusterID}/instances
    pub async fn delete_instances(
        &self,
        cluster_id: &str,
        instance_ids: &[String],
    ) -> Result<(), ApiError> {
        let path = format!("{}/cluster/{}/instances", BASE_PATH, cluster_id);
        let body = DeleteInstancesRequest {
            instances_to_be_removed: instance_ids.to_vec(),
            clean_policy: "Delete".to_string(),
            delete_option: DeleteOption {
                move_out: false,
                delete_resource: true,
                delete_cds_snapshot: true,
            },
        };
        let _: Option<IgnoredAny> = self
            .client
            .delete(Service::Cce, &path, &ApiQueryParams::new(), Some(&body))
            .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    #[serde(rename = "clusterID", default, skip_serializing_if = "String::is_empty")]
    pub cluster_id: String,
    pub cluster_name: String,
    #[serde(default)]
    pub cluster_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "k8sVersion", default)]
    pub k8s_version: String,
    #[serde(default)]
    pub runtime_type: String,
    #[serde(rename = "vpcID", default)]
    pub vpc_id: String,
    #[serde(default)]
    pub master_config: MasterConfig,
    #[serde(default)]
    pub container_network_config: ContainerNetworkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MasterConfig {
    #[serde(default)]
    pub master_type: String,
    #[serde(rename = "clusterHA", default)]
    pub cluster_ha: u32,
    #[serde(default)]
    pub exposed_public: bool,
    #[serde(
        rename = "clusterBLBVPCSubnetID",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub cluster_blb_vpc_subnet_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ContainerNetworkConfig {
    #[serde(default)]
    pub mode: String,
    #[serde(rename = "clusterPodCIDR", default)]
    pub cluster_pod_cidr: String,
    #[serde(rename = "clusterIPServiceCIDR", default)]
    pub cluster_ip_service_cidr: String,
    #[serde(
        rename = "lbServiceVPCSubnetID",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub lb_service_vpc_subnet_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    #[serde(default)]
    pub cluster_phase: String,
    #[serde(default)]
    pub node_num: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub spec: ClusterSpec,
    #[serde(default)]
    pub status: ClusterStatus,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateClusterRequest {
    pub cluster: ClusterSpec,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<InstanceSet>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateClusterResponse {
    #[serde(rename = "clusterID")]
    pub cluster_id: String,
    #[serde(rename = "requestID", default)]
    pub request_id: String,
}

#[derive(Debug, Deserialize)]
struct GetClusterResponse {
    cluster: Cluster,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstanceSet {
    #[serde(rename = "instanceSpec")]
    pub instance_spec: InstanceSpec,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSpec {
    #[serde(rename = "cceInstanceID", default, skip_serializing_if = "String::is_empty")]
    pub cce_instance_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub instance_name: String,
    #[serde(default)]
    pub cluster_role: String,
    #[serde(default)]
    pub existed: bool,
    #[serde(default)]
    pub machine_type: String,
    #[serde(default)]
    pub instance_type: String,
    #[serde(default)]
    pub vpc_config: VpcConfig,
    #[serde(default)]
    pub instance_resource: InstanceResource,
    #[serde(rename = "imageID", default)]
    pub image_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub admin_password: String,
    #[serde(default)]
    pub instance_charging_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct VpcConfig {
    #[serde(rename = "vpcID", default)]
    pub vpc_id: String,
    #[serde(rename = "vpcSubnetID", default)]
    pub vpc_subnet_id: String,
    #[serde(rename = "securityGroupID", default)]
    pub security_group_id: String,
    #[serde(default)]
    pub available_zone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct InstanceResource {
    #[serde(default)]
    pub cpu: u32,
    #[serde(default)]
    pub mem: u32,
    #[serde(default)]
    pub root_disk_type: String,
    #[serde(default)]
    pub root_disk_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Machine {
    #[serde(rename = "instanceID", default)]
    pub instance_id: String,
    #[serde(rename = "vpcIP", default)]
    pub vpc_ip: String,
    #[serde(default)]
    pub eip: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct InstanceStatus {
    #[serde(default)]
    pub machine: Machine,
    #[serde(default)]
    pub instance_phase: String,
    #[serde(default)]
    pub machine_status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterInstance {
    pub spec: InstanceSpec,
    #[serde(default)]
    pub status: InstanceStatus,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct ListInstancesArgs {
    pub page_no: u32,
    pub page_size: u32,
    pub keyword_type: Option<String>,
    pub keyword: Option<String>,
}

impl Default for ListInstancesArgs {
    fn default() -> Self {
        Self {
            page_no: 1,
            page_size: MAX_INSTANCE_PAGE_SIZE,
            keyword_type: None,
            keyword: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct InstancePage {
    #[serde(default)]
    pub page_no: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub total_count: u32,
    #[serde(default)]
    pub instance_list: Vec<ClusterInstance>,
}

impl InstancePage {
    /// Whether pages after this one exist
    pub fn has_more(&self) -> bool {
        self.page_size > 0
            && !self.instance_list.is_empty()
            && self.page_no.saturating_mul(self.page_size) < self.total_count
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListInstancesResponse {
    #[serde(default)]
    instance_page: InstancePage,
}

#[derive(Debug, Deserialize)]
struct GetInstanceResponse {
    instance: ClusterInstance,
}

#[derive(Debug, Deserialize)]
struct CreateInstancesResponse {
    #[serde(rename = "cceInstanceIDs", default)]
    cce_instance_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteInstancesRequest {
    instances_to_be_removed: Vec<String>,
    clean_policy: String,
    delete_option: DeleteOption,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteOption {
    move_out: bool,
    delete_resource: bool,
    #[serde(rename = "deleteCDSSnapshot")]
    delete_cds_snapshot: bool,
}
