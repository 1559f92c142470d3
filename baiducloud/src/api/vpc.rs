//! VPC and subnet API (`/v1/vpc`, `/v1/subnet`)

use crate::api::client::{Client, Service};
use crate::api::common::{ApiQueryParams, MarkerPage, PaginationParams, TagModel};
use crate::api::error::ApiError;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

pub struct VpcApi<'a> {
    client: &'a Client,
}

impl<'a> VpcApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// POST /v1/vpc
    pub async fn create_vpc(&self, request: &CreateVpcRequest) -> Result<String, ApiError> {
        let params = ApiQueryParams::new().client_token();
        let response: CreateVpcResponse = self
            .client
            .post(Service::Vpc, "/v1/vpc", &params, request)
            .await?;
        Ok(response.vpc_id)
    }

    /// GET /v1/vpc, one page
    pub async fn list_vpcs(&self, args: &ListVpcArgs) -> Result<ListVpcResponse, ApiError> {
        let params = args
            .page
            .apply(ApiQueryParams::new())
            .add_optional("isDefault", args.is_default);
        self.client.get(Service::Vpc, "/v1/vpc", &params).await
    }

    /// GET /v1/vpc/{vpcId}
    pub async fn get_vpc(&self, vpc_id: &str) -> Result<Vpc, ApiError> {
        let path = format!("/v1/vpc/{}", vpc_id);
        let response: GetVpcResponse = self
            .client
            .get(Service::Vpc, &path, &ApiQueryParams::new())
            .await?;
        Ok(response.vpc)
    }

    /// PUT /v1/vpc/{vpcId}?modifyAttribute
    pub async fn update_vpc(&self, vpc_id: &str, request: &UpdateVpcRequest) -> Result<(), ApiError> {
        let path = format!("/v1/vpc/{}", vpc_id);
        let params = ApiQueryParams::new().flag("modifyAttribute").client_token();
        let _: Option<IgnoredAny> = self
            .client
            .put(Service::Vpc, &path, &params, Some(request))
            .await?;
        Ok(())
    }

    /// DELETE /v1/vpc/{vpcId}
    pub async fn delete_vpc(&self, vpc_id: &str) -> Result<(), ApiError> {
        let path = format!("/v1/vpc/{}", vpc_id);
        let params = ApiQueryParams::new().client_token();
        let _: Option<IgnoredAny> = self
            .client
            .delete(Service::Vpc, &path, &params, None::<&()>)
            .await?;
        Ok(())
    }

    /// POST /v1/subnet
    pub async fn create_subnet(&self, request: &CreateSubnetRequest) -> Result<String, ApiError> {
        let params = ApiQueryParams::new().client_token();
        let response: CreateSubnetResponse = self
            .client
            .post(Service::Vpc, "/v1/subnet", &params, request)
            .await?;
        Ok(response.subnet_id)
    }

    /// GET /v1/subnet, one page
    pub async fn list_subnets(&self, args: &ListSubnetArgs) -> Result<ListSubnetResponse, ApiError> {
        let params = args
            .page
            .apply(ApiQueryParams::new())
            .add_optional("vpcId", args.vpc_id.as_deref())
            .add_optional("zoneName", args.zone_name.as_deref())
            .add_optional("subnetType", args.subnet_type.as_deref());
        self.client.get(Service::Vpc, "/v1/subnet", &params).await
    }

    /// GET /v1/subnet/{subnetId}
    pub async fn get_subnet(&self, subnet_id: &str) -> Result<Subnet, ApiError> {
        let path = format!("/v1/subnet/{}", subnet_id);
        let response: GetSubnetResponse = self
            .client
            .get(Service::Vpc, &path, &ApiQueryParams::new())
            .await?;
        Ok(response.subnet)
    }

    /// PUT /v1/subnet/{subnetId}?modifyAttribute
    pub async fn update_subnet(
        &self,
        subnet_id: &str,
        request: &UpdateSubnetRequest,
    ) -> Result<(), ApiError> {
        let path = format!("/v1/subnet/{}", subnet_id);
        let params = ApiQueryParams::new().flag("modifyAttribute").client_token();
        let _: Option<IgnoredAny> = self
            .client
            .put(Service::Vpc, &path, &params, Some(request))
            .await?;
        Ok(())
    }

    /// DELETE /v1/subnet/{subnetId}
    pub async fn delete_subnet(&self, subnet_id: &str) -> Result<(), ApiError> {
        let path = format!("/v1/subnet/{}", subnet_id);
        let params = ApiQueryParams::new().client_token();
        let _: Option<IgnoredAny> = self
            .client
            .delete(Service::Vpc, &path, &params, None::<&()>)
            .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vpc {
    pub vpc_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cidr: String,
    #[serde(default)]
    pub ipv6_cidr: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub secondary_cidr: Vec<String>,
    #[serde(default)]
    pub tags: Vec<TagModel>,
    #[serde(default)]
    pub created_time: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVpcRequest {
    pub name: String,
    pub cidr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub enable_ipv6: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateVpcResponse {
    vpc_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVpcRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ListVpcArgs {
    pub page: PaginationParams,
    pub is_default: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListVpcResponse {
    #[serde(flatten)]
    pub page: MarkerPage,
    #[serde(default)]
    pub vpcs: Vec<Vpc>,
}

#[derive(Debug, Deserialize)]
struct GetVpcResponse {
    vpc: Vpc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subnet {
    pub subnet_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub zone_name: String,
    #[serde(default)]
    pub cidr: String,
    #[serde(default)]
    pub vpc_id: String,
    #[serde(default)]
    pub subnet_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub available_ip: i64,
    #[serde(default)]
    pub tags: Vec<TagModel>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubnetRequest {
    pub name: String,
    pub zone_name: String,
    pub cidr: String,
    pub vpc_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSubnetResponse {
    subnet_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubnetRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ListSubnetArgs {
    pub page: PaginationParams,
    pub vpc_id: Option<String>,
    pub zone_name: Option<String>,
    pub subnet_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSubnetResponse {
    #[serde(flatten)]
    pub page: MarkerPage,
    #[serde(default)]
    pub subnets: Vec<Subnet>,
}

#[derive(Debug, Deserialize)]
struct GetSubnetResponse {
    subnet: Subnet,
}
