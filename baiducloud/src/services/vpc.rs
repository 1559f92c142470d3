use crate::api::common::{PaginationParams, MAX_PAGE_SIZE};
use crate::api::vpc::{ListSubnetArgs, ListVpcArgs, Subnet, Vpc};
use crate::api::{ApiError, Client};
use crate::logging::DebugLog;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tfplug::helper::{flatten, Row};

pub struct VpcService {
    client: Arc<Client>,
    debug: DebugLog,
}

/// Data source row for a VPC
#[derive(Debug, Serialize)]
pub struct VpcAttributes {
    pub vpc_id: String,
    pub name: String,
    pub cidr: String,
    pub ipv6_cidr: String,
    pub description: String,
    pub is_default: bool,
    pub secondary_cidrs: Vec<String>,
    pub created_time: String,
    pub tags: BTreeMap<String, String>,
}

impl From<&Vpc> for VpcAttributes {
    fn from(vpc: &Vpc) -> Self {
        Self {
            vpc_id: vpc.vpc_id.clone(),
            name: vpc.name.clone(),
            cidr: vpc.cidr.clone(),
            ipv6_cidr: vpc.ipv6_cidr.clone(),
            description: vpc.description.clone(),
            is_default: vpc.is_default,
            secondary_cidrs: vpc.secondary_cidr.clone(),
            created_time: vpc.created_time.clone(),
            tags: super::flatten_tags(&vpc.tags),
        }
    }
}

/// Data source row for a subnet
#[derive(Debug, Serialize)]
pub struct SubnetAttributes {
    pub subnet_id: String,
    pub name: String,
    pub zone_name: String,
    pub cidr: String,
    pub vpc_id: String,
    pub subnet_type: String,
    pub description: String,
    pub available_ip: i64,
    pub tags: BTreeMap<String, String>,
}

impl From<&Subnet> for SubnetAttributes {
    fn from(subnet: &Subnet) -> Self {
        Self {
            subnet_id: subnet.subnet_id.clone(),
            name: subnet.name.clone(),
            zone_name: subnet.zone_name.clone(),
            cidr: subnet.cidr.clone(),
            vpc_id: subnet.vpc_id.clone(),
            subnet_type: subnet.subnet_type.clone(),
            description: subnet.description.clone(),
            available_ip: subnet.available_ip,
            tags: super::flatten_tags(&subnet.tags),
        }
    }
}

impl VpcService {
    pub fn new(client: Arc<Client>, debug: DebugLog) -> Self {
        Self { client, debug }
    }

    /// Every VPC, following markers until the last page
    pub async fn list_all_vpcs(&self, is_default: Option<bool>) -> Result<Vec<Vpc>, ApiError> {
        let mut vpcs = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut page = PaginationParams::new().with_max_keys(MAX_PAGE_SIZE);
            if let Some(m) = marker.take() {
                page = page.with_marker(m);
            }
            let args = ListVpcArgs { page, is_default };
            let response = self.client.vpc().list_vpcs(&args).await?;
            self.debug.add_debug("list vpcs", &response.page);

            vpcs.extend(response.vpcs);
            match response.page.next() {
                Some(next) => marker = Some(next.to_string()),
                None => break,
            }
        }

        Ok(vpcs)
    }

    pub async fn get_vpc(&self, vpc_id: &str) -> Result<Vpc, ApiError> {
        let vpc = self.client.vpc().get_vpc(vpc_id).await?;
        self.debug.add_debug("get vpc", &vpc);
        Ok(vpc)
    }

    pub async fn list_all_subnets(&self, filter: &ListSubnetArgs) -> Result<Vec<Subnet>, ApiError> {
        let mut subnets = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut page = PaginationParams::new().with_max_keys(MAX_PAGE_SIZE);
            if let Some(m) = marker.take() {
                page = page.with_marker(m);
            }
            let args = ListSubnetArgs {
                page,
                ..filter.clone()
            };
            let response = self.client.vpc().list_subnets(&args).await?;
            self.debug.add_debug("list subnets", &response.page);

            subnets.extend(response.subnets);
            match response.page.next() {
                Some(next) => marker = Some(next.to_string()),
                None => break,
            }
        }

        Ok(subnets)
    }

    pub async fn get_subnet(&self, subnet_id: &str) -> Result<Subnet, ApiError> {
        let subnet = self.client.vpc().get_subnet(subnet_id).await?;
        self.debug.add_debug("get subnet", &subnet);
        Ok(subnet)
    }

    pub fn flatten_vpcs(&self, vpcs: &[Vpc]) -> tfplug::Result<Vec<Row>> {
        vpcs.iter()
            .map(|vpc| flatten(&VpcAttributes::from(vpc)))
            .collect()
    }

    pub fn flatten_subnets(&self, subnets: &[Subnet]) -> tfplug::Result<Vec<Row>> {
        subnets
            .iter()
            .map(|subnet| flatten(&SubnetAttributes::from(subnet)))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn service(url: &str) -> VpcService {
        VpcService::new(Arc::new(create_test_client(url)), DebugLog::new(true))
    }

    #[tokio::test]
    async fn list_all_vpcs_follows_markers() {
        let mut server = Server::new_async().await;
        let first = server
            .mock("GET", "/v1/vpc")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("maxKeys".into(), "1000".into()),
                Matcher::Regex("^maxKeys=1000$".into()),
            ]))
            .with_body(
                r#"{"isTruncated":true,"nextMarker":"vpc-2",
                "vpcs":[{"vpcId":"vpc-1","name":"a"}]}"#,
            )
            .create_async()
            .await;
        let second = server
            .mock("GET", "/v1/vpc")
            .match_query(Matcher::UrlEncoded("marker".into(), "vpc-2".into()))
            .with_body(r#"{"isTruncated":false,"vpcs":[{"vpcId":"vpc-2","name":"b"}]}"#)
            .create_async()
            .await;

        let vpcs = service(&server.url()).list_all_vpcs(None).await.unwrap();

        let ids: Vec<_> = vpcs.iter().map(|v| v.vpc_id.as_str()).collect();
        assert_eq!(ids, vec!["vpc-1", "vpc-2"]);
        first.assert_async().await;
        second.assert_async().await;
    }

    #[test]
    fn vpc_rows_use_attribute_names() {
        let vpc: Vpc = serde_json::from_value(json!({
            "vpcId": "vpc-1",
            "name": "main",
            "cidr": "10.0.0.0/16",
            "isDefault": true,
            "tags": [{"tagKey": "env", "tagValue": "prod"}]
        }))
        .unwrap();

        let svc = VpcService::new(
            Arc::new(create_test_client("http://127.0.0.1:1")),
            DebugLog::disabled(),
        );
        let rows = svc.flatten_vpcs(&[vpc]).unwrap();

        assert_eq!(rows[0]["vpc_id"], json!("vpc-1"));
        assert_eq!(rows[0]["is_default"], json!(true));
        assert_eq!(rows[0]["tags"], json!({"env": "prod"}));
    }

    #[tokio::test]
    async fn list_all_subnets_passes_query_filters() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/subnet")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("vpcId".into(), "vpc-1".into()),
                Matcher::UrlEncoded("zoneName".into(), "cn-bj-a".into()),
            ]))
            .with_body(r#"{"subnets":[{"subnetId":"sbn-1","vpcId":"vpc-1","availableIp":10}]}"#)
            .create_async()
            .await;

        let filter = ListSubnetArgs {
            vpc_id: Some("vpc-1".to_string()),
            zone_name: Some("cn-bj-a".to_string()),
            ..Default::default()
        };
        let subnets = service(&server.url())
            .list_all_subnets(&filter)
            .await
            .unwrap();

        assert_eq!(subnets.len(), 1);
        mock.assert_async().await;
    }
}
