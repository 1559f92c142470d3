//! Elastic IP API (`/v1/eip`)

use crate::api::client::{Client, Service};
use crate::api::common::{ApiQueryParams, Billing, MarkerPage, PaginationParams, TagModel};
use crate::api::error::ApiError;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

pub struct EipApi<'a> {
    client: &'a Client,
}

impl<'a> EipApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// POST /v1/eip, returns the allocated address
    pub async fn create(&self, request: &CreateEipRequest) -> Result<String, ApiError> {
        let params = ApiQueryParams::new().client_token();
        let response: CreateEipResponse = self
            .client
            .post(Service::Eip, "/v1/eip", &params, request)
            .await?;
        Ok(response.eip)
    }

    /// GET /v1/eip, one page
    pub async fn list(&self, args: &ListEipArgs) -> Result<ListEipResponse, ApiError> {
        let params = args
            .page
            .apply(ApiQueryParams::new())
            .add_optional("eip", args.eip.as_deref())
            .add_optional("instanceType", args.instance_type.as_deref())
            .add_optional("instanceId", args.instance_id.as_deref())
            .add_optional("status", args.status.as_deref());
        self.client.get(Service::Eip, "/v1/eip", &params).await
    }

    /// PUT /v1/eip/{eip}?resize
    pub async fn resize(&self, eip: &str, new_bandwidth_in_mbps: u32) -> Result<(), ApiError> {
        let path = format!("/v1/eip/{}", eip);
        let params = ApiQueryParams::new().flag("resize").client_token();
        let body = ResizeEipRequest {
            new_bandwidth_in_mbps,
        };
        let _: Option<IgnoredAny> = self
            .client
            .put(Service::Eip, &path, &params, Some(&body))
            .await?;
        Ok(())
    }

    /// DELETE /v1/eip/{eip}
    pub async fn delete(&self, eip: &str) -> Result<(), ApiError> {
        let path = format!("/v1/eip/{}", eip);
        let params = ApiQueryParams::new().client_token();
        let _: Option<IgnoredAny> = self
            .client
            .delete(Service::Eip, &path, &params, None::<&()>)
            .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip {
    pub eip: String,
    #[serde(default)]
    pub eip_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub eip_instance_type: String,
    #[serde(default)]
    pub instance_type: String,
    #[serde(default)]
    pub instance_id: String,
    #[serde(default)]
    pub share_group_id: String,
    #[serde(default)]
    pub bandwidth_in_mbps: u32,
    #[serde(default)]
    pub payment_timing: String,
    #[serde(default)]
    pub billing_method: String,
    #[serde(default)]
    pub create_time: String,
    #[serde(default)]
    pub expire_time: String,
    #[serde(default)]
    pub tags: Vec<TagModel>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEipRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub bandwidth_in_mbps: u32,
    pub billing: Billing,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct CreateEipResponse {
    eip: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResizeEipRequest {
    new_bandwidth_in_mbps: u32,
}

#[derive(Debug, Clone, Default)]
pub struct ListEipArgs {
    pub page: PaginationParams,
    pub eip: Option<String>,
    pub instance_type: Option<String>,
    pub instance_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEipResponse {
    #[serde(flatten)]
    pub page: MarkerPage,
    #[serde(default)]
    pub eip_list: Vec<Eip>,
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::common::Reservation;
    use crate::api::test_helpers::create_test_client;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn test_create_eip() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/eip")
            .match_query(Matcher::Any)
            .match_body(Matcher::Json(serde_json::json!({
                "name": "tf-eip",
                "bandwidthInMbps": 10,
                "billing": {
                    "paymentTiming": "Prepaid",
                    "reservation": {"reservationLength": 1, "reservationTimeUnit": "Month"}
                }
            })))
            .with_body(r#"{"eip":"180.76.1.1"}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let eip = client
            .eip()
            .create(&CreateEipRequest {
                name: Some("tf-eip".to_string()),
                bandwidth_in_mbps: 10,
                billing: Billing {
                    payment_timing: "Prepaid".to_string(),
                    billing_method: None,
                    reservation: Some(Reservation {
                        reservation_length: 1,
                        reservation_time_unit: "Month".to_string(),
                    }),
                },
                tags: vec![],
            })
            .await
            .unwrap();

        assert_eq!(eip, "180.76.1.1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_list_eips_with_filters() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/v1/eip")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("status".into(), "available".into()),
                Matcher::UrlEncoded("instanceType".into(), "BCC".into()),
            ]))
            .with_body(
                r#"{"eipList":[{"eip":"180.76.1.1","name":"a","status":"available",
                "bandwidthInMbps":5,"paymentTiming":"Postpaid","billingMethod":"ByTraffic"}],
                "isTruncated":false}"#,
            )
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let args = ListEipArgs {
            status: Some("available".to_string()),
            instance_type: Some("BCC".to_string()),
            ..Default::default()
        };
        let page = client.eip().list(&args).await.unwrap();

        assert_eq!(page.eip_list.len(), 1);
        assert_eq!(page.eip_list[0].bandwidth_in_mbps, 5);
        assert_eq!(page.eip_list[0].billing_method, "ByTraffic");
    }

    #[tokio::test]
    async fn test_resize_eip() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", "/v1/eip/180.76.1.1")
            .match_query(Matcher::Regex("^resize&clientToken=".to_string()))
            .match_body(Matcher::Json(serde_json::json!({"newBandwidthInMbps": 20})))
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        client.eip().resize("180.76.1.1", 20).await.unwrap();

        mock.assert_async().await;
    }
}
