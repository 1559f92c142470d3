#![allow(clippy::disallowed_methods)]

use baiducloud::services::PollSettings;
use baiducloud::BaiduCloudProvider;
use mockito::{Matcher, Server, ServerGuard};
use std::collections::HashMap;
use std::time::Duration;
use tempfile::TempDir;
use tfplug::request::{
    ConfigureRequest, CreateRequest, DeleteRequest, ReadDataSourceRequest, ReadRequest,
};
use tfplug::{Config, Context, Dynamic, Provider};

async fn configured_provider(server: &ServerGuard) -> BaiduCloudProvider {
    let mut provider = BaiduCloudProvider::new().with_poll_settings(PollSettings {
        delay: Duration::from_millis(1),
        min_timeout: Duration::from_millis(5),
    });

    let endpoints: HashMap<String, Dynamic> = ["bcc", "vpc", "eip", "cce"]
        .into_iter()
        .map(|key| (key.to_string(), Dynamic::String(server.url())))
        .collect();

    let mut config = Config::new();
    config.set("access_key", "test-ak");
    config.set("secret_key", "test-sk");
    config.set("region", "bj");
    config.set("endpoints", endpoints);
    config.set("max_retries", 0i64);

    let response = provider
        .configure(ConfigureRequest {
            context: Context::new(),
            config,
        })
        .await;
    assert!(!response.diagnostics.has_errors(), "{:?}", response.diagnostics);
    provider
}

#[tokio::test(flavor = "multi_thread")]
async fn vpc_lifecycle_with_mock_server() {
    let mut server = Server::new_async().await;
    let create = server
        .mock("POST", "/v1/vpc")
        .match_query(Matcher::Regex("clientToken=".to_string()))
        .match_header("authorization", Matcher::Regex("^bce-auth-v1/test-ak/".to_string()))
        .with_body(r#"{"vpcId":"vpc-1"}"#)
        .create_async()
        .await;
    let _get = server
        .mock("GET", "/v1/vpc/vpc-1")
        .with_body(r#"{"vpc":{"vpcId":"vpc-1","name":"main","cidr":"10.0.0.0/16"}}"#)
        .create_async()
        .await;

    let provider = configured_provider(&server).await;
    let resource = provider.create_resource("baiducloud_vpc").await.unwrap();

    let mut config = Config::new();
    config.set("name", "main");
    config.set("cidr", "10.0.0.0/16");
    let created = resource
        .create(CreateRequest {
            context: Context::new(),
            config: config.clone(),
            planned_state: config,
        })
        .await;

    create.assert_async().await;
    assert!(!created.diagnostics.has_errors(), "{:?}", created.diagnostics);
    assert_eq!(created.state.id(), Some("vpc-1".to_string()));

    let read = resource
        .read(ReadRequest {
            context: Context::new(),
            current_state: created.state.clone(),
        })
        .await;
    assert_eq!(
        read.state.unwrap().get_string("cidr"),
        Some("10.0.0.0/16".to_string())
    );

    let delete = server
        .mock("DELETE", "/v1/vpc/vpc-1")
        .match_query(Matcher::Any)
        .create_async()
        .await;
    let deleted = resource
        .delete(DeleteRequest {
            context: Context::new(),
            current_state: created.state,
        })
        .await;
    delete.assert_async().await;
    assert!(!deleted.diagnostics.has_errors());
}

#[tokio::test(flavor = "multi_thread")]
async fn subnets_data_source_filters_and_writes_output() {
    let mut server = Server::new_async().await;
    let _list = server
        .mock("GET", "/v1/subnet")
        .match_query(Matcher::UrlEncoded("vpcId".into(), "vpc-1".into()))
        .with_body(
            r#"{"subnets":[
                {"subnetId":"sbn-1","name":"web-a","zoneName":"cn-bj-a","cidr":"10.0.1.0/24","vpcId":"vpc-1","subnetType":"BCC"},
                {"subnetId":"sbn-2","name":"web-b","zoneName":"cn-bj-b","cidr":"10.0.2.0/24","vpcId":"vpc-1","subnetType":"BCC"},
                {"subnetId":"sbn-3","name":"db-a","zoneName":"cn-bj-a","cidr":"10.0.3.0/24","vpcId":"vpc-1","subnetType":"BBC"}
            ],"isTruncated":false}"#,
        )
        .create_async()
        .await;

    let provider = configured_provider(&server).await;
    let data_source = provider
        .create_data_source("baiducloud_subnets")
        .await
        .unwrap();

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out").join("subnets.json");

    let mut config = Config::new();
    config.set("vpc_id", "vpc-1");
    config.set("output_file", output.to_string_lossy().to_string());
    config.set(
        "filter",
        Dynamic::List(vec![Dynamic::Map(HashMap::from([
            ("name".to_string(), Dynamic::from("name")),
            (
                "values".to_string(),
                Dynamic::List(vec![Dynamic::from("^web-")]),
            ),
        ]))]),
    );

    let response = data_source
        .read(ReadDataSourceRequest {
            context: Context::new(),
            config,
        })
        .await;

    assert!(!response.diagnostics.has_errors(), "{:?}", response.diagnostics);
    assert_eq!(response.state.get_list("subnets").unwrap().len(), 2);

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    let ids: Vec<&str> = written
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["subnet_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["sbn-1", "sbn-2"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn eip_create_waits_for_available() {
    let mut server = Server::new_async().await;
    let _create = server
        .mock("POST", "/v1/eip")
        .match_query(Matcher::Any)
        .with_body(r#"{"eip":"1.2.3.4"}"#)
        .create_async()
        .await;
    let creating = server
        .mock("GET", "/v1/eip")
        .match_query(Matcher::UrlEncoded("eip".into(), "1.2.3.4".into()))
        .with_body(r#"{"eipList":[{"eip":"1.2.3.4","eipId":"ip-1","status":"creating"}]}"#)
        .expect(1)
        .create_async()
        .await;
    let _available = server
        .mock("GET", "/v1/eip")
        .match_query(Matcher::UrlEncoded("eip".into(), "1.2.3.4".into()))
        .with_body(
            r#"{"eipList":[{"eip":"1.2.3.4","eipId":"ip-1","status":"available","bandwidthInMbps":5}]}"#,
        )
        .create_async()
        .await;

    let provider = configured_provider(&server).await;
    let resource = provider.create_resource("baiducloud_eip").await.unwrap();

    let mut config = Config::new();
    config.set("name", "edge");
    config.set("bandwidth_in_mbps", 5i64);
    config.set("payment_timing", "Postpaid");
    config.set("billing_method", "ByTraffic");

    let response = resource
        .create(CreateRequest {
            context: Context::new(),
            config: config.clone(),
            planned_state: config,
        })
        .await;

    creating.assert_async().await;
    assert!(!response.diagnostics.has_errors(), "{:?}", response.diagnostics);
    assert_eq!(response.state.get_string("status"), Some("available".to_string()));
}

#[tokio::test(flavor = "multi_thread")]
async fn cancelled_context_stops_the_wait() {
    let mut server = Server::new_async().await;
    let _create = server
        .mock("POST", "/v1/eip")
        .match_query(Matcher::Any)
        .with_body(r#"{"eip":"1.2.3.4"}"#)
        .create_async()
        .await;
    let _creating = server
        .mock("GET", "/v1/eip")
        .match_query(Matcher::Any)
        .with_body(r#"{"eipList":[{"eip":"1.2.3.4","status":"creating"}]}"#)
        .create_async()
        .await;

    let provider = configured_provider(&server).await;
    let resource = provider.create_resource("baiducloud_eip").await.unwrap();

    let mut config = Config::new();
    config.set("name", "edge");
    config.set("bandwidth_in_mbps", 5i64);
    config.set("payment_timing", "Postpaid");
    config.set("billing_method", "ByTraffic");

    let ctx = Context::new();
    let cancel = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
    });

    let response = resource
        .create(CreateRequest {
            context: ctx,
            config: config.clone(),
            planned_state: config,
        })
        .await;

    assert_eq!(response.state.id(), Some("1.2.3.4".to_string()));
    let summary = &response.diagnostics.errors[0].summary;
    assert!(
        summary.starts_with("Resource baiducloud_eip create Failed!!! [terraform-provider]"),
        "{}",
        summary
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_reads_share_one_client() {
    let mut server = Server::new_async().await;
    let list = server
        .mock("GET", "/v2/instance")
        .match_query(Matcher::Any)
        .with_body(
            r#"{"instances":[{"id":"i-1","name":"web","status":"Running"}],"isTruncated":false}"#,
        )
        .expect(4)
        .create_async()
        .await;

    let provider = configured_provider(&server).await;
    let reads = (0..4).map(|_| async {
        let data_source = provider
            .create_data_source("baiducloud_instances")
            .await
            .unwrap();
        data_source
            .read(ReadDataSourceRequest {
                context: Context::new(),
                config: Config::new(),
            })
            .await
    });

    let responses = futures::future::join_all(reads).await;

    list.assert_async().await;
    let ids: Vec<Option<String>> = responses.iter().map(|r| r.state.id()).collect();
    assert!(responses.iter().all(|r| !r.diagnostics.has_errors()));
    assert!(ids.windows(2).all(|pair| pair[0] == pair[1]));
}
