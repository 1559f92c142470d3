//! Test helpers for the BCE API

#[allow(dead_code, clippy::disallowed_methods)]
pub fn create_test_client(url: &str) -> super::Client {
    let retry_config = super::RetryConfig {
        max_retries: 2,
        initial_backoff_ms: 1,
        max_backoff_ms: 5,
        timeout_seconds: 5,
    };
    super::Client::with_config(
        super::Credentials {
            access_key: "test-ak".to_string(),
            secret_key: "test-sk".to_string(),
        },
        super::ServiceEndpoints::uniform(url).unwrap(),
        retry_config,
    )
    .unwrap()
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::super::*;
    use super::create_test_client;
    use mockito::{Matcher, Server};
    use serde_json::Value;

    #[tokio::test]
    async fn test_retry_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_backoff_ms, 100);
        assert_eq!(config.max_backoff_ms, 10000);
        assert_eq!(config.timeout_seconds, 30);
    }

    #[test]
    fn test_api_query_params() {
        let params = ApiQueryParams::new()
            .add("foo", "bar")
            .add("baz", 123)
            .flag("resize")
            .add_optional("opt", Some("a b"))
            .add_optional("none", None::<String>);

        let query = params.to_query_string();
        assert_eq!(query, "?foo=bar&baz=123&resize&opt=a%20b");
    }

    #[test]
    fn test_pagination_params() {
        let params = PaginationParams::new()
            .with_marker("vpc-1")
            .with_max_keys(50)
            .apply(ApiQueryParams::new());

        let query = params.to_query_string();
        assert!(query.contains("marker=vpc-1"));
        assert!(query.contains("maxKeys=50"));
    }

    #[test]
    fn test_client_token_is_unique() {
        let a = ApiQueryParams::new().client_token();
        let b = ApiQueryParams::new().client_token();
        assert_ne!(a.pairs()[0].1, b.pairs()[0].1);
        assert_eq!(a.pairs()[0].0, "clientToken");
    }

    #[test]
    fn test_region_endpoints() {
        let endpoints = ServiceEndpoints::for_region("gz").unwrap();
        assert_eq!(
            endpoints.get(Service::Bcc).unwrap().as_str(),
            "https://bcc.gz.baidubce.com/"
        );
        assert_eq!(
            endpoints.get(Service::Vpc).unwrap().host_str(),
            Some("bcc.gz.baidubce.com")
        );
        assert_eq!(
            endpoints.get(Service::Cce).unwrap().host_str(),
            Some("cce.gz.baidubce.com")
        );
    }

    #[test]
    fn test_endpoint_override() {
        let endpoints = ServiceEndpoints::for_region("bj")
            .unwrap()
            .with_override("eip", "http://localhost:8080")
            .unwrap();
        assert_eq!(
            endpoints.get(Service::Eip).unwrap().as_str(),
            "http://localhost:8080/"
        );

        let unknown = ServiceEndpoints::for_region("bj")
            .unwrap()
            .with_override("bos", "bos.bj.baidubce.com");
        assert!(matches!(unknown, Err(ApiError::InvalidEndpoint(_))));
    }

    #[test]
    fn test_empty_credentials_rejected() {
        let result = Client::new(
            Credentials {
                access_key: String::new(),
                secret_key: "sk".to_string(),
            },
            ServiceEndpoints::for_region("bj").unwrap(),
        );
        assert!(matches!(result, Err(ApiError::AuthError(_))));
    }

    #[tokio::test]
    async fn test_requests_are_signed() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/vpc")
            .match_header(
                "authorization",
                Matcher::Regex(r"^bce-auth-v1/test-ak/\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}Z/1800/host;x-bce-date/[0-9a-f]{64}$".to_string()),
            )
            .match_header("x-bce-date", Matcher::Any)
            .with_body(r#"{"vpcs":[]}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let _: Value = client
            .get(Service::Vpc, "/v1/vpc", &ApiQueryParams::new())
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_success_body() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("DELETE", "/v1/vpc/vpc-1")
            .with_status(200)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let result: Option<Value> = client
            .delete(Service::Vpc, "/v1/vpc/vpc-1", &ApiQueryParams::new(), None::<&()>)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_service_error_is_parsed() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/v1/vpc/vpc-missing")
            .with_status(404)
            .with_body(r#"{"requestId":"req-1","code":"NoSuchObject","message":"vpc not found"}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let err = client
            .get::<Value>(Service::Vpc, "/v1/vpc/vpc-missing", &ApiQueryParams::new())
            .await
            .unwrap_err();

        assert_eq!(err.code(), Some("NoSuchObject"));
        assert_eq!(err.status(), Some(404));
        assert!(err.to_string().contains("RequestId: req-1"));
    }

    #[tokio::test]
    async fn test_internal_error_is_not_retried_by_client() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/vpc")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body(r#"{"requestId":"r","code":"InternalError","message":"busy"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let err = client
            .post::<Value, _>(Service::Vpc, "/v1/vpc", &ApiQueryParams::new(), &serde_json::json!({}))
            .await
            .unwrap_err();

        assert_eq!(err.code(), Some("InternalError"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_throttling_is_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/eip")
            .with_status(429)
            .expect(3)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let err = client
            .get::<Value>(Service::Eip, "/v1/eip", &ApiQueryParams::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::RateLimited));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unauthorized() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/v2/instance")
            .with_status(401)
            .with_body(r#"{"requestId":"r","code":"AccessDenied","message":"bad signature"}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let err = client
            .get::<Value>(Service::Bcc, "/v2/instance", &ApiQueryParams::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::AuthError(ref m) if m == "bad signature"));
    }

    #[tokio::test]
    async fn test_request_counts() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/v1/vpc")
            .with_body("{}")
            .create_async()
            .await;
        let _throttled = server
            .mock("GET", "/v1/eip")
            .with_status(429)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let _: Value = client
            .get(Service::Vpc, "/v1/vpc", &ApiQueryParams::new())
            .await
            .unwrap();
        let _ = client
            .get::<Value>(Service::Eip, "/v1/eip", &ApiQueryParams::new())
            .await;

        let vpc = client.request_counts(Service::Vpc).await;
        assert_eq!((vpc.sent, vpc.failed), (1, 0));

        let eip = client.request_counts(Service::Eip).await;
        assert_eq!((eip.sent, eip.throttled), (3, 3));
    }
}
