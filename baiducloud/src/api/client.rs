use chrono::Utc;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HOST};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

use super::auth::{format_timestamp, Credentials, Signer, SigningRequest, BCE_DATE_HEADER};
use super::common::{ApiErrorResponse, ApiQueryParams};
use super::error::ApiError;
use super::transport::{Outcome, RequestCounts, RequestStats, TransportConfig};

/// BCE services this client talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Bcc,
    Vpc,
    Eip,
    Cce,
}

impl Service {
    pub const ALL: [Service; 4] = [Service::Bcc, Service::Vpc, Service::Eip, Service::Cce];

    /// Key used in the provider `endpoints` map
    pub fn key(&self) -> &'static str {
        match self {
            Service::Bcc => "bcc",
            Service::Vpc => "vpc",
            Service::Eip => "eip",
            Service::Cce => "cce",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.key() == key)
    }

    fn default_host(&self, region: &str) -> String {
        match self {
            // VPC and subnet APIs are served by the BCC endpoint
            Service::Bcc | Service::Vpc => format!("bcc.{}.baidubce.com", region),
            Service::Eip => format!("eip.{}.baidubce.com", region),
            Service::Cce => format!("cce.{}.baidubce.com", region),
        }
    }
}

/// Base URL per service
#[derive(Debug, Clone)]
pub struct ServiceEndpoints {
    endpoints: HashMap<Service, Url>,
}

impl ServiceEndpoints {
    /// Public endpoints of `region`
    pub fn for_region(region: &str) -> Result<Self, ApiError> {
        let mut endpoints = HashMap::new();
        for service in Service::ALL {
            endpoints.insert(service, parse_endpoint(&service.default_host(region))?);
        }
        Ok(Self { endpoints })
    }

    /// Every service served from one base URL
    pub fn uniform(endpoint: &str) -> Result<Self, ApiError> {
        let url = parse_endpoint(endpoint)?;
        Ok(Self {
            endpoints: Service::ALL.into_iter().map(|s| (s, url.clone())).collect(),
        })
    }

    /// Replaces the endpoint registered under `key` (`bcc`, `vpc`, `eip`, `cce`)
    pub fn with_override(mut self, key: &str, endpoint: &str) -> Result<Self, ApiError> {
        let service = Service::from_key(key)
            .ok_or_else(|| ApiError::InvalidEndpoint(format!("unknown service '{}'", key)))?;
        self.endpoints.insert(service, parse_endpoint(endpoint)?);
        Ok(self)
    }

    pub fn get(&self, service: Service) -> Result<&Url, ApiError> {
        self.endpoints.get(&service).ok_or_else(|| {
            ApiError::InvalidEndpoint(format!("no endpoint for service '{}'", service.key()))
        })
    }
}

/// Accepts bare hosts such as `bcc.bj.baidubce.com` and full URLs
fn parse_endpoint(endpoint: &str) -> Result<Url, ApiError> {
    let endpoint = endpoint.trim().trim_end_matches('/');
    let with_scheme = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("https://{}", endpoint)
    };

    let url = Url::parse(&with_scheme)
        .map_err(|e| ApiError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
    if url.host_str().is_none() {
        return Err(ApiError::InvalidEndpoint(format!("{}: missing host", endpoint)));
    }
    Ok(url)
}

/// `Host` header value, with the port only when it is not the scheme default
fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

/// BCE API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    endpoints: ServiceEndpoints,
    signer: Signer,
    retry_config: RetryConfig,
    stats: RequestStats,
}

#[derive(Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            timeout_seconds: 30,
        }
    }
}

impl Client {
    /// Create a new API client with default configuration
    pub fn new(credentials: Credentials, endpoints: ServiceEndpoints) -> Result<Self, ApiError> {
        Self::with_config(credentials, endpoints, RetryConfig::default())
    }

    /// Create a new API client with custom retry configuration
    pub fn with_config(
        credentials: Credentials,
        endpoints: ServiceEndpoints,
        retry_config: RetryConfig,
    ) -> Result<Self, ApiError> {
        if credentials.access_key.is_empty() || credentials.secret_key.is_empty() {
            return Err(ApiError::AuthError(
                "access key and secret key must not be empty".to_string(),
            ));
        }

        let http_client = TransportConfig::default()
            .with_request_timeout(std::time::Duration::from_secs(retry_config.timeout_seconds))
            .build_client()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                endpoints,
                signer: Signer::new(credentials),
                retry_config,
                stats: RequestStats::default(),
            }),
        })
    }

    /// Execute a GET request with retry logic
    pub async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        service: Service,
        path: &str,
        params: &ApiQueryParams,
    ) -> Result<T, ApiError> {
        self.request(Method::GET, service, path, params, None::<&()>)
            .await
    }

    /// Execute a POST request with retry logic
    pub async fn post<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        service: Service,
        path: &str,
        params: &ApiQueryParams,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(Method::POST, service, path, params, Some(body))
            .await
    }

    /// Execute a PUT request with retry logic
    pub async fn put<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        service: Service,
        path: &str,
        params: &ApiQueryParams,
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        self.request(Method::PUT, service, path, params, body).await
    }

    /// Execute a DELETE request with retry logic
    pub async fn delete<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        service: Service,
        path: &str,
        params: &ApiQueryParams,
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        self.request(Method::DELETE, service, path, params, body)
            .await
    }

    /// Requests sent to `service` so far, retries included
    pub async fn request_counts(&self, service: Service) -> RequestCounts {
        self.inner.stats.for_service(service).await
    }

    /// VPC and subnet operations
    pub fn vpc(&self) -> crate::api::vpc::VpcApi<'_> {
        crate::api::vpc::VpcApi::new(self)
    }

    /// Elastic IP operations
    pub fn eip(&self) -> crate::api::eip::EipApi<'_> {
        crate::api::eip::EipApi::new(self)
    }

    /// Cloud server operations
    pub fn bcc(&self) -> crate::api::bcc::BccApi<'_> {
        crate::api::bcc::BccApi::new(self)
    }

    /// Container engine (v2) operations
    pub fn ccev2(&self) -> crate::api::ccev2::CceV2Api<'_> {
        crate::api::ccev2::CceV2Api::new(self)
    }

    async fn request<T, B>(
        &self,
        method: Method,
        service: Service,
        path: &str,
        params: &ApiQueryParams,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        T: for<'de> Deserialize<'de>,
        B: Serialize,
    {
        let base = self.inner.endpoints.get(service)?;
        let full_path = format!("{}{}", base.path().trim_end_matches('/'), path);
        let url = format!(
            "{}://{}{}{}",
            base.scheme(),
            host_header(base),
            full_path,
            params.to_query_string()
        );
        let host = host_header(base);
        let body = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| ApiError::ParseError(format!("Failed to encode request body: {}", e)))?;

        self.execute_with_retry(
            || async {
                let timestamp = Utc::now();
                let date = format_timestamp(&timestamp);
                let headers = [("host", host.as_str()), (BCE_DATE_HEADER, date.as_str())];
                let authorization = self.inner.signer.sign(&SigningRequest {
                    method: method.as_str(),
                    path: &full_path,
                    query: params.pairs(),
                    headers: &headers,
                    timestamp,
                })?;

                tracing::debug!("{} request to: {}", method, url);

                let mut builder = self
                    .inner
                    .http_client
                    .request(method.clone(), &url)
                    .header(HOST, &host)
                    .header(BCE_DATE_HEADER, &date)
                    .header(AUTHORIZATION, authorization);
                if let Some(bytes) = &body {
                    builder = builder
                        .header(CONTENT_TYPE, "application/json; charset=utf-8")
                        .body(bytes.clone());
                }

                builder.send().await.map_err(ApiError::from)
            },
            service,
            path,
        )
        .await
    }

    /// Execute request with retry logic
    async fn execute_with_retry<F, Fut, T>(
        &self,
        request_fn: F,
        service: Service,
        path: &str,
    ) -> Result<T, ApiError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, ApiError>>,
        T: for<'de> Deserialize<'de>,
    {
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= self.inner.retry_config.max_retries {
            if attempt > 0 {
                let backoff = std::cmp::min(
                    self.inner.retry_config.initial_backoff_ms * (2_u64.pow(attempt - 1)),
                    self.inner.retry_config.max_backoff_ms,
                );
                tracing::debug!(
                    "Retrying request to {} after {}ms (attempt {})",
                    path,
                    backoff,
                    attempt
                );
                tokio::time::sleep(tokio::time::Duration::from_millis(backoff)).await;
            }

            match request_fn().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        self.inner.stats.record(service, Outcome::Success).await;
                        return self.parse_success_response(response).await;
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        self.inner.stats.record(service, Outcome::Throttled).await;
                        last_error = Some(ApiError::RateLimited);
                        attempt += 1;
                        continue;
                    }

                    self.inner.stats.record(service, Outcome::Failed).await;
                    if matches!(
                        status,
                        reqwest::StatusCode::BAD_GATEWAY
                            | reqwest::StatusCode::SERVICE_UNAVAILABLE
                            | reqwest::StatusCode::GATEWAY_TIMEOUT
                    ) {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        // 500 carries a BCE error code that callers classify
                        return self.handle_error_response(response).await;
                    }
                }
                Err(ApiError::RequestError(e)) => {
                    self.inner.stats.record(service, Outcome::Failed).await;

                    if e.is_timeout() {
                        last_error =
                            Some(ApiError::Timeout(self.inner.retry_config.timeout_seconds));
                    } else if e.is_connect() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(ApiError::RequestError(e));
                    }
                }
                Err(e) => return Err(e),
            }

            attempt += 1;
        }

        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }

    /// Parse successful response
    async fn parse_success_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let text = response.text().await?;
        tracing::debug!("API response body: {}", text);

        // Mutations answer with an empty body
        let text = if text.trim().is_empty() {
            "null"
        } else {
            text.as_str()
        };

        serde_json::from_str::<T>(text).map_err(|e| {
            tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
            ApiError::ParseError(format!("Failed to parse response: {}", e))
        })
    }

    /// Handle error response
    async fn handle_error_response<T>(&self, response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let body = serde_json::from_str::<ApiErrorResponse>(&text).unwrap_or_else(|_| {
            ApiErrorResponse {
                message: text.clone(),
                ..Default::default()
            }
        });

        if status == 401 {
            return Err(ApiError::AuthError(body.message));
        }

        tracing::debug!("API error (HTTP {}): {}", status, text);
        Err(ApiError::ServiceError {
            status,
            code: body.code,
            message: body.message,
            request_id: body.request_id,
        })
    }
}
