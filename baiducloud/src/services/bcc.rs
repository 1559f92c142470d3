use super::{PollSettings, DELETED_STATE};
use crate::api::bcc::{Instance, ListInstanceArgs};
use crate::api::common::{PaginationParams, MAX_PAGE_SIZE};
use crate::api::{ApiError, Client};
use crate::errors::is_not_found;
use crate::logging::DebugLog;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tfplug::helper::{build_state_conf, flatten, BoxError, Row, StateChangeConf};

pub const INSTANCE_STATUS_STARTING: &str = "Starting";
pub const INSTANCE_STATUS_RUNNING: &str = "Running";
pub const INSTANCE_STATUS_STOPPING: &str = "Stopping";
pub const INSTANCE_STATUS_STOPPED: &str = "Stopped";
pub const INSTANCE_STATUS_DELETING: &str = "Deleting";
pub const INSTANCE_STATUS_ERROR: &str = "Error";

pub struct BccService {
    client: Arc<Client>,
    debug: DebugLog,
    poll: PollSettings,
}

#[derive(Debug, Serialize)]
pub struct InstanceAttributes {
    pub instance_id: String,
    pub name: String,
    pub status: String,
    pub description: String,
    pub instance_type: String,
    pub instance_spec: String,
    pub cpu_count: u32,
    pub memory_capacity_in_gb: u32,
    pub image_id: String,
    pub internal_ip: String,
    pub public_ip: String,
    pub zone_name: String,
    pub vpc_id: String,
    pub subnet_id: String,
    pub payment_timing: String,
    pub create_time: String,
    pub tags: BTreeMap<String, String>,
}

impl From<&Instance> for InstanceAttributes {
    fn from(instance: &Instance) -> Self {
        Self {
            instance_id: instance.id.clone(),
            name: instance.name.clone(),
            status: instance.status.clone(),
            description: instance.description.clone(),
            instance_type: instance.instance_type.clone(),
            instance_spec: instance.spec.clone(),
            cpu_count: instance.cpu_count,
            memory_capacity_in_gb: instance.memory_capacity_in_gb,
            image_id: instance.image_id.clone(),
            internal_ip: instance.internal_ip.clone(),
            public_ip: instance.public_ip.clone(),
            zone_name: instance.zone_name.clone(),
            vpc_id: instance.vpc_id.clone(),
            subnet_id: instance.subnet_id.clone(),
            payment_timing: instance.payment_timing.clone(),
            create_time: instance.create_time.clone(),
            tags: super::flatten_tags(&instance.tags),
        }
    }
}

impl BccService {
    pub fn new(client: Arc<Client>, debug: DebugLog, poll: PollSettings) -> Self {
        Self {
            client,
            debug,
            poll,
        }
    }

    pub async fn list_all_instances(
        &self,
        filter: &ListInstanceArgs,
    ) -> Result<Vec<Instance>, ApiError> {
        let mut instances = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut page = PaginationParams::new().with_max_keys(MAX_PAGE_SIZE);
            if let Some(m) = marker.take() {
                page = page.with_marker(m);
            }
            let args = ListInstanceArgs {
                page,
                ..filter.clone()
            };
            let response = self.client.bcc().list_instances(&args).await?;
            self.debug.add_debug("list instances", &response.page);

            instances.extend(response.instances);
            match response.page.next() {
                Some(next) => marker = Some(next.to_string()),
                None => break,
            }
        }

        Ok(instances)
    }

    pub async fn get_instance(&self, instance_id: &str) -> Result<Instance, ApiError> {
        let instance = self.client.bcc().get_instance(instance_id).await?;
        self.debug.add_debug("get instance", &instance);
        Ok(instance)
    }

    /// Wait on the instance status; a deleted instance reports [`DELETED_STATE`]
    pub fn state_conf(
        &self,
        instance_id: &str,
        pending: &[&str],
        target: &[&str],
        timeout: Duration,
    ) -> StateChangeConf<Option<Instance>> {
        let client = self.client.clone();
        let id = instance_id.to_string();
        let debug = self.debug;

        let conf = build_state_conf(pending, target, timeout, move || {
            let client = client.clone();
            let id = id.clone();
            async move {
                let found = match client.bcc().get_instance(&id).await {
                    Ok(instance) => Some(instance),
                    Err(e) if is_not_found(&e) => None,
                    Err(e) => return Err(BoxError::from(e)),
                };
                let status = found
                    .as_ref()
                    .map_or_else(|| DELETED_STATE.to_string(), |i| i.status.clone());
                debug.add_debug("refresh instance status", &status);
                Ok((found, status))
            }
        });
        self.poll
            .apply(conf)
            .with_fail_states(&[INSTANCE_STATUS_ERROR])
    }

    pub fn flatten_instances(&self, instances: &[Instance]) -> tfplug::Result<Vec<Row>> {
        instances
            .iter()
            .map(|instance| flatten(&InstanceAttributes::from(instance)))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use mockito::Server;
    use tfplug::helper::WaitError;
    use tfplug::Context;

    fn service(url: &str) -> BccService {
        let fast = PollSettings {
            delay: Duration::from_millis(1),
            min_timeout: Duration::from_millis(5),
        };
        BccService::new(Arc::new(create_test_client(url)), DebugLog::disabled(), fast)
    }

    #[tokio::test]
    async fn error_status_fails_wait() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/v2/instance/i-1")
            .with_body(r#"{"instance":{"id":"i-1","status":"Error"}}"#)
            .create_async()
            .await;

        let err = service(&server.url())
            .state_conf(
                "i-1",
                &[INSTANCE_STATUS_STARTING],
                &[INSTANCE_STATUS_RUNNING],
                Duration::from_secs(5),
            )
            .wait_for_state(&Context::new())
            .await
            .unwrap_err();

        assert!(matches!(err, WaitError::FailState { ref state, .. } if state == "Error"));
    }

    #[tokio::test]
    async fn missing_instance_reports_deleted() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/v2/instance/i-1")
            .with_status(404)
            .with_body(r#"{"requestId":"r","code":"InstanceNotFound","message":"gone"}"#)
            .create_async()
            .await;

        let gone = service(&server.url())
            .state_conf(
                "i-1",
                &[INSTANCE_STATUS_RUNNING, INSTANCE_STATUS_DELETING],
                &[DELETED_STATE],
                Duration::from_secs(5),
            )
            .wait_for_state(&Context::new())
            .await
            .unwrap();

        assert!(gone.is_none());
    }

    #[test]
    fn instance_rows_rename_fields() {
        let instance: Instance = serde_json::from_value(serde_json::json!({
            "id": "i-1",
            "status": "Running",
            "spec": "bcc.g3.c2m8",
            "cpuCount": 2
        }))
        .unwrap();

        let rows = service("http://127.0.0.1:1")
            .flatten_instances(&[instance])
            .unwrap();

        assert_eq!(rows[0]["instance_id"], "i-1");
        assert_eq!(rows[0]["instance_spec"], "bcc.g3.c2m8");
        assert_eq!(rows[0]["cpu_count"], 2);
    }
}
