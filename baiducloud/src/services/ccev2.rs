use super::PollSettings;
use crate::api::ccev2::{Cluster, ClusterInstance, ListInstancesArgs, MAX_INSTANCE_PAGE_SIZE};
use crate::api::{ApiError, Client};
use crate::errors::is_not_found;
use crate::logging::DebugLog;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tfplug::helper::state_refresh::WaitAllError;
use tfplug::helper::{build_state_conf, flatten, wait_for_all, BoxError, Row, StateChangeConf};
use tfplug::Context;

pub const PHASE_PENDING: &str = "pending";
pub const PHASE_PROVISIONING: &str = "provisioning";
pub const PHASE_PROVISIONED: &str = "provisioned";
pub const PHASE_RUNNING: &str = "running";
pub const PHASE_CREATE_FAILED: &str = "create_failed";
pub const PHASE_DELETING: &str = "deleting";
pub const PHASE_DELETED: &str = "deleted";
pub const PHASE_DELETE_FAILED: &str = "delete_failed";

/// Phases a cluster or instance passes through while being created
pub const CREATE_PENDING_PHASES: &[&str] = &[PHASE_PENDING, PHASE_PROVISIONING, PHASE_PROVISIONED];

pub struct CceV2Service {
    client: Arc<Client>,
    debug: DebugLog,
    poll: PollSettings,
}

/// Data source row for a cluster instance
#[derive(Debug, Serialize)]
pub struct ClusterInstanceAttributes {
    pub cce_instance_id: String,
    pub instance_name: String,
    pub cluster_role: String,
    pub machine_type: String,
    pub instance_type: String,
    pub instance_phase: String,
    pub machine_status: String,
    pub instance_id: String,
    pub vpc_ip: String,
    pub eip: String,
    pub vpc_id: String,
    pub vpc_subnet_id: String,
    pub available_zone: String,
    pub cpu: u32,
    pub mem: u32,
    pub created_at: String,
}

impl From<&ClusterInstance> for ClusterInstanceAttributes {
    fn from(instance: &ClusterInstance) -> Self {
        let spec = &instance.spec;
        let status = &instance.status;
        Self {
            cce_instance_id: spec.cce_instance_id.clone(),
            instance_name: spec.instance_name.clone(),
            cluster_role: spec.cluster_role.clone(),
            machine_type: spec.machine_type.clone(),
            instance_type: spec.instance_type.clone(),
            instance_phase: status.instance_phase.clone(),
            machine_status: status.machine_status.clone(),
            instance_id: status.machine.instance_id.clone(),
            vpc_ip: status.machine.vpc_ip.clone(),
            eip: status.machine.eip.clone(),
            vpc_id: spec.vpc_config.vpc_id.clone(),
            vpc_subnet_id: spec.vpc_config.vpc_subnet_id.clone(),
            available_zone: spec.vpc_config.available_zone.clone(),
            cpu: spec.instance_resource.cpu,
            mem: spec.instance_resource.mem,
            created_at: instance.created_at.clone(),
        }
    }
}

/// Failure phases that stop a wait, minus any the caller polls through.
/// Removing a worker that never came up passes through `create_failed`.
fn fail_phases(pending: &[&str], target: &[&str]) -> Vec<&'static str> {
    [PHASE_CREATE_FAILED, PHASE_DELETE_FAILED]
        .into_iter()
        .filter(|phase| !pending.contains(phase) && !target.contains(phase))
        .collect()
}

impl CceV2Service {
    pub fn new(client: Arc<Client>, debug: DebugLog, poll: PollSettings) -> Self {
        Self {
            client,
            debug,
            poll,
        }
    }

    pub async fn get_cluster(&self, cluster_id: &str) -> Result<Cluster, ApiError> {
        let cluster = self.client.ccev2().get_cluster(cluster_id).await?;
        self.debug.add_debug("get cluster", &cluster);
        Ok(cluster)
    }

    /// Every instance of the cluster, optionally narrowed by a keyword
    pub async fn list_all_instances(
        &self,
        cluster_id: &str,
        keyword_type: Option<&str>,
        keyword: Option<&str>,
    ) -> Result<Vec<ClusterInstance>, ApiError> {
        let mut instances = Vec::new();
        let mut page_no = 1;

        loop {
            let args = ListInstancesArgs {
                page_no,
                page_size: MAX_INSTANCE_PAGE_SIZE,
                keyword_type: keyword_type.map(str::to_string),
                keyword: keyword.map(str::to_string),
            };
            let page = self
                .client
                .ccev2()
                .list_instances(cluster_id, &args)
                .await?;
            self.debug
                .add_debug("list cluster instances", &(page.page_no, page.total_count));

            let more = page.has_more();
            instances.extend(page.instance_list);
            if !more {
                break;
            }
            page_no += 1;
        }

        Ok(instances)
    }

    /// Wait on the cluster phase; a removed cluster reports `deleted`
    pub fn cluster_state_conf(
        &self,
        cluster_id: &str,
        pending: &[&str],
        target: &[&str],
        timeout: Duration,
    ) -> StateChangeConf<Option<Cluster>> {
        let client = self.client.clone();
        let id = cluster_id.to_string();
        let debug = self.debug;

        let conf = build_state_conf(pending, target, timeout, move || {
            let client = client.clone();
            let id = id.clone();
            async move {
                let found = match client.ccev2().get_cluster(&id).await {
                    Ok(cluster) => Some(cluster),
                    Err(e) if is_not_found(&e) => None,
                    Err(e) => return Err(BoxError::from(e)),
                };
                let phase = found.as_ref().map_or_else(
                    || PHASE_DELETED.to_string(),
                    |c| c.status.cluster_phase.clone(),
                );
                debug.add_debug("refresh cluster phase", &phase);
                Ok((found, phase))
            }
        });
        self.poll
            .apply(conf)
            .with_fail_states(&fail_phases(pending, target))
    }

    /// Wait on one instance's phase; a removed instance reports `deleted`
    pub fn instance_state_conf(
        &self,
        cluster_id: &str,
        instance_id: &str,
        pending: &[&str],
        target: &[&str],
        timeout: Duration,
    ) -> StateChangeConf<Option<ClusterInstance>> {
        let client = self.client.clone();
        let cluster_id = cluster_id.to_string();
        let instance_id = instance_id.to_string();
        let debug = self.debug;

        let conf = build_state_conf(pending, target, timeout, move || {
            let client = client.clone();
            let cluster_id = cluster_id.clone();
            let instance_id = instance_id.clone();
            async move {
                let found = match client.ccev2().get_instance(&cluster_id, &instance_id).await {
                    Ok(instance) => Some(instance),
                    Err(e) if is_not_found(&e) => None,
                    Err(e) => return Err(BoxError::from(e)),
                };
                let phase = found.as_ref().map_or_else(
                    || PHASE_DELETED.to_string(),
                    |i| i.status.instance_phase.clone(),
                );
                debug.add_debug("refresh instance phase", &(&instance_id, &phase));
                Ok((found, phase))
            }
        });
        self.poll
            .apply(conf)
            .with_fail_states(&fail_phases(pending, target))
    }

    /// Waits for every instance concurrently. All waits run to completion;
    /// failures are reported together, one `id: reason` entry each.
    pub async fn wait_for_instances_operation(
        &self,
        ctx: &Context,
        cluster_id: &str,
        instance_ids: &[String],
        pending: &[&str],
        target: &[&str],
        timeout: Duration,
    ) -> Result<(), WaitAllError> {
        let waits = instance_ids
            .iter()
            .map(|id| {
                let conf = self.instance_state_conf(cluster_id, id, pending, target, timeout);
                (id.clone(), conf)
            })
            .collect();

        let done = wait_for_all(ctx, waits).await?;
        tracing::debug!(
            "{} instances of cluster {} reached {:?}",
            done.len(),
            cluster_id,
            target
        );
        Ok(())
    }

    pub fn flatten_instances(&self, instances: &[ClusterInstance]) -> tfplug::Result<Vec<Row>> {
        instances
            .iter()
            .map(|instance| flatten(&ClusterInstanceAttributes::from(instance)))
            .collect()
    }
}
