//! `baiducloud_ccev2_cluster`
//!
//! A managed Kubernetes cluster plus one group of worker nodes. Creation
//! waits for the cluster to run and then for every worker concurrently.
//! Changing `worker_count` scales the group; the most recently added
//! workers are removed first.

use super::{get_u32, retry_api};
use crate::api::ccev2::{
    ClusterInstance, ClusterSpec, ContainerNetworkConfig, CreateClusterRequest, InstanceResource,
    InstanceSet, InstanceSpec, MasterConfig, VpcConfig,
};
use crate::errors::{
    is_not_found, wrap_error, wrap_retry_failure, wrap_wait_error, ErrorSource, ProviderError,
};
use crate::services::ccev2::{
    CREATE_PENDING_PHASES, PHASE_CREATE_FAILED, PHASE_DELETED, PHASE_DELETING, PHASE_PENDING,
    PHASE_PROVISIONED, PHASE_PROVISIONING, PHASE_RUNNING,
};
use crate::BaiduCloudProviderData;
use async_trait::async_trait;
use std::time::Duration;
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ReadRequest, ReadResponse,
    ResourceSchemaResponse, SchemaRequest, UpdateRequest, UpdateResponse, ValidateRequest,
    ValidateResponse,
};
use tfplug::schema::ResourceSchema;
use tfplug::timeouts::timeouts_attribute;
use tfplug::validator::{NumberRangeValidator, StringInSliceValidator};
use tfplug::{
    AttributeBuilder, Config, Context, Diagnostics, Dynamic, Resource, SchemaBuilder, State,
    Timeouts,
};

const TYPE_NAME: &str = "baiducloud_ccev2_cluster";

pub const CLUSTER_ROLE_NODE: &str = "node";

const NETWORK_MODES: &[&str] = &["kubenet", "vpc-cni", "vpc-route-veth"];
const MASTER_TYPES: &[&str] = &["managed", "custom", "serverless"];

/// Phases a worker may report while it is being removed
const REMOVAL_PENDING_PHASES: &[&str] = &[
    PHASE_PENDING,
    PHASE_PROVISIONING,
    PHASE_PROVISIONED,
    PHASE_RUNNING,
    PHASE_DELETING,
    PHASE_CREATE_FAILED,
];

pub struct CceV2ClusterResource {
    data: BaiduCloudProviderData,
}

impl CceV2ClusterResource {
    pub fn new(data: BaiduCloudProviderData) -> Self {
        Self { data }
    }

    pub fn schema_static() -> ResourceSchema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a CCE v2 Kubernetes cluster and its worker nodes")
            .attribute(AttributeBuilder::string("id").computed().build())
            .attribute(
                AttributeBuilder::string("cluster_name")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("k8s_version")
                    .required()
                    .force_new()
                    .description("Kubernetes version, e.g. 1.20.8")
                    .build(),
            )
            .attribute(AttributeBuilder::string("vpc_id").required().force_new().build())
            .attribute(AttributeBuilder::string("description").optional().force_new().build())
            .attribute(
                AttributeBuilder::string("runtime_type")
                    .optional()
                    .force_new()
                    .default("docker")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("master_type")
                    .optional()
                    .force_new()
                    .default("managed")
                    .validator(StringInSliceValidator::new(MASTER_TYPES))
                    .build(),
            )
            .attribute(
                AttributeBuilder::number("cluster_ha")
                    .optional()
                    .force_new()
                    .default(1i64)
                    .validator(NumberRangeValidator {
                        min: Some(1.0),
                        max: None,
                    })
                    .build(),
            )
            .attribute(
                AttributeBuilder::bool("exposed_public")
                    .optional()
                    .force_new()
                    .default(false)
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("cluster_blb_subnet_id")
                    .optional()
                    .force_new()
                    .description("Subnet for the API server load balancer")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("container_network_mode")
                    .optional()
                    .force_new()
                    .default("kubenet")
                    .validator(StringInSliceValidator::new(NETWORK_MODES))
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("cluster_pod_cidr")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("cluster_ip_service_cidr")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("lb_service_subnet_id")
                    .optional()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::number("worker_count")
                    .optional()
                    .default(0i64)
                    .description("Number of worker nodes; changing it scales the node group")
                    .validator(NumberRangeValidator {
                        min: Some(0.0),
                        max: Some(200.0),
                    })
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("worker_subnet_id")
                    .optional()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("worker_security_group_id")
                    .optional()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("worker_availability_zone")
                    .optional()
                    .force_new()
                    .default("zoneA")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("worker_instance_type")
                    .optional()
                    .force_new()
                    .default("N3")
                    .build(),
            )
            .attribute(
                AttributeBuilder::number("worker_cpu")
                    .optional()
                    .force_new()
                    .default(2i64)
                    .validator(NumberRangeValidator {
                        min: Some(1.0),
                        max: None,
                    })
                    .build(),
            )
            .attribute(
                AttributeBuilder::number("worker_mem")
                    .optional()
                    .force_new()
                    .default(4i64)
                    .validator(NumberRangeValidator {
                        min: Some(1.0),
                        max: None,
                    })
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("worker_image_id")
                    .optional()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("worker_admin_password")
                    .optional()
                    .sensitive()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::number("worker_root_disk_size")
                    .optional()
                    .force_new()
                    .default(40i64)
                    .validator(NumberRangeValidator {
                        min: Some(1.0),
                        max: None,
                    })
                    .build(),
            )
            .attribute(AttributeBuilder::string("cluster_phase").computed().build())
            .attribute(
                AttributeBuilder::string_list("worker_instance_ids")
                    .computed()
                    .description("CCE instance ids of the workers, oldest first")
                    .build(),
            )
            .attribute(AttributeBuilder::string("created_at").computed().build())
            .attribute(timeouts_attribute())
            .build()
    }

    fn timeouts() -> Timeouts {
        Timeouts::new(Duration::from_secs(60 * 60)).with_update(Duration::from_secs(30 * 60))
    }

    async fn wait_cluster(
        &self,
        ctx: &Context,
        cluster_id: &str,
        pending: &[&str],
        target: &[&str],
        timeout: Duration,
        action: &str,
    ) -> Result<(), ProviderError> {
        self.data
            .ccev2_service()
            .cluster_state_conf(cluster_id, pending, target, timeout)
            .wait_for_state(ctx)
            .await
            .map(|_| ())
            .map_err(|e| wrap_wait_error(e, TYPE_NAME, action))
    }

    #[allow(clippy::too_many_arguments)]
    async fn wait_workers(
        &self,
        ctx: &Context,
        cluster_id: &str,
        worker_ids: &[String],
        pending: &[&str],
        target: &[&str],
        timeout: Duration,
        action: &str,
    ) -> Result<(), ProviderError> {
        if worker_ids.is_empty() {
            return Ok(());
        }
        tracing::info!(
            "waiting for {} workers of cluster {} to reach {:?}",
            worker_ids.len(),
            cluster_id,
            target
        );
        self.data
            .ccev2_service()
            .wait_for_instances_operation(ctx, cluster_id, worker_ids, pending, target, timeout)
            .await
            .map_err(|e| wrap_error(e, TYPE_NAME, action, ErrorSource::Provider))
    }

    /// Worker ids, keeping the order already recorded in `known`
    async fn list_workers(
        &self,
        cluster_id: &str,
        known: &[String],
    ) -> Result<Vec<String>, ProviderError> {
        let instances = self
            .data
            .ccev2_service()
            .list_all_instances(cluster_id, None, None)
            .await
            .map_err(|e| wrap_error(e, TYPE_NAME, "read", ErrorSource::BceSdk))?;
        Ok(order_workers(&instances, known))
    }

    /// Refreshes everything the API reports into `state`
    async fn refresh_state(&self, cluster_id: &str, state: &mut State) -> Result<bool, ProviderError> {
        let cluster = match self.data.ccev2_service().get_cluster(cluster_id).await {
            Ok(cluster) => cluster,
            Err(e) if is_not_found(&e) => return Ok(false),
            Err(e) => return Err(wrap_error(e, TYPE_NAME, "read", ErrorSource::BceSdk)),
        };
        if cluster.status.cluster_phase == PHASE_DELETED {
            return Ok(false);
        }

        let spec = &cluster.spec;
        state.set_id(cluster_id.to_string());
        state.set("cluster_name", spec.cluster_name.clone());
        state.set("k8s_version", spec.k8s_version.clone());
        state.set("vpc_id", spec.vpc_id.clone());
        state.set("master_type", spec.master_config.master_type.clone());
        state.set("cluster_ha", spec.master_config.cluster_ha);
        state.set("exposed_public", spec.master_config.exposed_public);
        state.set(
            "container_network_mode",
            spec.container_network_config.mode.clone(),
        );
        state.set(
            "cluster_pod_cidr",
            spec.container_network_config.cluster_pod_cidr.clone(),
        );
        state.set(
            "cluster_ip_service_cidr",
            spec.container_network_config.cluster_ip_service_cidr.clone(),
        );
        state.set("cluster_phase", cluster.status.cluster_phase.clone());
        state.set("created_at", cluster.created_at.clone());

        let known = state.get_string_list("worker_instance_ids");
        let workers = self.list_workers(cluster_id, &known).await?;
        state.set("worker_count", workers.len() as i64);
        state.set(
            "worker_instance_ids",
            workers.into_iter().map(Dynamic::String).collect::<Vec<_>>(),
        );
        Ok(true)
    }
}

fn order_workers(instances: &[ClusterInstance], known: &[String]) -> Vec<String> {
    let mut fresh: Vec<&ClusterInstance> = instances
        .iter()
        .filter(|i| i.spec.cluster_role == CLUSTER_ROLE_NODE)
        .collect();
    let mut ordered: Vec<String> = known
        .iter()
        .filter(|id| fresh.iter().any(|i| &i.spec.cce_instance_id == *id))
        .cloned()
        .collect();
    fresh.retain(|i| !ordered.contains(&i.spec.cce_instance_id));
    fresh.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.spec.cce_instance_id.cmp(&b.spec.cce_instance_id))
    });
    ordered.extend(fresh.into_iter().map(|i| i.spec.cce_instance_id.clone()));
    ordered
}

fn cluster_spec_from_config(config: &Config) -> ClusterSpec {
    ClusterSpec {
        cluster_name: config.get_string("cluster_name").unwrap_or_default(),
        cluster_type: "normal".to_string(),
        description: config.get_string("description").unwrap_or_default(),
        k8s_version: config.get_string("k8s_version").unwrap_or_default(),
        runtime_type: config
            .get_string("runtime_type")
            .unwrap_or_else(|| "docker".to_string()),
        vpc_id: config.get_string("vpc_id").unwrap_or_default(),
        master_config: MasterConfig {
            master_type: config
                .get_string("master_type")
                .unwrap_or_else(|| "managed".to_string()),
            cluster_ha: get_u32(config, "cluster_ha").unwrap_or(1),
            exposed_public: config.get_bool("exposed_public").unwrap_or(false),
            cluster_blb_vpc_subnet_id: config
                .get_string("cluster_blb_subnet_id")
                .unwrap_or_default(),
        },
        container_network_config: ContainerNetworkConfig {
            mode: config
                .get_string("container_network_mode")
                .unwrap_or_else(|| "kubenet".to_string()),
            cluster_pod_cidr: config.get_string("cluster_pod_cidr").unwrap_or_default(),
            cluster_ip_service_cidr: config
                .get_string("cluster_ip_service_cidr")
                .unwrap_or_default(),
            lb_service_vpc_subnet_id: config
                .get_string("lb_service_subnet_id")
                .unwrap_or_default(),
        },
        ..Default::default()
    }
}

fn worker_set_from_config(config: &Config, count: u32) -> InstanceSet {
    InstanceSet {
        instance_spec: InstanceSpec {
            cluster_role: CLUSTER_ROLE_NODE.to_string(),
            existed: false,
            machine_type: "BCC".to_string(),
            instance_type: config
                .get_string("worker_instance_type")
                .unwrap_or_else(|| "N3".to_string()),
            vpc_config: VpcConfig {
                vpc_id: config.get_string("vpc_id").unwrap_or_default(),
                vpc_subnet_id: config.get_string("worker_subnet_id").unwrap_or_default(),
                security_group_id: config
                    .get_string("worker_security_group_id")
                    .unwrap_or_default(),
                available_zone: config
                    .get_string("worker_availability_zone")
                    .unwrap_or_else(|| "zoneA".to_string()),
            },
            instance_resource: InstanceResource {
                cpu: get_u32(config, "worker_cpu").unwrap_or(2),
                mem: get_u32(config, "worker_mem").unwrap_or(4),
                root_disk_type: "hp1".to_string(),
                root_disk_size: get_u32(config, "worker_root_disk_size").unwrap_or(40),
            },
            image_id: config.get_string("worker_image_id").unwrap_or_default(),
            admin_password: config
                .get_string("worker_admin_password")
                .unwrap_or_default(),
            instance_charging_type: "Postpaid".to_string(),
            ..Default::default()
        },
        count,
    }
}

#[async_trait]
impl Resource for CceV2ClusterResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    async fn schema(&self, _request: SchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn validate(&self, request: ValidateRequest) -> ValidateResponse {
        let config = &request.config;
        let mut diagnostics = Self::schema_static().validate(config);
        if config.get_i64("worker_count").unwrap_or(0) > 0 {
            for key in ["worker_subnet_id", "worker_image_id"] {
                if config.get_non_empty_string(key).is_none() {
                    diagnostics.add_attribute_error(
                        key,
                        format!("{} is required when worker_count is greater than 0", key),
                        None::<String>,
                    );
                }
            }
        }
        ValidateResponse { diagnostics }
    }

    async fn create(&self, request: CreateRequest) -> CreateResponse {
        let config = &request.config;
        let timeouts = Self::timeouts().resolve(config);
        let ctx = request.context.with_timeout(timeouts.create);
        let worker_count = config.get_i64("worker_count").unwrap_or(0).max(0) as u32;

        let body = CreateClusterRequest {
            cluster: cluster_spec_from_config(config),
            nodes: if worker_count > 0 {
                vec![worker_set_from_config(config, worker_count)]
            } else {
                Vec::new()
            },
        };
        let mut logged = body.clone();
        for set in &mut logged.nodes {
            if !set.instance_spec.admin_password.is_empty() {
                set.instance_spec.admin_password = "******".to_string();
            }
        }
        self.data.debug.add_debug("create ccev2 cluster", &logged);

        let (client, body) = (&self.data.client, &body);
        let created = retry_api(&ctx, timeouts.create, || async move {
            client.ccev2().create_cluster(body).await
        })
        .await;
        let cluster_id = match created {
            Ok(response) => response.cluster_id,
            Err(e) => {
                return CreateResponse {
                    state: State::new(),
                    diagnostics: wrap_retry_failure(e, TYPE_NAME, "create").to_diagnostics(),
                }
            }
        };
        tracing::info!("created ccev2 cluster {}", cluster_id);

        let mut state = request.planned_state.clone();
        state.set_id(cluster_id.clone());

        let result = async {
            self.wait_cluster(
                &ctx,
                &cluster_id,
                CREATE_PENDING_PHASES,
                &[PHASE_RUNNING],
                timeouts.create,
                "create",
            )
            .await?;
            let workers = self.list_workers(&cluster_id, &[]).await?;
            self.wait_workers(
                &ctx,
                &cluster_id,
                &workers,
                CREATE_PENDING_PHASES,
                &[PHASE_RUNNING],
                timeouts.create,
                "create",
            )
            .await?;
            self.refresh_state(&cluster_id, &mut state).await
        }
        .await;

        CreateResponse {
            diagnostics: match result {
                Ok(_) => Diagnostics::new(),
                Err(e) => e.to_diagnostics(),
            },
            state,
        }
    }

    async fn read(&self, request: ReadRequest) -> ReadResponse {
        let Some(cluster_id) = request.current_state.id() else {
            return ReadResponse {
                state: None,
                diagnostics: Diagnostics::new(),
            };
        };

        let mut state = request.current_state.clone();
        match self.refresh_state(&cluster_id, &mut state).await {
            Ok(true) => ReadResponse {
                state: Some(state),
                diagnostics: Diagnostics::new(),
            },
            Ok(false) => {
                tracing::warn!("ccev2 cluster {} is gone, removing from state", cluster_id);
                ReadResponse {
                    state: None,
                    diagnostics: Diagnostics::new(),
                }
            }
            Err(e) => ReadResponse {
                state: Some(request.current_state),
                diagnostics: e.to_diagnostics(),
            },
        }
    }

    async fn update(&self, request: UpdateRequest) -> UpdateResponse {
        let config = &request.config;
        let current = &request.current_state;
        let mut state = current.clone();
        let cluster_id = current.id().unwrap_or_default();
        let timeouts = Self::timeouts().resolve(config);
        let ctx = request.context.with_timeout(timeouts.update);

        let result = async {
            if config.has_change(current, "worker_count") {
                let known = current.get_string_list("worker_instance_ids");
                let workers = self.list_workers(&cluster_id, &known).await?;
                let wanted = config.get_i64("worker_count").unwrap_or(0).max(0) as usize;

                if wanted > workers.len() {
                    let set = worker_set_from_config(config, (wanted - workers.len()) as u32);
                    self.data.debug.add_debug("scale out workers", &set.count);
                    let (client, id, sets) =
                        (&self.data.client, cluster_id.as_str(), std::slice::from_ref(&set));
                    let added = retry_api(&ctx, timeouts.update, || async move {
                        client.ccev2().create_instances(id, sets).await
                    })
                    .await
                    .map_err(|e| wrap_retry_failure(e, TYPE_NAME, "update"))?;
                    self.wait_workers(
                        &ctx,
                        &cluster_id,
                        &added,
                        CREATE_PENDING_PHASES,
                        &[PHASE_RUNNING],
                        timeouts.update,
                        "update",
                    )
                    .await?;
                } else if wanted < workers.len() {
                    let removed = workers[wanted..].to_vec();
                    self.data.debug.add_debug("scale in workers", &removed);
                    let (client, id, ids) = (&self.data.client, cluster_id.as_str(), &removed);
                    retry_api(&ctx, timeouts.update, || async move {
                        client.ccev2().delete_instances(id, ids).await
                    })
                    .await
                    .map_err(|e| wrap_retry_failure(e, TYPE_NAME, "update"))?;
                    self.wait_workers(
                        &ctx,
                        &cluster_id,
                        &removed,
                        REMOVAL_PENDING_PHASES,
                        &[PHASE_DELETED],
                        timeouts.update,
                        "update",
                    )
                    .await?;
                }
            }
            self.refresh_state(&cluster_id, &mut state).await
        }
        .await;

        if let Some(timeouts) = config.get("timeouts") {
            state.set("timeouts", timeouts.clone());
        }
        UpdateResponse {
            diagnostics: match result {
                Ok(_) => Diagnostics::new(),
                Err(e) => e.to_diagnostics(),
            },
            state,
        }
    }

    async fn delete(&self, request: DeleteRequest) -> DeleteResponse {
        let Some(cluster_id) = request.current_state.id() else {
            return DeleteResponse {
                diagnostics: Diagnostics::new(),
            };
        };
        let timeouts = Self::timeouts().resolve(&request.current_state);
        let ctx = request.context.with_timeout(timeouts.delete);

        let (client, id) = (&self.data.client, cluster_id.as_str());
        let deleted = retry_api(&ctx, timeouts.delete, || async move {
            match client.ccev2().delete_cluster(id).await {
                Err(e) if is_not_found(&e) => Ok(()),
                other => other,
            }
        })
        .await;
        if let Err(e) = deleted {
            return DeleteResponse {
                diagnostics: wrap_retry_failure(e, TYPE_NAME, "delete").to_diagnostics(),
            };
        }

        let waited = self
            .wait_cluster(
                &ctx,
                &cluster_id,
                REMOVAL_PENDING_PHASES,
                &[PHASE_DELETED],
                timeouts.delete,
                "delete",
            )
            .await;
        DeleteResponse {
            diagnostics: match waited {
                Ok(()) => Diagnostics::new(),
                Err(e) => e.to_diagnostics(),
            },
        }
    }
}
