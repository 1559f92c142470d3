use super::{PollSettings, DELETED_STATE};
use crate::api::common::{PaginationParams, MAX_PAGE_SIZE};
use crate::api::eip::{Eip, ListEipArgs};
use crate::api::{ApiError, Client};
use crate::errors::is_not_found;
use crate::logging::DebugLog;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tfplug::helper::{build_state_conf, flatten, BoxError, Row, StateChangeConf};

pub const EIP_STATUS_CREATING: &str = "creating";
pub const EIP_STATUS_AVAILABLE: &str = "available";
pub const EIP_STATUS_BINDED: &str = "binded";
pub const EIP_STATUS_UPDATING: &str = "updating";
pub const EIP_STATUS_UNAVAILABLE: &str = "unavailable";
pub const EIP_STATUS_BINDING: &str = "binding";
pub const EIP_STATUS_UNBINDING: &str = "unbinding";
pub const EIP_STATUS_PAUSED: &str = "paused";

pub struct EipService {
    client: Arc<Client>,
    debug: DebugLog,
    poll: PollSettings,
}

#[derive(Debug, Serialize)]
pub struct EipAttributes {
    pub eip: String,
    pub eip_id: String,
    pub name: String,
    pub status: String,
    pub eip_instance_type: String,
    pub instance_type: String,
    pub instance_id: String,
    pub share_group_id: String,
    pub bandwidth_in_mbps: u32,
    pub payment_timing: String,
    pub billing_method: String,
    pub create_time: String,
    pub expire_time: String,
    pub tags: BTreeMap<String, String>,
}

impl From<&Eip> for EipAttributes {
    fn from(eip: &Eip) -> Self {
        Self {
            eip: eip.eip.clone(),
            eip_id: eip.eip_id.clone(),
            name: eip.name.clone(),
            status: eip.status.clone(),
            eip_instance_type: eip.eip_instance_type.clone(),
            instance_type: eip.instance_type.clone(),
            instance_id: eip.instance_id.clone(),
            share_group_id: eip.share_group_id.clone(),
            bandwidth_in_mbps: eip.bandwidth_in_mbps,
            payment_timing: eip.payment_timing.clone(),
            billing_method: eip.billing_method.clone(),
            create_time: eip.create_time.clone(),
            expire_time: eip.expire_time.clone(),
            tags: super::flatten_tags(&eip.tags),
        }
    }
}

impl EipService {
    pub fn new(client: Arc<Client>, debug: DebugLog, poll: PollSettings) -> Self {
        Self {
            client,
            debug,
            poll,
        }
    }

    pub async fn list_all_eips(&self, filter: &ListEipArgs) -> Result<Vec<Eip>, ApiError> {
        list_all(&self.client, filter, self.debug).await
    }

    /// The EIP with address `eip`, `None` once it is gone
    pub async fn get_eip(&self, eip: &str) -> Result<Option<Eip>, ApiError> {
        get_eip(&self.client, eip).await
    }

    /// Wait for `eip` to move from `pending` to `target`. A released EIP
    /// reports [`DELETED_STATE`].
    pub fn state_conf(
        &self,
        eip: &str,
        pending: &[&str],
        target: &[&str],
        timeout: Duration,
    ) -> StateChangeConf<Option<Eip>> {
        let client = self.client.clone();
        let address = eip.to_string();
        let debug = self.debug;

        let conf = build_state_conf(pending, target, timeout, move || {
            let client = client.clone();
            let address = address.clone();
            async move {
                let found = get_eip(&client, &address).await?;
                let status = found
                    .as_ref()
                    .map_or_else(|| DELETED_STATE.to_string(), |e| e.status.clone());
                debug.add_debug("refresh eip status", &status);
                Ok::<_, BoxError>((found, status))
            }
        });
        self.poll.apply(conf)
    }

    pub fn flatten_eips(&self, eips: &[Eip]) -> tfplug::Result<Vec<Row>> {
        eips.iter()
            .map(|eip| flatten(&EipAttributes::from(eip)))
            .collect()
    }
}

async fn list_all(
    client: &Client,
    filter: &ListEipArgs,
    debug: DebugLog,
) -> Result<Vec<Eip>, ApiError> {
    let mut eips = Vec::new();
    let mut marker: Option<String> = None;

    loop {
        let mut page = PaginationParams::new().with_max_keys(MAX_PAGE_SIZE);
        if let Some(m) = marker.take() {
            page = page.with_marker(m);
        }
        let args = ListEipArgs {
            page,
            ..filter.clone()
        };
        let response = client.eip().list(&args).await?;
        debug.add_debug("list eips", &response.page);

        eips.extend(response.eip_list);
        match response.page.next() {
            Some(next) => marker = Some(next.to_string()),
            None => break,
        }
    }

    Ok(eips)
}

async fn get_eip(client: &Client, eip: &str) -> Result<Option<Eip>, ApiError> {
    let args = ListEipArgs {
        eip: Some(eip.to_string()),
        ..Default::default()
    };
    match client.eip().list(&args).await {
        Ok(response) => Ok(response.eip_list.into_iter().find(|e| e.eip == eip)),
        Err(e) if is_not_found(&e) => Ok(None),
        Err(e) => Err(e),
    }
}
