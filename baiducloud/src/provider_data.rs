//! Provider data structure passed to resources and data sources

use crate::api::Client;
use crate::logging::DebugLog;
use crate::services::{BccService, CceV2Service, EipService, PollSettings, VpcService};
use std::sync::Arc;

#[derive(Clone)]
pub struct BaiduCloudProviderData {
    pub client: Arc<Client>,
    pub region: String,
    pub debug: DebugLog,
    pub poll: PollSettings,
}

impl BaiduCloudProviderData {
    pub fn new(client: Client, region: impl Into<String>, debug: DebugLog) -> Self {
        Self {
            client: Arc::new(client),
            region: region.into(),
            debug,
            poll: PollSettings::default(),
        }
    }

    pub fn with_poll_settings(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    pub fn vpc_service(&self) -> VpcService {
        VpcService::new(self.client.clone(), self.debug)
    }

    pub fn eip_service(&self) -> EipService {
        EipService::new(self.client.clone(), self.debug, self.poll)
    }

    pub fn bcc_service(&self) -> BccService {
        BccService::new(self.client.clone(), self.debug, self.poll)
    }

    pub fn ccev2_service(&self) -> CceV2Service {
        CceV2Service::new(self.client.clone(), self.debug, self.poll)
    }
}
