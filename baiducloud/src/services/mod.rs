//! Service wrappers over the API bindings
//!
//! A service owns a shared client, pages through list APIs, exposes the
//! status probes used while waiting on asynchronous operations and flattens
//! API objects into data source rows.

pub mod bcc;
pub mod ccev2;
pub mod eip;
pub mod vpc;

pub use bcc::BccService;
pub use ccev2::CceV2Service;
pub use eip::EipService;
pub use vpc::VpcService;

use std::collections::BTreeMap;
use std::time::Duration;
use tfplug::helper::state_refresh::{StateChangeConf, DEFAULT_DELAY, DEFAULT_MIN_TIMEOUT};

use crate::api::TagModel;

/// Status reported by probes once the object no longer exists
pub const DELETED_STATE: &str = "DELETED";

/// Poll pacing applied to every wait a service builds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub delay: Duration,
    pub min_timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            delay: DEFAULT_DELAY,
            min_timeout: DEFAULT_MIN_TIMEOUT,
        }
    }
}

impl PollSettings {
    pub fn apply<T>(&self, conf: StateChangeConf<T>) -> StateChangeConf<T> {
        conf.with_delay(self.delay).with_min_timeout(self.min_timeout)
    }
}

/// Tags as a sorted `key => value` map
pub fn flatten_tags(tags: &[TagModel]) -> BTreeMap<String, String> {
    tags.iter()
        .map(|t| (t.tag_key.clone(), t.tag_value.clone()))
        .collect()
}

pub fn tags_from_map<'a, I>(entries: I) -> Vec<TagModel>
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    entries
        .into_iter()
        .map(|(k, v)| TagModel {
            tag_key: k.clone(),
            tag_value: v.clone(),
        })
        .collect()
}
