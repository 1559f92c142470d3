//! Resource implementations

pub mod ccev2_cluster;
pub mod eip;
pub mod instance;
pub mod subnet;
pub mod vpc;

pub use ccev2_cluster::CceV2ClusterResource;
pub use eip::EipResource;
pub use instance::InstanceResource;
pub use subnet::SubnetResource;
pub use vpc::VpcResource;

use crate::api::common::{Billing, Reservation};
use crate::api::{ApiError, TagModel};
use crate::errors::is_retryable;
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use tfplug::helper::{retry, RetryError, RetryFailure};
use tfplug::schema::Attribute;
use tfplug::{AttributeBuilder, Config, Context};

pub(crate) const TAGS_ATTRIBUTE: &str = "tags";

pub const PAYMENT_TIMING_PREPAID: &str = "Prepaid";
pub const PAYMENT_TIMING_POSTPAID: &str = "Postpaid";

/// Runs `operation` until it succeeds, retrying BCE internal errors
pub(crate) async fn retry_api<T, F, Fut>(
    ctx: &Context,
    timeout: Duration,
    mut operation: F,
) -> Result<T, RetryFailure<ApiError>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    retry(ctx, timeout, || {
        let attempt = operation();
        async move {
            attempt
                .await
                .map_err(|e| RetryError::classify(e, is_retryable))
        }
    })
    .await
}

pub(crate) fn tags_attribute(force_new: bool) -> Attribute {
    let builder = AttributeBuilder::string_map(TAGS_ATTRIBUTE)
        .optional()
        .description("Tags attached to the resource");
    if force_new {
        builder.force_new().build()
    } else {
        builder.build()
    }
}

pub(crate) fn tags_from_config(config: &Config) -> Vec<TagModel> {
    let tags: BTreeMap<String, String> = config
        .get_map(TAGS_ATTRIBUTE)
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_string().map(|v| (k.clone(), v.clone())))
                .collect()
        })
        .unwrap_or_default();
    crate::services::tags_from_map(&tags)
}

/// Null for no tags so an unset `tags` argument does not drift
pub(crate) fn tags_to_dynamic(tags: &[TagModel]) -> tfplug::Dynamic {
    if tags.is_empty() {
        return tfplug::Dynamic::Null;
    }
    let map = crate::services::flatten_tags(tags)
        .into_iter()
        .map(|(k, v)| (k, tfplug::Dynamic::String(v)))
        .collect::<std::collections::HashMap<_, _>>();
    tfplug::Dynamic::Map(map)
}

/// Sizing argument as `u32`; negative or oversized values read as unset
pub(crate) fn get_u32(config: &Config, key: &str) -> Option<u32> {
    config.get_i64(key).and_then(|n| u32::try_from(n).ok())
}

/// Reservation is only sent for prepaid resources
pub(crate) fn billing_from_config(config: &Config) -> Billing {
    let payment_timing = config
        .get_string("payment_timing")
        .unwrap_or_else(|| PAYMENT_TIMING_POSTPAID.to_string());
    let reservation = if payment_timing == PAYMENT_TIMING_PREPAID {
        get_u32(config, "reservation_length").map(|len| Reservation {
            reservation_length: len,
            reservation_time_unit: config
                .get_string("reservation_time_unit")
                .unwrap_or_else(|| "Month".to_string()),
        })
    } else {
        None
    };

    Billing {
        payment_timing,
        billing_method: config.get_non_empty_string("billing_method"),
        reservation,
    }
}
